//! Snapped frame storage.

use std::slice::ChunksExact;

/// Number of padding bits below the 12 significant bits of a Y16 sample.
pub const SAMPLE_SHIFT: u32 = 4;

/// A grayscale frame of 16-bit samples, stored row-major.
///
/// Samples snapped from the camera are already normalized: the driver
/// delivers 12 bits of intensity in the top of each 16-bit word, and the
/// session shifts them down by [`SAMPLE_SHIFT`].
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Frame {
    width: u32,
    height: u32,
    data: Vec<u16>,
}

impl Frame {
    /// Create a zero-filled frame, e.g. as a caller buffer for `snap`.
    #[must_use]
    pub fn zeroed(width: u32, height: u32) -> Self {
        Self {
            width,
            height,
            data: vec![0; width as usize * height as usize],
        }
    }

    /// Wrap existing samples.
    ///
    /// # Arguments
    ///
    /// * `width` - Frame width in pixels
    /// * `height` - Frame height in pixels
    /// * `data` - Row-major samples
    ///
    /// # Returns
    ///
    /// * `Some(frame)` if `data` holds exactly `width * height` samples
    /// * `None` otherwise
    #[must_use]
    pub fn from_samples(width: u32, height: u32, data: Vec<u16>) -> Option<Self> {
        (data.len() == width as usize * height as usize).then_some(Self {
            width,
            height,
            data,
        })
    }

    /// Copy a raw driver image and normalize every sample.
    ///
    /// `bytes` holds native-endian 16-bit words; a trailing odd byte is ignored.
    pub(crate) fn from_driver_bytes(width: u32, height: u32, bytes: &[u8]) -> Self {
        let data = bytes
            .chunks_exact(2)
            .filter_map(|pair| <[u8; 2]>::try_from(pair).ok())
            .map(|word| u16::from_ne_bytes(word) >> SAMPLE_SHIFT)
            .collect();
        Self {
            width,
            height,
            data,
        }
    }

    /// Frame width in pixels.
    #[must_use]
    pub const fn width(&self) -> u32 {
        self.width
    }

    /// Frame height in pixels.
    #[must_use]
    pub const fn height(&self) -> u32 {
        self.height
    }

    /// All samples, row-major.
    #[must_use]
    pub fn samples(&self) -> &[u16] {
        &self.data
    }

    /// Sample at column `x`, row `y`.
    ///
    /// # Returns
    ///
    /// * `Some(sample)` inside the frame
    /// * `None` if `x` or `y` lies outside it
    #[must_use]
    pub fn get(&self, x: u32, y: u32) -> Option<u16> {
        if x >= self.width || y >= self.height {
            return None;
        }
        self.data
            .get(y as usize * self.width as usize + x as usize)
            .copied()
    }

    /// Iterate over rows.
    pub fn rows(&self) -> ChunksExact<'_, u16> {
        self.data.chunks_exact(self.width.max(1) as usize)
    }

    /// Whether this frame is exactly `width x height`, with a matching sample count.
    #[must_use]
    pub fn has_shape(&self, width: u32, height: u32) -> bool {
        self.width == width
            && self.height == height
            && self.data.len() == width as usize * height as usize
    }

    /// Overwrite this frame's samples. Shapes must already match.
    pub(crate) fn copy_from(&mut self, other: &Self) {
        self.data.copy_from_slice(&other.data);
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_driver_bytes_are_shifted() {
        let raw: Vec<u8> = [0xFFF0u16, 0x0010, 0x1230, 0x0000]
            .iter()
            .flat_map(|s| s.to_ne_bytes())
            .collect();
        let frame = Frame::from_driver_bytes(2, 2, &raw);

        assert_eq!(frame.samples(), &[0x0FFF, 0x0001, 0x0123, 0x0000]);
        assert_eq!(frame.get(1, 0), Some(0x0001));
        assert_eq!(frame.get(0, 1), Some(0x0123));
    }

    #[test]
    fn test_driver_bytes_ignore_trailing_byte() {
        let mut raw = 0x0120u16.to_ne_bytes().to_vec();
        raw.push(0xFF);

        let frame = Frame::from_driver_bytes(1, 1, &raw);

        assert_eq!(frame.samples(), &[0x0012]);
        assert!(frame.has_shape(1, 1));
    }

    #[test]
    fn test_get_out_of_bounds() {
        let frame = Frame::zeroed(3, 2);
        assert_eq!(frame.get(3, 0), None);
        assert_eq!(frame.get(0, 2), None);
        assert_eq!(frame.get(2, 1), Some(0));
    }

    #[test]
    fn test_rows() {
        let frame = Frame::from_samples(3, 2, vec![1, 2, 3, 4, 5, 6]).expect("valid shape");
        let rows: Vec<&[u16]> = frame.rows().collect();
        assert_eq!(rows, vec![&[1, 2, 3][..], &[4, 5, 6][..]]);
    }

    #[test]
    fn test_from_samples_rejects_wrong_length() {
        assert!(Frame::from_samples(3, 2, vec![0; 5]).is_none());
    }

    #[test]
    fn test_has_shape() {
        let frame = Frame::zeroed(4, 3);
        assert!(frame.has_shape(4, 3));
        assert!(!frame.has_shape(3, 4));
    }
}
