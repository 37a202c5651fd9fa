//! Saving frames as 16-bit grayscale TIFF.
//!
//! The encoder is compiled in with the `tiff` feature. Without it, both
//! functions fail with [`CameraError::EncoderUnavailable`]; the session checks
//! [`ENCODER_AVAILABLE`] before it snaps, so a missing encoder never costs an
//! exposure.

use std::path::Path;

use crate::error::{CameraError, Result};
use crate::frame::Frame;

/// Whether this build can write TIFF files.
pub const ENCODER_AVAILABLE: bool = cfg!(feature = "tiff");

/// Write `frame` to `path` as a single-page 16-bit grayscale TIFF.
#[cfg(feature = "tiff")]
pub fn write_frame(frame: &Frame, path: &Path) -> Result<()> {
    use image::{ImageBuffer, ImageFormat, Luma};

    let tiff_error = |message: String| CameraError::Tiff {
        path: path.to_path_buf(),
        message,
    };

    let buffer: ImageBuffer<Luma<u16>, Vec<u16>> =
        ImageBuffer::from_raw(frame.width(), frame.height(), frame.samples().to_vec())
            .ok_or_else(|| tiff_error("frame shape does not match its sample count".to_owned()))?;

    buffer
        .save_with_format(path, ImageFormat::Tiff)
        .map_err(|err| tiff_error(err.to_string()))?;

    tracing::debug!(
        path = %path.display(),
        width = frame.width(),
        height = frame.height(),
        "frame saved"
    );
    Ok(())
}

/// Read a 16-bit grayscale TIFF written by [`write_frame`].
#[cfg(feature = "tiff")]
pub fn read_frame(path: &Path) -> Result<Frame> {
    let image = image::open(path).map_err(|err| CameraError::Tiff {
        path: path.to_path_buf(),
        message: err.to_string(),
    })?;
    let luma = image.into_luma16();
    let (width, height) = luma.dimensions();
    Frame::from_samples(width, height, luma.into_raw()).ok_or_else(|| CameraError::Tiff {
        path: path.to_path_buf(),
        message: "decoded image has an unexpected sample count".to_owned(),
    })
}

/// Write `frame` to `path`. Unavailable in this build.
#[cfg(not(feature = "tiff"))]
pub fn write_frame(_frame: &Frame, _path: &Path) -> Result<()> {
    Err(CameraError::EncoderUnavailable)
}

/// Read a frame from `path`. Unavailable in this build.
#[cfg(not(feature = "tiff"))]
pub fn read_frame(_path: &Path) -> Result<Frame> {
    Err(CameraError::EncoderUnavailable)
}
