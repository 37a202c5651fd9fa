//! Core traits and types for the driver abstraction.
//!
//! The `tisgrabber` ABI reports results in two ways: most entry points return
//! an integer status (`IC_SUCCESS` on success), while `IC_StopLive` and
//! `IC_ReleaseGrabber` return nothing at all. The [`Driver`] and [`Grabber`]
//! traits normalize both conventions at this boundary: status-returning calls
//! become [`DriverResult`]s, and no-status calls are infallible methods whose
//! success is assumed once issued.

use std::fmt;

/// Raw status code returned by a driver entry point.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct Status(pub i32);

impl Status {
    /// `IC_SUCCESS`.
    pub const SUCCESS: Self = Self(1);
    /// `IC_ERROR`.
    pub const ERROR: Self = Self(0);
    /// `IC_NO_HANDLE`: the grabber handle is null.
    pub const NO_HANDLE: Self = Self(-1);
    /// `IC_NO_DEVICE`: no device is open on the grabber.
    pub const NO_DEVICE: Self = Self(-2);
    /// `IC_NOT_AVAILABLE`: property or mode not available on this device.
    pub const NOT_AVAILABLE: Self = Self(-3);

    /// Whether the code is `IC_SUCCESS`.
    #[must_use]
    pub const fn is_success(self) -> bool {
        self.0 == Self::SUCCESS.0
    }

    /// Convert the code into a [`DriverResult`].
    pub const fn check(self) -> DriverResult<()> {
        if self.is_success() {
            Ok(())
        } else {
            Err(self)
        }
    }
}

impl fmt::Display for Status {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let name = match *self {
            Self::SUCCESS => "IC_SUCCESS",
            Self::ERROR => "IC_ERROR",
            Self::NO_HANDLE => "IC_NO_HANDLE",
            Self::NO_DEVICE => "IC_NO_DEVICE",
            Self::NOT_AVAILABLE => "IC_NOT_AVAILABLE",
            _ => return write!(f, "status {}", self.0),
        };
        write!(f, "{name} ({})", self.0)
    }
}

/// Result of a status-returning driver call.
pub type DriverResult<T> = std::result::Result<T, Status>;

/// Sink pixel encoding (`COLORFORMAT` in the driver headers).
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ColorFormat {
    /// 8-bit grayscale.
    Y800,
    /// 24-bit RGB.
    Rgb24,
    /// 32-bit RGB.
    Rgb32,
    /// YUV 4:2:2.
    Uyvy,
    /// 16-bit grayscale (12 significant bits on the DMK x3GP031).
    Y16,
    /// Code the driver reported that this crate does not know.
    Unknown(i32),
}

impl ColorFormat {
    /// Decode a raw `COLORFORMAT` value.
    #[must_use]
    pub const fn from_raw(raw: i32) -> Self {
        match raw {
            0 => Self::Y800,
            1 => Self::Rgb24,
            2 => Self::Rgb32,
            3 => Self::Uyvy,
            4 => Self::Y16,
            other => Self::Unknown(other),
        }
    }

    /// Raw `COLORFORMAT` value.
    #[must_use]
    pub const fn as_raw(self) -> i32 {
        match self {
            Self::Y800 => 0,
            Self::Rgb24 => 1,
            Self::Rgb32 => 2,
            Self::Uyvy => 3,
            Self::Y16 => 4,
            Self::Unknown(raw) => raw,
        }
    }
}

impl fmt::Display for ColorFormat {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Unknown(raw) => write!(f, "unknown color format {raw}"),
            other => write!(f, "{other:?} ({})", other.as_raw()),
        }
    }
}

/// Camera property identifier (`CAMERA_PROPERTY`).
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum CameraProperty {
    /// Exposure time, in microseconds on this camera family.
    Exposure,
}

impl CameraProperty {
    /// Raw `CAMERA_PROPERTY` value.
    #[must_use]
    pub const fn as_raw(self) -> u32 {
        match self {
            Self::Exposure => 4,
        }
    }
}

/// Image description reported by the driver for the current sink format.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct ImageDescription {
    /// Frame width in pixels.
    pub width: i64,
    /// Frame height in pixels.
    pub height: i64,
    /// Bits per pixel.
    pub bit_depth: i32,
    /// Sink color format.
    pub color_format: ColorFormat,
}

/// Allowed range of a camera property.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct PropertyRange {
    /// Minimum value.
    pub min: i64,
    /// Maximum value.
    pub max: i64,
}

/// Library-level driver operations.
pub trait Driver {
    /// The grabber type returned by `create_grabber`.
    type Grabber: Grabber;

    /// Unique names of all devices the driver can see, in driver order.
    fn device_names(&self) -> Vec<String>;

    /// Allocate a new, unopened grabber.
    fn create_grabber(&self) -> DriverResult<Self::Grabber>;
}

/// Operations on one grabber handle.
///
/// Implementations must make [`Grabber::release`] idempotent and release the
/// handle on drop if it was not released explicitly.
pub trait Grabber {
    /// Open the device with the given unique name.
    fn open_by_unique_name(&mut self, name: &str) -> DriverResult<()>;

    /// Check that the grabber holds a valid, open device.
    fn is_valid(&self) -> DriverResult<()>;

    /// Video format tokens supported by the open device.
    fn video_formats(&self) -> DriverResult<Vec<String>>;

    /// Select a video format token.
    fn set_video_format(&mut self, format: &str) -> DriverResult<()>;

    /// Describe the image produced by the current format and sink format.
    fn image_description(&self) -> DriverResult<ImageDescription>;

    /// Remove the overlay bitmap from the image path.
    fn remove_overlay(&mut self) -> DriverResult<()>;

    /// Current sink format. Only meaningful after one live start/stop cycle.
    fn sink_format(&self) -> ColorFormat;

    /// Set the sink format. Only legal while stopped.
    fn set_sink_format(&mut self, format: ColorFormat) -> DriverResult<()>;

    /// Start streaming without a display window.
    fn start_live(&mut self) -> DriverResult<()>;

    /// Stop streaming. The driver reports no status for this call.
    fn stop_live(&mut self);

    /// Snap one image, waiting at most `timeout_ms` (`-1` waits forever).
    fn snap_image(&mut self, timeout_ms: i32) -> DriverResult<()>;

    /// Borrow the last snapped image, `len` bytes long.
    ///
    /// Returns `None` if the driver has no image buffer.
    fn image_data(&self, len: usize) -> Option<&[u8]>;

    /// Read a camera property.
    fn property(&self, property: CameraProperty) -> DriverResult<i64>;

    /// Write a camera property.
    fn set_property(&mut self, property: CameraProperty, value: i64) -> DriverResult<()>;

    /// Whether automatic control of a property is enabled.
    fn auto_property(&self, property: CameraProperty) -> DriverResult<bool>;

    /// Enable or disable automatic control of a property.
    fn set_auto_property(&mut self, property: CameraProperty, enabled: bool) -> DriverResult<()>;

    /// Allowed range of a property.
    fn property_range(&self, property: CameraProperty) -> DriverResult<PropertyRange>;

    /// Whether the device supports hardware triggering.
    fn is_trigger_available(&self) -> bool;

    /// Enable or disable trigger mode, returning the driver's raw code.
    ///
    /// The driver does not return `IC_SUCCESS` reliably for this call, so the
    /// code is informational only.
    fn enable_trigger(&mut self, enabled: bool) -> Status;

    /// Fire a software trigger.
    fn software_trigger(&mut self) -> DriverResult<()>;

    /// Release the handle back to the driver. Reports no status.
    fn release(&mut self);
}
