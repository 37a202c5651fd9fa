//! Error type for camera operations.

use std::path::PathBuf;

use thiserror::Error;

use crate::traits::{ColorFormat, Status};

/// Error type for camera operations.
#[derive(Debug, Error)]
pub enum CameraError {
    /// The driver library could not be loaded or initialized.
    #[error("driver initialization failed: {0}")]
    DriverInitFailed(String),

    /// No supported camera was found among the driver's devices.
    #[error("no DMK 33GP031/23GP031 camera found (devices seen: {seen:?}); is the camera plugged in?")]
    DeviceNotFound {
        /// Unique names the driver reported.
        seen: Vec<String>,
    },

    /// Creating, opening or validating the grabber failed.
    #[error("failed to open device '{name}': {status}")]
    DeviceOpenFailed {
        /// Unique device name.
        name: String,
        /// Driver status.
        status: Status,
    },

    /// Requested video format is not usable.
    #[error("video format '{requested}' not available; supported formats: {supported:?}")]
    UnsupportedFormat {
        /// Requested format token.
        requested: String,
        /// Supported 16-bit formats on this device.
        supported: Vec<String>,
    },

    /// The driver did not end up in the negotiated format.
    #[error("format verification failed: {what} is {actual}, expected {expected}")]
    FormatVerificationFailed {
        /// Which value was checked.
        what: &'static str,
        /// Expected value.
        expected: String,
        /// Value the driver reported.
        actual: String,
    },

    /// No video format has been negotiated yet.
    #[error("no video format negotiated")]
    FormatNotSet,

    /// No exposure has been applied yet.
    #[error("no exposure applied")]
    ExposureNotSet,

    /// Auto exposure is still enabled after disabling it.
    #[error("failed to disable auto exposure")]
    AutoExposureDisableFailed,

    /// Requested exposure lies outside the device's open range.
    #[error("exposure {requested_seconds} s not possible; must lie strictly between {min_seconds} s and {max_seconds} s")]
    ExposureOutOfRange {
        /// Requested exposure in seconds.
        requested_seconds: f64,
        /// Lower bound in seconds (exclusive).
        min_seconds: f64,
        /// Upper bound in seconds (exclusive).
        max_seconds: f64,
    },

    /// The driver refused to start live mode.
    #[error("failed to start live mode: {0}")]
    StartLiveFailed(Status),

    /// `snap` was called without anywhere to put the image.
    #[error("no output destination for snapped image; pass a file, a buffer or Sink::Allocate")]
    NoOutputDestination,

    /// The driver reported a failed snap.
    #[error("snap failed: {0}")]
    SnapFailed(Status),

    /// The driver returned no image buffer after a successful snap.
    #[error("driver returned no image data")]
    MissingImageData,

    /// Caller buffer does not match the frame shape.
    #[error("output buffer is {actual_width}x{actual_height} ({actual_len} samples), frame is {width}x{height}")]
    OutputBufferMismatch {
        /// Frame width.
        width: u32,
        /// Frame height.
        height: u32,
        /// Buffer width.
        actual_width: u32,
        /// Buffer height.
        actual_height: u32,
        /// Buffer sample count.
        actual_len: usize,
    },

    /// Output file path does not end in `.tif`.
    #[error("output path {} must end in .tif", .0.display())]
    InvalidOutputPath(PathBuf),

    /// File output was requested but the TIFF encoder is not compiled in.
    #[error("saving frames as TIFF requires the `tiff` feature")]
    EncoderUnavailable,

    /// Encoding or decoding a TIFF file failed.
    #[error("TIFF error for {}: {message}", .path.display())]
    Tiff {
        /// File involved.
        path: PathBuf,
        /// Encoder message.
        message: String,
    },

    /// The device has no hardware trigger.
    #[error("device does not support triggering")]
    TriggerUnsupported,

    /// Software trigger failed.
    #[error("software trigger failed: {0}")]
    TriggerFailed(Status),

    /// Operation on a closed session.
    #[error("camera session is closed")]
    SessionClosed,

    /// Any other driver call failed.
    #[error("{call} failed: {status}")]
    Driver {
        /// Driver entry point.
        call: &'static str,
        /// Driver status.
        status: Status,
    },
}

impl CameraError {
    /// Shorthand for a failed driver call.
    pub(crate) fn driver(call: &'static str) -> impl Fn(Status) -> Self {
        move |status| Self::Driver { call, status }
    }

    pub(crate) fn color_mismatch(what: &'static str, expected: ColorFormat, actual: ColorFormat) -> Self {
        Self::FormatVerificationFailed {
            what,
            expected: expected.to_string(),
            actual: actual.to_string(),
        }
    }
}

/// Result type for camera operations.
pub type Result<T> = std::result::Result<T, CameraError>;
