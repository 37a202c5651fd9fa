//! Pure checks that run without a camera attached.
//!
//! Device name matching, video format token checks and exposure range checks
//! live here so they can be tested directly; the session calls them before
//! touching the driver.

use std::path::Path;

use crate::error::{CameraError, Result};
use crate::traits::PropertyRange;

/// Vendor prefix of supported camera names.
pub const CAMERA_FAMILY: &str = "DMK";

/// Model tokens of supported cameras.
pub const CAMERA_MODELS: [&str; 2] = ["33GP031", "23GP031"];

/// Pixel encoding prefix every accepted video format must carry.
pub const REQUIRED_FORMAT_PREFIX: &str = "Y16";

/// File extension of saved frames.
pub const OUTPUT_EXTENSION: &str = "tif";

/// Whether a driver unique name belongs to a supported camera.
///
/// Names look like `DMK 33GP031 12345678`: exactly three whitespace-separated
/// tokens, the family, a whitelisted model, and a serial number that is not
/// inspected. Family and model compare ASCII case-insensitively.
///
/// # Arguments
///
/// * `name` - Unique name as reported by the driver's device list
///
/// # Returns
///
/// * `true` for a DMK 33GP031 or 23GP031
/// * `false` for any other device or malformed name
#[must_use]
pub fn is_supported_camera(name: &str) -> bool {
    let tokens: Vec<&str> = name.split_whitespace().collect();
    let [family, model, _serial] = tokens.as_slice() else {
        return false;
    };
    family.eq_ignore_ascii_case(CAMERA_FAMILY)
        && CAMERA_MODELS
            .iter()
            .any(|known| model.eq_ignore_ascii_case(known))
}

/// Normalize a caller-supplied video format token and check it against the
/// formats the device reported.
///
/// # Arguments
///
/// * `requested` - Token from the caller, surrounding whitespace allowed
/// * `available` - Tokens the device reported
///
/// # Returns
///
/// * `Ok(token)` - the matching entry of `available`, exactly as the driver
///   spells it
/// * `Err(CameraError::UnsupportedFormat)` otherwise
///
/// # Errors
///
/// Returns `UnsupportedFormat` if the token is not ASCII, does not start with
/// [`REQUIRED_FORMAT_PREFIX`], or is not in `available`. The error lists the
/// available formats that do carry the prefix.
pub fn check_video_format<'a>(requested: &str, available: &'a [String]) -> Result<&'a str> {
    let token = requested.trim();
    let unsupported = || CameraError::UnsupportedFormat {
        requested: requested.to_owned(),
        supported: supported_formats(available),
    };

    if !token.is_ascii() || !token.starts_with(REQUIRED_FORMAT_PREFIX) {
        return Err(unsupported());
    }

    available
        .iter()
        .find(|fmt| fmt.as_str() == token)
        .map(String::as_str)
        .ok_or_else(unsupported)
}

/// The subset of `available` carrying [`REQUIRED_FORMAT_PREFIX`].
#[must_use]
pub fn supported_formats(available: &[String]) -> Vec<String> {
    available
        .iter()
        .filter(|fmt| fmt.starts_with(REQUIRED_FORMAT_PREFIX))
        .cloned()
        .collect()
}

/// Parse the resolution out of a token such as `Y16 (2592x1944)`.
///
/// Returns `(width, height)`, or `None` if the token has no `(WxH)` part.
#[must_use]
pub fn format_resolution(token: &str) -> Option<(u32, u32)> {
    let inner = token.split_once('(')?.1.split_once(')')?.0;
    let (width, height) = inner.split_once('x')?;
    Some((width.trim().parse().ok()?, height.trim().parse().ok()?))
}

/// Convert a requested exposure to microseconds and check it against the
/// driver range, which is exclusive at both ends.
///
/// # Arguments
///
/// * `seconds` - Requested exposure
/// * `range` - Driver range in microseconds
///
/// # Returns
///
/// * `Ok(microseconds)` - the request truncated toward zero
/// * `Err(CameraError::ExposureOutOfRange)` otherwise
///
/// # Errors
///
/// Returns `ExposureOutOfRange`, with the bounds in seconds, if the request is
/// not finite or does not lie strictly inside `range`.
pub fn check_exposure(seconds: f64, range: PropertyRange) -> Result<i64> {
    #[allow(clippy::cast_possible_truncation)]
    let microseconds = (seconds * 1e6) as i64;

    if seconds.is_finite() && range.min < microseconds && microseconds < range.max {
        return Ok(microseconds);
    }

    #[allow(clippy::cast_precision_loss)]
    let (min_seconds, max_seconds) = (range.min as f64 * 1e-6, range.max as f64 * 1e-6);
    Err(CameraError::ExposureOutOfRange {
        requested_seconds: seconds,
        min_seconds,
        max_seconds,
    })
}

/// Convert an optional snap timeout to the driver's millisecond encoding.
///
/// `None` waits forever and is encoded as `-1`. Long timeouts saturate.
#[must_use]
pub fn timeout_millis(timeout: Option<std::time::Duration>) -> i32 {
    timeout.map_or(-1, |t| i32::try_from(t.as_millis()).unwrap_or(i32::MAX))
}

/// Check that an output path carries the `.tif` extension.
///
/// # Errors
///
/// Returns `InvalidOutputPath` otherwise.
pub fn check_output_path(path: &Path) -> Result<()> {
    match path.extension().and_then(|ext| ext.to_str()) {
        Some(ext) if ext.eq_ignore_ascii_case(OUTPUT_EXTENSION) => Ok(()),
        _ => Err(CameraError::InvalidOutputPath(path.to_path_buf())),
    }
}
