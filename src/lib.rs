//! dmk-capture: control of The Imaging Source DMK 33GP031/23GP031 cameras
//!
//! This library wraps the vendor `tisgrabber` driver behind the [`Driver`]
//! and [`Grabber`] traits and sequences its calls in [`CameraSession`]:
//! device discovery, 16-bit format negotiation, exposure and trigger control,
//! and snapping frames into memory or to TIFF files. The driver traits allow
//! the session logic to be tested with a mock device.

pub mod config;
pub mod device;
pub mod error;
mod ffi;
pub mod frame;
pub mod persist;
pub mod session;
pub mod traits;
pub mod validation;

#[cfg(test)]
pub mod mock;

pub use config::{Config, ConfigError, DriverConfig, SessionConfig};
pub use device::{TisDriver, TisGrabber};
pub use error::{CameraError, Result};
pub use frame::Frame;
pub use session::{CameraSession, Exposure, ImageFormat, Sink};
pub use traits::{ColorFormat, Driver, Grabber, Status};
