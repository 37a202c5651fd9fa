//! Camera session: device acquisition, configuration and frame acquisition.
//!
//! A [`CameraSession`] owns one grabber for its whole life and sequences
//! driver calls in the order the driver requires. Two driver quirks are
//! preserved as mandatory steps of [`CameraSession::set_video_format`]: the
//! overlay must be removed before the 16-bit sink format can be set, and the
//! driver only reports the sink format after one live start/stop cycle.

use std::path::Path;
use std::time::Duration;

use tracing::{debug, info};

use crate::config::SessionConfig;
use crate::error::{CameraError, Result};
use crate::frame::Frame;
use crate::persist;
use crate::traits::{CameraProperty, ColorFormat, Driver, Grabber, Status};
use crate::validation::{
    check_exposure, check_output_path, check_video_format, is_supported_camera, timeout_millis,
};

/// Bit depth of the only supported sink format.
pub const BIT_DEPTH: u32 = 16;

/// Where a snapped frame goes.
#[derive(Debug)]
pub enum Sink<'a> {
    /// Save as a `.tif` file.
    File(&'a Path),
    /// Copy into a caller buffer of exactly the frame's shape.
    Buffer(&'a mut Frame),
    /// Return a newly allocated frame from `snap`.
    Allocate,
}

/// Negotiated image format.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ImageFormat {
    /// Video format token, as the driver spells it.
    pub video_format: String,
    /// Frame width in pixels.
    pub width: u32,
    /// Frame height in pixels.
    pub height: u32,
    /// Bits per sample.
    pub bit_depth: u32,
}

impl ImageFormat {
    fn frame_bytes(&self) -> usize {
        self.width as usize * self.height as usize * (self.bit_depth as usize / 8)
    }
}

/// Exposure time as the driver reports it.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Exposure {
    microseconds: i64,
}

impl Exposure {
    /// Exposure in microseconds.
    #[must_use]
    pub const fn microseconds(self) -> i64 {
        self.microseconds
    }

    /// Exposure in seconds.
    #[must_use]
    #[allow(clippy::cast_precision_loss)]
    pub fn seconds(self) -> f64 {
        self.microseconds as f64 * 1e-6
    }

    /// Exposure in milliseconds.
    #[must_use]
    #[allow(clippy::cast_precision_loss)]
    pub fn milliseconds(self) -> f64 {
        self.microseconds as f64 * 1e-3
    }
}

/// An open DMK 33GP031/23GP031 camera.
///
/// Not safe to share between threads; every method blocks until the driver
/// returns. Dropping an open session stops streaming and releases the device.
pub struct CameraSession<G: Grabber> {
    name: String,
    grabber: Option<G>,
    live: bool,
    video_formats: Vec<String>,
    format: Option<ImageFormat>,
    exposure: Option<Exposure>,
}

impl<G: Grabber> CameraSession<G> {
    /// Find the first supported camera, take custody of it and apply `config`.
    ///
    /// On any error the grabber is released before returning.
    pub fn open<D>(driver: &D, config: &SessionConfig) -> Result<Self>
    where
        D: Driver<Grabber = G>,
    {
        let seen = driver.device_names();
        let name = seen
            .iter()
            .find(|name| is_supported_camera(name))
            .cloned()
            .ok_or_else(|| CameraError::DeviceNotFound { seen: seen.clone() })?;
        info!(camera = %name, "camera found");

        let grabber = driver
            .create_grabber()
            .map_err(|status| CameraError::DeviceOpenFailed {
                name: name.clone(),
                status,
            })?;

        let mut session = Self {
            name,
            grabber: Some(grabber),
            live: false,
            video_formats: Vec::new(),
            format: None,
            exposure: None,
        };
        session.attach()?;
        session.set_video_format(&config.video_format)?;
        session.set_exposure(config.exposure_seconds)?;
        session.enable_trigger(config.trigger)?;
        Ok(session)
    }

    fn attach(&mut self) -> Result<()> {
        let name = self.name.clone();
        let open_failed = |status: Status| CameraError::DeviceOpenFailed {
            name: name.clone(),
            status,
        };
        let grabber = self.grabber()?;
        grabber.open_by_unique_name(&name).map_err(open_failed)?;
        grabber.is_valid().map_err(open_failed)?;
        let formats = grabber
            .video_formats()
            .map_err(CameraError::driver("IC_GetVideoFormat"))?;
        debug!(count = formats.len(), "video formats enumerated");
        self.video_formats = formats;
        Ok(())
    }

    fn grabber(&mut self) -> Result<&mut G> {
        self.grabber.as_mut().ok_or(CameraError::SessionClosed)
    }

    const fn ensure_open(&self) -> Result<()> {
        if self.grabber.is_some() {
            Ok(())
        } else {
            Err(CameraError::SessionClosed)
        }
    }

    /// Unique name of the camera.
    pub fn name(&self) -> &str {
        &self.name
    }

    /// Whether the camera is streaming.
    pub const fn is_live(&self) -> bool {
        self.live
    }

    /// Whether [`close`](Self::close) has been called.
    pub const fn is_closed(&self) -> bool {
        self.grabber.is_none()
    }

    /// Every video format the device reported, including 8-bit ones.
    pub fn video_formats(&self) -> Result<&[String]> {
        self.ensure_open()?;
        Ok(&self.video_formats)
    }

    /// The negotiated image format.
    pub fn image_format(&self) -> Result<&ImageFormat> {
        self.ensure_open()?;
        self.format.as_ref().ok_or(CameraError::FormatNotSet)
    }

    /// The exposure the driver last reported.
    pub fn exposure(&self) -> Result<Exposure> {
        self.ensure_open()?;
        self.exposure.ok_or(CameraError::ExposureNotSet)
    }

    /// A zeroed buffer shaped like the negotiated frame, for [`Sink::Buffer`].
    pub fn frame_buffer(&self) -> Result<Frame> {
        let format = self.image_format()?;
        Ok(Frame::zeroed(format.width, format.height))
    }

    /// Select a 16-bit video format and verify the driver switched to it.
    ///
    /// If negotiation fails after the driver accepted the token, the session
    /// has no format until a later call succeeds.
    pub fn set_video_format(&mut self, video_format: &str) -> Result<()> {
        self.ensure_open()?;
        let token = check_video_format(video_format, &self.video_formats)?.to_owned();
        info!(camera = %self.name, format = %token, "setting video format");

        // Stays unset until the driver has verified the new format.
        self.format = None;
        let grabber = self.grabber()?;
        grabber
            .set_video_format(&token)
            .map_err(CameraError::driver("IC_SetVideoFormat"))?;
        grabber
            .remove_overlay()
            .map_err(CameraError::driver("IC_RemoveOverlay"))?;

        // The sink format can only be set while stopped.
        self.stop_live()?;
        self.grabber()?
            .set_sink_format(ColorFormat::Y16)
            .map_err(CameraError::driver("IC_SetFormat"))?;

        // IC_GetFormat is not valid until live has run at least once.
        self.start_live()?;
        self.stop_live()?;
        let reported = self.grabber()?.sink_format();
        if reported != ColorFormat::Y16 {
            return Err(CameraError::color_mismatch(
                "sink format",
                ColorFormat::Y16,
                reported,
            ));
        }

        self.refresh_image_format(token)
    }

    fn refresh_image_format(&mut self, video_format: String) -> Result<()> {
        let description = self
            .grabber()?
            .image_description()
            .map_err(CameraError::driver("IC_GetImageDescription"))?;

        let bit_depth = u32::try_from(description.bit_depth).unwrap_or(0);
        if bit_depth != BIT_DEPTH {
            return Err(CameraError::FormatVerificationFailed {
                what: "bit depth",
                expected: BIT_DEPTH.to_string(),
                actual: description.bit_depth.to_string(),
            });
        }
        if description.color_format != ColorFormat::Y16 {
            return Err(CameraError::color_mismatch(
                "color format",
                ColorFormat::Y16,
                description.color_format,
            ));
        }
        let dimension = |what: &'static str, value: i64| {
            u32::try_from(value).map_err(|_| CameraError::FormatVerificationFailed {
                what,
                expected: "a non-negative size".to_owned(),
                actual: value.to_string(),
            })
        };
        let format = ImageFormat {
            video_format,
            width: dimension("width", description.width)?,
            height: dimension("height", description.height)?,
            bit_depth,
        };

        info!(
            camera = %self.name,
            width = format.width,
            height = format.height,
            bit_depth = format.bit_depth,
            "image format"
        );
        self.format = Some(format);
        Ok(())
    }

    /// Set the exposure time, disabling auto exposure first if needed.
    ///
    /// The cached exposure is read back from the driver, which may round.
    pub fn set_exposure(&mut self, seconds: f64) -> Result<()> {
        let grabber = self.grabber()?;
        let property = CameraProperty::Exposure;
        let auto_exposure = |grabber: &G| {
            grabber
                .auto_property(property)
                .map_err(CameraError::driver("IC_GetAutoCameraProperty"))
        };

        if auto_exposure(&*grabber)? {
            info!("disabling auto exposure");
            grabber
                .set_auto_property(property, false)
                .map_err(|_| CameraError::AutoExposureDisableFailed)?;
            if auto_exposure(&*grabber)? {
                return Err(CameraError::AutoExposureDisableFailed);
            }
        }

        let range = grabber
            .property_range(property)
            .map_err(CameraError::driver("IC_CameraPropertyGetRange"))?;
        let microseconds = check_exposure(seconds, range)?;
        grabber
            .set_property(property, microseconds)
            .map_err(CameraError::driver("IC_SetCameraProperty"))?;

        self.refresh_exposure()
    }

    fn refresh_exposure(&mut self) -> Result<()> {
        let microseconds = self
            .grabber()?
            .property(CameraProperty::Exposure)
            .map_err(CameraError::driver("IC_GetCameraProperty"))?;
        let exposure = Exposure { microseconds };
        info!(camera = %self.name, seconds = exposure.seconds(), "exposure");
        self.exposure = Some(exposure);
        Ok(())
    }

    /// Start streaming. Does nothing if already live.
    pub fn start_live(&mut self) -> Result<()> {
        let grabber = self.grabber.as_mut().ok_or(CameraError::SessionClosed)?;
        if self.live {
            return Ok(());
        }
        grabber.start_live().map_err(CameraError::StartLiveFailed)?;
        self.live = true;
        debug!(camera = %self.name, "live started");
        Ok(())
    }

    /// Stop streaming. Does nothing if already stopped.
    ///
    /// The driver reports no status for this call, so it always succeeds on
    /// an open session.
    pub fn stop_live(&mut self) -> Result<()> {
        let grabber = self.grabber.as_mut().ok_or(CameraError::SessionClosed)?;
        if !self.live {
            return Ok(());
        }
        grabber.stop_live();
        self.live = false;
        debug!(camera = %self.name, "live stopped");
        Ok(())
    }

    /// Snap one frame and deliver it to every sink.
    ///
    /// If the camera is live the snap is issued directly; otherwise the
    /// camera goes live only for the duration of the snap, which keeps it
    /// from firing on trigger-line noise while idle. `timeout` of `None`
    /// waits forever.
    ///
    /// Returns the frame if `sinks` contains [`Sink::Allocate`]. All sinks
    /// are checked before the driver is touched.
    pub fn snap(&mut self, sinks: &mut [Sink<'_>], timeout: Option<Duration>) -> Result<Option<Frame>> {
        self.ensure_open()?;
        if sinks.is_empty() {
            return Err(CameraError::NoOutputDestination);
        }
        let format = self.format.clone().ok_or(CameraError::FormatNotSet)?;
        for sink in sinks.iter() {
            check_sink(sink, &format)?;
        }

        let timeout_ms = timeout_millis(timeout);
        debug!(camera = %self.name, timeout_ms, "snapping");
        let already_live = self.live;
        self.start_live()?;
        let snapped = self.grabber()?.snap_image(timeout_ms);
        if !already_live {
            self.stop_live()?;
        }
        snapped.map_err(CameraError::SnapFailed)?;

        let bytes = self
            .grabber()?
            .image_data(format.frame_bytes())
            .ok_or(CameraError::MissingImageData)?;
        let frame = Frame::from_driver_bytes(format.width, format.height, bytes);

        let mut allocate = false;
        for sink in sinks.iter_mut() {
            match sink {
                Sink::File(path) => {
                    persist::write_frame(&frame, path)?;
                    info!(path = %path.display(), "frame saved");
                }
                Sink::Buffer(buffer) => buffer.copy_from(&frame),
                Sink::Allocate => allocate = true,
            }
        }
        Ok(allocate.then_some(frame))
    }

    /// Enable or disable hardware trigger mode.
    ///
    /// The driver's return code for this call is unreliable, so it is handed
    /// back for information and never treated as a failure.
    pub fn enable_trigger(&mut self, enabled: bool) -> Result<Status> {
        let grabber = self.grabber()?;
        if !grabber.is_trigger_available() {
            return Err(CameraError::TriggerUnsupported);
        }
        let status = grabber.enable_trigger(enabled);
        debug!(enabled, %status, "trigger mode set");
        Ok(status)
    }

    /// Fire a software trigger.
    pub fn send_trigger(&mut self) -> Result<()> {
        self.grabber()?
            .software_trigger()
            .map_err(CameraError::TriggerFailed)
    }

    /// Stop streaming if live and release the device.
    ///
    /// Every later call on this session, including `close`, fails with
    /// [`CameraError::SessionClosed`].
    pub fn close(&mut self) -> Result<()> {
        self.stop_live()?;
        if let Some(mut grabber) = self.grabber.take() {
            grabber.release();
        }
        info!(camera = %self.name, "camera closed");
        Ok(())
    }
}

fn check_sink(sink: &Sink<'_>, format: &ImageFormat) -> Result<()> {
    match sink {
        Sink::File(path) => {
            check_output_path(path)?;
            if !persist::ENCODER_AVAILABLE {
                return Err(CameraError::EncoderUnavailable);
            }
        }
        Sink::Buffer(buffer) => {
            if !buffer.has_shape(format.width, format.height) {
                return Err(CameraError::OutputBufferMismatch {
                    width: format.width,
                    height: format.height,
                    actual_width: buffer.width(),
                    actual_height: buffer.height(),
                    actual_len: buffer.samples().len(),
                });
            }
        }
        Sink::Allocate => {}
    }
    Ok(())
}

impl<G: Grabber> Drop for CameraSession<G> {
    fn drop(&mut self) {
        if !self.is_closed() {
            let _ = self.close();
        }
    }
}

impl<G: Grabber> std::fmt::Debug for CameraSession<G> {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("CameraSession")
            .field("name", &self.name)
            .field("live", &self.live)
            .field("closed", &self.is_closed())
            .field("format", &self.format)
            .field("exposure", &self.exposure)
            .finish_non_exhaustive()
    }
}
