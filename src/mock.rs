//! Mock driver for testing without hardware.
//!
//! Simulates a DMK 33GP031 closely enough to exercise the driver quirks the
//! session has to work around: the sink format can only be set while stopped
//! and after the overlay is removed, and the driver only reports the new sink
//! format once streaming has been started and stopped.

use std::cell::RefCell;
use std::collections::HashSet;
use std::rc::Rc;

use crate::traits::{
    CameraProperty, ColorFormat, Driver, DriverResult, Grabber, ImageDescription, PropertyRange,
    Status,
};
use crate::validation::format_resolution;

/// Unique name the mock camera reports.
pub const MOCK_CAMERA: &str = "DMK 33GP031 41610001";

/// Observable state of the simulated camera.
#[derive(Debug)]
pub struct MockState {
    /// Device names returned by enumeration.
    pub devices: Vec<String>,
    /// Supported video formats.
    pub formats: Vec<String>,
    /// Device that was opened, if any.
    pub opened: Option<String>,
    /// Current video format.
    pub video_format: Option<String>,
    /// Whether the overlay has been removed.
    pub overlay_removed: bool,
    /// Sink format last set.
    pub sink_format: ColorFormat,
    /// Sink format the driver reports; refreshed when live starts.
    pub reported_sink_format: ColorFormat,
    /// Reported sink format no longer follows live starts.
    pub sink_format_frozen: bool,
    /// Whether the device is streaming.
    pub live: bool,
    /// Exposure in microseconds.
    pub exposure_us: i64,
    /// Whether auto exposure is on.
    pub auto_exposure: bool,
    /// Auto exposure refuses to turn off.
    pub auto_exposure_stuck: bool,
    /// Exposure range in microseconds.
    pub exposure_range: PropertyRange,
    /// Exposure granularity in microseconds; set values are rounded down.
    pub exposure_step: i64,
    /// Whether a hardware trigger exists.
    pub trigger_available: bool,
    /// Whether trigger mode is on.
    pub trigger_enabled: bool,
    /// Number of software triggers fired.
    pub software_triggers: u32,
    /// Number of successful snaps.
    pub snaps: u32,
    /// Whether the grabber was released.
    pub released: bool,
    /// Entry points that fail on their next calls.
    pub failing: HashSet<&'static str>,
    /// Every driver call, in order.
    pub calls: Vec<&'static str>,
}

impl Default for MockState {
    fn default() -> Self {
        Self {
            devices: vec!["DFK 23G445 1".to_owned(), MOCK_CAMERA.to_owned()],
            formats: [
                "Y800 (2592x1944)",
                "Y16 (2592x1944)",
                "Y800 (1024x768)",
                "Y16 (1024x768)",
                "Y16 (8x4)",
            ]
            .iter()
            .map(|fmt| (*fmt).to_owned())
            .collect(),
            opened: None,
            video_format: None,
            overlay_removed: false,
            sink_format: ColorFormat::Y800,
            reported_sink_format: ColorFormat::Y800,
            sink_format_frozen: false,
            live: false,
            exposure_us: 33_333,
            auto_exposure: true,
            auto_exposure_stuck: false,
            exposure_range: PropertyRange {
                min: 100,
                max: 30_000_000,
            },
            exposure_step: 10,
            trigger_available: true,
            trigger_enabled: false,
            software_triggers: 0,
            snaps: 0,
            released: false,
            failing: HashSet::new(),
            calls: Vec::new(),
        }
    }
}

impl MockState {
    /// How often `call` was made.
    pub fn count(&self, call: &str) -> usize {
        self.calls.iter().filter(|c| **c == call).count()
    }

    /// Raw 16-bit word the sensor produces at a pixel: a 12-bit ramp in the
    /// upper bits, with the padding nibble set so normalization is visible.
    pub fn raw_sample(x: u32, y: u32, width: u32, snap: u32) -> u16 {
        #[allow(clippy::cast_possible_truncation)]
        let value = ((y * width + x + snap) % 4096) as u16;
        (value << 4) | 0x000F
    }

    fn record(&mut self, call: &'static str) -> DriverResult<()> {
        self.calls.push(call);
        if self.failing.contains(call) {
            Err(Status::ERROR)
        } else {
            Ok(())
        }
    }

    fn resolution(&self) -> (u32, u32) {
        self.video_format
            .as_deref()
            .and_then(format_resolution)
            .unwrap_or((0, 0))
    }
}

/// Mock driver; grabbers it creates share its state.
#[derive(Debug, Clone, Default)]
pub struct MockDriver {
    state: Rc<RefCell<MockState>>,
}

impl MockDriver {
    /// Create a mock driver with one supported camera attached.
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Replace the enumerated device names.
    #[must_use]
    pub fn with_devices(self, devices: &[&str]) -> Self {
        self.state.borrow_mut().devices = devices.iter().map(|d| (*d).to_owned()).collect();
        self
    }

    /// Make `call` fail until cleared.
    pub fn fail(&self, call: &'static str) {
        self.state.borrow_mut().failing.insert(call);
    }

    /// Stop failing `call`.
    pub fn clear_failure(&self, call: &'static str) {
        self.state.borrow_mut().failing.remove(call);
    }

    /// Shared simulated state.
    pub fn state(&self) -> std::cell::RefMut<'_, MockState> {
        self.state.borrow_mut()
    }
}

impl Driver for MockDriver {
    type Grabber = MockGrabber;

    fn device_names(&self) -> Vec<String> {
        let mut state = self.state.borrow_mut();
        state.calls.push("IC_GetDeviceCount");
        state.devices.clone()
    }

    fn create_grabber(&self) -> DriverResult<MockGrabber> {
        self.state.borrow_mut().record("IC_CreateGrabber")?;
        Ok(MockGrabber {
            state: Rc::clone(&self.state),
            image: Vec::new(),
        })
    }
}

/// Mock grabber.
#[derive(Debug)]
pub struct MockGrabber {
    state: Rc<RefCell<MockState>>,
    image: Vec<u8>,
}

impl MockGrabber {
    fn with<T, F>(&self, call: &'static str, f: F) -> DriverResult<T>
    where
        F: FnOnce(&mut MockState) -> DriverResult<T>,
    {
        let mut state = self.state.borrow_mut();
        state.record(call)?;
        f(&mut state)
    }
}

impl Grabber for MockGrabber {
    fn open_by_unique_name(&mut self, name: &str) -> DriverResult<()> {
        self.with("IC_OpenDevByUniqueName", |state| {
            if !state.devices.iter().any(|d| d == name) {
                return Err(Status::NO_DEVICE);
            }
            state.opened = Some(name.to_owned());
            Ok(())
        })
    }

    fn is_valid(&self) -> DriverResult<()> {
        self.with("IC_IsDevValid", |state| {
            state.opened.as_ref().map(|_| ()).ok_or(Status::NO_DEVICE)
        })
    }

    fn video_formats(&self) -> DriverResult<Vec<String>> {
        self.with("IC_GetVideoFormat", |state| Ok(state.formats.clone()))
    }

    fn set_video_format(&mut self, format: &str) -> DriverResult<()> {
        self.with("IC_SetVideoFormat", |state| {
            if !state.formats.iter().any(|f| f == format) {
                return Err(Status::ERROR);
            }
            state.video_format = Some(format.to_owned());
            Ok(())
        })
    }

    fn image_description(&self) -> DriverResult<ImageDescription> {
        self.with("IC_GetImageDescription", |state| {
            let (width, height) = state.resolution();
            let bit_depth = if state.reported_sink_format == ColorFormat::Y16 { 16 } else { 8 };
            Ok(ImageDescription {
                width: i64::from(width),
                height: i64::from(height),
                bit_depth,
                color_format: state.reported_sink_format,
            })
        })
    }

    fn remove_overlay(&mut self) -> DriverResult<()> {
        self.with("IC_RemoveOverlay", |state| {
            state.overlay_removed = true;
            Ok(())
        })
    }

    fn sink_format(&self) -> ColorFormat {
        let mut state = self.state.borrow_mut();
        state.calls.push("IC_GetFormat");
        state.reported_sink_format
    }

    fn set_sink_format(&mut self, format: ColorFormat) -> DriverResult<()> {
        self.with("IC_SetFormat", |state| {
            if state.live {
                return Err(Status::NOT_AVAILABLE);
            }
            if format == ColorFormat::Y16 && !state.overlay_removed {
                return Err(Status::ERROR);
            }
            state.sink_format = format;
            Ok(())
        })
    }

    fn start_live(&mut self) -> DriverResult<()> {
        self.with("IC_StartLive", |state| {
            if state.video_format.is_none() {
                return Err(Status::ERROR);
            }
            state.live = true;
            if !state.sink_format_frozen {
                state.reported_sink_format = state.sink_format;
            }
            Ok(())
        })
    }

    fn stop_live(&mut self) {
        let mut state = self.state.borrow_mut();
        state.calls.push("IC_StopLive");
        state.live = false;
    }

    fn snap_image(&mut self, _timeout_ms: i32) -> DriverResult<()> {
        let image: Vec<u8> = self.with("IC_SnapImage", |state| {
            if !state.live {
                return Err(Status::NOT_AVAILABLE);
            }
            let (width, height) = state.resolution();
            let snap = state.snaps;
            state.snaps += 1;
            Ok((0..height)
                .flat_map(|y| (0..width).map(move |x| (x, y)))
                .flat_map(|(x, y)| MockState::raw_sample(x, y, width, snap).to_ne_bytes())
                .collect())
        })?;
        self.image = image;
        Ok(())
    }

    fn image_data(&self, len: usize) -> Option<&[u8]> {
        self.state.borrow_mut().calls.push("IC_GetImagePtr");
        self.image.get(..len)
    }

    fn property(&self, property: CameraProperty) -> DriverResult<i64> {
        self.with("IC_GetCameraProperty", |state| match property {
            CameraProperty::Exposure => Ok(state.exposure_us),
        })
    }

    fn set_property(&mut self, property: CameraProperty, value: i64) -> DriverResult<()> {
        self.with("IC_SetCameraProperty", |state| match property {
            CameraProperty::Exposure => {
                if state.auto_exposure {
                    return Err(Status::NOT_AVAILABLE);
                }
                state.exposure_us = value - value % state.exposure_step;
                Ok(())
            }
        })
    }

    fn auto_property(&self, _property: CameraProperty) -> DriverResult<bool> {
        self.with("IC_GetAutoCameraProperty", |state| Ok(state.auto_exposure))
    }

    fn set_auto_property(&mut self, _property: CameraProperty, enabled: bool) -> DriverResult<()> {
        self.with("IC_EnableAutoCameraProperty", |state| {
            if !state.auto_exposure_stuck {
                state.auto_exposure = enabled;
            }
            Ok(())
        })
    }

    fn property_range(&self, _property: CameraProperty) -> DriverResult<PropertyRange> {
        self.with("IC_CameraPropertyGetRange", |state| Ok(state.exposure_range))
    }

    fn is_trigger_available(&self) -> bool {
        let mut state = self.state.borrow_mut();
        state.calls.push("IC_IsTriggerAvailable");
        state.trigger_available
    }

    fn enable_trigger(&mut self, enabled: bool) -> Status {
        let mut state = self.state.borrow_mut();
        state.calls.push("IC_EnableTrigger");
        state.trigger_enabled = enabled;
        // The real driver does not return IC_SUCCESS here either.
        Status(0)
    }

    fn software_trigger(&mut self) -> DriverResult<()> {
        self.with("IC_SoftwareTrigger", |state| {
            state.software_triggers += 1;
            Ok(())
        })
    }

    fn release(&mut self) {
        let mut state = self.state.borrow_mut();
        if !state.released {
            state.calls.push("IC_ReleaseGrabber");
            state.released = true;
        }
    }
}

impl Drop for MockGrabber {
    fn drop(&mut self) {
        self.release();
    }
}
