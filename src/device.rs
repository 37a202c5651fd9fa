//! `tisgrabber` driver implementation over the runtime-loaded library.

#![allow(unsafe_code)]

use std::ffi::{c_int, c_long, CStr, CString};
use std::ptr;
use std::sync::OnceLock;

use tracing::{debug, info, warn};

use crate::config::DriverConfig;
use crate::error::{CameraError, Result};
use crate::ffi::{RawGrabber, TisLibrary};
use crate::traits::{
    CameraProperty, ColorFormat, Driver, DriverResult, Grabber, ImageDescription, PropertyRange,
    Status,
};

/// Native libraries the driver needs on the search path.
pub const REQUIRED_LIBRARIES: [&str; 3] = [
    "tisgrabber_x64.dll",
    "TIS_DShowLib10_x64.dll",
    "TIS_UDSHL10_x64.dll",
];

static LIBRARY: OnceLock<std::result::Result<Loaded, String>> = OnceLock::new();

struct Loaded {
    name: String,
    library: TisLibrary,
}

/// Handle to the process-wide, initialized `tisgrabber` library.
#[derive(Clone, Copy)]
pub struct TisDriver {
    library: &'static TisLibrary,
}

impl TisDriver {
    /// Load and initialize the driver library.
    ///
    /// The library is loaded and `IC_InitLibrary` is called at most once per
    /// process; later calls return the outcome of the first one, whatever
    /// `config` they pass.
    pub fn init(config: &DriverConfig) -> Result<Self> {
        let loaded = LIBRARY
            .get_or_init(|| load(config))
            .as_ref()
            .map_err(|msg| CameraError::DriverInitFailed(msg.clone()))?;

        if loaded.name != config.library {
            warn!(
                loaded = %loaded.name,
                requested = %config.library,
                "driver library already initialized, ignoring requested library"
            );
        }

        Ok(Self {
            library: &loaded.library,
        })
    }
}

fn load(config: &DriverConfig) -> std::result::Result<Loaded, String> {
    let hint = format!(
        "cameras from The Imaging Source need {} on the library search path",
        REQUIRED_LIBRARIES.join(", ")
    );

    // SAFETY: the configured name points at the vendor's tisgrabber build.
    let library = unsafe { TisLibrary::load(&config.library) }
        .map_err(|err| format!("failed to load {}: {err}; {hint}", config.library))?;

    let key = config
        .license_key
        .as_deref()
        .map(CString::new)
        .transpose()
        .map_err(|_| "license key contains a NUL byte".to_owned())?;
    let key_ptr = key.as_ref().map_or(ptr::null(), |k| k.as_ptr());

    // SAFETY: key_ptr is null or a NUL-terminated string that outlives the call.
    let status = Status(unsafe { (library.init_library)(key_ptr) });
    if !status.is_success() {
        return Err(format!("IC_InitLibrary returned {status}; {hint}"));
    }

    info!(library = %config.library, "driver library initialized");
    Ok(Loaded {
        name: config.library.clone(),
        library,
    })
}

impl Driver for TisDriver {
    type Grabber = TisGrabber;

    fn device_names(&self) -> Vec<String> {
        // SAFETY: the library is initialized.
        let count = unsafe { (self.library.get_device_count)() };
        (0..count.max(0))
            // SAFETY: index is within the reported device count.
            .filter_map(|index| unsafe { owned_string((self.library.get_unique_name_from_list)(index)) })
            .collect()
    }

    fn create_grabber(&self) -> DriverResult<TisGrabber> {
        // SAFETY: the library is initialized.
        let handle = unsafe { (self.library.create_grabber)() };
        if handle.is_null() {
            return Err(Status::NO_HANDLE);
        }
        debug!("grabber created");
        Ok(TisGrabber {
            library: self.library,
            handle,
        })
    }
}

/// One `HGRABBER`, released on drop.
///
/// Holds a raw handle, so it is neither `Send` nor `Sync`.
pub struct TisGrabber {
    library: &'static TisLibrary,
    handle: RawGrabber,
}

impl TisGrabber {
    fn call(&self, f: unsafe extern "system" fn(RawGrabber) -> c_int) -> Status {
        // SAFETY: handle came from IC_CreateGrabber and has not been released.
        Status(unsafe { f(self.handle) })
    }

    fn call_int(&self, f: unsafe extern "system" fn(RawGrabber, c_int) -> c_int, arg: c_int) -> Status {
        // SAFETY: as in `call`.
        Status(unsafe { f(self.handle, arg) })
    }
}

/// Copy a driver-owned C string.
///
/// # Safety
///
/// `ptr` must be null or point to a NUL-terminated string.
unsafe fn owned_string(ptr: *const std::ffi::c_char) -> Option<String> {
    if ptr.is_null() {
        return None;
    }
    Some(CStr::from_ptr(ptr).to_string_lossy().into_owned())
}

fn to_c_long(value: i64) -> DriverResult<c_long> {
    c_long::try_from(value).map_err(|_| Status::ERROR)
}

impl Grabber for TisGrabber {
    fn open_by_unique_name(&mut self, name: &str) -> DriverResult<()> {
        let name = CString::new(name).map_err(|_| Status::ERROR)?;
        // SAFETY: handle is live, name is NUL-terminated.
        Status(unsafe { (self.library.open_dev_by_unique_name)(self.handle, name.as_ptr()) }).check()
    }

    fn is_valid(&self) -> DriverResult<()> {
        self.call(self.library.is_dev_valid).check()
    }

    fn video_formats(&self) -> DriverResult<Vec<String>> {
        let count = self.call(self.library.get_video_format_count);
        if count.0 < 0 {
            return Err(count);
        }
        Ok((0..count.0)
            // SAFETY: index is within the reported format count.
            .filter_map(|index| unsafe { owned_string((self.library.get_video_format)(self.handle, index)) })
            .collect())
    }

    fn set_video_format(&mut self, format: &str) -> DriverResult<()> {
        let format = CString::new(format).map_err(|_| Status::ERROR)?;
        // SAFETY: handle is live, format is NUL-terminated.
        Status(unsafe { (self.library.set_video_format)(self.handle, format.as_ptr()) }).check()
    }

    fn image_description(&self) -> DriverResult<ImageDescription> {
        let (mut width, mut height): (c_long, c_long) = (0, 0);
        let (mut bit_depth, mut color): (c_int, c_int) = (0, 0);
        // SAFETY: handle is live, all out-pointers reference locals.
        let status = Status(unsafe {
            (self.library.get_image_description)(
                self.handle,
                &mut width,
                &mut height,
                &mut bit_depth,
                &mut color,
            )
        });
        status.check()?;
        Ok(ImageDescription {
            width: i64::from(width),
            height: i64::from(height),
            bit_depth,
            color_format: ColorFormat::from_raw(color),
        })
    }

    fn remove_overlay(&mut self) -> DriverResult<()> {
        self.call_int(self.library.remove_overlay, 0).check()
    }

    fn sink_format(&self) -> ColorFormat {
        ColorFormat::from_raw(self.call(self.library.get_format).0)
    }

    fn set_sink_format(&mut self, format: ColorFormat) -> DriverResult<()> {
        self.call_int(self.library.set_format, format.as_raw()).check()
    }

    fn start_live(&mut self) -> DriverResult<()> {
        // 0: no display window.
        self.call_int(self.library.start_live, 0).check()
    }

    fn stop_live(&mut self) {
        // SAFETY: handle is live.
        unsafe { (self.library.stop_live)(self.handle) };
    }

    fn snap_image(&mut self, timeout_ms: i32) -> DriverResult<()> {
        self.call_int(self.library.snap_image, timeout_ms).check()
    }

    fn image_data(&self, len: usize) -> Option<&[u8]> {
        // SAFETY: handle is live.
        let data = unsafe { (self.library.get_image_ptr)(self.handle) };
        if data.is_null() {
            return None;
        }
        // SAFETY: the driver's image buffer holds width * height * bytes per
        // pixel of the current sink format, which is what the session asks
        // for. It stays valid until the next snap, which needs `&mut self`.
        Some(unsafe { std::slice::from_raw_parts(data, len) })
    }

    fn property(&self, property: CameraProperty) -> DriverResult<i64> {
        let mut value: c_long = 0;
        // SAFETY: handle is live, out-pointer references a local.
        Status(unsafe {
            (self.library.get_camera_property)(self.handle, property.as_raw(), &mut value)
        })
        .check()?;
        Ok(i64::from(value))
    }

    fn set_property(&mut self, property: CameraProperty, value: i64) -> DriverResult<()> {
        let value = to_c_long(value)?;
        // SAFETY: handle is live.
        Status(unsafe { (self.library.set_camera_property)(self.handle, property.as_raw(), value) })
            .check()
    }

    fn auto_property(&self, property: CameraProperty) -> DriverResult<bool> {
        let mut enabled: c_int = 0;
        #[allow(clippy::cast_possible_wrap)]
        let raw = property.as_raw() as c_int;
        // SAFETY: handle is live, out-pointer references a local.
        Status(unsafe { (self.library.get_auto_camera_property)(self.handle, raw, &mut enabled) })
            .check()?;
        match enabled {
            0 => Ok(false),
            1 => Ok(true),
            other => {
                warn!(value = other, "driver reported a non-boolean auto property");
                Err(Status::ERROR)
            }
        }
    }

    fn set_auto_property(&mut self, property: CameraProperty, enabled: bool) -> DriverResult<()> {
        #[allow(clippy::cast_possible_wrap)]
        let raw = property.as_raw() as c_int;
        // SAFETY: handle is live.
        Status(unsafe {
            (self.library.enable_auto_camera_property)(self.handle, raw, c_int::from(enabled))
        })
        .check()
    }

    fn property_range(&self, property: CameraProperty) -> DriverResult<PropertyRange> {
        let (mut min, mut max): (c_long, c_long) = (0, 0);
        // SAFETY: handle is live, out-pointers reference locals.
        Status(unsafe {
            (self.library.camera_property_get_range)(self.handle, property.as_raw(), &mut min, &mut max)
        })
        .check()?;
        Ok(PropertyRange {
            min: i64::from(min),
            max: i64::from(max),
        })
    }

    fn is_trigger_available(&self) -> bool {
        self.call(self.library.is_trigger_available).is_success()
    }

    fn enable_trigger(&mut self, enabled: bool) -> Status {
        self.call_int(self.library.enable_trigger, c_int::from(enabled))
    }

    fn software_trigger(&mut self) -> DriverResult<()> {
        self.call(self.library.software_trigger).check()
    }

    fn release(&mut self) {
        if self.handle.is_null() {
            return;
        }
        // SAFETY: handle is live; the driver nulls it through the pointer.
        unsafe { (self.library.release_grabber)(&mut self.handle) };
        self.handle = ptr::null_mut();
        debug!("grabber released");
    }
}

impl Drop for TisGrabber {
    fn drop(&mut self) {
        self.release();
    }
}
