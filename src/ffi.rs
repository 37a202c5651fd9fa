//! Runtime-loaded `tisgrabber` entry points.
//!
//! Signatures follow `tisgrabber.h`. `long` is `c_long` so the table matches
//! the platform the library was built for.

#![allow(unsafe_code)]

use std::ffi::{c_char, c_int, c_long, c_uint, c_void};

use libloading::Library;

/// Opaque `HGRABBER`.
pub type RawGrabber = *mut c_void;

type InitLibraryFn = unsafe extern "system" fn(*const c_char) -> c_int;
type CountFn = unsafe extern "system" fn() -> c_int;
type NameFromListFn = unsafe extern "system" fn(c_int) -> *const c_char;
type CreateGrabberFn = unsafe extern "system" fn() -> RawGrabber;
type GrabberStrFn = unsafe extern "system" fn(RawGrabber, *const c_char) -> c_int;
type GrabberFn = unsafe extern "system" fn(RawGrabber) -> c_int;
type GrabberIntFn = unsafe extern "system" fn(RawGrabber, c_int) -> c_int;
type GrabberIndexStrFn = unsafe extern "system" fn(RawGrabber, c_int) -> *const c_char;
type ImageDescriptionFn =
    unsafe extern "system" fn(RawGrabber, *mut c_long, *mut c_long, *mut c_int, *mut c_int) -> c_int;
type ImagePtrFn = unsafe extern "system" fn(RawGrabber) -> *mut u8;
type StopLiveFn = unsafe extern "system" fn(RawGrabber);
type ReleaseGrabberFn = unsafe extern "system" fn(*mut RawGrabber);
type GetPropertyFn = unsafe extern "system" fn(RawGrabber, c_uint, *mut c_long) -> c_int;
type SetPropertyFn = unsafe extern "system" fn(RawGrabber, c_uint, c_long) -> c_int;
type GetAutoPropertyFn = unsafe extern "system" fn(RawGrabber, c_int, *mut c_int) -> c_int;
type SetAutoPropertyFn = unsafe extern "system" fn(RawGrabber, c_int, c_int) -> c_int;
type PropertyRangeFn =
    unsafe extern "system" fn(RawGrabber, c_uint, *mut c_long, *mut c_long) -> c_int;

unsafe fn symbol<T: Copy>(library: &Library, name: &str) -> Result<T, libloading::Error> {
    Ok(*library.get::<T>(name.as_bytes())?)
}

/// Function table of a loaded `tisgrabber` library.
///
/// The `Library` is kept alive for as long as the table exists; the function
/// pointers are only valid while it is loaded.
pub struct TisLibrary {
    pub init_library: InitLibraryFn,
    pub get_device_count: CountFn,
    pub get_unique_name_from_list: NameFromListFn,
    pub create_grabber: CreateGrabberFn,
    pub open_dev_by_unique_name: GrabberStrFn,
    pub is_dev_valid: GrabberFn,
    pub get_video_format_count: GrabberFn,
    pub get_video_format: GrabberIndexStrFn,
    pub set_video_format: GrabberStrFn,
    pub get_image_description: ImageDescriptionFn,
    pub remove_overlay: GrabberIntFn,
    pub get_format: GrabberFn,
    pub set_format: GrabberIntFn,
    pub start_live: GrabberIntFn,
    pub stop_live: StopLiveFn,
    pub snap_image: GrabberIntFn,
    pub get_image_ptr: ImagePtrFn,
    pub release_grabber: ReleaseGrabberFn,
    pub get_camera_property: GetPropertyFn,
    pub set_camera_property: SetPropertyFn,
    pub get_auto_camera_property: GetAutoPropertyFn,
    pub enable_auto_camera_property: SetAutoPropertyFn,
    pub camera_property_get_range: PropertyRangeFn,
    pub is_trigger_available: GrabberFn,
    pub enable_trigger: GrabberIntFn,
    pub software_trigger: GrabberFn,
    _library: Library,
}

impl TisLibrary {
    /// Load the library by its base name (`tisgrabber_x64` -> `tisgrabber_x64.dll`).
    ///
    /// # Safety
    ///
    /// Loading runs the library's initialization routines; the library must be
    /// a genuine `tisgrabber` build whose exports match the signatures above.
    pub unsafe fn load(name: &str) -> Result<Self, libloading::Error> {
        let library = Library::new(libloading::library_filename(name))?;
        Ok(Self {
            init_library: symbol(&library, "IC_InitLibrary")?,
            get_device_count: symbol(&library, "IC_GetDeviceCount")?,
            get_unique_name_from_list: symbol(&library, "IC_GetUniqueNamefromList")?,
            create_grabber: symbol(&library, "IC_CreateGrabber")?,
            open_dev_by_unique_name: symbol(&library, "IC_OpenDevByUniqueName")?,
            is_dev_valid: symbol(&library, "IC_IsDevValid")?,
            get_video_format_count: symbol(&library, "IC_GetVideoFormatCount")?,
            get_video_format: symbol(&library, "IC_GetVideoFormat")?,
            set_video_format: symbol(&library, "IC_SetVideoFormat")?,
            get_image_description: symbol(&library, "IC_GetImageDescription")?,
            remove_overlay: symbol(&library, "IC_RemoveOverlay")?,
            get_format: symbol(&library, "IC_GetFormat")?,
            set_format: symbol(&library, "IC_SetFormat")?,
            start_live: symbol(&library, "IC_StartLive")?,
            stop_live: symbol(&library, "IC_StopLive")?,
            snap_image: symbol(&library, "IC_SnapImage")?,
            get_image_ptr: symbol(&library, "IC_GetImagePtr")?,
            release_grabber: symbol(&library, "IC_ReleaseGrabber")?,
            get_camera_property: symbol(&library, "IC_GetCameraProperty")?,
            set_camera_property: symbol(&library, "IC_SetCameraProperty")?,
            get_auto_camera_property: symbol(&library, "IC_GetAutoCameraProperty")?,
            enable_auto_camera_property: symbol(&library, "IC_EnableAutoCameraProperty")?,
            camera_property_get_range: symbol(&library, "IC_CameraPropertyGetRange")?,
            is_trigger_available: symbol(&library, "IC_IsTriggerAvailable")?,
            enable_trigger: symbol(&library, "IC_EnableTrigger")?,
            software_trigger: symbol(&library, "IC_SoftwareTrigger")?,
            _library: library,
        })
    }
}
