//! C ABI for gingham.
//!
//! Images are registered once and referenced by an opaque `int64_t` handle:
//!
//! ```c
//! int64_t img = gingham_image_create(width, height, pixels, width * height);
//! GinghamPointArray pts;
//! if (gingham_detect_chessboard(img, true, 1, true, &pts) == GINGHAM_STATUS_OK) {
//!     for (size_t i = 0; i < pts.len; ++i) use(pts.points[i]);
//!     gingham_point_array_free(&pts);
//! } else {
//!     fprintf(stderr, "%s\n", gingham_last_error_message());
//! }
//! gingham_image_release(img);
//! ```
//!
//! Handles are never reused, so a released or made-up handle is reported as
//! `GINGHAM_STATUS_INVALID_HANDLE`. All point arrays are allocated by Rust and
//! must be released with [`gingham_point_array_free`].

#![allow(unsafe_op_in_unsafe_fn)]

use std::cell::RefCell;
use std::collections::HashMap;
use std::ffi::{c_char, CString};
use std::ptr;
use std::sync::atomic::{AtomicI64, Ordering};
use std::sync::{Arc, Mutex, MutexGuard, OnceLock};

use gingham::{DetectError, GrayImage, PointWithRefinement};

/// Result code of every fallible call.
#[repr(C)]
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum GinghamStatus {
    Ok = 0,
    /// The handle was never issued or has been released.
    InvalidHandle = 1,
    NullPointer = 2,
    /// Negative blur radius, or an image too small to search.
    InvalidArgument = 3,
    DetectionFailed = 4,
}

/// One chessboard corner in full-resolution pixel coordinates.
#[repr(C)]
#[derive(Clone, Copy, Debug, PartialEq)]
pub struct GinghamPoint {
    pub x: f64,
    pub y: f64,
    /// Number of coarse-to-fine passes applied; 0 is the raw detection.
    pub refinement_level: i32,
}

/// Rust-owned array of points. `points` is NULL when `len` is 0.
#[repr(C)]
#[derive(Debug)]
pub struct GinghamPointArray {
    pub points: *mut GinghamPoint,
    pub len: usize,
}

impl GinghamPointArray {
    fn empty() -> Self {
        Self {
            points: ptr::null_mut(),
            len: 0,
        }
    }

    fn from_points(points: &[PointWithRefinement]) -> Self {
        if points.is_empty() {
            return Self::empty();
        }
        let boxed: Box<[GinghamPoint]> = points.iter().map(GinghamPoint::from).collect();
        let len = boxed.len();
        Self {
            points: Box::into_raw(boxed) as *mut GinghamPoint,
            len,
        }
    }
}

impl From<&PointWithRefinement> for GinghamPoint {
    fn from(p: &PointWithRefinement) -> Self {
        Self {
            x: p.x,
            y: p.y,
            refinement_level: p.refinement_level,
        }
    }
}

static IMAGES: OnceLock<Mutex<HashMap<i64, Arc<GrayImage>>>> = OnceLock::new();
static NEXT_HANDLE: AtomicI64 = AtomicI64::new(1);

thread_local! {
    static LAST_ERROR: RefCell<Option<CString>> = const { RefCell::new(None) };
}

fn images() -> MutexGuard<'static, HashMap<i64, Arc<GrayImage>>> {
    // The map is only ever inserted into or removed from, so a poisoned lock
    // still holds consistent data.
    IMAGES
        .get_or_init(Default::default)
        .lock()
        .unwrap_or_else(|poisoned| poisoned.into_inner())
}

fn lookup(handle: i64) -> Option<Arc<GrayImage>> {
    images().get(&handle).cloned()
}

fn set_last_error(msg: impl Into<String>) {
    let msg = msg.into();
    log::debug!("gingham-ffi: {msg}");
    let c = CString::new(msg.replace('\0', " ")).unwrap_or_default();
    LAST_ERROR.with(|slot| *slot.borrow_mut() = Some(c));
}

fn clear_last_error() {
    LAST_ERROR.with(|slot| *slot.borrow_mut() = None);
}

fn fail(status: GinghamStatus, msg: impl Into<String>) -> GinghamStatus {
    set_last_error(msg);
    status
}

fn status_of(err: &DetectError) -> GinghamStatus {
    match err {
        DetectError::NegativeBlurRadius(_) | DetectError::ImageTooSmall { .. } => {
            GinghamStatus::InvalidArgument
        }
        _ => GinghamStatus::DetectionFailed,
    }
}

/// Copy a row-major 8-bit grayscale buffer into the registry.
///
/// Returns a positive handle, or 0 when `pixels` is NULL or `len` does not
/// equal `width * height`.
///
/// # Safety
/// `pixels` must point to at least `len` readable bytes.
#[unsafe(no_mangle)]
pub unsafe extern "C" fn gingham_image_create(
    width: u32,
    height: u32,
    pixels: *const u8,
    len: usize,
) -> i64 {
    if pixels.is_null() {
        set_last_error("pixel buffer is NULL");
        return 0;
    }
    let data = std::slice::from_raw_parts(pixels, len);
    match gingham::detect::gray_image_from_slice(width as usize, height as usize, data) {
        Ok(img) => {
            let handle = NEXT_HANDLE.fetch_add(1, Ordering::Relaxed);
            images().insert(handle, Arc::new(img));
            clear_last_error();
            handle
        }
        Err(err) => {
            set_last_error(err.to_string());
            0
        }
    }
}

/// Drop an image. Detections already running on it finish normally.
#[unsafe(no_mangle)]
pub extern "C" fn gingham_image_release(handle: i64) -> GinghamStatus {
    match images().remove(&handle) {
        Some(_) => {
            clear_last_error();
            GinghamStatus::Ok
        }
        None => fail(
            GinghamStatus::InvalidHandle,
            format!("unknown image handle {handle}"),
        ),
    }
}

/// Detect the default 7x7-corner chessboard in a registered image.
///
/// On `GINGHAM_STATUS_OK`, `*out` holds the corners (empty when no board was
/// found). On any other status `*out` is set to an empty array and
/// [`gingham_last_error_message`] describes the failure.
///
/// # Safety
/// `out` must be NULL or point to writable memory for a `GinghamPointArray`.
/// Any array previously stored there is overwritten, not freed.
#[unsafe(no_mangle)]
pub unsafe extern "C" fn gingham_detect_chessboard(
    image_handle: i64,
    do_contrast_enhancement: bool,
    blur_radius: i32,
    do_subpixel_refinement: bool,
    out: *mut GinghamPointArray,
) -> GinghamStatus {
    if out.is_null() {
        return fail(GinghamStatus::NullPointer, "output array pointer is NULL");
    }
    out.write(GinghamPointArray::empty());

    let Some(image) = lookup(image_handle) else {
        return fail(
            GinghamStatus::InvalidHandle,
            format!("unknown image handle {image_handle}"),
        );
    };

    match gingham::detect_chessboard(
        &image,
        do_contrast_enhancement,
        blur_radius,
        do_subpixel_refinement,
    ) {
        Ok(points) => {
            out.write(GinghamPointArray::from_points(&points));
            clear_last_error();
            GinghamStatus::Ok
        }
        Err(err) => fail(status_of(&err), err.to_string()),
    }
}

/// Release the points of an array filled by [`gingham_detect_chessboard`]
/// and reset it to empty. NULL and empty arrays are ignored.
///
/// # Safety
/// `array` must be NULL or point to an array produced by this library that
/// has not been freed yet.
#[unsafe(no_mangle)]
pub unsafe extern "C" fn gingham_point_array_free(array: *mut GinghamPointArray) {
    if array.is_null() {
        return;
    }
    let a = &mut *array;
    if !a.points.is_null() {
        let _ = Box::from_raw(ptr::slice_from_raw_parts_mut(a.points, a.len));
    }
    a.points = ptr::null_mut();
    a.len = 0;
}

/// Message of the last failed call on this thread, or NULL.
///
/// The string is owned by the library and stays valid until the next
/// `gingham_*` call on the same thread.
#[unsafe(no_mangle)]
pub extern "C" fn gingham_last_error_message() -> *const c_char {
    LAST_ERROR.with(|slot| {
        slot.borrow()
            .as_ref()
            .map_or(ptr::null(), |msg| msg.as_ptr())
    })
}
