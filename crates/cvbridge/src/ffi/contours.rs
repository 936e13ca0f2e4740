//! Contour sets across the boundary
//!
//! A [`ContourSet`] is a pointer-of-pointers layout: `contours[i]` points
//! to `2 * sizes[i]` interleaved `x, y` integers. The full shape is
//! computed before anything is handed out, so a set is either complete or
//! empty. `cvb_free_contours` releases every inner array, then the outer
//! array, then the sizes array: `count + 2` deallocations in total.

use std::ptr;
use std::slice;

use cvbridge_ffi_common::{deref_mut_or_return, deref_or_return, free_boxed_slice, vec_into_raw};

use super::guarded;
use crate::imgproc::contours::{self, Points};
use crate::imgproc::draw::{self, Color};
use crate::mat::Mat;

/// C-compatible contour collection
#[repr(C)]
#[derive(Debug)]
pub struct ContourSet {
    /// False when the input handle was NULL or the parameters were
    /// rejected. An image without contours is a success with `count == 0`.
    pub success: bool,
    /// One `x, y, x, y, ...` array per contour (owned)
    pub contours: *mut *mut i32,
    /// Point count of each contour (owned)
    pub sizes: *mut usize,
    /// Number of contours
    pub count: usize,
}

impl ContourSet {
    fn failed() -> Self {
        Self {
            success: false,
            contours: ptr::null_mut(),
            sizes: ptr::null_mut(),
            count: 0,
        }
    }

    /// Flatten traced contours. Empty contours are never produced by the
    /// tracer, so every inner pointer is non-null.
    fn from_points(traced: Vec<Points>) -> Self {
        let sizes: Vec<usize> = traced.iter().map(Vec::len).collect();
        let inner: Vec<*mut i32> = traced
            .into_iter()
            .map(|points| {
                let flat: Vec<i32> = points.into_iter().flat_map(|(x, y)| [x, y]).collect();
                vec_into_raw(flat).0
            })
            .collect();
        let (contours, count) = vec_into_raw(inner);
        let (sizes, _) = vec_into_raw(sizes);
        Self {
            success: true,
            contours,
            sizes,
            count,
        }
    }

    /// Rebuild owned point lists from a set handed back by the caller.
    ///
    /// # Safety
    /// `self` must have been returned by `cvb_find_contours` and not yet
    /// freed.
    unsafe fn to_points(&self) -> Vec<Points> {
        if self.count == 0 || self.contours.is_null() || self.sizes.is_null() {
            return Vec::new();
        }
        let outer = unsafe { slice::from_raw_parts(self.contours, self.count) };
        let sizes = unsafe { slice::from_raw_parts(self.sizes, self.count) };
        outer
            .iter()
            .zip(sizes)
            .map(|(&inner, &n)| {
                let flat = unsafe { cvbridge_ffi_common::slice_or_empty(inner, n * 2) };
                flat.chunks_exact(2).map(|p| (p[0], p[1])).collect()
            })
            .collect()
    }
}

/// Trace the contours of a single-channel binary image.
///
/// `mode` is an OpenCV retrieval mode (0 external, 1 list, 2 ccomp,
/// 3 tree), `method` an approximation method (1 none, 2 simple).
///
/// # Returns
/// A set owned by the caller, to be freed with `cvb_free_contours`. An
/// image without contours gives `{success: true, NULL, NULL, 0}`.
#[no_mangle]
pub extern "C" fn cvb_find_contours(mat: *const Mat, mode: i32, method: i32) -> ContourSet {
    let mat = deref_or_return!(mat, Mat, ContourSet::failed());
    guarded("find_contours", ContourSet::failed(), || {
        contours::find_contours(mat, mode, method).map(ContourSet::from_points)
    })
}

/// Free a set returned by `cvb_find_contours`.
///
/// Inner arrays go first; their addresses live in the outer array.
#[no_mangle]
#[allow(clippy::not_unsafe_ptr_arg_deref)]
pub extern "C" fn cvb_free_contours(set: ContourSet) {
    if set.count == 0 {
        return;
    }
    unsafe {
        if !set.contours.is_null() && !set.sizes.is_null() {
            let outer = slice::from_raw_parts(set.contours, set.count);
            let sizes = slice::from_raw_parts(set.sizes, set.count);
            for (&inner, &n) in outer.iter().zip(sizes) {
                free_boxed_slice(inner, n * 2);
            }
        }
        free_boxed_slice(set.contours, set.count);
        free_boxed_slice(set.sizes, set.count);
    }
}

/// Draw contour `index` of `set` into `mat`, or all of them for -1.
///
/// Color is given as red, green, blue. `thickness < 0` fills. The set is
/// only read; the caller still frees it.
#[no_mangle]
#[allow(clippy::not_unsafe_ptr_arg_deref, clippy::too_many_arguments)]
pub extern "C" fn cvb_draw_contours(
    mat: *mut Mat,
    set: ContourSet,
    index: i32,
    r: i32,
    g: i32,
    b: i32,
    thickness: i32,
) {
    let mat = deref_mut_or_return!(mat, Mat, ());
    if set.count == 0 {
        return;
    }
    let points = unsafe { set.to_points() };
    guarded("draw_contours", (), || {
        draw::draw_contours(mat, &points, index, Color::from_rgb(r, g, b), thickness)
    })
}
