//! Transform and drawing entry points
//!
//! Every transform borrows its input and returns a new handle owned by the
//! caller, or NULL on a NULL input or rejected parameters. Enum-like
//! parameters use the OpenCV numbering. Drawing calls paint into the
//! buffer they are given and return nothing.

use cvbridge_ffi_common::deref_mut_or_return;

use super::{guarded, transform};
use crate::imgproc::draw::{self, Color};
use crate::imgproc::{color, denoise, filter, geometry, histogram, morph, threshold};
use crate::mat::Mat;

// ============================================================================
// Color Conversion
// ============================================================================

/// BGR(A) to single-channel gray.
#[no_mangle]
pub extern "C" fn cvb_to_gray(src: *const Mat) -> *mut Mat {
    transform("to_gray", src, color::bgr_to_gray)
}

/// BGR(A) to RGB.
#[no_mangle]
pub extern "C" fn cvb_to_rgb(src: *const Mat) -> *mut Mat {
    transform("to_rgb", src, color::bgr_to_rgb)
}

/// BGR(A) to HSV with hue halved into 0..180.
#[no_mangle]
pub extern "C" fn cvb_to_hsv(src: *const Mat) -> *mut Mat {
    transform("to_hsv", src, color::bgr_to_hsv)
}

#[no_mangle]
pub extern "C" fn cvb_hsv_to_bgr(src: *const Mat) -> *mut Mat {
    transform("hsv_to_bgr", src, color::hsv_to_bgr)
}

/// BGR(A) to 8-bit Lab.
#[no_mangle]
pub extern "C" fn cvb_to_lab(src: *const Mat) -> *mut Mat {
    transform("to_lab", src, color::bgr_to_lab)
}

#[no_mangle]
pub extern "C" fn cvb_lab_to_bgr(src: *const Mat) -> *mut Mat {
    transform("lab_to_bgr", src, color::lab_to_bgr)
}

/// Conversion by OpenCV `COLOR_*` code: 4 (BGR2RGB), 6 (BGR2GRAY),
/// 8 (GRAY2BGR), 36/38 (YCrCb), 40/54 (HSV), 44/56 (Lab).
#[no_mangle]
pub extern "C" fn cvb_cvt_color(src: *const Mat, code: i32) -> *mut Mat {
    transform("cvt_color", src, |m| color::cvt_color(m, code))
}

// ============================================================================
// Geometry
// ============================================================================

#[no_mangle]
pub extern "C" fn cvb_resize(
    src: *const Mat,
    width: i32,
    height: i32,
    interpolation: i32,
) -> *mut Mat {
    transform("resize", src, |m| geometry::resize(m, width, height, interpolation))
}

/// `mode` 0 flips around the x axis, positive around y, negative both.
#[no_mangle]
pub extern "C" fn cvb_flip(src: *const Mat, mode: i32) -> *mut Mat {
    transform("flip", src, |m| geometry::flip(m, mode))
}

/// `code` 0 rotates 90° clockwise, 1 by 180°, 2 90° counterclockwise.
#[no_mangle]
pub extern "C" fn cvb_rotate(src: *const Mat, code: i32) -> *mut Mat {
    transform("rotate", src, |m| geometry::rotate(m, code))
}

// ============================================================================
// Filters
// ============================================================================
//
// Kernel sizes that must be odd are promoted: an even `ksize` behaves as
// `ksize + 1`.

#[no_mangle]
pub extern "C" fn cvb_gaussian_blur(src: *const Mat, ksize: i32, sigma: f64) -> *mut Mat {
    transform("gaussian_blur", src, |m| filter::gaussian_blur(m, ksize, sigma))
}

#[no_mangle]
pub extern "C" fn cvb_median_blur(src: *const Mat, ksize: i32) -> *mut Mat {
    transform("median_blur", src, |m| filter::median_blur(m, ksize))
}

#[no_mangle]
pub extern "C" fn cvb_bilateral_filter(
    src: *const Mat,
    d: i32,
    sigma_color: f64,
    sigma_space: f64,
) -> *mut Mat {
    transform("bilateral_filter", src, |m| {
        filter::bilateral_filter(m, d, sigma_color, sigma_space)
    })
}

/// Edge map (0 or 255); color input is converted to gray first.
#[no_mangle]
pub extern "C" fn cvb_canny(src: *const Mat, threshold1: f64, threshold2: f64) -> *mut Mat {
    transform("canny", src, |m| filter::canny(m, threshold1, threshold2))
}

/// Derivative saturated to 8 bits; negative responses become 0.
#[no_mangle]
pub extern "C" fn cvb_sobel(src: *const Mat, dx: i32, dy: i32, ksize: i32) -> *mut Mat {
    transform("sobel", src, |m| filter::sobel(m, dx, dy, ksize))
}

#[no_mangle]
pub extern "C" fn cvb_laplacian(src: *const Mat, ksize: i32) -> *mut Mat {
    transform("laplacian", src, |m| filter::laplacian(m, ksize))
}

#[no_mangle]
pub extern "C" fn cvb_sharpen(src: *const Mat) -> *mut Mat {
    transform("sharpen", src, filter::sharpen)
}

// ============================================================================
// Morphology
// ============================================================================

#[no_mangle]
pub extern "C" fn cvb_erode(src: *const Mat, ksize: i32, iterations: i32) -> *mut Mat {
    transform("erode", src, |m| morph::erode(m, ksize, iterations))
}

#[no_mangle]
pub extern "C" fn cvb_dilate(src: *const Mat, ksize: i32, iterations: i32) -> *mut Mat {
    transform("dilate", src, |m| morph::dilate(m, ksize, iterations))
}

/// `op`: 0 erode, 1 dilate, 2 open, 3 close, 4 gradient, 5 top hat,
/// 6 black hat.
#[no_mangle]
pub extern "C" fn cvb_morphology_ex(src: *const Mat, op: i32, ksize: i32) -> *mut Mat {
    transform("morphology_ex", src, |m| morph::morphology_ex(m, op, ksize))
}

// ============================================================================
// Thresholding
// ============================================================================

/// `kind` 0..4 (binary, binary inv, trunc, to zero, to zero inv),
/// optionally OR'ed with 8 for Otsu's threshold.
#[no_mangle]
pub extern "C" fn cvb_threshold(src: *const Mat, thresh: f64, maxval: f64, kind: i32) -> *mut Mat {
    transform("threshold", src, |m| threshold::threshold(m, thresh, maxval, kind))
}

#[no_mangle]
pub extern "C" fn cvb_adaptive_threshold(
    src: *const Mat,
    maxval: f64,
    method: i32,
    kind: i32,
    block_size: i32,
    c: f64,
) -> *mut Mat {
    transform("adaptive_threshold", src, |m| {
        threshold::adaptive_threshold(m, maxval, method, kind, block_size, c)
    })
}

// ============================================================================
// Histogram and Denoising
// ============================================================================

#[no_mangle]
pub extern "C" fn cvb_equalize_hist(src: *const Mat) -> *mut Mat {
    transform("equalize_hist", src, histogram::equalize_hist)
}

#[no_mangle]
pub extern "C" fn cvb_denoise(
    src: *const Mat,
    h: f32,
    template_window: i32,
    search_window: i32,
) -> *mut Mat {
    transform("denoise", src, |m| {
        denoise::denoise(m, h, template_window, search_window)
    })
}

#[no_mangle]
pub extern "C" fn cvb_denoise_colored(
    src: *const Mat,
    h: f32,
    h_color: f32,
    template_window: i32,
    search_window: i32,
) -> *mut Mat {
    transform("denoise_colored", src, |m| {
        denoise::denoise_colored(m, h, h_color, template_window, search_window)
    })
}

// ============================================================================
// Drawing
// ============================================================================
//
// Colors are passed as red, green, blue; negative thickness fills.

#[no_mangle]
#[allow(clippy::not_unsafe_ptr_arg_deref, clippy::too_many_arguments)]
pub extern "C" fn cvb_rectangle(
    mat: *mut Mat,
    x: i32,
    y: i32,
    width: i32,
    height: i32,
    r: i32,
    g: i32,
    b: i32,
    thickness: i32,
) {
    let mat = deref_mut_or_return!(mat, Mat, ());
    guarded("rectangle", (), || {
        draw::rectangle(mat, (x, y, width, height), Color::from_rgb(r, g, b), thickness)
    })
}

#[no_mangle]
#[allow(clippy::not_unsafe_ptr_arg_deref, clippy::too_many_arguments)]
pub extern "C" fn cvb_circle(
    mat: *mut Mat,
    cx: i32,
    cy: i32,
    radius: i32,
    r: i32,
    g: i32,
    b: i32,
    thickness: i32,
) {
    let mat = deref_mut_or_return!(mat, Mat, ());
    guarded("circle", (), || {
        draw::circle(mat, (cx, cy), radius, Color::from_rgb(r, g, b), thickness)
    })
}

#[no_mangle]
#[allow(clippy::not_unsafe_ptr_arg_deref, clippy::too_many_arguments)]
pub extern "C" fn cvb_line(
    mat: *mut Mat,
    x1: i32,
    y1: i32,
    x2: i32,
    y2: i32,
    r: i32,
    g: i32,
    b: i32,
    thickness: i32,
) {
    let mat = deref_mut_or_return!(mat, Mat, ());
    guarded("line", (), || {
        draw::line(mat, (x1, y1), (x2, y2), Color::from_rgb(r, g, b), thickness)
    })
}
