//! Image buffer handles: lifecycle, accessors, file and memory I/O

use std::os::raw::c_char;
use std::ptr;

use cvbridge_ffi_common::{cstr_to_str, deref_mut_or_return, deref_or_return, slice_or_empty};

use super::{guarded, into_handle, transform, MAX_PATH_LEN};
use crate::codec;
use crate::error::{CvError, Result};
use crate::mat::Mat;

fn dimension(name: &str, v: i32) -> Result<u32> {
    u32::try_from(v).map_err(|_| CvError::invalid(format!("{} {}", name, v)))
}

fn channel_count(v: i32) -> Result<u8> {
    u8::try_from(v).map_err(|_| CvError::invalid(format!("channel count {}", v)))
}

unsafe fn path_arg<'a>(path: *const c_char) -> Result<&'a str> {
    match unsafe { cstr_to_str(path) } {
        Ok(s) if s.len() <= MAX_PATH_LEN => Ok(s),
        Ok(_) => Err(CvError::invalid("path too long")),
        Err(e) => Err(CvError::invalid(format!("path: {}", e))),
    }
}

// ============================================================================
// Buffer Lifecycle
// ============================================================================

/// Allocate an empty buffer (no pixels, one channel).
///
/// # Returns
/// A new handle. Never NULL; caller owns it and must call
/// `cvb_mat_release`.
#[no_mangle]
pub extern "C" fn cvb_mat_create() -> *mut Mat {
    into_handle(Mat::empty())
}

/// Allocate a zero-filled buffer.
///
/// # Returns
/// NULL unless `width` and `height` are positive and `channels` is 1..=4.
#[no_mangle]
pub extern "C" fn cvb_mat_zeros(width: i32, height: i32, channels: i32) -> *mut Mat {
    guarded("mat_zeros", ptr::null_mut(), || {
        let mat = Mat::zeros(
            dimension("width", width)?,
            dimension("height", height)?,
            channel_count(channels)?,
        )?;
        Ok(into_handle(mat))
    })
}

/// Copy `width * height * channels` interleaved bytes from `data` into a
/// new buffer. Extra bytes beyond that are ignored.
///
/// # Returns
/// NULL if `data` is NULL or `len` is too small.
#[no_mangle]
#[allow(clippy::not_unsafe_ptr_arg_deref)]
pub extern "C" fn cvb_mat_from_pixels(
    data: *const u8,
    len: usize,
    width: i32,
    height: i32,
    channels: i32,
) -> *mut Mat {
    if data.is_null() {
        return ptr::null_mut();
    }
    guarded("mat_from_pixels", ptr::null_mut(), || {
        let (w, h) = (dimension("width", width)?, dimension("height", height)?);
        let c = channel_count(channels)?;
        let needed = w as usize * h as usize * c as usize;
        if len < needed {
            return Err(CvError::invalid(format!(
                "{} bytes given, {} needed",
                len, needed
            )));
        }
        let pixels = unsafe { slice_or_empty(data, needed) };
        Ok(into_handle(Mat::from_raw(w, h, c, pixels.to_vec())?))
    })
}

/// Deep copy of `src`.
#[no_mangle]
pub extern "C" fn cvb_mat_clone(src: *const Mat) -> *mut Mat {
    transform("mat_clone", src, |m| Ok(m.clone()))
}

cvbridge_ffi_common::define_handle_release!(cvb_mat_release, Mat);

// ============================================================================
// Accessors
// ============================================================================

#[no_mangle]
pub extern "C" fn cvb_mat_width(mat: *const Mat) -> i32 {
    i32::try_from(deref_or_return!(mat, Mat, 0).width()).unwrap_or(i32::MAX)
}

#[no_mangle]
pub extern "C" fn cvb_mat_height(mat: *const Mat) -> i32 {
    i32::try_from(deref_or_return!(mat, Mat, 0).height()).unwrap_or(i32::MAX)
}

#[no_mangle]
pub extern "C" fn cvb_mat_channels(mat: *const Mat) -> i32 {
    deref_or_return!(mat, Mat, 0).channels() as i32
}

/// Pointer to the first pixel; rows follow each other without padding.
///
/// The pointer stays owned by the buffer and is invalidated by
/// `cvb_mat_release` and by `cvb_capture_read` into it. NULL for a NULL
/// or empty buffer.
#[no_mangle]
pub extern "C" fn cvb_mat_data(mat: *mut Mat) -> *mut u8 {
    let mat = deref_mut_or_return!(mat, Mat, ptr::null_mut());
    if mat.is_empty() {
        return ptr::null_mut();
    }
    mat.data_mut().as_mut_ptr()
}

/// Byte length of the pixel data (`width * height * channels`).
#[no_mangle]
pub extern "C" fn cvb_mat_data_len(mat: *const Mat) -> usize {
    deref_or_return!(mat, Mat, 0).data().len()
}

// ============================================================================
// File and Memory I/O
// ============================================================================

/// Decode an image file into a 3-channel BGR buffer.
///
/// # Returns
/// NULL if the path is NULL, unreadable, or not a decodable image.
#[no_mangle]
#[allow(clippy::not_unsafe_ptr_arg_deref)]
pub extern "C" fn cvb_imread(path: *const c_char) -> *mut Mat {
    guarded("imread", ptr::null_mut(), || {
        let path = unsafe { path_arg(path)? };
        codec::decode_file(path).map(into_handle)
    })
}

/// Encode `mat` to `path`; the format follows the file extension.
#[no_mangle]
#[allow(clippy::not_unsafe_ptr_arg_deref)]
pub extern "C" fn cvb_imwrite(path: *const c_char, mat: *const Mat) -> bool {
    let mat = deref_or_return!(mat, Mat, false);
    guarded("imwrite", false, || {
        let path = unsafe { path_arg(path)? };
        codec::encode_file(path, mat).map(|_| true)
    })
}

/// Decode `len` encoded bytes into a 3-channel BGR buffer.
///
/// The bytes are only read during the call; the caller keeps ownership.
#[no_mangle]
#[allow(clippy::not_unsafe_ptr_arg_deref)]
pub extern "C" fn cvb_imdecode(data: *const u8, len: usize) -> *mut Mat {
    if data.is_null() || len == 0 {
        return ptr::null_mut();
    }
    guarded("imdecode", ptr::null_mut(), || {
        let bytes = unsafe { slice_or_empty(data, len) };
        codec::decode_memory(bytes).map(into_handle)
    })
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::ffi::CString;

    #[test]
    fn test_create_is_empty() {
        let m = cvb_mat_create();
        assert!(!m.is_null());
        assert_eq!(cvb_mat_width(m), 0);
        assert_eq!(cvb_mat_height(m), 0);
        assert_eq!(cvb_mat_channels(m), 1);
        assert!(cvb_mat_data(m).is_null());
        assert_eq!(cvb_mat_data_len(m), 0);
        cvb_mat_release(m);
    }

    #[test]
    fn test_null_accessors() {
        assert_eq!(cvb_mat_width(ptr::null()), 0);
        assert_eq!(cvb_mat_channels(ptr::null()), 0);
        assert!(cvb_mat_data(ptr::null_mut()).is_null());
        assert_eq!(cvb_mat_data_len(ptr::null()), 0);
        cvb_mat_release(ptr::null_mut());
    }

    #[test]
    fn test_zeros_validates_shape() {
        assert!(cvb_mat_zeros(-1, 4, 3).is_null());
        assert!(cvb_mat_zeros(4, 4, 0).is_null());
        assert!(cvb_mat_zeros(4, 4, 300).is_null());
        let m = cvb_mat_zeros(4, 2, 3);
        assert_eq!(cvb_mat_data_len(m), 24);
        cvb_mat_release(m);
    }

    #[test]
    fn test_from_pixels_copies() {
        let mut src = vec![1u8, 2, 3, 4, 5, 6];
        assert!(cvb_mat_from_pixels(src.as_ptr(), 5, 3, 2, 1).is_null());
        assert!(cvb_mat_from_pixels(ptr::null(), 6, 3, 2, 1).is_null());

        let m = cvb_mat_from_pixels(src.as_ptr(), src.len(), 3, 2, 1);
        src[0] = 99;
        let data = unsafe { std::slice::from_raw_parts(cvb_mat_data(m), cvb_mat_data_len(m)) };
        assert_eq!(data, &[1, 2, 3, 4, 5, 6]);

        let copy = cvb_mat_clone(m);
        assert_ne!(copy, m);
        assert_eq!(cvb_mat_width(copy), 3);
        cvb_mat_release(copy);
        cvb_mat_release(m);
    }

    #[test]
    fn test_imread_failures() {
        assert!(cvb_imread(ptr::null()).is_null());
        let missing = CString::new("/nonexistent/cvbridge.png").unwrap();
        assert!(cvb_imread(missing.as_ptr()).is_null());
        assert!(cvb_imdecode(ptr::null(), 10).is_null());
        let junk = [0u8, 1, 2, 3];
        assert!(cvb_imdecode(junk.as_ptr(), junk.len()).is_null());
    }

    #[test]
    fn test_imwrite_null_or_empty() {
        let path = CString::new("/tmp/never-written.png").unwrap();
        assert!(!cvb_imwrite(path.as_ptr(), ptr::null()));
        let empty = cvb_mat_create();
        assert!(!cvb_imwrite(path.as_ptr(), empty));
        cvb_mat_release(empty);
    }
}
