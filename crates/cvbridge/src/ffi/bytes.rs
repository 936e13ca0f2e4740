//! Encoded byte results
//!
//! The encoded size is only known after the codec has run, so the payload
//! is allocated on the Rust heap, sized exactly, and handed to the caller
//! as a pointer and length. It must come back through `cvb_free_bytes`.

use std::os::raw::c_char;
use std::ptr;

use cvbridge_ffi_common::{cstr_to_str, deref_or_return, free_boxed_slice, vec_into_raw};

use super::guarded;
use crate::codec;
use crate::error::CvError;
use crate::mat::Mat;

/// C-compatible owned byte buffer
///
/// `data == NULL, len == 0` signals failure.
#[repr(C)]
#[derive(Debug)]
pub struct ByteResult {
    /// Encoded bytes (owned, must be freed with `cvb_free_bytes`)
    pub data: *mut u8,
    /// Number of bytes at `data`
    pub len: usize,
}

impl ByteResult {
    fn empty() -> Self {
        Self {
            data: ptr::null_mut(),
            len: 0,
        }
    }

    fn from_vec(bytes: Vec<u8>) -> Self {
        let (data, len) = vec_into_raw(bytes);
        Self { data, len }
    }
}

/// Encode `mat` with the codec named by `ext` (".png", ".jpg", ".bmp", ...).
///
/// # Returns
/// The encoded bytes, or `{NULL, 0}` for a NULL/empty buffer, an unknown
/// extension, or an encoder failure.
#[no_mangle]
#[allow(clippy::not_unsafe_ptr_arg_deref)]
pub extern "C" fn cvb_imencode(ext: *const c_char, mat: *const Mat) -> ByteResult {
    let mat = deref_or_return!(mat, Mat, ByteResult::empty());
    guarded("imencode", ByteResult::empty(), || {
        let ext = unsafe { cstr_to_str(ext) }.map_err(CvError::invalid)?;
        codec::encode_memory(ext, mat).map(ByteResult::from_vec)
    })
}

/// Free a result returned by `cvb_imencode`.
///
/// No-op when `data` is NULL. The result must not be used afterwards.
#[no_mangle]
#[allow(clippy::not_unsafe_ptr_arg_deref)]
pub extern "C" fn cvb_free_bytes(result: ByteResult) {
    unsafe { free_boxed_slice(result.data, result.len) };
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::ffi::mat::{cvb_imdecode, cvb_mat_release, cvb_mat_zeros};
    use std::ffi::CString;

    #[test]
    fn test_encode_null_handle() {
        let png = CString::new(".png").unwrap();
        let r = cvb_imencode(png.as_ptr(), ptr::null());
        assert!(r.data.is_null());
        assert_eq!(r.len, 0);
        cvb_free_bytes(r);
    }

    #[test]
    fn test_encode_unknown_extension() {
        let m = cvb_mat_zeros(4, 4, 3);
        let ext = CString::new(".nope").unwrap();
        let r = cvb_imencode(ext.as_ptr(), m);
        assert!(r.data.is_null());
        assert!(cvb_imencode(ptr::null(), m).data.is_null());
        cvb_mat_release(m);
    }

    #[test]
    fn test_encode_decode() {
        let m = cvb_mat_zeros(5, 3, 3);
        let png = CString::new(".png").unwrap();
        let r = cvb_imencode(png.as_ptr(), m);
        assert!(!r.data.is_null());
        assert!(r.len > 8);
        let back = cvb_imdecode(r.data, r.len);
        assert!(!back.is_null());
        cvb_free_bytes(r);
        cvb_mat_release(back);
        cvb_mat_release(m);
    }
}
