//! Common FFI utilities for the cvbridge C-compatible interface.
//!
//! Every native object handed to the host crosses the boundary as a raw
//! pointer produced by `Box::into_raw` (single objects) or by
//! [`vec_into_raw`] (variable-length arrays). The helpers here are the only
//! places those pointers are turned back into owned Rust values.
//!
//! # Memory Ownership
//!
//! - Functions returning raw pointers transfer ownership to the caller
//! - Callers must use the matching `free_*` / release function exactly once
//! - NULL pointers are handled safely (no-op for free functions)

use std::ffi::CStr;
use std::os::raw::c_char;
use std::ptr;

/// Safely free a boxed value.
///
/// Does nothing if the pointer is null.
///
/// # Safety
/// The pointer must have been allocated by `Box::into_raw()` or be null.
#[inline]
pub unsafe fn free_boxed<T>(ptr: *mut T) {
    if !ptr.is_null() {
        unsafe {
            let _ = Box::from_raw(ptr);
        }
    }
}

/// Free a boxed slice and its contents.
///
/// Does nothing if the pointer is null or length is zero.
///
/// # Safety
/// The pointer must have been produced by [`vec_into_raw`] with the same
/// `len`.
#[inline]
pub unsafe fn free_boxed_slice<T>(ptr: *mut T, len: usize) {
    if !ptr.is_null() && len > 0 {
        unsafe {
            let _ = Box::from_raw(ptr::slice_from_raw_parts_mut(ptr, len));
        }
    }
}

/// Convert a vector to a raw pointer and length, sized exactly to its
/// contents (the spare capacity is released first).
///
/// Returns null pointer and 0 length for empty vectors.
/// The returned pointer is owned by the caller.
#[inline]
pub fn vec_into_raw<T>(vec: Vec<T>) -> (*mut T, usize) {
    let len = vec.len();
    if len == 0 {
        (ptr::null_mut(), 0)
    } else {
        (Box::into_raw(vec.into_boxed_slice()) as *mut T, len)
    }
}

/// Borrow `len` elements behind a caller-provided pointer.
///
/// Returns an empty slice for a null pointer or zero length.
///
/// # Safety
/// When non-null, `ptr` must point to at least `len` initialized elements
/// that stay valid for `'a`.
#[inline]
pub unsafe fn slice_or_empty<'a, T>(ptr: *const T, len: usize) -> &'a [T] {
    if ptr.is_null() || len == 0 {
        &[]
    } else {
        unsafe { std::slice::from_raw_parts(ptr, len) }
    }
}

/// Safely convert a C string pointer to a Rust string reference.
///
/// # Returns
/// `Ok(&str)` on success, `Err(&'static str)` with error message on failure.
///
/// # Safety
/// The pointer must be valid and null-terminated, or null.
pub unsafe fn cstr_to_str<'a>(ptr: *const c_char) -> Result<&'a str, &'static str> {
    if ptr.is_null() {
        return Err("null pointer");
    }
    unsafe { CStr::from_ptr(ptr) }
        .to_str()
        .map_err(|_| "invalid UTF-8")
}

/// Dereference a handle immutably, or return early with `$err_val` when the
/// handle is null.
///
/// # Example
/// ```ignore
/// let mat = cvbridge_ffi_common::deref_or_return!(handle, Mat, 0);
/// ```
#[macro_export]
macro_rules! deref_or_return {
    ($ptr:expr, $type:ty, $err_val:expr) => {{
        let ptr = $ptr as *const $type;
        if ptr.is_null() {
            return $err_val;
        }
        unsafe { &*ptr }
    }};
}

/// Dereference a handle mutably, or return early with `$err_val` when the
/// handle is null.
#[macro_export]
macro_rules! deref_mut_or_return {
    ($ptr:expr, $type:ty, $err_val:expr) => {{
        let ptr = $ptr as *mut $type;
        if ptr.is_null() {
            return $err_val;
        }
        unsafe { &mut *ptr }
    }};
}

/// Generate a version function that returns a static C string.
///
/// # Example
/// ```ignore
/// cvbridge_ffi_common::define_version_fn!(my_lib_version);
/// // Expands to:
/// // #[no_mangle]
/// // pub extern "C" fn my_lib_version() -> *const c_char {
/// //     concat!(env!("CARGO_PKG_VERSION"), "\0").as_ptr() as *const c_char
/// // }
/// ```
#[macro_export]
macro_rules! define_version_fn {
    ($fn_name:ident) => {
        #[no_mangle]
        pub extern "C" fn $fn_name() -> *const std::os::raw::c_char {
            concat!(env!("CARGO_PKG_VERSION"), "\0").as_ptr() as *const std::os::raw::c_char
        }
    };
}

/// Generate a release function for a boxed handle type.
///
/// Releasing null is a no-op. Releasing the same handle twice is undefined
/// behavior, as with any `free`.
///
/// # Example
/// ```ignore
/// cvbridge_ffi_common::define_handle_release!(my_handle_release, MyType);
/// // Expands to:
/// // #[no_mangle]
/// // #[allow(clippy::not_unsafe_ptr_arg_deref)]
/// // pub extern "C" fn my_handle_release(ptr: *mut MyType) {
/// //     cvbridge_ffi_common::free_boxed(ptr);
/// // }
/// ```
#[macro_export]
macro_rules! define_handle_release {
    ($fn_name:ident, $handle_type:ty) => {
        #[no_mangle]
        #[allow(clippy::not_unsafe_ptr_arg_deref)]
        pub extern "C" fn $fn_name(ptr: *mut $handle_type) {
            unsafe { $crate::free_boxed(ptr) };
        }
    };
}
