//! C-compatible FFI interface
//!
//! Flat `extern "C"` entry points over [`Mat`] handles, encoded byte
//! results, contour sets and capture devices.
//!
//! # Memory Ownership Rules
//!
//! - Every returned `*mut Mat` is a fresh allocation owned by the caller
//!   and released with `cvb_mat_release`
//! - `ByteResult` goes back to `cvb_free_bytes`, `ContourSet` to
//!   `cvb_free_contours`, each exactly once
//! - Device handles are released with `cvb_capture_close`
//!
//! # Failure Reporting
//!
//! Nothing is reported out of band. A failed call returns NULL, false, 0
//! or an empty result; the reason is emitted as a `tracing` debug event,
//! visible once the host has called `cvb_init_logging`. Panics are caught
//! here and never unwind into the host.
//!
//! # Safety
//!
//! All public FFI functions treat NULL handles as a no-op. Passing a
//! released handle, or a handle of the wrong kind, is undefined behavior.

pub mod bytes;
pub mod capture;
pub mod contours;
pub mod mat;
pub mod ops;

use std::os::raw::c_char;
use std::panic::{self, AssertUnwindSafe};
use std::ptr;

use cvbridge_ffi_common::{cstr_to_str, deref_or_return};
use tracing::{debug, warn};

use crate::config::{self, BridgeConfig};
use crate::error::Result;
use crate::logging;
use crate::mat::Mat;

// Safety limits for caller-provided strings
pub(crate) const MAX_PATH_LEN: usize = 4096;
const MAX_CONFIG_LEN: usize = 64 * 1024;

cvbridge_ffi_common::define_version_fn!(cvb_version);

/// Run `f`, folding errors and panics into `fallback`.
pub(crate) fn guarded<T>(op: &'static str, fallback: T, f: impl FnOnce() -> Result<T>) -> T {
    match panic::catch_unwind(AssertUnwindSafe(f)) {
        Ok(Ok(value)) => value,
        Ok(Err(e)) => {
            debug!(op, error = %e, "operation failed");
            fallback
        }
        Err(_) => {
            debug!(op, "operation panicked");
            fallback
        }
    }
}

/// Move a buffer to the heap and hand it out as a new handle.
pub(crate) fn into_handle(mat: Mat) -> *mut Mat {
    Box::into_raw(Box::new(mat))
}

/// Apply a non-mutating operation to `src`, returning a new handle or NULL.
pub(crate) fn transform(
    op: &'static str,
    src: *const Mat,
    f: impl FnOnce(&Mat) -> Result<Mat>,
) -> *mut Mat {
    let src = deref_or_return!(src, Mat, ptr::null_mut());
    guarded(op, ptr::null_mut(), || f(src).map(into_handle))
}

// ============================================================================
// Process Setup
// ============================================================================

/// Enable logging to stderr.
///
/// Filter from `RUST_LOG`, else the configured `log_filter`. Calling this
/// more than once is harmless.
#[no_mangle]
pub extern "C" fn cvb_init_logging() {
    logging::init();
}

/// Replace the process-wide limits from a JSON object such as
/// `{"max_decode_bytes": 1048576, "max_image_pixels": 16777216}`.
///
/// # Returns
/// true if the configuration was applied. On false the previous
/// configuration stays in effect.
#[no_mangle]
#[allow(clippy::not_unsafe_ptr_arg_deref)]
pub extern "C" fn cvb_configure(json: *const c_char) -> bool {
    let json = match unsafe { cstr_to_str(json) } {
        Ok(s) if s.len() <= MAX_CONFIG_LEN => s,
        Ok(_) => {
            warn!("configuration rejected: too long");
            return false;
        }
        Err(e) => {
            warn!(error = e, "configuration rejected");
            return false;
        }
    };
    match BridgeConfig::from_json(json) {
        Ok(config) => {
            debug!(?config, "configuration replaced");
            config::replace(config);
            true
        }
        Err(e) => {
            warn!(error = %e, "configuration rejected");
            false
        }
    }
}
