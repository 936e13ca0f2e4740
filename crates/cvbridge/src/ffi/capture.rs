//! Capture device handles

use std::ptr;

use cvbridge_ffi_common::{deref_mut_or_return, deref_or_return};
use tracing::debug;

use super::guarded;
use crate::capture::DeviceStream;
use crate::mat::Mat;

/// Open the capture device at `index`.
///
/// # Returns
/// A device handle owned by the caller (release with
/// `cvb_capture_close`), or NULL if the device cannot be opened. Nothing
/// stays allocated after a failed open.
#[no_mangle]
pub extern "C" fn cvb_capture_open(index: i32) -> *mut DeviceStream {
    match DeviceStream::open(index) {
        Ok(stream) => Box::into_raw(Box::new(stream)),
        Err(e) => {
            debug!(index, error = %e, "capture open failed");
            ptr::null_mut()
        }
    }
}

cvbridge_ffi_common::define_handle_release!(cvb_capture_close, DeviceStream);

/// Block until the next frame arrives and write it into `target`,
/// replacing its contents.
///
/// # Returns
/// false if either handle is NULL, or at end of stream / device failure
/// (then `target` is left empty).
#[no_mangle]
#[allow(clippy::not_unsafe_ptr_arg_deref)]
pub extern "C" fn cvb_capture_read(stream: *mut DeviceStream, target: *mut Mat) -> bool {
    let stream = deref_mut_or_return!(stream, DeviceStream, false);
    let target = deref_mut_or_return!(target, Mat, false);
    guarded("capture_read", false, || Ok(stream.read(target)))
}

/// Read a `CAP_PROP_*` property; 0.0 on a NULL handle or unsupported id.
#[no_mangle]
pub extern "C" fn cvb_capture_get_prop(stream: *const DeviceStream, prop: i32) -> f64 {
    deref_or_return!(stream, DeviceStream, 0.0).get(prop)
}

/// Set a `CAP_PROP_*` property.
///
/// # Returns
/// Whether the device accepted the value; false on a NULL handle.
#[no_mangle]
pub extern "C" fn cvb_capture_set_prop(stream: *mut DeviceStream, prop: i32, value: f64) -> bool {
    deref_mut_or_return!(stream, DeviceStream, false).set(prop, value)
}
