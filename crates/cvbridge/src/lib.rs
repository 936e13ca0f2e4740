//! cvbridge: image processing behind a flat C ABI
//!
//! Exposes image buffers, encoded byte results, contour sets and capture
//! devices to hosts that can only call C functions and have no destructor
//! semantics of their own (managed runtimes, P/Invoke, CGO, ctypes).
//!
//! ## Architecture
//!
//! ```text
//! ┌──────────────┐  handle   ┌──────────────┐        ┌─────────────────┐
//! │ Host runtime │──────────▶│  ffi (C ABI) │───────▶│ codec / imgproc │
//! │ (GC'd)       │◀──────────│  null-safe   │◀───────│ capture         │
//! └──────────────┘  handle / └──────────────┘  Mat   └─────────────────┘
//!                   ByteResult / ContourSet
//! ```
//!
//! ## Usage from C
//!
//! ```c
//! CvbMat *img = cvb_imread("in.jpg");
//! if (!img) return -1;
//! CvbMat *gray = cvb_to_gray(img);
//! CvbMat *edges = cvb_canny(gray, 50.0, 150.0);
//!
//! ContourSet set = cvb_find_contours(edges, 0, 2);
//! cvb_draw_contours(img, set, -1, 255, 0, 0, 2);
//! cvb_free_contours(set);
//!
//! ByteResult png = cvb_imencode(".png", img);
//! /* ... hand png.data / png.len to the host ... */
//! cvb_free_bytes(png);
//!
//! cvb_mat_release(edges);
//! cvb_mat_release(gray);
//! cvb_mat_release(img);
//! ```
//!
//! ## Memory Ownership
//!
//! - Every function returning a `Mat *` or `DeviceStream *` hands a new
//!   allocation to the caller, who releases it exactly once with
//!   `cvb_mat_release` / `cvb_capture_close`
//! - Transforms never consume their inputs; the caller still owns them
//! - `ByteResult` must be returned to `cvb_free_bytes` exactly once
//! - `ContourSet` must be returned to `cvb_free_contours` exactly once;
//!   `cvb_draw_contours` only borrows it
//! - Pointers from `cvb_mat_data` are valid until the buffer is released
//!   or written to by a drawing call or `cvb_capture_read`
//! - Releasing NULL is always a no-op
//!
//! ## Threading
//!
//! Handles are not synchronized. Distinct handles may be used from
//! distinct threads; one handle must not be used from two threads at once.

pub mod capture;
pub mod codec;
pub mod config;
pub mod error;
pub mod ffi;
pub mod imgproc;
pub mod logging;
pub mod mat;

pub use capture::{DeviceStream, FrameSource};
pub use config::BridgeConfig;
pub use error::{CvError, Result};
pub use imgproc::contours::Points;
pub use imgproc::draw::Color;
pub use mat::Mat;

// Re-export FFI types for C consumers
pub use ffi::bytes::ByteResult;
pub use ffi::contours::ContourSet;
