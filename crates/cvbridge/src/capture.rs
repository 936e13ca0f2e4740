//! Capture device streams
//!
//! A [`DeviceStream`] owns one open [`FrameSource`]. Frames are written
//! into caller-provided [`Mat`] buffers, replacing their contents.
//!
//! Property ids follow the OpenCV `VideoCaptureProperties` numbering
//! (`CAP_PROP_FRAME_WIDTH = 3`, `CAP_PROP_FRAME_HEIGHT = 4`,
//! `CAP_PROP_FPS = 5`, ...) and are passed to the source unchanged.

use tracing::debug;

use crate::error::{CvError, Result};
use crate::mat::Mat;

/// A device that produces frames
pub trait FrameSource: Send {
    /// Block until the next frame is available and write it into `frame`.
    ///
    /// Returns `Ok(false)` at end of stream.
    fn read(&mut self, frame: &mut Mat) -> Result<bool>;

    /// Current value of a property, 0.0 when unsupported.
    fn get(&self, prop: i32) -> f64;

    /// Request a property change; returns whether the device accepted it.
    fn set(&mut self, prop: i32, value: f64) -> bool;
}

/// An open capture device
pub struct DeviceStream {
    index: i32,
    source: Box<dyn FrameSource>,
    frames_read: u64,
}

impl std::fmt::Debug for DeviceStream {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("DeviceStream")
            .field("index", &self.index)
            .field("frames_read", &self.frames_read)
            .finish_non_exhaustive()
    }
}

impl DeviceStream {
    /// Open the device at `index` with the compiled-in backend.
    ///
    /// Any resource acquired during a failed open is released before the
    /// error is returned.
    pub fn open(index: i32) -> Result<Self> {
        if index < 0 {
            return Err(CvError::DeviceUnavailable(index));
        }
        let source = open_backend(index)?;
        debug!(index, "capture device opened");
        Ok(Self::with_source(index, source))
    }

    /// Wrap an already opened source.
    pub fn with_source(index: i32, source: Box<dyn FrameSource>) -> Self {
        Self {
            index,
            source,
            frames_read: 0,
        }
    }

    pub fn index(&self) -> i32 {
        self.index
    }

    pub fn frames_read(&self) -> u64 {
        self.frames_read
    }

    /// Read the next frame into `target`.
    ///
    /// On end of stream or device failure `target` is left empty and
    /// `false` is returned.
    pub fn read(&mut self, target: &mut Mat) -> bool {
        let mut frame = Mat::empty();
        match self.source.read(&mut frame) {
            Ok(true) if !frame.is_empty() => {
                target.assign(frame);
                self.frames_read += 1;
                true
            }
            Ok(_) => {
                debug!(index = self.index, "capture stream exhausted");
                target.assign(Mat::empty());
                false
            }
            Err(e) => {
                debug!(index = self.index, error = %e, "capture read failed");
                target.assign(Mat::empty());
                false
            }
        }
    }

    pub fn get(&self, prop: i32) -> f64 {
        self.source.get(prop)
    }

    pub fn set(&mut self, prop: i32, value: f64) -> bool {
        self.source.set(prop, value)
    }
}

impl Drop for DeviceStream {
    fn drop(&mut self) {
        debug!(
            index = self.index,
            frames = self.frames_read,
            "capture device closed"
        );
    }
}

#[cfg(not(feature = "opencv"))]
fn open_backend(index: i32) -> Result<Box<dyn FrameSource>> {
    debug!(index, "built without a capture backend");
    Err(CvError::DeviceUnavailable(index))
}

#[cfg(feature = "opencv")]
fn open_backend(index: i32) -> Result<Box<dyn FrameSource>> {
    Ok(Box::new(opencv_source::OpenCvSource::open(index)?))
}

#[cfg(feature = "opencv")]
mod opencv_source {
    use opencv::core::{Mat as CvMat, CV_8U};
    use opencv::prelude::*;
    use opencv::videoio::{VideoCapture, CAP_ANY};

    use super::FrameSource;
    use crate::error::{CvError, Result};
    use crate::mat::Mat;

    /// `VideoCapture` over a device index
    pub(super) struct OpenCvSource {
        capture: VideoCapture,
    }

    // VideoCapture owns a native pointer; a DeviceStream is only ever used
    // from one thread at a time.
    unsafe impl Send for OpenCvSource {}

    impl OpenCvSource {
        pub(super) fn open(index: i32) -> Result<Self> {
            let mut capture = VideoCapture::new(index, CAP_ANY)?;
            if !capture.is_opened()? {
                capture.release()?;
                return Err(CvError::DeviceUnavailable(index));
            }
            Ok(Self { capture })
        }
    }

    impl FrameSource for OpenCvSource {
        fn read(&mut self, frame: &mut Mat) -> Result<bool> {
            let mut raw = CvMat::default();
            if !self.capture.read(&mut raw)? || raw.empty() {
                return Ok(false);
            }
            if raw.depth() != CV_8U {
                return Err(CvError::Device(format!("frame depth {}", raw.depth())));
            }
            let raw = if raw.is_continuous() {
                raw
            } else {
                raw.try_clone()?
            };
            let channels = u8::try_from(raw.channels())
                .map_err(|_| CvError::Device(format!("{} channels", raw.channels())))?;
            frame.assign(Mat::from_raw(
                raw.cols() as u32,
                raw.rows() as u32,
                channels,
                raw.data_bytes()?.to_vec(),
            )?);
            Ok(true)
        }

        fn get(&self, prop: i32) -> f64 {
            self.capture.get(prop).unwrap_or(0.0)
        }

        fn set(&mut self, prop: i32, value: f64) -> bool {
            self.capture.set(prop, value).unwrap_or(false)
        }
    }
}
