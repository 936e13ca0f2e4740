//! Error types for the bridge
//!
//! Errors never cross the C boundary; the FFI layer folds every variant
//! into the zero value of the entry point's return type.

use thiserror::Error;

/// Result type for bridge operations
pub type Result<T> = std::result::Result<T, CvError>;

/// Errors that can occur inside a bridge operation
#[derive(Debug, Error)]
pub enum CvError {
    /// Operation received a buffer with no pixels
    #[error("empty image")]
    EmptyImage,

    /// Operation does not accept this channel count
    #[error("{op}: unsupported channel count {channels}")]
    UnsupportedChannels { op: &'static str, channels: u8 },

    /// A scalar or enum parameter is outside the accepted range
    #[error("invalid parameter: {0}")]
    InvalidParameter(String),

    /// Encoder could not be chosen from the format hint
    #[error("unknown image format: {0}")]
    UnknownFormat(String),

    /// Image codec failure
    #[error("codec error: {0}")]
    Codec(#[from] image::ImageError),

    /// IO error (for file operations)
    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),

    /// Input or output exceeds a configured limit
    #[error("limit exceeded: {0}")]
    LimitExceeded(String),

    /// No capture device could be opened at this index
    #[error("capture device {0} unavailable")]
    DeviceUnavailable(i32),

    /// Capture backend failure after the device was opened
    #[error("capture error: {0}")]
    Device(String),
}

impl CvError {
    pub(crate) fn invalid(msg: impl Into<String>) -> Self {
        Self::InvalidParameter(msg.into())
    }
}

#[cfg(feature = "opencv")]
impl From<opencv::Error> for CvError {
    fn from(err: opencv::Error) -> Self {
        CvError::Device(err.to_string())
    }
}
