//! Error types for the capture and render core.

use thiserror::Error;

/// All errors produced by the capture pipeline and view parameter validation.
#[derive(Debug, Error)]
pub enum VizError {
    /// The capture source could not be started (bad id, permission denied, device busy).
    #[error("capture device unavailable: {0}")]
    DeviceUnavailable(String),

    /// The capture stream delivered a short or empty block.
    #[error("capture stream ended")]
    StreamEnded,

    #[error("invalid parameter: {0}")]
    InvalidParameter(String),

    #[error("a capture session is already running")]
    AlreadyCapturing,

    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),
}

pub type Result<T> = std::result::Result<T, VizError>;
