//! Device error types

use std::path::PathBuf;

use contracts::ContractError;
use thiserror::Error;

/// Device specific error
#[derive(Debug, Error)]
pub enum DeviceError {
    /// Transport not available on this platform/build
    #[error("transport '{transport}' unavailable: {reason}")]
    Unsupported { transport: String, reason: String },

    /// Capture file is malformed
    #[error("capture file '{path}': {message}")]
    Capture { path: PathBuf, message: String },

    /// IO error
    #[error("io error: {0}")]
    Io(#[from] std::io::Error),

    /// Wrapped ContractError
    #[error(transparent)]
    Contract(#[from] ContractError),
}

impl DeviceError {
    /// Create unsupported transport error
    pub fn unsupported(transport: impl Into<String>, reason: impl Into<String>) -> Self {
        Self::Unsupported {
            transport: transport.into(),
            reason: reason.into(),
        }
    }

    /// Create capture file error
    pub fn capture(path: impl Into<PathBuf>, message: impl Into<String>) -> Self {
        Self::Capture {
            path: path.into(),
            message: message.into(),
        }
    }
}

impl From<DeviceError> for ContractError {
    fn from(err: DeviceError) -> Self {
        match err {
            DeviceError::Contract(inner) => inner,
            DeviceError::Io(inner) => ContractError::Io(inner),
            other => ContractError::Other(other.to_string()),
        }
    }
}

/// Result alias
pub type Result<T> = std::result::Result<T, DeviceError>;
