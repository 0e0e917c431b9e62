//! Dispatcher error types

use thiserror::Error;

/// Dispatcher-specific errors
#[derive(Debug, Error)]
pub enum DispatcherError {
    /// Sink creation error
    #[error("failed to create sink '{name}': {message}")]
    SinkCreation { name: String, message: String },

    /// Invalid sink parameter
    #[error("invalid parameter '{key}' for sink '{name}': {message}")]
    InvalidParam {
        name: String,
        key: String,
        message: String,
    },

    /// Sink write error (from contract)
    #[error("sink error: {0}")]
    Contract(#[from] contracts::ContractError),

    /// IO error
    #[error("io error: {0}")]
    Io(#[from] std::io::Error),
}

impl DispatcherError {
    /// Create a sink creation error
    pub fn sink_creation(name: impl Into<String>, message: impl Into<String>) -> Self {
        Self::SinkCreation {
            name: name.into(),
            message: message.into(),
        }
    }

    /// Create an invalid parameter error
    pub fn invalid_param(
        name: impl Into<String>,
        key: impl Into<String>,
        message: impl Into<String>,
    ) -> Self {
        Self::InvalidParam {
            name: name.into(),
            key: key.into(),
            message: message.into(),
        }
    }
}

/// Dispatcher Result type alias
pub type Result<T> = std::result::Result<T, DispatcherError>;
