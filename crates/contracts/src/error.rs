//! Layered error definitions
//!
//! Categorized by source: config / bus / register / sink

use thiserror::Error;

/// Unified error type
#[derive(Debug, Error)]
pub enum ContractError {
    // ===== Configuration Errors =====
    /// Configuration parse error
    #[error("config parse error: {message}")]
    ConfigParse {
        message: String,
        #[source]
        source: Option<Box<dyn std::error::Error + Send + Sync>>,
    },

    /// Configuration validation error
    #[error("config validation error at '{field}': {message}")]
    ConfigValidation { field: String, message: String },

    // ===== Bus Errors =====
    /// Bus could not be opened (or reopened after a reboot)
    #[error("bus open error on '{device}': {message}")]
    BusOpen { device: String, message: String },

    /// Packet read failed at the transport level
    #[error("bus read error on '{device}': {message}")]
    BusRead { device: String, message: String },

    /// Packet source ran out of data (replay / scripted sources)
    #[error("bus '{device}' exhausted")]
    BusExhausted { device: String },

    // ===== Register Errors =====
    /// Sensor register command failed
    #[error("register command '{command}' failed: {message}")]
    Register { command: String, message: String },

    // ===== Sink Errors =====
    /// Sink write error
    #[error("sink '{sink_name}' write error: {message}")]
    SinkWrite { sink_name: String, message: String },

    /// Sink connection error
    #[error("sink '{sink_name}' connection error: {message}")]
    SinkConnection { sink_name: String, message: String },

    // ===== General Errors =====
    /// IO error
    #[error("io error: {0}")]
    Io(#[from] std::io::Error),

    /// Other error
    #[error("{0}")]
    Other(String),
}

impl ContractError {
    /// Create configuration parse error
    pub fn config_parse(message: impl Into<String>) -> Self {
        Self::ConfigParse {
            message: message.into(),
            source: None,
        }
    }

    /// Create configuration validation error
    pub fn config_validation(field: impl Into<String>, message: impl Into<String>) -> Self {
        Self::ConfigValidation {
            field: field.into(),
            message: message.into(),
        }
    }

    /// Create bus open error
    pub fn bus_open(device: impl Into<String>, message: impl Into<String>) -> Self {
        Self::BusOpen {
            device: device.into(),
            message: message.into(),
        }
    }

    /// Create bus read error
    pub fn bus_read(device: impl Into<String>, message: impl Into<String>) -> Self {
        Self::BusRead {
            device: device.into(),
            message: message.into(),
        }
    }

    /// Create register command error
    pub fn register(command: impl Into<String>, message: impl Into<String>) -> Self {
        Self::Register {
            command: command.into(),
            message: message.into(),
        }
    }

    /// Create sink write error
    pub fn sink_write(sink_name: impl Into<String>, message: impl Into<String>) -> Self {
        Self::SinkWrite {
            sink_name: sink_name.into(),
            message: message.into(),
        }
    }
}
