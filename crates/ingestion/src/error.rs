//! Acquisition error types

use contracts::ContractError;
use thiserror::Error;

/// Fatal acquisition errors
///
/// Per-packet and per-pass anomalies never surface here; they are handled by
/// the sync state machine.
#[derive(Debug, Error)]
pub enum AcquisitionError {
    /// Bus open or read failure
    #[error("bus failure: {0}")]
    Bus(#[from] ContractError),

    /// Reopening the bus after a reboot failed
    #[error("failed to reopen bus after reboot: {source}")]
    Reopen {
        #[source]
        source: ContractError,
    },

    /// Startup register command failed
    #[error("sensor setup failed ({command}): {source}")]
    Setup {
        command: String,
        #[source]
        source: ContractError,
    },

    /// Reboot guard tripped
    #[error("sync not recovered after {reboots} consecutive reboot cycles")]
    PersistentDesync { reboots: u32 },

    /// Acquisition thread could not be started
    #[error("failed to spawn acquisition thread: {0}")]
    Spawn(#[source] std::io::Error),

    /// Acquisition thread panicked
    #[error("acquisition thread panicked")]
    ThreadPanicked,
}

impl AcquisitionError {
    pub fn setup(command: impl Into<String>, source: ContractError) -> Self {
        Self::Setup {
            command: command.into(),
            source,
        }
    }

    /// Whether the error means the packet stream simply ended
    pub fn is_end_of_stream(&self) -> bool {
        matches!(self, Self::Bus(ContractError::BusExhausted { .. }))
    }
}

/// Acquisition Result type alias
pub type Result<T> = std::result::Result<T, AcquisitionError>;
