//! # Ingestion
//!
//! Thermal packet acquisition.
//!
//! Responsibilities:
//! - Validate packet order and segment ids (sync state machine)
//! - Escalate sustained sync loss into sensor reboot cycles
//! - Drive the frame engine on a dedicated acquisition thread
//! - Hand frames and temperature readings to a `FrameEmitter`
//!
//! ## Usage Example
//!
//! ```ignore
//! use ingestion::{AcquisitionOptions, AcquisitionPipeline};
//!
//! let devices = DeviceFactory::build(&blueprint.sensor)?;
//! let pipeline = AcquisitionPipeline::new(
//!     AcquisitionOptions::from_blueprint(&blueprint),
//!     devices.bus,
//!     devices.registers,
//!     settings.clone(),
//!     Box::new(emitter),
//! );
//!
//! let handle = pipeline.spawn()?;
//! // ... later
//! handle.stop();
//! let report = handle.join()?;
//! println!("{}", report.summary);
//! ```

mod config;
mod error;
mod pipeline;
mod recovery;
mod sync;

pub use config::{AcquisitionMetrics, AcquisitionOptions, MetricsSnapshot};
pub use error::{AcquisitionError, Result};
pub use pipeline::{
    AcquisitionControl, AcquisitionHandle, AcquisitionPipeline, AcquisitionReport, StopReason,
    THREAD_NAME,
};
pub use recovery::{RecoveryController, RecoveryOptions};
pub use sync::{PassOutcome, PassReport, ResyncHandler, SyncController, SyncOptions};
