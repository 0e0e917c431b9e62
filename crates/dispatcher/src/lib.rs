//! # Dispatcher
//!
//! Frame and telemetry distribution.
//!
//! Responsibilities:
//! - Latest-wins frame slot fed by the acquisition thread
//! - Fan-out to display sinks, each on its own receiver
//! - Isolate slow sinks: they skip frames, never block the publisher
//! - Rate-limited, best-effort temperature telemetry over HTTP

pub mod dispatcher;
pub mod emitter;
pub mod error;
pub mod handle;
pub mod metrics;
pub mod sinks;
pub mod slot;
pub mod telemetry;

pub use contracts::{DisplaySink, RenderedFrame, TelemetrySink};
pub use dispatcher::{create_dispatcher, Dispatcher, DispatcherBuilder, DispatcherConfig};
pub use emitter::FramePublisher;
pub use error::{DispatcherError, Result};
pub use handle::SinkHandle;
pub use metrics::{MetricsSnapshot, SinkMetrics, TelemetryMetrics, TelemetrySnapshot};
pub use sinks::{FileSink, FileSinkConfig, HttpTelemetrySink, LogSink, LATEST_FILE};
pub use slot::{FrameReceiver, FrameSlot};
pub use telemetry::{spawn_telemetry, OfferOutcome, TelemetryGate, TelemetryOffer, TelemetryWorker};
