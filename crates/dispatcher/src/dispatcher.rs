//! Dispatcher - fans the frame slot out to display sinks

use contracts::{SinkConfig, SinkType};
use tracing::{info, instrument};

use crate::error::{DispatcherError, Result};
use crate::handle::SinkHandle;
use crate::metrics::MetricsSnapshot;
use crate::sinks::{FileSink, LogSink};
use crate::slot::FrameSlot;

/// Dispatcher configuration
#[derive(Debug, Clone)]
pub struct DispatcherConfig {
    /// Sink configurations
    pub sinks: Vec<SinkConfig>,
}

/// Builder for creating a Dispatcher
pub struct DispatcherBuilder {
    config: DispatcherConfig,
    slot: FrameSlot,
}

impl DispatcherBuilder {
    /// Create a new DispatcherBuilder
    pub fn new(config: DispatcherConfig, slot: FrameSlot) -> Self {
        Self { config, slot }
    }

    /// Build and start the dispatcher
    #[instrument(name = "dispatcher_builder_build", skip(self))]
    pub async fn build(self) -> Result<Dispatcher> {
        let handles = Self::initialize_handles(&self.config, &self.slot)?;

        Ok(Dispatcher {
            slot: self.slot,
            handles,
        })
    }

    #[instrument(
        name = "dispatcher_initialize_handles",
        skip(config, slot),
        fields(sink_count = config.sinks.len())
    )]
    fn initialize_handles(config: &DispatcherConfig, slot: &FrameSlot) -> Result<Vec<SinkHandle>> {
        let mut handles = Vec::with_capacity(config.sinks.len());
        for sink_config in &config.sinks {
            handles.push(create_sink_handle(sink_config, slot)?);
        }
        Ok(handles)
    }
}

/// Create a SinkHandle from configuration
#[instrument(
    name = "dispatcher_create_sink_handle",
    skip(config, slot),
    fields(sink = %config.name, sink_type = ?config.sink_type)
)]
fn create_sink_handle(config: &SinkConfig, slot: &FrameSlot) -> Result<SinkHandle> {
    match config.sink_type {
        SinkType::Log => {
            let sink = LogSink::from_params(&config.name, &config.params);
            Ok(SinkHandle::spawn(sink, slot.subscribe()))
        }
        SinkType::File => {
            let sink = FileSink::from_params(&config.name, &config.params).map_err(|e| match e {
                DispatcherError::Io(io) => DispatcherError::sink_creation(&config.name, io.to_string()),
                other => other,
            })?;
            Ok(SinkHandle::spawn(sink, slot.subscribe()))
        }
    }
}

/// Display sinks attached to one frame slot
pub struct Dispatcher {
    slot: FrameSlot,
    handles: Vec<SinkHandle>,
}

impl Dispatcher {
    /// Create a dispatcher with custom sink handles (for testing)
    pub fn with_handles(slot: FrameSlot, handles: Vec<SinkHandle>) -> Self {
        Self { slot, handles }
    }

    /// Slot the sinks observe
    pub fn slot(&self) -> &FrameSlot {
        &self.slot
    }

    /// Number of running sinks
    pub fn sink_count(&self) -> usize {
        self.handles.len()
    }

    /// Get metrics for all sinks
    pub fn metrics(&self) -> Vec<(String, MetricsSnapshot)> {
        self.handles
            .iter()
            .map(|h| (h.name().to_string(), h.metrics().snapshot()))
            .collect()
    }

    /// Stop every sink, writing any frame still pending
    ///
    /// Returns final per-sink metrics.
    #[instrument(name = "dispatcher_shutdown", skip(self), fields(sinks = self.handles.len()))]
    pub async fn shutdown(self) -> Vec<(String, MetricsSnapshot)> {
        let mut metrics = Vec::with_capacity(self.handles.len());
        for handle in self.handles {
            let name = handle.name().to_string();
            let sink_metrics = std::sync::Arc::clone(handle.metrics());
            handle.shutdown().await;
            metrics.push((name, sink_metrics.snapshot()));
        }

        info!(
            published = self.slot.published(),
            "Dispatcher shutdown complete"
        );
        metrics
    }
}

/// Convenience function to create a dispatcher from sink configs
#[instrument(name = "dispatcher_create", skip(sink_configs, slot))]
pub async fn create_dispatcher(sink_configs: Vec<SinkConfig>, slot: FrameSlot) -> Result<Dispatcher> {
    let config = DispatcherConfig {
        sinks: sink_configs,
    };
    DispatcherBuilder::new(config, slot).build().await
}
