//! # Observability
//!
//! Prometheus export and acquisition metrics.
//!
//! Tracing subscribers are installed by the binary; this crate only records.
//!
//! ## Example
//!
//! ```ignore
//! observability::init_metrics_only(9000)?;
//!
//! if let Some(output) = engine.process(pass, &config, &mut state) {
//!     observability::record_frame_rendered(output.frame.frame_id, &output.frame.window, 0);
//! }
//! ```

pub mod metrics;

use std::net::SocketAddr;

use anyhow::{Context, Result};
use metrics_exporter_prometheus::PrometheusBuilder;

// Re-exports
pub use crate::metrics::{
    record_ffc, record_frame_dispatched, record_frame_published, record_frame_rendered,
    record_pass, record_reboot, record_resync, record_telemetry, record_temperature,
    record_wrong_segment, AcquisitionAggregator, AcquisitionSummary, RunningStats, StatsSummary,
};

/// Address the Prometheus listener binds for `port`
pub fn metrics_addr(port: u16) -> SocketAddr {
    SocketAddr::from(([0, 0, 0, 0], port))
}

/// Install the Prometheus recorder and its HTTP listener
///
/// Must be called at most once per process.
pub fn init_metrics_only(port: u16) -> Result<()> {
    PrometheusBuilder::new()
        .with_http_listener(metrics_addr(port))
        .install()
        .with_context(|| format!("Failed to install Prometheus recorder on port {port}"))?;

    tracing::info!(port, "Prometheus metrics endpoint initialized");
    Ok(())
}
