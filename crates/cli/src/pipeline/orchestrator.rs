//! Pipeline orchestrator - coordinates all components.
//!
//! Devices and the acquisition loop run on a dedicated thread; sinks and
//! telemetry run on the tokio runtime and are fed through a latest-frame
//! slot and a rate-limited telemetry offer.

use std::sync::Arc;
use std::time::{Duration, Instant};

use anyhow::{Context, Result};
use contracts::{CameraBlueprint, RenderSettings};
use device::DeviceFactory;
use dispatcher::{create_dispatcher, spawn_telemetry, FramePublisher, FrameSlot, HttpTelemetrySink};
use ingestion::{AcquisitionControl, AcquisitionOptions, AcquisitionPipeline};
use tokio::task::JoinHandle;
use tracing::{info, warn};

use super::PipelineStats;
use crate::error::CliError;

/// Telemetry sink name used in logs and metrics
const TELEMETRY_SINK_NAME: &str = "http_telemetry";

/// Pipeline configuration
#[derive(Debug, Clone)]
pub struct PipelineConfig {
    /// Effective camera configuration (CLI overrides applied)
    pub blueprint: CameraBlueprint,

    /// Maximum number of frames to render (None = unlimited)
    pub max_frames: Option<u64>,

    /// Pipeline timeout (None = no timeout)
    pub timeout: Option<Duration>,

    /// Metrics server port (None = disabled)
    pub metrics_port: Option<u16>,
}

/// Main pipeline orchestrator
pub struct Pipeline {
    config: PipelineConfig,
}

impl Pipeline {
    /// Create a new pipeline with the given configuration
    pub fn new(config: PipelineConfig) -> Self {
        Self { config }
    }

    /// Run the pipeline until the frame limit, the timeout, the end of the
    /// packet source or a shutdown signal
    pub async fn run(self) -> Result<PipelineStats> {
        let start_time = Instant::now();
        let PipelineConfig {
            blueprint,
            max_frames,
            timeout,
            metrics_port,
        } = self.config;

        // Initialize Metrics (optional)
        if let Some(port) = metrics_port {
            observability::init_metrics_only(port)?;
            info!("Metrics endpoint available on port {}", port);
        }

        let devices = DeviceFactory::build(&blueprint.sensor)
            .map_err(|e| CliError::device_setup(blueprint.sensor.transport, e.to_string()))?;

        // Display sinks share the latest-frame slot
        let slot = FrameSlot::new();
        let dispatcher = create_dispatcher(blueprint.sinks.clone(), slot.clone())
            .await
            .context("Failed to create sinks")?;
        info!(sinks = dispatcher.sink_count(), "Dispatcher ready");

        let (offer, telemetry_worker) = match blueprint.telemetry.endpoint {
            Some(ref endpoint) => {
                let sink = HttpTelemetrySink::new(
                    TELEMETRY_SINK_NAME,
                    endpoint.clone(),
                    Duration::from_millis(blueprint.telemetry.timeout_ms),
                )
                .context("Failed to create telemetry sink")?;
                let interval = Duration::from_secs(blueprint.telemetry.interval_secs);
                info!(endpoint = %endpoint, interval_secs = interval.as_secs(), "Telemetry enabled");
                let (offer, worker) = spawn_telemetry(sink, interval);
                (Some(offer), Some(worker))
            }
            None => {
                info!("Telemetry disabled (no endpoint configured)");
                (None, None)
            }
        };

        let settings = RenderSettings::new(blueprint.render_config());
        let mut options = AcquisitionOptions::from_blueprint(&blueprint);
        options.max_frames = max_frames;

        let handle = AcquisitionPipeline::new(
            options,
            devices.bus,
            devices.registers,
            settings,
            Box::new(FramePublisher::new(slot.clone(), offer)),
        )
        .spawn()
        .context("Failed to start acquisition thread")?;

        let control = handle.control();
        let ffc_listener = spawn_ffc_listener(Arc::clone(&control));

        let mut join = tokio::task::spawn_blocking(move || handle.join());
        let shutdown = shutdown_signal();
        let deadline = async {
            match timeout {
                Some(duration) => tokio::time::sleep(duration).await,
                None => std::future::pending().await,
            }
        };
        tokio::pin!(shutdown, deadline);

        let joined = tokio::select! {
            result = &mut join => result,
            _ = &mut shutdown => {
                warn!("Received shutdown signal, stopping acquisition...");
                control.stop();
                join.await
            }
            _ = &mut deadline => {
                info!(timeout_secs = timeout.map(|t| t.as_secs()), "Pipeline timeout reached");
                control.stop();
                join.await
            }
        };

        if let Some(listener) = ffc_listener {
            listener.abort();
        }

        // The acquisition thread has exited, so the publisher and the
        // telemetry offer are gone; drain the consumers.
        let frames_published = slot.published();
        let sinks = dispatcher.shutdown().await;
        let telemetry = match telemetry_worker {
            Some(worker) => Some(worker.shutdown().await),
            None => None,
        };

        let report = joined
            .map_err(|e| CliError::pipeline_execution(format!("acquisition join failed: {e}")))?
            .context("Acquisition failed")?;

        Ok(PipelineStats {
            duration: start_time.elapsed(),
            stop_reason: report.stop_reason,
            summary: report.summary,
            frames_published,
            sinks,
            telemetry,
        })
    }
}

/// Forward SIGUSR1 to the acquisition loop as a flat-field correction request
#[cfg(unix)]
fn spawn_ffc_listener(control: Arc<AcquisitionControl>) -> Option<JoinHandle<()>> {
    use tokio::signal::unix::{signal, SignalKind};

    let mut usr1 = match signal(SignalKind::user_defined1()) {
        Ok(stream) => stream,
        Err(e) => {
            warn!(error = %e, "Failed to install SIGUSR1 handler, FFC on demand disabled");
            return None;
        }
    };

    Some(tokio::spawn(async move {
        while usr1.recv().await.is_some() {
            info!("SIGUSR1 received, requesting flat-field correction");
            control.request_ffc();
        }
    }))
}

#[cfg(not(unix))]
fn spawn_ffc_listener(_control: Arc<AcquisitionControl>) -> Option<JoinHandle<()>> {
    None
}

/// Setup Ctrl+C and SIGTERM signal handlers
async fn shutdown_signal() {
    let ctrl_c = async {
        tokio::signal::ctrl_c()
            .await
            .expect("Failed to install Ctrl+C handler");
    };

    #[cfg(unix)]
    let terminate = async {
        tokio::signal::unix::signal(tokio::signal::unix::SignalKind::terminate())
            .expect("Failed to install SIGTERM handler")
            .recv()
            .await;
    };

    #[cfg(not(unix))]
    let terminate = std::future::pending::<()>();

    tokio::select! {
        _ = ctrl_c => {},
        _ = terminate => {},
    }
}
