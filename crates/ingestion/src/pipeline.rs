//! Acquisition loop
//!
//! Runs sync, assembly, range estimation and rendering on one dedicated
//! thread and hands finished frames to a [`FrameEmitter`].

use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Arc;
use std::thread::JoinHandle;
use std::time::Instant;

use contracts::{
    raw_to_celsius, FrameEmitter, PacketSource, RenderSettings, ScaleWindow, SensorRegisters,
    SyncState, TemperatureReading,
};
use frame_engine::{EngineOptions, FrameEngine, FrameOutput};
use observability::{AcquisitionAggregator, AcquisitionSummary};
use tracing::{debug, error, info, instrument, warn};

use crate::config::{AcquisitionMetrics, AcquisitionOptions, MetricsSnapshot};
use crate::error::{AcquisitionError, Result};
use crate::recovery::{RecoveryController, RecoveryOptions};
use crate::sync::{PassOutcome, SyncController, SyncOptions};

/// Acquisition thread name
pub const THREAD_NAME: &str = "thermocam-acq";

/// Why the loop stopped
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum StopReason {
    /// Stop flag set through the handle
    Requested,
    /// Configured frame limit reached
    FrameLimit,
    /// The packet source ran out (replay or scripted input)
    EndOfStream,
}

impl std::fmt::Display for StopReason {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            Self::Requested => write!(f, "stop requested"),
            Self::FrameLimit => write!(f, "frame limit reached"),
            Self::EndOfStream => write!(f, "end of packet stream"),
        }
    }
}

/// Result of a finished acquisition run
#[derive(Debug, Clone)]
pub struct AcquisitionReport {
    pub stop_reason: StopReason,
    pub summary: AcquisitionSummary,
}

/// Flags shared between the loop and its handle
#[derive(Debug, Default)]
pub struct AcquisitionControl {
    stop: AtomicBool,
    ffc: AtomicBool,
}

impl AcquisitionControl {
    pub fn new() -> Self {
        Self::default()
    }

    /// Ask the loop to stop after the current pass
    pub fn stop(&self) {
        self.stop.store(true, Ordering::Release);
    }

    pub fn is_stopped(&self) -> bool {
        self.stop.load(Ordering::Acquire)
    }

    /// Ask for a flat-field correction before the next pass
    pub fn request_ffc(&self) {
        self.ffc.store(true, Ordering::Release);
    }

    fn take_ffc_request(&self) -> bool {
        self.ffc.swap(false, Ordering::AcqRel)
    }
}

/// Acquisition pipeline
///
/// Owns the bus, the register interface and the emitter until it finishes.
pub struct AcquisitionPipeline {
    options: AcquisitionOptions,
    bus: Box<dyn PacketSource>,
    registers: Box<dyn SensorRegisters>,
    settings: RenderSettings,
    emitter: Box<dyn FrameEmitter>,
    metrics: Arc<AcquisitionMetrics>,
}

impl AcquisitionPipeline {
    pub fn new(
        options: AcquisitionOptions,
        bus: Box<dyn PacketSource>,
        registers: Box<dyn SensorRegisters>,
        settings: RenderSettings,
        emitter: Box<dyn FrameEmitter>,
    ) -> Self {
        Self {
            options,
            bus,
            registers,
            settings,
            emitter,
            metrics: Arc::new(AcquisitionMetrics::new()),
        }
    }

    /// Live metrics handle
    pub fn metrics(&self) -> Arc<AcquisitionMetrics> {
        self.metrics.clone()
    }

    /// Start the loop on its own thread
    pub fn spawn(self) -> Result<AcquisitionHandle> {
        let control = Arc::new(AcquisitionControl::new());
        let metrics = self.metrics.clone();
        let thread_control = control.clone();

        let thread = std::thread::Builder::new()
            .name(THREAD_NAME.to_string())
            .spawn(move || self.run(&thread_control))
            .map_err(AcquisitionError::Spawn)?;

        Ok(AcquisitionHandle {
            control,
            metrics,
            thread: Some(thread),
        })
    }

    /// Run the loop on the calling thread until it stops
    #[instrument(
        name = "acquisition_run",
        skip(self, control),
        fields(bus = %self.bus.name())
    )]
    pub fn run(self, control: &AcquisitionControl) -> Result<AcquisitionReport> {
        let Self {
            options,
            mut bus,
            mut registers,
            settings,
            emitter,
            metrics,
        } = self;

        setup(&options, bus.as_mut(), registers.as_mut())?;

        let recovery = RecoveryController::new(
            registers,
            RecoveryOptions {
                threshold: options.reset_threshold,
                settle_delay: options.settle_delay,
                max_consecutive_reboots: options.max_consecutive_reboots,
            },
        );
        let mut acquisition = AcquisitionLoop {
            options,
            bus,
            settings,
            emitter,
            metrics,
            recovery,
            aggregator: AcquisitionAggregator::new(),
        };

        let result = acquisition.acquire(control);
        acquisition.bus.close();

        match &result {
            Ok(report) => info!(
                reason = %report.stop_reason,
                frames = report.summary.frames,
                "acquisition stopped"
            ),
            Err(e) => error!(error = %e, "acquisition failed"),
        }
        result
    }
}

/// Open the bus and configure the sensor
///
/// Radiometry is required; a failed linear correction only warns.
fn setup(
    options: &AcquisitionOptions,
    bus: &mut dyn PacketSource,
    registers: &mut dyn SensorRegisters,
) -> Result<()> {
    bus.open()?;
    info!(bus = %bus.name(), "bus opened");

    if let Err(source) = registers.enable_radiometry() {
        bus.close();
        return Err(AcquisitionError::setup("enable radiometry", source));
    }

    let correction = options.correction;
    match registers.set_linear_correction(correction.offset, correction.slope) {
        Ok(()) => debug!(
            offset = correction.offset,
            slope = correction.slope,
            "linear correction applied"
        ),
        Err(e) => warn!(error = %e, "failed to apply linear correction"),
    }
    Ok(())
}

struct AcquisitionLoop {
    options: AcquisitionOptions,
    bus: Box<dyn PacketSource>,
    settings: RenderSettings,
    emitter: Box<dyn FrameEmitter>,
    metrics: Arc<AcquisitionMetrics>,
    recovery: RecoveryController,
    aggregator: AcquisitionAggregator,
}

impl AcquisitionLoop {
    fn acquire(&mut self, control: &AcquisitionControl) -> Result<AcquisitionReport> {
        let initial = self.settings.snapshot();
        let mut state = SyncState::new(ScaleWindow::new(initial.range_min, initial.range_max));
        let mut engine = FrameEngine::new(
            initial.variant,
            EngineOptions {
                warn_every: self.options.warn_every,
                sample: self.options.sample,
            },
        );
        let mut sync = SyncController::new(SyncOptions {
            resync_delay: self.options.resync_delay,
            slow_pass_resets: self.options.slow_pass_resets,
            warn_every: self.options.warn_every,
        });
        let mut last_ffc = Instant::now();

        let stop_reason = loop {
            if control.is_stopped() {
                break StopReason::Requested;
            }

            let periodic_due = self
                .options
                .ffc_interval
                .is_some_and(|interval| last_ffc.elapsed() >= interval);
            if control.take_ffc_request() || periodic_due {
                self.recovery.perform_ffc();
                last_ffc = Instant::now();
            }

            // One snapshot per pass; a frame never mixes settings.
            let config = self.settings.snapshot();
            let report = match sync.read_pass(
                config.variant,
                self.bus.as_mut(),
                &mut state,
                &mut self.recovery,
            ) {
                Ok(report) => report,
                Err(e) if e.is_end_of_stream() => break StopReason::EndOfStream,
                Err(e) => return Err(e),
            };

            let reboots = self.recovery.reboots();
            self.aggregator.on_pass(report.packets_read);
            self.aggregator.resyncs += u64::from(report.resyncs);
            self.aggregator.reboots = reboots;
            self.metrics.record_pass(report.packets_read, report.resyncs);
            self.metrics.set_reboots(reboots);
            observability::record_pass(report.packets_read, report.resyncs);

            let segment = match report.outcome {
                PassOutcome::Complete { segment } => segment,
                PassOutcome::Aborted { .. } => {
                    self.aggregator.on_wrong_segment();
                    self.metrics.record_wrong_segment();
                    continue;
                }
            };
            self.recovery.on_valid_pass();

            if let Some(output) = engine.process(sync.pass(segment), &config, &mut state) {
                self.emit(output);
                if self
                    .options
                    .max_frames
                    .is_some_and(|limit| engine.frames_rendered() >= limit)
                {
                    break StopReason::FrameLimit;
                }
            }
        };

        self.aggregator.reboots = self.recovery.reboots();
        Ok(AcquisitionReport {
            stop_reason,
            summary: self.aggregator.summary(),
        })
    }

    fn emit(&mut self, output: FrameOutput) {
        let FrameOutput { frame, stats } = output;

        self.aggregator
            .on_frame(frame.timestamp, &frame.window, stats.zero_words);
        self.metrics.record_frame();
        observability::record_frame_rendered(frame.frame_id, &frame.window, stats.zero_words);

        if let Some(raw) = stats.sample_raw {
            let temperature = raw_to_celsius(raw);
            self.aggregator.on_temperature(temperature);
            observability::record_temperature(temperature);
            self.emitter.offer_reading(TemperatureReading {
                temperature,
                timestamp: frame.timestamp as i64,
                device_id: self.options.device_id.clone(),
            });
        }

        debug!(
            frame_id = frame.frame_id,
            min = frame.window.min,
            max = frame.window.max,
            written = stats.written,
            "frame rendered"
        );
        self.emitter.publish(frame);
    }
}

/// Handle to a running acquisition thread
pub struct AcquisitionHandle {
    control: Arc<AcquisitionControl>,
    metrics: Arc<AcquisitionMetrics>,
    thread: Option<JoinHandle<Result<AcquisitionReport>>>,
}

impl AcquisitionHandle {
    /// Ask the loop to stop after the current pass
    pub fn stop(&self) {
        self.control.stop();
    }

    /// Ask for a flat-field correction
    pub fn request_ffc(&self) {
        self.control.request_ffc();
    }

    /// Shared control flags
    pub fn control(&self) -> Arc<AcquisitionControl> {
        self.control.clone()
    }

    /// Current metrics
    pub fn metrics(&self) -> MetricsSnapshot {
        self.metrics.snapshot()
    }

    /// Whether the thread has exited
    pub fn is_finished(&self) -> bool {
        self.thread.as_ref().is_none_or(JoinHandle::is_finished)
    }

    /// Wait for the thread and return its report
    pub fn join(mut self) -> Result<AcquisitionReport> {
        match self.thread.take() {
            Some(thread) => thread.join().map_err(|_| AcquisitionError::ThreadPanicked)?,
            None => Err(AcquisitionError::ThreadPanicked),
        }
    }
}

impl Drop for AcquisitionHandle {
    fn drop(&mut self) {
        self.control.stop();
    }
}
