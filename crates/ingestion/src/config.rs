//! Acquisition options and live metrics

use std::sync::atomic::{AtomicU64, Ordering};
use std::time::Duration;

use contracts::{CameraBlueprint, LinearCorrection, PixelCoord};

/// Acquisition loop options
#[derive(Debug, Clone)]
pub struct AcquisitionOptions {
    /// Consecutive resyncs that trigger a reboot cycle
    pub reset_threshold: u32,

    /// Delay after each resync
    pub resync_delay: Duration,

    /// Delay between reboot and reopening the bus
    pub settle_delay: Duration,

    /// Resets in one pass at which a warning is logged
    pub slow_pass_resets: u32,

    /// Repeating faults are logged once per this many occurrences
    pub warn_every: u32,

    /// Reboot cycles without a valid pass before failing (0 = unlimited)
    pub max_consecutive_reboots: u32,

    /// Periodic flat-field correction
    pub ffc_interval: Option<Duration>,

    /// Linear correction applied at startup
    pub correction: LinearCorrection,

    /// Pixel sampled for telemetry (`None` = frame center)
    pub sample: Option<PixelCoord>,

    /// Device id stamped on temperature readings
    pub device_id: String,

    /// Stop after this many frames
    pub max_frames: Option<u64>,
}

impl Default for AcquisitionOptions {
    fn default() -> Self {
        Self::from_blueprint(&CameraBlueprint::default())
    }
}

impl AcquisitionOptions {
    pub fn from_blueprint(blueprint: &CameraBlueprint) -> Self {
        let acquisition = &blueprint.acquisition;
        Self {
            reset_threshold: acquisition.reset_threshold,
            resync_delay: Duration::from_micros(acquisition.resync_delay_us),
            settle_delay: Duration::from_millis(acquisition.settle_delay_ms),
            slow_pass_resets: acquisition.slow_pass_resets,
            warn_every: acquisition.warn_every,
            max_consecutive_reboots: acquisition.max_consecutive_reboots,
            ffc_interval: (acquisition.ffc_interval_secs > 0)
                .then(|| Duration::from_secs(acquisition.ffc_interval_secs)),
            correction: blueprint.sensor.correction,
            sample: blueprint.telemetry.sample,
            device_id: blueprint.telemetry.device_id.clone(),
            max_frames: None,
        }
    }

    /// Options with no delays, for tests and replay
    pub fn without_delays(mut self) -> Self {
        self.resync_delay = Duration::ZERO;
        self.settle_delay = Duration::ZERO;
        self
    }
}

/// Live acquisition metrics
///
/// Written by the acquisition thread, read by anyone holding the handle.
#[derive(Debug, Default)]
pub struct AcquisitionMetrics {
    /// Passes completed
    pub passes: AtomicU64,

    /// Packets read
    pub packets_read: AtomicU64,

    /// Resync events
    pub resyncs: AtomicU64,

    /// Reboot cycles
    pub reboots: AtomicU64,

    /// Passes dropped for a wrong segment id
    pub wrong_segments: AtomicU64,

    /// Frames rendered
    pub frames: AtomicU64,
}

impl AcquisitionMetrics {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn record_pass(&self, packets: u64, resyncs: u32) {
        self.passes.fetch_add(1, Ordering::Relaxed);
        self.packets_read.fetch_add(packets, Ordering::Relaxed);
        self.resyncs.fetch_add(u64::from(resyncs), Ordering::Relaxed);
    }

    pub fn record_wrong_segment(&self) {
        self.wrong_segments.fetch_add(1, Ordering::Relaxed);
    }

    pub fn set_reboots(&self, reboots: u64) {
        self.reboots.store(reboots, Ordering::Relaxed);
    }

    pub fn record_frame(&self) {
        self.frames.fetch_add(1, Ordering::Relaxed);
    }

    /// Get snapshot
    pub fn snapshot(&self) -> MetricsSnapshot {
        MetricsSnapshot {
            passes: self.passes.load(Ordering::Relaxed),
            packets_read: self.packets_read.load(Ordering::Relaxed),
            resyncs: self.resyncs.load(Ordering::Relaxed),
            reboots: self.reboots.load(Ordering::Relaxed),
            wrong_segments: self.wrong_segments.load(Ordering::Relaxed),
            frames: self.frames.load(Ordering::Relaxed),
        }
    }
}

/// Metrics snapshot
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct MetricsSnapshot {
    pub passes: u64,
    pub packets_read: u64,
    pub resyncs: u64,
    pub reboots: u64,
    pub wrong_segments: u64,
    pub frames: u64,
}
