//! Acquisition metrics
//!
//! Prometheus counters/gauges for the acquisition loop and dispatch path, and
//! an in-memory aggregator for end-of-run summaries.

use contracts::ScaleWindow;
use metrics::{counter, gauge, histogram};

/// Record one completed pass
///
/// # Example
///
/// ```ignore
/// use observability::metrics::record_pass;
///
/// let outcome = controller.read_pass(&mut bus, &mut state, &mut recovery)?;
/// record_pass(packets_read, resets_in_pass);
/// ```
pub fn record_pass(packets: u64, resets: u32) {
    counter!("thermocam_passes_total").increment(1);
    counter!("thermocam_packets_read_total").increment(packets);
    histogram!("thermocam_pass_resets").record(f64::from(resets));
}

/// Record a packet-number mismatch
pub fn record_resync() {
    counter!("thermocam_resync_events_total").increment(1);
}

/// Record a pass dropped for an invalid segment id
pub fn record_wrong_segment(segment: u8) {
    counter!(
        "thermocam_wrong_segments_total",
        "segment" => segment.to_string()
    )
    .increment(1);
}

/// Record a reboot cycle
pub fn record_reboot(command_ok: bool) {
    let status = if command_ok { "success" } else { "failure" };
    counter!("thermocam_reboot_cycles_total", "status" => status).increment(1);
}

/// Record a flat-field correction request
pub fn record_ffc(success: bool) {
    let status = if success { "success" } else { "failure" };
    counter!("thermocam_ffc_total", "status" => status).increment(1);
}

/// Record a rendered frame
pub fn record_frame_rendered(frame_id: u64, window: &ScaleWindow, zero_words: u32) {
    counter!("thermocam_frames_rendered_total").increment(1);
    gauge!("thermocam_last_frame_id").set(frame_id as f64);
    gauge!("thermocam_window_min").set(f64::from(window.min));
    gauge!("thermocam_window_max").set(f64::from(window.max));
    if zero_words > 0 {
        counter!("thermocam_zero_words_total").increment(u64::from(zero_words));
    }
}

/// Record a frame published to the latest-wins slot
pub fn record_frame_published() {
    counter!("thermocam_frames_published_total").increment(1);
}

/// Record a frame delivered to a display sink
pub fn record_frame_dispatched(sink_name: &str, success: bool) {
    let status = if success { "success" } else { "failure" };
    counter!(
        "thermocam_frames_dispatched_total",
        "sink" => sink_name.to_string(),
        "status" => status
    )
    .increment(1);
}

/// Record a telemetry outcome (`sent`, `failed`, `dropped`)
pub fn record_telemetry(outcome: &'static str) {
    counter!("thermocam_telemetry_total", "outcome" => outcome).increment(1);
}

/// Record the last sampled temperature
pub fn record_temperature(celsius: f32) {
    gauge!("thermocam_sample_temperature_celsius").set(f64::from(celsius));
}

/// Acquisition metrics aggregator
///
/// Aggregates in memory for the end-of-run summary.
#[derive(Debug, Clone, Default)]
pub struct AcquisitionAggregator {
    pub passes: u64,
    pub packets: u64,
    pub resyncs: u64,
    pub reboots: u64,
    pub wrong_segments: u64,
    pub zero_words: u64,
    pub frames: u64,
    pub window_min: RunningStats,
    pub window_max: RunningStats,
    pub frame_interval_ms: RunningStats,
    pub temperature: RunningStats,
    last_frame_at: Option<f64>,
}

impl AcquisitionAggregator {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn on_pass(&mut self, packets: u64) {
        self.passes += 1;
        self.packets += packets;
    }

    pub fn on_resync(&mut self) {
        self.resyncs += 1;
    }

    pub fn on_reboot(&mut self) {
        self.reboots += 1;
    }

    pub fn on_wrong_segment(&mut self) {
        self.wrong_segments += 1;
    }

    /// Frame rendered at `timestamp` (Unix seconds)
    pub fn on_frame(&mut self, timestamp: f64, window: &ScaleWindow, zero_words: u32) {
        self.frames += 1;
        self.zero_words += u64::from(zero_words);
        self.window_min.push(f64::from(window.min));
        self.window_max.push(f64::from(window.max));
        if let Some(last) = self.last_frame_at {
            self.frame_interval_ms.push((timestamp - last) * 1000.0);
        }
        self.last_frame_at = Some(timestamp);
    }

    pub fn on_temperature(&mut self, celsius: f32) {
        self.temperature.push(f64::from(celsius));
    }

    /// Build summary report
    pub fn summary(&self) -> AcquisitionSummary {
        let interval = StatsSummary::from(&self.frame_interval_ms);
        AcquisitionSummary {
            passes: self.passes,
            packets: self.packets,
            resyncs: self.resyncs,
            reboots: self.reboots,
            wrong_segments: self.wrong_segments,
            zero_words: self.zero_words,
            frames: self.frames,
            fps: if interval.count > 0 && interval.mean > 0.0 {
                1000.0 / interval.mean
            } else {
                0.0
            },
            window_min: StatsSummary::from(&self.window_min),
            window_max: StatsSummary::from(&self.window_max),
            frame_interval_ms: interval,
            temperature: StatsSummary::from(&self.temperature),
        }
    }

    /// Reset statistics
    pub fn reset(&mut self) {
        *self = Self::default();
    }
}

/// Acquisition summary
#[derive(Debug, Clone, Default)]
pub struct AcquisitionSummary {
    pub passes: u64,
    pub packets: u64,
    pub resyncs: u64,
    pub reboots: u64,
    pub wrong_segments: u64,
    pub zero_words: u64,
    pub frames: u64,
    pub fps: f64,
    pub window_min: StatsSummary,
    pub window_max: StatsSummary,
    pub frame_interval_ms: StatsSummary,
    pub temperature: StatsSummary,
}

impl std::fmt::Display for AcquisitionSummary {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        writeln!(f, "=== Acquisition Summary ===")?;
        writeln!(f, "Frames: {} ({:.1} fps)", self.frames, self.fps)?;
        writeln!(f, "Passes: {} ({} packets)", self.passes, self.packets)?;
        writeln!(f, "Resync events: {}", self.resyncs)?;
        writeln!(f, "Reboot cycles: {}", self.reboots)?;
        writeln!(f, "Wrong segments: {}", self.wrong_segments)?;
        writeln!(f, "Zero words: {}", self.zero_words)?;
        writeln!(f, "Window min: {}", self.window_min)?;
        writeln!(f, "Window max: {}", self.window_max)?;
        writeln!(f, "Frame interval (ms): {}", self.frame_interval_ms)?;
        writeln!(f, "Temperature (C): {}", self.temperature)?;
        Ok(())
    }
}

/// Statistics summary
#[derive(Debug, Clone, Default)]
pub struct StatsSummary {
    pub count: u64,
    pub min: f64,
    pub max: f64,
    pub mean: f64,
    pub std_dev: f64,
}

impl From<&RunningStats> for StatsSummary {
    fn from(stats: &RunningStats) -> Self {
        Self {
            count: stats.count,
            min: stats.min,
            max: stats.max,
            mean: stats.mean(),
            std_dev: stats.std_dev(),
        }
    }
}

impl std::fmt::Display for StatsSummary {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        if self.count == 0 {
            write!(f, "N/A")
        } else {
            write!(
                f,
                "min={:.3}, max={:.3}, mean={:.3}, std={:.3} (n={})",
                self.min, self.max, self.mean, self.std_dev, self.count
            )
        }
    }
}

/// Online statistics (Welford's algorithm)
#[derive(Debug, Clone, Default)]
pub struct RunningStats {
    count: u64,
    mean: f64,
    m2: f64,
    min: f64,
    max: f64,
}

impl RunningStats {
    /// Add a value
    pub fn push(&mut self, value: f64) {
        self.count += 1;

        if self.count == 1 {
            self.min = value;
            self.max = value;
            self.mean = value;
            self.m2 = 0.0;
        } else {
            self.min = self.min.min(value);
            self.max = self.max.max(value);

            let delta = value - self.mean;
            self.mean += delta / self.count as f64;
            let delta2 = value - self.mean;
            self.m2 += delta * delta2;
        }
    }

    pub fn count(&self) -> u64 {
        self.count
    }

    pub fn mean(&self) -> f64 {
        if self.count == 0 {
            0.0
        } else {
            self.mean
        }
    }

    /// Sample variance
    pub fn variance(&self) -> f64 {
        if self.count < 2 {
            0.0
        } else {
            self.m2 / (self.count - 1) as f64
        }
    }

    pub fn std_dev(&self) -> f64 {
        self.variance().sqrt()
    }

    pub fn min(&self) -> f64 {
        self.min
    }

    pub fn max(&self) -> f64 {
        self.max
    }
}
