//! Pipeline statistics.

use std::time::Duration;

use dispatcher::{MetricsSnapshot, TelemetrySnapshot};
use ingestion::StopReason;
use observability::AcquisitionSummary;

/// Statistics from a pipeline run
#[derive(Debug, Clone)]
pub struct PipelineStats {
    /// Total duration of the pipeline run
    pub duration: Duration,

    /// Why acquisition stopped
    pub stop_reason: StopReason,

    /// Acquisition loop counters
    pub summary: AcquisitionSummary,

    /// Frames handed to the latest-frame slot
    pub frames_published: u64,

    /// Per-sink write statistics
    pub sinks: Vec<(String, MetricsSnapshot)>,

    /// Telemetry statistics (None when telemetry is disabled)
    pub telemetry: Option<TelemetrySnapshot>,
}

impl PipelineStats {
    /// Rendered frames per second over the whole run
    pub fn fps(&self) -> f64 {
        if self.duration.as_secs_f64() > 0.0 {
            self.summary.frames as f64 / self.duration.as_secs_f64()
        } else {
            0.0
        }
    }

    /// Share of frames a sink never saw because a newer frame replaced them
    pub fn skip_rate(snapshot: &MetricsSnapshot) -> f64 {
        let total = snapshot.write_count + snapshot.failure_count + snapshot.skipped_count;
        if total > 0 {
            (snapshot.skipped_count as f64 / total as f64) * 100.0
        } else {
            0.0
        }
    }

    /// Print detailed summary
    pub fn print_summary(&self) {
        println!("\n╔══════════════════════════════════════════════════════════════╗");
        println!("║                    Pipeline Statistics                       ║");
        println!("╚══════════════════════════════════════════════════════════════╝\n");

        println!("📊 Overview");
        println!("   ├─ Duration: {:.2}s", self.duration.as_secs_f64());
        println!("   ├─ Stopped: {}", self.stop_reason);
        println!("   ├─ Frames rendered: {}", self.summary.frames);
        println!("   ├─ Frames published: {}", self.frames_published);
        println!("   └─ FPS: {:.2}", self.fps());

        let s = &self.summary;
        println!("\n📈 Acquisition");
        println!("   ├─ Passes: {} ({} packets)", s.passes, s.packets);
        println!("   ├─ Resync events: {}", s.resyncs);
        println!("   ├─ Reboot cycles: {}", s.reboots);
        println!("   ├─ Wrong segments: {}", s.wrong_segments);
        println!("   ├─ Zero words: {}", s.zero_words);
        println!("   ├─ Window min: {}", s.window_min);
        println!("   ├─ Window max: {}", s.window_max);
        println!("   └─ Frame interval (ms): {}", s.frame_interval_ms);

        if !self.sinks.is_empty() {
            println!("\n🖼  Sinks");
            for (i, (name, metrics)) in self.sinks.iter().enumerate() {
                let branch = if i + 1 == self.sinks.len() { "└─" } else { "├─" };
                println!(
                    "   {} {}: {} written, {} failed, {} skipped ({:.1}%)",
                    branch,
                    name,
                    metrics.write_count,
                    metrics.failure_count,
                    metrics.skipped_count,
                    Self::skip_rate(metrics)
                );
            }
        }

        if let Some(ref telemetry) = self.telemetry {
            println!("\n🌡  Telemetry");
            println!("   ├─ Sent: {}", telemetry.sent);
            println!("   ├─ Failed: {}", telemetry.failed);
            println!("   ├─ Dropped (busy): {}", telemetry.dropped);
            println!("   ├─ Skipped (rate limit): {}", telemetry.skipped);
            println!("   └─ Temperature (C): {}", s.temperature);
        }

        println!();
    }
}
