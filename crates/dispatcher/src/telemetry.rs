//! Rate-limited, best-effort telemetry
//!
//! The acquisition thread offers readings through [`TelemetryOffer`]; a tokio
//! worker delivers them to a [`TelemetrySink`] one at a time. The channel
//! holds a single reading, so an offer made while a delivery is still in
//! flight is dropped instead of queued.

use std::sync::Arc;
use std::time::{Duration, Instant};

use contracts::{TelemetrySink, TemperatureReading};
use tokio::sync::mpsc;
use tokio::task::JoinHandle;
use tracing::{debug, error, instrument, warn};

use crate::metrics::{TelemetryMetrics, TelemetrySnapshot};

/// Minimum-interval gate
#[derive(Debug, Clone)]
pub struct TelemetryGate {
    interval: Duration,
    last: Option<Instant>,
}

impl TelemetryGate {
    pub fn new(interval: Duration) -> Self {
        Self {
            interval,
            last: None,
        }
    }

    /// Whether an offer at `now` falls outside the interval
    pub fn is_open(&self, now: Instant) -> bool {
        self.last
            .is_none_or(|last| now.saturating_duration_since(last) >= self.interval)
    }

    /// Start a new interval at `now`
    pub fn mark(&mut self, now: Instant) {
        self.last = Some(now);
    }
}

/// Outcome of one offer
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum OfferOutcome {
    /// Handed to the worker
    Queued,
    /// Inside the rate-limit interval
    Skipped,
    /// Worker still busy with the previous reading
    Dropped,
    /// Worker has stopped
    Closed,
}

/// Sending side, owned by the frame emitter
#[derive(Debug)]
pub struct TelemetryOffer {
    tx: mpsc::Sender<TemperatureReading>,
    gate: TelemetryGate,
    metrics: Arc<TelemetryMetrics>,
}

impl TelemetryOffer {
    /// Offer a reading; never blocks
    ///
    /// The interval restarts only when a reading is actually queued.
    pub fn offer(&mut self, reading: TemperatureReading) -> OfferOutcome {
        self.offer_at(reading, Instant::now())
    }

    fn offer_at(&mut self, reading: TemperatureReading, now: Instant) -> OfferOutcome {
        if !self.gate.is_open(now) {
            self.metrics.inc_skipped();
            observability::record_telemetry("skipped");
            return OfferOutcome::Skipped;
        }

        match self.tx.try_send(reading) {
            Ok(()) => {
                self.gate.mark(now);
                OfferOutcome::Queued
            }
            Err(mpsc::error::TrySendError::Full(reading)) => {
                self.metrics.inc_dropped();
                observability::record_telemetry("dropped");
                debug!(
                    temperature = reading.temperature,
                    "telemetry sender busy, reading dropped"
                );
                OfferOutcome::Dropped
            }
            Err(mpsc::error::TrySendError::Closed(_)) => OfferOutcome::Closed,
        }
    }
}

/// Worker side, owned by whoever shuts the pipeline down
pub struct TelemetryWorker {
    name: String,
    metrics: Arc<TelemetryMetrics>,
    handle: JoinHandle<()>,
}

impl TelemetryWorker {
    pub fn name(&self) -> &str {
        &self.name
    }

    pub fn metrics(&self) -> TelemetrySnapshot {
        self.metrics.snapshot()
    }

    /// Wait for the worker; it exits once every offer side is dropped
    #[instrument(name = "telemetry_worker_shutdown", skip(self), fields(sink = %self.name))]
    pub async fn shutdown(self) -> TelemetrySnapshot {
        if let Err(e) = self.handle.await {
            error!(sink = %self.name, error = ?e, "telemetry worker panicked");
        }
        self.metrics.snapshot()
    }
}

/// Spawn a telemetry worker for `sink`
pub fn spawn_telemetry<S: TelemetrySink + 'static>(
    sink: S,
    interval: Duration,
) -> (TelemetryOffer, TelemetryWorker) {
    let name = sink.name().to_string();
    let (tx, rx) = mpsc::channel(1);
    let metrics = Arc::new(TelemetryMetrics::new());

    let handle = tokio::spawn(telemetry_worker(sink, rx, Arc::clone(&metrics)));

    (
        TelemetryOffer {
            tx,
            gate: TelemetryGate::new(interval),
            metrics: Arc::clone(&metrics),
        },
        TelemetryWorker {
            name,
            metrics,
            handle,
        },
    )
}

async fn telemetry_worker<S: TelemetrySink>(
    mut sink: S,
    mut rx: mpsc::Receiver<TemperatureReading>,
    metrics: Arc<TelemetryMetrics>,
) {
    debug!(sink = %sink.name(), "telemetry worker started");

    while let Some(reading) = rx.recv().await {
        match sink.send(&reading).await {
            Ok(()) => {
                metrics.inc_sent();
                observability::record_telemetry("sent");
                debug!(
                    sink = %sink.name(),
                    temperature = reading.temperature,
                    timestamp = reading.timestamp,
                    "temperature sent"
                );
            }
            Err(e) => {
                metrics.inc_failed();
                observability::record_telemetry("failed");
                warn!(sink = %sink.name(), error = %e, "failed to send temperature");
            }
        }
    }

    debug!(sink = %sink.name(), "telemetry worker stopped");
}

#[cfg(test)]
mod tests {
    use super::*;
    use contracts::ContractError;
    use std::sync::Mutex;
    use tokio::sync::Notify;

    fn reading(temperature: f32) -> TemperatureReading {
        TemperatureReading {
            temperature,
            timestamp: 1_700_000_000,
            device_id: "test".to_string(),
        }
    }

    struct RecordingSink {
        sent: Arc<Mutex<Vec<TemperatureReading>>>,
        release: Option<Arc<Notify>>,
        fail: bool,
    }

    impl TelemetrySink for RecordingSink {
        fn name(&self) -> &str {
            "recording"
        }

        async fn send(&mut self, reading: &TemperatureReading) -> Result<(), ContractError> {
            if let Some(release) = &self.release {
                release.notified().await;
            }
            if self.fail {
                return Err(ContractError::sink_write("recording", "unreachable"));
            }
            self.sent.lock().unwrap().push(reading.clone());
            Ok(())
        }
    }

    #[test]
    fn test_gate_interval() {
        let start = Instant::now();
        let mut gate = TelemetryGate::new(Duration::from_secs(10));
        assert!(gate.is_open(start));
        gate.mark(start);
        assert!(!gate.is_open(start + Duration::from_secs(9)));
        assert!(gate.is_open(start + Duration::from_secs(10)));
    }

    #[tokio::test]
    async fn test_offers_inside_interval_are_skipped() {
        let sent = Arc::new(Mutex::new(Vec::new()));
        let sink = RecordingSink {
            sent: Arc::clone(&sent),
            release: None,
            fail: false,
        };
        let (mut offer, worker) = spawn_telemetry(sink, Duration::from_secs(10));

        let start = Instant::now();
        assert_eq!(offer.offer_at(reading(20.0), start), OfferOutcome::Queued);
        assert_eq!(
            offer.offer_at(reading(21.0), start + Duration::from_secs(1)),
            OfferOutcome::Skipped
        );

        assert_eq!(
            offer.offer_at(reading(22.0), start + Duration::from_secs(9)),
            OfferOutcome::Skipped
        );

        drop(offer);
        let snapshot = worker.shutdown().await;
        assert_eq!(snapshot.sent, 1);
        assert_eq!(snapshot.skipped, 2);
        assert_eq!(snapshot.dropped, 0);
        assert_eq!(sent.lock().unwrap()[0].temperature, 20.0);
    }

    #[tokio::test]
    async fn test_busy_sender_drops() {
        let release = Arc::new(Notify::new());
        let sink = RecordingSink {
            sent: Arc::new(Mutex::new(Vec::new())),
            release: Some(Arc::clone(&release)),
            fail: false,
        };
        let (mut offer, worker) = spawn_telemetry(sink, Duration::ZERO);

        let now = Instant::now();
        assert_eq!(offer.offer_at(reading(1.0), now), OfferOutcome::Queued);
        // Let the worker take the first reading and block in send.
        tokio::task::yield_now().await;
        tokio::time::sleep(Duration::from_millis(20)).await;
        assert_eq!(offer.offer_at(reading(2.0), now), OfferOutcome::Queued);
        assert_eq!(offer.offer_at(reading(3.0), now), OfferOutcome::Dropped);

        release.notify_one();
        tokio::time::sleep(Duration::from_millis(20)).await;
        release.notify_one();
        drop(offer);
        let snapshot = worker.shutdown().await;
        assert_eq!(snapshot.sent, 2);
        assert_eq!(snapshot.dropped, 1);
    }

    #[tokio::test]
    async fn test_failures_are_counted_not_retried() {
        let sink = RecordingSink {
            sent: Arc::new(Mutex::new(Vec::new())),
            release: None,
            fail: true,
        };
        let (mut offer, worker) = spawn_telemetry(sink, Duration::from_secs(10));
        offer.offer(reading(5.0));
        drop(offer);

        let snapshot = worker.shutdown().await;
        assert_eq!(snapshot.failed, 1);
        assert_eq!(snapshot.sent, 0);
    }
}
