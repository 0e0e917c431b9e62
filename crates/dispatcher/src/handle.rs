//! SinkHandle - runs one display sink on its own frame receiver

use std::sync::Arc;

use contracts::{DisplaySink, RenderedFrame};
use tokio::sync::oneshot;
use tokio::task::JoinHandle;
use tracing::{debug, error, instrument};

use crate::metrics::SinkMetrics;
use crate::slot::FrameReceiver;

/// Handle to a running sink worker
pub struct SinkHandle {
    /// Sink name
    name: String,
    /// Shared metrics
    metrics: Arc<SinkMetrics>,
    /// Stop signal
    shutdown_tx: oneshot::Sender<()>,
    /// Worker task handle
    worker_handle: JoinHandle<()>,
}

impl SinkHandle {
    /// Spawn a worker that writes every frame it observes on `rx`
    ///
    /// A slow sink skips frames; it never holds back the publisher or the
    /// other sinks.
    pub fn spawn<S: DisplaySink + 'static>(sink: S, rx: FrameReceiver) -> Self {
        let name = sink.name().to_string();
        let metrics = Arc::new(SinkMetrics::new());
        let (shutdown_tx, shutdown_rx) = oneshot::channel();

        let worker_metrics = Arc::clone(&metrics);
        let worker_name = name.clone();

        let worker_handle = tokio::spawn(async move {
            sink_worker(sink, rx, shutdown_rx, worker_metrics, worker_name).await;
        });

        Self {
            name,
            metrics,
            shutdown_tx,
            worker_handle,
        }
    }

    /// Get sink name
    pub fn name(&self) -> &str {
        &self.name
    }

    /// Get current metrics
    pub fn metrics(&self) -> &Arc<SinkMetrics> {
        &self.metrics
    }

    /// Shutdown the sink worker gracefully
    ///
    /// A frame published but not yet written is written before closing.
    #[instrument(name = "sink_handle_shutdown", skip(self), fields(sink = %self.name))]
    pub async fn shutdown(self) {
        let _ = self.shutdown_tx.send(());
        if let Err(e) = self.worker_handle.await {
            error!(sink = %self.name, error = ?e, "Worker task panicked");
        }
        debug!(sink = %self.name, "SinkHandle shutdown complete");
    }
}

/// Worker task that writes the newest frame each time the slot changes
#[instrument(
    name = "sink_worker_loop",
    skip(sink, rx, shutdown_rx, metrics),
    fields(sink = %name)
)]
async fn sink_worker<S: DisplaySink>(
    mut sink: S,
    mut rx: FrameReceiver,
    mut shutdown_rx: oneshot::Receiver<()>,
    metrics: Arc<SinkMetrics>,
    name: String,
) {
    debug!(sink = %name, "Sink worker started");
    let mut last_id: Option<u64> = None;

    loop {
        tokio::select! {
            changed = rx.changed() => {
                if changed.is_err() {
                    break;
                }
            }
            _ = &mut shutdown_rx => {
                if !rx.has_changed().unwrap_or(false) {
                    break;
                }
                let frame = rx.borrow_and_update().clone();
                if let Some(frame) = frame {
                    write_frame(&mut sink, &frame, &metrics, &name, &mut last_id).await;
                }
                break;
            }
        }

        let frame = rx.borrow_and_update().clone();
        if let Some(frame) = frame {
            write_frame(&mut sink, &frame, &metrics, &name, &mut last_id).await;
        }
    }

    // Cleanup
    if let Err(e) = sink.flush().await {
        error!(sink = %name, error = %e, "Flush failed on shutdown");
    }
    if let Err(e) = sink.close().await {
        error!(sink = %name, error = %e, "Close failed on shutdown");
    }

    debug!(sink = %name, "Sink worker stopped");
}

async fn write_frame<S: DisplaySink>(
    sink: &mut S,
    frame: &RenderedFrame,
    metrics: &SinkMetrics,
    name: &str,
    last_id: &mut Option<u64>,
) {
    if let Some(last) = *last_id {
        let missed = frame.frame_id.saturating_sub(last + 1);
        if missed > 0 {
            metrics.add_skipped(missed);
        }
    }
    *last_id = Some(frame.frame_id);

    match sink.write(frame).await {
        Ok(()) => {
            metrics.inc_write_count();
            observability::record_frame_dispatched(name, true);
        }
        Err(e) => {
            metrics.inc_failure_count();
            observability::record_frame_dispatched(name, false);
            error!(
                sink = %name,
                frame_id = frame.frame_id,
                error = %e,
                "Write failed"
            );
            // Continue processing - don't crash on single failure
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::slot::FrameSlot;
    use crate::test_support::frame;
    use contracts::ContractError;
    use std::sync::atomic::{AtomicU64, Ordering};
    use std::sync::Mutex;
    use tokio::time::{sleep, Duration};

    /// Mock sink for testing
    struct MockSink {
        name: String,
        written: Arc<Mutex<Vec<u64>>>,
        closed: Arc<AtomicU64>,
        should_fail: bool,
        delay_ms: u64,
    }

    impl MockSink {
        fn new(name: &str) -> Self {
            Self {
                name: name.to_string(),
                written: Arc::new(Mutex::new(Vec::new())),
                closed: Arc::new(AtomicU64::new(0)),
                should_fail: false,
                delay_ms: 0,
            }
        }
    }

    impl DisplaySink for MockSink {
        fn name(&self) -> &str {
            &self.name
        }

        async fn write(&mut self, frame: &RenderedFrame) -> Result<(), ContractError> {
            if self.delay_ms > 0 {
                sleep(Duration::from_millis(self.delay_ms)).await;
            }
            if self.should_fail {
                return Err(ContractError::sink_write(&self.name, "mock failure"));
            }
            self.written.lock().unwrap().push(frame.frame_id);
            Ok(())
        }

        async fn flush(&mut self) -> Result<(), ContractError> {
            Ok(())
        }

        async fn close(&mut self) -> Result<(), ContractError> {
            self.closed.fetch_add(1, Ordering::Relaxed);
            Ok(())
        }
    }

    #[tokio::test]
    async fn test_sink_handle_basic() {
        let slot = FrameSlot::new();
        let sink = MockSink::new("test");
        let written = Arc::clone(&sink.written);
        let closed = Arc::clone(&sink.closed);
        let handle = SinkHandle::spawn(sink, slot.subscribe());

        for i in 1..=3 {
            slot.publish(frame(i));
            sleep(Duration::from_millis(10)).await;
        }

        handle.shutdown().await;
        assert_eq!(*written.lock().unwrap(), vec![1, 2, 3]);
        assert_eq!(closed.load(Ordering::Relaxed), 1);
    }

    #[tokio::test]
    async fn test_slow_sink_skips_frames() {
        let slot = FrameSlot::new();
        let mut sink = MockSink::new("slow");
        sink.delay_ms = 50;
        let written = Arc::clone(&sink.written);
        let handle = SinkHandle::spawn(sink, slot.subscribe());

        slot.publish(frame(1));
        sleep(Duration::from_millis(10)).await;
        // Sink is busy with frame 1; these overwrite each other.
        for i in 2..=10 {
            slot.publish(frame(i));
        }
        sleep(Duration::from_millis(150)).await;

        let metrics = Arc::clone(handle.metrics());
        handle.shutdown().await;
        let written = written.lock().unwrap().clone();
        assert_eq!(written, vec![1, 10]);
        assert_eq!(metrics.skipped_count(), 8);
    }

    #[tokio::test]
    async fn test_pending_frame_written_on_shutdown() {
        let slot = FrameSlot::new();
        let sink = MockSink::new("pending");
        let written = Arc::clone(&sink.written);
        let handle = SinkHandle::spawn(sink, slot.subscribe());

        slot.publish(frame(7));
        handle.shutdown().await;
        assert_eq!(*written.lock().unwrap(), vec![7]);
    }

    #[tokio::test]
    async fn test_sink_handle_failure_isolation() {
        let slot = FrameSlot::new();
        let mut sink = MockSink::new("failing");
        sink.should_fail = true;
        let handle = SinkHandle::spawn(sink, slot.subscribe());

        slot.publish(frame(1));
        sleep(Duration::from_millis(20)).await;
        slot.publish(frame(2));
        sleep(Duration::from_millis(20)).await;

        assert_eq!(handle.metrics().failure_count(), 2);
        handle.shutdown().await;
    }
}
