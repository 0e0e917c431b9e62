//! FrameSlot - single-slot, latest-wins frame publisher

use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::Arc;

use contracts::RenderedFrame;
use tokio::sync::watch;
use tracing::trace;

/// Receiver side of a [`FrameSlot`]
pub type FrameReceiver = watch::Receiver<Option<Arc<RenderedFrame>>>;

/// Latest-wins frame publisher
///
/// Publishing never blocks and replaces any frame not yet consumed. Each
/// subscriber sees the most recent frame at the time it looks.
#[derive(Debug, Clone)]
pub struct FrameSlot {
    tx: Arc<watch::Sender<Option<Arc<RenderedFrame>>>>,
    published: Arc<AtomicU64>,
}

impl FrameSlot {
    pub fn new() -> Self {
        let (tx, _rx) = watch::channel(None);
        Self {
            tx: Arc::new(tx),
            published: Arc::new(AtomicU64::new(0)),
        }
    }

    /// Replace the current frame
    pub fn publish(&self, frame: RenderedFrame) {
        trace!(frame_id = frame.frame_id, "frame published");
        self.tx.send_replace(Some(Arc::new(frame)));
        self.published.fetch_add(1, Ordering::Relaxed);
        observability::record_frame_published();
    }

    /// New receiver; the current frame (if any) counts as already seen
    pub fn subscribe(&self) -> FrameReceiver {
        self.tx.subscribe()
    }

    /// Most recent frame
    pub fn latest(&self) -> Option<Arc<RenderedFrame>> {
        self.tx.borrow().clone()
    }

    /// Frames published so far
    pub fn published(&self) -> u64 {
        self.published.load(Ordering::Relaxed)
    }
}

impl Default for FrameSlot {
    fn default() -> Self {
        Self::new()
    }
}
