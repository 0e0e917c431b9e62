//! SyncState - acquisition state that persists across frames

use serde::{Deserialize, Serialize};

use crate::ScaleWindow;

/// Counters and range window owned by the acquisition loop
///
/// Passed by `&mut` to the sync controller, the recovery controller and the
/// renderer; nothing else mutates it.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct SyncState {
    /// Consecutive packet-number mismatches in the current pass attempt
    pub resets: u32,

    /// Consecutive passes dropped for an out-of-range segment id
    pub wrong_segments: u32,

    /// Consecutive zero-sentinel words seen while rendering
    pub zero_drops: u32,

    /// Current display window
    pub window: ScaleWindow,
}

impl SyncState {
    /// Fresh state starting from `window`
    pub fn new(window: ScaleWindow) -> Self {
        Self {
            window,
            ..Default::default()
        }
    }

    /// Clear the wrong-segment and zero-drop counters (after a reboot)
    pub fn clear_fault_counters(&mut self) {
        self.wrong_segments = 0;
        self.zero_drops = 0;
    }
}

/// Whether the `count`-th consecutive fault is logged at warn level
///
/// Repeating faults warn once per `every` occurrences (0 is treated as 1).
#[inline]
pub fn warn_due(count: u32, every: u32) -> bool {
    count != 0 && count % every.max(1) == 0
}
