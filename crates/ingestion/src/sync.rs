//! Packet validation and pass synchronization
//!
//! Reads packets until a full, in-order pass of 60 has been collected. Any
//! out-of-order packet (including discard packets) restarts the pass and
//! counts as one resync.

use std::time::Duration;

use contracts::{
    warn_due, Packet, PacketSource, Pass, SensorVariant, SyncState, MAX_SEGMENTS, PACKETS_PER_SEGMENT,
    SEGMENT_ID_PACKET,
};
use tracing::{debug, info, instrument, trace, warn};

use crate::error::Result;

/// Reacts to resync events (the recovery controller in production)
pub trait ResyncHandler {
    /// Called after every packet-number mismatch with the updated state
    fn on_resync(&mut self, bus: &mut dyn PacketSource, state: &mut SyncState) -> Result<()>;
}

/// Sync options
#[derive(Debug, Clone, Copy)]
pub struct SyncOptions {
    /// Delay after each mismatch
    pub resync_delay: Duration,
    /// Resets in one pass at which a warning is logged
    pub slow_pass_resets: u32,
    /// Segment faults are logged at warn level once per this many
    pub warn_every: u32,
}

impl Default for SyncOptions {
    fn default() -> Self {
        Self {
            resync_delay: Duration::from_millis(1),
            slow_pass_resets: 30,
            warn_every: 12,
        }
    }
}

/// Pass result
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum PassOutcome {
    /// 60 validated packets are available through [`SyncController::pass`]
    Complete { segment: u8 },
    /// Packet 20 carried an invalid segment id; the pass was dropped
    Aborted { segment: u8 },
}

/// One pass attempt
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct PassReport {
    pub outcome: PassOutcome,
    /// Packets read during the attempt, discarded ones included
    pub packets_read: u64,
    /// Mismatches during the attempt
    pub resyncs: u32,
}

/// Packet validator and sync state machine
pub struct SyncController {
    options: SyncOptions,
    packets: Vec<Packet>,
}

impl SyncController {
    pub fn new(options: SyncOptions) -> Self {
        Self {
            options,
            packets: vec![Packet::zeroed(); PACKETS_PER_SEGMENT],
        }
    }

    /// Packets of the last completed pass
    pub fn packets(&self) -> &[Packet] {
        &self.packets
    }

    /// Last completed pass tagged with its segment
    pub fn pass(&self, segment: u8) -> Pass<'_> {
        Pass {
            segment,
            packets: &self.packets,
        }
    }

    /// Read one pass
    ///
    /// The reset counter in `state` is cleared once the attempt ends, whether
    /// it completed or was aborted.
    ///
    /// # Errors
    /// Bus read failures and errors raised by `handler`.
    #[instrument(
        level = "trace",
        name = "sync_read_pass",
        skip(self, bus, state, handler),
        fields(variant = %variant)
    )]
    pub fn read_pass(
        &mut self,
        variant: SensorVariant,
        bus: &mut dyn PacketSource,
        state: &mut SyncState,
        handler: &mut dyn ResyncHandler,
    ) -> Result<PassReport> {
        let mut expected = 0usize;
        let mut packets_read = 0u64;
        let mut resyncs = 0u32;

        let outcome = loop {
            let packet = bus.read_packet()?;
            packets_read += 1;

            if usize::from(packet.number()) != expected {
                trace!(
                    expected,
                    got = packet.number(),
                    discard = packet.is_discard(),
                    "packet out of sequence"
                );
                expected = 0;
                state.resets += 1;
                resyncs += 1;
                observability::record_resync();
                if !self.options.resync_delay.is_zero() {
                    std::thread::sleep(self.options.resync_delay);
                }
                handler.on_resync(bus, state)?;
                continue;
            }

            self.packets[expected] = packet;

            if variant.is_segmented() && expected == SEGMENT_ID_PACKET {
                let segment = packet.segment_id();
                if segment == 0 || segment > MAX_SEGMENTS {
                    self.on_wrong_segment(segment, state);
                    break PassOutcome::Aborted { segment };
                }
                if state.wrong_segments > 0 {
                    info!(
                        dropped = state.wrong_segments,
                        segment, "segment numbering recovered"
                    );
                    state.wrong_segments = 0;
                }
            }

            expected += 1;
            if expected == PACKETS_PER_SEGMENT {
                let segment = if variant.is_segmented() {
                    self.packets[SEGMENT_ID_PACKET].segment_id()
                } else {
                    1
                };
                break PassOutcome::Complete { segment };
            }
        };

        if state.resets >= self.options.slow_pass_resets {
            warn!(resets = state.resets, "pass needed many resets");
        }
        state.resets = 0;

        Ok(PassReport {
            outcome,
            packets_read,
            resyncs,
        })
    }

    fn on_wrong_segment(&self, segment: u8, state: &mut SyncState) {
        state.wrong_segments += 1;
        observability::record_wrong_segment(segment);
        if warn_due(state.wrong_segments, self.options.warn_every) {
            warn!(
                segment,
                consecutive = state.wrong_segments,
                "invalid segment id, dropping pass"
            );
        } else {
            debug!(
                segment,
                consecutive = state.wrong_segments,
                "invalid segment id, dropping pass"
            );
        }
    }
}
