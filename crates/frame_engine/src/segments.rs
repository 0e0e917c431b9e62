//! Segment storage and frame completion.

use contracts::{Packet, Pass, SensorVariant, MAX_SEGMENTS, PACKETS_PER_SEGMENT};
use tracing::trace;

type Segment = [Packet; PACKETS_PER_SEGMENT];

/// Per-segment storage for one frame
///
/// High-res frames complete when segment 4 is stored and every slot has been
/// filled at least once since the last reset. Slots keep their contents until
/// overwritten, so a dropped segment is rendered from the previous frame.
#[derive(Debug)]
pub struct SegmentAssembler {
    variant: SensorVariant,
    slots: Vec<Segment>,
    filled: u8,
}

impl SegmentAssembler {
    /// Create empty storage for `variant`
    pub fn new(variant: SensorVariant) -> Self {
        Self {
            variant,
            slots: vec![[Packet::zeroed(); PACKETS_PER_SEGMENT]; usize::from(variant.segments())],
            filled: 0,
        }
    }

    /// Variant the storage is laid out for
    pub fn variant(&self) -> SensorVariant {
        self.variant
    }

    /// Drop all stored segments and re-layout for `variant`
    pub fn reset(&mut self, variant: SensorVariant) {
        *self = Self::new(variant);
    }

    /// Whether every slot has been filled since the last reset
    pub fn all_filled(&self) -> bool {
        let mask = (1u8 << self.variant.segments()) - 1;
        self.filled & mask == mask
    }

    /// Store a validated pass; returns `true` when it completes a frame
    pub fn store(&mut self, pass: Pass<'_>) -> bool {
        if pass.packets.len() != PACKETS_PER_SEGMENT {
            return false;
        }

        if !self.variant.is_segmented() {
            self.slots[0].copy_from_slice(pass.packets);
            self.filled = 1;
            return true;
        }

        if !(1..=MAX_SEGMENTS).contains(&pass.segment) {
            return false;
        }

        let index = usize::from(pass.segment - 1);
        self.slots[index].copy_from_slice(pass.packets);
        self.filled |= 1 << index;
        trace!(segment = pass.segment, filled = self.filled, "segment stored");

        pass.segment == MAX_SEGMENTS && self.all_filled()
    }

    /// Stored segments in order, with their 1-based ids
    pub fn segments(&self) -> impl Iterator<Item = (u8, &[Packet])> + '_ {
        self.slots
            .iter()
            .enumerate()
            .map(|(i, slot)| (i as u8 + 1, slot.as_slice()))
    }
}
