//! Scripted packet bus
//!
//! Replays a fixed packet sequence and then reports exhaustion. Shared by the
//! unit tests of every crate and by the end-to-end scenarios.

use std::collections::VecDeque;
use std::sync::atomic::{AtomicU32, AtomicU64, Ordering};
use std::sync::Arc;

use contracts::{
    ContractError, Packet, PacketSource, PACKETS_PER_SEGMENT, PAYLOAD_WORDS, SEGMENT_ID_PACKET,
};

/// Counters observed from outside the bus
#[derive(Debug, Default)]
struct CallCounters {
    opens: AtomicU32,
    closes: AtomicU32,
    reads: AtomicU64,
}

/// Handle to a scripted bus's counters
#[derive(Debug, Clone, Default)]
pub struct BusCounters {
    inner: Arc<CallCounters>,
}

impl BusCounters {
    /// Successful `open()` calls
    pub fn opens(&self) -> u32 {
        self.inner.opens.load(Ordering::Relaxed)
    }

    /// `close()` calls on an open bus
    pub fn closes(&self) -> u32 {
        self.inner.closes.load(Ordering::Relaxed)
    }

    /// Packets handed out
    pub fn reads(&self) -> u64 {
        self.inner.reads.load(Ordering::Relaxed)
    }
}

/// Bus that hands out a prepared packet sequence
pub struct ScriptedBus {
    name: String,
    packets: VecDeque<Packet>,
    open: bool,
    open_limit: Option<u32>,
    counters: BusCounters,
}

impl ScriptedBus {
    /// Create a bus from a packet sequence
    pub fn new(packets: impl IntoIterator<Item = Packet>) -> Self {
        Self {
            name: "scripted".to_string(),
            packets: packets.into_iter().collect(),
            open: false,
            open_limit: None,
            counters: BusCounters::default(),
        }
    }

    /// Fail every `open()` after the first `limit` successful ones
    pub fn with_open_limit(mut self, limit: u32) -> Self {
        self.open_limit = Some(limit);
        self
    }

    /// Counter handle
    pub fn counters(&self) -> BusCounters {
        self.counters.clone()
    }

    /// Packets not yet read
    pub fn remaining(&self) -> usize {
        self.packets.len()
    }
}

impl PacketSource for ScriptedBus {
    fn name(&self) -> &str {
        &self.name
    }

    fn open(&mut self) -> Result<(), ContractError> {
        if self.open {
            return Ok(());
        }
        if let Some(limit) = self.open_limit {
            if self.counters.opens() >= limit {
                return Err(ContractError::bus_open(&self.name, "device unavailable"));
            }
        }
        self.counters.inner.opens.fetch_add(1, Ordering::Relaxed);
        self.open = true;
        Ok(())
    }

    fn close(&mut self) {
        if self.open {
            self.counters.inner.closes.fetch_add(1, Ordering::Relaxed);
            self.open = false;
        }
    }

    fn is_open(&self) -> bool {
        self.open
    }

    fn read_packet(&mut self) -> Result<Packet, ContractError> {
        if !self.open {
            return Err(ContractError::bus_read(&self.name, "bus not open"));
        }
        let packet = self
            .packets
            .pop_front()
            .ok_or_else(|| ContractError::BusExhausted {
                device: self.name.clone(),
            })?;
        self.counters.inner.reads.fetch_add(1, Ordering::Relaxed);
        Ok(packet)
    }
}

/// One in-order pass of 60 packets
///
/// `word(packet, index)` yields payload word `index` (0..80) of `packet`.
/// `segment` is stamped onto packet 20 when given.
pub fn pass_packets(segment: Option<u8>, word: impl Fn(usize, usize) -> u16) -> Vec<Packet> {
    (0..PACKETS_PER_SEGMENT)
        .map(|p| {
            let payload: Vec<u16> = (0..PAYLOAD_WORDS).map(|w| word(p, w)).collect();
            let packet = Packet::new(p as u16, &payload);
            match segment {
                Some(id) if p == SEGMENT_ID_PACKET => packet.with_segment(id),
                _ => packet,
            }
        })
        .collect()
}

/// A pass whose payload words all carry `value`
pub fn uniform_pass(segment: Option<u8>, value: u16) -> Vec<Packet> {
    pass_packets(segment, |_, _| value)
}

/// `count` packets that each break sync when expecting packet 0
pub fn mismatched_packets(count: usize) -> Vec<Packet> {
    (0..count).map(|_| Packet::filled(7, 1)).collect()
}
