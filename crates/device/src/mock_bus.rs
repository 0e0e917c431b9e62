//! Synthetic packet bus
//!
//! Generates a moving hot spot over a uniform background, split into packets
//! exactly as the sensor would send them, with optional fault injection.
//! Used to run the full pipeline without hardware.

use std::collections::VecDeque;
use std::time::{Duration, Instant};

use contracts::{
    ContractError, MockBusConfig, Packet, PacketSource, SensorVariant, PACKETS_PER_SEGMENT,
    PAYLOAD_WORDS, SEGMENT_ID_PACKET,
};
use rand::rngs::StdRng;
use rand::{Rng, SeedableRng};
use tracing::{debug, trace};

const RNG_SEED: u64 = 0x1E97_0025;

/// Synthetic bus
pub struct MockPacketBus {
    name: String,
    variant: SensorVariant,
    config: MockBusConfig,
    open: bool,
    rng: StdRng,
    pending: VecDeque<Packet>,
    grid: Vec<u16>,
    frame: u64,
    segment: u8,
    passes: u64,
    last_frame_at: Option<Instant>,
}

impl MockPacketBus {
    /// Create a closed synthetic bus
    pub fn new(variant: SensorVariant, config: MockBusConfig) -> Self {
        Self {
            name: format!("mock:{variant}"),
            variant,
            config,
            open: false,
            rng: StdRng::seed_from_u64(RNG_SEED),
            pending: VecDeque::new(),
            grid: vec![0; variant.pixel_count()],
            frame: 0,
            segment: 1,
            passes: 0,
            last_frame_at: None,
        }
    }

    /// Frames generated so far
    pub fn frames_generated(&self) -> u64 {
        self.frame
    }

    fn every(n: u32, count: u64) -> bool {
        n > 0 && count % u64::from(n) == u64::from(n) - 1
    }

    fn throttle(&mut self) {
        let interval = Duration::from_millis(self.config.frame_interval_ms);
        if let Some(last) = self.last_frame_at {
            let elapsed = last.elapsed();
            if elapsed < interval {
                std::thread::sleep(interval - elapsed);
            }
        }
        self.last_frame_at = Some(Instant::now());
    }

    /// Render the next frame's raw grid
    fn generate_frame(&mut self) {
        let width = self.variant.width();
        let height = self.variant.height();
        let angle = self.frame as f32 * 0.05;
        let cx = width as f32 / 2.0 + (width as f32 / 4.0) * angle.cos();
        let cy = height as f32 / 2.0 + (height as f32 / 4.0) * angle.sin();
        let sigma = width as f32 / 10.0;
        let base = f32::from(self.config.base_raw);
        let peak = f32::from(self.config.hotspot_raw) - base;

        for row in 0..height {
            for column in 0..width {
                let dx = column as f32 - cx;
                let dy = row as f32 - cy;
                let heat = peak * (-(dx * dx + dy * dy) / (2.0 * sigma * sigma)).exp();
                let noise = if self.config.noise > 0 {
                    f32::from(self.rng.random_range(0..=self.config.noise))
                } else {
                    0.0
                };
                let value = (base + heat + noise).clamp(1.0, f32::from(u16::MAX));
                self.grid[row * width + column] = value as u16;
            }
        }

        for _ in 0..self.config.zero_words_per_frame {
            let index = self.rng.random_range(0..self.grid.len());
            self.grid[index] = 0;
        }

        self.frame += 1;
        trace!(frame = self.frame, cx, cy, "synthetic frame generated");
    }

    /// Grid cell carried by payload word `w` of packet `p` in `segment`
    fn cell(&self, segment: u8, p: usize, w: usize) -> usize {
        let width = self.variant.width();
        if self.variant.is_segmented() {
            let row = usize::from(segment - 1) * self.variant.rows_per_segment() + p / 2;
            let column = (p % 2) * PAYLOAD_WORDS + w;
            row * width + column
        } else {
            p * width + w
        }
    }

    /// Queue the next pass
    fn refill(&mut self) {
        if self.segment == 1 {
            self.throttle();
            self.generate_frame();
        }

        for _ in 0..self.config.discard_packets {
            self.pending.push_back(Packet::discard());
        }

        let segment = self.segment;
        let bad_segment =
            self.variant.is_segmented() && Self::every(self.config.bad_segment_every, self.passes);
        let desync = Self::every(self.config.desync_every, self.passes);

        for p in 0..PACKETS_PER_SEGMENT {
            let payload: Vec<u16> = (0..PAYLOAD_WORDS)
                .map(|w| self.grid[self.cell(segment, p, w)])
                .collect();
            let mut packet = Packet::new(p as u16, &payload);
            if self.variant.is_segmented() && p == SEGMENT_ID_PACKET {
                packet = packet.with_segment(if bad_segment { 0 } else { segment });
            }
            self.pending.push_back(packet);
            if desync && p == PACKETS_PER_SEGMENT / 2 {
                self.pending.push_back(packet);
            }
        }

        if bad_segment || desync {
            debug!(
                pass = self.passes,
                segment, bad_segment, desync, "fault injected into synthetic pass"
            );
        }

        self.passes += 1;
        if self.variant.is_segmented() {
            self.segment = self.segment % self.variant.segments() + 1;
        }
    }
}

impl PacketSource for MockPacketBus {
    fn name(&self) -> &str {
        &self.name
    }

    fn open(&mut self) -> Result<(), ContractError> {
        if !self.open {
            debug!(bus = %self.name, "synthetic bus opened");
            self.open = true;
            // A reopened sensor starts a fresh frame.
            self.pending.clear();
            self.segment = 1;
        }
        Ok(())
    }

    fn close(&mut self) {
        if self.open {
            debug!(bus = %self.name, "synthetic bus closed");
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
        if self.pending.is_empty() {
            self.refill();
        }
        self.pending
            .pop_front()
            .ok_or_else(|| ContractError::bus_read(&self.name, "generator produced no packets"))
    }
}
