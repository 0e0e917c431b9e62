//! Packet - bus output
//!
//! Fixed-size packet as read from the serial bus, plus the sensor variants
//! that decide how packets map onto an image.

use std::fmt;

use serde::{Deserialize, Serialize};

/// Packet size in bytes
pub const PACKET_SIZE: usize = 164;

/// Packet size in 16-bit words
pub const WORDS_PER_PACKET: usize = PACKET_SIZE / 2;

/// Header words at the start of every packet (ID + CRC)
pub const HEADER_WORDS: usize = 2;

/// Payload words per packet
pub const PAYLOAD_WORDS: usize = WORDS_PER_PACKET - HEADER_WORDS;

/// Packets in one segment (one pass)
pub const PACKETS_PER_SEGMENT: usize = 60;

/// Words in one segment, header words included
pub const WORDS_PER_SEGMENT: usize = WORDS_PER_PACKET * PACKETS_PER_SEGMENT;

/// Packet index that carries the segment id on segmented sensors
pub const SEGMENT_ID_PACKET: usize = 20;

/// Number of segments per frame on segmented sensors
pub const MAX_SEGMENTS: u8 = 4;

/// Raw value meaning "no data for this cell"
pub const ZERO_SENTINEL: u16 = 0;

/// One bus packet
///
/// Byte 0 low nibble + byte 1 encode the packet number, byte 0 high nibble
/// carries the segment id on packet 20 of segmented sensors.
#[derive(Clone, Copy, PartialEq, Eq)]
pub struct Packet([u8; PACKET_SIZE]);

impl Packet {
    /// All-zero packet (number 0, every word zero)
    pub const fn zeroed() -> Self {
        Self([0u8; PACKET_SIZE])
    }

    /// Wrap raw bytes
    pub const fn from_bytes(bytes: [u8; PACKET_SIZE]) -> Self {
        Self(bytes)
    }

    /// Copy from a slice, `None` unless it is exactly one packet long
    pub fn try_from_slice(bytes: &[u8]) -> Option<Self> {
        let array: [u8; PACKET_SIZE] = bytes.try_into().ok()?;
        Some(Self(array))
    }

    /// Build a packet with the given number and payload words
    ///
    /// Payload longer than [`PAYLOAD_WORDS`] is truncated, shorter payload is
    /// zero padded.
    pub fn new(number: u16, payload: &[u16]) -> Self {
        let mut bytes = [0u8; PACKET_SIZE];
        bytes[0] = ((number >> 8) & 0x0F) as u8;
        bytes[1] = (number & 0xFF) as u8;
        for (i, word) in payload.iter().take(PAYLOAD_WORDS).enumerate() {
            let offset = (HEADER_WORDS + i) * 2;
            bytes[offset..offset + 2].copy_from_slice(&word.to_be_bytes());
        }
        Self(bytes)
    }

    /// Build a packet whose payload words all carry `value`
    pub fn filled(number: u16, value: u16) -> Self {
        Self::new(number, &[value; PAYLOAD_WORDS])
    }

    /// Discard packet, as sent by the sensor between frames
    pub fn discard() -> Self {
        let mut bytes = [0u8; PACKET_SIZE];
        bytes[0] = 0x0F;
        bytes[1] = 0xFF;
        Self(bytes)
    }

    /// Set the segment id nibble
    pub fn with_segment(mut self, segment: u8) -> Self {
        self.0[0] = (self.0[0] & 0x0F) | ((segment & 0x0F) << 4);
        self
    }

    /// Raw bytes
    pub fn as_bytes(&self) -> &[u8; PACKET_SIZE] {
        &self.0
    }

    /// Mutable raw bytes, for transports that read in place
    pub fn as_bytes_mut(&mut self) -> &mut [u8; PACKET_SIZE] {
        &mut self.0
    }

    /// Packet number (expected 0..=59 in sync)
    #[inline]
    pub fn number(&self) -> u16 {
        (u16::from(self.0[0] & 0x0F) << 8) | u16::from(self.0[1])
    }

    /// Segment id nibble, only meaningful on packet 20 of segmented sensors
    #[inline]
    pub fn segment_id(&self) -> u8 {
        (self.0[0] >> 4) & 0x0F
    }

    /// Whether this is a discard packet
    #[inline]
    pub fn is_discard(&self) -> bool {
        self.0[0] & 0x0F == 0x0F
    }

    /// Big-endian word at `index` (0..WORDS_PER_PACKET), header words included
    #[inline]
    pub fn word(&self, index: usize) -> u16 {
        u16::from_be_bytes([self.0[index * 2], self.0[index * 2 + 1]])
    }

    /// Payload words, header words skipped
    pub fn payload(&self) -> impl Iterator<Item = u16> + '_ {
        (HEADER_WORDS..WORDS_PER_PACKET).map(move |i| self.word(i))
    }
}

impl Default for Packet {
    fn default() -> Self {
        Self::zeroed()
    }
}

impl fmt::Debug for Packet {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Packet")
            .field("number", &self.number())
            .field("segment_id", &self.segment_id())
            .finish()
    }
}

/// Sensor variant
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum SensorVariant {
    /// Lepton 2.x: 80x60, one segment per frame
    #[default]
    Lepton2,
    /// Lepton 3.x: 160x120, four segments per frame
    Lepton3,
}

impl SensorVariant {
    /// Frame width in pixels
    pub const fn width(self) -> usize {
        match self {
            Self::Lepton2 => 80,
            Self::Lepton3 => 160,
        }
    }

    /// Frame height in pixels
    pub const fn height(self) -> usize {
        match self {
            Self::Lepton2 => 60,
            Self::Lepton3 => 120,
        }
    }

    /// Segments that make up one frame
    pub const fn segments(self) -> u8 {
        match self {
            Self::Lepton2 => 1,
            Self::Lepton3 => MAX_SEGMENTS,
        }
    }

    /// Output rows produced by one segment
    pub const fn rows_per_segment(self) -> usize {
        self.height() / self.segments() as usize
    }

    /// Whether frames are split across numbered segments
    pub const fn is_segmented(self) -> bool {
        matches!(self, Self::Lepton3)
    }

    /// Number of pixels in one frame
    pub const fn pixel_count(self) -> usize {
        self.width() * self.height()
    }
}

impl fmt::Display for SensorVariant {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Lepton2 => write!(f, "lepton2"),
            Self::Lepton3 => write!(f, "lepton3"),
        }
    }
}

/// A validated pass: 60 in-order packets and the segment they belong to
#[derive(Debug, Clone, Copy)]
pub struct Pass<'a> {
    /// Segment id, 1..=4 (always 1 for non-segmented sensors)
    pub segment: u8,
    /// Exactly [`PACKETS_PER_SEGMENT`] packets
    pub packets: &'a [Packet],
}
