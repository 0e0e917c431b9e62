//! # Contracts
//!
//! Frozen interface contracts shared by every thermocam crate: the packet and
//! frame data model, the collaborator traits (bus, registers, sinks), the
//! configuration blueprint and the common error type.
//! Business crates only depend on this crate, reverse dependencies are prohibited.
//!
//! ## Wire Model
//! - A packet is 164 bytes: a 2-word header followed by 80 big-endian payload words
//! - 60 packets form a segment; low-res sensors send one segment per frame,
//!   high-res sensors send four
//! - A raw value of `0` is the "no data" sentinel

mod blueprint;
mod error;
mod frame;
mod render;
mod sensor;
mod sensor_source;
mod sink;
mod sync;

pub use blueprint::*;
pub use error::*;
pub use frame::*;
pub use render::*;
pub use sensor::*;
pub use sensor_source::{PacketSource, SensorRegisters};
pub use sink::*;
pub use sync::*;
