//! # Device
//!
//! Packet bus and register implementations.
//!
//! Responsibilities:
//! - Linux spidev transport and Lepton CCI over i2c-dev
//! - Synthetic bus with fault injection for running without hardware
//! - Capture file writer and replay transport
//! - Scripted bus and recording registers shared by tests
//! - Build the configured devices from a `SensorConfig`

pub mod cci;
pub mod error;
pub mod factory;
pub mod mock_bus;
pub mod mock_registers;
pub mod replay;
pub mod scripted;
pub mod spi;

pub use cci::{CciCommand, I2cDev, I2cTransport, LeptonCci};
pub use error::{DeviceError, Result};
pub use factory::{DeviceFactory, DeviceSet};
pub use mock_bus::MockPacketBus;
pub use mock_registers::{MockRegisters, RegisterCall, RegisterFailures, RegisterLog};
pub use replay::{CaptureWriter, ReplayBus, CAPTURE_MAGIC};
pub use scripted::{mismatched_packets, pass_packets, uniform_pass, BusCounters, ScriptedBus};
pub use spi::SpidevBus;
