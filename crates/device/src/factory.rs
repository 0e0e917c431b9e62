//! DeviceFactory
//!
//! Builds the packet bus and register interface described by the sensor
//! section of a blueprint. Buses are returned closed; the acquisition loop
//! opens them.

use std::time::Duration;

use contracts::{PacketSource, SensorConfig, SensorRegisters, TransportKind};
use tracing::{info, instrument};

use crate::cci::LeptonCci;
use crate::error::{DeviceError, Result};
use crate::mock_bus::MockPacketBus;
use crate::mock_registers::MockRegisters;
use crate::replay::ReplayBus;
use crate::spi::SpidevBus;

/// Bus + register interface pair
pub struct DeviceSet {
    pub bus: Box<dyn PacketSource>,
    pub registers: Box<dyn SensorRegisters>,
}

/// Device Factory
pub struct DeviceFactory;

impl DeviceFactory {
    /// Build devices for `config`
    ///
    /// # Errors
    /// The spidev transport fails when the register bus cannot be opened;
    /// the replay transport fails when no capture path is configured.
    #[instrument(
        name = "device_factory_build",
        skip(config),
        fields(transport = %config.transport, variant = %config.variant)
    )]
    pub fn build(config: &SensorConfig) -> Result<DeviceSet> {
        let set = match config.transport {
            TransportKind::Spidev => {
                let speed_hz = config.spi_speed_mhz.saturating_mul(1_000_000);
                let registers = LeptonCci::open(&config.i2c_device)?;
                DeviceSet {
                    bus: Box::new(SpidevBus::new(&config.spi_device, speed_hz)),
                    registers: Box::new(registers),
                }
            }
            TransportKind::Mock => DeviceSet {
                bus: Box::new(MockPacketBus::new(config.variant, config.mock.clone())),
                registers: Box::new(MockRegisters::new()),
            },
            TransportKind::Replay => {
                let path = config.replay_path.clone().ok_or_else(|| {
                    DeviceError::unsupported("replay", "no replay_path configured")
                })?;
                let pass_interval = Duration::from_millis(config.mock.frame_interval_ms)
                    / u32::from(config.variant.segments());
                DeviceSet {
                    bus: Box::new(
                        ReplayBus::new(path)
                            .looping(config.replay_loop)
                            .with_pass_interval(pass_interval),
                    ),
                    registers: Box::new(MockRegisters::new()),
                }
            }
        };

        info!(bus = %set.bus.name(), "devices ready");
        Ok(set)
    }
}
