//! PacketSource / SensorRegisters traits - device abstraction
//!
//! Decouples the acquisition loop from concrete transports. Real spidev and
//! CCI devices, synthetic buses and replay files all implement these traits.

use crate::{ContractError, Packet};

/// Serial bus delivering fixed-size packets
///
/// `read_packet` blocks until one packet is available. It is only called from
/// the acquisition thread.
pub trait PacketSource: Send {
    /// Source name (device path or label, used in logs)
    fn name(&self) -> &str;

    /// Open (or reopen) the bus
    fn open(&mut self) -> Result<(), ContractError>;

    /// Close the bus; closing a closed bus is a no-op
    fn close(&mut self);

    /// Whether the bus is currently open
    fn is_open(&self) -> bool;

    /// Read exactly one packet
    ///
    /// # Errors
    /// Transport failures are fatal to the acquisition loop.
    fn read_packet(&mut self) -> Result<Packet, ContractError>;
}

/// Sensor control interface
pub trait SensorRegisters: Send {
    /// Enable radiometric output
    fn enable_radiometry(&mut self) -> Result<(), ContractError>;

    /// Set the radiometric linear correction
    fn set_linear_correction(&mut self, offset: f32, slope: f32) -> Result<(), ContractError>;

    /// Hardware reboot of the sensor
    fn reboot(&mut self) -> Result<(), ContractError>;

    /// Run flat-field correction
    fn perform_ffc(&mut self) -> Result<(), ContractError>;
}

impl<T: PacketSource + ?Sized> PacketSource for Box<T> {
    fn name(&self) -> &str {
        (**self).name()
    }

    fn open(&mut self) -> Result<(), ContractError> {
        (**self).open()
    }

    fn close(&mut self) {
        (**self).close()
    }

    fn is_open(&self) -> bool {
        (**self).is_open()
    }

    fn read_packet(&mut self) -> Result<Packet, ContractError> {
        (**self).read_packet()
    }
}

impl<T: SensorRegisters + ?Sized> SensorRegisters for Box<T> {
    fn enable_radiometry(&mut self) -> Result<(), ContractError> {
        (**self).enable_radiometry()
    }

    fn set_linear_correction(&mut self, offset: f32, slope: f32) -> Result<(), ContractError> {
        (**self).set_linear_correction(offset, slope)
    }

    fn reboot(&mut self) -> Result<(), ContractError> {
        (**self).reboot()
    }

    fn perform_ffc(&mut self) -> Result<(), ContractError> {
        (**self).perform_ffc()
    }
}
