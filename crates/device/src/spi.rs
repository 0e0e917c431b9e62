//! Linux spidev transport
//!
//! Opens the SPI character device in mode 3, 8 bits per word, at the
//! configured clock and reads one 164-byte packet per `read()`.

use std::fs::{File, OpenOptions};
use std::io::Read;

use contracts::{ContractError, Packet, PacketSource};
use tracing::{debug, info};

/// SPI mode 3 (CPOL=1, CPHA=1)
const SPI_MODE_3: u8 = 0x03;

/// Bits per word
const BITS_PER_WORD: u8 = 8;

#[cfg(target_os = "linux")]
mod ioctl {
    //! `_IOW('k', nr, T)` / `_IOR('k', nr, T)` request numbers from `linux/spi/spidev.h`

    pub const SPI_IOC_WR_MODE: u64 = 0x4001_6b01;
    pub const SPI_IOC_RD_MODE: u64 = 0x8001_6b01;
    pub const SPI_IOC_WR_BITS_PER_WORD: u64 = 0x4001_6b03;
    pub const SPI_IOC_RD_BITS_PER_WORD: u64 = 0x8001_6b03;
    pub const SPI_IOC_WR_MAX_SPEED_HZ: u64 = 0x4004_6b04;
    pub const SPI_IOC_RD_MAX_SPEED_HZ: u64 = 0x8004_6b04;
}

/// spidev packet bus
pub struct SpidevBus {
    device: String,
    speed_hz: u32,
    file: Option<File>,
}

impl SpidevBus {
    /// Create a closed bus for `device` clocked at `speed_hz`
    pub fn new(device: impl Into<String>, speed_hz: u32) -> Self {
        Self {
            device: device.into(),
            speed_hz,
            file: None,
        }
    }

    /// Configured clock
    pub fn speed_hz(&self) -> u32 {
        self.speed_hz
    }

    #[cfg(target_os = "linux")]
    fn configure(&self, file: &File) -> std::io::Result<()> {
        use std::os::fd::AsRawFd;

        let fd = file.as_raw_fd();
        let mut mode = SPI_MODE_3;
        let mut bits = BITS_PER_WORD;
        let mut speed = self.speed_hz;

        spi_ioctl(fd, ioctl::SPI_IOC_WR_MODE, &mut mode)?;
        spi_ioctl(fd, ioctl::SPI_IOC_RD_MODE, &mut mode)?;
        spi_ioctl(fd, ioctl::SPI_IOC_WR_BITS_PER_WORD, &mut bits)?;
        spi_ioctl(fd, ioctl::SPI_IOC_RD_BITS_PER_WORD, &mut bits)?;
        spi_ioctl(fd, ioctl::SPI_IOC_WR_MAX_SPEED_HZ, &mut speed)?;
        spi_ioctl(fd, ioctl::SPI_IOC_RD_MAX_SPEED_HZ, &mut speed)?;

        debug!(device = %self.device, mode, bits, speed_hz = speed, "spi configured");
        Ok(())
    }

    #[cfg(not(target_os = "linux"))]
    fn configure(&self, _file: &File) -> std::io::Result<()> {
        Err(std::io::Error::new(
            std::io::ErrorKind::Unsupported,
            "spidev requires Linux",
        ))
    }
}

#[cfg(target_os = "linux")]
fn spi_ioctl<T>(fd: i32, request: u64, value: &mut T) -> std::io::Result<()> {
    let result = unsafe { libc::ioctl(fd, request as _, value as *mut T) };
    if result < 0 {
        return Err(std::io::Error::last_os_error());
    }
    Ok(())
}

impl PacketSource for SpidevBus {
    fn name(&self) -> &str {
        &self.device
    }

    fn open(&mut self) -> Result<(), ContractError> {
        if self.file.is_some() {
            return Ok(());
        }

        let file = OpenOptions::new()
            .read(true)
            .write(true)
            .open(&self.device)
            .map_err(|e| ContractError::bus_open(&self.device, e.to_string()))?;
        self.configure(&file)
            .map_err(|e| ContractError::bus_open(&self.device, format!("configure: {e}")))?;

        info!(device = %self.device, speed_hz = self.speed_hz, "spi bus opened");
        self.file = Some(file);
        Ok(())
    }

    fn close(&mut self) {
        if self.file.take().is_some() {
            info!(device = %self.device, "spi bus closed");
        }
    }

    fn is_open(&self) -> bool {
        self.file.is_some()
    }

    fn read_packet(&mut self) -> Result<Packet, ContractError> {
        let file = self
            .file
            .as_mut()
            .ok_or_else(|| ContractError::bus_read(&self.device, "bus not open"))?;

        let mut packet = Packet::zeroed();
        file.read_exact(packet.as_bytes_mut())
            .map_err(|e| ContractError::bus_read(&self.device, e.to_string()))?;
        Ok(packet)
    }
}
