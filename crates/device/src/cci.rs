//! Lepton command and control interface (CCI) over I2C
//!
//! Commands are issued by writing the data registers, the data length and the
//! command id, then polling the status register until the busy bit clears.

use std::fs::{File, OpenOptions};
use std::io::{Read, Write};
use std::time::Duration;

use contracts::{ContractError, SensorRegisters};
use tracing::{debug, info, instrument, warn};

/// Sensor I2C address
pub const LEPTON_I2C_ADDRESS: u16 = 0x2A;

const REG_STATUS: u16 = 0x0002;
const REG_COMMAND: u16 = 0x0004;
const REG_DATA_LENGTH: u16 = 0x0006;
const REG_DATA0: u16 = 0x0008;

const STATUS_BUSY: u16 = 0x0001;

const DEFAULT_POLL_LIMIT: u32 = 1000;

/// CCI commands used by the acquisition loop
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum CciCommand {
    /// RAD enable state (set)
    RadEnable,
    /// RAD linear temperature correction (set)
    RadLinearCorrection,
    /// SYS flat-field correction (run)
    SysRunFfc,
    /// OEM reboot (run)
    OemReboot,
}

impl CciCommand {
    /// Command id written to the command register
    pub const fn id(self) -> u16 {
        match self {
            Self::RadEnable => 0x4E11,
            Self::RadLinearCorrection => 0x4E15,
            Self::SysRunFfc => 0x0242,
            Self::OemReboot => 0x4842,
        }
    }

    /// Command name for logs and errors
    pub const fn name(self) -> &'static str {
        match self {
            Self::RadEnable => "rad_enable",
            Self::RadLinearCorrection => "rad_linear_correction",
            Self::SysRunFfc => "sys_run_ffc",
            Self::OemReboot => "oem_reboot",
        }
    }
}

/// Raw I2C link to the sensor
pub trait I2cTransport: Send {
    /// Write bytes in one transaction
    fn write(&mut self, bytes: &[u8]) -> std::io::Result<()>;

    /// Read exactly `buf.len()` bytes
    fn read(&mut self, buf: &mut [u8]) -> std::io::Result<()>;
}

/// Linux i2c-dev link
pub struct I2cDev {
    file: File,
}

impl I2cDev {
    /// Open `path` and bind it to `address`
    pub fn open(path: &str, address: u16) -> std::io::Result<Self> {
        let file = OpenOptions::new().read(true).write(true).open(path)?;
        bind_slave(&file, address)?;
        Ok(Self { file })
    }
}

#[cfg(target_os = "linux")]
fn bind_slave(file: &File, address: u16) -> std::io::Result<()> {
    use std::os::fd::AsRawFd;

    const I2C_SLAVE: u64 = 0x0703;
    let result = unsafe {
        libc::ioctl(
            file.as_raw_fd(),
            I2C_SLAVE as _,
            libc::c_ulong::from(address),
        )
    };
    if result < 0 {
        return Err(std::io::Error::last_os_error());
    }
    Ok(())
}

#[cfg(not(target_os = "linux"))]
fn bind_slave(_file: &File, _address: u16) -> std::io::Result<()> {
    Err(std::io::Error::new(
        std::io::ErrorKind::Unsupported,
        "i2c-dev requires Linux",
    ))
}

impl I2cTransport for I2cDev {
    fn write(&mut self, bytes: &[u8]) -> std::io::Result<()> {
        self.file.write_all(bytes)
    }

    fn read(&mut self, buf: &mut [u8]) -> std::io::Result<()> {
        self.file.read_exact(buf)
    }
}

/// Lepton register interface
pub struct LeptonCci<T: I2cTransport> {
    link: T,
    poll_limit: u32,
    poll_interval: Duration,
}

impl LeptonCci<I2cDev> {
    /// Open the sensor on an i2c-dev bus
    pub fn open(path: &str) -> Result<Self, ContractError> {
        let link = I2cDev::open(path, LEPTON_I2C_ADDRESS)
            .map_err(|e| ContractError::register("i2c_open", format!("{path}: {e}")))?;
        info!(device = %path, address = LEPTON_I2C_ADDRESS, "cci link opened");
        Ok(Self::new(link))
    }
}

impl<T: I2cTransport> LeptonCci<T> {
    /// Wrap an existing link
    pub fn new(link: T) -> Self {
        Self {
            link,
            poll_limit: DEFAULT_POLL_LIMIT,
            poll_interval: Duration::from_micros(200),
        }
    }

    /// Override busy polling (tests use a zero interval)
    pub fn with_polling(mut self, limit: u32, interval: Duration) -> Self {
        self.poll_limit = limit;
        self.poll_interval = interval;
        self
    }

    fn io_error(command: CciCommand, err: std::io::Error) -> ContractError {
        ContractError::register(command.name(), err.to_string())
    }

    fn write_register(&mut self, register: u16, words: &[u16]) -> std::io::Result<()> {
        let mut bytes = Vec::with_capacity(2 + words.len() * 2);
        bytes.extend_from_slice(&register.to_be_bytes());
        for word in words {
            bytes.extend_from_slice(&word.to_be_bytes());
        }
        self.link.write(&bytes)
    }

    fn read_register(&mut self, register: u16) -> std::io::Result<u16> {
        self.link.write(&register.to_be_bytes())?;
        let mut buf = [0u8; 2];
        self.link.read(&mut buf)?;
        Ok(u16::from_be_bytes(buf))
    }

    fn wait_idle(&mut self, command: CciCommand) -> Result<u16, ContractError> {
        for _ in 0..self.poll_limit {
            let status = self
                .read_register(REG_STATUS)
                .map_err(|e| Self::io_error(command, e))?;
            if status & STATUS_BUSY == 0 {
                return Ok(status);
            }
            if !self.poll_interval.is_zero() {
                std::thread::sleep(self.poll_interval);
            }
        }
        Err(ContractError::register(command.name(), "sensor busy"))
    }

    /// Issue a command and wait for its completion status
    #[instrument(name = "cci_command", skip(self, data), fields(command = command.name()))]
    pub fn command(&mut self, command: CciCommand, data: &[u16]) -> Result<(), ContractError> {
        self.issue(command, data)?;
        let status = self.wait_idle(command)?;
        let code = (status >> 8) as u8 as i8;
        if code < 0 {
            return Err(ContractError::register(
                command.name(),
                format!("sensor returned error code {code}"),
            ));
        }
        debug!(command = command.name(), "cci command complete");
        Ok(())
    }

    fn issue(&mut self, command: CciCommand, data: &[u16]) -> Result<(), ContractError> {
        self.wait_idle(command)?;
        if !data.is_empty() {
            self.write_register(REG_DATA0, data)
                .map_err(|e| Self::io_error(command, e))?;
        }
        self.write_register(REG_DATA_LENGTH, &[data.len() as u16])
            .map_err(|e| Self::io_error(command, e))?;
        self.write_register(REG_COMMAND, &[command.id()])
            .map_err(|e| Self::io_error(command, e))
    }
}

/// 32-bit value as CCI words, least significant word first
fn split_u32(value: u32) -> [u16; 2] {
    [(value & 0xFFFF) as u16, (value >> 16) as u16]
}

impl<T: I2cTransport> SensorRegisters for LeptonCci<T> {
    fn enable_radiometry(&mut self) -> Result<(), ContractError> {
        self.command(CciCommand::RadEnable, &split_u32(1))
    }

    fn set_linear_correction(&mut self, offset: f32, slope: f32) -> Result<(), ContractError> {
        let [o0, o1] = split_u32(offset.to_bits());
        let [s0, s1] = split_u32(slope.to_bits());
        self.command(CciCommand::RadLinearCorrection, &[o0, o1, s0, s1])
    }

    fn reboot(&mut self) -> Result<(), ContractError> {
        // The sensor drops off the bus while rebooting, so no status poll.
        warn!("issuing sensor reboot");
        self.issue(CciCommand::OemReboot, &[])
    }

    fn perform_ffc(&mut self) -> Result<(), ContractError> {
        self.command(CciCommand::SysRunFfc, &[])
    }
}
