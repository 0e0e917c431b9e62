//! Capture files and the replay transport
//!
//! A capture file is an 8-byte magic followed by raw 164-byte packets exactly
//! as read from the bus (sync slips and discard packets included).

use std::fs::File;
use std::io::{BufReader, BufWriter, ErrorKind, Read, Seek, SeekFrom, Write};
use std::path::{Path, PathBuf};
use std::time::Duration;

use contracts::{ContractError, Packet, PacketSource, PACKETS_PER_SEGMENT};
use tracing::{debug, info};

use crate::error::{DeviceError, Result};

/// Capture file magic
pub const CAPTURE_MAGIC: &[u8; 8] = b"LPTNCAP1";

/// Writes packets to a capture file
pub struct CaptureWriter {
    path: PathBuf,
    writer: BufWriter<File>,
    packets: u64,
}

impl CaptureWriter {
    /// Create (truncate) a capture file
    pub fn create(path: impl AsRef<Path>) -> Result<Self> {
        let path = path.as_ref().to_path_buf();
        let mut writer = BufWriter::new(File::create(&path)?);
        writer.write_all(CAPTURE_MAGIC)?;
        Ok(Self {
            path,
            writer,
            packets: 0,
        })
    }

    /// Append one packet
    pub fn write_packet(&mut self, packet: &Packet) -> Result<()> {
        self.writer.write_all(packet.as_bytes())?;
        self.packets += 1;
        Ok(())
    }

    /// Packets written so far
    pub fn packets(&self) -> u64 {
        self.packets
    }

    /// Flush and close, returning the packet count
    pub fn finish(mut self) -> Result<u64> {
        self.writer.flush()?;
        info!(path = %self.path.display(), packets = self.packets, "capture finished");
        Ok(self.packets)
    }
}

/// Replays a capture file as a packet bus
pub struct ReplayBus {
    name: String,
    path: PathBuf,
    looping: bool,
    pass_interval: Duration,
    reader: Option<BufReader<File>>,
    served: u64,
}

impl ReplayBus {
    /// Create a closed replay bus
    pub fn new(path: impl Into<PathBuf>) -> Self {
        let path = path.into();
        Self {
            name: format!("replay:{}", path.display()),
            path,
            looping: false,
            pass_interval: Duration::ZERO,
            reader: None,
            served: 0,
        }
    }

    /// Restart from the first packet at end of file
    pub fn looping(mut self, looping: bool) -> Self {
        self.looping = looping;
        self
    }

    /// Sleep this long after every 60 packets
    pub fn with_pass_interval(mut self, interval: Duration) -> Self {
        self.pass_interval = interval;
        self
    }

    fn open_reader(&self) -> Result<BufReader<File>> {
        let mut reader = BufReader::new(File::open(&self.path)?);
        let mut magic = [0u8; 8];
        reader
            .read_exact(&mut magic)
            .map_err(|_| DeviceError::capture(&self.path, "file too short"))?;
        if &magic != CAPTURE_MAGIC {
            return Err(DeviceError::capture(&self.path, "bad magic"));
        }
        Ok(reader)
    }

    fn exhausted(&self) -> ContractError {
        ContractError::BusExhausted {
            device: self.name.clone(),
        }
    }
}

/// Read one packet; `Ok(None)` at end of file (a trailing partial packet counts as end)
fn next_packet(reader: &mut BufReader<File>) -> std::io::Result<Option<Packet>> {
    let mut packet = Packet::zeroed();
    match reader.read_exact(packet.as_bytes_mut()) {
        Ok(()) => Ok(Some(packet)),
        Err(e) if e.kind() == ErrorKind::UnexpectedEof => Ok(None),
        Err(e) => Err(e),
    }
}

impl PacketSource for ReplayBus {
    fn name(&self) -> &str {
        &self.name
    }

    fn open(&mut self) -> std::result::Result<(), ContractError> {
        if self.reader.is_none() {
            let reader = self
                .open_reader()
                .map_err(|e| ContractError::bus_open(&self.name, e.to_string()))?;
            info!(path = %self.path.display(), looping = self.looping, "replay opened");
            self.reader = Some(reader);
        }
        Ok(())
    }

    fn close(&mut self) {
        if self.reader.take().is_some() {
            debug!(path = %self.path.display(), served = self.served, "replay closed");
        }
    }

    fn is_open(&self) -> bool {
        self.reader.is_some()
    }

    fn read_packet(&mut self) -> std::result::Result<Packet, ContractError> {
        let looping = self.looping;
        let name = self.name.clone();
        let reader = self
            .reader
            .as_mut()
            .ok_or_else(|| ContractError::bus_read(&name, "bus not open"))?;

        let read_err = |e: std::io::Error| ContractError::bus_read(&name, e.to_string());
        let packet = match next_packet(reader).map_err(read_err)? {
            Some(packet) => packet,
            None if looping => {
                reader
                    .seek(SeekFrom::Start(CAPTURE_MAGIC.len() as u64))
                    .map_err(read_err)?;
                debug!(replay = %name, "replay wrapped to start");
                match next_packet(reader).map_err(read_err)? {
                    Some(packet) => packet,
                    None => return Err(self.exhausted()),
                }
            }
            None => return Err(self.exhausted()),
        };

        self.served += 1;
        if !self.pass_interval.is_zero() && self.served % PACKETS_PER_SEGMENT as u64 == 0 {
            std::thread::sleep(self.pass_interval);
        }
        Ok(packet)
    }
}
