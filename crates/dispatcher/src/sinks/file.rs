//! FileSink - writes PNG snapshots of rendered frames

use std::collections::HashMap;
use std::fs;
use std::path::{Path, PathBuf};

use chrono::{DateTime, Utc};
use contracts::{ContractError, DisplaySink, RenderedFrame};
use tracing::{debug, error, instrument};

use crate::DispatcherError;

/// File written (and overwritten) with the newest frame
pub const LATEST_FILE: &str = "latest.png";

/// Configuration for FileSink
#[derive(Debug, Clone)]
pub struct FileSinkConfig {
    /// Output directory
    pub base_path: PathBuf,
    /// Keep one numbered snapshot per this many received frames (0 = none)
    pub every: u64,
    /// Maintain `latest.png`
    pub latest: bool,
}

impl Default for FileSinkConfig {
    fn default() -> Self {
        Self {
            base_path: PathBuf::from("./output"),
            every: 0,
            latest: true,
        }
    }
}

impl FileSinkConfig {
    /// Create config from the params map of sink `name`
    pub fn from_params(name: &str, params: &HashMap<String, String>) -> crate::Result<Self> {
        let mut config = Self::default();
        if let Some(path) = params.get("base_path") {
            config.base_path = PathBuf::from(path);
        }
        if let Some(every) = params.get("every") {
            config.every = every.parse().map_err(|e| {
                DispatcherError::invalid_param(name, "every", format!("'{}': {}", every, e))
            })?;
        }
        if let Some(latest) = params.get("latest") {
            config.latest = latest.parse().map_err(|e| {
                DispatcherError::invalid_param(name, "latest", format!("'{}': {}", latest, e))
            })?;
        }
        Ok(config)
    }
}

/// Sink that saves frames as PNG files
pub struct FileSink {
    name: String,
    config: FileSinkConfig,
    received: u64,
    snapshots: u64,
}

impl FileSink {
    /// Create a new FileSink
    pub fn new(name: impl Into<String>, config: FileSinkConfig) -> std::io::Result<Self> {
        fs::create_dir_all(&config.base_path)?;

        Ok(Self {
            name: name.into(),
            config,
            received: 0,
            snapshots: 0,
        })
    }

    /// Create from params map (for factory)
    pub fn from_params(name: &str, params: &HashMap<String, String>) -> crate::Result<Self> {
        let config = FileSinkConfig::from_params(name, params)?;
        Ok(Self::new(name, config)?)
    }

    /// Numbered snapshots written so far
    pub fn snapshots(&self) -> u64 {
        self.snapshots
    }

    fn snapshot_name(frame: &RenderedFrame) -> String {
        let time = DateTime::<Utc>::from_timestamp(frame.timestamp as i64, 0).unwrap_or_default();
        format!(
            "thermal_{}_{:06}.png",
            time.format("%Y%m%d_%H%M%S"),
            frame.frame_id
        )
    }

    fn write_frame_to_disk(&mut self, frame: &RenderedFrame) -> std::io::Result<()> {
        if self.config.every > 0 && self.received % self.config.every == 0 {
            let path = self.config.base_path.join(Self::snapshot_name(frame));
            save_png(&path, frame)?;
            self.snapshots += 1;
        }

        if self.config.latest {
            // Readers never see a partially written latest.png.
            let tmp = self.config.base_path.join("latest.png.tmp");
            save_png(&tmp, frame)?;
            fs::rename(&tmp, self.config.base_path.join(LATEST_FILE))?;
        }

        self.received += 1;
        Ok(())
    }

    fn persist_frame(&mut self, frame: &RenderedFrame) -> Result<(), ContractError> {
        self.write_frame_to_disk(frame).map_err(|e| {
            error!(sink = %self.name, frame_id = frame.frame_id, error = %e, "Write failed");
            ContractError::sink_write(&self.name, e.to_string())
        })
    }
}

fn save_png(path: &Path, frame: &RenderedFrame) -> std::io::Result<()> {
    image::save_buffer_with_format(
        path,
        &frame.rgb,
        frame.width,
        frame.height,
        image::ColorType::Rgb8,
        image::ImageFormat::Png,
    )
    .map_err(std::io::Error::other)
}

impl DisplaySink for FileSink {
    fn name(&self) -> &str {
        &self.name
    }

    #[instrument(
        name = "file_sink_write",
        skip(self, frame),
        fields(sink = %self.name, frame_id = frame.frame_id)
    )]
    async fn write(&mut self, frame: &RenderedFrame) -> Result<(), ContractError> {
        self.persist_frame(frame)?;
        Ok(())
    }

    #[instrument(name = "file_sink_flush", skip(self))]
    async fn flush(&mut self) -> Result<(), ContractError> {
        Ok(())
    }

    #[instrument(name = "file_sink_close", skip(self))]
    async fn close(&mut self) -> Result<(), ContractError> {
        debug!(sink = %self.name, snapshots = self.snapshots, "FileSink closed");
        Ok(())
    }
}
