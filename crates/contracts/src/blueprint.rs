//! CameraBlueprint - Config Loader output
//!
//! Describes the complete camera configuration: sensor and transport,
//! rendering, acquisition tuning, telemetry and output routing.

use serde::{Deserialize, Serialize};
use std::collections::HashMap;
use std::path::PathBuf;

use crate::{ColormapKind, RenderConfig, SensorVariant, DEFAULT_RANGE_MAX, DEFAULT_RANGE_MIN};

/// Config version
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
pub enum ConfigVersion {
    #[default]
    V1,
}

/// Complete camera configuration blueprint
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct CameraBlueprint {
    /// Config version
    #[serde(default)]
    pub version: ConfigVersion,

    /// Sensor and transport
    pub sensor: SensorConfig,

    /// Colormap and range settings
    #[serde(default)]
    pub render: RenderSection,

    /// Sync and recovery tuning
    #[serde(default)]
    pub acquisition: AcquisitionConfig,

    /// Temperature telemetry
    #[serde(default)]
    pub telemetry: TelemetryConfig,

    /// Display sinks
    #[serde(default)]
    pub sinks: Vec<SinkConfig>,

    /// Logging defaults
    #[serde(default)]
    pub logging: LoggingConfig,
}

/// Sensor configuration
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct SensorConfig {
    /// Sensor variant
    #[serde(default)]
    pub variant: SensorVariant,

    /// Packet transport
    #[serde(default)]
    pub transport: TransportKind,

    /// SPI device path
    #[serde(default = "default_spi_device")]
    pub spi_device: String,

    /// SPI clock in MHz
    #[serde(default = "default_spi_speed_mhz")]
    pub spi_speed_mhz: u32,

    /// I2C device used for register commands
    #[serde(default = "default_i2c_device")]
    pub i2c_device: String,

    /// Capture file for the replay transport
    #[serde(default)]
    pub replay_path: Option<PathBuf>,

    /// Loop the replay file instead of stopping at its end
    #[serde(default)]
    pub replay_loop: bool,

    /// Radiometric linear correction applied at startup
    #[serde(default)]
    pub correction: LinearCorrection,

    /// Synthetic transport settings
    #[serde(default)]
    pub mock: MockBusConfig,
}

impl Default for SensorConfig {
    fn default() -> Self {
        Self {
            variant: SensorVariant::default(),
            transport: TransportKind::default(),
            spi_device: default_spi_device(),
            spi_speed_mhz: default_spi_speed_mhz(),
            i2c_device: default_i2c_device(),
            replay_path: None,
            replay_loop: false,
            correction: LinearCorrection::default(),
            mock: MockBusConfig::default(),
        }
    }
}

fn default_spi_device() -> String {
    "/dev/spidev0.0".to_string()
}

fn default_spi_speed_mhz() -> u32 {
    20
}

fn default_i2c_device() -> String {
    "/dev/i2c-1".to_string()
}

/// Packet transport kind
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum TransportKind {
    /// Linux spidev + i2c-dev
    #[default]
    Spidev,
    /// Synthetic packet generator
    Mock,
    /// Recorded capture file
    Replay,
}

impl std::fmt::Display for TransportKind {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            Self::Spidev => write!(f, "spidev"),
            Self::Mock => write!(f, "mock"),
            Self::Replay => write!(f, "replay"),
        }
    }
}

/// Linear correction (offset, slope)
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct LinearCorrection {
    pub offset: f32,
    pub slope: f32,
}

impl Default for LinearCorrection {
    fn default() -> Self {
        Self {
            offset: 0.0,
            slope: 1.0,
        }
    }
}

/// Synthetic bus settings
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct MockBusConfig {
    /// Background raw value
    pub base_raw: u16,

    /// Peak raw value of the moving hot spot
    pub hotspot_raw: u16,

    /// Per-word random noise amplitude
    pub noise: u16,

    /// Delay between frames
    pub frame_interval_ms: u64,

    /// Discard packets emitted before each pass
    pub discard_packets: u32,

    /// Inject an out-of-order packet every N passes (0 = never)
    pub desync_every: u32,

    /// Inject an invalid segment id every N high-res passes (0 = never)
    pub bad_segment_every: u32,

    /// Zero words injected per frame
    pub zero_words_per_frame: u32,
}

impl Default for MockBusConfig {
    fn default() -> Self {
        Self {
            base_raw: 29500,
            hotspot_raw: 31500,
            noise: 20,
            frame_interval_ms: 37,
            discard_packets: 0,
            desync_every: 0,
            bad_segment_every: 0,
            zero_words_per_frame: 0,
        }
    }
}

/// Render settings as configured at startup
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct RenderSection {
    pub colormap: ColormapKind,
    pub auto_range_min: bool,
    pub auto_range_max: bool,
    pub range_min: u16,
    pub range_max: u16,
}

impl Default for RenderSection {
    fn default() -> Self {
        Self {
            colormap: ColormapKind::default(),
            auto_range_min: true,
            auto_range_max: true,
            range_min: DEFAULT_RANGE_MIN,
            range_max: DEFAULT_RANGE_MAX,
        }
    }
}

/// Sync and recovery tuning
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct AcquisitionConfig {
    /// Consecutive resyncs that trigger a reboot cycle
    pub reset_threshold: u32,

    /// Delay after each resync (microseconds)
    pub resync_delay_us: u64,

    /// Settle delay after a reboot (milliseconds)
    pub settle_delay_ms: u64,

    /// Resets in one pass above which a warning is logged
    pub slow_pass_resets: u32,

    /// Repeating faults are logged once every this many occurrences
    pub warn_every: u32,

    /// Reboot cycles without a valid pass before giving up (0 = never)
    pub max_consecutive_reboots: u32,

    /// Periodic flat-field correction (seconds, 0 = off)
    pub ffc_interval_secs: u64,
}

impl Default for AcquisitionConfig {
    fn default() -> Self {
        Self {
            reset_threshold: 750,
            resync_delay_us: 1000,
            settle_delay_ms: 750,
            slow_pass_resets: 30,
            warn_every: 12,
            max_consecutive_reboots: 0,
            ffc_interval_secs: 0,
        }
    }
}

/// Telemetry configuration
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct TelemetryConfig {
    /// HTTP endpoint readings are POSTed to (telemetry disabled when absent)
    pub endpoint: Option<String>,

    /// Device identifier included in every reading
    pub device_id: String,

    /// Minimum seconds between readings
    pub interval_secs: u64,

    /// Sampled pixel (defaults to the frame center)
    pub sample: Option<PixelCoord>,

    /// Request timeout (milliseconds)
    pub timeout_ms: u64,
}

impl Default for TelemetryConfig {
    fn default() -> Self {
        Self {
            endpoint: None,
            device_id: "lepton_2.5_001".to_string(),
            interval_secs: 10,
            sample: None,
            timeout_ms: 5000,
        }
    }
}

/// Pixel coordinate in output image space
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct PixelCoord {
    pub row: usize,
    pub column: usize,
}

impl PixelCoord {
    /// Center pixel of a variant's frame
    pub fn center(variant: SensorVariant) -> Self {
        Self {
            row: variant.height() / 2,
            column: variant.width() / 2,
        }
    }
}

/// Sink output configuration
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct SinkConfig {
    /// Sink name
    pub name: String,

    /// Sink type
    pub sink_type: SinkType,

    /// Type-specific parameters
    #[serde(default)]
    pub params: HashMap<String, String>,
}

/// Sink type
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum SinkType {
    /// Log output
    Log,
    /// PNG snapshots
    File,
}

/// Logging defaults (CLI flags and RUST_LOG take precedence)
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct LoggingConfig {
    pub level: String,
}

impl Default for LoggingConfig {
    fn default() -> Self {
        Self {
            level: "info".to_string(),
        }
    }
}

impl CameraBlueprint {
    /// Initial render configuration
    pub fn render_config(&self) -> RenderConfig {
        RenderConfig {
            variant: self.sensor.variant,
            colormap: self.render.colormap,
            auto_range_min: self.render.auto_range_min,
            auto_range_max: self.render.auto_range_max,
            range_min: self.render.range_min,
            range_max: self.render.range_max,
        }
    }

    /// Pixel sampled for telemetry
    pub fn telemetry_sample(&self) -> PixelCoord {
        self.telemetry
            .sample
            .unwrap_or_else(|| PixelCoord::center(self.sensor.variant))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn render_config_from_blueprint() {
        let mut blueprint = CameraBlueprint::default();
        blueprint.sensor.variant = SensorVariant::Lepton3;
        blueprint.render.colormap = ColormapKind::Grayscale;
        blueprint.render.auto_range_max = false;

        let config = blueprint.render_config();
        assert_eq!(config.variant, SensorVariant::Lepton3);
        assert_eq!(config.colormap, ColormapKind::Grayscale);
        assert!(config.auto_range_min);
        assert!(!config.auto_range_max);
        assert_eq!(config.range_max, 32000);
    }

    #[test]
    fn telemetry_sample_defaults_to_center() {
        let mut blueprint = CameraBlueprint::default();
        assert_eq!(
            blueprint.telemetry_sample(),
            PixelCoord { row: 30, column: 40 }
        );
        blueprint.sensor.variant = SensorVariant::Lepton3;
        assert_eq!(
            blueprint.telemetry_sample(),
            PixelCoord { row: 60, column: 80 }
        );
        blueprint.telemetry.sample = Some(PixelCoord { row: 1, column: 2 });
        assert_eq!(blueprint.telemetry_sample(), PixelCoord { row: 1, column: 2 });
    }

    #[test]
    fn defaults_match_sensor_setup() {
        let blueprint = CameraBlueprint::default();
        assert_eq!(blueprint.sensor.spi_speed_mhz, 20);
        assert_eq!(blueprint.sensor.correction, LinearCorrection::default());
        assert_eq!(blueprint.acquisition.reset_threshold, 750);
        assert_eq!(blueprint.acquisition.settle_delay_ms, 750);
        assert_eq!(blueprint.telemetry.interval_secs, 10);
        assert_eq!(blueprint.telemetry.device_id, "lepton_2.5_001");
    }
}
