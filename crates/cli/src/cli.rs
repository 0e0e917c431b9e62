//! CLI argument definitions using clap.

use clap::{Parser, Subcommand, ValueEnum};
use contracts::{ColormapKind, SensorVariant, TransportKind};
use std::path::PathBuf;

/// thermocam - thermal camera acquisition pipeline
#[derive(Parser, Debug)]
#[command(
    name = "thermocam",
    author,
    version,
    about = "Thermal camera acquisition pipeline",
    long_about = "Acquires frames from a Lepton-class thermal sensor over SPI.\n\n\
                  Keeps packet sync, reassembles segments, auto-ranges and colorizes \n\
                  each frame, and dispatches frames and temperature telemetry to \n\
                  configured sinks."
)]
pub struct Cli {
    /// Increase logging verbosity (-v for debug, -vv for trace)
    #[arg(short, long, action = clap::ArgAction::Count, global = true, env = "THERMOCAM_VERBOSE")]
    pub verbose: u8,

    /// Suppress all output except warnings and errors
    #[arg(short, long, global = true, conflicts_with = "verbose")]
    pub quiet: bool,

    /// Log output format
    #[arg(
        long,
        value_enum,
        default_value = "pretty",
        global = true,
        env = "THERMOCAM_LOG_FORMAT"
    )]
    pub log_format: LogFormat,

    #[command(subcommand)]
    pub command: Commands,
}

/// Available CLI commands
#[derive(Subcommand, Debug)]
pub enum Commands {
    /// Run the acquisition pipeline
    Run(RunArgs),

    /// Validate configuration file without running
    Validate(ValidateArgs),

    /// Display configuration information
    Info(InfoArgs),

    /// Record raw packets to a capture file for later replay
    Capture(CaptureArgs),
}

impl Commands {
    /// Configuration file the command reads
    pub fn config_path(&self) -> &PathBuf {
        match self {
            Self::Run(args) => &args.config,
            Self::Validate(args) => &args.config,
            Self::Info(args) => &args.config,
            Self::Capture(args) => &args.config,
        }
    }
}

/// Arguments for the `run` command
#[derive(Parser, Debug, Clone)]
pub struct RunArgs {
    /// Path to configuration file (TOML or JSON)
    #[arg(short, long, default_value = "config.toml", env = "THERMOCAM_CONFIG")]
    pub config: PathBuf,

    /// Override sensor variant
    #[arg(long, value_enum, env = "THERMOCAM_VARIANT")]
    pub variant: Option<VariantArg>,

    /// Override colormap
    #[arg(long, value_enum, env = "THERMOCAM_COLORMAP")]
    pub colormap: Option<ColormapArg>,

    /// Override packet transport
    #[arg(long, value_enum, env = "THERMOCAM_TRANSPORT")]
    pub transport: Option<TransportArg>,

    /// Capture file to replay (implies --transport replay)
    #[arg(long, env = "THERMOCAM_REPLAY")]
    pub replay: Option<PathBuf>,

    /// Loop the replay file
    #[arg(long, requires = "replay")]
    pub replay_loop: bool,

    /// Override SPI clock speed in MHz
    #[arg(long, env = "THERMOCAM_SPI_SPEED")]
    pub spi_speed: Option<u32>,

    /// Pin the lower display bound (disables auto-ranging of the minimum)
    #[arg(long)]
    pub range_min: Option<u16>,

    /// Pin the upper display bound (disables auto-ranging of the maximum)
    #[arg(long)]
    pub range_max: Option<u16>,

    /// Override telemetry endpoint
    #[arg(long, env = "THERMOCAM_TELEMETRY_URL")]
    pub telemetry_endpoint: Option<String>,

    /// Maximum number of frames to render (0 = unlimited)
    #[arg(long, default_value = "0", env = "THERMOCAM_MAX_FRAMES")]
    pub max_frames: u64,

    /// Stop after this many seconds (0 = no timeout)
    #[arg(long, default_value = "0", env = "THERMOCAM_TIMEOUT")]
    pub timeout: u64,

    /// Validate configuration and exit without running pipeline
    #[arg(long)]
    pub dry_run: bool,

    /// Metrics server port (0 = disabled)
    #[arg(long, default_value = "0", env = "THERMOCAM_METRICS_PORT")]
    pub metrics_port: u16,
}

/// Arguments for the `validate` command
#[derive(Parser, Debug)]
pub struct ValidateArgs {
    /// Path to configuration file to validate
    #[arg(short, long, default_value = "config.toml")]
    pub config: PathBuf,

    /// Output validation result as JSON
    #[arg(long)]
    pub json: bool,
}

/// Arguments for the `info` command
#[derive(Parser, Debug)]
pub struct InfoArgs {
    /// Path to configuration file
    #[arg(short, long, default_value = "config.toml")]
    pub config: PathBuf,

    /// Output as JSON
    #[arg(long)]
    pub json: bool,

    /// Show acquisition tuning
    #[arg(long)]
    pub acquisition: bool,

    /// Show sink configuration
    #[arg(long)]
    pub sinks: bool,
}

/// Arguments for the `capture` command
#[derive(Parser, Debug)]
pub struct CaptureArgs {
    /// Path to configuration file
    #[arg(short, long, default_value = "config.toml", env = "THERMOCAM_CONFIG")]
    pub config: PathBuf,

    /// Output capture file
    #[arg(short, long)]
    pub output: PathBuf,

    /// Number of packets to record
    #[arg(long, default_value = "24000")]
    pub packets: u64,

    /// Override packet transport
    #[arg(long, value_enum)]
    pub transport: Option<TransportArg>,
}

/// Log output format
#[derive(ValueEnum, Clone, Debug, Default)]
pub enum LogFormat {
    /// JSON structured logging
    Json,
    /// Human-readable pretty format
    #[default]
    Pretty,
    /// Compact single-line format
    Compact,
}

/// Sensor variant
#[derive(ValueEnum, Clone, Copy, Debug)]
pub enum VariantArg {
    /// 80x60, one segment per frame
    Lepton2,
    /// 160x120, four segments per frame
    Lepton3,
}

impl From<VariantArg> for SensorVariant {
    fn from(arg: VariantArg) -> Self {
        match arg {
            VariantArg::Lepton2 => Self::Lepton2,
            VariantArg::Lepton3 => Self::Lepton3,
        }
    }
}

/// Colormap
#[derive(ValueEnum, Clone, Copy, Debug)]
pub enum ColormapArg {
    Rainbow,
    Grayscale,
    Ironblack,
}

impl From<ColormapArg> for ColormapKind {
    fn from(arg: ColormapArg) -> Self {
        match arg {
            ColormapArg::Rainbow => Self::Rainbow,
            ColormapArg::Grayscale => Self::Grayscale,
            ColormapArg::Ironblack => Self::Ironblack,
        }
    }
}

/// Packet transport
#[derive(ValueEnum, Clone, Copy, Debug)]
pub enum TransportArg {
    /// Linux spidev + i2c-dev
    Spidev,
    /// Synthetic packets
    Mock,
    /// Capture file
    Replay,
}

impl From<TransportArg> for TransportKind {
    fn from(arg: TransportArg) -> Self {
        match arg {
            TransportArg::Spidev => Self::Spidev,
            TransportArg::Mock => Self::Mock,
            TransportArg::Replay => Self::Replay,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_run_overrides_parse() {
        let cli = Cli::try_parse_from([
            "thermocam",
            "-v",
            "run",
            "-c",
            "cam.toml",
            "--variant",
            "lepton3",
            "--colormap",
            "rainbow",
            "--transport",
            "mock",
            "--max-frames",
            "10",
        ])
        .unwrap();

        assert_eq!(cli.verbose, 1);
        match cli.command {
            Commands::Run(args) => {
                assert_eq!(args.config, PathBuf::from("cam.toml"));
                assert!(matches!(args.variant, Some(VariantArg::Lepton3)));
                assert!(matches!(args.colormap, Some(ColormapArg::Rainbow)));
                assert!(matches!(args.transport, Some(TransportArg::Mock)));
                assert_eq!(args.max_frames, 10);
            }
            other => panic!("unexpected command: {other:?}"),
        }
    }

    #[test]
    fn test_replay_loop_requires_replay() {
        assert!(Cli::try_parse_from(["thermocam", "run", "--replay-loop"]).is_err());
    }

    #[test]
    fn test_quiet_conflicts_with_verbose() {
        assert!(Cli::try_parse_from(["thermocam", "-q", "-v", "validate"]).is_err());
    }

    #[test]
    fn test_capture_requires_output() {
        assert!(Cli::try_parse_from(["thermocam", "capture"]).is_err());
        let cli = Cli::try_parse_from(["thermocam", "capture", "-o", "out.lcap"]).unwrap();
        assert_eq!(cli.command.config_path(), &PathBuf::from("config.toml"));
    }
}
