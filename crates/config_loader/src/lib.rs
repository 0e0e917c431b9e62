//! # Config Loader
//!
//! Turns a camera config file into a checked `CameraBlueprint`.
//!
//! A config has `[sensor]` (variant, transport, SPI/I2C devices, replay
//! file, correction), `[render]`, `[acquisition]`, `[telemetry]`,
//! `[logging]` and any number of `[[sinks]]`. Every section but `[sensor]`
//! may be omitted.
//!
//! Checks applied after parsing (first failure wins):
//! - SPI clock within the sensor's 1..=30 MHz
//! - manual range bounds ordered
//! - non-zero reset threshold and warn interval
//! - replay transport names a capture file
//! - telemetry endpoint is http(s), interval non-zero, sample pixel inside
//!   the configured variant's frame
//! - sink names present and unique
//!
//! Relative file paths in a config loaded from disk (the replay capture and
//! file sink directories) are resolved against the config's own directory.
//!
//! # Example
//!
//! ```no_run
//! use config_loader::ConfigLoader;
//! use std::path::Path;
//!
//! let blueprint = ConfigLoader::load_from_path(Path::new("camera.toml")).unwrap();
//! println!("{} over {}", blueprint.sensor.variant, blueprint.sensor.transport);
//! ```

mod parser;
mod validator;

pub use contracts::CameraBlueprint;
pub use parser::ConfigFormat;

use contracts::{ContractError, SinkType};
use std::path::Path;

/// Sink param holding a directory
const FILE_SINK_DIR_PARAM: &str = "base_path";

/// Camera config loader
pub struct ConfigLoader;

impl ConfigLoader {
    /// Load a config file, format chosen by extension (.toml / .json)
    ///
    /// # Errors
    /// Unreadable file, unsupported extension, parse or validation failure.
    /// Parse errors name the file.
    pub fn load_from_path(path: &Path) -> Result<CameraBlueprint, ContractError> {
        let format = Self::detect_format(path)?;
        let content = std::fs::read_to_string(path)?;

        let mut blueprint = parser::parse(&content, format).map_err(|e| match e {
            ContractError::ConfigParse { message, source } => ContractError::ConfigParse {
                message: format!("{}: {message}", path.display()),
                source,
            },
            other => other,
        })?;
        if let Some(dir) = path.parent() {
            Self::resolve_relative_paths(&mut blueprint, dir);
        }

        validator::validate(&blueprint)?;
        Ok(blueprint)
    }

    /// Load a config from a string; relative paths are left as written
    ///
    /// # Errors
    /// Parse or validation failure.
    pub fn load_from_str(
        content: &str,
        format: ConfigFormat,
    ) -> Result<CameraBlueprint, ContractError> {
        let blueprint = parser::parse(content, format)?;
        validator::validate(&blueprint)?;
        Ok(blueprint)
    }

    /// Re-check a blueprint after it was changed in code (CLI overrides)
    ///
    /// # Errors
    /// First rule violation found.
    pub fn validate(blueprint: &CameraBlueprint) -> Result<(), ContractError> {
        validator::validate(blueprint)
    }

    pub fn to_toml(blueprint: &CameraBlueprint) -> Result<String, ContractError> {
        toml::to_string_pretty(blueprint)
            .map_err(|e| ContractError::config_parse(format!("TOML serialize error: {e}")))
    }

    pub fn to_json(blueprint: &CameraBlueprint) -> Result<String, ContractError> {
        serde_json::to_string_pretty(blueprint)
            .map_err(|e| ContractError::config_parse(format!("JSON serialize error: {e}")))
    }

    fn detect_format(path: &Path) -> Result<ConfigFormat, ContractError> {
        let ext = path.extension().and_then(|e| e.to_str()).ok_or_else(|| {
            ContractError::config_parse("cannot determine file format from extension")
        })?;

        ConfigFormat::from_extension(ext).ok_or_else(|| {
            ContractError::config_parse(format!("unsupported config format: .{ext}"))
        })
    }

    /// Anchor relative replay and snapshot paths at `dir`
    fn resolve_relative_paths(blueprint: &mut CameraBlueprint, dir: &Path) {
        if let Some(replay) = blueprint.sensor.replay_path.as_mut() {
            if replay.is_relative() {
                *replay = dir.join(&*replay);
            }
        }

        for sink in blueprint
            .sinks
            .iter_mut()
            .filter(|s| s.sink_type == SinkType::File)
        {
            if let Some(base) = sink.params.get_mut(FILE_SINK_DIR_PARAM) {
                if Path::new(base.as_str()).is_relative() {
                    *base = dir.join(base.as_str()).to_string_lossy().into_owned();
                }
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use contracts::{SensorVariant, TransportKind};
    use std::io::Write;
    use std::path::PathBuf;

    const MINIMAL_TOML: &str = r#"
[sensor]
variant = "lepton3"
transport = "mock"

[render]
colormap = "grayscale"

[telemetry]
endpoint = "http://127.0.0.1:9000/readings"

[[sinks]]
name = "log_sink"
sink_type = "log"
"#;

    fn write_config(dir: &Path, name: &str, content: &str) -> PathBuf {
        let path = dir.join(name);
        let mut file = std::fs::File::create(&path).unwrap();
        file.write_all(content.as_bytes()).unwrap();
        path
    }

    #[test]
    fn test_load_from_str_toml() {
        let result = ConfigLoader::load_from_str(MINIMAL_TOML, ConfigFormat::Toml);
        assert!(result.is_ok(), "Failed: {:?}", result.err());
        let bp = result.unwrap();
        assert_eq!(bp.sensor.variant, SensorVariant::Lepton3);
        assert_eq!(bp.sensor.transport, TransportKind::Mock);
    }

    #[test]
    fn test_round_trip_toml() {
        let bp = ConfigLoader::load_from_str(MINIMAL_TOML, ConfigFormat::Toml).unwrap();
        let serialized = ConfigLoader::to_toml(&bp).unwrap();
        let bp2 = ConfigLoader::load_from_str(&serialized, ConfigFormat::Toml).unwrap();
        assert_eq!(bp.sensor.variant, bp2.sensor.variant);
        assert_eq!(bp.render.colormap, bp2.render.colormap);
        assert_eq!(bp.telemetry.endpoint, bp2.telemetry.endpoint);
        assert_eq!(bp.sinks.len(), bp2.sinks.len());
    }

    #[test]
    fn test_round_trip_json() {
        let bp = ConfigLoader::load_from_str(MINIMAL_TOML, ConfigFormat::Toml).unwrap();
        let json = ConfigLoader::to_json(&bp).unwrap();
        let bp2 = ConfigLoader::load_from_str(&json, ConfigFormat::Json).unwrap();
        assert_eq!(bp.sensor.variant, bp2.sensor.variant);
        assert_eq!(bp.acquisition.reset_threshold, bp2.acquisition.reset_threshold);
    }

    #[test]
    fn test_validation_runs_after_parse() {
        let content = r#"
[sensor]
spi_speed_mhz = 64

[[sinks]]
name = "log"
sink_type = "log"
"#;
        let result = ConfigLoader::load_from_str(content, ConfigFormat::Toml);
        assert!(result.is_err());
        assert!(result.unwrap_err().to_string().contains("spi_speed_mhz"));
    }

    #[test]
    fn test_load_from_path() {
        let dir = tempfile::tempdir().unwrap();
        let path = write_config(dir.path(), "camera.toml", MINIMAL_TOML);
        let bp = ConfigLoader::load_from_path(&path).unwrap();
        assert_eq!(bp.sinks[0].name, "log_sink");
    }

    #[test]
    fn test_load_from_path_unknown_extension() {
        let file = tempfile::Builder::new().suffix(".yaml").tempfile().unwrap();
        let err = ConfigLoader::load_from_path(file.path()).unwrap_err();
        assert!(err.to_string().contains("unsupported config format"));
    }

    #[test]
    fn test_parse_error_names_file() {
        let dir = tempfile::tempdir().unwrap();
        let path = write_config(dir.path(), "broken.toml", "[sensor\nvariant = ");
        let err = ConfigLoader::load_from_path(&path).unwrap_err();
        assert!(err.to_string().contains("broken.toml"), "{err}");
    }

    #[test]
    fn test_relative_paths_follow_config_dir() {
        let dir = tempfile::tempdir().unwrap();
        let content = r#"
[sensor]
transport = "replay"
replay_path = "captures/roof.lcap"

[[sinks]]
name = "snapshots"
sink_type = "file"
params = { base_path = "out" }

[[sinks]]
name = "abs"
sink_type = "file"
params = { base_path = "/var/lib/thermocam" }
"#;
        let path = write_config(dir.path(), "camera.toml", content);
        let bp = ConfigLoader::load_from_path(&path).unwrap();

        assert_eq!(
            bp.sensor.replay_path.as_deref(),
            Some(dir.path().join("captures/roof.lcap").as_path())
        );
        assert_eq!(
            bp.sinks[0].params["base_path"],
            dir.path().join("out").to_string_lossy()
        );
        assert_eq!(bp.sinks[1].params["base_path"], "/var/lib/thermocam");

        // strings carry no location to resolve against
        let bp = ConfigLoader::load_from_str(content, ConfigFormat::Toml).unwrap();
        assert_eq!(
            bp.sensor.replay_path.as_deref(),
            Some(Path::new("captures/roof.lcap"))
        );
    }
}
