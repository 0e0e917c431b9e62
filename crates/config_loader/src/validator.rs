//! Configuration validation
//!
//! Rules:
//! - spi_speed_mhz within 1..=30
//! - manual range_min < range_max
//! - reset_threshold > 0, warn_every > 0
//! - replay transport has a replay_path
//! - telemetry endpoint is http(s), interval > 0, sample pixel inside the frame
//! - sink names non-empty and unique

use std::collections::HashSet;

use contracts::{CameraBlueprint, ContractError, TransportKind};

/// Highest SPI clock the sensor accepts (MHz)
const MAX_SPI_SPEED_MHZ: u32 = 30;

/// Validate a CameraBlueprint
///
/// Returns the first error found, or Ok(()).
pub fn validate(blueprint: &CameraBlueprint) -> Result<(), ContractError> {
    validate_sensor(blueprint)?;
    validate_render(blueprint)?;
    validate_acquisition(blueprint)?;
    validate_telemetry(blueprint)?;
    validate_sinks(blueprint)?;
    Ok(())
}

/// Validate sensor and transport settings
fn validate_sensor(blueprint: &CameraBlueprint) -> Result<(), ContractError> {
    let sensor = &blueprint.sensor;

    if !(1..=MAX_SPI_SPEED_MHZ).contains(&sensor.spi_speed_mhz) {
        return Err(ContractError::config_validation(
            "sensor.spi_speed_mhz",
            format!(
                "spi_speed_mhz must be within 1..={MAX_SPI_SPEED_MHZ}, got {}",
                sensor.spi_speed_mhz
            ),
        ));
    }

    if sensor.transport == TransportKind::Replay && sensor.replay_path.is_none() {
        return Err(ContractError::config_validation(
            "sensor.replay_path",
            "replay transport requires replay_path",
        ));
    }

    if sensor.transport == TransportKind::Spidev {
        if sensor.spi_device.is_empty() {
            return Err(ContractError::config_validation(
                "sensor.spi_device",
                "spi_device cannot be empty",
            ));
        }
        if sensor.i2c_device.is_empty() {
            return Err(ContractError::config_validation(
                "sensor.i2c_device",
                "i2c_device cannot be empty",
            ));
        }
    }

    Ok(())
}

/// Validate the manual range
fn validate_render(blueprint: &CameraBlueprint) -> Result<(), ContractError> {
    let render = &blueprint.render;
    if render.range_min >= render.range_max {
        return Err(ContractError::config_validation(
            "render.range_min / render.range_max",
            format!(
                "range_min ({}) must be < range_max ({})",
                render.range_min, render.range_max
            ),
        ));
    }
    Ok(())
}

/// Validate sync and recovery tuning
fn validate_acquisition(blueprint: &CameraBlueprint) -> Result<(), ContractError> {
    let acquisition = &blueprint.acquisition;
    if acquisition.reset_threshold == 0 {
        return Err(ContractError::config_validation(
            "acquisition.reset_threshold",
            "reset_threshold must be > 0",
        ));
    }
    if acquisition.warn_every == 0 {
        return Err(ContractError::config_validation(
            "acquisition.warn_every",
            "warn_every must be > 0",
        ));
    }
    Ok(())
}

/// Validate telemetry settings
fn validate_telemetry(blueprint: &CameraBlueprint) -> Result<(), ContractError> {
    let telemetry = &blueprint.telemetry;

    if let Some(endpoint) = &telemetry.endpoint {
        if !(endpoint.starts_with("http://") || endpoint.starts_with("https://")) {
            return Err(ContractError::config_validation(
                "telemetry.endpoint",
                format!("endpoint must start with http:// or https://, got '{endpoint}'"),
            ));
        }
    }

    if telemetry.interval_secs == 0 {
        return Err(ContractError::config_validation(
            "telemetry.interval_secs",
            "interval_secs must be > 0",
        ));
    }

    if telemetry.device_id.is_empty() {
        return Err(ContractError::config_validation(
            "telemetry.device_id",
            "device_id cannot be empty",
        ));
    }

    let variant = blueprint.sensor.variant;
    if let Some(sample) = telemetry.sample {
        if sample.row >= variant.height() || sample.column >= variant.width() {
            return Err(ContractError::config_validation(
                "telemetry.sample",
                format!(
                    "sample ({}, {}) outside {}x{} frame",
                    sample.row,
                    sample.column,
                    variant.width(),
                    variant.height()
                ),
            ));
        }
    }

    Ok(())
}

/// Validate sink configuration
fn validate_sinks(blueprint: &CameraBlueprint) -> Result<(), ContractError> {
    let mut seen = HashSet::new();
    for (idx, sink) in blueprint.sinks.iter().enumerate() {
        if sink.name.is_empty() {
            return Err(ContractError::config_validation(
                format!("sinks[{}].name", idx),
                "sink name cannot be empty",
            ));
        }
        if !seen.insert(sink.name.as_str()) {
            return Err(ContractError::config_validation(
                format!("sinks[name={}]", sink.name),
                "duplicate sink name",
            ));
        }
    }
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;
    use contracts::{PixelCoord, SensorVariant, SinkConfig, SinkType};
    use std::collections::HashMap;
    use std::path::PathBuf;

    fn minimal_blueprint() -> CameraBlueprint {
        let mut blueprint = CameraBlueprint::default();
        blueprint.sinks.push(SinkConfig {
            name: "log".into(),
            sink_type: SinkType::Log,
            params: HashMap::new(),
        });
        blueprint
    }

    fn assert_field(result: Result<(), ContractError>, expected: &str) {
        match result {
            Err(ContractError::ConfigValidation { field, .. }) => {
                assert!(field.contains(expected), "unexpected field {field}")
            }
            other => panic!("expected validation error, got {other:?}"),
        }
    }

    #[test]
    fn test_valid_blueprint() {
        assert!(validate(&minimal_blueprint()).is_ok());
    }

    #[test]
    fn test_spi_speed_bounds() {
        let mut bp = minimal_blueprint();
        bp.sensor.spi_speed_mhz = 0;
        assert_field(validate(&bp), "spi_speed_mhz");
        bp.sensor.spi_speed_mhz = 31;
        assert_field(validate(&bp), "spi_speed_mhz");
        bp.sensor.spi_speed_mhz = 30;
        assert!(validate(&bp).is_ok());
    }

    #[test]
    fn test_replay_requires_path() {
        let mut bp = minimal_blueprint();
        bp.sensor.transport = TransportKind::Replay;
        assert_field(validate(&bp), "replay_path");
        bp.sensor.replay_path = Some(PathBuf::from("capture.bin"));
        assert!(validate(&bp).is_ok());
    }

    #[test]
    fn test_manual_range_order() {
        let mut bp = minimal_blueprint();
        bp.render.range_min = 32000;
        bp.render.range_max = 32000;
        assert_field(validate(&bp), "range_min");
    }

    #[test]
    fn test_zero_reset_threshold() {
        let mut bp = minimal_blueprint();
        bp.acquisition.reset_threshold = 0;
        assert_field(validate(&bp), "reset_threshold");
    }

    #[test]
    fn test_telemetry_endpoint_scheme() {
        let mut bp = minimal_blueprint();
        bp.telemetry.endpoint = Some("ftp://example.com".into());
        assert_field(validate(&bp), "telemetry.endpoint");
        bp.telemetry.endpoint = Some("https://example.com/t".into());
        assert!(validate(&bp).is_ok());
    }

    #[test]
    fn test_telemetry_interval() {
        let mut bp = minimal_blueprint();
        bp.telemetry.interval_secs = 0;
        assert_field(validate(&bp), "interval_secs");
    }

    #[test]
    fn test_sample_inside_frame() {
        let mut bp = minimal_blueprint();
        bp.telemetry.sample = Some(PixelCoord { row: 60, column: 0 });
        assert_field(validate(&bp), "telemetry.sample");
        bp.sensor.variant = SensorVariant::Lepton3;
        assert!(validate(&bp).is_ok());
    }

    #[test]
    fn test_duplicate_sink_name() {
        let mut bp = minimal_blueprint();
        bp.sinks.push(bp.sinks[0].clone());
        let err = validate(&bp).unwrap_err();
        assert!(err.to_string().contains("duplicate"));
    }

    #[test]
    fn test_empty_sink_name() {
        let mut bp = minimal_blueprint();
        bp.sinks[0].name.clear();
        assert_field(validate(&bp), "sinks[0].name");
    }
}
