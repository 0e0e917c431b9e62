//! `info` command implementation.

use anyhow::{Context, Result};
use contracts::{AcquisitionConfig, CameraBlueprint};
use serde::Serialize;
use std::collections::HashMap;

use super::load_blueprint;
use crate::cli::InfoArgs;

/// Configuration info for JSON output
#[derive(Serialize)]
struct ConfigInfo {
    version: String,
    sensor: SensorInfo,
    render: RenderInfo,
    #[serde(skip_serializing_if = "Option::is_none")]
    telemetry: Option<TelemetryInfo>,
    #[serde(skip_serializing_if = "Option::is_none")]
    acquisition: Option<AcquisitionConfig>,
    #[serde(skip_serializing_if = "Vec::is_empty")]
    sinks: Vec<SinkInfo>,
}

#[derive(Serialize)]
struct SensorInfo {
    variant: String,
    width: usize,
    height: usize,
    segments: u8,
    transport: String,
    bus: String,
}

#[derive(Serialize)]
struct RenderInfo {
    colormap: String,
    range_min: String,
    range_max: String,
}

#[derive(Serialize)]
struct TelemetryInfo {
    endpoint: String,
    device_id: String,
    interval_secs: u64,
    sample_row: usize,
    sample_column: usize,
}

#[derive(Serialize)]
struct SinkInfo {
    name: String,
    sink_type: String,
    #[serde(skip_serializing_if = "HashMap::is_empty")]
    params: HashMap<String, String>,
}

/// Execute the `info` command
pub fn run_info(args: &InfoArgs) -> Result<()> {
    let blueprint = load_blueprint(&args.config)?;
    let info = build_config_info(&blueprint, args);

    if args.json {
        let json =
            serde_json::to_string_pretty(&info).context("Failed to serialize config info")?;
        println!("{}", json);
    } else {
        print_config_info(&info);
    }

    Ok(())
}

fn build_config_info(blueprint: &CameraBlueprint, args: &InfoArgs) -> ConfigInfo {
    let sensor = &blueprint.sensor;
    let bus = match sensor.transport {
        contracts::TransportKind::Spidev => format!(
            "{} @ {} MHz (registers {})",
            sensor.spi_device, sensor.spi_speed_mhz, sensor.i2c_device
        ),
        contracts::TransportKind::Mock => "synthetic".to_string(),
        contracts::TransportKind::Replay => sensor
            .replay_path
            .as_ref()
            .map(|p| p.display().to_string())
            .unwrap_or_else(|| "<unset>".to_string()),
    };

    let bound = |auto: bool, value: u16| {
        if auto {
            "auto".to_string()
        } else {
            value.to_string()
        }
    };

    let telemetry = blueprint.telemetry.endpoint.as_ref().map(|endpoint| {
        let sample = blueprint.telemetry_sample();
        TelemetryInfo {
            endpoint: endpoint.clone(),
            device_id: blueprint.telemetry.device_id.clone(),
            interval_secs: blueprint.telemetry.interval_secs,
            sample_row: sample.row,
            sample_column: sample.column,
        }
    });

    let sinks = if args.sinks {
        blueprint
            .sinks
            .iter()
            .map(|s| SinkInfo {
                name: s.name.clone(),
                sink_type: format!("{:?}", s.sink_type),
                params: s.params.clone(),
            })
            .collect()
    } else {
        Vec::new()
    };

    ConfigInfo {
        version: format!("{:?}", blueprint.version),
        sensor: SensorInfo {
            variant: sensor.variant.to_string(),
            width: sensor.variant.width(),
            height: sensor.variant.height(),
            segments: sensor.variant.segments(),
            transport: sensor.transport.to_string(),
            bus,
        },
        render: RenderInfo {
            colormap: format!("{:?}", blueprint.render.colormap),
            range_min: bound(blueprint.render.auto_range_min, blueprint.render.range_min),
            range_max: bound(blueprint.render.auto_range_max, blueprint.render.range_max),
        },
        telemetry,
        acquisition: args.acquisition.then(|| blueprint.acquisition.clone()),
        sinks,
    }
}

fn print_config_info(info: &ConfigInfo) {
    println!("Configuration {}", info.version);

    println!("\nSensor");
    println!(
        "  ├─ Variant: {} ({}x{}, {} segment(s))",
        info.sensor.variant, info.sensor.width, info.sensor.height, info.sensor.segments
    );
    println!("  └─ Transport: {} [{}]", info.sensor.transport, info.sensor.bus);

    println!("\nRender");
    println!("  ├─ Colormap: {}", info.render.colormap);
    println!("  ├─ Range min: {}", info.render.range_min);
    println!("  └─ Range max: {}", info.render.range_max);

    match info.telemetry {
        Some(ref t) => {
            println!("\nTelemetry");
            println!("  ├─ Endpoint: {}", t.endpoint);
            println!("  ├─ Device: {}", t.device_id);
            println!("  ├─ Interval: {}s", t.interval_secs);
            println!("  └─ Sample: row {}, column {}", t.sample_row, t.sample_column);
        }
        None => println!("\nTelemetry: disabled"),
    }

    if let Some(ref acq) = info.acquisition {
        println!("\nAcquisition");
        println!("  ├─ Reset threshold: {}", acq.reset_threshold);
        println!("  ├─ Resync delay: {}us", acq.resync_delay_us);
        println!("  ├─ Settle delay: {}ms", acq.settle_delay_ms);
        println!("  ├─ Slow pass warning: {} resets", acq.slow_pass_resets);
        println!(
            "  ├─ Max consecutive reboots: {}",
            if acq.max_consecutive_reboots == 0 {
                "unlimited".to_string()
            } else {
                acq.max_consecutive_reboots.to_string()
            }
        );
        println!(
            "  └─ FFC interval: {}",
            if acq.ffc_interval_secs == 0 {
                "off".to_string()
            } else {
                format!("{}s", acq.ffc_interval_secs)
            }
        );
    }

    if !info.sinks.is_empty() {
        println!("\nSinks ({})", info.sinks.len());
        for (i, sink) in info.sinks.iter().enumerate() {
            let branch = if i + 1 == info.sinks.len() { "└─" } else { "├─" };
            println!("  {} {} ({})", branch, sink.name, sink.sink_type);
            let mut params: Vec<_> = sink.params.iter().collect();
            params.sort();
            for (key, value) in params {
                println!("       {} = {}", key, value);
            }
        }
    }
}
