//! `run` command implementation.

use anyhow::{Context, Result};
use contracts::{CameraBlueprint, TransportKind};
use std::time::Duration;
use tracing::info;

use super::load_blueprint;
use crate::cli::RunArgs;
use crate::error::CliError;
use crate::pipeline::{Pipeline, PipelineConfig};

/// Execute the `run` command
pub async fn run_pipeline(args: &RunArgs) -> Result<()> {
    let mut blueprint = load_blueprint(&args.config)?;

    apply_overrides(&mut blueprint, args);
    config_loader::ConfigLoader::validate(&blueprint)
        .map_err(|e| CliError::config_validation(e.to_string()))?;

    info!(
        variant = %blueprint.sensor.variant,
        transport = %blueprint.sensor.transport,
        colormap = ?blueprint.render.colormap,
        sinks = blueprint.sinks.len(),
        telemetry = blueprint.telemetry.endpoint.is_some(),
        "Configuration loaded"
    );

    if args.dry_run {
        info!("Dry run mode - configuration is valid, exiting");
        print_config_summary(&blueprint);
        return Ok(());
    }

    let pipeline_config = PipelineConfig {
        blueprint,
        max_frames: (args.max_frames > 0).then_some(args.max_frames),
        timeout: (args.timeout > 0).then(|| Duration::from_secs(args.timeout)),
        metrics_port: (args.metrics_port > 0).then_some(args.metrics_port),
    };

    info!("Starting pipeline...");
    let stats = Pipeline::new(pipeline_config)
        .run()
        .await
        .context("Pipeline execution failed")?;

    info!(
        frames = stats.summary.frames,
        stop_reason = %stats.stop_reason,
        duration_secs = stats.duration.as_secs_f64(),
        fps = format!("{:.2}", stats.fps()),
        "Pipeline finished"
    );
    stats.print_summary();

    Ok(())
}

/// Apply command-line overrides on top of the loaded configuration
fn apply_overrides(blueprint: &mut CameraBlueprint, args: &RunArgs) {
    if let Some(variant) = args.variant {
        info!(?variant, "Overriding sensor variant from CLI");
        blueprint.sensor.variant = variant.into();
    }
    if let Some(colormap) = args.colormap {
        blueprint.render.colormap = colormap.into();
    }
    if let Some(transport) = args.transport {
        blueprint.sensor.transport = transport.into();
    }
    if let Some(ref path) = args.replay {
        info!(path = %path.display(), "Replaying capture file");
        blueprint.sensor.transport = TransportKind::Replay;
        blueprint.sensor.replay_path = Some(path.clone());
        blueprint.sensor.replay_loop = args.replay_loop;
    }
    if let Some(speed) = args.spi_speed {
        blueprint.sensor.spi_speed_mhz = speed;
    }
    if let Some(min) = args.range_min {
        blueprint.render.auto_range_min = false;
        blueprint.render.range_min = min;
    }
    if let Some(max) = args.range_max {
        blueprint.render.auto_range_max = false;
        blueprint.render.range_max = max;
    }
    if let Some(ref endpoint) = args.telemetry_endpoint {
        blueprint.telemetry.endpoint = Some(endpoint.clone());
    }
}

/// Print configuration summary for dry-run mode
fn print_config_summary(blueprint: &CameraBlueprint) {
    let sensor = &blueprint.sensor;
    let render = &blueprint.render;

    println!("\n=== Configuration Summary ===\n");
    println!("Sensor:");
    println!(
        "  Variant: {} ({}x{}, {} segment(s))",
        sensor.variant,
        sensor.variant.width(),
        sensor.variant.height(),
        sensor.variant.segments()
    );
    match sensor.transport {
        TransportKind::Spidev => println!(
            "  Transport: spidev {} @ {} MHz, registers on {}",
            sensor.spi_device, sensor.spi_speed_mhz, sensor.i2c_device
        ),
        TransportKind::Mock => println!("  Transport: mock"),
        TransportKind::Replay => println!(
            "  Transport: replay {}{}",
            sensor
                .replay_path
                .as_ref()
                .map(|p| p.display().to_string())
                .unwrap_or_default(),
            if sensor.replay_loop { " (looping)" } else { "" }
        ),
    }

    println!("\nRender:");
    println!("  Colormap: {:?}", render.colormap);
    println!(
        "  Range min: {}",
        if render.auto_range_min { "auto".to_string() } else { render.range_min.to_string() }
    );
    println!(
        "  Range max: {}",
        if render.auto_range_max { "auto".to_string() } else { render.range_max.to_string() }
    );

    match blueprint.telemetry.endpoint {
        Some(ref endpoint) => {
            let sample = blueprint.telemetry_sample();
            println!("\nTelemetry:");
            println!("  Endpoint: {}", endpoint);
            println!("  Device: {}", blueprint.telemetry.device_id);
            println!("  Interval: {}s", blueprint.telemetry.interval_secs);
            println!("  Sample pixel: row {}, column {}", sample.row, sample.column);
        }
        None => println!("\nTelemetry: disabled"),
    }

    if !blueprint.sinks.is_empty() {
        println!("\nSinks ({}):", blueprint.sinks.len());
        for sink in &blueprint.sinks {
            println!("  - {} ({:?})", sink.name, sink.sink_type);
        }
    }

    println!();
}
