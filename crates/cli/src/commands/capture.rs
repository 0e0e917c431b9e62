//! `capture` command implementation.

use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Arc;

use anyhow::{Context, Result};
use contracts::{ContractError, PacketSource};
use device::{CaptureWriter, DeviceFactory};
use tracing::{info, warn};

use super::load_blueprint;
use crate::cli::CaptureArgs;
use crate::error::CliError;

/// Execute the `capture` command
pub async fn run_capture(args: &CaptureArgs) -> Result<()> {
    let mut blueprint = load_blueprint(&args.config)?;
    if let Some(transport) = args.transport {
        blueprint.sensor.transport = transport.into();
    }

    let devices = DeviceFactory::build(&blueprint.sensor)
        .map_err(|e| CliError::device_setup(blueprint.sensor.transport, e.to_string()))?;
    let writer = CaptureWriter::create(&args.output)
        .with_context(|| format!("Failed to create {}", args.output.display()))?;

    let stop = Arc::new(AtomicBool::new(false));
    let ctrl_c_stop = Arc::clone(&stop);
    tokio::spawn(async move {
        if tokio::signal::ctrl_c().await.is_ok() {
            ctrl_c_stop.store(true, Ordering::Release);
        }
    });

    info!(
        bus = %devices.bus.name(),
        output = %args.output.display(),
        packets = args.packets,
        "Recording packets"
    );

    let count = args.packets;
    let mut bus = devices.bus;
    let written = tokio::task::spawn_blocking(move || {
        let result = record_packets(bus.as_mut(), writer, count, &stop);
        bus.close();
        result
    })
    .await
    .context("Capture task panicked")??;

    println!("Recorded {} packets to {}", written, args.output.display());
    Ok(())
}

/// Copy up to `count` packets from `bus` into `writer`
///
/// Stops early at the end of the source or when `stop` is set.
fn record_packets(
    bus: &mut dyn PacketSource,
    mut writer: CaptureWriter,
    count: u64,
    stop: &AtomicBool,
) -> Result<u64> {
    bus.open()?;

    while writer.packets() < count && !stop.load(Ordering::Acquire) {
        match bus.read_packet() {
            Ok(packet) => writer.write_packet(&packet)?,
            Err(ContractError::BusExhausted { device }) => {
                warn!(device = %device, "source exhausted before packet count was reached");
                break;
            }
            Err(e) => return Err(e.into()),
        }
    }

    Ok(writer.finish()?)
}

#[cfg(test)]
mod tests {
    use super::*;
    use device::{uniform_pass, ReplayBus, ScriptedBus};

    #[test]
    fn test_record_stops_at_count() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("capture.lcap");
        let mut bus = ScriptedBus::new(uniform_pass(None, 7000));
        let writer = CaptureWriter::create(&path).unwrap();

        let written = record_packets(&mut bus, writer, 10, &AtomicBool::new(false)).unwrap();
        assert_eq!(written, 10);
        assert_eq!(bus.remaining(), 50);

        let mut replay = ReplayBus::new(&path);
        replay.open().unwrap();
        for _ in 0..10 {
            replay.read_packet().unwrap();
        }
        assert!(matches!(
            replay.read_packet(),
            Err(ContractError::BusExhausted { .. })
        ));
    }

    #[test]
    fn test_record_stops_at_end_of_source() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("short.lcap");
        let mut bus = ScriptedBus::new(uniform_pass(None, 7000));
        let writer = CaptureWriter::create(&path).unwrap();

        let written = record_packets(&mut bus, writer, 1000, &AtomicBool::new(false)).unwrap();
        assert_eq!(written, 60);
    }

    #[test]
    fn test_record_honors_stop_flag() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("stopped.lcap");
        let mut bus = ScriptedBus::new(uniform_pass(None, 7000));
        let writer = CaptureWriter::create(&path).unwrap();

        let written = record_packets(&mut bus, writer, 60, &AtomicBool::new(true)).unwrap();
        assert_eq!(written, 0);
    }
}
