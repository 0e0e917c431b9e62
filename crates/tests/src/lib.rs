//! # Integration Tests
//!
//! Cross-crate and end-to-end tests.
//!
//! Covers:
//! - Configuration to running pipeline
//! - Scripted/replayed packet streams through acquisition, dispatch and sinks
//! - Telemetry sampling and rate limiting

#[cfg(test)]
mod contract_tests {
    use config_loader::{ConfigFormat, ConfigLoader};
    use contracts::{ColormapKind, SensorVariant, TransportKind};
    use ingestion::AcquisitionOptions;

    #[test]
    fn test_config_to_acquisition_options() {
        let blueprint = ConfigLoader::load_from_str(
            r#"
[sensor]
variant = "lepton3"
transport = "mock"

[render]
colormap = "rainbow"

[acquisition]
reset_threshold = 400
ffc_interval_secs = 180

[telemetry]
device_id = "roof-cam"
"#,
            ConfigFormat::Toml,
        )
        .unwrap();

        assert_eq!(blueprint.sensor.variant, SensorVariant::Lepton3);
        assert_eq!(blueprint.sensor.transport, TransportKind::Mock);
        assert_eq!(blueprint.render_config().colormap, ColormapKind::Rainbow);

        let options = AcquisitionOptions::from_blueprint(&blueprint);
        assert_eq!(options.reset_threshold, 400);
        assert_eq!(options.ffc_interval.map(|d| d.as_secs()), Some(180));
        assert_eq!(options.device_id, "roof-cam");
        assert_eq!(options.max_frames, None);
    }

    #[test]
    fn test_blueprint_round_trips_through_toml() {
        let blueprint = ConfigLoader::load_from_str(
            "[sensor]\ntransport = \"mock\"\n",
            ConfigFormat::Toml,
        )
        .unwrap();
        let text = ConfigLoader::to_toml(&blueprint).unwrap();
        let again = ConfigLoader::load_from_str(&text, ConfigFormat::Toml).unwrap();
        assert_eq!(again.sensor.transport, TransportKind::Mock);
        assert_eq!(again.acquisition.reset_threshold, 750);
    }
}

#[cfg(test)]
mod e2e_tests {
    use std::collections::HashMap;
    use std::sync::{Arc, Mutex};
    use std::time::Duration;

    use contracts::{
        raw_to_celsius, ColormapKind, ContractError, FrameEmitter, PacketSource, RenderConfig,
        RenderSettings, RenderedFrame, SensorVariant, SinkConfig, SinkType, TelemetrySink,
        TemperatureReading,
    };
    use device::{
        mismatched_packets, pass_packets, uniform_pass, CaptureWriter, MockRegisters, ReplayBus,
        ScriptedBus,
    };
    use dispatcher::{
        create_dispatcher, spawn_telemetry, FramePublisher, FrameSlot, LATEST_FILE,
    };
    use frame_engine::colormap;
    use ingestion::{AcquisitionControl, AcquisitionOptions, AcquisitionPipeline, StopReason};

    /// Collects every emitted frame and reading
    #[derive(Clone, Default)]
    struct Collector {
        frames: Arc<Mutex<Vec<RenderedFrame>>>,
        readings: Arc<Mutex<Vec<TemperatureReading>>>,
    }

    impl Collector {
        fn frames(&self) -> Vec<RenderedFrame> {
            self.frames.lock().unwrap().clone()
        }
    }

    impl FrameEmitter for Collector {
        fn publish(&mut self, frame: RenderedFrame) {
            self.frames.lock().unwrap().push(frame);
        }

        fn offer_reading(&mut self, reading: TemperatureReading) {
            self.readings.lock().unwrap().push(reading);
        }
    }

    /// Telemetry sink that records what it was sent
    #[derive(Clone, Default)]
    struct RecordingTelemetry {
        sent: Arc<Mutex<Vec<TemperatureReading>>>,
    }

    impl TelemetrySink for RecordingTelemetry {
        fn name(&self) -> &str {
            "recording"
        }

        async fn send(&mut self, reading: &TemperatureReading) -> Result<(), ContractError> {
            self.sent.lock().unwrap().push(reading.clone());
            Ok(())
        }
    }

    fn settings(variant: SensorVariant, colormap: ColormapKind) -> RenderSettings {
        RenderSettings::new(RenderConfig {
            variant,
            colormap,
            ..Default::default()
        })
    }

    fn pipeline(
        bus: impl PacketSource + 'static,
        settings: RenderSettings,
        emitter: impl FrameEmitter + 'static,
    ) -> AcquisitionPipeline {
        AcquisitionPipeline::new(
            AcquisitionOptions::default().without_delays(),
            Box::new(bus),
            Box::new(MockRegisters::new()),
            settings,
            Box::new(emitter),
        )
    }

    /// Low-res frame with a single zero word: the zero is excluded from the
    /// range scan and its pixel is left unwritten.
    #[test]
    fn test_zero_word_pixel_left_unwritten() {
        let mut packets = pass_packets(None, |p, w| 29000 + (p * 10 + w) as u16);
        packets.extend(pass_packets(None, |p, w| {
            if p == 10 && w == 5 {
                0
            } else {
                30000
            }
        }));
        let collector = Collector::default();

        let report = pipeline(
            ScriptedBus::new(packets),
            settings(SensorVariant::Lepton2, ColormapKind::Ironblack),
            collector.clone(),
        )
        .run(&AcquisitionControl::new())
        .unwrap();

        assert_eq!(report.stop_reason, StopReason::EndOfStream);
        assert_eq!(report.summary.zero_words, 1);

        let frames = collector.frames();
        assert_eq!(frames.len(), 2);
        let (warmup, frame) = (&frames[0], &frames[1]);
        assert_eq!((warmup.window.min, warmup.window.max), (29000, 29669));

        // bounds follow the frame; only the degenerate scale is carried over
        assert_eq!((frame.window.min, frame.window.max), (30000, 30000));
        assert_eq!(frame.window.scale, warmup.window.scale);

        let first = colormap::lookup(colormap::table(ColormapKind::Ironblack), 0);
        assert_ne!(warmup.pixel(10, 5), Some(first));
        assert_eq!(frame.pixel(10, 5), warmup.pixel(10, 5));
        assert_eq!(frame.pixel(0, 0), Some(first));
        assert_eq!(frame.pixel(10, 4), Some(first));
        assert_eq!(frame.pixel(59, 79), Some(first));
    }

    /// High-res segments 1..4 produce one 160x120 frame with segment 3 on
    /// rows 60..89.
    #[test]
    fn test_high_res_segment_placement() {
        let mut packets = Vec::new();
        for segment in 1..=4u8 {
            packets.extend(uniform_pass(Some(segment), 30000 + u16::from(segment) * 100));
        }
        let collector = Collector::default();

        pipeline(
            ScriptedBus::new(packets),
            settings(SensorVariant::Lepton3, ColormapKind::Grayscale),
            collector.clone(),
        )
        .run(&AcquisitionControl::new())
        .unwrap();

        let frames = collector.frames();
        assert_eq!(frames.len(), 1);
        let frame = &frames[0];
        assert_eq!((frame.width, frame.height), (160, 120));

        let segment3 = frame.pixel(60, 0).unwrap();
        for row in 60..90 {
            assert_eq!(frame.pixel(row, 0), Some(segment3), "row {row}");
            assert_eq!(frame.pixel(row, 159), Some(segment3), "row {row}");
        }
        assert_ne!(frame.pixel(59, 0), Some(segment3));
        assert_ne!(frame.pixel(90, 0), Some(segment3));
        assert_eq!(frame.pixel(0, 0), Some([0, 0, 0]));
        assert_eq!(frame.pixel(119, 159), Some([255, 255, 255]));
    }

    /// Manual bounds 30000..32000, raw 31000: 1000 * 255/2000 = 127.5 -> 127
    #[test]
    fn test_manual_bounds_color() {
        let settings = settings(SensorVariant::Lepton2, ColormapKind::Grayscale);
        settings.update(|c| {
            c.use_range_min(30000);
            c.use_range_max(32000);
        });
        let collector = Collector::default();

        pipeline(ScriptedBus::new(uniform_pass(None, 31000)), settings, collector.clone())
            .run(&AcquisitionControl::new())
            .unwrap();

        let frame = &collector.frames()[0];
        assert_eq!(frame.pixel(30, 40), Some([127, 127, 127]));
    }

    /// 750 consecutive mismatches reboot the sensor once, then acquisition
    /// continues with a fresh counter.
    #[test]
    fn test_reboot_after_reset_threshold() {
        let mut packets = mismatched_packets(750);
        packets.extend(uniform_pass(None, 30000));
        let bus = ScriptedBus::new(packets);
        let counters = bus.counters();
        let registers = MockRegisters::new();
        let log = registers.log();
        let collector = Collector::default();

        let report = AcquisitionPipeline::new(
            AcquisitionOptions::default().without_delays(),
            Box::new(bus),
            Box::new(registers),
            settings(SensorVariant::Lepton2, ColormapKind::Ironblack),
            Box::new(collector.clone()),
        )
        .run(&AcquisitionControl::new())
        .unwrap();

        assert_eq!(log.reboots(), 1);
        assert_eq!(report.summary.reboots, 1);
        assert_eq!(counters.opens(), 2);
        assert_eq!(collector.frames().len(), 1);
    }

    /// Fewer mismatches than the threshold never reboot.
    #[test]
    fn test_no_reboot_below_threshold() {
        let mut packets = mismatched_packets(749);
        packets.extend(uniform_pass(None, 30000));
        let registers = MockRegisters::new();
        let log = registers.log();

        let report = AcquisitionPipeline::new(
            AcquisitionOptions::default().without_delays(),
            Box::new(ScriptedBus::new(packets)),
            Box::new(registers),
            settings(SensorVariant::Lepton2, ColormapKind::Ironblack),
            Box::new(Collector::default()),
        )
        .run(&AcquisitionControl::new())
        .unwrap();

        assert_eq!(log.reboots(), 0);
        assert_eq!(report.summary.frames, 1);
        assert_eq!(report.summary.resyncs, 749);
    }

    /// Scripted bus -> acquisition thread -> frame slot -> file sink
    #[tokio::test(flavor = "multi_thread", worker_threads = 2)]
    async fn test_pipeline_to_file_sink() {
        let dir = tempfile::tempdir().unwrap();
        let slot = FrameSlot::new();
        let mut params = HashMap::new();
        params.insert("base_path".to_string(), dir.path().display().to_string());
        let dispatcher = create_dispatcher(
            vec![SinkConfig {
                name: "png".to_string(),
                sink_type: SinkType::File,
                params,
            }],
            slot.clone(),
        )
        .await
        .unwrap();

        let mut packets = Vec::new();
        for value in [30000u16, 30100, 30200] {
            packets.extend(uniform_pass(None, value));
        }
        let handle = pipeline(
            ScriptedBus::new(packets),
            settings(SensorVariant::Lepton2, ColormapKind::Rainbow),
            FramePublisher::new(slot.clone(), None),
        )
        .spawn()
        .unwrap();

        let report = tokio::task::spawn_blocking(move || handle.join())
            .await
            .unwrap()
            .unwrap();
        assert_eq!(report.stop_reason, StopReason::EndOfStream);
        assert_eq!(slot.published(), 3);
        assert_eq!(slot.latest().unwrap().frame_id, 3);

        let metrics = dispatcher.shutdown().await;
        assert_eq!(metrics.len(), 1);
        let (name, snapshot) = &metrics[0];
        assert_eq!(name, "png");
        assert!(snapshot.write_count >= 1);
        assert_eq!(snapshot.failure_count, 0);

        let latest = dir.path().join(LATEST_FILE);
        assert!(latest.exists());
        assert!(std::fs::metadata(latest).unwrap().len() > 0);
    }

    /// Packets recorded to a capture file replay into the same frames.
    #[test]
    fn test_capture_replay_round_trip() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("session.lcap");

        let mut writer = CaptureWriter::create(&path).unwrap();
        let mut packets = mismatched_packets(3);
        packets.extend(uniform_pass(None, 30000));
        packets.extend(pass_packets(None, |p, _| 30000 + p as u16));
        for packet in &packets {
            writer.write_packet(packet).unwrap();
        }
        assert_eq!(writer.finish().unwrap(), 123);

        let collector = Collector::default();
        let report = pipeline(
            ReplayBus::new(&path),
            settings(SensorVariant::Lepton2, ColormapKind::Grayscale),
            collector.clone(),
        )
        .run(&AcquisitionControl::new())
        .unwrap();

        assert_eq!(report.stop_reason, StopReason::EndOfStream);
        assert_eq!(report.summary.resyncs, 3);
        let frames = collector.frames();
        assert_eq!(frames.len(), 2);
        assert_eq!(frames[1].window.min, 30000);
        assert_eq!(frames[1].window.max, 30059);
        assert_eq!(frames[1].pixel(0, 0), Some([0, 0, 0]));
        assert!(frames[1].pixel(59, 0).unwrap()[0] >= 254);
    }

    /// Synthetic bus with injected faults still yields frames up to the limit.
    #[test]
    fn test_mock_bus_with_faults_reaches_frame_limit() {
        let config = contracts::MockBusConfig {
            frame_interval_ms: 0,
            desync_every: 3,
            bad_segment_every: 5,
            discard_packets: 2,
            zero_words_per_frame: 4,
            ..Default::default()
        };
        let mut options = AcquisitionOptions::default().without_delays();
        options.max_frames = Some(12);
        let collector = Collector::default();

        let report = AcquisitionPipeline::new(
            options,
            Box::new(device::MockPacketBus::new(SensorVariant::Lepton3, config)),
            Box::new(MockRegisters::new()),
            settings(SensorVariant::Lepton3, ColormapKind::Ironblack),
            Box::new(collector.clone()),
        )
        .run(&AcquisitionControl::new())
        .unwrap();

        assert_eq!(report.stop_reason, StopReason::FrameLimit);
        assert_eq!(report.summary.frames, 12);
        assert!(report.summary.resyncs > 0);
        assert!(report.summary.wrong_segments > 0);
        assert_eq!(collector.frames().len(), 12);
        assert!(collector.frames().iter().all(|f| f.width == 160));
    }

    /// Readings sample the configured pixel and pass through the telemetry
    /// worker; the interval gate lets only the first one through.
    #[tokio::test(flavor = "multi_thread", worker_threads = 2)]
    async fn test_telemetry_sampled_and_rate_limited() {
        let sink = RecordingTelemetry::default();
        let sent = Arc::clone(&sink.sent);
        let (offer, worker) = spawn_telemetry(sink, Duration::from_secs(3600));
        let slot = FrameSlot::new();

        let mut packets = Vec::new();
        for _ in 0..5 {
            packets.extend(pass_packets(None, |p, w| 29000 + (p * 80 + w) as u16));
        }
        let mut options = AcquisitionOptions::default().without_delays();
        options.device_id = "roof-cam".to_string();
        options.sample = Some(contracts::PixelCoord { row: 2, column: 3 });

        let handle = AcquisitionPipeline::new(
            options,
            Box::new(ScriptedBus::new(packets)),
            Box::new(MockRegisters::new()),
            settings(SensorVariant::Lepton2, ColormapKind::Ironblack),
            Box::new(FramePublisher::new(slot.clone(), Some(offer))),
        )
        .spawn()
        .unwrap();
        let report = tokio::task::spawn_blocking(move || handle.join())
            .await
            .unwrap()
            .unwrap();
        assert_eq!(report.summary.frames, 5);

        let snapshot = worker.shutdown().await;
        assert_eq!(snapshot.sent, 1);

        let sent = sent.lock().unwrap().clone();
        assert_eq!(sent.len(), 1);
        assert_eq!(sent[0].device_id, "roof-cam");
        let expected = raw_to_celsius(29000 + 2 * 80 + 3);
        assert!((sent[0].temperature - expected).abs() < 1e-3);
    }
}
