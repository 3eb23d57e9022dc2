//! # Integration Tests
//!
//! 集成测试与端到端测试。
//!
//! 负责：
//! - 合约快照测试
//! - 合成 MIPI 流的端到端测试（无需传感器）
//! - 并发发布/读取的一致性

#[cfg(test)]
mod contract_tests {
    use contracts::{EventShowType, ProcessorConfig};

    #[test]
    fn test_default_config_is_valid() {
        let config = ProcessorConfig::default();
        assert!(config.validate_all().is_ok());
        assert!(config_loader::ConfigLoader::validate(&config).is_ok());
        assert_eq!(config.event.show, EventShowType::ByTime { frame_time_ms: 30 });
    }

    #[test]
    fn test_default_config_toml_snapshot() {
        let toml = config_loader::ConfigLoader::to_toml(&ProcessorConfig::default()).unwrap();
        for section in ["[sensor]", "[mode]", "[event]", "[modules]"] {
            assert!(toml.contains(section), "missing {section} in:\n{toml}");
        }
        assert!(toml.contains("mipi_format = 2"));
    }
}

/// Shared stream builders
#[cfg(test)]
mod fixtures {
    use contracts::{
        ImuRawData, MipiBatch, MipiFormat, ProcessorConfig, RawPacket, SensorGeometry,
        IMU_RAW_LEN,
    };
    use ingestion::MipiPacketWriter;

    pub const ROWS: u16 = 8;
    pub const COLS: u16 = 8;

    pub fn geometry() -> SensorGeometry {
        SensorGeometry::new(ROWS, COLS)
    }

    pub fn small_config() -> ProcessorConfig {
        let mut config = ProcessorConfig::default();
        config.sensor.rows = ROWS;
        config.sensor.cols = COLS;
        config
    }

    /// `small_config` declaring Format1, for full-picture and loop runs
    pub fn adc_config() -> ProcessorConfig {
        let mut config = small_config();
        config.sensor.mipi_format = MipiFormat::Format1.tag();
        config
    }

    pub fn batch(writer: &mut MipiPacketWriter, format: MipiFormat, end_us: i64) -> MipiBatch {
        MipiBatch::new(RawPacket::new(writer.finish(), format.tag()), end_us)
    }

    /// One whole frame with the same ADC value everywhere
    pub fn uniform_frame(adc: u16, end_us: i64) -> MipiBatch {
        let mut writer = MipiPacketWriter::new(MipiFormat::Format1);
        writer.full_frame(geometry(), 0, |_, _| adc);
        batch(&mut writer, MipiFormat::Format1, end_us)
    }

    pub fn imu_raw(gyro_x: i16) -> ImuRawData {
        let mut bytes = [0u8; IMU_RAW_LEN];
        bytes[..2].copy_from_slice(&gyro_x.to_be_bytes());
        ImuRawData::new(bytes)
    }
}

#[cfg(test)]
mod e2e_tests {
    use contracts::{EventPicType, EventShowType, MipiFormat, FORMAT2_T_MAX};
    use ingestion::MipiPacketWriter;
    use processor::DataProcessor;
    use sync_engine::BoundaryReason;

    use crate::fixtures::*;

    /// Format2 stream, 4096 + 10 time units, 50 events, ByCount 30.
    ///
    /// Exactly one boundary fires, right after the 30th event, and the
    /// published vector holds those 30 events.
    #[test]
    fn test_e2e_format2_by_count() {
        let mut config = small_config();
        config.event.show = EventShowType::ByCount { events: 30 };
        let mut processor = DataProcessor::new(config).unwrap();

        let mut writer = MipiPacketWriter::new(MipiFormat::Format2);
        writer.row(3, 0);
        let mut events = 0u16;
        for step in 1..=(FORMAT2_T_MAX + 10) {
            writer.timestamp(step % FORMAT2_T_MAX);
            if step % 80 == 0 && events < 50 {
                writer.event(events % COLS, None);
                events += 1;
            }
        }
        assert_eq!(events, 50);

        let report = processor.process_mipi_data(&batch(&mut writer, MipiFormat::Format2, 10_000));

        assert_eq!(report.decode_error, None);
        assert_eq!(report.events, 50);
        assert_eq!(report.frames, vec![1]);
        assert_eq!(report.boundaries, vec![BoundaryReason::CountReached]);
        assert_eq!(report.discontinuities, 0);

        let time = processor.state().sync.time();
        assert_eq!(time.total_elapsed, (FORMAT2_T_MAX + 10) as u64);

        let (vector, frame_no) = processor.event_data_vector_with_frame_no().unwrap();
        assert_eq!(frame_no, 1);
        assert_eq!(vector.len(), 30);
        assert!(vector.iter().all(|e| e.adc.is_none() && e.row == 3));
        // 帧内偏移单调不减
        assert!(vector.windows(2).all(|w| w[0].t_off_pixel <= w[1].t_off_pixel));

        // once per publication for this reader
        assert!(processor.event_data_vector().is_none());
        let binary = processor.event_picture(EventPicType::Binary).unwrap();
        assert_eq!(binary.iter().filter(|&&p| p == 255).count(), COLS as usize);
    }

    #[test]
    fn test_e2e_row_cursor_spans_batches() {
        let mut config = small_config();
        config.event.show = EventShowType::ByCount { events: 4 };
        let mut processor = DataProcessor::new(config).unwrap();

        // row address in the first batch, events in the second
        let mut first = MipiPacketWriter::new(MipiFormat::Format2);
        first.row(6, 100);
        processor.process_mipi_data(&batch(&mut first, MipiFormat::Format2, 1_000));

        let mut second = MipiPacketWriter::new(MipiFormat::Format2);
        for col in 0..4 {
            second.event(col, None);
        }
        let report = processor.process_mipi_data(&batch(&mut second, MipiFormat::Format2, 2_000));

        assert_eq!(report.frames.len(), 1);
        let vector = processor.event_data_vector().unwrap();
        assert!(vector.iter().all(|e| e.row == 6));
    }

    #[test]
    fn test_e2e_frame_numbers_strictly_increase() {
        let mut config = small_config();
        config.sensor.mipi_format = MipiFormat::Format0.tag();
        config.event.show = EventShowType::ByCount { events: 5 };
        let mut processor = DataProcessor::new(config).unwrap();

        let mut seen = Vec::new();
        let mut t = 0;
        for call in 0..20 {
            let mut writer = MipiPacketWriter::new(MipiFormat::Format0);
            for row in 0..ROWS {
                t = (t + 1) % 4096;
                writer.row(row, t);
                writer.event((call % COLS as i64) as u16, Some(2048));
            }
            let report =
                processor.process_mipi_data(&batch(&mut writer, MipiFormat::Format0, call * 1_000));
            seen.extend(report.frames);
        }

        assert_eq!(seen.len(), 32);
        assert!(seen.windows(2).all(|w| w[1] == w[0] + 1));
        assert_eq!(processor.frame_no(), 32);
    }

    #[test]
    fn test_e2e_unsupported_format_keeps_state() {
        let mut processor = DataProcessor::new(small_config()).unwrap();
        let before = processor.state().sync.time().total_elapsed;

        let bad = contracts::MipiBatch::new(contracts::RawPacket::new(vec![0u8; 14], 7), 1_000);
        let report = processor.process_mipi_data(&bad);

        assert!(report.decode_error.is_some());
        assert_eq!(report.samples, 0);
        assert_eq!(processor.state().sync.time().total_elapsed, before);
        assert_eq!(processor.decode_metrics().snapshot().unsupported_format, 1);
    }
}

#[cfg(test)]
mod loop_tests {
    use contracts::{EventPicType, FlowPicType, LoopSlot, MipiFormat, SensorMode};
    use ingestion::MipiPacketWriter;
    use processor::DataProcessor;

    use crate::fixtures::*;

    #[test]
    fn test_loop_cycles_one_slot_per_call() {
        let mut config = adc_config();
        config.mode.loop_enabled = true;
        let mut processor = DataProcessor::new(config).unwrap();
        assert_eq!(processor.loop_slot(), LoopSlot::A);

        // A: full picture
        let report = processor.process_mipi_data(&uniform_frame(1600, 1_000));
        assert_eq!(report.mode, SensorMode::FullPicture);
        assert_eq!(report.frames, vec![1]);
        assert_eq!(processor.full_picture().unwrap(), vec![100u8; 64]);

        // B: events
        let mut writer = MipiPacketWriter::new(MipiFormat::Format1);
        writer.row(2, 10);
        writer.event(1, Some(800)).event(2, Some(800));
        let report = processor.process_mipi_data(&batch(&mut writer, MipiFormat::Format1, 2_000));
        assert!(report.mode.is_event_mode());
        assert_eq!(report.frames, vec![2]);
        assert!(processor.event_picture(EventPicType::Binary).is_some());

        // C: optical flow
        let mut writer = MipiPacketWriter::new(MipiFormat::Format1);
        writer.full_frame(geometry(), 20, |row, col| 100 + row * 8 + col);
        let report = processor.process_mipi_data(&batch(&mut writer, MipiFormat::Format1, 3_000));
        assert!(report.mode.is_optical_flow_mode());
        assert_eq!(report.frames, vec![3]);
        for pic in FlowPicType::ALL {
            assert!(processor.optical_flow_picture(pic).is_some());
        }

        assert_eq!(processor.loop_slot(), LoopSlot::A);
    }

    #[test]
    fn test_loop_publishes_empty_calls() {
        let mut config = adc_config();
        config.mode.loop_enabled = true;
        let mut processor = DataProcessor::new(config).unwrap();

        let empty = contracts::MipiBatch::new(contracts::RawPacket::new(Vec::new(), 1), 0);
        let frames: Vec<_> = (0..3)
            .flat_map(|_| processor.process_mipi_data(&empty).frames)
            .collect();
        assert_eq!(frames, vec![1, 2, 3]);
    }
}

#[cfg(test)]
mod metrics_tests {
    use contracts::{MipiFormat, SensorMode};
    use ingestion::MipiPacketWriter;
    use observability::{CallSample, FrameMetricsAggregator};
    use processor::{DataProcessor, ProcessReport};

    use crate::fixtures::*;

    fn call_sample(report: &ProcessReport) -> CallSample {
        CallSample {
            mode: report.mode,
            samples: report.samples,
            events: report.events,
            frames: report.frames.len(),
            discontinuities: report.discontinuities,
            imu_samples: report.imu_samples,
            process_us: 10.0,
            event_rate: report.event_rate,
            decode_failed: report.decode_error.is_some(),
        }
    }

    #[test]
    fn test_loop_run_aggregates_per_mode() {
        let mut config = adc_config();
        config.mode.loop_enabled = true;
        let mut processor = DataProcessor::new(config).unwrap();
        let mut aggregator = FrameMetricsAggregator::new();

        let mut modes = Vec::new();
        for round in 0..2i64 {
            let base = round * 3_000;
            let report = processor.process_mipi_data(&uniform_frame(1600, base + 1_000));
            modes.push(report.mode);
            aggregator.update(&call_sample(&report));

            let mut writer = MipiPacketWriter::new(MipiFormat::Format1);
            writer.row(1, 5);
            writer.event(3, Some(900));
            let report =
                processor.process_mipi_data(&batch(&mut writer, MipiFormat::Format1, base + 2_000));
            modes.push(report.mode);
            aggregator.update(&call_sample(&report));

            let mut writer = MipiPacketWriter::new(MipiFormat::Format1);
            writer.full_frame(geometry(), 7, |row, col| 200 + row + col);
            let report =
                processor.process_mipi_data(&batch(&mut writer, MipiFormat::Format1, base + 3_000));
            modes.push(report.mode);
            aggregator.update(&call_sample(&report));
        }

        let summary = aggregator.summary();
        assert_eq!(summary.total_calls, 6);
        assert_eq!(summary.total_frames, 6);
        assert_eq!(summary.failed_calls, 0);
        assert_eq!(summary.frames_by_mode.get(SensorMode::FullPicture.as_str()), Some(&2));
        for mode in &modes[1..3] {
            assert_eq!(summary.frames_by_mode.get(mode.as_str()), Some(&2));
        }
        assert_eq!(summary.latency_us.count, 6);
        assert!(summary.to_string().contains("Processing Summary"));
    }
}

#[cfg(test)]
mod imu_tests {
    use contracts::{MipiFormat, FORMAT2_T_MAX};
    use ingestion::MipiPacketWriter;
    use processor::DataProcessor;

    use crate::fixtures::*;

    #[test]
    fn test_imu_interpolated_between_batch_ends() {
        let mut processor = DataProcessor::new(small_config()).unwrap();

        // 10 units at 100 MHz = 200 us of sensor time
        let mut writer = MipiPacketWriter::new(MipiFormat::Format2);
        writer.row(0, 0);
        for t in 1..=10 {
            writer.timestamp(t % FORMAT2_T_MAX);
        }
        let first = batch(&mut writer, MipiFormat::Format2, 1_000)
            .with_imu(vec![imu_raw(131), imu_raw(262)]);
        let report = processor.process_mipi_data(&first);
        assert_eq!(report.imu_samples, 2);

        let second = contracts::MipiBatch::new(contracts::RawPacket::new(Vec::new(), 2), 2_000)
            .with_imu((0..4).map(|_| imu_raw(0)).collect());
        processor.process_mipi_data(&second);

        let imu = processor.imu_data();
        let stamps: Vec<_> = imu.iter().map(|d| d.timestamp_us).collect();
        assert_eq!(stamps, vec![900, 1_000, 1_250, 1_500, 1_750, 2_000]);
        assert!((imu[1].gyroscope.x - 2.0).abs() < 1e-9);
        assert_eq!(imu[1].t_units, 10);

        // drained
        assert!(processor.imu_data().is_empty());
    }

    #[test]
    fn test_imu_module_off_queues_nothing() {
        let mut config = small_config();
        config.modules.imu = false;
        let mut processor = DataProcessor::new(config).unwrap();

        let batch = contracts::MipiBatch::new(contracts::RawPacket::new(Vec::new(), 2), 500)
            .with_imu(vec![imu_raw(1)]);
        assert_eq!(processor.process_mipi_data(&batch).imu_samples, 0);
        assert!(processor.imu_data().is_empty());
    }
}

#[cfg(test)]
mod fpn_tests {
    use contracts::{MipiFormat, SensorMode};
    use imaging::FpnTable;
    use ingestion::MipiPacketWriter;
    use processor::{DataProcessor, FpnOutcome};

    use crate::fixtures::*;

    fn frames_with_offsets() -> Vec<contracts::MipiBatch> {
        (0..3)
            .map(|i| {
                let mut writer = MipiPacketWriter::new(MipiFormat::Format1);
                // column 0 reads 40 high, column 1 reads 40 low
                writer.full_frame(geometry(), i, |_, col| match col {
                    0 => 2040,
                    1 => 1960,
                    _ => 2000,
                });
                batch(&mut writer, MipiFormat::Format1, (i as i64 + 1) * 1_000)
            })
            .collect()
    }

    fn calibrate(path: &std::path::Path) -> FpnTable {
        let mut config = adc_config();
        config.mode.fixed = SensorMode::FullPicture;
        let mut processor = DataProcessor::new(config).unwrap();
        processor.generate_fpn_over(path, 3).unwrap();

        let mut outcome = None;
        for batch in frames_with_offsets() {
            let report = processor.process_mipi_data(&batch);
            assert!(report.frames.is_empty(), "calibration must not publish");
            outcome = report.fpn;
        }
        assert_eq!(
            outcome,
            Some(FpnOutcome::Completed {
                path: path.to_path_buf()
            })
        );
        assert!(!processor.is_calibrating());
        processor.fpn_table().clone()
    }

    #[test]
    fn test_fpn_generation_is_idempotent() {
        let dir = tempfile::tempdir().unwrap();
        let a = calibrate(&dir.path().join("a.txt"));
        let b = calibrate(&dir.path().join("b.txt"));

        assert_eq!(a.offsets(), b.offsets());
        assert_eq!(
            std::fs::read_to_string(dir.path().join("a.txt")).unwrap(),
            std::fs::read_to_string(dir.path().join("b.txt")).unwrap()
        );
    }

    #[test]
    fn test_fpn_file_round_trip_corrects_frames() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("fpn.txt");
        let table = calibrate(&path);

        let loaded = FpnTable::load(&path, geometry()).unwrap();
        assert_eq!(loaded.offsets(), table.offsets());

        let mut config = adc_config();
        config.mode.fixed = SensorMode::FullPicture;
        config.fpn.path = Some(path);
        let mut processor = DataProcessor::new(config).unwrap();
        processor.process_mipi_data(&frames_with_offsets()[0]);

        // the column offsets cancel out
        let picture = processor.full_picture().unwrap();
        let first = picture[0];
        assert!(picture.iter().all(|&p| p == first), "{picture:?}");
    }
}

#[cfg(test)]
mod concurrency_tests {
    use std::sync::atomic::{AtomicBool, Ordering};
    use std::sync::Arc;
    use std::thread;

    use contracts::{EventShowType, MipiFormat, OutputKind, SensorMode};
    use ingestion::MipiPacketWriter;
    use processor::DataProcessor;
    use publisher::{FramePublication, OutputStore};

    use crate::fixtures::*;

    /// Readers never see a picture mixing two frames
    #[test]
    fn test_snapshot_atomicity_under_concurrent_publish() {
        let store = OutputStore::shared();
        let done = Arc::new(AtomicBool::new(false));

        let readers: Vec<_> = (0..4)
            .map(|_| {
                let store = Arc::clone(&store);
                let done = Arc::clone(&done);
                thread::spawn(move || {
                    let mut checked = 0u64;
                    while !done.load(Ordering::Acquire) {
                        if let Some(image) = store.picture_arc(OutputKind::FullPicture) {
                            let expected = image.frame_no as u8;
                            assert!(image.pixels.iter().all(|&p| p == expected));
                            checked += 1;
                        }
                    }
                    checked
                })
            })
            .collect();

        for frame_no in 1..=2_000u64 {
            store.publish(FramePublication {
                frame_no,
                timestamp_us: frame_no as i64,
                mode: SensorMode::FullPicture,
                full_picture: Some(contracts::ImageFrame {
                    width: 64,
                    height: 64,
                    frame_no,
                    timestamp_us: frame_no as i64,
                    pixels: vec![frame_no as u8; 64 * 64],
                }),
                ..Default::default()
            });
        }
        done.store(true, Ordering::Release);

        for reader in readers {
            reader.join().unwrap();
        }
        assert_eq!(store.frame_no(), 2_000);
    }

    #[test]
    fn test_processor_publishes_while_readers_poll() {
        let mut config = adc_config();
        config.mode.fixed = SensorMode::FullPicture;
        let mut processor = DataProcessor::new(config).unwrap();
        let output = processor.output();
        let done = Arc::new(AtomicBool::new(false));

        let reader = {
            let output = Arc::clone(&output);
            let done = Arc::clone(&done);
            thread::spawn(move || {
                let mut last = 0;
                while !done.load(Ordering::Acquire) {
                    if let Some(image) = output.picture_arc(OutputKind::FullPicture) {
                        assert!(image.frame_no >= last);
                        last = image.frame_no;
                        let first = image.pixels[0];
                        assert!(image.pixels.iter().all(|&p| p == first));
                    }
                }
            })
        };

        for i in 0..50u16 {
            processor.process_mipi_data(&uniform_frame((i % 16) * 256, i as i64));
        }
        done.store(true, Ordering::Release);
        reader.join().unwrap();

        assert_eq!(output.frame_no(), 50);
    }

    /// Every reader with its own cursor receives each event vector
    #[test]
    fn test_event_vector_reaches_every_reader() {
        let mut config = small_config();
        config.event.show = EventShowType::ByCount { events: 2 };
        let mut processor = DataProcessor::new(config).unwrap();
        let output = processor.output();

        let mut writer = MipiPacketWriter::new(MipiFormat::Format2);
        writer.row(1, 0).event(2, None).event(3, None);
        processor.process_mipi_data(&batch(&mut writer, MipiFormat::Format2, 1_000));

        let readers: Vec<_> = (0..3)
            .map(|_| {
                let output = Arc::clone(&output);
                thread::spawn(move || {
                    let mut seen = 0;
                    let first = output.events_since(&mut seen).map(|b| b.frame_no);
                    let again = output.events_since(&mut seen).is_some();
                    (first, again)
                })
            })
            .collect();
        for reader in readers {
            assert_eq!(reader.join().unwrap(), (Some(1), false));
        }
        assert_eq!(processor.event_data_vector().unwrap().len(), 2);
    }

    #[tokio::test]
    async fn test_watch_notifies_async_consumer() {
        let mut config = adc_config();
        config.mode.fixed = SensorMode::FullPicture;
        let mut processor = DataProcessor::new(config).unwrap();
        let mut notices = processor.output().subscribe();

        processor.process_mipi_data(&uniform_frame(320, 7_000));
        notices.changed().await.unwrap();
        let notice = *notices.borrow_and_update();
        assert_eq!(notice.frame_no, 1);
        assert_eq!(notice.timestamp_us, 7_000);
        assert_eq!(notice.pictures, 1);
    }
}
