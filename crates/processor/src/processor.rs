//! DataProcessor - the decode, reconstruct and publish entry point.
//!
//! One producer drives [`DataProcessor::process_mipi_data`] with `&mut self`;
//! any number of readers hold the `Arc<OutputStore>` returned by
//! [`DataProcessor::output`]. Configuration setters also take `&mut self`,
//! so they never interleave with a decode call.

use std::path::Path;
use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::Arc;
use std::time::Instant;

use contracts::{
    ContractError, ControlRequest, DecodedSample, EventBatch, EventData, EventPicType,
    EventShowType, FlowPicType, ImageFrame, ImuData, LoopSlot, MipiBatch, NullControl,
    OutputKind, ProcessorConfig, Result, Rotation, SensorControl, SensorGeometry, SensorMode,
};
use imaging::{
    denoise_score, BufferAccumulator, FpnTable, FrameStamp, ImageSynthesizer,
    OpticalFlowEstimator, DENOISE_MIN_NEIGHBORS,
};
use ingestion::{DecodeMetrics, PacketDecoder};
use publisher::{FramePublication, OutputStore};
use sync_engine::{BatchTiming, BoundaryReason, TimeUpdate};
use tracing::{debug, info, instrument, trace, warn};

use crate::calibration::FpnSession;
use crate::report::{FpnOutcome, ProcessReport};
use crate::state::PipelineState;

pub struct DataProcessor {
    config: ProcessorConfig,
    geometry: SensorGeometry,
    state: PipelineState,
    accumulator: BufferAccumulator,
    synth: ImageSynthesizer,
    flow: OpticalFlowEstimator,
    fpn: FpnTable,
    calibration: Option<FpnSession>,
    output: Arc<OutputStore>,
    /// Event vector version last returned by the event accessors
    events_seen: AtomicU64,
    control: Box<dyn SensorControl>,
    decode_metrics: Arc<DecodeMetrics>,
}

impl std::fmt::Debug for DataProcessor {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("DataProcessor")
            .field("geometry", &self.geometry)
            .field("mode", &self.active_mode())
            .field("frame_no", &self.state.sync.frame_no())
            .field("calibrating", &self.calibration.is_some())
            .finish()
    }
}

impl DataProcessor {
    /// Build a processor; sensor requests are discarded
    pub fn new(config: ProcessorConfig) -> Result<Self> {
        Self::with_control(config, Box::new(NullControl))
    }

    /// Build a processor forwarding mode and ISO requests to `control`.
    ///
    /// Every pixel buffer is allocated here, sized from the configured
    /// geometry. A configured FPN file must load.
    pub fn with_control(config: ProcessorConfig, control: Box<dyn SensorControl>) -> Result<Self> {
        config.validate_all()?;
        let geometry = config.sensor.geometry();

        let fpn = match &config.fpn.path {
            Some(path) => FpnTable::load(path, geometry)?,
            None => FpnTable::zero(geometry),
        };

        info!(
            rows = geometry.rows,
            cols = geometry.cols,
            mode = %config.mode.fixed,
            loop_enabled = config.mode.loop_enabled,
            "data processor created"
        );

        Ok(Self {
            synth: synthesizer(&config),
            state: PipelineState::new(&config.event),
            accumulator: BufferAccumulator::new(geometry),
            flow: OpticalFlowEstimator::new(geometry),
            fpn,
            calibration: None,
            output: OutputStore::shared(),
            events_seen: AtomicU64::new(0),
            control,
            decode_metrics: Arc::new(DecodeMetrics::new()),
            geometry,
            config,
        })
    }

    // ========================================================================
    // Decode path
    // ========================================================================

    /// Decode one batch, publish every frame completed by it, align its IMU
    /// samples.
    ///
    /// Never fails: decode errors are counted and reported, the rest of the
    /// batch (and the IMU data) is still processed. A batch tagged with a
    /// format other than the configured one is dropped whole.
    #[instrument(
        name = "process_mipi_data",
        skip(self, batch),
        fields(bytes = batch.packet.len(), format_tag = batch.packet.format_tag)
    )]
    pub fn process_mipi_data(&mut self, batch: &MipiBatch) -> ProcessReport {
        let mode = self.active_mode();
        let mut report = ProcessReport::new(mode);

        self.decode_metrics.record_batch();
        self.state.sync.begin_package();

        let decoder = match self.config.sensor.format() {
            Some(expected) => PacketDecoder::expecting(&batch.packet, expected, self.state.cursor),
            None => PacketDecoder::new(&batch.packet, self.state.cursor),
        };
        match decoder {
            Ok(mut decoder) => {
                let modulus = decoder.format().t_modulus();
                for item in decoder.by_ref() {
                    match item {
                        Ok(sample) => {
                            self.handle_sample(&sample, mode, modulus, batch.end_timestamp_us, &mut report)
                        }
                        Err(e) => {
                            warn!(error = %e, "trailing bytes discarded");
                            self.decode_metrics.record_error(&e);
                            report.decode_error = Some(e);
                        }
                    }
                }
                self.state.cursor = decoder.cursor();
                self.decode_metrics.record_stats(&decoder.stats());
                self.end_of_call(mode, batch.end_timestamp_us, &mut report);
            }
            Err(e) => {
                warn!(error = %e, "batch dropped");
                self.decode_metrics.record_error(&e);
                report.decode_error = Some(e);
            }
        }

        self.align_imu(batch, &mut report);

        trace!(
            samples = report.samples,
            events = report.events,
            frames = report.frames.len(),
            "batch processed"
        );
        report
    }

    fn handle_sample(
        &mut self,
        sample: &DecodedSample,
        mode: SensorMode,
        modulus: i32,
        timestamp_us: i64,
        report: &mut ProcessReport,
    ) {
        report.samples += 1;
        self.decode_metrics.record_sample(sample.is_event);

        let step = self.state.sync.observe(sample, modulus);
        if let TimeUpdate::Discontinuity(_) = step.update {
            report.discontinuities += 1;
        }
        if let Some(rate) = step.event_rate {
            self.output.set_event_rate(rate);
            report.event_rate = Some(rate);
        }

        if sample.is_event {
            if let Some(session) = &mut self.calibration {
                if let (Some(index), Some(raw)) =
                    (self.geometry.index(sample.row, sample.col), sample.adc)
                {
                    session.record(index, raw);
                }
                return;
            }
            self.record(sample, mode, report);
        }

        // loop mode publishes per call; calibration never publishes
        if !self.config.mode.loop_enabled && mode.is_event_mode() && self.calibration.is_none() {
            if let Some(reason) = self.state.sync.check_boundary() {
                self.close_frame(reason, mode, timestamp_us, report);
            }
        }
    }

    #[inline]
    fn record(&mut self, sample: &DecodedSample, mode: SensorMode, report: &mut ProcessReport) {
        if mode.is_event_mode() {
            if !self.state.sync.accepts_event() {
                return;
            }
            let t_off = self.state.sync.time().per_frame_elapsed;
            if self.accumulator.record_event(sample, &self.fpn, t_off) {
                self.state.sync.count_event();
                report.events += 1;
            }
        } else if mode.is_optical_flow_mode() {
            if self.accumulator.record_flow(sample) {
                report.events += 1;
            }
        } else if self.accumulator.record_full_frame(sample, &self.fpn) {
            report.events += 1;
        }
    }

    fn end_of_call(&mut self, mode: SensorMode, timestamp_us: i64, report: &mut ProcessReport) {
        if self.calibration.is_some() {
            self.advance_calibration(report);
            return;
        }

        if self.config.mode.loop_enabled {
            self.close_frame(BoundaryReason::BatchComplete, mode, timestamp_us, report);
            let slot = self.state.advance_loop();
            trace!(next_slot = slot.index(), "loop slot advanced");
        } else if !mode.is_event_mode() && self.accumulator.frame_samples() > 0 {
            self.close_frame(BoundaryReason::BatchComplete, mode, timestamp_us, report);
        }
    }

    /// Freeze, synthesize and publish the current frame
    fn close_frame(
        &mut self,
        reason: BoundaryReason,
        mode: SensorMode,
        timestamp_us: i64,
        report: &mut ProcessReport,
    ) {
        let started = Instant::now();
        let frame_no = self.state.sync.complete_frame(reason);
        let frame_module = self.config.modules.frame;
        let stamp = FrameStamp {
            frame_no,
            timestamp_us,
        };

        let frame = self.accumulator.freeze();
        let mut publication = FramePublication {
            frame_no,
            timestamp_us,
            mode,
            ..Default::default()
        };

        if mode.is_event_mode() {
            let events = frame.events.clone();
            let denoised = events
                .iter()
                .filter(|e| denoise_score(&frame.event_count, frame.geometry, e.row, e.col) >= DENOISE_MIN_NEIGHBORS)
                .copied()
                .collect();
            metrics::counter!("celex_events_total").increment(events.len() as u64);
            publication.events = Some(EventBatch {
                frame_no,
                timestamp_us,
                events,
                denoised,
            });
            if frame_module {
                publication.event_pictures = self.synth.render_events(frame, stamp);
            }
        } else if mode.is_optical_flow_mode() {
            if frame_module {
                let field = self.flow.estimate(&frame.flow_time);
                publication.flow_pictures = FlowPicType::ALL
                    .iter()
                    .map(|&pic| {
                        let kind = OutputKind::OpticalFlowPicture(pic);
                        (pic, self.synth.render(kind, frame, Some(&field), stamp))
                    })
                    .collect();
            }
        } else if frame_module {
            publication.full_picture =
                Some(self.synth.render(OutputKind::FullPicture, frame, None, stamp));
        }

        let notice = self.output.publish(publication);
        metrics::histogram!("celex_publish_latency_us")
            .record(started.elapsed().as_secs_f64() * 1_000_000.0);
        debug!(
            frame_no,
            ?reason,
            mode = %mode,
            events = notice.events,
            pictures = notice.pictures,
            "frame published"
        );

        report.frames.push(frame_no);
        report.boundaries.push(reason);
    }

    fn align_imu(&mut self, batch: &MipiBatch, report: &mut ProcessReport) {
        if !self.config.modules.imu {
            return;
        }
        // taken after decoding so the first call starts at the anchored base
        let time = self.state.sync.time();
        let package_units = time.per_package_elapsed;
        let timing = BatchTiming {
            end_us: batch.end_timestamp_us,
            span_us: (package_units as f64 * self.config.event.us_per_unit()) as i64,
            t_start: time.total_elapsed.saturating_sub(package_units as u64),
            package_units,
        };
        let samples = self.state.imu.align(&batch.imu, timing);
        report.imu_samples = samples.len();
        self.output.push_imu(samples);
    }

    // ========================================================================
    // FPN
    // ========================================================================

    /// Load an FPN table; the current table stays on error
    #[instrument(name = "set_fpn_file", skip(self), fields(path = %path.as_ref().display()))]
    pub fn set_fpn_file(&mut self, path: impl AsRef<Path>) -> Result<()> {
        let path = path.as_ref();
        let table = FpnTable::load(path, self.geometry)?;
        self.fpn = table;
        self.config.fpn.path = Some(path.to_path_buf());
        Ok(())
    }

    /// Start FPN generation over the next full frames.
    ///
    /// Only allowed in fixed full-picture mode; a later mode change aborts
    /// the session. The target directory is checked now; the table is written once
    /// enough frames have been accumulated and the outcome shows up in that
    /// call's [`ProcessReport::fpn`].
    pub fn generate_fpn(&mut self, path: impl AsRef<Path>) -> Result<()> {
        self.generate_fpn_over(path, contracts::FPN_CALCULATION_FRAMES)
    }

    /// [`generate_fpn`](Self::generate_fpn) with an explicit frame count
    #[instrument(name = "generate_fpn", skip(self, path), fields(path = %path.as_ref().display()))]
    pub fn generate_fpn_over(&mut self, path: impl AsRef<Path>, frames: u32) -> Result<()> {
        if self.calibration.is_some() {
            return Err(ContractError::fpn_generation("calibration already in progress"));
        }
        if !self.config.mode.is_fixed_full_picture() {
            return Err(ContractError::fpn_generation(format!(
                "calibration needs fixed {} mode, active mode is {}",
                SensorMode::FullPicture,
                self.active_mode()
            )));
        }
        let session = FpnSession::start(self.geometry, path.as_ref(), frames)?;

        // entering calibration drops the frame in progress
        self.accumulator.clear_frame();
        self.state.sync.discard_frame();
        info!(frames = session.frames_target(), "fpn calibration started");
        self.calibration = Some(session);
        Ok(())
    }

    fn advance_calibration(&mut self, report: &mut ProcessReport) {
        let Some(session) = self.calibration.as_mut() else {
            return;
        };
        let Some(result) = session.end_frame() else {
            if session.frames_seen() > 0 {
                report.fpn = Some(FpnOutcome::Progress {
                    frames_seen: session.frames_seen(),
                    frames_target: session.frames_target(),
                });
            }
            return;
        };
        let path = session.path().to_path_buf();
        self.calibration = None;

        let outcome = result.and_then(|table| {
            table.save(&path)?;
            self.fpn = table;
            self.config.fpn.path = Some(path.clone());
            Ok(())
        });
        report.fpn = Some(match outcome {
            Ok(()) => {
                info!(path = %path.display(), "fpn calibration completed");
                FpnOutcome::Completed { path }
            }
            Err(e) => {
                warn!(error = %e, "fpn calibration failed");
                FpnOutcome::Failed {
                    message: e.to_string(),
                }
            }
        });
    }

    pub fn is_calibrating(&self) -> bool {
        self.calibration.is_some()
    }

    pub fn fpn_table(&self) -> &FpnTable {
        &self.fpn
    }

    // ========================================================================
    // Configuration setters
    // ========================================================================

    /// Clone, modify, validate, swap. The old configuration stays on error.
    fn update_config(&mut self, change: impl FnOnce(&mut ProcessorConfig)) -> Result<()> {
        let mut next = self.config.clone();
        change(&mut next);
        next.validate_all()?;

        let mode_changed = next.mode != self.config.mode;
        self.config = next;
        self.synth = synthesizer(&self.config);
        self.state.sync.set_event_config(&self.config.event);
        if mode_changed {
            self.accumulator.clear_frame();
            self.state.sync.discard_frame();
            self.flow.reset();
            if self.calibration.is_some() && !self.config.mode.is_fixed_full_picture() {
                self.calibration = None;
                warn!(mode = %self.config.mode.fixed, "fpn calibration aborted by mode change");
            }
        }
        Ok(())
    }

    pub fn set_sensor_fixed_mode(&mut self, mode: SensorMode) -> Result<()> {
        self.update_config(|c| c.mode.fixed = mode)?;
        self.control.forward(ControlRequest::FixedMode(mode));
        Ok(())
    }

    pub fn set_sensor_loop_mode(&mut self, slot: LoopSlot, mode: SensorMode) -> Result<()> {
        self.update_config(|c| c.mode.set_loop_mode(slot, mode))?;
        self.control.forward(ControlRequest::LoopMode { slot, mode });
        Ok(())
    }

    /// Loop slot from its 1-based number
    pub fn set_sensor_loop_mode_at(&mut self, loop_num: u8, mode: SensorMode) -> Result<()> {
        let slot = LoopSlot::from_index(loop_num).ok_or_else(|| {
            ContractError::invalid_mode(format!("loop number must be 1..=3, got {}", loop_num))
        })?;
        self.set_sensor_loop_mode(slot, mode)
    }

    pub fn set_loop_mode_enabled(&mut self, enabled: bool) -> Result<()> {
        self.update_config(|c| c.mode.loop_enabled = enabled)?;
        self.state.loop_slot = LoopSlot::A;
        self.control.forward(ControlRequest::LoopEnabled(enabled));
        Ok(())
    }

    pub fn set_iso_level(&mut self, level: u8) -> Result<()> {
        self.update_config(|c| c.mode.iso_level = level)?;
        self.control.forward(ControlRequest::IsoLevel(level));
        Ok(())
    }

    /// Set the ByTime frame length and the sensor clock.
    ///
    /// The clock always changes; the frame length only matters while the
    /// show method is ByTime.
    pub fn set_event_frame_time(&mut self, frame_time_ms: u32, clock_mhz: u32) -> Result<()> {
        self.update_config(|c| {
            c.event.clock_mhz = clock_mhz;
            if let EventShowType::ByTime { .. } = c.event.show {
                c.event.show = EventShowType::ByTime { frame_time_ms };
            }
        })?;
        self.control.forward(ControlRequest::EventFrameTime {
            frame_time_ms,
            clock_mhz,
        });
        Ok(())
    }

    /// Takes effect from the next frame
    pub fn set_event_show_method(&mut self, show: EventShowType) -> Result<()> {
        self.update_config(|c| c.event.show = show)?;
        self.control.forward(ControlRequest::EventShow(show));
        Ok(())
    }

    pub fn set_event_frame_start_pos(&mut self, start_pos: u32) -> Result<()> {
        self.update_config(|c| c.event.start_pos = start_pos)
    }

    pub fn set_rotation(&mut self, rotation: Rotation) -> Result<()> {
        self.update_config(|c| c.event.rotation = rotation)
    }

    pub fn set_event_count_step(&mut self, step: u32) -> Result<()> {
        self.update_config(|c| c.event.count_step = step)
    }

    /// Batches tagged with any other format are dropped from the next call
    pub fn set_mipi_format(&mut self, tag: u8) -> Result<()> {
        self.update_config(|c| c.sensor.mipi_format = tag)?;
        self.control.forward(ControlRequest::MipiFormat(tag));
        Ok(())
    }

    pub fn enable_frame_module(&mut self, enabled: bool) -> Result<()> {
        self.update_config(|c| c.modules.frame = enabled)
    }

    pub fn enable_imu_module(&mut self, enabled: bool) -> Result<()> {
        self.update_config(|c| c.modules.imu = enabled)
    }

    /// Close the current frame at the next sample (ByStep)
    pub fn request_frame_step(&mut self) {
        self.state.sync.request_step();
    }

    /// Restart the time base; frame numbers keep increasing
    pub fn reset_timestamp(&mut self) {
        self.state.reset_time();
        self.accumulator.clear_frame();
        info!("timestamp reset");
    }

    // ========================================================================
    // Getters
    // ========================================================================

    pub fn config(&self) -> &ProcessorConfig {
        &self.config
    }

    pub fn geometry(&self) -> SensorGeometry {
        self.geometry
    }

    /// Mode the next call will decode under
    pub fn active_mode(&self) -> SensorMode {
        self.state.active_mode(&self.config.mode)
    }

    pub fn sensor_fixed_mode(&self) -> SensorMode {
        self.config.mode.fixed
    }

    pub fn sensor_loop_mode(&self, slot: LoopSlot) -> SensorMode {
        self.config.mode.loop_mode(slot)
    }

    pub fn loop_slot(&self) -> LoopSlot {
        self.state.loop_slot
    }

    pub fn event_show_method(&self) -> EventShowType {
        self.config.event.show
    }

    pub fn rotation(&self) -> Rotation {
        self.config.event.rotation
    }

    pub fn event_count_step(&self) -> u32 {
        self.config.event.count_step
    }

    pub fn is_frame_module_enabled(&self) -> bool {
        self.config.modules.frame
    }

    pub fn is_imu_module_enabled(&self) -> bool {
        self.config.modules.imu
    }

    pub fn state(&self) -> &PipelineState {
        &self.state
    }

    pub fn decode_metrics(&self) -> &Arc<DecodeMetrics> {
        &self.decode_metrics
    }

    // ========================================================================
    // Output accessors
    // ========================================================================

    /// Shared output store for readers on other threads
    pub fn output(&self) -> Arc<OutputStore> {
        Arc::clone(&self.output)
    }

    pub fn image(&self, kind: OutputKind) -> Option<ImageFrame> {
        self.output.picture(kind)
    }

    fn pixels(&self, kind: OutputKind) -> Option<(Vec<u8>, i64)> {
        self.output
            .picture_arc(kind)
            .map(|image| (image.pixels.clone(), image.timestamp_us))
    }

    pub fn full_picture(&self) -> Option<Vec<u8>> {
        self.pixels(OutputKind::FullPicture).map(|(p, _)| p)
    }

    pub fn full_picture_with_timestamp(&self) -> Option<(Vec<u8>, i64)> {
        self.pixels(OutputKind::FullPicture)
    }

    pub fn event_picture(&self, pic: EventPicType) -> Option<Vec<u8>> {
        self.pixels(OutputKind::EventPicture(pic)).map(|(p, _)| p)
    }

    pub fn event_picture_with_timestamp(&self, pic: EventPicType) -> Option<(Vec<u8>, i64)> {
        self.pixels(OutputKind::EventPicture(pic))
    }

    pub fn optical_flow_picture(&self, pic: FlowPicType) -> Option<Vec<u8>> {
        self.pixels(OutputKind::OpticalFlowPicture(pic)).map(|(p, _)| p)
    }

    pub fn optical_flow_picture_with_timestamp(&self, pic: FlowPicType) -> Option<(Vec<u8>, i64)> {
        self.pixels(OutputKind::OpticalFlowPicture(pic))
    }

    /// Latest event vector not yet returned through these accessors.
    /// Readers of [`output`](Self::output) keep their own cursor.
    fn fresh_events(&self) -> Option<Arc<EventBatch>> {
        let mut seen = self.events_seen.load(Ordering::Acquire);
        let batch = self.output.events_since(&mut seen)?;
        self.events_seen.store(seen, Ordering::Release);
        Some(batch)
    }

    /// Events of the latest frame; `None` when nothing new was published
    /// since the previous event read
    pub fn event_data_vector(&self) -> Option<Vec<EventData>> {
        self.fresh_events().map(|b| b.events.clone())
    }

    pub fn event_data_vector_with_frame_no(&self) -> Option<(Vec<EventData>, u64)> {
        self.fresh_events().map(|b| (b.events.clone(), b.frame_no))
    }

    pub fn event_data_vector_ex(&self, denoised: bool) -> Option<(Vec<EventData>, i64)> {
        self.fresh_events().map(|b| {
            let events = if denoised { &b.denoised } else { &b.events };
            (events.clone(), b.timestamp_us)
        })
    }

    /// Drain the aligned IMU queue
    pub fn imu_data(&self) -> Vec<ImuData> {
        self.output.drain_imu()
    }

    pub fn event_rate(&self) -> u32 {
        self.output.event_rate()
    }

    pub fn frame_no(&self) -> u64 {
        self.output.frame_no()
    }
}

fn synthesizer(config: &ProcessorConfig) -> ImageSynthesizer {
    let step = u8::try_from(config.event.count_step).unwrap_or(u8::MAX);
    ImageSynthesizer::new(config.event.rotation, step)
}
