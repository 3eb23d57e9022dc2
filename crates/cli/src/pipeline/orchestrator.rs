//! Pipeline orchestrator - replays a capture through the processor.
//!
//! The processor runs on the driving task; a consumer task awaits frame
//! notices and hands published outputs to the export worker.

use std::path::PathBuf;
use std::time::{Duration, Instant};

use anyhow::{Context, Result};
use contracts::{PacketSource, ProcessorConfig};
use observability::{record_call_metrics, CallSample};
use processor::{DataProcessor, ProcessReport};
use publisher::{EventFileFormat, ExportConfig, ExportHandle};
use tokio::sync::oneshot;
use tracing::{info, warn};

use super::consumer::FrameConsumer;
use super::PipelineStats;
use crate::capture::CaptureSource;

/// Pipeline configuration
#[derive(Debug, Clone)]
pub struct PipelineConfig {
    /// Processor configuration, overrides applied
    pub processor: ProcessorConfig,
    /// Capture file to replay
    pub input: PathBuf,
    /// Export directory (None = no export)
    pub output: Option<PathBuf>,
    pub event_format: EventFileFormat,
    /// Export queue capacity
    pub queue_capacity: usize,
    /// Maximum number of batches (None = unlimited)
    pub max_batches: Option<u64>,
    /// Pipeline timeout (None = no timeout)
    pub timeout: Option<Duration>,
    /// Metrics server port (None = disabled)
    pub metrics_port: Option<u16>,
}

/// Main pipeline orchestrator
pub struct Pipeline {
    config: PipelineConfig,
}

impl Pipeline {
    pub fn new(config: PipelineConfig) -> Self {
        Self { config }
    }

    /// Run the pipeline to completion
    pub async fn run(self) -> Result<PipelineStats> {
        let start_time = Instant::now();

        if let Some(port) = self.config.metrics_port {
            observability::serve_metrics(port)?;
        }

        let mut processor = DataProcessor::new(self.config.processor.clone())
            .context("Failed to create data processor")?;
        let mut source = CaptureSource::open(&self.config.input)
            .await
            .with_context(|| format!("Failed to open capture {}", self.config.input.display()))?;
        info!(source = source.name(), mode = %processor.active_mode(), "replaying capture");

        let export = match &self.config.output {
            Some(dir) => {
                let handle = ExportHandle::spawn(ExportConfig {
                    dir: dir.clone(),
                    event_format: self.config.event_format,
                    queue_capacity: self.config.queue_capacity,
                })
                .context("Failed to start export worker")?;
                info!(dir = %dir.display(), "export enabled");
                Some(handle)
            }
            None => None,
        };
        let export_metrics = export.as_ref().map(|h| h.metrics().clone());

        let (stop_tx, stop_rx) = oneshot::channel();
        let consumer = FrameConsumer::new(processor.output(), export);
        let consumer_handle = tokio::spawn(consumer.run(stop_rx));

        let max_batches = self.config.max_batches;
        let replay = async {
            let mut stats = PipelineStats::default();
            loop {
                let batch = match source.next_batch().await {
                    Ok(Some(batch)) => batch,
                    Ok(None) => break,
                    Err(e) => {
                        warn!(error = %e, "capture read failed");
                        stats.source_error = Some(e.to_string());
                        break;
                    }
                };

                let started = Instant::now();
                let report = processor.process_mipi_data(&batch);
                let sample = call_sample(&report, started.elapsed());
                record_call_metrics(&sample);
                stats.calls.update(&sample);
                stats.batches += 1;

                if let Some(max) = max_batches {
                    if stats.batches >= max {
                        info!(batches = stats.batches, "Reached max batches limit");
                        break;
                    }
                }
                // 让出执行权，消费者可以及时处理通知
                tokio::task::yield_now().await;
            }
            stats
        };

        let mut stats = match self.config.timeout {
            Some(timeout) => match tokio::time::timeout(timeout, replay).await {
                Ok(stats) => stats,
                Err(_) => {
                    warn!(timeout_secs = timeout.as_secs(), "Pipeline timed out");
                    PipelineStats::default()
                }
            },
            None => replay.await,
        };

        info!("Shutting down pipeline...");
        let _ = stop_tx.send(());
        match consumer_handle.await {
            Ok(tally) => {
                stats.frames_observed = tally.frames_observed;
                stats.frames_skipped = tally.frames_skipped;
                stats.jobs_queued = tally.jobs_queued;
            }
            Err(e) => warn!(error = %e, "frame consumer failed"),
        }

        stats.decode = processor.decode_metrics().snapshot();
        stats.publish = processor.output().metrics().snapshot();
        stats.export = export_metrics.map(|m| m.snapshot());
        stats.duration = start_time.elapsed();

        info!(
            batches = stats.batches,
            frames = stats.publish.frames,
            duration_secs = stats.duration.as_secs_f64(),
            "Pipeline shutdown complete"
        );
        Ok(stats)
    }
}

fn call_sample(report: &ProcessReport, elapsed: Duration) -> CallSample {
    CallSample {
        mode: report.mode,
        samples: report.samples,
        events: report.events,
        frames: report.frames.len(),
        discontinuities: report.discontinuities,
        imu_samples: report.imu_samples,
        process_us: elapsed.as_secs_f64() * 1_000_000.0,
        event_rate: report.event_rate,
        decode_failed: report.decode_error.is_some(),
    }
}
