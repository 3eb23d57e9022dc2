//! ExportHandle - writes published outputs to disk on a worker task.
//!
//! The processor side only does a non-blocking `try_send`; a slow disk drops
//! jobs instead of stalling the caller.

use std::collections::HashSet;
use std::fs::{self, File};
use std::io::{BufWriter, Write};
use std::path::PathBuf;
use std::sync::Arc;

use contracts::{EventBatch, ImageFrame, OutputKind};
use serde::{Deserialize, Serialize};
use tokio::sync::mpsc;
use tokio::task::JoinHandle;
use tracing::{debug, error, instrument, warn};

use crate::error::OutputError;
use crate::kind_label;
use crate::metrics::ExportMetrics;

/// On-disk encoding for event vectors
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum EventFileFormat {
    #[default]
    Json,
    Bincode,
}

impl EventFileFormat {
    fn extension(self) -> &'static str {
        match self {
            EventFileFormat::Json => "json",
            EventFileFormat::Bincode => "bin",
        }
    }
}

#[derive(Debug, Clone)]
pub struct ExportConfig {
    /// Base output directory
    pub dir: PathBuf,
    pub event_format: EventFileFormat,
    pub queue_capacity: usize,
}

/// One unit of export work
#[derive(Debug, Clone)]
pub enum ExportJob {
    Picture {
        kind: OutputKind,
        image: Arc<ImageFrame>,
    },
    Events(Arc<EventBatch>),
}

impl ExportJob {
    fn frame_no(&self) -> u64 {
        match self {
            ExportJob::Picture { image, .. } => image.frame_no,
            ExportJob::Events(batch) => batch.frame_no,
        }
    }
}

/// Synchronous writer used by the worker
#[derive(Debug)]
pub struct FrameWriter {
    base_path: PathBuf,
    event_format: EventFileFormat,
    created_dirs: HashSet<PathBuf>,
}

impl FrameWriter {
    pub fn new(base_path: PathBuf, event_format: EventFileFormat) -> std::io::Result<Self> {
        fs::create_dir_all(&base_path)?;
        Ok(Self {
            base_path,
            event_format,
            created_dirs: HashSet::new(),
        })
    }

    pub fn write(&mut self, job: &ExportJob) -> std::io::Result<PathBuf> {
        match job {
            ExportJob::Picture { kind, image } => {
                let dir = self.ensure_dir(kind_label(*kind))?;
                let path = dir.join(format!("{:06}.png", image.frame_no));
                save_gray_png(&path, image)?;
                Ok(path)
            }
            ExportJob::Events(batch) => {
                let dir = self.ensure_dir("events")?;
                let path = dir.join(format!(
                    "{:06}.{}",
                    batch.frame_no,
                    self.event_format.extension()
                ));
                let mut out = BufWriter::new(File::create(&path)?);
                match self.event_format {
                    EventFileFormat::Json => serde_json::to_writer(&mut out, batch.as_ref())
                        .map_err(|e| std::io::Error::new(std::io::ErrorKind::InvalidData, e))?,
                    EventFileFormat::Bincode => bincode::serialize_into(&mut out, batch.as_ref())
                        .map_err(|e| std::io::Error::new(std::io::ErrorKind::InvalidData, e))?,
                }
                out.flush()?;
                Ok(path)
            }
        }
    }

    fn ensure_dir(&mut self, name: &str) -> std::io::Result<PathBuf> {
        let dir = self.base_path.join(name);
        if !self.created_dirs.contains(&dir) {
            fs::create_dir_all(&dir)?;
            self.created_dirs.insert(dir.clone());
        }
        Ok(dir)
    }
}

/// Write an 8-bit gray image as PNG
pub fn save_gray_png(path: &std::path::Path, image: &ImageFrame) -> std::io::Result<()> {
    image::save_buffer(
        path,
        &image.pixels,
        image.width,
        image.height,
        image::ColorType::L8,
    )
    .map_err(std::io::Error::other)
}

/// Handle to a running export worker
pub struct ExportHandle {
    tx: mpsc::Sender<ExportJob>,
    metrics: Arc<ExportMetrics>,
    worker_handle: JoinHandle<()>,
}

impl ExportHandle {
    /// Prepare the directory and spawn the worker task
    pub fn spawn(config: ExportConfig) -> Result<Self, OutputError> {
        let writer = FrameWriter::new(config.dir.clone(), config.event_format).map_err(|e| {
            OutputError::exporter_creation(config.dir.display().to_string(), e.to_string())
        })?;
        let (tx, rx) = mpsc::channel(config.queue_capacity.max(1));
        let metrics = Arc::new(ExportMetrics::new());
        let worker_metrics = Arc::clone(&metrics);

        let worker_handle = tokio::spawn(async move {
            export_worker(writer, rx, worker_metrics).await;
        });

        Ok(Self {
            tx,
            metrics,
            worker_handle,
        })
    }

    pub fn metrics(&self) -> &Arc<ExportMetrics> {
        &self.metrics
    }

    /// Queue a job (non-blocking)
    ///
    /// Returns false if the queue is full and the job was dropped
    pub fn try_send(&self, job: ExportJob) -> bool {
        match self.tx.try_send(job) {
            Ok(()) => {
                self.metrics
                    .set_queue_len(self.tx.max_capacity() - self.tx.capacity());
                true
            }
            Err(mpsc::error::TrySendError::Full(job)) => {
                self.metrics.inc_dropped_count();
                warn!(frame_no = job.frame_no(), "export queue full, job dropped");
                false
            }
            Err(mpsc::error::TrySendError::Closed(_)) => {
                error!("export worker closed unexpectedly");
                false
            }
        }
    }

    /// Drain the queue and stop the worker
    #[instrument(name = "export_handle_shutdown", skip(self))]
    pub async fn shutdown(self) {
        drop(self.tx);
        if let Err(e) = self.worker_handle.await {
            error!(error = ?e, "export worker panicked");
        }
        debug!("export handle shutdown complete");
    }
}

#[instrument(name = "export_worker_loop", skip_all)]
async fn export_worker(
    mut writer: FrameWriter,
    mut rx: mpsc::Receiver<ExportJob>,
    metrics: Arc<ExportMetrics>,
) {
    debug!("export worker started");

    while let Some(job) = rx.recv().await {
        metrics.set_queue_len(rx.len());
        match writer.write(&job) {
            Ok(path) => {
                metrics.inc_write_count();
                debug!(path = %path.display(), "exported");
            }
            Err(e) => {
                metrics.inc_failure_count();
                error!(frame_no = job.frame_no(), error = %e, "export failed");
            }
        }
    }

    debug!("export worker stopped");
}
