//! Publication metrics for observability

use std::sync::atomic::{AtomicU64, AtomicUsize, Ordering};

/// Counters kept by the output store
#[derive(Debug, Default)]
pub struct PublishMetrics {
    /// Frame boundaries published
    frames: AtomicU64,
    /// Images published, all kinds
    pictures: AtomicU64,
    /// Event vectors published
    event_batches: AtomicU64,
    /// IMU samples queued
    imu_samples: AtomicU64,
    /// Reads that found an empty slot
    not_ready: AtomicU64,
}

impl PublishMetrics {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn inc_frames(&self) {
        self.frames.fetch_add(1, Ordering::Relaxed);
    }

    pub fn add_pictures(&self, n: u64) {
        self.pictures.fetch_add(n, Ordering::Relaxed);
    }

    pub fn inc_event_batches(&self) {
        self.event_batches.fetch_add(1, Ordering::Relaxed);
    }

    pub fn add_imu_samples(&self, n: u64) {
        self.imu_samples.fetch_add(n, Ordering::Relaxed);
    }

    pub fn inc_not_ready(&self) {
        self.not_ready.fetch_add(1, Ordering::Relaxed);
    }

    pub fn snapshot(&self) -> PublishSnapshot {
        PublishSnapshot {
            frames: self.frames.load(Ordering::Relaxed),
            pictures: self.pictures.load(Ordering::Relaxed),
            event_batches: self.event_batches.load(Ordering::Relaxed),
            imu_samples: self.imu_samples.load(Ordering::Relaxed),
            not_ready: self.not_ready.load(Ordering::Relaxed),
        }
    }
}

/// Snapshot of publication metrics (for reporting)
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct PublishSnapshot {
    pub frames: u64,
    pub pictures: u64,
    pub event_batches: u64,
    pub imu_samples: u64,
    pub not_ready: u64,
}

/// Metrics for the export worker
#[derive(Debug, Default)]
pub struct ExportMetrics {
    queue_len: AtomicUsize,
    write_count: AtomicU64,
    failure_count: AtomicU64,
    dropped_count: AtomicU64,
}

impl ExportMetrics {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn queue_len(&self) -> usize {
        self.queue_len.load(Ordering::Relaxed)
    }

    pub fn set_queue_len(&self, len: usize) {
        self.queue_len.store(len, Ordering::Relaxed);
    }

    pub fn write_count(&self) -> u64 {
        self.write_count.load(Ordering::Relaxed)
    }

    pub fn inc_write_count(&self) {
        self.write_count.fetch_add(1, Ordering::Relaxed);
    }

    pub fn failure_count(&self) -> u64 {
        self.failure_count.load(Ordering::Relaxed)
    }

    pub fn inc_failure_count(&self) {
        self.failure_count.fetch_add(1, Ordering::Relaxed);
    }

    pub fn dropped_count(&self) -> u64 {
        self.dropped_count.load(Ordering::Relaxed)
    }

    pub fn inc_dropped_count(&self) {
        self.dropped_count.fetch_add(1, Ordering::Relaxed);
    }

    pub fn snapshot(&self) -> ExportSnapshot {
        ExportSnapshot {
            queue_len: self.queue_len(),
            write_count: self.write_count(),
            failure_count: self.failure_count(),
            dropped_count: self.dropped_count(),
        }
    }
}

/// Snapshot of export metrics
#[derive(Debug, Clone, Copy)]
pub struct ExportSnapshot {
    pub queue_len: usize,
    pub write_count: u64,
    pub failure_count: u64,
    pub dropped_count: u64,
}
