//! Decode metrics

use std::sync::atomic::{AtomicU64, Ordering};

use crate::decoder::DecodeStats;
use crate::error::DecodeError;

/// Decoder counters, shared across calls
#[derive(Debug, Default)]
pub struct DecodeMetrics {
    /// Batches handed to the decoder
    pub batches: AtomicU64,

    /// Decoded samples (events and timestamps)
    pub samples: AtomicU64,

    /// Decoded pixel events
    pub events: AtomicU64,

    /// Batches dropped for an unknown format tag
    pub unsupported_format: AtomicU64,

    /// Batches dropped for a tag other than the configured format
    pub format_mismatch: AtomicU64,

    /// Trailing partial units discarded
    pub truncated: AtomicU64,

    /// Column packets without a known row
    pub orphan_columns: AtomicU64,

    /// Special packets skipped
    pub special_packets: AtomicU64,
}

impl DecodeMetrics {
    /// Create new metrics instance
    pub fn new() -> Self {
        Self::default()
    }

    pub fn record_batch(&self) {
        self.batches.fetch_add(1, Ordering::Relaxed);
    }

    pub fn record_sample(&self, is_event: bool) {
        self.samples.fetch_add(1, Ordering::Relaxed);
        if is_event {
            self.events.fetch_add(1, Ordering::Relaxed);
        }
    }

    pub fn record_error(&self, error: &DecodeError) {
        let counter = match error {
            DecodeError::UnsupportedFormat { .. } => &self.unsupported_format,
            DecodeError::FormatMismatch { .. } => &self.format_mismatch,
            DecodeError::TruncatedPacket { .. } => &self.truncated,
        };
        counter.fetch_add(1, Ordering::Relaxed);
        metrics::counter!("celex_decode_errors_total", "kind" => error.kind()).increment(1);
    }

    /// Fold one call's decoder stats in
    pub fn record_stats(&self, stats: &DecodeStats) {
        self.orphan_columns
            .fetch_add(stats.orphan_columns, Ordering::Relaxed);
        self.special_packets
            .fetch_add(stats.special, Ordering::Relaxed);
    }

    /// Get snapshot
    pub fn snapshot(&self) -> DecodeMetricsSnapshot {
        DecodeMetricsSnapshot {
            batches: self.batches.load(Ordering::Relaxed),
            samples: self.samples.load(Ordering::Relaxed),
            events: self.events.load(Ordering::Relaxed),
            unsupported_format: self.unsupported_format.load(Ordering::Relaxed),
            format_mismatch: self.format_mismatch.load(Ordering::Relaxed),
            truncated: self.truncated.load(Ordering::Relaxed),
            orphan_columns: self.orphan_columns.load(Ordering::Relaxed),
            special_packets: self.special_packets.load(Ordering::Relaxed),
        }
    }
}

/// Metrics snapshot
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct DecodeMetricsSnapshot {
    pub batches: u64,
    pub samples: u64,
    pub events: u64,
    pub unsupported_format: u64,
    pub format_mismatch: u64,
    pub truncated: u64,
    pub orphan_columns: u64,
    pub special_packets: u64,
}

impl DecodeMetricsSnapshot {
    /// Errors of every kind
    pub fn errors(&self) -> u64 {
        self.unsupported_format + self.format_mismatch + self.truncated
    }
}
