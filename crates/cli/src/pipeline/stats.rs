//! Pipeline statistics and metrics.

use std::time::Duration;

use ingestion::DecodeMetricsSnapshot;
use observability::FrameMetricsAggregator;
use publisher::{ExportSnapshot, PublishSnapshot};

/// Statistics from a pipeline run
#[derive(Debug, Clone, Default)]
pub struct PipelineStats {
    /// Batches handed to the processor
    pub batches: u64,

    /// Frame notices seen by the consumer
    pub frames_observed: u64,

    /// Frames published but overwritten before the consumer looked
    pub frames_skipped: u64,

    /// Export jobs queued
    pub jobs_queued: u64,

    /// Whether the source ended with a read error
    pub source_error: Option<String>,

    /// Total run duration
    pub duration: Duration,

    /// Per-call aggregation
    pub calls: FrameMetricsAggregator,

    pub decode: DecodeMetricsSnapshot,

    pub publish: PublishSnapshot,

    pub export: Option<ExportSnapshot>,
}

impl PipelineStats {
    /// Batches per second
    pub fn batch_rate(&self) -> f64 {
        let secs = self.duration.as_secs_f64();
        if secs > 0.0 {
            self.batches as f64 / secs
        } else {
            0.0
        }
    }

    /// Published frames per second
    pub fn fps(&self) -> f64 {
        let secs = self.duration.as_secs_f64();
        if secs > 0.0 {
            self.publish.frames as f64 / secs
        } else {
            0.0
        }
    }

    /// Print detailed summary to stdout
    pub fn print_summary(&self) {
        println!("\n{}", self.calls.summary());

        println!("=== Decoder ===");
        println!("Batches: {}", self.decode.batches);
        println!("Samples: {} ({} events)", self.decode.samples, self.decode.events);
        println!(
            "Errors: {} unsupported format, {} format mismatch, {} truncated",
            self.decode.unsupported_format, self.decode.format_mismatch, self.decode.truncated
        );
        println!(
            "Skipped: {} orphan columns, {} special packets",
            self.decode.orphan_columns, self.decode.special_packets
        );

        println!("\n=== Publication ===");
        println!("Frames: {} ({:.2} fps)", self.publish.frames, self.fps());
        println!("Pictures: {}", self.publish.pictures);
        println!("Event vectors: {}", self.publish.event_batches);
        println!("IMU samples: {}", self.publish.imu_samples);
        println!(
            "Consumer: {} observed, {} skipped",
            self.frames_observed, self.frames_skipped
        );

        if let Some(export) = &self.export {
            println!("\n=== Export ===");
            println!("Queued: {}", self.jobs_queued);
            println!(
                "Written: {}, failed: {}, dropped: {}",
                export.write_count, export.failure_count, export.dropped_count
            );
        }

        if let Some(error) = &self.source_error {
            println!("\nSource stopped early: {error}");
        }

        println!(
            "\nDuration: {:.2}s ({:.1} batches/s)",
            self.duration.as_secs_f64(),
            self.batch_rate()
        );
    }
}
