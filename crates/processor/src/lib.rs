//! # Processor
//!
//! The MIPI data processor: decodes batches, reconstructs the time base,
//! accumulates pixels, detects frame boundaries and publishes outputs.
//!
//! ## Usage Example
//!
//! ```ignore
//! use processor::DataProcessor;
//!
//! let mut processor = DataProcessor::new(config)?;
//! let output = processor.output();
//!
//! while let Some(batch) = source.next_batch().await? {
//!     let report = processor.process_mipi_data(&batch);
//!     for frame_no in &report.frames {
//!         debug!(frame_no, "frame ready");
//!     }
//! }
//! let image = output.picture(OutputKind::FullPicture);
//! ```

mod calibration;
mod processor;
mod report;
mod state;

pub use calibration::FpnSession;
pub use processor::DataProcessor;
pub use report::{FpnOutcome, ProcessReport};
pub use state::PipelineState;
