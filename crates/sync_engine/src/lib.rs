//! # Sync Engine
//!
//! Time base reconstruction and frame synchronization for the MIPI stream.
//!
//! Responsibilities:
//! - Reconstruct a monotonic time base from wrapping row timestamps
//! - Decide frame boundaries (ByTime / ByCount / ByStep)
//! - Publish events-per-second once per elapsed second
//! - Align raw IMU samples to the reconstructed time base
//!
//! ## Usage Example
//!
//! ```ignore
//! use sync_engine::FrameSync;
//!
//! let mut sync = FrameSync::new(&config.event);
//! sync.begin_package();
//! for sample in decoder {
//!     sync.observe(&sample, format.t_modulus());
//!     if sample.is_event && sync.accepts_event() {
//!         sync.count_event();
//!     }
//!     if let Some(reason) = sync.check_boundary() {
//!         let frame_no = sync.complete_frame(reason);
//!     }
//! }
//! ```

mod boundary;
mod engine;
mod imu;
mod timestamp;

// Re-exports
pub use boundary::{BoundaryReason, FrameBoundaryPolicy, FrameCounters};
pub use engine::{FrameSync, SyncStep};
pub use imu::{decode_raw, BatchTiming, ImuSynchronizer};
pub use timestamp::{TimeCounters, TimeUpdate, TimestampReconstructor};
