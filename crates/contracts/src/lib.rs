//! # Contracts
//!
//! Frozen interface contracts shared by every crate in the workspace: data
//! shapes, configuration, errors and the transport/control traits.
//! Business crates depend on this crate, never the other way around.
//!
//! ## Time Model
//! - Row-local timestamps are narrow wrapping counters (`i32`, format modulus)
//! - The reconstructed base counts time units (`u64`, monotonic)
//! - Host timestamps handed in by the transport are microseconds (`i64`)

mod config;
mod control;
mod error;
mod format;
mod geometry;
mod imu;
mod mode;
mod packet;
mod packet_source;

pub use config::*;
pub use control::*;
pub use error::*;
pub use format::*;
pub use geometry::*;
pub use imu::*;
pub use mode::*;
pub use packet::*;
pub use packet_source::{LocalPacketSource, PacketSource};
