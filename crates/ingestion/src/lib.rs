//! # Ingestion
//!
//! MIPI packet decoding.
//!
//! Responsibilities:
//! - Decode the three bit-packed MIPI formats into `DecodedSample`s
//! - Carry the row cursor across calls
//! - Count decode errors and skipped packets
//! - Encode synthetic streams for tests (`MipiPacketWriter`)
//!
//! ## Usage Example
//!
//! ```ignore
//! use ingestion::{PacketDecoder, RowCursor};
//!
//! let mut decoder = PacketDecoder::new(&batch.packet, cursor)?;
//! for sample in decoder.by_ref() {
//!     match sample {
//!         Ok(sample) => handle(sample),
//!         Err(e) => warn!(error = %e, "dropping trailing bytes"),
//!     }
//! }
//! cursor = decoder.cursor();
//! ```

mod decoder;
mod error;
mod metrics;
mod mock;

// Re-exports
pub use contracts::{DecodedSample, MipiFormat, RawPacket};
pub use decoder::{DecodeStats, PacketDecoder, RowCursor};
pub use error::{DecodeError, Result};
pub use metrics::{DecodeMetrics, DecodeMetricsSnapshot};
pub use mock::MipiPacketWriter;
