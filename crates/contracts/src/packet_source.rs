//! PacketSource trait - transport abstraction
//!
//! The capture layer (USB/MIPI) lives outside this workspace. Anything that
//! can hand over framed batches implements this trait: recorded files,
//! synthetic generators, a real driver.

use crate::{ContractError, MipiBatch};

/// Batch producer.
///
/// Each call returns one batch of a single declared format, or `None` once
/// the source is exhausted.
///
/// # Example
///
/// ```ignore
/// while let Some(batch) = source.next_batch().await? {
///     let report = processor.process_mipi_data(&batch);
/// }
/// ```
#[trait_variant::make(PacketSource: Send)]
pub trait LocalPacketSource {
    /// Source name (used for logging/metrics)
    fn name(&self) -> &str;

    /// Next batch, `Ok(None)` at end of stream
    async fn next_batch(&mut self) -> Result<Option<MipiBatch>, ContractError>;
}
