//! Capture files: recorded MIPI batches on disk.
//!
//! Layout: the 4-byte magic and a version byte, then one record per batch:
//! format tag (u8), end timestamp in microseconds (i64 LE), IMU sample count
//! (u16 LE), payload length (u32 LE), the payload bytes, and the raw IMU
//! samples.

use std::io::Write;
use std::path::Path;

use bytes::{Buf, BufMut, Bytes, BytesMut};
use contracts::{ContractError, ImuRawData, MipiBatch, PacketSource, RawPacket, IMU_RAW_LEN};
use tracing::{debug, instrument};

pub const CAPTURE_MAGIC: &[u8; 4] = b"CXMP";
pub const CAPTURE_VERSION: u8 = 1;

const RECORD_HEADER_LEN: usize = 1 + 8 + 2 + 4;

/// Appends batches to a capture stream
pub struct CaptureWriter<W: Write> {
    inner: W,
    records: u64,
}

impl<W: Write> CaptureWriter<W> {
    pub fn new(mut inner: W) -> std::io::Result<Self> {
        inner.write_all(CAPTURE_MAGIC)?;
        inner.write_all(&[CAPTURE_VERSION])?;
        Ok(Self { inner, records: 0 })
    }

    pub fn write_batch(&mut self, batch: &MipiBatch) -> std::io::Result<()> {
        let payload = &batch.packet.data;
        let payload_len = u32::try_from(payload.len())
            .map_err(|_| std::io::Error::other("payload larger than 4 GiB"))?;
        let imu_count = u16::try_from(batch.imu.len())
            .map_err(|_| std::io::Error::other("too many IMU samples in one batch"))?;

        let mut header = BytesMut::with_capacity(RECORD_HEADER_LEN);
        header.put_u8(batch.packet.format_tag);
        header.put_i64_le(batch.end_timestamp_us);
        header.put_u16_le(imu_count);
        header.put_u32_le(payload_len);

        self.inner.write_all(&header)?;
        self.inner.write_all(payload)?;
        for sample in &batch.imu {
            self.inner.write_all(&sample.bytes)?;
        }
        self.records += 1;
        Ok(())
    }

    pub fn records(&self) -> u64 {
        self.records
    }

    pub fn finish(mut self) -> std::io::Result<W> {
        self.inner.flush()?;
        Ok(self.inner)
    }
}

/// File-backed packet source.
///
/// The whole file is read once; payloads are zero-copy slices of it.
#[derive(Debug)]
pub struct CaptureSource {
    name: String,
    data: Bytes,
    batches: u64,
}

impl CaptureSource {
    #[instrument(name = "capture_open", fields(path = %path.display()))]
    pub async fn open(path: &Path) -> Result<Self, ContractError> {
        let name = path.display().to_string();
        let data = tokio::fs::read(path).await?;
        Self::from_bytes(name, Bytes::from(data))
    }

    pub fn from_bytes(name: impl Into<String>, mut data: Bytes) -> Result<Self, ContractError> {
        let name = name.into();
        if data.len() < CAPTURE_MAGIC.len() + 1 || &data[..CAPTURE_MAGIC.len()] != CAPTURE_MAGIC {
            return Err(ContractError::packet_source(name, "not a capture file"));
        }
        data.advance(CAPTURE_MAGIC.len());
        let version = data.get_u8();
        if version != CAPTURE_VERSION {
            return Err(ContractError::packet_source(
                name,
                format!("unsupported capture version {version}"),
            ));
        }
        debug!(source = %name, bytes = data.len(), "capture opened");
        Ok(Self {
            name,
            data,
            batches: 0,
        })
    }

    pub fn batches_read(&self) -> u64 {
        self.batches
    }

    fn read_record(&mut self) -> Result<Option<MipiBatch>, ContractError> {
        if !self.data.has_remaining() {
            return Ok(None);
        }
        if self.data.remaining() < RECORD_HEADER_LEN {
            return Err(self.truncated("record header"));
        }

        let format_tag = self.data.get_u8();
        let end_timestamp_us = self.data.get_i64_le();
        let imu_count = self.data.get_u16_le() as usize;
        let payload_len = self.data.get_u32_le() as usize;

        if self.data.remaining() < payload_len + imu_count * IMU_RAW_LEN {
            return Err(self.truncated("record body"));
        }
        let payload = self.data.split_to(payload_len);
        let imu = (0..imu_count)
            .map(|_| {
                let mut bytes = [0u8; IMU_RAW_LEN];
                self.data.copy_to_slice(&mut bytes);
                ImuRawData::new(bytes)
            })
            .collect();

        self.batches += 1;
        Ok(Some(
            MipiBatch::new(RawPacket::new(payload, format_tag), end_timestamp_us).with_imu(imu),
        ))
    }

    fn truncated(&self, what: &str) -> ContractError {
        ContractError::packet_source(
            self.name.clone(),
            format!("truncated {what} after batch {}", self.batches),
        )
    }
}

impl PacketSource for CaptureSource {
    fn name(&self) -> &str {
        &self.name
    }

    async fn next_batch(&mut self) -> Result<Option<MipiBatch>, ContractError> {
        self.read_record()
    }
}
