//! MipiBatch - processor input, plus the decoded and published data shapes.

use bytes::Bytes;
use serde::{Deserialize, Serialize};

use crate::ImuRawData;

/// Raw MIPI byte span with its declared format tag.
///
/// Consumed once by the decoder. The tag is resolved at decode time so an
/// unknown value surfaces as `UnsupportedFormat` for that batch only.
#[derive(Debug, Clone)]
pub struct RawPacket {
    /// Packed units (zero-copy)
    pub data: Bytes,

    /// Format tag (0, 1 or 2)
    pub format_tag: u8,
}

impl RawPacket {
    pub fn new(data: impl Into<Bytes>, format_tag: u8) -> Self {
        Self {
            data: data.into(),
            format_tag,
        }
    }

    pub fn len(&self) -> usize {
        self.data.len()
    }

    pub fn is_empty(&self) -> bool {
        self.data.is_empty()
    }
}

/// One transport delivery: one packet batch of a single format
#[derive(Debug, Clone)]
pub struct MipiBatch {
    pub packet: RawPacket,

    /// Host time at the end of the batch (microseconds)
    pub end_timestamp_us: i64,

    /// IMU samples captured alongside, in arrival order
    pub imu: Vec<ImuRawData>,
}

impl MipiBatch {
    pub fn new(packet: RawPacket, end_timestamp_us: i64) -> Self {
        Self {
            packet,
            end_timestamp_us,
            imu: Vec::new(),
        }
    }

    pub fn with_imu(mut self, imu: Vec<ImuRawData>) -> Self {
        self.imu = imu;
        self
    }
}

/// One decoded packet.
///
/// Non-event samples only advance time; event samples address a pixel.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct DecodedSample {
    pub row: u16,
    pub col: u16,
    /// 12-bit ADC, `None` for Format2
    pub adc: Option<u16>,
    /// Format-local counter in `[0, t_modulus)`
    pub row_timestamp: i32,
    pub is_event: bool,
}

/// Single pixel event as handed to consumers
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct EventData {
    pub row: u16,
    pub col: u16,
    /// ADC sample, `None` for binary events
    pub adc: Option<u16>,
    /// Time units since the frame started
    pub t_off_pixel: u32,
}

/// Event vector published at a frame boundary
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct EventBatch {
    pub frame_no: u64,
    pub timestamp_us: i64,
    pub events: Vec<EventData>,
    /// Events whose pixel passed the neighborhood denoise test
    pub denoised: Vec<EventData>,
}

/// 8-bit image published at a frame boundary
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ImageFrame {
    pub width: u32,
    pub height: u32,
    pub frame_no: u64,
    pub timestamp_us: i64,
    /// Row-major, `width * height` bytes
    pub pixels: Vec<u8>,
}

impl ImageFrame {
    /// Pixel at (x, y), `None` outside the image
    pub fn pixel(&self, x: u32, y: u32) -> Option<u8> {
        if x < self.width && y < self.height {
            self.pixels.get((y * self.width + x) as usize).copied()
        } else {
            None
        }
    }
}
