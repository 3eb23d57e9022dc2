//! MIPI packet decoder
//!
//! Turns one packed byte span into a lazy sequence of [`DecodedSample`].
//! Each unit is read little-endian into a word and split LSB-first into
//! fixed-width packets; bits [1:0] of a packet select its kind.

use contracts::{DecodedSample, MipiFormat, RawPacket};
use tracing::trace;

use crate::error::{DecodeError, Result};

pub(crate) const ID_PADDING: u32 = 0b00;
pub(crate) const ID_COLUMN: u32 = 0b01;
pub(crate) const ID_ROW: u32 = 0b10;
pub(crate) const ID_SPECIAL: u32 = 0b11;

pub(crate) const ROW_BITS: u32 = 10;
pub(crate) const COL_BITS: u32 = 11;
pub(crate) const FIELD_SHIFT: u32 = 2;
pub(crate) const T_SHIFT: u32 = 12;
pub(crate) const ADC_SHIFT: u32 = 13;

/// Row address and row timestamp carried across calls.
///
/// Column packets address the most recent row; a column that arrives before
/// any row/timestamp is known cannot be placed and is dropped.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct RowCursor {
    pub row: Option<u16>,
    pub row_timestamp: Option<i32>,
}

/// Per-call packet counts
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct DecodeStats {
    pub units: u64,
    pub padding: u64,
    pub special: u64,
    pub orphan_columns: u64,
}

/// Lazy decoder over one byte span.
///
/// Restartable per call: construct a new decoder for each batch and hand it
/// the cursor returned by the previous one.
#[derive(Debug)]
pub struct PacketDecoder<'a> {
    data: &'a [u8],
    format: MipiFormat,
    cursor: RowCursor,
    offset: usize,
    slot: usize,
    word: u64,
    stats: DecodeStats,
}

impl<'a> PacketDecoder<'a> {
    /// Decoder for a raw packet, resolving its format tag
    pub fn new(packet: &'a RawPacket, cursor: RowCursor) -> Result<Self> {
        let format = MipiFormat::from_tag(packet.format_tag).ok_or(
            DecodeError::UnsupportedFormat {
                tag: packet.format_tag,
            },
        )?;
        Ok(Self::with_format(&packet.data, format, cursor))
    }

    /// Decoder for a packet that must carry the `expected` format
    pub fn expecting(packet: &'a RawPacket, expected: MipiFormat, cursor: RowCursor) -> Result<Self> {
        let decoder = Self::new(packet, cursor)?;
        if decoder.format != expected {
            return Err(DecodeError::FormatMismatch {
                expected: expected.tag(),
                tag: packet.format_tag,
            });
        }
        Ok(decoder)
    }

    /// Decoder for a span whose format is already known
    pub fn with_format(data: &'a [u8], format: MipiFormat, cursor: RowCursor) -> Self {
        Self {
            data,
            format,
            cursor,
            offset: 0,
            slot: 0,
            word: 0,
            stats: DecodeStats::default(),
        }
    }

    pub fn format(&self) -> MipiFormat {
        self.format
    }

    pub fn stats(&self) -> DecodeStats {
        self.stats
    }

    /// Cursor to hand to the next call's decoder
    pub fn cursor(&self) -> RowCursor {
        self.cursor
    }

    fn load_unit(&mut self, unit: usize) {
        let bytes = &self.data[self.offset..self.offset + unit];
        self.word = bytes
            .iter()
            .enumerate()
            .fold(0u64, |acc, (i, b)| acc | (*b as u64) << (8 * i));
        self.offset += unit;
        self.stats.units += 1;
    }

    fn decode_packet(&mut self, packet: u32) -> Option<DecodedSample> {
        match packet & 0b11 {
            ID_PADDING => {
                self.stats.padding += 1;
                None
            }
            ID_ROW => self.decode_row(packet),
            ID_SPECIAL => self.decode_special(packet),
            _ => self.decode_column(packet),
        }
    }

    fn decode_row(&mut self, packet: u32) -> Option<DecodedSample> {
        let row = field(packet, FIELD_SHIFT, ROW_BITS) as u16;
        self.cursor.row = Some(row);

        let t_bits = match self.format {
            // Format2 row packets only move the row address
            MipiFormat::Format2 => return None,
            MipiFormat::Format0 => 12,
            MipiFormat::Format1 => 16,
        };
        let row_timestamp = field(packet, T_SHIFT, t_bits) as i32;
        self.cursor.row_timestamp = Some(row_timestamp);

        Some(DecodedSample {
            row,
            col: 0,
            adc: None,
            row_timestamp,
            is_event: false,
        })
    }

    fn decode_special(&mut self, packet: u32) -> Option<DecodedSample> {
        if self.format != MipiFormat::Format2 {
            self.stats.special += 1;
            trace!(packet, "skipping special packet");
            return None;
        }

        let row_timestamp = field(packet, FIELD_SHIFT, 12) as i32;
        self.cursor.row_timestamp = Some(row_timestamp);

        Some(DecodedSample {
            row: self.cursor.row.unwrap_or(0),
            col: 0,
            adc: None,
            row_timestamp,
            is_event: false,
        })
    }

    fn decode_column(&mut self, packet: u32) -> Option<DecodedSample> {
        let (Some(row), Some(row_timestamp)) = (self.cursor.row, self.cursor.row_timestamp) else {
            self.stats.orphan_columns += 1;
            return None;
        };

        let col = field(packet, FIELD_SHIFT, COL_BITS) as u16;
        let adc = match self.format {
            // 8-bit sample scaled into the 12-bit domain
            MipiFormat::Format0 => Some((field(packet, ADC_SHIFT, 8) as u16) << 4),
            MipiFormat::Format1 => Some(field(packet, ADC_SHIFT, 12) as u16),
            MipiFormat::Format2 => None,
        };

        Some(DecodedSample {
            row,
            col,
            adc,
            row_timestamp,
            is_event: true,
        })
    }
}

impl Iterator for PacketDecoder<'_> {
    type Item = Result<DecodedSample>;

    fn next(&mut self) -> Option<Self::Item> {
        let unit = self.format.unit_bytes();
        let bits = self.format.packet_bits();
        let per_unit = self.format.packets_per_unit();

        loop {
            if self.slot == 0 {
                let remaining = self.data.len() - self.offset;
                if remaining == 0 {
                    return None;
                }
                if remaining < unit {
                    self.offset = self.data.len();
                    return Some(Err(DecodeError::TruncatedPacket {
                        trailing: remaining,
                        unit,
                    }));
                }
                self.load_unit(unit);
            }

            let packet = ((self.word >> (self.slot as u32 * bits)) & mask(bits)) as u32;
            self.slot = (self.slot + 1) % per_unit;

            if let Some(sample) = self.decode_packet(packet) {
                return Some(Ok(sample));
            }
        }
    }
}

#[inline]
fn mask(bits: u32) -> u64 {
    (1u64 << bits) - 1
}

#[inline]
fn field(packet: u32, shift: u32, bits: u32) -> u32 {
    (packet >> shift) & ((1u32 << bits) - 1)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::mock::MipiPacketWriter;
    use rand::Rng;

    fn decode_all(data: &[u8], format: MipiFormat) -> Vec<Result<DecodedSample>> {
        PacketDecoder::with_format(data, format, RowCursor::default()).collect()
    }

    #[test]
    fn test_unsupported_format() {
        let packet = RawPacket::new(vec![0u8; 7], 5);
        let err = PacketDecoder::new(&packet, RowCursor::default()).unwrap_err();
        assert_eq!(err, DecodeError::UnsupportedFormat { tag: 5 });
    }

    #[test]
    fn test_expecting_rejects_other_format() {
        let packet = RawPacket::new(vec![0u8; 7], MipiFormat::Format2.tag());
        let err = PacketDecoder::expecting(&packet, MipiFormat::Format1, RowCursor::default())
            .unwrap_err();
        assert_eq!(err, DecodeError::FormatMismatch { expected: 1, tag: 2 });
        assert_eq!(err.kind(), "format_mismatch");

        let decoder =
            PacketDecoder::expecting(&packet, MipiFormat::Format2, RowCursor::default()).unwrap();
        assert_eq!(decoder.format(), MipiFormat::Format2);

        let unknown = RawPacket::new(vec![0u8; 7], 9);
        let err = PacketDecoder::expecting(&unknown, MipiFormat::Format2, RowCursor::default())
            .unwrap_err();
        assert_eq!(err, DecodeError::UnsupportedFormat { tag: 9 });
    }

    #[test]
    fn test_format0_row_and_column() {
        let mut writer = MipiPacketWriter::new(MipiFormat::Format0);
        writer.row(17, 4000).event(300, Some(0x7F0));
        let data = writer.finish();
        assert_eq!(data.len(), 6);

        let samples: Vec<_> = decode_all(&data, MipiFormat::Format0)
            .into_iter()
            .map(|s| s.unwrap())
            .collect();
        assert_eq!(samples.len(), 2);
        assert!(!samples[0].is_event);
        assert_eq!(samples[0].row_timestamp, 4000);
        assert_eq!(
            samples[1],
            DecodedSample {
                row: 17,
                col: 300,
                adc: Some(0x7F0),
                row_timestamp: 4000,
                is_event: true,
            }
        );
    }

    #[test]
    fn test_format1_wide_timestamp_and_adc() {
        let mut writer = MipiPacketWriter::new(MipiFormat::Format1);
        writer.row(799, 65530).event(1279, Some(4095)).event(0, Some(1));
        let data = writer.finish();
        assert_eq!(data.len() % 7, 0);

        let samples: Vec<_> = decode_all(&data, MipiFormat::Format1)
            .into_iter()
            .map(|s| s.unwrap())
            .collect();
        assert_eq!(samples[0].row_timestamp, 65530);
        assert_eq!(samples[1].row, 799);
        assert_eq!(samples[1].col, 1279);
        assert_eq!(samples[1].adc, Some(4095));
        assert_eq!(samples[2].adc, Some(1));
    }

    #[test]
    fn test_format2_binary_events() {
        let mut writer = MipiPacketWriter::new(MipiFormat::Format2);
        writer.row(5, 100).event(9, None).event(10, None).timestamp(101);
        let data = writer.finish();

        let samples: Vec<_> = decode_all(&data, MipiFormat::Format2)
            .into_iter()
            .map(|s| s.unwrap())
            .collect();
        // row packet yields nothing, timestamp packets yield non-event samples
        assert_eq!(samples.len(), 4);
        assert_eq!(samples[0].row_timestamp, 100);
        assert!(samples[1].is_event && samples[1].adc.is_none());
        assert_eq!((samples[2].row, samples[2].col), (5, 10));
        assert_eq!(samples[3].row_timestamp, 101);
    }

    #[test]
    fn test_truncated_trailing_bytes() {
        let mut writer = MipiPacketWriter::new(MipiFormat::Format2);
        writer.row(1, 1).event(2, None);
        let mut data = writer.finish().to_vec();
        data.extend_from_slice(&[0xAB, 0xCD]);

        let results = decode_all(&data, MipiFormat::Format2);
        let errors: Vec<_> = results.iter().filter(|r| r.is_err()).collect();
        assert_eq!(errors.len(), 1);
        assert_eq!(
            *errors[0],
            Err(DecodeError::TruncatedPacket {
                trailing: 2,
                unit: 7
            })
        );
        // full units still decoded
        assert_eq!(results.iter().filter(|r| r.is_ok()).count(), 2);
        assert!(results.last().map(|r| r.is_err()).unwrap_or(false));
    }

    #[test]
    fn test_orphan_column_dropped() {
        let mut writer = MipiPacketWriter::new(MipiFormat::Format2);
        writer.event(3, None);
        let data = writer.finish();

        let mut decoder = PacketDecoder::with_format(&data, MipiFormat::Format2, RowCursor::default());
        assert!(decoder.next().is_none());
        assert_eq!(decoder.stats().orphan_columns, 1);
    }

    #[test]
    fn test_cursor_carries_across_calls() {
        let mut first = MipiPacketWriter::new(MipiFormat::Format2);
        first.row(42, 7);
        let first = first.finish();

        let mut decoder = PacketDecoder::with_format(&first, MipiFormat::Format2, RowCursor::default());
        assert_eq!(decoder.by_ref().count(), 1);
        let cursor = decoder.cursor();
        assert_eq!(cursor.row, Some(42));
        assert_eq!(cursor.row_timestamp, Some(7));

        let mut second = MipiPacketWriter::new(MipiFormat::Format2);
        second.event(11, None);
        let second = second.finish();

        let samples: Vec<_> = PacketDecoder::with_format(&second, MipiFormat::Format2, cursor)
            .map(|s| s.unwrap())
            .collect();
        assert_eq!(samples.len(), 1);
        assert_eq!((samples[0].row, samples[0].col, samples[0].row_timestamp), (42, 11, 7));
    }

    #[test]
    fn test_random_input_stays_in_range() {
        let mut rng = rand::rng();
        for format in [MipiFormat::Format0, MipiFormat::Format1, MipiFormat::Format2] {
            let len = rng.random_range(0..512);
            let data: Vec<u8> = (0..len).map(|_| rng.random()).collect();

            for sample in decode_all(&data, format).into_iter().flatten() {
                assert!(sample.row < 1024);
                assert!(sample.col < 2048);
                assert!(sample.row_timestamp >= 0);
                assert!(sample.row_timestamp < format.t_modulus());
                if let Some(adc) = sample.adc {
                    assert!(adc <= 4095);
                }
            }
        }
    }
}
