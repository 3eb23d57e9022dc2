//! Mock MIPI 数据生成
//!
//! 用于无传感器环境的测试：按解码器的位布局编码行、时间戳与事件。

use bytes::Bytes;
use contracts::{MipiFormat, SensorGeometry};

use crate::decoder::{
    ADC_SHIFT, COL_BITS, FIELD_SHIFT, ID_COLUMN, ID_PADDING, ID_ROW, ID_SPECIAL, ROW_BITS,
    T_SHIFT,
};

/// MIPI 数据包编码器
///
/// 包按低位优先打包进单元，最后一个单元不足时用填充包补齐。
#[derive(Debug, Clone)]
pub struct MipiPacketWriter {
    format: MipiFormat,
    pending: Vec<u32>,
    out: Vec<u8>,
    last_row: u16,
}

impl MipiPacketWriter {
    /// 创建编码器
    pub fn new(format: MipiFormat) -> Self {
        Self {
            format,
            pending: Vec::with_capacity(format.packets_per_unit()),
            out: Vec::new(),
            last_row: 0,
        }
    }

    /// 行地址 + 行时间戳
    ///
    /// Format2 拆成行包和时间戳包两个包。
    pub fn row(&mut self, row: u16, timestamp: i32) -> &mut Self {
        self.last_row = row;
        let row_field = (row as u32 & mask(ROW_BITS)) << FIELD_SHIFT;
        match self.format {
            MipiFormat::Format2 => {
                self.push(row_field | ID_ROW);
                self.push(Self::timestamp_packet(timestamp));
            }
            MipiFormat::Format0 => {
                self.push(row_field | (timestamp as u32 & mask(12)) << T_SHIFT | ID_ROW);
            }
            MipiFormat::Format1 => {
                self.push(row_field | (timestamp as u32 & mask(16)) << T_SHIFT | ID_ROW);
            }
        }
        self
    }

    /// 仅推进时间戳 (Format0/1 复用上一行地址)
    pub fn timestamp(&mut self, timestamp: i32) -> &mut Self {
        match self.format {
            MipiFormat::Format2 => {
                self.push(Self::timestamp_packet(timestamp));
                self
            }
            _ => {
                let row = self.last_row;
                self.row(row, timestamp)
            }
        }
    }

    /// 列事件，adc 为 12 位值 (Format2 忽略)
    pub fn event(&mut self, col: u16, adc: Option<u16>) -> &mut Self {
        let mut packet = (col as u32 & mask(COL_BITS)) << FIELD_SHIFT | ID_COLUMN;
        let adc = adc.unwrap_or(0) as u32;
        match self.format {
            MipiFormat::Format0 => packet |= ((adc >> 4) & mask(8)) << ADC_SHIFT,
            MipiFormat::Format1 => packet |= (adc & mask(12)) << ADC_SHIFT,
            MipiFormat::Format2 => {}
        }
        self.push(packet);
        self
    }

    /// 特殊包 (解码器跳过)
    pub fn special(&mut self) -> &mut Self {
        self.push(ID_SPECIAL);
        self
    }

    /// 一整帧全幅 ADC 数据：逐行写出所有像素
    pub fn full_frame<F>(&mut self, geometry: SensorGeometry, timestamp: i32, adc: F) -> &mut Self
    where
        F: Fn(u16, u16) -> u16,
    {
        for row in 0..geometry.rows {
            self.row(row, timestamp);
            for col in 0..geometry.cols {
                self.event(col, Some(adc(row, col)));
            }
        }
        self
    }

    /// 已写出的字节数 (不含未满单元)
    pub fn len(&self) -> usize {
        self.out.len()
    }

    pub fn is_empty(&self) -> bool {
        self.out.is_empty() && self.pending.is_empty()
    }

    /// 补齐最后一个单元并输出
    pub fn finish(&mut self) -> Bytes {
        while !self.pending.is_empty() {
            self.push(ID_PADDING);
        }
        Bytes::from(std::mem::take(&mut self.out))
    }

    fn timestamp_packet(timestamp: i32) -> u32 {
        (timestamp as u32 & mask(12)) << FIELD_SHIFT | ID_SPECIAL
    }

    fn push(&mut self, packet: u32) {
        self.pending.push(packet);
        if self.pending.len() == self.format.packets_per_unit() {
            self.flush_unit();
        }
    }

    fn flush_unit(&mut self) {
        let bits = self.format.packet_bits();
        let word = self
            .pending
            .drain(..)
            .enumerate()
            .fold(0u64, |acc, (i, p)| acc | (p as u64) << (i as u32 * bits));
        let bytes = word.to_le_bytes();
        self.out
            .extend_from_slice(&bytes[..self.format.unit_bytes()]);
    }
}

fn mask(bits: u32) -> u32 {
    (1u32 << bits) - 1
}
