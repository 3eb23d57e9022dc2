//! 解码错误类型

use thiserror::Error;

/// 解码错误
///
/// 两类错误都只影响当前批次，不会中断整个数据流。
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum DecodeError {
    /// 未知的格式标签，整批丢弃
    #[error("unsupported MIPI format tag {tag}")]
    UnsupportedFormat {
        /// 格式标签
        tag: u8,
    },

    /// 格式标签与配置的格式不一致，整批丢弃
    #[error("MIPI format tag {tag} does not match configured format {expected}")]
    FormatMismatch {
        /// 配置的格式标签
        expected: u8,
        /// 数据包携带的标签
        tag: u8,
    },

    /// 末尾不足一个单元的字节被丢弃
    #[error("truncated packet: {trailing} trailing bytes, unit size {unit}")]
    TruncatedPacket {
        /// 剩余字节数
        trailing: usize,
        /// 单元字节数
        unit: usize,
    },
}

impl DecodeError {
    /// 指标标签
    pub fn kind(&self) -> &'static str {
        match self {
            DecodeError::UnsupportedFormat { .. } => "unsupported_format",
            DecodeError::FormatMismatch { .. } => "format_mismatch",
            DecodeError::TruncatedPacket { .. } => "truncated_packet",
        }
    }
}

/// 解码 Result 类型别名
pub type Result<T> = std::result::Result<T, DecodeError>;
