//! MIPI packet encodings.

use serde::{Deserialize, Serialize};

/// Row timestamp modulus of Format1
pub const FORMAT1_T_MAX: i32 = 65536;

/// Row timestamp modulus of Format0 and Format2
pub const FORMAT2_T_MAX: i32 = 4096;

/// Bit-packed encoding of a MIPI batch
///
/// | format | unit bytes | packets/unit | bits/packet | ADC |
/// |--------|-----------|--------------|-------------|-----|
/// | 0      | 3         | 1            | 24          | 8   |
/// | 1      | 7         | 2            | 28          | 12  |
/// | 2      | 7         | 4            | 14          | -   |
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum MipiFormat {
    Format0,
    Format1,
    Format2,
}

impl MipiFormat {
    /// Resolve a format tag, `None` if unknown
    pub fn from_tag(tag: u8) -> Option<Self> {
        match tag {
            0 => Some(Self::Format0),
            1 => Some(Self::Format1),
            2 => Some(Self::Format2),
            _ => None,
        }
    }

    pub fn tag(self) -> u8 {
        match self {
            Self::Format0 => 0,
            Self::Format1 => 1,
            Self::Format2 => 2,
        }
    }

    /// Bytes per decode unit
    pub fn unit_bytes(self) -> usize {
        match self {
            Self::Format0 => 3,
            Self::Format1 | Self::Format2 => 7,
        }
    }

    pub fn packets_per_unit(self) -> usize {
        match self {
            Self::Format0 => 1,
            Self::Format1 => 2,
            Self::Format2 => 4,
        }
    }

    pub fn packet_bits(self) -> u32 {
        match self {
            Self::Format0 => 24,
            Self::Format1 => 28,
            Self::Format2 => 14,
        }
    }

    /// Wraparound modulus of the row-local timestamp
    pub fn t_modulus(self) -> i32 {
        match self {
            Self::Format1 => FORMAT1_T_MAX,
            Self::Format0 | Self::Format2 => FORMAT2_T_MAX,
        }
    }

    /// Whether column packets carry an ADC sample
    pub fn carries_adc(self) -> bool {
        !matches!(self, Self::Format2)
    }
}

impl std::fmt::Display for MipiFormat {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "format{}", self.tag())
    }
}
