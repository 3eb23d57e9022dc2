//! Sensor geometry and fixed policy constants.

use serde::{Deserialize, Serialize};
use validator::Validate;

/// Largest valid ADC value (12-bit)
pub const ADC_MAX: u16 = 4095;

/// Row timestamp deltas at or above this value are treated as discontinuities
pub const DISCONTINUITY_THRESHOLD: i32 = 5;

/// Number of full frames averaged during FPN calibration
pub const FPN_CALCULATION_FRAMES: u32 = 5;

/// Row address field is 10 bits wide
pub const MAX_ROWS: u16 = 1024;

/// Column address field is 11 bits wide
pub const MAX_COLS: u16 = 2048;

/// Pixel array dimensions.
///
/// All pixel buffers are sized from this once, at construction, and indexed
/// as `row * cols + col`.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize, Validate)]
pub struct SensorGeometry {
    #[validate(range(min = 1, max = 1024))]
    pub rows: u16,

    #[validate(range(min = 1, max = 2048))]
    pub cols: u16,
}

impl Default for SensorGeometry {
    /// CeleX5 array: 800 rows x 1280 columns
    fn default() -> Self {
        Self {
            rows: 800,
            cols: 1280,
        }
    }
}

impl SensorGeometry {
    pub fn new(rows: u16, cols: u16) -> Self {
        Self { rows, cols }
    }

    /// Total pixel count
    pub fn pixel_count(&self) -> usize {
        self.rows as usize * self.cols as usize
    }

    /// Linear buffer index, `None` outside the array
    #[inline]
    pub fn index(&self, row: u16, col: u16) -> Option<usize> {
        if row < self.rows && col < self.cols {
            Some(row as usize * self.cols as usize + col as usize)
        } else {
            None
        }
    }
}
