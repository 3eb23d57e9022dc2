//! Fixed-pattern-noise tables.
//!
//! A table holds one signed offset per pixel. Correction subtracts the offset
//! and clamps the result into the ADC range. Calibration averages several full
//! frames and stores each pixel's deviation from the global mean.
//!
//! File format: decimal integers, one sensor row per line, separated by
//! commas and/or whitespace.

use std::fs;
use std::io::Write;
use std::path::Path;

use contracts::{ContractError, Result, SensorGeometry};
use tracing::{debug, info};

use crate::adc::normalize_adc;

/// Per-pixel offset table
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct FpnTable {
    geometry: SensorGeometry,
    offsets: Vec<i32>,
}

impl FpnTable {
    /// Identity table (all offsets zero)
    pub fn zero(geometry: SensorGeometry) -> Self {
        Self {
            geometry,
            offsets: vec![0; geometry.pixel_count()],
        }
    }

    pub fn from_offsets(geometry: SensorGeometry, offsets: Vec<i32>) -> Result<Self> {
        if offsets.len() != geometry.pixel_count() {
            return Err(ContractError::fpn_generation(format!(
                "expected {} offsets, got {}",
                geometry.pixel_count(),
                offsets.len()
            )));
        }
        Ok(Self { geometry, offsets })
    }

    /// Read a table from disk.
    ///
    /// The value count must match the geometry exactly; the caller keeps its
    /// previous table on error.
    pub fn load(path: &Path, geometry: SensorGeometry) -> Result<Self> {
        let shown = path.display().to_string();
        let text = fs::read_to_string(path)
            .map_err(|e| ContractError::fpn_load(&shown, e.to_string()))?;
        let table = Self::parse(&text, geometry).map_err(|message| {
            ContractError::fpn_load(&shown, message)
        })?;
        info!(path = %shown, pixels = table.offsets.len(), "fpn table loaded");
        Ok(table)
    }

    /// Parse the text form
    pub fn parse(text: &str, geometry: SensorGeometry) -> std::result::Result<Self, String> {
        let expected = geometry.pixel_count();
        let mut offsets = Vec::with_capacity(expected);

        for (line_no, line) in text.lines().enumerate() {
            for token in line
                .split(|c: char| c == ',' || c.is_whitespace())
                .filter(|t| !t.is_empty())
            {
                let value = token.parse::<i32>().map_err(|_| {
                    format!("invalid value '{}' on line {}", token, line_no + 1)
                })?;
                offsets.push(value);
            }
        }

        if offsets.len() != expected {
            return Err(format!(
                "expected {} values, found {}",
                expected,
                offsets.len()
            ));
        }
        Ok(Self { geometry, offsets })
    }

    /// Write the table, replacing `path` only once the whole file is written
    pub fn save(&self, path: &Path) -> Result<()> {
        let shown = path.display().to_string();
        let tmp = path.with_extension("fpn.tmp");
        let write = || -> std::io::Result<()> {
            let mut file = std::io::BufWriter::new(fs::File::create(&tmp)?);
            for row in self.offsets.chunks(self.geometry.cols as usize) {
                let line = row
                    .iter()
                    .map(|v| v.to_string())
                    .collect::<Vec<_>>()
                    .join(", ");
                writeln!(file, "{}", line)?;
            }
            file.flush()?;
            drop(file);
            fs::rename(&tmp, path)
        };
        write().map_err(|e| {
            let _ = fs::remove_file(&tmp);
            ContractError::fpn_generation(format!("failed to write '{}': {}", shown, e))
        })?;
        debug!(path = %shown, "fpn table saved");
        Ok(())
    }

    /// Corrected, clamped ADC value for the pixel at `index`
    #[inline]
    pub fn correct(&self, index: usize, raw: u16) -> u16 {
        let offset = self.offsets.get(index).copied().unwrap_or(0);
        normalize_adc(raw as i32 - offset)
    }

    pub fn geometry(&self) -> SensorGeometry {
        self.geometry
    }

    pub fn offsets(&self) -> &[i32] {
        &self.offsets
    }

    pub fn is_zero(&self) -> bool {
        self.offsets.iter().all(|&v| v == 0)
    }
}

/// FPN 标定：累加若干整帧的原始 ADC
#[derive(Debug, Clone)]
pub struct FpnCalibrator {
    geometry: SensorGeometry,
    sums: Vec<i64>,
    samples: Vec<u32>,
    frames_seen: u32,
    frames_target: u32,
}

impl FpnCalibrator {
    pub fn new(geometry: SensorGeometry, frames_target: u32) -> Self {
        Self {
            geometry,
            sums: vec![0; geometry.pixel_count()],
            samples: vec![0; geometry.pixel_count()],
            frames_seen: 0,
            frames_target: frames_target.max(1),
        }
    }

    /// 累加一个原始 (未校正) 采样
    #[inline]
    pub fn record(&mut self, index: usize, raw: u16) {
        if let (Some(sum), Some(count)) = (self.sums.get_mut(index), self.samples.get_mut(index)) {
            *sum += raw as i64;
            *count += 1;
        }
    }

    /// 一帧结束；达到目标帧数时返回生成的表
    pub fn finish_frame(&mut self) -> Option<Result<FpnTable>> {
        self.frames_seen += 1;
        debug!(
            frames_seen = self.frames_seen,
            frames_target = self.frames_target,
            "fpn calibration frame accumulated"
        );
        (self.frames_seen >= self.frames_target).then(|| self.build())
    }

    pub fn frames_seen(&self) -> u32 {
        self.frames_seen
    }

    pub fn frames_target(&self) -> u32 {
        self.frames_target
    }

    /// offset = 像素均值 - 全局均值
    fn build(&self) -> Result<FpnTable> {
        let means: Vec<Option<i64>> = self
            .sums
            .iter()
            .zip(&self.samples)
            .map(|(&sum, &n)| (n > 0).then(|| sum / n as i64))
            .collect();

        let (total, covered) = means
            .iter()
            .flatten()
            .fold((0i64, 0i64), |(t, c), &m| (t + m, c + 1));
        if covered == 0 {
            return Err(ContractError::fpn_generation(
                "no ADC samples received during calibration",
            ));
        }
        let global = total / covered;

        let offsets = means
            .iter()
            .map(|m| m.map_or(0, |m| (m - global) as i32))
            .collect();
        info!(
            frames = self.frames_seen,
            covered_pixels = covered,
            global_mean = global,
            "fpn table generated"
        );
        FpnTable::from_offsets(self.geometry, offsets)
    }
}
