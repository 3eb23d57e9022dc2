//! FPN generation session.

use std::path::{Path, PathBuf};

use contracts::{ContractError, Result, SensorGeometry, FPN_CALCULATION_FRAMES};
use imaging::{FpnCalibrator, FpnTable};

/// Calibration in progress, with the file it will be written to
#[derive(Debug)]
pub struct FpnSession {
    calibrator: FpnCalibrator,
    path: PathBuf,
    samples_this_frame: u64,
}

impl FpnSession {
    /// Checks the target directory before any frame is consumed
    pub fn start(geometry: SensorGeometry, path: &Path, frames: u32) -> Result<Self> {
        if path.as_os_str().is_empty() || path.is_dir() {
            return Err(ContractError::fpn_generation(format!(
                "'{}' is not a file path",
                path.display()
            )));
        }
        let parent = match path.parent() {
            Some(p) if !p.as_os_str().is_empty() => p,
            _ => Path::new("."),
        };
        if !parent.is_dir() {
            return Err(ContractError::fpn_generation(format!(
                "directory '{}' does not exist",
                parent.display()
            )));
        }

        Ok(Self {
            calibrator: FpnCalibrator::new(geometry, frames),
            path: path.to_path_buf(),
            samples_this_frame: 0,
        })
    }

    pub fn with_default_frames(geometry: SensorGeometry, path: &Path) -> Result<Self> {
        Self::start(geometry, path, FPN_CALCULATION_FRAMES)
    }

    #[inline]
    pub fn record(&mut self, index: usize, raw: u16) {
        self.calibrator.record(index, raw);
        self.samples_this_frame += 1;
    }

    /// End of one call. Calls without ADC samples do not count as a frame.
    pub fn end_frame(&mut self) -> Option<Result<FpnTable>> {
        if self.samples_this_frame == 0 {
            return None;
        }
        self.samples_this_frame = 0;
        self.calibrator.finish_frame()
    }

    pub fn path(&self) -> &Path {
        &self.path
    }

    pub fn frames_seen(&self) -> u32 {
        self.calibrator.frames_seen()
    }

    pub fn frames_target(&self) -> u32 {
        self.calibrator.frames_target()
    }
}
