//! Per-call processing report.

use std::path::PathBuf;

use contracts::SensorMode;
use ingestion::DecodeError;
use sync_engine::BoundaryReason;

/// FPN calibration progress reported by the call that advanced it
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum FpnOutcome {
    Progress { frames_seen: u32, frames_target: u32 },
    /// Table installed and written
    Completed { path: PathBuf },
    Failed { message: String },
}

/// What one `process_mipi_data` call did
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct ProcessReport {
    /// Mode the call was decoded under
    pub mode: SensorMode,
    /// Decoded samples, events and time packets alike
    pub samples: u64,
    /// Events accepted into the frame
    pub events: u64,
    /// Frame numbers published during the call, in order
    pub frames: Vec<u64>,
    pub boundaries: Vec<BoundaryReason>,
    pub discontinuities: u64,
    pub imu_samples: usize,
    /// Set when the events-per-second value was refreshed
    pub event_rate: Option<u32>,
    pub decode_error: Option<DecodeError>,
    pub fpn: Option<FpnOutcome>,
}

impl ProcessReport {
    pub fn new(mode: SensorMode) -> Self {
        Self {
            mode,
            ..Default::default()
        }
    }

    pub fn published(&self) -> bool {
        !self.frames.is_empty()
    }
}
