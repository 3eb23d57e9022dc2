//! ProcessorConfig - Config Loader output
//!
//! Sensor geometry, operating mode, event framing, module switches and FPN
//! settings. Everything the processor's setters can change lives here, so a
//! setter is "clone, modify, validate, swap".

use std::path::PathBuf;

use serde::{Deserialize, Serialize};
use validator::Validate;

use crate::{
    ContractError, EventShowType, LoopSlot, MipiFormat, Rotation, SensorGeometry, SensorMode,
};

/// Configuration version
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
pub enum ConfigVersion {
    #[default]
    V1,
}

/// Complete processor configuration
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize, Validate)]
pub struct ProcessorConfig {
    #[serde(default)]
    pub version: ConfigVersion,

    #[serde(default)]
    #[validate(nested)]
    pub sensor: SensorConfig,

    #[serde(default)]
    #[validate(nested)]
    pub mode: ModeConfig,

    #[serde(default)]
    #[validate(nested)]
    pub event: EventConfig,

    #[serde(default)]
    pub modules: ModuleConfig,

    #[serde(default)]
    pub fpn: FpnConfig,
}

/// Sensor array and link encoding
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize, Validate)]
pub struct SensorConfig {
    #[serde(default = "default_rows")]
    #[validate(range(min = 1, max = 1024))]
    pub rows: u16,

    #[serde(default = "default_cols")]
    #[validate(range(min = 1, max = 2048))]
    pub cols: u16,

    /// Declared MIPI format tag (0, 1 or 2)
    #[serde(default = "default_mipi_format")]
    #[validate(range(max = 2))]
    pub mipi_format: u8,
}

fn default_rows() -> u16 {
    SensorGeometry::default().rows
}

fn default_cols() -> u16 {
    SensorGeometry::default().cols
}

fn default_mipi_format() -> u8 {
    2
}

impl Default for SensorConfig {
    fn default() -> Self {
        Self {
            rows: default_rows(),
            cols: default_cols(),
            mipi_format: default_mipi_format(),
        }
    }
}

impl SensorConfig {
    pub fn geometry(&self) -> SensorGeometry {
        SensorGeometry::new(self.rows, self.cols)
    }

    pub fn format(&self) -> Option<MipiFormat> {
        MipiFormat::from_tag(self.mipi_format)
    }
}

/// Fixed / loop operating mode
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize, Validate)]
pub struct ModeConfig {
    /// Mode used when loop mode is off
    #[serde(default)]
    pub fixed: SensorMode,

    #[serde(default)]
    pub loop_enabled: bool,

    #[serde(default = "default_loop_a")]
    pub loop_a: SensorMode,

    #[serde(default = "default_loop_b")]
    pub loop_b: SensorMode,

    #[serde(default = "default_loop_c")]
    pub loop_c: SensorMode,

    /// Exposure/gain proxy
    #[serde(default = "default_iso_level")]
    #[validate(range(min = 1, max = 6))]
    pub iso_level: u8,
}

fn default_loop_a() -> SensorMode {
    SensorMode::FullPicture
}

fn default_loop_b() -> SensorMode {
    SensorMode::EventOffPixelTimestamp
}

fn default_loop_c() -> SensorMode {
    SensorMode::OpticalFlow
}

fn default_iso_level() -> u8 {
    2
}

impl Default for ModeConfig {
    fn default() -> Self {
        Self {
            fixed: SensorMode::default(),
            loop_enabled: false,
            loop_a: default_loop_a(),
            loop_b: default_loop_b(),
            loop_c: default_loop_c(),
            iso_level: default_iso_level(),
        }
    }
}

impl ModeConfig {
    pub fn loop_mode(&self, slot: LoopSlot) -> SensorMode {
        match slot {
            LoopSlot::A => self.loop_a,
            LoopSlot::B => self.loop_b,
            LoopSlot::C => self.loop_c,
        }
    }

    pub fn set_loop_mode(&mut self, slot: LoopSlot, mode: SensorMode) {
        match slot {
            LoopSlot::A => self.loop_a = mode,
            LoopSlot::B => self.loop_b = mode,
            LoopSlot::C => self.loop_c = mode,
        }
    }

    /// Fixed full-picture mode, the only mode FPN calibration runs in
    pub fn is_fixed_full_picture(&self) -> bool {
        !self.loop_enabled && self.fixed == SensorMode::FullPicture
    }
}

/// Event framing and rendering
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize, Validate)]
pub struct EventConfig {
    /// Sensor clock, drives the length of one time unit
    #[serde(default = "default_clock_mhz")]
    #[validate(range(min = 2, max = 200))]
    pub clock_mhz: u32,

    #[serde(default)]
    pub show: EventShowType,

    /// Events within the first `start_pos` units of a ByTime frame are dropped
    #[serde(default)]
    pub start_pos: u32,

    /// Count picture increment per event
    #[serde(default = "default_count_step")]
    #[validate(range(min = 1, max = 255))]
    pub count_step: u32,

    #[serde(default)]
    pub rotation: Rotation,
}

fn default_clock_mhz() -> u32 {
    100
}

fn default_count_step() -> u32 {
    9
}

impl Default for EventConfig {
    fn default() -> Self {
        Self {
            clock_mhz: default_clock_mhz(),
            show: EventShowType::default(),
            start_pos: 0,
            count_step: default_count_step(),
            rotation: Rotation::default(),
        }
    }
}

impl EventConfig {
    /// Row-timestamp units per millisecond (one unit = 2000 clock cycles)
    pub fn units_per_ms(&self) -> u32 {
        (self.clock_mhz / 2).max(1)
    }

    /// Per-second threshold used for event-rate publication
    pub fn units_per_second(&self) -> u64 {
        self.units_per_ms() as u64 * 1000
    }

    /// Microseconds per time unit
    pub fn us_per_unit(&self) -> f64 {
        1000.0 / self.units_per_ms() as f64
    }

    /// ByTime threshold in time units, `None` for other methods
    pub fn frame_time_units(&self) -> Option<u32> {
        match self.show {
            EventShowType::ByTime { frame_time_ms } => {
                Some(frame_time_ms.saturating_mul(self.units_per_ms()))
            }
            _ => None,
        }
    }
}

/// Module switches
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct ModuleConfig {
    /// Image synthesis; when off only event vectors are published
    #[serde(default = "default_true")]
    pub frame: bool,

    /// IMU alignment
    #[serde(default = "default_true")]
    pub imu: bool,
}

fn default_true() -> bool {
    true
}

impl Default for ModuleConfig {
    fn default() -> Self {
        Self {
            frame: true,
            imu: true,
        }
    }
}

/// FPN table settings
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct FpnConfig {
    /// Table loaded at startup
    #[serde(default)]
    pub path: Option<PathBuf>,
}

impl ProcessorConfig {
    /// Field ranges plus mode-combination rules
    pub fn validate_all(&self) -> Result<(), ContractError> {
        self.validate()
            .map_err(|e| ContractError::config_validation(first_field(&e), e.to_string()))?;
        self.check_event_show()?;
        self.check_modes()
    }

    fn check_event_show(&self) -> Result<(), ContractError> {
        match self.event.show {
            EventShowType::ByTime { frame_time_ms: 0 } => Err(ContractError::config_validation(
                "event.show.frame_time_ms",
                "frame time must be > 0",
            )),
            EventShowType::ByCount { events: 0 } => Err(ContractError::config_validation(
                "event.show.events",
                "event count threshold must be > 0",
            )),
            _ => Ok(()),
        }
    }

    /// Loop slot constraints, the loop + frame-off + ByStep rejection and
    /// the ADC requirement of full-picture and optical-flow decoding
    pub fn check_modes(&self) -> Result<(), ContractError> {
        let mode = &self.mode;
        if !mode.loop_enabled {
            return self.check_format();
        }

        if mode.loop_a != SensorMode::FullPicture {
            return Err(ContractError::invalid_mode(format!(
                "loop slot A must be full_picture, got {}",
                mode.loop_a
            )));
        }
        if !mode.loop_b.is_event_mode() {
            return Err(ContractError::invalid_mode(format!(
                "loop slot B must be an event mode, got {}",
                mode.loop_b
            )));
        }
        if !mode.loop_c.is_optical_flow_mode() {
            return Err(ContractError::invalid_mode(format!(
                "loop slot C must be an optical flow mode, got {}",
                mode.loop_c
            )));
        }
        if !self.modules.frame && self.event.show == EventShowType::ByStep {
            return Err(ContractError::invalid_mode(
                "loop mode with the frame module disabled cannot use by_step",
            ));
        }
        self.check_format()
    }

    fn check_format(&self) -> Result<(), ContractError> {
        let Some(format) = self.sensor.format() else {
            return Err(ContractError::config_validation(
                "sensor.mipi_format",
                format!("unknown MIPI format {}", self.sensor.mipi_format),
            ));
        };
        if format.carries_adc() {
            return Ok(());
        }

        let mode = &self.mode;
        let offending = if mode.loop_enabled {
            [mode.loop_a, mode.loop_b, mode.loop_c]
                .into_iter()
                .find(|m| !m.is_event_mode())
        } else {
            Some(mode.fixed).filter(|m| !m.is_event_mode())
        };
        match offending {
            Some(m) => Err(ContractError::config_validation(
                "sensor.mipi_format",
                format!("{} needs ADC data, which {} does not carry", m, format),
            )),
            None => Ok(()),
        }
    }
}

fn first_field(errors: &validator::ValidationErrors) -> String {
    errors
        .errors()
        .keys()
        .next()
        .map(|k| k.to_string())
        .unwrap_or_else(|| "config".to_string())
}
