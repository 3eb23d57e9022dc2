//! Pixel accumulation buffers.
//!
//! The decode path writes into the working buffers. At a frame boundary
//! `freeze` copies them into a [`FrameSnapshot`] which image synthesis reads;
//! synthesis never touches the working set.

use contracts::{DecodedSample, EventData, SensorGeometry};

use crate::adc::adc_to_gray;
use crate::fpn::FpnTable;

/// Gray level written for events without ADC data
pub const BINARY_EVENT_GRAY: u8 = 255;

/// Stable accumulation state of one completed frame
#[derive(Debug, Clone)]
pub struct FrameSnapshot {
    pub geometry: SensorGeometry,
    /// Events per pixel in the frame
    pub event_count: Vec<u8>,
    /// Last gray level per pixel, persists across frames
    pub accumulated: Vec<u8>,
    /// Last corrected ADC per pixel, persists across frames
    pub last_adc: Vec<u16>,
    /// Optical-flow firing time per pixel, 0 = did not fire
    pub flow_time: Vec<u16>,
    pub events: Vec<EventData>,
}

impl FrameSnapshot {
    pub fn new(geometry: SensorGeometry) -> Self {
        let n = geometry.pixel_count();
        Self {
            geometry,
            event_count: vec![0; n],
            accumulated: vec![0; n],
            last_adc: vec![0; n],
            flow_time: vec![0; n],
            events: Vec::new(),
        }
    }

    fn copy_from(&mut self, other: &FrameSnapshot) {
        self.event_count.copy_from_slice(&other.event_count);
        self.accumulated.copy_from_slice(&other.accumulated);
        self.last_adc.copy_from_slice(&other.last_adc);
        self.flow_time.copy_from_slice(&other.flow_time);
        self.events.clear();
        self.events.extend_from_slice(&other.events);
    }
}

/// Working buffers plus the last frozen frame
#[derive(Debug, Clone)]
pub struct BufferAccumulator {
    working: FrameSnapshot,
    frozen: FrameSnapshot,
    frame_samples: u64,
}

impl BufferAccumulator {
    /// Allocates every buffer once
    pub fn new(geometry: SensorGeometry) -> Self {
        Self {
            working: FrameSnapshot::new(geometry),
            frozen: FrameSnapshot::new(geometry),
            frame_samples: 0,
        }
    }

    pub fn geometry(&self) -> SensorGeometry {
        self.working.geometry
    }

    /// Record an event-mode sample.
    ///
    /// Returns false when the address lies outside the array.
    #[inline]
    pub fn record_event(&mut self, sample: &DecodedSample, fpn: &FpnTable, t_off_pixel: u32) -> bool {
        let Some(index) = self.working.geometry.index(sample.row, sample.col) else {
            return false;
        };
        let w = &mut self.working;
        w.event_count[index] = w.event_count[index].saturating_add(1);

        let adc = sample.adc.map(|raw| fpn.correct(index, raw));
        match adc {
            Some(adc) => {
                w.last_adc[index] = adc;
                w.accumulated[index] = adc_to_gray(adc);
            }
            None => w.accumulated[index] = BINARY_EVENT_GRAY,
        }
        w.events.push(EventData {
            row: sample.row,
            col: sample.col,
            adc,
            t_off_pixel,
        });
        self.frame_samples += 1;
        true
    }

    /// Record a full-frame ADC sample
    #[inline]
    pub fn record_full_frame(&mut self, sample: &DecodedSample, fpn: &FpnTable) -> bool {
        let Some(index) = self.working.geometry.index(sample.row, sample.col) else {
            return false;
        };
        if let Some(raw) = sample.adc {
            self.working.last_adc[index] = fpn.correct(index, raw);
        }
        self.frame_samples += 1;
        true
    }

    /// Record an optical-flow sample; the ADC field carries the firing time
    #[inline]
    pub fn record_flow(&mut self, sample: &DecodedSample) -> bool {
        let Some(index) = self.working.geometry.index(sample.row, sample.col) else {
            return false;
        };
        let w = &mut self.working;
        w.flow_time[index] = sample.adc.unwrap_or(1).clamp(1, contracts::ADC_MAX);
        w.event_count[index] = w.event_count[index].saturating_add(1);
        self.frame_samples += 1;
        true
    }

    /// Samples recorded since the last freeze or discard
    pub fn frame_samples(&self) -> u64 {
        self.frame_samples
    }

    /// Take a stable copy of the frame and reset the per-frame buffers
    pub fn freeze(&mut self) -> &FrameSnapshot {
        self.frozen.copy_from(&self.working);
        self.clear_frame();
        &self.frozen
    }

    /// Last frozen frame
    pub fn frozen(&self) -> &FrameSnapshot {
        &self.frozen
    }

    /// Drop per-frame state without freezing
    pub fn clear_frame(&mut self) {
        self.working.event_count.fill(0);
        self.working.flow_time.fill(0);
        self.working.events.clear();
        self.frame_samples = 0;
    }

    /// Drop everything, persistent buffers included
    pub fn reset(&mut self) {
        self.clear_frame();
        self.working.accumulated.fill(0);
        self.working.last_adc.fill(0);
    }
}
