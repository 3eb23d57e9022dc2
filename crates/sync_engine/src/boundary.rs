//! Frame boundary policy.

use contracts::{EventConfig, EventShowType};

/// Why a frame was closed
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum BoundaryReason {
    /// ByTime threshold exceeded
    TimeElapsed,
    /// ByCount threshold reached
    CountReached,
    /// ByStep request
    StepRequested,
    /// Full-frame mode or loop sub-frame: the call carried one whole frame
    BatchComplete,
}

/// Framing counters the policy looks at
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct FrameCounters {
    pub per_frame_elapsed: u32,
    pub frame_events: u32,
    pub step_requested: bool,
}

/// Resolved EventShowType with its threshold in time units
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct FrameBoundaryPolicy {
    show: EventShowType,
    frame_time_units: u32,
}

impl FrameBoundaryPolicy {
    pub fn new(config: &EventConfig) -> Self {
        Self {
            show: config.show,
            frame_time_units: config.frame_time_units().unwrap_or(u32::MAX),
        }
    }

    pub fn show(&self) -> EventShowType {
        self.show
    }

    /// Cheap per-sample check
    #[inline]
    pub fn evaluate(&self, counters: &FrameCounters) -> Option<BoundaryReason> {
        match self.show {
            EventShowType::ByTime { .. } => (counters.per_frame_elapsed > self.frame_time_units)
                .then_some(BoundaryReason::TimeElapsed),
            EventShowType::ByCount { events } => {
                (counters.frame_events >= events).then_some(BoundaryReason::CountReached)
            }
            EventShowType::ByStep => counters
                .step_requested
                .then_some(BoundaryReason::StepRequested),
        }
    }
}
