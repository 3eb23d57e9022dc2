//! Frame synchronization engine.
//!
//! Combines the timestamp reconstructor, the boundary policy and the
//! event-rate accumulator into the per-sample state machine driven by the
//! processor.

use contracts::{DecodedSample, EventConfig, EventShowType};
use tracing::{debug, instrument, trace};

use crate::boundary::{BoundaryReason, FrameBoundaryPolicy, FrameCounters};
use crate::timestamp::{TimeCounters, TimeUpdate, TimestampReconstructor};

/// Result of observing one sample
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct SyncStep {
    pub update: TimeUpdate,
    /// Set when a second elapsed; carries the new events-per-second value
    pub event_rate: Option<u32>,
}

/// Per-sample framing state
#[derive(Debug)]
pub struct FrameSync {
    clock: TimestampReconstructor,
    policy: FrameBoundaryPolicy,
    /// Applied at the next boundary
    pending_policy: Option<FrameBoundaryPolicy>,
    start_pos: u32,
    units_per_second: u64,
    frame_events: u32,
    step_requested: bool,
    rate_accumulator: u32,
    event_rate: u32,
    frame_counter: u64,
    discontinuities: u64,
}

impl FrameSync {
    pub fn new(config: &EventConfig) -> Self {
        Self {
            clock: TimestampReconstructor::new(),
            policy: FrameBoundaryPolicy::new(config),
            pending_policy: None,
            start_pos: config.start_pos,
            units_per_second: config.units_per_second(),
            frame_events: 0,
            step_requested: false,
            rate_accumulator: 0,
            event_rate: 0,
            frame_counter: 0,
            discontinuities: 0,
        }
    }

    /// Advance time with one decoded sample
    pub fn observe(&mut self, sample: &DecodedSample, modulus: i32) -> SyncStep {
        let update = self.clock.observe(sample.row_timestamp, modulus);
        if let TimeUpdate::Discontinuity(diff) = update {
            self.discontinuities += 1;
            metrics::counter!("celex_timestamp_discontinuities_total").increment(1);
            trace!(diff, row_timestamp = sample.row_timestamp, "timestamp discontinuity");
        }

        let event_rate = if self.clock.take_second(self.units_per_second) {
            self.event_rate = self.rate_accumulator;
            self.rate_accumulator = 0;
            debug!(event_rate = self.event_rate, "event rate updated");
            Some(self.event_rate)
        } else {
            None
        };

        SyncStep { update, event_rate }
    }

    /// Whether an event at the current time belongs to the frame.
    ///
    /// Under ByTime, events in the first `start_pos` units are dropped.
    pub fn accepts_event(&self) -> bool {
        match self.policy.show() {
            EventShowType::ByTime { .. } => {
                self.clock.counters().per_frame_elapsed >= self.start_pos
            }
            _ => true,
        }
    }

    /// Record an accepted event
    pub fn count_event(&mut self) {
        self.frame_events = self.frame_events.saturating_add(1);
        self.rate_accumulator = self.rate_accumulator.saturating_add(1);
    }

    pub fn frame_counters(&self) -> FrameCounters {
        FrameCounters {
            per_frame_elapsed: self.clock.counters().per_frame_elapsed,
            frame_events: self.frame_events,
            step_requested: self.step_requested,
        }
    }

    /// Boundary check for the current counters
    #[inline]
    pub fn check_boundary(&self) -> Option<BoundaryReason> {
        self.policy.evaluate(&self.frame_counters())
    }

    /// Ask ByStep framing to close the current frame
    pub fn request_step(&mut self) {
        self.step_requested = true;
    }

    /// Close the frame: reset framing counters and assign the next number
    #[instrument(level = "trace", name = "frame_sync_complete", skip(self))]
    pub fn complete_frame(&mut self, reason: BoundaryReason) -> u64 {
        self.frame_counter += 1;
        self.clock.reset_frame();
        self.frame_events = 0;
        self.step_requested = false;

        if let Some(policy) = self.pending_policy.take() {
            debug!(show = ?policy.show(), "applying pending event show method");
            self.policy = policy;
        }

        trace!(frame_no = self.frame_counter, ?reason, "frame completed");
        self.frame_counter
    }

    /// Called at the start of every batch
    pub fn begin_package(&mut self) {
        self.clock.reset_package();
    }

    /// Drop the frame in progress without publishing it
    pub fn discard_frame(&mut self) {
        self.clock.reset_frame();
        self.frame_events = 0;
        self.step_requested = false;
    }

    /// Apply new event settings.
    ///
    /// A show-method change takes effect from the next accumulation cycle;
    /// if nothing has accumulated yet that is right now.
    pub fn set_event_config(&mut self, config: &EventConfig) {
        self.start_pos = config.start_pos;
        self.units_per_second = config.units_per_second();

        let policy = FrameBoundaryPolicy::new(config);
        let idle = self.frame_events == 0 && self.clock.counters().per_frame_elapsed == 0;
        if idle {
            self.policy = policy;
            self.pending_policy = None;
        } else if policy != self.policy {
            self.pending_policy = Some(policy);
        }
    }

    /// Forget all time state; frame numbers keep increasing
    pub fn reset_timestamp(&mut self) {
        self.clock.reset();
        self.frame_events = 0;
        self.step_requested = false;
        self.rate_accumulator = 0;
    }

    pub fn time(&self) -> &TimeCounters {
        self.clock.counters()
    }

    pub fn frame_no(&self) -> u64 {
        self.frame_counter
    }

    pub fn event_rate(&self) -> u32 {
        self.event_rate
    }

    pub fn discontinuities(&self) -> u64 {
        self.discontinuities
    }

    pub fn active_show(&self) -> EventShowType {
        self.policy.show()
    }
}
