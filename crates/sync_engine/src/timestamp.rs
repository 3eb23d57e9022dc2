//! Row-timestamp reconstruction.
//!
//! The sensor stamps rows with a narrow wrapping counter. This module turns
//! the sequence of row-local values into a monotonic time base.

use contracts::DISCONTINUITY_THRESHOLD;

/// Time counters, all in sensor time units
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct TimeCounters {
    /// Last row-local value seen, -1 before the first sample
    pub last_row_timestamp: i32,
    /// Monotonic, never reset except by an explicit timestamp reset
    pub total_elapsed: u64,
    /// Reset at every frame boundary
    pub per_frame_elapsed: u32,
    /// Reset when it crosses one second
    pub per_second_elapsed: u64,
    /// Reset at the start of every call
    pub per_package_elapsed: u32,
}

impl Default for TimeCounters {
    fn default() -> Self {
        Self {
            last_row_timestamp: -1,
            total_elapsed: 0,
            per_frame_elapsed: 0,
            per_second_elapsed: 0,
            per_package_elapsed: 0,
        }
    }
}

/// Outcome of observing one row timestamp
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum TimeUpdate {
    /// First sample ever; the base was anchored to it
    Anchored,
    /// Counters advanced by the (wrap-corrected) delta
    Advanced(u32),
    /// Delta too large, counters untouched
    Discontinuity(i32),
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
enum TrackState {
    #[default]
    Uninitialized,
    Tracking,
}

/// Wrapping-counter state machine
#[derive(Debug, Clone, Default)]
pub struct TimestampReconstructor {
    state: TrackState,
    counters: TimeCounters,
}

impl TimestampReconstructor {
    pub fn new() -> Self {
        Self::default()
    }

    /// Feed one row-local timestamp.
    ///
    /// `modulus` is the active format's counter range; a negative delta is
    /// corrected by adding it once.
    pub fn observe(&mut self, row_timestamp: i32, modulus: i32) -> TimeUpdate {
        if self.state == TrackState::Uninitialized {
            self.state = TrackState::Tracking;
            self.counters.total_elapsed = row_timestamp.max(0) as u64;
            self.counters.last_row_timestamp = row_timestamp;
            return TimeUpdate::Anchored;
        }

        let mut diff = row_timestamp - self.counters.last_row_timestamp;
        if diff < 0 {
            diff += modulus;
        }
        self.counters.last_row_timestamp = row_timestamp;

        if (0..DISCONTINUITY_THRESHOLD).contains(&diff) {
            let delta = diff as u32;
            let c = &mut self.counters;
            c.per_frame_elapsed = c.per_frame_elapsed.saturating_add(delta);
            c.total_elapsed += delta as u64;
            c.per_second_elapsed += delta as u64;
            c.per_package_elapsed = c.per_package_elapsed.saturating_add(delta);
            TimeUpdate::Advanced(delta)
        } else {
            TimeUpdate::Discontinuity(diff)
        }
    }

    /// Clears `per_second_elapsed` once it exceeds `threshold`
    pub fn take_second(&mut self, threshold: u64) -> bool {
        if self.counters.per_second_elapsed > threshold {
            self.counters.per_second_elapsed = 0;
            true
        } else {
            false
        }
    }

    pub fn reset_frame(&mut self) {
        self.counters.per_frame_elapsed = 0;
    }

    pub fn reset_package(&mut self) {
        self.counters.per_package_elapsed = 0;
    }

    /// Back to Uninitialized with every counter zeroed
    pub fn reset(&mut self) {
        *self = Self::default();
    }

    pub fn is_tracking(&self) -> bool {
        self.state == TrackState::Tracking
    }

    pub fn counters(&self) -> &TimeCounters {
        &self.counters
    }
}
