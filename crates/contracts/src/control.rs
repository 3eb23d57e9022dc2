//! SensorControl trait - register programming seam
//!
//! Mode and ISO changes are accepted by the processor and forwarded here;
//! the implementation that actually writes sensor registers is external.

use std::sync::{Arc, Mutex};

use crate::{EventShowType, LoopSlot, SensorMode};

/// Request forwarded to the sensor
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ControlRequest {
    FixedMode(SensorMode),
    LoopMode { slot: LoopSlot, mode: SensorMode },
    LoopEnabled(bool),
    IsoLevel(u8),
    EventFrameTime { frame_time_ms: u32, clock_mhz: u32 },
    EventShow(EventShowType),
    MipiFormat(u8),
}

/// Receives accepted configuration requests
pub trait SensorControl: Send {
    fn forward(&mut self, request: ControlRequest);
}

/// Control sink that drops every request
#[derive(Debug, Default, Clone, Copy)]
pub struct NullControl;

impl SensorControl for NullControl {
    fn forward(&mut self, _request: ControlRequest) {}
}

/// Control sink that records requests; clones share the same log
#[derive(Debug, Default, Clone)]
pub struct RecordingControl {
    requests: Arc<Mutex<Vec<ControlRequest>>>,
}

impl RecordingControl {
    pub fn new() -> Self {
        Self::default()
    }

    /// Requests forwarded so far, oldest first
    pub fn requests(&self) -> Vec<ControlRequest> {
        self.requests
            .lock()
            .map(|r| r.clone())
            .unwrap_or_default()
    }
}

impl SensorControl for RecordingControl {
    fn forward(&mut self, request: ControlRequest) {
        if let Ok(mut requests) = self.requests.lock() {
            requests.push(request);
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_recording_control_shares_log() {
        let control = RecordingControl::new();
        let mut boxed: Box<dyn SensorControl> = Box::new(control.clone());
        boxed.forward(ControlRequest::IsoLevel(3));
        boxed.forward(ControlRequest::LoopEnabled(true));
        assert_eq!(
            control.requests(),
            vec![ControlRequest::IsoLevel(3), ControlRequest::LoopEnabled(true)]
        );
    }
}
