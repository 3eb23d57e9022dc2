//! Imaging - pixel buffers, FPN correction, image and optical-flow synthesis
//!
//! Data flow: decoded samples are recorded into [`BufferAccumulator`]; at a
//! frame boundary the accumulator is frozen and [`ImageSynthesizer`] renders
//! the requested pictures from the frozen copy.

pub mod accumulator;
pub mod adc;
pub mod flow;
pub mod fpn;
pub mod synth;

pub use accumulator::{BufferAccumulator, FrameSnapshot, BINARY_EVENT_GRAY};
pub use adc::{adc_to_gray, normalize_adc};
pub use flow::{FlowField, OpticalFlowEstimator, FLOW_MIN_NEIGHBORS};
pub use fpn::{FpnCalibrator, FpnTable};
pub use synth::{denoise_score, rotate, FrameStamp, ImageSynthesizer, DENOISE_MIN_NEIGHBORS};
