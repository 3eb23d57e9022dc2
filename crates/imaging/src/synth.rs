//! Image synthesis from a frozen frame.

use contracts::{EventPicType, FlowPicType, ImageFrame, OutputKind, Rotation, SensorGeometry};

use crate::accumulator::{FrameSnapshot, BINARY_EVENT_GRAY};
use crate::adc::adc_to_gray;
use crate::flow::FlowField;

/// A pixel passes the denoise test with at least this many active neighbors
pub const DENOISE_MIN_NEIGHBORS: u8 = 2;

/// Number of active pixels among the 8 neighbors of (row, col)
pub fn denoise_score(active: &[u8], geometry: SensorGeometry, row: u16, col: u16) -> u8 {
    let mut score = 0;
    for dr in -1i32..=1 {
        for dc in -1i32..=1 {
            if dr == 0 && dc == 0 {
                continue;
            }
            let (r, c) = (row as i32 + dr, col as i32 + dc);
            if r < 0 || c < 0 {
                continue;
            }
            if let Some(i) = geometry.index(r as u16, c as u16) {
                if active[i] > 0 {
                    score += 1;
                }
            }
        }
    }
    score
}

/// Frame metadata stamped onto every synthesized image
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct FrameStamp {
    pub frame_no: u64,
    pub timestamp_us: i64,
}

/// Renders output images from a frame snapshot
#[derive(Debug, Clone, Copy)]
pub struct ImageSynthesizer {
    rotation: Rotation,
    count_step: u8,
}

impl ImageSynthesizer {
    pub fn new(rotation: Rotation, count_step: u8) -> Self {
        Self {
            rotation,
            count_step: count_step.max(1),
        }
    }

    pub fn rotation(&self) -> Rotation {
        self.rotation
    }

    /// Render one output kind.
    ///
    /// Flow kinds without a flow field produce a blank image.
    pub fn render(
        &self,
        kind: OutputKind,
        frame: &FrameSnapshot,
        flow: Option<&FlowField>,
        stamp: FrameStamp,
    ) -> ImageFrame {
        let pixels = match kind {
            OutputKind::FullPicture => frame.last_adc.iter().map(|&a| adc_to_gray(a)).collect(),
            OutputKind::EventPicture(pic) => self.event_pixels(pic, frame),
            OutputKind::OpticalFlowPicture(pic) => match flow {
                Some(field) => match pic {
                    FlowPicType::Flow => field.flow.clone(),
                    FlowPicType::Speed => field.speed.clone(),
                    FlowPicType::Direction => field.direction.clone(),
                },
                None => vec![0; frame.geometry.pixel_count()],
            },
        };
        self.finish(frame.geometry, pixels, stamp)
    }

    /// All seven event pictures
    pub fn render_events(&self, frame: &FrameSnapshot, stamp: FrameStamp) -> Vec<(EventPicType, ImageFrame)> {
        EventPicType::ALL
            .iter()
            .map(|&pic| {
                let pixels = self.event_pixels(pic, frame);
                (pic, self.finish(frame.geometry, pixels, stamp))
            })
            .collect()
    }

    fn event_pixels(&self, pic: EventPicType, frame: &FrameSnapshot) -> Vec<u8> {
        let g = frame.geometry;
        let count = &frame.event_count;
        let step = self.count_step;
        let passes = |i: usize| {
            let row = (i / g.cols as usize) as u16;
            let col = (i % g.cols as usize) as u16;
            denoise_score(count, g, row, col) >= DENOISE_MIN_NEIGHBORS
        };

        match pic {
            EventPicType::Binary => count.iter().map(|&n| if n > 0 { 255 } else { 0 }).collect(),
            EventPicType::Accumulated => frame.accumulated.clone(),
            EventPicType::Gray => count
                .iter()
                .zip(&frame.accumulated)
                .map(|(&n, &gray)| if n > 0 { gray } else { 0 })
                .collect(),
            EventPicType::Count => count.iter().map(|&n| n.saturating_mul(step)).collect(),
            EventPicType::DenoisedBinary => (0..count.len())
                .map(|i| if count[i] > 0 && passes(i) { 255 } else { 0 })
                .collect(),
            EventPicType::Superimposed => count
                .iter()
                .zip(&frame.accumulated)
                .map(|(&n, &gray)| if n > 0 { BINARY_EVENT_GRAY } else { gray })
                .collect(),
            EventPicType::DenoisedCount => (0..count.len())
                .map(|i| {
                    if count[i] > 0 && passes(i) {
                        count[i].saturating_mul(step)
                    } else {
                        0
                    }
                })
                .collect(),
        }
    }

    fn finish(&self, geometry: SensorGeometry, pixels: Vec<u8>, stamp: FrameStamp) -> ImageFrame {
        let (pixels, width, height) = rotate(
            pixels,
            geometry.cols as u32,
            geometry.rows as u32,
            self.rotation,
        );
        ImageFrame {
            width,
            height,
            frame_no: stamp.frame_no,
            timestamp_us: stamp.timestamp_us,
            pixels,
        }
    }
}

/// Rotate a row-major image clockwise; returns the new pixels and size
pub fn rotate(pixels: Vec<u8>, width: u32, height: u32, rotation: Rotation) -> (Vec<u8>, u32, u32) {
    let (w, h) = (width as usize, height as usize);
    match rotation {
        Rotation::Deg0 => (pixels, width, height),
        Rotation::Deg180 => {
            let mut out = pixels;
            out.reverse();
            (out, width, height)
        }
        Rotation::Deg90 => {
            let mut out = vec![0; pixels.len()];
            for y in 0..h {
                for x in 0..w {
                    out[x * h + (h - 1 - y)] = pixels[y * w + x];
                }
            }
            (out, height, width)
        }
        Rotation::Deg270 => {
            let mut out = vec![0; pixels.len()];
            for y in 0..h {
                for x in 0..w {
                    out[(w - 1 - x) * h + y] = pixels[y * w + x];
                }
            }
            (out, height, width)
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::accumulator::BufferAccumulator;
    use crate::fpn::FpnTable;
    use contracts::DecodedSample;

    const STAMP: FrameStamp = FrameStamp {
        frame_no: 7,
        timestamp_us: 1_000,
    };

    fn frame_with(g: SensorGeometry, events: &[(u16, u16, Option<u16>)]) -> FrameSnapshot {
        let fpn = FpnTable::zero(g);
        let mut acc = BufferAccumulator::new(g);
        for &(row, col, adc) in events {
            let sample = DecodedSample {
                row,
                col,
                adc,
                row_timestamp: 0,
                is_event: true,
            };
            acc.record_event(&sample, &fpn, 0);
        }
        acc.freeze().clone()
    }

    #[test]
    fn test_rotate_90_and_270() {
        // 3 wide, 2 high
        let px = vec![1, 2, 3, 4, 5, 6];
        let (out, w, h) = rotate(px.clone(), 3, 2, Rotation::Deg90);
        assert_eq!((w, h), (2, 3));
        assert_eq!(out, vec![4, 1, 5, 2, 6, 3]);

        let (out, w, h) = rotate(px.clone(), 3, 2, Rotation::Deg270);
        assert_eq!((w, h), (2, 3));
        assert_eq!(out, vec![3, 6, 2, 5, 1, 4]);

        let (out, _, _) = rotate(px, 3, 2, Rotation::Deg180);
        assert_eq!(out, vec![6, 5, 4, 3, 2, 1]);
    }

    #[test]
    fn test_denoise_score() {
        let g = SensorGeometry::new(3, 3);
        let active = [1, 1, 0, 0, 1, 0, 0, 0, 1];
        assert_eq!(denoise_score(&active, g, 1, 1), 3);
        assert_eq!(denoise_score(&active, g, 0, 0), 2);
        assert_eq!(denoise_score(&active, g, 2, 2), 1);
    }

    #[test]
    fn test_binary_and_count_pictures() {
        let g = SensorGeometry::new(2, 2);
        let frame = frame_with(g, &[(0, 0, None), (0, 0, None), (1, 1, None)]);
        let synth = ImageSynthesizer::new(Rotation::Deg0, 100);

        let binary = synth.render(OutputKind::EventPicture(EventPicType::Binary), &frame, None, STAMP);
        assert_eq!(binary.pixels, vec![255, 0, 0, 255]);
        assert_eq!(binary.frame_no, 7);
        assert_eq!((binary.width, binary.height), (2, 2));

        let count = synth.render(OutputKind::EventPicture(EventPicType::Count), &frame, None, STAMP);
        assert_eq!(count.pixels, vec![200, 0, 0, 100]);
    }

    #[test]
    fn test_count_saturates() {
        let g = SensorGeometry::new(1, 1);
        let frame = frame_with(g, &[(0, 0, None); 3]);
        let synth = ImageSynthesizer::new(Rotation::Deg0, 200);
        let count = synth.render(OutputKind::EventPicture(EventPicType::Count), &frame, None, STAMP);
        assert_eq!(count.pixels, vec![255]);
    }

    #[test]
    fn test_denoised_drops_isolated_events() {
        let g = SensorGeometry::new(4, 4);
        // 左上角一簇 3 个，右下角孤立 1 个
        let frame = frame_with(g, &[(0, 0, None), (0, 1, None), (1, 0, None), (3, 3, None)]);
        let synth = ImageSynthesizer::new(Rotation::Deg0, 9);
        let img = synth.render(OutputKind::EventPicture(EventPicType::DenoisedBinary), &frame, None, STAMP);
        assert_eq!(img.pixel(0, 0), Some(255));
        assert_eq!(img.pixel(1, 0), Some(255));
        assert_eq!(img.pixel(0, 1), Some(255));
        assert_eq!(img.pixel(3, 3), Some(0));
    }

    #[test]
    fn test_gray_accumulated_superimposed() {
        let g = SensorGeometry::new(1, 2);
        let fpn = FpnTable::zero(g);
        let mut acc = BufferAccumulator::new(g);
        let sample = |col, adc| DecodedSample {
            row: 0,
            col,
            adc: Some(adc),
            row_timestamp: 0,
            is_event: true,
        };
        acc.record_event(&sample(0, 0x100), &fpn, 0);
        acc.freeze();
        acc.record_event(&sample(1, 0x200), &fpn, 0);
        let frame = acc.freeze().clone();
        let synth = ImageSynthesizer::new(Rotation::Deg0, 9);
        let render = |pic| synth.render(OutputKind::EventPicture(pic), &frame, None, STAMP).pixels;

        assert_eq!(render(EventPicType::Gray), vec![0, 0x20]);
        assert_eq!(render(EventPicType::Accumulated), vec![0x10, 0x20]);
        assert_eq!(render(EventPicType::Superimposed), vec![0x10, 255]);
        assert_eq!(synth.render_events(&frame, STAMP).len(), 7);
    }

    #[test]
    fn test_flow_without_field_is_blank() {
        let g = SensorGeometry::new(2, 3);
        let frame = FrameSnapshot::new(g);
        let synth = ImageSynthesizer::new(Rotation::Deg90, 9);
        let img = synth.render(OutputKind::OpticalFlowPicture(FlowPicType::Speed), &frame, None, STAMP);
        assert_eq!((img.width, img.height), (2, 3));
        assert!(img.pixels.iter().all(|&p| p == 0));
    }
}
