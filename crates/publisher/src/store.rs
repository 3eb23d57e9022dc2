//! OutputStore - everything a consumer can read.
//!
//! One slot per output kind plus the event vector, the IMU queue, and the
//! scalar counters. A frame is published slot by slot; each slot swap is
//! atomic, and the watch notification goes out after the last slot so a
//! notified reader sees the whole frame.

use std::sync::atomic::{AtomicU32, AtomicU64, Ordering};
use std::sync::{Arc, Mutex};

use contracts::{
    EventBatch, EventPicType, FlowPicType, ImageFrame, ImuData, OutputKind, SensorMode,
};
use tokio::sync::watch;
use tracing::{debug, trace};

use crate::error::OutputError;
use crate::metrics::PublishMetrics;
use crate::slot::SnapshotSlot;

/// Sent on the watch channel after every publication
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct FrameNotice {
    pub frame_no: u64,
    pub timestamp_us: i64,
    pub mode: SensorMode,
    pub pictures: usize,
    pub events: usize,
}

/// Everything produced at one frame boundary
#[derive(Debug, Clone, Default)]
pub struct FramePublication {
    pub frame_no: u64,
    pub timestamp_us: i64,
    pub mode: SensorMode,
    pub full_picture: Option<ImageFrame>,
    pub event_pictures: Vec<(EventPicType, ImageFrame)>,
    pub flow_pictures: Vec<(FlowPicType, ImageFrame)>,
    pub events: Option<EventBatch>,
}

impl FramePublication {
    pub fn picture_count(&self) -> usize {
        self.full_picture.is_some() as usize + self.event_pictures.len() + self.flow_pictures.len()
    }
}

#[derive(Debug)]
pub struct OutputStore {
    full_picture: SnapshotSlot<ImageFrame>,
    event_pictures: [SnapshotSlot<ImageFrame>; 7],
    flow_pictures: [SnapshotSlot<ImageFrame>; 3],
    events: SnapshotSlot<EventBatch>,
    imu: Mutex<Vec<ImuData>>,
    event_rate: AtomicU32,
    frame_no: AtomicU64,
    notify: watch::Sender<FrameNotice>,
    metrics: PublishMetrics,
}

impl Default for OutputStore {
    fn default() -> Self {
        Self::new()
    }
}

impl OutputStore {
    pub fn new() -> Self {
        let (notify, _) = watch::channel(FrameNotice::default());
        Self {
            full_picture: SnapshotSlot::new(),
            event_pictures: Default::default(),
            flow_pictures: Default::default(),
            events: SnapshotSlot::new(),
            imu: Mutex::new(Vec::new()),
            event_rate: AtomicU32::new(0),
            frame_no: AtomicU64::new(0),
            notify,
            metrics: PublishMetrics::new(),
        }
    }

    pub fn shared() -> Arc<Self> {
        Arc::new(Self::new())
    }

    /// Publish one frame and notify subscribers
    pub fn publish(&self, frame: FramePublication) -> FrameNotice {
        let notice = FrameNotice {
            frame_no: frame.frame_no,
            timestamp_us: frame.timestamp_us,
            mode: frame.mode,
            pictures: frame.picture_count(),
            events: frame.events.as_ref().map_or(0, |b| b.events.len()),
        };

        if let Some(image) = frame.full_picture {
            self.full_picture.publish(image);
        }
        for (pic, image) in frame.event_pictures {
            self.event_pictures[pic.index()].publish(image);
        }
        for (pic, image) in frame.flow_pictures {
            self.flow_pictures[pic.index()].publish(image);
        }
        if let Some(batch) = frame.events {
            self.events.publish(batch);
            self.metrics.inc_event_batches();
        }

        self.frame_no.store(notice.frame_no, Ordering::Release);
        self.metrics.inc_frames();
        self.metrics.add_pictures(notice.pictures as u64);
        metrics::counter!("celex_frames_published_total", "mode" => notice.mode.as_str())
            .increment(1);

        // send_replace never fails, even with no receiver alive
        self.notify.send_replace(notice);
        trace!(frame_no = notice.frame_no, pictures = notice.pictures, "frame published");
        notice
    }

    /// Subscribe to frame notifications
    pub fn subscribe(&self) -> watch::Receiver<FrameNotice> {
        self.notify.subscribe()
    }

    fn slot(&self, kind: OutputKind) -> &SnapshotSlot<ImageFrame> {
        match kind {
            OutputKind::FullPicture => &self.full_picture,
            OutputKind::EventPicture(pic) => &self.event_pictures[pic.index()],
            OutputKind::OpticalFlowPicture(pic) => &self.flow_pictures[pic.index()],
        }
    }

    /// Shared handle to the latest image of `kind`
    pub fn picture_arc(&self, kind: OutputKind) -> Option<Arc<ImageFrame>> {
        self.slot(kind).latest()
    }

    /// Owned copy of the latest image of `kind`
    pub fn picture(&self, kind: OutputKind) -> Option<ImageFrame> {
        self.picture_arc(kind).map(|image| image.as_ref().clone())
    }

    /// Like [`picture`](Self::picture) but reports an empty slot as an error
    pub fn require_picture(&self, kind: OutputKind) -> Result<Arc<ImageFrame>, OutputError> {
        self.picture_arc(kind).ok_or_else(|| {
            self.metrics.inc_not_ready();
            OutputError::not_ready(kind)
        })
    }

    /// Copy the latest image into `buffer`, returning its size
    pub fn copy_picture(&self, kind: OutputKind, buffer: &mut Vec<u8>) -> Result<(u32, u32), OutputError> {
        let image = self.require_picture(kind)?;
        buffer.clear();
        buffer.extend_from_slice(&image.pixels);
        Ok((image.width, image.height))
    }

    /// Latest event vector
    pub fn event_batch(&self) -> Option<Arc<EventBatch>> {
        self.events.latest()
    }

    /// Latest event vector if published after the caller's cursor `seen`
    pub fn events_since(&self, seen: &mut u64) -> Option<Arc<EventBatch>> {
        self.events.read_since(seen)
    }

    pub fn push_imu(&self, samples: Vec<ImuData>) {
        if samples.is_empty() {
            return;
        }
        self.metrics.add_imu_samples(samples.len() as u64);
        metrics::counter!("celex_imu_samples_total").increment(samples.len() as u64);
        self.imu
            .lock()
            .unwrap_or_else(|e| e.into_inner())
            .extend(samples);
    }

    /// Take every queued IMU sample, oldest first
    pub fn drain_imu(&self) -> Vec<ImuData> {
        let drained = std::mem::take(&mut *self.imu.lock().unwrap_or_else(|e| e.into_inner()));
        if !drained.is_empty() {
            debug!(count = drained.len(), "imu queue drained");
        }
        drained
    }

    pub fn imu_pending(&self) -> usize {
        self.imu.lock().unwrap_or_else(|e| e.into_inner()).len()
    }

    pub fn set_event_rate(&self, rate: u32) {
        self.event_rate.store(rate, Ordering::Release);
        metrics::gauge!("celex_event_rate").set(rate as f64);
    }

    pub fn event_rate(&self) -> u32 {
        self.event_rate.load(Ordering::Acquire)
    }

    pub fn frame_no(&self) -> u64 {
        self.frame_no.load(Ordering::Acquire)
    }

    pub fn metrics(&self) -> &PublishMetrics {
        &self.metrics
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use contracts::{EventData, Vector3};

    fn image(frame_no: u64, value: u8) -> ImageFrame {
        ImageFrame {
            width: 2,
            height: 2,
            frame_no,
            timestamp_us: 0,
            pixels: vec![value; 4],
        }
    }

    fn imu(ts: i64) -> ImuData {
        ImuData {
            gyroscope: Vector3::new(0.0, 0.0, 0.0),
            accelerometer: Vector3::new(0.0, 0.0, 1.0),
            magnetometer: Vector3::new(0.0, 0.0, 0.0),
            temperature: 21.0,
            timestamp_us: ts,
            t_units: 0,
        }
    }

    #[test]
    fn test_not_ready_before_publish() {
        let store = OutputStore::new();
        let kind = OutputKind::EventPicture(EventPicType::Binary);
        assert!(store.picture(kind).is_none());
        let err = store.require_picture(kind).unwrap_err();
        assert!(matches!(err, OutputError::BufferNotReady { .. }));
        assert_eq!(store.metrics().snapshot().not_ready, 1);
    }

    #[test]
    fn test_publish_routes_kinds() {
        let store = OutputStore::new();
        let notice = store.publish(FramePublication {
            frame_no: 3,
            mode: SensorMode::EventOffPixelTimestamp,
            event_pictures: vec![
                (EventPicType::Binary, image(3, 255)),
                (EventPicType::Count, image(3, 9)),
            ],
            events: Some(EventBatch {
                frame_no: 3,
                events: vec![EventData {
                    row: 0,
                    col: 1,
                    adc: None,
                    t_off_pixel: 0,
                }],
                ..Default::default()
            }),
            ..Default::default()
        });

        assert_eq!(notice.pictures, 2);
        assert_eq!(notice.events, 1);
        assert_eq!(store.frame_no(), 3);
        let count = store
            .picture(OutputKind::EventPicture(EventPicType::Count))
            .unwrap();
        assert_eq!(count.pixels, vec![9; 4]);
        assert!(store.picture(OutputKind::FullPicture).is_none());
        let mut seen = 0;
        assert_eq!(store.events_since(&mut seen).unwrap().frame_no, 3);
        assert!(store.events_since(&mut seen).is_none());

        // a second reader still gets the batch
        let mut other = 0;
        assert_eq!(store.events_since(&mut other).unwrap().frame_no, 3);
    }

    #[test]
    fn test_copy_picture() {
        let store = OutputStore::new();
        store.publish(FramePublication {
            frame_no: 1,
            full_picture: Some(image(1, 42)),
            ..Default::default()
        });
        let mut buffer = vec![0; 100];
        let size = store.copy_picture(OutputKind::FullPicture, &mut buffer).unwrap();
        assert_eq!(size, (2, 2));
        assert_eq!(buffer, vec![42; 4]);
    }

    #[test]
    fn test_imu_drain_order() {
        let store = OutputStore::new();
        store.push_imu(vec![imu(1), imu(2)]);
        store.push_imu(vec![imu(3)]);
        assert_eq!(store.imu_pending(), 3);
        let stamps: Vec<_> = store.drain_imu().iter().map(|d| d.timestamp_us).collect();
        assert_eq!(stamps, vec![1, 2, 3]);
        assert!(store.drain_imu().is_empty());
    }

    #[tokio::test]
    async fn test_watch_notifies_subscriber() {
        let store = Arc::new(OutputStore::new());
        let mut rx = store.subscribe();

        let writer = Arc::clone(&store);
        tokio::spawn(async move {
            writer.publish(FramePublication {
                frame_no: 1,
                full_picture: Some(image(1, 7)),
                ..Default::default()
            });
        });

        rx.changed().await.unwrap();
        let notice = *rx.borrow_and_update();
        assert_eq!(notice.frame_no, 1);
        assert_eq!(store.picture(OutputKind::FullPicture).unwrap().frame_no, 1);
    }
}
