//! Frame consumer: waits on publication notices and queues exports.

use std::sync::Arc;

use contracts::{EventPicType, FlowPicType, OutputKind};
use publisher::{ExportHandle, ExportJob, FrameNotice, OutputStore};
use tokio::sync::{oneshot, watch};
use tracing::{debug, trace};

/// Counters returned when the consumer stops
#[derive(Debug, Clone, Copy, Default)]
pub struct ConsumerTally {
    pub frames_observed: u64,
    pub frames_skipped: u64,
    pub jobs_queued: u64,
}

pub struct FrameConsumer {
    output: Arc<OutputStore>,
    notices: watch::Receiver<FrameNotice>,
    export: Option<ExportHandle>,
    last_frame: u64,
    events_seen: u64,
    tally: ConsumerTally,
}

impl FrameConsumer {
    pub fn new(output: Arc<OutputStore>, export: Option<ExportHandle>) -> Self {
        let notices = output.subscribe();
        Self {
            output,
            notices,
            export,
            last_frame: 0,
            events_seen: 0,
            tally: ConsumerTally::default(),
        }
    }

    /// Run until `stop` fires, then pick up a final pending notice.
    ///
    /// The export handle is drained before returning.
    pub async fn run(mut self, mut stop: oneshot::Receiver<()>) -> ConsumerTally {
        loop {
            tokio::select! {
                changed = self.notices.changed() => {
                    if changed.is_err() {
                        break;
                    }
                    self.handle_latest();
                }
                _ = &mut stop => break,
            }
        }

        if self.notices.has_changed().unwrap_or(false) {
            self.handle_latest();
        }
        if let Some(export) = self.export.take() {
            export.shutdown().await;
        }
        debug!(
            observed = self.tally.frames_observed,
            skipped = self.tally.frames_skipped,
            "frame consumer stopped"
        );
        self.tally
    }

    fn handle_latest(&mut self) {
        let notice = *self.notices.borrow_and_update();
        if notice.frame_no <= self.last_frame {
            return;
        }
        self.tally.frames_observed += 1;
        self.tally.frames_skipped += notice.frame_no - self.last_frame - 1;
        self.last_frame = notice.frame_no;
        trace!(frame_no = notice.frame_no, mode = %notice.mode, "frame notice");

        let Some(export) = &self.export else {
            return;
        };

        let mut queued = 0;
        for kind in output_kinds() {
            // 只导出本帧发布的图像
            let Some(image) = self.output.picture_arc(kind) else {
                continue;
            };
            if image.frame_no == notice.frame_no && export.try_send(ExportJob::Picture { kind, image }) {
                queued += 1;
            }
        }
        if let Some(batch) = self.output.events_since(&mut self.events_seen) {
            if batch.frame_no == notice.frame_no && export.try_send(ExportJob::Events(batch)) {
                queued += 1;
            }
        }
        self.tally.jobs_queued += queued;
        observability::record_export_queue(export.metrics().queue_len());
    }
}

fn output_kinds() -> impl Iterator<Item = OutputKind> {
    std::iter::once(OutputKind::FullPicture)
        .chain(EventPicType::ALL.into_iter().map(OutputKind::EventPicture))
        .chain(FlowPicType::ALL.into_iter().map(OutputKind::OpticalFlowPicture))
}
