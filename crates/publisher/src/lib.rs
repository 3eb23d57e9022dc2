//! # Publisher
//!
//! 输出发布模块。
//!
//! 负责：
//! - 帧边界时原子地发布图像、事件向量
//! - IMU 队列与事件率等标量
//! - 通过 watch 通道通知消费者
//! - 可选的落盘导出 (不阻塞处理链路)

pub mod error;
pub mod export;
pub mod metrics;
pub mod slot;
pub mod store;

use contracts::{EventPicType, FlowPicType, OutputKind};

pub use error::OutputError;
pub use export::{save_gray_png, EventFileFormat, ExportConfig, ExportHandle, ExportJob, FrameWriter};
pub use metrics::{ExportMetrics, ExportSnapshot, PublishMetrics, PublishSnapshot};
pub use slot::SnapshotSlot;
pub use store::{FrameNotice, FramePublication, OutputStore};

/// Stable, file-name-safe label for an output kind
pub fn kind_label(kind: OutputKind) -> &'static str {
    match kind {
        OutputKind::FullPicture => "full_picture",
        OutputKind::EventPicture(pic) => match pic {
            EventPicType::Binary => "event_binary",
            EventPicType::Accumulated => "event_accumulated",
            EventPicType::Gray => "event_gray",
            EventPicType::Count => "event_count",
            EventPicType::DenoisedBinary => "event_denoised_binary",
            EventPicType::Superimposed => "event_superimposed",
            EventPicType::DenoisedCount => "event_denoised_count",
        },
        OutputKind::OpticalFlowPicture(pic) => match pic {
            FlowPicType::Flow => "flow",
            FlowPicType::Speed => "flow_speed",
            FlowPicType::Direction => "flow_direction",
        },
    }
}
