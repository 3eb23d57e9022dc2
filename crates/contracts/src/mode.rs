//! 传感器工作模式与输出类型
//!
//! 固定模式 / 循环模式、帧边界策略、旋转、输出图像种类。

use serde::{Deserialize, Serialize};

/// 传感器工作模式
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum SensorMode {
    /// 事件模式，片外时间戳
    #[default]
    EventOffPixelTimestamp,
    /// 事件模式，片内时间戳
    EventInPixelTimestamp,
    /// 事件模式，带亮度 (ADC)
    EventIntensity,
    /// 全幅灰度图模式
    FullPicture,
    /// 光流模式
    OpticalFlow,
    /// 光流模式 (FPN 采集)
    OpticalFlowFpn,
    /// 多次读出光流模式
    MultiReadOpticalFlow,
}

impl SensorMode {
    /// 全部模式
    pub const ALL: [SensorMode; 7] = [
        SensorMode::EventOffPixelTimestamp,
        SensorMode::EventInPixelTimestamp,
        SensorMode::EventIntensity,
        SensorMode::FullPicture,
        SensorMode::OpticalFlow,
        SensorMode::OpticalFlowFpn,
        SensorMode::MultiReadOpticalFlow,
    ];

    /// 事件模式：帧边界由 FrameBoundaryPolicy 决定
    pub fn is_event_mode(self) -> bool {
        matches!(
            self,
            SensorMode::EventOffPixelTimestamp
                | SensorMode::EventInPixelTimestamp
                | SensorMode::EventIntensity
        )
    }

    /// 光流模式
    pub fn is_optical_flow_mode(self) -> bool {
        matches!(
            self,
            SensorMode::OpticalFlow
                | SensorMode::OpticalFlowFpn
                | SensorMode::MultiReadOpticalFlow
        )
    }

    /// 全帧模式：每次调用携带完整一帧
    pub fn is_full_frame_mode(self) -> bool {
        !self.is_event_mode()
    }

    pub fn as_str(self) -> &'static str {
        match self {
            SensorMode::EventOffPixelTimestamp => "event_off_pixel_timestamp",
            SensorMode::EventInPixelTimestamp => "event_in_pixel_timestamp",
            SensorMode::EventIntensity => "event_intensity",
            SensorMode::FullPicture => "full_picture",
            SensorMode::OpticalFlow => "optical_flow",
            SensorMode::OpticalFlowFpn => "optical_flow_fpn",
            SensorMode::MultiReadOpticalFlow => "multi_read_optical_flow",
        }
    }
}

impl std::fmt::Display for SensorMode {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.as_str())
    }
}

/// 循环模式槽位 (A / B / C)
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum LoopSlot {
    #[default]
    A,
    B,
    C,
}

impl LoopSlot {
    /// 由循环序号 (1..=3) 构造
    pub fn from_index(index: u8) -> Option<Self> {
        match index {
            1 => Some(LoopSlot::A),
            2 => Some(LoopSlot::B),
            3 => Some(LoopSlot::C),
            _ => None,
        }
    }

    /// 循环序号 (1..=3)
    pub fn index(self) -> u8 {
        match self {
            LoopSlot::A => 1,
            LoopSlot::B => 2,
            LoopSlot::C => 3,
        }
    }

    /// 下一个槽位，C 之后回到 A
    pub fn next(self) -> Self {
        match self {
            LoopSlot::A => LoopSlot::B,
            LoopSlot::B => LoopSlot::C,
            LoopSlot::C => LoopSlot::A,
        }
    }
}

/// 事件帧显示方式 (帧边界策略)
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "method", rename_all = "snake_case")]
pub enum EventShowType {
    /// 按时间：帧内时间计数超过 frame_time_ms 对应的时间单位数
    ByTime { frame_time_ms: u32 },
    /// 按事件数：帧内事件数达到阈值
    ByCount { events: u32 },
    /// 外部驱动
    ByStep,
}

impl Default for EventShowType {
    fn default() -> Self {
        EventShowType::ByTime { frame_time_ms: 30 }
    }
}

/// 输出图像旋转 (顺时针)
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Rotation {
    #[default]
    Deg0,
    Deg90,
    Deg180,
    Deg270,
}

impl Rotation {
    /// 由角度构造，仅支持 0/90/180/270
    pub fn from_degrees(degrees: u16) -> Option<Self> {
        match degrees {
            0 => Some(Rotation::Deg0),
            90 => Some(Rotation::Deg90),
            180 => Some(Rotation::Deg180),
            270 => Some(Rotation::Deg270),
            _ => None,
        }
    }

    pub fn degrees(self) -> u16 {
        match self {
            Rotation::Deg0 => 0,
            Rotation::Deg90 => 90,
            Rotation::Deg180 => 180,
            Rotation::Deg270 => 270,
        }
    }

    /// 是否交换宽高
    pub fn swaps_axes(self) -> bool {
        matches!(self, Rotation::Deg90 | Rotation::Deg270)
    }
}

/// 事件图像类型
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum EventPicType {
    /// 二值图
    Binary,
    /// 跨帧累积灰度图
    Accumulated,
    /// 本帧灰度图
    Gray,
    /// 计数图
    Count,
    /// 去噪二值图
    DenoisedBinary,
    /// 叠加图 (累积灰度 + 本帧事件)
    Superimposed,
    /// 去噪计数图
    DenoisedCount,
}

impl EventPicType {
    pub const ALL: [EventPicType; 7] = [
        EventPicType::Binary,
        EventPicType::Accumulated,
        EventPicType::Gray,
        EventPicType::Count,
        EventPicType::DenoisedBinary,
        EventPicType::Superimposed,
        EventPicType::DenoisedCount,
    ];

    pub fn index(self) -> usize {
        match self {
            EventPicType::Binary => 0,
            EventPicType::Accumulated => 1,
            EventPicType::Gray => 2,
            EventPicType::Count => 3,
            EventPicType::DenoisedBinary => 4,
            EventPicType::Superimposed => 5,
            EventPicType::DenoisedCount => 6,
        }
    }
}

/// 光流图像类型
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum FlowPicType {
    /// 原始触发时间
    Flow,
    /// 速度
    Speed,
    /// 方向
    Direction,
}

impl FlowPicType {
    pub const ALL: [FlowPicType; 3] = [FlowPicType::Flow, FlowPicType::Speed, FlowPicType::Direction];

    pub fn index(self) -> usize {
        match self {
            FlowPicType::Flow => 0,
            FlowPicType::Speed => 1,
            FlowPicType::Direction => 2,
        }
    }
}

/// 输出种类
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(tag = "kind", content = "variant", rename_all = "snake_case")]
pub enum OutputKind {
    FullPicture,
    EventPicture(EventPicType),
    OpticalFlowPicture(FlowPicType),
}
