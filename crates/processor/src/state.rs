//! 流水线状态
//!
//! 跨调用保留的全部解码/计时状态集中在这里，与配置分开。

use contracts::{EventConfig, LoopSlot, ModeConfig, SensorMode};
use ingestion::RowCursor;
use sync_engine::{FrameSync, ImuSynchronizer};

#[derive(Debug)]
pub struct PipelineState {
    /// 行游标，跨调用延续
    pub cursor: RowCursor,
    /// 计时与帧边界
    pub sync: FrameSync,
    /// IMU 时间基准
    pub imu: ImuSynchronizer,
    /// 循环模式当前槽位
    pub loop_slot: LoopSlot,
}

impl PipelineState {
    pub fn new(event: &EventConfig) -> Self {
        Self {
            cursor: RowCursor::default(),
            sync: FrameSync::new(event),
            imu: ImuSynchronizer::new(),
            loop_slot: LoopSlot::A,
        }
    }

    /// 本次调用生效的模式
    pub fn active_mode(&self, mode: &ModeConfig) -> SensorMode {
        if mode.loop_enabled {
            mode.loop_mode(self.loop_slot)
        } else {
            mode.fixed
        }
    }

    /// 循环模式下切到下一槽位
    pub fn advance_loop(&mut self) -> LoopSlot {
        self.loop_slot = self.loop_slot.next();
        self.loop_slot
    }

    /// 时间基准清零，行游标作废
    pub fn reset_time(&mut self) {
        self.cursor = RowCursor::default();
        self.sync.reset_timestamp();
        self.imu.reset();
    }
}
