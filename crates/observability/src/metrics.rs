//! 处理指标收集模块
//!
//! 按调用汇总数据处理器的运行指标，供 Prometheus 与 CLI 摘要使用。

use std::collections::HashMap;

use contracts::SensorMode;
use metrics::{counter, gauge, histogram};

/// 一次 `process_mipi_data` 调用的观测值
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct CallSample {
    pub mode: SensorMode,
    /// 解码样本数
    pub samples: u64,
    /// 计入帧的事件数
    pub events: u64,
    /// 本次调用发布的帧数
    pub frames: usize,
    pub discontinuities: u64,
    pub imu_samples: usize,
    /// 调用耗时 (微秒)
    pub process_us: f64,
    /// 本次刷新的事件率
    pub event_rate: Option<u32>,
    pub decode_failed: bool,
}

/// 记录一次调用的指标
pub fn record_call_metrics(sample: &CallSample) {
    let mode = sample.mode.as_str();

    counter!("celex_calls_total", "mode" => mode).increment(1);
    counter!("celex_samples_total", "mode" => mode).increment(sample.samples);
    histogram!("celex_process_latency_us", "mode" => mode).record(sample.process_us);

    if sample.discontinuities > 0 {
        counter!("celex_call_discontinuities_total").increment(sample.discontinuities);
    }
    if sample.decode_failed {
        counter!("celex_failed_calls_total", "mode" => mode).increment(1);
    }
}

/// 记录导出队列深度
pub fn record_export_queue(depth: usize) {
    gauge!("celex_export_queue_depth").set(depth as f64);
}

/// 帧指标聚合器
///
/// 在内存中聚合指标，便于统计和输出摘要。
#[derive(Debug, Clone, Default)]
pub struct FrameMetricsAggregator {
    /// 调用次数
    pub total_calls: u64,

    /// 发布帧数
    pub total_frames: u64,

    /// 解码样本数
    pub total_samples: u64,

    /// 事件数
    pub total_events: u64,

    /// 时间戳跳变数
    pub total_discontinuities: u64,

    /// IMU 样本数
    pub total_imu: u64,

    /// 解码失败的调用数
    pub failed_calls: u64,

    /// 调用耗时统计 (微秒)
    pub latency_stats: RunningStats,

    /// 事件率统计
    pub event_rate_stats: RunningStats,

    /// 各模式帧数
    pub frames_by_mode: HashMap<&'static str, u64>,
}

impl FrameMetricsAggregator {
    /// 创建新的聚合器
    pub fn new() -> Self {
        Self::default()
    }

    /// 更新聚合统计
    pub fn update(&mut self, sample: &CallSample) {
        self.total_calls += 1;
        self.total_frames += sample.frames as u64;
        self.total_samples += sample.samples;
        self.total_events += sample.events;
        self.total_discontinuities += sample.discontinuities;
        self.total_imu += sample.imu_samples as u64;
        if sample.decode_failed {
            self.failed_calls += 1;
        }

        self.latency_stats.push(sample.process_us);
        if let Some(rate) = sample.event_rate {
            self.event_rate_stats.push(rate as f64);
        }
        if sample.frames > 0 {
            *self.frames_by_mode.entry(sample.mode.as_str()).or_insert(0) +=
                sample.frames as u64;
        }
    }

    /// 生成摘要报告
    pub fn summary(&self) -> MetricsSummary {
        MetricsSummary {
            total_calls: self.total_calls,
            total_frames: self.total_frames,
            total_samples: self.total_samples,
            total_events: self.total_events,
            total_discontinuities: self.total_discontinuities,
            total_imu: self.total_imu,
            failed_calls: self.failed_calls,
            discontinuity_rate: if self.total_samples > 0 {
                self.total_discontinuities as f64 / self.total_samples as f64 * 100.0
            } else {
                0.0
            },
            latency_us: StatsSummary::from(&self.latency_stats),
            event_rate: StatsSummary::from(&self.event_rate_stats),
            frames_by_mode: self.frames_by_mode.clone(),
        }
    }

    /// 重置统计
    pub fn reset(&mut self) {
        *self = Self::default();
    }
}

/// 指标摘要
#[derive(Debug, Clone, Default)]
pub struct MetricsSummary {
    pub total_calls: u64,
    pub total_frames: u64,
    pub total_samples: u64,
    pub total_events: u64,
    pub total_discontinuities: u64,
    pub total_imu: u64,
    pub failed_calls: u64,
    pub discontinuity_rate: f64,
    pub latency_us: StatsSummary,
    pub event_rate: StatsSummary,
    pub frames_by_mode: HashMap<&'static str, u64>,
}

impl std::fmt::Display for MetricsSummary {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        writeln!(f, "=== Processing Summary ===")?;
        writeln!(f, "Calls: {} ({} failed)", self.total_calls, self.failed_calls)?;
        writeln!(f, "Frames published: {}", self.total_frames)?;
        writeln!(f, "Samples decoded: {}", self.total_samples)?;
        writeln!(f, "Events accepted: {}", self.total_events)?;
        writeln!(
            f,
            "Discontinuities: {} ({:.2}%)",
            self.total_discontinuities, self.discontinuity_rate
        )?;
        writeln!(f, "IMU samples: {}", self.total_imu)?;
        writeln!(f, "Call latency (us): {}", self.latency_us)?;
        writeln!(f, "Event rate (ev/s): {}", self.event_rate)?;

        if !self.frames_by_mode.is_empty() {
            writeln!(f, "Frames by mode:")?;
            let mut modes: Vec<_> = self.frames_by_mode.iter().collect();
            modes.sort();
            for (mode, count) in modes {
                writeln!(f, "  {}: {}", mode, count)?;
            }
        }

        Ok(())
    }
}

/// 统计摘要
#[derive(Debug, Clone, Default)]
pub struct StatsSummary {
    pub count: u64,
    pub min: f64,
    pub max: f64,
    pub mean: f64,
    pub std_dev: f64,
}

impl From<&RunningStats> for StatsSummary {
    fn from(stats: &RunningStats) -> Self {
        Self {
            count: stats.count,
            min: stats.min,
            max: stats.max,
            mean: stats.mean(),
            std_dev: stats.std_dev(),
        }
    }
}

impl std::fmt::Display for StatsSummary {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        if self.count == 0 {
            write!(f, "N/A")
        } else {
            write!(
                f,
                "min={:.1}, max={:.1}, mean={:.1}, std={:.1} (n={})",
                self.min, self.max, self.mean, self.std_dev, self.count
            )
        }
    }
}

/// 在线统计计算器 (Welford)
#[derive(Debug, Clone, Default)]
pub struct RunningStats {
    count: u64,
    mean: f64,
    m2: f64,
    min: f64,
    max: f64,
}

impl RunningStats {
    pub fn push(&mut self, value: f64) {
        self.count += 1;

        if self.count == 1 {
            self.min = value;
            self.max = value;
            self.mean = value;
            self.m2 = 0.0;
            return;
        }

        self.min = self.min.min(value);
        self.max = self.max.max(value);
        let delta = value - self.mean;
        self.mean += delta / self.count as f64;
        self.m2 += delta * (value - self.mean);
    }

    pub fn count(&self) -> u64 {
        self.count
    }

    pub fn mean(&self) -> f64 {
        if self.count == 0 {
            0.0
        } else {
            self.mean
        }
    }

    /// 样本方差
    pub fn variance(&self) -> f64 {
        if self.count < 2 {
            0.0
        } else {
            self.m2 / (self.count - 1) as f64
        }
    }

    pub fn std_dev(&self) -> f64 {
        self.variance().sqrt()
    }

    pub fn min(&self) -> f64 {
        self.min
    }

    pub fn max(&self) -> f64 {
        self.max
    }
}
