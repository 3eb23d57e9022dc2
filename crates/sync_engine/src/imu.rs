//! IMU 对齐
//!
//! 每次调用结束时，把本批原始 IMU 采样按序号插值到
//! [上一批结束时间, 本批结束时间] 区间内。

use contracts::{ImuData, ImuRawData, Vector3};
use tracing::trace;

/// 陀螺仪 LSB / (deg/s)，量程 ±250
const GYRO_LSB_PER_DPS: f64 = 131.0;
/// 加速度计 LSB / g，量程 ±2g
const ACCEL_LSB_PER_G: f64 = 16384.0;
/// 磁力计 uT / LSB
const MAG_UT_PER_LSB: f64 = 0.15;
/// 温度换算
const TEMP_LSB_PER_DEG: f64 = 333.87;
const TEMP_OFFSET_DEG: f64 = 21.0;

/// IMU 同步器
#[derive(Debug, Clone, Default)]
pub struct ImuSynchronizer {
    /// 上一批结束时间 (微秒)
    last_end_us: Option<i64>,
}

/// 本批时间基准
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct BatchTiming {
    /// 本批结束主机时间 (微秒)
    pub end_us: i64,
    /// 本批时长 (微秒)，仅首批使用
    pub span_us: i64,
    /// 本批开始时的重建时间
    pub t_start: u64,
    /// 本批内推进的时间单位数
    pub package_units: u32,
}

impl ImuSynchronizer {
    pub fn new() -> Self {
        Self::default()
    }

    /// 对齐一批采样，按输入顺序返回
    pub fn align(&mut self, raw: &[ImuRawData], timing: BatchTiming) -> Vec<ImuData> {
        let start_us = self
            .last_end_us
            .unwrap_or(timing.end_us - timing.span_us.max(0));
        self.last_end_us = Some(timing.end_us);

        let n = raw.len() as i64;
        if n == 0 {
            return Vec::new();
        }

        let span = timing.end_us - start_us;
        let out: Vec<ImuData> = raw
            .iter()
            .enumerate()
            .map(|(i, sample)| {
                let ordinal = i as i64 + 1;
                let (gyroscope, accelerometer, magnetometer, temperature) = decode_raw(sample);
                ImuData {
                    gyroscope,
                    accelerometer,
                    magnetometer,
                    temperature,
                    timestamp_us: start_us + span * ordinal / n,
                    t_units: timing.t_start
                        + (timing.package_units as u64 * ordinal as u64) / n as u64,
                }
            })
            .collect();

        trace!(count = out.len(), start_us, end_us = timing.end_us, "imu batch aligned");
        out
    }

    /// 重置时间基准
    pub fn reset(&mut self) {
        self.last_end_us = None;
    }
}

/// 解析 20 字节原始采样：陀螺仪、加速度计、磁力计、温度
pub fn decode_raw(raw: &ImuRawData) -> (Vector3, Vector3, Vector3, f64) {
    let word = |i: usize| i16::from_be_bytes([raw.bytes[2 * i], raw.bytes[2 * i + 1]]) as f64;
    let gyro = Vector3::new(
        word(0) / GYRO_LSB_PER_DPS,
        word(1) / GYRO_LSB_PER_DPS,
        word(2) / GYRO_LSB_PER_DPS,
    );
    let accel = Vector3::new(
        word(3) / ACCEL_LSB_PER_G,
        word(4) / ACCEL_LSB_PER_G,
        word(5) / ACCEL_LSB_PER_G,
    );
    let mag = Vector3::new(
        word(6) * MAG_UT_PER_LSB,
        word(7) * MAG_UT_PER_LSB,
        word(8) * MAG_UT_PER_LSB,
    );
    let temperature = word(9) / TEMP_LSB_PER_DEG + TEMP_OFFSET_DEG;
    (gyro, accel, mag, temperature)
}
