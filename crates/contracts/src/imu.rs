//! IMU 数据
//!
//! 原始 20 字节采样与对齐到时间基准后的结果。

use serde::{Deserialize, Serialize};

/// 原始采样字节数
pub const IMU_RAW_LEN: usize = 20;

/// 原始 IMU 采样
///
/// 布局 (大端 i16)：陀螺仪 xyz、加速度计 xyz、磁力计 xyz、温度。
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct ImuRawData {
    pub bytes: [u8; IMU_RAW_LEN],
}

impl ImuRawData {
    pub fn new(bytes: [u8; IMU_RAW_LEN]) -> Self {
        Self { bytes }
    }
}

/// 三维向量
#[derive(Debug, Clone, Copy, Default, PartialEq, Serialize, Deserialize)]
pub struct Vector3 {
    pub x: f64,
    pub y: f64,
    pub z: f64,
}

impl Vector3 {
    pub fn new(x: f64, y: f64, z: f64) -> Self {
        Self { x, y, z }
    }
}

/// 对齐后的 IMU 数据
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct ImuData {
    /// 陀螺仪 (deg/s)
    pub gyroscope: Vector3,

    /// 加速度计 (g)
    pub accelerometer: Vector3,

    /// 磁力计 (uT)
    pub magnetometer: Vector3,

    /// 温度 (摄氏度)
    pub temperature: f64,

    /// 主机时间 (微秒)，按序号插值
    pub timestamp_us: i64,

    /// 重建时间基准 (时间单位)
    pub t_units: u64,
}
