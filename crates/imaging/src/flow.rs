//! 光流估计
//!
//! 在 3x3 邻域内对像素触发时间做梯度：时间面沿运动方向递增，
//! 梯度方向即运动方向，梯度越小速度越快。
//! 当前帧未触发的邻居使用上一帧的时间 (减去一个计数周期)。

use contracts::{SensorGeometry, FORMAT2_T_MAX};

use crate::adc::adc_to_gray;

/// 邻域内至少需要的有效邻居数
pub const FLOW_MIN_NEIGHBORS: usize = 3;

/// 速度换算：1 时间单位/像素 对应的速度值
const SPEED_SCALE: f32 = 255.0;

/// 光流结果，三幅图同尺寸
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct FlowField {
    /// 触发时间灰度
    pub flow: Vec<u8>,
    /// 0 表示无光流
    pub speed: Vec<u8>,
    /// 1..=8，从 +x 方向逆时针每 45 度一个扇区；0 表示无光流
    pub direction: Vec<u8>,
}

impl FlowField {
    fn new(n: usize) -> Self {
        Self {
            flow: vec![0; n],
            speed: vec![0; n],
            direction: vec![0; n],
        }
    }
}

/// 光流估计器，保留上一帧的触发时间
#[derive(Debug, Clone)]
pub struct OpticalFlowEstimator {
    geometry: SensorGeometry,
    previous: Vec<u16>,
}

impl OpticalFlowEstimator {
    pub fn new(geometry: SensorGeometry) -> Self {
        Self {
            geometry,
            previous: vec![0; geometry.pixel_count()],
        }
    }

    /// 由本帧触发时间计算光流，并记住本帧
    pub fn estimate(&mut self, current: &[u16]) -> FlowField {
        let n = self.geometry.pixel_count();
        let mut field = FlowField::new(n);
        if current.len() != n {
            return field;
        }

        let rows = self.geometry.rows as i32;
        let cols = self.geometry.cols as i32;
        for row in 0..rows {
            for col in 0..cols {
                let index = (row * cols + col) as usize;
                let t = current[index];
                if t == 0 {
                    continue;
                }
                field.flow[index] = adc_to_gray(t).max(1);
                if let Some((speed, direction)) = self.vector_at(current, row, col) {
                    field.speed[index] = speed;
                    field.direction[index] = direction;
                }
            }
        }

        self.previous.copy_from_slice(current);
        field
    }

    /// 丢弃上一帧
    pub fn reset(&mut self) {
        self.previous.fill(0);
    }

    fn time_at(&self, current: &[u16], row: i32, col: i32) -> Option<f32> {
        let cols = self.geometry.cols as i32;
        if row < 0 || col < 0 || row >= self.geometry.rows as i32 || col >= cols {
            return None;
        }
        let index = (row * cols + col) as usize;
        match (current[index], self.previous[index]) {
            (0, 0) => None,
            (0, prev) => Some(prev as f32 - FORMAT2_T_MAX as f32),
            (now, _) => Some(now as f32),
        }
    }

    fn vector_at(&self, current: &[u16], row: i32, col: i32) -> Option<(u8, u8)> {
        let mut present = 0usize;
        // 左右两列、上下两行的均值
        let mut sides = [(0.0f32, 0u32); 4];
        for dr in -1..=1 {
            for dc in -1..=1 {
                if dr == 0 && dc == 0 {
                    continue;
                }
                let Some(t) = self.time_at(current, row + dr, col + dc) else {
                    continue;
                };
                present += 1;
                let mut add = |side: usize| {
                    sides[side].0 += t;
                    sides[side].1 += 1;
                };
                match dc {
                    -1 => add(0),
                    1 => add(1),
                    _ => {}
                }
                match dr {
                    -1 => add(2),
                    1 => add(3),
                    _ => {}
                }
            }
        }
        if present < FLOW_MIN_NEIGHBORS {
            return None;
        }

        let mean = |(sum, n): (f32, u32)| (n > 0).then(|| sum / n as f32);
        let diff = |a: usize, b: usize| match (mean(sides[a]), mean(sides[b])) {
            (Some(lo), Some(hi)) => (hi - lo) / 2.0,
            _ => 0.0,
        };
        let gx = diff(0, 1);
        // 图像行向下递增，取反使 +y 朝上
        let gy = -diff(2, 3);

        let magnitude = (gx * gx + gy * gy).sqrt();
        if magnitude < f32::EPSILON {
            return None;
        }
        let speed = (SPEED_SCALE / magnitude).round().clamp(1.0, 255.0) as u8;

        let degrees = gy.atan2(gx).to_degrees().rem_euclid(360.0);
        let sector = ((degrees + 22.5) / 45.0) as u8 % 8;
        Some((speed, sector + 1))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn surface(g: SensorGeometry, f: impl Fn(u16, u16) -> u16) -> Vec<u16> {
        let mut out = vec![0; g.pixel_count()];
        for r in 0..g.rows {
            for c in 0..g.cols {
                out[g.index(r, c).unwrap()] = f(r, c);
            }
        }
        out
    }

    #[test]
    fn test_isolated_pixel_has_no_flow() {
        let g = SensorGeometry::new(5, 5);
        let mut est = OpticalFlowEstimator::new(g);
        let mut times = vec![0; 25];
        times[12] = 500;
        let field = est.estimate(&times);
        assert!(field.flow[12] > 0);
        assert_eq!(field.speed[12], 0);
        assert_eq!(field.direction[12], 0);
    }

    #[test]
    fn test_edge_moving_right() {
        let g = SensorGeometry::new(5, 5);
        let mut est = OpticalFlowEstimator::new(g);
        let times = surface(g, |_, c| 100 + 10 * c);
        let field = est.estimate(&times);
        let center = g.index(2, 2).unwrap();
        assert_eq!(field.direction[center], 1);
        // 每像素 10 个时间单位
        assert_eq!(field.speed[center], 26);
    }

    #[test]
    fn test_edge_moving_down_and_left() {
        let g = SensorGeometry::new(5, 5);
        let center = g.index(2, 2).unwrap();

        let mut est = OpticalFlowEstimator::new(g);
        let down = est.estimate(&surface(g, |r, _| 100 + 10 * r));
        assert_eq!(down.direction[center], 7);

        let mut est = OpticalFlowEstimator::new(g);
        let left = est.estimate(&surface(g, |_, c| 200 - 10 * c));
        assert_eq!(left.direction[center], 5);
    }

    #[test]
    fn test_previous_frame_fills_gaps() {
        let g = SensorGeometry::new(3, 3);
        let mut est = OpticalFlowEstimator::new(g);
        // 第一帧：左列触发
        est.estimate(&surface(g, |_, c| if c == 0 { 4000 } else { 0 }));

        // 第二帧：中、右列触发
        let field = est.estimate(&surface(g, |_, c| if c == 0 { 0 } else { 10 + 10 * c }));
        let center = g.index(1, 1).unwrap();
        assert_eq!(field.direction[center], 1);
        assert!(field.speed[center] > 0);
    }

    #[test]
    fn test_wrong_length_is_empty() {
        let g = SensorGeometry::new(2, 2);
        let mut est = OpticalFlowEstimator::new(g);
        let field = est.estimate(&[1, 2, 3]);
        assert_eq!(field.flow, vec![0; 4]);
    }
}
