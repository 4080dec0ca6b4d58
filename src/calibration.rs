// 该文件是 Liangchi （量尺） 项目的一部分。
// src/calibration.rs - 最小外接矩形、角点排序与像素标定
//
// 本文件根据 Apache 许可证第 2.0 版（以下简称“许可证”）授权使用；
// 除非遵守该许可证条款，否则您不得使用本文件。
// 您可通过以下网址获取许可证副本：
// http://www.apache.org/licenses/LICENSE-2.0
// 除非适用法律要求或书面同意，根据本许可协议分发的软件均按“原样”提供，
// 不附带任何形式的明示或暗示的保证或条件。
// 有关许可权限与限制的具体条款，请参阅本许可协议。
//
// Copyright (C) 2026 Johann Li <me@qinka.pro>, Wareless Group

//! # 标定
//!
//! 主轮廓先取最小面积外接旋转矩形，四个角点按固定规则排序，
//! 再由四条边的中点得到两条互相垂直的像素跨度：
//! `dA`（上中点到下中点，纵向）与 `dB`（左中点到右中点，横向）。
//!
//! 标定状态只有两种：未标定与已标定。第一帧有效检测时以 `dB` 锁定宽度，
//! 之后每帧只用新的 `dA` 重新计算高度，宽度保持锁定值不变。

use imageproc::geometry::min_area_rect;
use imageproc::point::Point;
use serde::{Deserialize, Serialize};
use tracing::info;

use crate::contour::Contour;

/// 最小外接矩形，角点按 左上、右上、右下、左下 排列
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct OrientedBox {
  pub top_left: Point<f64>,
  pub top_right: Point<f64>,
  pub bottom_right: Point<f64>,
  pub bottom_left: Point<f64>,
}

impl OrientedBox {
  /// 主轮廓的最小面积外接矩形；空轮廓返回 None
  pub fn enclosing(contour: &Contour) -> Option<Self> {
    if contour.is_empty() {
      return None;
    }
    let corners = min_area_rect(contour.points()).map(|p| Point::new(p.x as f64, p.y as f64));
    Some(Self::from_corners(corners))
  }

  /// 与输入顺序无关的确定性排序：
  /// 左上角取 x+y 最小者（相同时取 x 较小者），其余角点绕质心顺时针排列
  pub fn from_corners(corners: [Point<f64>; 4]) -> Self {
    let cx = corners.iter().map(|p| p.x).sum::<f64>() / 4.0;
    let cy = corners.iter().map(|p| p.y).sum::<f64>() / 4.0;

    let mut sorted = corners;
    // 图像坐标 y 轴向下，atan2 递增即顺时针
    sorted.sort_by(|a, b| {
      let ta = (a.y - cy).atan2(a.x - cx);
      let tb = (b.y - cy).atan2(b.x - cx);
      ta.total_cmp(&tb)
        .then(a.x.total_cmp(&b.x))
        .then(a.y.total_cmp(&b.y))
    });

    let start = (0..4)
      .min_by(|&i, &j| {
        let (a, b) = (sorted[i], sorted[j]);
        (a.x + a.y)
          .total_cmp(&(b.x + b.y))
          .then(a.x.total_cmp(&b.x))
          .then(a.y.total_cmp(&b.y))
      })
      .unwrap_or(0);

    Self {
      top_left: sorted[start],
      top_right: sorted[(start + 1) % 4],
      bottom_right: sorted[(start + 2) % 4],
      bottom_left: sorted[(start + 3) % 4],
    }
  }

  pub fn corners(&self) -> [Point<f64>; 4] {
    [
      self.top_left,
      self.top_right,
      self.bottom_right,
      self.bottom_left,
    ]
  }

  pub fn midpoints(&self) -> Midpoints {
    Midpoints {
      top: midpoint(self.top_left, self.top_right),
      bottom: midpoint(self.bottom_left, self.bottom_right),
      left: midpoint(self.top_left, self.bottom_left),
      right: midpoint(self.top_right, self.bottom_right),
    }
  }

  pub fn spans(&self) -> Spans {
    let m = self.midpoints();
    Spans {
      vertical: distance(m.top, m.bottom),
      horizontal: distance(m.left, m.right),
    }
  }
}

/// 四条边的中点
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct Midpoints {
  pub top: Point<f64>,
  pub bottom: Point<f64>,
  pub left: Point<f64>,
  pub right: Point<f64>,
}

/// 两条互相垂直的像素跨度
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct Spans {
  /// dA：上中点到下中点
  pub vertical: f64,
  /// dB：左中点到右中点
  pub horizontal: f64,
}

/// 物理尺寸（cm）
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct Measurement {
  pub width: f64,
  pub height: f64,
}

pub fn midpoint(a: Point<f64>, b: Point<f64>) -> Point<f64> {
  Point::new((a.x + b.x) * 0.5, (a.y + b.y) * 0.5)
}

pub fn distance(a: Point<f64>, b: Point<f64>) -> f64 {
  (a.x - b.x).hypot(a.y - b.y)
}

/// 每个相机各自持有一份，不在不同的拍摄设置之间共享
#[derive(Debug, Clone, Copy, Default, PartialEq)]
pub enum CalibrationState {
  #[default]
  Uncalibrated,
  Calibrated { pixels_per_metric: f64 },
}

impl CalibrationState {
  pub fn is_calibrated(&self) -> bool {
    matches!(self, CalibrationState::Calibrated { .. })
  }

  pub fn pixels_per_metric(&self) -> Option<f64> {
    match self {
      CalibrationState::Uncalibrated => None,
      CalibrationState::Calibrated { pixels_per_metric } => Some(*pixels_per_metric),
    }
  }

  /// 首次调用锁定横向值；之后只重新计算纵向值
  pub fn measure(&mut self, spans: Spans, ratio: f64) -> Measurement {
    let height = spans.vertical * ratio;
    let width = match *self {
      CalibrationState::Calibrated { pixels_per_metric } => pixels_per_metric,
      CalibrationState::Uncalibrated => {
        let pixels_per_metric = spans.horizontal * ratio;
        info!(
          "标定完成: 横向跨度 {:.2}px, 锁定值 {:.4}",
          spans.horizontal, pixels_per_metric
        );
        *self = CalibrationState::Calibrated { pixels_per_metric };
        pixels_per_metric
      }
    };
    Measurement { width, height }
  }
}
