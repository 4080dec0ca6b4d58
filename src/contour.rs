// 该文件是 Liangchi （量尺） 项目的一部分。
// src/contour.rs - 轮廓与多边形几何
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

use imageproc::geometry::contour_area;
use imageproc::point::Point;

// 点在边上的判定容差（像素）
const ON_EDGE_EPSILON: f64 = 1e-9;

/// 像素坐标下的闭合轮廓，首尾隐式相连
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Contour {
  points: Box<[Point<i32>]>,
}

impl From<Vec<Point<i32>>> for Contour {
  fn from(points: Vec<Point<i32>>) -> Self {
    Self {
      points: points.into_boxed_slice(),
    }
  }
}

impl Contour {
  pub fn points(&self) -> &[Point<i32>] {
    &self.points
  }

  pub fn len(&self) -> usize {
    self.points.len()
  }

  pub fn is_empty(&self) -> bool {
    self.points.is_empty()
  }

  /// 鞋带公式面积
  pub fn area(&self) -> f64 {
    contour_area(&self.points)
  }

  pub fn bounds(&self) -> Option<Bounds> {
    Bounds::enclosing(self.points.iter().map(|p| (p.x as f64, p.y as f64)))
  }
}

/// 浮点坐标多边形，用于投影后的参考轮廓
#[derive(Debug, Clone, PartialEq)]
pub struct Polygon {
  vertices: Vec<Point<f64>>,
}

impl From<Vec<Point<f64>>> for Polygon {
  fn from(vertices: Vec<Point<f64>>) -> Self {
    Self { vertices }
  }
}

impl Polygon {
  pub fn vertices(&self) -> &[Point<f64>] {
    &self.vertices
  }

  pub fn len(&self) -> usize {
    self.vertices.len()
  }

  pub fn is_empty(&self) -> bool {
    self.vertices.is_empty()
  }

  pub fn area(&self) -> f64 {
    contour_area(&self.vertices)
  }

  pub fn is_finite(&self) -> bool {
    self.vertices.iter().all(|p| p.x.is_finite() && p.y.is_finite())
  }

  pub fn bounds(&self) -> Option<Bounds> {
    Bounds::enclosing(self.vertices.iter().map(|p| (p.x, p.y)))
  }

  /// 点在多边形内部或边界上时返回 true
  pub fn contains_point(&self, x: f64, y: f64) -> bool {
    let n = self.vertices.len();
    if n == 0 {
      return false;
    }

    let mut inside = false;
    let mut j = n - 1;
    for i in 0..n {
      let (xi, yi) = (self.vertices[i].x, self.vertices[i].y);
      let (xj, yj) = (self.vertices[j].x, self.vertices[j].y);

      if on_segment(x, y, xi, yi, xj, yj) {
        return true;
      }

      let intersect = ((yi > y) != (yj > y)) && (x < (xj - xi) * (y - yi) / (yj - yi) + xi);
      if intersect {
        inside = !inside;
      }
      j = i;
    }

    inside
  }

  /// 在画布上绘制时使用的 f32 顶点
  pub fn to_f32_points(&self) -> Vec<Point<f32>> {
    self
      .vertices
      .iter()
      .map(|p| Point::new(p.x as f32, p.y as f32))
      .collect()
  }
}

fn on_segment(px: f64, py: f64, ax: f64, ay: f64, bx: f64, by: f64) -> bool {
  let cross = (bx - ax) * (py - ay) - (by - ay) * (px - ax);
  if cross.abs() > ON_EDGE_EPSILON * (1.0 + (bx - ax).abs() + (by - ay).abs()) {
    return false;
  }
  px >= ax.min(bx) - ON_EDGE_EPSILON
    && px <= ax.max(bx) + ON_EDGE_EPSILON
    && py >= ay.min(by) - ON_EDGE_EPSILON
    && py <= ay.max(by) + ON_EDGE_EPSILON
}

/// 轴对齐包围盒，边界闭区间
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct Bounds {
  pub min_x: f64,
  pub min_y: f64,
  pub max_x: f64,
  pub max_y: f64,
}

impl Bounds {
  pub fn enclosing(points: impl IntoIterator<Item = (f64, f64)>) -> Option<Self> {
    points.into_iter().fold(None, |acc, (x, y)| {
      Some(match acc {
        None => Bounds {
          min_x: x,
          min_y: y,
          max_x: x,
          max_y: y,
        },
        Some(b) => Bounds {
          min_x: b.min_x.min(x),
          min_y: b.min_y.min(y),
          max_x: b.max_x.max(x),
          max_y: b.max_y.max(y),
        },
      })
    })
  }

  pub fn width(&self) -> f64 {
    self.max_x - self.min_x
  }

  pub fn height(&self) -> f64 {
    self.max_y - self.min_y
  }

  pub fn within(&self, outer: &Bounds) -> bool {
    self.min_x >= outer.min_x
      && self.min_y >= outer.min_y
      && self.max_x <= outer.max_x
      && self.max_y <= outer.max_y
  }
}

#[cfg(test)]
pub(crate) fn rect_contour(x0: i32, y0: i32, x1: i32, y1: i32) -> Contour {
  Contour::from(vec![
    Point::new(x0, y0),
    Point::new(x1, y0),
    Point::new(x1, y1),
    Point::new(x0, y1),
  ])
}

#[cfg(test)]
pub(crate) fn rect_polygon(x0: f64, y0: f64, x1: f64, y1: f64) -> Polygon {
  Polygon::from(vec![
    Point::new(x0, y0),
    Point::new(x1, y0),
    Point::new(x1, y1),
    Point::new(x0, y1),
  ])
}
