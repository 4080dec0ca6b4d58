// 该文件是 Liangchi （量尺） 项目的一部分。
// src/classify.rs - 包含关系分类
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

use thiserror::Error;
use tracing::{debug, warn};

use crate::contour::{Contour, Polygon};
use crate::overlay::TransformedReference;

#[derive(Error, Debug, Clone, PartialEq)]
pub enum GeometryError {
  #[error("轮廓为空")]
  EmptyContour,
  #[error("多边形顶点不足: {0} 个")]
  TooFewVertices(usize),
  #[error("多边形含有非有限坐标")]
  NonFinite,
  #[error("多边形面积为零")]
  ZeroArea,
  #[error("模板源图尺寸无效: {width}x{height}")]
  EmptySource { width: u32, height: u32 },
}

/// 测试前检查参考多边形是否可用
pub fn validate_polygon(polygon: &Polygon) -> Result<(), GeometryError> {
  if polygon.len() < 3 {
    return Err(GeometryError::TooFewVertices(polygon.len()));
  }
  if !polygon.is_finite() {
    return Err(GeometryError::NonFinite);
  }
  if polygon.area() <= f64::EPSILON {
    return Err(GeometryError::ZeroArea);
  }
  Ok(())
}

/// 轮廓包围盒落在多边形包围盒内，且每个顶点都在多边形内或边上
pub fn contains(reference: &Polygon, contour: &Contour) -> Result<bool, GeometryError> {
  validate_polygon(reference)?;
  let inner = contour.bounds().ok_or(GeometryError::EmptyContour)?;
  let outer = reference.bounds().ok_or(GeometryError::EmptyContour)?;

  if !inner.within(&outer) {
    return Ok(false);
  }

  Ok(
    contour
      .points()
      .iter()
      .all(|p| reference.contains_point(p.x as f64, p.y as f64)),
  )
}

/// 返回所有包含主轮廓的参考名称，保持参考顺序；
/// 单个参考几何异常时记为不匹配，其余照常判断
pub fn classify<'a, I>(contour: &Contour, references: I) -> Vec<String>
where
  I: IntoIterator<Item = &'a TransformedReference>,
{
  references
    .into_iter()
    .filter(|reference| match contains(&reference.polygon, contour) {
      Ok(inside) => {
        debug!("参考 {}: {}", reference.name, if inside { "包含" } else { "不包含" });
        inside
      }
      Err(e) => {
        warn!("参考 {} 几何异常, 视为不匹配: {}", reference.name, e);
        false
      }
    })
    .map(|reference| reference.name.clone())
    .collect()
}
