// 该文件是 Liangchi （量尺） 项目的一部分。
// src/overlay.rs - 参考轮廓投影到当前帧
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

use imageproc::point::Point;

use crate::classify::GeometryError;
use crate::config::TemplateConfig;
use crate::contour::Polygon;
use crate::template::ReferenceTemplate;

/// 某一帧坐标系下的参考轮廓，每帧重新计算
#[derive(Debug, Clone, PartialEq)]
pub struct TransformedReference {
  pub name: String,
  pub polygon: Polygon,
}

/// 各向异性缩放后在帧内居中
pub fn transform_reference(
  template: &ReferenceTemplate,
  frame_width: u32,
  frame_height: u32,
  config: &TemplateConfig,
) -> Result<TransformedReference, GeometryError> {
  if template.width == 0 || template.height == 0 {
    return Err(GeometryError::EmptySource {
      width: template.width,
      height: template.height,
    });
  }
  if template.contour.is_empty() {
    return Err(GeometryError::EmptyContour);
  }

  let (fw, fh) = (frame_width as f64, frame_height as f64);
  let scale_x = fw / template.width as f64 * config.fraction_h;
  let scale_y = fh / template.height as f64 * config.fraction_v;

  let scaled = template
    .contour
    .points()
    .iter()
    .map(|p| Point::new(p.x as f64 * scale_x, p.y as f64 * scale_y))
    .collect::<Vec<_>>();

  let bounds = Polygon::from(scaled.clone())
    .bounds()
    .ok_or(GeometryError::EmptyContour)?;
  let offset_x = (fw - bounds.width()) / 2.0 - bounds.min_x;
  let offset_y = (fh - bounds.height()) / 2.0 - bounds.min_y;

  let vertices = scaled
    .into_iter()
    .map(|p| Point::new(p.x + offset_x, p.y + offset_y))
    .collect::<Vec<_>>();

  Ok(TransformedReference {
    name: template.name.clone(),
    polygon: Polygon::from(vertices),
  })
}
