// 该文件是 Liangchi （量尺） 项目的一部分。
// src/output/draw.rs - 检测结果可视化合成
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

use ab_glyph::{FontArc, InvalidFont, PxScale};
use image::{Rgb, RgbImage};
use imageproc::drawing::{draw_line_segment_mut, draw_polygon_mut, draw_text_mut};
use imageproc::map::map_colors2;
use imageproc::point::Point;

use crate::{
  config::RenderConfig,
  model::{ClassificationResult, Detection, Inspection},
};

// 文本渲染常量
const CAPTION_FONT_SIZE: f32 = 18.0;
const STATUS_FONT_SIZE: f32 = 24.0;
const STATUS_OFFSET_Y: i32 = 30;
const HEIGHT_CAPTION_OFFSET_X: i32 = 40;
const WIDTH_CAPTION_OFFSET_Y: i32 = 20;

// 线宽
const REFERENCE_THICKNESS: i32 = 3;
const CROSS_LINE_THICKNESS: i32 = 2;
const BOX_THICKNESS: i32 = 2;

// 颜色（RGB）
const REFERENCE_COLOR: [u8; 3] = [0, 255, 255]; // 青色
const MATCH_FILL_COLOR: [u8; 3] = [0, 255, 0];
const NO_MATCH_FILL_COLOR: [u8; 3] = [255, 0, 0];
const VERTICAL_COLOR: [u8; 3] = [0, 0, 255];
const HORIZONTAL_COLOR: [u8; 3] = [255, 0, 0];
const MATCH_STATUS_COLOR: [u8; 3] = [0, 128, 0];
const NO_MATCH_STATUS_COLOR: [u8; 3] = [0, 0, 139];

pub struct Draw {
  font: FontArc,
  caption_scale: PxScale,
  status_scale: PxScale,
  config: RenderConfig,
}

impl Draw {
  pub fn new(config: RenderConfig) -> Result<Self, InvalidFont> {
    let font_data = include_bytes!("../../assets/DejaVuSans.ttf");
    let font = FontArc::try_from_slice(font_data)?;

    Ok(Self {
      font,
      caption_scale: PxScale::from(CAPTION_FONT_SIZE),
      status_scale: PxScale::from(STATUS_FONT_SIZE),
      config,
    })
  }

  pub fn set_config(&mut self, config: RenderConfig) {
    self.config = config;
  }

  pub fn status_text(&self, result: &ClassificationResult) -> String {
    status_text(&self.config, result)
  }

  /// 合成标注帧；未检测到轮廓时原样返回工作帧
  pub fn compose(&self, inspection: &Inspection) -> RgbImage {
    match &inspection.detection {
      Some(detection) => self.compose_detection(&inspection.image, detection, &inspection.result),
      None => inspection.image.clone(),
    }
  }

  fn compose_detection(
    &self,
    image: &RgbImage,
    detection: &Detection,
    result: &ClassificationResult,
  ) -> RgbImage {
    let mut overlay = image.clone();

    for reference in &detection.references {
      draw_closed_polyline(
        &mut overlay,
        &reference.polygon.to_f32_points(),
        Rgb(REFERENCE_COLOR),
        REFERENCE_THICKNESS,
      );
    }

    let matched = result.is_match();
    let status_color = if matched {
      Rgb(MATCH_STATUS_COLOR)
    } else {
      Rgb(NO_MATCH_STATUS_COLOR)
    };
    let fill_color = if matched {
      Rgb(MATCH_FILL_COLOR)
    } else {
      Rgb(NO_MATCH_FILL_COLOR)
    };
    fill_contour(&mut overlay, detection.contour.points(), fill_color);

    let mids = detection.oriented_box.midpoints();
    if matched {
      draw_thick_line(
        &mut overlay,
        (mids.top.x as f32, mids.top.y as f32),
        (mids.bottom.x as f32, mids.bottom.y as f32),
        Rgb(VERTICAL_COLOR),
        CROSS_LINE_THICKNESS,
      );
      draw_thick_line(
        &mut overlay,
        (mids.left.x as f32, mids.left.y as f32),
        (mids.right.x as f32, mids.right.y as f32),
        Rgb(HORIZONTAL_COLOR),
        CROSS_LINE_THICKNESS,
      );

      if let Some(m) = result.measurement {
        // 与基线对齐：文字左上角在基线上方一个字高处
        draw_text_mut(
          &mut overlay,
          Rgb(VERTICAL_COLOR),
          mids.top.x as i32 - HEIGHT_CAPTION_OFFSET_X,
          mids.top.y as i32 - CAPTION_FONT_SIZE as i32,
          self.caption_scale,
          &self.font,
          &format!("{:.2}cm", m.height),
        );
        draw_text_mut(
          &mut overlay,
          Rgb(HORIZONTAL_COLOR),
          mids.right.x as i32,
          mids.right.y as i32 + WIDTH_CAPTION_OFFSET_Y - CAPTION_FONT_SIZE as i32,
          self.caption_scale,
          &self.font,
          &format!("{:.2}cm", m.width),
        );
      }
    }

    let top_left = detection.oriented_box.top_left;
    draw_text_mut(
      &mut overlay,
      status_color,
      top_left.x as i32,
      top_left.y as i32 - STATUS_OFFSET_Y - STATUS_FONT_SIZE as i32,
      self.status_scale,
      &self.font,
      &self.status_text(result),
    );

    let mut blended = blend(image, &overlay, self.config.alpha);

    let corners = detection
      .oriented_box
      .corners()
      .map(|p| Point::new(p.x as f32, p.y as f32));
    draw_closed_polyline(&mut blended, &corners, status_color, BOX_THICKNESS);

    blended
  }
}

/// 状态文字：匹配名称或固定的未匹配标签
pub fn status_text(config: &RenderConfig, result: &ClassificationResult) -> String {
  if result.is_match() {
    format!("{}{}", config.match_label_prefix, result.matches.join(", "))
  } else {
    config.no_match_label.clone()
  }
}

/// `overlay·alpha + image·(1−alpha)`
pub fn blend(image: &RgbImage, overlay: &RgbImage, alpha: f32) -> RgbImage {
  let alpha = alpha.clamp(0.0, 1.0);
  map_colors2(image, overlay, |base: Rgb<u8>, top: Rgb<u8>| {
    Rgb([0, 1, 2].map(|c| {
      (top[c] as f32 * alpha + base[c] as f32 * (1.0 - alpha))
        .round()
        .clamp(0.0, 255.0) as u8
    }))
  })
}

/// 沿法向平移若干次以得到指定线宽
pub fn draw_thick_line(
  image: &mut RgbImage,
  start: (f32, f32),
  end: (f32, f32),
  color: Rgb<u8>,
  thickness: i32,
) {
  let (dx, dy) = (end.0 - start.0, end.1 - start.1);
  let length = dx.hypot(dy);
  let (nx, ny) = if length > f32::EPSILON {
    (-dy / length, dx / length)
  } else {
    (0.0, 0.0)
  };

  let half = thickness.max(1) / 2;
  let from = if thickness.max(1) % 2 == 0 { -half + 1 } else { -half };
  for t in from..=half {
    let (ox, oy) = (nx * t as f32, ny * t as f32);
    draw_line_segment_mut(image, (start.0 + ox, start.1 + oy), (end.0 + ox, end.1 + oy), color);
  }
}

pub fn draw_closed_polyline(
  image: &mut RgbImage,
  points: &[Point<f32>],
  color: Rgb<u8>,
  thickness: i32,
) {
  if points.len() < 2 {
    return;
  }
  for (i, start) in points.iter().enumerate() {
    let end = points[(i + 1) % points.len()];
    draw_thick_line(image, (start.x, start.y), (end.x, end.y), color, thickness);
  }
}

/// 实心填充轮廓；少于三个顶点时不绘制
pub fn fill_contour(image: &mut RgbImage, points: &[Point<i32>], color: Rgb<u8>) {
  let mut poly = points.to_vec();
  poly.dedup();
  while poly.len() > 1 && poly.first() == poly.last() {
    poly.pop();
  }
  if poly.len() < 3 {
    return;
  }
  draw_polygon_mut(image, &poly, color);
}
