// 该文件是 Liangchi （量尺） 项目的一部分。
// src/preprocess.rs - 帧预处理与主轮廓提取
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

use image::{GrayImage, RgbImage, imageops};
use imageproc::contours::{BorderType, find_contours};
use imageproc::distance_transform::Norm;
use imageproc::edges::canny;
use imageproc::filter::gaussian_blur_f32;
use imageproc::morphology::{dilate, erode};
use thiserror::Error;
use tracing::debug;

use crate::config::{ExtractionConfig, PreprocessConfig};
use crate::contour::Contour;

#[derive(Error, Debug, PartialEq, Eq)]
pub enum PreprocessError {
  #[error("帧尺寸无效: {width}x{height}")]
  EmptyFrame { width: u32, height: u32 },
  #[error("帧 {width}x{height} 无法缩放到宽度 {target}")]
  Unresizable { width: u32, height: u32, target: u32 },
}

/// 预处理结果：工作尺寸下的彩色帧与二值边缘图
#[derive(Debug, Clone)]
pub struct Preprocessed {
  pub image: RgbImage,
  pub edges: GrayImage,
}

/// 保持宽高比缩放到工作宽度
pub fn resize_to_width(image: &RgbImage, target: u32) -> Result<RgbImage, PreprocessError> {
  let (width, height) = image.dimensions();
  if width == 0 || height == 0 {
    return Err(PreprocessError::EmptyFrame { width, height });
  }
  let target_height = (height as u64 * target as u64 / width as u64) as u32;
  if target == 0 || target_height == 0 {
    return Err(PreprocessError::Unresizable {
      width,
      height,
      target,
    });
  }
  if (width, height) == (target, target_height) {
    return Ok(image.clone());
  }
  Ok(imageops::resize(
    image,
    target,
    target_height,
    imageops::FilterType::Triangle,
  ))
}

/// 缩放、灰度、平滑、边缘检测、一次膨胀一次腐蚀
pub fn preprocess(image: &RgbImage, config: &PreprocessConfig) -> Result<Preprocessed, PreprocessError> {
  let image = resize_to_width(image, config.working_width)?;
  let gray = imageops::grayscale(&image);
  let blurred = gaussian_blur_f32(&gray, config.blur_sigma());
  let edges = canny(&blurred, config.canny_low, config.canny_high);
  // 3x3 结构元素闭运算
  let edges = erode(&dilate(&edges, Norm::LInf, 1), Norm::LInf, 1);
  debug!(
    "预处理完成: {}x{}",
    image.width(),
    image.height()
  );
  Ok(Preprocessed { image, edges })
}

/// 所有最外层轮廓（无父轮廓的外边界）
pub fn external_contours(binary: &GrayImage) -> Vec<Contour> {
  find_contours::<i32>(binary)
    .into_iter()
    .filter(|c| c.border_type == BorderType::Outer && c.parent.is_none())
    .map(|c| Contour::from(c.points))
    .collect()
}

/// 面积最大的轮廓
pub fn largest_contour(contours: Vec<Contour>) -> Option<Contour> {
  contours
    .into_iter()
    .map(|c| (c.area(), c))
    .max_by(|(a, _), (b, _)| a.total_cmp(b))
    .map(|(_, c)| c)
}

/// 选出主轮廓；面积低于下限时视为未检测到
pub fn dominant_contour(edges: &GrayImage, config: &ExtractionConfig) -> Option<Contour> {
  let candidate = largest_contour(external_contours(edges))?;
  let area = candidate.area();
  if area < config.min_contour_area {
    debug!(
      "最大轮廓面积 {:.1} 低于下限 {:.1}",
      area, config.min_contour_area
    );
    return None;
  }
  debug!("主轮廓: {} 个点, 面积 {:.1}", candidate.len(), area);
  Some(candidate)
}

#[cfg(test)]
mod tests {
  use super::*;
  use image::{Luma, Rgb};

  fn filled_rect_frame(w: u32, h: u32, x0: u32, y0: u32, rw: u32, rh: u32) -> RgbImage {
    RgbImage::from_fn(w, h, |x, y| {
      if x >= x0 && x < x0 + rw && y >= y0 && y < y0 + rh {
        Rgb([255, 255, 255])
      } else {
        Rgb([0, 0, 0])
      }
    })
  }

  #[test]
  fn resize_preserves_aspect() {
    let frame = RgbImage::new(1200, 900);
    let resized = resize_to_width(&frame, 600).unwrap();
    assert_eq!(resized.dimensions(), (600, 450));
  }

  #[test]
  fn empty_frame_is_rejected() {
    let frame = RgbImage::new(0, 0);
    assert_eq!(
      preprocess(&frame, &PreprocessConfig::default()).unwrap_err(),
      PreprocessError::EmptyFrame {
        width: 0,
        height: 0
      }
    );
  }

  #[test]
  fn degenerate_aspect_is_rejected() {
    // 高度缩放后为 0
    let frame = RgbImage::new(5000, 1);
    assert!(matches!(
      resize_to_width(&frame, 600),
      Err(PreprocessError::Unresizable { .. })
    ));
  }

  #[test]
  fn blank_frame_has_no_dominant_contour() {
    let frame = RgbImage::new(600, 450);
    let pre = preprocess(&frame, &PreprocessConfig::default()).unwrap();
    assert!(dominant_contour(&pre.edges, &ExtractionConfig::default()).is_none());
  }

  #[test]
  fn rectangle_edges_yield_rectangle_contour() {
    let frame = filled_rect_frame(600, 450, 200, 175, 200, 100);
    let pre = preprocess(&frame, &PreprocessConfig::default()).unwrap();
    let contour = dominant_contour(&pre.edges, &ExtractionConfig::default()).unwrap();
    let b = contour.bounds().unwrap();
    assert!((b.min_x - 200.0).abs() <= 4.0, "min_x = {}", b.min_x);
    assert!((b.max_x - 400.0).abs() <= 4.0, "max_x = {}", b.max_x);
    assert!((b.min_y - 175.0).abs() <= 4.0, "min_y = {}", b.min_y);
    assert!((b.max_y - 275.0).abs() <= 4.0, "max_y = {}", b.max_y);
  }

  #[test]
  fn small_blob_is_below_area_floor() {
    let mut edges = GrayImage::new(100, 100);
    for y in 10..15 {
      for x in 10..15 {
        edges.put_pixel(x, y, Luma([255]));
      }
    }
    assert!(dominant_contour(&edges, &ExtractionConfig::default()).is_none());
    let relaxed = ExtractionConfig {
      min_contour_area: 1.0,
    };
    assert!(dominant_contour(&edges, &relaxed).is_some());
  }

  #[test]
  fn nested_contours_are_not_external() {
    // 外框内部再嵌一个实心块，只应返回外框
    let mut binary = GrayImage::new(100, 100);
    for y in 10..90 {
      for x in 10..90 {
        let ring = !(20..80).contains(&x) || !(20..80).contains(&y);
        let core = (40..60).contains(&x) && (40..60).contains(&y);
        if ring || core {
          binary.put_pixel(x, y, Luma([255]));
        }
      }
    }
    let contours = external_contours(&binary);
    assert_eq!(contours.len(), 1);
    let b = contours[0].bounds().unwrap();
    assert_eq!((b.min_x, b.max_x), (10.0, 89.0));
  }

  #[test]
  fn largest_contour_picks_max_area() {
    let small = crate::contour::rect_contour(0, 0, 10, 10);
    let big = crate::contour::rect_contour(0, 0, 50, 50);
    let picked = largest_contour(vec![small, big.clone()]).unwrap();
    assert_eq!(picked, big);
  }
}
