// 该文件是 Liangchi （量尺） 项目的一部分。
// src/template.rs - 参考模板加载
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

use std::path::{Path, PathBuf};

use image::{GrayImage, ImageReader};
use imageproc::contrast::{ThresholdType, threshold};
use thiserror::Error;
use tracing::{info, warn};

use crate::config::TemplateConfig;
use crate::contour::Contour;
use crate::preprocess::{external_contours, largest_contour};

#[derive(Error, Debug)]
pub enum TemplateLoadError {
  #[error("I/O 错误: {0}")]
  IoError(#[from] std::io::Error),
  #[error("图像解码错误: {0}")]
  ImageError(#[from] image::ImageError),
  #[error("模板图像中没有轮廓")]
  NoContour,
  #[error("模板图像尺寸无效: {0}x{1}")]
  EmptyImage(u32, u32),
}

/// 一个已加载的参考轮廓及其源图尺寸
#[derive(Debug, Clone, PartialEq)]
pub struct ReferenceTemplate {
  pub name: String,
  pub contour: Contour,
  pub width: u32,
  pub height: u32,
}

impl ReferenceTemplate {
  /// 从灰度图二值化并取最大外轮廓
  pub fn from_gray(
    name: impl Into<String>,
    gray: &GrayImage,
    config: &TemplateConfig,
  ) -> Result<Self, TemplateLoadError> {
    let (width, height) = gray.dimensions();
    if width == 0 || height == 0 {
      return Err(TemplateLoadError::EmptyImage(width, height));
    }
    let binary = threshold(gray, config.binary_threshold, ThresholdType::Binary);
    let contour = largest_contour(external_contours(&binary))
      .filter(|c| !c.is_empty())
      .ok_or(TemplateLoadError::NoContour)?;
    Ok(Self {
      name: name.into(),
      contour,
      width,
      height,
    })
  }

  pub fn load(
    name: impl Into<String>,
    path: &Path,
    config: &TemplateConfig,
  ) -> Result<Self, TemplateLoadError> {
    let gray = ImageReader::open(path)?.decode()?.to_luma8();
    Self::from_gray(name, &gray, config)
  }
}

/// 模板名称与路径；名称缺省为文件名（不含扩展名）的大写形式
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct TemplateSpec {
  pub name: String,
  pub path: PathBuf,
}

impl TemplateSpec {
  pub fn new(name: impl Into<String>, path: impl Into<PathBuf>) -> Self {
    Self {
      name: name.into(),
      path: path.into(),
    }
  }

  pub fn from_path(path: impl Into<PathBuf>) -> Self {
    let path = path.into();
    let name = path
      .file_stem()
      .map(|s| s.to_string_lossy().to_uppercase())
      .unwrap_or_default();
    Self { name, path }
  }
}

impl std::str::FromStr for TemplateSpec {
  type Err = std::convert::Infallible;

  /// `NAME=path` 或 `path`
  fn from_str(s: &str) -> Result<Self, Self::Err> {
    Ok(match s.split_once('=') {
      Some((name, path)) if !name.is_empty() && !path.is_empty() => TemplateSpec::new(name, path),
      _ => TemplateSpec::from_path(s),
    })
  }
}

#[derive(Debug)]
pub enum TemplateSlot {
  Ready(ReferenceTemplate),
  Unavailable {
    name: String,
    error: TemplateLoadError,
  },
}

impl TemplateSlot {
  pub fn name(&self) -> &str {
    match self {
      TemplateSlot::Ready(template) => &template.name,
      TemplateSlot::Unavailable { name, .. } => name,
    }
  }

  pub fn template(&self) -> Option<&ReferenceTemplate> {
    match self {
      TemplateSlot::Ready(template) => Some(template),
      TemplateSlot::Unavailable { .. } => None,
    }
  }
}

/// 按加载顺序保存的模板表，加载后不再变化
#[derive(Debug, Default)]
pub struct TemplateRegistry {
  slots: Vec<TemplateSlot>,
}

impl TemplateRegistry {
  /// 逐个加载；失败的模板记为不可用，不中断启动
  pub fn load(specs: &[TemplateSpec], config: &TemplateConfig) -> Self {
    let slots = specs
      .iter()
      .map(|spec| match ReferenceTemplate::load(&spec.name, &spec.path, config) {
        Ok(template) => {
          info!(
            "加载模板 {}: {} ({}x{}, {} 个轮廓点)",
            spec.name,
            spec.path.display(),
            template.width,
            template.height,
            template.contour.len()
          );
          TemplateSlot::Ready(template)
        }
        Err(error) => {
          warn!(
            "模板 {} 不可用: {} ({})",
            spec.name,
            spec.path.display(),
            error
          );
          TemplateSlot::Unavailable {
            name: spec.name.clone(),
            error,
          }
        }
      })
      .collect();
    Self { slots }
  }

  pub fn push(&mut self, slot: TemplateSlot) {
    self.slots.push(slot);
  }

  pub fn slots(&self) -> &[TemplateSlot] {
    &self.slots
  }

  pub fn available(&self) -> impl Iterator<Item = &ReferenceTemplate> {
    self.slots.iter().filter_map(TemplateSlot::template)
  }

  pub fn unavailable(&self) -> impl Iterator<Item = &TemplateSlot> {
    self
      .slots
      .iter()
      .filter(|slot| matches!(slot, TemplateSlot::Unavailable { .. }))
  }

  pub fn len(&self) -> usize {
    self.slots.len()
  }

  pub fn is_empty(&self) -> bool {
    self.slots.is_empty()
  }
}

impl FromIterator<ReferenceTemplate> for TemplateRegistry {
  fn from_iter<I: IntoIterator<Item = ReferenceTemplate>>(iter: I) -> Self {
    Self {
      slots: iter.into_iter().map(TemplateSlot::Ready).collect(),
    }
  }
}

#[cfg(test)]
mod tests {
  use super::*;
  use image::Luma;

  #[test]
  fn spec_name_from_stem() {
    let spec: TemplateSpec = "/data/refs/front.png".parse().unwrap();
    assert_eq!(spec.name, "FRONT");
    assert_eq!(spec.path, PathBuf::from("/data/refs/front.png"));
  }

  #[test]
  fn spec_with_explicit_name() {
    let spec: TemplateSpec = "Rear Disc=refs/rear.png".parse().unwrap();
    assert_eq!(spec.name, "Rear Disc");
    assert_eq!(spec.path, PathBuf::from("refs/rear.png"));
  }

  #[test]
  fn binarized_silhouette_is_extracted() {
    let gray = GrayImage::from_fn(200, 100, |x, y| {
      if (50..150).contains(&x) && (20..80).contains(&y) {
        Luma([255])
      } else {
        Luma([0])
      }
    });
    let template = ReferenceTemplate::from_gray("BLOCK", &gray, &TemplateConfig::default()).unwrap();
    assert_eq!((template.width, template.height), (200, 100));
    let b = template.contour.bounds().unwrap();
    assert_eq!((b.min_x, b.min_y, b.max_x, b.max_y), (50.0, 20.0, 149.0, 79.0));
  }

  #[test]
  fn dark_image_has_no_contour() {
    let gray = GrayImage::from_pixel(50, 50, Luma([100]));
    assert!(matches!(
      ReferenceTemplate::from_gray("DARK", &gray, &TemplateConfig::default()),
      Err(TemplateLoadError::NoContour)
    ));
  }

  #[test]
  fn missing_file_marks_slot_unavailable() {
    let specs = [TemplateSpec::from_path("/nonexistent/liangchi/missing.png")];
    let registry = TemplateRegistry::load(&specs, &TemplateConfig::default());
    assert_eq!(registry.len(), 1);
    assert_eq!(registry.available().count(), 0);
    assert_eq!(registry.unavailable().count(), 1);
    assert_eq!(registry.slots()[0].name(), "MISSING");
  }
}
