// 该文件是 Liangchi （量尺） 项目的一部分。
// src/model.rs - 检测模型与结果
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

use image::RgbImage;
use serde::{Deserialize, Serialize};

use crate::calibration::{Measurement, OrientedBox};
use crate::contour::Contour;
use crate::overlay::TransformedReference;

pub trait Model {
  type Input;
  type Output;
  type Error;

  fn infer(&mut self, input: &Self::Input) -> Result<Self::Output, Self::Error>;
}

/// 单帧分类结果：匹配的参考名称（按参考顺序）与测量尺寸
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct ClassificationResult {
  pub matches: Vec<String>,
  pub measurement: Option<Measurement>,
}

impl ClassificationResult {
  pub fn is_match(&self) -> bool {
    !self.matches.is_empty()
  }

  pub fn is_empty(&self) -> bool {
    self.matches.is_empty() && self.measurement.is_none()
  }
}

/// 主轮廓及其派生的全部几何量
#[derive(Debug, Clone)]
pub struct Detection {
  pub contour: Contour,
  pub oriented_box: OrientedBox,
  pub references: Vec<TransformedReference>,
}

/// 一帧的检测输出；`image` 为工作尺寸下的帧
#[derive(Debug, Clone)]
pub struct Inspection {
  pub image: RgbImage,
  pub detection: Option<Detection>,
  pub result: ClassificationResult,
}

impl Inspection {
  pub fn is_detected(&self) -> bool {
    self.detection.is_some()
  }
}

mod inspector;
pub use self::inspector::{InspectError, Inspector};
