// 该文件是 Liangchi （量尺） 项目的一部分。
// src/config.rs - 检测参数配置
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

//! # 检测参数
//!
//! 所有可调参数按处理阶段分组。缺省值即产线上使用的固定常量，
//! 也可以从 JSON 文件中读取，文件里只需写出需要覆盖的字段：
//!
//! ```no_run
//! use liangchi::config::InspectConfig;
//! use std::path::Path;
//!
//! let config = InspectConfig::from_json_file(Path::new("inspect.json"))?;
//! # Ok::<(), liangchi::config::ConfigError>(())
//! ```

use std::path::Path;

use serde::{Deserialize, Serialize};
use thiserror::Error;
use tracing::info;

pub const WORKING_WIDTH: u32 = 600;
pub const BLUR_KERNEL_SIZE: u32 = 7;
pub const CANNY_LOW_THRESHOLD: f32 = 50.0;
pub const CANNY_HIGH_THRESHOLD: f32 = 100.0;
pub const MIN_CONTOUR_AREA: f64 = 100.0;
pub const TEMPLATE_BINARY_THRESHOLD: u8 = 127;
pub const TEMPLATE_FRACTION_H: f64 = 0.55;
pub const TEMPLATE_FRACTION_V: f64 = 0.9;
// 已知宽度 14cm 的参照物在预先测量中占 362 像素
pub const KNOWN_WIDTH_RATIO: f64 = 14.0 / 362.0;
pub const OVERLAY_ALPHA: f32 = 0.6;
pub const MATCH_LABEL_PREFIX: &str = "MATCH: ";
pub const NO_MATCH_LABEL: &str = "NO MATCH";

#[derive(Error, Debug)]
pub enum ConfigError {
  #[error("无法读取配置文件: {0}")]
  IoError(#[from] std::io::Error),
  #[error("配置文件格式错误: {0}")]
  ParseError(#[from] serde_json::Error),
  #[error("参数无效: {0}")]
  Invalid(String),
}

/// 完整的检测配置
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct InspectConfig {
  pub preprocess: PreprocessConfig,
  pub extraction: ExtractionConfig,
  pub template: TemplateConfig,
  pub calibration: CalibrationConfig,
  pub render: RenderConfig,
}

/// 帧预处理参数
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct PreprocessConfig {
  /// 缩放后的工作宽度（保持宽高比）
  pub working_width: u32,
  /// 高斯平滑核大小，必须为奇数
  pub blur_kernel_size: u32,
  /// Canny 低阈值
  pub canny_low: f32,
  /// Canny 高阈值
  pub canny_high: f32,
}

impl Default for PreprocessConfig {
  fn default() -> Self {
    Self {
      working_width: WORKING_WIDTH,
      blur_kernel_size: BLUR_KERNEL_SIZE,
      canny_low: CANNY_LOW_THRESHOLD,
      canny_high: CANNY_HIGH_THRESHOLD,
    }
  }
}

impl PreprocessConfig {
  /// 与 OpenCV 相同的由核大小推导 sigma 的规则
  pub fn blur_sigma(&self) -> f32 {
    let k = self.blur_kernel_size as f32;
    0.3 * ((k - 1.0) * 0.5 - 1.0) + 0.8
  }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct ExtractionConfig {
  /// 主轮廓的最小面积（像素²）
  pub min_contour_area: f64,
}

impl Default for ExtractionConfig {
  fn default() -> Self {
    Self {
      min_contour_area: MIN_CONTOUR_AREA,
    }
  }
}

/// 参考模板的加载与投影参数
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct TemplateConfig {
  pub binary_threshold: u8,
  /// 水平方向占画面宽度的比例
  pub fraction_h: f64,
  /// 垂直方向占画面高度的比例
  pub fraction_v: f64,
}

impl Default for TemplateConfig {
  fn default() -> Self {
    Self {
      binary_threshold: TEMPLATE_BINARY_THRESHOLD,
      fraction_h: TEMPLATE_FRACTION_H,
      fraction_v: TEMPLATE_FRACTION_V,
    }
  }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct CalibrationConfig {
  /// 已知物理宽度 ÷ 预先测得的参照像素宽度（cm/px）
  pub known_width_ratio: f64,
}

impl Default for CalibrationConfig {
  fn default() -> Self {
    Self {
      known_width_ratio: KNOWN_WIDTH_RATIO,
    }
  }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct RenderConfig {
  /// 叠加层不透明度
  pub alpha: f32,
  pub match_label_prefix: String,
  pub no_match_label: String,
}

impl Default for RenderConfig {
  fn default() -> Self {
    Self {
      alpha: OVERLAY_ALPHA,
      match_label_prefix: MATCH_LABEL_PREFIX.to_string(),
      no_match_label: NO_MATCH_LABEL.to_string(),
    }
  }
}

impl InspectConfig {
  pub fn from_json_file(path: &Path) -> Result<Self, ConfigError> {
    info!("读取配置文件: {}", path.display());
    let text = std::fs::read_to_string(path)?;
    Self::from_json_str(&text)
  }

  pub fn from_json_str(text: &str) -> Result<Self, ConfigError> {
    let config: InspectConfig = serde_json::from_str(text)?;
    config.validate()?;
    Ok(config)
  }

  pub fn validate(&self) -> Result<(), ConfigError> {
    let p = &self.preprocess;
    if p.working_width == 0 {
      return Err(ConfigError::Invalid("working_width 必须大于 0".into()));
    }
    if p.blur_kernel_size == 0 || p.blur_kernel_size % 2 == 0 {
      return Err(ConfigError::Invalid(format!(
        "blur_kernel_size 必须为正奇数, 实际为 {}",
        p.blur_kernel_size
      )));
    }
    if p.canny_low > p.canny_high {
      return Err(ConfigError::Invalid(format!(
        "canny_low ({}) 不能大于 canny_high ({})",
        p.canny_low, p.canny_high
      )));
    }
    if !(0.0..=1.0).contains(&self.render.alpha) {
      return Err(ConfigError::Invalid(format!(
        "alpha 必须在 0.0 - 1.0 之间, 实际为 {}",
        self.render.alpha
      )));
    }
    if self.template.fraction_h <= 0.0 || self.template.fraction_v <= 0.0 {
      return Err(ConfigError::Invalid("模板缩放比例必须为正数".into()));
    }
    let ratio = self.calibration.known_width_ratio;
    if !ratio.is_finite() || ratio <= 0.0 {
      return Err(ConfigError::Invalid(format!(
        "known_width_ratio 必须为正数, 实际为 {}",
        ratio
      )));
    }
    let min_area = self.extraction.min_contour_area;
    if !min_area.is_finite() || min_area < 0.0 {
      return Err(ConfigError::Invalid(format!(
        "min_contour_area 不能为负数, 实际为 {}",
        min_area
      )));
    }
    Ok(())
  }
}
