// 该文件是 Liangchi （量尺） 项目的一部分。
// src/model/inspector.rs - 单帧测量与分类流水线
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

use std::sync::Arc;

use image::RgbImage;
use thiserror::Error;
use tracing::{debug, warn};

use crate::{
  calibration::{CalibrationState, OrientedBox},
  classify::classify,
  config::InspectConfig,
  frame::Frame,
  model::{ClassificationResult, Detection, Inspection, Model},
  overlay::transform_reference,
  preprocess::{PreprocessError, dominant_contour, preprocess},
  template::TemplateRegistry,
};

#[derive(Error, Debug, PartialEq, Eq)]
pub enum InspectError {
  #[error("帧采集失败: {0}")]
  Acquisition(#[from] PreprocessError),
}

/// 一路相机对应一个实例；模板表可在多个实例之间共享，标定状态各自独立
pub struct Inspector {
  config: InspectConfig,
  templates: Arc<TemplateRegistry>,
  calibration: CalibrationState,
}

impl Inspector {
  pub fn new(config: InspectConfig, templates: Arc<TemplateRegistry>) -> Self {
    Self {
      config,
      templates,
      calibration: CalibrationState::default(),
    }
  }

  pub fn config(&self) -> &InspectConfig {
    &self.config
  }

  pub fn templates(&self) -> &Arc<TemplateRegistry> {
    &self.templates
  }

  pub fn calibration(&self) -> CalibrationState {
    self.calibration
  }

  pub fn inspect(&mut self, image: &RgbImage) -> Result<Inspection, InspectError> {
    let pre = preprocess(image, &self.config.preprocess)?;

    let Some(contour) = dominant_contour(&pre.edges, &self.config.extraction) else {
      debug!("未检测到有效轮廓");
      return Ok(Inspection {
        image: pre.image,
        detection: None,
        result: ClassificationResult::default(),
      });
    };

    let Some(oriented_box) = OrientedBox::enclosing(&contour) else {
      return Ok(Inspection {
        image: pre.image,
        detection: None,
        result: ClassificationResult::default(),
      });
    };

    let spans = oriented_box.spans();
    let measurement = self
      .calibration
      .measure(spans, self.config.calibration.known_width_ratio);

    let (width, height) = pre.image.dimensions();
    let references = self
      .templates
      .available()
      .filter_map(
        |template| match transform_reference(template, width, height, &self.config.template) {
          Ok(reference) => Some(reference),
          Err(e) => {
            warn!("模板 {} 无法投影: {}", template.name, e);
            None
          }
        },
      )
      .collect::<Vec<_>>();

    let matches = classify(&contour, &references);
    debug!(
      "dA {:.1}px, dB {:.1}px, 宽 {:.2}cm, 高 {:.2}cm, 匹配 {:?}",
      spans.vertical, spans.horizontal, measurement.width, measurement.height, matches
    );

    Ok(Inspection {
      image: pre.image,
      detection: Some(Detection {
        contour,
        oriented_box,
        references,
      }),
      result: ClassificationResult {
        matches,
        measurement: Some(measurement),
      },
    })
  }
}

impl Model for Inspector {
  type Input = Frame;
  type Output = Inspection;
  type Error = InspectError;

  fn infer(&mut self, input: &Self::Input) -> Result<Self::Output, Self::Error> {
    self.inspect(&input.image)
  }
}

#[cfg(test)]
mod tests {
  use super::*;
  use crate::contour::rect_contour;
  use crate::template::{ReferenceTemplate, TemplateLoadError, TemplateSlot};
  use approx::assert_relative_eq;
  use image::Rgb;

  fn rect_frame(w: u32, h: u32, x0: u32, y0: u32, rw: u32, rh: u32) -> RgbImage {
    RgbImage::from_fn(w, h, |x, y| {
      if x >= x0 && x < x0 + rw && y >= y0 && y < y0 + rh {
        Rgb([255, 255, 255])
      } else {
        Rgb([0, 0, 0])
      }
    })
  }

  fn registry_with_missing() -> Arc<TemplateRegistry> {
    let mut registry: TemplateRegistry = [ReferenceTemplate {
      name: "FULL".into(),
      contour: rect_contour(0, 0, 100, 100),
      width: 100,
      height: 100,
    }]
    .into_iter()
    .collect();
    registry.push(TemplateSlot::Unavailable {
      name: "GONE".into(),
      error: TemplateLoadError::NoContour,
    });
    Arc::new(registry)
  }

  #[test]
  fn empty_frame_is_an_acquisition_failure() {
    let mut inspector = Inspector::new(InspectConfig::default(), registry_with_missing());
    let err = inspector.inspect(&RgbImage::new(0, 10)).unwrap_err();
    assert!(matches!(err, InspectError::Acquisition(_)));
    assert!(!inspector.calibration().is_calibrated());
  }

  #[test]
  fn blank_frame_is_no_detection() {
    let mut inspector = Inspector::new(InspectConfig::default(), registry_with_missing());
    let inspection = inspector.inspect(&RgbImage::new(600, 450)).unwrap();
    assert!(!inspection.is_detected());
    assert!(inspection.result.is_empty());
    assert!(!inspector.calibration().is_calibrated());
  }

  #[test]
  fn missing_template_never_matches() {
    let mut inspector = Inspector::new(InspectConfig::default(), registry_with_missing());
    let inspection = inspector.inspect(&rect_frame(600, 450, 200, 175, 200, 100)).unwrap();
    assert_eq!(inspection.result.matches, vec!["FULL".to_string()]);
    let detection = inspection.detection.unwrap();
    assert_eq!(detection.references.len(), 1);
  }

  #[test]
  fn width_is_latched_across_frames() {
    let ratio = InspectConfig::default().calibration.known_width_ratio;
    let mut inspector = Inspector::new(InspectConfig::default(), registry_with_missing());

    let first = inspector.inspect(&rect_frame(600, 450, 200, 175, 200, 100)).unwrap();
    let latched = inspector.calibration().pixels_per_metric().unwrap();
    let first_m = first.result.measurement.unwrap();
    assert_relative_eq!(first_m.width, latched);
    assert!((first_m.width / ratio - 200.0).abs() < 6.0);

    // 第二帧物体更宽更高：宽度保持锁定值，高度重新测量
    let second = inspector.inspect(&rect_frame(600, 450, 150, 150, 300, 150)).unwrap();
    let second_m = second.result.measurement.unwrap();
    assert_relative_eq!(second_m.width, latched);
    assert_eq!(inspector.calibration().pixels_per_metric(), Some(latched));
    assert!((second_m.height / ratio - 150.0).abs() < 6.0);
  }

  #[test]
  fn each_inspector_owns_its_calibration() {
    let templates = registry_with_missing();
    let mut a = Inspector::new(InspectConfig::default(), Arc::clone(&templates));
    let mut b = Inspector::new(InspectConfig::default(), templates);
    a.inspect(&rect_frame(600, 450, 200, 175, 200, 100)).unwrap();
    assert!(a.calibration().is_calibrated());
    assert!(!b.calibration().is_calibrated());
    b.inspect(&rect_frame(600, 450, 100, 100, 400, 200)).unwrap();
    assert_ne!(a.calibration(), b.calibration());
  }
}
