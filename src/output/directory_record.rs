// 该文件是 Liangchi （量尺） 项目的一部分。
// src/output/directory_record.rs - 目录记录输出
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

use std::fs::File;
use std::io::BufWriter;
use std::path::{Path, PathBuf};
use std::sync::Mutex;

use chrono::{DateTime, Datelike, Utc};
use serde::{Deserialize, Serialize};
use thiserror::Error;
use tracing::debug;

use crate::{
  FromUrl, FromUrlWithScheme,
  calibration::Measurement,
  config::RenderConfig,
  frame::Frame,
  model::Inspection,
  output::{Render, draw::Draw},
};

#[derive(Error, Debug)]
pub enum DirectoryRecordOutputError {
  #[error("URI 方案不匹配")]
  SchemeMismatch,
  #[error("图像错误: {0}")]
  ImageError(#[from] image::ImageError),
  #[error("I/O 错误: {0}")]
  IoError(#[from] std::io::Error),
  #[error("记录序列化错误: {0}")]
  SerializeError(#[from] serde_json::Error),
  #[error("字体加载失败: {0}")]
  FontError(#[from] ab_glyph::InvalidFont),
  #[error("帧计数器不可用")]
  CounterPoisoned,
}

/// 与标注图同名的 `.json` 记录
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct FrameRecord {
  pub timestamp: String,
  pub frame_index: u64,
  pub image: String,
  pub detected: bool,
  pub matches: Vec<String>,
  pub measurement: Option<Measurement>,
}

pub struct DirectoryRecordOutput {
  directory: PathBuf,
  draw: Draw,
  frame_counter: Mutex<u16>,
  record: bool,
  always: bool,
}

impl FromUrlWithScheme for DirectoryRecordOutput {
  const SCHEME: &'static str = "folder";
}

impl FromUrl for DirectoryRecordOutput {
  type Error = DirectoryRecordOutputError;

  fn from_url(uri: &url::Url) -> Result<Self, Self::Error> {
    if uri.scheme() != Self::SCHEME {
      return Err(DirectoryRecordOutputError::SchemeMismatch);
    }

    let record = uri.query_pairs().any(|(k, _)| k == "record");
    let always = uri.query_pairs().any(|(k, _)| k == "always");

    Ok(DirectoryRecordOutput {
      directory: PathBuf::from(uri.path()),
      draw: Draw::new(RenderConfig::default())?,
      frame_counter: Mutex::new(0),
      record,
      always,
    })
  }
}

impl DirectoryRecordOutput {
  pub fn with_render_config(mut self, config: RenderConfig) -> Self {
    self.draw.set_config(config);
    self
  }

  pub fn directory(&self) -> &Path {
    &self.directory
  }

  fn frame_id(&self) -> Result<u16, DirectoryRecordOutputError> {
    let mut counter = self
      .frame_counter
      .lock()
      .map_err(|_| DirectoryRecordOutputError::CounterPoisoned)?;
    *counter = counter.wrapping_add(1);
    Ok(*counter)
  }

  fn frame_path(&self, now: &DateTime<Utc>) -> Result<PathBuf, DirectoryRecordOutputError> {
    let directory = self
      .directory
      .join(now.year().to_string())
      .join(format!("{:02}", now.month()))
      .join(format!("{:02}", now.day()));
    std::fs::create_dir_all(&directory)?;

    Ok(directory.join(format!(
      "{}-{:04X}.png",
      now.format("%H-%M-%S"),
      self.frame_id()?
    )))
  }

  fn write_record(
    &self,
    path: &Path,
    now: &DateTime<Utc>,
    frame: &Frame,
    result: &Inspection,
  ) -> Result<(), DirectoryRecordOutputError> {
    let record = FrameRecord {
      timestamp: now.to_rfc3339(),
      frame_index: frame.index,
      image: path
        .file_name()
        .map(|name| name.to_string_lossy().into_owned())
        .unwrap_or_default(),
      detected: result.is_detected(),
      matches: result.result.matches.clone(),
      measurement: result.result.measurement,
    };
    let writer = BufWriter::new(File::create(path.with_extension("json"))?);
    serde_json::to_writer_pretty(writer, &record)?;
    Ok(())
  }
}

impl Render<Frame, Inspection> for DirectoryRecordOutput {
  type Error = DirectoryRecordOutputError;

  fn render_result(&self, frame: &Frame, result: &Inspection) -> Result<(), Self::Error> {
    if !self.always && !result.is_detected() {
      return Ok(());
    }

    let now = Utc::now();
    let path = self.frame_path(&now)?;
    self.draw.compose(result).save(&path)?;
    if self.record {
      self.write_record(&path, &now, frame, result)?;
    }
    debug!("保存第 {} 帧到 {}", frame.index, path.display());

    Ok(())
  }
}

#[cfg(test)]
mod tests {
  use super::*;
  use crate::model::ClassificationResult;
  use image::RgbImage;
  use url::Url;

  fn scratch_dir(tag: &str) -> PathBuf {
    let dir = std::env::temp_dir().join(format!("liangchi-record-{}-{}", tag, std::process::id()));
    let _ = std::fs::remove_dir_all(&dir);
    dir
  }

  fn files_with_extension(dir: &Path, ext: &str) -> Vec<PathBuf> {
    let mut found = Vec::new();
    let mut pending = vec![dir.to_path_buf()];
    while let Some(current) = pending.pop() {
      let Ok(entries) = std::fs::read_dir(&current) else {
        continue;
      };
      for entry in entries.flatten() {
        let path = entry.path();
        if path.is_dir() {
          pending.push(path);
        } else if path.extension().is_some_and(|e| e == ext) {
          found.push(path);
        }
      }
    }
    found
  }

  fn empty_inspection() -> Inspection {
    Inspection {
      image: RgbImage::new(8, 8),
      detection: None,
      result: ClassificationResult::default(),
    }
  }

  #[test]
  fn query_flags_are_parsed() {
    let url = Url::parse("folder:///tmp/liangchi?record&always").unwrap();
    let output = DirectoryRecordOutput::from_url(&url).unwrap();
    assert!(output.record);
    assert!(output.always);
    assert_eq!(output.directory(), Path::new("/tmp/liangchi"));
  }

  #[test]
  fn frames_without_detection_are_skipped_by_default() {
    let dir = scratch_dir("skip");
    let url = Url::parse(&format!("folder://{}", dir.display())).unwrap();
    let output = DirectoryRecordOutput::from_url(&url).unwrap();
    output
      .render_result(&Frame::new(RgbImage::new(8, 8), 0), &empty_inspection())
      .unwrap();
    assert!(files_with_extension(&dir, "png").is_empty());
  }

  #[test]
  fn always_writes_frame_and_record() {
    let dir = scratch_dir("always");
    let url = Url::parse(&format!("folder://{}?record&always", dir.display())).unwrap();
    let output = DirectoryRecordOutput::from_url(&url).unwrap();
    output
      .render_result(&Frame::new(RgbImage::new(8, 8), 4), &empty_inspection())
      .unwrap();

    let images = files_with_extension(&dir, "png");
    assert_eq!(images.len(), 1);
    let name = images[0].file_name().unwrap().to_string_lossy().into_owned();
    assert!(name.ends_with("-0001.png"));

    let records = files_with_extension(&dir, "json");
    assert_eq!(records.len(), 1);
    let record: FrameRecord =
      serde_json::from_reader(File::open(&records[0]).unwrap()).unwrap();
    assert_eq!(record.frame_index, 4);
    assert_eq!(record.image, name);
    assert!(!record.detected);
    assert!(record.matches.is_empty());

    let _ = std::fs::remove_dir_all(&dir);
  }
}
