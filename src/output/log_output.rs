// 该文件是 Liangchi （量尺） 项目的一部分。
// src/output/log_output.rs - 分类结果日志输出
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
use tracing::info;
use url::Url;

use crate::{
  FromUrl, FromUrlWithScheme,
  config::RenderConfig,
  frame::Frame,
  model::Inspection,
  output::{Render, draw::status_text},
};

#[derive(Error, Debug)]
pub enum LogOutputError {
  #[error("URI 方案不匹配")]
  SchemeMismatch,
}

#[derive(Debug, Default)]
pub struct LogOutput {
  config: RenderConfig,
}

impl LogOutput {
  pub fn with_render_config(mut self, config: RenderConfig) -> Self {
    self.config = config;
    self
  }

  pub fn describe(&self, frame: &Frame, result: &Inspection) -> String {
    if !result.is_detected() {
      return format!("第 {} 帧: 未检测到物体", frame.index);
    }
    let status = status_text(&self.config, &result.result);
    match result.result.measurement {
      Some(m) => format!(
        "第 {} 帧: {} (宽 {:.2}cm, 高 {:.2}cm)",
        frame.index, status, m.width, m.height
      ),
      None => format!("第 {} 帧: {}", frame.index, status),
    }
  }
}

impl FromUrlWithScheme for LogOutput {
  const SCHEME: &'static str = "log";
}

impl FromUrl for LogOutput {
  type Error = LogOutputError;

  fn from_url(url: &Url) -> Result<Self, Self::Error> {
    if url.scheme() != Self::SCHEME {
      return Err(LogOutputError::SchemeMismatch);
    }
    Ok(LogOutput::default())
  }
}

impl Render<Frame, Inspection> for LogOutput {
  type Error = LogOutputError;

  fn render_result(&self, frame: &Frame, result: &Inspection) -> Result<(), Self::Error> {
    info!("{}", self.describe(frame, result));
    Ok(())
  }
}
