// 该文件是 Liangchi （量尺） 项目的一部分。
// src/bin/inspect_oneshot.rs - 单帧测量与分类
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

use std::path::PathBuf;
use std::sync::Arc;

use anyhow::{Context, Result};
use clap::Parser;
use url::Url;

use liangchi::{
  FromUrl,
  config::InspectConfig,
  input::InputWrapper,
  model::Inspector,
  output::OutputWrapper,
  task::{OneShotTask, Task},
  template::{TemplateRegistry, TemplateSpec},
};
use tracing::info;

/// Liangchi 单帧检测参数
#[derive(Parser, Debug)]
#[command(author, version, about, long_about = None)]
pub struct Args {
  /// 输入来源，例如 image:///path/to/frame.png
  #[arg(long, value_name = "SOURCE")]
  pub input: Url,
  /// 输出，例如 image:///path/to/out.png 或 log://
  #[arg(long, value_name = "OUTPUT")]
  pub output: Url,
  /// 参考模板，`NAME=path` 或 `path`（名称取文件名大写），可重复
  #[arg(long = "reference", value_name = "TEMPLATE")]
  pub references: Vec<TemplateSpec>,
  /// JSON 配置文件
  #[arg(long, value_name = "FILE")]
  pub config: Option<PathBuf>,
}

fn main() -> Result<()> {
  tracing_subscriber::fmt::init();

  let args = Args::parse();

  info!("输入来源: {}", args.input);
  info!("输出路径: {}", args.output);

  let config = match &args.config {
    Some(path) => InspectConfig::from_json_file(path)
      .with_context(|| format!("无法读取配置文件 {}", path.display()))?,
    None => InspectConfig::default(),
  };

  let templates = Arc::new(TemplateRegistry::load(&args.references, &config.template));
  info!("已加载 {} / {} 个参考模板", templates.available().count(), templates.len());

  let input = InputWrapper::from_url(&args.input)?;
  let output = OutputWrapper::from_url(&args.output)?.with_render_config(config.render.clone());
  let model = Inspector::new(config, templates);

  OneShotTask.run_task(input, model, output)?;

  Ok(())
}
