// 该文件是 Liangchi （量尺） 项目的一部分。
// src/task.rs - 任务调度
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

use std::{sync::mpsc::Receiver, thread, time::Duration};

use anyhow::Context;
use tracing::{info, warn};

use crate::{model::Model, output::Render};

pub trait Task<I, M, O>: Sized {
  type Error;
  fn run_task(self, input: I, model: M, output: O) -> Result<(), Self::Error>;
}

/// 仅处理第一帧
pub struct OneShotTask;

impl<
  F,
  D,
  ME: std::error::Error + Sync + Send + 'static,
  RE: std::error::Error + Sync + Send + 'static,
  I: Iterator<Item = F>,
  M: Model<Input = F, Output = D, Error = ME>,
  O: Render<F, D, Error = RE>,
> Task<I, M, O> for OneShotTask
{
  type Error = anyhow::Error;

  fn run_task(self, mut input: I, mut model: M, output: O) -> Result<(), Self::Error> {
    info!("开始任务...");
    let frame = input.next().ok_or_else(|| anyhow::anyhow!("没有输入帧"))?;
    info!("输入帧获取成功，开始检测...");
    let now = std::time::Instant::now();
    let result = match model.infer(&frame) {
      Ok(result) => result,
      Err(e) => {
        warn!("帧处理失败，已跳过: {}", e);
        return Ok(());
      }
    };
    let elapsed = now.elapsed();
    info!("检测完成，耗时: {:.2?}", elapsed);
    output
      .render_result(&frame, &result)
      .context("输出检测结果失败")?;
    info!("渲染完成，耗时: {:.2?}", now.elapsed());

    Ok(())
  }
}

#[derive(Default, Debug)]
pub struct ContinuousTask {
  frame_number: Option<usize>,
}

impl ContinuousTask {
  pub fn with_frame_number(mut self, frame_number: Option<usize>) -> Self {
    self.frame_number = frame_number;
    self
  }

  fn interrupt_signal() -> Option<Receiver<()>> {
    let (tx, rx) = std::sync::mpsc::channel();

    let installed = ctrlc::set_handler(move || {
      info!("收到中断信号，准备退出...");
      let _ = tx.send(());
      thread::spawn(|| {
        thread::sleep(Duration::from_secs(30));
        warn!("强制退出程序");
        std::process::exit(1);
      });
    });

    match installed {
      Ok(()) => Some(rx),
      Err(e) => {
        warn!("无法注册 Ctrl-C 处理函数: {}", e);
        None
      }
    }
  }
}

impl<
  F,
  D,
  ME: std::error::Error + Sync + Send + 'static,
  RE: std::error::Error + Sync + Send + 'static,
  I: Iterator<Item = F>,
  M: Model<Input = F, Output = D, Error = ME>,
  O: Render<F, D, Error = RE>,
> Task<I, M, O> for ContinuousTask
{
  type Error = anyhow::Error;

  fn run_task(self, input: I, mut model: M, output: O) -> Result<(), Self::Error> {
    info!("开始任务...");
    let interrupt = Self::interrupt_signal();

    let mut frame_index = 0usize;
    let mut skipped = 0usize;
    let mut now = std::time::Instant::now();
    for frame in input {
      frame_index = frame_index.saturating_add(1);
      info!("处理第 {} 帧图像", frame_index);
      match model.infer(&frame) {
        Ok(result) => {
          let elapsed_a = now.elapsed();
          output
            .render_result(&frame, &result)
            .with_context(|| format!("第 {} 帧输出失败", frame_index))?;
          let elapsed_b = now.elapsed();
          info!("检测完成，耗时: {:.2?} / {:.2?}", elapsed_a, elapsed_b);
        }
        Err(e) => {
          skipped += 1;
          warn!("第 {} 帧处理失败，已跳过: {}", frame_index, e);
        }
      }
      now = std::time::Instant::now();

      if self.frame_number.is_some_and(|n| frame_index >= n) {
        info!("达到指定帧数 {}, 退出任务循环", frame_index);
        break;
      }
      if interrupt.as_ref().is_some_and(|rx| rx.try_recv().is_ok()) {
        warn!("中断信号接收，退出任务循环");
        break;
      }
    }

    info!("任务完成，共 {} 帧，跳过 {} 帧", frame_index, skipped);
    Ok(())
  }
}
