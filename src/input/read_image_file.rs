// 该文件是 Liangchi （量尺） 项目的一部分。
// src/input/read_image_file.rs - 图像文件与目录输入
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
use std::time::Instant;

use image::{ImageReader, RgbImage};
use thiserror::Error;
use tracing::{debug, error, warn};
use url::Url;

use crate::{FromUrl, FromUrlWithScheme, frame::Frame};

const IMAGE_EXTENSIONS: [&str; 6] = ["jpg", "jpeg", "png", "bmp", "gif", "webp"];

#[derive(Error, Debug)]
pub enum ImageFileInputError {
  #[error("URI schema mismatch")]
  SchemaMismatch,
  #[error("I/O error: {0}")]
  IoError(#[from] std::io::Error),
  #[error("Image loading error: {0}")]
  ImageLoadError(#[from] image::ImageError),
}

fn read_rgb(path: &Path) -> Result<RgbImage, ImageFileInputError> {
  Ok(ImageReader::open(path)?.with_guessed_format()?.decode()?.to_rgb8())
}

fn check_scheme(url: &Url, expected: &str) -> Result<(), ImageFileInputError> {
  if url.scheme() != expected {
    error!(
      "URI scheme mismatch: expected '{}', found '{}'",
      expected,
      url.scheme()
    );
    return Err(ImageFileInputError::SchemaMismatch);
  }
  Ok(())
}

/// 单张图片，产生一帧
pub struct ImageFileInput {
  image: Option<RgbImage>,
}

impl FromUrlWithScheme for ImageFileInput {
  const SCHEME: &'static str = "image";
}

impl FromUrl for ImageFileInput {
  type Error = ImageFileInputError;

  fn from_url(url: &Url) -> Result<Self, Self::Error> {
    check_scheme(url, Self::SCHEME)?;
    let image = read_rgb(Path::new(url.path()))?;
    Ok(ImageFileInput { image: Some(image) })
  }
}

impl From<RgbImage> for ImageFileInput {
  fn from(image: RgbImage) -> Self {
    Self { image: Some(image) }
  }
}

impl Iterator for ImageFileInput {
  type Item = Frame;

  fn next(&mut self) -> Option<Self::Item> {
    self.image.take().map(Frame::from)
  }
}

/// 目录中的所有图片，按文件名顺序逐帧读取；
/// 无法解码的文件记录警告后跳过
pub struct DirectoryInput {
  files: std::vec::IntoIter<PathBuf>,
  index: u64,
  started: Instant,
}

impl FromUrlWithScheme for DirectoryInput {
  const SCHEME: &'static str = "folder";
}

impl FromUrl for DirectoryInput {
  type Error = ImageFileInputError;

  fn from_url(url: &Url) -> Result<Self, Self::Error> {
    check_scheme(url, Self::SCHEME)?;
    Self::open(Path::new(url.path()))
  }
}

impl DirectoryInput {
  pub fn open(directory: &Path) -> Result<Self, ImageFileInputError> {
    let mut files = std::fs::read_dir(directory)?
      .filter_map(|entry| entry.ok().map(|e| e.path()))
      .filter(|path| {
        path.is_file()
          && path
            .extension()
            .map(|ext| ext.to_string_lossy().to_lowercase())
            .is_some_and(|ext| IMAGE_EXTENSIONS.contains(&ext.as_str()))
      })
      .collect::<Vec<_>>();
    files.sort();
    debug!("目录 {} 中共有 {} 张图片", directory.display(), files.len());

    Ok(Self {
      files: files.into_iter(),
      index: 0,
      started: Instant::now(),
    })
  }
}

impl Iterator for DirectoryInput {
  type Item = Frame;

  fn next(&mut self) -> Option<Self::Item> {
    for path in self.files.by_ref() {
      match read_rgb(&path) {
        Ok(image) => {
          let frame = Frame::new(image, self.index)
            .with_timestamp(self.started.elapsed().as_millis() as u64);
          self.index += 1;
          return Some(frame);
        }
        Err(e) => {
          warn!("跳过无法读取的图片 {}: {}", path.display(), e);
        }
      }
    }
    None
  }
}
