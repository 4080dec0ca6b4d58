// 该文件是 Liangchi （量尺） 项目的一部分。
// tests/pipeline.rs - 端到端流水线测试
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
use std::sync::Arc;

use image::{GrayImage, Luma, Rgb, RgbImage};
use imageproc::point::Point;
use url::Url;

use liangchi::{
  FromUrl,
  classify::classify,
  config::InspectConfig,
  contour::Polygon,
  input::InputWrapper,
  model::{Inspector, Model},
  output::{FrameRecord, OutputWrapper},
  overlay::TransformedReference,
  task::{ContinuousTask, OneShotTask, Task},
  template::{TemplateRegistry, TemplateSpec},
};

fn scratch_dir(tag: &str) -> PathBuf {
  let dir = std::env::temp_dir().join(format!("liangchi-it-{}-{}", tag, std::process::id()));
  let _ = std::fs::remove_dir_all(&dir);
  std::fs::create_dir_all(&dir).unwrap();
  dir
}

/// 600×450 黑底，中心 200×100 白色矩形
fn centered_part() -> RgbImage {
  RgbImage::from_fn(600, 450, |x, y| {
    if (200..400).contains(&x) && (175..275).contains(&y) {
      Rgb([255, 255, 255])
    } else {
      Rgb([0, 0, 0])
    }
  })
}

/// 100×100 模板，白色方块占 [lo, hi)²
fn square_template(path: &Path, lo: u32, hi: u32) {
  GrayImage::from_fn(100, 100, |x, y| {
    if (lo..hi).contains(&x) && (lo..hi).contains(&y) {
      Luma([255])
    } else {
      Luma([0])
    }
  })
  .save(path)
  .unwrap();
}

/// WIDE 投影后约为 [168,432]×[63,387]，覆盖物体；DOT 落在物体内部
fn registry(dir: &Path) -> Arc<TemplateRegistry> {
  square_template(&dir.join("wide.png"), 10, 90);
  square_template(&dir.join("dot.png"), 45, 55);
  let specs = [
    TemplateSpec::from_path(dir.join("wide.png")),
    TemplateSpec::new("DOT", dir.join("dot.png")),
    TemplateSpec::new("GONE", dir.join("missing.png")),
  ];
  Arc::new(TemplateRegistry::load(
    &specs,
    &InspectConfig::default().template,
  ))
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
  found.sort();
  found
}

#[test]
fn templates_load_with_missing_slot() {
  let dir = scratch_dir("registry");
  let templates = registry(&dir);

  assert_eq!(templates.len(), 3);
  let names = templates
    .available()
    .map(|t| t.name.as_str())
    .collect::<Vec<_>>();
  assert_eq!(names, vec!["WIDE", "DOT"]);
  let missing = templates
    .unavailable()
    .map(|slot| slot.name().to_string())
    .collect::<Vec<_>>();
  assert_eq!(missing, vec!["GONE".to_string()]);

  let _ = std::fs::remove_dir_all(&dir);
}

#[test]
fn centered_part_matches_single_reference() {
  let dir = scratch_dir("e2e");
  let config = InspectConfig::default();
  let ratio = config.calibration.known_width_ratio;
  let mut inspector = Inspector::new(config, registry(&dir));

  let frame = liangchi::frame::Frame::new(centered_part(), 0);
  let inspection = inspector.infer(&frame).unwrap();

  assert!(inspection.is_detected());
  assert_eq!(inspection.result.matches, vec!["WIDE".to_string()]);

  let m = inspection.result.measurement.unwrap();
  assert!((m.width / ratio - 200.0).abs() < 6.0, "width {}", m.width);
  assert!((m.height / ratio - 100.0).abs() < 6.0, "height {}", m.height);

  // 固定参考框 [150,500]×[150,350]
  let detection = inspection.detection.unwrap();
  let fixed = TransformedReference {
    name: "BOX".into(),
    polygon: Polygon::from(vec![
      Point::new(150.0, 150.0),
      Point::new(500.0, 150.0),
      Point::new(500.0, 350.0),
      Point::new(150.0, 350.0),
    ]),
  };
  assert_eq!(classify(&detection.contour, [&fixed]), vec!["BOX".to_string()]);

  let _ = std::fs::remove_dir_all(&dir);
}

#[test]
fn one_shot_writes_annotated_image() {
  let dir = scratch_dir("oneshot");
  let frame_path = dir.join("frame.png");
  centered_part().save(&frame_path).unwrap();
  let out_path = dir.join("out").join("annotated.png");

  let config = InspectConfig::default();
  let input = InputWrapper::from_url(&Url::parse(&format!("image://{}", frame_path.display())).unwrap())
    .unwrap();
  let output = OutputWrapper::from_url(&Url::parse(&format!("image://{}", out_path.display())).unwrap())
    .unwrap()
    .with_render_config(config.render.clone());
  let model = Inspector::new(config, registry(&dir));

  OneShotTask.run_task(input, model, output).unwrap();

  let annotated = image::open(&out_path).unwrap().to_rgb8();
  assert_eq!(annotated.dimensions(), (600, 450));
  // 匹配时物体内部为绿色填充与原图的混合
  let inside = annotated.get_pixel(250, 200);
  assert!(inside[1] > inside[0] && inside[1] > inside[2], "{:?}", inside);

  let _ = std::fs::remove_dir_all(&dir);
}

#[test]
fn directory_batch_records_each_detected_frame() {
  let dir = scratch_dir("batch");
  let frames = dir.join("frames");
  std::fs::create_dir_all(&frames).unwrap();
  centered_part().save(frames.join("000.png")).unwrap();
  RgbImage::new(600, 450).save(frames.join("001.png")).unwrap();
  centered_part().save(frames.join("002.png")).unwrap();
  let records = dir.join("records");

  let input = InputWrapper::from_url(&Url::parse(&format!("folder://{}", frames.display())).unwrap())
    .unwrap();
  let output = OutputWrapper::from_url(
    &Url::parse(&format!("folder://{}?record", records.display())).unwrap(),
  )
  .unwrap();
  let model = Inspector::new(InspectConfig::default(), registry(&dir));

  ContinuousTask::default()
    .run_task(input, model, output)
    .unwrap();

  // 空白帧未检测到物体，不写出
  assert_eq!(files_with_extension(&records, "png").len(), 2);
  let parsed = files_with_extension(&records, "json")
    .iter()
    .map(|path| serde_json::from_slice::<FrameRecord>(&std::fs::read(path).unwrap()).unwrap())
    .collect::<Vec<_>>();
  assert_eq!(parsed.len(), 2);
  let mut indices = parsed.iter().map(|r| r.frame_index).collect::<Vec<_>>();
  indices.sort();
  assert_eq!(indices, vec![0, 2]);
  for record in &parsed {
    assert!(record.detected);
    assert_eq!(record.matches, vec!["WIDE".to_string()]);
    assert!(record.measurement.is_some());
  }

  let _ = std::fs::remove_dir_all(&dir);
}
