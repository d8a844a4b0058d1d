// 该文件是 Lunwang （轮辋） 项目的一部分。
// tests/pipeline.rs - 几何后处理端到端测试
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

mod common;

use common::{SyntheticModel, disk_map, map_from_predicate, uniform_map};
use image::GrayImage;
use lunwang::detector::RimDetector;
use lunwang::frame::WORKING_SIZE;
use lunwang::postprocess::{self, PostprocessError};
use lunwang::preprocess::CropResize;

fn norm_sq(x: f64, y: f64, z: f64) -> f64 {
  x * x + y * y + z * z
}

#[test]
fn centered_disk_on_square_image() {
  // 半径 50 的圆盘在 384x384 画布中心，原图同尺寸：还原是恒等变换
  let map = disk_map(192, 192, 50);
  let crop = CropResize::new(384, 384);

  let detection = postprocess::detect_rim(&map, &crop).expect("应当检出");

  assert!((190..=193).contains(&detection.pose.x), "x = {}", detection.pose.x);
  assert!((190..=193).contains(&detection.pose.y), "y = {}", detection.pose.y);

  // 拟合轴长接近直径 100，接近正圆
  for axis in detection.ellipse.axes {
    assert!((95.0..106.0).contains(&axis), "axis = {}", axis);
  }

  let pose = detection.pose;
  assert!(
    (norm_sq(pose.x_normal, pose.y_normal, pose.z_normal) - 1.0).abs() < 1e-9,
    "法向量必须是单位向量"
  );
  // 正对相机: 倾角接近 0，法向几乎落在像平面外法线上
  assert!(pose.z_normal.abs() < 0.2, "z_normal = {}", pose.z_normal);
  assert!(
    pose.x_normal * pose.x_normal + pose.y_normal * pose.y_normal > 0.95,
    "面向分量过小"
  );
}

#[test]
fn wide_original_restores_crop_offset() {
  // 原图 768x384：工作坐标 (192,192) 的目标真实中心在 (384,192)
  let map = disk_map(192, 192, 50);
  let crop = CropResize::new(768, 384);

  let pose = postprocess::rim_pose(&map, &crop).expect("应当检出");
  assert!((382..=385).contains(&pose.x), "x = {}", pose.x);
  assert!((190..=193).contains(&pose.y), "y = {}", pose.y);
}

#[test]
fn tall_original_restores_crop_offset() {
  let map = disk_map(192, 192, 50);
  let crop = CropResize::new(384, 768);

  let pose = postprocess::rim_pose(&map, &crop).expect("应当检出");
  assert!((190..=193).contains(&pose.x), "x = {}", pose.x);
  assert!((382..=385).contains(&pose.y), "y = {}", pose.y);
}

#[test]
fn scaled_original_restores_resize() {
  // 原图 960x480: ratio = 1.25，中心与轴长同时放大
  let map = disk_map(192, 192, 60);
  let crop = CropResize::new(960, 480);

  let detection = postprocess::detect_rim(&map, &crop).expect("应当检出");
  // (192 + 240/1.25) * 1.25 = 480
  assert!((478..=481).contains(&detection.pose.x), "x = {}", detection.pose.x);
  assert!((238..=241).contains(&detection.pose.y), "y = {}", detection.pose.y);
  for axis in detection.ellipse.axes {
    assert!((143.0..157.0).contains(&axis), "axis = {}", axis);
  }
}

#[test]
fn flat_map_reports_degenerate_not_nan() {
  let crop = CropResize::new(384, 384);
  let err = postprocess::rim_pose(&uniform_map(0.7), &crop).unwrap_err();
  assert_eq!(err, PostprocessError::DegenerateActivationMap);
  assert!(!err.is_no_rim());

  let err = postprocess::rim_pose(&uniform_map(0.0), &crop).unwrap_err();
  assert_eq!(err, PostprocessError::DegenerateActivationMap);
}

#[test]
fn tiny_blob_is_no_rim() {
  // 单个亮点：有轮廓但面积为零
  let map = map_from_predicate(|x, y| x == 10 && y == 10);
  let crop = CropResize::new(384, 384);

  let err = postprocess::rim_pose(&map, &crop).unwrap_err();
  assert!(matches!(err, PostprocessError::InsufficientArea { .. }));
  assert!(err.is_no_rim());
}

#[test]
fn square_region_lacks_fit_points() {
  // 60x60 方块面积足够，但边界压缩后只剩四个角点
  let map = map_from_predicate(|x, y| (100..160).contains(&x) && (100..160).contains(&y));
  let crop = CropResize::new(384, 384);

  let err = postprocess::rim_pose(&map, &crop).unwrap_err();
  assert_eq!(err, PostprocessError::InsufficientContourPoints { got: 4 });
  assert!(err.is_no_rim());
}

#[test]
fn triangle_region_lacks_fit_points() {
  // 直角三角形，斜边 45°：压缩后顶点数不足
  let map = map_from_predicate(|x, y| {
    (100..=250).contains(&y) && (100..=250).contains(&x) && x + y <= 350
  });
  let crop = CropResize::new(384, 384);

  match postprocess::rim_pose(&map, &crop).unwrap_err() {
    PostprocessError::InsufficientContourPoints { got } => assert!(got < 5, "got = {}", got),
    other => panic!("意外的错误种类: {:?}", other),
  }
}

#[test]
fn equal_disks_pick_first_in_trace_order() {
  // 两个完全相同的圆盘，光栅化后面积一致；按追踪顺序取左上在前者
  let left = disk_map(100, 192, 40);
  let both = map_from_predicate(|x, y| {
    let near = |cx: i64, cy: i64| {
      let dx = x as i64 - cx;
      let dy = y as i64 - cy;
      dx * dx + dy * dy <= 40 * 40
    };
    near(100, 192) || near(290, 192)
  });
  let crop = CropResize::new(384, 384);

  let picked = postprocess::rim_pose(&both, &crop).expect("应当检出");
  let reference = postprocess::rim_pose(&left, &crop).expect("应当检出");
  assert_eq!(picked.x, reference.x);
  assert_eq!(picked.y, reference.y);
  assert!((95..=105).contains(&picked.x), "x = {}", picked.x);
}

#[test]
fn detector_runs_with_synthetic_model() {
  let detector = RimDetector::new(SyntheticModel::new(disk_map(192, 192, 50)));
  let image = GrayImage::new(WORKING_SIZE, WORKING_SIZE);

  let pose = detector.detect(&image).unwrap().expect("应当检出");
  assert!((190..=193).contains(&pose.x));
  assert!((190..=193).contains(&pose.y));
}

#[test]
fn detector_maps_no_rim_to_none() {
  let detector = RimDetector::new(SyntheticModel::new(map_from_predicate(|x, y| {
    x == 10 && y == 10
  })));
  let image = GrayImage::new(WORKING_SIZE, WORKING_SIZE);

  assert!(detector.detect(&image).unwrap().is_none());
}

#[test]
fn detector_maps_anomaly_to_none() {
  let detector = RimDetector::new(SyntheticModel::new(uniform_map(0.5)));
  let image = GrayImage::new(WORKING_SIZE, WORKING_SIZE);

  assert!(detector.detect(&image).unwrap().is_none());
}

#[test]
fn detector_honours_original_dimensions() {
  // 检测器自己推导 CropResize：宽图下位姿落回原图坐标
  let detector = RimDetector::new(SyntheticModel::new(disk_map(192, 192, 50)));
  let image = GrayImage::new(768, 384);

  let pose = detector.detect(&image).unwrap().expect("应当检出");
  assert!((382..=385).contains(&pose.x), "x = {}", pose.x);
}
