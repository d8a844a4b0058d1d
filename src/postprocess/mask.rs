// 该文件是 Lunwang （轮辋） 项目的一部分。
// src/postprocess/mask.rs - 二值掩膜与主导轮廓选择
//
// 本程序遵循 GNU Affero 通用公共许可证（AGPL）许可协议。
// 本程序的发布旨在提供实用价值，但不作任何形式的担保，
// 包括但不限于对适销性或特定用途适用性的默示担保。
// 更多详情请参阅 GNU 通用公共许可证。
//
// Copyright (C) 2026 Johann Li <me@qinka.pro>, ETVP

use image::GrayImage;
use imageproc::contours::{BorderType, Contour, find_contours};
use imageproc::point::Point;
use tracing::debug;

use crate::frame::ActivationMap;

/// 从掩膜中选出的一条外轮廓：压缩后的闭合边界多边形及其面积
#[derive(Debug, Clone, PartialEq)]
pub struct SelectedContour {
  pub points: Vec<[f64; 2]>,
  pub area: f64,
}

/// 按固定阈值把归一化激活图转成 0/255 掩膜
pub fn binarize(map: &ActivationMap, threshold: f32) -> GrayImage {
  let side = map.side() as u32;
  GrayImage::from_fn(side, side, |x, y| {
    if map.get(x as usize, y as usize) > threshold {
      image::Luma([255u8])
    } else {
      image::Luma([0u8])
    }
  })
}

/// 提取掩膜所有连通前景区域的外轮廓（忽略内洞），
/// 压缩共线点后按面积选出最大者。没有前景时返回 `None`。
pub fn dominant_contour(mask: &GrayImage) -> Option<SelectedContour> {
  let contours: Vec<Contour<u32>> = find_contours(mask);

  let candidates: Vec<SelectedContour> = contours
    .iter()
    .filter(|c| c.border_type == BorderType::Outer)
    .map(|c| {
      let points = compress_collinear(&c.points);
      let area = polygon_area(&points);
      SelectedContour { points, area }
    })
    .collect();

  debug!("外轮廓数量: {}", candidates.len());
  select_dominant(candidates)
}

/// 稳定的最大面积选择：严格大于才替换，面积相同时保留追踪顺序靠前者
pub fn select_dominant(candidates: Vec<SelectedContour>) -> Option<SelectedContour> {
  let mut best: Option<SelectedContour> = None;
  for candidate in candidates {
    match &best {
      Some(current) if candidate.area > current.area => best = Some(candidate),
      Some(_) => {}
      None => best = Some(candidate),
    }
  }
  best
}

/// 去掉边界上处于同向共线段内部的点，保留段端点。
/// 方向反转处（宽度为一个像素的折返）以及拐角都会保留。
fn compress_collinear(points: &[Point<u32>]) -> Vec<[f64; 2]> {
  let n = points.len();
  if n < 3 {
    return points.iter().map(|p| [f64::from(p.x), f64::from(p.y)]).collect();
  }

  let mut out = Vec::with_capacity(n);
  for i in 0..n {
    let prev = points[(i + n - 1) % n];
    let cur = points[i];
    let next = points[(i + 1) % n];

    let ax = i64::from(cur.x) - i64::from(prev.x);
    let ay = i64::from(cur.y) - i64::from(prev.y);
    let bx = i64::from(next.x) - i64::from(cur.x);
    let by = i64::from(next.y) - i64::from(cur.y);

    let cross = ax * by - ay * bx;
    let dot = ax * bx + ay * by;
    if cross != 0 || dot <= 0 {
      out.push([f64::from(cur.x), f64::from(cur.y)]);
    }
  }

  if out.is_empty() {
    // 整条边界完全共线（退化成线段）
    out.push([f64::from(points[0].x), f64::from(points[0].y)]);
  }
  out
}

/// 鞋带公式求闭合多边形面积
fn polygon_area(points: &[[f64; 2]]) -> f64 {
  let n = points.len();
  if n < 3 {
    return 0.0;
  }

  let mut acc = 0.0;
  for i in 0..n {
    let [x0, y0] = points[i];
    let [x1, y1] = points[(i + 1) % n];
    acc += x0 * y1 - x1 * y0;
  }
  (acc * 0.5).abs()
}
