// 该文件是 Lunwang （轮辋） 项目的一部分。
// src/output.rs - 检测结果输出
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

use std::path::Path;

use image::{GrayImage, Rgb, RgbImage};
use imageproc::drawing::{draw_cross_mut, draw_line_segment_mut};
use thiserror::Error;
use tracing::warn;
use url::Url;

use crate::pose::PoseReport;
use crate::postprocess::{FittedEllipse, RimDetection};
use crate::{FromUrl, FromUrlWithScheme};

const ELLIPSE_COLOR: [u8; 3] = [0, 0, 255];
const NORMAL_COLOR: [u8; 3] = [255, 0, 0];
const ELLIPSE_SEGMENTS: usize = 180;

pub trait Render<F, R> {
  type Error;
  fn render_result(&self, frame: &F, result: &R) -> Result<(), Self::Error>;
}

#[derive(Error, Debug)]
pub enum OutputError {
  #[error("I/O 错误: {0}")]
  IoError(#[from] std::io::Error),
  #[error("图像错误: {0}")]
  ImageError(#[from] image::ImageError),
  #[error("序列化错误: {0}")]
  JsonError(#[from] serde_json::Error),
  #[error("URI 方案不匹配: {0}")]
  SchemeMismatch(String),
}

fn ensure_parent(path: &str) -> Result<(), OutputError> {
  if let Some(parent) = Path::new(path).parent()
    && !parent.as_os_str().is_empty()
  {
    std::fs::create_dir_all(parent)?;
  }
  Ok(())
}

/// 位姿 JSON 报告输出。未检出时写出空 coordinates 列表。
pub struct PoseJsonOutput {
  path: String,
}

impl FromUrlWithScheme for PoseJsonOutput {
  const SCHEME: &'static str = "json";
}

impl FromUrl for PoseJsonOutput {
  type Error = OutputError;

  fn from_url(url: &Url) -> Result<Self, Self::Error> {
    if url.scheme() != Self::SCHEME {
      return Err(OutputError::SchemeMismatch(format!(
        "期望输出方式 '{}', 实际输出方式 '{}'",
        Self::SCHEME,
        url.scheme()
      )));
    }

    Ok(PoseJsonOutput {
      path: url.path().to_string(),
    })
  }
}

impl Render<GrayImage, Option<RimDetection>> for PoseJsonOutput {
  type Error = OutputError;

  fn render_result(
    &self,
    _frame: &GrayImage,
    result: &Option<RimDetection>,
  ) -> Result<(), Self::Error> {
    let report = PoseReport::from(result.as_ref().map(|detection| detection.pose));
    ensure_parent(&self.path)?;
    std::fs::write(&self.path, serde_json::to_string_pretty(&report)?)?;
    warn!("保存位姿报告到文件: {}", self.path);
    Ok(())
  }
}

/// 叠加可视化输出：在原图上画出拟合椭圆、中心十字与法向投影
pub struct OverlayImageOutput {
  path: String,
}

impl FromUrlWithScheme for OverlayImageOutput {
  const SCHEME: &'static str = "image";
}

impl FromUrl for OverlayImageOutput {
  type Error = OutputError;

  fn from_url(url: &Url) -> Result<Self, Self::Error> {
    if url.scheme() != Self::SCHEME {
      return Err(OutputError::SchemeMismatch(format!(
        "期望输出方式 '{}', 实际输出方式 '{}'",
        Self::SCHEME,
        url.scheme()
      )));
    }

    Ok(OverlayImageOutput {
      path: url.path().to_string(),
    })
  }
}

impl Render<GrayImage, Option<RimDetection>> for OverlayImageOutput {
  type Error = OutputError;

  fn render_result(
    &self,
    frame: &GrayImage,
    result: &Option<RimDetection>,
  ) -> Result<(), Self::Error> {
    let mut canvas = gray_to_rgb(frame);

    if let Some(detection) = result {
      draw_ellipse_outline(&mut canvas, &detection.ellipse, Rgb(ELLIPSE_COLOR));
      draw_cross_mut(
        &mut canvas,
        Rgb(ELLIPSE_COLOR),
        detection.pose.x,
        detection.pose.y,
      );
      draw_normal_arrow(&mut canvas, detection, Rgb(NORMAL_COLOR));
    }

    ensure_parent(&self.path)?;
    canvas.save(&self.path)?;
    warn!("保存图像到文件: {}", self.path);
    Ok(())
  }
}

fn gray_to_rgb(image: &GrayImage) -> RgbImage {
  RgbImage::from_fn(image.width(), image.height(), |x, y| {
    let v = image.get_pixel(x, y).0[0];
    Rgb([v, v, v])
  })
}

/// 沿边界采样并用短线段连成椭圆轮廓
fn draw_ellipse_outline(canvas: &mut RgbImage, ellipse: &FittedEllipse, color: Rgb<u8>) {
  let (sin_a, cos_a) = ellipse.angle_deg.to_radians().sin_cos();
  let semi_major = ellipse.axes[1] / 2.0;
  let semi_minor = ellipse.axes[0] / 2.0;

  let boundary = |i: usize| -> (f32, f32) {
    let t = 2.0 * std::f64::consts::PI * (i % ELLIPSE_SEGMENTS) as f64 / ELLIPSE_SEGMENTS as f64;
    let px = semi_major * t.cos();
    let py = semi_minor * t.sin();
    (
      (ellipse.cx + cos_a * px - sin_a * py) as f32,
      (ellipse.cy + sin_a * px + cos_a * py) as f32,
    )
  };

  for i in 0..ELLIPSE_SEGMENTS {
    draw_line_segment_mut(canvas, boundary(i), boundary(i + 1), color);
  }
}

/// 把法向量的图内分量从中心画出去，长度按长轴的一半
fn draw_normal_arrow(canvas: &mut RgbImage, detection: &RimDetection, color: Rgb<u8>) {
  let scale = detection.ellipse.axes[1] / 2.0;
  let start = (detection.ellipse.cx as f32, detection.ellipse.cy as f32);
  let end = (
    (detection.ellipse.cx + detection.pose.x_normal * scale) as f32,
    (detection.ellipse.cy + detection.pose.y_normal * scale) as f32,
  );
  draw_line_segment_mut(canvas, start, end, color);
}
