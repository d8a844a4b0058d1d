// 该文件是 Lunwang （轮辋） 项目的一部分。
// src/preprocess.rs - 推理前图像变换
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

use image::{GrayImage, imageops};
use tracing::debug;

use crate::frame::{GrayTensorFrame, WORKING_SIZE};

const NORM_MEAN: f32 = 0.45;
const NORM_STD: f32 = 0.225;

/// 推理前变换的记录：原图按短边等比缩放到工作分辨率，再居中裁剪成正方形。
/// 后处理阶段用它把椭圆参数映射回原图像素坐标。
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct CropResize {
  src_width: u32,
  src_height: u32,
}

impl CropResize {
  pub fn new(src_width: u32, src_height: u32) -> Self {
    Self {
      src_width,
      src_height,
    }
  }

  pub fn for_image(image: &GrayImage) -> Self {
    Self::new(image.width(), image.height())
  }

  pub fn src_width(&self) -> u32 {
    self.src_width
  }

  pub fn src_height(&self) -> u32 {
    self.src_height
  }

  /// 短边 / 工作分辨率，即缩放阶段的像素比例
  pub fn ratio(&self) -> f64 {
    f64::from(self.src_width.min(self.src_height)) / f64::from(WORKING_SIZE)
  }

  /// 居中裁剪在长边方向去掉的半幅宽度（原图像素单位）
  pub fn crop_offset(&self) -> f64 {
    f64::from(self.src_width.max(self.src_height) - self.src_width.min(self.src_height)) / 2.0
  }

  /// 宽是否为短边（裁剪发生在竖直方向）
  pub fn width_is_min(&self) -> bool {
    self.src_width < self.src_height
  }

  /// 高是否为短边（裁剪发生在水平方向）
  pub fn height_is_min(&self) -> bool {
    self.src_height < self.src_width
  }
}

/// 将灰度原图变换为网络输入帧：
/// 短边等比缩放到工作分辨率，居中裁剪，再做均值/方差归一化。
pub fn to_tensor_frame(image: &GrayImage) -> GrayTensorFrame {
  let (w, h) = image.dimensions();
  let min_dim = w.min(h);

  let scale = f64::from(WORKING_SIZE) / f64::from(min_dim);
  let resized_w = (f64::from(w) * scale).round().max(f64::from(WORKING_SIZE)) as u32;
  let resized_h = (f64::from(h) * scale).round().max(f64::from(WORKING_SIZE)) as u32;

  debug!(
    "预处理: {}x{} -> 缩放 {}x{} -> 裁剪 {}x{}",
    w, h, resized_w, resized_h, WORKING_SIZE, WORKING_SIZE
  );
  let resized = if (resized_w, resized_h) == (w, h) {
    image.clone()
  } else {
    imageops::resize(image, resized_w, resized_h, imageops::FilterType::Triangle)
  };

  let left = (resized_w - WORKING_SIZE) / 2;
  let top = (resized_h - WORKING_SIZE) / 2;
  let cropped = imageops::crop_imm(&resized, left, top, WORKING_SIZE, WORKING_SIZE).to_image();

  let data: Vec<f32> = cropped
    .pixels()
    .map(|p| (f32::from(p.0[0]) / 255.0 - NORM_MEAN) / NORM_STD)
    .collect();

  GrayTensorFrame::from(data)
}
