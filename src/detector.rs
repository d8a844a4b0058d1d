// 该文件是 Lunwang （轮辋） 项目的一部分。
// src/detector.rs - 轮辋检测器
//
// 本程序遵循 GNU Affero 通用公共许可证（AGPL）许可协议。
// 本程序的发布旨在提供实用价值，但不作任何形式的担保，
// 包括但不限于对适销性或特定用途适用性的默示担保。
// 更多详情请参阅 GNU 通用公共许可证。
//
// Copyright (C) 2026 Johann Li <me@qinka.pro>, ETVP

use anyhow::{Context, Result};
use image::GrayImage;
use tracing::{debug, warn};

use crate::frame::{ActivationMap, GrayTensorFrame};
use crate::model::Model;
use crate::pose::RimPose;
use crate::postprocess::{self, RimDetection};
use crate::preprocess::{self, CropResize};

/// 轮辋检测器：持有只读模型句柄，按请求执行
/// 预处理 → 推理 → 几何后处理。
/// 流水线本身无跨调用状态，可在多个线程共享同一实例。
pub struct RimDetector<M> {
  model: M,
}

impl<M, E> RimDetector<M>
where
  M: Model<Input = GrayTensorFrame, Output = ActivationMap, Error = E>,
  E: std::error::Error + Send + Sync + 'static,
{
  pub fn new(model: M) -> Self {
    Self { model }
  }

  /// 完整检测：成功时给出原图坐标系下的椭圆与位姿。
  /// "画面里没有轮辋"是预期结果，返回 `Ok(None)`；
  /// 模型输出退化、拟合异常同样返回 `Ok(None)`，但以警告级别留痕。
  pub fn detect_full(&self, image: &GrayImage) -> Result<Option<RimDetection>> {
    let crop = CropResize::for_image(image);
    let frame = preprocess::to_tensor_frame(image);

    let map = self.model.infer(&frame).context("模型推理失败")?;

    match postprocess::detect_rim(&map, &crop) {
      Ok(detection) => {
        debug!(
          "检测到轮辋: ({}, {}), 法向 ({:.3}, {:.3}, {:.3})",
          detection.pose.x,
          detection.pose.y,
          detection.pose.x_normal,
          detection.pose.y_normal,
          detection.pose.z_normal
        );
        Ok(Some(detection))
      }
      Err(err) if err.is_no_rim() => {
        debug!("未检测到轮辋: {}", err);
        Ok(None)
      }
      Err(err) => {
        warn!("后处理异常, 按未检出处理: {}", err);
        Ok(None)
      }
    }
  }

  /// 仅取位姿
  pub fn detect(&self, image: &GrayImage) -> Result<Option<RimPose>> {
    Ok(self.detect_full(image)?.map(|detection| detection.pose))
  }
}
