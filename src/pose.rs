// 该文件是 Lunwang （轮辋） 项目的一部分。
// src/pose.rs - 轮辋位姿输出类型
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

use serde::Serialize;

/// 最终检测结果：原图像素坐标加单位表面法向量
#[derive(Debug, Clone, Copy, PartialEq, Serialize)]
pub struct RimPose {
  pub x: i32,
  pub y: i32,
  pub x_normal: f64,
  pub y_normal: f64,
  pub z_normal: f64,
}

/// 对外序列化的报告形状：检出时单条记录，未检出时为空列表而非错误
#[derive(Debug, Clone, Serialize)]
pub struct PoseReport {
  pub coordinates: Vec<RimPose>,
}

impl From<Option<RimPose>> for PoseReport {
  fn from(pose: Option<RimPose>) -> Self {
    Self {
      coordinates: pose.into_iter().collect(),
    }
  }
}
