// 该文件是 Lunwang （轮辋） 项目的一部分。
// src/frame.rs - 张量帧与激活图定义
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

/// 网络工作分辨率（正方形边长）
pub const WORKING_SIZE: u32 = 384;

/// 归一化后的单通道输入帧，NCHW 排布 (1, 1, S, S)
#[derive(Debug, Clone)]
pub struct GrayTensorFrame {
  data: Box<[f32]>,
}

impl From<Vec<f32>> for GrayTensorFrame {
  fn from(data: Vec<f32>) -> Self {
    let expected = (WORKING_SIZE as usize) * (WORKING_SIZE as usize);
    if data.len() != expected {
      panic!("数据长度不匹配: 期望长度 {}, 实际长度 {}", expected, data.len());
    }

    Self {
      data: data.into_boxed_slice(),
    }
  }
}

impl GrayTensorFrame {
  pub fn height(&self) -> usize {
    WORKING_SIZE as usize
  }

  pub fn width(&self) -> usize {
    WORKING_SIZE as usize
  }

  pub fn as_slice(&self) -> &[f32] {
    &self.data
  }
}

/// 分割网络的原始输出：S×S 的逐像素置信度网格。
/// 创建后只读，流水线不会原地修改它。
#[derive(Debug, Clone)]
pub struct ActivationMap {
  data: Box<[f32]>,
  side: usize,
}

impl ActivationMap {
  pub fn new(data: Vec<f32>, side: usize) -> Self {
    if data.len() != side * side {
      panic!("数据长度不匹配: 期望长度 {}, 实际长度 {}", side * side, data.len());
    }

    Self {
      data: data.into_boxed_slice(),
      side,
    }
  }

  pub fn side(&self) -> usize {
    self.side
  }

  pub fn get(&self, x: usize, y: usize) -> f32 {
    self.data[y * self.side + x]
  }

  pub fn as_slice(&self) -> &[f32] {
    &self.data
  }
}
