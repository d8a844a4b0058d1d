// 该文件是 Lunwang （轮辋） 项目的一部分。
// tests/common/mod.rs - 测试用合成激活图与模型
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

use std::convert::Infallible;

use lunwang::frame::{ActivationMap, GrayTensorFrame, WORKING_SIZE};
use lunwang::model::Model;

pub const SIDE: usize = WORKING_SIZE as usize;

/// 背景 0、给定区域 1 的合成激活图
pub fn map_from_predicate<F: Fn(usize, usize) -> bool>(foreground: F) -> ActivationMap {
  let mut data = vec![0.0f32; SIDE * SIDE];
  for y in 0..SIDE {
    for x in 0..SIDE {
      if foreground(x, y) {
        data[y * SIDE + x] = 1.0;
      }
    }
  }
  ActivationMap::new(data, SIDE)
}

/// 实心圆盘
pub fn disk_map(cx: i64, cy: i64, r: i64) -> ActivationMap {
  map_from_predicate(|x, y| {
    let dx = x as i64 - cx;
    let dy = y as i64 - cy;
    dx * dx + dy * dy <= r * r
  })
}

/// 所有单元同值的退化激活图
pub fn uniform_map(value: f32) -> ActivationMap {
  ActivationMap::new(vec![value; SIDE * SIDE], SIDE)
}

/// 返回固定激活图的模型替身，用来在不加载任何网络的情况下
/// 跑通检测器的完整路径
pub struct SyntheticModel {
  map: ActivationMap,
}

impl SyntheticModel {
  pub fn new(map: ActivationMap) -> Self {
    Self { map }
  }
}

impl Model for SyntheticModel {
  type Input = GrayTensorFrame;
  type Output = ActivationMap;
  type Error = Infallible;

  fn infer(&self, _input: &Self::Input) -> Result<Self::Output, Self::Error> {
    Ok(self.map.clone())
  }
}
