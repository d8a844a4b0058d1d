// 该文件是 Lunwang （轮辋） 项目的一部分。
// src/postprocess/normalize.rs - 激活图归一化
//
// 本程序遵循 GNU Affero 通用公共许可证（AGPL）许可协议。
// 本程序的发布旨在提供实用价值，但不作任何形式的担保，
// 包括但不限于对适销性或特定用途适用性的默示担保。
// 更多详情请参阅 GNU 通用公共许可证。
//
// Copyright (C) 2026 Johann Li <me@qinka.pro>, ETVP

use crate::frame::ActivationMap;

use super::PostprocessError;

/// 把原始激活图按取值范围线性拉伸到 [0, 1]。
/// 全图取值相同时无法定义拉伸，返回 `DegenerateActivationMap`。
pub fn span_normalize(map: &ActivationMap) -> Result<ActivationMap, PostprocessError> {
  let mut min = f32::INFINITY;
  let mut max = f32::NEG_INFINITY;
  for &v in map.as_slice() {
    min = min.min(v);
    max = max.max(v);
  }

  let span = max - min;
  if !(span > 0.0) {
    return Err(PostprocessError::DegenerateActivationMap);
  }

  let data = map.as_slice().iter().map(|&v| (v - min) / span).collect();
  Ok(ActivationMap::new(data, map.side()))
}

#[cfg(test)]
mod tests {
  use super::*;
  use approx::assert_relative_eq;

  #[test]
  fn stretches_to_unit_range() {
    let map = ActivationMap::new(vec![-2.0, 0.0, 2.0, 6.0], 2);
    let normalized = span_normalize(&map).unwrap();

    assert_relative_eq!(normalized.get(0, 0), 0.0);
    assert_relative_eq!(normalized.get(1, 0), 0.25);
    assert_relative_eq!(normalized.get(0, 1), 0.5);
    assert_relative_eq!(normalized.get(1, 1), 1.0);
    assert!(normalized.as_slice().iter().all(|v| (0.0..=1.0).contains(v)));
  }

  #[test]
  fn flat_map_is_degenerate() {
    let map = ActivationMap::new(vec![0.7; 16], 4);
    let err = span_normalize(&map).unwrap_err();
    assert_eq!(err, PostprocessError::DegenerateActivationMap);
    assert!(!err.is_no_rim());
  }

  #[test]
  fn input_is_not_mutated() {
    let map = ActivationMap::new(vec![1.0, 2.0, 3.0, 4.0], 2);
    let _ = span_normalize(&map).unwrap();
    assert_eq!(map.as_slice(), &[1.0, 2.0, 3.0, 4.0]);
  }
}
