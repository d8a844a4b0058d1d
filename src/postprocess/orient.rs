// 该文件是 Lunwang （轮辋） 项目的一部分。
// src/postprocess/orient.rs - 椭圆形状到表面法向的分解
//
// 本程序遵循 GNU Affero 通用公共许可证（AGPL）许可协议。
// 本程序的发布旨在提供实用价值，但不作任何形式的担保，
// 包括但不限于对适销性或特定用途适用性的默示担保。
// 更多详情请参阅 GNU 通用公共许可证。
//
// Copyright (C) 2026 Johann Li <me@qinka.pro>, ETVP

use super::ellipse::FittedEllipse;
use super::{AXIS_RATIO_TOLERANCE, PostprocessError};

/// 圆形轮辋斜视时投影成椭圆：轴比是视线倾角 α 的余弦，
/// 椭圆倾角给出第二个倾转分量 β。输出单位法向量
///   (cos α·cos β, sin β, sin α·cos β)。
/// 拟合噪声可能把轴比推出 [-1, 1] 一点点，在容差内截断处理；
/// 超出容差说明拟合本身退化，返回 `AxisRatioOutOfDomain`。
pub fn surface_normal(ellipse: &FittedEllipse) -> Result<[f64; 3], PostprocessError> {
  let ratio = ellipse.axes[0] / ellipse.axes[1];
  if !ratio.is_finite() || ratio.abs() > 1.0 + AXIS_RATIO_TOLERANCE {
    return Err(PostprocessError::AxisRatioOutOfDomain { ratio });
  }

  let alpha = ratio.clamp(-1.0, 1.0).acos();
  let beta = ellipse.angle_deg.to_radians();

  Ok([
    alpha.cos() * beta.cos(),
    beta.sin(),
    alpha.sin() * beta.cos(),
  ])
}
