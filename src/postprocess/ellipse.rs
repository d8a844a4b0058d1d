// 该文件是 Lunwang （轮辋） 项目的一部分。
// src/postprocess/ellipse.rs - 面积门限与最小二乘椭圆拟合
//
// 本程序遵循 GNU Affero 通用公共许可证（AGPL）许可协议。
// 本程序的发布旨在提供实用价值，但不作任何形式的担保，
// 包括但不限于对适销性或特定用途适用性的默示担保。
// 更多详情请参阅 GNU 通用公共许可证。
//
// Copyright (C) 2026 Johann Li <me@qinka.pro>, ETVP

use nalgebra::{DMatrix, Matrix3, Vector3, Vector6};

use super::mask::SelectedContour;
use super::{MIN_CONTOUR_AREA, MIN_FIT_POINTS, PostprocessError};

/// 拟合得到的几何椭圆。
/// 轴长为全长（直径），`axes[0]` 是短轴、`axes[1]` 是长轴；
/// `angle_deg` 是长轴相对 +x 的倾角，约定范围 [0, 180)。
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct FittedEllipse {
  pub cx: f64,
  pub cy: f64,
  pub axes: [f64; 2],
  pub angle_deg: f64,
}

/// 先做面积与点数门限，再对选中轮廓做直接最小二乘椭圆拟合
pub fn fit_gated(contour: &SelectedContour) -> Result<FittedEllipse, PostprocessError> {
  if contour.area < MIN_CONTOUR_AREA {
    return Err(PostprocessError::InsufficientArea { area: contour.area });
  }
  if contour.points.len() < MIN_FIT_POINTS {
    return Err(PostprocessError::InsufficientContourPoints {
      got: contour.points.len(),
    });
  }

  fit_direct(&contour.points).ok_or(PostprocessError::EllipseFitFailed)
}

/// Fitzgibbon 等 (1999) 的直接最小二乘椭圆拟合。
/// 通过约束矩阵 C1 把椭圆条件 (B² − 4AC < 0) 编码成 3×3 广义特征值问题。
/// 点集共线或退化时没有有效解，返回 `None`。
pub fn fit_direct(points: &[[f64; 2]]) -> Option<FittedEllipse> {
  let n = points.len();
  if n < MIN_FIT_POINTS {
    return None;
  }

  // 为数值稳定先平移到质心并缩放，使到质心的平均距离约为 √2
  let (mean_x, mean_y, scale) = normalization_params(points);

  // 设计矩阵 D = [x², xy, y², x, y, 1]
  let mut design = DMatrix::<f64>::zeros(n, 6);
  for (i, &[px, py]) in points.iter().enumerate() {
    let x = (px - mean_x) * scale;
    let y = (py - mean_y) * scale;
    design[(i, 0)] = x * x;
    design[(i, 1)] = x * y;
    design[(i, 2)] = y * y;
    design[(i, 3)] = x;
    design[(i, 4)] = y;
    design[(i, 5)] = 1.0;
  }

  // 散布矩阵 S = DᵀD，按二次项/一次项分块
  let scatter = design.transpose() * &design;
  let s11 = scatter.fixed_view::<3, 3>(0, 0).into_owned();
  let s12 = scatter.fixed_view::<3, 3>(0, 3).into_owned();
  let s22 = scatter.fixed_view::<3, 3>(3, 3).into_owned();

  // 椭圆约束矩阵: aᵀ C1 a = 4AC − B²
  let c1 = Matrix3::new(0.0, 0.0, 2.0, 0.0, -1.0, 0.0, 2.0, 0.0, 0.0);

  // 消去一次项后化成 C1⁻¹ M a1 = λ a1
  let s22_inv = s22.try_inverse()?;
  let reduced = s11 - s12 * s22_inv * s12.transpose();
  let system = c1.try_inverse()? * reduced;

  let a1 = constrained_eigenvector(&system)?;
  let a2 = -s22_inv * s12.transpose() * a1;

  let coeffs = denormalize_conic(
    &Vector6::new(a1[0], a1[1], a1[2], a2[0], a2[1], a2[2]),
    mean_x,
    mean_y,
    scale,
  );

  conic_to_geometric(&coeffs)
}

fn normalization_params(points: &[[f64; 2]]) -> (f64, f64, f64) {
  let n = points.len() as f64;
  let mean_x: f64 = points.iter().map(|p| p[0]).sum::<f64>() / n;
  let mean_y: f64 = points.iter().map(|p| p[1]).sum::<f64>() / n;

  let mean_dist: f64 = points
    .iter()
    .map(|p| ((p[0] - mean_x).powi(2) + (p[1] - mean_y).powi(2)).sqrt())
    .sum::<f64>()
    / n;

  let scale = if mean_dist > 1e-15 {
    std::f64::consts::SQRT_2 / mean_dist
  } else {
    1.0
  };

  (mean_x, mean_y, scale)
}

/// 在 C1⁻¹M 的实特征向量中找出满足椭圆约束 aᵀ C1 a > 0 的那一个。
/// C1⁻¹M 一般不对称，特征值用特征多项式（三次方程）求根，
/// 特征向量取 (A − λI) 伴随矩阵中范数最大的行。
fn constrained_eigenvector(system: &Matrix3<f64>) -> Option<Vector3<f64>> {
  let trace = system[(0, 0)] + system[(1, 1)] + system[(2, 2)];
  let minor_sum = system[(0, 0)] * system[(1, 1)] - system[(0, 1)] * system[(1, 0)]
    + system[(0, 0)] * system[(2, 2)]
    - system[(0, 2)] * system[(2, 0)]
    + system[(1, 1)] * system[(2, 2)]
    - system[(1, 2)] * system[(2, 1)];
  let det = system.determinant();

  // λ³ − tr·λ² + Σminor·λ − det = 0
  let eigenvalues = solve_cubic_real(-trace, minor_sum, -det);

  let mut best: Option<Vector3<f64>> = None;
  let mut best_abs = f64::MAX;
  for ev in eigenvalues {
    let shifted = system - Matrix3::identity() * ev;
    let Some(v) = null_vector(&shifted) else {
      continue;
    };

    let constraint = 4.0 * v[0] * v[2] - v[1] * v[1];
    if constraint > 0.0 && ev.abs() < best_abs {
      best_abs = ev.abs();
      best = Some(v);
    }
  }
  best
}

/// 近奇异 3×3 矩阵的零空间向量：取伴随矩阵范数最大的行。
/// 秩为 2 时伴随矩阵的每个非零行都与零空间向量成比例。
fn null_vector(m: &Matrix3<f64>) -> Option<Vector3<f64>> {
  let rows = [
    Vector3::new(
      m[(1, 1)] * m[(2, 2)] - m[(1, 2)] * m[(2, 1)],
      -(m[(1, 0)] * m[(2, 2)] - m[(1, 2)] * m[(2, 0)]),
      m[(1, 0)] * m[(2, 1)] - m[(1, 1)] * m[(2, 0)],
    ),
    Vector3::new(
      -(m[(0, 1)] * m[(2, 2)] - m[(0, 2)] * m[(2, 1)]),
      m[(0, 0)] * m[(2, 2)] - m[(0, 2)] * m[(2, 0)],
      -(m[(0, 0)] * m[(2, 1)] - m[(0, 1)] * m[(2, 0)]),
    ),
    Vector3::new(
      m[(0, 1)] * m[(1, 2)] - m[(0, 2)] * m[(1, 1)],
      -(m[(0, 0)] * m[(1, 2)] - m[(0, 2)] * m[(1, 0)]),
      m[(0, 0)] * m[(1, 1)] - m[(0, 1)] * m[(1, 0)],
    ),
  ];

  let mut best = &rows[0];
  let mut best_norm = best.norm_squared();
  for row in &rows[1..] {
    let norm = row.norm_squared();
    if norm > best_norm {
      best = row;
      best_norm = norm;
    }
  }

  if best_norm < 1e-30 {
    return None;
  }
  Some(best / best_norm.sqrt())
}

/// 实系数三次方程 x³ + bx² + cx + d = 0 的全部实根
fn solve_cubic_real(b: f64, c: f64, d: f64) -> Vec<f64> {
  let p = c - b * b / 3.0;
  let q = 2.0 * b * b * b / 27.0 - b * c / 3.0 + d;
  let shift = -b / 3.0;

  let disc = -4.0 * p * p * p - 27.0 * q * q;
  if disc >= 0.0 {
    // 三个实根
    let r = (-p / 3.0).sqrt();
    let cos_arg = if r.abs() < 1e-15 {
      0.0
    } else {
      (-q / (2.0 * r * r * r)).clamp(-1.0, 1.0)
    };
    let theta = cos_arg.acos();
    let two_r = 2.0 * r;
    vec![
      two_r * (theta / 3.0).cos() + shift,
      two_r * ((theta + 2.0 * std::f64::consts::PI) / 3.0).cos() + shift,
      two_r * ((theta + 4.0 * std::f64::consts::PI) / 3.0).cos() + shift,
    ]
  } else {
    // 一个实根（卡尔丹公式）
    let sqrt_disc = (q * q / 4.0 + p * p * p / 27.0).sqrt();
    let u = (-q / 2.0 + sqrt_disc).cbrt();
    let v = (-q / 2.0 - sqrt_disc).cbrt();
    vec![u + v + shift]
  }
}

/// 把归一化坐标系下的圆锥曲线系数代换回原坐标系。
/// 归一化为 x' = s(x − mx), y' = s(y − my)。
fn denormalize_conic(c: &Vector6<f64>, mx: f64, my: f64, s: f64) -> [f64; 6] {
  let [a_, b_, c_, d_, e_, f_] = [c[0], c[1], c[2], c[3], c[4], c[5]];
  let s2 = s * s;

  let a = a_ * s2;
  let b = b_ * s2;
  let c = c_ * s2;
  let d = -2.0 * a_ * s2 * mx - b_ * s2 * my + d_ * s;
  let e = -b_ * s2 * mx - 2.0 * c_ * s2 * my + e_ * s;
  let f =
    a_ * s2 * mx * mx + b_ * s2 * mx * my + c_ * s2 * my * my - d_ * s * mx - e_ * s * my + f_;

  [a, b, c, d, e, f]
}

/// 一般圆锥曲线 Ax² + Bxy + Cy² + Dx + Ey + F = 0 转几何椭圆参数。
/// 判别式非负（非椭圆）或中心/轴长退化时返回 `None`。
fn conic_to_geometric(coeffs: &[f64; 6]) -> Option<FittedEllipse> {
  let [a, b, c, d, e, f] = *coeffs;

  let disc = b * b - 4.0 * a * c;
  if disc >= 0.0 {
    return None;
  }

  // 中心由梯度为零的 2×2 线性方程组解出
  let denom = -disc;
  let cx = (b * e - 2.0 * c * d) / denom;
  let cy = (b * d - 2.0 * a * e) / denom;

  // 长轴方向
  let angle = if (a - c).abs() < 1e-15 {
    if b > 0.0 {
      std::f64::consts::FRAC_PI_4
    } else if b < 0.0 {
      -std::f64::consts::FRAC_PI_4
    } else {
      0.0
    }
  } else {
    0.5 * b.atan2(a - c)
  };

  // 半轴长来自二次型的两个特征值
  let sum = a + c;
  let diff = ((a - c).powi(2) + b * b).sqrt();
  let lambda1 = (sum + diff) / 2.0;
  let lambda2 = (sum - diff) / 2.0;

  let f_center = a * cx * cx + b * cx * cy + c * cy * cy + d * cx + e * cy + f;
  if f_center.abs() < 1e-15 {
    return None;
  }

  let semi_sq_1 = -f_center / lambda1;
  let semi_sq_2 = -f_center / lambda2;
  if semi_sq_1 <= 0.0 || semi_sq_2 <= 0.0 {
    return None;
  }

  let (mut semi_major, mut semi_minor) = (semi_sq_1.sqrt(), semi_sq_2.sqrt());
  let mut major_angle = angle;
  if semi_major < semi_minor {
    std::mem::swap(&mut semi_major, &mut semi_minor);
    major_angle += std::f64::consts::FRAC_PI_2;
  }

  if !(semi_major.is_finite() && semi_minor.is_finite() && cx.is_finite() && cy.is_finite()) {
    return None;
  }

  Some(FittedEllipse {
    cx,
    cy,
    axes: [2.0 * semi_minor, 2.0 * semi_major],
    angle_deg: normalize_angle_deg(major_angle.to_degrees()),
  })
}

/// 角度归一到 [0, 180)
fn normalize_angle_deg(mut deg: f64) -> f64 {
  deg %= 180.0;
  if deg < 0.0 {
    deg += 180.0;
  }
  deg
}
