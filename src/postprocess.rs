// 该文件是 Lunwang （轮辋） 项目的一部分。
// src/postprocess.rs - 激活图几何后处理流水线
//
// 本程序遵循 GNU Affero 通用公共许可证（AGPL）许可协议。
// 本程序的发布旨在提供实用价值，但不作任何形式的担保，
// 包括但不限于对适销性或特定用途适用性的默示担保。
// 更多详情请参阅 GNU 通用公共许可证。
//
// Copyright (C) 2026 Johann Li <me@qinka.pro>, ETVP

use thiserror::Error;
use tracing::debug;

use crate::frame::ActivationMap;
use crate::pose::RimPose;
use crate::preprocess::CropResize;

pub mod ellipse;
pub mod mask;
pub mod normalize;
pub mod orient;
pub mod remap;

pub use ellipse::FittedEllipse;
pub use mask::SelectedContour;

/// 二值化阈值
pub const MASK_THRESHOLD: f32 = 0.3;
/// 最小轮廓面积（工作分辨率像素平方），低于此值视为没有检测到轮辋
pub const MIN_CONTOUR_AREA: f64 = 2000.0;
/// 椭圆拟合所需的最少轮廓点数
pub const MIN_FIT_POINTS: usize = 5;
/// 轴比允许超出 [-1, 1] 的容差，超出则判定拟合异常
pub const AXIS_RATIO_TOLERANCE: f64 = 1e-3;

/// 后处理失败的分类。单次调用内终止，不做内部重试。
#[derive(Error, Debug, Clone, PartialEq)]
pub enum PostprocessError {
  /// 激活图各单元完全相等，无法归一化；说明模型或输入异常，而非没有轮辋
  #[error("激活图退化: 所有单元取值相同")]
  DegenerateActivationMap,
  /// 掩膜中没有任何前景区域
  #[error("掩膜中未找到轮廓")]
  NoContourFound,
  /// 最大轮廓面积不足
  #[error("轮廓面积不足: {area:.1} < {min}", min = MIN_CONTOUR_AREA)]
  InsufficientArea { area: f64 },
  /// 轮廓点数不足以拟合椭圆
  #[error("轮廓点数不足: {got} < {min}", min = MIN_FIT_POINTS)]
  InsufficientContourPoints { got: usize },
  /// 点数足够但拟合不出有效椭圆（共线、退化点集等）
  #[error("椭圆拟合失败")]
  EllipseFitFailed,
  /// 轴比超出反余弦定义域，且超出量大于容差
  #[error("轴比超出定义域: {ratio}")]
  AxisRatioOutOfDomain { ratio: f64 },
}

impl PostprocessError {
  /// 是否属于"画面中没有轮辋"这类预期结果。
  /// 其余种类表示模型输出或拟合异常，日志级别应与之区分。
  pub fn is_no_rim(&self) -> bool {
    matches!(
      self,
      PostprocessError::NoContourFound
        | PostprocessError::InsufficientArea { .. }
        | PostprocessError::InsufficientContourPoints { .. }
    )
  }
}

/// 一次成功检测的完整几何结果
#[derive(Debug, Clone)]
pub struct RimDetection {
  /// 原图坐标系下的椭圆
  pub ellipse: FittedEllipse,
  /// 最终位姿
  pub pose: RimPose,
}

/// 完整后处理流水线：
/// 归一化 → 二值化与轮廓选择 → 面积门限与椭圆拟合 → 坐标还原 → 姿态分解。
pub fn detect_rim(
  map: &ActivationMap,
  crop: &CropResize,
) -> Result<RimDetection, PostprocessError> {
  let normalized = normalize::span_normalize(map)?;
  let mask = mask::binarize(&normalized, MASK_THRESHOLD);

  let contour = mask::dominant_contour(&mask).ok_or(PostprocessError::NoContourFound)?;
  debug!("最大轮廓: {} 点, 面积 {:.1}", contour.points.len(), contour.area);

  let fitted = ellipse::fit_gated(&contour)?;
  let fitted = remap::to_original(fitted, crop);
  debug!(
    "椭圆(原图坐标): 中心 ({:.1}, {:.1}), 轴 ({:.1}, {:.1}), 倾角 {:.1}°",
    fitted.cx, fitted.cy, fitted.axes[0], fitted.axes[1], fitted.angle_deg
  );

  let normal = orient::surface_normal(&fitted)?;

  Ok(RimDetection {
    pose: RimPose {
      x: fitted.cx as i32,
      y: fitted.cy as i32,
      x_normal: normal[0],
      y_normal: normal[1],
      z_normal: normal[2],
    },
    ellipse: fitted,
  })
}

/// 仅取最终位姿
pub fn rim_pose(map: &ActivationMap, crop: &CropResize) -> Result<RimPose, PostprocessError> {
  detect_rim(map, crop).map(|detection| detection.pose)
}
