// 该文件是 Lunwang （轮辋） 项目的一部分。
// src/model/onnx.rs - ONNX 分割模型后端
//
// 本程序遵循 GNU Affero 通用公共许可证（AGPL）许可协议。
// 本程序的发布旨在提供实用价值，但不作任何形式的担保，
// 包括但不限于对适销性或特定用途适用性的默示担保。
// 更多详情请参阅 GNU 通用公共许可证。
//
// Copyright (C) 2026 Johann Li <me@qinka.pro>, ETVP

use std::sync::Mutex;

use ort::session::{Session, builder::GraphOptimizationLevel};
use ort::value::Value;
use thiserror::Error;
use tracing::{debug, info};
use url::Url;

use crate::frame::{ActivationMap, GrayTensorFrame, WORKING_SIZE};
use crate::model::Model;
use crate::{FromUrl, FromUrlWithScheme};

#[derive(Error, Debug)]
pub enum OnnxSegmenterError {
  #[error("模型路径错误: {0}")]
  ModelPathError(String),
  #[error("ONNX 运行时错误: {0}")]
  OrtError(#[from] ort::Error),
  #[error("模型无输入张量")]
  MissingInput,
  #[error("输出形状不匹配: 期望 {expected} 个单元, 实际 {got}")]
  BadOutputShape { expected: usize, got: usize },
  #[error("推理会话锁中毒")]
  SessionPoisoned,
}

pub struct OnnxSegmenterBuilder {
  model_path: String,
}

impl FromUrlWithScheme for OnnxSegmenterBuilder {
  const SCHEME: &'static str = "onnx";
}

impl FromUrl for OnnxSegmenterBuilder {
  type Error = OnnxSegmenterError;

  fn from_url(url: &Url) -> Result<Self, Self::Error> {
    if url.scheme() != Self::SCHEME {
      return Err(OnnxSegmenterError::ModelPathError(format!(
        "模型路径必须使用 {} 方案",
        Self::SCHEME
      )));
    }

    Ok(OnnxSegmenterBuilder {
      model_path: url.path().to_string(),
    })
  }
}

impl OnnxSegmenterBuilder {
  pub fn build(self) -> Result<OnnxSegmenter, OnnxSegmenterError> {
    info!("加载模型文件: {}", self.model_path);

    // 推理本身保持单线程，调用方通过会话锁串行化并发请求
    let session = Session::builder()?
      .with_optimization_level(GraphOptimizationLevel::Level3)?
      .with_intra_threads(1)?
      .commit_from_file(&self.model_path)?;

    let input_name = session
      .inputs
      .first()
      .map(|i| i.name.clone())
      .ok_or(OnnxSegmenterError::MissingInput)?;
    debug!("模型输入张量: {}", input_name);
    info!("模型加载完成");

    Ok(OnnxSegmenter {
      session: Mutex::new(session),
      input_name,
    })
  }
}

/// 进程级只读模型句柄：启动时构建一次，每次推理按引用传入使用
pub struct OnnxSegmenter {
  session: Mutex<Session>,
  input_name: String,
}

impl Model for OnnxSegmenter {
  type Input = GrayTensorFrame;
  type Output = ActivationMap;
  type Error = OnnxSegmenterError;

  fn infer(&self, input: &Self::Input) -> Result<Self::Output, Self::Error> {
    let side = WORKING_SIZE as usize;
    let shape = [1usize, 1, side, side];
    let value = Value::from_array((shape.as_slice(), input.as_slice().to_vec().into_boxed_slice()))?;

    debug!("执行模型推理");
    let mut session = self
      .session
      .lock()
      .map_err(|_| OnnxSegmenterError::SessionPoisoned)?;
    let outputs = session.run(ort::inputs![self.input_name.as_str() => value])?;

    let (_, data) = outputs[0].try_extract_tensor::<f32>()?;
    let expected = side * side;
    if data.len() != expected {
      return Err(OnnxSegmenterError::BadOutputShape {
        expected,
        got: data.len(),
      });
    }

    Ok(ActivationMap::new(data.to_vec(), side))
  }
}
