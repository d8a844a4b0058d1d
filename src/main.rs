// 该文件是 Lunwang （轮辋） 项目的一部分。
// src/main.rs - 项目主程序
//
// 本程序遵循 GNU Affero 通用公共许可证（AGPL）许可协议。
// 本程序的发布旨在提供实用价值，但不作任何形式的担保，
// 包括但不限于对适销性或特定用途适用性的默示担保。
// 更多详情请参阅 GNU 通用公共许可证。
//
// Copyright (C) 2026 Johann Li <me@qinka.pro>, ETVP

use anyhow::{Result, bail};
use clap::Parser;
use tracing::info;
use url::Url;

use lunwang::{
  FromUrl,
  detector::RimDetector,
  input::ImageFileInput,
  model::OnnxSegmenterBuilder,
  output::{OverlayImageOutput, PoseJsonOutput, Render},
};

/// Lunwang 项目参数配置
#[derive(Parser, Debug)]
#[command(author, version, about, long_about = None)]
pub struct Args {
  /// ONNX 分割模型路径，如 onnx:///path/to/rim.onnx
  #[arg(long, value_name = "MODEL")]
  pub model: Url,
  /// 输入图像，如 image:///path/to/wheel.jpg
  #[arg(long, value_name = "SOURCE")]
  pub input: Url,
  /// 输出路径：json:///path/to/pose.json 或 image:///path/to/overlay.png
  #[arg(long, value_name = "OUTPUT")]
  pub output: Url,
}

fn main() -> Result<()> {
  tracing_subscriber::fmt::init();

  let args = Args::parse();

  info!("模型文件路径: {}", args.model);
  info!("输入来源: {}", args.input);
  info!("输出路径: {}", args.output);

  let input = ImageFileInput::from_url(&args.input)?;
  let model = OnnxSegmenterBuilder::from_url(&args.model)?.build()?;
  let detector = RimDetector::new(model);

  info!("开始检测...");
  let now = std::time::Instant::now();
  let detection = detector.detect_full(input.image())?;
  info!("检测完成，耗时: {:.2?}", now.elapsed());

  match detection {
    Some(ref d) => info!("轮辋位姿: ({}, {})", d.pose.x, d.pose.y),
    None => info!("未检测到轮辋"),
  }

  match args.output.scheme() {
    "json" => PoseJsonOutput::from_url(&args.output)?.render_result(input.image(), &detection)?,
    "image" => {
      OverlayImageOutput::from_url(&args.output)?.render_result(input.image(), &detection)?
    }
    other => bail!("不支持的输出方案: {}", other),
  }

  Ok(())
}
