mod gemini;

pub use gemini::{decode_response, GeminiClient};

use crate::capture::CapturedImage;
use crate::error::Result;
use medi_scan_common::Identification;
use std::future::Future;

/// 画像から薬品を識別するリモートサービス
pub trait Identifier {
    fn identify(&self, image: &CapturedImage) -> impl Future<Output = Result<Identification>> + Send;
}
