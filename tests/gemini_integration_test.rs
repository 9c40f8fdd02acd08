//! 実APIを使う結合テスト（GEMINI_API_KEY が無ければスキップ）

use image::{DynamicImage, Rgb, RgbImage};
use medi_scan::capture::{CapturedImage, ImageOptions};
use medi_scan::config::Config;
use medi_scan::identifier::{GeminiClient, Identifier};
use std::time::Duration;

#[tokio::test]
async fn gemini_identify_integration() {
    let api_key = match std::env::var("GEMINI_API_KEY") {
        Ok(key) if !key.trim().is_empty() => key,
        _ => {
            eprintln!("GEMINI_API_KEY not set; skipping integration test");
            return;
        }
    };

    let config = Config::default();
    let client = GeminiClient::new(
        &config.api_base,
        &config.model,
        api_key,
        Duration::from_secs(config.timeout_seconds),
    )
    .expect("client build failed");

    // 薬が写っていない白い画像
    let frame = DynamicImage::ImageRgb8(RgbImage::from_pixel(256, 256, Rgb([255, 255, 255])));
    let image = CapturedImage::from_image(&frame, &ImageOptions::default()).expect("jpeg encode failed");

    let identification = client.identify(&image).await.expect("identify failed");

    // 空でも summary は必ず返る
    assert!(!identification.result.summary.trim().is_empty());
    for source in &identification.sources {
        assert!(!source.uri.is_empty());
    }
}
