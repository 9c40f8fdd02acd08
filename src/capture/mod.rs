//! 画像取得モジュール
//!
//! カメラ・ファイル・Data URLのどれから来た画像も、
//! JPEGへ再エンコードしてBase64で保持する（CapturedImage）。

pub mod camera;

pub use camera::{CameraStream, CaptureDevice, CommandCamera, CommandStream, StreamGuard, StreamRequest};

use crate::config::Config;
use crate::error::{MediScanError, Result};
use base64::engine::general_purpose::STANDARD;
use base64::Engine;
use image::codecs::jpeg::JpegEncoder;
use image::imageops::FilterType;
use image::DynamicImage;
use medi_scan_common::IMAGE_MIME_TYPE;
use sha2::{Digest, Sha256};
use std::path::Path;

/// JPEG変換オプション
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct ImageOptions {
    /// JPEG品質 (1-100)
    pub quality: u8,
    /// 長辺の上限。Noneなら元の解像度のまま
    pub max_size: Option<u32>,
}

impl ImageOptions {
    /// カメラ撮影用: ネイティブ解像度のまま
    pub fn camera(config: &Config) -> Self {
        Self {
            quality: config.jpeg_quality(),
            max_size: None,
        }
    }

    /// アップロード用: 長辺を max_image_size に収める
    pub fn upload(config: &Config) -> Self {
        Self {
            quality: config.jpeg_quality(),
            max_size: Some(config.max_image_size).filter(|&size| size > 0),
        }
    }
}

impl Default for ImageOptions {
    fn default() -> Self {
        Self {
            quality: 90,
            max_size: None,
        }
    }
}

/// 1枚の静止画（Base64エンコード済みJPEG）
#[derive(Clone, PartialEq, Eq)]
pub struct CapturedImage {
    data: String,
}

impl CapturedImage {
    /// デコード済み画像をJPEGへエンコード
    pub fn from_image(image: &DynamicImage, options: &ImageOptions) -> Result<Self> {
        let image = match options.max_size {
            Some(max) if image.width().max(image.height()) > max => {
                image.resize(max, max, FilterType::Triangle)
            }
            _ => image.clone(),
        };

        // JPEGはアルファ非対応
        let rgb = DynamicImage::ImageRgb8(image.to_rgb8());
        let mut buffer = Vec::new();
        let encoder = JpegEncoder::new_with_quality(&mut buffer, options.quality.clamp(1, 100));
        rgb.write_with_encoder(encoder)?;

        Ok(Self {
            data: STANDARD.encode(&buffer),
        })
    }

    /// 任意形式の画像バイト列から生成
    pub fn from_bytes(bytes: &[u8], options: &ImageOptions) -> Result<Self> {
        if bytes.is_empty() {
            return Err(MediScanError::ImageLoad("空のファイルです".into()));
        }
        let image = image::load_from_memory(bytes)?;
        Self::from_image(&image, options)
    }

    /// ファイルから読み込み
    pub fn from_file(path: &Path, options: &ImageOptions) -> Result<Self> {
        if !path.is_file() {
            return Err(MediScanError::FileNotFound(path.display().to_string()));
        }
        let bytes = std::fs::read(path)
            .map_err(|e| MediScanError::FileRead(format!("{}: {}", path.display(), e)))?;
        Self::from_bytes(&bytes, options)
            .map_err(|e| MediScanError::ImageLoad(format!("{}: {}", path.display(), e)))
    }

    /// Data URL（data:image/png;base64,...）から生成
    pub fn from_data_url(data_url: &str, options: &ImageOptions) -> Result<Self> {
        let payload = extract_base64_from_data_url(data_url.trim())
            .ok_or_else(|| MediScanError::ImageLoad("Data URLではありません".into()))?;
        let bytes = STANDARD
            .decode(payload.trim())
            .map_err(|e| MediScanError::ImageLoad(format!("Base64デコードエラー: {}", e)))?;
        Self::from_bytes(&bytes, options)
    }

    /// Base64ペイロード
    pub fn base64(&self) -> &str {
        &self.data
    }

    pub fn mime_type(&self) -> &'static str {
        IMAGE_MIME_TYPE
    }

    /// デコード後のおおよそのバイト数
    pub fn byte_len(&self) -> usize {
        self.data.len() / 4 * 3
    }

    /// ログ用の短い識別子（SHA-256先頭12桁）
    pub fn fingerprint(&self) -> String {
        let digest = Sha256::digest(self.data.as_bytes());
        hex::encode(&digest[..6])
    }
}

impl std::fmt::Debug for CapturedImage {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("CapturedImage")
            .field("mime_type", &IMAGE_MIME_TYPE)
            .field("bytes", &self.byte_len())
            .field("fingerprint", &self.fingerprint())
            .finish()
    }
}

/// Data URLからBase64データ部分を抽出
///
/// `data:` で始まり `;base64,` を含む場合のみ返す。
pub fn extract_base64_from_data_url(data_url: &str) -> Option<&str> {
    let rest = data_url.strip_prefix("data:")?;
    let (header, payload) = rest.split_once(',')?;
    if !header.ends_with(";base64") {
        return None;
    }
    Some(payload)
}

#[cfg(test)]
mod tests {
    use super::*;
    use image::{ImageFormat, Rgb, RgbImage, Rgba, RgbaImage};
    use std::io::Cursor;

    fn sample_image(width: u32, height: u32) -> DynamicImage {
        DynamicImage::ImageRgb8(RgbImage::from_pixel(width, height, Rgb([240, 240, 240])))
    }

    fn encode_png(image: &DynamicImage) -> Vec<u8> {
        let mut bytes = Cursor::new(Vec::new());
        image.write_to(&mut bytes, ImageFormat::Png).unwrap();
        bytes.into_inner()
    }

    fn decode(captured: &CapturedImage) -> DynamicImage {
        let bytes = STANDARD.decode(captured.base64()).unwrap();
        assert_eq!(image::guess_format(&bytes).unwrap(), ImageFormat::Jpeg);
        image::load_from_memory(&bytes).unwrap()
    }

    #[test]
    fn test_extract_base64_from_data_url() {
        assert_eq!(
            extract_base64_from_data_url("data:image/jpeg;base64,/9j/4AAQSkZJRg=="),
            Some("/9j/4AAQSkZJRg==")
        );
        assert_eq!(extract_base64_from_data_url("not a data url"), None);
        assert_eq!(extract_base64_from_data_url("data:text/plain,hello"), None);
        assert_eq!(extract_base64_from_data_url(""), None);
    }

    #[test]
    fn test_from_image_keeps_native_resolution() {
        let captured = CapturedImage::from_image(&sample_image(64, 48), &ImageOptions::default()).unwrap();
        let decoded = decode(&captured);
        assert_eq!((decoded.width(), decoded.height()), (64, 48));
        assert_eq!(captured.mime_type(), "image/jpeg");
    }

    #[test]
    fn test_from_bytes_transcodes_png_and_downscales() {
        let png = encode_png(&sample_image(400, 200));
        let options = ImageOptions { quality: 80, max_size: Some(100) };

        let captured = CapturedImage::from_bytes(&png, &options).unwrap();
        let decoded = decode(&captured);
        assert_eq!((decoded.width(), decoded.height()), (100, 50));
    }

    #[test]
    fn test_from_image_drops_alpha() {
        let rgba = DynamicImage::ImageRgba8(RgbaImage::from_pixel(8, 8, Rgba([10, 20, 30, 128])));
        assert!(CapturedImage::from_image(&rgba, &ImageOptions::default()).is_ok());
    }

    #[test]
    fn test_from_bytes_corrupt() {
        let result = CapturedImage::from_bytes(b"definitely not an image", &ImageOptions::default());
        assert!(matches!(result, Err(MediScanError::ImageLoad(_))));
    }

    #[test]
    fn test_from_bytes_empty() {
        assert!(CapturedImage::from_bytes(&[], &ImageOptions::default()).is_err());
    }

    #[test]
    fn test_from_file_not_found() {
        let result = CapturedImage::from_file(Path::new("/nonexistent/pill.jpg"), &ImageOptions::default());
        assert!(matches!(result, Err(MediScanError::FileNotFound(_))));
    }

    #[test]
    fn test_from_data_url() {
        let png = encode_png(&sample_image(16, 16));
        let data_url = format!("data:image/png;base64,{}", STANDARD.encode(&png));

        let captured = CapturedImage::from_data_url(&data_url, &ImageOptions::default()).unwrap();
        let decoded = decode(&captured);
        assert_eq!(decoded.width(), 16);
    }

    #[test]
    fn test_from_data_url_invalid() {
        let result = CapturedImage::from_data_url("data:image/png;base64,@@@", &ImageOptions::default());
        assert!(result.is_err());
        let result = CapturedImage::from_data_url("hello", &ImageOptions::default());
        assert!(result.is_err());
    }

    #[test]
    fn test_fingerprint_is_stable() {
        let a = CapturedImage::from_image(&sample_image(8, 8), &ImageOptions::default()).unwrap();
        let b = a.clone();
        assert_eq!(a.fingerprint(), b.fingerprint());
        assert_eq!(a.fingerprint().len(), 12);
        assert!(format!("{:?}", a).contains("fingerprint"));
    }
}
