use crate::error::{MediScanError, Result};
use serde::{Deserialize, Serialize};
use std::path::PathBuf;

/// APIキーを読む環境変数（先頭が優先）
pub const API_KEY_ENV_VARS: &[&str] = &["GEMINI_API_KEY", "API_KEY"];

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct Config {
    pub api_key: Option<String>,
    pub model: String,
    pub api_base: String,
    pub timeout_seconds: u64,
    /// JPEG品質 (1-100)
    pub jpeg_quality: u8,
    /// アップロード画像の長辺上限 (px)
    pub max_image_size: u32,
    pub camera: CameraConfig,
}

/// 撮影コマンドの設定
///
/// `args` 内の `{device}` `{width}` `{height}` `{facing}` `{output}` は実行時に置換される。
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct CameraConfig {
    pub program: String,
    pub args: Vec<String>,
    pub device: PathBuf,
    pub width: u32,
    pub height: u32,
    pub facing: String,
}

impl Default for Config {
    fn default() -> Self {
        Self {
            api_key: None,
            model: "gemini-3-flash-preview".into(),
            api_base: "https://generativelanguage.googleapis.com/v1beta".into(),
            timeout_seconds: 120,
            jpeg_quality: 90,
            max_image_size: 1920,
            camera: CameraConfig::default(),
        }
    }
}

impl Default for CameraConfig {
    fn default() -> Self {
        let args = [
            "-loglevel", "error",
            "-f", "v4l2",
            "-video_size", "{width}x{height}",
            "-i", "{device}",
            "-frames:v", "1",
            "-y", "{output}",
        ];
        Self {
            program: "ffmpeg".into(),
            args: args.iter().map(|s| s.to_string()).collect(),
            device: PathBuf::from("/dev/video0"),
            width: 1920,
            height: 1080,
            facing: "environment".into(),
        }
    }
}

impl Config {
    pub fn load() -> Result<Self> {
        let config_path = Self::config_path()?;

        if config_path.exists() {
            let content = std::fs::read_to_string(&config_path)?;
            let config: Config = serde_json::from_str(&content)?;
            tracing::debug!(path = %config_path.display(), "設定を読み込みました");
            Ok(config)
        } else {
            Ok(Self::default())
        }
    }

    pub fn save(&self) -> Result<()> {
        let config_path = Self::config_path()?;

        if let Some(parent) = config_path.parent() {
            std::fs::create_dir_all(parent)?;
        }

        let content = serde_json::to_string_pretty(self)?;
        std::fs::write(&config_path, content)?;
        Ok(())
    }

    pub fn config_path() -> Result<PathBuf> {
        let home = dirs::home_dir()
            .ok_or_else(|| MediScanError::Config("ホームディレクトリが見つかりません".into()))?;
        Ok(home.join(".config").join("medi-scan").join("config.json"))
    }

    /// APIキーを取得（環境変数を優先）
    pub fn get_api_key(&self) -> Result<String> {
        let from_env = API_KEY_ENV_VARS
            .iter()
            .filter_map(|name| std::env::var(name).ok())
            .map(|key| key.trim().to_string())
            .find(|key| !key.is_empty());
        if let Some(key) = from_env {
            return Ok(key);
        }

        self.api_key
            .as_deref()
            .map(str::trim)
            .filter(|key| !key.is_empty())
            .map(str::to_string)
            .ok_or(MediScanError::MissingApiKey)
    }

    pub fn set_api_key(&mut self, key: String) -> Result<()> {
        self.api_key = Some(key);
        self.save()
    }

    /// 1-100に丸めたJPEG品質
    pub fn jpeg_quality(&self) -> u8 {
        self.jpeg_quality.clamp(1, 100)
    }
}
