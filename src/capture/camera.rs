//! カメラ連携
//!
//! デバイスは `CaptureDevice` で開き、`StreamGuard` に包んで保持する。
//! ガードがdropされた時点でストリームは必ず停止する。

use super::{CapturedImage, ImageOptions};
use crate::config::CameraConfig;
use crate::error::{MediScanError, Result};
use image::DynamicImage;
use std::fs::{File, OpenOptions};
use std::io::ErrorKind;
use std::path::PathBuf;
use std::process::Command;
use tempfile::TempDir;

/// ストリームを開く時の要求
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct StreamRequest {
    /// "environment"（背面）/ "user"（前面）
    pub facing: String,
    pub width: u32,
    pub height: u32,
}

impl StreamRequest {
    pub fn from_config(config: &CameraConfig) -> Self {
        Self {
            facing: config.facing.clone(),
            width: config.width,
            height: config.height,
        }
    }
}

impl Default for StreamRequest {
    fn default() -> Self {
        Self {
            facing: "environment".into(),
            width: 1920,
            height: 1080,
        }
    }
}

/// 開いているカメラストリーム
pub trait CameraStream {
    /// 1フレームをネイティブ解像度で取得
    fn grab_frame(&mut self) -> Result<DynamicImage>;

    /// 全トラックを停止してデバイスを解放
    fn stop(&mut self);
}

/// ストリームを開けるデバイス
pub trait CaptureDevice {
    type Stream: CameraStream;

    fn open(&self, request: &StreamRequest) -> Result<Self::Stream>;
}

/// 開いたストリームの所有ハンドル
pub struct StreamGuard<S: CameraStream> {
    stream: S,
    stopped: bool,
}

impl<S: CameraStream> StreamGuard<S> {
    pub fn open<D>(device: &D, request: &StreamRequest) -> Result<Self>
    where
        D: CaptureDevice<Stream = S>,
    {
        let stream = device.open(request)?;
        tracing::debug!(facing = %request.facing, width = request.width, height = request.height, "カメラを開きました");
        Ok(Self { stream, stopped: false })
    }

    /// 撮影してJPEG化
    pub fn capture(&mut self, options: &ImageOptions) -> Result<CapturedImage> {
        let frame = self.stream.grab_frame()?;
        tracing::debug!(width = frame.width(), height = frame.height(), "フレームを取得");
        CapturedImage::from_image(&frame, options)
    }

    fn stop(&mut self) {
        if !self.stopped {
            self.stream.stop();
            self.stopped = true;
            tracing::debug!("カメラを解放しました");
        }
    }
}

impl<S: CameraStream> Drop for StreamGuard<S> {
    fn drop(&mut self) {
        self.stop();
    }
}

/// 外部コマンドで撮影するカメラ（既定: ffmpeg + v4l2）
pub struct CommandCamera {
    config: CameraConfig,
}

impl CommandCamera {
    pub fn new(config: CameraConfig) -> Self {
        Self { config }
    }
}

impl CaptureDevice for CommandCamera {
    type Stream = CommandStream;

    fn open(&self, request: &StreamRequest) -> Result<CommandStream> {
        let device = &self.config.device;

        // デバイスパスが空ならコマンド側に任せる
        let handle = if device.as_os_str().is_empty() {
            None
        } else {
            let file = OpenOptions::new().read(true).open(device).map_err(|e| {
                let name = device.display().to_string();
                match e.kind() {
                    ErrorKind::NotFound => MediScanError::CameraUnavailable(name),
                    ErrorKind::PermissionDenied => MediScanError::CameraPermission(name),
                    _ => MediScanError::Capture(format!("{}: {}", name, e)),
                }
            })?;
            Some(file)
        };

        Ok(CommandStream {
            program: self.config.program.clone(),
            args: self.config.args.clone(),
            device: device.clone(),
            request: request.clone(),
            handle,
            workdir: tempfile::tempdir()?,
        })
    }
}

/// CommandCameraが開いたストリーム
pub struct CommandStream {
    program: String,
    args: Vec<String>,
    device: PathBuf,
    request: StreamRequest,
    handle: Option<File>,
    workdir: TempDir,
}

impl CommandStream {
    fn expand_args(&self, output: &str) -> Vec<String> {
        let device = self.device.display().to_string();
        let width = self.request.width.to_string();
        let height = self.request.height.to_string();
        self.args
            .iter()
            .map(|arg| {
                arg.replace("{device}", &device)
                    .replace("{width}", &width)
                    .replace("{height}", &height)
                    .replace("{facing}", &self.request.facing)
                    .replace("{output}", output)
            })
            .collect()
    }
}

impl CameraStream for CommandStream {
    fn grab_frame(&mut self) -> Result<DynamicImage> {
        let output = self.workdir.path().join("frame.jpg");
        let args = self.expand_args(&output.display().to_string());

        tracing::debug!(program = %self.program, ?args, "撮影コマンドを実行");
        let result = Command::new(&self.program).args(&args).output().map_err(|e| {
            if e.kind() == ErrorKind::NotFound {
                MediScanError::CameraUnavailable(format!("撮影コマンドが見つかりません: {}", self.program))
            } else {
                MediScanError::Capture(format!("{} 実行エラー: {}", self.program, e))
            }
        })?;

        if !result.status.success() {
            let stderr = String::from_utf8_lossy(&result.stderr);
            return Err(MediScanError::Capture(format!(
                "{} failed (code {:?}): {}",
                self.program,
                result.status.code(),
                stderr.trim()
            )));
        }

        // 出力形式はコマンド次第なので拡張子ではなく中身で判定
        let frame = image::ImageReader::open(&output)
            .and_then(|reader| reader.with_guessed_format())
            .map_err(|e| MediScanError::Capture(format!("フレーム読み込みエラー: {}", e)))?
            .decode()
            .map_err(|e| MediScanError::Capture(format!("フレームデコードエラー: {}", e)))?;
        std::fs::remove_file(&output).ok();
        Ok(frame)
    }

    fn stop(&mut self) {
        if self.handle.take().is_some() {
            tracing::debug!(device = %self.device.display(), "デバイスを閉じました");
        }
    }
}
