//! 識別セッションの状態機械
//!
//! Home → Capturing → Previewing → Processing → Result の順に進み、
//! reset でいつでも Home に戻る。エラーは状態とは別のオーバーレイで持つ。
//!
//! 識別呼び出しは `begin_analysis` で受け取ったチケットを `complete` に返して確定する。
//! reset 後に返ってきた古いチケットは破棄される。

use crate::capture::{CameraStream, CaptureDevice, CapturedImage, ImageOptions, StreamGuard, StreamRequest};
use crate::error::{MediScanError, Result, IDENTIFY_FAILED_MESSAGE};
use crate::identifier::Identifier;
use medi_scan_common::Identification;
use std::path::Path;

/// セッション状態（同時に1つだけ）
pub enum SessionState<S: CameraStream> {
    Home,
    /// カメラ使用中（ストリームはこの状態が所有する）
    Capturing(StreamGuard<S>),
    Previewing(CapturedImage),
    Processing(CapturedImage),
    Result(Identification),
}

impl<S: CameraStream> SessionState<S> {
    pub fn name(&self) -> &'static str {
        match self {
            SessionState::Home => "home",
            SessionState::Capturing(_) => "capturing",
            SessionState::Previewing(_) => "previewing",
            SessionState::Processing(_) => "processing",
            SessionState::Result(_) => "result",
        }
    }
}

/// 進行中の識別呼び出し1回分
#[derive(Debug)]
pub struct AnalysisTicket {
    generation: u64,
    image: CapturedImage,
}

impl AnalysisTicket {
    pub fn image(&self) -> &CapturedImage {
        &self.image
    }
}

/// `complete` の結果
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Completion {
    /// Result へ遷移
    Succeeded,
    /// Previewing に戻りエラー表示
    Failed,
    /// reset 済みなどで破棄
    Stale,
}

pub struct Session<S: CameraStream> {
    state: SessionState<S>,
    error: Option<&'static str>,
    generation: u64,
}

impl<S: CameraStream> Default for Session<S> {
    fn default() -> Self {
        Self::new()
    }
}

impl<S: CameraStream> Session<S> {
    pub fn new() -> Self {
        Self {
            state: SessionState::Home,
            error: None,
            generation: 0,
        }
    }

    pub fn state(&self) -> &SessionState<S> {
        &self.state
    }

    pub fn state_name(&self) -> &'static str {
        self.state.name()
    }

    /// 表示中のエラーメッセージ
    pub fn error(&self) -> Option<&'static str> {
        self.error
    }

    /// 保持している画像（Previewing / Processing）
    pub fn image(&self) -> Option<&CapturedImage> {
        match &self.state {
            SessionState::Previewing(image) | SessionState::Processing(image) => Some(image),
            _ => None,
        }
    }

    pub fn identification(&self) -> Option<&Identification> {
        match &self.state {
            SessionState::Result(identification) => Some(identification),
            _ => None,
        }
    }

    pub fn is_processing(&self) -> bool {
        matches!(self.state, SessionState::Processing(_))
    }

    /// Home → Capturing
    pub fn open_camera<D>(&mut self, device: &D, request: &StreamRequest) -> Result<()>
    where
        D: CaptureDevice<Stream = S>,
    {
        if !matches!(self.state, SessionState::Home) {
            return Err(self.invalid("open_camera"));
        }
        match StreamGuard::open(device, request) {
            Ok(guard) => {
                self.error = None;
                self.transition(SessionState::Capturing(guard));
                Ok(())
            }
            Err(e) => Err(self.fail_with(e)),
        }
    }

    /// Capturing → Previewing
    ///
    /// 失敗時は Capturing のまま（ストリームも開いたまま）。
    pub fn capture(&mut self, options: &ImageOptions) -> Result<()> {
        let state = self.state_name();
        let outcome = match &mut self.state {
            SessionState::Capturing(guard) => guard.capture(options),
            _ => return Err(MediScanError::InvalidTransition { action: "capture", state }),
        };
        match outcome {
            Ok(image) => {
                self.error = None;
                // 旧状態のガードはここでdropされストリームが止まる
                self.transition(SessionState::Previewing(image));
                Ok(())
            }
            Err(e) => Err(self.fail_with(e)),
        }
    }

    /// Capturing → Home
    pub fn cancel_capture(&mut self) -> Result<()> {
        if !matches!(self.state, SessionState::Capturing(_)) {
            return Err(self.invalid("cancel_capture"));
        }
        self.transition(SessionState::Home);
        Ok(())
    }

    /// Home / Capturing / Previewing → Previewing
    ///
    /// Previewing中なら保持画像を差し替える。
    pub fn load_image(&mut self, image: CapturedImage) -> Result<()> {
        match self.state {
            SessionState::Home | SessionState::Capturing(_) | SessionState::Previewing(_) => {
                self.error = None;
                self.transition(SessionState::Previewing(image));
                Ok(())
            }
            _ => Err(self.invalid("load_image")),
        }
    }

    /// ファイルを読み込んで Previewing へ
    pub fn load_file(&mut self, path: &Path, options: &ImageOptions) -> Result<()> {
        if matches!(self.state, SessionState::Processing(_) | SessionState::Result(_)) {
            return Err(self.invalid("load_file"));
        }
        match CapturedImage::from_file(path, options) {
            Ok(image) => self.load_image(image),
            Err(e) => Err(self.fail_with(e)),
        }
    }

    /// Previewing → Processing
    ///
    /// 画像が無い・既に解析中の場合は何もせず None。
    pub fn begin_analysis(&mut self) -> Option<AnalysisTicket> {
        let SessionState::Previewing(image) = &self.state else {
            tracing::debug!(state = self.state_name(), "解析開始を無視");
            return None;
        };
        let image = image.clone();

        self.generation += 1;
        self.error = None;
        self.transition(SessionState::Processing(image.clone()));

        Some(AnalysisTicket {
            generation: self.generation,
            image,
        })
    }

    /// 識別結果を反映
    pub fn complete(&mut self, ticket: AnalysisTicket, outcome: Result<Identification>) -> Completion {
        if ticket.generation != self.generation || !self.is_processing() {
            tracing::warn!(
                ticket = ticket.generation,
                current = self.generation,
                state = self.state_name(),
                "古い識別結果を破棄しました"
            );
            return Completion::Stale;
        }

        match outcome {
            Ok(identification) => {
                tracing::info!(
                    medications = identification.result.medications.len(),
                    sources = identification.sources.len(),
                    "識別成功"
                );
                self.transition(SessionState::Result(identification));
                Completion::Succeeded
            }
            Err(e) => {
                tracing::error!(error = %e, image = %ticket.image.fingerprint(), "識別失敗");
                self.error = Some(IDENTIFY_FAILED_MESSAGE);
                self.transition(SessionState::Previewing(ticket.image));
                Completion::Failed
            }
        }
    }

    /// begin → identify → complete をまとめて実行
    pub async fn analyze<I: Identifier>(&mut self, identifier: &I) -> Option<Completion> {
        let ticket = self.begin_analysis()?;
        let outcome = identifier.identify(ticket.image()).await;
        Some(self.complete(ticket, outcome))
    }

    /// 任意の状態 → Home
    ///
    /// 画像・結果・カメラストリームを破棄し、進行中の識別結果も無効にする。
    pub fn reset(&mut self) {
        self.generation += 1;
        self.error = None;
        self.transition(SessionState::Home);
    }

    pub fn dismiss_error(&mut self) {
        self.error = None;
    }

    fn transition(&mut self, next: SessionState<S>) {
        let from = self.state_name();
        let to = next.name();
        // 旧状態をここでdrop
        self.state = next;
        tracing::info!(from, to, "状態遷移");
    }

    fn invalid(&self, action: &'static str) -> MediScanError {
        MediScanError::InvalidTransition {
            action,
            state: self.state_name(),
        }
    }

    fn fail_with(&mut self, error: MediScanError) -> MediScanError {
        tracing::error!(error = %error, state = self.state_name(), "画像取得エラー");
        self.error = Some(error.user_message());
        error
    }
}
