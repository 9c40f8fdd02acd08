//! 対話モード
//!
//! 状態ごとに選べる操作だけをメニューに出し、セッションを進める。

use crate::capture::{CameraStream, CaptureDevice, ImageOptions, StreamRequest};
use crate::config::Config;
use crate::error::{MediScanError, Result};
use crate::identifier::Identifier;
use crate::present;
use crate::runner::{run_analysis, RunOutcome};
use crate::session::{Completion, Session, SessionState};
use dialoguer::{Input, Select};
use std::path::PathBuf;

/// メニュー操作
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Action {
    OpenCamera,
    TakePhoto,
    CancelCapture,
    LoadFile,
    Analyze,
    ShowResult,
    DismissError,
    Reset,
    Quit,
}

impl Action {
    pub fn label(&self) -> &'static str {
        match self {
            Action::OpenCamera => "카메라로 촬영하기",
            Action::TakePhoto => "📷 촬영",
            Action::CancelCapture => "촬영 취소",
            Action::LoadFile => "갤러리에서 사진 업로드 (파일 경로)",
            Action::Analyze => "약품 분석하기",
            Action::ShowResult => "결과 다시 보기",
            Action::DismissError => "오류 메시지 닫기",
            Action::Reset => "처음으로 (다시 시도)",
            Action::Quit => "종료",
        }
    }
}

/// 現在の状態で選べる操作
pub fn available_actions<S: CameraStream>(state: &SessionState<S>, has_error: bool) -> Vec<Action> {
    let mut actions = match state {
        SessionState::Home => vec![Action::OpenCamera, Action::LoadFile],
        SessionState::Capturing(_) => vec![Action::TakePhoto, Action::LoadFile, Action::CancelCapture],
        SessionState::Previewing(_) => vec![Action::Analyze, Action::LoadFile, Action::Reset],
        // 対話モードでは解析は await 中に完了するので通常は現れない
        SessionState::Processing(_) => vec![Action::Reset],
        SessionState::Result(_) => vec![Action::ShowResult, Action::Reset],
    };
    if has_error {
        actions.push(Action::DismissError);
    }
    actions.push(Action::Quit);
    actions
}

fn headline<S: CameraStream>(session: &Session<S>) -> String {
    match session.state() {
        SessionState::Home => "약품 분석하기 - 사진을 찍거나 파일을 불러와 정보를 확인하세요.".to_string(),
        SessionState::Capturing(_) => "카메라가 준비되었습니다. 약품이 잘 보이도록 맞춰주세요.".to_string(),
        SessionState::Previewing(image) => format!("사진 미리보기 ({} KB)", image.byte_len() / 1024),
        SessionState::Processing(_) => "분석 중...".to_string(),
        SessionState::Result(identification) => format!(
            "분석 완료 - {}종 식별",
            identification.result.medications.len()
        ),
    }
}

fn choose(prompt: &str, actions: &[Action]) -> Result<Action> {
    let labels: Vec<&str> = actions.iter().map(Action::label).collect();
    let index = Select::new()
        .with_prompt(prompt)
        .items(&labels)
        .default(0)
        .interact()
        .map_err(|e| MediScanError::CliExecution(e.to_string()))?;
    Ok(actions[index])
}

fn prompt_path() -> Result<PathBuf> {
    let input: String = Input::new()
        .with_prompt("이미지 파일 경로")
        .interact_text()
        .map_err(|e| MediScanError::CliExecution(e.to_string()))?;
    Ok(PathBuf::from(input.trim()))
}

/// 対話セッションを実行
pub async fn run_interactive<D, I>(config: &Config, device: &D, identifier: &I) -> Result<()>
where
    D: CaptureDevice,
    I: Identifier,
{
    let mut session: Session<D::Stream> = Session::new();
    let request = StreamRequest::from_config(&config.camera);
    let camera_options = ImageOptions::camera(config);
    let upload_options = ImageOptions::upload(config);

    println!("💊 MediScan AI - 대화형 모드\n");
    println!("여러 알약이 함께 찍힌 사진도 분석 가능합니다. 성분이 잘 보이도록 고화질 사진을 권장합니다.\n");

    loop {
        if let Some(message) = session.error() {
            println!("⚠ {}", message);
        }

        let actions = available_actions(session.state(), session.error().is_some());
        let action = choose(&headline(&session), &actions)?;

        // 失敗時のメッセージはセッションのオーバーレイに入る
        let step = match action {
            Action::OpenCamera => session.open_camera(device, &request),
            Action::TakePhoto => session.capture(&camera_options),
            Action::CancelCapture => session.cancel_capture(),
            Action::LoadFile => {
                let path = prompt_path()?;
                session.load_file(&path, &upload_options)
            }
            Action::Analyze => {
                match run_analysis(&mut session, identifier).await {
                    RunOutcome::Finished(Completion::Succeeded) => {
                        if let Some(identification) = session.identification() {
                            println!("\n{}", present::render_text(identification));
                        }
                    }
                    RunOutcome::Cancelled => println!("분석을 취소했습니다.\n"),
                    RunOutcome::Finished(_) | RunOutcome::NotStarted => {}
                }
                Ok(())
            }
            Action::ShowResult => {
                if let Some(identification) = session.identification() {
                    println!("\n{}", present::render_text(identification));
                }
                Ok(())
            }
            Action::DismissError => {
                session.dismiss_error();
                Ok(())
            }
            Action::Reset => {
                session.reset();
                Ok(())
            }
            Action::Quit => break,
        };

        if let Err(e) = step {
            tracing::debug!(error = %e, "操作に失敗");
        }
    }

    // ストリームが残っていればここで解放
    session.reset();
    Ok(())
}
