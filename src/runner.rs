//! 解析の実行（スピナー表示・Ctrl-Cで中断）

use crate::capture::CameraStream;
use crate::identifier::Identifier;
use crate::session::{Completion, Session};
use indicatif::{ProgressBar, ProgressStyle};
use std::time::Duration;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum RunOutcome {
    /// 画像が無い・解析中などで開始しなかった
    NotStarted,
    Finished(Completion),
    /// Ctrl-Cで中断し Home に戻った
    Cancelled,
}

fn spinner(message: &'static str) -> ProgressBar {
    let pb = ProgressBar::new_spinner();
    if let Ok(style) = ProgressStyle::with_template("{spinner} {msg}") {
        pb.set_style(style);
    }
    pb.set_message(message);
    pb.enable_steady_tick(Duration::from_millis(120));
    pb
}

/// 解析を1回実行
///
/// 呼び出し中にCtrl-Cを受けたらリクエストを破棄してセッションをリセットする。
pub async fn run_analysis<S, I>(session: &mut Session<S>, identifier: &I) -> RunOutcome
where
    S: CameraStream,
    I: Identifier,
{
    let Some(ticket) = session.begin_analysis() else {
        return RunOutcome::NotStarted;
    };
    let image = ticket.image().clone();

    let pb = spinner("약품을 분석하고 있습니다... (Ctrl-C: 취소)");
    let outcome = tokio::select! {
        outcome = identifier.identify(&image) => Some(outcome),
        _ = tokio::signal::ctrl_c() => None,
    };
    pb.finish_and_clear();

    match outcome {
        Some(outcome) => RunOutcome::Finished(session.complete(ticket, outcome)),
        None => {
            tracing::info!("識別を中断しました");
            session.reset();
            RunOutcome::Cancelled
        }
    }
}
