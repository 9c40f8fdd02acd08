use thiserror::Error;

/// 識別失敗時にユーザーへ見せる固定メッセージ
pub const IDENTIFY_FAILED_MESSAGE: &str =
    "약품 식별에 실패했습니다. 사진을 다시 찍거나 다른 사진을 선택해주세요.";

/// カメラが開けない時の固定メッセージ
pub const CAMERA_PERMISSION_MESSAGE: &str =
    "카메라 권한이 필요합니다. 카메라 장치와 접근 권한을 확인해주세요.";

/// ファイルが読めない時の固定メッセージ
pub const FILE_READ_MESSAGE: &str = "파일을 읽는 중 오류가 발생했습니다.";

#[derive(Error, Debug)]
pub enum MediScanError {
    #[error("設定エラー: {0}")]
    Config(String),

    #[error("APIキーが設定されていません。`medi-scan config --set-api-key YOUR_KEY` で設定するか GEMINI_API_KEY を指定してください")]
    MissingApiKey,

    #[error("カメラへのアクセスが拒否されました: {0}")]
    CameraPermission(String),

    #[error("カメラが見つかりません: {0}")]
    CameraUnavailable(String),

    #[error("撮影エラー: {0}")]
    Capture(String),

    #[error("ファイルが見つかりません: {0}")]
    FileNotFound(String),

    #[error("ファイル読み込みエラー: {0}")]
    FileRead(String),

    #[error("画像読み込みエラー: {0}")]
    ImageLoad(String),

    #[error("API呼び出しエラー: {0}")]
    ApiCall(String),

    #[error("APIエラー (HTTP {status}): {body}")]
    ApiStatus { status: u16, body: String },

    #[error("APIレスポンスのパースに失敗: {0}")]
    ApiParse(String),

    #[error("HTTPエラー: {0}")]
    Http(#[from] reqwest::Error),

    #[error("この状態では実行できません: {action} ({state})")]
    InvalidTransition {
        action: &'static str,
        state: &'static str,
    },

    #[error("JSON解析エラー: {0}")]
    JsonParse(#[from] serde_json::Error),

    #[error("IOエラー: {0}")]
    Io(#[from] std::io::Error),

    #[error("CLI実行エラー: {0}")]
    CliExecution(String),
}

impl MediScanError {
    /// ユーザー向けの固定メッセージ
    ///
    /// 詳細はログにだけ出し、画面には分類ごとの定型文を出す。
    pub fn user_message(&self) -> &'static str {
        match self {
            MediScanError::CameraPermission(_)
            | MediScanError::CameraUnavailable(_)
            | MediScanError::Capture(_) => CAMERA_PERMISSION_MESSAGE,
            MediScanError::FileNotFound(_)
            | MediScanError::FileRead(_)
            | MediScanError::ImageLoad(_) => FILE_READ_MESSAGE,
            _ => IDENTIFY_FAILED_MESSAGE,
        }
    }

    /// 設定ファイル・APIキーの問題か（定型文に加えて詳細を見せる）
    pub fn is_config_problem(&self) -> bool {
        matches!(
            self,
            MediScanError::MissingApiKey | MediScanError::Config(_) | MediScanError::JsonParse(_)
        )
    }
}

impl From<image::ImageError> for MediScanError {
    fn from(err: image::ImageError) -> Self {
        MediScanError::ImageLoad(err.to_string())
    }
}

pub type Result<T> = std::result::Result<T, MediScanError>;
