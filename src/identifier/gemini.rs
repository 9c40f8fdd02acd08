//! Gemini API連携
//!
//! 1回の generateContent 呼び出しで:
//! - 指示プロンプト + JPEG画像（inlineData）を送信
//! - responseSchema でJSON出力を固定
//! - googleSearch ツールで検索グラウンディングを有効化

use super::Identifier;
use crate::capture::CapturedImage;
use crate::config::Config;
use crate::error::{MediScanError, Result};
use medi_scan_common::{
    parse_identification_response, response_schema, GroundingMetadata, Identification,
    IDENTIFY_PROMPT, RESPONSE_MIME_TYPE,
};
use serde::{Deserialize, Serialize};
use serde_json::Value;
use std::time::Duration;

/// Gemini APIリクエスト
#[derive(Serialize)]
#[serde(rename_all = "camelCase")]
struct GeminiRequest {
    contents: Vec<Content>,
    tools: Vec<Tool>,
    generation_config: GenerationConfig,
}

#[derive(Serialize)]
struct Content {
    role: &'static str,
    parts: Vec<Part>,
}

#[derive(Serialize)]
#[serde(untagged)]
enum Part {
    Text {
        text: String,
    },
    InlineData {
        #[serde(rename = "inlineData")]
        inline_data: InlineData,
    },
}

#[derive(Serialize)]
#[serde(rename_all = "camelCase")]
struct InlineData {
    mime_type: String,
    data: String,
}

#[derive(Serialize)]
#[serde(rename_all = "camelCase")]
struct Tool {
    google_search: GoogleSearch,
}

#[derive(Serialize)]
struct GoogleSearch {}

#[derive(Serialize)]
#[serde(rename_all = "camelCase")]
struct GenerationConfig {
    response_mime_type: String,
    response_schema: Value,
}

/// Gemini APIレスポンス
#[derive(Deserialize, Default)]
#[serde(rename_all = "camelCase", default)]
struct GeminiResponse {
    candidates: Vec<Candidate>,
    prompt_feedback: Option<PromptFeedback>,
}

#[derive(Deserialize, Default)]
#[serde(rename_all = "camelCase", default)]
struct Candidate {
    content: Option<ResponseContent>,
    grounding_metadata: Option<GroundingMetadata>,
    finish_reason: Option<String>,
}

#[derive(Deserialize, Default)]
#[serde(default)]
struct ResponseContent {
    parts: Vec<ResponsePart>,
}

#[derive(Deserialize, Default)]
#[serde(default)]
struct ResponsePart {
    text: Option<String>,
    thought: Option<bool>,
}

#[derive(Deserialize, Default)]
#[serde(rename_all = "camelCase", default)]
struct PromptFeedback {
    block_reason: Option<String>,
}

fn build_request(image: &CapturedImage) -> GeminiRequest {
    GeminiRequest {
        contents: vec![Content {
            role: "user",
            parts: vec![
                Part::Text {
                    text: IDENTIFY_PROMPT.to_string(),
                },
                Part::InlineData {
                    inline_data: InlineData {
                        mime_type: image.mime_type().to_string(),
                        data: image.base64().to_string(),
                    },
                },
            ],
        }],
        tools: vec![Tool {
            google_search: GoogleSearch {},
        }],
        generation_config: GenerationConfig {
            response_mime_type: RESPONSE_MIME_TYPE.to_string(),
            response_schema: response_schema(),
        },
    }
}

/// レスポンスボディを識別結果へデコード
///
/// 候補1件目のテキストpartを連結してJSONとして読み、
/// 出典はグラウンディングメタデータから別途取り出す。
pub fn decode_response(body: &str) -> Result<Identification> {
    let response: GeminiResponse = serde_json::from_str(body)
        .map_err(|e| MediScanError::ApiParse(format!("レスポンスJSONが不正: {}", e)))?;

    let Some(candidate) = response.candidates.into_iter().next() else {
        let reason = response
            .prompt_feedback
            .and_then(|f| f.block_reason)
            .unwrap_or_else(|| "候補なし".to_string());
        return Err(MediScanError::ApiParse(format!("空のレスポンス: {}", reason)));
    };

    let text: String = candidate
        .content
        .map(|content| {
            content
                .parts
                .into_iter()
                .filter(|part| !part.thought.unwrap_or(false))
                .filter_map(|part| part.text)
                .collect()
        })
        .unwrap_or_default();

    if text.trim().is_empty() {
        return Err(MediScanError::ApiParse(format!(
            "テキストがありません (finishReason: {})",
            candidate.finish_reason.as_deref().unwrap_or("unknown")
        )));
    }

    let result = parse_identification_response(&text)
        .map_err(|e| MediScanError::ApiParse(e.to_string()))?;
    let sources = candidate
        .grounding_metadata
        .map(|metadata| metadata.sources())
        .unwrap_or_default();

    Ok(Identification { result, sources })
}

/// Gemini APIクライアント
pub struct GeminiClient {
    http: reqwest::Client,
    api_base: String,
    model: String,
    api_key: String,
}

impl GeminiClient {
    pub fn new(api_base: &str, model: &str, api_key: String, timeout: Duration) -> Result<Self> {
        if api_key.trim().is_empty() {
            return Err(MediScanError::MissingApiKey);
        }
        let http = reqwest::Client::builder().timeout(timeout).build()?;
        Ok(Self {
            http,
            api_base: api_base.trim().trim_end_matches('/').to_string(),
            model: model.trim().to_string(),
            api_key,
        })
    }

    /// 設定から生成（APIキーが無ければ MissingApiKey）
    pub fn from_config(config: &Config) -> Result<Self> {
        let api_key = config.get_api_key()?;
        Self::new(
            &config.api_base,
            &config.model,
            api_key,
            Duration::from_secs(config.timeout_seconds.max(1)),
        )
    }

    pub fn model(&self) -> &str {
        &self.model
    }

    fn endpoint(&self) -> String {
        let model_path = if self.model.starts_with("models/") {
            self.model.clone()
        } else {
            format!("models/{}", self.model)
        };
        format!("{}/{}:generateContent", self.api_base, model_path)
    }

    async fn call(&self, image: &CapturedImage) -> Result<Identification> {
        let request = build_request(image);
        tracing::debug!(
            model = %self.model,
            image = %image.fingerprint(),
            bytes = image.byte_len(),
            "Gemini APIへ送信"
        );

        // URLにキーが含まれるため reqwest のエラーからは除去する
        let response = self
            .http
            .post(self.endpoint())
            .query(&[("key", self.api_key.as_str())])
            .json(&request)
            .send()
            .await
            .map_err(|e| MediScanError::ApiCall(e.without_url().to_string()))?;

        let status = response.status();
        let body = response
            .text()
            .await
            .map_err(|e| MediScanError::Http(e.without_url()))?;

        if !status.is_success() {
            return Err(MediScanError::ApiStatus {
                status: status.as_u16(),
                body,
            });
        }

        tracing::debug!(chars = body.len(), "Gemini APIレスポンス受信");
        decode_response(&body)
    }
}

impl Identifier for GeminiClient {
    async fn identify(&self, image: &CapturedImage) -> Result<Identification> {
        self.call(image).await
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::capture::ImageOptions;
    use image::{DynamicImage, Rgb, RgbImage};

    fn image() -> CapturedImage {
        let frame = DynamicImage::ImageRgb8(RgbImage::from_pixel(4, 4, Rgb([0, 0, 0])));
        CapturedImage::from_image(&frame, &ImageOptions::default()).unwrap()
    }

    // =============================================
    // リクエスト シリアライズテスト
    // =============================================

    #[test]
    fn test_request_serialize() {
        let captured = image();
        let json = serde_json::to_value(build_request(&captured)).unwrap();

        let parts = &json["contents"][0]["parts"];
        assert_eq!(parts[0]["text"], IDENTIFY_PROMPT);
        assert_eq!(parts[1]["inlineData"]["mimeType"], "image/jpeg");
        assert_eq!(parts[1]["inlineData"]["data"], captured.base64());
        assert_eq!(json["tools"][0]["googleSearch"], serde_json::json!({}));
        assert_eq!(json["generationConfig"]["responseMimeType"], "application/json");
        assert_eq!(json["generationConfig"]["responseSchema"], response_schema());
    }

    #[test]
    fn test_part_text_serialize() {
        let part = Part::Text { text: "Hello".to_string() };
        assert_eq!(serde_json::to_string(&part).unwrap(), r#"{"text":"Hello"}"#);
    }

    #[test]
    fn test_endpoint() {
        let client = GeminiClient::new(
            "https://example.com/v1beta/",
            "gemini-3-flash-preview",
            "key".into(),
            Duration::from_secs(5),
        )
        .unwrap();
        assert_eq!(
            client.endpoint(),
            "https://example.com/v1beta/models/gemini-3-flash-preview:generateContent"
        );

        let client = GeminiClient::new("https://example.com", "models/x", "key".into(), Duration::from_secs(5)).unwrap();
        assert_eq!(client.endpoint(), "https://example.com/models/x:generateContent");
    }

    #[test]
    fn test_empty_key_rejected() {
        let result = GeminiClient::new("https://example.com", "m", "  ".into(), Duration::from_secs(5));
        assert!(matches!(result, Err(MediScanError::MissingApiKey)));
    }

    // =============================================
    // レスポンス デコードテスト
    // =============================================

    #[test]
    fn test_decode_joins_text_parts_and_skips_thoughts() {
        let body = r#"{
            "candidates": [{
                "content": {"parts": [
                    {"text": "thinking...", "thought": true},
                    {"text": "{\"medications\": [], "},
                    {"text": "\"summary\": \"없음\"}"}
                ]}
            }]
        }"#;
        let identification = decode_response(body).unwrap();
        assert!(identification.result.medications.is_empty());
        assert_eq!(identification.result.summary, "없음");
        assert!(identification.sources.is_empty());
    }

    #[test]
    fn test_decode_blocked_prompt() {
        let body = r#"{"promptFeedback": {"blockReason": "SAFETY"}}"#;
        match decode_response(body) {
            Err(MediScanError::ApiParse(msg)) => assert!(msg.contains("SAFETY")),
            _ => panic!("Expected ApiParse error"),
        }
    }

    #[test]
    fn test_decode_empty_text() {
        let body = r#"{"candidates": [{"content": {"parts": []}, "finishReason": "MAX_TOKENS"}]}"#;
        match decode_response(body) {
            Err(MediScanError::ApiParse(msg)) => assert!(msg.contains("MAX_TOKENS")),
            _ => panic!("Expected ApiParse error"),
        }
    }

    #[test]
    fn test_decode_not_json() {
        assert!(matches!(decode_response("<html>"), Err(MediScanError::ApiParse(_))));
    }
}
