//! APIレスポンスパーサー
//!
//! Geminiが返したテキストからJSONを抽出し、
//! IdentificationResultへ型付きでデコードする。
//! 必須フィールドの欠落・型違いは補完せずエラーにする。

use crate::error::{Error, Result};
use crate::types::IdentificationResult;

/// APIレスポンスからJSONオブジェクト部分を抽出
///
/// 抽出優先順位:
/// 1. ```json ... ``` ブロック
/// 2. 生の {...} オブジェクト
/// 3. エラー
///
/// # Examples
/// ```
/// use medi_scan_common::extract_json;
///
/// let response = "결과: {\"summary\": \"ok\"}";
/// let json = extract_json(response).unwrap();
/// assert_eq!(json, "{\"summary\": \"ok\"}");
/// ```
pub fn extract_json(response: &str) -> Result<&str> {
    if let Some(start_marker) = response.find("```json") {
        let start = start_marker + 7; // "```json" の長さ
        if let Some(end_offset) = response[start..].find("```") {
            let end = start + end_offset;
            return Ok(response[start..end].trim());
        }
    }

    if let Some(start) = response.find('{') {
        if let Some(end) = response.rfind('}') {
            if end >= start {
                return Ok(&response[start..=end]);
            }
        }
    }

    Err(Error::Parse("JSONが見つかりません".into()))
}

/// 識別レスポンスをパース
///
/// # Returns
/// * `Ok(IdentificationResult)` - パース成功（medicationsは空でもよい）
/// * `Err(Error::Parse)` - JSONが見つからない、または必須フィールド欠落・型違い
pub fn parse_identification_response(response: &str) -> Result<IdentificationResult> {
    let json_str = extract_json(response)?;
    serde_json::from_str(json_str.trim())
        .map_err(|e| Error::Parse(format!("識別結果 JSONパースエラー: {}", e)))
}
