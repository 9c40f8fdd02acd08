//! 検索グラウンディングのメタデータ
//!
//! `candidates[].groundingMetadata` のワイヤ型と、
//! そこから出典リストを取り出す処理。

use serde::{Deserialize, Serialize};

use crate::types::GroundingSource;

#[derive(Debug, Clone, Default, Serialize, Deserialize)]
#[serde(rename_all = "camelCase", default)]
pub struct GroundingMetadata {
    #[serde(skip_serializing_if = "Option::is_none")]
    pub web_search_queries: Option<Vec<String>>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub grounding_chunks: Option<Vec<GroundingChunk>>,
}

#[derive(Debug, Clone, Default, Serialize, Deserialize)]
#[serde(default)]
pub struct GroundingChunk {
    #[serde(skip_serializing_if = "Option::is_none")]
    pub web: Option<WebSource>,
}

#[derive(Debug, Clone, Default, Serialize, Deserialize)]
#[serde(default)]
pub struct WebSource {
    #[serde(skip_serializing_if = "Option::is_none")]
    pub uri: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub title: Option<String>,
}

impl GroundingMetadata {
    pub fn sources(&self) -> Vec<GroundingSource> {
        self.grounding_chunks
            .as_deref()
            .map(extract_sources)
            .unwrap_or_default()
    }
}

/// チャンク列から出典を抽出
///
/// `web` を持たないチャンクとURIの無いチャンクは捨てる。順序は保持。
/// タイトルが無い場合はURIをタイトルとして使う。
pub fn extract_sources(chunks: &[GroundingChunk]) -> Vec<GroundingSource> {
    chunks
        .iter()
        .filter_map(|chunk| chunk.web.as_ref())
        .filter_map(|web| {
            let uri = web.uri.as_deref()?.trim();
            if uri.is_empty() {
                return None;
            }
            let title = web
                .title
                .as_deref()
                .map(str::trim)
                .filter(|t| !t.is_empty())
                .unwrap_or(uri);
            Some(GroundingSource {
                title: title.to_string(),
                uri: uri.to_string(),
            })
        })
        .collect()
}

#[cfg(test)]
mod tests {
    use super::*;

    fn web_chunk(title: &str, uri: &str) -> GroundingChunk {
        GroundingChunk {
            web: Some(WebSource {
                uri: Some(uri.to_string()),
                title: Some(title.to_string()),
            }),
        }
    }

    #[test]
    fn test_extract_skips_non_web_chunks() {
        let chunks = vec![web_chunk("nedrug.mfds.go.kr", "https://nedrug.mfds.go.kr/1"), GroundingChunk::default()];
        let sources = extract_sources(&chunks);
        assert_eq!(sources.len(), 1);
        assert_eq!(sources[0].title, "nedrug.mfds.go.kr");
        assert_eq!(sources[0].uri, "https://nedrug.mfds.go.kr/1");
    }

    #[test]
    fn test_extract_preserves_order() {
        let chunks = vec![
            web_chunk("c", "https://c.example"),
            GroundingChunk::default(),
            web_chunk("a", "https://a.example"),
            web_chunk("b", "https://b.example"),
        ];
        let titles: Vec<String> = extract_sources(&chunks).into_iter().map(|s| s.title).collect();
        assert_eq!(titles, vec!["c", "a", "b"]);
    }

    #[test]
    fn test_extract_all_non_web_is_empty() {
        let chunks = vec![GroundingChunk::default(), GroundingChunk::default()];
        assert!(extract_sources(&chunks).is_empty());
        assert!(extract_sources(&[]).is_empty());
    }

    #[test]
    fn test_extract_missing_title_falls_back_to_uri() {
        let chunks = vec![GroundingChunk {
            web: Some(WebSource { uri: Some("https://health.kr/x".into()), title: None }),
        }];
        let sources = extract_sources(&chunks);
        assert_eq!(sources[0].title, "https://health.kr/x");
    }

    #[test]
    fn test_extract_missing_uri_is_dropped() {
        let chunks = vec![GroundingChunk {
            web: Some(WebSource { uri: None, title: Some("제목만".into()) }),
        }];
        assert!(extract_sources(&chunks).is_empty());
    }

    #[test]
    fn test_metadata_deserialize() {
        let json = r#"{
            "webSearchQueries": ["타이레놀 500mg"],
            "groundingChunks": [
                {"web": {"uri": "https://example.com/tylenol", "title": "example.com"}},
                {"retrievedContext": {"uri": "gs://bucket/doc"}}
            ]
        }"#;
        let metadata: GroundingMetadata = serde_json::from_str(json).unwrap();
        let sources = metadata.sources();
        assert_eq!(sources.len(), 1);
        assert_eq!(sources[0].uri, "https://example.com/tylenol");
    }

    #[test]
    fn test_metadata_without_chunks() {
        let metadata: GroundingMetadata = serde_json::from_str("{}").unwrap();
        assert!(metadata.sources().is_empty());
    }
}
