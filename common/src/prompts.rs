//! プロンプト・出力スキーマ生成モジュール
//!
//! 識別リクエストに毎回同じ内容で付与するもの:
//! - IDENTIFY_PROMPT: 指示文
//! - response_schema: レスポンスを縛るJSONスキーマ（Gemini `responseSchema` 形式）

use serde_json::{json, Value};

/// 送信画像のMIMEタイプ（キャプチャ・アップロードとも常にJPEGへ変換済み）
pub const IMAGE_MIME_TYPE: &str = "image/jpeg";

/// レスポンスのMIMEタイプ
pub const RESPONSE_MIME_TYPE: &str = "application/json";

/// 薬品1件あたりの必須フィールド（スキーマの `required` と同順）
pub const MEDICATION_FIELDS: &[&str] = &[
    "koreanName",
    "englishIngredients",
    "dosage",
    "company",
    "description",
    "sourceUrl",
];

/// 識別指示プロンプト
pub const IDENTIFY_PROMPT: &str = r#"Analyze the provided image containing one or more medications.
Identify each medication and provide:
1. Korean Name (약품명)
2. English Ingredients (영문 성분명)
3. Dosage/Capacity (용량/함량)
4. Manufacturer (제약회사)
5. A brief identification description (외형 설명 등)
6. A reliable source URL.

Also write a short overall summary in Korean.
Return the response in JSON format. Use Google Search grounding to ensure information accuracy for Korean pharmaceuticals."#;

/// 出力スキーマ
///
/// `{ medications: [{6項目}], summary }` で全項目必須。
pub fn response_schema() -> Value {
    let properties: serde_json::Map<String, Value> = MEDICATION_FIELDS
        .iter()
        .map(|field| (field.to_string(), json!({ "type": "STRING" })))
        .collect();

    json!({
        "type": "OBJECT",
        "properties": {
            "medications": {
                "type": "ARRAY",
                "items": {
                    "type": "OBJECT",
                    "properties": properties,
                    "required": MEDICATION_FIELDS,
                }
            },
            "summary": { "type": "STRING" }
        },
        "required": ["medications", "summary"]
    })
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_prompt_mentions_all_fields() {
        assert!(IDENTIFY_PROMPT.contains("Korean Name"));
        assert!(IDENTIFY_PROMPT.contains("English Ingredients"));
        assert!(IDENTIFY_PROMPT.contains("Manufacturer"));
        assert!(IDENTIFY_PROMPT.contains("source URL"));
        assert!(IDENTIFY_PROMPT.contains("JSON"));
    }

    #[test]
    fn test_schema_requires_six_medication_fields() {
        let schema = response_schema();
        let items = &schema["properties"]["medications"]["items"];

        let required: Vec<&str> = items["required"]
            .as_array()
            .unwrap()
            .iter()
            .map(|v| v.as_str().unwrap())
            .collect();
        assert_eq!(required, MEDICATION_FIELDS);

        for field in MEDICATION_FIELDS {
            assert_eq!(items["properties"][field]["type"], "STRING");
        }
    }

    #[test]
    fn test_schema_top_level() {
        let schema = response_schema();
        assert_eq!(schema["type"], "OBJECT");
        assert_eq!(schema["properties"]["medications"]["type"], "ARRAY");
        assert_eq!(schema["properties"]["summary"]["type"], "STRING");
        assert_eq!(schema["required"], json!(["medications", "summary"]));
    }
}
