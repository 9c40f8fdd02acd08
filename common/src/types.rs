//! 識別結果の型定義
//!
//! CLIと将来のWebフロントで共有される型:
//! - MedicationInfo: 1つの識別済み薬品
//! - IdentificationResult: AIが返す構造化JSON（要約 + 薬品リスト）
//! - GroundingSource: 検索グラウンディングの出典
//! - Identification: 1回の識別呼び出しの最終出力

use serde::{Deserialize, Serialize};

/// 識別された薬品1件
///
/// 6項目すべて必須。欠けているペイロードはデコード時に拒否する。
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct MedicationInfo {
    pub korean_name: String,         // 약품명
    pub english_ingredients: String, // 영문 성분명
    pub dosage: String,              // 용량/함량
    pub company: String,             // 제약회사
    pub description: String,         // 외형 설명
    pub source_url: String,
}

/// AIレスポンス本体
///
/// `medications` の順序はサービスが返した順のまま（再ソートしない）。
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct IdentificationResult {
    pub medications: Vec<MedicationInfo>,
    pub summary: String,
}

impl IdentificationResult {
    pub fn is_empty(&self) -> bool {
        self.medications.is_empty()
    }
}

/// 出典（グラウンディングメタデータのweb要素）
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct GroundingSource {
    pub title: String,
    pub uri: String,
}

/// 識別呼び出し1回分の結果
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Identification {
    pub result: IdentificationResult,
    #[serde(default)]
    pub sources: Vec<GroundingSource>,
}
