//! 結果表示
//!
//! 識別結果をそのままの順序でテキスト化する（並べ替え・絞り込みはしない）。

use crate::error::Result;
use medi_scan_common::{Identification, MedicationInfo};

pub const DISCLAIMER: &str = "본 서비스는 인공지능 기술을 활용하여 정보를 제공하며, 진단이나 처방을 대체할 수 없습니다. \
정확한 의학적 판단을 위해 반드시 의료진과 상담하십시오.";

/// 端末向けのテキスト表示
pub fn render_text(identification: &Identification) -> String {
    let result = &identification.result;
    let mut lines = vec![
        "✔ 분석 완료".to_string(),
        format!("  {}", result.summary),
        String::new(),
        format!("식별된 약품 목록 ({})", result.medications.len()),
    ];

    if result.medications.is_empty() {
        lines.push("  (식별된 약품이 없습니다)".to_string());
    }
    for (idx, medication) in result.medications.iter().enumerate() {
        lines.extend(card_lines(idx + 1, medication));
    }

    if !identification.sources.is_empty() {
        lines.push(String::new());
        lines.push("정보 출처 및 근거".to_string());
        for source in &identification.sources {
            lines.push(format!("  - {} <{}>", source.title, source.uri));
        }
    }

    lines.push(String::new());
    lines.push(format!("※ {}", DISCLAIMER));
    lines.join("\n")
}

fn card_lines(number: usize, medication: &MedicationInfo) -> [String; 6] {
    [
        format!("[{}] {}", number, medication.korean_name),
        format!("    성분: {}", medication.english_ingredients),
        format!("    용량: {}", medication.dosage),
        format!("    제약회사: {}", medication.company),
        format!("    설명: {}", medication.description),
        format!("    출처: {}", medication.source_url),
    ]
}

/// `--json` 用
pub fn render_json(identification: &Identification) -> Result<String> {
    Ok(serde_json::to_string_pretty(identification)?)
}
