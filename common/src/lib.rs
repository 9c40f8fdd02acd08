//! MediScan Common Library
//!
//! CLIとフロントエンドで共有される型・プロンプト・レスポンスデコーダ

pub mod types;
pub mod error;
pub mod prompts;
pub mod parser;
pub mod grounding;

pub use types::{GroundingSource, Identification, IdentificationResult, MedicationInfo};
pub use error::{Error, Result};
pub use prompts::{response_schema, IDENTIFY_PROMPT, IMAGE_MIME_TYPE, RESPONSE_MIME_TYPE};
pub use parser::{extract_json, parse_identification_response};
pub use grounding::{extract_sources, GroundingChunk, GroundingMetadata, WebSource};
