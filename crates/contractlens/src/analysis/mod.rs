//! Staged contract analysis and question answering over its results.

pub mod orchestrator;
pub mod parser;
pub mod prompts;
pub mod qa;

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use thiserror::Error;

use crate::llm::GenerationError;

pub use orchestrator::{AnalysisOrchestrator, RetryPolicy};
pub use parser::{parse_response, DegradedResponse, ParsedResponse};
pub use prompts::AnalysisStage;
pub use qa::{Answer, QuestionAnswerer};

/// Characters of contract text kept in `metadata.text_preview`.
pub const PREVIEW_CHARS: usize = 500;

#[derive(Error, Debug)]
pub enum AnalysisError {
    #[error("Analysis failed for {}", describe_failures(.failures))]
    StagesFailed { failures: Vec<StageFailure> },

    #[error("Question answering failed: {0}")]
    Generation(#[from] GenerationError),

    #[error("Failed to serialize analysis data: {0}")]
    Serialize(#[from] serde_json::Error),
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct StageFailure {
    pub stage: AnalysisStage,
    pub error: GenerationError,
}

fn describe_failures(failures: &[StageFailure]) -> String {
    failures
        .iter()
        .map(|f| format!("{} stage ({})", f.stage, f.error))
        .collect::<Vec<_>>()
        .join(", ")
}

/// Parsed output of all three stages.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct AnalysisResult {
    pub summary: ParsedResponse,
    pub risks: ParsedResponse,
    pub terms: ParsedResponse,
}

impl AnalysisResult {
    pub fn stage(&self, stage: AnalysisStage) -> &ParsedResponse {
        match stage {
            AnalysisStage::Summary => &self.summary,
            AnalysisStage::Risks => &self.risks,
            AnalysisStage::Terms => &self.terms,
        }
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct AnalysisMetadata {
    /// Character count of the full extracted text, before truncation.
    pub text_length: usize,
    pub text_preview: String,
    pub truncated: bool,
    pub model: String,
    pub analyzed_at: DateTime<Utc>,
}

#[derive(Debug, Clone, PartialEq)]
pub struct AnalysisOutcome {
    pub result: AnalysisResult,
    pub metadata: AnalysisMetadata,
}

/// The JSON document persisted in a contract's `contract_data` column.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct ContractData {
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub analysis: Option<AnalysisResult>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub metadata: Option<AnalysisMetadata>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub error: Option<String>,
}

impl ContractData {
    pub fn completed(outcome: AnalysisOutcome) -> Self {
        Self {
            analysis: Some(outcome.result),
            metadata: Some(outcome.metadata),
            error: None,
        }
    }

    pub fn failed(message: impl Into<String>) -> Self {
        Self {
            analysis: None,
            metadata: None,
            error: Some(message.into()),
        }
    }

    pub fn to_value(&self) -> Result<serde_json::Value, serde_json::Error> {
        serde_json::to_value(self)
    }
}

/// First [`PREVIEW_CHARS`] characters, with `...` appended when cut.
pub fn text_preview(text: &str) -> String {
    match text.char_indices().nth(PREVIEW_CHARS) {
        None => text.to_string(),
        Some((byte_idx, _)) => format!("{}...", &text[..byte_idx]),
    }
}
