use std::sync::Arc;

use serde::{Deserialize, Serialize};

use crate::analysis::prompts::question_prompt;
use crate::analysis::AnalysisError;
use crate::llm::{GenerationOptions, TextGenerator};

/// Returned when the model produced no text at all.
pub const EMPTY_ANSWER: &str = "No answer generated";

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Answer {
    pub answer: String,
    /// Not computed yet; always `None`.
    pub confidence: Option<f64>,
    /// Not computed yet; always empty.
    pub sources: Vec<String>,
}

pub struct QuestionAnswerer {
    generator: Arc<dyn TextGenerator>,
}

impl QuestionAnswerer {
    pub fn new(generator: Arc<dyn TextGenerator>) -> Self {
        Self { generator }
    }

    /// Answers `question` from a completed contract's analysis JSON.
    ///
    /// Callers check that the contract is completed before asking.
    pub fn answer(
        &self,
        analysis: &serde_json::Value,
        question: &str,
        context: Option<&str>,
    ) -> Result<Answer, AnalysisError> {
        let _span = tracing::info_span!("analysis.question").entered();

        let analysis_json = serde_json::to_string_pretty(analysis)?;
        let prompt = question_prompt(question, &analysis_json, context);

        let raw = self.generator.generate(&prompt, &GenerationOptions::answer())?;
        let answer = if raw.trim().is_empty() {
            EMPTY_ANSWER.to_string()
        } else {
            raw.trim().to_string()
        };

        Ok(Answer {
            answer,
            confidence: None,
            sources: Vec::new(),
        })
    }
}
