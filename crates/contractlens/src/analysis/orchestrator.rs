use std::borrow::Cow;
use std::sync::Arc;
use std::time::Duration;

use chrono::Utc;

use crate::analysis::parser::{parse_response, ParsedResponse};
use crate::analysis::prompts::AnalysisStage;
use crate::analysis::{
    text_preview, AnalysisError, AnalysisMetadata, AnalysisOutcome, AnalysisResult, StageFailure,
};
use crate::config::GenerationConfig;
use crate::llm::{truncate_input, GenerationError, GenerationOptions, TextGenerator};

/// Extra attempts for transient generation failures.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct RetryPolicy {
    pub attempts: u32,
    pub backoff: Duration,
}

impl RetryPolicy {
    pub fn none() -> Self {
        Self {
            attempts: 0,
            backoff: Duration::ZERO,
        }
    }

    /// Delay before retry number `retry` (zero-based): `backoff * 2^retry`.
    fn delay(&self, retry: u32) -> Duration {
        self.backoff.saturating_mul(2u32.saturating_pow(retry))
    }
}

impl From<&GenerationConfig> for RetryPolicy {
    fn from(config: &GenerationConfig) -> Self {
        Self {
            attempts: config.retry_attempts,
            backoff: Duration::from_millis(config.retry_backoff_ms),
        }
    }
}

/// Runs the summary, risks and terms stages against one document's text.
pub struct AnalysisOrchestrator {
    generator: Arc<dyn TextGenerator>,
    max_input_chars: usize,
    retry: RetryPolicy,
}

impl AnalysisOrchestrator {
    pub fn new(generator: Arc<dyn TextGenerator>, config: &GenerationConfig) -> Self {
        Self {
            generator,
            max_input_chars: config.max_input_chars,
            retry: RetryPolicy::from(config),
        }
    }

    pub fn with_retry(mut self, retry: RetryPolicy) -> Self {
        self.retry = retry;
        self
    }

    /// Every stage is attempted even when an earlier one failed. Unparseable
    /// output is kept as a degraded record; a failed generation call fails
    /// the whole run.
    pub fn run(&self, text: &str) -> Result<AnalysisOutcome, AnalysisError> {
        let _span = tracing::info_span!("analysis.run", model = %self.generator.model()).entered();

        let input = truncate_input(text, self.max_input_chars);
        let truncated = matches!(input, Cow::Owned(_));
        if truncated {
            log::info!(
                "Contract text truncated to {} characters for analysis",
                self.max_input_chars
            );
        }

        let mut summary = None;
        let mut risks = None;
        let mut terms = None;
        let mut failures = Vec::new();

        for stage in AnalysisStage::ALL {
            match self.run_stage(stage, &input) {
                Ok(parsed) => {
                    let slot = match stage {
                        AnalysisStage::Summary => &mut summary,
                        AnalysisStage::Risks => &mut risks,
                        AnalysisStage::Terms => &mut terms,
                    };
                    *slot = Some(parsed);
                }
                Err(error) => {
                    log::warn!("Analysis stage {} failed: {}", stage, error);
                    failures.push(StageFailure { stage, error });
                }
            }
        }

        match (summary, risks, terms) {
            (Some(summary), Some(risks), Some(terms)) if failures.is_empty() => {
                Ok(AnalysisOutcome {
                    result: AnalysisResult {
                        summary,
                        risks,
                        terms,
                    },
                    metadata: AnalysisMetadata {
                        text_length: text.chars().count(),
                        text_preview: text_preview(text),
                        truncated,
                        model: self.generator.model().to_string(),
                        analyzed_at: Utc::now(),
                    },
                })
            }
            _ => Err(AnalysisError::StagesFailed { failures }),
        }
    }

    fn run_stage(
        &self,
        stage: AnalysisStage,
        input: &str,
    ) -> Result<ParsedResponse, GenerationError> {
        let _span = tracing::info_span!("analysis.stage", stage = stage.as_str()).entered();

        let prompt = stage.prompt(input);
        let raw = self.generate_with_retry(&prompt, stage)?;
        let parsed = parse_response(&raw);

        if parsed.is_structured() {
            log::debug!("Stage {} produced structured output", stage);
        } else {
            log::warn!("Stage {} output could not be parsed, keeping raw response", stage);
        }

        Ok(parsed)
    }

    fn generate_with_retry(
        &self,
        prompt: &str,
        stage: AnalysisStage,
    ) -> Result<String, GenerationError> {
        let options = GenerationOptions::structured();
        let mut retry = 0;

        loop {
            match self.generator.generate(prompt, &options) {
                Ok(raw) => return Ok(raw),
                Err(e) if e.is_transient() && retry < self.retry.attempts => {
                    let delay = self.retry.delay(retry);
                    log::info!(
                        "Retrying stage {} in {:?} after transient error: {}",
                        stage,
                        delay,
                        e
                    );
                    std::thread::sleep(delay);
                    retry += 1;
                }
                Err(e) => return Err(e),
            }
        }
    }
}
