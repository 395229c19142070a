//! Client side of the text-generation service.

pub mod error;
pub mod ollama;

use std::borrow::Cow;

use serde::Serialize;

pub use error::GenerationError;
pub use ollama::OllamaClient;

/// Appended to contract text cut down to the input budget.
pub const TRUNCATION_MARKER: &str = "\n\n[Text truncated for analysis]";

/// Sampling options sent with each generation request.
#[derive(Debug, Clone, Copy, PartialEq, Serialize)]
pub struct GenerationOptions {
    pub temperature: f64,
    pub num_predict: u32,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub top_p: Option<f64>,
}

impl GenerationOptions {
    /// Low-temperature settings for the JSON-producing analysis stages.
    pub fn structured() -> Self {
        Self {
            temperature: 0.1,
            num_predict: 1024,
            top_p: Some(0.9),
        }
    }

    /// Settings for free-form answers to user questions.
    pub fn answer() -> Self {
        Self {
            temperature: 0.3,
            num_predict: 512,
            top_p: None,
        }
    }
}

/// Anything that turns a prompt into generated text.
///
/// Implementations make exactly one request per call and do not retry.
pub trait TextGenerator: Send + Sync {
    fn generate(
        &self,
        prompt: &str,
        options: &GenerationOptions,
    ) -> Result<String, GenerationError>;

    /// Model identifier recorded alongside analysis results.
    fn model(&self) -> &str;
}

/// Cuts `text` to at most `max_chars` characters and marks the cut.
///
/// Text within the budget is returned unchanged (borrowed).
pub fn truncate_input(text: &str, max_chars: usize) -> Cow<'_, str> {
    match text.char_indices().nth(max_chars) {
        None => Cow::Borrowed(text),
        Some((byte_idx, _)) => {
            let mut truncated = String::with_capacity(byte_idx + TRUNCATION_MARKER.len());
            truncated.push_str(&text[..byte_idx]);
            truncated.push_str(TRUNCATION_MARKER);
            Cow::Owned(truncated)
        }
    }
}
