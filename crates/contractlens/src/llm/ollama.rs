use std::time::Duration;

use serde::{Deserialize, Serialize};

use crate::config::GenerationConfig;
use crate::llm::{GenerationError, GenerationOptions, TextGenerator};

/// Blocking HTTP client for an Ollama-compatible `/api/generate` endpoint.
pub struct OllamaClient {
    base_url: String,
    model: String,
    client: reqwest::blocking::Client,
    timeout_secs: u64,
}

impl OllamaClient {
    pub fn new(config: &GenerationConfig) -> Result<Self, GenerationError> {
        let client = reqwest::blocking::Client::builder()
            .timeout(Duration::from_secs(config.timeout_secs))
            .connect_timeout(Duration::from_secs(config.connect_timeout_secs))
            .build()
            .map_err(|e| {
                GenerationError::InvalidResponse(format!("Failed to create HTTP client: {}", e))
            })?;

        Ok(Self {
            base_url: config.base_url.trim_end_matches('/').to_string(),
            model: config.model.clone(),
            client,
            timeout_secs: config.timeout_secs,
        })
    }

    pub fn base_url(&self) -> &str {
        &self.base_url
    }
}

#[derive(Serialize)]
struct GenerateRequest<'a> {
    model: &'a str,
    prompt: &'a str,
    stream: bool,
    options: &'a GenerationOptions,
}

#[derive(Deserialize)]
struct GenerateResponse {
    response: String,
}

impl TextGenerator for OllamaClient {
    fn generate(
        &self,
        prompt: &str,
        options: &GenerationOptions,
    ) -> Result<String, GenerationError> {
        let url = format!("{}/api/generate", self.base_url);
        let body = GenerateRequest {
            model: &self.model,
            prompt,
            stream: false,
            options,
        };

        log::debug!(
            "Generation request: model={}, prompt_chars={}, num_predict={}",
            self.model,
            prompt.chars().count(),
            options.num_predict
        );

        let response = self.client.post(&url).json(&body).send().map_err(|e| {
            if e.is_timeout() {
                GenerationError::Timeout {
                    secs: self.timeout_secs,
                }
            } else if e.is_connect() {
                GenerationError::ServiceUnavailable(self.base_url.clone())
            } else {
                GenerationError::InvalidResponse(e.to_string())
            }
        })?;

        let status = response.status();
        if !status.is_success() {
            let body = response.text().unwrap_or_default();
            return Err(GenerationError::UnexpectedStatus {
                status: status.as_u16(),
                body,
            });
        }

        let parsed: GenerateResponse = response.json().map_err(|e| {
            if e.is_timeout() {
                GenerationError::Timeout {
                    secs: self.timeout_secs,
                }
            } else {
                GenerationError::InvalidResponse(e.to_string())
            }
        })?;

        Ok(parsed.response)
    }

    fn model(&self) -> &str {
        &self.model
    }
}
