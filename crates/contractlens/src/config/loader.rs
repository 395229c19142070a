use std::path::{Path, PathBuf};

use crate::config::schema::{Config, StorageConfig};
use crate::error::ConfigError;

const SCHEMA_JSON: &str = include_str!("../../../../schema/config-v1.json");

/// Environment variable overriding `generation.base_url`.
pub const ENV_OLLAMA_BASE_URL: &str = "OLLAMA_BASE_URL";
/// Environment variable overriding `generation.model`.
pub const ENV_OLLAMA_MODEL: &str = "OLLAMA_MODEL";
/// Environment variable overriding `database_path`.
pub const ENV_DATABASE: &str = "CONTRACTLENS_DATABASE";

pub fn load_config<P: AsRef<Path>>(path: P) -> Result<Config, ConfigError> {
    let path = path.as_ref();
    let content = std::fs::read_to_string(path).map_err(|e| ConfigError::ReadFile {
        path: path.to_path_buf(),
        source: e,
    })?;

    load_config_from_str(&content)
}

pub fn load_config_from_str(content: &str) -> Result<Config, ConfigError> {
    let json_value: serde_json::Value = serde_json::from_str(content)?;

    validate_schema(&json_value)?;

    let config: Config = serde_json::from_value(json_value)?;

    validate_config(&config)?;

    Ok(config)
}

/// Returns the canonical config path: `~/.contractlens/config.json`.
pub fn default_config_path() -> Option<PathBuf> {
    dirs::home_dir().map(|h| h.join(".contractlens").join("config.json"))
}

/// Applies `OLLAMA_BASE_URL`, `OLLAMA_MODEL` and `CONTRACTLENS_DATABASE` on top
/// of a loaded config, then re-validates.
pub fn apply_env_overrides(mut config: Config) -> Result<Config, ConfigError> {
    if let Some(url) = non_empty_env(ENV_OLLAMA_BASE_URL) {
        config.generation.base_url = url;
    }
    if let Some(model) = non_empty_env(ENV_OLLAMA_MODEL) {
        config.generation.model = model;
    }
    if let Some(db) = non_empty_env(ENV_DATABASE) {
        config.database_path = Some(db);
    }

    validate_config(&config)?;
    Ok(config)
}

fn non_empty_env(name: &str) -> Option<String> {
    std::env::var(name)
        .ok()
        .map(|v| v.trim().to_string())
        .filter(|v| !v.is_empty())
}

fn validate_schema(json_value: &serde_json::Value) -> Result<(), ConfigError> {
    let schema: serde_json::Value =
        serde_json::from_str(SCHEMA_JSON).map_err(|e| ConfigError::Validation {
            message: format!("Invalid embedded schema JSON: {}", e),
        })?;

    let validator = jsonschema::validator_for(&schema).map_err(|e| ConfigError::Validation {
        message: format!("Failed to compile JSON schema: {}", e),
    })?;

    let error_messages: Vec<String> = validator
        .iter_errors(json_value)
        .map(|e| e.to_string())
        .collect();

    if !error_messages.is_empty() {
        return Err(ConfigError::SchemaValidation {
            errors: error_messages.join("; "),
        });
    }

    Ok(())
}

fn validate_config(config: &Config) -> Result<(), ConfigError> {
    if config.version != "1.0" {
        return Err(ConfigError::Validation {
            message: format!("Unsupported config version: {}", config.version),
        });
    }

    if config.worker_count == 0 {
        return Err(ConfigError::Validation {
            message: "worker_count must be greater than 0".to_string(),
        });
    }

    if config.queue_capacity == 0 {
        return Err(ConfigError::Validation {
            message: "queue_capacity must be greater than 0".to_string(),
        });
    }

    if config.generation.model.trim().is_empty() {
        return Err(ConfigError::Validation {
            message: "generation.model must not be empty".to_string(),
        });
    }

    if config.generation.max_input_chars == 0 {
        return Err(ConfigError::Validation {
            message: "generation.max_input_chars must be greater than 0".to_string(),
        });
    }

    validate_http_url("generation.base_url", &config.generation.base_url)?;

    if let StorageConfig::Remote { base_url, .. } = &config.storage {
        validate_http_url("storage.base_url", base_url)?;
    }

    Ok(())
}

fn validate_http_url(field: &str, url: &str) -> Result<(), ConfigError> {
    if url.starts_with("http://") || url.starts_with("https://") {
        Ok(())
    } else {
        Err(ConfigError::Validation {
            message: format!("{} must be an http(s) URL, got '{}'", field, url),
        })
    }
}
