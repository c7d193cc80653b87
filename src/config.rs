//! Configuration management for the shell agent.
//!
//! Configuration can be set via environment variables:
//! - `LLM_API_KEY` - Required. API key for the model endpoint.
//! - `MODEL_FAMILY` - Optional. `deepseek` or `qwen`. Defaults to `deepseek`.
//! - `LLM_MODEL` - Optional. Model name. Defaults to the family's default model.
//! - `LLM_BASE_URL` - Optional. OpenAI-compatible base URL. Defaults to the family's endpoint.
//! - `LLM_TEMPERATURE` - Optional. Sampling temperature. Defaults to `0.0`.
//! - `PROMPT_DIALECT` - Optional. `custom`, `structured` or `react`. Defaults to `custom`.
//! - `MAX_ITERATIONS` - Optional. Maximum agent loop iterations. Defaults to `3`.
//! - `MAX_EXECUTION_SECS` - Optional. Wall-clock budget for one run. Defaults to `30`.
//! - `TOOL_TIMEOUT_SECS` - Optional. Timeout for a single shell command. Defaults to `30`.
//! - `HANDLE_PARSING_ERRORS` - Optional. Feed strict parse errors back to the model. Defaults to `false`.
//! - `WORKSPACE_PATH` - Optional. Directory tools run in. Defaults to current directory.

use std::path::PathBuf;
use std::str::FromStr;
use std::time::Duration;

use thiserror::Error;

use crate::agent::{ModelFamily, PromptDialect};

#[derive(Debug, Error)]
pub enum ConfigError {
    #[error("Missing required environment variable: {0}")]
    MissingEnvVar(String),

    #[error("Invalid value for {0}: {1}")]
    InvalidValue(String, String),
}

/// Agent configuration.
#[derive(Debug, Clone)]
pub struct Config {
    /// API key for the model endpoint
    pub api_key: String,

    /// Model family, decides prompts, stop sequences and endpoint defaults
    pub model_family: ModelFamily,

    /// Model identifier sent to the endpoint
    pub model: String,

    /// OpenAI-compatible base URL
    pub api_base: String,

    /// Sampling temperature
    pub temperature: f32,

    /// Action format the model is prompted with
    pub dialect: PromptDialect,

    /// Workspace directory tools operate in
    pub workspace_path: PathBuf,

    /// Maximum iterations for the agent loop
    pub max_iterations: usize,

    /// Wall-clock budget for one agent run
    pub max_execution_time: Duration,

    /// Timeout for a single shell command
    pub tool_timeout: Duration,

    /// Record strict-mode parse failures as steps instead of failing the run
    pub handle_parsing_errors: bool,
}

impl Config {
    /// Load configuration from environment variables.
    ///
    /// # Errors
    ///
    /// Returns `ConfigError::MissingEnvVar` if `LLM_API_KEY` is not set, and
    /// `ConfigError::InvalidValue` for unparseable optional values.
    pub fn from_env() -> Result<Self, ConfigError> {
        let api_key = std::env::var("LLM_API_KEY")
            .map_err(|_| ConfigError::MissingEnvVar("LLM_API_KEY".to_string()))?;

        let model_family: ModelFamily = parse_env("MODEL_FAMILY")?.unwrap_or(ModelFamily::DeepSeek);

        let model = std::env::var("LLM_MODEL")
            .unwrap_or_else(|_| model_family.default_model().to_string());

        let api_base = std::env::var("LLM_BASE_URL")
            .unwrap_or_else(|_| model_family.default_api_base().to_string());

        let temperature = parse_env("LLM_TEMPERATURE")?.unwrap_or(0.0);

        let dialect = parse_env("PROMPT_DIALECT")?.unwrap_or_default();

        let workspace_path = std::env::var("WORKSPACE_PATH")
            .map(PathBuf::from)
            .unwrap_or_else(|_| std::env::current_dir().unwrap_or_else(|_| PathBuf::from(".")));

        let max_iterations = parse_env("MAX_ITERATIONS")?.unwrap_or(3);

        let max_execution_time = Duration::from_secs(parse_env("MAX_EXECUTION_SECS")?.unwrap_or(30));

        let tool_timeout = Duration::from_secs(parse_env("TOOL_TIMEOUT_SECS")?.unwrap_or(30));

        let handle_parsing_errors = std::env::var("HANDLE_PARSING_ERRORS")
            .ok()
            .map(|v| {
                parse_bool(&v)
                    .map_err(|e| ConfigError::InvalidValue("HANDLE_PARSING_ERRORS".to_string(), e))
            })
            .transpose()?
            .unwrap_or(false);

        Ok(Self {
            api_key,
            model_family,
            model,
            api_base,
            temperature,
            dialect,
            workspace_path,
            max_iterations,
            max_execution_time,
            tool_timeout,
            handle_parsing_errors,
        })
    }

    /// Create a config with default values (useful for testing).
    pub fn new(api_key: String, model_family: ModelFamily, workspace_path: PathBuf) -> Self {
        Self {
            api_key,
            model_family,
            model: model_family.default_model().to_string(),
            api_base: model_family.default_api_base().to_string(),
            temperature: 0.0,
            dialect: PromptDialect::Custom,
            workspace_path,
            max_iterations: 3,
            max_execution_time: Duration::from_secs(30),
            tool_timeout: Duration::from_secs(30),
            handle_parsing_errors: false,
        }
    }
}

/// Parse an optional environment variable with `FromStr`.
fn parse_env<T>(name: &str) -> Result<Option<T>, ConfigError>
where
    T: FromStr,
    T::Err: std::fmt::Display,
{
    std::env::var(name)
        .ok()
        .map(|v| {
            v.trim()
                .parse::<T>()
                .map_err(|e| ConfigError::InvalidValue(name.to_string(), e.to_string()))
        })
        .transpose()
}

fn parse_bool(value: &str) -> Result<bool, String> {
    match value.trim().to_lowercase().as_str() {
        "1" | "true" | "t" | "yes" | "y" | "on" => Ok(true),
        "0" | "false" | "f" | "no" | "n" | "off" => Ok(false),
        other => Err(format!("expected boolean-like value, got: {}", other)),
    }
}
