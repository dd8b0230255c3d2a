//! Configuration types for the activity runner.
//!
//! All configuration is loaded from environment variables. The runner
//! needs to know which LLM backend to call (URL, API key, model), how
//! long an activity may take, where the prompt templates live, and the
//! per-million-token pricing used for cost accounting.

use std::time::Duration;

use rust_decimal::Decimal;

use crate::error::RunnerError;

/// Complete runner configuration loaded from the environment.
#[derive(Debug, Clone)]
pub struct RunnerConfig {
    /// LLM backend configuration.
    pub backend: LlmBackendConfig,
    /// Maximum time allowed for one activity (LLM calls + parsing).
    pub activity_timeout: Duration,
    /// Path to the prompt templates directory.
    pub templates_dir: String,
    /// Price per million input tokens, in dollars.
    pub input_rate: Decimal,
    /// Price per million output tokens, in dollars.
    pub output_rate: Decimal,
}

/// Configuration for a single LLM backend.
#[derive(Debug, Clone)]
pub struct LlmBackendConfig {
    /// The backend type (openai-compatible or anthropic).
    pub backend_type: BackendType,
    /// Base API URL (e.g. `https://api.openai.com/v1`).
    pub api_url: String,
    /// API key for authentication.
    pub api_key: String,
    /// Model identifier.
    pub model: String,
}

/// Supported LLM backend types.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum BackendType {
    /// `OpenAI`-compatible chat completions API.
    OpenAi,
    /// Anthropic Messages API (different request format).
    Anthropic,
}

impl RunnerConfig {
    /// Load configuration from environment variables.
    ///
    /// Required variables:
    /// - `LLM_BACKEND` -- backend type (`openai` or `anthropic`)
    /// - `LLM_API_URL` -- API base URL
    /// - `LLM_API_KEY` -- API key
    /// - `LLM_MODEL` -- model name
    ///
    /// Optional variables:
    /// - `ACTIVITY_TIMEOUT_MS` -- activity deadline in milliseconds (default 30000)
    /// - `TEMPLATES_DIR` -- path to prompt templates (default `templates`)
    /// - `LLM_INPUT_RATE` -- dollars per million input tokens (default `0.30`)
    /// - `LLM_OUTPUT_RATE` -- dollars per million output tokens (default `0.88`)
    ///
    /// # Errors
    ///
    /// Returns [`RunnerError::Config`] when a required variable is missing
    /// or an optional one fails to parse.
    pub fn from_env() -> Result<Self, RunnerError> {
        let backend = LlmBackendConfig {
            backend_type: parse_backend_type(&env_var("LLM_BACKEND")?)?,
            api_url: env_var("LLM_API_URL")?,
            api_key: env_var("LLM_API_KEY")?,
            model: env_var("LLM_MODEL")?,
        };

        let activity_timeout_ms: u64 = std::env::var("ACTIVITY_TIMEOUT_MS")
            .unwrap_or_else(|_| "30000".to_owned())
            .parse()
            .map_err(|e| RunnerError::Config(format!("invalid ACTIVITY_TIMEOUT_MS: {e}")))?;

        let templates_dir =
            std::env::var("TEMPLATES_DIR").unwrap_or_else(|_| "templates".to_owned());

        let input_rate = parse_rate("LLM_INPUT_RATE", "0.30")?;
        let output_rate = parse_rate("LLM_OUTPUT_RATE", "0.88")?;

        Ok(Self {
            backend,
            activity_timeout: Duration::from_millis(activity_timeout_ms),
            templates_dir,
            input_rate,
            output_rate,
        })
    }
}

/// Read a required environment variable.
fn env_var(name: &str) -> Result<String, RunnerError> {
    std::env::var(name).map_err(|_| RunnerError::Config(format!("missing {name}")))
}

/// Parse a backend type string.
fn parse_backend_type(s: &str) -> Result<BackendType, RunnerError> {
    match s.to_lowercase().as_str() {
        "openai" | "openai-compatible" | "ollama" => Ok(BackendType::OpenAi),
        "anthropic" => Ok(BackendType::Anthropic),
        other => Err(RunnerError::Config(format!("unknown backend type: {other}"))),
    }
}

/// Parse a decimal pricing rate from an environment variable.
fn parse_rate(name: &str, default: &str) -> Result<Decimal, RunnerError> {
    let raw = std::env::var(name).unwrap_or_else(|_| default.to_owned());
    raw.parse()
        .map_err(|e| RunnerError::Config(format!("invalid {name}: {e}")))
}
