//! Error types for the activity runner.
//!
//! Uses `thiserror` for typed errors that surface through the whole
//! execution pipeline: prompt rendering, LLM calls, response parsing, and
//! the literature/sandbox providers. Every variant is converted into a
//! [`collegium_core::runner::ActivityError`] before reaching the
//! scheduler, which contains the failure per agent.

use collegium_core::runner::ActivityError;
use collegium_types::Activity;

/// Errors that can occur while executing an activity.
#[derive(Debug, thiserror::Error)]
pub enum RunnerError {
    /// Failed to render a prompt template.
    #[error("template render error: {0}")]
    Template(String),

    /// An LLM backend returned an error or was unreachable.
    #[error("LLM backend error: {0}")]
    LlmBackend(String),

    /// The LLM response could not be parsed into a usable shape.
    #[error("response parse error: {0}")]
    Parse(String),

    /// A literature or sandbox provider failed.
    #[error("provider error: {0}")]
    Provider(String),

    /// Configuration is invalid or missing.
    #[error("config error: {0}")]
    Config(String),

    /// Serialization or deserialization failure.
    #[error("serde error: {0}")]
    Serde(#[from] serde_json::Error),
}

impl RunnerError {
    /// Convert into the scheduler-facing error for the given activity.
    pub fn into_activity_error(self, activity: Activity) -> ActivityError {
        match self {
            Self::Parse(message) => ActivityError::BadResponse { activity, message },
            Self::Serde(err) => ActivityError::BadResponse {
                activity,
                message: err.to_string(),
            },
            other => ActivityError::Backend {
                message: other.to_string(),
            },
        }
    }
}
