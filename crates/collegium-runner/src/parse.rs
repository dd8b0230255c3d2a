//! LLM response parsing into typed activity results.
//!
//! The LLM returns raw text (ideally JSON). This module extracts the JSON
//! payload and deserializes it into the per-activity response shapes.
//! Common LLM formatting mistakes are recovered: markdown code fences,
//! trailing commas, prose around the payload.

use serde::Deserialize;
use serde::de::DeserializeOwned;

use crate::error::RunnerError;

/// Comprehension bands derived from a 0-100 confidence score.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ComprehensionLevel {
    /// Under 30: the reading produced little understanding.
    Confused,
    /// 30 to 60: some understanding.
    Partial,
    /// 60 to 85: solid understanding.
    Good,
    /// Over 85: near-complete understanding.
    Excellent,
}

impl ComprehensionLevel {
    /// Band for a confidence score, clamped into `[0, 100]`.
    pub fn from_confidence(confidence: f64) -> Self {
        let confidence = confidence.clamp(0.0, 100.0);
        if confidence < 30.0 {
            Self::Confused
        } else if confidence < 60.0 {
            Self::Partial
        } else if confidence < 85.0 {
            Self::Good
        } else {
            Self::Excellent
        }
    }
}

/// Parsed response for a learning activity.
#[derive(Debug, Clone, Deserialize)]
pub struct ComprehensionResponse {
    /// One-paragraph summary of the paper.
    #[serde(default)]
    pub summary: String,
    /// Concepts the reader picked out.
    #[serde(default)]
    pub key_concepts: Vec<String>,
    /// Self-reported understanding, 0-100.
    #[serde(default = "default_confidence")]
    pub confidence: f64,
}

/// Parsed response for a teaching activity.
#[derive(Debug, Clone, Deserialize)]
pub struct LessonResponse {
    /// One-line summary of the session.
    #[serde(default)]
    pub summary: String,
    /// Lesson quality, 0-5.
    #[serde(default)]
    pub quality: f64,
    /// Student progress made this session, 0-1.
    #[serde(default)]
    pub student_progress: f64,
}

/// Parsed response for a research activity.
#[derive(Debug, Clone, Deserialize)]
pub struct ResearchResponse {
    /// The hypothesis to test.
    pub hypothesis: String,
    /// Experiment code for the sandbox, when the LLM produced any.
    #[serde(default)]
    pub code: Option<String>,
    /// Proposed paper title.
    #[serde(default)]
    pub title: Option<String>,
    /// Proposed paper abstract.
    #[serde(default)]
    pub abstract_text: Option<String>,
}

/// Parsed response for a review activity.
#[derive(Debug, Clone, Deserialize)]
pub struct ReviewResponse {
    /// Review helpfulness, 0-5.
    #[serde(default)]
    pub quality: f64,
    /// One-line verdict.
    #[serde(default)]
    pub verdict: String,
}

/// Parsed response for a collaboration activity.
#[derive(Debug, Clone, Deserialize)]
pub struct CollaborationResponse {
    /// How the round went: `success`, `partial`, or `failure`.
    #[serde(default = "default_outcome")]
    pub outcome: String,
    /// Shared insights produced by the group.
    #[serde(default)]
    pub insights: Vec<String>,
}

fn default_confidence() -> f64 {
    50.0
}

fn default_outcome() -> String {
    String::from("partial")
}

/// Parse an LLM response string into a typed response shape.
///
/// Attempts multiple recovery strategies if the raw text is not clean
/// JSON:
/// 1. Direct `serde_json` deserialization
/// 2. Extract JSON from markdown code blocks
/// 3. Strip trailing commas and retry
///
/// # Errors
///
/// Returns [`RunnerError::Parse`] when every strategy fails.
pub fn parse_response<T: DeserializeOwned>(raw: &str) -> Result<T, RunnerError> {
    let trimmed = raw.trim();

    if let Ok(parsed) = serde_json::from_str::<T>(trimmed) {
        return Ok(parsed);
    }

    if let Some(json_str) = extract_json_from_codeblock(trimmed)
        && let Ok(parsed) = serde_json::from_str::<T>(json_str)
    {
        return Ok(parsed);
    }

    let cleaned = strip_trailing_commas(trimmed);
    if let Ok(parsed) = serde_json::from_str::<T>(&cleaned) {
        return Ok(parsed);
    }

    if let Some(json_str) = extract_json_from_codeblock(trimmed) {
        let cleaned_inner = strip_trailing_commas(json_str);
        if let Ok(parsed) = serde_json::from_str::<T>(&cleaned_inner) {
            return Ok(parsed);
        }
    }

    Err(RunnerError::Parse(format!(
        "all parse strategies failed for: {trimmed}"
    )))
}

/// Extract the JSON payload from a markdown code block, if present.
fn extract_json_from_codeblock(text: &str) -> Option<&str> {
    let start = text.find("```")?;
    let after_fence = text.get(start.checked_add(3)?..)?;
    // Skip an optional language tag on the fence line.
    let body_start = after_fence.find('\n')?;
    let body = after_fence.get(body_start.checked_add(1)?..)?;
    let end = body.find("```")?;
    Some(body.get(..end)?.trim())
}

/// Remove trailing commas before closing braces and brackets.
fn strip_trailing_commas(text: &str) -> String {
    let mut result = String::with_capacity(text.len());
    let mut chars = text.chars().peekable();

    while let Some(c) = chars.next() {
        if c == ',' {
            // Look ahead past whitespace for a closing delimiter.
            let mut lookahead = chars.clone();
            let mut next_significant = None;
            for n in lookahead.by_ref() {
                if !n.is_whitespace() {
                    next_significant = Some(n);
                    break;
                }
            }
            if matches!(next_significant, Some('}' | ']')) {
                continue;
            }
        }
        result.push(c);
    }

    result
}

#[cfg(test)]
#[allow(clippy::unwrap_used)]
mod tests {
    use super::*;

    #[test]
    fn comprehension_bands_match_thresholds() {
        assert_eq!(
            ComprehensionLevel::from_confidence(10.0),
            ComprehensionLevel::Confused
        );
        assert_eq!(
            ComprehensionLevel::from_confidence(45.0),
            ComprehensionLevel::Partial
        );
        assert_eq!(
            ComprehensionLevel::from_confidence(70.0),
            ComprehensionLevel::Good
        );
        assert_eq!(
            ComprehensionLevel::from_confidence(90.0),
            ComprehensionLevel::Excellent
        );
        assert_eq!(
            ComprehensionLevel::from_confidence(250.0),
            ComprehensionLevel::Excellent
        );
    }

    #[test]
    fn clean_json_parses_directly() {
        let raw = r#"{"summary": "solid paper", "key_concepts": ["streams"], "confidence": 72}"#;
        let parsed: ComprehensionResponse = parse_response(raw).unwrap();
        assert!((parsed.confidence - 72.0).abs() < f64::EPSILON);
        assert_eq!(parsed.key_concepts, vec!["streams"]);
    }

    #[test]
    fn codeblock_wrapped_json_is_recovered() {
        let raw = "Here is my review:\n```json\n{\"quality\": 4, \"verdict\": \"accept\"}\n```\nThanks!";
        let parsed: ReviewResponse = parse_response(raw).unwrap();
        assert!((parsed.quality - 4.0).abs() < f64::EPSILON);
        assert_eq!(parsed.verdict, "accept");
    }

    #[test]
    fn trailing_commas_are_recovered() {
        let raw = r#"{"outcome": "success", "insights": ["shared notation",],}"#;
        let parsed: CollaborationResponse = parse_response(raw).unwrap();
        assert_eq!(parsed.outcome, "success");
        assert_eq!(parsed.insights.len(), 1);
    }

    #[test]
    fn missing_fields_take_defaults() {
        let parsed: ComprehensionResponse = parse_response("{}").unwrap();
        assert!((parsed.confidence - 50.0).abs() < f64::EPSILON);
        assert!(parsed.summary.is_empty());
    }

    #[test]
    fn garbage_fails_with_parse_error() {
        let result: Result<ReviewResponse, _> = parse_response("the paper was nice");
        assert!(matches!(result, Err(RunnerError::Parse(_))));
    }

    #[test]
    fn research_response_requires_a_hypothesis() {
        let result: Result<ResearchResponse, _> = parse_response("{}");
        assert!(result.is_err());

        let parsed: ResearchResponse =
            parse_response(r#"{"hypothesis": "caching halves latency"}"#).unwrap();
        assert!(parsed.code.is_none());
    }
}
