//! Structured research report written by the worker, and job error
//! classification.

use crate::debate::ModelAnswer;
use crate::research::entities::ResearchResult;
use serde::{Deserialize, Serialize};
use thiserror::Error;

/// Kind of a report section.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum SectionKind {
    Summary,
    Citations,
    Sources,
}

/// One titled section of the report.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ReportSection {
    pub title: String,
    pub content: String,
    #[serde(rename = "type")]
    pub kind: SectionKind,
}

/// Why a completed research job did not use external research.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum FallbackReason {
    NoExternalSources,
    NoCitationsExtracted,
}

impl FallbackReason {
    pub fn as_str(&self) -> &'static str {
        match self {
            FallbackReason::NoExternalSources => "NO_EXTERNAL_SOURCES",
            FallbackReason::NoCitationsExtracted => "NO_CITATIONS_EXTRACTED",
        }
    }

    /// Derive the fallback tag: no external sources at all, or sources that
    /// produced an empty aggregated citation list.
    pub fn derive(has_sources: bool, citation_count: usize) -> Option<Self> {
        if !has_sources {
            Some(FallbackReason::NoExternalSources)
        } else if citation_count == 0 {
            Some(FallbackReason::NoCitationsExtracted)
        } else {
            None
        }
    }
}

/// Metadata attached to a completed report.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ReportMetadata {
    pub fallback_reason: Option<FallbackReason>,
    pub model_count: usize,
    pub duration_ms: u64,
}

/// The structured result of a completed deep-research job.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ResearchReport {
    pub summary: String,
    pub sections: Vec<ReportSection>,
    pub citations: Vec<String>,
    pub research_sources: Vec<ResearchResult>,
    pub debate_rounds: usize,
    pub model_answers: Vec<ModelAnswer>,
    pub metadata: ReportMetadata,
}

/// Classified code for a failed job.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum JobErrorCode {
    ResearchTimeout,
    RateLimitExceeded,
    InvalidInput,
    ResearchFailed,
}

impl JobErrorCode {
    pub fn as_str(&self) -> &'static str {
        match self {
            JobErrorCode::ResearchTimeout => "RESEARCH_TIMEOUT",
            JobErrorCode::RateLimitExceeded => "RATE_LIMIT_EXCEEDED",
            JobErrorCode::InvalidInput => "INVALID_INPUT",
            JobErrorCode::ResearchFailed => "RESEARCH_FAILED",
        }
    }
}

impl std::fmt::Display for JobErrorCode {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}", self.as_str())
    }
}

/// Error recorded on a failed job and exposed to pollers.
#[derive(Debug, Clone, PartialEq, Eq, Error, Serialize, Deserialize)]
#[error("{code}: {message}")]
pub struct JobError {
    pub code: JobErrorCode,
    pub message: String,
}

impl JobError {
    pub fn classified(message: impl Into<String>) -> Self {
        let message = message.into();
        Self {
            code: classify_error(&message),
            message,
        }
    }
}

/// Map a pipeline error message to a job error code by case-insensitive
/// substring match.
pub fn classify_error(message: &str) -> JobErrorCode {
    let lower = message.to_lowercase();
    if lower.contains("timeout") || lower.contains("timed out") {
        JobErrorCode::ResearchTimeout
    } else if lower.contains("rate limit") {
        JobErrorCode::RateLimitExceeded
    } else if lower.contains("invalid") {
        JobErrorCode::InvalidInput
    } else {
        JobErrorCode::ResearchFailed
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn classification_by_substring() {
        assert_eq!(
            classify_error("Request timed out after 45s"),
            JobErrorCode::ResearchTimeout
        );
        assert_eq!(
            classify_error("upstream rate limit exceeded"),
            JobErrorCode::RateLimitExceeded
        );
        assert_eq!(
            classify_error("Invalid query string"),
            JobErrorCode::InvalidInput
        );
        assert_eq!(
            classify_error("something else entirely"),
            JobErrorCode::ResearchFailed
        );
    }

    #[test]
    fn fallback_reason_derivation() {
        assert_eq!(
            FallbackReason::derive(false, 0),
            Some(FallbackReason::NoExternalSources)
        );
        assert_eq!(
            FallbackReason::derive(true, 0),
            Some(FallbackReason::NoCitationsExtracted)
        );
        assert_eq!(FallbackReason::derive(true, 3), None);
    }

    #[test]
    fn codes_serialize_screaming_snake() {
        assert_eq!(
            serde_json::to_string(&JobErrorCode::ResearchTimeout).unwrap(),
            "\"RESEARCH_TIMEOUT\""
        );
        assert_eq!(
            serde_json::to_string(&FallbackReason::NoExternalSources).unwrap(),
            "\"NO_EXTERNAL_SOURCES\""
        );
    }

    #[test]
    fn section_kind_uses_type_key() {
        let section = ReportSection {
            title: "Summary".to_string(),
            content: "text".to_string(),
            kind: SectionKind::Summary,
        };
        let json = serde_json::to_string(&section).unwrap();
        assert!(json.contains("\"type\":\"summary\""));
    }
}
