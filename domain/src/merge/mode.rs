//! Query modes selecting the system prompt for the fan-out phase.

use crate::core::error::DomainError;
use serde::{Deserialize, Serialize};

/// Mode of a merge query.
///
/// The mode selects the system prompt appended to each query-model call.
/// Image generation and deep research are routed to their own pipelines
/// before orchestration and therefore have no variant here.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "kebab-case")]
pub enum QueryMode {
    General,
    Coding,
    SystemDesign,
    Creative,
}

impl QueryMode {
    /// Parse a mode string. `"query"` is a legacy alias for `general`.
    pub fn parse(s: &str) -> Result<Self, DomainError> {
        match s {
            "general" | "query" => Ok(QueryMode::General),
            "coding" => Ok(QueryMode::Coding),
            "system-design" | "system_design" => Ok(QueryMode::SystemDesign),
            "creative" => Ok(QueryMode::Creative),
            other => Err(DomainError::UnsupportedMode(other.to_string())),
        }
    }

    pub fn as_str(&self) -> &'static str {
        match self {
            QueryMode::General => "general",
            QueryMode::Coding => "coding",
            QueryMode::SystemDesign => "system-design",
            QueryMode::Creative => "creative",
        }
    }

    /// System prompt for query-phase model calls in this mode.
    pub fn system_prompt(&self) -> &'static str {
        match self {
            QueryMode::General => {
                r#"You are a knowledgeable assistant. Provide a thoughtful, accurate, and
well-structured answer to the user's question. Be concise but complete."#
            }
            QueryMode::Coding => {
                r#"You are an expert software engineer. Provide working, idiomatic code that
solves the user's problem, with a brief explanation of the approach. Prefer
complete examples over fragments and call out edge cases."#
            }
            QueryMode::SystemDesign => {
                r#"You are a senior systems architect. Describe a concrete architecture for the
user's problem: components, data flow, storage, scaling strategy, and the
trade-offs of your choices."#
            }
            QueryMode::Creative => {
                r#"You are a creative writer. Respond with original, vivid prose that fulfils
the user's request. Favour voice and imagery over exhaustive coverage."#
            }
        }
    }
}

impl Default for QueryMode {
    fn default() -> Self {
        QueryMode::General
    }
}

impl std::fmt::Display for QueryMode {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}", self.as_str())
    }
}

impl std::str::FromStr for QueryMode {
    type Err = DomainError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        Self::parse(s)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn query_normalizes_to_general() {
        assert_eq!(QueryMode::parse("query").unwrap(), QueryMode::General);
    }

    #[test]
    fn known_modes_parse() {
        assert_eq!(QueryMode::parse("coding").unwrap(), QueryMode::Coding);
        assert_eq!(
            QueryMode::parse("system-design").unwrap(),
            QueryMode::SystemDesign
        );
        assert_eq!(QueryMode::parse("creative").unwrap(), QueryMode::Creative);
    }

    #[test]
    fn unknown_mode_is_rejected() {
        let err = QueryMode::parse("haiku").unwrap_err();
        assert_eq!(err, DomainError::UnsupportedMode("haiku".to_string()));
    }

    #[test]
    fn each_mode_has_a_distinct_prompt() {
        let prompts = [
            QueryMode::General.system_prompt(),
            QueryMode::Coding.system_prompt(),
            QueryMode::SystemDesign.system_prompt(),
            QueryMode::Creative.system_prompt(),
        ];
        for (i, a) in prompts.iter().enumerate() {
            for b in prompts.iter().skip(i + 1) {
                assert_ne!(a, b);
            }
        }
    }
}
