//! Domain error types

use thiserror::Error;

/// Input-validation errors raised before any remote call is made.
#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum DomainError {
    #[error("Prompt must not be empty")]
    EmptyPrompt,

    #[error("Prompt exceeds the maximum length of {max} characters")]
    PromptTooLong { max: usize },

    #[error("No models requested")]
    EmptyModelList,

    #[error("Unsupported mode: {0}")]
    UnsupportedMode(String),
}
