//! Merge orchestration value objects.

use crate::core::model::ModelId;
use serde::{Deserialize, Serialize};
use uuid::Uuid;

/// Fresh opaque identifier tagging one orchestration, used uniformly in logs.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(transparent)]
pub struct RequestId(String);

impl RequestId {
    pub fn generate() -> Self {
        Self(Uuid::new_v4().to_string())
    }

    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl std::fmt::Display for RequestId {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}", self.0)
    }
}

/// Outcome of one query-model call during fan-out.
///
/// Invariant: `success` holds exactly when `answer` is present. The two
/// constructors are the only way to build a value, which keeps the invariant.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ModelCallResult {
    pub model_id: ModelId,
    pub answer: Option<String>,
    pub latency_ms: u64,
    pub success: bool,
    pub error: Option<String>,
}

impl ModelCallResult {
    pub fn succeeded(model_id: ModelId, answer: impl Into<String>, latency_ms: u64) -> Self {
        Self {
            model_id,
            answer: Some(answer.into()),
            latency_ms,
            success: true,
            error: None,
        }
    }

    pub fn failed(model_id: ModelId, error: impl Into<String>, latency_ms: u64) -> Self {
        Self {
            model_id,
            answer: None,
            latency_ms,
            success: false,
            error: Some(error.into()),
        }
    }

    /// Extract the successful answer, if any.
    pub fn as_successful(&self) -> Option<SuccessfulAnswer> {
        self.answer.as_ref().map(|answer| SuccessfulAnswer {
            model_id: self.model_id.clone(),
            answer: answer.clone(),
        })
    }
}

/// A model's answer that survived fan-out and flows to debate and judge.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct SuccessfulAnswer {
    pub model_id: ModelId,
    pub answer: String,
}

/// An answer with its originating model stripped, as the judge sees it.
///
/// Labels are assigned by enumeration order; the judge never sees a model id.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct AnonymizedAnswer {
    pub label: String,
    pub content: String,
}

/// Assign sequential labels to answers, truncating each content at the last
/// word boundary before `max_chars`.
pub fn anonymize(
    answers: &[SuccessfulAnswer],
    label_prefix: &str,
    max_chars: usize,
) -> Vec<AnonymizedAnswer> {
    answers
        .iter()
        .enumerate()
        .map(|(i, a)| AnonymizedAnswer {
            label: format!("{} {}", label_prefix, label_letter(i)),
            content: crate::util::truncate_at_word(&a.answer, max_chars),
        })
        .collect()
}

/// Sequential label letter: A, B, ... Z, AA, AB, ...
pub fn label_letter(index: usize) -> String {
    let mut n = index;
    let mut out = String::new();
    loop {
        out.insert(0, (b'A' + (n % 26) as u8) as char);
        if n < 26 {
            break;
        }
        n = n / 26 - 1;
    }
    out
}

/// Final product of one orchestration.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct MergedResponse {
    pub merged_answer: String,
    pub per_model_results: Vec<ModelCallResult>,
    pub total_latency_ms: u64,
    pub request_id: RequestId,
}
