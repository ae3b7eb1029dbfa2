//! Debate entities: rounds of judge feedback and parallel refinement.

use crate::core::model::ModelId;
use crate::merge::entities::SuccessfulAnswer;
use serde::{Deserialize, Serialize};

/// One model's answer at the end of a round, with the call latency.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ModelAnswer {
    pub model_id: ModelId,
    pub answer: String,
    pub latency_ms: u64,
}

impl ModelAnswer {
    pub fn as_successful(&self) -> SuccessfulAnswer {
        SuccessfulAnswer {
            model_id: self.model_id.clone(),
            answer: self.answer.clone(),
        }
    }
}

/// Record of one completed debate round.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct DebateRound {
    /// 1-based round index.
    pub round_index: usize,
    /// The judge's directive feedback for this round (or the generic
    /// fallback when the feedback call failed).
    pub judge_feedback: String,
    /// State of every participating model after the round's refinement.
    pub answers: Vec<ModelAnswer>,
}

/// Result of running the debate engine to completion.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct DebateOutcome {
    /// Strictly ordered rounds `1..=max_debate_rounds`.
    pub rounds: Vec<DebateRound>,
    /// The surviving answers after the final round.
    pub final_answers: Vec<SuccessfulAnswer>,
    pub total_latency_ms: u64,
}

impl DebateOutcome {
    /// The zero-round outcome: inputs pass through unchanged.
    pub fn identity(answers: Vec<SuccessfulAnswer>) -> Self {
        Self {
            rounds: Vec::new(),
            final_answers: answers,
            total_latency_ms: 0,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn identity_outcome_passes_answers_through() {
        let answers = vec![SuccessfulAnswer {
            model_id: ModelId::new("m"),
            answer: "unchanged".to_string(),
        }];
        let outcome = DebateOutcome::identity(answers.clone());
        assert!(outcome.rounds.is_empty());
        assert_eq!(outcome.final_answers, answers);
        assert_eq!(outcome.total_latency_ms, 0);
    }
}
