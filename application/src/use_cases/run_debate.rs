//! Debate use case
//!
//! Runs the iterative N-round state machine: judge feedback, then parallel
//! refinement. Partial-failure tolerant — the debate never aborts the
//! enclosing pipeline, and a model that fails a round keeps its previous
//! answer.

use crate::config::EngineConfig;
use crate::ports::model_client::{CallOptions, ModelClient};
use council_domain::{
    anonymize, AnonymizedAnswer, DebateOutcome, DebateRound, Message, ModelAnswer, ModelId,
    PromptTemplate, SuccessfulAnswer, GENERIC_FEEDBACK,
};
use std::collections::HashMap;
use std::sync::Arc;
use std::time::Instant;
use tokio::task::JoinSet;
use tracing::{debug, warn};

/// Per-answer view cap in the feedback prompt.
const FEEDBACK_VIEW_CHARS: usize = 500;
/// Per-answer view cap for peers and the model's own previous answer in
/// refinement prompts.
const PEER_VIEW_CHARS: usize = 300;

/// Use case for running a moderated debate over candidate answers.
#[derive(Clone)]
pub struct DebateEngine {
    client: Arc<dyn ModelClient>,
    config: Arc<EngineConfig>,
}

impl DebateEngine {
    pub fn new(client: Arc<dyn ModelClient>, config: Arc<EngineConfig>) -> Self {
        Self { client, config }
    }

    /// Run exactly `max_debate_rounds` rounds. Zero rounds (or no inputs)
    /// is identity-on-inputs.
    pub async fn run(
        &self,
        question: &str,
        initial: Vec<SuccessfulAnswer>,
        judge_model: &ModelId,
    ) -> DebateOutcome {
        if self.config.max_debate_rounds == 0 || initial.is_empty() {
            return DebateOutcome::identity(initial);
        }

        let start = Instant::now();
        let mut current: Vec<ModelAnswer> = initial
            .into_iter()
            .map(|a| ModelAnswer {
                model_id: a.model_id,
                answer: a.answer,
                latency_ms: 0,
            })
            .collect();

        let mut rounds = Vec::with_capacity(self.config.max_debate_rounds);
        for round_index in 1..=self.config.max_debate_rounds {
            debug!(round = round_index, models = current.len(), "debate round");

            let feedback = self.round_feedback(question, &current, judge_model).await;
            current = self
                .refine_round(question, round_index, &feedback, current)
                .await;

            rounds.push(DebateRound {
                round_index,
                judge_feedback: feedback,
                answers: current.clone(),
            });
        }

        DebateOutcome {
            final_answers: current.iter().map(ModelAnswer::as_successful).collect(),
            rounds,
            total_latency_ms: start.elapsed().as_millis() as u64,
        }
    }

    /// Ask the judge for short directive feedback on the current answers.
    /// On failure the generic feedback is substituted and the round proceeds.
    async fn round_feedback(
        &self,
        question: &str,
        current: &[ModelAnswer],
        judge_model: &ModelId,
    ) -> String {
        let answers: Vec<SuccessfulAnswer> =
            current.iter().map(ModelAnswer::as_successful).collect();
        let anonymized = anonymize(&answers, "Answer", FEEDBACK_VIEW_CHARS);

        let messages = [
            Message::system(PromptTemplate::feedback_system()),
            Message::user(PromptTemplate::feedback_prompt(question, &anonymized)),
        ];
        let options = CallOptions::with_timeout(self.config.judge_feedback_timeout);

        match self.client.call_model(judge_model, &messages, &options).await {
            Ok(reply) => reply.answer,
            Err(e) => {
                warn!("judge feedback failed, using generic feedback: {}", e);
                GENERIC_FEEDBACK.to_string()
            }
        }
    }

    /// Refine every model in parallel. A model whose call fails retains its
    /// previous answer.
    async fn refine_round(
        &self,
        question: &str,
        round_index: usize,
        feedback: &str,
        current: Vec<ModelAnswer>,
    ) -> Vec<ModelAnswer> {
        let answers: Vec<SuccessfulAnswer> =
            current.iter().map(ModelAnswer::as_successful).collect();
        let peer_views = anonymize(&answers, "Expert", PEER_VIEW_CHARS);

        let mut join_set = JoinSet::new();
        for (i, answer) in current.iter().enumerate() {
            let others: Vec<AnonymizedAnswer> = peer_views
                .iter()
                .enumerate()
                .filter(|(j, _)| *j != i)
                .map(|(_, view)| view.clone())
                .collect();
            let own_previous = council_domain::truncate_at_word(&answer.answer, PEER_VIEW_CHARS);

            let system = PromptTemplate::refine_system(round_index, feedback);
            let user = PromptTemplate::refine_prompt(question, feedback, &others, &own_previous);

            let client = Arc::clone(&self.client);
            let model = answer.model_id.clone();
            let options = CallOptions::with_timeout(self.config.debate_timeout);
            join_set.spawn(async move {
                let messages = [Message::system(system), Message::user(user)];
                let result = client.call_model(&model, &messages, &options).await;
                (model, result)
            });
        }

        let mut refined: HashMap<ModelId, ModelAnswer> = HashMap::new();
        while let Some(joined) = join_set.join_next().await {
            match joined {
                Ok((model, Ok(reply))) => {
                    refined.insert(
                        model.clone(),
                        ModelAnswer {
                            model_id: model,
                            answer: reply.answer,
                            latency_ms: reply.latency_ms,
                        },
                    );
                }
                Ok((model, Err(e))) => {
                    warn!(
                        model = %model,
                        round = round_index,
                        "refinement failed, keeping previous answer: {}",
                        e
                    );
                }
                Err(e) => {
                    warn!("refinement task join error: {}", e);
                }
            }
        }

        current
            .into_iter()
            .map(|previous| {
                refined
                    .remove(&previous.model_id)
                    .unwrap_or(previous)
            })
            .collect()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::testing::{MockModelClient, Scripted};
    use council_domain::ModelId;
    use std::time::Duration;

    fn initial() -> Vec<SuccessfulAnswer> {
        vec![
            SuccessfulAnswer {
                model_id: ModelId::new("openai/gpt-4o"),
                answer: "initial alpha".to_string(),
            },
            SuccessfulAnswer {
                model_id: ModelId::new("anthropic/claude"),
                answer: "initial beta".to_string(),
            },
        ]
    }

    fn engine(client: Arc<MockModelClient>, rounds: usize) -> DebateEngine {
        let config = EngineConfig::default().with_debate(true, rounds);
        DebateEngine::new(client, Arc::new(config))
    }

    #[tokio::test]
    async fn runs_exactly_the_configured_rounds() {
        let client = Arc::new(MockModelClient::new());
        let outcome = engine(client, 3)
            .run("Q", initial(), &ModelId::new("judge/j"))
            .await;
        assert_eq!(outcome.rounds.len(), 3);
        for (i, round) in outcome.rounds.iter().enumerate() {
            assert_eq!(round.round_index, i + 1);
        }
    }

    #[tokio::test]
    async fn zero_rounds_is_identity() {
        let client = Arc::new(MockModelClient::new());
        let answers = initial();
        let outcome = engine(client.clone(), 0)
            .run("Q", answers.clone(), &ModelId::new("judge/j"))
            .await;
        assert!(outcome.rounds.is_empty());
        assert_eq!(outcome.final_answers, answers);
        assert!(client.calls().is_empty());
    }

    #[tokio::test]
    async fn failed_model_keeps_previous_answer() {
        let client = Arc::new(MockModelClient::new());
        // Round 1: claude refines fine. Round 2: claude fails.
        client.script(
            "anthropic/claude",
            Scripted::ok("refined beta", Duration::ZERO),
        );
        client.script(
            "anthropic/claude",
            Scripted::err(
                crate::ports::model_client::ModelCallError::Timeout,
                Duration::ZERO,
            ),
        );

        let outcome = engine(client, 2)
            .run("Q", initial(), &ModelId::new("judge/j"))
            .await;

        assert_eq!(outcome.rounds.len(), 2);
        let claude_final = outcome
            .final_answers
            .iter()
            .find(|a| a.model_id.as_str() == "anthropic/claude")
            .unwrap();
        // Round-2 failure retains the round-1 refinement
        assert_eq!(claude_final.answer, "refined beta");
        let round2 = &outcome.rounds[1];
        let claude_round2 = round2
            .answers
            .iter()
            .find(|a| a.model_id.as_str() == "anthropic/claude")
            .unwrap();
        assert_eq!(claude_round2.answer, "refined beta");
    }

    #[tokio::test]
    async fn feedback_failure_substitutes_generic_feedback() {
        let client = Arc::new(MockModelClient::new());
        client.script(
            "judge/j",
            Scripted::err(
                crate::ports::model_client::ModelCallError::Network("down".into()),
                Duration::ZERO,
            ),
        );

        let outcome = engine(client, 1)
            .run("Q", initial(), &ModelId::new("judge/j"))
            .await;

        assert_eq!(outcome.rounds[0].judge_feedback, GENERIC_FEEDBACK);
        // Refinement still ran
        assert_eq!(outcome.final_answers.len(), 2);
    }

    #[tokio::test]
    async fn refinement_prompts_are_anonymized() {
        let client = Arc::new(MockModelClient::new());
        engine(client.clone(), 1)
            .run("Q", initial(), &ModelId::new("judge/j"))
            .await;

        for call in client.calls() {
            if call.model.as_str() == "judge/j" {
                continue;
            }
            assert!(!call.user.contains("gpt-4o"));
            assert!(!call.user.contains("anthropic"));
            assert!(call.system.contains("round 1"));
        }
    }

    #[tokio::test]
    async fn every_model_fails_every_round_keeps_initial_answers() {
        let client = Arc::new(MockModelClient::new());
        for model in ["openai/gpt-4o", "anthropic/claude"] {
            for _ in 0..2 {
                client.script(
                    model,
                    Scripted::err(
                        crate::ports::model_client::ModelCallError::Timeout,
                        Duration::ZERO,
                    ),
                );
            }
        }

        let answers = initial();
        let outcome = engine(client, 2)
            .run("Q", answers.clone(), &ModelId::new("judge/j"))
            .await;

        assert_eq!(outcome.final_answers, answers);
        assert_eq!(outcome.rounds.len(), 2);
    }
}
