//! Merge orchestration use case — the central algorithm.
//!
//! Fans the prompt out to all query models, commits to the judge early once
//! the success threshold is met, optionally refines through debate (which
//! supersedes the early judge), and assembles the merged response with
//! fallbacks.

use crate::config::EngineConfig;
use crate::ports::model_client::{CallOptions, ModelCallError, ModelClient};
use crate::use_cases::judge_synthesis::{JudgeInputs, JudgeSynthesizer};
use crate::use_cases::run_debate::DebateEngine;
use council_domain::{
    DebateRound, DomainError, MergedResponse, Message, ModelCallResult, ModelId, QueryMode,
    RequestId, SuccessfulAnswer,
};
use std::sync::Arc;
use std::time::Instant;
use thiserror::Error;
use tokio::task::{JoinHandle, JoinSet};
use tokio_util::sync::CancellationToken;
use tracing::{debug, info, warn};

/// Errors that fail an orchestration outright.
#[derive(Error, Debug)]
pub enum MergeError {
    #[error(transparent)]
    Input(#[from] DomainError),

    /// Every query model failed; carries the full per-model result list.
    #[error("All models failed to respond")]
    AllModelsFailed { results: Vec<ModelCallResult> },
}

/// A validated merge request.
#[derive(Debug, Clone)]
pub struct MergeRequest {
    pub prompt: String,
    pub mode: QueryMode,
    pub models: Vec<ModelId>,
    pub judge_model: Option<ModelId>,
}

/// Use case for orchestrating one multi-model merge.
pub struct MergeOrchestrator {
    client: Arc<dyn ModelClient>,
    judge: JudgeSynthesizer,
    debate: DebateEngine,
    config: Arc<EngineConfig>,
}

impl MergeOrchestrator {
    pub fn new(client: Arc<dyn ModelClient>, config: Arc<EngineConfig>) -> Self {
        Self {
            judge: JudgeSynthesizer::new(Arc::clone(&client), Arc::clone(&config)),
            debate: DebateEngine::new(Arc::clone(&client), Arc::clone(&config)),
            client,
            config,
        }
    }

    pub async fn orchestrate(&self, request: MergeRequest) -> Result<MergedResponse, MergeError> {
        self.validate(&request)?;

        let request_id = RequestId::generate();
        let start = Instant::now();
        info!(
            request_id = %request_id,
            models = request.models.len(),
            mode = %request.mode,
            "starting merge orchestration"
        );

        // Phase 1: parallel fan-out, consuming completions as they arrive.
        let mut join_set = self.spawn_fanout(&request);

        let judge_override = request.judge_model.clone();
        let mut results: Vec<ModelCallResult> = Vec::with_capacity(request.models.len());
        let mut successes: Vec<SuccessfulAnswer> = Vec::new();
        let early_token = CancellationToken::new();
        let mut early_judge: Option<JoinHandle<Option<Result<String, ModelCallError>>>> = None;

        while let Some(joined) = join_set.join_next().await {
            let result = match joined {
                Ok(result) => result,
                Err(e) => {
                    warn!(request_id = %request_id, "fan-out task join error: {}", e);
                    continue;
                }
            };

            debug!(
                request_id = %request_id,
                model = %result.model_id,
                success = result.success,
                latency_ms = result.latency_ms,
                "model completed"
            );
            if let Some(success) = result.as_successful() {
                successes.push(success);
            }
            results.push(result);

            // Early commit: launch the judge the moment the threshold holds,
            // with a snapshot of the successes so far.
            if self.config.enable_early_judge
                && early_judge.is_none()
                && successes.len() == self.config.min_models_for_judge
            {
                info!(
                    request_id = %request_id,
                    successes = successes.len(),
                    "early-commit threshold reached, launching judge"
                );
                early_judge = Some(self.spawn_early_judge(
                    &request.prompt,
                    successes.clone(),
                    judge_override.clone(),
                    early_token.clone(),
                ));
            }
        }

        if successes.is_empty() {
            warn!(request_id = %request_id, "all models failed");
            return Err(MergeError::AllModelsFailed { results });
        }

        // Phase 3: optional debate. A completed debate supersedes the early
        // judge: its token is cancelled and a fresh judge call runs over the
        // debated answers with round context.
        let (final_answers, rounds): (Vec<SuccessfulAnswer>, Vec<DebateRound>) =
            if self.config.enable_debate
                && self.config.max_debate_rounds > 0
                && successes.len() >= 2
            {
                early_token.cancel();
                let judge_model = judge_override
                    .clone()
                    .unwrap_or_else(|| self.config.judge_model.clone());
                let outcome = self
                    .debate
                    .run(&request.prompt, successes, &judge_model)
                    .await;
                info!(
                    request_id = %request_id,
                    rounds = outcome.rounds.len(),
                    "debate complete"
                );
                (outcome.final_answers, outcome.rounds)
            } else {
                (successes, Vec::new())
            };

        let judge_result = if !rounds.is_empty() {
            // Drain the superseded early judge so no work is orphaned; its
            // output is never returned.
            if let Some(handle) = early_judge.take() {
                let _ = handle.await;
            }
            self.judge
                .judge_and_merge(JudgeInputs {
                    prompt: &request.prompt,
                    answers: &final_answers,
                    rounds: &rounds,
                    judge_override: judge_override.as_ref(),
                    research_summary: None,
                    research_mode: false,
                })
                .await
        } else {
            let early_result = match early_judge.take() {
                Some(handle) => handle.await.ok().flatten(),
                None => None,
            };
            match early_result {
                Some(result) => result,
                // Phase 2: late judge over all successes.
                None => {
                    self.judge
                        .judge_and_merge(JudgeInputs {
                            prompt: &request.prompt,
                            answers: &final_answers,
                            rounds: &[],
                            judge_override: judge_override.as_ref(),
                            research_summary: None,
                            research_mode: false,
                        })
                        .await
                }
            }
        };

        let merged_answer = match judge_result {
            Ok(answer) => answer,
            Err(e) => {
                warn!(
                    request_id = %request_id,
                    "judge failed, falling back to first answer: {}",
                    e
                );
                final_answers[0].answer.clone()
            }
        };

        let total_latency_ms = start.elapsed().as_millis() as u64;
        info!(request_id = %request_id, total_latency_ms, "merge complete");

        Ok(MergedResponse {
            merged_answer,
            per_model_results: results,
            total_latency_ms,
            request_id,
        })
    }

    fn validate(&self, request: &MergeRequest) -> Result<(), DomainError> {
        if request.prompt.trim().is_empty() {
            return Err(DomainError::EmptyPrompt);
        }
        let max = self.config.max_prompt_length;
        if request.prompt.chars().count() > max {
            return Err(DomainError::PromptTooLong { max });
        }
        if request.models.is_empty() {
            return Err(DomainError::EmptyModelList);
        }
        Ok(())
    }

    /// Spawn all query-model calls. Each task resolves to a
    /// `ModelCallResult`; failures are captured, never propagated.
    fn spawn_fanout(&self, request: &MergeRequest) -> JoinSet<ModelCallResult> {
        let mut join_set = JoinSet::new();
        for model in &request.models {
            let client = Arc::clone(&self.client);
            let model = model.clone();
            let messages = vec![
                Message::system(request.mode.system_prompt()),
                Message::user(request.prompt.clone()),
            ];
            let options = CallOptions::with_timeout(self.config.per_model_timeout)
                .max_tokens(self.config.query_max_tokens);
            let max_retries = self.config.max_retries;

            join_set.spawn(async move {
                let call_start = Instant::now();
                let outcome = client
                    .call_model_with_retry(&model, &messages, &options, max_retries)
                    .await;
                let latency_ms = call_start.elapsed().as_millis() as u64;
                match outcome {
                    Ok(reply) => ModelCallResult::succeeded(model, reply.answer, reply.latency_ms),
                    Err(e) => ModelCallResult::failed(model, e.to_string(), latency_ms),
                }
            });
        }
        join_set
    }

    /// Spawn the early judge over a snapshot of the current successes,
    /// guarded by a cancellation token. Resolves to `None` when superseded.
    fn spawn_early_judge(
        &self,
        prompt: &str,
        snapshot: Vec<SuccessfulAnswer>,
        judge_override: Option<ModelId>,
        token: CancellationToken,
    ) -> JoinHandle<Option<Result<String, ModelCallError>>> {
        let judge = self.judge.clone();
        let prompt = prompt.to_string();
        tokio::spawn(async move {
            tokio::select! {
                _ = token.cancelled() => None,
                result = judge.judge_and_merge(JudgeInputs {
                    prompt: &prompt,
                    answers: &snapshot,
                    rounds: &[],
                    judge_override: judge_override.as_ref(),
                    research_summary: None,
                    research_mode: false,
                }) => Some(result),
            }
        })
    }
}
