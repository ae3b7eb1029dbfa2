//! Deep-research pipeline use case
//!
//! Web search → researched answers → debate → judge (research mode) →
//! citation aggregation. Search failure degrades to an empty context; only
//! a fan-out with zero surviving answers fails the pipeline.

use crate::config::EngineConfig;
use crate::ports::model_client::{CallOptions, ModelClient};
use crate::ports::progress::{ResearchProgress, ResearchStage};
use crate::ports::search_provider::SearchProvider;
use crate::use_cases::judge_synthesis::{JudgeInputs, JudgeSynthesizer};
use crate::use_cases::run_debate::DebateEngine;
use council_domain::{
    aggregate_citations, DebateRound, Message, ModelAnswer, PromptTemplate, ResearchContext,
    ResearchOptions, SuccessfulAnswer,
};
use std::sync::Arc;
use std::time::Instant;
use thiserror::Error;
use tokio::task::JoinSet;
use tracing::{debug, info, warn};

/// Researched answers run colder than general queries.
const RESEARCH_TEMPERATURE: f32 = 0.3;

/// Errors that fail a research run.
#[derive(Error, Debug, Clone)]
pub enum ResearchError {
    #[error("No model produced a researched answer")]
    NoSuccessfulAnswers,
}

/// Product of one research run.
#[derive(Debug, Clone)]
pub struct ResearchOutcome {
    pub final_answer: String,
    pub citations: Vec<String>,
    pub context: ResearchContext,
    pub rounds: Vec<DebateRound>,
    pub model_answers: Vec<ModelAnswer>,
}

/// Use case for one deep-research invocation.
pub struct ResearchPipeline {
    client: Arc<dyn ModelClient>,
    search: Arc<dyn SearchProvider>,
    judge: JudgeSynthesizer,
    debate: DebateEngine,
    config: Arc<EngineConfig>,
}

impl ResearchPipeline {
    pub fn new(
        client: Arc<dyn ModelClient>,
        search: Arc<dyn SearchProvider>,
        config: Arc<EngineConfig>,
    ) -> Self {
        Self {
            judge: JudgeSynthesizer::new(Arc::clone(&client), Arc::clone(&config)),
            debate: DebateEngine::new(Arc::clone(&client), Arc::clone(&config)),
            client,
            search,
            config,
        }
    }

    pub async fn run(
        &self,
        query: &str,
        options: &ResearchOptions,
        progress: &dyn ResearchProgress,
    ) -> Result<ResearchOutcome, ResearchError> {
        // Stage 1: web search. Failure degrades to an empty context.
        let max_results = options.max_results.unwrap_or(self.config.search_max_results);
        let context = match self.search.search(query, max_results).await {
            Ok(results) if !results.is_empty() => ResearchContext::new(query, results),
            Ok(_) => {
                info!("web search returned no results");
                ResearchContext::empty(query, "web search returned no results")
            }
            Err(e) => {
                warn!("web search unavailable: {}", e);
                ResearchContext::empty(query, format!("web search unavailable: {}", e))
            }
        };
        debug!(sources = context.results.len(), "research context built");
        progress.on_stage(ResearchStage::Searched);

        // Stage 2: researched answers, no retries, failures filtered.
        let initial_answers = self.researched_answers(query, &context, options).await;
        progress.on_stage(ResearchStage::Answered);
        if initial_answers.is_empty() {
            return Err(ResearchError::NoSuccessfulAnswers);
        }

        // Stage 3: debate over the survivors.
        let judge_model = options
            .judge_model
            .clone()
            .unwrap_or_else(|| self.config.judge_model.clone());
        let successes: Vec<SuccessfulAnswer> = initial_answers
            .iter()
            .map(ModelAnswer::as_successful)
            .collect();
        let debate_outcome = self.debate.run(query, successes, &judge_model).await;
        progress.on_stage(ResearchStage::Debated);

        // Stage 4: judge in research mode; failure falls back to the first
        // debated answer.
        let research_summary = context.has_sources().then(|| context.summary.as_str());
        let final_answer = match self
            .judge
            .judge_and_merge(JudgeInputs {
                prompt: query,
                answers: &debate_outcome.final_answers,
                rounds: &debate_outcome.rounds,
                judge_override: options.judge_model.as_ref(),
                research_summary,
                research_mode: true,
            })
            .await
        {
            Ok(answer) => answer,
            Err(e) => {
                warn!("research judge failed, falling back to first answer: {}", e);
                debate_outcome.final_answers[0].answer.clone()
            }
        };
        progress.on_stage(ResearchStage::Judged);

        // Stage 5: citation aggregation over the final and per-model answers.
        let model_answers: Vec<ModelAnswer> = match debate_outcome.rounds.last() {
            Some(last_round) => last_round.answers.clone(),
            None => initial_answers,
        };
        let citations = aggregate_citations(
            &final_answer,
            model_answers.iter().map(|a| a.answer.as_str()),
            &context.results,
        );

        Ok(ResearchOutcome {
            final_answer,
            citations,
            context,
            rounds: debate_outcome.rounds,
            model_answers,
        })
    }

    /// Fan out the research prompt to the query models. Failures yield no
    /// entry; the caller filters on emptiness.
    async fn researched_answers(
        &self,
        query: &str,
        context: &ResearchContext,
        options: &ResearchOptions,
    ) -> Vec<ModelAnswer> {
        let models = if options.models.is_empty() {
            self.config.models.clone()
        } else {
            options.models.clone()
        };

        let system = PromptTemplate::research_system(context.has_sources());
        let source_block = context.has_sources().then(|| context.source_block());
        let user = PromptTemplate::research_prompt(query, source_block.as_deref());

        let mut join_set = JoinSet::new();
        for model in models {
            let client = Arc::clone(&self.client);
            let messages = vec![Message::system(system), Message::user(user.clone())];
            let options = CallOptions::with_timeout(self.config.research_timeout)
                .temperature(RESEARCH_TEMPERATURE)
                .max_tokens(self.config.research_max_tokens);
            join_set.spawn(async move {
                let result = client.call_model(&model, &messages, &options).await;
                (model, result)
            });
        }

        let mut answers = Vec::new();
        while let Some(joined) = join_set.join_next().await {
            match joined {
                Ok((model, Ok(reply))) => {
                    answers.push(ModelAnswer {
                        model_id: model,
                        answer: reply.answer,
                        latency_ms: reply.latency_ms,
                    });
                }
                Ok((model, Err(e))) => {
                    warn!(model = %model, "researched answer failed: {}", e);
                }
                Err(e) => {
                    warn!("research fan-out task join error: {}", e);
                }
            }
        }
        answers
    }
}
