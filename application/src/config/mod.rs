//! Engine configuration — static parameters controlling the pipelines.
//!
//! These are application-layer concerns, not domain policy. The
//! infrastructure layer builds an [`EngineConfig`] from the configuration
//! file and environment.

use council_domain::ModelId;
use std::time::Duration;

/// Static parameters for the merge, debate, and research pipelines.
#[derive(Debug, Clone)]
pub struct EngineConfig {
    /// Default query models, used when a caller supplies none.
    pub models: Vec<ModelId>,
    /// Default judge model.
    pub judge_model: ModelId,

    /// Budget for each query-phase model call.
    pub per_model_timeout: Duration,
    /// Budget for the judge synthesis call.
    pub judge_timeout: Duration,
    /// Budget for each debate refinement call.
    pub debate_timeout: Duration,
    /// Budget for the per-round judge feedback call.
    pub judge_feedback_timeout: Duration,
    /// Budget for each researched-answer call.
    pub research_timeout: Duration,

    /// Input cap in characters.
    pub max_prompt_length: usize,
    /// Early-commit threshold: launch the judge at this many successes.
    pub min_models_for_judge: usize,
    /// Truncation cap applied to each answer before it reaches the judge.
    pub max_answer_length_for_judge: usize,
    /// Retries for query-phase calls (timeouts are never retried).
    pub max_retries: u32,

    pub enable_early_judge: bool,
    pub enable_debate: bool,
    /// Debate rounds R; 0 disables the debate engine entirely.
    pub max_debate_rounds: usize,

    /// Cap on web-search results per research run.
    pub search_max_results: usize,

    pub query_max_tokens: u32,
    pub judge_max_tokens: u32,
    pub research_max_tokens: u32,
}

impl Default for EngineConfig {
    fn default() -> Self {
        Self {
            models: vec![
                ModelId::new("openai/gpt-4o"),
                ModelId::new("anthropic/claude-3.5-sonnet"),
                ModelId::new("google/gemini-pro-1.5"),
            ],
            judge_model: ModelId::new("anthropic/claude-3.5-sonnet"),
            per_model_timeout: Duration::from_millis(30_000),
            judge_timeout: Duration::from_millis(60_000),
            debate_timeout: Duration::from_millis(30_000),
            judge_feedback_timeout: Duration::from_millis(15_000),
            research_timeout: Duration::from_millis(45_000),
            max_prompt_length: 8_000,
            min_models_for_judge: 2,
            max_answer_length_for_judge: 4_000,
            max_retries: 2,
            enable_early_judge: true,
            enable_debate: true,
            max_debate_rounds: 2,
            search_max_results: 8,
            query_max_tokens: 2_000,
            judge_max_tokens: 4_000,
            research_max_tokens: 3_000,
        }
    }
}

impl EngineConfig {
    // ==================== Builder Methods ====================

    pub fn with_models(mut self, models: Vec<ModelId>) -> Self {
        self.models = models;
        self
    }

    pub fn with_judge_model(mut self, judge: ModelId) -> Self {
        self.judge_model = judge;
        self
    }

    pub fn with_debate(mut self, enable: bool, max_rounds: usize) -> Self {
        self.enable_debate = enable;
        self.max_debate_rounds = max_rounds;
        self
    }

    pub fn with_early_judge(mut self, enable: bool) -> Self {
        self.enable_early_judge = enable;
        self
    }

    pub fn with_min_models_for_judge(mut self, min: usize) -> Self {
        self.min_models_for_judge = min;
        self
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn defaults_are_coherent() {
        let config = EngineConfig::default();
        assert!(!config.models.is_empty());
        assert!(config.min_models_for_judge >= 1);
        assert!(config.enable_early_judge);
        assert_eq!(config.max_debate_rounds, 2);
    }

    #[test]
    fn builders_override_fields() {
        let config = EngineConfig::default()
            .with_debate(false, 0)
            .with_early_judge(false)
            .with_min_models_for_judge(3);
        assert!(!config.enable_debate);
        assert_eq!(config.max_debate_rounds, 0);
        assert!(!config.enable_early_judge);
        assert_eq!(config.min_models_for_judge, 3);
    }
}
