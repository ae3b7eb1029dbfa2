//! Configuration file schema (`council.toml`).
//!
//! Example configuration:
//!
//! ```toml
//! [models]
//! query = ["openai/gpt-4o", "anthropic/claude-3.5-sonnet"]
//! judge = "anthropic/claude-3.5-sonnet"
//!
//! [timeouts]
//! per_model_ms = 30000
//! judge_ms = 60000
//!
//! [merge]
//! min_models_for_judge = 2
//! enable_early_judge = true
//!
//! [debate]
//! enable = true
//! max_rounds = 2
//! ```

use council_application::EngineConfig;
use council_domain::ModelId;
use serde::{Deserialize, Serialize};
use std::time::Duration;

/// Root configuration document.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct FileConfig {
    pub models: ModelsSection,
    pub timeouts: TimeoutsSection,
    pub merge: MergeSection,
    pub debate: DebateSection,
    pub research: ResearchSection,
    pub limits: LimitsSection,
}

/// `[models]` — default model roster.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct ModelsSection {
    /// Default query models; callers may supply their own.
    pub query: Vec<String>,
    /// Default judge model.
    pub judge: String,
}

impl Default for ModelsSection {
    fn default() -> Self {
        Self {
            query: vec![
                "openai/gpt-4o".to_string(),
                "anthropic/claude-3.5-sonnet".to_string(),
                "google/gemini-pro-1.5".to_string(),
            ],
            judge: "anthropic/claude-3.5-sonnet".to_string(),
        }
    }
}

/// `[timeouts]` — per-call budgets in milliseconds.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct TimeoutsSection {
    pub per_model_ms: u64,
    pub judge_ms: u64,
    pub debate_ms: u64,
    pub judge_feedback_ms: u64,
    pub research_ms: u64,
}

impl Default for TimeoutsSection {
    fn default() -> Self {
        Self {
            per_model_ms: 30_000,
            judge_ms: 60_000,
            debate_ms: 30_000,
            judge_feedback_ms: 15_000,
            research_ms: 45_000,
        }
    }
}

/// `[merge]` — fan-out and early-commit behavior.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct MergeSection {
    pub max_prompt_length: usize,
    pub min_models_for_judge: usize,
    pub max_answer_length_for_judge: usize,
    pub enable_early_judge: bool,
    pub max_retries: u32,
}

impl Default for MergeSection {
    fn default() -> Self {
        Self {
            max_prompt_length: 8_000,
            min_models_for_judge: 2,
            max_answer_length_for_judge: 4_000,
            enable_early_judge: true,
            max_retries: 2,
        }
    }
}

/// `[debate]` — refinement rounds.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct DebateSection {
    pub enable: bool,
    pub max_rounds: usize,
}

impl Default for DebateSection {
    fn default() -> Self {
        Self {
            enable: true,
            max_rounds: 2,
        }
    }
}

/// `[research]` — deep-research pipeline.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct ResearchSection {
    pub max_results: usize,
    pub max_tokens: u32,
}

impl Default for ResearchSection {
    fn default() -> Self {
        Self {
            max_results: 8,
            max_tokens: 3_000,
        }
    }
}

/// `[limits]` — token allowances.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct LimitsSection {
    pub query_max_tokens: u32,
    pub judge_max_tokens: u32,
}

impl Default for LimitsSection {
    fn default() -> Self {
        Self {
            query_max_tokens: 2_000,
            judge_max_tokens: 4_000,
        }
    }
}

impl FileConfig {
    /// Convert the file schema into the engine configuration.
    pub fn to_engine_config(&self) -> EngineConfig {
        EngineConfig {
            models: self.models.query.iter().map(ModelId::new).collect(),
            judge_model: ModelId::from(self.models.judge.as_str()),
            per_model_timeout: Duration::from_millis(self.timeouts.per_model_ms),
            judge_timeout: Duration::from_millis(self.timeouts.judge_ms),
            debate_timeout: Duration::from_millis(self.timeouts.debate_ms),
            judge_feedback_timeout: Duration::from_millis(self.timeouts.judge_feedback_ms),
            research_timeout: Duration::from_millis(self.timeouts.research_ms),
            max_prompt_length: self.merge.max_prompt_length,
            min_models_for_judge: self.merge.min_models_for_judge,
            max_answer_length_for_judge: self.merge.max_answer_length_for_judge,
            max_retries: self.merge.max_retries,
            enable_early_judge: self.merge.enable_early_judge,
            enable_debate: self.debate.enable,
            max_debate_rounds: self.debate.max_rounds,
            search_max_results: self.research.max_results,
            query_max_tokens: self.limits.query_max_tokens,
            judge_max_tokens: self.limits.judge_max_tokens,
            research_max_tokens: self.research.max_tokens,
        }
    }

    /// Sanity-check the configuration; returns human-readable warnings.
    pub fn validate(&self) -> Vec<String> {
        let mut warnings = Vec::new();
        if self.models.query.is_empty() {
            warnings.push("[models] query list is empty; every request must supply models".into());
        }
        if self.models.judge.trim().is_empty() {
            warnings.push("[models] judge is empty".into());
        }
        if self.merge.min_models_for_judge == 0 {
            warnings.push("[merge] min_models_for_judge of 0 disables early commit".into());
        }
        if self.merge.min_models_for_judge > self.models.query.len()
            && !self.models.query.is_empty()
        {
            warnings.push(format!(
                "[merge] min_models_for_judge ({}) exceeds the default model count ({})",
                self.merge.min_models_for_judge,
                self.models.query.len()
            ));
        }
        if self.debate.enable && self.debate.max_rounds == 0 {
            warnings.push("[debate] enabled with max_rounds = 0; debate will never run".into());
        }
        warnings
    }
}
