//! Application layer for council
//!
//! Defines the ports (traits) the engine depends on and the use cases that
//! orchestrate them: merge fan-out with early commit, debate, judge
//! synthesis, the research pipeline, and the job store/worker subsystem.
//! Adapters live in the infrastructure layer.

pub mod config;
pub mod jobs;
pub mod ports;
pub mod use_cases;

#[cfg(test)]
pub(crate) mod testing;

// Re-export the public surface
pub use config::EngineConfig;
pub use jobs::store::JobStore;
pub use jobs::worker::{ResearchWorker, TOTAL_ITERATIONS};
pub use ports::model_client::{
    CallOptions, ImageOutput, ModelCallError, ModelClient, ModelReply,
};
pub use ports::progress::{NoProgress, ResearchProgress, ResearchStage};
pub use ports::search_provider::{SearchError, SearchProvider};
pub use use_cases::deep_research::{ResearchError, ResearchOutcome, ResearchPipeline};
pub use use_cases::generate_image::{GeneratedImage, ImageFanout};
pub use use_cases::judge_synthesis::{JudgeInputs, JudgeSynthesizer};
pub use use_cases::merge_answers::{MergeError, MergeOrchestrator, MergeRequest};
pub use use_cases::run_debate::DebateEngine;
