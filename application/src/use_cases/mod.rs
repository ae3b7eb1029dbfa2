//! Use cases — the orchestration flows of the engine.

pub mod deep_research;
pub mod generate_image;
pub mod judge_synthesis;
pub mod merge_answers;
pub mod run_debate;
