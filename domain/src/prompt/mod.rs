//! Prompt construction for every pipeline stage.

pub mod template;

pub use template::PromptTemplate;
