//! Web search provider port

use async_trait::async_trait;
use council_domain::ResearchResult;
use thiserror::Error;

/// Errors that can occur during a web search
#[derive(Error, Debug, Clone)]
pub enum SearchError {
    /// No API key configured; the pipeline degrades to the no-sources branch.
    #[error("Search provider is not configured")]
    Unconfigured,

    #[error("Search request failed: {0}")]
    Request(String),

    #[error("Malformed search response: {0}")]
    BadResponse(String),
}

/// Provider of web-search results for the research pipeline.
#[async_trait]
pub trait SearchProvider: Send + Sync {
    /// Search for up to `max_results` results. Results with empty urls must
    /// not be returned.
    async fn search(
        &self,
        query: &str,
        max_results: usize,
    ) -> Result<Vec<ResearchResult>, SearchError>;
}
