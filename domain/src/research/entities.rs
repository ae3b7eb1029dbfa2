//! Research context entities.

use serde::{Deserialize, Serialize};

/// One web-search hit. Results with an empty url are dropped at the adapter.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ResearchResult {
    pub title: String,
    pub url: String,
    pub snippet: String,
    pub source_domain: String,
    pub relevance_score: Option<f64>,
}

/// Everything the research pipeline gathered for a single invocation.
///
/// Created once by the search stage and read-only thereafter.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ResearchContext {
    pub query: String,
    pub results: Vec<ResearchResult>,
    pub summary: String,
    pub citations: Vec<String>,
}

impl ResearchContext {
    pub fn new(query: impl Into<String>, results: Vec<ResearchResult>) -> Self {
        let summary = format!("{} external sources retrieved", results.len());
        let citations = results.iter().map(|r| r.url.clone()).collect();
        Self {
            query: query.into(),
            results,
            summary,
            citations,
        }
    }

    /// Context for a failed or unconfigured search. Downstream continues with
    /// the no-external-sources prompt.
    pub fn empty(query: impl Into<String>, diagnostic: impl Into<String>) -> Self {
        Self {
            query: query.into(),
            results: Vec::new(),
            summary: diagnostic.into(),
            citations: Vec::new(),
        }
    }

    pub fn has_sources(&self) -> bool {
        !self.results.is_empty()
    }

    /// Format the results as the structured `[Source i]` block that query
    /// models are asked to cite from.
    pub fn source_block(&self) -> String {
        let mut block = String::new();
        for (i, result) in self.results.iter().enumerate() {
            block.push_str(&format!(
                "[Source {}] {}\nURL: {}\n{}\n\n",
                i + 1,
                result.title,
                result.url,
                result.snippet
            ));
        }
        block.trim_end().to_string()
    }
}
