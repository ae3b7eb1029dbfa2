//! Tavily web-search adapter.
//!
//! A missing API key is not an error at construction time: `search` reports
//! `Unconfigured` and the research pipeline degrades to its no-sources
//! branch.

use async_trait::async_trait;
use council_application::{SearchError, SearchProvider};
use council_domain::ResearchResult;
use serde::{Deserialize, Serialize};
use std::time::Duration;
use tracing::debug;

const DEFAULT_ENDPOINT: &str = "https://api.tavily.com/search";
const REQUEST_TIMEOUT: Duration = Duration::from_secs(30);
const SEARCH_DEPTH: &str = "advanced";

/// `SearchProvider` adapter for the Tavily search API.
pub struct TavilySearchClient {
    http: reqwest::Client,
    api_key: Option<String>,
    endpoint: String,
}

impl TavilySearchClient {
    pub fn new(api_key: Option<String>) -> Result<Self, reqwest::Error> {
        let http = reqwest::Client::builder()
            .timeout(REQUEST_TIMEOUT)
            .build()?;
        Ok(Self {
            http,
            api_key: api_key.filter(|key| !key.trim().is_empty()),
            endpoint: DEFAULT_ENDPOINT.to_string(),
        })
    }
}

#[derive(Serialize)]
struct TavilyRequest<'a> {
    api_key: &'a str,
    query: &'a str,
    search_depth: &'a str,
    max_results: usize,
    include_answer: bool,
}

#[derive(Debug, Deserialize)]
struct TavilyResponse {
    #[serde(default)]
    results: Vec<TavilyResult>,
}

#[derive(Debug, Deserialize)]
struct TavilyResult {
    #[serde(default)]
    title: String,
    #[serde(default)]
    url: String,
    /// The snippet field name varies between API versions.
    content: Option<String>,
    snippet: Option<String>,
    raw_content: Option<String>,
    score: Option<f64>,
}

impl TavilyResult {
    fn into_research_result(self) -> Option<ResearchResult> {
        if self.url.trim().is_empty() {
            return None;
        }
        let snippet = self
            .content
            .or(self.snippet)
            .or(self.raw_content)
            .unwrap_or_default();
        let source_domain = domain_of(&self.url);
        Some(ResearchResult {
            title: self.title,
            source_domain,
            snippet,
            relevance_score: self.score,
            url: self.url,
        })
    }
}

fn domain_of(url: &str) -> String {
    reqwest::Url::parse(url)
        .ok()
        .and_then(|u| u.host_str().map(str::to_string))
        .unwrap_or_default()
}

#[async_trait]
impl SearchProvider for TavilySearchClient {
    async fn search(
        &self,
        query: &str,
        max_results: usize,
    ) -> Result<Vec<ResearchResult>, SearchError> {
        let Some(api_key) = self.api_key.as_deref() else {
            return Err(SearchError::Unconfigured);
        };

        let request = TavilyRequest {
            api_key,
            query,
            search_depth: SEARCH_DEPTH,
            max_results,
            include_answer: false,
        };
        let response = self
            .http
            .post(&self.endpoint)
            .json(&request)
            .send()
            .await
            .map_err(|e| SearchError::Request(e.to_string()))?;

        let status = response.status();
        if !status.is_success() {
            return Err(SearchError::Request(format!(
                "search API returned {}",
                status
            )));
        }

        let parsed: TavilyResponse = response
            .json()
            .await
            .map_err(|e| SearchError::BadResponse(e.to_string()))?;

        let results: Vec<ResearchResult> = parsed
            .results
            .into_iter()
            .filter_map(TavilyResult::into_research_result)
            .take(max_results)
            .collect();
        debug!(count = results.len(), "search results");
        Ok(results)
    }
}
