//! Shared test doubles for the ports.
//!
//! `MockModelClient` records every call and replays scripted outcomes per
//! model (consumed in order, falling back to a canned success), with optional
//! delays that cooperate with `tokio::test(start_paused = true)`.

use crate::ports::model_client::{
    CallOptions, ImageOutput, ModelCallError, ModelClient, ModelReply,
};
use crate::ports::search_provider::{SearchError, SearchProvider};
use async_trait::async_trait;
use council_domain::{Message, ModelId, ResearchResult, Role};
use std::collections::{HashMap, VecDeque};
use std::sync::Mutex;
use std::time::Duration;

/// One recorded `call_model` invocation.
#[derive(Debug, Clone)]
pub struct RecordedCall {
    pub model: ModelId,
    pub system: String,
    pub user: String,
    pub temperature: Option<f32>,
    pub max_tokens: Option<u32>,
}

/// A scripted outcome for one call.
#[derive(Debug, Clone)]
pub struct Scripted {
    outcome: Result<String, ModelCallError>,
    delay: Duration,
}

impl Scripted {
    pub fn ok(answer: impl Into<String>, delay: Duration) -> Self {
        Self {
            outcome: Ok(answer.into()),
            delay,
        }
    }

    pub fn err(error: ModelCallError, delay: Duration) -> Self {
        Self {
            outcome: Err(error),
            delay,
        }
    }
}

type ImageScript = (Result<ImageOutput, ModelCallError>, Duration);

#[derive(Default)]
pub struct MockModelClient {
    script: Mutex<HashMap<String, VecDeque<Scripted>>>,
    image_script: Mutex<HashMap<String, VecDeque<ImageScript>>>,
    calls: Mutex<Vec<RecordedCall>>,
}

impl MockModelClient {
    pub fn new() -> Self {
        Self::default()
    }

    /// Queue an outcome for `model`; outcomes are consumed in order. With an
    /// empty queue the mock answers `"mock answer"` immediately.
    pub fn script(&self, model: &str, scripted: Scripted) {
        self.script
            .lock()
            .unwrap()
            .entry(model.to_string())
            .or_default()
            .push_back(scripted);
    }

    pub fn script_image(
        &self,
        model: &str,
        outcome: Result<ImageOutput, ModelCallError>,
        delay: Duration,
    ) {
        self.image_script
            .lock()
            .unwrap()
            .entry(model.to_string())
            .or_default()
            .push_back((outcome, delay));
    }

    pub fn calls(&self) -> Vec<RecordedCall> {
        self.calls.lock().unwrap().clone()
    }
}

#[async_trait]
impl ModelClient for MockModelClient {
    async fn call_model(
        &self,
        model: &ModelId,
        messages: &[Message],
        options: &CallOptions,
    ) -> Result<ModelReply, ModelCallError> {
        let system = messages
            .iter()
            .filter(|m| m.role == Role::System)
            .map(|m| m.content.clone())
            .collect::<Vec<_>>()
            .join("\n");
        let user = messages
            .iter()
            .filter(|m| m.role == Role::User)
            .map(|m| m.content.clone())
            .collect::<Vec<_>>()
            .join("\n");
        self.calls.lock().unwrap().push(RecordedCall {
            model: model.clone(),
            system,
            user,
            temperature: options.temperature,
            max_tokens: options.max_tokens,
        });

        let scripted = self
            .script
            .lock()
            .unwrap()
            .get_mut(model.as_str())
            .and_then(VecDeque::pop_front)
            .unwrap_or_else(|| Scripted::ok("mock answer", Duration::ZERO));

        if !scripted.delay.is_zero() {
            tokio::time::sleep(scripted.delay).await;
        }
        scripted.outcome.map(|answer| ModelReply {
            latency_ms: scripted.delay.as_millis() as u64,
            answer,
        })
    }

    async fn generate_image(
        &self,
        model: &ModelId,
        _prompt: &str,
        _options: &CallOptions,
    ) -> Result<ImageOutput, ModelCallError> {
        let scripted = self
            .image_script
            .lock()
            .unwrap()
            .get_mut(model.as_str())
            .and_then(VecDeque::pop_front)
            .unwrap_or((Err(ModelCallError::UnsupportedImageFormat), Duration::ZERO));
        if !scripted.1.is_zero() {
            tokio::time::sleep(scripted.1).await;
        }
        scripted.0
    }
}

/// Search provider double: fixed results or a fixed error.
pub struct MockSearchProvider {
    outcome: Result<Vec<ResearchResult>, SearchError>,
}

impl MockSearchProvider {
    pub fn with_results(results: Vec<ResearchResult>) -> Self {
        Self {
            outcome: Ok(results),
        }
    }

    pub fn failing(error: SearchError) -> Self {
        Self {
            outcome: Err(error),
        }
    }
}

#[async_trait]
impl SearchProvider for MockSearchProvider {
    async fn search(
        &self,
        _query: &str,
        max_results: usize,
    ) -> Result<Vec<ResearchResult>, SearchError> {
        self.outcome
            .clone()
            .map(|results| results.into_iter().take(max_results).collect())
    }
}

/// `n` research results with urls `https://s{i}.example.com`.
pub fn results_fixture(n: usize) -> Vec<ResearchResult> {
    (1..=n)
        .map(|i| ResearchResult {
            title: format!("Result {}", i),
            url: format!("https://s{}.example.com", i),
            snippet: format!("Snippet {}", i),
            source_domain: format!("s{}.example.com", i),
            relevance_score: Some(1.0 - i as f64 / 10.0),
        })
        .collect()
}
