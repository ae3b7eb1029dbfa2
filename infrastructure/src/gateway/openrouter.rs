//! OpenRouter chat-completions adapter.
//!
//! One shared `reqwest::Client` carries the keep-alive pool and the fixed
//! identification headers; every caller goes through it.

use crate::gateway::image::extract_image;
use crate::gateway::protocol::{ChatCompletionRequest, ChatCompletionResponse, WireMessage};
use async_trait::async_trait;
use council_application::{CallOptions, ImageOutput, ModelCallError, ModelClient, ModelReply};
use council_domain::{truncate_str, Message, ModelId};
use std::time::{Duration, Instant};
use thiserror::Error;
use tracing::debug;

const DEFAULT_BASE_URL: &str = "https://openrouter.ai/api/v1";
/// Bounded idle sockets per upstream host.
const MAX_IDLE_PER_HOST: usize = 8;
const CONNECT_TIMEOUT: Duration = Duration::from_secs(10);
/// Cap on upstream error bodies carried in errors and logs.
const ERROR_BODY_CAP: usize = 2048;

const APP_REFERER: &str = "https://github.com/council-ai/council";
const APP_TITLE: &str = "council";

/// Errors building the gateway client at startup.
#[derive(Error, Debug)]
pub enum GatewayInitError {
    #[error("API credential is not a valid header value")]
    InvalidCredential,

    #[error("Failed to build HTTP client: {0}")]
    Http(#[from] reqwest::Error),
}

/// `ModelClient` adapter for the OpenRouter HTTP gateway.
#[derive(Debug)]
pub struct OpenRouterClient {
    http: reqwest::Client,
    base_url: String,
}

impl OpenRouterClient {
    /// Build the shared client. `base_url` overrides the public endpoint
    /// (useful for gateways with an OpenRouter-compatible surface).
    pub fn new(api_key: &str, base_url: Option<String>) -> Result<Self, GatewayInitError> {
        use reqwest::header::{HeaderMap, HeaderValue, AUTHORIZATION};

        let mut headers = HeaderMap::new();
        let mut auth = HeaderValue::from_str(&format!("Bearer {}", api_key))
            .map_err(|_| GatewayInitError::InvalidCredential)?;
        auth.set_sensitive(true);
        headers.insert(AUTHORIZATION, auth);
        headers.insert("HTTP-Referer", HeaderValue::from_static(APP_REFERER));
        headers.insert("X-Title", HeaderValue::from_static(APP_TITLE));

        let http = reqwest::Client::builder()
            .default_headers(headers)
            .pool_max_idle_per_host(MAX_IDLE_PER_HOST)
            .connect_timeout(CONNECT_TIMEOUT)
            .build()?;

        Ok(Self {
            http,
            base_url: base_url.unwrap_or_else(|| DEFAULT_BASE_URL.to_string()),
        })
    }

    fn completions_url(&self) -> String {
        format!("{}/chat/completions", self.base_url.trim_end_matches('/'))
    }

    async fn post_completion(
        &self,
        model: &ModelId,
        messages: Vec<WireMessage>,
        options: &CallOptions,
    ) -> Result<reqwest::Response, ModelCallError> {
        let request = ChatCompletionRequest {
            model: model.as_str(),
            messages,
            temperature: options.temperature,
            max_tokens: options.max_tokens,
        };
        let response = self
            .http
            .post(self.completions_url())
            .timeout(options.timeout)
            .json(&request)
            .send()
            .await
            .map_err(map_transport_error)?;

        let status = response.status();
        if !status.is_success() {
            let body = response.text().await.unwrap_or_default();
            return Err(ModelCallError::Remote {
                status: status.as_u16(),
                body: truncate_str(&body, ERROR_BODY_CAP).to_string(),
            });
        }
        Ok(response)
    }
}

fn map_transport_error(e: reqwest::Error) -> ModelCallError {
    if e.is_timeout() {
        ModelCallError::Timeout
    } else {
        ModelCallError::Network(e.to_string())
    }
}

#[async_trait]
impl ModelClient for OpenRouterClient {
    async fn call_model(
        &self,
        model: &ModelId,
        messages: &[Message],
        options: &CallOptions,
    ) -> Result<ModelReply, ModelCallError> {
        let start = Instant::now();
        let wire = messages.iter().map(WireMessage::from).collect();
        let response = self.post_completion(model, wire, options).await?;

        let parsed: ChatCompletionResponse =
            response.json().await.map_err(map_transport_error)?;
        let content = parsed.first_content().unwrap_or_default();
        if content.trim().is_empty() {
            return Err(ModelCallError::EmptyResponse);
        }

        let latency_ms = start.elapsed().as_millis() as u64;
        debug!(model = %model, latency_ms, "chat completion ok");
        Ok(ModelReply {
            answer: content,
            latency_ms,
        })
    }

    async fn generate_image(
        &self,
        model: &ModelId,
        prompt: &str,
        options: &CallOptions,
    ) -> Result<ImageOutput, ModelCallError> {
        let wire = vec![WireMessage {
            role: "user".to_string(),
            content: prompt.to_string(),
        }];
        let response = self.post_completion(model, wire, options).await?;

        let body: serde_json::Value = response.json().await.map_err(map_transport_error)?;
        extract_image(&body).ok_or(ModelCallError::UnsupportedImageFormat)
    }
}
