//! Remote model client port
//!
//! Defines the interface for one-shot request/response calls against an
//! upstream language model.

use async_trait::async_trait;
use council_domain::{Message, ModelId};
use std::time::Duration;
use thiserror::Error;

/// Errors that can occur during a remote model call
#[derive(Error, Debug, Clone)]
pub enum ModelCallError {
    #[error("Request timed out")]
    Timeout,

    #[error("Upstream returned status {status}: {body}")]
    Remote { status: u16, body: String },

    #[error("Network error: {0}")]
    Network(String),

    #[error("Model returned an empty response")]
    EmptyResponse,

    #[error("Unrecognized image response format")]
    UnsupportedImageFormat,
}

impl ModelCallError {
    /// A timeout is a hard signal that the upstream is slow; retrying it
    /// would waste the remaining budget.
    pub fn is_retryable(&self) -> bool {
        !matches!(self, ModelCallError::Timeout)
    }
}

/// Per-call parameters.
#[derive(Debug, Clone)]
pub struct CallOptions {
    pub timeout: Duration,
    pub temperature: Option<f32>,
    pub max_tokens: Option<u32>,
}

impl CallOptions {
    pub fn with_timeout(timeout: Duration) -> Self {
        Self {
            timeout,
            temperature: None,
            max_tokens: None,
        }
    }

    pub fn temperature(mut self, temperature: f32) -> Self {
        self.temperature = Some(temperature);
        self
    }

    pub fn max_tokens(mut self, max_tokens: u32) -> Self {
        self.max_tokens = Some(max_tokens);
        self
    }
}

/// A successful model reply.
#[derive(Debug, Clone)]
pub struct ModelReply {
    pub answer: String,
    pub latency_ms: u64,
}

/// An image produced by an image-capable model.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum ImageOutput {
    Url(String),
    /// A `data:image/...;base64,...` URI.
    Base64(String),
}

/// Client for upstream model calls.
///
/// One implementation is shared by all callers; it owns the keep-alive
/// connection pool.
#[async_trait]
pub trait ModelClient: Send + Sync {
    /// One-shot chat completion.
    async fn call_model(
        &self,
        model: &ModelId,
        messages: &[Message],
        options: &CallOptions,
    ) -> Result<ModelReply, ModelCallError>;

    /// One-shot image generation.
    async fn generate_image(
        &self,
        model: &ModelId,
        prompt: &str,
        options: &CallOptions,
    ) -> Result<ImageOutput, ModelCallError>;

    /// Retry wrapper around [`call_model`](Self::call_model).
    ///
    /// Timeouts are final. Other failures are retried up to `max_retries`
    /// times with a linear backoff of `1s × (attempt + 1)` before each
    /// retry; each attempt gets the full timeout.
    async fn call_model_with_retry(
        &self,
        model: &ModelId,
        messages: &[Message],
        options: &CallOptions,
        max_retries: u32,
    ) -> Result<ModelReply, ModelCallError> {
        let mut attempt: u32 = 0;
        loop {
            match self.call_model(model, messages, options).await {
                Ok(reply) => return Ok(reply),
                Err(e) if e.is_retryable() && attempt < max_retries => {
                    attempt += 1;
                    tracing::debug!(
                        model = %model,
                        attempt,
                        "model call failed, retrying: {}",
                        e
                    );
                    tokio::time::sleep(Duration::from_secs(u64::from(attempt))).await;
                }
                Err(e) => return Err(e),
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn timeout_is_not_retryable() {
        assert!(!ModelCallError::Timeout.is_retryable());
        assert!(ModelCallError::EmptyResponse.is_retryable());
        assert!(ModelCallError::Network("reset".into()).is_retryable());
        assert!(ModelCallError::Remote {
            status: 500,
            body: String::new()
        }
        .is_retryable());
    }

    #[test]
    fn call_options_builders() {
        let options = CallOptions::with_timeout(Duration::from_secs(5))
            .temperature(0.3)
            .max_tokens(100);
        assert_eq!(options.temperature, Some(0.3));
        assert_eq!(options.max_tokens, Some(100));
    }
}
