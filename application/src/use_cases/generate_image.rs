//! Image fan-out use case
//!
//! Calls the requested models in parallel; the first successful image wins
//! and the remaining in-flight calls are aborted.

use crate::config::EngineConfig;
use crate::ports::model_client::{CallOptions, ImageOutput, ModelClient};
use crate::use_cases::merge_answers::MergeError;
use council_domain::{DomainError, ModelCallResult, ModelId};
use std::sync::Arc;
use std::time::Instant;
use tokio::task::JoinSet;
use tracing::{info, warn};

/// A generated image and its provenance.
#[derive(Debug, Clone)]
pub struct GeneratedImage {
    pub model_id: ModelId,
    pub image: ImageOutput,
    pub latency_ms: u64,
}

/// Use case for synchronous image generation across several models.
pub struct ImageFanout {
    client: Arc<dyn ModelClient>,
    config: Arc<EngineConfig>,
}

impl ImageFanout {
    pub fn new(client: Arc<dyn ModelClient>, config: Arc<EngineConfig>) -> Self {
        Self { client, config }
    }

    pub async fn generate(
        &self,
        prompt: &str,
        models: &[ModelId],
    ) -> Result<GeneratedImage, MergeError> {
        if prompt.trim().is_empty() {
            return Err(DomainError::EmptyPrompt.into());
        }
        if models.is_empty() {
            return Err(DomainError::EmptyModelList.into());
        }

        let mut join_set = JoinSet::new();
        for model in models {
            let client = Arc::clone(&self.client);
            let model = model.clone();
            let prompt = prompt.to_string();
            let options = CallOptions::with_timeout(self.config.per_model_timeout);
            join_set.spawn(async move {
                let start = Instant::now();
                let result = client.generate_image(&model, &prompt, &options).await;
                (model, result, start.elapsed().as_millis() as u64)
            });
        }

        let mut failures = Vec::new();
        while let Some(joined) = join_set.join_next().await {
            match joined {
                Ok((model, Ok(image), latency_ms)) => {
                    info!(model = %model, latency_ms, "image generated");
                    join_set.abort_all();
                    return Ok(GeneratedImage {
                        model_id: model,
                        image,
                        latency_ms,
                    });
                }
                Ok((model, Err(e), latency_ms)) => {
                    warn!(model = %model, "image generation failed: {}", e);
                    failures.push(ModelCallResult::failed(model, e.to_string(), latency_ms));
                }
                Err(e) => {
                    warn!("image task join error: {}", e);
                }
            }
        }

        Err(MergeError::AllModelsFailed { results: failures })
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::ports::model_client::ModelCallError;
    use crate::testing::MockModelClient;
    use std::time::Duration;

    #[tokio::test(start_paused = true)]
    async fn first_successful_image_wins() {
        let client = Arc::new(MockModelClient::new());
        client.script_image(
            "a/slow",
            Ok(ImageOutput::Url("https://img.example/slow.png".into())),
            Duration::from_secs(5),
        );
        client.script_image(
            "b/fast",
            Ok(ImageOutput::Url("https://img.example/fast.png".into())),
            Duration::from_millis(10),
        );

        let fanout = ImageFanout::new(client, Arc::new(EngineConfig::default()));
        let image = fanout
            .generate("a cat", &[ModelId::new("a/slow"), ModelId::new("b/fast")])
            .await
            .unwrap();

        assert_eq!(image.model_id.as_str(), "b/fast");
        assert_eq!(
            image.image,
            ImageOutput::Url("https://img.example/fast.png".into())
        );
    }

    #[tokio::test]
    async fn all_failures_carry_per_model_results() {
        let client = Arc::new(MockModelClient::new());
        for model in ["a/one", "b/two"] {
            client.script_image(
                model,
                Err(ModelCallError::UnsupportedImageFormat),
                Duration::ZERO,
            );
        }

        let fanout = ImageFanout::new(client, Arc::new(EngineConfig::default()));
        let err = fanout
            .generate("a cat", &[ModelId::new("a/one"), ModelId::new("b/two")])
            .await
            .unwrap_err();

        match err {
            MergeError::AllModelsFailed { results } => {
                assert_eq!(results.len(), 2);
                assert!(results.iter().all(|r| !r.success));
            }
            other => panic!("expected AllModelsFailed, got {:?}", other),
        }
    }

    #[tokio::test]
    async fn empty_inputs_are_rejected() {
        let client = Arc::new(MockModelClient::new());
        let fanout = ImageFanout::new(client, Arc::new(EngineConfig::default()));

        assert!(matches!(
            fanout.generate("", &[ModelId::new("m")]).await.unwrap_err(),
            MergeError::Input(DomainError::EmptyPrompt)
        ));
        assert!(matches!(
            fanout.generate("a cat", &[]).await.unwrap_err(),
            MergeError::Input(DomainError::EmptyModelList)
        ));
    }
}
