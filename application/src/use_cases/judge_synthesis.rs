//! Judge synthesis use case
//!
//! Builds the anonymized synthesis prompt and asks the judge model for one
//! merged answer. One call, no retry.

use crate::config::EngineConfig;
use crate::ports::model_client::{CallOptions, ModelCallError, ModelClient};
use council_domain::{anonymize, DebateRound, Message, ModelId, PromptTemplate, SuccessfulAnswer};
use std::sync::Arc;
use tracing::debug;

/// Judge calls run colder than query calls.
const JUDGE_TEMPERATURE: f32 = 0.3;

/// Inputs to one judge synthesis call.
pub struct JudgeInputs<'a> {
    /// The original user prompt.
    pub prompt: &'a str,
    /// Non-empty sequence of surviving answers.
    pub answers: &'a [SuccessfulAnswer],
    /// Debate rounds, if the answers were refined; prefixes the prompt with
    /// an evolution-context block.
    pub rounds: &'a [DebateRound],
    pub judge_override: Option<&'a ModelId>,
    /// Research-mode prompt augmentation; present only when sources exist.
    pub research_summary: Option<&'a str>,
    pub research_mode: bool,
}

/// Use case for merging candidate answers through the judge model.
#[derive(Clone)]
pub struct JudgeSynthesizer {
    client: Arc<dyn ModelClient>,
    config: Arc<EngineConfig>,
}

impl JudgeSynthesizer {
    pub fn new(client: Arc<dyn ModelClient>, config: Arc<EngineConfig>) -> Self {
        Self { client, config }
    }

    /// Synthesize one merged answer. Fails only with the underlying
    /// model-call error; callers decide the fallback.
    pub async fn judge_and_merge(&self, inputs: JudgeInputs<'_>) -> Result<String, ModelCallError> {
        let judge_model = inputs.judge_override.unwrap_or(&self.config.judge_model);

        // The judge sees positional labels only, never model ids.
        let anonymized = anonymize(
            inputs.answers,
            "Answer",
            self.config.max_answer_length_for_judge,
        );

        let system = if inputs.research_mode {
            PromptTemplate::judge_system_research()
        } else {
            PromptTemplate::judge_system()
        };
        let user = PromptTemplate::judge_prompt(
            inputs.prompt,
            &anonymized,
            inputs.rounds,
            inputs.research_summary,
        );

        debug!(
            judge = %judge_model,
            answers = anonymized.len(),
            rounds = inputs.rounds.len(),
            research = inputs.research_mode,
            "calling judge"
        );

        let options = CallOptions::with_timeout(self.config.judge_timeout)
            .temperature(JUDGE_TEMPERATURE)
            .max_tokens(self.config.judge_max_tokens);

        let messages = [Message::system(system), Message::user(user)];
        let reply = self
            .client
            .call_model(judge_model, &messages, &options)
            .await?;
        Ok(reply.answer)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::testing::MockModelClient;
    use council_domain::ModelId;

    fn answers() -> Vec<SuccessfulAnswer> {
        vec![
            SuccessfulAnswer {
                model_id: ModelId::new("openai/gpt-4o"),
                answer: "alpha answer".to_string(),
            },
            SuccessfulAnswer {
                model_id: ModelId::new("anthropic/claude"),
                answer: "beta answer".to_string(),
            },
        ]
    }

    fn inputs<'a>(answers: &'a [SuccessfulAnswer]) -> JudgeInputs<'a> {
        JudgeInputs {
            prompt: "What is Rust?",
            answers,
            rounds: &[],
            judge_override: None,
            research_summary: None,
            research_mode: false,
        }
    }

    #[tokio::test]
    async fn judge_never_sees_model_ids() {
        let client = Arc::new(MockModelClient::new());
        let judge = JudgeSynthesizer::new(client.clone(), Arc::new(EngineConfig::default()));

        let answers = answers();
        judge.judge_and_merge(inputs(&answers)).await.unwrap();

        let calls = client.calls();
        assert_eq!(calls.len(), 1);
        let call = &calls[0];
        assert!(call.user.contains("Answer A"));
        assert!(call.user.contains("Answer B"));
        assert!(!call.user.contains("gpt-4o"));
        assert!(!call.user.contains("claude"));
        assert!(!call.system.contains("gpt-4o"));
    }

    #[tokio::test]
    async fn judge_runs_cold_with_higher_token_allowance() {
        let client = Arc::new(MockModelClient::new());
        let config = Arc::new(EngineConfig::default());
        let judge = JudgeSynthesizer::new(client.clone(), config.clone());

        let answers = answers();
        judge.judge_and_merge(inputs(&answers)).await.unwrap();

        let call = &client.calls()[0];
        assert_eq!(call.temperature, Some(JUDGE_TEMPERATURE));
        assert_eq!(call.max_tokens, Some(config.judge_max_tokens));
        assert_eq!(call.model, config.judge_model);
    }

    #[tokio::test]
    async fn judge_override_is_honored() {
        let client = Arc::new(MockModelClient::new());
        let judge = JudgeSynthesizer::new(client.clone(), Arc::new(EngineConfig::default()));

        let answers = answers();
        let judge_model = ModelId::new("meta/llama-3");
        let mut inputs = inputs(&answers);
        inputs.judge_override = Some(&judge_model);
        judge.judge_and_merge(inputs).await.unwrap();

        assert_eq!(client.calls()[0].model, judge_model);
    }

    #[tokio::test]
    async fn research_mode_selects_citation_prompt() {
        let client = Arc::new(MockModelClient::new());
        let judge = JudgeSynthesizer::new(client.clone(), Arc::new(EngineConfig::default()));

        let answers = answers();
        let mut inputs = inputs(&answers);
        inputs.research_mode = true;
        inputs.research_summary = Some("2 external sources retrieved");
        judge.judge_and_merge(inputs).await.unwrap();

        let call = &client.calls()[0];
        assert!(call.system.contains("[Source N]"));
        assert!(call.user.contains("2 external sources retrieved"));
    }

    #[tokio::test]
    async fn long_answers_are_truncated_before_the_judge() {
        let client = Arc::new(MockModelClient::new());
        let mut config = EngineConfig::default();
        config.max_answer_length_for_judge = 20;
        let judge = JudgeSynthesizer::new(client.clone(), Arc::new(config));

        let answers = vec![SuccessfulAnswer {
            model_id: ModelId::new("m"),
            answer: "word ".repeat(50),
        }];
        judge.judge_and_merge(inputs(&answers)).await.unwrap();

        let call = &client.calls()[0];
        assert!(!call.user.contains(&"word ".repeat(10)));
        assert!(call.user.contains("word word word word..."));
    }
}
