//! The seam between the assistant and whatever model serves it

use std::time::Instant;

use async_trait::async_trait;
use tracing::debug;

use super::client::OllamaClient;
use super::tool_use::{ChatClient, ChatError, ChatMessage, ChatResponse, Tool};
use crate::metrics::LLM_CALL_TIME;

/// A language model that can complete prompts and hold tool-calling chats.
#[async_trait]
pub trait LanguageModel: Send + Sync {
    /// One-shot completion, returns the generated text.
    async fn generate(&self, prompt: &str) -> Result<String, ChatError>;

    /// One chat turn with the given tools available.
    async fn chat(&self, messages: &[ChatMessage], tools: &[Tool]) -> Result<ChatResponse, ChatError>;

    /// Model name used for logging and metric labels.
    fn model_name(&self) -> &str;
}

/// [`LanguageModel`] backed by a local Ollama server
#[derive(Clone)]
pub struct OllamaBackend {
    generate_client: OllamaClient,
    chat_client: ChatClient,
    model: String,
}

impl OllamaBackend {
    pub fn new(base_url: impl Into<String>, model: impl Into<String>) -> Self {
        let base_url = base_url.into();
        Self {
            generate_client: OllamaClient::new(base_url.clone()),
            chat_client: ChatClient::new(base_url),
            model: model.into(),
        }
    }
}

#[async_trait]
impl LanguageModel for OllamaBackend {
    async fn generate(&self, prompt: &str) -> Result<String, ChatError> {
        let start = Instant::now();
        let trace_id = uuid::Uuid::now_v7().to_string();
        let result = self
            .generate_client
            .generate(prompt, self.model.as_str(), Some(&trace_id))
            .await;
        LLM_CALL_TIME
            .with_label_values(&[self.model_name(), "generate"])
            .observe(start.elapsed().as_secs_f64());

        let response = result?;
        debug!(
            model = %self.model,
            trace_id = %trace_id,
            eval_count = response.eval_count,
            prompt_eval_count = response.prompt_eval_count,
            eval_ms = response.eval_duration_ns / 1_000_000,
            "generate completed"
        );
        Ok(response.response)
    }

    async fn chat(&self, messages: &[ChatMessage], tools: &[Tool]) -> Result<ChatResponse, ChatError> {
        let start = Instant::now();
        let tools = if tools.is_empty() { None } else { Some(tools) };
        let result = self.chat_client.chat(messages, &self.model, tools).await;
        LLM_CALL_TIME
            .with_label_values(&[self.model_name(), "chat"])
            .observe(start.elapsed().as_secs_f64());
        result
    }

    fn model_name(&self) -> &str {
        &self.model
    }
}
