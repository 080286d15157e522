//! Model client for the local Ollama runtime
//!
//! One trait, one implementation: [`LlmClient`] is the seam the agents and
//! transports call through, [`OllamaClient`] speaks the Ollama HTTP API.
//! Streamed responses are accumulated inside the client; callers always get
//! one assembled result.

mod ollama;

pub use ollama::OllamaClient;

use async_trait::async_trait;
use serde::{Deserialize, Serialize};

use crate::agents::error::LlmResult;

/// Role of one chat message
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Role {
    System,
    User,
    Assistant,
}

/// One role-tagged message in a chat request
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ChatMessage {
    pub role: Role,
    pub content: String,
}

impl ChatMessage {
    pub fn system(content: impl Into<String>) -> Self {
        Self {
            role: Role::System,
            content: content.into(),
        }
    }

    pub fn user(content: impl Into<String>) -> Self {
        Self {
            role: Role::User,
            content: content.into(),
        }
    }

    pub fn assistant(content: impl Into<String>) -> Self {
        Self {
            role: Role::Assistant,
            content: content.into(),
        }
    }
}

/// Per-call generation options; `None` falls back to the configured default
#[derive(Debug, Clone, Default)]
pub struct GenerateOptions {
    pub model: Option<String>,
    pub system: Option<String>,
    pub temperature: Option<f32>,
    pub max_tokens: Option<u32>,
    pub stream: bool,
}

/// One assembled completion, whether the transport streamed it or not
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct GenerateResult {
    pub response: String,
    pub model: String,
    pub done: bool,
    /// Total wall time reported by the runtime, in nanoseconds
    pub total_duration: Option<u64>,
    pub prompt_eval_count: Option<u32>,
    pub eval_count: Option<u32>,
    /// Generation time reported by the runtime, in nanoseconds
    pub eval_duration: Option<u64>,
}

impl GenerateResult {
    /// Tokens per second as reported by the runtime, when it gave us both counters
    pub fn tokens_per_second(&self) -> Option<f64> {
        match (self.eval_count, self.eval_duration) {
            (Some(tokens), Some(ns)) if ns > 0 => Some(tokens as f64 / (ns as f64 / 1e9)),
            _ => None,
        }
    }
}

/// One locally available model
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ModelInfo {
    pub name: String,
    #[serde(default)]
    pub size: u64,
    #[serde(default)]
    pub digest: String,
    #[serde(default)]
    pub modified_at: String,
}

/// Client contract for the text-generation service
#[async_trait]
pub trait LlmClient: Send + Sync {
    /// The configured default model
    fn model(&self) -> &str;

    /// True when the service answers at all; never errors
    async fn health_check(&self) -> bool;

    async fn list_models(&self) -> LlmResult<Vec<ModelInfo>>;

    /// Pull the model if it is not present locally. Returns false (not an
    /// error) when the pull fails, so callers can degrade gracefully.
    /// One attempt, no retry loop.
    async fn ensure_model_available(&self, model: Option<&str>) -> bool;

    /// Single-prompt completion
    async fn generate(&self, prompt: &str, options: &GenerateOptions) -> LlmResult<GenerateResult>;

    /// Chat-style completion over an ordered message list
    async fn chat(
        &self,
        messages: &[ChatMessage],
        options: &GenerateOptions,
    ) -> LlmResult<GenerateResult>;

    /// Embedding vector for one text; single call, no retry
    async fn embeddings(&self, text: &str, model: Option<&str>) -> LlmResult<Vec<f64>>;
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn roles_serialize_lowercase() {
        let msg = ChatMessage::system("be brief");
        let value = serde_json::to_value(&msg).unwrap();
        assert_eq!(value["role"], "system");
        assert_eq!(value["content"], "be brief");
    }

    #[test]
    fn tokens_per_second_needs_both_counters() {
        let mut result = GenerateResult {
            response: String::new(),
            model: "m".to_string(),
            done: true,
            total_duration: None,
            prompt_eval_count: None,
            eval_count: Some(100),
            eval_duration: Some(2_000_000_000),
        };
        assert_eq!(result.tokens_per_second(), Some(50.0));

        result.eval_duration = None;
        assert_eq!(result.tokens_per_second(), None);

        result.eval_duration = Some(0);
        assert_eq!(result.tokens_per_second(), None);
    }
}
