//! Shared plumbing for the text agents.

use std::sync::Arc;

use serde_json::Value;
use tokio::sync::RwLock;

use crate::agents::error::{AgentError, AgentResult};
use crate::agents::llm::LlmClient;
use crate::config::Settings;

/// Dependencies handed to every agent at construction.
#[derive(Clone)]
pub struct AgentContext {
    pub settings: Arc<RwLock<Settings>>,
    pub client: Arc<dyn LlmClient>,
}

impl AgentContext {
    pub fn new(settings: Arc<RwLock<Settings>>, client: Arc<dyn LlmClient>) -> Self {
        Self { settings, client }
    }

    /// Snapshot of the current settings.
    pub async fn settings(&self) -> Settings {
        self.settings.read().await.clone()
    }

    /// Validate free-text input against the configured ceiling and return
    /// it trimmed. Runs before any network call.
    pub async fn validate_text_input<'a>(&self, text: &'a str) -> AgentResult<&'a str> {
        let max_length = self.settings.read().await.text.max_text_length;
        validate_text(text, max_length)
    }
}

/// Length is counted in characters; input exactly at the limit passes.
pub(crate) fn validate_text(text: &str, max_length: usize) -> AgentResult<&str> {
    let trimmed = text.trim();
    if trimmed.is_empty() {
        return Err(AgentError::Validation(
            "Text input cannot be empty".to_string(),
        ));
    }

    let length = text.chars().count();
    if length > max_length {
        return Err(AgentError::Validation(format!(
            "Text too long: {} characters, maximum is {}",
            length, max_length
        )));
    }

    Ok(trimmed)
}

/// Split text into word-bounded chunks of at most `chunk_size` characters.
///
/// A chunk boundary never splits a word; a single word longer than the
/// chunk size becomes its own oversized chunk.
pub(crate) fn chunk_text(text: &str, chunk_size: usize) -> Vec<String> {
    if text.chars().count() <= chunk_size {
        return vec![text.to_string()];
    }

    let mut chunks = Vec::new();
    let mut current: Vec<&str> = Vec::new();
    let mut current_length = 0usize;

    for word in text.split_whitespace() {
        let word_length = word.chars().count() + 1;

        if current_length + word_length > chunk_size && !current.is_empty() {
            chunks.push(current.join(" "));
            current_length = word.chars().count();
            current = vec![word];
        } else {
            current.push(word);
            current_length += word_length;
        }
    }

    if !current.is_empty() {
        chunks.push(current.join(" "));
    }

    chunks
}

/// String argument with an empty-string default, so absence surfaces as
/// the empty-input validation error.
pub(crate) fn str_arg<'a>(args: &'a Value, key: &str) -> &'a str {
    args.get(key).and_then(Value::as_str).unwrap_or("")
}

pub(crate) fn opt_str_arg<'a>(args: &'a Value, key: &str) -> Option<&'a str> {
    args.get(key).and_then(Value::as_str).filter(|s| !s.is_empty())
}

pub(crate) fn bool_arg(args: &Value, key: &str, default: bool) -> bool {
    args.get(key).and_then(Value::as_bool).unwrap_or(default)
}

pub(crate) fn usize_arg(args: &Value, key: &str, default: usize) -> usize {
    args.get(key)
        .and_then(Value::as_u64)
        .map(|v| v as usize)
        .unwrap_or(default)
}

/// Resolve tool input from either `text` or `url`, never both. A fetched
/// page keeps its title as a leading line so downstream steps see it.
pub(crate) async fn text_or_url(
    context: &AgentContext,
    tool: &str,
    args: &Value,
) -> AgentResult<String> {
    let text = opt_str_arg(args, "text");
    let url = opt_str_arg(args, "url");

    let resolved = match (text, url) {
        (Some(_), Some(_)) => {
            return Err(AgentError::Validation(
                "Provide either 'text' or 'url', not both".to_string(),
            ))
        }
        (None, None) => {
            return Err(AgentError::Validation(
                "Either 'text' or 'url' must be provided".to_string(),
            ))
        }
        (Some(text), None) => text.to_string(),
        (None, Some(url)) => {
            let page = crate::fetch::fetch_url_content(url)
                .await
                .map_err(|e| AgentError::execution(tool, e))?;
            if page.title.is_empty() {
                page.text
            } else {
                format!("Title: {}\n\n{}", page.title, page.text)
            }
        }
    };

    let validated = context.validate_text_input(&resolved).await?;
    Ok(validated.to_string())
}

#[cfg(test)]
pub(crate) mod testing {
    use std::collections::VecDeque;
    use std::sync::atomic::{AtomicUsize, Ordering};
    use std::sync::Mutex;

    use async_trait::async_trait;

    use super::*;
    use crate::agents::error::LlmResult;
    use crate::agents::llm::{ChatMessage, GenerateOptions, GenerateResult, ModelInfo};

    /// Deterministic stand-in for the model runtime. Pops scripted
    /// responses in order, then repeats the fallback.
    pub(crate) struct ScriptedClient {
        responses: Mutex<VecDeque<String>>,
        fallback: String,
        calls: AtomicUsize,
    }

    impl ScriptedClient {
        pub fn new(responses: &[&str]) -> Self {
            let fallback = responses.last().map(|r| r.to_string()).unwrap_or_default();
            Self {
                responses: Mutex::new(responses.iter().map(|r| r.to_string()).collect()),
                fallback,
                calls: AtomicUsize::new(0),
            }
        }

        pub fn fixed(response: &str) -> Self {
            Self::new(&[response])
        }

        pub fn calls(&self) -> usize {
            self.calls.load(Ordering::SeqCst)
        }

        fn next_response(&self) -> String {
            self.calls.fetch_add(1, Ordering::SeqCst);
            self.responses
                .lock()
                .unwrap()
                .pop_front()
                .unwrap_or_else(|| self.fallback.clone())
        }

        fn result(&self, response: String) -> GenerateResult {
            GenerateResult {
                response,
                model: "scripted".to_string(),
                done: true,
                total_duration: None,
                prompt_eval_count: None,
                eval_count: None,
                eval_duration: None,
            }
        }
    }

    #[async_trait]
    impl LlmClient for ScriptedClient {
        fn model(&self) -> &str {
            "scripted"
        }

        async fn health_check(&self) -> bool {
            true
        }

        async fn list_models(&self) -> LlmResult<Vec<ModelInfo>> {
            Ok(Vec::new())
        }

        async fn ensure_model_available(&self, _model: Option<&str>) -> bool {
            true
        }

        async fn generate(
            &self,
            _prompt: &str,
            _options: &GenerateOptions,
        ) -> LlmResult<GenerateResult> {
            Ok(self.result(self.next_response()))
        }

        async fn chat(
            &self,
            _messages: &[ChatMessage],
            _options: &GenerateOptions,
        ) -> LlmResult<GenerateResult> {
            Ok(self.result(self.next_response()))
        }

        async fn embeddings(&self, _text: &str, _model: Option<&str>) -> LlmResult<Vec<f64>> {
            Ok(Vec::new())
        }
    }

    pub(crate) fn context_with(client: Arc<dyn LlmClient>) -> AgentContext {
        AgentContext::new(Arc::new(RwLock::new(Settings::default())), client)
    }

    pub(crate) fn context() -> AgentContext {
        context_with(Arc::new(ScriptedClient::fixed("ok")))
    }
}
