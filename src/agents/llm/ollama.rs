//! Ollama HTTP API client

use std::sync::Arc;
use std::time::{Duration, Instant};

use async_trait::async_trait;
use futures::StreamExt;
use serde::Deserialize;
use serde_json::json;
use tracing::{info, warn};

use super::{ChatMessage, GenerateOptions, GenerateResult, LlmClient, ModelInfo};
use crate::agents::error::{LlmError, LlmResult};
use crate::config::Settings;
use crate::monitor::GpuMonitor;

/// Client for a locally-reachable Ollama runtime.
///
/// Holds one connection pool for its lifetime; share it via `Arc`.
pub struct OllamaClient {
    client: reqwest::Client,
    base_url: String,
    model: String,
    default_temperature: f32,
    default_max_tokens: u32,
    monitor: Option<Arc<GpuMonitor>>,
}

impl OllamaClient {
    pub fn new(settings: &Settings) -> LlmResult<Self> {
        let client = reqwest::Client::builder()
            .timeout(Duration::from_secs(settings.ollama.timeout_seconds))
            .build()?;

        Ok(Self {
            client,
            base_url: settings.ollama.base_url(),
            model: settings.ollama.model.clone(),
            default_temperature: settings.generation.temperature,
            default_max_tokens: settings.generation.max_tokens,
            monitor: None,
        })
    }

    /// Report per-call performance into the given monitor as a side effect
    /// of successful completions.
    pub fn with_monitor(mut self, monitor: Arc<GpuMonitor>) -> Self {
        self.monitor = Some(monitor);
        self
    }

    pub fn base_url(&self) -> &str {
        &self.base_url
    }

    async fn report_performance(&self, result: &GenerateResult, elapsed: Duration) {
        if let Some(monitor) = &self.monitor {
            if let Some(tokens) = result.eval_count {
                if tokens > 0 {
                    monitor
                        .record_inference_performance(tokens as u64, elapsed.as_secs_f64())
                        .await;
                }
            }
        }
    }

    async fn check_status(response: reqwest::Response) -> LlmResult<reqwest::Response> {
        let status = response.status();
        if status.is_success() {
            return Ok(response);
        }
        let message = response.text().await.unwrap_or_default();
        Err(LlmError::Api {
            status: status.as_u16(),
            message,
        })
    }

    /// Accumulate an NDJSON stream of `/api/generate` fragments into one
    /// assembled result. The terminal `done` line carries the counters.
    async fn accumulate_generate(response: reqwest::Response) -> LlmResult<GenerateResult> {
        let mut stream = response.bytes_stream();
        let mut buffer = String::new();
        let mut text = String::new();
        let mut terminal: Option<GenerateResponse> = None;

        'outer: while let Some(chunk_result) = stream.next().await {
            let chunk = chunk_result.map_err(LlmError::from)?;
            buffer.push_str(&String::from_utf8_lossy(&chunk));

            while let Some(pos) = buffer.find('\n') {
                let line = buffer[..pos].trim().to_string();
                buffer = buffer[pos + 1..].to_string();
                if line.is_empty() {
                    continue;
                }

                let piece: GenerateResponse = serde_json::from_str(&line)
                    .map_err(|e| LlmError::InvalidResponse(format!("Bad stream line: {}", e)))?;
                text.push_str(&piece.response);
                if piece.done {
                    terminal = Some(piece);
                    break 'outer;
                }
            }
        }

        let terminal = terminal.ok_or_else(|| {
            LlmError::InvalidResponse("Stream ended before a terminal message".to_string())
        })?;

        Ok(GenerateResult {
            response: text,
            model: terminal.model,
            done: true,
            total_duration: terminal.total_duration,
            prompt_eval_count: terminal.prompt_eval_count,
            eval_count: terminal.eval_count,
            eval_duration: terminal.eval_duration,
        })
    }

    /// Same contract as [`Self::accumulate_generate`] for `/api/chat` fragments.
    async fn accumulate_chat(response: reqwest::Response) -> LlmResult<GenerateResult> {
        let mut stream = response.bytes_stream();
        let mut buffer = String::new();
        let mut text = String::new();
        let mut terminal: Option<ChatResponse> = None;

        'outer: while let Some(chunk_result) = stream.next().await {
            let chunk = chunk_result.map_err(LlmError::from)?;
            buffer.push_str(&String::from_utf8_lossy(&chunk));

            while let Some(pos) = buffer.find('\n') {
                let line = buffer[..pos].trim().to_string();
                buffer = buffer[pos + 1..].to_string();
                if line.is_empty() {
                    continue;
                }

                let piece: ChatResponse = serde_json::from_str(&line)
                    .map_err(|e| LlmError::InvalidResponse(format!("Bad stream line: {}", e)))?;
                text.push_str(&piece.message.content);
                if piece.done {
                    terminal = Some(piece);
                    break 'outer;
                }
            }
        }

        let terminal = terminal.ok_or_else(|| {
            LlmError::InvalidResponse("Stream ended before a terminal message".to_string())
        })?;

        Ok(GenerateResult {
            response: text,
            model: terminal.model,
            done: true,
            total_duration: terminal.total_duration,
            prompt_eval_count: terminal.prompt_eval_count,
            eval_count: terminal.eval_count,
            eval_duration: terminal.eval_duration,
        })
    }
}

#[async_trait]
impl LlmClient for OllamaClient {
    fn model(&self) -> &str {
        &self.model
    }

    async fn health_check(&self) -> bool {
        match self
            .client
            .get(format!("{}/api/tags", self.base_url))
            .send()
            .await
        {
            Ok(response) => response.status().is_success(),
            Err(_) => false,
        }
    }

    async fn list_models(&self) -> LlmResult<Vec<ModelInfo>> {
        let response = self
            .client
            .get(format!("{}/api/tags", self.base_url))
            .send()
            .await?;
        let response = Self::check_status(response).await?;

        let tags: TagsResponse = response
            .json()
            .await
            .map_err(|e| LlmError::InvalidResponse(format!("Failed to parse response: {}", e)))?;
        Ok(tags.models)
    }

    async fn ensure_model_available(&self, model: Option<&str>) -> bool {
        let target = model.unwrap_or(&self.model);

        match self.list_models().await {
            Ok(models) => {
                let present = models
                    .iter()
                    .any(|m| m.name == target || m.name.split(':').next() == Some(target));
                if present {
                    return true;
                }
            }
            Err(err) => {
                warn!("Could not list local models: {}", err);
                return false;
            }
        }

        info!("Model {} not found locally, pulling", target);
        let pull = self
            .client
            .post(format!("{}/api/pull", self.base_url))
            .json(&json!({ "name": target, "stream": false }))
            .send()
            .await;

        match pull {
            Ok(response) if response.status().is_success() => {
                info!("Model {} pulled", target);
                true
            }
            Ok(response) => {
                warn!("Pull of {} failed with status {}", target, response.status());
                false
            }
            Err(err) => {
                warn!("Pull of {} failed: {}", target, err);
                false
            }
        }
    }

    async fn generate(&self, prompt: &str, options: &GenerateOptions) -> LlmResult<GenerateResult> {
        let body = json!({
            "model": options.model.as_deref().unwrap_or(&self.model),
            "prompt": prompt,
            "system": options.system,
            "stream": options.stream,
            "options": {
                "temperature": options.temperature.unwrap_or(self.default_temperature),
                "num_predict": options.max_tokens.unwrap_or(self.default_max_tokens),
            }
        });

        let started = Instant::now();
        let response = self
            .client
            .post(format!("{}/api/generate", self.base_url))
            .json(&body)
            .send()
            .await?;
        let response = Self::check_status(response).await?;

        let result = if options.stream {
            Self::accumulate_generate(response).await?
        } else {
            let raw: GenerateResponse = response.json().await.map_err(|e| {
                LlmError::InvalidResponse(format!("Failed to parse response: {}", e))
            })?;
            GenerateResult {
                response: raw.response,
                model: raw.model,
                done: raw.done,
                total_duration: raw.total_duration,
                prompt_eval_count: raw.prompt_eval_count,
                eval_count: raw.eval_count,
                eval_duration: raw.eval_duration,
            }
        };

        self.report_performance(&result, started.elapsed()).await;
        Ok(result)
    }

    async fn chat(
        &self,
        messages: &[ChatMessage],
        options: &GenerateOptions,
    ) -> LlmResult<GenerateResult> {
        let body = json!({
            "model": options.model.as_deref().unwrap_or(&self.model),
            "messages": messages,
            "stream": options.stream,
            "keep_alive": "30m",
            "options": {
                "temperature": options.temperature.unwrap_or(self.default_temperature),
                "num_predict": options.max_tokens.unwrap_or(self.default_max_tokens),
            }
        });

        let started = Instant::now();
        let response = self
            .client
            .post(format!("{}/api/chat", self.base_url))
            .json(&body)
            .send()
            .await?;
        let response = Self::check_status(response).await?;

        let result = if options.stream {
            Self::accumulate_chat(response).await?
        } else {
            let raw: ChatResponse = response.json().await.map_err(|e| {
                LlmError::InvalidResponse(format!("Failed to parse response: {}", e))
            })?;
            GenerateResult {
                response: raw.message.content,
                model: raw.model,
                done: raw.done,
                total_duration: raw.total_duration,
                prompt_eval_count: raw.prompt_eval_count,
                eval_count: raw.eval_count,
                eval_duration: raw.eval_duration,
            }
        };

        self.report_performance(&result, started.elapsed()).await;
        Ok(result)
    }

    async fn embeddings(&self, text: &str, model: Option<&str>) -> LlmResult<Vec<f64>> {
        let body = json!({
            "model": model.unwrap_or(&self.model),
            "prompt": text,
        });

        let response = self
            .client
            .post(format!("{}/api/embeddings", self.base_url))
            .json(&body)
            .send()
            .await?;
        let response = Self::check_status(response).await?;

        let parsed: EmbeddingsResponse = response
            .json()
            .await
            .map_err(|e| LlmError::InvalidResponse(format!("Failed to parse response: {}", e)))?;
        Ok(parsed.embedding)
    }
}

#[derive(Debug, Deserialize)]
struct GenerateResponse {
    #[serde(default)]
    response: String,
    model: String,
    done: bool,
    total_duration: Option<u64>,
    prompt_eval_count: Option<u32>,
    eval_count: Option<u32>,
    eval_duration: Option<u64>,
}

#[derive(Debug, Deserialize)]
struct ChatResponse {
    #[serde(default)]
    message: ChatResponseMessage,
    model: String,
    done: bool,
    total_duration: Option<u64>,
    prompt_eval_count: Option<u32>,
    eval_count: Option<u32>,
    eval_duration: Option<u64>,
}

#[derive(Debug, Default, Deserialize)]
struct ChatResponseMessage {
    #[serde(default)]
    content: String,
}

#[derive(Debug, Deserialize)]
struct TagsResponse {
    #[serde(default)]
    models: Vec<ModelInfo>,
}

#[derive(Debug, Deserialize)]
struct EmbeddingsResponse {
    #[serde(default)]
    embedding: Vec<f64>,
}
