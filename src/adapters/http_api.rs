//! REST endpoints over the agent registry and the accelerator monitor.
//!
//! Tool execution failures stay in-band as `success: false` bodies; the
//! only non-2xx responses are framework-level request faults and upstream
//! model failures on the chat-completion route.

use std::sync::Arc;
use std::time::Instant;

use axum::extract::State;
use axum::http::StatusCode;
use axum::response::{IntoResponse, Response};
use axum::Json;
use chrono::Utc;
use serde::Deserialize;
use serde_json::{json, Map, Value};
use tokio::sync::RwLock;
use tracing::{error, info};
use uuid::Uuid;

use crate::agents::llm::{GenerateOptions, LlmClient};
use crate::agents::registry::ExecutionOutcome;
use crate::agents::AgentRegistry;
use crate::config::Settings;
use crate::monitor::GpuMonitor;

/// Shared state for every handler; built once in `main`.
#[derive(Clone)]
pub struct AppContext {
    pub settings: Arc<RwLock<Settings>>,
    pub client: Arc<dyn LlmClient>,
    pub monitor: Arc<GpuMonitor>,
    pub registry: Arc<AgentRegistry>,
}

#[derive(Debug, Deserialize)]
pub struct ExecuteRequest {
    pub name: String,
    #[serde(default)]
    pub arguments: Value,
}

#[derive(Debug, Deserialize)]
pub struct ChatCompletionRequest {
    #[serde(default)]
    pub model: Option<String>,
    pub messages: Vec<ChatTurn>,
    #[serde(default)]
    pub temperature: Option<f32>,
    #[serde(default)]
    pub max_tokens: Option<u32>,
    #[serde(default)]
    pub stream: bool,
}

#[derive(Debug, Deserialize)]
pub struct ChatTurn {
    pub role: String,
    pub content: String,
}

pub async fn health(State(ctx): State<AppContext>) -> Json<Value> {
    Json(json!({
        "status": "healthy",
        "service": "lexis",
        "version": env!("CARGO_PKG_VERSION"),
        "agents_loaded": ctx.registry.agent_count(),
    }))
}

pub async fn list_tools(State(ctx): State<AppContext>) -> Json<Value> {
    let tools = ctx.registry.tools();
    Json(json!({
        "count": tools.len(),
        "tools": tools,
    }))
}

///// Execute one tool. Failures are HTTP 200 with `success: false`; only a
/// malformed request body earns a 4xx, from the extractor.
pub async fn execute_tool(
    State(ctx): State<AppContext>,
    Json(request): Json<ExecuteRequest>,
) -> Json<ExecutionOutcome> {
    info!("Executing tool {}", request.name);
    Json(ctx.registry.execute(&request.name, &request.arguments).await)
}

pub async fn status(State(ctx): State<AppContext>) -> Json<Value> {
    let settings = ctx.settings.read().await.clone();
    let agent_tools: Map<String, Value> = ctx
        .registry
        .agent_infos()
        .into_iter()
        .map(|info| (info.name, json!(info.tools)))
        .collect();

    Json(json!({
        "status": "running",
        "service": "lexis",
        "version": env!("CARGO_PKG_VERSION"),
        "server": {
            "host": settings.server.host,
            "port": settings.server.port,
        },
        "model": {
            "host": settings.ollama.host,
            "port": settings.ollama.port,
            "name": settings.ollama.model,
            "timeout_seconds": settings.ollama.timeout_seconds,
        },
        "agents_count": ctx.registry.agent_count(),
        "total_tools": ctx.registry.tool_count(),
        "agents": agent_tools,
    }))
}

pub async fn list_agents(State(ctx): State<AppContext>) -> Json<Value> {
    let agents = ctx.registry.agent_infos();
    Json(json!({
        "count": agents.len(),
        "agents": agents,
    }))
}

pub async fn gpu_health(State(ctx): State<AppContext>) -> Json<Value> {
    let health = ctx.monitor.check_health().await;
    Json(json!(health))
}

pub async fn gpu_metrics(State(ctx): State<AppContext>) -> Json<Value> {
    let current = ctx.monitor.update_metrics().await;
    let summary = ctx.monitor.get_performance_summary().await;
    Json(json!({
        "current_metrics": current,
        "performance_summary": summary,
    }))
}

pub async fn gpu_recommendations(State(ctx): State<AppContext>) -> Json<Value> {
    let recommendations = ctx.monitor.get_optimization_recommendations().await;
    Json(json!({
        "recommendations": recommendations,
        "generated_at": Utc::now(),
    }))
}

/// OpenAI-compatible chat completion backed by the local model runtime.
/// Role-tagged messages are flattened into one prompt; the upstream being
/// unreachable or failing maps to 502.
pub async fn chat_completions(
    State(ctx): State<AppContext>,
    Json(request): Json<ChatCompletionRequest>,
) -> Response {
    let started = Instant::now();
    info!(
        "Processing chat completion with {} messages",
        request.messages.len()
    );

    let prompt = flatten_chat(&request.messages);
    let options = GenerateOptions {
        model: request.model.clone(),
        system: None,
        temperature: request.temperature,
        max_tokens: request.max_tokens,
        stream: request.stream,
    };
    let model = match request.model {
        Some(model) => model,
        None => ctx.settings.read().await.ollama.model.clone(),
    };

    match ctx.client.generate(&prompt, &options).await {
        Ok(result) => {
            let elapsed = started.elapsed().as_secs_f64();
            let prompt_tokens = result.prompt_eval_count.unwrap_or(0);
            let completion_tokens = result.eval_count.unwrap_or(0);
            let tokens_per_second = result.tokens_per_second().unwrap_or(0.0);
            info!(
                "Chat completion: {} tokens in {:.2}s ({:.1} t/s)",
                completion_tokens, elapsed, tokens_per_second
            );

            Json(json!({
                "id": format!("chatcmpl-{}", Uuid::new_v4()),
                "object": "chat.completion",
                "created": Utc::now().timestamp(),
                "model": model,
                "choices": [{
                    "index": 0,
                    "message": {
                        "role": "assistant",
                        "content": result.response,
                    },
                    "finish_reason": "stop",
                }],
                "usage": {
                    "prompt_tokens": prompt_tokens,
                    "completion_tokens": completion_tokens,
                    "total_tokens": prompt_tokens + completion_tokens,
                    "response_time_seconds": round3(elapsed),
                    "tokens_per_second": round2(tokens_per_second),
                },
            }))
            .into_response()
        }
        Err(err) => {
            error!("Chat completion failed: {}", err);
            (
                StatusCode::BAD_GATEWAY,
                Json(json!({"error": err.to_string()})),
            )
                .into_response()
        }
    }
}

/// `System:`/`User:`/`Assistant:` turns joined by blank lines, with a
/// trailing `Assistant:` cue for the model. Unknown roles are skipped.
fn flatten_chat(messages: &[ChatTurn]) -> String {
    let mut parts = Vec::with_capacity(messages.len());
    for turn in messages {
        match turn.role.as_str() {
            "system" => parts.push(format!("System: {}", turn.content)),
            "user" => parts.push(format!("User: {}", turn.content)),
            "assistant" => parts.push(format!("Assistant: {}", turn.content)),
            _ => {}
        }
    }
    format!("{}\n\nAssistant:", parts.join("\n\n"))
}

fn round2(value: f64) -> f64 {
    (value * 100.0).round() / 100.0
}

fn round3(value: f64) -> f64 {
    (value * 1000.0).round() / 1000.0
}

#[cfg(test)]
mod tests {
    use super::*;

    fn turn(role: &str, content: &str) -> ChatTurn {
        ChatTurn {
            role: role.to_string(),
            content: content.to_string(),
        }
    }

    #[test]
    fn chat_turns_flatten_in_order_with_trailing_cue() {
        let prompt = flatten_chat(&[
            turn("system", "Be terse."),
            turn("user", "Hi."),
            turn("assistant", "Hello."),
            turn("user", "Summarize X."),
        ]);

        assert_eq!(
            prompt,
            "System: Be terse.\n\nUser: Hi.\n\nAssistant: Hello.\n\nUser: Summarize X.\n\nAssistant:"
        );
    }

    #[test]
    fn unknown_roles_are_skipped() {
        let prompt = flatten_chat(&[turn("tool", "ignored"), turn("user", "Hi.")]);
        assert_eq!(prompt, "User: Hi.\n\nAssistant:");
    }

    #[test]
    fn empty_messages_still_cue_the_assistant() {
        assert_eq!(flatten_chat(&[]), "\n\nAssistant:");
    }

    #[test]
    fn execute_request_defaults_arguments_to_null() {
        let request: ExecuteRequest = serde_json::from_str(r#"{"name": "clean_text"}"#).unwrap();
        assert_eq!(request.name, "clean_text");
        assert!(request.arguments.is_null());
    }

    #[test]
    fn chat_request_accepts_minimal_body() {
        let request: ChatCompletionRequest =
            serde_json::from_str(r#"{"messages": [{"role": "user", "content": "hey"}]}"#).unwrap();
        assert!(request.model.is_none());
        assert!(request.temperature.is_none());
        assert!(!request.stream);
        assert_eq!(request.messages.len(), 1);
    }
}
