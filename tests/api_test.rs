use std::sync::Arc;

use async_trait::async_trait;
use axum::body::Body;
use axum::http::{Request, StatusCode};
use serde_json::{json, Value};
use tokio::sync::RwLock;
use tower::util::ServiceExt;

use lexis::agents::error::LlmResult;
use lexis::agents::llm::{ChatMessage, GenerateOptions, GenerateResult, LlmClient, ModelInfo};
use lexis::agents::{build_registry, AgentContext};
use lexis::config::Settings;
use lexis::monitor::GpuMonitor;
use lexis::AppContext;

/// Canned model client so the API tests never touch a live runtime.
struct StubClient {
    response: String,
}

impl StubClient {
    fn result(&self) -> GenerateResult {
        GenerateResult {
            response: self.response.clone(),
            model: "stub".to_string(),
            done: true,
            total_duration: Some(1_000_000_000),
            prompt_eval_count: Some(12),
            eval_count: Some(8),
            eval_duration: Some(2_000_000_000),
        }
    }
}

#[async_trait]
impl LlmClient for StubClient {
    fn model(&self) -> &str {
        "stub"
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
        Ok(self.result())
    }

    async fn chat(
        &self,
        _messages: &[ChatMessage],
        _options: &GenerateOptions,
    ) -> LlmResult<GenerateResult> {
        Ok(self.result())
    }

    async fn embeddings(&self, _text: &str, _model: Option<&str>) -> LlmResult<Vec<f64>> {
        Ok(Vec::new())
    }
}

async fn test_app() -> axum::Router {
    let settings = Arc::new(RwLock::new(Settings::default()));
    let client: Arc<dyn LlmClient> = Arc::new(StubClient {
        response: "Hello from the model.".to_string(),
    });
    let registry = Arc::new(
        build_registry(AgentContext::new(settings.clone(), client.clone()))
            .expect("registry builds"),
    );
    let monitor = Arc::new(GpuMonitor::new(16));

    lexis::create_app(AppContext {
        settings,
        client,
        monitor,
        registry,
    })
    .await
}

async fn json_body(response: axum::response::Response) -> Value {
    let bytes = axum::body::to_bytes(response.into_body(), usize::MAX)
        .await
        .unwrap();
    serde_json::from_slice(&bytes).unwrap()
}

fn get(uri: &str) -> Request<Body> {
    Request::builder().uri(uri).body(Body::empty()).unwrap()
}

fn post(uri: &str, body: Value) -> Request<Body> {
    Request::builder()
        .uri(uri)
        .method("POST")
        .header("Content-Type", "application/json")
        .body(Body::from(body.to_string()))
        .unwrap()
}

#[tokio::test]
async fn health_reports_agent_count() {
    let app = test_app().await;

    let response = app.oneshot(get("/health")).await.unwrap();
    assert_eq!(response.status(), StatusCode::OK);

    let body = json_body(response).await;
    assert_eq!(body["status"], "healthy");
    assert_eq!(body["service"], "lexis");
    assert_eq!(body["agents_loaded"], 8);
}

#[tokio::test]
async fn tools_endpoint_lists_every_tool() {
    let app = test_app().await;

    let response = app.oneshot(get("/tools")).await.unwrap();
    assert_eq!(response.status(), StatusCode::OK);

    let body = json_body(response).await;
    assert_eq!(body["count"], 26);

    let tools = body["tools"].as_array().unwrap();
    assert_eq!(tools.len(), 26);
    let clean = tools
        .iter()
        .find(|t| t["name"] == "clean_text")
        .expect("clean_text is advertised");
    assert_eq!(clean["agent"], "cleaner");
    assert!(clean["input_schema"].is_object());
}

#[tokio::test]
async fn execute_runs_a_tool_end_to_end() {
    let app = test_app().await;

    let response = app
        .oneshot(post(
            "/tools/execute",
            json!({"name": "clean_text", "arguments": {"text": "Hello    world"}}),
        ))
        .await
        .unwrap();
    assert_eq!(response.status(), StatusCode::OK);

    let body = json_body(response).await;
    assert_eq!(body["success"], true);
    assert_eq!(body["result"], "Hello world");
    assert!(body.get("error").is_none());
}

#[tokio::test]
async fn execute_unknown_tool_is_a_soft_failure() {
    let app = test_app().await;

    let response = app
        .oneshot(post(
            "/tools/execute",
            json!({"name": "definitely_not_a_tool"}),
        ))
        .await
        .unwrap();
    assert_eq!(response.status(), StatusCode::OK);

    let body = json_body(response).await;
    assert_eq!(body["success"], false);
    assert!(body["error"]
        .as_str()
        .unwrap()
        .contains("definitely_not_a_tool"));
    assert!(body.get("result").is_none());
}

#[tokio::test]
async fn execute_surfaces_validation_errors() {
    let app = test_app().await;

    let response = app
        .oneshot(post(
            "/tools/execute",
            json!({"name": "clean_text", "arguments": {"text": "   "}}),
        ))
        .await
        .unwrap();
    assert_eq!(response.status(), StatusCode::OK);

    let body = json_body(response).await;
    assert_eq!(body["success"], false);
    assert!(body["error"].as_str().unwrap().contains("empty"));
}

#[tokio::test]
async fn input_length_ceiling_is_inclusive() {
    let app = test_app().await;
    let max = Settings::default().text.max_text_length;

    let response = app
        .clone()
        .oneshot(post(
            "/tools/execute",
            json!({"name": "clean_text", "arguments": {"text": "a".repeat(max)}}),
        ))
        .await
        .unwrap();
    let body = json_body(response).await;
    assert_eq!(body["success"], true);

    let response = app
        .oneshot(post(
            "/tools/execute",
            json!({"name": "clean_text", "arguments": {"text": "a".repeat(max + 1)}}),
        ))
        .await
        .unwrap();
    let body = json_body(response).await;
    assert_eq!(body["success"], false);
    assert!(body["error"].as_str().unwrap().contains("Text too long"));
}

#[tokio::test]
async fn malformed_execute_body_is_a_client_error() {
    let app = test_app().await;

    let response = app
        .oneshot(post("/tools/execute", json!({"arguments": {}})))
        .await
        .unwrap();
    assert!(response.status().is_client_error());
}

#[tokio::test]
async fn status_reports_configuration() {
    let app = test_app().await;

    let response = app.oneshot(get("/status")).await.unwrap();
    assert_eq!(response.status(), StatusCode::OK);

    let body = json_body(response).await;
    assert_eq!(body["status"], "running");
    assert_eq!(body["agents_count"], 8);
    assert_eq!(body["total_tools"], 26);
    assert_eq!(body["model"]["name"], Settings::default().ollama.model);
    assert!(body["agents"]["cleaner"].is_array());
}

#[tokio::test]
async fn agents_endpoint_lists_all_agents() {
    let app = test_app().await;

    let response = app.oneshot(get("/agents")).await.unwrap();
    assert_eq!(response.status(), StatusCode::OK);

    let body = json_body(response).await;
    assert_eq!(body["count"], 8);
    let names: Vec<&str> = body["agents"]
        .as_array()
        .unwrap()
        .iter()
        .map(|a| a["name"].as_str().unwrap())
        .collect();
    assert!(names.contains(&"anonymizer"));
    assert!(names.contains(&"language"));
}

#[tokio::test]
async fn chat_completions_are_openai_shaped() {
    let app = test_app().await;

    let response = app
        .oneshot(post(
            "/chat/completions",
            json!({"messages": [{"role": "user", "content": "Say hello"}]}),
        ))
        .await
        .unwrap();
    assert_eq!(response.status(), StatusCode::OK);

    let body = json_body(response).await;
    assert!(body["id"].as_str().unwrap().starts_with("chatcmpl-"));
    assert_eq!(body["object"], "chat.completion");
    assert_eq!(body["model"], Settings::default().ollama.model);
    assert_eq!(body["choices"][0]["index"], 0);
    assert_eq!(body["choices"][0]["message"]["role"], "assistant");
    assert_eq!(
        body["choices"][0]["message"]["content"],
        "Hello from the model."
    );
    assert_eq!(body["choices"][0]["finish_reason"], "stop");
    assert_eq!(body["usage"]["prompt_tokens"], 12);
    assert_eq!(body["usage"]["completion_tokens"], 8);
    assert_eq!(body["usage"]["total_tokens"], 20);
    assert_eq!(body["usage"]["tokens_per_second"], 4.0);
}

#[tokio::test]
async fn chat_completions_echo_the_requested_model() {
    let app = test_app().await;

    let response = app
        .oneshot(post(
            "/chat/completions",
            json!({
                "model": "custom:7b",
                "messages": [{"role": "user", "content": "Hi"}]
            }),
        ))
        .await
        .unwrap();

    let body = json_body(response).await;
    assert_eq!(body["model"], "custom:7b");
}

#[tokio::test]
async fn gpu_health_is_reachable() {
    let app = test_app().await;

    let response = app.oneshot(get("/gpu/health")).await.unwrap();
    assert_eq!(response.status(), StatusCode::OK);

    let body = json_body(response).await;
    assert!(body["gpu_available"].is_boolean());
}
