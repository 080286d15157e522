//! # Lexis - AI text-processing toolkit
//!
//! Lexis exposes a family of text-processing agents (cleaning, diacritic
//! removal, analysis, grammar checking, summarization, language detection,
//! sentiment analysis, anonymization) through a uniform tool-call protocol,
//! backed by a local Ollama runtime.
//!
//! ## Surfaces
//!
//! - **HTTP API**: health, tool listing/execution, server status, GPU
//!   metrics and an OpenAI-compatible `/chat/completions` route
//! - **MCP**: the same tool namespace over the rmcp streamable-HTTP
//!   transport, mounted at `/mcp`
//! - **CLI**: serve, status, config management, one-shot tool runs and
//!   GPU diagnostics
//!
//! ## Architecture
//!
//! - `domain` - the agent/tool contract shared by every surface
//! - `agents` - the eight agents, the model client and the registry
//! - `adapters` - HTTP and MCP transports over the registry
//! - `monitor` - accelerator probing and bounded metrics history
//! - `config` - YAML + environment settings with validation

pub mod adapters;
pub mod agents;
pub mod cli;
pub mod config;
pub mod domain;
pub mod fetch;
pub mod monitor;

use std::sync::Arc;

use axum::routing::{get, post};
use axum::Router;
use rmcp::transport::streamable_http_server::{
    session::local::LocalSessionManager, StreamableHttpServerConfig, StreamableHttpService,
};
use tower_http::cors::{Any, CorsLayer};

pub use crate::adapters::http_api::AppContext;
use crate::adapters::http_api;
use crate::adapters::rmcp_server::LexisServer;

/// Install the global tracing subscriber. `RUST_LOG` wins over the
/// configured level when set.
pub fn init_logging(level: &str) {
    let filter = tracing_subscriber::EnvFilter::try_from_default_env()
        .unwrap_or_else(|_| tracing_subscriber::EnvFilter::new(level));
    tracing_subscriber::fmt().with_env_filter(filter).init();
}

/// Build the Axum router: REST endpoints plus the MCP service at `/mcp`.
pub async fn create_app(context: AppContext) -> Router {
    let mcp_server = LexisServer::new(context.registry.clone());
    let session_manager = Arc::new(LocalSessionManager::default());
    let mcp_service = StreamableHttpService::new(
        move || Ok(mcp_server.clone()),
        session_manager,
        StreamableHttpServerConfig::default(),
    );

    let cors_enabled = context.settings.read().await.server.cors_enabled;

    let router = Router::new()
        .route("/health", get(http_api::health))
        .route("/tools", get(http_api::list_tools))
        .route("/tools/execute", post(http_api::execute_tool))
        .route("/status", get(http_api::status))
        .route("/agents", get(http_api::list_agents))
        .route("/gpu/health", get(http_api::gpu_health))
        .route("/gpu/metrics", get(http_api::gpu_metrics))
        .route("/gpu/recommendations", get(http_api::gpu_recommendations))
        .route("/chat/completions", post(http_api::chat_completions))
        .nest_service("/mcp", mcp_service)
        .with_state(context);

    if cors_enabled {
        router.layer(
            CorsLayer::new()
                .allow_origin(Any)
                .allow_methods(Any)
                .allow_headers(Any),
        )
    } else {
        router
    }
}
