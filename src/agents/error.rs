//! Error types for agents and the model client

use thiserror::Error;

/// Errors that can occur while executing agent tools
#[derive(Debug, Error)]
pub enum AgentError {
    /// Input rejected before any work was attempted
    #[error("Validation error: {0}")]
    Validation(String),

    /// Unknown tool or agent name
    #[error("Tool not found: {0}")]
    NotFound(String),

    /// Model service unreachable or returned a failure status
    #[error("Upstream error: {0}")]
    Upstream(#[from] LlmError),

    /// Agent-internal failure, carrying the tool name and the cause
    #[error("Error executing {tool}: {source}")]
    Execution {
        tool: String,
        #[source]
        source: anyhow::Error,
    },
}

impl AgentError {
    /// Wrap an internal failure with the tool that produced it
    pub fn execution(tool: impl Into<String>, source: impl Into<anyhow::Error>) -> Self {
        AgentError::Execution {
            tool: tool.into(),
            source: source.into(),
        }
    }
}

/// Errors specific to model service calls
#[derive(Debug, Error)]
pub enum LlmError {
    /// Service responded with a non-success status
    #[error("API error: {status} - {message}")]
    Api { status: u16, message: String },

    /// Transport-level failure
    #[error("Network error: {0}")]
    Network(String),

    /// Call exceeded the configured upper bound
    #[error("Request timed out")]
    Timeout,

    /// Response body did not match the expected shape
    #[error("Invalid response: {0}")]
    InvalidResponse(String),
}

impl From<reqwest::Error> for LlmError {
    fn from(err: reqwest::Error) -> Self {
        if err.is_timeout() {
            LlmError::Timeout
        } else if err.is_connect() {
            LlmError::Network(format!("Connection error: {}", err))
        } else {
            LlmError::Network(err.to_string())
        }
    }
}

/// Result type alias for agent operations
pub type AgentResult<T> = Result<T, AgentError>;

/// Result type alias for model client operations
pub type LlmResult<T> = Result<T, LlmError>;
