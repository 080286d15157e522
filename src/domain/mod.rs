//! Core domain types: tool descriptors and the agent port

use async_trait::async_trait;
use serde::{Deserialize, Serialize};
use serde_json::Value;

use crate::agents::error::AgentResult;

/// One named, schema-described operation an agent can execute.
///
/// Names are unique within an agent and, enforced at registration, across
/// the whole registry. Immutable once the owning agent is constructed.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Tool {
    pub name: String,
    pub description: String,
    /// JSON-schema-like object describing the tool's parameters
    pub input_schema: Value,
}

impl Tool {
    pub fn new(
        name: impl Into<String>,
        description: impl Into<String>,
        input_schema: Value,
    ) -> Self {
        Self {
            name: name.into(),
            description: description.into(),
            input_schema,
        }
    }
}

/// Result of one tool execution.
///
/// Structured results stay structured until the transport boundary, where
/// [`ToolOutput::into_text`] renders them for the caller.
#[derive(Debug, Clone)]
pub enum ToolOutput {
    Text(String),
    Json(Value),
}

impl ToolOutput {
    pub fn into_text(self) -> String {
        match self {
            ToolOutput::Text(text) => text,
            ToolOutput::Json(value) => {
                serde_json::to_string_pretty(&value).unwrap_or_else(|_| value.to_string())
            }
        }
    }
}

impl From<String> for ToolOutput {
    fn from(text: String) -> Self {
        ToolOutput::Text(text)
    }
}

impl From<Value> for ToolOutput {
    fn from(value: Value) -> Self {
        ToolOutput::Json(value)
    }
}

/// A capability unit exposing a fixed set of named tools.
///
/// Agents are constructed once at startup and stay stateless between calls;
/// `tools()` is pure and read once at registration time.
#[async_trait]
pub trait TextAgent: Send + Sync {
    fn name(&self) -> &str;

    fn description(&self) -> &str;

    fn tools(&self) -> Vec<Tool>;

    /// Execute one tool. Implementations validate free-text input before any
    /// network call and surface internal failures as a single execution
    /// error carrying the tool name.
    async fn execute_tool(&self, name: &str, arguments: &Value) -> AgentResult<ToolOutput>;
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    #[test]
    fn json_output_renders_pretty() {
        let output = ToolOutput::Json(json!({"count": 3}));
        let text = output.into_text();
        assert!(text.contains("\"count\": 3"));
    }

    #[test]
    fn text_output_passes_through() {
        let output = ToolOutput::Text("hello".to_string());
        assert_eq!(output.into_text(), "hello");
    }
}
