//! Tool registry and dispatcher.
//!
//! All agents register at startup; every tool name must be unique across
//! the whole registry or the process refuses to start. Dispatch is an
//! indexed lookup, no scanning per call.

use std::collections::{HashMap, HashSet};
use std::sync::Arc;

use anyhow::bail;
use serde::Serialize;
use serde_json::Value;
use tracing::{debug, warn};

use crate::agents::error::{AgentError, AgentResult};
use crate::domain::{TextAgent, ToolOutput};

/// One tool with the agent that owns it, for listings.
#[derive(Debug, Clone, Serialize)]
pub struct ToolDescriptor {
    pub name: String,
    pub description: String,
    pub input_schema: Value,
    pub agent: String,
}

/// Agent summary for listings.
#[derive(Debug, Clone, Serialize)]
pub struct AgentInfo {
    pub name: String,
    pub description: String,
    pub tools: Vec<String>,
}

/// Uniform result envelope. Failures stay in-band: `success: false` plus
/// an error string, never a transport error.
#[derive(Debug, Clone, Serialize)]
pub struct ExecutionOutcome {
    #[serde(skip_serializing_if = "Option::is_none")]
    pub result: Option<String>,
    pub success: bool,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub error: Option<String>,
}

#[derive(Default)]
pub struct AgentRegistry {
    agents: Vec<Arc<dyn TextAgent>>,
    index: HashMap<String, usize>,
}

impl AgentRegistry {
    pub fn new() -> Self {
        Self::default()
    }

    /// Register an agent and index its tools. A tool name already claimed
    /// anywhere in the registry is a startup configuration error.
    pub fn register(&mut self, agent: Arc<dyn TextAgent>) -> anyhow::Result<()> {
        let tools = agent.tools();
        let mut fresh = HashSet::new();

        for tool in &tools {
            if let Some(&slot) = self.index.get(&tool.name) {
                bail!(
                    "Duplicate tool name '{}': claimed by both '{}' and '{}'",
                    tool.name,
                    self.agents[slot].name(),
                    agent.name()
                );
            }
            if !fresh.insert(tool.name.clone()) {
                bail!(
                    "Agent '{}' declares tool '{}' more than once",
                    agent.name(),
                    tool.name
                );
            }
        }

        let slot = self.agents.len();
        for tool in &tools {
            self.index.insert(tool.name.clone(), slot);
        }
        debug!("Registered agent {} with {} tools", agent.name(), tools.len());
        self.agents.push(agent);
        Ok(())
    }

    /// Route a call to the owning agent. Unknown names fail with
    /// [`AgentError::NotFound`] carrying the requested name.
    pub async fn dispatch(&self, name: &str, arguments: &Value) -> AgentResult<ToolOutput> {
        let Some(&slot) = self.index.get(name) else {
            return Err(AgentError::NotFound(name.to_string()));
        };
        self.agents[slot].execute_tool(name, arguments).await
    }

    /// Dispatch and fold the result into the uniform envelope.
    pub async fn execute(&self, name: &str, arguments: &Value) -> ExecutionOutcome {
        match self.dispatch(name, arguments).await {
            Ok(output) => ExecutionOutcome {
                result: Some(output.into_text()),
                success: true,
                error: None,
            },
            Err(err) => {
                warn!("Tool {} failed: {}", name, err);
                ExecutionOutcome {
                    result: None,
                    success: false,
                    error: Some(err.to_string()),
                }
            }
        }
    }

    pub fn has_tool(&self, name: &str) -> bool {
        self.index.contains_key(name)
    }

    /// All tools in registration order, each tagged with its owning agent.
    pub fn tools(&self) -> Vec<ToolDescriptor> {
        self.agents
            .iter()
            .flat_map(|agent| {
                agent.tools().into_iter().map(|tool| ToolDescriptor {
                    name: tool.name,
                    description: tool.description,
                    input_schema: tool.input_schema,
                    agent: agent.name().to_string(),
                })
            })
            .collect()
    }

    pub fn agent_infos(&self) -> Vec<AgentInfo> {
        self.agents
            .iter()
            .map(|agent| AgentInfo {
                name: agent.name().to_string(),
                description: agent.description().to_string(),
                tools: agent.tools().into_iter().map(|t| t.name).collect(),
            })
            .collect()
    }

    pub fn agent_count(&self) -> usize {
        self.agents.len()
    }

    pub fn tool_count(&self) -> usize {
        self.index.len()
    }
}

#[cfg(test)]
mod tests {
    use async_trait::async_trait;

    use super::*;
    use crate::domain::Tool;

    struct FixedAgent {
        name: &'static str,
        tools: Vec<&'static str>,
    }

    #[async_trait]
    impl TextAgent for FixedAgent {
        fn name(&self) -> &str {
            self.name
        }

        fn description(&self) -> &str {
            "fixed responses"
        }

        fn tools(&self) -> Vec<Tool> {
            self.tools
                .iter()
                .map(|t| Tool::new(*t, "a test tool", serde_json::json!({"type": "object"})))
                .collect()
        }

        async fn execute_tool(&self, name: &str, _arguments: &Value) -> AgentResult<ToolOutput> {
            match name {
                "boom" => Err(AgentError::Validation("bad input".to_string())),
                _ => Ok(ToolOutput::Text(format!("{} ran", name))),
            }
        }
    }

    fn registry_with(agents: Vec<FixedAgent>) -> AgentRegistry {
        let mut registry = AgentRegistry::new();
        for agent in agents {
            registry.register(Arc::new(agent)).unwrap();
        }
        registry
    }

    #[test]
    fn duplicate_tool_name_across_agents_is_rejected() {
        let mut registry = AgentRegistry::new();
        registry
            .register(Arc::new(FixedAgent {
                name: "first",
                tools: vec!["shared"],
            }))
            .unwrap();

        let err = registry
            .register(Arc::new(FixedAgent {
                name: "second",
                tools: vec!["shared"],
            }))
            .unwrap_err();

        assert!(err.to_string().contains("shared"));
        assert!(err.to_string().contains("first"));
        assert_eq!(registry.agent_count(), 1);
    }

    #[test]
    fn duplicate_tool_name_within_one_agent_is_rejected() {
        let mut registry = AgentRegistry::new();
        let err = registry
            .register(Arc::new(FixedAgent {
                name: "twice",
                tools: vec!["echo", "echo"],
            }))
            .unwrap_err();

        assert!(err.to_string().contains("more than once"));
    }

    #[tokio::test]
    async fn dispatch_routes_to_owning_agent() {
        let registry = registry_with(vec![
            FixedAgent {
                name: "alpha",
                tools: vec!["one"],
            },
            FixedAgent {
                name: "beta",
                tools: vec!["two"],
            },
        ]);

        let output = registry.dispatch("two", &Value::Null).await.unwrap();
        assert_eq!(output.into_text(), "two ran");
    }

    #[tokio::test]
    async fn unknown_tool_is_not_found() {
        let registry = registry_with(vec![FixedAgent {
            name: "alpha",
            tools: vec!["one"],
        }]);

        let err = registry.dispatch("nope", &Value::Null).await.unwrap_err();
        match err {
            AgentError::NotFound(name) => assert_eq!(name, "nope"),
            other => panic!("expected NotFound, got {other:?}"),
        }
    }

    #[tokio::test]
    async fn execute_folds_errors_into_the_envelope() {
        let registry = registry_with(vec![FixedAgent {
            name: "alpha",
            tools: vec!["one", "boom"],
        }]);

        let ok = registry.execute("one", &Value::Null).await;
        assert!(ok.success);
        assert_eq!(ok.result.as_deref(), Some("one ran"));
        assert!(ok.error.is_none());

        let failed = registry.execute("boom", &Value::Null).await;
        assert!(!failed.success);
        assert!(failed.result.is_none());
        assert!(failed.error.unwrap().contains("bad input"));

        let missing = registry.execute("ghost", &Value::Null).await;
        assert!(!missing.success);
        assert!(missing.error.unwrap().contains("ghost"));
    }

    #[test]
    fn listings_carry_owning_agent() {
        let registry = registry_with(vec![
            FixedAgent {
                name: "alpha",
                tools: vec!["one", "two"],
            },
            FixedAgent {
                name: "beta",
                tools: vec!["three"],
            },
        ]);

        assert_eq!(registry.tool_count(), 3);
        assert_eq!(registry.agent_count(), 2);

        let tools = registry.tools();
        assert_eq!(tools.len(), 3);
        assert_eq!(tools[0].agent, "alpha");
        assert_eq!(tools[2].agent, "beta");

        let infos = registry.agent_infos();
        assert_eq!(infos[0].tools, vec!["one", "two"]);
        assert!(registry.has_tool("three"));
        assert!(!registry.has_tool("four"));
    }
}
