//! MCP server over the agent registry, using the official rmcp SDK.
//!
//! Exposes the same flattened tool namespace as the REST API. Dispatch goes
//! through the registry, so MCP clients and HTTP callers see identical
//! tool behavior.

use std::sync::Arc;

use rmcp::{
    handler::server::ServerHandler,
    model::{
        CallToolRequestParam, CallToolResult, Content, Implementation, ListToolsResult,
        PaginatedRequestParam, ServerCapabilities, ServerInfo, Tool,
    },
    service::RequestContext,
    ErrorData as McpError, RoleServer,
};
use tracing::{debug, info};

use crate::agents::{AgentError, AgentRegistry};

#[derive(Clone)]
pub struct LexisServer {
    registry: Arc<AgentRegistry>,
}

impl LexisServer {
    pub fn new(registry: Arc<AgentRegistry>) -> Self {
        Self { registry }
    }
}

impl ServerHandler for LexisServer {
    fn get_info(&self) -> ServerInfo {
        ServerInfo {
            protocol_version: Default::default(),
            capabilities: ServerCapabilities::builder().enable_tools().build(),
            server_info: Implementation {
                name: "lexis".to_string(),
                version: env!("CARGO_PKG_VERSION").to_string(),
                title: None,
                website_url: None,
                icons: None,
            },
            instructions: Some(
                "Text-processing toolkit: cleaning, diacritic removal, analysis, grammar, \
                 summarization, language detection, sentiment and anonymization tools"
                    .to_string(),
            ),
        }
    }

    fn ping(
        &self,
        _context: RequestContext<RoleServer>,
    ) -> impl std::future::Future<Output = Result<(), McpError>> + Send + '_ {
        async move {
            debug!("MCP ping received");
            Ok(())
        }
    }

    fn list_tools(
        &self,
        _request: Option<PaginatedRequestParam>,
        _context: RequestContext<RoleServer>,
    ) -> impl std::future::Future<Output = Result<ListToolsResult, McpError>> + Send + '_ {
        let registry = self.registry.clone();
        async move {
            let tools: Vec<Tool> = registry
                .tools()
                .into_iter()
                .map(|t| {
                    let schema = match t.input_schema {
                        serde_json::Value::Object(obj) => obj,
                        _ => serde_json::Map::new(),
                    };
                    Tool::new(t.name, t.description, schema)
                })
                .collect();

            Ok(ListToolsResult {
                tools,
                next_cursor: None,
            })
        }
    }

    fn call_tool(
        &self,
        request: CallToolRequestParam,
        _context: RequestContext<RoleServer>,
    ) -> impl std::future::Future<Output = Result<CallToolResult, McpError>> + Send + '_ {
        let registry = self.registry.clone();
        async move {
            let name = request.name.as_ref();
            let args = request
                .arguments
                .map(serde_json::Value::Object)
                .unwrap_or(serde_json::Value::Null);

            info!("MCP tool call: {}", name);
            match registry.dispatch(name, &args).await {
                Ok(output) => Ok(CallToolResult::success(vec![Content::text(
                    output.into_text(),
                )])),
                Err(err @ (AgentError::Validation(_) | AgentError::NotFound(_))) => {
                    Err(McpError::invalid_params(err.to_string(), None))
                }
                Err(err) => Err(McpError::internal_error(err.to_string(), None)),
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::agents::{base::testing, build_registry};

    #[test]
    fn server_info_advertises_tools() {
        let registry = Arc::new(build_registry(testing::context()).unwrap());
        let server = LexisServer::new(registry);

        let info = server.get_info();
        assert_eq!(info.server_info.name, "lexis");
        assert!(info.capabilities.tools.is_some());
    }
}
