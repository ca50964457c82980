//! MCP server handler implementation.
//!
//! This module defines the main server handler that
//! routes tool calls to the metadata service.
use crate::service::MetadataService;
use crate::tools::{MetadataFetchParams, MetadataGetParams, fetch_impl, get_impl};

use rmcp::{
    ErrorData as McpError, ServerHandler,
    handler::server::{
        tool::{ToolCallContext, ToolRouter},
        wrapper::Parameters,
    },
    model::{
        CallToolRequestParam, CallToolResult, Implementation, ListToolsResult, PaginatedRequestParam, ProtocolVersion,
        ServerCapabilities, ServerInfo,
    },
    service::{RequestContext, RoleServer},
    tool, tool_router,
};

/// The main MCP server handler for the metadata inventory.
#[derive(Clone)]
pub struct MetadataInventoryServer {
    tool_router: ToolRouter<Self>,
    service: MetadataService,
}

/// Tool router implementation using the #[tool_router] macro.
#[tool_router]
impl MetadataInventoryServer {
    pub fn new(service: MetadataService) -> Self {
        Self { tool_router: Self::tool_router(), service }
    }

    /// Fetch a URL now and store its HTTP metadata.
    #[tool(
        description = "Fetch a URL now and store its status code, headers, and cookies. Returns the stored record."
    )]
    async fn metadata_fetch(&self, params: Parameters<MetadataFetchParams>) -> Result<CallToolResult, McpError> {
        fetch_impl(&self.service, params.0).await
    }

    /// Read stored metadata, triggering background collection on a miss.
    #[tool(
        description = "Get stored HTTP metadata for a URL. On a miss, starts a background fetch and returns status \"triggered\"; retry later."
    )]
    async fn metadata_get(&self, params: Parameters<MetadataGetParams>) -> Result<CallToolResult, McpError> {
        get_impl(&self.service, params.0).await
    }
}

impl ServerHandler for MetadataInventoryServer {
    fn get_info(&self) -> ServerInfo {
        ServerInfo {
            server_info: Implementation {
                name: "metadata-inventory".into(),
                version: env!("CARGO_PKG_VERSION").into(),
                ..Default::default()
            },
            protocol_version: ProtocolVersion::LATEST,
            capabilities: ServerCapabilities::builder().enable_tools().build(),
            ..Default::default()
        }
    }

    async fn list_tools(
        &self, _request: Option<PaginatedRequestParam>, _context: RequestContext<RoleServer>,
    ) -> Result<ListToolsResult, rmcp::model::ErrorData> {
        Ok(ListToolsResult { meta: None, tools: self.tool_router.list_all(), next_cursor: None })
    }

    async fn call_tool(
        &self, request: CallToolRequestParam, context: RequestContext<RoleServer>,
    ) -> Result<CallToolResult, rmcp::model::ErrorData> {
        self.tool_router
            .call(ToolCallContext::new(self, request, context))
            .await
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::testing::{FakeFetcher, service_with};
    use inventory_core::MemoryRepository;
    use std::sync::Arc;

    #[test]
    fn test_router_lists_both_tools() {
        let service = service_with(Arc::new(MemoryRepository::new()), Arc::new(FakeFetcher::succeeding(200)), 0);
        let server = MetadataInventoryServer::new(service);

        let mut names: Vec<String> = server.tool_router.list_all().into_iter().map(|t| t.name.to_string()).collect();
        names.sort();
        assert_eq!(names, vec!["metadata_fetch", "metadata_get"]);
        assert_eq!(server.get_info().server_info.name, "metadata-inventory");
    }
}
