//! MCP server handler for sitepulse.

use rmcp::{
    ServerHandler,
    handler::server::router::tool::ToolRouter,
    model::{Implementation, ProtocolVersion, ServerCapabilities, ServerInfo},
    tool_handler,
};
use sitepulse_ops::OpsClient;

/// The sitepulse MCP server.
///
/// Exposes Plausible analytics queries as MCP tools.
#[derive(Clone)]
pub struct SitepulseMcpServer {
    pub(crate) ops: OpsClient,
    tool_router: ToolRouter<Self>,
}

impl SitepulseMcpServer {
    /// Create a new MCP server backed by the given operations client.
    pub fn new(ops: OpsClient) -> Self {
        Self {
            ops,
            tool_router: Self::create_tool_router(),
        }
    }
}

#[tool_handler]
impl ServerHandler for SitepulseMcpServer {
    fn get_info(&self) -> ServerInfo {
        ServerInfo {
            protocol_version: ProtocolVersion::V_2024_11_05,
            capabilities: ServerCapabilities::builder().enable_tools().build(),
            server_info: Implementation {
                name: "sitepulse-mcp-server".into(),
                version: env!("CARGO_PKG_VERSION").into(),
                title: Some("sitepulse MCP Server".into()),
                description: Some(
                    "Query Plausible web analytics: sites, breakdowns, and page analysis.".into(),
                ),
                icons: None,
                website_url: None,
            },
            instructions: Some(
                "Use list_sites to find a site_id, list_metrics to see accepted metrics, \
                 dimensions, and time ranges, get_breakdown for grouped analytics, and \
                 analyze_page for a single page. Time ranges default to the last 7 days."
                    .to_string(),
            ),
        }
    }
}
