use crate::config::ServerConfig;
use crate::orchestrator::AskService;
use crate::response::AskRequest;
use crate::tools;
use anyhow::Result;
use rmcp::{
    ServerHandler, ServiceExt,
    handler::server::{router::tool::ToolRouter, tool::Parameters},
    model::{ServerCapabilities, ServerInfo},
    tool, tool_handler, tool_router,
};
use tokio::io::{stdin, stdout};
use tracing::info;

/// Lexi MCP server answering questions from the indexed material
#[derive(Clone)]
pub struct LexiMcpServer {
    config: ServerConfig,
    service: AskService,
    tool_router: ToolRouter<Self>,
}

#[tool_router]
impl LexiMcpServer {
    pub fn new(config: ServerConfig, service: AskService) -> Self {
        info!(
            "Initializing Lexi MCP server with root: {}",
            config.root_dir.display()
        );
        Self {
            config,
            service,
            tool_router: Self::tool_router(),
        }
    }

    #[tool(
        description = "Answer a study question from the indexed textbooks. Returns JSON with raw_answer (retrieved passage), llm_answer and mode_used; or {message} when nothing relevant was found"
    )]
    async fn ask(&self, Parameters(request): Parameters<AskRequest>) -> Result<String, String> {
        tools::ask::ask(&self.service, request).await
    }

    #[tool(description = "Show index health and the settings questions are answered with")]
    async fn status(&self) -> String {
        info!("Processing status request");
        tools::status::status(&self.config).await
    }
}

impl LexiMcpServer {
    /// Serve the MCP server using stdio transport
    pub async fn serve_stdio(&self) -> Result<()> {
        info!("Starting MCP server with stdio transport");
        let server = self.clone().serve((stdin(), stdout())).await?;
        let quit_reason = server.waiting().await?;
        info!("MCP server quit: {:?}", quit_reason);
        Ok(())
    }
}

#[tool_handler]
impl ServerHandler for LexiMcpServer {
    fn get_info(&self) -> ServerInfo {
        ServerInfo {
            instructions: Some(
                "Lexi MCP Server - answers study questions from indexed textbooks. Call `ask` with a question and an optional mode ('brief' or 'detailed')."
                    .into(),
            ),
            capabilities: ServerCapabilities::builder().enable_tools().build(),
            ..Default::default()
        }
    }
}
