use rmcp::{model::*, ServiceExt};
use std::borrow::Cow;
use std::env;
use std::sync::Arc;
use tracing::info;

use crate::{mcp, AppState};

#[derive(Clone)]
pub struct McpService {
    pub state: Arc<AppState>,
}

impl McpService {
    pub fn new() -> anyhow::Result<Self> {
        // Initialize tracing
        tracing_subscriber::fmt()
            .with_env_filter(tracing_subscriber::EnvFilter::from_default_env())
            .with_writer(std::io::stderr)
            .init();

        // Get configuration from environment
        let api_key = env::var("YOUTUBE_API_KEY")
            .map_err(|_| anyhow::anyhow!("YOUTUBE_API_KEY must be set"))?;
        let ytdlp_path = env::var("YTDLP_PATH").unwrap_or_else(|_| "yt-dlp".to_string());
        let cache_ttl = env::var("CACHE_TTL_SECS")
            .ok()
            .and_then(|v| v.parse().ok())
            .unwrap_or(3600);

        info!("Starting YouTube tools MCP service");

        // Create HTTP client
        let http_client = reqwest::Client::builder()
            .timeout(std::time::Duration::from_secs(30))
            .build()?;

        let state = Arc::new(AppState::new(
            http_client,
            api_key,
            ytdlp_path,
            None,
            std::time::Duration::from_secs(cache_ttl),
        ));

        Ok(Self { state })
    }
}

impl rmcp::ServerHandler for McpService {
    fn get_info(&self) -> ServerInfo {
        ServerInfo {
            protocol_version: ProtocolVersion::LATEST,
            server_info: Implementation {
                name: "youtube-tools".to_string(),
                version: "0.1.0".to_string(),
            },
            instructions: Some(
                "YouTube tools for chat assistants: transcripts, video metadata, search and discovery, and download/format information, with display-ready formatting.".to_string(),
            ),
            capabilities: ServerCapabilities::builder()
                .enable_tools()
                .build(),
            ..Default::default()
        }
    }

    async fn list_tools(
        &self,
        _page: Option<PaginatedRequestParam>,
        _context: rmcp::service::RequestContext<rmcp::RoleServer>,
    ) -> Result<ListToolsResult, ErrorData> {
        let tools = mcp::tool_catalog()
            .into_iter()
            .map(|tool| Tool {
                name: Cow::Owned(tool.name),
                description: Some(Cow::Owned(tool.description)),
                input_schema: match tool.input_schema {
                    serde_json::Value::Object(map) => std::sync::Arc::new(map),
                    _ => std::sync::Arc::new(serde_json::Map::new()),
                },
                output_schema: None,
                annotations: None,
            })
            .collect();

        Ok(ListToolsResult {
            tools,
            ..Default::default()
        })
    }

    async fn call_tool(
        &self,
        request: CallToolRequestParam,
        _context: rmcp::service::RequestContext<rmcp::RoleServer>,
    ) -> Result<CallToolResult, ErrorData> {
        info!("MCP tool call: {} with args: {:?}", request.name, request.arguments);

        let args = request.arguments.as_ref().ok_or_else(|| ErrorData::new(
            ErrorCode::INVALID_PARAMS,
            "Missing required arguments object",
            None,
        ))?;
        let input = args
            .get("input")
            .and_then(|v| v.as_str())
            .ok_or_else(|| ErrorData::new(
                ErrorCode::INVALID_PARAMS,
                "Missing required parameter: input",
                None,
            ))?;

        match mcp::dispatch(&self.state, request.name.as_ref(), input).await {
            // Tool errors travel as data so the assistant can read them.
            Some((payload, _is_error)) => {
                Ok(CallToolResult::success(vec![Content::text(payload.to_string())]))
            }
            None => Err(ErrorData::new(
                ErrorCode::METHOD_NOT_FOUND,
                format!("Unknown tool: {}", request.name),
                None,
            )),
        }
    }
}

pub async fn run() -> anyhow::Result<()> {
    let service = McpService::new()?;
    // Use the stdio transport from rmcp
    let server = service.serve(rmcp::transport::stdio()).await?;
    info!("MCP stdio server running");
    let _quit_reason = server.waiting().await?;
    Ok(())
}
