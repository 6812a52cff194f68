use crate::types::*;
use crate::{download, search, transcript, video_info, AppState};
use axum::{extract::State, http::StatusCode, response::Json};
use serde::{Deserialize, Serialize};
use std::sync::Arc;
use tracing::info;

#[derive(Debug, Serialize, Deserialize)]
pub struct McpTool {
    pub name: String,
    pub description: String,
    pub input_schema: serde_json::Value,
}

#[derive(Debug, Serialize, Deserialize)]
pub struct McpToolsResponse {
    pub tools: Vec<McpTool>,
}

#[derive(Debug, Serialize, Deserialize)]
pub struct McpCallRequest {
    pub name: String,
    pub arguments: serde_json::Value,
}

#[derive(Debug, Serialize, Deserialize)]
pub struct McpCallResponse {
    pub content: Vec<McpContent>,
    pub is_error: bool,
}

#[derive(Debug, Serialize, Deserialize)]
pub struct McpContent {
    #[serde(rename = "type")]
    pub content_type: String,
    pub text: String,
}

fn input_schema(description: &str) -> serde_json::Value {
    serde_json::json!({
        "type": "object",
        "properties": {
            "input": {
                "type": "string",
                "description": description
            }
        },
        "required": ["input"]
    })
}

/// The four tools exposed to the chat assistant. Every tool takes a single
/// `input` string in the shared `base|suffix` convention.
pub fn tool_catalog() -> Vec<McpTool> {
    vec![
        McpTool {
            name: "get_transcript".to_string(),
            description: "Fetch the transcript of a YouTube video. Returns the flattened text, a timestamped rendering, word count, and a short summary.".to_string(),
            input_schema: input_schema(
                "Video URL or 11-character ID, optionally followed by |<language code> (default en)",
            ),
        },
        McpTool {
            name: "get_video_info".to_string(),
            description: "Fetch title, channel, description, duration, and formatted view/like counts for a YouTube video.".to_string(),
            input_schema: input_schema("Video URL or 11-character ID"),
        },
        McpTool {
            name: "search_videos".to_string(),
            description: "Search YouTube, or list a channel's uploads (channel:<id>) or a playlist (playlist:<id>). Supports |count=N, sort=relevance|date|views|rating, recent=true, minViews=N, duration=short|medium|long.".to_string(),
            input_schema: input_schema(
                "Search query, channel:<id>, or playlist:<id>, optionally followed by |key=value parameters",
            ),
        },
        McpTool {
            name: "get_download_info".to_string(),
            description: "Fetch download metadata for a YouTube video: plain metadata, audio-only streams, or the full format catalog with best-quality picks.".to_string(),
            input_schema: input_schema(
                "Video URL or 11-character ID, optionally followed by |metadata_only, |audio_info or |formats",
            ),
        },
    ]
}

/// Run a named tool against the shared adapter layer. Tool failures come
/// back as data (`is_error` = true) rather than as transport errors; `None`
/// means the tool name is unknown.
pub async fn dispatch(
    state: &Arc<AppState>,
    tool: &str,
    input: &str,
) -> Option<(serde_json::Value, bool)> {
    let outcome = match tool {
        "get_transcript" => render(transcript::run(state, input).await, Tool::Transcript),
        "get_video_info" => render(video_info::run(state, input).await, Tool::VideoInfo),
        "search_videos" => render(search::run(state, input).await, Tool::Search),
        "get_download_info" => render(download::run(state, input).await, Tool::Download),
        _ => return None,
    };
    Some(outcome)
}

fn render<T: Serialize>(result: Result<T, ToolError>, tool: Tool) -> (serde_json::Value, bool) {
    match result {
        Ok(payload) => match serde_json::to_value(&payload) {
            Ok(value) => (value, false),
            Err(e) => (ToolError::system(e.to_string()).body(tool), true),
        },
        Err(e) => (e.body(tool), true),
    }
}

pub async fn list_tools() -> Json<McpToolsResponse> {
    Json(McpToolsResponse {
        tools: tool_catalog(),
    })
}

pub async fn call_tool(
    State(state): State<Arc<AppState>>,
    Json(request): Json<McpCallRequest>,
) -> Result<Json<McpCallResponse>, (StatusCode, Json<ErrorResponse>)> {
    info!("MCP tool call: {} with args: {:?}", request.name, request.arguments);

    let input = request
        .arguments
        .get("input")
        .and_then(|v| v.as_str())
        .ok_or_else(|| {
            (
                StatusCode::BAD_REQUEST,
                Json(ErrorResponse {
                    error: "Missing required parameter: input".to_string(),
                }),
            )
        })?;

    match dispatch(&state, &request.name, input).await {
        Some((payload, is_error)) => Ok(Json(McpCallResponse {
            content: vec![McpContent {
                content_type: "text".to_string(),
                text: payload.to_string(),
            }],
            is_error,
        })),
        None => Err((
            StatusCode::BAD_REQUEST,
            Json(ErrorResponse {
                error: format!("Unknown tool: {}", request.name),
            }),
        )),
    }
}
