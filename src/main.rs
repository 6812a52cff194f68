use axum::{
    extract::{Query, Request, State},
    http::{header, StatusCode},
    middleware::{self, Next},
    response::{Json, Response},
    routing::{get, post},
    Router,
};
use serde::Deserialize;
use std::env;
use std::sync::Arc;
use tower_http::cors::CorsLayer;
use tower_http::trace::TraceLayer;
use tracing::{error, info};

use youtube_tools::download::DownloadMode;
use youtube_tools::{download, mcp, search, transcript, types::*, video_info, AppState};

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    // Initialize tracing
    tracing_subscriber::fmt()
        .with_env_filter(tracing_subscriber::EnvFilter::from_default_env())
        .init();

    // Get configuration from environment
    let api_key = env::var("YOUTUBE_API_KEY")
        .map_err(|_| anyhow::anyhow!("YOUTUBE_API_KEY must be set"))?;
    let ytdlp_path = env::var("YTDLP_PATH").unwrap_or_else(|_| "yt-dlp".to_string());
    let access_token = env::var("ACCESS_TOKEN").ok().filter(|t| !t.is_empty());
    let cache_ttl = env::var("CACHE_TTL_SECS")
        .ok()
        .and_then(|v| v.parse().ok())
        .unwrap_or(3600);
    let port: u16 = env::var("PORT").ok().and_then(|v| v.parse().ok()).unwrap_or(5000);

    info!("Starting YouTube tools server");
    info!("Media extractor: {}", ytdlp_path);

    // Create HTTP client
    let http_client = reqwest::Client::builder()
        .timeout(std::time::Duration::from_secs(30))
        .build()?;

    // Create application state
    let state = Arc::new(AppState::new(
        http_client,
        api_key,
        ytdlp_path,
        access_token,
        std::time::Duration::from_secs(cache_ttl),
    ));

    // Build router; tool routes sit behind the optional session check
    let tools = Router::new()
        .route("/api/youtube/transcript", get(transcript_handler))
        .route("/api/youtube/video", get(video_handler))
        .route("/api/youtube/search", get(search_handler))
        .route("/api/youtube/download", get(download_handler))
        .route("/mcp/tools", get(mcp::list_tools))
        .route("/mcp/call", post(mcp::call_tool))
        .layer(middleware::from_fn_with_state(state.clone(), require_session));

    let app = Router::new()
        .route("/", get(health_check))
        .route("/health", get(health_check))
        .merge(tools)
        .layer(CorsLayer::permissive())
        .layer(TraceLayer::new_for_http())
        .with_state(state);

    // Start server
    let listener = tokio::net::TcpListener::bind(("0.0.0.0", port)).await?;
    info!("YouTube tools server listening on http://0.0.0.0:{}", port);

    axum::serve(listener, app).await?;

    Ok(())
}

async fn health_check() -> Json<serde_json::Value> {
    Json(serde_json::json!({
        "status": "healthy",
        "service": "youtube-tools",
        "version": "0.1.0"
    }))
}

type HandlerError = (StatusCode, Json<serde_json::Value>);

/// When ACCESS_TOKEN is configured, tool routes require a matching bearer
/// token; otherwise the check is a no-op.
async fn require_session(
    State(state): State<Arc<AppState>>,
    request: Request,
    next: Next,
) -> Result<Response, HandlerError> {
    if let Some(expected) = &state.access_token {
        let provided = request
            .headers()
            .get(header::AUTHORIZATION)
            .and_then(|v| v.to_str().ok())
            .and_then(|v| v.strip_prefix("Bearer "));
        if provided != Some(expected.as_str()) {
            return Err((
                StatusCode::UNAUTHORIZED,
                Json(serde_json::json!({
                    "error": "Invalid or missing session token",
                    "type": "system_error"
                })),
            ));
        }
    }
    Ok(next.run(request).await)
}

fn missing_param(name: &str, tool: Tool) -> HandlerError {
    (
        StatusCode::BAD_REQUEST,
        Json(serde_json::json!({
            "error": format!("Missing required parameter: {}", name),
            "type": format!("{}_error", tool.tag()),
        })),
    )
}

fn tool_error(err: ToolError, tool: Tool) -> HandlerError {
    let status = match err.kind {
        ErrorKind::InvalidReference => StatusCode::BAD_REQUEST,
        ErrorKind::NotFound => StatusCode::NOT_FOUND,
        ErrorKind::Upstream | ErrorKind::System => StatusCode::INTERNAL_SERVER_ERROR,
    };
    (status, Json(err.body(tool)))
}

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
struct TranscriptQuery {
    video_id: Option<String>,
    language: Option<String>,
}

async fn transcript_handler(
    State(state): State<Arc<AppState>>,
    Query(q): Query<TranscriptQuery>,
) -> Result<Json<TranscriptResult>, HandlerError> {
    let Some(video_id) = q.video_id else {
        return Err(missing_param("videoId", Tool::Transcript));
    };
    transcript::fetch_transcript(
        &state.captions,
        &state.transcript_cache,
        &video_id,
        q.language.as_deref(),
    )
    .await
    .map(Json)
    .map_err(|e| {
        error!("Transcript error: {}", e);
        tool_error(e, Tool::Transcript)
    })
}

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
struct VideoQuery {
    video_id: Option<String>,
}

async fn video_handler(
    State(state): State<Arc<AppState>>,
    Query(q): Query<VideoQuery>,
) -> Result<Json<VideoInfo>, HandlerError> {
    let Some(video_id) = q.video_id else {
        return Err(missing_param("videoId", Tool::VideoInfo));
    };
    video_info::fetch_video_info(&state.platform, &state.video_cache, &video_id)
        .await
        .map(Json)
        .map_err(|e| {
            error!("Video info error: {}", e);
            tool_error(e, Tool::VideoInfo)
        })
}

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
struct SearchQuery {
    q: Option<String>,
    channel_id: Option<String>,
    playlist_id: Option<String>,
    count: Option<String>,
    sort: Option<String>,
    recent: Option<String>,
    min_views: Option<String>,
    duration: Option<String>,
    #[serde(rename = "type")]
    result_type: Option<String>,
}

async fn search_handler(
    State(state): State<Arc<AppState>>,
    Query(q): Query<SearchQuery>,
) -> Result<Json<SearchResults>, HandlerError> {
    let raw_query = if let Some(channel_id) = q.channel_id {
        format!("channel:{}", channel_id)
    } else if let Some(playlist_id) = q.playlist_id {
        format!("playlist:{}", playlist_id)
    } else if let Some(text) = q.q {
        text
    } else {
        return Err(missing_param("q", Tool::Search));
    };

    // Funnel the individual query params through the shared token parser so
    // parse warnings behave the same on both transports.
    let mut tokens = Vec::new();
    if let Some(v) = &q.count {
        tokens.push(format!("count={}", v));
    }
    if let Some(v) = &q.sort {
        tokens.push(format!("sort={}", v));
    }
    if let Some(v) = &q.recent {
        tokens.push(format!("recent={}", v));
    }
    if let Some(v) = &q.min_views {
        tokens.push(format!("minViews={}", v));
    }
    if let Some(v) = &q.duration {
        tokens.push(format!("duration={}", v));
    }
    let (params, warnings) = search::parse_parameters(tokens.iter().map(String::as_str));

    search::search_videos(
        &state.platform,
        &state.search_cache,
        &raw_query,
        params,
        warnings,
        q.result_type,
    )
    .await
    .map(Json)
    .map_err(|e| {
        error!("Search error: {}", e);
        tool_error(e, Tool::Search)
    })
}

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
struct DownloadQuery {
    video_id: Option<String>,
    mode: Option<String>,
}

async fn download_handler(
    State(state): State<Arc<AppState>>,
    Query(q): Query<DownloadQuery>,
) -> Result<Json<DownloadResult>, HandlerError> {
    let Some(video_id) = q.video_id else {
        return Err(missing_param("videoId", Tool::Download));
    };
    let mode = match q.mode.as_deref() {
        None => DownloadMode::MetadataOnly,
        Some(raw) => DownloadMode::parse(raw).ok_or_else(|| {
            (
                StatusCode::BAD_REQUEST,
                Json(serde_json::json!({
                    "error": format!(
                        "Invalid mode '{}': expected metadata_only, audio_info or formats",
                        raw
                    ),
                    "type": "download_error",
                })),
            )
        })?,
    };
    download::fetch_download_info(&state.extractor, &state.download_cache, &video_id, mode)
        .await
        .map(Json)
        .map_err(|e| {
            error!("Download info error: {}", e);
            tool_error(e, Tool::Download)
        })
}
