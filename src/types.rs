use serde::{Deserialize, Serialize};
use serde_json::json;
use thiserror::Error;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Tool {
    Transcript,
    VideoInfo,
    Search,
    Download,
}

impl Tool {
    pub fn tag(&self) -> &'static str {
        match self {
            Tool::Transcript => "transcript",
            Tool::VideoInfo => "video_info",
            Tool::Search => "search",
            Tool::Download => "download",
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum ErrorKind {
    InvalidReference,
    Upstream,
    NotFound,
    System,
}

/// Typed error returned by every tool adapter. Never crosses the transport
/// boundary as a panic; transports render it as a JSON error object.
#[derive(Debug, Clone, Error)]
#[error("{message}")]
pub struct ToolError {
    pub kind: ErrorKind,
    pub message: String,
    pub video_id: Option<String>,
    pub query: Option<String>,
    pub upstream_status: Option<u16>,
}

impl ToolError {
    fn new(kind: ErrorKind, message: impl Into<String>) -> Self {
        Self {
            kind,
            message: message.into(),
            video_id: None,
            query: None,
            upstream_status: None,
        }
    }

    pub fn invalid_reference(input: &str) -> Self {
        Self::new(
            ErrorKind::InvalidReference,
            format!("Could not extract a video ID from '{}'", input),
        )
    }

    pub fn invalid(message: impl Into<String>) -> Self {
        Self::new(ErrorKind::InvalidReference, message)
    }

    pub fn upstream(message: impl Into<String>) -> Self {
        Self::new(ErrorKind::Upstream, message)
    }

    pub fn not_found(message: impl Into<String>) -> Self {
        Self::new(ErrorKind::NotFound, message)
    }

    pub fn system(message: impl Into<String>) -> Self {
        Self::new(ErrorKind::System, message)
    }

    pub fn with_video_id(mut self, video_id: &str) -> Self {
        self.video_id = Some(video_id.to_string());
        self
    }

    pub fn with_query(mut self, query: &str) -> Self {
        self.query = Some(query.to_string());
        self
    }

    pub fn with_upstream_status(mut self, status: u16) -> Self {
        self.upstream_status = Some(status);
        self
    }

    /// JSON error body. The `type` tag keeps the per-tool category callers
    /// key on; `kind` is the structured discriminator.
    pub fn body(&self, tool: Tool) -> serde_json::Value {
        let tag = match self.kind {
            ErrorKind::System => "system_error".to_string(),
            _ => format!("{}_error", tool.tag()),
        };
        let mut body = json!({
            "error": self.message,
            "kind": self.kind,
            "type": tag,
        });
        if let Some(video_id) = &self.video_id {
            body["videoId"] = json!(video_id);
        }
        if let Some(query) = &self.query {
            body["query"] = json!(query);
        }
        if let Some(status) = self.upstream_status {
            body["upstreamStatus"] = json!(status);
        }
        body
    }
}

// ---------------------------------------------------------------------------
// Tool results

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct TranscriptResult {
    pub video_id: String,
    pub language: String,
    pub auto_generated: bool,
    pub transcript: String,
    pub formatted_transcript: String,
    pub length: usize,
    pub word_count: usize,
    pub summary: String,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct VideoInfo {
    pub video_id: String,
    pub title: String,
    pub channel: String,
    pub channel_id: String,
    pub description: String,
    pub published_at: String,
    pub publish_date: String,
    pub duration_seconds: u64,
    pub duration_formatted: String,
    pub view_count: u64,
    pub view_count_formatted: String,
    pub like_count: u64,
    pub like_count_formatted: String,
    pub comment_count: u64,
    pub thumbnail_url: String,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum ResultKind {
    Video,
    Channel,
    Playlist,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct SearchResultItem {
    pub id: String,
    pub kind: ResultKind,
    pub title: String,
    pub channel: String,
    pub channel_id: String,
    pub description: String,
    pub published_at: String,
    pub view_count: Option<u64>,
    pub view_count_formatted: Option<String>,
    pub url: String,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct SearchResults {
    pub query: String,
    pub scope: String,
    pub parameters: crate::search::SearchParameters,
    pub warnings: Vec<String>,
    pub result_count: usize,
    pub results: Vec<SearchResultItem>,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase", tag = "mode")]
pub enum DownloadResult {
    #[serde(rename = "metadata_only")]
    Metadata(DownloadMetadata),
    #[serde(rename = "audio_info")]
    AudioInfo(AudioInfo),
    #[serde(rename = "formats")]
    Formats(FormatCatalogue),
}

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct DownloadMetadata {
    pub video_id: String,
    pub title: String,
    pub uploader: String,
    pub duration_seconds: u64,
    pub duration_formatted: String,
    pub view_count: u64,
    pub view_count_formatted: String,
    pub upload_date: String,
    pub webpage_url: String,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct AudioInfo {
    pub video_id: String,
    pub title: String,
    pub streams: Vec<AudioStream>,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct AudioStream {
    pub format_id: String,
    pub ext: String,
    pub codec: Option<String>,
    pub bitrate: Option<f64>,
    pub filesize: Option<u64>,
    pub filesize_formatted: Option<String>,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct FormatCatalogue {
    pub video_id: String,
    pub title: String,
    pub combined: Vec<FormatEntry>,
    pub video_only: Vec<FormatEntry>,
    pub audio_only: Vec<FormatEntry>,
    pub best_quality: BestQuality,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct FormatEntry {
    pub format_id: String,
    pub ext: String,
    pub resolution: Option<String>,
    pub fps: Option<f64>,
    pub vcodec: Option<String>,
    pub acodec: Option<String>,
    pub bitrate: Option<f64>,
    pub filesize: Option<u64>,
    pub filesize_formatted: Option<String>,
    pub note: Option<String>,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct BestQuality {
    pub best: Option<FormatEntry>,
    pub best_combined: Option<FormatEntry>,
    pub best_audio: Option<FormatEntry>,
}

// ---------------------------------------------------------------------------
// Collaborator-facing types

#[derive(Debug, Clone)]
pub struct PlatformVideo {
    pub video_id: String,
    pub title: String,
    pub channel_title: String,
    pub channel_id: String,
    pub description: String,
    pub published_at: String,
    pub duration: String,
    pub view_count: u64,
    pub like_count: u64,
    pub comment_count: u64,
    pub thumbnail_url: String,
}

#[derive(Debug, Clone)]
pub struct PlatformSearchItem {
    pub id: String,
    pub kind: ResultKind,
    pub title: String,
    pub channel_title: String,
    pub channel_id: String,
    pub description: String,
    pub published_at: String,
    /// View count as the upstream formats it ("123456", "1,234" or "1.2M").
    pub views: Option<String>,
}

#[derive(Debug, Default, Clone)]
pub struct SearchCallOptions {
    pub limit: usize,
    pub order: Option<String>,
    pub video_duration: Option<String>,
    pub result_type: Option<String>,
}

#[derive(Debug, Clone, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct CaptionTrack {
    pub base_url: String,
    pub language_code: String,
    #[serde(default)]
    pub kind: Option<String>,
}

impl CaptionTrack {
    pub fn is_auto_generated(&self) -> bool {
        self.kind.as_deref() == Some("asr")
    }
}

#[derive(Debug, Clone, PartialEq)]
pub struct TranscriptSegment {
    pub text: String,
    pub start: f64,
    pub duration: f64,
}

// ---------------------------------------------------------------------------
// Video-platform API wire types

#[derive(Debug, Deserialize)]
pub struct ApiVideoListResponse {
    #[serde(default)]
    pub items: Vec<ApiVideoItem>,
}

#[derive(Debug, Deserialize)]
pub struct ApiVideoItem {
    #[serde(default)]
    pub id: String,
    #[serde(default)]
    pub snippet: ApiSnippet,
    #[serde(default)]
    pub statistics: Option<ApiStatistics>,
    #[serde(rename = "contentDetails", default)]
    pub content_details: Option<ApiContentDetails>,
}

#[derive(Debug, Default, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ApiSnippet {
    #[serde(default)]
    pub title: String,
    #[serde(default)]
    pub channel_title: String,
    #[serde(default)]
    pub channel_id: String,
    #[serde(default)]
    pub description: String,
    #[serde(default)]
    pub published_at: String,
    #[serde(default)]
    pub thumbnails: ApiThumbnails,
    #[serde(default)]
    pub resource_id: Option<ApiResourceId>,
}

#[derive(Debug, Default, Deserialize)]
pub struct ApiThumbnails {
    #[serde(default)]
    pub high: Option<ApiThumbnail>,
    #[serde(default)]
    pub medium: Option<ApiThumbnail>,
    #[serde(rename = "default", default)]
    pub fallback: Option<ApiThumbnail>,
}

impl ApiThumbnails {
    pub fn best_url(&self) -> String {
        self.high
            .as_ref()
            .or(self.medium.as_ref())
            .or(self.fallback.as_ref())
            .map(|t| t.url.clone())
            .unwrap_or_default()
    }
}

#[derive(Debug, Deserialize)]
pub struct ApiThumbnail {
    pub url: String,
}

#[derive(Debug, Default, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ApiStatistics {
    #[serde(default)]
    pub view_count: String,
    #[serde(default)]
    pub like_count: String,
    #[serde(default)]
    pub comment_count: String,
}

#[derive(Debug, Deserialize)]
pub struct ApiContentDetails {
    #[serde(default)]
    pub duration: String,
}

#[derive(Debug, Default, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ApiResourceId {
    #[serde(default)]
    pub video_id: Option<String>,
}

#[derive(Debug, Deserialize)]
pub struct ApiSearchResponse {
    #[serde(default)]
    pub items: Vec<ApiSearchItem>,
}

#[derive(Debug, Deserialize)]
pub struct ApiSearchItem {
    #[serde(default)]
    pub id: ApiSearchId,
    #[serde(default)]
    pub snippet: ApiSnippet,
}

#[derive(Debug, Default, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ApiSearchId {
    #[serde(default)]
    pub video_id: Option<String>,
    #[serde(default)]
    pub channel_id: Option<String>,
    #[serde(default)]
    pub playlist_id: Option<String>,
}

// ---------------------------------------------------------------------------
// Media-extractor wire types (yt-dlp --dump-single-json)

#[derive(Debug, Clone, Deserialize)]
pub struct MediaProbe {
    pub id: String,
    #[serde(default)]
    pub title: String,
    #[serde(default)]
    pub uploader: String,
    #[serde(default)]
    pub duration: Option<f64>,
    #[serde(default)]
    pub view_count: Option<u64>,
    #[serde(default)]
    pub upload_date: Option<String>,
    #[serde(default)]
    pub webpage_url: Option<String>,
    #[serde(default)]
    pub formats: Vec<RawFormat>,
}

#[derive(Debug, Clone, Default, Deserialize)]
pub struct RawFormat {
    #[serde(default)]
    pub format_id: String,
    #[serde(default)]
    pub ext: String,
    #[serde(default)]
    pub resolution: Option<String>,
    #[serde(default)]
    pub fps: Option<f64>,
    #[serde(default)]
    pub vcodec: Option<String>,
    #[serde(default)]
    pub acodec: Option<String>,
    #[serde(default)]
    pub abr: Option<f64>,
    #[serde(default)]
    pub tbr: Option<f64>,
    #[serde(default)]
    pub filesize: Option<u64>,
    #[serde(default)]
    pub filesize_approx: Option<u64>,
    #[serde(default)]
    pub format_note: Option<String>,
}

#[derive(Debug, Serialize, Deserialize)]
pub struct ErrorResponse {
    pub error: String,
}
