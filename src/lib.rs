pub mod cache;
pub mod captions;
pub mod download;
pub mod format;
pub mod mcp;
pub mod search;
pub mod stdio_service;
pub mod transcript;
pub mod types;
pub mod video_id;
pub mod video_info;
pub mod youtube_api;
pub mod ytdlp;

use std::time::Duration;

use crate::cache::TtlCache;
use crate::captions::CaptionScraper;
use crate::types::{DownloadResult, SearchResults, TranscriptResult, VideoInfo};
use crate::youtube_api::YoutubeApi;
use crate::ytdlp::YtDlp;

pub struct AppState {
    pub platform: YoutubeApi,
    pub captions: CaptionScraper,
    pub extractor: YtDlp,
    pub access_token: Option<String>,
    // Per-tool response caches
    pub transcript_cache: TtlCache<TranscriptResult>,
    pub video_cache: TtlCache<VideoInfo>,
    pub search_cache: TtlCache<SearchResults>,
    pub download_cache: TtlCache<DownloadResult>,
}

// Re-export the shared types for easy access
pub use types::*;

impl AppState {
    pub fn new(
        http_client: reqwest::Client,
        api_key: String,
        ytdlp_path: String,
        access_token: Option<String>,
        cache_ttl: Duration,
    ) -> Self {
        Self {
            platform: YoutubeApi::new(http_client.clone(), api_key),
            captions: CaptionScraper::new(http_client),
            extractor: YtDlp::new(ytdlp_path),
            access_token,
            transcript_cache: TtlCache::new(cache_ttl),
            video_cache: TtlCache::new(cache_ttl),
            search_cache: TtlCache::new(cache_ttl),
            download_cache: TtlCache::new(cache_ttl),
        }
    }
}
