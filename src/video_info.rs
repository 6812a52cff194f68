use crate::cache::TtlCache;
use crate::format::{
    clean_description, clean_title, format_count, format_duration, format_upload_date,
    parse_iso8601_duration,
};
use crate::types::{PlatformVideo, ToolError, VideoInfo};
use crate::youtube_api::VideoPlatform;
use crate::{video_id, AppState};
use tracing::debug;

/// Tool-call entry point. Input is a video URL or ID; no mode suffix.
pub async fn run(state: &AppState, input: &str) -> Result<VideoInfo, ToolError> {
    let reference = input.split('|').next().unwrap_or(input);
    fetch_video_info(&state.platform, &state.video_cache, reference).await
}

pub async fn fetch_video_info<P: VideoPlatform>(
    platform: &P,
    cache: &TtlCache<VideoInfo>,
    reference: &str,
) -> Result<VideoInfo, ToolError> {
    let video_id = video_id::extract(reference)?;
    if let Some(hit) = cache.get(&video_id).await {
        debug!("video info cache hit for {}", video_id);
        return Ok(hit);
    }

    let video = platform
        .video_details(&video_id)
        .await
        .map_err(|e| {
            ToolError::upstream(format!("Failed to fetch video details: {}", e))
                .with_video_id(&video_id)
        })?
        .ok_or_else(|| ToolError::not_found("Video not found").with_video_id(&video_id))?;

    let info = shape_video(video);
    cache.set(video_id, info.clone()).await;
    Ok(info)
}

fn shape_video(video: PlatformVideo) -> VideoInfo {
    let duration_seconds = parse_iso8601_duration(&video.duration);
    VideoInfo {
        video_id: video.video_id,
        title: clean_title(&video.title),
        channel: video.channel_title,
        channel_id: video.channel_id,
        description: clean_description(&video.description),
        publish_date: format_upload_date(&video.published_at),
        published_at: video.published_at,
        duration_seconds,
        duration_formatted: format_duration(duration_seconds),
        view_count: video.view_count,
        view_count_formatted: format_count(video.view_count),
        like_count: video.like_count,
        like_count_formatted: format_count(video.like_count),
        comment_count: video.comment_count,
        thumbnail_url: video.thumbnail_url,
    }
}
