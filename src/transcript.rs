use crate::cache::TtlCache;
use crate::captions::TranscriptSource;
use crate::format::timestamp_tag;
use crate::types::{CaptionTrack, ToolError, TranscriptResult, TranscriptSegment};
use crate::{video_id, AppState};
use regex::Regex;
use tracing::{debug, info, warn};

pub const DEFAULT_LANGUAGE: &str = "en";
const SUMMARY_WORDS: usize = 100;

/// Tool-call entry point. Input syntax: `<video URL or ID>[|<language>]`.
pub async fn run(state: &AppState, input: &str) -> Result<TranscriptResult, ToolError> {
    let (reference, language) = match input.split_once('|') {
        Some((reference, language)) => {
            let language = language.trim();
            (reference, (!language.is_empty()).then_some(language))
        }
        None => (input, None),
    };
    fetch_transcript(&state.captions, &state.transcript_cache, reference, language).await
}

pub async fn fetch_transcript<S: TranscriptSource>(
    source: &S,
    cache: &TtlCache<TranscriptResult>,
    reference: &str,
    language: Option<&str>,
) -> Result<TranscriptResult, ToolError> {
    let video_id = video_id::extract(reference)?;
    let language = language.unwrap_or(DEFAULT_LANGUAGE);
    let cache_key = format!("{}|{}", video_id, language);
    if let Some(hit) = cache.get(&cache_key).await {
        debug!("transcript cache hit for {}", cache_key);
        return Ok(hit);
    }

    let tracks = source.list_tracks(&video_id).await.map_err(|e| {
        ToolError::upstream(format!("Failed to list transcript tracks: {}", e))
            .with_video_id(&video_id)
    })?;
    if tracks.is_empty() {
        return Err(
            ToolError::not_found("No transcript available for this video").with_video_id(&video_id)
        );
    }

    let mut chosen: Option<(&CaptionTrack, Vec<TranscriptSegment>)> = None;
    if let Some(track) = tracks.iter().find(|t| matches_language(t, language)) {
        match source.fetch_track(track).await {
            Ok(segments) if !segments.is_empty() => chosen = Some((track, segments)),
            Ok(_) => warn!("'{}' track for {} was empty", language, video_id),
            Err(e) => warn!("Fetching '{}' track for {} failed: {}", language, video_id, e),
        }
    }
    // Requested language unavailable: substitute an auto-generated track.
    if chosen.is_none() {
        if let Some(track) = tracks.iter().find(|t| t.is_auto_generated()) {
            let segments = source.fetch_track(track).await.map_err(|e| {
                ToolError::upstream(format!("Failed to fetch transcript track: {}", e))
                    .with_video_id(&video_id)
            })?;
            if !segments.is_empty() {
                chosen = Some((track, segments));
            }
        }
    }
    let Some((track, segments)) = chosen else {
        return Err(ToolError::not_found(format!(
            "No transcript found for language '{}'",
            language
        ))
        .with_video_id(&video_id));
    };

    info!(
        "Built transcript for {} from {} segments",
        video_id,
        segments.len()
    );
    let result = shape_transcript(&video_id, track, &segments);
    cache.set(cache_key, result.clone()).await;
    Ok(result)
}

fn matches_language(track: &CaptionTrack, language: &str) -> bool {
    track.language_code == language
        || track
            .language_code
            .strip_prefix(language)
            .is_some_and(|rest| rest.starts_with('-'))
}

/// Two renderings of the same spoken content: a flattened string and one
/// with a `[m:ss]` marker inserted whenever the floored minute advances.
fn shape_transcript(
    video_id: &str,
    track: &CaptionTrack,
    segments: &[TranscriptSegment],
) -> TranscriptResult {
    let noise = Regex::new(r"\[[^\]]*\]").unwrap();
    let mut plain_parts: Vec<String> = Vec::new();
    let mut formatted = String::new();
    let mut last_minute: i64 = -1;

    for segment in segments {
        let cleaned = noise.replace_all(&segment.text, " ");
        let cleaned = cleaned.split_whitespace().collect::<Vec<_>>().join(" ");
        if cleaned.is_empty() {
            continue;
        }
        let minute = (segment.start / 60.0).floor() as i64;
        if minute > last_minute {
            if !formatted.is_empty() {
                formatted.push(' ');
            }
            formatted.push_str(&timestamp_tag(segment.start));
            last_minute = minute;
        }
        formatted.push(' ');
        formatted.push_str(&cleaned);
        plain_parts.push(cleaned);
    }

    let transcript = plain_parts.join(" ");
    let words: Vec<&str> = transcript.split_whitespace().collect();
    let summary = if words.len() > SUMMARY_WORDS {
        format!("{}...", words[..SUMMARY_WORDS].join(" "))
    } else {
        transcript.clone()
    };

    TranscriptResult {
        video_id: video_id.to_string(),
        language: track.language_code.clone(),
        auto_generated: track.is_auto_generated(),
        length: transcript.chars().count(),
        word_count: words.len(),
        summary,
        formatted_transcript: formatted.trim_start().to_string(),
        transcript,
    }
}
