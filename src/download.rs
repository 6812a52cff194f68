use crate::cache::TtlCache;
use crate::format::{format_count, format_duration, format_size};
use crate::types::{
    AudioInfo, AudioStream, BestQuality, DownloadMetadata, DownloadResult, FormatCatalogue,
    FormatEntry, MediaProbe, RawFormat, ToolError,
};
use crate::ytdlp::MediaExtractor;
use crate::{video_id, AppState};
use tracing::{debug, info};

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum DownloadMode {
    MetadataOnly,
    AudioInfo,
    Formats,
}

impl DownloadMode {
    pub fn parse(raw: &str) -> Option<Self> {
        match raw.trim() {
            "metadata_only" => Some(DownloadMode::MetadataOnly),
            "audio_info" => Some(DownloadMode::AudioInfo),
            "formats" => Some(DownloadMode::Formats),
            _ => None,
        }
    }

    pub fn tag(&self) -> &'static str {
        match self {
            DownloadMode::MetadataOnly => "metadata_only",
            DownloadMode::AudioInfo => "audio_info",
            DownloadMode::Formats => "formats",
        }
    }
}

/// Tool-call entry point. Input syntax: `<video URL or ID>[|<mode>]` with
/// mode one of metadata_only, audio_info, formats. An unrecognized mode
/// falls back to metadata_only.
pub async fn run(state: &AppState, input: &str) -> Result<DownloadResult, ToolError> {
    let (reference, mode) = match input.split_once('|') {
        Some((reference, mode)) => (
            reference,
            DownloadMode::parse(mode).unwrap_or(DownloadMode::MetadataOnly),
        ),
        None => (input, DownloadMode::MetadataOnly),
    };
    fetch_download_info(&state.extractor, &state.download_cache, reference, mode).await
}

pub async fn fetch_download_info<M: MediaExtractor>(
    extractor: &M,
    cache: &TtlCache<DownloadResult>,
    reference: &str,
    mode: DownloadMode,
) -> Result<DownloadResult, ToolError> {
    let video_id = video_id::extract(reference)?;
    let cache_key = format!("{}|{}", video_id, mode.tag());
    if let Some(hit) = cache.get(&cache_key).await {
        debug!("download info cache hit for {}", cache_key);
        return Ok(hit);
    }

    let probe = extractor.probe(&video_id).await.map_err(|e| {
        ToolError::upstream(format!("Media extractor failed: {}", e)).with_video_id(&video_id)
    })?;
    info!(
        "Probed {}: {} raw formats",
        video_id,
        probe.formats.len()
    );

    let result = match mode {
        DownloadMode::MetadataOnly => DownloadResult::Metadata(shape_metadata(&video_id, &probe)),
        DownloadMode::AudioInfo => DownloadResult::AudioInfo(shape_audio(&video_id, &probe)),
        DownloadMode::Formats => DownloadResult::Formats(shape_formats(&video_id, &probe)),
    };
    cache.set(cache_key, result.clone()).await;
    Ok(result)
}

fn shape_metadata(video_id: &str, probe: &MediaProbe) -> DownloadMetadata {
    let duration_seconds = probe.duration.unwrap_or(0.0).max(0.0) as u64;
    let view_count = probe.view_count.unwrap_or(0);
    DownloadMetadata {
        video_id: video_id.to_string(),
        title: probe.title.clone(),
        uploader: probe.uploader.clone(),
        duration_seconds,
        duration_formatted: format_duration(duration_seconds),
        view_count,
        view_count_formatted: format_count(view_count),
        upload_date: probe.upload_date.clone().unwrap_or_default(),
        webpage_url: probe
            .webpage_url
            .clone()
            .unwrap_or_else(|| format!("https://www.youtube.com/watch?v={}", video_id)),
    }
}

fn shape_audio(video_id: &str, probe: &MediaProbe) -> AudioInfo {
    let streams = probe
        .formats
        .iter()
        .filter(|f| classify(f) == Some(Bucket::AudioOnly))
        .map(|f| {
            let filesize = f.filesize.or(f.filesize_approx);
            AudioStream {
                format_id: f.format_id.clone(),
                ext: f.ext.clone(),
                codec: f.acodec.clone(),
                bitrate: f.abr,
                filesize,
                filesize_formatted: filesize.map(format_size),
            }
        })
        .collect();
    AudioInfo {
        video_id: video_id.to_string(),
        title: probe.title.clone(),
        streams,
    }
}

fn shape_formats(video_id: &str, probe: &MediaProbe) -> FormatCatalogue {
    let mut combined = Vec::new();
    let mut video_only = Vec::new();
    let mut audio_only = Vec::new();
    let mut playable: Vec<&RawFormat> = Vec::new();

    for format in &probe.formats {
        let Some(bucket) = classify(format) else {
            continue;
        };
        playable.push(format);
        let entry = format_entry(format);
        match bucket {
            Bucket::Combined => combined.push(entry),
            Bucket::VideoOnly => video_only.push(entry),
            Bucket::AudioOnly => audio_only.push(entry),
        }
    }

    // The extractor lists formats in ascending quality order, so "best" is
    // the last playable entry. Best audio goes by audio bitrate instead.
    let best = playable.last().copied().map(format_entry);
    let best_combined = combined.last().cloned();
    let best_audio = probe
        .formats
        .iter()
        .filter(|f| classify(f) == Some(Bucket::AudioOnly))
        .max_by(|a, b| {
            a.abr
                .unwrap_or(0.0)
                .partial_cmp(&b.abr.unwrap_or(0.0))
                .unwrap_or(std::cmp::Ordering::Equal)
        })
        .map(format_entry);

    FormatCatalogue {
        video_id: video_id.to_string(),
        title: probe.title.clone(),
        combined,
        video_only,
        audio_only,
        best_quality: BestQuality {
            best,
            best_combined,
            best_audio,
        },
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum Bucket {
    Combined,
    VideoOnly,
    AudioOnly,
}

/// Partition rule: "audio only" resolutions and codec-less video land in the
/// audio bucket, codec-less audio in the video bucket, both codecs present
/// in combined. Entries with neither codec (storyboards) are dropped.
fn classify(format: &RawFormat) -> Option<Bucket> {
    let no_video = matches!(format.vcodec.as_deref(), None | Some("none"));
    let no_audio = matches!(format.acodec.as_deref(), None | Some("none"));
    if format.resolution.as_deref() == Some("audio only") || (no_video && !no_audio) {
        Some(Bucket::AudioOnly)
    } else if no_audio && !no_video {
        Some(Bucket::VideoOnly)
    } else if !no_video && !no_audio {
        Some(Bucket::Combined)
    } else {
        None
    }
}

fn format_entry(format: &RawFormat) -> FormatEntry {
    let filesize = format.filesize.or(format.filesize_approx);
    FormatEntry {
        format_id: format.format_id.clone(),
        ext: format.ext.clone(),
        resolution: format.resolution.clone(),
        fps: format.fps,
        vcodec: format.vcodec.clone(),
        acodec: format.acodec.clone(),
        bitrate: format.tbr,
        filesize,
        filesize_formatted: filesize.map(format_size),
        note: format.format_note.clone(),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::types::ErrorKind;
    use async_trait::async_trait;
    use std::sync::atomic::{AtomicUsize, Ordering};
    use std::time::Duration;

    struct MockExtractor {
        probe: MediaProbe,
        calls: AtomicUsize,
    }

    impl MockExtractor {
        fn new(probe: MediaProbe) -> Self {
            Self {
                probe,
                calls: AtomicUsize::new(0),
            }
        }
    }

    #[async_trait]
    impl MediaExtractor for MockExtractor {
        async fn probe(&self, _video_id: &str) -> anyhow::Result<MediaProbe> {
            self.calls.fetch_add(1, Ordering::SeqCst);
            Ok(self.probe.clone())
        }
    }

    fn raw(
        format_id: &str,
        resolution: Option<&str>,
        vcodec: Option<&str>,
        acodec: Option<&str>,
        abr: Option<f64>,
    ) -> RawFormat {
        RawFormat {
            format_id: format_id.to_string(),
            ext: "mp4".to_string(),
            resolution: resolution.map(String::from),
            vcodec: vcodec.map(String::from),
            acodec: acodec.map(String::from),
            abr,
            ..Default::default()
        }
    }

    fn sample_probe() -> MediaProbe {
        MediaProbe {
            id: "dQw4w9WgXcQ".to_string(),
            title: "Sample".to_string(),
            uploader: "Uploader".to_string(),
            duration: Some(212.0),
            view_count: Some(1_500_000),
            upload_date: Some("20211025".to_string()),
            webpage_url: Some("https://www.youtube.com/watch?v=dQw4w9WgXcQ".to_string()),
            formats: vec![
                raw("sb0", None, Some("none"), Some("none"), None),
                raw("140", Some("audio only"), Some("none"), Some("mp4a.40.2"), Some(129.5)),
                raw("251", Some("audio only"), Some("none"), Some("opus"), Some(160.0)),
                raw("137", Some("1920x1080"), Some("avc1"), Some("none"), None),
                raw("18", Some("640x360"), Some("avc1"), Some("mp4a.40.2"), Some(96.0)),
                raw("22", Some("1280x720"), Some("avc1"), Some("mp4a.40.2"), Some(192.0)),
            ],
        }
    }

    #[tokio::test]
    async fn formats_are_partitioned_by_codec_presence() {
        let extractor = MockExtractor::new(sample_probe());
        let cache = TtlCache::new(Duration::from_secs(3600));

        let result =
            fetch_download_info(&extractor, &cache, "dQw4w9WgXcQ", DownloadMode::Formats)
                .await
                .unwrap();
        let DownloadResult::Formats(catalogue) = result else {
            panic!("expected format catalogue");
        };
        let ids = |entries: &[FormatEntry]| {
            entries.iter().map(|e| e.format_id.clone()).collect::<Vec<_>>()
        };
        assert_eq!(ids(&catalogue.audio_only), ["140", "251"]);
        assert_eq!(ids(&catalogue.video_only), ["137"]);
        assert_eq!(ids(&catalogue.combined), ["18", "22"]);
    }

    #[tokio::test]
    async fn best_quality_selection() {
        let extractor = MockExtractor::new(sample_probe());
        let cache = TtlCache::new(Duration::from_secs(3600));

        let result =
            fetch_download_info(&extractor, &cache, "dQw4w9WgXcQ", DownloadMode::Formats)
                .await
                .unwrap();
        let DownloadResult::Formats(catalogue) = result else {
            panic!("expected format catalogue");
        };
        // Last playable entry overall and per bucket; audio by max bitrate.
        assert_eq!(catalogue.best_quality.best.unwrap().format_id, "22");
        assert_eq!(catalogue.best_quality.best_combined.unwrap().format_id, "22");
        assert_eq!(catalogue.best_quality.best_audio.unwrap().format_id, "251");
    }

    #[tokio::test]
    async fn audio_mode_lists_only_audio_streams() {
        let extractor = MockExtractor::new(sample_probe());
        let cache = TtlCache::new(Duration::from_secs(3600));

        let result =
            fetch_download_info(&extractor, &cache, "dQw4w9WgXcQ", DownloadMode::AudioInfo)
                .await
                .unwrap();
        let DownloadResult::AudioInfo(info) = result else {
            panic!("expected audio info");
        };
        assert_eq!(info.streams.len(), 2);
        assert_eq!(info.streams[0].format_id, "140");
        assert_eq!(info.streams[0].codec.as_deref(), Some("mp4a.40.2"));
    }

    #[tokio::test]
    async fn metadata_mode_formats_counts_and_duration() {
        let extractor = MockExtractor::new(sample_probe());
        let cache = TtlCache::new(Duration::from_secs(3600));

        let result = fetch_download_info(
            &extractor,
            &cache,
            "https://youtu.be/dQw4w9WgXcQ",
            DownloadMode::MetadataOnly,
        )
        .await
        .unwrap();
        let DownloadResult::Metadata(metadata) = result else {
            panic!("expected metadata");
        };
        assert_eq!(metadata.duration_formatted, "3:32");
        assert_eq!(metadata.view_count_formatted, "1.5M");
        assert_eq!(metadata.upload_date, "20211025");
    }

    #[tokio::test]
    async fn each_mode_has_its_own_cache_key() {
        let extractor = MockExtractor::new(sample_probe());
        let cache = TtlCache::new(Duration::from_secs(3600));

        fetch_download_info(&extractor, &cache, "dQw4w9WgXcQ", DownloadMode::MetadataOnly)
            .await
            .unwrap();
        fetch_download_info(&extractor, &cache, "dQw4w9WgXcQ", DownloadMode::MetadataOnly)
            .await
            .unwrap();
        assert_eq!(extractor.calls.load(Ordering::SeqCst), 1);

        fetch_download_info(&extractor, &cache, "dQw4w9WgXcQ", DownloadMode::Formats)
            .await
            .unwrap();
        assert_eq!(extractor.calls.load(Ordering::SeqCst), 2);
    }

    #[tokio::test]
    async fn invalid_reference_skips_the_extractor() {
        let extractor = MockExtractor::new(sample_probe());
        let cache = TtlCache::new(Duration::from_secs(3600));

        let err = fetch_download_info(&extractor, &cache, "???", DownloadMode::Formats)
            .await
            .unwrap_err();
        assert_eq!(err.kind, ErrorKind::InvalidReference);
        assert_eq!(extractor.calls.load(Ordering::SeqCst), 0);
    }
}
