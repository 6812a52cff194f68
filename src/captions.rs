use crate::types::{CaptionTrack, TranscriptSegment};
use anyhow::{anyhow, Result};
use async_trait::async_trait;
use rand::Rng;
use regex::Regex;
use tracing::{debug, info};
use url::Url;

/// User agents for rotation
const USER_AGENTS: &[&str] = &[
    "Mozilla/5.0 (Windows NT 10.0; Win64; x64) AppleWebKit/537.36 (KHTML, like Gecko) Chrome/120.0.0.0 Safari/537.36",
    "Mozilla/5.0 (Macintosh; Intel Mac OS X 10_15_7) AppleWebKit/537.36 (KHTML, like Gecko) Chrome/120.0.0.0 Safari/537.36",
    "Mozilla/5.0 (Windows NT 10.0; Win64; x64; rv:121.0) Gecko/20100101 Firefox/121.0",
    "Mozilla/5.0 (X11; Linux x86_64) AppleWebKit/537.36 (KHTML, like Gecko) Chrome/120.0.0.0 Safari/537.36",
];

/// Contract with the transcript source.
#[async_trait]
pub trait TranscriptSource: Send + Sync {
    /// Available caption tracks for a video; empty when the video has none.
    async fn list_tracks(&self, video_id: &str) -> Result<Vec<CaptionTrack>>;

    /// Timed segments for one track.
    async fn fetch_track(&self, track: &CaptionTrack) -> Result<Vec<TranscriptSegment>>;
}

/// Scrapes the watch page for its caption track catalog, then pulls the
/// timed-text payload for the chosen track.
pub struct CaptionScraper {
    client: reqwest::Client,
}

impl CaptionScraper {
    pub fn new(client: reqwest::Client) -> Self {
        Self { client }
    }

    fn random_user_agent(&self) -> &'static str {
        let mut rng = rand::thread_rng();
        USER_AGENTS[rng.gen_range(0..USER_AGENTS.len())]
    }
}

#[async_trait]
impl TranscriptSource for CaptionScraper {
    async fn list_tracks(&self, video_id: &str) -> Result<Vec<CaptionTrack>> {
        let url = format!("https://www.youtube.com/watch?v={}", video_id);
        debug!("Fetching watch page: {}", url);

        let response = self
            .client
            .get(&url)
            .header("User-Agent", self.random_user_agent())
            .header("Accept-Language", "en-US,en;q=0.5")
            .send()
            .await
            .map_err(|e| anyhow!("Failed to fetch watch page: {}", e))?;
        if !response.status().is_success() {
            return Err(anyhow!(
                "Watch page request failed with status {}",
                response.status()
            ));
        }
        let page = response
            .text()
            .await
            .map_err(|e| anyhow!("Failed to read watch page body: {}", e))?;

        let Some(array) = extract_json_array(&page, "\"captionTracks\":") else {
            return Ok(Vec::new());
        };
        let tracks: Vec<CaptionTrack> = serde_json::from_str(array)
            .map_err(|e| anyhow!("Failed to parse caption track list: {}", e))?;
        info!("Found {} caption tracks for {}", tracks.len(), video_id);
        Ok(tracks)
    }

    async fn fetch_track(&self, track: &CaptionTrack) -> Result<Vec<TranscriptSegment>> {
        let url = Url::parse(&track.base_url)
            .map_err(|e| anyhow!("Invalid caption track URL: {}", e))?;
        let response = self
            .client
            .get(url)
            .header("User-Agent", self.random_user_agent())
            .send()
            .await
            .map_err(|e| anyhow!("Failed to fetch caption track: {}", e))?;
        if !response.status().is_success() {
            return Err(anyhow!(
                "Caption track request failed with status {}",
                response.status()
            ));
        }
        let xml = response
            .text()
            .await
            .map_err(|e| anyhow!("Failed to read caption track body: {}", e))?;
        Ok(parse_timed_text(&xml))
    }
}

/// Locate the JSON array following `marker` in the page source, balancing
/// brackets so nested objects survive. Returns the raw slice.
fn extract_json_array<'a>(page: &'a str, marker: &str) -> Option<&'a str> {
    let start = page.find(marker)? + marker.len();
    let slice = &page[start..];
    let open = slice.find('[')?;
    let mut depth = 0usize;
    let mut in_string = false;
    let mut escaped = false;
    for (i, c) in slice[open..].char_indices() {
        if in_string {
            if escaped {
                escaped = false;
            } else if c == '\\' {
                escaped = true;
            } else if c == '"' {
                in_string = false;
            }
            continue;
        }
        match c {
            '"' => in_string = true,
            '[' => depth += 1,
            ']' => {
                depth -= 1;
                if depth == 0 {
                    return Some(&slice[open..open + i + 1]);
                }
            }
            _ => {}
        }
    }
    None
}

/// Timed-text XML -> segments. The payload is the srv1-style
/// `<text start=".." dur="..">..</text>` stream.
fn parse_timed_text(xml: &str) -> Vec<TranscriptSegment> {
    let re = Regex::new(r#"(?s)<text start="([0-9.]+)"(?: dur="([0-9.]+)")?[^>]*>(.*?)</text>"#)
        .unwrap();
    re.captures_iter(xml)
        .filter_map(|caps| {
            let start: f64 = caps[1].parse().ok()?;
            let duration = caps
                .get(2)
                .and_then(|m| m.as_str().parse().ok())
                .unwrap_or(0.0);
            let text = decode_caption_text(&caps[3]);
            if text.is_empty() {
                None
            } else {
                Some(TranscriptSegment {
                    text,
                    start,
                    duration,
                })
            }
        })
        .collect()
}

fn decode_caption_text(raw: &str) -> String {
    let stripped = Regex::new(r"<[^>]+>").unwrap().replace_all(raw, " ");
    let decoded = html_escape::decode_html_entities(&stripped);
    // Caption payloads frequently double-encode entities ("&amp;#39;").
    let decoded = html_escape::decode_html_entities(decoded.as_ref()).to_string();
    decoded.split_whitespace().collect::<Vec<_>>().join(" ")
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn extracts_track_array_from_page_source() {
        let page = r#"...,"captions":{"playerCaptionsTracklistRenderer":{"captionTracks":[{"baseUrl":"https://example.com/t?lang=en","languageCode":"en","kind":"asr","name":{"simpleText":"English [auto]"}}],"audioTracks":[]}},..."#;
        let array = extract_json_array(page, "\"captionTracks\":").unwrap();
        let tracks: Vec<CaptionTrack> = serde_json::from_str(array).unwrap();
        assert_eq!(tracks.len(), 1);
        assert_eq!(tracks[0].language_code, "en");
        assert!(tracks[0].is_auto_generated());
    }

    #[test]
    fn missing_marker_means_no_tracks() {
        assert!(extract_json_array("<html>no captions here</html>", "\"captionTracks\":").is_none());
    }

    #[test]
    fn timed_text_parsing_decodes_entities() {
        let xml = r#"<?xml version="1.0"?><transcript>
<text start="0.0" dur="2.5">hello &amp;#39;world&amp;#39;</text>
<text start="2.5" dur="1.0">second   line</text>
<text start="3.5">no duration</text>
</transcript>"#;
        let segments = parse_timed_text(xml);
        assert_eq!(segments.len(), 3);
        assert_eq!(segments[0].text, "hello 'world'");
        assert_eq!(segments[0].start, 0.0);
        assert_eq!(segments[0].duration, 2.5);
        assert_eq!(segments[1].text, "second line");
        assert_eq!(segments[2].duration, 0.0);
    }
}
