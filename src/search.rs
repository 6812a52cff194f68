use crate::cache::TtlCache;
use crate::format::{clean_title, format_count, parse_view_count};
use crate::types::{
    PlatformSearchItem, ResultKind, SearchCallOptions, SearchResultItem, SearchResults, ToolError,
};
use crate::youtube_api::VideoPlatform;
use crate::AppState;
use chrono::{DateTime, Duration as ChronoDuration, Utc};
use serde::{Deserialize, Serialize};
use tracing::{debug, info};

pub const MAX_RESULTS: usize = 20;
pub const DEFAULT_RESULTS: usize = 5;
const RECENT_WINDOW_DAYS: i64 = 2 * 365;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum SortOrder {
    Relevance,
    Date,
    Views,
    Rating,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum DurationFilter {
    Short,
    Medium,
    Long,
}

impl DurationFilter {
    fn api_value(&self) -> &'static str {
        match self {
            DurationFilter::Short => "short",
            DurationFilter::Medium => "medium",
            DurationFilter::Long => "long",
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct SearchParameters {
    pub count: usize,
    pub sort: SortOrder,
    pub recent: bool,
    pub min_views: u64,
    pub duration: Option<DurationFilter>,
}

impl Default for SearchParameters {
    fn default() -> Self {
        Self {
            count: DEFAULT_RESULTS,
            sort: SortOrder::Relevance,
            recent: false,
            min_views: 0,
            duration: None,
        }
    }
}

/// Parse `key=value` tokens into search parameters. Invalid or unknown
/// tokens never fail the call; they surface in the returned warnings list
/// and the defaults stand.
pub fn parse_parameters<'a, I>(tokens: I) -> (SearchParameters, Vec<String>)
where
    I: IntoIterator<Item = &'a str>,
{
    let mut params = SearchParameters::default();
    let mut warnings = Vec::new();

    for token in tokens {
        let token = token.trim();
        if token.is_empty() {
            continue;
        }
        let Some((key, value)) = token.split_once('=') else {
            warnings.push(format!("ignored token '{}'", token));
            continue;
        };
        let key = key.trim().to_ascii_lowercase().replace('_', "");
        let value = value.trim();
        match key.as_str() {
            "count" => match value.parse::<usize>() {
                Ok(count) => params.count = count.min(MAX_RESULTS),
                Err(_) => warnings.push(format!("invalid count '{}'", value)),
            },
            "sort" => match value.to_ascii_lowercase().as_str() {
                "relevance" => params.sort = SortOrder::Relevance,
                "date" => params.sort = SortOrder::Date,
                "views" => params.sort = SortOrder::Views,
                "rating" => params.sort = SortOrder::Rating,
                other => warnings.push(format!("invalid sort '{}'", other)),
            },
            "recent" => match value.to_ascii_lowercase().as_str() {
                "true" | "1" => params.recent = true,
                "false" | "0" => params.recent = false,
                other => warnings.push(format!("invalid recent flag '{}'", other)),
            },
            "minviews" => match value.parse::<u64>() {
                Ok(min_views) => params.min_views = min_views,
                Err(_) => warnings.push(format!("invalid minViews '{}'", value)),
            },
            "duration" => match value.to_ascii_lowercase().as_str() {
                "short" => params.duration = Some(DurationFilter::Short),
                "medium" => params.duration = Some(DurationFilter::Medium),
                "long" => params.duration = Some(DurationFilter::Long),
                "none" => params.duration = None,
                other => warnings.push(format!("invalid duration '{}'", other)),
            },
            other => warnings.push(format!("unknown parameter '{}'", other)),
        }
    }

    (params, warnings)
}

/// The three query forms the discovery tool accepts.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum QueryScope {
    Search(String),
    Channel(String),
    Playlist(String),
}

impl QueryScope {
    fn tag(&self) -> &'static str {
        match self {
            QueryScope::Search(_) => "search",
            QueryScope::Channel(_) => "channel",
            QueryScope::Playlist(_) => "playlist",
        }
    }
}

pub fn parse_scope(raw: &str) -> QueryScope {
    let raw = raw.trim();
    if let Some(id) = raw.strip_prefix("channel:") {
        QueryScope::Channel(id.trim().to_string())
    } else if let Some(id) = raw.strip_prefix("playlist:") {
        QueryScope::Playlist(id.trim().to_string())
    } else {
        QueryScope::Search(raw.to_string())
    }
}

/// Tool-call entry point. Input syntax:
/// `<query>[|key=value, key=value, ...]` where the query may carry a
/// `channel:` or `playlist:` prefix.
pub async fn run(state: &AppState, input: &str) -> Result<SearchResults, ToolError> {
    let mut parts = input.split('|');
    let query = parts.next().unwrap_or("").trim().to_string();
    let tokens: Vec<&str> = parts.flat_map(|p| p.split(',')).collect();
    let (params, warnings) = parse_parameters(tokens);
    search_videos(
        &state.platform,
        &state.search_cache,
        &query,
        params,
        warnings,
        None,
    )
    .await
}

pub async fn search_videos<P: VideoPlatform>(
    platform: &P,
    cache: &TtlCache<SearchResults>,
    raw_query: &str,
    params: SearchParameters,
    warnings: Vec<String>,
    result_type: Option<String>,
) -> Result<SearchResults, ToolError> {
    let raw_query = raw_query.trim();
    if raw_query.is_empty() {
        return Err(ToolError::invalid("Missing search query"));
    }
    let scope = parse_scope(raw_query);
    let cache_key = format!(
        "{}|{}|{}",
        raw_query,
        serde_json::to_string(&params).unwrap_or_default(),
        result_type.as_deref().unwrap_or("video")
    );
    if let Some(hit) = cache.get(&cache_key).await {
        debug!("search cache hit for {}", cache_key);
        return Ok(hit);
    }

    let items = match &scope {
        QueryScope::Channel(id) => platform.channel_uploads(id, params.count).await,
        QueryScope::Playlist(id) => platform.playlist_items(id, params.count).await,
        QueryScope::Search(q) => {
            let options = SearchCallOptions {
                limit: params.count,
                // Native ordering covers relevance and rating; date and
                // views re-sort client-side below.
                order: match params.sort {
                    SortOrder::Rating => Some("rating".to_string()),
                    _ => None,
                },
                video_duration: params.duration.map(|d| d.api_value().to_string()),
                result_type,
            };
            platform.search(q, &options).await
        }
    }
    .map_err(|e| ToolError::upstream(format!("Search failed: {}", e)).with_query(raw_query))?;

    info!("Search '{}' returned {} items", raw_query, items.len());
    let mut results: Vec<SearchResultItem> = items.into_iter().map(shape_item).collect();

    // Post-filters the upstream search call does not offer.
    if matches!(scope, QueryScope::Search(_)) {
        apply_post_filters(&mut results, &params);
    }
    results.truncate(params.count);

    if results.is_empty() {
        return Err(
            ToolError::not_found(format!("No results found for '{}'", raw_query))
                .with_query(raw_query),
        );
    }

    let payload = SearchResults {
        query: raw_query.to_string(),
        scope: scope.tag().to_string(),
        parameters: params,
        warnings,
        result_count: results.len(),
        results,
    };
    cache.set(cache_key, payload.clone()).await;
    Ok(payload)
}

fn shape_item(item: PlatformSearchItem) -> SearchResultItem {
    let view_count = item.views.as_deref().map(parse_view_count);
    SearchResultItem {
        url: resource_url(&item.id, item.kind),
        kind: item.kind,
        title: clean_title(&item.title),
        channel: item.channel_title,
        channel_id: item.channel_id,
        description: item.description,
        published_at: item.published_at,
        view_count,
        view_count_formatted: view_count.map(format_count),
        id: item.id,
    }
}

fn resource_url(id: &str, kind: ResultKind) -> String {
    match kind {
        ResultKind::Video => format!("https://www.youtube.com/watch?v={}", id),
        ResultKind::Channel => format!("https://www.youtube.com/channel/{}", id),
        ResultKind::Playlist => format!("https://www.youtube.com/playlist?list={}", id),
    }
}

fn apply_post_filters(results: &mut Vec<SearchResultItem>, params: &SearchParameters) {
    if params.recent {
        let cutoff = Utc::now() - ChronoDuration::days(RECENT_WINDOW_DAYS);
        results.retain(|item| match DateTime::parse_from_rfc3339(&item.published_at) {
            Ok(published) => published.with_timezone(&Utc) >= cutoff,
            // Unknown age: keep
            Err(_) => true,
        });
    }
    if params.min_views > 0 {
        results.retain(|item| item.view_count.unwrap_or(0) >= params.min_views);
    }
    match params.sort {
        // RFC 3339 timestamps sort lexicographically
        SortOrder::Date => results.sort_by(|a, b| b.published_at.cmp(&a.published_at)),
        SortOrder::Views => {
            results.sort_by(|a, b| b.view_count.unwrap_or(0).cmp(&a.view_count.unwrap_or(0)))
        }
        SortOrder::Relevance | SortOrder::Rating => {}
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::types::ErrorKind;
    use async_trait::async_trait;
    use std::sync::atomic::{AtomicUsize, Ordering};
    use std::time::Duration;

    #[test]
    fn parses_the_delimited_parameter_list() {
        let (params, warnings) = parse_parameters(vec!["count=10", " sort=views", " recent=true"]);
        assert_eq!(params.count, 10);
        assert_eq!(params.sort, SortOrder::Views);
        assert!(params.recent);
        assert_eq!(params.min_views, 0);
        assert_eq!(params.duration, None);
        assert!(warnings.is_empty());
    }

    #[test]
    fn count_is_clamped_and_bad_tokens_warn() {
        let (params, warnings) =
            parse_parameters(vec!["count=50", "count=abc", "flavor=spicy", "sort"]);
        assert_eq!(params.count, MAX_RESULTS);
        assert_eq!(warnings.len(), 3);
        assert!(warnings.iter().any(|w| w.contains("invalid count")));
        assert!(warnings.iter().any(|w| w.contains("unknown parameter 'flavor'")));
        assert!(warnings.iter().any(|w| w.contains("ignored token 'sort'")));
    }

    #[test]
    fn key_matching_tolerates_case_and_underscores() {
        let (params, warnings) = parse_parameters(vec!["min_views=1000", "Duration=short"]);
        assert_eq!(params.min_views, 1000);
        assert_eq!(params.duration, Some(DurationFilter::Short));
        assert!(warnings.is_empty());
    }

    #[test]
    fn query_scopes() {
        assert_eq!(
            parse_scope("channel:UC123"),
            QueryScope::Channel("UC123".to_string())
        );
        assert_eq!(
            parse_scope("playlist:PL456"),
            QueryScope::Playlist("PL456".to_string())
        );
        assert_eq!(parse_scope("cats"), QueryScope::Search("cats".to_string()));
    }

    struct MockPlatform {
        items: Vec<PlatformSearchItem>,
        search_calls: AtomicUsize,
        channel_calls: AtomicUsize,
    }

    impl MockPlatform {
        fn new(items: Vec<PlatformSearchItem>) -> Self {
            Self {
                items,
                search_calls: AtomicUsize::new(0),
                channel_calls: AtomicUsize::new(0),
            }
        }
    }

    #[async_trait]
    impl VideoPlatform for MockPlatform {
        async fn video_details(
            &self,
            _video_id: &str,
        ) -> anyhow::Result<Option<crate::types::PlatformVideo>> {
            unimplemented!("not exercised by search")
        }

        async fn search(
            &self,
            _query: &str,
            _options: &SearchCallOptions,
        ) -> anyhow::Result<Vec<PlatformSearchItem>> {
            self.search_calls.fetch_add(1, Ordering::SeqCst);
            Ok(self.items.clone())
        }

        async fn channel_uploads(
            &self,
            _channel_id: &str,
            _limit: usize,
        ) -> anyhow::Result<Vec<PlatformSearchItem>> {
            self.channel_calls.fetch_add(1, Ordering::SeqCst);
            Ok(self.items.clone())
        }

        async fn playlist_items(
            &self,
            _playlist_id: &str,
            _limit: usize,
        ) -> anyhow::Result<Vec<PlatformSearchItem>> {
            Ok(self.items.clone())
        }
    }

    fn item(id: &str, published_at: &str, views: Option<&str>) -> PlatformSearchItem {
        PlatformSearchItem {
            id: id.to_string(),
            kind: ResultKind::Video,
            title: format!("Video {}", id),
            channel_title: "Channel".to_string(),
            channel_id: "UC123".to_string(),
            description: String::new(),
            published_at: published_at.to_string(),
            views: views.map(String::from),
        }
    }

    #[tokio::test]
    async fn min_views_filter_understands_formatted_counts() {
        let platform = MockPlatform::new(vec![
            item("aaaaaaaaaaa", "2025-01-01T00:00:00Z", Some("1.2M")),
            item("bbbbbbbbbbb", "2025-01-02T00:00:00Z", Some("3,500")),
            item("ccccccccccc", "2025-01-03T00:00:00Z", None),
        ]);
        let cache = TtlCache::new(Duration::from_secs(3600));
        let params = SearchParameters {
            min_views: 10_000,
            ..Default::default()
        };

        let results = search_videos(&platform, &cache, "cats", params, Vec::new(), None)
            .await
            .unwrap();
        assert_eq!(results.result_count, 1);
        assert_eq!(results.results[0].id, "aaaaaaaaaaa");
        assert_eq!(results.results[0].view_count, Some(1_200_000));
        assert_eq!(results.results[0].view_count_formatted.as_deref(), Some("1.2M"));
    }

    #[tokio::test]
    async fn views_sort_is_applied_client_side() {
        let platform = MockPlatform::new(vec![
            item("aaaaaaaaaaa", "2025-01-01T00:00:00Z", Some("100")),
            item("bbbbbbbbbbb", "2025-01-02T00:00:00Z", Some("9,000")),
            item("ccccccccccc", "2025-01-03T00:00:00Z", Some("2K")),
        ]);
        let cache = TtlCache::new(Duration::from_secs(3600));
        let params = SearchParameters {
            sort: SortOrder::Views,
            ..Default::default()
        };

        let results = search_videos(&platform, &cache, "cats", params, Vec::new(), None)
            .await
            .unwrap();
        let ids: Vec<&str> = results.results.iter().map(|r| r.id.as_str()).collect();
        assert_eq!(ids, ["bbbbbbbbbbb", "ccccccccccc", "aaaaaaaaaaa"]);
    }

    #[tokio::test]
    async fn recent_filter_drops_items_older_than_two_years() {
        let fresh = (Utc::now() - ChronoDuration::days(10)).to_rfc3339();
        let platform = MockPlatform::new(vec![
            item("aaaaaaaaaaa", "2015-05-01T00:00:00Z", None),
            item("bbbbbbbbbbb", &fresh, None),
        ]);
        let cache = TtlCache::new(Duration::from_secs(3600));
        let params = SearchParameters {
            recent: true,
            ..Default::default()
        };

        let results = search_videos(&platform, &cache, "cats", params, Vec::new(), None)
            .await
            .unwrap();
        assert_eq!(results.result_count, 1);
        assert_eq!(results.results[0].id, "bbbbbbbbbbb");
    }

    #[tokio::test]
    async fn post_filters_skip_channel_listings() {
        let platform = MockPlatform::new(vec![item("aaaaaaaaaaa", "2015-05-01T00:00:00Z", None)]);
        let cache = TtlCache::new(Duration::from_secs(3600));
        let params = SearchParameters {
            recent: true,
            ..Default::default()
        };

        let results = search_videos(&platform, &cache, "channel:UC123", params, Vec::new(), None)
            .await
            .unwrap();
        assert_eq!(results.scope, "channel");
        assert_eq!(results.result_count, 1);
        assert_eq!(platform.channel_calls.load(Ordering::SeqCst), 1);
    }

    #[tokio::test(start_paused = true)]
    async fn identical_queries_share_a_cache_entry_until_expiry() {
        let platform = MockPlatform::new(vec![item("aaaaaaaaaaa", "2025-01-01T00:00:00Z", None)]);
        let cache = TtlCache::new(Duration::from_secs(3600));

        search_videos(&platform, &cache, "cats", SearchParameters::default(), Vec::new(), None)
            .await
            .unwrap();
        search_videos(&platform, &cache, "cats", SearchParameters::default(), Vec::new(), None)
            .await
            .unwrap();
        assert_eq!(platform.search_calls.load(Ordering::SeqCst), 1);

        // Different parameters are a different cache key.
        let params = SearchParameters {
            count: 10,
            ..Default::default()
        };
        search_videos(&platform, &cache, "cats", params, Vec::new(), None)
            .await
            .unwrap();
        assert_eq!(platform.search_calls.load(Ordering::SeqCst), 2);

        tokio::time::advance(Duration::from_secs(3601)).await;
        search_videos(&platform, &cache, "cats", SearchParameters::default(), Vec::new(), None)
            .await
            .unwrap();
        assert_eq!(platform.search_calls.load(Ordering::SeqCst), 3);
    }

    #[tokio::test]
    async fn empty_result_set_is_not_found() {
        let platform = MockPlatform::new(Vec::new());
        let cache = TtlCache::new(Duration::from_secs(3600));

        let err = search_videos(
            &platform,
            &cache,
            "cats",
            SearchParameters::default(),
            Vec::new(),
            None,
        )
        .await
        .unwrap_err();
        assert_eq!(err.kind, ErrorKind::NotFound);
        assert_eq!(err.query.as_deref(), Some("cats"));
    }
}
