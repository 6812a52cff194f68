use crate::types::*;
use anyhow::{anyhow, Result};
use async_trait::async_trait;
use std::collections::HashMap;
use tracing::{debug, warn};

pub const API_BASE: &str = "https://www.googleapis.com/youtube/v3";

/// Contract with the video-platform metadata service.
#[async_trait]
pub trait VideoPlatform: Send + Sync {
    /// Full snippet/statistics/contentDetails for one video, `None` when the
    /// ID resolves to nothing.
    async fn video_details(&self, video_id: &str) -> Result<Option<PlatformVideo>>;

    async fn search(&self, query: &str, options: &SearchCallOptions)
        -> Result<Vec<PlatformSearchItem>>;

    async fn channel_uploads(&self, channel_id: &str, limit: usize)
        -> Result<Vec<PlatformSearchItem>>;

    async fn playlist_items(&self, playlist_id: &str, limit: usize)
        -> Result<Vec<PlatformSearchItem>>;
}

pub struct YoutubeApi {
    client: reqwest::Client,
    api_key: String,
    base_url: String,
}

impl YoutubeApi {
    pub fn new(client: reqwest::Client, api_key: String) -> Self {
        Self {
            client,
            api_key,
            base_url: API_BASE.to_string(),
        }
    }

    async fn get_json<T: serde::de::DeserializeOwned>(
        &self,
        path: &str,
        params: &[(&str, &str)],
    ) -> Result<T> {
        let url = format!("{}/{}", self.base_url, path);
        let response = self
            .client
            .get(&url)
            .query(params)
            .query(&[("key", self.api_key.as_str())])
            .send()
            .await
            .map_err(|e| anyhow!("Failed to send request to video platform: {}", e))?;

        if !response.status().is_success() {
            let status = response.status();
            let text = response.text().await.unwrap_or_else(|_| "".into());
            return Err(anyhow!(
                "Video platform request failed with status {}: {}",
                status,
                text
            ));
        }
        response
            .json::<T>()
            .await
            .map_err(|e| anyhow!("Failed to parse video platform response: {}", e))
    }

    /// Batch statistics lookup used to hydrate search-shaped items with view
    /// counts the search endpoint does not return. Degrades to an empty map
    /// on failure; the counts are an enrichment, not a requirement.
    async fn view_counts(&self, ids: &[String]) -> HashMap<String, String> {
        if ids.is_empty() {
            return HashMap::new();
        }
        let joined = ids.join(",");
        let result: Result<ApiVideoListResponse> = self
            .get_json("videos", &[("part", "statistics"), ("id", joined.as_str())])
            .await;
        match result {
            Ok(response) => response
                .items
                .into_iter()
                .filter_map(|item| {
                    item.statistics
                        .map(|stats| (item.id, stats.view_count))
                })
                .collect(),
            Err(e) => {
                warn!("Statistics hydration failed: {}", e);
                HashMap::new()
            }
        }
    }

    fn video_items(
        response: ApiSearchResponse,
        views: &HashMap<String, String>,
    ) -> Vec<PlatformSearchItem> {
        response
            .items
            .into_iter()
            .filter_map(|item| {
                let (id, kind) = if let Some(video_id) = item.id.video_id {
                    (video_id, ResultKind::Video)
                } else if let Some(channel_id) = item.id.channel_id {
                    (channel_id, ResultKind::Channel)
                } else if let Some(playlist_id) = item.id.playlist_id {
                    (playlist_id, ResultKind::Playlist)
                } else {
                    return None;
                };
                Some(PlatformSearchItem {
                    views: views.get(&id).cloned(),
                    kind,
                    title: item.snippet.title,
                    channel_title: item.snippet.channel_title,
                    channel_id: item.snippet.channel_id,
                    description: item.snippet.description,
                    published_at: item.snippet.published_at,
                    id,
                })
            })
            .collect()
    }
}

#[async_trait]
impl VideoPlatform for YoutubeApi {
    async fn video_details(&self, video_id: &str) -> Result<Option<PlatformVideo>> {
        let response: ApiVideoListResponse = self
            .get_json(
                "videos",
                &[
                    ("part", "snippet,statistics,contentDetails"),
                    ("id", video_id),
                ],
            )
            .await?;

        let Some(item) = response.items.into_iter().next() else {
            return Ok(None);
        };
        let statistics = item.statistics.unwrap_or_default();
        let duration = item
            .content_details
            .map(|d| d.duration)
            .unwrap_or_default();
        Ok(Some(PlatformVideo {
            video_id: item.id,
            title: item.snippet.title,
            channel_title: item.snippet.channel_title,
            channel_id: item.snippet.channel_id,
            description: item.snippet.description,
            published_at: item.snippet.published_at,
            duration,
            view_count: statistics.view_count.parse().unwrap_or(0),
            like_count: statistics.like_count.parse().unwrap_or(0),
            comment_count: statistics.comment_count.parse().unwrap_or(0),
            thumbnail_url: item.snippet.thumbnails.best_url(),
        }))
    }

    async fn search(
        &self,
        query: &str,
        options: &SearchCallOptions,
    ) -> Result<Vec<PlatformSearchItem>> {
        let limit = options.limit.max(1).to_string();
        let result_type = options.result_type.clone().unwrap_or_else(|| "video".into());
        let mut params = vec![
            ("part", "snippet"),
            ("q", query),
            ("maxResults", limit.as_str()),
            ("type", result_type.as_str()),
        ];
        if let Some(order) = &options.order {
            params.push(("order", order.as_str()));
        }
        if let Some(duration) = &options.video_duration {
            params.push(("videoDuration", duration.as_str()));
        }

        let response: ApiSearchResponse = self.get_json("search", &params).await?;
        debug!("Search returned {} raw items", response.items.len());

        let video_ids: Vec<String> = response
            .items
            .iter()
            .filter_map(|item| item.id.video_id.clone())
            .collect();
        let views = self.view_counts(&video_ids).await;
        Ok(Self::video_items(response, &views))
    }

    async fn channel_uploads(
        &self,
        channel_id: &str,
        limit: usize,
    ) -> Result<Vec<PlatformSearchItem>> {
        let limit = limit.max(1).to_string();
        let response: ApiSearchResponse = self
            .get_json(
                "search",
                &[
                    ("part", "snippet"),
                    ("channelId", channel_id),
                    ("order", "date"),
                    ("type", "video"),
                    ("maxResults", limit.as_str()),
                ],
            )
            .await?;
        let video_ids: Vec<String> = response
            .items
            .iter()
            .filter_map(|item| item.id.video_id.clone())
            .collect();
        let views = self.view_counts(&video_ids).await;
        Ok(Self::video_items(response, &views))
    }

    async fn playlist_items(
        &self,
        playlist_id: &str,
        limit: usize,
    ) -> Result<Vec<PlatformSearchItem>> {
        let limit = limit.max(1).to_string();
        let response: ApiVideoListResponse = self
            .get_json(
                "playlistItems",
                &[
                    ("part", "snippet"),
                    ("playlistId", playlist_id),
                    ("maxResults", limit.as_str()),
                ],
            )
            .await?;

        let mut items = Vec::new();
        for entry in response.items {
            let Some(video_id) = entry
                .snippet
                .resource_id
                .as_ref()
                .and_then(|r| r.video_id.clone())
            else {
                continue;
            };
            items.push(PlatformSearchItem {
                id: video_id,
                kind: ResultKind::Video,
                title: entry.snippet.title,
                channel_title: entry.snippet.channel_title,
                channel_id: entry.snippet.channel_id,
                description: entry.snippet.description,
                published_at: entry.snippet.published_at,
                views: None,
            });
        }
        let video_ids: Vec<String> = items.iter().map(|i| i.id.clone()).collect();
        let views = self.view_counts(&video_ids).await;
        for item in &mut items {
            item.views = views.get(&item.id).cloned();
        }
        Ok(items)
    }
}
