//! Source collectors for the daily raw batch.
//!
//! Each collector turns one kind of source into [`RawItem`]s. Failures are
//! isolated per source: a feed that times out or returns garbage is logged
//! and contributes nothing, and the rest of the run continues.
//!
//! # Supported Sources
//!
//! | Source | Module | Method | Notes |
//! |--------|--------|--------|-------|
//! | RSS / Atom feeds | [`rss`] | XML via `quick_xml` serde | One request per configured feed |
//! | Hacker News | [`hn`] | Algolia search API | Front page, filtered by points |
//! | Tavily | [`tavily`] | Search API (POST) | Requires `TAVILY_API_KEY` |
//!
//! Feeds are fetched concurrently with `futures::stream`, but results are
//! kept in config order so the batch file is stable for identical inputs.

use crate::config::PipelineConfig;
use crate::models::RawItem;
use crate::urls::normalize_url;
use crate::utils::truncate_for_log;
use chrono::{DateTime, Utc};
use futures::stream::{self, StreamExt};
use itertools::Itertools;
use std::time::Duration;
use tracing::{debug, info, instrument};

pub mod hn;
pub mod rss;
pub mod tavily;

/// Concurrent feed requests.
const FEED_CONCURRENCY: usize = 8;
const REQUEST_TIMEOUT: Duration = Duration::from_secs(10);

/// HTTP client shared by every collector.
pub fn build_client() -> reqwest::Result<reqwest::Client> {
    reqwest::Client::builder()
        .timeout(REQUEST_TIMEOUT)
        .user_agent(concat!(env!("CARGO_PKG_NAME"), "/", env!("CARGO_PKG_VERSION")))
        .build()
}

/// Run every collector and return the normalized batch.
#[instrument(level = "info", skip_all, fields(feeds = config.feeds.len()))]
pub async fn collect_all(
    config: &PipelineConfig,
    client: &reqwest::Client,
    tavily_api_key: Option<&str>,
    now: DateTime<Utc>,
) -> Vec<RawItem> {
    let feed_items: Vec<Vec<RawItem>> = stream::iter(&config.feeds)
        .map(|feed| rss::fetch_feed(client, feed, now))
        .buffered(FEED_CONCURRENCY)
        .collect()
        .await;

    let mut items: Vec<RawItem> = feed_items.into_iter().flatten().collect();
    items.extend(hn::fetch_front_page(client, &config.hn, now).await);
    items.extend(tavily::search_all(client, tavily_api_key, &config.tavily_queries, now).await);

    let items = normalize_batch(items);
    info!(
        total = items.len(),
        sources = items.iter().map(|i| i.source.as_str()).unique().count(),
        "Collection finished"
    );
    items
}

/// Normalize every URL and drop items whose URL is rejected.
pub fn normalize_batch(items: Vec<RawItem>) -> Vec<RawItem> {
    items
        .into_iter()
        .filter_map(|mut item| {
            let normalized = normalize_url(&item.url);
            if normalized.is_empty() {
                debug!(url = %truncate_for_log(&item.url, 120), source = %item.source, "Dropping item with rejected URL");
                return None;
            }
            item.url = normalized;
            Some(item)
        })
        .collect()
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_normalize_batch_drops_rejected() {
        let items = vec![
            RawItem::new("http://a.dev/post/?utm_source=x", "a", "Feed"),
            RawItem::new("javascript:alert(1)", "b", "Feed"),
            RawItem::new("https://b.dev/x?b=2&a=1", "c", "Feed"),
        ];
        let out = normalize_batch(items);
        let urls: Vec<&str> = out.iter().map(|i| i.url.as_str()).collect();
        assert_eq!(urls, vec!["https://a.dev/post", "https://b.dev/x?a=1&b=2"]);
    }

    #[test]
    fn test_build_client() {
        assert!(build_client().is_ok());
    }
}
