//! Hacker News front page via the Algolia search API.
//!
//! Stories below the configured point threshold are dropped here so they
//! never reach the raw batch. Stories without an outbound link (Ask HN,
//! polls) point at their discussion page instead.

use crate::config::HnSettings;
use crate::http::get_with_backoff;
use crate::models::{RawItem, parse_timestamp};
use chrono::{DateTime, Utc};
use serde::Deserialize;
use tracing::{info, instrument, warn};

/// Source label for every item from this collector.
pub const SOURCE: &str = "Hacker News";

const SEARCH_URL: &str = "https://hn.algolia.com/api/v1/search";
const ITEM_URL: &str = "https://news.ycombinator.com/item?id=";

#[derive(Debug, Deserialize)]
struct SearchResponse {
    #[serde(default)]
    hits: Vec<Hit>,
}

#[derive(Debug, Deserialize)]
struct Hit {
    #[serde(rename = "objectID", default)]
    object_id: String,
    title: Option<String>,
    url: Option<String>,
    points: Option<i64>,
    created_at: Option<String>,
}

/// Parse an Algolia response body, keeping hits with at least `min_points`.
pub fn parse_hits(
    body: &[u8],
    min_points: i64,
    collected_at: DateTime<Utc>,
) -> Result<Vec<RawItem>, serde_json::Error> {
    let response: SearchResponse = serde_json::from_slice(body)?;
    let items = response
        .hits
        .into_iter()
        .filter(|hit| hit.points.unwrap_or(0) >= min_points)
        .filter_map(|hit| {
            let url = match hit.url.filter(|u| !u.trim().is_empty()) {
                Some(url) => url,
                None if !hit.object_id.is_empty() => format!("{ITEM_URL}{}", hit.object_id),
                None => return None,
            };
            let mut item = RawItem::new(url, hit.title.unwrap_or_default(), SOURCE);
            item.published = hit.created_at.as_deref().and_then(parse_timestamp);
            item.collected_at = Some(collected_at);
            item.popularity = hit.points;
            Some(item)
        })
        .collect();
    Ok(items)
}

/// Fetch front-page stories. Failures are logged and yield no items.
#[instrument(level = "info", skip_all, fields(min_points = settings.min_points, limit = settings.limit))]
pub async fn fetch_front_page(
    client: &reqwest::Client,
    settings: &HnSettings,
    collected_at: DateTime<Utc>,
) -> Vec<RawItem> {
    if !settings.enabled {
        return Vec::new();
    }
    let url = format!(
        "{SEARCH_URL}?tags=front_page&hitsPerPage={}",
        settings.limit
    );
    let body = match get_with_backoff(client, &url).await {
        Ok(body) => body,
        Err(e) => {
            warn!(error = %e, "Hacker News fetch failed; skipping");
            return Vec::new();
        }
    };
    match parse_hits(&body, settings.min_points, collected_at) {
        Ok(items) => {
            info!(count = items.len(), "Collected Hacker News stories");
            items
        }
        Err(e) => {
            warn!(error = %e, "Hacker News response unparseable; skipping");
            Vec::new()
        }
    }
}
