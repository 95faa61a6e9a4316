//! Tavily web search collector.
//!
//! Each configured query becomes one POST to the search endpoint. The
//! collector is skipped entirely when no API key is available.

use crate::models::{RawItem, parse_timestamp, sanitize_text};
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use std::error::Error;
use tracing::{debug, info, instrument, warn};

const SEARCH_URL: &str = "https://api.tavily.com/search";
const MAX_RESULTS: u32 = 5;
/// Queries are cut to this many characters in the source label.
const SOURCE_QUERY_CHARS: usize = 40;

#[derive(Debug, Serialize)]
struct SearchRequest<'a> {
    query: &'a str,
    max_results: u32,
    search_depth: &'a str,
}

#[derive(Debug, Deserialize)]
struct SearchResponse {
    #[serde(default)]
    results: Vec<SearchResult>,
}

#[derive(Debug, Deserialize)]
struct SearchResult {
    url: Option<String>,
    title: Option<String>,
    published_date: Option<String>,
    content: Option<String>,
}

/// Source label for results of `query`.
pub fn source_label(query: &str) -> String {
    let head: String = query.chars().take(SOURCE_QUERY_CHARS).collect();
    format!("Tavily:{head}")
}

/// Parse a search response body for `query`.
pub fn parse_results(
    body: &str,
    query: &str,
    collected_at: DateTime<Utc>,
) -> Result<Vec<RawItem>, serde_json::Error> {
    let response: SearchResponse = serde_json::from_str(body)?;
    let source = source_label(query);
    let items = response
        .results
        .into_iter()
        .filter_map(|r| {
            let url = r.url.filter(|u| !u.trim().is_empty())?;
            let mut item = RawItem::new(url, r.title.unwrap_or_default(), &source);
            item.published = r.published_date.as_deref().and_then(parse_timestamp);
            item.collected_at = Some(collected_at);
            item.summary = r
                .content
                .map(|c| sanitize_text(c.trim()))
                .filter(|c| !c.is_empty());
            Some(item)
        })
        .collect();
    Ok(items)
}

async fn search(
    client: &reqwest::Client,
    api_key: &str,
    query: &str,
    collected_at: DateTime<Utc>,
) -> Result<Vec<RawItem>, Box<dyn Error>> {
    let body = client
        .post(SEARCH_URL)
        .bearer_auth(api_key)
        .json(&SearchRequest {
            query,
            max_results: MAX_RESULTS,
            search_depth: "basic",
        })
        .send()
        .await?
        .error_for_status()?
        .text()
        .await?;
    Ok(parse_results(&body, query, collected_at)?)
}

/// Run every query. A failing query is logged and contributes nothing.
#[instrument(level = "info", skip_all, fields(queries = queries.len()))]
pub async fn search_all(
    client: &reqwest::Client,
    api_key: Option<&str>,
    queries: &[String],
    collected_at: DateTime<Utc>,
) -> Vec<RawItem> {
    let Some(api_key) = api_key.filter(|k| !k.trim().is_empty()) else {
        debug!("No Tavily API key; skipping search");
        return Vec::new();
    };

    let mut items = Vec::new();
    for query in queries {
        match search(client, api_key, query, collected_at).await {
            Ok(found) => {
                info!(%query, count = found.len(), "Collected Tavily results");
                items.extend(found);
            }
            Err(e) => warn!(%query, error = %e, "Tavily search failed; skipping"),
        }
    }
    items
}
