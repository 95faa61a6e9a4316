//! RSS 2.0 and Atom feed collector.
//!
//! Feeds are parsed with `quick_xml`'s serde support. A document with an
//! `<rss>` root is read as RSS, anything else as Atom. Only the fields the
//! pipeline needs are modelled; unknown elements are ignored.

use crate::config::FeedConfig;
use crate::http::get_with_backoff;
use crate::models::{RawItem, parse_timestamp, sanitize_text};
use crate::utils::truncate_for_log;
use chrono::{DateTime, Utc};
use once_cell::sync::Lazy;
use regex::Regex;
use serde::Deserialize;
use std::error::Error;
use tracing::{debug, info, instrument, warn};

/// Feeds larger than this are skipped.
pub const MAX_FEED_BYTES: usize = 10 * 1024 * 1024;

static HTML_TAG: Lazy<Regex> = Lazy::new(|| Regex::new(r"(?s)<[^>]*>").expect("static regex"));
static WHITESPACE: Lazy<Regex> = Lazy::new(|| Regex::new(r"\s+").expect("static regex"));

#[derive(Debug, Deserialize)]
struct Rss {
    channel: Channel,
}

#[derive(Debug, Deserialize)]
struct Channel {
    #[serde(rename = "item", default)]
    items: Vec<RssItem>,
}

#[derive(Debug, Deserialize)]
struct RssItem {
    title: Option<Text>,
    link: Option<String>,
    guid: Option<Text>,
    #[serde(rename = "pubDate")]
    pub_date: Option<String>,
    description: Option<String>,
}

#[derive(Debug, Deserialize)]
struct AtomFeed {
    #[serde(rename = "entry", default)]
    entries: Vec<AtomEntry>,
}

#[derive(Debug, Deserialize)]
struct AtomEntry {
    title: Option<Text>,
    #[serde(rename = "link", default)]
    links: Vec<AtomLink>,
    id: Option<String>,
    published: Option<String>,
    updated: Option<String>,
    summary: Option<Text>,
}

#[derive(Debug, Deserialize)]
struct AtomLink {
    #[serde(rename = "@href")]
    href: Option<String>,
    #[serde(rename = "@rel")]
    rel: Option<String>,
}

/// Element text, ignoring attributes such as `type="html"`.
#[derive(Debug, Deserialize)]
struct Text {
    #[serde(rename = "$text", default)]
    value: String,
}

impl AtomEntry {
    fn link(&self) -> Option<&str> {
        self.links
            .iter()
            .find(|l| matches!(l.rel.as_deref(), None | Some("alternate")))
            .or_else(|| self.links.first())
            .and_then(|l| l.href.as_deref())
    }
}

/// Parse a feed body into items attributed to `feed`.
///
/// Entries without a link (or id/guid fallback) are skipped. Titles are
/// sanitized; descriptions become plain-text summaries.
pub fn parse_feed(
    body: &str,
    feed: &FeedConfig,
    collected_at: DateTime<Utc>,
) -> Result<Vec<RawItem>, Box<dyn Error>> {
    let entries: Vec<(Option<String>, String, Option<String>, Option<String>)> = if is_rss(body) {
        let rss: Rss = quick_xml::de::from_str(body)?;
        rss.channel
            .items
            .into_iter()
            .filter_map(|it| {
                let url = it
                    .link
                    .filter(|l| !l.trim().is_empty())
                    .or_else(|| it.guid.map(|g| g.value))?;
                Some((
                    it.title.map(|t| t.value),
                    url,
                    it.pub_date,
                    it.description,
                ))
            })
            .collect()
    } else {
        let atom: AtomFeed = quick_xml::de::from_str(body)?;
        atom.entries
            .into_iter()
            .filter_map(|entry| {
                let url = entry.link().map(str::to_string).or(entry.id.clone())?;
                Some((
                    entry.title.map(|t| t.value),
                    url,
                    entry.published.or(entry.updated),
                    entry.summary.map(|s| s.value),
                ))
            })
            .collect()
    };

    let items = entries
        .into_iter()
        .filter(|(_, url, _, _)| !url.trim().is_empty())
        .map(|(title, url, published, description)| {
            let mut item = RawItem::new(url.trim(), title.unwrap_or_default().trim(), &feed.name);
            item.published = published.as_deref().and_then(parse_timestamp);
            item.collected_at = Some(collected_at);
            item.is_release = feed.is_release;
            item.summary = description
                .as_deref()
                .map(strip_html)
                .filter(|s| !s.is_empty());
            item
        })
        .collect();
    Ok(items)
}

fn is_rss(body: &str) -> bool {
    body.contains("<rss")
}

/// Drop tags, collapse whitespace and sanitize.
fn strip_html(html: &str) -> String {
    let text = HTML_TAG.replace_all(html, " ");
    let text = WHITESPACE.replace_all(&text, " ");
    sanitize_text(text.trim())
}

/// Fetch and parse one feed. Failures are logged and yield no items.
#[instrument(level = "info", skip_all, fields(feed = %feed.name))]
pub async fn fetch_feed(
    client: &reqwest::Client,
    feed: &FeedConfig,
    collected_at: DateTime<Utc>,
) -> Vec<RawItem> {
    let body = match get_with_backoff(client, &feed.url).await {
        Ok(body) => body,
        Err(e) => {
            warn!(url = %feed.url, error = %e, "Feed fetch failed; skipping");
            return Vec::new();
        }
    };
    if body.len() > MAX_FEED_BYTES {
        warn!(url = %feed.url, bytes = body.len(), "Feed too large; skipping");
        return Vec::new();
    }
    let text = String::from_utf8_lossy(&body);
    match parse_feed(&text, feed, collected_at) {
        Ok(items) => {
            info!(count = items.len(), "Collected feed");
            items
        }
        Err(e) => {
            warn!(url = %feed.url, error = %e, "Feed parse failed; skipping");
            debug!(head = %truncate_for_log(&text, 200), "Unparseable feed body");
            Vec::new()
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::TimeZone;

    fn feed(is_release: bool) -> FeedConfig {
        FeedConfig {
            name: "Example".to_string(),
            url: "https://example.com/feed".to_string(),
            weight: 0.1,
            is_release,
        }
    }

    fn now() -> DateTime<Utc> {
        Utc.with_ymd_and_hms(2025, 5, 6, 8, 0, 0).unwrap()
    }

    const RSS: &str = r#"<?xml version="1.0" encoding="UTF-8"?>
<rss version="2.0" xmlns:dc="http://purl.org/dc/elements/1.1/">
  <channel>
    <title>Example</title>
    <link>https://example.com/</link>
    <item>
      <title>Faster inference with paged attention</title>
      <link>https://example.com/posts/paged?utm_source=rss</link>
      <guid isPermaLink="true">https://example.com/posts/paged</guid>
      <pubDate>Tue, 06 May 2025 06:00:00 GMT</pubDate>
      <dc:creator>Someone</dc:creator>
      <description>&lt;p&gt;We made &lt;b&gt;inference&lt;/b&gt;
        faster.&lt;/p&gt;</description>
    </item>
    <item>
      <title>Guid only</title>
      <guid isPermaLink="false">https://example.com/posts/guid</guid>
    </item>
    <item>
      <title>No link at all</title>
    </item>
  </channel>
</rss>"#;

    const ATOM: &str = r#"<?xml version="1.0" encoding="utf-8"?>
<feed xmlns="http://www.w3.org/2005/Atom">
  <title>Releases</title>
  <entry>
    <title type="html">v0.9.0</title>
    <link rel="alternate" type="text/html" href="https://github.com/org/proj/releases/tag/v0.9.0"/>
    <id>tag:github.com,2008:Repository/1/v0.9.0</id>
    <updated>2025-05-05T12:00:00Z</updated>
    <summary type="html">Agents can now stream.</summary>
  </entry>
  <entry>
    <title>Only an id</title>
    <id>https://example.com/entry/2</id>
  </entry>
</feed>"#;

    #[test]
    fn test_parse_rss_items() {
        let items = parse_feed(RSS, &feed(false), now()).unwrap();
        assert_eq!(items.len(), 2);

        let first = &items[0];
        assert_eq!(first.title, "Faster inference with paged attention");
        assert_eq!(first.url, "https://example.com/posts/paged?utm_source=rss");
        assert_eq!(first.source, "Example");
        assert_eq!(
            first.published,
            Some(Utc.with_ymd_and_hms(2025, 5, 6, 6, 0, 0).unwrap())
        );
        assert_eq!(first.collected_at, Some(now()));
        assert_eq!(first.summary.as_deref(), Some("We made inference faster."));
        assert!(!first.is_release);

        assert_eq!(items[1].url, "https://example.com/posts/guid");
        assert_eq!(items[1].published, None);
    }

    #[test]
    fn test_parse_atom_entries() {
        let items = parse_feed(ATOM, &feed(true), now()).unwrap();
        assert_eq!(items.len(), 2);
        assert_eq!(items[0].title, "v0.9.0");
        assert_eq!(
            items[0].url,
            "https://github.com/org/proj/releases/tag/v0.9.0"
        );
        assert_eq!(
            items[0].published,
            Some(Utc.with_ymd_and_hms(2025, 5, 5, 12, 0, 0).unwrap())
        );
        assert_eq!(items[0].summary.as_deref(), Some("Agents can now stream."));
        assert!(items.iter().all(|i| i.is_release));
        assert_eq!(items[1].url, "https://example.com/entry/2");
    }

    #[test]
    fn test_malformed_feed_is_an_error() {
        assert!(parse_feed("<rss><channel><item>", &feed(false), now()).is_err());
    }

    #[test]
    fn test_strip_html() {
        assert_eq!(strip_html("<p>a\n\n<i>b</i></p>"), "a b");
        assert_eq!(strip_html("<br/>"), "");
    }
}
