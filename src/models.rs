//! Data models for collected news items and their processed representations.
//!
//! This module defines the records that flow through the pipeline, in order:
//! - [`RawRecord`]: the JSONL wire shape written by collectors
//! - [`RawItem`]: a typed, sanitized item parsed once at ingestion
//! - [`ClassifiedItem`]: a raw item plus its topic labels
//! - [`ScoredItem`]: a classified item plus its signal inputs and score
//! - [`RunStats`]: aggregate counts attached to the digest
//!
//! Timestamps arrive as loosely formatted strings. They are parsed here,
//! once, into `DateTime<Utc>`; anything unparseable becomes `None`.

use chrono::{DateTime, NaiveDate, NaiveDateTime, Utc};
use once_cell::sync::Lazy;
use regex::Regex;
use serde::{Deserialize, Serialize};
use serde_json::{Map, Value};
use std::collections::BTreeSet;

/// Maximum number of characters kept from a title or summary.
const MAX_TEXT_CHARS: usize = 500;

static CONTROL_CHARS: Lazy<Regex> =
    Lazy::new(|| Regex::new(r"[\x00-\x08\x0b-\x1f]").expect("static regex"));

/// One line of the raw batch file.
///
/// `extra` is an open JSON object so that collectors from other tools can
/// add fields; only `points`, `is_release` and `summary` are read back.
#[derive(Debug, Clone, Default, Deserialize, Serialize)]
pub struct RawRecord {
    pub url: String,
    #[serde(default)]
    pub title: String,
    #[serde(default)]
    pub source: String,
    #[serde(default)]
    pub published: String,
    #[serde(default)]
    pub extra: Map<String, Value>,
    #[serde(default)]
    pub collected_at: String,
}

/// A collected news item with typed fields.
#[derive(Debug, Clone, PartialEq)]
pub struct RawItem {
    pub url: String,
    pub title: String,
    pub source: String,
    pub published: Option<DateTime<Utc>>,
    pub collected_at: Option<DateTime<Utc>>,
    /// Popularity signal such as Hacker News points.
    pub popularity: Option<i64>,
    /// Set by collectors for release-announcement feeds.
    pub is_release: bool,
    pub summary: Option<String>,
}

impl RawItem {
    /// Create an item with no optional metadata.
    pub fn new(url: impl Into<String>, title: impl Into<String>, source: impl Into<String>) -> Self {
        Self {
            url: url.into(),
            title: sanitize_text(&title.into()),
            source: source.into(),
            published: None,
            collected_at: None,
            popularity: None,
            is_release: false,
            summary: None,
        }
    }

    /// The timestamp recency is measured from: published, else collected.
    pub fn reference_time(&self) -> Option<DateTime<Utc>> {
        self.published.or(self.collected_at)
    }
}

impl From<RawRecord> for RawItem {
    fn from(record: RawRecord) -> Self {
        let popularity = record.extra.get("points").and_then(|v| {
            v.as_i64()
                .or_else(|| v.as_f64().map(|f| f as i64))
        });
        let is_release = record
            .extra
            .get("is_release")
            .and_then(Value::as_bool)
            .unwrap_or(false);
        let summary = record
            .extra
            .get("summary")
            .and_then(Value::as_str)
            .map(sanitize_text)
            .filter(|s| !s.trim().is_empty());

        Self {
            url: record.url,
            title: sanitize_text(&record.title),
            source: record.source,
            published: parse_timestamp(&record.published),
            collected_at: parse_timestamp(&record.collected_at),
            popularity,
            is_release,
            summary,
        }
    }
}

impl From<&RawItem> for RawRecord {
    fn from(item: &RawItem) -> Self {
        let mut extra = Map::new();
        if let Some(points) = item.popularity {
            extra.insert("points".to_string(), Value::from(points));
        }
        if item.is_release {
            extra.insert("is_release".to_string(), Value::Bool(true));
        }
        if let Some(summary) = &item.summary {
            extra.insert("summary".to_string(), Value::String(summary.clone()));
        }
        Self {
            url: item.url.clone(),
            title: item.title.clone(),
            source: item.source.clone(),
            published: item.published.map(|t| t.to_rfc3339()).unwrap_or_default(),
            extra,
            collected_at: item.collected_at.map(|t| t.to_rfc3339()).unwrap_or_default(),
        }
    }
}

/// A deduplicated item with at least one topic label.
///
/// Topics are kept sorted so the "first" topic is the alphabetically
/// smallest one.
#[derive(Debug, Clone, PartialEq)]
pub struct ClassifiedItem {
    pub item: RawItem,
    pub topics: BTreeSet<String>,
}

impl ClassifiedItem {
    /// The topic the item is grouped under in the digest.
    pub fn primary_topic(&self) -> Option<&str> {
        self.topics.iter().next().map(String::as_str)
    }
}

/// A classified item with its scoring inputs and final score.
#[derive(Debug, Clone, PartialEq)]
pub struct ScoredItem {
    pub classified: ClassifiedItem,
    pub hours_old: f64,
    pub is_release: bool,
    pub keyword_density: f64,
    /// May be negative for stale items; only the relative order matters.
    pub score: f64,
}

impl ScoredItem {
    pub fn item(&self) -> &RawItem {
        &self.classified.item
    }
}

/// Aggregate counts for one run.
#[derive(Debug, Clone, Copy, Default, PartialEq)]
pub struct RunStats {
    /// Records parsed from the batch.
    pub collected: usize,
    /// Records dropped by URL rejection, deduplication, or for having no topic.
    pub filtered: usize,
    /// Records that made it into the digest.
    pub kept: usize,
    /// Estimated spend on paid APIs for the run.
    pub cost: f64,
}

/// Strip control characters (everything below `0x20` except `\t` and `\n`)
/// and truncate to 500 characters.
pub fn sanitize_text(text: &str) -> String {
    let cleaned = CONTROL_CHARS.replace_all(text, "");
    cleaned.chars().take(MAX_TEXT_CHARS).collect()
}

/// Parse a timestamp in any of the shapes collectors emit.
///
/// Accepts RFC 3339, RFC 2822 (RSS `pubDate`), naive ISO date-times (taken
/// as UTC) and bare dates (midnight UTC). Returns `None` for anything else,
/// including the empty string.
pub fn parse_timestamp(raw: &str) -> Option<DateTime<Utc>> {
    let s = raw.trim();
    if s.is_empty() {
        return None;
    }
    if let Ok(dt) = DateTime::parse_from_rfc3339(s) {
        return Some(dt.with_timezone(&Utc));
    }
    if let Ok(dt) = DateTime::parse_from_rfc2822(s) {
        return Some(dt.with_timezone(&Utc));
    }
    for fmt in [
        "%Y-%m-%dT%H:%M:%S%.f",
        "%Y-%m-%d %H:%M:%S%.f",
        "%Y-%m-%dT%H:%M",
        "%Y-%m-%d %H:%M",
    ] {
        if let Ok(naive) = NaiveDateTime::parse_from_str(s, fmt) {
            return Some(naive.and_utc());
        }
    }
    if let Ok(dt) = DateTime::parse_from_str(s, "%Y-%m-%d %H:%M:%S%.f%:z") {
        return Some(dt.with_timezone(&Utc));
    }
    NaiveDate::parse_from_str(s, "%Y-%m-%d")
        .ok()
        .and_then(|d| d.and_hms_opt(0, 0, 0))
        .map(|naive| naive.and_utc())
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::TimeZone;

    #[test]
    fn test_raw_record_to_item_reads_typed_extras() {
        let line = r#"{
            "url": "https://example.com/a",
            "title": "Rust 1.90 released",
            "source": "Rust Blog",
            "published": "2025-05-06T12:00:00+00:00",
            "extra": {"points": 250, "is_release": true, "tags": ["x"]},
            "collected_at": "2025-05-06T13:00:00Z"
        }"#;
        let record: RawRecord = serde_json::from_str(line).unwrap();
        let item = RawItem::from(record);

        assert_eq!(item.popularity, Some(250));
        assert!(item.is_release);
        assert_eq!(
            item.published,
            Some(Utc.with_ymd_and_hms(2025, 5, 6, 12, 0, 0).unwrap())
        );
        assert_eq!(
            item.collected_at,
            Some(Utc.with_ymd_and_hms(2025, 5, 6, 13, 0, 0).unwrap())
        );
    }

    #[test]
    fn test_raw_record_defaults_missing_fields() {
        let record: RawRecord = serde_json::from_str(r#"{"url": "https://x.dev"}"#).unwrap();
        let item = RawItem::from(record);

        assert_eq!(item.title, "");
        assert_eq!(item.popularity, None);
        assert!(!item.is_release);
        assert_eq!(item.published, None);
        assert_eq!(item.reference_time(), None);
    }

    #[test]
    fn test_item_round_trips_through_wire_record() {
        let mut item = RawItem::new("https://example.com/a", "Title", "HN");
        item.popularity = Some(120);
        item.published = Some(Utc.with_ymd_and_hms(2025, 1, 2, 3, 4, 5).unwrap());

        let line = serde_json::to_string(&RawRecord::from(&item)).unwrap();
        let back = RawItem::from(serde_json::from_str::<RawRecord>(&line).unwrap());
        assert_eq!(back, item);
    }

    #[test]
    fn test_parse_timestamp_shapes() {
        let noon = Utc.with_ymd_and_hms(2025, 5, 6, 12, 0, 0).unwrap();
        assert_eq!(parse_timestamp("2025-05-06T12:00:00Z"), Some(noon));
        assert_eq!(parse_timestamp("2025-05-06T14:00:00+02:00"), Some(noon));
        assert_eq!(parse_timestamp("Tue, 06 May 2025 12:00:00 GMT"), Some(noon));
        assert_eq!(parse_timestamp("2025-05-06T12:00:00"), Some(noon));
        assert_eq!(parse_timestamp("2025-05-06 12:00:00"), Some(noon));
        assert_eq!(
            parse_timestamp("2025-05-06"),
            Some(Utc.with_ymd_and_hms(2025, 5, 6, 0, 0, 0).unwrap())
        );
    }

    #[test]
    fn test_parse_timestamp_rejects_garbage() {
        assert_eq!(parse_timestamp(""), None);
        assert_eq!(parse_timestamp("   "), None);
        assert_eq!(parse_timestamp("yesterday"), None);
        assert_eq!(parse_timestamp("2025-13-45"), None);
    }

    #[test]
    fn test_sanitize_text_strips_controls_and_truncates() {
        assert_eq!(sanitize_text("a\x00b\x07c\nd\te"), "abc\nd\te");
        let long = "é".repeat(600);
        assert_eq!(sanitize_text(&long).chars().count(), 500);
    }

    #[test]
    fn test_primary_topic_is_alphabetical() {
        let classified = ClassifiedItem {
            item: RawItem::new("https://x.dev", "t", "s"),
            topics: ["security", "ai", "rust"].iter().map(|s| s.to_string()).collect(),
        };
        assert_eq!(classified.primary_topic(), Some("ai"));
    }
}
