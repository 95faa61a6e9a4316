//! Drop items whose link was already delivered or repeats within the batch.

use crate::models::RawItem;
use crate::seen::SeenUrls;
use crate::urls::normalize_url;
use chrono::{DateTime, Utc};
use std::collections::HashSet;
use tracing::debug;

/// Result of one deduplication pass.
#[derive(Debug, Default)]
pub struct DedupOutcome {
    /// Surviving items in input order, with `url` replaced by its normalized form.
    pub kept: Vec<RawItem>,
    /// Items whose URL failed normalization.
    pub rejected: usize,
    /// Items already in the store from an earlier run.
    pub previously_seen: usize,
    /// Later repeats of a URL that appeared earlier in this batch.
    pub batch_duplicates: usize,
}

impl DedupOutcome {
    pub fn dropped(&self) -> usize {
        self.rejected + self.previously_seen + self.batch_duplicates
    }
}

/// Deduplicate `items` against `seen` and against each other.
///
/// Items are processed in order, so the first occurrence of a URL wins.
/// Kept URLs are marked in `seen` at `now`, in memory only; the caller saves
/// the store once the whole run has succeeded.
pub fn dedup_items(items: Vec<RawItem>, seen: &mut SeenUrls, now: DateTime<Utc>) -> DedupOutcome {
    let mut outcome = DedupOutcome::default();
    let mut batch: HashSet<String> = HashSet::new();

    for mut item in items {
        let normalized = normalize_url(&item.url);
        if normalized.is_empty() {
            debug!(url = %item.url, "Rejected URL");
            outcome.rejected += 1;
            continue;
        }
        if batch.contains(&normalized) {
            outcome.batch_duplicates += 1;
            continue;
        }
        if seen.contains(&normalized) {
            outcome.previously_seen += 1;
            continue;
        }
        batch.insert(normalized.clone());
        seen.mark(&normalized, now);
        item.url = normalized;
        outcome.kept.push(item);
    }

    debug!(
        kept = outcome.kept.len(),
        rejected = outcome.rejected,
        previously_seen = outcome.previously_seen,
        batch_duplicates = outcome.batch_duplicates,
        "Deduplicated batch"
    );
    outcome
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::TimeZone;
    use tempfile::tempdir;

    fn now() -> DateTime<Utc> {
        Utc.with_ymd_and_hms(2025, 6, 1, 7, 0, 0).unwrap()
    }

    fn item(url: &str, title: &str) -> RawItem {
        RawItem::new(url, title, "test")
    }

    #[test]
    fn test_in_batch_duplicates_keep_first() {
        let dir = tempdir().unwrap();
        let mut seen = SeenUrls::empty(dir.path().join("seen.txt"), 90, now());
        let items = vec![
            item("http://x.dev/story/?utm_source=rss", "first"),
            item("https://x.dev/other", "other"),
            item("https://x.dev/story#comments", "second"),
        ];

        let outcome = dedup_items(items, &mut seen, now());

        let titles: Vec<_> = outcome.kept.iter().map(|i| i.title.as_str()).collect();
        assert_eq!(titles, vec!["first", "other"]);
        assert_eq!(outcome.kept[0].url, "https://x.dev/story");
        assert_eq!(outcome.batch_duplicates, 1);
        assert!(seen.contains("https://x.dev/story"));
    }

    #[test]
    fn test_repeat_counts_as_batch_duplicate_not_previously_seen() {
        let dir = tempdir().unwrap();
        let mut seen = SeenUrls::empty(dir.path().join("seen.txt"), 90, now());
        let items = vec![item("https://x.dev/a", "a"), item("https://x.dev/a/", "a again")];

        let outcome = dedup_items(items, &mut seen, now());

        assert_eq!(outcome.kept.len(), 1);
        assert_eq!(outcome.batch_duplicates, 1);
        assert_eq!(outcome.previously_seen, 0);
        assert_eq!(outcome.dropped(), 1);
    }

    #[test]
    fn test_rejected_and_previously_seen_are_dropped() {
        let dir = tempdir().unwrap();
        let mut seen = SeenUrls::empty(dir.path().join("seen.txt"), 90, now());
        seen.mark("https://x.dev/old", now());
        let items = vec![
            item("javascript:alert(1)", "evil"),
            item("https://x.dev/old/", "old"),
            item("https://x.dev/new", "new"),
        ];

        let outcome = dedup_items(items, &mut seen, now());

        assert_eq!(outcome.kept.len(), 1);
        assert_eq!(outcome.rejected, 1);
        assert_eq!(outcome.previously_seen, 1);
        assert_eq!(outcome.dropped(), 2);
    }

    #[tokio::test]
    async fn test_second_pass_after_save_keeps_nothing() {
        let dir = tempdir().unwrap();
        let path = dir.path().join("seen.txt");
        let batch = vec![
            item("https://a.dev/1", "a"),
            item("https://b.dev/2?b=1&a=2", "b"),
            item("https://b.dev/2?a=2&b=1", "b again"),
        ];

        let mut seen = SeenUrls::load(&path, 90, now()).await;
        let first = dedup_items(batch.clone(), &mut seen, now());
        assert_eq!(first.kept.len(), 2);
        seen.save().await.unwrap();

        let mut reloaded = SeenUrls::load(&path, 90, now()).await;
        let second = dedup_items(batch, &mut reloaded, now());
        assert!(second.kept.is_empty());
        assert_eq!(second.previously_seen, 3);
    }
}
