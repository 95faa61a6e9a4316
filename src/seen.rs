//! Persistent, TTL-bounded set of normalized URLs that were already delivered.
//!
//! The store file is line oriented, one entry per line:
//!
//! ```text
//! https://example.com/post\t2025-05-06T07:00:00+00:00
//! ```
//!
//! Lines without a timestamp are accepted and treated as first seen at load
//! time. Unreadable lines are skipped, and a missing or unreadable file is an
//! empty store. Entries older than the retention window are evicted on load
//! and again before every save.

use crate::models::parse_timestamp;
use crate::utils::write_atomic;
use chrono::{DateTime, Duration, Utc};
use std::collections::BTreeMap;
use std::error::Error;
use std::path::{Path, PathBuf};
use tokio::fs;
use tracing::{debug, info, instrument, warn};

/// File name of the store inside the state directory.
pub const SEEN_URLS_FILE: &str = "seen_urls.txt";

/// Default retention window in days.
pub const DEFAULT_RETENTION_DAYS: u32 = 90;

#[derive(Debug)]
pub struct SeenUrls {
    path: PathBuf,
    retention: Duration,
    now: DateTime<Utc>,
    entries: BTreeMap<String, DateTime<Utc>>,
}

impl SeenUrls {
    /// Create an empty store that will persist to `path`.
    pub fn empty(path: impl Into<PathBuf>, retention_days: u32, now: DateTime<Utc>) -> Self {
        Self {
            path: path.into(),
            retention: Duration::days(i64::from(retention_days)),
            now,
            entries: BTreeMap::new(),
        }
    }

    /// Load the store from `path`, evicting expired entries.
    ///
    /// `now` is the run clock; it decides both eviction and the first-seen
    /// time of legacy lines that carry no timestamp.
    #[instrument(level = "info", skip_all, fields(path = %path.as_ref().display()))]
    pub async fn load(path: impl AsRef<Path>, retention_days: u32, now: DateTime<Utc>) -> Self {
        let path = path.as_ref();
        let mut store = Self::empty(path, retention_days, now);

        let contents = match fs::read_to_string(path).await {
            Ok(c) => c,
            Err(e) if e.kind() == std::io::ErrorKind::NotFound => {
                info!("No seen-URL store yet; starting empty");
                return store;
            }
            Err(e) => {
                warn!(error = %e, "Seen-URL store unreadable; starting empty");
                return store;
            }
        };

        let mut skipped = 0usize;
        for line in contents.lines() {
            let line = line.trim_end();
            if line.trim().is_empty() {
                continue;
            }
            let (url, seen_at) = match line.split_once('\t') {
                Some((url, ts)) => match parse_timestamp(ts) {
                    Some(ts) => (url.trim(), ts),
                    None => {
                        skipped += 1;
                        continue;
                    }
                },
                None => (line.trim(), now),
            };
            if url.is_empty() {
                skipped += 1;
                continue;
            }
            store
                .entries
                .entry(url.to_string())
                .and_modify(|existing| {
                    if seen_at < *existing {
                        *existing = seen_at;
                    }
                })
                .or_insert(seen_at);
        }

        let evicted = store.evict_expired();
        info!(
            entries = store.entries.len(),
            evicted,
            skipped,
            "Loaded seen-URL store"
        );
        store
    }

    /// Whether `url` (already normalized) has been seen.
    pub fn contains(&self, url: &str) -> bool {
        self.entries.contains_key(url)
    }

    /// Record `url` as seen at `at`. The first-seen time is never overwritten.
    ///
    /// Returns `true` if the URL was newly inserted.
    pub fn mark(&mut self, url: &str, at: DateTime<Utc>) -> bool {
        if self.entries.contains_key(url) {
            return false;
        }
        self.entries.insert(url.to_string(), at);
        true
    }

    pub fn len(&self) -> usize {
        self.entries.len()
    }

    #[cfg(test)]
    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }

    pub fn path(&self) -> &Path {
        &self.path
    }

    /// Drop entries whose age exceeds the retention window. Returns how many
    /// were removed.
    fn evict_expired(&mut self) -> usize {
        let cutoff = self.now - self.retention;
        let before = self.entries.len();
        self.entries.retain(|_, seen_at| *seen_at >= cutoff);
        before - self.entries.len()
    }

    /// Serialize the store; entries are ordered by URL so output is stable.
    fn render(&self) -> String {
        let mut out = String::new();
        for (url, seen_at) in &self.entries {
            out.push_str(url);
            out.push('\t');
            out.push_str(&seen_at.to_rfc3339());
            out.push('\n');
        }
        out
    }

    /// Evict expired entries and persist atomically.
    ///
    /// Calling this twice without an intervening [`mark`](Self::mark)
    /// writes identical bytes.
    #[instrument(level = "info", skip_all, fields(path = %self.path.display()))]
    pub async fn save(&mut self) -> Result<(), Box<dyn Error>> {
        let evicted = self.evict_expired();
        write_atomic(&self.path, self.render().as_bytes()).await?;
        debug!(entries = self.entries.len(), evicted, "Saved seen-URL store");
        Ok(())
    }
}
