//! The curation pipeline: dedup → classify → score → cap.
//!
//! Every stage is an in-memory transformation over the batch. The run clock
//! is passed in once, so a run is reproducible given the same batch, store,
//! config and `now`. The only state touched is the seen-URL store, and only
//! in memory; persisting it is the caller's job once the digest is written.

use crate::config::PipelineConfig;
use crate::dedup::dedup_items;
use crate::models::{ClassifiedItem, RawItem, RawRecord, RunStats, ScoredItem};
use crate::scoring::{apply_hard_cap, score_item};
use crate::seen::SeenUrls;
use crate::utils::truncate_for_log;
use chrono::{DateTime, Utc};
use std::path::Path;
use tokio::fs;
use tracing::{debug, info, instrument, warn};

/// The selected items and the counts describing how they were chosen.
#[derive(Debug)]
pub struct Curated {
    pub items: Vec<ScoredItem>,
    pub stats: RunStats,
}

/// Parse a JSONL batch. Blank and malformed lines are skipped.
pub fn parse_batch(contents: &str) -> Vec<RawItem> {
    let mut items = Vec::new();
    for (lineno, line) in contents.lines().enumerate() {
        let line = line.trim();
        if line.is_empty() {
            continue;
        }
        match serde_json::from_str::<RawRecord>(line) {
            Ok(record) => items.push(RawItem::from(record)),
            Err(e) => warn!(
                line = lineno + 1,
                error = %e,
                preview = %truncate_for_log(line, 120),
                "Skipping malformed batch line"
            ),
        }
    }
    items
}

/// Read a JSONL batch from disk. A missing file is an empty batch.
#[instrument(level = "info", skip_all, fields(path = %path.display()))]
pub async fn read_batch(path: &Path) -> Result<Vec<RawItem>, std::io::Error> {
    match fs::read_to_string(path).await {
        Ok(contents) => {
            let items = parse_batch(&contents);
            info!(count = items.len(), "Read raw batch");
            Ok(items)
        }
        Err(e) if e.kind() == std::io::ErrorKind::NotFound => {
            warn!("Raw batch not found; treating as empty");
            Ok(Vec::new())
        }
        Err(e) => Err(e),
    }
}

/// Run every stage over `items`.
pub fn curate(
    items: Vec<RawItem>,
    seen: &mut SeenUrls,
    config: &PipelineConfig,
    now: DateTime<Utc>,
) -> Curated {
    let collected = items.len();

    let deduped = dedup_items(items, seen, now);
    let dedup_dropped = deduped.dropped();
    let after_dedup = deduped.kept.len();

    let classified: Vec<ClassifiedItem> = deduped
        .kept
        .into_iter()
        .filter_map(|item| {
            let topics = config.classifier.classify(&item.title);
            if topics.is_empty() {
                debug!(title = %item.title, "No topic matched");
                None
            } else {
                Some(ClassifiedItem { item, topics })
            }
        })
        .collect();
    let after_classify = classified.len();

    let scored: Vec<ScoredItem> = classified
        .into_iter()
        .map(|c| {
            let density = config.classifier.keyword_density(&c.item.title);
            score_item(c, density, &config.source_weights, now)
        })
        .collect();

    let items = apply_hard_cap(scored, config.max_items);
    let stats = RunStats {
        collected,
        filtered: dedup_dropped + (after_dedup - after_classify),
        kept: items.len(),
        cost: 0.0,
    };

    info!(
        collected,
        after_dedup,
        after_classify,
        kept = stats.kept,
        "Curated batch"
    );
    Curated { items, stats }
}
