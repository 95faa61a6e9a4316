//! Heuristic signal scoring and the hard cap on digest size.

use crate::models::{ClassifiedItem, ScoredItem};
use chrono::{DateTime, Utc};
use std::collections::HashMap;

/// Weight for sources missing from the trust table.
pub const DEFAULT_SOURCE_WEIGHT: f64 = 0.1;

/// Default number of items kept after ranking.
pub const DEFAULT_MAX_ITEMS: usize = 10;

const POPULARITY_DIVISOR: f64 = 500.0;
const POPULARITY_CAP: f64 = 0.3;
const DENSITY_FACTOR: f64 = 0.2;
const RELEASE_BONUS: f64 = 0.2;
const DECAY_PER_HOUR: f64 = 0.005;

/// Per-source trust weights.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct SourceWeights {
    weights: HashMap<String, f64>,
}

impl SourceWeights {
    pub fn new(weights: HashMap<String, f64>) -> Self {
        Self { weights }
    }

    pub fn weight_for(&self, source: &str) -> f64 {
        self.weights
            .get(source)
            .copied()
            .unwrap_or(DEFAULT_SOURCE_WEIGHT)
    }
}

/// Hours between `published` (or `collected_at`) and `now`.
///
/// Missing or unparseable timestamps count as brand new, and timestamps in
/// the future clamp to zero.
pub fn hours_old(item: &ClassifiedItem, now: DateTime<Utc>) -> f64 {
    match item.item.reference_time() {
        Some(ts) => ((now - ts).num_milliseconds() as f64 / 3_600_000.0).max(0.0),
        None => 0.0,
    }
}

/// The raw score formula. Not clamped; stale items go negative.
pub fn signal_score(
    source_weight: f64,
    popularity: Option<i64>,
    keyword_density: f64,
    is_release: bool,
    hours_old: f64,
) -> f64 {
    let points = popularity.unwrap_or(0) as f64;
    source_weight
        + (points / POPULARITY_DIVISOR).min(POPULARITY_CAP)
        + keyword_density * DENSITY_FACTOR
        + if is_release { RELEASE_BONUS } else { 0.0 }
        - hours_old * DECAY_PER_HOUR
}

/// Attach scoring inputs and the score to a classified item.
pub fn score_item(
    classified: ClassifiedItem,
    keyword_density: f64,
    weights: &SourceWeights,
    now: DateTime<Utc>,
) -> ScoredItem {
    let hours_old = hours_old(&classified, now);
    let is_release = classified.item.is_release;
    let score = signal_score(
        weights.weight_for(&classified.item.source),
        classified.item.popularity,
        keyword_density,
        is_release,
        hours_old,
    );
    ScoredItem {
        classified,
        hours_old,
        is_release,
        keyword_density,
        score,
    }
}

/// Order by score, highest first, and keep at most `max_items`.
///
/// The sort is stable, so equal scores keep their pipeline order.
pub fn apply_hard_cap(mut items: Vec<ScoredItem>, max_items: usize) -> Vec<ScoredItem> {
    items.sort_by(|a, b| b.score.total_cmp(&a.score));
    items.truncate(max_items);
    items
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::models::RawItem;
    use chrono::{Duration, TimeZone};

    fn now() -> DateTime<Utc> {
        Utc.with_ymd_and_hms(2025, 6, 1, 12, 0, 0).unwrap()
    }

    fn classified(title: &str, source: &str) -> ClassifiedItem {
        ClassifiedItem {
            item: RawItem::new(format!("https://x.dev/{title}"), title, source),
            topics: ["ai".to_string()].into_iter().collect(),
        }
    }

    fn scored(title: &str, score: f64) -> ScoredItem {
        ScoredItem {
            classified: classified(title, "s"),
            hours_old: 0.0,
            is_release: false,
            keyword_density: 0.0,
            score,
        }
    }

    #[test]
    fn test_signal_score_formula() {
        let score = signal_score(0.5, Some(100), 0.5, true, 10.0);
        // 0.5 + 0.2 + 0.1 + 0.2 - 0.05
        assert!((score - 0.95).abs() < 1e-9);
    }

    #[test]
    fn test_popularity_is_capped() {
        let capped = signal_score(0.0, Some(10_000), 0.0, false, 0.0);
        assert!((capped - 0.3).abs() < 1e-9);
    }

    #[test]
    fn test_score_can_go_negative() {
        let score = signal_score(0.1, None, 0.0, false, 1000.0);
        assert!((score - (0.1 - 5.0)).abs() < 1e-9);
    }

    #[test]
    fn test_fresher_item_scores_higher() {
        let weights = SourceWeights::default();
        let mut fresh = classified("a", "s");
        fresh.item.published = Some(now() - Duration::hours(10));
        let mut stale = classified("a", "s");
        stale.item.published = Some(now() - Duration::hours(100));

        let fresh = score_item(fresh, 0.2, &weights, now());
        let stale = score_item(stale, 0.2, &weights, now());

        assert!((fresh.hours_old - 10.0).abs() < 1e-9);
        assert!((stale.hours_old - 100.0).abs() < 1e-9);
        assert!(fresh.score > stale.score);
    }

    #[test]
    fn test_hours_old_falls_back_to_collected_at_then_zero() {
        let mut item = classified("a", "s");
        assert_eq!(hours_old(&item, now()), 0.0);

        item.item.collected_at = Some(now() - Duration::hours(3));
        assert!((hours_old(&item, now()) - 3.0).abs() < 1e-9);

        item.item.published = Some(now() + Duration::hours(5));
        assert_eq!(hours_old(&item, now()), 0.0);
    }

    #[test]
    fn test_unknown_source_uses_default_weight() {
        let weights = SourceWeights::new(
            [("Rust Blog".to_string(), 0.9)].into_iter().collect(),
        );
        assert_eq!(weights.weight_for("Rust Blog"), 0.9);
        assert_eq!(weights.weight_for("Somewhere"), DEFAULT_SOURCE_WEIGHT);
    }

    #[test]
    fn test_hard_cap_keeps_top_n_descending() {
        let items: Vec<ScoredItem> = (0..15)
            .map(|i| scored(&format!("item{i}"), ((i * 7) % 15) as f64 / 10.0))
            .collect();
        let titles_in: Vec<String> = items.iter().map(|s| s.item().title.clone()).collect();

        let top = apply_hard_cap(items, 10);

        assert_eq!(top.len(), 10);
        assert!(top.windows(2).all(|w| w[0].score >= w[1].score));
        assert!(top.iter().all(|s| titles_in.contains(&s.item().title)));
        assert!((top[0].score - 1.4).abs() < 1e-9);
    }

    #[test]
    fn test_hard_cap_ties_keep_input_order() {
        let items = vec![
            scored("first", 0.5),
            scored("high", 0.9),
            scored("second", 0.5),
            scored("third", 0.5),
        ];
        let top = apply_hard_cap(items, 3);
        let titles: Vec<_> = top.iter().map(|s| s.item().title.as_str()).collect();
        assert_eq!(titles, vec!["high", "first", "second"]);
    }

    #[test]
    fn test_hard_cap_with_fewer_items() {
        let top = apply_hard_cap(vec![scored("only", -1.0)], 10);
        assert_eq!(top.len(), 1);
    }
}
