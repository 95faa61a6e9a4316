//! Markdown digest rendering.
//!
//! Items are grouped by their primary topic (the alphabetically first one).
//! Groups appear in the order their first item appears in the selection, and
//! items keep selection order inside a group, so the highest-scoring item of
//! the digest always opens the first section.
//!
//! Rendering is a pure function of its inputs.

use crate::models::{RunStats, ScoredItem};
use crate::utils::{title_case, write_atomic};
use chrono::NaiveDate;
use std::error::Error;
use std::fmt::Write;
use std::path::Path;
use tracing::{info, instrument};

/// Section for items without any topic.
pub const UNCATEGORIZED: &str = "uncategorized";

/// Render the digest for `date`.
pub fn render_digest(items: &[ScoredItem], date: NaiveDate, stats: &RunStats) -> String {
    let mut md = String::new();

    writeln!(md, "# News Digest for {date}\n").unwrap();
    writeln!(
        md,
        "_Collected: {} | Filtered: {} | Kept: {} | Cost: ${:.4}_\n",
        stats.collected, stats.filtered, stats.kept, stats.cost
    )
    .unwrap();

    let mut groups: Vec<(&str, Vec<&ScoredItem>)> = Vec::new();
    for item in items {
        let topic = item.classified.primary_topic().unwrap_or(UNCATEGORIZED);
        match groups.iter_mut().find(|(t, _)| *t == topic) {
            Some((_, members)) => members.push(item),
            None => groups.push((topic, vec![item])),
        }
    }

    if groups.is_empty() {
        writeln!(md, "_Nothing new today._\n").unwrap();
    }

    for (topic, members) in groups {
        writeln!(md, "## {}\n", title_case(topic)).unwrap();
        for (idx, scored) in members.iter().enumerate() {
            let item = scored.item();
            let title = if item.title.trim().is_empty() {
                "Untitled".to_string()
            } else {
                escape_link_text(&item.title)
            };
            writeln!(md, "{}. [{}]({})  ", idx + 1, title, item.url).unwrap();
            writeln!(md, "   Score: {:.1} | Source: {}", scored.score, item.source).unwrap();
            if let Some(summary) = &item.summary {
                writeln!(md, "   {}", summary.replace('\n', " ")).unwrap();
            }
            md.push('\n');
        }
    }

    md.push_str("---\n");
    writeln!(md, "_Generated by {}_", env!("CARGO_PKG_NAME")).unwrap();
    md
}

fn escape_link_text(s: &str) -> String {
    s.replace('[', "\\[").replace(']', "\\]")
}

/// Write a rendered digest to `path` atomically.
#[instrument(level = "info", skip_all, fields(path = %path.display()))]
pub async fn write_digest(path: &Path, digest: &str) -> Result<(), Box<dyn Error>> {
    write_atomic(path, digest.as_bytes()).await?;
    info!("Wrote digest");
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::models::{ClassifiedItem, RawItem};
    use std::collections::BTreeSet;
    use tempfile::tempdir;

    fn scored(title: &str, topics: &[&str], score: f64) -> ScoredItem {
        ScoredItem {
            classified: ClassifiedItem {
                item: RawItem::new(format!("https://x.dev/{}", title.len()), title, "Feed"),
                topics: topics.iter().map(|t| t.to_string()).collect::<BTreeSet<_>>(),
            },
            hours_old: 0.0,
            is_release: false,
            keyword_density: 0.0,
            score,
        }
    }

    fn date() -> NaiveDate {
        NaiveDate::from_ymd_opt(2025, 5, 6).unwrap()
    }

    #[test]
    fn test_render_layout() {
        let mut with_summary = scored("Agents ship", &["agents"], 0.84);
        with_summary.classified.item.summary = Some("A short\nsummary".to_string());
        let items = vec![
            with_summary,
            scored("RAG tricks", &["retrieval", "agents"], 0.5),
            scored("CVE in parser", &["security"], 0.26),
        ];
        let stats = RunStats {
            collected: 20,
            filtered: 17,
            kept: 3,
            cost: 0.0,
        };

        let md = render_digest(&items, date(), &stats);

        let expected = "# News Digest for 2025-05-06\n\
\n\
_Collected: 20 | Filtered: 17 | Kept: 3 | Cost: $0.0000_\n\
\n\
## Agents\n\
\n\
1. [Agents ship](https://x.dev/11)  \n   Score: 0.8 | Source: Feed\n   A short summary\n\
\n\
2. [RAG tricks](https://x.dev/10)  \n   Score: 0.5 | Source: Feed\n\
\n\
## Security\n\
\n\
1. [CVE in parser](https://x.dev/13)  \n   Score: 0.3 | Source: Feed\n\
\n\
---\n\
_Generated by news_digest_\n";
        assert_eq!(md, expected);
    }

    #[test]
    fn test_render_is_deterministic() {
        let items = vec![
            scored("b", &["zeta", "alpha"], 0.9),
            scored("a", &["mid"], 0.4),
        ];
        let stats = RunStats::default();
        assert_eq!(
            render_digest(&items, date(), &stats),
            render_digest(&items, date(), &stats)
        );
    }

    #[test]
    fn test_topicless_items_go_to_uncategorized() {
        let items = vec![scored("loose", &[], 0.1)];
        let md = render_digest(&items, date(), &RunStats::default());
        assert!(md.contains("## Uncategorized\n"));
    }

    #[test]
    fn test_empty_digest_still_has_stats() {
        let stats = RunStats {
            collected: 4,
            filtered: 4,
            kept: 0,
            cost: 0.0,
        };
        let md = render_digest(&[], date(), &stats);
        assert!(md.contains("_Collected: 4 | Filtered: 4 | Kept: 0 | Cost: $0.0000_"));
        assert!(!md.contains("## "));
    }

    #[test]
    fn test_link_text_is_escaped() {
        let items = vec![scored("[Show HN] tool", &["ai"], 0.1)];
        let md = render_digest(&items, date(), &RunStats::default());
        assert!(md.contains("1. [\\[Show HN\\] tool](https://x.dev/14)"));
    }

    #[tokio::test]
    async fn test_write_digest() {
        let dir = tempdir().unwrap();
        let path = dir.path().join("digests").join("2025-05-06.md");
        write_digest(&path, "# hi\n").await.unwrap();
        assert_eq!(std::fs::read_to_string(&path).unwrap(), "# hi\n");
    }
}
