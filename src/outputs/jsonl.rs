//! Newline-delimited JSON output for collected batches.
//!
//! One [`RawRecord`] per line, in collection order. The `analyze` step reads
//! this file back with [`crate::pipeline::read_batch`].

use crate::models::{RawItem, RawRecord};
use crate::utils::write_atomic;
use std::error::Error;
use std::path::Path;
use tracing::{info, instrument};

/// Serialize items as JSONL.
pub fn to_jsonl(items: &[RawItem]) -> Result<String, serde_json::Error> {
    let mut out = String::new();
    for item in items {
        out.push_str(&serde_json::to_string(&RawRecord::from(item))?);
        out.push('\n');
    }
    Ok(out)
}

/// Write a batch to `path` atomically.
#[instrument(level = "info", skip_all, fields(path = %path.display(), count = items.len()))]
pub async fn write_batch(items: &[RawItem], path: &Path) -> Result<(), Box<dyn Error>> {
    let jsonl = to_jsonl(items)?;
    write_atomic(path, jsonl.as_bytes()).await?;
    info!("Wrote raw batch");
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::pipeline::read_batch;
    use tempfile::tempdir;

    #[test]
    fn test_one_line_per_item() {
        let items = vec![
            RawItem::new("https://a.dev/1", "Line\nbreak", "s"),
            RawItem::new("https://a.dev/2", "two", "s"),
        ];
        let jsonl = to_jsonl(&items).unwrap();
        assert_eq!(jsonl.lines().count(), 2);
        assert!(jsonl.ends_with('\n'));
    }

    #[tokio::test]
    async fn test_written_batch_reads_back() {
        let dir = tempdir().unwrap();
        let path = dir.path().join("raw").join("2025-05-06.jsonl");
        let mut hn = RawItem::new("https://news.ycombinator.com/item?id=1", "Show HN", "Hacker News");
        hn.popularity = Some(321);
        let items = vec![hn, RawItem::new("https://a.dev/2", "two", "Blog")];

        write_batch(&items, &path).await.unwrap();
        let back = read_batch(&path).await.unwrap();

        assert_eq!(back, items);
    }
}
