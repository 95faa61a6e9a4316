//! Utility functions for string formatting and file system operations.
//!
//! This module provides helpers used throughout the application:
//! - String truncation for log previews and title-casing for headings
//! - Output directory validation
//! - Atomic file writes (temporary file in the destination directory, then rename)

use rand::{Rng, rng};
use std::error::Error;
use std::path::{Path, PathBuf};
use tokio::fs;
use tokio::io::AsyncWriteExt;
use tracing::{debug, info, instrument, warn};

/// Truncate a string for logging purposes.
///
/// Long strings are cut to `max` characters and a byte count indicator is
/// appended.
///
/// # Examples
///
/// ```ignore
/// assert_eq!(truncate_for_log("short", 100), "short");
/// assert_eq!(truncate_for_log(&"a".repeat(500), 10), "aaaaaaaaaa…(+490 bytes)");
/// ```
pub fn truncate_for_log(s: &str, max: usize) -> String {
    match s.char_indices().nth(max) {
        None => s.to_string(),
        Some((cut, _)) => format!("{}…(+{} bytes)", &s[..cut], s.len() - cut),
    }
}

/// Turn a topic key into a heading: underscores become spaces and every
/// word is capitalized.
///
/// # Examples
///
/// ```ignore
/// assert_eq!(title_case("ai_engineering"), "Ai Engineering");
/// assert_eq!(title_case("security"), "Security");
/// ```
pub fn title_case(s: &str) -> String {
    s.replace('_', " ")
        .split(' ')
        .map(upcase)
        .collect::<Vec<_>>()
        .join(" ")
}

/// Capitalize the first character of a string and lowercase the rest.
fn upcase(s: &str) -> String {
    let mut c = s.chars();
    match c.next() {
        None => String::new(),
        Some(f) => f.to_uppercase().collect::<String>() + &c.as_str().to_lowercase(),
    }
}

/// Ensure a directory exists and is writable.
///
/// Creates the directory if needed, then creates and removes a probe file.
///
/// # Errors
///
/// Returns an error if the directory cannot be created or is not writable.
#[instrument(level = "debug", skip_all, fields(path = %path.display()))]
pub async fn ensure_writable_dir(path: &Path) -> Result<(), Box<dyn Error>> {
    fs::create_dir_all(path).await?;
    let probe_path = path.join("..__probe_write__");
    fs::File::create(&probe_path).await?;
    let _ = fs::remove_file(&probe_path).await;
    debug!("Directory is writable");
    Ok(())
}

/// Write `contents` to `dest` so that readers never observe a partial file.
///
/// The bytes go to a uniquely named temporary file in the destination
/// directory, which is flushed and then renamed over `dest`. On any failure
/// the temporary file is removed and `dest` is left as it was.
#[instrument(level = "info", skip_all, fields(path = %dest.display(), bytes = contents.len()))]
pub async fn write_atomic(dest: &Path, contents: &[u8]) -> Result<(), Box<dyn Error>> {
    let parent = match dest.parent() {
        Some(p) if !p.as_os_str().is_empty() => p.to_path_buf(),
        _ => PathBuf::from("."),
    };
    fs::create_dir_all(&parent).await?;

    let file_name = dest
        .file_name()
        .map(|n| n.to_string_lossy().into_owned())
        .unwrap_or_else(|| "output".to_string());
    let suffix: u32 = rng().random();
    let tmp_path = parent.join(format!(".{file_name}.{suffix:08x}.tmp"));

    if let Err(e) = write_and_sync(&tmp_path, contents).await {
        warn!(tmp = %tmp_path.display(), error = %e, "Failed writing temporary file");
        let _ = fs::remove_file(&tmp_path).await;
        return Err(e.into());
    }
    if let Err(e) = fs::rename(&tmp_path, dest).await {
        warn!(tmp = %tmp_path.display(), error = %e, "Failed renaming temporary file");
        let _ = fs::remove_file(&tmp_path).await;
        return Err(e.into());
    }

    info!("Wrote file atomically");
    Ok(())
}

async fn write_and_sync(path: &Path, contents: &[u8]) -> std::io::Result<()> {
    let mut file = fs::OpenOptions::new()
        .create_new(true)
        .write(true)
        .open(path)
        .await?;
    file.write_all(contents).await?;
    file.flush().await?;
    file.sync_all().await?;
    Ok(())
}
