//! Default on-disk layout.
//!
//! ```text
//! <data_dir>/
//! ├── raw/2025-05-06.jsonl      # collected batch
//! ├── digests/2025-05-06.md     # rendered digest
//! └── state/seen_urls.txt       # seen-URL store
//! <config_dir>/config.yaml
//! ```
//!
//! `data_dir` and `config_dir` follow the platform convention
//! (`$XDG_DATA_HOME/news-digest` and `$XDG_CONFIG_HOME/news-digest` on Linux).

use chrono::NaiveDate;
use directories::ProjectDirs;
use std::io;
use std::path::{Path, PathBuf};

const APPLICATION: &str = "news-digest";

#[derive(Debug, Clone, PartialEq)]
pub struct DataLayout {
    data_dir: PathBuf,
    config_dir: PathBuf,
}

impl DataLayout {
    /// Resolve the per-user layout for the current platform.
    pub fn discover() -> io::Result<Self> {
        let dirs = ProjectDirs::from("", "", APPLICATION).ok_or_else(|| {
            io::Error::new(io::ErrorKind::NotFound, "could not determine a home directory")
        })?;
        Ok(Self {
            data_dir: dirs.data_dir().to_path_buf(),
            config_dir: dirs.config_dir().to_path_buf(),
        })
    }

    /// A layout rooted at a single directory, with config under `<root>/config`.
    pub fn rooted_at(root: impl AsRef<Path>) -> Self {
        let root = root.as_ref();
        Self {
            data_dir: root.to_path_buf(),
            config_dir: root.join("config"),
        }
    }

    pub fn raw_batch(&self, date: NaiveDate) -> PathBuf {
        self.data_dir.join("raw").join(format!("{date}.jsonl"))
    }

    pub fn digest(&self, date: NaiveDate) -> PathBuf {
        self.data_dir.join("digests").join(format!("{date}.md"))
    }

    pub fn state_dir(&self) -> PathBuf {
        self.data_dir.join("state")
    }

    pub fn config_file(&self) -> PathBuf {
        self.config_dir.join("config.yaml")
    }
}
