//! Output generation for the raw batch and the rendered digest.
//!
//! # Submodules
//!
//! - [`digest`]: renders selected items as a Markdown digest and writes it
//! - [`jsonl`]: writes a collected batch as newline-delimited JSON
//!
//! # Output Structure
//!
//! ```text
//! <data_dir>/
//! ├── raw/
//! │   └── 2025-05-06.jsonl
//! └── digests/
//!     └── 2025-05-06.md
//! ```
//!
//! Both files are written atomically, so a reader sees either the previous
//! file or the complete new one.

pub mod digest;
pub mod jsonl;
