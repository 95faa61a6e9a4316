//! Command-line interface definitions for News Digest.
//!
//! This module defines the CLI arguments and options using the `clap` crate.
//! Options that are commonly set per machine can also come from environment
//! variables.

use clap::{Args, Parser, Subcommand};
use std::path::PathBuf;

/// Command-line arguments for the News Digest application.
///
/// Without a subcommand the tool runs `analyze` on today's batch.
///
/// # Examples
///
/// ```sh
/// # Fetch today's batch, then curate it into a digest
/// news_digest run
///
/// # Only curate an existing batch into a specific file
/// news_digest analyze --input raw.jsonl --output digest.md
///
/// # Keep everything under one directory
/// news_digest --data-dir ./data --config ./config.yaml collect
/// ```
#[derive(Parser, Debug)]
#[command(author, version, about)]
pub struct Cli {
    /// Path to config.yaml (defaults to the per-user config file)
    #[arg(short, long, global = true)]
    pub config: Option<PathBuf>,

    /// Directory holding `<name>.yaml` presets
    #[arg(long, global = true, env = "NEWS_DIGEST_PRESET_DIR")]
    pub preset_dir: Option<PathBuf>,

    /// Root for raw batches, digests and state (defaults to the per-user data dir)
    #[arg(long, global = true, env = "NEWS_DIGEST_HOME")]
    pub data_dir: Option<PathBuf>,

    #[command(subcommand)]
    pub command: Option<Command>,
}

#[derive(Subcommand, Debug, Clone, PartialEq)]
pub enum Command {
    /// Fetch all sources and write today's raw batch
    Collect(CollectArgs),
    /// Curate a raw batch into a digest and update the seen-URL store
    Analyze(AnalyzeArgs),
    /// Collect, then analyze the fresh batch
    Run(RunArgs),
}

#[derive(Args, Debug, Clone, Default, PartialEq)]
pub struct CollectArgs {
    /// Output JSONL path (defaults to `<data_dir>/raw/<date>.jsonl`)
    #[arg(short, long)]
    pub output: Option<PathBuf>,

    /// Tavily API key; search is skipped when unset
    #[arg(long, env = "TAVILY_API_KEY", hide_env_values = true)]
    pub tavily_api_key: Option<String>,
}

#[derive(Args, Debug, Clone, Default, PartialEq)]
pub struct AnalyzeArgs {
    /// Input JSONL batch (defaults to `<data_dir>/raw/<date>.jsonl`)
    #[arg(short, long)]
    pub input: Option<PathBuf>,

    /// Output digest path (defaults to `<data_dir>/digests/<date>.md`)
    #[arg(short, long)]
    pub output: Option<PathBuf>,

    /// Directory holding `seen_urls.txt` (defaults to `<data_dir>/state`)
    #[arg(long)]
    pub state_dir: Option<PathBuf>,
}

#[derive(Args, Debug, Clone, Default, PartialEq)]
pub struct RunArgs {
    #[command(flatten)]
    pub collect: CollectArgs,

    /// Output digest path (defaults to `<data_dir>/digests/<date>.md`)
    #[arg(long = "digest")]
    pub digest: Option<PathBuf>,

    /// Directory holding `seen_urls.txt` (defaults to `<data_dir>/state`)
    #[arg(long)]
    pub state_dir: Option<PathBuf>,
}

impl Cli {
    /// The subcommand to run; `analyze` with defaults when none was given.
    pub fn command(&self) -> Command {
        self.command
            .clone()
            .unwrap_or_else(|| Command::Analyze(AnalyzeArgs::default()))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_default_command_is_analyze() {
        let cli = Cli::parse_from(["news_digest"]);
        assert_eq!(cli.command(), Command::Analyze(AnalyzeArgs::default()));
    }

    #[test]
    fn test_analyze_paths() {
        let cli = Cli::parse_from([
            "news_digest",
            "analyze",
            "--input",
            "raw.jsonl",
            "-o",
            "out.md",
            "--state-dir",
            "/tmp/state",
        ]);

        let Command::Analyze(args) = cli.command() else {
            panic!("expected analyze");
        };
        assert_eq!(args.input, Some(PathBuf::from("raw.jsonl")));
        assert_eq!(args.output, Some(PathBuf::from("out.md")));
        assert_eq!(args.state_dir, Some(PathBuf::from("/tmp/state")));
    }

    #[test]
    fn test_global_flags_after_subcommand() {
        let cli = Cli::parse_from([
            "news_digest",
            "collect",
            "--config",
            "my.yaml",
            "--data-dir",
            "/tmp/nd",
            "-o",
            "batch.jsonl",
        ]);

        assert_eq!(cli.config, Some(PathBuf::from("my.yaml")));
        assert_eq!(cli.data_dir, Some(PathBuf::from("/tmp/nd")));
        let Command::Collect(args) = cli.command() else {
            panic!("expected collect");
        };
        assert_eq!(args.output, Some(PathBuf::from("batch.jsonl")));
    }

    #[test]
    fn test_run_accepts_collect_and_analyze_flags() {
        let cli = Cli::parse_from([
            "news_digest",
            "run",
            "--output",
            "batch.jsonl",
            "--digest",
            "digest.md",
            "--tavily-api-key",
            "k",
        ]);

        let Command::Run(args) = cli.command() else {
            panic!("expected run");
        };
        assert_eq!(args.collect.output, Some(PathBuf::from("batch.jsonl")));
        assert_eq!(args.collect.tavily_api_key.as_deref(), Some("k"));
        assert_eq!(args.digest, Some(PathBuf::from("digest.md")));
    }
}
