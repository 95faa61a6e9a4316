//! # News Digest
//!
//! A daily news curation pipeline: collect items from feeds and search APIs,
//! drop everything already seen, label what remains by keyword topic, rank it
//! and write a short Markdown digest.
//!
//! ## Features
//!
//! - Collects RSS/Atom feeds, the Hacker News front page and Tavily searches
//! - Canonicalizes URLs so tracking variants of one story count once
//! - Remembers seen URLs for a configurable number of days
//! - Classifies titles against a keyword taxonomy with phrase masking
//! - Scores by source weight, popularity, keyword density, release flag and age
//! - Caps the digest at a fixed number of items
//!
//! ## Usage
//!
//! ```sh
//! news_digest run
//! news_digest analyze --input raw.jsonl --output digest.md
//! ```
//!
//! ## Architecture
//!
//! The application is split into two steps that communicate via a JSONL file:
//! 1. **Collect**: fetch every source and write the raw batch
//! 2. **Analyze**: dedup → classify → score → cap, render the digest, then
//!    persist the seen-URL store

use chrono::{DateTime, Utc};
use clap::Parser;
use std::error::Error;
use std::path::{Path, PathBuf};
use tracing::{debug, error, info, instrument};
use tracing_subscriber::{EnvFilter, fmt as tfmt};

mod classify;
mod cli;
mod config;
mod dedup;
mod http;
mod models;
mod outputs;
mod paths;
mod pipeline;
mod scoring;
mod scrapers;
mod seen;
mod urls;
mod utils;

use cli::{AnalyzeArgs, Cli, CollectArgs, Command};
use config::{PipelineConfig, resolve_config};
use outputs::{digest, jsonl};
use paths::DataLayout;
use pipeline::{curate, read_batch};
use seen::{SEEN_URLS_FILE, SeenUrls};
use utils::ensure_writable_dir;

#[tokio::main]
async fn main() -> Result<(), Box<dyn Error>> {
    // --- Tracing init (stderr; stdout carries the run summary) ---
    let filter = EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info"));
    tfmt()
        .with_env_filter(filter)
        .with_writer(std::io::stderr)
        .with_target(true)
        .with_file(false)
        .with_line_number(false)
        .with_timer(tracing_subscriber::fmt::time::UtcTime::rfc_3339())
        .init();

    let start_time = std::time::Instant::now();
    info!("news_digest starting up");

    let args = Cli::parse();
    debug!(config = ?args.config, data_dir = ?args.data_dir, "Parsed CLI arguments");

    let result = dispatch(&args).await;
    match &result {
        Ok(summary) => println!("{summary}"),
        Err(e) => error!(error = %e, "Run failed"),
    }

    let elapsed = start_time.elapsed();
    info!(
        ?elapsed,
        secs = elapsed.as_secs(),
        millis = elapsed.subsec_millis(),
        "Execution complete"
    );
    result.map(|_| ())
}

/// Run the selected command and return its one-line summary.
async fn dispatch(args: &Cli) -> Result<String, Box<dyn Error>> {
    let now = Utc::now();
    let layout = match &args.data_dir {
        Some(root) => DataLayout::rooted_at(root),
        None => DataLayout::discover()?,
    };

    // Config problems are fatal before anything touches disk.
    let config = resolve_config(
        args.config.as_deref(),
        &layout.config_file(),
        args.preset_dir.as_deref(),
    )?
    .validate()?;
    info!(
        feeds = config.feeds.len(),
        topics = config.taxonomy.len(),
        max_items = config.max_items,
        retention_days = config.retention_days,
        "Loaded configuration"
    );

    let summary = match args.command() {
        Command::Collect(collect_args) => {
            let (output, count) = collect(&config, &layout, collect_args, now).await?;
            format!("[collect] Written {count} items to {}", output.display())
        }
        Command::Analyze(analyze_args) => analyze(&config, &layout, analyze_args, now).await?,
        Command::Run(run_args) => {
            let (batch, _) = collect(&config, &layout, run_args.collect, now).await?;
            let analyze_args = AnalyzeArgs {
                input: Some(batch),
                output: run_args.digest,
                state_dir: run_args.state_dir,
            };
            analyze(&config, &layout, analyze_args, now).await?
        }
    };
    Ok(summary)
}

/// Fetch every source and write the raw batch. Returns the batch path and
/// the number of items written.
#[instrument(level = "info", skip_all)]
async fn collect(
    config: &PipelineConfig,
    layout: &DataLayout,
    args: CollectArgs,
    now: DateTime<Utc>,
) -> Result<(PathBuf, usize), Box<dyn Error>> {
    let output = args
        .output
        .unwrap_or_else(|| layout.raw_batch(now.date_naive()));
    ensure_parent_writable(&output).await?;

    let client = scrapers::build_client()?;
    let items = scrapers::collect_all(config, &client, args.tavily_api_key.as_deref(), now).await;
    jsonl::write_batch(&items, &output).await?;

    info!(count = items.len(), path = %output.display(), "Collect finished");
    Ok((output, items.len()))
}

/// Curate a raw batch into a digest, then persist the seen-URL store.
/// Returns the run summary line.
///
/// The digest is written before the store is saved: if the digest write
/// fails, the same batch can be analyzed again.
#[instrument(level = "info", skip_all)]
async fn analyze(
    config: &PipelineConfig,
    layout: &DataLayout,
    args: AnalyzeArgs,
    now: DateTime<Utc>,
) -> Result<String, Box<dyn Error>> {
    let date = now.date_naive();
    let input = args.input.unwrap_or_else(|| layout.raw_batch(date));
    let output = args.output.unwrap_or_else(|| layout.digest(date));
    let state_dir = args.state_dir.unwrap_or_else(|| layout.state_dir());

    ensure_parent_writable(&output).await?;
    ensure_writable_dir(&state_dir).await?;

    let items = read_batch(&input).await?;
    let mut seen = SeenUrls::load(state_dir.join(SEEN_URLS_FILE), config.retention_days, now).await;
    debug!(store = %seen.path().display(), urls = seen.len(), "Loaded seen-URL store");

    let curated = curate(items, &mut seen, config, now);
    let rendered = digest::render_digest(&curated.items, date, &curated.stats);
    digest::write_digest(&output, &rendered).await?;
    seen.save().await?;

    let stats = curated.stats;
    Ok(format!(
        "[analyze] Collected: {} | Filtered: {} | Kept: {} | Digest: {}",
        stats.collected,
        stats.filtered,
        stats.kept,
        output.display()
    ))
}

async fn ensure_parent_writable(path: &Path) -> Result<(), Box<dyn Error>> {
    match path.parent() {
        Some(parent) if !parent.as_os_str().is_empty() => ensure_writable_dir(parent).await,
        _ => Ok(()),
    }
}
