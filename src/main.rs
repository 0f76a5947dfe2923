//! Refindex main entry point
//!
//! This is the command-line interface for the Refindex documentation indexer.

use anyhow::{Context, Result};
use clap::Parser;
use refindex::config::{load_config_with_hash, Config};
use refindex::crawler::Crawler;
use refindex::index::{search, IndexBuilder};
use refindex::storage::{open_storage, IndexStore};
use std::path::{Path, PathBuf};
use tokio_util::sync::CancellationToken;
use tracing_subscriber::EnvFilter;

/// Refindex: a documentation-site indexer
///
/// Refindex crawls a reference documentation site, extracts page titles and
/// alias keywords, and stores a searchable name → location index. It can
/// also convert HTML table fragments into tbl markup.
#[derive(Parser, Debug)]
#[command(name = "refindex")]
#[command(version)]
#[command(about = "A documentation-site indexer", long_about = None)]
struct Cli {
    /// Path to TOML configuration file
    #[arg(value_name = "CONFIG", required_unless_present = "table")]
    config: Option<PathBuf>,

    /// Increase logging verbosity (-v, -vv, -vvv)
    #[arg(short, long, action = clap::ArgAction::Count)]
    verbose: u8,

    /// Suppress non-error output
    #[arg(short, long, conflicts_with = "verbose")]
    quiet: bool,

    /// Look up PATTERN in the existing index and exit
    #[arg(long, value_name = "PATTERN", conflicts_with_all = ["stats", "table"])]
    find: Option<String>,

    /// Show index statistics and exit
    #[arg(long, conflicts_with_all = ["find", "table"])]
    stats: bool,

    /// Convert the HTML table fragment in FILE to tbl markup and exit
    #[arg(long, value_name = "FILE", conflicts_with_all = ["find", "stats"])]
    table: Option<PathBuf>,
}

#[tokio::main]
async fn main() -> Result<()> {
    let cli = Cli::parse();

    setup_logging(cli.verbose, cli.quiet);

    if let Some(fragment) = &cli.table {
        return handle_table(fragment);
    }

    let config_path = cli
        .config
        .as_deref()
        .context("a configuration file is required")?;

    tracing::info!("Loading configuration from: {}", config_path.display());
    let (config, config_hash) = load_config_with_hash(config_path)
        .with_context(|| format!("failed to load {}", config_path.display()))?;
    tracing::info!("Configuration loaded successfully (hash: {})", config_hash);

    if let Some(pattern) = &cli.find {
        handle_find(&config, pattern)
    } else if cli.stats {
        handle_stats(&config)
    } else {
        handle_rebuild(config, config_hash).await
    }
}

/// Sets up the logging/tracing subscriber based on verbosity level
fn setup_logging(verbose: u8, quiet: bool) {
    let filter = if quiet {
        EnvFilter::new("error")
    } else {
        match verbose {
            0 => EnvFilter::new("refindex=info,warn"),
            1 => EnvFilter::new("refindex=debug,info"),
            2 => EnvFilter::new("refindex=trace,debug"),
            _ => EnvFilter::new("trace"),
        }
    };

    tracing_subscriber::fmt()
        .with_env_filter(filter)
        .with_target(false)
        .with_thread_ids(false)
        .with_file(false)
        .init();
}

/// Handles --table: prints the tbl markup for an HTML fragment
fn handle_table(path: &Path) -> Result<()> {
    let fragment = std::fs::read_to_string(path)
        .with_context(|| format!("failed to read {}", path.display()))?;
    let markup = refindex::table::layout(&fragment)
        .with_context(|| format!("failed to lay out table in {}", path.display()))?;
    print!("{}", markup);
    Ok(())
}

/// Handles --find: prints ranked hits for a pattern
fn handle_find(config: &Config, pattern: &str) -> Result<()> {
    let store = open_storage(Path::new(&config.output.database_path))
        .context("failed to open index database")?;

    let hits = search(&store, pattern)?;
    if hits.is_empty() {
        println!("no matching entry for {}", pattern);
        return Ok(());
    }

    for hit in hits {
        println!("{}  [{}]  {}", hit.keyword, hit.title, hit.url);
    }
    Ok(())
}

/// Handles --stats: shows index counts and the latest build
fn handle_stats(config: &Config) -> Result<()> {
    println!("Database: {}\n", config.output.database_path);

    let store = open_storage(Path::new(&config.output.database_path))
        .context("failed to open index database")?;

    println!("Rows:     {}", store.count_rows()?);
    println!("Keywords: {}", store.count_keywords()?);

    match store.latest_build()? {
        Some(build) => {
            println!("\nLatest build #{}", build.id);
            println!("  Started:     {}", build.started_at.to_rfc3339());
            println!("  Finished:    {}", build.finished_at.to_rfc3339());
            println!("  Config hash: {}", build.config_hash);
            println!("  Rows:        {}", build.rows);
            println!("  Keywords:    {}", build.keywords);
        }
        None => println!("\nNo completed build"),
    }

    Ok(())
}

/// Handles the default mode: crawls the origin and rebuilds the index
async fn handle_rebuild(config: Config, config_hash: String) -> Result<()> {
    let cancel = CancellationToken::new();
    let crawler = Crawler::new(config.crawler.clone(), &config.user_agent)
        .context("failed to set up crawler")?
        .with_cancellation(cancel.clone());

    tokio::spawn(async move {
        if tokio::signal::ctrl_c().await.is_ok() {
            tracing::warn!("Interrupted; cancelling crawl");
            cancel.cancel();
        }
    });

    let mut store = open_storage(Path::new(&config.output.database_path))
        .context("failed to open index database")?;

    tracing::info!(
        "Crawling {} (follow mode {:?}, up to {} workers)",
        config.source.origin,
        config.crawler.follow_mode,
        config.crawler.max_outstanding
    );

    let report = IndexBuilder::new(config_hash)
        .with_blacklist(config.source.blacklist.clone())
        .rebuild(
            &crawler,
            &config.source.origin,
            config.source.path.as_deref(),
            &mut store,
        )
        .await
        .context("index rebuild failed")?;

    println!(
        "Indexed {} documents in {} rounds",
        report.crawl.succeeded, report.crawl.rounds
    );
    println!(
        "Build #{}: {} rows, {} keywords ({} aliases added, {} renamed)",
        report.build.build_id,
        report.build.rows,
        report.build.keywords,
        report.build.aliases_added,
        report.build.renamed
    );

    if !report.crawl.failed.is_empty() {
        println!("\nGave up on {} URLs:", report.crawl.failed.len());
        for target in &report.crawl.failed {
            println!("  {} (depth {})", target.url, target.depth);
        }
    }

    Ok(())
}
