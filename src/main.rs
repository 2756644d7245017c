//! Prompt-Harvest main entry point
//!
//! This is the command-line interface for acquiring a bounded snapshot of a
//! website or repository.

use anyhow::Context;
use clap::Parser;
use prompt_harvest::cache::{open_cache, CacheEnvironment, ClearOutcome, RequestOptions};
use prompt_harvest::config::{load_config_with_hash, Config};
use prompt_harvest::crawler::Crawler;
use prompt_harvest::{classify, Ingestor, Snapshot, SourceKind};
use serde_json::json;
use std::path::PathBuf;
use tracing_subscriber::EnvFilter;

/// Prompt-Harvest: bounded, cache-fronted content acquisition
///
/// Validates the input URL, crawls websites breadth-first within a page and
/// depth budget while honoring robots.txt, and caches the result so repeated
/// requests are served without network access.
#[derive(Parser, Debug)]
#[command(name = "prompt-harvest")]
#[command(version)]
#[command(about = "Bounded, cache-fronted content acquisition", long_about = None)]
struct Cli {
    /// Website or repository URL to harvest
    #[arg(value_name = "URL", required_unless_present_any = ["clear_cache", "stats"])]
    url: Option<String>,

    /// Path to TOML configuration file
    #[arg(short, long, value_name = "FILE")]
    config: Option<PathBuf>,

    /// Override the maximum link depth
    #[arg(long)]
    max_depth: Option<u32>,

    /// Override the maximum number of pages
    #[arg(long)]
    max_pages: Option<usize>,

    /// Do not fetch or honor robots.txt
    #[arg(long)]
    ignore_robots: bool,

    /// Cache directory (forces the filesystem backend)
    #[arg(long, value_name = "DIR")]
    cache_dir: Option<PathBuf>,

    /// Clear the cache namespace and exit
    #[arg(long, conflicts_with_all = ["dry_run", "stats"])]
    clear_cache: bool,

    /// Print cache statistics and exit
    #[arg(long, conflicts_with_all = ["dry_run", "clear_cache"])]
    stats: bool,

    /// Validate and classify the URL without fetching anything
    #[arg(long, conflicts_with_all = ["clear_cache", "stats"])]
    dry_run: bool,

    /// Increase logging verbosity (-v, -vv, -vvv)
    #[arg(short, long, action = clap::ArgAction::Count)]
    verbose: u8,

    /// Suppress non-error output
    #[arg(short, long, conflicts_with = "verbose")]
    quiet: bool,
}

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    let cli = Cli::parse();

    // Setup logging based on verbosity
    setup_logging(cli.verbose, cli.quiet);

    let mut config = match &cli.config {
        Some(path) => {
            tracing::info!("Loading configuration from: {}", path.display());
            let (config, hash) = load_config_with_hash(path)
                .with_context(|| format!("failed to load {}", path.display()))?;
            tracing::info!("Configuration loaded successfully (hash: {})", hash);
            config
        }
        None => Config::default(),
    };
    apply_overrides(&mut config, &cli);

    if cli.dry_run {
        return handle_dry_run(&config, cli.url.as_deref().unwrap_or_default());
    }

    let env = CacheEnvironment::probe(&config.cache);
    let cache = open_cache(&env, &config.cache).await;

    if cli.clear_cache {
        match cache.clear().await {
            ClearOutcome::Cleared => println!("Cleared {} cache", cache.kind()),
            ClearOutcome::Unsupported => {
                println!("The {} cache cannot be cleared; entries expire by TTL", cache.kind())
            }
            ClearOutcome::Failed => anyhow::bail!("failed to clear the {} cache", cache.kind()),
        }
        return Ok(());
    }

    if cli.stats {
        println!("{}", serde_json::to_string_pretty(&cache.stats().await)?);
        return Ok(());
    }

    let url = cli.url.as_deref().unwrap_or_default();
    let crawler = Crawler::from_config(&config)?;
    let ingestor = Ingestor::new(cache, crawler);

    let snapshot = ingestor
        .ingest(url, &RequestOptions::default(), &config.crawler.budget())
        .await?;
    println!("{}", serde_json::to_string_pretty(&summarize(&snapshot))?);

    Ok(())
}

/// Sets up the logging/tracing subscriber based on verbosity level
fn setup_logging(verbose: u8, quiet: bool) {
    let filter = if quiet {
        // Only show errors
        EnvFilter::new("error")
    } else {
        match verbose {
            0 => EnvFilter::new("prompt_harvest=info,warn"),
            1 => EnvFilter::new("prompt_harvest=debug,info"),
            2 => EnvFilter::new("prompt_harvest=trace,debug"),
            _ => EnvFilter::new("trace"),
        }
    };

    tracing_subscriber::fmt()
        .with_env_filter(filter)
        .with_target(false)
        .with_thread_ids(false)
        .with_file(false)
        .with_writer(std::io::stderr)
        .init();
}

fn apply_overrides(config: &mut Config, cli: &Cli) {
    if let Some(max_depth) = cli.max_depth {
        config.crawler.max_depth = max_depth;
    }
    if let Some(max_pages) = cli.max_pages {
        config.crawler.max_pages = max_pages;
    }
    if cli.ignore_robots {
        config.crawler.ignore_robots = true;
    }
    if let Some(dir) = &cli.cache_dir {
        config.cache.directory = Some(dir.clone());
        config.cache.backend = prompt_harvest::config::BackendChoice::Filesystem;
    }
}

/// Handles the --dry-run mode: classifies the URL and shows the budget
fn handle_dry_run(config: &Config, url: &str) -> anyhow::Result<()> {
    let source = classify(url);
    if source.kind == SourceKind::Rejected {
        anyhow::bail!(
            "rejected '{}': {}",
            url,
            source.rejection.unwrap_or_default()
        );
    }

    let budget = config.crawler.budget();
    let summary = json!({
        "source": source,
        "budget": {
            "max_depth": budget.max_depth,
            "max_pages": budget.max_pages,
            "ignore_robots": budget.ignore_robots,
            "timeout_per_page_ms": budget.timeout_per_page.as_millis() as u64,
        },
        "user_agent": config.user_agent.header_value(),
    });
    println!("{}", serde_json::to_string_pretty(&summary)?);
    Ok(())
}

fn summarize(snapshot: &Snapshot) -> serde_json::Value {
    match snapshot {
        Snapshot::Repository {
            source,
            files,
            from_cache,
        } => json!({
            "kind": "git-repository",
            "source": source.repository_slug(),
            "from_cache": from_cache,
            "files": files.iter().map(|file| &file.path).collect::<Vec<_>>(),
        }),
        Snapshot::Website {
            source,
            report,
            from_cache,
        } => json!({
            "kind": "website",
            "source": source.normalized_url,
            "from_cache": from_cache,
            "pages": report.len(),
            "failed": report.failed().count(),
            "results": report.pages.iter().map(|page| json!({
                "url": page.url,
                "depth": page.depth,
                "status": page.status_code,
                "title": page.title,
                "error": page.error,
            })).collect::<Vec<_>>(),
        }),
    }
}
