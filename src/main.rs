//! sb-harvest main entry point
//!
//! This is the command-line interface for the sb-harvest soundboard harvester.

use anyhow::Context;
use clap::Parser;
use sb_harvest::config::{load_config_with_hash, validate, Config, Overrides};
use sb_harvest::crawler::crawl;
use sb_harvest::output::{print_crawl_stats, print_statistics, summarize_items};
use sb_harvest::storage::read_snapshot;
use std::path::PathBuf;
use tracing_subscriber::EnvFilter;

/// sb-harvest: an incremental soundboard harvester
///
/// Walks a paginated soundboard listing, crawls boards it has not seen before,
/// downloads their audio clips and records everything in a JSON snapshot store.
#[derive(Parser, Debug)]
#[command(name = "sb-harvest")]
#[command(version)]
#[command(about = "An incremental soundboard harvester", long_about = None)]
struct Cli {
    /// Path to TOML configuration file (defaults are used when omitted)
    #[arg(short, long, value_name = "FILE")]
    config: Option<PathBuf>,

    /// Maximum number of new items to crawl this run
    #[arg(long, env = "MAX_NEW_ITEMS")]
    max_new_items: Option<usize>,

    /// Crawl this one detail page instead of walking the listing
    #[arg(long, env = "TARGET_URL")]
    target_url: Option<String>,

    /// Root directory for item folders
    #[arg(long, env = "OUTPUT_DIR")]
    output_dir: Option<PathBuf>,

    /// Path to the JSON snapshot store
    #[arg(long, env = "DATABASE_PATH")]
    database_path: Option<PathBuf>,

    /// Increase logging verbosity (-v, -vv, -vvv)
    #[arg(short, long, action = clap::ArgAction::Count)]
    verbose: u8,

    /// Suppress non-error output
    #[arg(short, long, conflicts_with = "verbose")]
    quiet: bool,

    /// Validate config and show what would be crawled without actually crawling
    #[arg(long, conflicts_with = "stats")]
    dry_run: bool,

    /// Show statistics from the store and exit
    #[arg(long, conflicts_with = "dry_run")]
    stats: bool,
}

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    // A missing .env file is fine
    let _ = dotenvy::dotenv();

    let cli = Cli::parse();

    setup_logging(cli.verbose, cli.quiet);

    let config = match load_effective_config(&cli) {
        Ok(config) => config,
        Err(e) => {
            tracing::error!("Failed to load configuration: {:#}", e);
            return Err(e);
        }
    };

    if cli.dry_run {
        handle_dry_run(&config);
    } else if cli.stats {
        handle_stats(&config)?;
    } else {
        handle_crawl(config).await?;
    }

    Ok(())
}

/// Defaults, then the optional file, then environment/CLI overrides
fn load_effective_config(cli: &Cli) -> anyhow::Result<Config> {
    let mut config = match &cli.config {
        Some(path) => {
            tracing::info!("Loading configuration from: {}", path.display());
            let (config, hash) = load_config_with_hash(path)
                .with_context(|| format!("reading {}", path.display()))?;
            tracing::info!("Configuration loaded successfully (hash: {})", hash);
            config
        }
        None => {
            tracing::debug!("No configuration file given, using defaults");
            Config::default()
        }
    };

    Overrides {
        max_new_items: cli.max_new_items,
        target_url: cli.target_url.clone(),
        output_dir: cli.output_dir.clone(),
        database_path: cli.database_path.clone(),
    }
    .apply(&mut config);

    validate(&config).context("invalid effective configuration")?;
    Ok(config)
}

/// Sets up the logging/tracing subscriber based on verbosity level
///
/// `RUST_LOG` wins over the flags when set.
fn setup_logging(verbose: u8, quiet: bool) {
    let filter = EnvFilter::try_from_default_env().unwrap_or_else(|_| {
        if quiet {
            EnvFilter::new("error")
        } else {
            match verbose {
                0 => EnvFilter::new("sb_harvest=info,warn"),
                1 => EnvFilter::new("sb_harvest=debug,info"),
                2 => EnvFilter::new("sb_harvest=trace,debug"),
                _ => EnvFilter::new("trace"),
            }
        }
    });

    tracing_subscriber::fmt()
        .with_env_filter(filter)
        .with_target(false)
        .with_thread_ids(false)
        .with_file(false)
        .init();
}

/// Handles the --dry-run mode: shows the effective configuration
fn handle_dry_run(config: &Config) {
    println!("=== sb-harvest Dry Run ===\n");

    println!("Crawler:");
    match &config.crawler.target_url {
        Some(target) => println!("  Mode: single target ({})", target),
        None => println!("  Mode: paginated ({})", config.crawler.listing_url),
    }
    println!("  Max new items: {}", config.crawler.max_new_items);
    println!("  Page delay: {}ms", config.crawler.page_delay_ms);

    println!("\nHTTP:");
    println!("  User-Agent: {}", config.user_agent.header_value());
    println!("  Page timeout: {}s", config.http.page_timeout_secs);
    println!("  Asset timeout: {}s", config.http.asset_timeout_secs);

    println!("\nDownloads:");
    println!("  Batch size: {}", config.download.batch_size);
    println!("  Max attempts: {}", config.download.max_attempts);
    println!("  Retry base delay: {}ms", config.download.retry_base_delay_ms);
    println!("  Batch delay: {}ms", config.download.batch_delay_ms);

    println!("\nOutput:");
    println!("  Output dir: {}", config.output.output_dir.display());
    println!("  Store: {}", config.output.database_path.display());
    println!("  Flush every: {} upserts", config.output.flush_every);

    println!("\n✓ Configuration is valid");
}

/// Handles the --stats mode: shows statistics from the store
///
/// Reads the snapshot without taking the store lock, so it works while a crawl
/// is running and never creates a missing store.
fn handle_stats(config: &Config) -> anyhow::Result<()> {
    println!("Store: {}\n", config.output.database_path.display());

    let items = read_snapshot(&config.output.database_path)
        .with_context(|| format!("reading {}", config.output.database_path.display()))?;
    print_statistics(&summarize_items(&items));

    Ok(())
}

/// Handles the main crawl operation
async fn handle_crawl(config: Config) -> anyhow::Result<()> {
    tracing::info!("User-Agent: {}", config.user_agent.header_value());

    match crawl(config).await {
        Ok(stats) => {
            tracing::info!("Crawl completed successfully");
            print_crawl_stats(&stats);
            Ok(())
        }
        Err(e) => {
            tracing::error!("Crawl failed: {}", e);
            Err(e.into())
        }
    }
}
