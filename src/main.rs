//! Storefront-Sync main entry point
//!
//! This is the command-line interface for mirroring WooCommerce catalogs.

use anyhow::{bail, Context};
use clap::Parser;
use std::path::PathBuf;
use storefront_sync::config::{load_config_with_hash, Config};
use storefront_sync::crawler::{run_all_sites, run_sync, SyncOptions};
use storefront_sync::output::{load_statistics, print_statistics, print_sync_summary};
use storefront_sync::storage::open_storage;
use storefront_sync::SyncError;
use tracing_subscriber::EnvFilter;

/// Runs shown per site by `--stats`
const STATS_RUN_LIMIT: usize = 5;

/// Storefront-Sync: mirror WooCommerce catalogs into SQLite and a vector index
///
/// Pulls products, categories, variations and shipping configuration from
/// the REST API of a configured site, upserts them keyed by remote id, and
/// indexes a text projection of every product for similarity search.
#[derive(Parser, Debug)]
#[command(name = "storefront-sync")]
#[command(version = "1.0.0")]
#[command(about = "Mirror WooCommerce catalogs", long_about = None)]
struct Cli {
    /// Path to TOML configuration file
    #[arg(value_name = "CONFIG")]
    config: PathBuf,

    /// Site to sync (defaults to the site named "default", or the only site)
    #[arg(long, value_name = "NAME", conflicts_with = "all_sites")]
    site_name: Option<String>,

    /// Sitemap to read instead of <site-url>/sitemap.xml
    #[arg(long, value_name = "URL")]
    sitemap_url: Option<String>,

    /// Sync every configured site, one after another
    #[arg(long)]
    all_sites: bool,

    /// Increase logging verbosity (-v, -vv, -vvv)
    #[arg(short, long, action = clap::ArgAction::Count)]
    verbose: u8,

    /// Suppress non-error output
    #[arg(short, long, conflicts_with = "verbose")]
    quiet: bool,

    /// Validate config and show what would be synced without syncing
    #[arg(long, conflicts_with_all = ["stats", "list_sites"])]
    dry_run: bool,

    /// Show statistics from the database and exit
    #[arg(long, conflicts_with_all = ["dry_run", "list_sites"])]
    stats: bool,

    /// List configured sites and exit
    #[arg(long, conflicts_with_all = ["dry_run", "stats"])]
    list_sites: bool,
}

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    let cli = Cli::parse();

    // Setup logging based on verbosity
    setup_logging(cli.verbose, cli.quiet);

    tracing::info!("Loading configuration from: {}", cli.config.display());
    let (config, config_hash) = load_config_with_hash(&cli.config)
        .with_context(|| format!("Failed to load configuration {}", cli.config.display()))?;
    tracing::info!("Configuration loaded successfully (hash: {})", config_hash);

    let options = SyncOptions {
        site_name: cli.site_name.clone(),
        sitemap_url: cli.sitemap_url.clone(),
    };

    if cli.list_sites {
        handle_list_sites(&config);
    } else if cli.dry_run {
        handle_dry_run(&config, &options, cli.all_sites)?;
    } else if cli.stats {
        handle_stats(&config)?;
    } else if cli.all_sites {
        handle_all_sites(&config, &config_hash, &options).await?;
    } else {
        handle_sync(&config, &config_hash, &options).await?;
    }

    Ok(())
}

/// Sets up the logging/tracing subscriber based on verbosity level
fn setup_logging(verbose: u8, quiet: bool) {
    let filter = if quiet {
        // Only show errors
        EnvFilter::new("error")
    } else {
        match verbose {
            0 => EnvFilter::new("storefront_sync=info,warn"),
            1 => EnvFilter::new("storefront_sync=debug,info"),
            2 => EnvFilter::new("storefront_sync=trace,debug"),
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

fn handle_list_sites(config: &Config) {
    println!("Configured sites ({}):", config.sites.len());
    for site in &config.sites {
        println!("  - {} ({})", site.name, site.url);
    }
}

/// Reports an unknown or missing site with the names that would work
fn report_site_error(error: &SyncError) {
    if let SyncError::Config(e) = error {
        if let Some(available) = e.available_sites() {
            eprintln!("{}", e);
            eprintln!("Available sites: {}", available.join(", "));
        }
    }
}

/// Handles the --dry-run mode: validates config and shows what would be synced
fn handle_dry_run(
    config: &Config,
    options: &SyncOptions,
    all_sites: bool,
) -> anyhow::Result<()> {
    println!("=== Storefront-Sync Dry Run ===\n");

    let sites = if all_sites {
        config.sites.iter().collect::<Vec<_>>()
    } else {
        match config.site(options.site_name.as_deref()) {
            Ok(site) => vec![site],
            Err(e) => {
                let error = SyncError::Config(e);
                report_site_error(&error);
                return Err(error.into());
            }
        }
    };

    println!("Sites ({}):", sites.len());
    for site in &sites {
        println!("  - {} ({})", site.name, site.url);
    }

    println!("\nCrawler Configuration:");
    println!("  User agent: {}", config.crawler.user_agent);
    println!("  Delay: {}s", config.crawler.delay_seconds);
    println!("  Timeout: {}s", config.crawler.timeout_seconds);
    println!("  Page size: {}", config.crawler.page_size);
    println!("  Max attempts: {}", config.crawler.max_attempts);
    println!(
        "  Sitemap: {}",
        match (&options.sitemap_url, config.crawler.sitemap) {
            (_, false) => "disabled".to_string(),
            (Some(url), true) => url.clone(),
            (None, true) => "<site-url>/sitemap.xml".to_string(),
        }
    );
    println!("  Index pages: {}", config.crawler.index_pages);

    println!("\nStores:");
    println!("  Database: {}", config.database.target());
    println!("  Vector index: {}", config.vector.persist_directory);
    println!(
        "  Per-site collections: {}",
        config.vector.per_site_collections
    );

    println!("\n✓ Configuration is valid");
    println!("✓ Would sync {} site(s)", sites.len());

    Ok(())
}

/// Handles the --stats mode: shows statistics from the database
fn handle_stats(config: &Config) -> anyhow::Result<()> {
    let target = config.database.target();
    println!("Database: {}\n", target);

    let storage = open_storage(&target).context("Failed to open database")?;
    let stats = load_statistics(&storage, STATS_RUN_LIMIT)?;
    print_statistics(&stats);

    Ok(())
}

/// Handles a single-site sync
async fn handle_sync(
    config: &Config,
    config_hash: &str,
    options: &SyncOptions,
) -> anyhow::Result<()> {
    match run_sync(config, config_hash, options).await {
        Ok(summary) => {
            print_sync_summary(&summary);
            Ok(())
        }
        Err(e) => {
            tracing::error!("Sync could not run: {}", e);
            report_site_error(&e);
            Err(e.into())
        }
    }
}

/// Handles --all-sites: every configured site in turn
async fn handle_all_sites(
    config: &Config,
    config_hash: &str,
    options: &SyncOptions,
) -> anyhow::Result<()> {
    tracing::info!("Syncing {} sites", config.sites.len());

    let mut failed = Vec::new();
    for (name, result) in run_all_sites(config, config_hash, options).await {
        match result {
            Ok(summary) => {
                print_sync_summary(&summary);
                println!();
            }
            Err(e) => {
                eprintln!("Site '{}' could not sync: {}", name, e);
                failed.push(name);
            }
        }
    }

    if !failed.is_empty() {
        bail!("{} site(s) could not sync: {}", failed.len(), failed.join(", "));
    }
    Ok(())
}
