//! kb-harvester main entry point
//!
//! This is the command-line interface for the knowledge-base harvester.

use anyhow::{Context, Result};
use clap::Parser;
use kb_harvester::config::{load_config_with_hash, Config};
use kb_harvester::output::print_statistics;
use kb_harvester::url::normalize_url;
use kb_harvester::Harvester;
use std::path::PathBuf;
use tracing_subscriber::EnvFilter;

/// kb-harvester: folds a hyperlinked knowledge base into composite documents
///
/// Starting from each crawl root, linked pages are fetched and embedded in
/// place of their links up to the configured depth. Each root becomes one
/// entry in its own append-only text artifact; images are saved alongside.
#[derive(Parser, Debug)]
#[command(name = "kb-harvester")]
#[command(version)]
#[command(about = "Recursive knowledge-base harvester", long_about = None)]
struct Cli {
    /// Path to TOML configuration file
    #[arg(value_name = "CONFIG")]
    config: PathBuf,

    /// Increase logging verbosity (-v, -vv, -vvv)
    #[arg(short, long, action = clap::ArgAction::Count)]
    verbose: u8,

    /// Suppress non-error output
    #[arg(short, long, conflicts_with = "verbose")]
    quiet: bool,

    /// Empty each crawl root's artifact before harvesting
    #[arg(long)]
    fresh: bool,

    /// Validate config and show what would be harvested without fetching anything
    #[arg(long)]
    dry_run: bool,

    /// Harvest these crawl roots instead of the configured ones
    #[arg(long = "url", value_name = "URL")]
    urls: Vec<String>,
}

#[tokio::main]
async fn main() -> Result<()> {
    let cli = Cli::parse();

    // Setup logging based on verbosity
    setup_logging(cli.verbose, cli.quiet);

    // Load and validate configuration
    tracing::info!("Loading configuration from: {}", cli.config.display());
    let (mut config, hash) = load_config_with_hash(&cli.config)
        .with_context(|| format!("Failed to load configuration from {}", cli.config.display()))?;
    tracing::info!("Configuration loaded successfully (hash: {})", hash);

    if !cli.urls.is_empty() {
        for url in &cli.urls {
            normalize_url(url).with_context(|| format!("Invalid --url value: {}", url))?;
        }
        config.harvest.roots = cli.urls.clone();
    }

    if cli.dry_run {
        handle_dry_run(&config);
        return Ok(());
    }

    handle_harvest(config, cli.fresh).await
}

/// Sets up the logging/tracing subscriber based on verbosity level
fn setup_logging(verbose: u8, quiet: bool) {
    let filter = if quiet {
        // Only show errors
        EnvFilter::new("error")
    } else {
        match verbose {
            0 => EnvFilter::new("kb_harvester=info,warn"),
            1 => EnvFilter::new("kb_harvester=debug,info"),
            2 => EnvFilter::new("kb_harvester=trace,debug"),
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

/// Handles the --dry-run mode: shows the resolved configuration
fn handle_dry_run(config: &Config) {
    println!("=== kb-harvester Dry Run ===\n");

    println!("Harvest:");
    println!("  Max depth: {}", config.harvest.max_depth);
    println!(
        "  Reset visited per root: {}",
        config.harvest.reset_visited_per_root
    );
    match config.harvest.recheck_duplicates_below_depth {
        Some(depth) => println!("  Re-check duplicates below depth: {}", depth),
        None => println!("  Re-check duplicates: never"),
    }
    println!("  Fragment dedup: {}", config.harvest.dedup_fragments);

    println!("\nCrawl Roots ({}):", config.harvest.roots.len());
    for root in &config.harvest.roots {
        println!("  - {}", root);
    }

    println!(
        "\nAllowed Domains ({}):",
        config.scope.allowed_domains.len()
    );
    for domain in &config.scope.allowed_domains {
        println!("  - {}", domain);
    }

    println!("\nSelectors:");
    println!("  Content: {}", config.selectors.content.join(", "));
    println!("  Title: {}", config.selectors.title.join(", "));
    println!("  Ignored: {}", config.selectors.ignored.join(", "));
    println!("  Navigation: {}", config.selectors.navigation.join(", "));
    println!(
        "  Non-recursive: {}",
        config.selectors.non_recursive.join(", ")
    );
    println!("  Fragments: {}", config.selectors.fragments.join(", "));
    if let Some(index) = &config.selectors.nested_index {
        println!(
            "  Nested index: [{}] -> {}",
            index.attribute, index.url_template
        );
    }

    println!("\nFetch:");
    println!("  Timeout: {}s", config.fetch.timeout_secs);
    println!("  User agent: {}", config.fetch.user_agent);
    match &config.auth {
        Some(auth) => println!("  Login: {} as {}", auth.login_url, auth.username),
        None => println!("  Login: none"),
    }

    println!("\nImages:");
    if config.images.enabled {
        println!("  Directory: {}", config.images.directory);
        println!(
            "  Attempts: {} ({}ms apart)",
            config.images.max_attempts, config.images.retry_delay_ms
        );
    } else {
        println!("  Disabled");
    }

    println!("\nOutput:");
    println!("  Directory: {}", config.output.directory);

    println!("\n✓ Configuration is valid");
}

/// Handles the main harvest operation
async fn handle_harvest(config: Config, fresh: bool) -> Result<()> {
    tracing::info!(
        "Harvesting {} crawl roots up to depth {}",
        config.harvest.roots.len(),
        config.harvest.max_depth
    );

    let harvester = Harvester::connect(config)
        .await
        .context("Failed to start harvester")?;

    if fresh {
        tracing::info!(
            "Starting fresh artifacts in {}",
            harvester.config().output.directory
        );
        harvester
            .truncate_artifacts()
            .context("Failed to truncate artifacts")?;
    }

    let stats = harvester.run().await.context("Harvest failed")?;
    tracing::info!("Harvest completed successfully");

    println!();
    print_statistics(&stats);
    Ok(())
}
