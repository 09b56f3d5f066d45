//! Rulespider main entry point
//!
//! Command-line interface for the rule-driven crawl engine.

use anyhow::Context;
use clap::Parser;
use rulespider::config::load_config_with_hash;
use rulespider::crawler::HttpFetcher;
use rulespider::CrawlEngine;
use std::path::PathBuf;
use tracing_subscriber::EnvFilter;

/// Rulespider: a rule-driven web crawler
///
/// Rulespider reads a declarative rule set, seeds its frontier, and crawls:
/// every fetched page runs through the governing rule's extraction pipeline,
/// records are appended to JSON-lines files, and discovered links feed the
/// frontier until the process is stopped.
#[derive(Parser, Debug)]
#[command(name = "rulespider")]
#[command(version)]
#[command(about = "A rule-driven web crawler", long_about = None)]
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

    /// Validate config and show what would be crawled without crawling
    #[arg(long)]
    dry_run: bool,
}

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    let cli = Cli::parse();

    setup_logging(cli.verbose, cli.quiet);

    tracing::info!("Loading configuration from: {}", cli.config.display());
    let (config, config_hash) = load_config_with_hash(&cli.config)
        .with_context(|| format!("failed to load configuration {}", cli.config.display()))?;
    tracing::info!("Configuration loaded successfully (hash: {})", config_hash);

    if cli.dry_run {
        handle_dry_run(&config, &config_hash);
        return Ok(());
    }

    handle_crawl(config).await
}

/// Sets up the logging/tracing subscriber based on verbosity level
fn setup_logging(verbose: u8, quiet: bool) {
    let filter = if quiet {
        EnvFilter::new("error")
    } else {
        match verbose {
            0 => EnvFilter::new("rulespider=info,warn"),
            1 => EnvFilter::new("rulespider=debug,info"),
            2 => EnvFilter::new("rulespider=trace,debug"),
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

/// Handles the --dry-run mode: validates config and shows the crawl plan
fn handle_dry_run(config: &rulespider::Config, config_hash: &str) {
    println!("=== Rulespider Dry Run ===\n");

    println!("Crawler Configuration:");
    println!("  Fetch timeout: {}ms", config.crawler.fetch_timeout_ms);
    println!("  Page delay: {}ms", config.crawler.page_delay_ms);
    println!("  Counter path: {}", config.crawler.counter_path);
    println!("  User agent: {}", config.crawler.user_agent);

    println!("\nOutput:");
    println!("  Records: {}", config.output.records_path);

    println!("\nRules ({}):", config.rules.len());
    for rule in &config.rules {
        let port = rule
            .port
            .map(|p| format!(":{}", p))
            .unwrap_or_default();
        println!(
            "  - {} ({}://{}{} {})",
            rule.display_name(),
            rule.scheme,
            rule.host,
            port,
            rule.pattern
        );
        for processor in &rule.processors {
            match processor.selector.as_deref() {
                Some(selector) => println!("    * {} {:?} -> {}", processor.op, selector, processor.tag),
                None => println!(
                    "    * {} {} -> {}",
                    processor.op,
                    processor.val.as_deref().unwrap_or("?"),
                    processor.tag
                ),
            }
        }
    }

    println!("\nSeeds ({}):", config.seeds.len());
    for seed in &config.seeds {
        println!("  - {}", seed);
    }

    println!("\nConfig hash: {}", config_hash);
    println!("✓ Configuration is valid");
}

/// Handles the main crawl operation
async fn handle_crawl(config: rulespider::Config) -> anyhow::Result<()> {
    tracing::info!(
        "Rules: {}, seeds: {}",
        config.rules.len(),
        config.seeds.len()
    );

    let fetcher =
        HttpFetcher::new(&config.crawler.user_agent).context("failed to build HTTP client")?;
    let mut engine = CrawlEngine::new(&config, fetcher)?;
    let handle = engine.handle();

    // Ctrl-C requests a cooperative stop; the current fetch is allowed to
    // finish, so shutdown latency is bounded by the fetch timeout.
    tokio::spawn(async move {
        if tokio::signal::ctrl_c().await.is_ok() {
            tracing::info!("Stop signal received, finishing current page");
            handle.stop();
        }
    });

    match engine.run().await {
        Ok(()) => {
            tracing::info!("Crawl finished with {} total visits", engine.visits());
            Ok(())
        }
        Err(e) => {
            tracing::error!("Crawl failed: {}", e);
            Err(e.into())
        }
    }
}
