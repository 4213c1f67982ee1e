//! Docwatch main entry point
//!
//! This is the command-line interface for the docwatch document monitor.

use anyhow::Context;
use clap::{Parser, ValueEnum};
use docwatch::config::{load_config_with_hash, Config, TomlSiteSource};
use docwatch::crawler::{CrawlSettings, HttpFetcher, Orchestrator, RunRegistry};
use docwatch::output::{
    generate_markdown_summary, load_statistics, print_run_summary, print_statistics, TriggerType,
};
use docwatch::storage::{open_store, DocumentStore};
use std::path::{Path, PathBuf};
use std::sync::Arc;
use std::time::Duration;
use tracing_subscriber::EnvFilter;

/// Docwatch: a document change monitor
///
/// Docwatch crawls the configured publishing sites, finds downloadable documents
/// and guidance pages, and stores only what is new or has changed since the
/// previous run.
#[derive(Parser, Debug)]
#[command(name = "docwatch")]
#[command(version = "1.0.0")]
#[command(about = "A document change monitor for publishing websites", long_about = None)]
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

    /// What started this run, as recorded in history
    #[arg(long, value_enum, default_value_t = TriggerArg::Manual)]
    trigger: TriggerArg,

    /// Cancel the run after this many seconds (overrides run-timeout-secs)
    #[arg(long, value_name = "SECONDS")]
    timeout: Option<u64>,

    /// Validate config and show what would be crawled without crawling
    #[arg(long, conflicts_with_all = ["history", "export_summary"])]
    dry_run: bool,

    /// Show store statistics and recent runs, then exit
    #[arg(long, conflicts_with_all = ["dry_run", "export_summary"])]
    history: bool,

    /// Write the markdown report of the most recent run and exit
    #[arg(long, conflicts_with_all = ["dry_run", "history"])]
    export_summary: bool,
}

#[derive(Debug, Clone, Copy, ValueEnum)]
enum TriggerArg {
    Manual,
    Scheduled,
    Orchestrated,
}

impl From<TriggerArg> for TriggerType {
    fn from(arg: TriggerArg) -> Self {
        match arg {
            TriggerArg::Manual => TriggerType::Manual,
            TriggerArg::Scheduled => TriggerType::Scheduled,
            TriggerArg::Orchestrated => TriggerType::Orchestrated,
        }
    }
}

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    let cli = Cli::parse();

    // Setup logging based on verbosity
    setup_logging(cli.verbose, cli.quiet);

    tracing::info!("Loading configuration from: {}", cli.config.display());
    let (config, config_hash) = load_config_with_hash(&cli.config)
        .with_context(|| format!("Failed to load configuration from {}", cli.config.display()))?;
    tracing::info!("Configuration loaded successfully (hash: {})", config_hash);

    if cli.dry_run {
        handle_dry_run(&config);
    } else if cli.history {
        handle_history(&config).await?;
    } else if cli.export_summary {
        handle_export_summary(&config).await?;
    } else {
        handle_run(&cli, config, config_hash).await?;
    }

    Ok(())
}

/// Sets up the logging/tracing subscriber based on verbosity level
///
/// `RUST_LOG` takes precedence when set.
fn setup_logging(verbose: u8, quiet: bool) {
    let default_filter = if quiet {
        "error"
    } else {
        match verbose {
            0 => "docwatch=info,warn",
            1 => "docwatch=debug,info",
            2 => "docwatch=trace,debug",
            _ => "trace",
        }
    };

    let filter = EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new(default_filter));

    tracing_subscriber::fmt()
        .with_env_filter(filter)
        .with_target(false)
        .with_thread_ids(false)
        .with_file(false)
        .init();
}

/// Handles the --dry-run mode: validates config and shows what would be crawled
fn handle_dry_run(config: &Config) {
    println!("=== Docwatch Dry Run ===\n");

    println!("Crawler Configuration:");
    println!("  Page timeout: {}s", config.crawler.page_timeout_secs);
    println!("  Download timeout: {}s", config.crawler.download_timeout_secs);
    println!("  Sub-crawl cap: {} pages per level", config.crawler.sub_crawl_cap);
    println!("  Polite delay: {}ms", config.crawler.polite_delay_ms);
    if let Some(limit) = config.crawler.run_timeout_secs {
        println!("  Run timeout: {}s", limit);
    }

    println!("\nOutput:");
    println!("  Database: {}", config.output.database_path);
    println!("  Summary: {}", config.output.summary_path);
    println!("  History retention: {} runs", config.output.history_retention);

    let enabled = config.enabled_sites();
    println!("\nSites ({} enabled of {}):", enabled.len(), config.sites.len());
    for site in &config.sites {
        let mut mode = Vec::new();
        if site.crawls_sub_levels() {
            mode.push(format!("depth {}", site.max_depth));
        }
        if site.capture_html_guidance {
            mode.push(format!("guidance up to {}", site.max_guidance_pages));
        }
        println!(
            "  - {} [{}] {}{}{}",
            site.name,
            if site.enabled { "enabled" } else { "disabled" },
            site.url,
            if mode.is_empty() { "" } else { " - " },
            mode.join(", ")
        );
    }

    println!("\n✓ Configuration is valid");
    println!("✓ Would crawl {} sites", enabled.len());
}

/// Handles the --history mode: shows store statistics and recent runs
async fn handle_history(config: &Config) -> anyhow::Result<()> {
    println!("Database: {}\n", config.output.database_path);

    let store = open_store(Path::new(&config.output.database_path))
        .context("Failed to open document store")?;
    let stats = load_statistics(&store, config.output.history_retention).await?;
    print_statistics(&stats);

    Ok(())
}

/// Handles the --export-summary mode: writes the latest run's report
async fn handle_export_summary(config: &Config) -> anyhow::Result<()> {
    println!("=== Exporting Run Summary ===\n");
    println!("Database: {}", config.output.database_path);
    println!("Output: {}", config.output.summary_path);
    println!();

    let store = open_store(Path::new(&config.output.database_path))
        .context("Failed to open document store")?;

    let latest = store
        .run_history(1)
        .await?
        .into_iter()
        .next()
        .context("No runs recorded in the database")?;

    generate_markdown_summary(&latest, Path::new(&config.output.summary_path))?;
    println!("✓ Summary exported to: {}", config.output.summary_path);

    Ok(())
}

/// Handles a crawl run
async fn handle_run(cli: &Cli, config: Config, config_hash: String) -> anyhow::Result<()> {
    let store = open_store(Path::new(&config.output.database_path))
        .context("Failed to open document store")?;
    let fetcher = HttpFetcher::new(config.crawler.user_agent.as_deref())
        .context("Failed to build HTTP client")?;

    let orchestrator = Orchestrator::new(
        Arc::new(TomlSiteSource::new(&cli.config)),
        Arc::new(store),
        Arc::new(fetcher),
        CrawlSettings::from(&config.crawler),
    )
    .with_history_retention(config.output.history_retention)
    .with_config_hash(config_hash);

    let timeout = cli
        .timeout
        .or(config.crawler.run_timeout_secs)
        .map(Duration::from_secs);
    let registry = Arc::new(RunRegistry::new(orchestrator).with_timeout(timeout));

    tracing::info!("{} sites enabled", config.enabled_sites().len());
    let run_id = registry.start_run(cli.trigger.into());

    // First Ctrl-C cancels the run; the summary is still written
    let interrupt = registry.clone();
    tokio::spawn(async move {
        if tokio::signal::ctrl_c().await.is_ok() {
            tracing::warn!("Interrupt received, cancelling {}", run_id);
            interrupt.cancel_run(run_id);
        }
    });

    let summary = registry
        .wait(run_id)
        .await
        .context("Run ended without a summary")?;

    print_run_summary(&summary);

    let summary_path = Path::new(&config.output.summary_path);
    match generate_markdown_summary(&summary, summary_path) {
        Ok(()) => println!("\n✓ Report written to: {}", summary_path.display()),
        Err(e) => tracing::error!("Failed to write report: {}", e),
    }

    Ok(())
}
