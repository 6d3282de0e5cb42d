//! Jar-Harvest main entry point
//!
//! This is the command-line interface for the Jar-Harvest artifact harvester.

use anyhow::Context;
use clap::Parser;
use jar_harvest::browser::{DriverProcess, WebDriverBrowser};
use jar_harvest::checkpoint::{Checkpoint, CheckpointStore};
use jar_harvest::config::{load_config_or_default, Config};
use jar_harvest::crawler::{build_http_client, fetch_seed_links, Harvester};
use jar_harvest::output::{generate_markdown_report, load_statistics, print_statistics};
use jar_harvest::storage::SqliteStorage;
use jar_harvest::DownloadState;
use std::path::{Path, PathBuf};
use std::time::Duration;
use tracing_subscriber::EnvFilter;

/// Jar-Harvest: a resumable artifact harvester
///
/// Jar-Harvest reads a table of popular packages, walks the dependents of each
/// package on a repository website with a headless browser and downloads the
/// latest artifact of every dependent. Progress is checkpointed after every
/// step, so an interrupted harvest resumes where it stopped.
#[derive(Parser, Debug)]
#[command(name = "jar-harvest")]
#[command(version = "1.0.0")]
#[command(about = "A resumable artifact harvester", long_about = None)]
struct Cli {
    /// Path to TOML configuration file (defaults are used when omitted)
    #[arg(value_name = "CONFIG")]
    config: Option<PathBuf>,

    /// Increase logging verbosity (-v, -vv, -vvv)
    #[arg(short, long, action = clap::ArgAction::Count)]
    verbose: u8,

    /// Suppress non-error output
    #[arg(short, long, conflicts_with = "verbose")]
    quiet: bool,

    /// Reset the checkpoint and start from the first seed link
    #[arg(long)]
    fresh: bool,

    /// Show the seed links and checkpoint without starting a browser
    #[arg(long, conflicts_with_all = ["stats", "export_summary"])]
    dry_run: bool,

    /// Show statistics from the download ledger and exit
    #[arg(long, conflicts_with_all = ["dry_run", "export_summary"])]
    stats: bool,

    /// Write a markdown report of the download ledger to PATH and exit
    #[arg(long, value_name = "PATH", conflicts_with_all = ["dry_run", "stats"])]
    export_summary: Option<PathBuf>,
}

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    let cli = Cli::parse();

    // Setup logging based on verbosity
    setup_logging(cli.verbose, cli.quiet);

    match &cli.config {
        Some(path) => tracing::info!("Loading configuration from: {}", path.display()),
        None => tracing::info!("No configuration file given, using defaults"),
    }
    let config = load_config_or_default(cli.config.as_deref())
        .context("Failed to load configuration")?;

    if cli.dry_run {
        handle_dry_run(&config).await?;
    } else if cli.stats {
        handle_stats(&config)?;
    } else if let Some(path) = &cli.export_summary {
        handle_export_summary(&config, path)?;
    } else {
        handle_harvest(config, cli.fresh).await?;
    }

    Ok(())
}

/// Sets up the logging/tracing subscriber based on verbosity level
fn setup_logging(verbose: u8, quiet: bool) {
    let filter = if quiet {
        EnvFilter::new("error")
    } else {
        match verbose {
            0 => EnvFilter::new("jar_harvest=info,warn"),
            1 => EnvFilter::new("jar_harvest=debug,info"),
            2 => EnvFilter::new("jar_harvest=trace,debug"),
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

/// Reads the checkpoint if one has been written
fn existing_checkpoint(config: &Config) -> anyhow::Result<Option<Checkpoint>> {
    let store = CheckpointStore::new(&config.output.checkpoint_path);
    if !store.path().exists() {
        return Ok(None);
    }
    Ok(Some(store.load()?))
}

fn describe_checkpoint(checkpoint: Option<&Checkpoint>) -> String {
    match checkpoint {
        Some(cp) => format!(
            "seed link #{}, page {}, entry {}",
            cp.current_url_index, cp.page_num, cp.jar_index
        ),
        None => "none (harvest starts from the beginning)".to_string(),
    }
}

/// Handles the --dry-run mode: shows the seed links and where a harvest would resume
async fn handle_dry_run(config: &Config) -> anyhow::Result<()> {
    println!("=== Jar-Harvest Dry Run ===\n");

    println!("Seed page: {}", config.harvest.seed_url);
    println!("Repository: {}", config.harvest.repository_url);
    println!("WebDriver: {}", config.browser.webdriver_url);
    if let Some(driver_path) = &config.browser.driver_path {
        println!("Driver executable: {}", driver_path);
    }
    println!("Downloads: {}", config.output.download_dir);
    println!();

    let checkpoint = existing_checkpoint(config)?;
    println!("Checkpoint: {}\n", describe_checkpoint(checkpoint.as_ref()));

    let client = build_http_client(&config.browser.user_agent)?;
    let links = fetch_seed_links(
        &client,
        &config.harvest.seed_url,
        &config.harvest.marker,
        &config.harvest.repository_url,
    )
    .await;

    if links.is_empty() {
        println!("Failed to retrieve any seed links");
        return Ok(());
    }

    let start = checkpoint.map(|cp| cp.current_url_index).unwrap_or(0);
    println!("Seed links ({}):", links.len());
    for (idx, link) in links.iter().enumerate() {
        let marker = if idx < start { "done" } else { "    " };
        println!("  [{}] {:>4}  {}", marker, idx, link.url);
    }

    Ok(())
}

/// Handles the --stats mode: shows checkpoint position and ledger statistics
fn handle_stats(config: &Config) -> anyhow::Result<()> {
    println!("Database: {}\n", config.output.database_path);

    let storage = SqliteStorage::new(Path::new(&config.output.database_path))?;
    let stats = load_statistics(&storage)?;
    let checkpoint = existing_checkpoint(config)?;

    print_statistics(&stats, checkpoint.as_ref());

    Ok(())
}

/// Handles the --export-summary mode: writes the markdown report
fn handle_export_summary(config: &Config, output_path: &Path) -> anyhow::Result<()> {
    println!("=== Exporting Harvest Report ===\n");
    println!("Database: {}", config.output.database_path);
    println!("Output: {}", output_path.display());
    println!();

    let storage = SqliteStorage::new(Path::new(&config.output.database_path))?;

    tracing::info!("Loading harvest data from database...");
    let stats = load_statistics(&storage)?;
    let checkpoint = existing_checkpoint(config)?;

    generate_markdown_report(&stats, checkpoint.as_ref(), output_path)
        .with_context(|| format!("Failed to write {}", output_path.display()))?;

    println!("✓ Report exported to: {}", output_path.display());

    Ok(())
}

/// Handles the main harvest operation
async fn handle_harvest(config: Config, fresh: bool) -> anyhow::Result<()> {
    if fresh {
        tracing::info!("Starting fresh harvest (resetting checkpoint)");
        CheckpointStore::new(&config.output.checkpoint_path).reset()?;
    } else {
        tracing::info!("Starting harvest (resumes from the checkpoint if present)");
    }

    let driver = match &config.browser.driver_path {
        Some(_) => Some(
            DriverProcess::spawn(
                &config.browser,
                Duration::from_millis(config.harvest.poll_interval),
            )
            .await?,
        ),
        None => None,
    };

    let browser = WebDriverBrowser::new(
        config.browser.clone(),
        Duration::from_secs(config.harvest.wait_timeout),
    );
    let mut harvester = Harvester::new(config, browser)?;

    let result = tokio::select! {
        result = harvester.run() => Some(result),
        _ = tokio::signal::ctrl_c() => None,
    };

    if let Some(driver) = driver {
        driver.shutdown().await;
    }

    match result {
        Some(Ok(summary)) => {
            tracing::info!(
                "Harvest finished: {} downloaded, {} already present, {} skipped, {} unresolved, {} failed",
                summary.count(DownloadState::Downloaded),
                summary.count(DownloadState::AlreadyPresent),
                summary.count(DownloadState::Skipped),
                summary.count(DownloadState::VersionUnresolved)
                    + summary.count(DownloadState::ArtifactUnresolved),
                summary.count(DownloadState::Failed)
            );
            Ok(())
        }
        Some(Err(e)) => {
            tracing::error!("Harvest failed: {}", e);
            Err(e.into())
        }
        None => {
            harvester.mark_interrupted();
            tracing::warn!("Interrupted; the next run resumes from the checkpoint");
            Ok(())
        }
    }
}
