//! Crawler module for walking usages listings and harvesting artifacts
//!
//! This module contains the core harvesting logic, including:
//! - Reading seed links from the documentation table
//! - Parsing listing, profile and version pages
//! - Waiting for browser downloads to land on disk
//! - Overall harvest coordination

mod coordinator;
mod download;
mod fetcher;
mod listing;
mod resolver;
mod seeds;
mod selectors;

pub use coordinator::{HarvestSummary, Harvester};
pub use download::{is_complete, DownloadError, DownloadWait};
pub use fetcher::{build_http_client, fetch_page};
pub use listing::{parse_client_entries, ClientEntry, PageOutcome};
pub use resolver::{parse_artifact_link, parse_latest_version};
pub use seeds::{fetch_seed_links, parse_seed_table, SeedLink};
pub use selectors::PageSelectors;

use crate::browser::Browser;
use crate::config::Config;
use crate::HarvestError;

/// Runs a complete harvest with the given browser
///
/// This is the main entry point for a harvest. It will:
/// 1. Open the ledger and start a run
/// 2. Create the checkpoint if none exists
/// 3. Read the seed links
/// 4. Walk every listing from the checkpointed position
///
/// # Example
///
/// ```no_run
/// use jar_harvest::browser::WebDriverBrowser;
/// use jar_harvest::config::Config;
/// use jar_harvest::crawler::run_harvest;
/// use std::time::Duration;
///
/// # async fn example() -> Result<(), Box<dyn std::error::Error>> {
/// let config = Config::default();
/// let browser = WebDriverBrowser::new(config.browser.clone(), Duration::from_secs(20));
/// let summary = run_harvest(config, browser).await?;
/// println!("{} seed links harvested", summary.seed_links);
/// # Ok(())
/// # }
/// ```
pub async fn run_harvest<B: Browser>(
    config: Config,
    browser: B,
) -> Result<HarvestSummary, HarvestError> {
    let mut harvester = Harvester::new(config, browser)?;
    harvester.run().await
}
