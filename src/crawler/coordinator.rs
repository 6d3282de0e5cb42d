//! Harvest coordinator - the nested seed link / page / entry loop
//!
//! This module drives a harvest from start to finish:
//! - Reading the seed page and building the usages listings to walk
//! - Walking each listing page by page from the checkpointed position
//! - Resolving every client's latest release and downloading its artifact
//! - Persisting the checkpoint after every step and recording outcomes in the ledger

use crate::browser::Browser;
use crate::checkpoint::{Checkpoint, CheckpointStore};
use crate::config::Config;
use crate::crawler::download::{is_complete, DownloadError, DownloadWait};
use crate::crawler::listing::{ClientEntry, PageOutcome};
use crate::crawler::resolver::{parse_artifact_link, parse_latest_version};
use crate::crawler::seeds::{fetch_seed_links, SeedLink};
use crate::crawler::selectors::PageSelectors;
use crate::crawler::build_http_client;
use crate::state::DownloadState;
use crate::storage::{
    open_storage, DownloadOutcome, ListingPosition, RunStatus, SqliteStorage, Storage,
};
use crate::url::file_name_from_url;
use crate::HarvestError;
use reqwest::Client;
use std::collections::HashMap;
use std::path::{Path, PathBuf};
use std::time::{Duration, Instant};

/// Totals for one harvest run
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct HarvestSummary {
    /// Seed links walked to completion
    pub seed_links: usize,

    /// Listing pages that yielded entries
    pub pages: usize,

    /// Client entries seen on those pages
    pub clients: usize,

    /// Entry outcomes by state
    pub outcomes: HashMap<DownloadState, usize>,
}

impl HarvestSummary {
    fn record(&mut self, state: DownloadState) {
        *self.outcomes.entry(state).or_insert(0) += 1;
    }

    /// Number of entries that ended in `state`
    pub fn count(&self, state: DownloadState) -> usize {
        self.outcomes.get(&state).copied().unwrap_or(0)
    }
}

/// Main harvest coordinator
pub struct Harvester<B: Browser> {
    config: Config,
    browser: B,
    selectors: PageSelectors,
    client: Client,
    checkpoints: CheckpointStore,
    storage: SqliteStorage,
    run_id: i64,
}

impl<B: Browser> Harvester<B> {
    /// Creates a harvester and opens a new run in the ledger
    ///
    /// # Arguments
    ///
    /// * `config` - The harvest configuration
    /// * `browser` - Browser used for listing, version and artifact pages
    ///
    /// # Returns
    ///
    /// * `Ok(Harvester)` - Ready to run
    /// * `Err(HarvestError)` - Invalid selectors, HTTP client or ledger failure
    pub fn new(config: Config, browser: B) -> Result<Self, HarvestError> {
        let selectors = PageSelectors::compile(&config.selectors)?;
        let client = build_http_client(&config.browser.user_agent)?;
        let checkpoints = CheckpointStore::new(&config.output.checkpoint_path);

        let mut storage = open_storage(Path::new(&config.output.database_path))?;
        let run_id = storage.create_run()?;
        tracing::debug!("Opened run {}", run_id);

        Ok(Self {
            config,
            browser,
            selectors,
            client,
            checkpoints,
            storage,
            run_id,
        })
    }

    /// ID of the ledger run this harvester records into
    pub fn run_id(&self) -> i64 {
        self.run_id
    }

    /// Runs a complete harvest
    ///
    /// Creates the checkpoint if none exists, reads the seed page and walks every
    /// seed link from the checkpointed position. An empty seed list is reported
    /// and treated as nothing to do.
    pub async fn run(&mut self) -> Result<HarvestSummary, HarvestError> {
        if let Err(e) = self.checkpoints.initialize() {
            self.finish(RunStatus::Failed);
            tracing::error!("Harvest aborted: {}", e);
            return Err(e.into());
        }

        let harvest = &self.config.harvest;
        let links = fetch_seed_links(
            &self.client,
            &harvest.seed_url,
            &harvest.marker,
            &harvest.repository_url,
        )
        .await;

        if links.is_empty() {
            println!("Failed to retrieve any seed links");
            tracing::error!("Failed to retrieve any seed links from {}", harvest.seed_url);
            self.finish(RunStatus::Completed);
            return Ok(HarvestSummary::default());
        }

        self.harvest(&links).await
    }

    /// Walks `links` starting at the checkpoint's seed link index
    ///
    /// The checkpoint must exist; `run` creates it.
    pub async fn harvest(&mut self, links: &[SeedLink]) -> Result<HarvestSummary, HarvestError> {
        let start_time = Instant::now();
        let mut summary = HarvestSummary::default();

        let result = self.walk_seed_links(links, &mut summary).await;
        match &result {
            Ok(()) => {
                self.finish(RunStatus::Completed);
                tracing::info!(
                    "Harvest completed: {} seed links, {} pages, {} downloaded in {:?}",
                    summary.seed_links,
                    summary.pages,
                    summary.count(DownloadState::Downloaded),
                    start_time.elapsed()
                );
            }
            Err(e) => {
                self.finish(RunStatus::Failed);
                tracing::error!("Harvest aborted: {}", e);
            }
        }

        result.map(|()| summary)
    }

    /// Marks the run as interrupted; used when the harvest is cancelled from outside
    pub fn mark_interrupted(&mut self) {
        self.finish(RunStatus::Interrupted);
    }

    fn finish(&mut self, status: RunStatus) {
        if let Err(e) = self.storage.finish_run(self.run_id, status) {
            tracing::warn!("Failed to finish run {}: {}", self.run_id, e);
        }
    }

    async fn walk_seed_links(
        &mut self,
        links: &[SeedLink],
        summary: &mut HarvestSummary,
    ) -> Result<(), HarvestError> {
        let start = self.checkpoints.load()?.current_url_index;
        if start >= links.len() {
            tracing::info!("All {} seed links already harvested", links.len());
        }

        for (idx, link) in links.iter().enumerate().skip(start) {
            tracing::info!(
                "Seed link {}/{}: {}:{}",
                idx + 1,
                links.len(),
                link.group_id,
                link.artifact_id
            );

            let entries = self.walk_listing(link, summary).await?;
            tracing::info!("Finished {} with {} clients", link.url, entries.len());

            let mut checkpoint = self.checkpoints.load()?;
            checkpoint.advance_seed_link(idx);
            self.checkpoints.save(&checkpoint)?;
            summary.seed_links += 1;
        }

        Ok(())
    }

    /// Walks one listing from the checkpointed page until it runs out of entries
    ///
    /// Returns the entries of every page visited, in page order.
    async fn walk_listing(
        &mut self,
        link: &SeedLink,
        summary: &mut HarvestSummary,
    ) -> Result<Vec<ClientEntry>, HarvestError> {
        let mut checkpoint = self.checkpoints.load()?;
        let mut accumulated = Vec::new();

        loop {
            let page_url = link.page_url(checkpoint.page_num);
            let entries = match self.render_listing(&page_url).await {
                PageOutcome::Entries(entries) => entries,
                PageOutcome::Empty => {
                    tracing::info!("No clients on {}, end of listing", page_url);
                    break;
                }
                PageOutcome::Failed(e) => {
                    tracing::error!("Stopping listing at {}: {}", page_url, e);
                    break;
                }
            };

            tracing::info!(
                "Page {} of {}: {} clients",
                checkpoint.page_num,
                link.url,
                entries.len()
            );
            summary.pages += 1;
            summary.clients += entries.len();

            self.process_page(link, &entries, &mut checkpoint, summary)
                .await?;

            accumulated.extend(entries);
            checkpoint.advance_page();
            self.checkpoints.save(&checkpoint)?;
        }

        Ok(accumulated)
    }

    /// Renders a listing page, retrying failures up to `page-retries` times
    async fn render_listing(&self, page_url: &str) -> PageOutcome {
        let attempts = self.config.harvest.page_retries + 1;
        let mut attempt = 1;

        loop {
            let rendered = self
                .browser
                .render(page_url, &self.config.selectors.client_link)
                .await;

            match PageOutcome::from_render(rendered, page_url, &self.selectors.client_link) {
                PageOutcome::Failed(e) if attempt < attempts => {
                    tracing::warn!(
                        "Attempt {}/{} to render {} failed: {}",
                        attempt,
                        attempts,
                        page_url,
                        e
                    );
                    attempt += 1;
                }
                outcome => return outcome,
            }
        }
    }

    /// Processes the entries of one page from the checkpoint's entry cursor
    async fn process_page(
        &mut self,
        link: &SeedLink,
        entries: &[ClientEntry],
        checkpoint: &mut Checkpoint,
        summary: &mut HarvestSummary,
    ) -> Result<(), HarvestError> {
        let client_ids = self.record_clients(link, checkpoint.page_num, entries);

        for (idx, entry) in entries.iter().enumerate().skip(checkpoint.jar_index) {
            tracing::debug!("Entry {} on page {}: {}", idx, checkpoint.page_num, entry.name);

            let outcome = self.process_entry(link, entry).await;
            summary.record(outcome.state);

            // A skip leaves the earlier successful outcome in place.
            if outcome.state != DownloadState::Skipped {
                if let Some(client_id) = client_ids[idx] {
                    self.record_outcome(client_id, &outcome);
                }
            }

            checkpoint.advance_entry(idx);
            self.checkpoints.save(checkpoint)?;
        }

        Ok(())
    }

    fn record_clients(
        &mut self,
        link: &SeedLink,
        page_num: u32,
        entries: &[ClientEntry],
    ) -> Vec<Option<i64>> {
        entries
            .iter()
            .enumerate()
            .map(|(item_index, entry)| {
                let position = ListingPosition {
                    seed_url: &link.url,
                    group_id: &link.group_id,
                    page_num,
                    item_index,
                };
                match self.storage.record_client(position, entry, self.run_id) {
                    Ok(id) => Some(id),
                    Err(e) => {
                        tracing::warn!("Failed to record client {}: {}", entry.profile_url, e);
                        None
                    }
                }
            })
            .collect()
    }

    fn record_outcome(&mut self, client_id: i64, outcome: &DownloadOutcome) {
        if let Err(e) = self
            .storage
            .record_download(client_id, outcome, self.run_id)
        {
            tracing::warn!("Failed to record outcome for client {}: {}", client_id, e);
        }
    }

    fn already_downloaded(&self, group_id: &str, profile_url: &str) -> bool {
        match self.storage.has_successful_download(group_id, profile_url) {
            Ok(done) => done,
            Err(e) => {
                tracing::warn!("Failed to query ledger for {}: {}", profile_url, e);
                false
            }
        }
    }

    /// Resolves and downloads the artifact of one client entry
    ///
    /// Never fails: every problem becomes the state of the returned outcome.
    async fn process_entry(&self, link: &SeedLink, entry: &ClientEntry) -> DownloadOutcome {
        if self.config.harvest.skip_downloaded
            && self.already_downloaded(&link.group_id, &entry.profile_url)
        {
            tracing::debug!("{} already downloaded, skipping", entry.profile_url);
            return DownloadOutcome::new(DownloadState::Skipped);
        }

        let version_url = match self.resolve_latest_version(&entry.profile_url).await {
            Ok(url) => url,
            Err(message) => {
                tracing::warn!("No latest release for {}: {}", entry.name, message);
                return DownloadOutcome::new(DownloadState::VersionUnresolved).with_error(message);
            }
        };

        let artifact_url = match self.resolve_artifact(&version_url).await {
            Ok(url) => url,
            Err(message) => {
                tracing::warn!("No artifact for {}: {}", version_url, message);
                return DownloadOutcome::new(DownloadState::ArtifactUnresolved)
                    .with_version(version_url)
                    .with_error(message);
            }
        };

        let outcome = DownloadOutcome::new(DownloadState::Downloaded)
            .with_version(version_url)
            .with_artifact(artifact_url.clone());

        let dest_dir = Path::new(&self.config.output.download_dir).join(&link.group_id);
        match self.download(&artifact_url, &dest_dir).await {
            Ok((state, path)) => {
                tracing::info!("{} {}", state, path.display());
                DownloadOutcome {
                    state,
                    ..outcome.with_file(&path)
                }
            }
            Err(e) => {
                tracing::warn!("Download of {} failed: {}", artifact_url, e);
                DownloadOutcome {
                    state: DownloadState::Failed,
                    ..outcome.with_error(e)
                }
            }
        }
    }

    /// Renders `profile_url` and returns the latest release's version page URL
    async fn resolve_latest_version(&self, profile_url: &str) -> Result<String, String> {
        let html = self
            .browser
            .render(profile_url, &self.config.selectors.latest_release)
            .await
            .map_err(|e| e.to_string())?;

        parse_latest_version(&html, profile_url, &self.selectors.latest_release)
            .ok_or_else(|| "latest release link not found".to_string())
    }

    /// Renders `version_url` and returns the artifact file URL
    async fn resolve_artifact(&self, version_url: &str) -> Result<String, String> {
        let html = self
            .browser
            .render(version_url, &self.config.selectors.artifact_link)
            .await
            .map_err(|e| e.to_string())?;

        parse_artifact_link(&html, version_url, &self.selectors.artifact_link)
            .ok_or_else(|| "artifact link not found".to_string())
    }

    /// Downloads `artifact_url` into `dest_dir` unless the file is already there
    async fn download(
        &self,
        artifact_url: &str,
        dest_dir: &Path,
    ) -> Result<(DownloadState, PathBuf), DownloadError> {
        let file_name = file_name_from_url(artifact_url)
            .ok_or_else(|| DownloadError::NoFileName(artifact_url.to_string()))?;

        std::fs::create_dir_all(dest_dir)?;
        if is_complete(dest_dir, &file_name)? {
            return Ok((DownloadState::AlreadyPresent, dest_dir.join(file_name)));
        }

        let completion = DownloadWait {
            file_name,
            timeout: Duration::from_secs(self.config.harvest.download_timeout),
            poll_interval: Duration::from_millis(self.config.harvest.poll_interval),
        };
        let path = self
            .browser
            .download(artifact_url, dest_dir, &completion)
            .await?;
        Ok((DownloadState::Downloaded, path))
    }
}
