//! Storage traits and error types
//!
//! This module defines the trait interface for the download ledger and
//! associated error types.

use crate::crawler::ClientEntry;
use crate::state::DownloadState;
use crate::storage::{ClientRecord, DownloadOutcome, DownloadRecord, GroupSummary, RunRecord, RunStatus};
use thiserror::Error;

/// Errors that can occur during storage operations
#[derive(Debug, Error)]
pub enum StorageError {
    #[error("Run not found: {0}")]
    RunNotFound(i64),

    #[error("SQLite error: {0}")]
    Sqlite(#[from] rusqlite::Error),
}

/// Result type for storage operations
pub type StorageResult<T> = Result<T, StorageError>;

/// Where a client entry was found
#[derive(Debug, Clone, Copy)]
pub struct ListingPosition<'a> {
    pub seed_url: &'a str,
    pub group_id: &'a str,
    pub page_num: u32,
    pub item_index: usize,
}

/// Trait for download ledger implementations
///
/// The ledger records what was found and what happened to it. It never
/// decides where a harvest resumes; that is the checkpoint's job.
pub trait Storage {
    // ===== Run Management =====

    /// Creates a new harvest run and returns its ID
    fn create_run(&mut self) -> StorageResult<i64>;

    /// Gets a run by ID
    fn get_run(&self, run_id: i64) -> StorageResult<RunRecord>;

    /// Gets the most recent run
    fn get_latest_run(&self) -> StorageResult<Option<RunRecord>>;

    /// Marks a run as finished with the given status
    fn finish_run(&mut self, run_id: i64, status: RunStatus) -> StorageResult<()>;

    // ===== Client Management =====

    /// Records a client entry, or refreshes its listing position if already known
    ///
    /// A client is identified by its group and profile URL, so the same
    /// dependent listed under two groups is tracked once per group.
    ///
    /// # Returns
    ///
    /// The client ID (either newly created or existing)
    fn record_client(
        &mut self,
        position: ListingPosition<'_>,
        entry: &ClientEntry,
        run_id: i64,
    ) -> StorageResult<i64>;

    /// Gets the client at `profile_url` recorded under `group_id`
    fn get_client(&self, group_id: &str, profile_url: &str) -> StorageResult<Option<ClientRecord>>;

    // ===== Download Tracking =====

    /// Records the latest download outcome for a client
    fn record_download(
        &mut self,
        client_id: i64,
        outcome: &DownloadOutcome,
        run_id: i64,
    ) -> StorageResult<()>;

    /// Gets the latest download outcome for a client
    fn get_download(&self, client_id: i64) -> StorageResult<Option<DownloadRecord>>;

    /// Returns true if the client at `profile_url` already has its artifact in `group_id`'s directory
    fn has_successful_download(&self, group_id: &str, profile_url: &str) -> StorageResult<bool>;

    // ===== Statistics =====

    /// Gets total client count
    fn count_clients(&self) -> StorageResult<u64>;

    /// Counts download outcomes in a state
    fn count_downloads_by_state(&self, state: DownloadState) -> StorageResult<u64>;

    /// Gets per-group client and success counts, sorted by group
    fn get_group_summaries(&self) -> StorageResult<Vec<GroupSummary>>;
}
