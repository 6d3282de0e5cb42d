//! Storage module for the download ledger
//!
//! This module handles all database operations for the harvester, including:
//! - SQLite database initialization and schema management
//! - Client entries found on usages listings
//! - Download outcomes per client
//! - Run tracking

mod schema;
mod sqlite;
mod traits;

pub use sqlite::SqliteStorage;
pub use traits::{ListingPosition, Storage, StorageError, StorageResult};

use crate::state::DownloadState;
use crate::HarvestError;
use std::path::Path;

/// Initializes or opens a ledger database
pub fn open_storage(path: &Path) -> Result<SqliteStorage, HarvestError> {
    SqliteStorage::new(path)
}

/// Represents a client entry in the database
#[derive(Debug, Clone)]
pub struct ClientRecord {
    pub id: i64,
    pub seed_url: String,
    pub group_id: String,
    pub page_num: u32,
    pub item_index: i64,
    pub name: String,
    pub profile_url: String,
    pub discovered_at: String,
    pub discovered_run: i64,
}

/// Represents the latest download outcome of a client
#[derive(Debug, Clone)]
pub struct DownloadRecord {
    pub client_id: i64,
    pub state: DownloadState,
    pub version_url: Option<String>,
    pub artifact_url: Option<String>,
    pub file_path: Option<String>,
    pub error_message: Option<String>,
    pub updated_at: String,
    pub run_id: i64,
}

/// Result of processing one client entry, as written to the ledger
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct DownloadOutcome {
    pub state: DownloadState,
    pub version_url: Option<String>,
    pub artifact_url: Option<String>,
    pub file_path: Option<String>,
    pub error_message: Option<String>,
}

impl DownloadOutcome {
    /// Creates an outcome in `state` with no details
    pub fn new(state: DownloadState) -> Self {
        Self {
            state,
            version_url: None,
            artifact_url: None,
            file_path: None,
            error_message: None,
        }
    }

    pub fn with_version(mut self, version_url: impl Into<String>) -> Self {
        self.version_url = Some(version_url.into());
        self
    }

    pub fn with_artifact(mut self, artifact_url: impl Into<String>) -> Self {
        self.artifact_url = Some(artifact_url.into());
        self
    }

    pub fn with_file(mut self, file_path: &Path) -> Self {
        self.file_path = Some(file_path.display().to_string());
        self
    }

    pub fn with_error(mut self, error: impl ToString) -> Self {
        self.error_message = Some(error.to_string());
        self
    }
}

/// Per-group totals for reporting
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct GroupSummary {
    pub group_id: String,
    pub clients: u64,
    pub downloaded: u64,
}

/// Represents a harvest run
#[derive(Debug, Clone)]
pub struct RunRecord {
    pub id: i64,
    pub started_at: String,
    pub finished_at: Option<String>,
    pub status: RunStatus,
}

/// Status of a harvest run
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum RunStatus {
    Running,
    Completed,
    Interrupted,
    Failed,
}

impl RunStatus {
    pub fn to_db_string(&self) -> &'static str {
        match self {
            Self::Running => "running",
            Self::Completed => "completed",
            Self::Interrupted => "interrupted",
            Self::Failed => "failed",
        }
    }

    pub fn from_db_string(s: &str) -> Option<Self> {
        match s {
            "running" => Some(Self::Running),
            "completed" => Some(Self::Completed),
            "interrupted" => Some(Self::Interrupted),
            "failed" => Some(Self::Failed),
            _ => None,
        }
    }
}
