//! SQLite storage implementation
//!
//! This module provides a SQLite-based implementation of the Storage trait.

use crate::crawler::ClientEntry;
use crate::state::DownloadState;
use crate::storage::schema::initialize_schema;
use crate::storage::traits::{ListingPosition, Storage, StorageError, StorageResult};
use crate::storage::{
    ClientRecord, DownloadOutcome, DownloadRecord, GroupSummary, RunRecord, RunStatus,
};
use crate::HarvestError;
use chrono::Utc;
use rusqlite::{params, Connection, OptionalExtension, Row};
use std::path::Path;

/// SQLite storage backend
pub struct SqliteStorage {
    conn: Connection,
}

impl SqliteStorage {
    /// Creates a new SqliteStorage instance
    ///
    /// # Arguments
    ///
    /// * `path` - Path to the SQLite database file
    ///
    /// # Returns
    ///
    /// * `Ok(SqliteStorage)` - Successfully opened/created database
    /// * `Err(HarvestError)` - Failed to open database
    pub fn new(path: &Path) -> Result<Self, HarvestError> {
        if let Some(parent) = path.parent() {
            if !parent.as_os_str().is_empty() {
                std::fs::create_dir_all(parent)?;
            }
        }

        let conn = Connection::open(path)?;

        conn.execute_batch(
            "
            PRAGMA journal_mode = WAL;
            PRAGMA synchronous = NORMAL;
            PRAGMA foreign_keys = ON;
        ",
        )?;

        initialize_schema(&conn)?;

        Ok(Self { conn })
    }

    /// Creates an in-memory database (for testing)
    #[cfg(test)]
    pub fn new_in_memory() -> Result<Self, HarvestError> {
        let conn = Connection::open_in_memory()?;
        conn.execute_batch("PRAGMA foreign_keys = ON;")?;
        initialize_schema(&conn)?;
        Ok(Self { conn })
    }
}

fn run_from_row(row: &Row<'_>) -> rusqlite::Result<RunRecord> {
    Ok(RunRecord {
        id: row.get(0)?,
        started_at: row.get(1)?,
        finished_at: row.get(2)?,
        status: RunStatus::from_db_string(&row.get::<_, String>(3)?).unwrap_or(RunStatus::Running),
    })
}

fn client_from_row(row: &Row<'_>) -> rusqlite::Result<ClientRecord> {
    Ok(ClientRecord {
        id: row.get(0)?,
        seed_url: row.get(1)?,
        group_id: row.get(2)?,
        page_num: row.get(3)?,
        item_index: row.get(4)?,
        name: row.get(5)?,
        profile_url: row.get(6)?,
        discovered_at: row.get(7)?,
        discovered_run: row.get(8)?,
    })
}

impl Storage for SqliteStorage {
    // ===== Run Management =====

    fn create_run(&mut self) -> StorageResult<i64> {
        let now = Utc::now().to_rfc3339();
        self.conn.execute(
            "INSERT INTO runs (started_at, status) VALUES (?1, ?2)",
            params![now, RunStatus::Running.to_db_string()],
        )?;
        Ok(self.conn.last_insert_rowid())
    }

    fn get_run(&self, run_id: i64) -> StorageResult<RunRecord> {
        self.conn
            .query_row(
                "SELECT id, started_at, finished_at, status FROM runs WHERE id = ?1",
                params![run_id],
                run_from_row,
            )
            .map_err(|_| StorageError::RunNotFound(run_id))
    }

    fn get_latest_run(&self) -> StorageResult<Option<RunRecord>> {
        let run = self
            .conn
            .query_row(
                "SELECT id, started_at, finished_at, status FROM runs ORDER BY id DESC LIMIT 1",
                [],
                run_from_row,
            )
            .optional()?;
        Ok(run)
    }

    fn finish_run(&mut self, run_id: i64, status: RunStatus) -> StorageResult<()> {
        let now = Utc::now().to_rfc3339();
        let updated = self.conn.execute(
            "UPDATE runs SET status = ?1, finished_at = ?2 WHERE id = ?3",
            params![status.to_db_string(), now, run_id],
        )?;
        if updated == 0 {
            return Err(StorageError::RunNotFound(run_id));
        }
        Ok(())
    }

    // ===== Client Management =====

    fn record_client(
        &mut self,
        position: ListingPosition<'_>,
        entry: &ClientEntry,
        run_id: i64,
    ) -> StorageResult<i64> {
        let now = Utc::now().to_rfc3339();
        self.conn.execute(
            "INSERT INTO clients
             (seed_url, group_id, page_num, item_index, name, profile_url, discovered_at, discovered_run)
             VALUES (?1, ?2, ?3, ?4, ?5, ?6, ?7, ?8)
             ON CONFLICT(group_id, profile_url) DO UPDATE SET
                seed_url = excluded.seed_url,
                page_num = excluded.page_num,
                item_index = excluded.item_index,
                name = excluded.name",
            params![
                position.seed_url,
                position.group_id,
                position.page_num,
                position.item_index as i64,
                entry.name,
                entry.profile_url,
                now,
                run_id
            ],
        )?;

        let id = self.conn.query_row(
            "SELECT id FROM clients WHERE group_id = ?1 AND profile_url = ?2",
            params![position.group_id, entry.profile_url],
            |row| row.get(0),
        )?;
        Ok(id)
    }

    fn get_client(&self, group_id: &str, profile_url: &str) -> StorageResult<Option<ClientRecord>> {
        let client = self
            .conn
            .query_row(
                "SELECT id, seed_url, group_id, page_num, item_index, name, profile_url,
                 discovered_at, discovered_run
                 FROM clients WHERE group_id = ?1 AND profile_url = ?2",
                params![group_id, profile_url],
                client_from_row,
            )
            .optional()?;
        Ok(client)
    }

    // ===== Download Tracking =====

    fn record_download(
        &mut self,
        client_id: i64,
        outcome: &DownloadOutcome,
        run_id: i64,
    ) -> StorageResult<()> {
        let now = Utc::now().to_rfc3339();
        self.conn.execute(
            "INSERT OR REPLACE INTO downloads
             (client_id, state, version_url, artifact_url, file_path, error_message, updated_at, run_id)
             VALUES (?1, ?2, ?3, ?4, ?5, ?6, ?7, ?8)",
            params![
                client_id,
                outcome.state.to_db_string(),
                outcome.version_url,
                outcome.artifact_url,
                outcome.file_path,
                outcome.error_message,
                now,
                run_id
            ],
        )?;
        Ok(())
    }

    fn get_download(&self, client_id: i64) -> StorageResult<Option<DownloadRecord>> {
        let download = self
            .conn
            .query_row(
                "SELECT client_id, state, version_url, artifact_url, file_path, error_message,
                 updated_at, run_id
                 FROM downloads WHERE client_id = ?1",
                params![client_id],
                |row| {
                    Ok(DownloadRecord {
                        client_id: row.get(0)?,
                        state: DownloadState::from_db_string(&row.get::<_, String>(1)?)
                            .unwrap_or(DownloadState::Failed),
                        version_url: row.get(2)?,
                        artifact_url: row.get(3)?,
                        file_path: row.get(4)?,
                        error_message: row.get(5)?,
                        updated_at: row.get(6)?,
                        run_id: row.get(7)?,
                    })
                },
            )
            .optional()?;
        Ok(download)
    }

    fn has_successful_download(&self, group_id: &str, profile_url: &str) -> StorageResult<bool> {
        let count: i64 = self.conn.query_row(
            "SELECT COUNT(*) FROM downloads d JOIN clients c ON c.id = d.client_id
             WHERE c.group_id = ?1 AND c.profile_url = ?2 AND d.state IN (?3, ?4)",
            params![
                group_id,
                profile_url,
                DownloadState::Downloaded.to_db_string(),
                DownloadState::AlreadyPresent.to_db_string()
            ],
            |row| row.get(0),
        )?;
        Ok(count > 0)
    }

    // ===== Statistics =====

    fn count_clients(&self) -> StorageResult<u64> {
        let count: i64 = self
            .conn
            .query_row("SELECT COUNT(*) FROM clients", [], |row| row.get(0))?;
        Ok(count as u64)
    }

    fn count_downloads_by_state(&self, state: DownloadState) -> StorageResult<u64> {
        let count: i64 = self.conn.query_row(
            "SELECT COUNT(*) FROM downloads WHERE state = ?1",
            params![state.to_db_string()],
            |row| row.get(0),
        )?;
        Ok(count as u64)
    }

    fn get_group_summaries(&self) -> StorageResult<Vec<GroupSummary>> {
        let mut stmt = self.conn.prepare(
            "SELECT c.group_id,
                    COUNT(*),
                    SUM(CASE WHEN d.state IN (?1, ?2) THEN 1 ELSE 0 END)
             FROM clients c LEFT JOIN downloads d ON d.client_id = c.id
             GROUP BY c.group_id
             ORDER BY c.group_id",
        )?;

        let summaries = stmt
            .query_map(
                params![
                    DownloadState::Downloaded.to_db_string(),
                    DownloadState::AlreadyPresent.to_db_string()
                ],
                |row| {
                    Ok(GroupSummary {
                        group_id: row.get(0)?,
                        clients: row.get::<_, i64>(1)? as u64,
                        downloaded: row.get::<_, Option<i64>>(2)?.unwrap_or(0) as u64,
                    })
                },
            )?
            .collect::<Result<Vec<_>, _>>()?;

        Ok(summaries)
    }
}
