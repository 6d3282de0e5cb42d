//! Database schema definitions
//!
//! This module contains all SQL schema definitions for the download ledger.

/// SQL schema for the database
pub const SCHEMA_SQL: &str = r#"
-- Track harvest runs
CREATE TABLE IF NOT EXISTS runs (
    id INTEGER PRIMARY KEY AUTOINCREMENT,
    started_at TEXT NOT NULL,
    finished_at TEXT,
    status TEXT NOT NULL
);

-- Track every client entry seen on a usages listing
CREATE TABLE IF NOT EXISTS clients (
    id INTEGER PRIMARY KEY AUTOINCREMENT,
    seed_url TEXT NOT NULL,
    group_id TEXT NOT NULL,
    page_num INTEGER NOT NULL,
    item_index INTEGER NOT NULL,
    name TEXT NOT NULL,
    profile_url TEXT NOT NULL,
    discovered_at TEXT NOT NULL,
    discovered_run INTEGER NOT NULL REFERENCES runs(id),
    UNIQUE(group_id, profile_url)
);

CREATE INDEX IF NOT EXISTS idx_clients_seed ON clients(seed_url);
CREATE INDEX IF NOT EXISTS idx_clients_group ON clients(group_id);

-- Latest download outcome per client
CREATE TABLE IF NOT EXISTS downloads (
    client_id INTEGER PRIMARY KEY REFERENCES clients(id),
    state TEXT NOT NULL,
    version_url TEXT,
    artifact_url TEXT,
    file_path TEXT,
    error_message TEXT,
    updated_at TEXT NOT NULL,
    run_id INTEGER NOT NULL REFERENCES runs(id)
);

CREATE INDEX IF NOT EXISTS idx_downloads_state ON downloads(state);
"#;

/// Initializes the database schema
pub fn initialize_schema(conn: &rusqlite::Connection) -> Result<(), rusqlite::Error> {
    conn.execute_batch(SCHEMA_SQL)?;
    Ok(())
}
