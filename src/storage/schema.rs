//! Database schema definitions
//!
//! This module contains all SQL schema definitions for the harvester database.

/// SQL schema for the database
pub const SCHEMA_SQL: &str = r#"
-- One row per harvested letter, keyed by archive ID
CREATE TABLE IF NOT EXISTS letters (
    id TEXT PRIMARY KEY,
    date TEXT NOT NULL,
    author TEXT NOT NULL,
    sender TEXT NOT NULL,
    recipient TEXT NOT NULL,
    destination TEXT NOT NULL,
    text TEXT NOT NULL,
    url TEXT NOT NULL,
    harvested_at TEXT NOT NULL
);

-- Track harvest runs
CREATE TABLE IF NOT EXISTS runs (
    id INTEGER PRIMARY KEY AUTOINCREMENT,
    started_at TEXT NOT NULL,
    finished_at TEXT,
    config_hash TEXT NOT NULL,
    status TEXT NOT NULL,
    new_letters INTEGER NOT NULL DEFAULT 0,
    error_message TEXT
);
"#;

/// Initializes the database schema
pub fn initialize_schema(conn: &rusqlite::Connection) -> Result<(), rusqlite::Error> {
    conn.execute_batch(SCHEMA_SQL)?;
    Ok(())
}
