//! SQLite storage implementation
//!
//! This module provides a SQLite-based implementation of the storage traits.

use crate::storage::schema::initialize_schema;
use crate::storage::traits::{LetterStore, RunLog, StorageError, StorageResult};
use crate::storage::{unknown_date, LetterRecord, RunRecord, RunStatus, UNKNOWN};
use chrono::{NaiveDate, Utc};
use rusqlite::{params, Connection, OptionalExtension, Row};
use std::path::Path;

const DATE_FORMAT: &str = "%Y-%m-%d";

/// SQLite storage backend
pub struct SqliteStorage {
    conn: Connection,
}

impl SqliteStorage {
    /// Opens (or creates) the database file and applies the schema
    pub fn new(path: &Path) -> StorageResult<Self> {
        let conn = Connection::open(path)?;

        conn.execute_batch(
            "
            PRAGMA journal_mode = WAL;
            PRAGMA synchronous = NORMAL;
            PRAGMA temp_store = MEMORY;
        ",
        )?;

        initialize_schema(&conn)?;

        Ok(Self { conn })
    }

    /// Creates an in-memory database
    pub fn open_in_memory() -> StorageResult<Self> {
        let conn = Connection::open_in_memory()?;
        initialize_schema(&conn)?;
        Ok(Self { conn })
    }

    /// Number of stored letters whose date fell back to the sentinel
    pub fn count_unknown_dates(&self) -> StorageResult<u64> {
        let sentinel = unknown_date().format(DATE_FORMAT).to_string();
        let count: i64 = self.conn.query_row(
            "SELECT COUNT(*) FROM letters WHERE date = ?1",
            params![sentinel],
            |row| row.get(0),
        )?;
        Ok(count as u64)
    }

    /// Number of stored letters without a known author
    pub fn count_unknown_authors(&self) -> StorageResult<u64> {
        let count: i64 = self.conn.query_row(
            "SELECT COUNT(*) FROM letters WHERE author = ?1",
            params![UNKNOWN],
            |row| row.get(0),
        )?;
        Ok(count as u64)
    }

    fn run_from_row(row: &Row<'_>) -> rusqlite::Result<RunRecord> {
        Ok(RunRecord {
            id: row.get(0)?,
            started_at: row.get(1)?,
            finished_at: row.get(2)?,
            config_hash: row.get(3)?,
            status: RunStatus::from_db_string(&row.get::<_, String>(4)?)
                .unwrap_or(RunStatus::Failed),
            new_letters: row.get::<_, i64>(5)? as u64,
            error_message: row.get(6)?,
        })
    }
}

impl LetterStore for SqliteStorage {
    fn count(&self) -> StorageResult<u64> {
        let count: i64 = self
            .conn
            .query_row("SELECT COUNT(*) FROM letters", [], |row| row.get(0))?;
        Ok(count as u64)
    }

    fn exists(&self, id: &str) -> StorageResult<bool> {
        let found: Option<i64> = self
            .conn
            .query_row("SELECT 1 FROM letters WHERE id = ?1", params![id], |row| {
                row.get(0)
            })
            .optional()?;
        Ok(found.is_some())
    }

    fn create_if_absent(&mut self, letter: &LetterRecord) -> StorageResult<bool> {
        let now = Utc::now().to_rfc3339();
        let inserted = self.conn.execute(
            "INSERT OR IGNORE INTO letters
             (id, date, author, sender, recipient, destination, text, url, harvested_at)
             VALUES (?1, ?2, ?3, ?4, ?5, ?6, ?7, ?8, ?9)",
            params![
                letter.id,
                letter.date.format(DATE_FORMAT).to_string(),
                letter.author,
                letter.sender,
                letter.recipient,
                letter.destination,
                letter.text,
                letter.url,
                now,
            ],
        )?;

        if inserted == 0 {
            tracing::info!("Letter with ID {} already exists. Skipping.", letter.id);
        } else {
            tracing::info!("Letter with ID {} successfully created.", letter.id);
        }

        Ok(inserted > 0)
    }

    fn get(&self, id: &str) -> StorageResult<Option<LetterRecord>> {
        let row = self
            .conn
            .query_row(
                "SELECT id, date, author, sender, recipient, destination, text, url
                 FROM letters WHERE id = ?1",
                params![id],
                |row| {
                    Ok((
                        row.get::<_, String>(1)?,
                        LetterRecord {
                            id: row.get(0)?,
                            date: unknown_date(),
                            author: row.get(2)?,
                            sender: row.get(3)?,
                            recipient: row.get(4)?,
                            destination: row.get(5)?,
                            text: row.get(6)?,
                            url: row.get(7)?,
                        },
                    ))
                },
            )
            .optional()?;

        match row {
            Some((date, mut letter)) => {
                letter.date = NaiveDate::parse_from_str(&date, DATE_FORMAT).map_err(|e| {
                    StorageError::Serialization(format!("Bad date '{}' for {}: {}", date, id, e))
                })?;
                Ok(Some(letter))
            }
            None => Ok(None),
        }
    }
}

impl RunLog for SqliteStorage {
    fn create_run(&mut self, config_hash: &str) -> StorageResult<i64> {
        let now = Utc::now().to_rfc3339();
        self.conn.execute(
            "INSERT INTO runs (started_at, config_hash, status) VALUES (?1, ?2, ?3)",
            params![now, config_hash, RunStatus::Running.to_db_string()],
        )?;
        Ok(self.conn.last_insert_rowid())
    }

    fn complete_run(&mut self, run_id: i64, new_letters: u64) -> StorageResult<()> {
        let now = Utc::now().to_rfc3339();
        let updated = self.conn.execute(
            "UPDATE runs SET status = ?1, finished_at = ?2, new_letters = ?3 WHERE id = ?4",
            params![
                RunStatus::Completed.to_db_string(),
                now,
                new_letters as i64,
                run_id
            ],
        )?;
        if updated == 0 {
            return Err(StorageError::RunNotFound(run_id));
        }
        Ok(())
    }

    fn fail_run(&mut self, run_id: i64, error_message: &str) -> StorageResult<()> {
        let now = Utc::now().to_rfc3339();
        let updated = self.conn.execute(
            "UPDATE runs SET status = ?1, finished_at = ?2, error_message = ?3 WHERE id = ?4",
            params![RunStatus::Failed.to_db_string(), now, error_message, run_id],
        )?;
        if updated == 0 {
            return Err(StorageError::RunNotFound(run_id));
        }
        Ok(())
    }

    fn get_run(&self, run_id: i64) -> StorageResult<RunRecord> {
        self.conn
            .query_row(
                "SELECT id, started_at, finished_at, config_hash, status, new_letters, error_message
                 FROM runs WHERE id = ?1",
                params![run_id],
                Self::run_from_row,
            )
            .optional()?
            .ok_or(StorageError::RunNotFound(run_id))
    }

    fn recent_runs(&self, limit: u32) -> StorageResult<Vec<RunRecord>> {
        let mut stmt = self.conn.prepare(
            "SELECT id, started_at, finished_at, config_hash, status, new_letters, error_message
             FROM runs ORDER BY id DESC LIMIT ?1",
        )?;

        let runs = stmt
            .query_map(params![limit], Self::run_from_row)?
            .collect::<Result<Vec<_>, _>>()?;

        Ok(runs)
    }
}
