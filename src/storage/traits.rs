//! Storage traits and error types
//!
//! This module defines the trait interfaces for storage backends and
//! associated error types.

use crate::storage::{LetterRecord, RunRecord};
use thiserror::Error;

/// Errors that can occur during storage operations
#[derive(Debug, Error)]
pub enum StorageError {
    #[error("Database error: {0}")]
    Database(String),

    #[error("Run not found: {0}")]
    RunNotFound(i64),

    #[error("Serialization error: {0}")]
    Serialization(String),

    #[error("SQLite error: {0}")]
    Sqlite(#[from] rusqlite::Error),
}

/// Result type for storage operations
pub type StorageResult<T> = Result<T, StorageError>;

/// The durable store of harvested letters
///
/// Every call is a fresh query against the backend: the crawler never keeps
/// its own seen-set, so writes made by another process are always observed.
/// Any error returned here is fatal for the current run.
pub trait LetterStore {
    /// Number of letters currently stored
    fn count(&self) -> StorageResult<u64>;

    /// Whether a letter with this ID is already stored
    fn exists(&self, id: &str) -> StorageResult<bool>;

    /// Inserts the letter unless its ID is already present
    ///
    /// The insert is committed before returning. Returns `true` when a row
    /// was written and `false` when the ID already existed.
    fn create_if_absent(&mut self, letter: &LetterRecord) -> StorageResult<bool>;

    /// Loads a stored letter by ID
    fn get(&self, id: &str) -> StorageResult<Option<LetterRecord>>;
}

/// Bookkeeping of harvest runs
pub trait RunLog {
    /// Records the start of a run and returns its ID
    fn create_run(&mut self, config_hash: &str) -> StorageResult<i64>;

    /// Marks a run as completed with the number of letters it added
    fn complete_run(&mut self, run_id: i64, new_letters: u64) -> StorageResult<()>;

    /// Marks a run as failed with the error that aborted it
    fn fail_run(&mut self, run_id: i64, error_message: &str) -> StorageResult<()>;

    /// Gets a run by ID
    fn get_run(&self, run_id: i64) -> StorageResult<RunRecord>;

    /// Most recent runs, newest first
    fn recent_runs(&self, limit: u32) -> StorageResult<Vec<RunRecord>>;
}
