//! Storage module for persisting harvested letters
//!
//! This module handles all database operations for the harvester, including:
//! - SQLite database initialization and schema management
//! - Skip-if-exists persistence of letters keyed by archive ID
//! - Run history bookkeeping

mod schema;
mod sqlite;
mod traits;

pub use sqlite::SqliteStorage;
pub use traits::{LetterStore, RunLog, StorageError, StorageResult};

use chrono::NaiveDate;
use std::path::Path;

/// Fallback value for free-text fields missing from the source markup
pub const UNKNOWN: &str = "unknown";

/// Fallback date for letters whose date text does not parse (1970-01-01)
pub fn unknown_date() -> NaiveDate {
    NaiveDate::default()
}

/// Initializes or opens a storage database
pub fn open_storage(path: &Path) -> StorageResult<SqliteStorage> {
    SqliteStorage::new(path)
}

/// A single letter extracted from the archive
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct LetterRecord {
    /// Archive-assigned identifier, primary key
    pub id: String,
    pub date: NaiveDate,
    pub author: String,
    pub sender: String,
    pub recipient: String,
    pub destination: String,
    /// Letter body, one line per source text node
    pub text: String,
    /// Detail-view URL the record was fetched from, fragment included
    pub url: String,
}

impl LetterRecord {
    /// Whether the date fell back to the sentinel
    pub fn has_unknown_date(&self) -> bool {
        self.date == unknown_date()
    }
}

/// Represents a harvest run
#[derive(Debug, Clone)]
pub struct RunRecord {
    pub id: i64,
    pub started_at: String,
    pub finished_at: Option<String>,
    pub config_hash: String,
    pub status: RunStatus,
    pub new_letters: u64,
    pub error_message: Option<String>,
}

/// Status of a harvest run
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum RunStatus {
    Running,
    Completed,
    Failed,
}

impl RunStatus {
    pub fn to_db_string(&self) -> &'static str {
        match self {
            Self::Running => "running",
            Self::Completed => "completed",
            Self::Failed => "failed",
        }
    }

    pub fn from_db_string(s: &str) -> Option<Self> {
        match s {
            "running" => Some(Self::Running),
            "completed" => Some(Self::Completed),
            "failed" => Some(Self::Failed),
            _ => None,
        }
    }
}
