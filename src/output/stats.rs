//! Statistics generation from the letter database
//!
//! This module provides functionality for extracting and displaying
//! harvest statistics from the storage layer.

use crate::crawler::CrawlReport;
use crate::storage::{LetterStore, RunLog, RunRecord, SqliteStorage, StorageResult};

/// Number of runs listed by `--stats`
const RECENT_RUN_LIMIT: u32 = 5;

/// Letter database statistics summary
#[derive(Debug, Clone)]
pub struct LetterStatistics {
    /// Total number of stored letters
    pub total_letters: u64,

    /// Letters whose date could not be read
    pub unknown_dates: u64,

    /// Letters without a known author
    pub unknown_authors: u64,

    /// Latest runs, newest first
    pub recent_runs: Vec<RunRecord>,
}

/// Loads statistics from storage
///
/// # Arguments
///
/// * `storage` - The letter database to query
pub fn load_statistics(storage: &SqliteStorage) -> StorageResult<LetterStatistics> {
    Ok(LetterStatistics {
        total_letters: storage.count()?,
        unknown_dates: storage.count_unknown_dates()?,
        unknown_authors: storage.count_unknown_authors()?,
        recent_runs: storage.recent_runs(RECENT_RUN_LIMIT)?,
    })
}

fn percentage(part: u64, total: u64) -> f64 {
    if total > 0 {
        (part as f64 / total as f64) * 100.0
    } else {
        0.0
    }
}

/// Prints statistics to stdout in a formatted manner
pub fn print_statistics(stats: &LetterStatistics) {
    println!("=== Letter Statistics ===\n");

    println!("Overview:");
    println!("  Letters stored: {}", stats.total_letters);
    println!(
        "  Unknown date: {} ({:.1}%)",
        stats.unknown_dates,
        percentage(stats.unknown_dates, stats.total_letters)
    );
    println!(
        "  Unknown author: {} ({:.1}%)",
        stats.unknown_authors,
        percentage(stats.unknown_authors, stats.total_letters)
    );
    println!();

    if stats.recent_runs.is_empty() {
        println!("No harvest runs recorded yet.");
        return;
    }

    println!("Recent Runs ({}):", stats.recent_runs.len());
    for run in &stats.recent_runs {
        println!(
            "  #{} {} started {} finished {} new letters: {}",
            run.id,
            run.status.to_db_string(),
            run.started_at,
            run.finished_at.as_deref().unwrap_or("-"),
            run.new_letters
        );
        if let Some(message) = &run.error_message {
            println!("      error: {}", message);
        }
    }
}

/// Prints the outcome of a single harvest run
pub fn print_report(report: &CrawlReport) {
    println!("=== Harvest Report ===\n");
    println!("  Pages visited: {}", report.pages_visited);
    println!("  Candidate IDs: {}", report.candidates);
    println!("  Already stored: {}", report.already_known);
    println!("  Extracted: {}", report.extracted);
    println!("  Discarded: {}", report.discarded);
    println!("  New letters: {}", report.persisted);
    println!("  Letters stored: {}", report.final_count);
}
