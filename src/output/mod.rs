//! Output module for reporting on the letter database
//!
//! This module handles:
//! - Collecting statistics about stored letters and past runs
//! - Printing those statistics and run reports to stdout

pub mod stats;

pub use stats::{load_statistics, print_report, print_statistics, LetterStatistics};
