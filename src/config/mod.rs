//! Configuration module for the harvester
//!
//! This module handles loading, parsing, and validating TOML configuration files.
//!
//! # Example
//!
//! ```no_run
//! use letter_harvester::config::load_config;
//! use std::path::Path;
//!
//! let config = load_config(Path::new("harvester.toml")).unwrap();
//! println!("Harvesting up to {} letters", config.archive.target_count);
//! ```

mod parser;
mod types;
mod validation;

// Re-export types
pub use types::{
    ArchiveConfig, Config, CrawlerConfig, FetcherConfig, MarkupConfig, OutputConfig,
    RendererKind, ScheduleConfig,
};

// Re-export parser functions
pub use parser::{compute_config_hash, load_config, load_config_with_hash};
