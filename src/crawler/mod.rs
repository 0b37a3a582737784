//! Crawler module for harvesting letters
//!
//! This module contains the core crawling logic, including:
//! - Page rendering with retry logic
//! - Listing page traversal and letter detail extraction
//! - Bounded-concurrency fan-out of detail fetches
//! - Overall harvest coordination

#[cfg(feature = "browser")]
mod browser;
mod coordinator;
mod extractor;
mod fetcher;
mod listing;
mod parser;
mod scheduler;

#[cfg(feature = "browser")]
pub use browser::BrowserRenderer;
pub use coordinator::{CrawlCursor, CrawlReport, Orchestrator};
pub use extractor::DetailExtractor;
pub use fetcher::{
    build_http_client, FetchError, HttpRenderer, PageFetcher, Renderer, RetryPolicy,
    DEFAULT_USER_AGENT,
};
pub use listing::{listing_url, IdLister, DEFAULT_PAGE_SIZE, ORDER_FIELD};
pub use parser::{parse_letter, parse_letter_ids, ArchiveMarkup, FieldLabels, MissingElement};
pub use scheduler::{Scheduler, DEFAULT_MAX_CONCURRENT_FETCHES};

use crate::config::{Config, FetcherConfig, RendererKind};
use crate::storage::{RunLog, SqliteStorage};
use crate::HarvestError;
use std::path::Path;
use std::sync::Arc;

/// Builds the renderer selected in the `[fetcher]` section
pub fn build_renderer(config: &FetcherConfig) -> Result<Arc<dyn Renderer>, HarvestError> {
    let user_agent = config.user_agent.clone();

    if !config.renderer.runs_scripts() {
        tracing::warn!(
            "renderer = \"http\" does not send the #letter-<id> fragment; \
             detail views that are filled in by scripts need renderer = \"browser\""
        );
    }

    match config.renderer {
        RendererKind::Http => Ok(Arc::new(HttpRenderer::new(
            user_agent.unwrap_or_else(|| DEFAULT_USER_AGENT.to_string()),
        ))),
        #[cfg(feature = "browser")]
        RendererKind::Browser => Ok(Arc::new(BrowserRenderer::new(user_agent))),
        #[cfg(not(feature = "browser"))]
        RendererKind::Browser => Err(crate::ConfigError::Validation(
            "renderer = \"browser\" requires building with the `browser` feature".to_string(),
        )
        .into()),
    }
}

/// Runs one complete harvest
///
/// This is the entry point invoked by the trigger. It will:
/// 1. Build the renderer and open the letter database
/// 2. Record the start of a run
/// 3. Harvest up to `archive.target-count` letters
/// 4. Release the renderer session, whether the harvest failed or not
/// 5. Record the run outcome
///
/// # Arguments
///
/// * `config` - The harvester configuration
/// * `config_hash` - Hash of the configuration file, kept with the run
pub async fn harvest(config: &Config, config_hash: &str) -> Result<CrawlReport, HarvestError> {
    let renderer = build_renderer(&config.fetcher)?;
    let storage = SqliteStorage::new(Path::new(&config.output.database_path))?;
    let mut orchestrator = Orchestrator::from_config(config, renderer, storage)?;
    let run_id = orchestrator.store_mut().create_run(config_hash)?;

    let result = orchestrator
        .run_and_shutdown(config.archive.target_count)
        .await;

    let storage = orchestrator.store_mut();
    match result {
        Ok(report) => {
            storage.complete_run(run_id, report.persisted)?;
            Ok(report)
        }
        Err(e) => {
            tracing::error!("Harvest run {} failed: {}", run_id, e);
            if let Err(log_err) = storage.fail_run(run_id, &e.to_string()) {
                tracing::error!("Could not record failure of run {}: {}", run_id, log_err);
            }
            Err(e)
        }
    }
}
