//! Crawl coordinator - main harvest orchestration logic
//!
//! This module contains the pagination loop that ties the crawler together:
//! - Reading the store's letter count before every page
//! - Listing the page's letter IDs, each counted once per page
//! - Dropping IDs the store already knows (one query per ID)
//! - Trimming the new IDs to the letters still missing from the target
//! - Fetching the remaining letters through the admission gate
//! - Persisting every extracted letter with skip-if-exists semantics

use crate::config::Config;
use crate::crawler::extractor::DetailExtractor;
use crate::crawler::fetcher::{PageFetcher, Renderer};
use crate::crawler::listing::IdLister;
use crate::crawler::parser::ArchiveMarkup;
use crate::crawler::scheduler::Scheduler;
use crate::storage::LetterStore;
use crate::HarvestError;
use std::collections::HashSet;
use std::sync::Arc;
use url::Url;

/// Position of a run in the archive
///
/// Lives only for the duration of `Orchestrator::run`; every run starts
/// again from page 1.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct CrawlCursor {
    /// Current listing page, 1-based
    pub page: u32,
    /// Letters in the store when this page started
    pub known: u64,
}

/// What a single run did
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct CrawlReport {
    /// Listing pages that yielded IDs
    pub pages_visited: u32,
    /// Distinct IDs found on each visited listing page
    pub candidates: usize,
    /// Candidates already present in the store
    pub already_known: usize,
    /// Detail views that produced a letter
    pub extracted: usize,
    /// Detail views that failed to fetch or lacked required markup
    pub discarded: usize,
    /// Letters actually inserted by this run
    pub persisted: u64,
    /// Store count when the run stopped
    pub final_count: u64,
}

/// Main harvest coordinator
pub struct Orchestrator<S: LetterStore> {
    fetcher: Arc<PageFetcher>,
    lister: IdLister,
    extractor: DetailExtractor,
    scheduler: Scheduler,
    store: S,
}

impl<S: LetterStore> Orchestrator<S> {
    /// Creates a coordinator over a shared fetcher
    ///
    /// # Arguments
    ///
    /// * `fetcher` - Fetcher used for both listing pages and detail views
    /// * `base_url` - Archive base URL
    /// * `page_size` - Letters per listing page
    /// * `markup` - Selectors and labels of the archive
    /// * `max_concurrent_fetches` - Ceiling of in-flight detail fetches
    /// * `store` - Durable letter store
    pub fn new(
        fetcher: Arc<PageFetcher>,
        base_url: Url,
        page_size: u32,
        markup: ArchiveMarkup,
        max_concurrent_fetches: usize,
        store: S,
    ) -> Self {
        let markup = Arc::new(markup);
        let lister = IdLister::new(fetcher.clone(), base_url.clone(), page_size, markup.clone());
        let extractor = DetailExtractor::new(fetcher.clone(), base_url, markup);

        Self {
            fetcher,
            lister,
            extractor,
            scheduler: Scheduler::new(max_concurrent_fetches),
            store,
        }
    }

    /// Creates a coordinator from a validated configuration
    pub fn from_config(
        config: &Config,
        renderer: Arc<dyn Renderer>,
        store: S,
    ) -> Result<Self, HarvestError> {
        let base_url = Url::parse(&config.archive.base_url)?;
        let markup = ArchiveMarkup::from_config(&config.markup)?;
        let fetcher = Arc::new(PageFetcher::from_config(renderer, &config.fetcher));

        Ok(Self::new(
            fetcher,
            base_url,
            config.archive.page_size,
            markup,
            config.crawler.max_concurrent_fetches as usize,
            store,
        ))
    }

    pub fn store(&self) -> &S {
        &self.store
    }

    pub fn store_mut(&mut self) -> &mut S {
        &mut self.store
    }

    pub fn into_store(self) -> S {
        self.store
    }

    /// Harvests until the store holds `target_count` letters or the archive
    /// runs out of listing pages
    ///
    /// Fetch and parse failures only skip the affected letter. Any store
    /// error aborts the run; letters persisted before it stay persisted.
    pub async fn run(&mut self, target_count: u64) -> Result<CrawlReport, HarvestError> {
        let mut cursor = CrawlCursor {
            page: 1,
            known: self.store.count()?,
        };
        let mut report = CrawlReport::default();

        tracing::info!(
            "Starting harvest: {} letters stored, target {}",
            cursor.known,
            target_count
        );

        while cursor.known < target_count {
            tracing::info!("Processing page {}", cursor.page);

            let mut ids = self.lister.list_ids(cursor.page).await;
            if ids.is_empty() {
                tracing::info!("No letter IDs found on page {}. Stopping.", cursor.page);
                break;
            }
            report.pages_visited += 1;

            let mut on_page = HashSet::with_capacity(ids.len());
            ids.retain(|id| on_page.insert(id.clone()));
            report.candidates += ids.len();

            let mut new_ids = Vec::with_capacity(ids.len());
            for id in ids {
                if self.store.exists(&id)? {
                    tracing::info!("Letter with ID {} already exists. Skipping.", id);
                    report.already_known += 1;
                } else {
                    new_ids.push(id);
                }
            }

            let remaining = usize::try_from(target_count - cursor.known).unwrap_or(usize::MAX);
            new_ids.truncate(remaining);
            tracing::debug!(
                "{} new letter IDs to fetch on page {}",
                new_ids.len(),
                cursor.page
            );

            let extractor = &self.extractor;
            let results = self
                .scheduler
                .fan_out(new_ids.iter(), |id| extractor.extract(id))
                .await;

            for extracted in results.into_iter().flatten() {
                match extracted {
                    Some(letter) => {
                        report.extracted += 1;
                        if self.store.create_if_absent(&letter)? {
                            report.persisted += 1;
                        }
                    }
                    None => report.discarded += 1,
                }
            }

            cursor.page += 1;
            cursor.known = self.store.count()?;
        }

        report.final_count = cursor.known;
        tracing::info!(
            "Harvest finished: {} new letters, {} stored in total, {} pages visited",
            report.persisted,
            report.final_count,
            report.pages_visited
        );

        Ok(report)
    }

    /// Releases the renderer session shared by the lister and the extractor
    pub async fn shutdown(&self) {
        self.fetcher.shutdown().await;
    }

    /// Runs once, then releases the renderer session whatever the outcome
    pub async fn run_and_shutdown(
        &mut self,
        target_count: u64,
    ) -> Result<CrawlReport, HarvestError> {
        let result = self.run(target_count).await;
        self.shutdown().await;
        result
    }
}
