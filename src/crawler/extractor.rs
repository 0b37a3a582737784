//! Letter detail extraction
//!
//! Fetches the detail view of a single letter and parses it into a record.
//! Failures only ever drop the letter in question.

use crate::crawler::fetcher::PageFetcher;
use crate::crawler::parser::{parse_letter, ArchiveMarkup};
use crate::storage::LetterRecord;
use std::sync::Arc;
use url::Url;

/// Builds letters from their detail views
pub struct DetailExtractor {
    fetcher: Arc<PageFetcher>,
    base_url: Url,
    markup: Arc<ArchiveMarkup>,
}

impl DetailExtractor {
    pub fn new(fetcher: Arc<PageFetcher>, base_url: Url, markup: Arc<ArchiveMarkup>) -> Self {
        Self {
            fetcher,
            base_url,
            markup,
        }
    }

    /// Detail-view URL of a letter: the base URL with a `letter-<id>` fragment
    pub fn detail_url(&self, id: &str) -> Url {
        let mut url = self.base_url.clone();
        url.set_fragment(Some(&format!("letter-{}", id)));
        url
    }

    /// Fetches and parses one letter
    ///
    /// Returns `None` when the page cannot be fetched, or when it lacks the
    /// letter container or the text block.
    pub async fn extract(&self, id: &str) -> Option<LetterRecord> {
        let url = self.detail_url(id);
        tracing::info!("Parsing data for letter ID: {}, URL: {}", id, url);

        let html = match self.fetcher.fetch(url.as_str()).await {
            Ok(html) => html,
            Err(e) => {
                tracing::warn!("Failed to fetch letter {}: {}", id, e);
                return None;
            }
        };

        match parse_letter(&html, id, url.as_str(), &self.markup) {
            Ok(letter) => {
                tracing::info!("Successfully parsed letter ID: {}", id);
                Some(letter)
            }
            Err(missing) => {
                tracing::warn!("Skipping letter {}: {}", id, missing);
                None
            }
        }
    }
}
