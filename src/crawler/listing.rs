//! Listing page traversal
//!
//! Builds the paginated listing URLs and turns each listing page into the
//! letter IDs it shows.

use crate::crawler::fetcher::PageFetcher;
use crate::crawler::parser::{parse_letter_ids, ArchiveMarkup};
use std::sync::Arc;
use url::Url;

/// Sort order requested from the archive: newest published first
pub const ORDER_FIELD: &str = "published_desc";

/// Default number of letters per listing page
pub const DEFAULT_PAGE_SIZE: u32 = 24;

/// URL of the given 1-based listing page under `base_url`
///
/// Existing query parameters of the base URL are kept; the ordering,
/// page and page-size parameters are appended.
pub fn listing_url(base_url: &Url, page: u32, page_size: u32) -> Url {
    let mut url = base_url.clone();
    url.set_fragment(None);
    url.query_pairs_mut()
        .append_pair("order_field", ORDER_FIELD)
        .append_pair("page", &page.to_string())
        .append_pair("per", &page_size.to_string());
    url
}

/// Lists letter IDs page by page
pub struct IdLister {
    fetcher: Arc<PageFetcher>,
    base_url: Url,
    page_size: u32,
    markup: Arc<ArchiveMarkup>,
}

impl IdLister {
    pub fn new(
        fetcher: Arc<PageFetcher>,
        base_url: Url,
        page_size: u32,
        markup: Arc<ArchiveMarkup>,
    ) -> Self {
        Self {
            fetcher,
            base_url,
            page_size,
            markup,
        }
    }

    /// URL of the given 1-based listing page
    pub fn build_url(&self, page: u32) -> Url {
        let url = listing_url(&self.base_url, page, self.page_size);
        tracing::debug!("Built URL for fetching letter IDs: {}", url);
        url
    }

    /// Letter IDs shown on the given page, newest first
    ///
    /// An empty result means the archive is exhausted or the page could not
    /// be fetched; the caller stops paginating either way.
    pub async fn list_ids(&self, page: u32) -> Vec<String> {
        let url = self.build_url(page);
        tracing::info!("Fetching letter IDs from {}", url);

        let html = match self.fetcher.fetch(url.as_str()).await {
            Ok(html) => html,
            Err(e) => {
                tracing::warn!("Failed to fetch listing page {}: {}", page, e);
                return Vec::new();
            }
        };

        let ids = parse_letter_ids(&html, &self.markup);
        tracing::info!("Found {} letter IDs on page {}", ids.len(), page);
        ids
    }
}
