//! Markup-variant page source: paged HTML catalogue.

use async_trait::async_trait;
use scraper::Html;
use tracing::debug;

use crate::application::crawler::{CrawlBatch, CrawlError, PageSource};
use crate::infrastructure::html_extractor::HtmlExtractor;
use crate::infrastructure::http_client::HttpClient;

/// Fetches catalogue listing pages and extracts candidates from the markup.
pub struct MarkupCatalogueSource {
    http: HttpClient,
    extractor: HtmlExtractor,
    catalogue_url: String,
}

impl MarkupCatalogueSource {
    pub fn new(http: HttpClient, extractor: HtmlExtractor, catalogue_url: String) -> Self {
        Self {
            http,
            extractor,
            catalogue_url,
        }
    }

    /// Page 1 is the bare catalogue URL; later pages append `?page=N`.
    fn page_url(&self, page: u32) -> String {
        if page <= 1 {
            self.catalogue_url.clone()
        } else {
            format!("{}?page={}", self.catalogue_url, page)
        }
    }
}

#[async_trait]
impl PageSource for MarkupCatalogueSource {
    fn describe(&self) -> String {
        format!("markup catalogue at {}", self.catalogue_url)
    }

    async fn fetch_batch(&self, page: u32) -> Result<CrawlBatch, CrawlError> {
        let url = self.page_url(page);
        let body = self.http.get_text(&url).await?;

        let document = Html::parse_document(&body);
        let candidates = self.extractor.extract_candidates(&document)?;
        let has_more = self.extractor.has_next_page(&document);
        debug!(page, candidates = candidates.len(), has_more, "page extracted");

        Ok(CrawlBatch {
            candidates,
            has_more,
        })
    }

    /// Out-of-range page numbers re-serve the final page, so a page that
    /// adds nothing new is the end of the catalogue.
    fn stale_page_ends_crawl(&self) -> bool {
        true
    }
}
