//! Crawl controller: drives pagination, ingestion, and termination.
//!
//! One run walks the catalogue page by page through a [`PageSource`],
//! validates every candidate, and appends genuinely new observations to the
//! snapshot store. Per-item failures are skipped; structural and transport
//! failures abort the run. Nothing is retried within a run — re-running the
//! whole crawl is the retry mechanism, and idempotent inserts make that safe.

use std::time::Duration;

use async_trait::async_trait;
use chrono::NaiveDate;
use thiserror::Error;
use tokio::time::sleep;
use tracing::{debug, error, info, warn};
use uuid::Uuid;

use crate::domain::observation::{normalize_name, PriceObservation};
use crate::domain::price::parse_price;
use crate::infrastructure::config::CrawlConfig;
use crate::infrastructure::html_extractor::ExtractionError;
use crate::infrastructure::http_client::HttpError;
use crate::infrastructure::observation_repository::{InsertOutcome, ObservationRepository};

/// Failure that aborts the current crawl run.
///
/// The next invocation restarts pagination from the beginning; observations
/// committed before the abort are retained.
#[derive(Error, Debug)]
pub enum CrawlError {
    #[error("network failure: {0}")]
    Network(#[from] HttpError),

    #[error("upstream protocol error: {reason}")]
    Protocol { reason: String },

    #[error(transparent)]
    StructuralDrift(#[from] ExtractionError),

    #[error("snapshot store failure: {0}")]
    Store(#[from] sqlx::Error),
}

/// One raw candidate record as extracted from upstream content.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct RawCandidate {
    pub name: String,
    pub price_text: String,
}

/// One page worth of candidates plus the pagination signal.
#[derive(Debug, Clone, Default)]
pub struct CrawlBatch {
    pub candidates: Vec<RawCandidate>,
    /// Whether upstream advertises more pages after this one.
    pub has_more: bool,
}

/// A paged upstream catalogue.
///
/// One capability: produce the candidate batch for a 1-based page. The
/// markup and API variants implement this; tests use scripted stand-ins.
#[async_trait]
pub trait PageSource: Send + Sync {
    /// Label for logs.
    fn describe(&self) -> String;

    async fn fetch_batch(&self, page: u32) -> Result<CrawlBatch, CrawlError>;

    /// Whether a page that adds no new observations marks the end of the
    /// catalogue. True for markup pagination, which repeats the final page
    /// for any out-of-range page number.
    fn stale_page_ends_crawl(&self) -> bool {
        false
    }
}

/// Counters for one finished crawl run.
#[derive(Debug, Clone)]
pub struct CrawlSummary {
    pub run_id: Uuid,
    pub date: NaiveDate,
    pub pages_fetched: u32,
    pub inserted: u32,
    pub duplicates: u32,
    pub skipped: u32,
}

#[derive(Debug, Default)]
struct BatchOutcome {
    inserted: u32,
    duplicates: u32,
    skipped: u32,
}

enum CrawlState {
    Fetching { page: u32 },
    Ingesting { page: u32, batch: CrawlBatch },
    Advancing { page: u32 },
    Exhausted,
    Aborted(CrawlError),
}

/// Sequential crawl driver over a [`PageSource`].
pub struct CrawlController<S: PageSource> {
    source: S,
    repository: ObservationRepository,
    max_pages: u32,
    request_delay: Duration,
}

impl<S: PageSource> CrawlController<S> {
    pub fn new(source: S, repository: ObservationRepository, config: &CrawlConfig) -> Self {
        Self {
            source,
            repository,
            max_pages: config.max_pages,
            request_delay: Duration::from_millis(config.request_delay_ms),
        }
    }

    /// Run one crawl for the given snapshot date.
    ///
    /// Returns the run counters on normal exhaustion; aborts with the first
    /// structural or transport failure.
    pub async fn run(&self, date: NaiveDate) -> Result<CrawlSummary, CrawlError> {
        let mut summary = CrawlSummary {
            run_id: Uuid::new_v4(),
            date,
            pages_fetched: 0,
            inserted: 0,
            duplicates: 0,
            skipped: 0,
        };
        info!(
            run_id = %summary.run_id,
            source = %self.source.describe(),
            %date,
            "starting crawl"
        );

        let mut state = CrawlState::Fetching { page: 1 };
        loop {
            state = match state {
                CrawlState::Fetching { page } => {
                    if page > self.max_pages {
                        warn!(ceiling = self.max_pages, "page ceiling reached, stopping");
                        CrawlState::Exhausted
                    } else {
                        match self.source.fetch_batch(page).await {
                            Ok(batch) => {
                                summary.pages_fetched += 1;
                                CrawlState::Ingesting { page, batch }
                            }
                            Err(err) => CrawlState::Aborted(err),
                        }
                    }
                }

                CrawlState::Ingesting { page, batch } => {
                    if batch.candidates.is_empty() {
                        debug!(page, "empty batch, catalogue exhausted");
                        CrawlState::Exhausted
                    } else {
                        match self.ingest_batch(date, &batch.candidates).await {
                            Ok(outcome) => {
                                info!(
                                    page,
                                    inserted = outcome.inserted,
                                    duplicates = outcome.duplicates,
                                    skipped = outcome.skipped,
                                    "page ingested"
                                );
                                summary.inserted += outcome.inserted;
                                summary.duplicates += outcome.duplicates;
                                summary.skipped += outcome.skipped;

                                let stale =
                                    outcome.inserted == 0 && page > 1 && self.source.stale_page_ends_crawl();
                                if stale {
                                    debug!(page, "no new observations, treating catalogue as exhausted");
                                    CrawlState::Exhausted
                                } else if !batch.has_more {
                                    debug!(page, "no next page advertised");
                                    CrawlState::Exhausted
                                } else {
                                    CrawlState::Advancing { page }
                                }
                            }
                            Err(err) => CrawlState::Aborted(CrawlError::Store(err)),
                        }
                    }
                }

                CrawlState::Advancing { page } => {
                    // Mandatory courtesy toward the storefront; removing it
                    // gets the crawler blocked.
                    sleep(self.request_delay).await;
                    CrawlState::Fetching { page: page + 1 }
                }

                CrawlState::Exhausted => {
                    info!(
                        run_id = %summary.run_id,
                        pages = summary.pages_fetched,
                        inserted = summary.inserted,
                        duplicates = summary.duplicates,
                        skipped = summary.skipped,
                        "crawl finished"
                    );
                    return Ok(summary);
                }

                CrawlState::Aborted(err) => {
                    error!(run_id = %summary.run_id, error = %err, "crawl aborted");
                    return Err(err);
                }
            };
        }
    }

    /// Ingest one batch; per-item failures are counted and skipped.
    async fn ingest_batch(
        &self,
        date: NaiveDate,
        candidates: &[RawCandidate],
    ) -> Result<BatchOutcome, sqlx::Error> {
        let mut outcome = BatchOutcome::default();

        for candidate in candidates {
            let name = normalize_name(&candidate.name);
            if name.is_empty() {
                outcome.skipped += 1;
                debug!("skipping candidate without a name");
                continue;
            }
            let Some(price) = parse_price(&candidate.price_text) else {
                outcome.skipped += 1;
                debug!(%name, raw = %candidate.price_text, "skipping unparseable price");
                continue;
            };

            let observation = PriceObservation::new(date, name, price);
            match self.repository.insert(&observation).await? {
                InsertOutcome::Inserted => {
                    outcome.inserted += 1;
                    info!(name = %observation.name, price = observation.price, "recorded");
                }
                InsertOutcome::DuplicateSkipped => {
                    outcome.duplicates += 1;
                    debug!(name = %observation.name, "duplicate identity, skipped");
                }
            }
        }

        Ok(outcome)
    }
}
