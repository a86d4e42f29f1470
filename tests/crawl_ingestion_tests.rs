//! End-to-end ingestion tests: pagination termination, abort behavior, and
//! idempotent re-ingestion against a real on-disk store.

use std::sync::atomic::{AtomicU32, Ordering};

use async_trait::async_trait;
use chrono::NaiveDate;
use tempfile::TempDir;

use beer_price_tracker::application::crawler::{
    CrawlBatch, CrawlController, CrawlError, PageSource, RawCandidate,
};
use beer_price_tracker::infrastructure::config::CrawlConfig;
use beer_price_tracker::infrastructure::database_connection::DatabaseConnection;
use beer_price_tracker::infrastructure::html_extractor::ExtractionError;
use beer_price_tracker::infrastructure::observation_repository::ObservationRepository;

/// Replays a fixed batch script; pages beyond the script are empty.
struct ScriptedSource {
    batches: Vec<CrawlBatch>,
    fetches: AtomicU32,
    stale_rule: bool,
}

impl ScriptedSource {
    fn new(batches: Vec<CrawlBatch>) -> Self {
        Self {
            batches,
            fetches: AtomicU32::new(0),
            stale_rule: false,
        }
    }

    fn markup_like(batches: Vec<CrawlBatch>) -> Self {
        Self {
            stale_rule: true,
            ..Self::new(batches)
        }
    }

    fn fetch_count(&self) -> u32 {
        self.fetches.load(Ordering::SeqCst)
    }
}

#[async_trait]
impl PageSource for ScriptedSource {
    fn describe(&self) -> String {
        "scripted source".to_string()
    }

    async fn fetch_batch(&self, page: u32) -> Result<CrawlBatch, CrawlError> {
        self.fetches.fetch_add(1, Ordering::SeqCst);
        Ok(self
            .batches
            .get((page - 1) as usize)
            .cloned()
            .unwrap_or_default())
    }

    fn stale_page_ends_crawl(&self) -> bool {
        self.stale_rule
    }
}

/// Always fails with structural drift.
struct DriftingSource;

#[async_trait]
impl PageSource for DriftingSource {
    fn describe(&self) -> String {
        "drifting source".to_string()
    }

    async fn fetch_batch(&self, _page: u32) -> Result<CrawlBatch, CrawlError> {
        Err(ExtractionError::structural_drift(vec![
            "div[data-testid='product-card']".to_string(),
        ])
        .into())
    }
}

fn candidate(name: &str, price_text: &str) -> RawCandidate {
    RawCandidate {
        name: name.to_string(),
        price_text: price_text.to_string(),
    }
}

fn batch(candidates: Vec<RawCandidate>, has_more: bool) -> CrawlBatch {
    CrawlBatch {
        candidates,
        has_more,
    }
}

fn test_config() -> CrawlConfig {
    CrawlConfig {
        max_pages: 25,
        request_delay_ms: 0,
    }
}

fn day(d: u32) -> NaiveDate {
    NaiveDate::from_ymd_opt(2026, 1, d).unwrap()
}

async fn test_repository() -> (TempDir, ObservationRepository) {
    let dir = TempDir::new().unwrap();
    let database_url = format!("sqlite:{}", dir.path().join("test.db").display());
    let db = DatabaseConnection::new(&database_url).await.unwrap();
    db.migrate().await.unwrap();
    (dir, ObservationRepository::new(db.pool().clone()))
}

#[tokio::test]
async fn finite_batches_exhaust_in_exactly_len_fetches() {
    let (_dir, repository) = test_repository().await;
    let batches = vec![
        batch(vec![candidate("Karhu III", "3,49 €")], true),
        batch(vec![candidate("Sandels", "2,19 €")], true),
        batch(vec![], false),
    ];
    let controller = CrawlController::new(
        ScriptedSource::new(batches),
        repository.clone(),
        &test_config(),
    );

    let summary = controller.run(day(1)).await.unwrap();
    assert_eq!(summary.pages_fetched, 3);
    assert_eq!(summary.inserted, 2);
    assert_eq!(repository.count().await.unwrap(), 2);
}

#[tokio::test]
async fn page_ceiling_forces_exhaustion() {
    let (_dir, repository) = test_repository().await;
    // Every page advertises more; only the ceiling can stop the run.
    let batches: Vec<CrawlBatch> = (0..100)
        .map(|i| batch(vec![candidate(&format!("Beer {i}"), "1,00 €")], true))
        .collect();
    let source = ScriptedSource::new(batches);
    let config = CrawlConfig {
        max_pages: 3,
        request_delay_ms: 0,
    };
    let controller = CrawlController::new(source, repository.clone(), &config);

    let summary = controller.run(day(1)).await.unwrap();
    assert_eq!(summary.pages_fetched, 3);
    assert_eq!(summary.inserted, 3);
}

#[tokio::test]
async fn stale_page_ends_markup_crawl() {
    let (_dir, repository) = test_repository().await;
    // Pages 2+ repeat page 1's content and keep advertising more, the way
    // the storefront re-serves its final page for out-of-range numbers.
    let repeated = batch(vec![candidate("Karhu III", "3,49 €")], true);
    let batches = vec![repeated.clone(), repeated.clone(), repeated];
    let controller = CrawlController::new(
        ScriptedSource::markup_like(batches),
        repository.clone(),
        &test_config(),
    );

    let summary = controller.run(day(1)).await.unwrap();
    assert_eq!(summary.pages_fetched, 2);
    assert_eq!(summary.inserted, 1);
    assert_eq!(summary.duplicates, 1);
}

#[tokio::test]
async fn offset_source_rides_through_duplicate_pages() {
    let (_dir, repository) = test_repository().await;
    // Without the stale-page rule the same script walks every page and
    // terminates on the empty one.
    let repeated = batch(vec![candidate("Karhu III", "3,49 €")], true);
    let batches = vec![repeated.clone(), repeated, batch(vec![], false)];
    let controller = CrawlController::new(
        ScriptedSource::new(batches),
        repository.clone(),
        &test_config(),
    );

    let summary = controller.run(day(1)).await.unwrap();
    assert_eq!(summary.pages_fetched, 3);
    assert_eq!(summary.inserted, 1);
    assert_eq!(summary.duplicates, 1);
}

#[tokio::test]
async fn structural_drift_aborts_the_run() {
    let (_dir, repository) = test_repository().await;
    let controller = CrawlController::new(DriftingSource, repository.clone(), &test_config());

    let err = controller.run(day(1)).await.unwrap_err();
    assert!(matches!(err, CrawlError::StructuralDrift(_)));
    assert_eq!(repository.count().await.unwrap(), 0);
}

#[tokio::test]
async fn abort_keeps_previously_committed_pages() {
    let (_dir, repository) = test_repository().await;

    struct FailsOnSecondPage;

    #[async_trait]
    impl PageSource for FailsOnSecondPage {
        fn describe(&self) -> String {
            "fails on second page".to_string()
        }

        async fn fetch_batch(&self, page: u32) -> Result<CrawlBatch, CrawlError> {
            if page == 1 {
                Ok(CrawlBatch {
                    candidates: vec![RawCandidate {
                        name: "Karhu III".to_string(),
                        price_text: "3,49 €".to_string(),
                    }],
                    has_more: true,
                })
            } else {
                Err(CrawlError::Protocol {
                    reason: "GraphQL errors: PersistedQueryNotFound".to_string(),
                })
            }
        }
    }

    let controller = CrawlController::new(FailsOnSecondPage, repository.clone(), &test_config());
    let err = controller.run(day(1)).await.unwrap_err();

    assert!(matches!(err, CrawlError::Protocol { .. }));
    // Page 1 was committed before the abort; the partial snapshot stays.
    assert_eq!(repository.count().await.unwrap(), 1);
}

#[tokio::test]
async fn malformed_candidates_are_skipped_not_fatal() {
    let (_dir, repository) = test_repository().await;
    let batches = vec![batch(
        vec![
            candidate("Lager A", "3,49 €"),
            candidate("", "1,00 €"),
            candidate("Lager B", "n/a"),
        ],
        false,
    )];
    let controller = CrawlController::new(
        ScriptedSource::new(batches),
        repository.clone(),
        &test_config(),
    );

    let summary = controller.run(day(1)).await.unwrap();
    assert_eq!(summary.inserted, 1);
    assert_eq!(summary.skipped, 2);

    let stored = repository.query_all().await.unwrap();
    assert_eq!(stored.len(), 1);
    assert_eq!(stored[0].name, "Lager A");
    assert_eq!(stored[0].price, 3.49);
}

#[tokio::test]
async fn same_day_rerun_inserts_nothing() {
    let (_dir, repository) = test_repository().await;
    let script = || {
        ScriptedSource::new(vec![batch(
            vec![
                candidate("Lager A", "3,49 €"),
                candidate("", "1,00 €"),
                candidate("Lager B", "n/a"),
            ],
            false,
        )])
    };

    let first = CrawlController::new(script(), repository.clone(), &test_config())
        .run(day(1))
        .await
        .unwrap();
    assert_eq!(first.inserted, 1);

    let second = CrawlController::new(script(), repository.clone(), &test_config())
        .run(day(1))
        .await
        .unwrap();
    assert_eq!(second.inserted, 0);
    assert_eq!(second.duplicates, 1);
    assert_eq!(repository.count().await.unwrap(), 1);
}

#[tokio::test]
async fn next_day_run_records_a_new_snapshot() {
    let (_dir, repository) = test_repository().await;
    let script = || {
        ScriptedSource::new(vec![batch(vec![candidate("Lager A", "3,49 €")], false)])
    };

    CrawlController::new(script(), repository.clone(), &test_config())
        .run(day(1))
        .await
        .unwrap();
    let second = CrawlController::new(script(), repository.clone(), &test_config())
        .run(day(2))
        .await
        .unwrap();

    assert_eq!(second.inserted, 1);
    assert_eq!(repository.count().await.unwrap(), 2);
}

#[tokio::test]
async fn fetch_count_matches_pages_fetched() {
    let (_dir, repository) = test_repository().await;
    let source = ScriptedSource::new(vec![
        batch(vec![candidate("Karhu III", "3,49 €")], true),
        batch(vec![], false),
    ]);
    // The controller owns the source, so count through a shared reference.
    let source = std::sync::Arc::new(source);

    struct Shared(std::sync::Arc<ScriptedSource>);

    #[async_trait]
    impl PageSource for Shared {
        fn describe(&self) -> String {
            self.0.describe()
        }

        async fn fetch_batch(&self, page: u32) -> Result<CrawlBatch, CrawlError> {
            self.0.fetch_batch(page).await
        }
    }

    let controller =
        CrawlController::new(Shared(source.clone()), repository, &test_config());
    let summary = controller.run(day(1)).await.unwrap();

    assert_eq!(source.fetch_count(), 2);
    assert_eq!(summary.pages_fetched, 2);
}
