//! Process entry point: `beer-price-tracker [crawl|report] [config-path]`.

use std::path::Path;

use anyhow::{bail, Context, Result};
use chrono::Local;
use tracing::info;

use beer_price_tracker::application::crawler::{CrawlController, CrawlSummary, PageSource};
use beer_price_tracker::application::report;
use beer_price_tracker::infrastructure::api_source::GraphqlCatalogueSource;
use beer_price_tracker::infrastructure::config::{AppConfig, SourceKind, DEFAULT_CONFIG_PATH};
use beer_price_tracker::infrastructure::database_connection::DatabaseConnection;
use beer_price_tracker::infrastructure::html_extractor::HtmlExtractor;
use beer_price_tracker::infrastructure::http_client::HttpClient;
use beer_price_tracker::infrastructure::logging::init_logging;
use beer_price_tracker::infrastructure::markup_source::MarkupCatalogueSource;
use beer_price_tracker::infrastructure::observation_repository::ObservationRepository;

#[tokio::main]
async fn main() -> Result<()> {
    let mode = std::env::args().nth(1).unwrap_or_else(|| "crawl".to_string());
    let config_path = std::env::args()
        .nth(2)
        .unwrap_or_else(|| DEFAULT_CONFIG_PATH.to_string());

    let config = AppConfig::load_or_default(Path::new(&config_path)).await?;
    let _log_guard = init_logging(&config.logging)?;
    info!(config = %config_path, "configuration loaded");

    match mode.as_str() {
        "crawl" => run_crawl(&config).await,
        "report" => run_report(&config).await,
        other => bail!("unknown mode '{other}', expected 'crawl' or 'report'"),
    }
}

async fn run_crawl(config: &AppConfig) -> Result<()> {
    let repository = open_store(config).await?;
    let http = HttpClient::new(config.http.clone())?;
    let date = Local::now().date_naive();

    let summary = match config.source.kind {
        SourceKind::Markup => {
            let extractor = HtmlExtractor::with_config(&config.source.selectors)?;
            let source = MarkupCatalogueSource::new(
                http,
                extractor,
                config.source.catalogue_url.clone(),
            );
            crawl(source, repository, config, date).await?
        }
        SourceKind::Api => {
            let source = GraphqlCatalogueSource::new(http, config.source.api.clone());
            crawl(source, repository, config, date).await?
        }
    };

    info!(
        inserted = summary.inserted,
        duplicates = summary.duplicates,
        skipped = summary.skipped,
        pages = summary.pages_fetched,
        "run complete"
    );
    Ok(())
}

async fn crawl<S: PageSource>(
    source: S,
    repository: ObservationRepository,
    config: &AppConfig,
    date: chrono::NaiveDate,
) -> Result<CrawlSummary> {
    CrawlController::new(source, repository, &config.crawl)
        .run(date)
        .await
        .context("crawl run failed")
}

async fn run_report(config: &AppConfig) -> Result<()> {
    let repository = open_store(config).await?;
    let observations = repository
        .query_all()
        .await
        .context("failed to read the snapshot store")?;

    let matrix = report::build_matrix(&observations, config.report.window_size);
    let table = report::to_table(&matrix, true);
    println!("{}", report::render_text(&table));
    Ok(())
}

async fn open_store(config: &AppConfig) -> Result<ObservationRepository> {
    let db = DatabaseConnection::new(&config.database.database_url)
        .await
        .context("failed to open the snapshot store")?;
    db.migrate().await.context("schema creation failed")?;
    Ok(ObservationRepository::new(db.pool().clone()))
}
