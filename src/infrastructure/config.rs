//! Configuration infrastructure.
//!
//! Process-level configuration loaded from a JSON file next to the binary,
//! with defaults that match the live storefront. Everything an operator may
//! need to touch after an upstream change (URLs, selector chains, delays)
//! lives here rather than in code.

use std::path::Path;

use anyhow::{Context, Result};
use serde::{Deserialize, Serialize};
use tokio::fs;

use crate::infrastructure::api_source::ApiSourceConfig;
use crate::infrastructure::html_extractor::SelectorConfig;
use crate::infrastructure::http_client::HttpClientConfig;
use crate::infrastructure::logging::LoggingConfig;

/// Default configuration file path, relative to the working directory.
pub const DEFAULT_CONFIG_PATH: &str = "beer-price-tracker.json";

/// Complete application configuration.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
#[serde(default)]
pub struct AppConfig {
    pub source: SourceConfig,
    pub crawl: CrawlConfig,
    pub database: DatabaseConfig,
    pub report: ReportConfig,
    pub http: HttpClientConfig,
    pub logging: LoggingConfig,
}

/// Which upstream variant to crawl.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum SourceKind {
    /// Paged HTML catalogue.
    Markup,
    /// GraphQL persisted-query API.
    Api,
}

/// Upstream source configuration.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct SourceConfig {
    pub kind: SourceKind,
    /// Catalogue URL for the markup variant; page 2 onward appends `?page=N`.
    pub catalogue_url: String,
    /// Extraction strategy chains for the markup variant.
    pub selectors: SelectorConfig,
    /// Endpoint and query parameters for the API variant.
    pub api: ApiSourceConfig,
}

impl Default for SourceConfig {
    fn default() -> Self {
        Self {
            kind: SourceKind::Markup,
            catalogue_url: s_kaupat::BEER_CATEGORY_URL.to_string(),
            selectors: SelectorConfig::default(),
            api: ApiSourceConfig::default(),
        }
    }
}

/// Crawl loop tunables.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct CrawlConfig {
    /// Hard ceiling on pages fetched in one run.
    pub max_pages: u32,
    /// Mandatory delay between page fetches, in milliseconds.
    pub request_delay_ms: u64,
}

impl Default for CrawlConfig {
    fn default() -> Self {
        Self {
            max_pages: defaults::MAX_PAGES,
            request_delay_ms: defaults::REQUEST_DELAY_MS,
        }
    }
}

/// Snapshot store location.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct DatabaseConfig {
    pub database_url: String,
}

impl Default for DatabaseConfig {
    fn default() -> Self {
        Self {
            database_url: defaults::DATABASE_URL.to_string(),
        }
    }
}

/// Change report tunables.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct ReportConfig {
    /// How many of the most recent snapshot dates the report covers.
    pub window_size: usize,
}

impl Default for ReportConfig {
    fn default() -> Self {
        Self {
            window_size: defaults::REPORT_WINDOW,
        }
    }
}

impl AppConfig {
    /// Load configuration from `path`, falling back to defaults when the
    /// file does not exist.
    pub async fn load_or_default(path: &Path) -> Result<Self> {
        match fs::read_to_string(path).await {
            Ok(contents) => serde_json::from_str(&contents)
                .with_context(|| format!("invalid configuration in {}", path.display())),
            Err(err) if err.kind() == std::io::ErrorKind::NotFound => Ok(Self::default()),
            Err(err) => {
                Err(err).with_context(|| format!("failed to read {}", path.display()))
            }
        }
    }

    /// Write the configuration as pretty JSON, creating parent directories.
    pub async fn save(&self, path: &Path) -> Result<()> {
        if let Some(parent) = path.parent() {
            if !parent.as_os_str().is_empty() {
                fs::create_dir_all(parent).await?;
            }
        }
        let contents = serde_json::to_string_pretty(self)?;
        fs::write(path, contents)
            .await
            .with_context(|| format!("failed to write {}", path.display()))
    }
}

/// S-kaupat storefront URLs and query constants.
pub mod s_kaupat {
    /// Storefront base URL.
    pub const BASE_URL: &str = "https://www.s-kaupat.fi";

    /// Beer category listing, the markup crawl entry point.
    pub const BEER_CATEGORY_URL: &str =
        "https://www.s-kaupat.fi/tuotteet/alkoholi-ja-virvoitusjuomat/oluet";

    /// GraphQL endpoint behind the storefront.
    pub const GRAPHQL_ENDPOINT: &str = "https://cfapi.voikukka.fi/graphql";

    /// Server-cached query for category product listings.
    pub const PRODUCTS_OPERATION: &str = "RemoteFilteredProducts";

    /// Persisted-query hash identifying the cached query version.
    pub const PRODUCTS_QUERY_HASH: &str =
        "3f2cb6b2ec3b4e8f06e4f367a40c22ab0e63e0b9d1c8e1b76b0dbc839dbc134a";

    /// Category slug for the beer listing.
    pub const BEER_CATEGORY_SLUG: &str = "oluet";
}

/// Default tunables.
pub mod defaults {
    /// Safety ceiling on pages fetched in one run.
    pub const MAX_PAGES: u32 = 25;

    /// Delay between page fetches in milliseconds. The storefront blocks
    /// impatient crawlers; keep this above 3 seconds.
    pub const REQUEST_DELAY_MS: u64 = 3100;

    /// Per-request network timeout in seconds.
    pub const REQUEST_TIMEOUT_SECONDS: u64 = 12;

    /// Offset window size for the API variant.
    pub const API_BATCH_LIMIT: u32 = 24;

    /// Report window: how many recent snapshot dates to compare.
    pub const REPORT_WINDOW: usize = 4;

    /// Snapshot store location, relative to the working directory.
    pub const DATABASE_URL: &str = "sqlite:beerprices.db";
}

#[cfg(test)]
mod tests {
    use super::*;
    use tempfile::tempdir;

    #[tokio::test]
    async fn missing_file_yields_defaults() {
        let dir = tempdir().unwrap();
        let path = dir.path().join("absent.json");
        let config = AppConfig::load_or_default(&path).await.unwrap();
        assert_eq!(config.crawl.max_pages, defaults::MAX_PAGES);
        assert_eq!(config.source.kind, SourceKind::Markup);
    }

    #[tokio::test]
    async fn save_and_load_round_trip() {
        let dir = tempdir().unwrap();
        let path = dir.path().join("config.json");

        let mut config = AppConfig::default();
        config.crawl.max_pages = 3;
        config.source.kind = SourceKind::Api;
        config.save(&path).await.unwrap();

        let loaded = AppConfig::load_or_default(&path).await.unwrap();
        assert_eq!(loaded.crawl.max_pages, 3);
        assert_eq!(loaded.source.kind, SourceKind::Api);
    }

    #[tokio::test]
    async fn invalid_json_is_an_error() {
        let dir = tempdir().unwrap();
        let path = dir.path().join("config.json");
        tokio::fs::write(&path, "{not json").await.unwrap();
        assert!(AppConfig::load_or_default(&path).await.is_err());
    }

    #[test]
    fn partial_config_fills_in_defaults() {
        let config: AppConfig =
            serde_json::from_str(r#"{"crawl": {"max_pages": 2}}"#).unwrap();
        assert_eq!(config.crawl.max_pages, 2);
        assert_eq!(config.crawl.request_delay_ms, defaults::REQUEST_DELAY_MS);
        assert_eq!(config.report.window_size, defaults::REPORT_WINDOW);
    }
}
