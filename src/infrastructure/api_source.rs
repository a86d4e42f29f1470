//! API-variant page source: GraphQL persisted queries with offset pagination.
//!
//! The storefront's backing API serves category listings through a
//! server-cached query: a GET carrying `operationName`, URL-encoded JSON
//! `variables` with a `from`/`limit` offset pair, and
//! `extensions.persistedQuery.sha256Hash` identifying the cached query.
//! An empty `items` array ends pagination; a non-empty `errors` field or
//! malformed JSON aborts the run.

use async_trait::async_trait;
use serde::Deserialize;
use serde_json::json;
use tracing::debug;
use url::Url;

use crate::application::crawler::{CrawlBatch, CrawlError, PageSource, RawCandidate};
use crate::infrastructure::config::{defaults, s_kaupat};
use crate::infrastructure::http_client::HttpClient;

/// API endpoint and query parameters.
#[derive(Debug, Clone, serde::Serialize, Deserialize)]
#[serde(default)]
pub struct ApiSourceConfig {
    pub endpoint: String,
    pub operation_name: String,
    pub persisted_query_hash: String,
    pub category_slug: String,
    /// Records requested per offset window.
    pub batch_limit: u32,
}

impl Default for ApiSourceConfig {
    fn default() -> Self {
        Self {
            endpoint: s_kaupat::GRAPHQL_ENDPOINT.to_string(),
            operation_name: s_kaupat::PRODUCTS_OPERATION.to_string(),
            persisted_query_hash: s_kaupat::PRODUCTS_QUERY_HASH.to_string(),
            category_slug: s_kaupat::BEER_CATEGORY_SLUG.to_string(),
            batch_limit: defaults::API_BATCH_LIMIT,
        }
    }
}

#[derive(Debug, Deserialize)]
struct ApiEnvelope {
    data: Option<ApiData>,
    #[serde(default)]
    errors: Vec<ApiErrorEntry>,
}

#[derive(Debug, Deserialize)]
struct ApiErrorEntry {
    message: String,
}

#[derive(Debug, Deserialize)]
struct ApiData {
    products: Option<ApiProductPage>,
}

#[derive(Debug, Deserialize)]
struct ApiProductPage {
    #[serde(default)]
    items: Vec<ApiProduct>,
}

#[derive(Debug, Deserialize)]
struct ApiProduct {
    name: String,
    price: Option<f64>,
}

/// Fetches catalogue batches from the GraphQL API.
pub struct GraphqlCatalogueSource {
    http: HttpClient,
    config: ApiSourceConfig,
}

impl GraphqlCatalogueSource {
    pub fn new(http: HttpClient, config: ApiSourceConfig) -> Self {
        Self { http, config }
    }

    /// Build the persisted-query GET URL for a 1-based page.
    fn page_url(&self, page: u32) -> Result<Url, CrawlError> {
        let from = (page - 1) * self.config.batch_limit;
        let variables = json!({
            "from": from,
            "limit": self.config.batch_limit,
            "slug": self.config.category_slug,
        })
        .to_string();
        let extensions = json!({
            "persistedQuery": {
                "version": 1,
                "sha256Hash": self.config.persisted_query_hash,
            }
        })
        .to_string();

        Url::parse_with_params(
            &self.config.endpoint,
            &[
                ("operationName", self.config.operation_name.as_str()),
                ("variables", variables.as_str()),
                ("extensions", extensions.as_str()),
            ],
        )
        .map_err(|e| CrawlError::Protocol {
            reason: format!("invalid API endpoint URL: {e}"),
        })
    }

    fn batch_from_envelope(&self, envelope: ApiEnvelope) -> Result<CrawlBatch, CrawlError> {
        if !envelope.errors.is_empty() {
            let reasons: Vec<String> =
                envelope.errors.into_iter().map(|e| e.message).collect();
            return Err(CrawlError::Protocol {
                reason: format!("GraphQL errors: {}", reasons.join("; ")),
            });
        }

        let items = envelope
            .data
            .and_then(|data| data.products)
            .map(|page| page.items)
            .unwrap_or_default();

        let has_more = items.len() as u32 == self.config.batch_limit;
        let candidates = items
            .into_iter()
            .map(|item| RawCandidate {
                name: item.name,
                price_text: item.price.map(|p| p.to_string()).unwrap_or_default(),
            })
            .collect();

        Ok(CrawlBatch {
            candidates,
            has_more,
        })
    }
}

#[async_trait]
impl PageSource for GraphqlCatalogueSource {
    fn describe(&self) -> String {
        format!(
            "{} ({})",
            self.config.endpoint, self.config.operation_name
        )
    }

    async fn fetch_batch(&self, page: u32) -> Result<CrawlBatch, CrawlError> {
        let url = self.page_url(page)?;
        let body = self.http.get_text(url.as_str()).await?;

        let envelope: ApiEnvelope =
            serde_json::from_str(&body).map_err(|e| CrawlError::Protocol {
                reason: format!("malformed GraphQL response: {e}"),
            })?;

        let batch = self.batch_from_envelope(envelope)?;
        debug!(page, candidates = batch.candidates.len(), "API batch decoded");
        Ok(batch)
    }
}
