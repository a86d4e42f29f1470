//! HTTP client for polite storefront crawling.
//!
//! Thin wrapper over reqwest with the default header set the storefront
//! expects, a fixed per-request timeout, and typed errors so the crawl
//! controller can tell transport failures from upstream drift.

use std::time::Duration;

use reqwest::header::{HeaderMap, HeaderValue, ACCEPT, ACCEPT_LANGUAGE, REFERER, USER_AGENT};
use reqwest::Client;
use serde::{Deserialize, Serialize};
use thiserror::Error;
use tracing::debug;

use crate::infrastructure::config::defaults;

/// Transport-level failure. Always fatal for the current crawl run.
#[derive(Error, Debug)]
pub enum HttpError {
    #[error("invalid client configuration: {reason}")]
    Configuration { reason: String },

    #[error("request to {url} failed: {source}")]
    Request {
        url: String,
        #[source]
        source: reqwest::Error,
    },

    #[error("{url} returned HTTP {status}")]
    Status { url: String, status: u16 },

    #[error("failed to read response body from {url}: {source}")]
    Body {
        url: String,
        #[source]
        source: reqwest::Error,
    },
}

/// HTTP client configuration.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct HttpClientConfig {
    pub user_agent: String,
    pub accept: String,
    pub accept_language: String,
    pub referer: String,
    pub timeout_seconds: u64,
}

impl Default for HttpClientConfig {
    fn default() -> Self {
        Self {
            user_agent: "Mozilla/5.0 (Windows NT 10.0; Win64; x64) AppleWebKit/537.36 \
                         (KHTML, like Gecko) Chrome/131.0.0.0 Safari/537.36"
                .to_string(),
            accept: "text/html,application/xhtml+xml,application/xml;q=0.9,*/*;q=0.8".to_string(),
            accept_language: "fi-FI,fi;q=0.9,en;q=0.8".to_string(),
            referer: "https://www.s-kaupat.fi/".to_string(),
            timeout_seconds: defaults::REQUEST_TIMEOUT_SECONDS,
        }
    }
}

/// Shared HTTP client for all page fetches of a run.
#[derive(Debug)]
pub struct HttpClient {
    client: Client,
}

impl HttpClient {
    pub fn new(config: HttpClientConfig) -> Result<Self, HttpError> {
        let mut headers = HeaderMap::new();
        for (key, value) in [
            (USER_AGENT, &config.user_agent),
            (ACCEPT, &config.accept),
            (ACCEPT_LANGUAGE, &config.accept_language),
            (REFERER, &config.referer),
        ] {
            let value = HeaderValue::from_str(value).map_err(|e| HttpError::Configuration {
                reason: format!("invalid {key} header: {e}"),
            })?;
            headers.insert(key, value);
        }

        let client = Client::builder()
            .timeout(Duration::from_secs(config.timeout_seconds))
            .default_headers(headers)
            .redirect(reqwest::redirect::Policy::limited(10))
            .build()
            .map_err(|e| HttpError::Configuration {
                reason: e.to_string(),
            })?;

        Ok(Self { client })
    }

    /// Fetch a URL and return its body as text.
    ///
    /// A non-success status is an error: the controller treats it as fatal
    /// for the run rather than retrying.
    pub async fn get_text(&self, url: &str) -> Result<String, HttpError> {
        debug!(%url, "fetching");

        let response = self
            .client
            .get(url)
            .send()
            .await
            .map_err(|source| HttpError::Request {
                url: url.to_string(),
                source,
            })?;

        let status = response.status();
        if !status.is_success() {
            return Err(HttpError::Status {
                url: url.to_string(),
                status: status.as_u16(),
            });
        }

        let body = response.text().await.map_err(|source| HttpError::Body {
            url: url.to_string(),
            source,
        })?;

        debug!(%url, bytes = body.len(), "fetched");
        Ok(body)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn client_builds_with_default_config() {
        assert!(HttpClient::new(HttpClientConfig::default()).is_ok());
    }

    #[test]
    fn invalid_header_value_is_a_configuration_error() {
        let config = HttpClientConfig {
            user_agent: "bad\nagent".to_string(),
            ..Default::default()
        };
        let err = HttpClient::new(config).unwrap_err();
        assert!(matches!(err, HttpError::Configuration { .. }));
    }
}
