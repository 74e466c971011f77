//! HTTP retriever - `GET <endpoint>?<query>` against a content API.

use std::time::Duration;

use async_trait::async_trait;
use reqwest::Client;
use tracing::{debug, warn};
use url::Url;

use crate::error::RetrieveError;
use crate::item::{RawResponse, ResultSet};
use crate::params::QueryParams;
use crate::retriever::Retriever;

/// Longest response body kept in a status error.
const MAX_ERROR_BODY: usize = 512;

/// Configuration for retry with exponential backoff.
#[derive(Debug, Clone, PartialEq)]
pub struct RetryConfig {
    /// Maximum number of attempts, including the first.
    pub max_attempts: u32,
    /// Initial delay between retries in milliseconds.
    pub initial_delay_ms: u64,
    /// Maximum delay between retries in milliseconds.
    pub max_delay_ms: u64,
    /// Multiplier for exponential backoff.
    pub multiplier: f64,
}

impl Default for RetryConfig {
    fn default() -> Self {
        Self {
            max_attempts: 3,
            initial_delay_ms: 100,
            max_delay_ms: 2_000,
            multiplier: 2.0,
        }
    }
}

impl RetryConfig {
    /// A config that never retries.
    #[must_use]
    pub fn none() -> Self {
        Self {
            max_attempts: 1,
            ..Self::default()
        }
    }

    /// Delay before retrying after attempt `attempt` (0-indexed).
    #[must_use]
    #[allow(
        clippy::cast_precision_loss,
        clippy::cast_possible_truncation,
        clippy::cast_sign_loss,
        clippy::cast_possible_wrap
    )]
    pub fn delay_for_attempt(&self, attempt: u32) -> u64 {
        let base = self.initial_delay_ms as f64 * self.multiplier.powi(attempt as i32);
        base.min(self.max_delay_ms as f64).max(0.0) as u64
    }
}

/// Settings for [`HttpRetriever`].
#[derive(Debug, Clone)]
pub struct HttpRetrieverConfig {
    /// Content API endpoint; the query string is appended to it.
    pub endpoint: String,
    /// User agent sent with every request.
    pub user_agent: String,
    /// Per-request timeout.
    pub timeout: Duration,
    /// Retry policy for transient failures.
    pub retry: RetryConfig,
}

impl HttpRetrieverConfig {
    /// Defaults for an endpoint.
    #[must_use]
    pub fn new(endpoint: impl Into<String>) -> Self {
        Self {
            endpoint: endpoint.into(),
            user_agent: format!("pagecraft/{}", env!("CARGO_PKG_VERSION")),
            timeout: Duration::from_secs(10),
            retry: RetryConfig::default(),
        }
    }

    /// Override the retry policy.
    #[must_use]
    pub fn with_retry(mut self, retry: RetryConfig) -> Self {
        self.retry = retry;
        self
    }

    /// Override the per-request timeout.
    #[must_use]
    pub fn with_timeout(mut self, timeout: Duration) -> Self {
        self.timeout = timeout;
        self
    }
}

/// Retriever backed by a JSON content API.
#[derive(Debug, Clone)]
pub struct HttpRetriever {
    http: Client,
    endpoint: Url,
    retry: RetryConfig,
}

impl HttpRetriever {
    /// Build a retriever.
    ///
    /// # Errors
    ///
    /// Returns [`RetrieveError::InvalidUrl`] if the endpoint is malformed, or
    /// [`RetrieveError::Http`] if the HTTP client fails to build.
    pub fn new(config: HttpRetrieverConfig) -> Result<Self, RetrieveError> {
        let endpoint =
            Url::parse(&config.endpoint).map_err(|e| RetrieveError::InvalidUrl(e.to_string()))?;
        let http = Client::builder()
            .user_agent(config.user_agent)
            .timeout(config.timeout)
            .build()?;
        Ok(Self {
            http,
            endpoint,
            retry: config.retry,
        })
    }

    /// Full request URL for a query.
    #[must_use]
    pub fn url_for(&self, params: &QueryParams) -> Url {
        let mut url = self.endpoint.clone();
        url.query_pairs_mut().extend_pairs(params.to_pairs());
        url
    }

    async fn attempt(&self, url: &Url) -> Result<ResultSet, RetrieveError> {
        let response = self.http.get(url.clone()).send().await?;
        let status = response.status();
        if !status.is_success() {
            let mut body = response.text().await.unwrap_or_default();
            if body.len() > MAX_ERROR_BODY {
                let mut cut = MAX_ERROR_BODY;
                while !body.is_char_boundary(cut) {
                    cut -= 1;
                }
                body.truncate(cut);
            }
            return Err(RetrieveError::Status {
                status: status.as_u16(),
                body,
            });
        }
        let bytes = response.bytes().await?;
        let raw: RawResponse = serde_json::from_slice(&bytes)?;
        Ok(raw.into())
    }
}

#[async_trait]
impl Retriever for HttpRetriever {
    async fn retrieve(&self, params: &QueryParams) -> Result<ResultSet, RetrieveError> {
        let url = self.url_for(params);
        let max_attempts = self.retry.max_attempts.max(1);
        let mut attempt = 0;
        loop {
            match self.attempt(&url).await {
                Ok(set) => {
                    debug!(url = %url, items = set.len(), "Retrieved");
                    return Ok(set);
                }
                Err(error) if error.is_retryable() && attempt + 1 < max_attempts => {
                    let delay = self.retry.delay_for_attempt(attempt);
                    warn!(
                        "Retrieval {} failed (attempt {}/{}), retrying in {}ms: {}",
                        url,
                        attempt + 1,
                        max_attempts,
                        delay,
                        error
                    );
                    tokio::time::sleep(Duration::from_millis(delay)).await;
                    attempt += 1;
                }
                Err(error) => return Err(error),
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use pagecraft_core::DataSource;
    use serde_json::json;
    use wiremock::matchers::{method, path, query_param};
    use wiremock::{Mock, MockServer, ResponseTemplate};

    use crate::dates::ResolvedRange;

    fn fast_retry(max_attempts: u32) -> RetryConfig {
        RetryConfig {
            max_attempts,
            initial_delay_ms: 1,
            max_delay_ms: 5,
            multiplier: 2.0,
        }
    }

    fn retriever(server: &MockServer, retry: RetryConfig) -> HttpRetriever {
        HttpRetriever::new(
            HttpRetrieverConfig::new(format!("{}/api/articles", server.uri())).with_retry(retry),
        )
        .expect("retriever")
    }

    fn latest() -> QueryParams {
        QueryParams::new(&DataSource::latest(2), ResolvedRange::default())
    }

    #[test]
    fn test_retry_delays_grow_and_cap() {
        let retry = RetryConfig::default();
        assert_eq!(retry.delay_for_attempt(0), 100);
        assert_eq!(retry.delay_for_attempt(1), 200);
        assert_eq!(retry.delay_for_attempt(10), 2_000);
    }

    #[test]
    fn test_invalid_endpoint_rejected() {
        let result = HttpRetriever::new(HttpRetrieverConfig::new("not a url"));
        assert!(matches!(result, Err(RetrieveError::InvalidUrl(_))));
    }

    #[test]
    fn test_url_carries_query_string() {
        let retriever = HttpRetriever::new(HttpRetrieverConfig::new("https://cms.test/api"))
            .expect("retriever");
        let url = retriever.url_for(&latest());
        assert_eq!(
            url.as_str(),
            "https://cms.test/api?mode=latest&limit=2&offset=0&sortBy=publishedAt&sortOrder=desc"
        );
    }

    #[tokio::test]
    async fn test_retrieve_normalizes_data_alias() {
        let server = MockServer::start().await;
        Mock::given(method("GET"))
            .and(path("/api/articles"))
            .and(query_param("mode", "latest"))
            .and(query_param("limit", "2"))
            .respond_with(ResponseTemplate::new(200).set_body_json(json!({
                "data": [{"id": "a", "title": "A"}, {"id": "b", "title": "B"}],
                "total": 10
            })))
            .expect(1)
            .mount(&server)
            .await;

        let set = retriever(&server, fast_retry(1))
            .retrieve(&latest())
            .await
            .expect("retrieve");
        assert_eq!(set.len(), 2);
        assert_eq!(set.total, 10);
        assert!(!set.has_more);
    }

    #[tokio::test]
    async fn test_server_errors_are_retried() {
        let server = MockServer::start().await;
        Mock::given(method("GET"))
            .and(path("/api/articles"))
            .respond_with(ResponseTemplate::new(503))
            .up_to_n_times(2)
            .mount(&server)
            .await;
        Mock::given(method("GET"))
            .and(path("/api/articles"))
            .respond_with(ResponseTemplate::new(200).set_body_json(json!({"items": []})))
            .mount(&server)
            .await;

        let set = retriever(&server, fast_retry(3))
            .retrieve(&latest())
            .await
            .expect("retrieve after retries");
        assert!(set.is_empty());
    }

    #[tokio::test]
    async fn test_client_errors_are_not_retried() {
        let server = MockServer::start().await;
        Mock::given(method("GET"))
            .and(path("/api/articles"))
            .respond_with(ResponseTemplate::new(400).set_body_string("bad mode"))
            .expect(1)
            .mount(&server)
            .await;

        let err = retriever(&server, fast_retry(3))
            .retrieve(&latest())
            .await
            .expect_err("400 is final");
        assert!(matches!(err, RetrieveError::Status { status: 400, ref body } if body == "bad mode"));
    }

    #[tokio::test]
    async fn test_malformed_payload_is_json_error() {
        let server = MockServer::start().await;
        Mock::given(method("GET"))
            .and(path("/api/articles"))
            .respond_with(ResponseTemplate::new(200).set_body_string("<html>"))
            .mount(&server)
            .await;

        let err = retriever(&server, fast_retry(2))
            .retrieve(&latest())
            .await
            .expect_err("not json");
        assert!(matches!(err, RetrieveError::Json(_)));
    }
}
