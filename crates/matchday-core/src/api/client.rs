//! HTTP client for the club backend.
//!
//! The cache treats the backend as an opaque source of JSON, so the client
//! only knows how to GET a path and hand back a `serde_json::Value`.

use std::time::Duration;

use anyhow::{Context, Result};
use reqwest::{header, Client};
use serde_json::Value;
use tracing::{debug, warn};

use super::ApiError;
use crate::error::FetchError;
use crate::resources::Resource;
use crate::swr::{fetcher, FetchFn};

// ============================================================================
// Constants
// ============================================================================

/// HTTP request timeout in seconds.
/// Long enough for a slow mobile connection, short enough that the UI falls
/// back to cached data quickly.
const REQUEST_TIMEOUT_SECS: u64 = 20;

/// Maximum number of retries for rate-limited (429) requests.
const MAX_RATE_LIMIT_RETRIES: u32 = 3;

/// Initial backoff delay for rate limiting, doubled on each retry.
const INITIAL_BACKOFF: Duration = Duration::from_millis(1000);

/// Client for the club REST API.
/// Clone is cheap - reqwest::Client shares its connection pool.
#[derive(Clone)]
pub struct ApiClient {
    client: Client,
    base_url: String,
    api_key: Option<String>,
    initial_backoff: Duration,
}

impl ApiClient {
    pub fn new(base_url: impl Into<String>) -> Result<Self> {
        let client = Client::builder()
            .timeout(Duration::from_secs(REQUEST_TIMEOUT_SECS))
            .build()
            .context("Failed to build HTTP client")?;

        Ok(Self {
            client,
            base_url: base_url.into().trim_end_matches('/').to_string(),
            api_key: None,
            initial_backoff: INITIAL_BACKOFF,
        })
    }

    /// Send `X-Api-Key` with every request
    pub fn with_api_key(mut self, key: impl Into<String>) -> Self {
        self.api_key = Some(key.into());
        self
    }

    pub fn with_retry_backoff(mut self, initial: Duration) -> Self {
        self.initial_backoff = initial;
        self
    }

    pub fn base_url(&self) -> &str {
        &self.base_url
    }

    fn headers(&self) -> Result<header::HeaderMap> {
        let mut headers = header::HeaderMap::new();
        headers.insert(header::ACCEPT, header::HeaderValue::from_static("application/json"));
        if let Some(ref key) = self.api_key {
            headers.insert("x-api-key", header::HeaderValue::from_str(key)?);
        }
        Ok(headers)
    }

    /// Returns Ok(Some(response)) on success, Ok(None) when rate limited
    /// (caller retries), or the mapped error otherwise.
    async fn check_response_for_retry(
        response: reqwest::Response,
    ) -> Result<Option<reqwest::Response>> {
        let status = response.status();
        if status.is_success() {
            Ok(Some(response))
        } else if status.as_u16() == 429 {
            Ok(None)
        } else {
            let body = response.text().await.unwrap_or_default();
            Err(ApiError::from_status(status, &body).into())
        }
    }

    /// GET `path` and parse the body as JSON, backing off on 429.
    pub async fn get_json(&self, path: &str) -> Result<Value> {
        let url = format!("{}{}", self.base_url, path);
        let mut retries = 0;
        let mut backoff = self.initial_backoff;

        loop {
            let response = self
                .client
                .get(&url)
                .headers(self.headers()?)
                .send()
                .await
                .map_err(ApiError::from)
                .with_context(|| format!("Failed to send GET request to {}", url))?;

            match Self::check_response_for_retry(response).await? {
                Some(response) => {
                    debug!(url = %url, "Response received");
                    return response
                        .json()
                        .await
                        .with_context(|| format!("Failed to parse JSON response from {}", url));
                }
                None => {
                    retries += 1;
                    if retries > MAX_RATE_LIMIT_RETRIES {
                        return Err(ApiError::RateLimited.into());
                    }
                    warn!(url = %url, retry = retries, backoff_ms = backoff.as_millis() as u64, "Rate limited, backing off");
                    tokio::time::sleep(backoff).await;
                    backoff *= 2;
                }
            }
        }
    }

    pub async fn fetch(&self, resource: Resource) -> Result<Value> {
        self.get_json(&resource.path()).await
    }

    /// Fetch function for SWR and preload, bound to one resource.
    pub fn fetcher(&self, resource: Resource) -> FetchFn<Value> {
        let api = self.clone();
        fetcher(move || {
            let api = api.clone();
            async move { api.fetch(resource).await.map_err(FetchError::from) }
        })
    }
}
