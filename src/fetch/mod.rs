//! Match history fetching.
//!
//! The history endpoint is paginated. Page 1 carries `meta.total_items`
//! and `meta.total_pages`; the remaining pages are fetched in order and
//! concatenated. Each page is retried with linear backoff.

use std::time::Duration;

use async_trait::async_trait;
use reqwest::header::{HeaderMap, HeaderValue, ACCEPT, USER_AGENT};
use reqwest::Client;
use serde::{Deserialize, Serialize};
use serde_json::Value;
use thiserror::Error;
use tracing::{debug, info, warn};
use url::Url;

use crate::config::SourceConfig;

/// Errors that can occur during fetching.
#[derive(Debug, Error)]
pub enum FetchError {
    #[error("HTTP error: {0}")]
    Http(#[from] reqwest::Error),

    #[error("Invalid URL: {0}")]
    InvalidUrl(String),

    #[error("Rate limited by {host}, retry after {retry_after_secs}s")]
    RateLimited { host: String, retry_after_secs: u64 },

    #[error("HTTP {status}: {message}")]
    HttpStatus { status: u16, message: String },

    #[error("JSON error: {0}")]
    Json(#[from] serde_json::Error),
}

impl FetchError {
    /// Whether another attempt could succeed.
    ///
    /// Client errors other than 429 (bad credentials, missing profile) and
    /// malformed bodies are not retried.
    pub fn is_retryable(&self) -> bool {
        match self {
            FetchError::Http(_) | FetchError::RateLimited { .. } => true,
            FetchError::HttpStatus { status, .. } => *status >= 500,
            FetchError::InvalidUrl(_) | FetchError::Json(_) => false,
        }
    }
}

/// Pagination metadata returned with every page.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct PageMeta {
    pub total_items: u64,

    /// `None` when everything fits on one page
    #[serde(default)]
    pub total_pages: Option<u32>,
}

/// One page of match history.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct HistoryPage {
    #[serde(default)]
    pub history: Vec<Value>,
    pub meta: PageMeta,
}

/// All raw records for a user.
#[derive(Debug, Clone, PartialEq)]
pub struct RawHistory {
    pub records: Vec<Value>,
    pub total_items: u64,
}

/// Source of paginated match history.
#[async_trait]
pub trait HistoryProvider: Send + Sync {
    /// Fetch one page, 1-based.
    async fn fetch_page(&self, page: u32) -> Result<HistoryPage, FetchError>;
}

/// How failed pages are retried.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct RetryPolicy {
    /// Attempts after the first
    pub max_retries: u32,
    /// Base delay; attempt `n` waits `n * delay`
    pub delay: Duration,
}

impl RetryPolicy {
    /// Retry settings from the source config.
    pub fn from_config(config: &SourceConfig) -> Self {
        Self {
            max_retries: config.max_retries,
            delay: Duration::from_millis(config.request_delay_ms),
        }
    }

    /// Fail on the first error.
    pub fn none() -> Self {
        Self {
            max_retries: 0,
            delay: Duration::ZERO,
        }
    }
}

impl Default for RetryPolicy {
    fn default() -> Self {
        Self::from_config(&SourceConfig::default())
    }
}

/// Fetch a single page, retrying transient failures.
pub async fn fetch_page_with_retry<P>(
    provider: &P,
    page: u32,
    policy: RetryPolicy,
) -> Result<HistoryPage, FetchError>
where
    P: HistoryProvider + ?Sized,
{
    let mut attempt = 0;
    loop {
        match provider.fetch_page(page).await {
            Ok(result) => {
                info!(
                    "Fetched history page {} ({} records)",
                    page,
                    result.history.len()
                );
                return Ok(result);
            }
            Err(e) if e.is_retryable() && attempt < policy.max_retries => {
                attempt += 1;
                let backoff = retry_delay(&e, policy, attempt);
                warn!(
                    "Page {} failed ({}), retry {}/{} in {:?}",
                    page, e, attempt, policy.max_retries, backoff
                );
                tokio::time::sleep(backoff).await;
            }
            Err(e) => return Err(e),
        }
    }
}

/// Wait before retry `attempt`: linear backoff, or the server's
/// `Retry-After` when that is longer.
fn retry_delay(error: &FetchError, policy: RetryPolicy, attempt: u32) -> Duration {
    let backoff = policy.delay * attempt;
    match error {
        FetchError::RateLimited {
            retry_after_secs, ..
        } => backoff.max(Duration::from_secs(*retry_after_secs)),
        _ => backoff,
    }
}

/// Fetch every page and concatenate the history.
pub async fn fetch_all<P>(provider: &P, policy: RetryPolicy) -> Result<RawHistory, FetchError>
where
    P: HistoryProvider + ?Sized,
{
    let first = fetch_page_with_retry(provider, 1, policy).await?;
    fetch_remaining(provider, first, policy).await
}

/// Fetch pages 2..=total_pages after an already fetched first page.
pub async fn fetch_remaining<P>(
    provider: &P,
    first: HistoryPage,
    policy: RetryPolicy,
) -> Result<RawHistory, FetchError>
where
    P: HistoryProvider + ?Sized,
{
    let total_items = first.meta.total_items;
    let total_pages = first.meta.total_pages.unwrap_or(1);
    let mut records = first.history;

    for page in 2..=total_pages {
        let next = fetch_page_with_retry(provider, page, policy).await?;
        records.extend(next.history);
    }

    debug!(
        "Fetched {} records over {} pages (source reports {})",
        records.len(),
        total_pages,
        total_items
    );

    Ok(RawHistory {
        records,
        total_items,
    })
}

/// Credentials for the history endpoint.
#[derive(Clone)]
pub struct Credentials {
    pub username: String,
    pub token: String,
}

impl Credentials {
    pub fn new(username: impl Into<String>, token: impl Into<String>) -> Self {
        Self {
            username: username.into(),
            token: token.into(),
        }
    }
}

impl std::fmt::Debug for Credentials {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Credentials")
            .field("username", &self.username)
            .field("token", &"***")
            .finish()
    }
}

/// HTTP client for the Track-o-Bot history endpoint.
pub struct TrackobotClient {
    client: Client,
    base_url: Url,
    credentials: Credentials,
}

impl TrackobotClient {
    /// Build a client for the configured endpoint.
    pub fn new(config: &SourceConfig, credentials: Credentials) -> Result<Self, FetchError> {
        let base_url = Url::parse(&config.base_url)
            .map_err(|e| FetchError::InvalidUrl(format!("{}: {}", config.base_url, e)))?;

        let mut headers = HeaderMap::new();
        headers.insert(
            USER_AGENT,
            HeaderValue::from_static(concat!("deckstats/", env!("CARGO_PKG_VERSION"))),
        );
        headers.insert(ACCEPT, HeaderValue::from_static("application/json"));

        let client = Client::builder()
            .timeout(Duration::from_secs(config.timeout_seconds))
            .default_headers(headers)
            .build()?;

        Ok(Self {
            client,
            base_url,
            credentials,
        })
    }

    /// URL for one page of history.
    pub fn page_url(&self, page: u32) -> Url {
        let mut url = self.base_url.clone();
        url.query_pairs_mut()
            .append_pair("username", &self.credentials.username)
            .append_pair("token", &self.credentials.token)
            .append_pair("page", &page.to_string());
        url
    }
}

#[async_trait]
impl HistoryProvider for TrackobotClient {
    async fn fetch_page(&self, page: u32) -> Result<HistoryPage, FetchError> {
        let url = self.page_url(page);
        debug!("Requesting history page {} from {}", page, self.base_url);

        // The query string carries the token, so it is stripped from errors
        let response = self
            .client
            .get(url)
            .send()
            .await
            .map_err(|e| FetchError::Http(e.without_url()))?;

        let status = response.status();
        if status == reqwest::StatusCode::TOO_MANY_REQUESTS {
            let retry_after = response
                .headers()
                .get("retry-after")
                .and_then(|v| v.to_str().ok())
                .and_then(|s| s.parse().ok())
                .unwrap_or(60);

            return Err(FetchError::RateLimited {
                host: self.base_url.host_str().unwrap_or("unknown").to_string(),
                retry_after_secs: retry_after,
            });
        }

        if !status.is_success() {
            return Err(FetchError::HttpStatus {
                status: status.as_u16(),
                message: status.canonical_reason().unwrap_or("Unknown").to_string(),
            });
        }

        let body = response
            .text()
            .await
            .map_err(|e| FetchError::Http(e.without_url()))?;
        Ok(serde_json::from_str(&body)?)
    }
}
