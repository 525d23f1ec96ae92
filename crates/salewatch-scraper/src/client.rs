use std::future::Future;
use std::time::Duration;

use reqwest::Client;

use crate::error::ScraperError;
use crate::retry::retry_with_backoff;

/// Network I/O primitive the refresh pipeline is built on: `GET url → body`.
///
/// Implementations own their transport policy (timeouts, retries). Whatever
/// error they finally return is treated as fatal to the refresh cycle.
pub trait Fetch: Send + Sync {
    fn fetch(&self, url: &str) -> impl Future<Output = Result<Vec<u8>, ScraperError>> + Send;
}

/// `reqwest`-backed [`Fetch`] used against the live retailer.
///
/// 429 and 404 become typed errors; other non-2xx statuses become
/// [`ScraperError::UnexpectedStatus`]. Transient errors (429, transport
/// failures, 5xx) are retried with capped exponential backoff up to
/// `max_retries` additional attempts; a 429 waits at least its `Retry-After`
/// seconds (absent or non-numeric reads as `0`).
#[derive(Debug, Clone)]
pub struct HttpFetcher {
    client: Client,
    /// Maximum number of retry attempts after the first failure.
    max_retries: u32,
    /// Base delay in seconds for exponential backoff: `backoff_base_secs * 2^attempt`, capped at 60.
    backoff_base_secs: u64,
}

impl HttpFetcher {
    /// Creates an `HttpFetcher` with configured timeout, `User-Agent`, and retry policy.
    ///
    /// `timeout_secs` bounds each attempt; a timed-out attempt surfaces as
    /// [`ScraperError::Http`]. Set `max_retries` to `0` to disable retries.
    ///
    /// # Errors
    ///
    /// Returns [`ScraperError::Http`] if the underlying `reqwest::Client`
    /// cannot be constructed (e.g., invalid TLS config).
    pub fn new(
        timeout_secs: u64,
        user_agent: &str,
        max_retries: u32,
        backoff_base_secs: u64,
    ) -> Result<Self, ScraperError> {
        let client = Client::builder()
            .timeout(Duration::from_secs(timeout_secs))
            .connect_timeout(Duration::from_secs(10))
            .user_agent(user_agent)
            .build()?;
        Ok(Self {
            client,
            max_retries,
            backoff_base_secs,
        })
    }

    async fn fetch_once(&self, url: &str) -> Result<Vec<u8>, ScraperError> {
        let response = self.client.get(url).send().await?;
        let status = response.status();

        if status == reqwest::StatusCode::TOO_MANY_REQUESTS {
            let retry_after_secs = response
                .headers()
                .get(reqwest::header::RETRY_AFTER)
                .and_then(|v| v.to_str().ok())
                .and_then(|s| s.parse::<u64>().ok())
                .unwrap_or(0);

            return Err(ScraperError::RateLimited {
                host: extract_host(url),
                retry_after_secs,
            });
        }

        if status == reqwest::StatusCode::NOT_FOUND {
            return Err(ScraperError::NotFound {
                url: url.to_owned(),
            });
        }

        if !status.is_success() {
            return Err(ScraperError::UnexpectedStatus {
                status: status.as_u16(),
                url: url.to_owned(),
            });
        }

        let body = response.bytes().await?;
        Ok(body.to_vec())
    }
}

impl Fetch for HttpFetcher {
    async fn fetch(&self, url: &str) -> Result<Vec<u8>, ScraperError> {
        retry_with_backoff(self.max_retries, self.backoff_base_secs, || {
            self.fetch_once(url)
        })
        .await
    }
}

/// Extracts the hostname from a URL for use in error messages.
///
/// Falls back to the full URL string if parsing fails.
pub(crate) fn extract_host(url: &str) -> String {
    reqwest::Url::parse(url)
        .ok()
        .and_then(|u| u.host_str().map(str::to_owned))
        .unwrap_or_else(|| url.to_owned())
}

#[cfg(test)]
#[path = "client_test.rs"]
mod tests;
