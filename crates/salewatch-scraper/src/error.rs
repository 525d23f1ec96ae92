use thiserror::Error;

#[derive(Debug, Error)]
pub enum ScraperError {
    #[error("HTTP error: {0}")]
    Http(#[from] reqwest::Error),

    #[error("JSON deserialization error for {context}: {source}")]
    Deserialize {
        context: String,
        #[source]
        source: serde_json::Error,
    },

    #[error("rate limited by {host} (retry after {retry_after_secs}s)")]
    RateLimited { host: String, retry_after_secs: u64 },

    #[error("endpoint not found: {url}")]
    NotFound { url: String },

    #[error("unexpected HTTP status {status} from {url}")]
    UnexpectedStatus { status: u16, url: String },

    #[error("unexpected ingest for category {category}: {reason}")]
    UnexpectedCategory { category: String, reason: String },

    #[error(
        "aggregation incomplete: {received}/{expected} categories, sale category received: {sale_received}"
    )]
    Incomplete {
        received: usize,
        expected: usize,
        sale_received: bool,
    },
}

impl ScraperError {
    /// `true` when the retailer answered but the body was not catalog JSON.
    #[must_use]
    pub fn is_parse_failure(&self) -> bool {
        matches!(self, ScraperError::Deserialize { .. })
    }
}
