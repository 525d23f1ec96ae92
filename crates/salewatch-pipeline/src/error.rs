use salewatch_scraper::ScraperError;
use salewatch_store::CacheError;
use thiserror::Error;

use crate::swap::RefreshPhase;

/// Why a refresh cycle or cache load aborted.
///
/// Every variant means the same thing to readers: the cycle failed and the
/// live dataset was left as it was.
#[derive(Debug, Error)]
pub enum PipelineError {
    #[error("fetching category `{category}` failed: {source}")]
    Fetch {
        category: String,
        #[source]
        source: ScraperError,
    },

    #[error("category `{category}` did not return a catalog: {source}")]
    Parse {
        category: String,
        #[source]
        source: ScraperError,
    },

    #[error("aggregation failed: {0}")]
    Aggregation(#[source] ScraperError),

    #[error("snapshot persistence failed: {0}")]
    Persistence(#[from] CacheError),
}

impl PipelineError {
    /// Classifies a failed category fetch as transport or parse failure.
    #[must_use]
    pub fn from_fetch(category: &str, source: ScraperError) -> Self {
        if source.is_parse_failure() {
            Self::Parse {
                category: category.to_owned(),
                source,
            }
        } else {
            Self::Fetch {
                category: category.to_owned(),
                source,
            }
        }
    }

    /// Phase the cycle was in when it aborted.
    #[must_use]
    pub fn phase(&self) -> RefreshPhase {
        match self {
            Self::Fetch { .. } | Self::Parse { .. } => RefreshPhase::FetchingCategories,
            Self::Aggregation(_) => RefreshPhase::Aggregating,
            Self::Persistence(_) => RefreshPhase::Persisting,
        }
    }
}

/// Conditions a reader of the live dataset can hit.
#[derive(Debug, Error)]
pub enum ReadError {
    /// Nothing is published, the cache is cold and a refresh is already
    /// running. Retry shortly.
    #[error("dataset is still loading")]
    Loading,

    /// A forced load was requested while a dataset is already live.
    #[error("a dataset is already published (cycle {live_cycle})")]
    StateConflict { live_cycle: u64 },

    /// The on-demand load failed; nothing is published.
    #[error("loading the dataset failed: {0}")]
    CycleFailed(#[from] PipelineError),
}

impl ReadError {
    /// Whether the same request may succeed later without intervention.
    #[must_use]
    pub fn is_retryable(&self) -> bool {
        matches!(self, Self::Loading | Self::CycleFailed(_))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn parse_failure() -> ScraperError {
        ScraperError::Deserialize {
            context: "category mens-pants".to_owned(),
            source: serde_json::from_str::<serde_json::Value>("<html>").unwrap_err(),
        }
    }

    #[test]
    fn from_fetch_separates_parse_from_transport_failures() {
        let parse = PipelineError::from_fetch("mens-pants", parse_failure());
        assert!(matches!(parse, PipelineError::Parse { .. }));

        let fetch = PipelineError::from_fetch(
            "mens-pants",
            ScraperError::NotFound {
                url: "http://shop.test/b/mens-pants.json".to_owned(),
            },
        );
        assert!(matches!(fetch, PipelineError::Fetch { .. }));
        assert_eq!(fetch.phase(), RefreshPhase::FetchingCategories);
    }

    #[test]
    fn state_conflict_is_not_retryable() {
        assert!(!ReadError::StateConflict { live_cycle: 3 }.is_retryable());
        assert!(ReadError::Loading.is_retryable());
    }
}
