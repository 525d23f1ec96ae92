//! Backoff for transient retailer errors.
//!
//! Only the fetch collaborator retries. A failure that survives the retry
//! budget is handed to the refresh cycle, which aborts without retrying.

use std::future::Future;
use std::time::Duration;

use crate::error::ScraperError;

/// Ceiling on the exponential part of the schedule.
const MAX_BACKOFF_SECS: u64 = 60;
/// Ceiling on a retailer-supplied `Retry-After`, so one header cannot stall
/// a cycle indefinitely.
const MAX_RETRY_AFTER_SECS: u64 = 300;

/// How long to wait before retry number `attempt` (zero-based) after `err`,
/// or `None` when `err` would fail the same way again.
///
/// Retriable: 429, transport failures and 5xx. The wait is
/// `backoff_base_secs * 2^attempt`, capped at [`MAX_BACKOFF_SECS`]; a 429
/// waits at least as long as its `Retry-After` asks.
fn retry_delay(err: &ScraperError, attempt: u32, backoff_base_secs: u64) -> Option<Duration> {
    let backoff = backoff_base_secs
        .saturating_mul(1u64 << attempt.min(30))
        .min(MAX_BACKOFF_SECS);

    let secs = match err {
        ScraperError::RateLimited {
            retry_after_secs, ..
        } => backoff.max((*retry_after_secs).min(MAX_RETRY_AFTER_SECS)),
        ScraperError::Http(_) => backoff,
        ScraperError::UnexpectedStatus { status, .. } if *status >= 500 => backoff,
        _ => return None,
    };
    Some(Duration::from_secs(secs))
}

/// Runs `operation`, retrying transient failures up to `max_retries` times.
///
/// With `max_retries = 2` the operation runs at most 3 times. The last error
/// is returned once the budget is spent.
pub(crate) async fn retry_with_backoff<T, F, Fut>(
    max_retries: u32,
    backoff_base_secs: u64,
    mut operation: F,
) -> Result<T, ScraperError>
where
    F: FnMut() -> Fut,
    Fut: Future<Output = Result<T, ScraperError>>,
{
    let mut attempt = 0u32;

    loop {
        let err = match operation().await {
            Ok(value) => return Ok(value),
            Err(err) => err,
        };

        let delay = match retry_delay(&err, attempt, backoff_base_secs) {
            Some(delay) if attempt < max_retries => delay,
            _ => return Err(err),
        };

        tracing::warn!(
            attempt,
            max_retries,
            delay_secs = delay.as_secs(),
            error = %err,
            "transient fetch error, retrying"
        );
        tokio::time::sleep(delay).await;
        attempt += 1;
    }
}

#[cfg(test)]
mod tests {
    use std::collections::VecDeque;
    use std::sync::{Arc, Mutex};
    use std::time::Instant;

    use super::*;

    const URL: &str = "http://shop.test/b/mens-pants.json";

    fn rate_limited(retry_after_secs: u64) -> ScraperError {
        ScraperError::RateLimited {
            host: "shop.test".to_owned(),
            retry_after_secs,
        }
    }

    fn status(status: u16) -> ScraperError {
        ScraperError::UnexpectedStatus {
            status,
            url: URL.to_owned(),
        }
    }

    /// Replays `script` one entry per call and counts the calls.
    async fn replay(
        max_retries: u32,
        script: Vec<Result<u32, ScraperError>>,
    ) -> (Result<u32, ScraperError>, usize) {
        let script = Arc::new(Mutex::new(VecDeque::from(script)));
        let calls = Arc::new(Mutex::new(0usize));
        let result = retry_with_backoff(max_retries, 0, || {
            let script = Arc::clone(&script);
            let calls = Arc::clone(&calls);
            async move {
                *calls.lock().unwrap() += 1;
                script.lock().unwrap().pop_front().expect("script exhausted")
            }
        })
        .await;
        let calls = *calls.lock().unwrap();
        (result, calls)
    }

    #[test]
    fn backoff_doubles_per_attempt_and_is_capped() {
        let delays: Vec<u64> = (0..8)
            .map(|n| retry_delay(&status(503), n, 1).unwrap().as_secs())
            .collect();
        assert_eq!(delays, vec![1, 2, 4, 8, 16, 32, 60, 60]);
    }

    #[test]
    fn rate_limit_waits_for_retry_after_when_longer_than_backoff() {
        assert_eq!(
            retry_delay(&rate_limited(30), 0, 1),
            Some(Duration::from_secs(30))
        );
        assert_eq!(
            retry_delay(&rate_limited(2), 3, 1),
            Some(Duration::from_secs(8))
        );
    }

    #[test]
    fn retry_after_is_bounded() {
        assert_eq!(
            retry_delay(&rate_limited(86_400), 0, 1),
            Some(Duration::from_secs(MAX_RETRY_AFTER_SECS))
        );
    }

    #[test]
    fn permanent_failures_get_no_delay() {
        assert!(retry_delay(&status(403), 0, 1).is_none());
        assert!(retry_delay(&ScraperError::NotFound { url: URL.to_owned() }, 0, 1).is_none());
    }

    #[tokio::test]
    async fn retry_after_delays_the_next_attempt() {
        let started = Instant::now();
        let (result, calls) = replay(1, vec![Err(rate_limited(1)), Ok(7)]).await;

        assert_eq!(result.unwrap(), 7);
        assert_eq!(calls, 2);
        assert!(
            started.elapsed() >= Duration::from_secs(1),
            "retried after {:?}",
            started.elapsed()
        );
    }

    #[tokio::test]
    async fn first_success_runs_once() {
        let (result, calls) = replay(3, vec![Ok(42)]).await;
        assert_eq!(result.unwrap(), 42);
        assert_eq!(calls, 1);
    }

    #[tokio::test]
    async fn server_errors_exhaust_the_budget() {
        let (result, calls) =
            replay(2, vec![Err(status(502)), Err(status(502)), Err(status(502))]).await;
        assert_eq!(calls, 3);
        assert!(matches!(
            result,
            Err(ScraperError::UnexpectedStatus { status: 502, .. })
        ));
    }

    #[tokio::test]
    async fn not_found_is_returned_without_retrying() {
        let (result, calls) =
            replay(3, vec![Err(ScraperError::NotFound { url: URL.to_owned() })]).await;
        assert_eq!(calls, 1);
        assert!(matches!(result, Err(ScraperError::NotFound { .. })));
    }
}
