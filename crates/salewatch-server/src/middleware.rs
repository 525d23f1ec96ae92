use std::{
    collections::HashMap,
    net::SocketAddr,
    sync::Arc,
    time::{Duration, Instant},
};

use axum::{
    extract::{ConnectInfo, Request, State},
    http::{header::RETRY_AFTER, HeaderValue, StatusCode},
    middleware::Next,
    response::{IntoResponse, Response},
    Json,
};
use serde::Serialize;
use tokio::sync::Mutex;
use uuid::Uuid;

/// Newtype wrapping a request ID string, stored as a request extension.
#[derive(Debug, Clone)]
pub struct RequestId(pub String);

/// Client table size above which expired windows are swept on insert.
const SWEEP_THRESHOLD: usize = 10_000;

#[derive(Debug, Clone)]
struct RateLimitWindow {
    started_at: Instant,
    count: usize,
}

/// Fixed-window limiter keyed by client IP.
#[derive(Debug, Clone)]
pub struct RateLimitState {
    max_requests: usize,
    window: Duration,
    clients: Arc<Mutex<HashMap<String, RateLimitWindow>>>,
}

impl RateLimitState {
    #[must_use]
    pub fn new(max_requests: usize, window: Duration) -> Self {
        Self {
            max_requests,
            window,
            clients: Arc::new(Mutex::new(HashMap::new())),
        }
    }

    /// Counts one request from `client`. Returns the seconds until the
    /// client's window resets when the request is over the limit.
    async fn check(&self, client: &str) -> Result<(), u64> {
        let mut clients = self.clients.lock().await;
        let now = Instant::now();

        if clients.len() >= SWEEP_THRESHOLD {
            let window = self.window;
            clients.retain(|_, w| now.duration_since(w.started_at) < window);
        }

        let entry = clients
            .entry(client.to_owned())
            .or_insert_with(|| RateLimitWindow {
                started_at: now,
                count: 0,
            });

        let elapsed = now.duration_since(entry.started_at);
        if elapsed >= self.window {
            entry.started_at = now;
            entry.count = 0;
        }

        if entry.count >= self.max_requests {
            let remaining = self.window.saturating_sub(now.duration_since(entry.started_at));
            let secs = remaining.as_secs() + u64::from(remaining.subsec_nanos() > 0);
            return Err(secs.max(1));
        }

        entry.count += 1;
        Ok(())
    }
}

#[derive(Debug, Serialize)]
struct MiddlewareErrorBody {
    error: MiddlewareError,
}

#[derive(Debug, Serialize)]
struct MiddlewareError {
    code: &'static str,
    message: &'static str,
}

/// Axum middleware that extracts or generates a request ID.
///
/// If the incoming request has an `x-request-id` header, that value is used.
/// Otherwise a new `UUIDv4` is generated. The ID is:
/// - Inserted into request extensions as [`RequestId`]
/// - Set on the response as the `x-request-id` header
pub async fn request_id(mut req: Request, next: Next) -> Response {
    let id = req
        .headers()
        .get("x-request-id")
        .and_then(|v| v.to_str().ok())
        .map_or_else(|| Uuid::new_v4().to_string(), String::from);

    req.extensions_mut().insert(RequestId(id.clone()));

    let mut res = next.run(req).await;
    if let Ok(val) = HeaderValue::from_str(&id) {
        res.headers_mut().insert("x-request-id", val);
    }
    res
}

/// Middleware enforcing the per-client request window.
///
/// Over-limit requests get 429 with a `Retry-After` header.
pub async fn enforce_rate_limit(
    State(rate_limit): State<RateLimitState>,
    req: Request,
    next: Next,
) -> Response {
    let client = client_ip(&req);

    if let Err(retry_after_secs) = rate_limit.check(&client).await {
        tracing::debug!(client = %client, retry_after_secs, "rate limit exceeded");
        let mut res = (
            StatusCode::TOO_MANY_REQUESTS,
            Json(MiddlewareErrorBody {
                error: MiddlewareError {
                    code: "rate_limited",
                    message: "rate limit exceeded",
                },
            }),
        )
            .into_response();
        res.headers_mut()
            .insert(RETRY_AFTER, HeaderValue::from(retry_after_secs));
        return res;
    }

    next.run(req).await
}

/// Client address: first `X-Forwarded-For` entry, else the peer address.
fn client_ip(req: &Request) -> String {
    let forwarded = req
        .headers()
        .get("x-forwarded-for")
        .and_then(|v| v.to_str().ok())
        .and_then(|v| v.split(',').next())
        .map(str::trim)
        .filter(|ip| !ip.is_empty());

    if let Some(ip) = forwarded {
        return ip.to_owned();
    }

    req.extensions()
        .get::<ConnectInfo<SocketAddr>>()
        .map_or_else(|| "unknown".to_owned(), |ci| ci.0.ip().to_string())
}
