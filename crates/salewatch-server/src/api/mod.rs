mod dataset;
mod sales;

use std::sync::Arc;

use axum::{
    http::{header, HeaderName, HeaderValue, Method, StatusCode},
    response::IntoResponse,
    routing::{get, post},
    Json, Router,
};
use chrono::{DateTime, Utc};
use salewatch_pipeline::{Dataset, ReadApi, ReadError, SalesView};
use salewatch_scraper::HttpFetcher;
use salewatch_store::FsBlobStore;
use serde::Serialize;
use tower::ServiceBuilder;
use tower_http::{compression::CompressionLayer, cors::CorsLayer};

use crate::middleware::{enforce_rate_limit, request_id, RateLimitState};

/// Read boundary as wired in production.
pub type SalesApi = ReadApi<HttpFetcher, FsBlobStore>;

/// Seconds a client should wait before retrying while the first load runs.
const LOADING_RETRY_AFTER_SECS: u64 = 5;
/// Seconds a client should wait after a failed on-demand load.
const UNAVAILABLE_RETRY_AFTER_SECS: u64 = 30;

#[derive(Clone)]
pub struct AppState {
    pub sales: Arc<SalesApi>,
}

#[derive(Debug, Serialize)]
pub struct ApiResponse<T: Serialize> {
    pub data: T,
    pub meta: ResponseMeta,
}

#[derive(Debug, Serialize)]
pub struct ResponseMeta {
    pub request_id: String,
    pub timestamp: DateTime<Utc>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub cycle: Option<u64>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub published_at: Option<DateTime<Utc>>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub count: Option<usize>,
}

#[derive(Debug, Serialize)]
pub struct ApiError {
    pub error: ErrorBody,
    pub meta: ResponseMeta,
    #[serde(skip)]
    retry_after_secs: Option<u64>,
}

#[derive(Debug, Serialize)]
pub struct ErrorBody {
    pub code: String,
    pub message: String,
}

impl ResponseMeta {
    pub(super) fn new(request_id: String) -> Self {
        Self {
            request_id,
            timestamp: Utc::now(),
            cycle: None,
            published_at: None,
            count: None,
        }
    }

    /// Meta stamped with the cycle and publish time of `dataset`.
    pub(super) fn for_dataset(request_id: String, dataset: &Dataset) -> Self {
        Self {
            cycle: Some(dataset.cycle),
            published_at: Some(dataset.published_at),
            ..Self::new(request_id)
        }
    }

    pub(super) fn for_view(request_id: String, view: &SalesView) -> Self {
        Self {
            count: Some(view.items().len()),
            ..Self::for_dataset(request_id, view.dataset())
        }
    }
}

impl ApiError {
    pub fn new(
        request_id: impl Into<String>,
        code: impl Into<String>,
        message: impl Into<String>,
    ) -> Self {
        Self {
            error: ErrorBody {
                code: code.into(),
                message: message.into(),
            },
            meta: ResponseMeta::new(request_id.into()),
            retry_after_secs: None,
        }
    }

    #[must_use]
    pub fn retry_after(mut self, secs: u64) -> Self {
        self.retry_after_secs = Some(secs);
        self
    }
}

impl IntoResponse for ApiError {
    fn into_response(self) -> axum::response::Response {
        let status = match self.error.code.as_str() {
            "not_found" => StatusCode::NOT_FOUND,
            "conflict" => StatusCode::CONFLICT,
            "rate_limited" => StatusCode::TOO_MANY_REQUESTS,
            "loading" | "unavailable" => StatusCode::SERVICE_UNAVAILABLE,
            _ => StatusCode::INTERNAL_SERVER_ERROR,
        };
        let retry_after = self.retry_after_secs;
        let mut res = (status, Json(self)).into_response();
        if let Some(secs) = retry_after {
            res.headers_mut()
                .insert(header::RETRY_AFTER, HeaderValue::from(secs));
        }
        res
    }
}

pub(super) fn map_read_error(request_id: String, error: &ReadError) -> ApiError {
    match error {
        ReadError::Loading => ApiError::new(
            request_id,
            "loading",
            "sales data is still loading, retry shortly",
        )
        .retry_after(LOADING_RETRY_AFTER_SECS),
        ReadError::StateConflict { .. } => {
            ApiError::new(request_id, "conflict", error.to_string())
        }
        ReadError::CycleFailed(e) => {
            tracing::error!(error = %e, phase = %e.phase(), "on-demand dataset load failed");
            ApiError::new(
                request_id,
                "unavailable",
                "sales data is temporarily unavailable",
            )
            .retry_after(UNAVAILABLE_RETRY_AFTER_SECS)
        }
    }
}

fn build_cors() -> CorsLayer {
    CorsLayer::new()
        .allow_origin(tower_http::cors::Any)
        .allow_methods([Method::GET, Method::POST])
        .allow_headers([header::CONTENT_TYPE, HeaderName::from_static("x-request-id")])
        .expose_headers([header::RETRY_AFTER, HeaderName::from_static("x-request-id")])
}

fn rate_limited_router(rate_limit: RateLimitState) -> Router<AppState> {
    Router::new()
        .route("/unlisted.json", get(sales::unlisted_json))
        .route("/sales.json", get(sales::sales_json))
        .route("/api/v1/sales/unlisted", get(sales::list_unlisted))
        .route("/api/v1/sales", get(sales::list_sales))
        .route("/api/v1/dataset/load", post(dataset::force_load))
        .layer(axum::middleware::from_fn_with_state(
            rate_limit,
            enforce_rate_limit,
        ))
}

pub fn build_app(state: AppState, rate_limit: RateLimitState) -> Router {
    let public_routes = Router::new()
        .route("/", get(dataset::index))
        .route("/api/v1/health", get(dataset::health));

    Router::new()
        .merge(public_routes)
        .merge(rate_limited_router(rate_limit))
        .layer(
            ServiceBuilder::new()
                .layer(build_cors())
                .layer(CompressionLayer::new())
                .layer(axum::middleware::from_fn(request_id)),
        )
        .with_state(state)
}

#[cfg(test)]
#[path = "api_test.rs"]
mod tests;
