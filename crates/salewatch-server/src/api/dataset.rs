use axum::{extract::State, http::StatusCode, response::IntoResponse, Extension, Json};
use chrono::{DateTime, Utc};
use salewatch_pipeline::{Dataset, DatasetSource};
use serde::Serialize;

use super::{map_read_error, ApiError, ApiResponse, AppState, ResponseMeta};
use crate::middleware::RequestId;

#[derive(Debug, Serialize)]
struct Liveness {
    success: u8,
}

/// Collection sizes of a published dataset.
#[derive(Debug, Serialize, PartialEq, Eq)]
pub(super) struct DatasetSummary {
    cycle: u64,
    published_at: DateTime<Utc>,
    source: DatasetSource,
    products: usize,
    sale_category: usize,
    complete_sales: usize,
    unlisted_sales: usize,
}

impl From<&Dataset> for DatasetSummary {
    fn from(dataset: &Dataset) -> Self {
        Self {
            cycle: dataset.cycle,
            published_at: dataset.published_at,
            source: dataset.source,
            products: dataset.products.len(),
            sale_category: dataset.sale_category.len(),
            complete_sales: dataset.complete_sales.len(),
            unlisted_sales: dataset.unlisted_sales.len(),
        }
    }
}

#[derive(Debug, Serialize)]
struct HealthData {
    status: &'static str,
    refreshing: bool,
    #[serde(skip_serializing_if = "Option::is_none")]
    dataset: Option<DatasetSummary>,
}

/// `GET /`: process liveness.
pub(super) async fn index() -> impl IntoResponse {
    Json(Liveness { success: 1 })
}

/// `GET /api/v1/health`: whether a dataset is published. Never triggers a
/// load.
pub(super) async fn health(
    State(state): State<AppState>,
    Extension(req_id): Extension<RequestId>,
) -> impl IntoResponse {
    let refreshing = state.sales.swap().is_refreshing();
    let live = state.sales.current().await;

    let (status, data) = match live.as_deref() {
        Some(dataset) => (
            StatusCode::OK,
            HealthData {
                status: "ready",
                refreshing,
                dataset: Some(DatasetSummary::from(dataset)),
            },
        ),
        None => (
            StatusCode::SERVICE_UNAVAILABLE,
            HealthData {
                status: if refreshing { "loading" } else { "empty" },
                refreshing,
                dataset: None,
            },
        ),
    };

    let meta = match live.as_deref() {
        Some(dataset) => ResponseMeta::for_dataset(req_id.0, dataset),
        None => ResponseMeta::new(req_id.0),
    };

    (status, Json(ApiResponse { data, meta }))
}

/// `POST /api/v1/dataset/load`: loads a dataset into an empty slot.
pub(super) async fn force_load(
    State(state): State<AppState>,
    Extension(req_id): Extension<RequestId>,
) -> Result<Json<ApiResponse<DatasetSummary>>, ApiError> {
    match state.sales.force_load().await {
        Ok(dataset) => Ok(Json(ApiResponse {
            data: DatasetSummary::from(dataset.as_ref()),
            meta: ResponseMeta::for_dataset(req_id.0, &dataset),
        })),
        Err(e) => Err(map_read_error(req_id.0, &e)),
    }
}
