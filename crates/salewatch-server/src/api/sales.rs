use axum::{extract::State, Extension, Json};
use salewatch_pipeline::SalesView;

use super::{map_read_error, ApiError, ApiResponse, AppState, ResponseMeta};
use crate::middleware::RequestId;

/// `GET /unlisted.json`: bare array, ascending by sale percent.
pub(super) async fn unlisted_json(
    State(state): State<AppState>,
    Extension(req_id): Extension<RequestId>,
) -> Result<Json<SalesView>, ApiError> {
    state
        .sales
        .unlisted_sales()
        .await
        .map(Json)
        .map_err(|e| map_read_error(req_id.0, &e))
}

/// `GET /sales.json`: bare array of every discounted product.
pub(super) async fn sales_json(
    State(state): State<AppState>,
    Extension(req_id): Extension<RequestId>,
) -> Result<Json<SalesView>, ApiError> {
    state
        .sales
        .full_sales_view()
        .await
        .map(Json)
        .map_err(|e| map_read_error(req_id.0, &e))
}

pub(super) async fn list_unlisted(
    State(state): State<AppState>,
    Extension(req_id): Extension<RequestId>,
) -> Result<Json<ApiResponse<SalesView>>, ApiError> {
    match state.sales.unlisted_sales().await {
        Ok(view) => Ok(Json(envelope(req_id, view))),
        Err(e) => Err(map_read_error(req_id.0, &e)),
    }
}

pub(super) async fn list_sales(
    State(state): State<AppState>,
    Extension(req_id): Extension<RequestId>,
) -> Result<Json<ApiResponse<SalesView>>, ApiError> {
    match state.sales.full_sales_view().await {
        Ok(view) => Ok(Json(envelope(req_id, view))),
        Err(e) => Err(map_read_error(req_id.0, &e)),
    }
}

fn envelope(req_id: RequestId, view: SalesView) -> ApiResponse<SalesView> {
    ApiResponse {
        meta: ResponseMeta::for_view(req_id.0, &view),
        data: view,
    }
}
