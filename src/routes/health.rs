use axum::extract::State;
use axum::Json;
use serde::Serialize;
use utoipa::ToSchema;

use crate::routes::incidents::AppState;

/// Health check response.
#[derive(Debug, Serialize, ToSchema)]
pub struct HealthResponse {
    /// Service status ("ok" once the dataset is loaded)
    pub status: String,
    /// API version
    pub version: String,
    /// Normalized records available for querying
    pub records_loaded: usize,
    /// Raw rows rejected during normalization
    pub rows_dropped: usize,
}

/// Health check endpoint.
///
/// The dataset is loaded before the server starts taking traffic, so a
/// responding service is a healthy one; the body carries load stats for
/// quick inspection.
#[utoipa::path(
    get,
    path = "/api/v1/health",
    tag = "Health",
    responses(
        (status = 200, description = "Service is healthy", body = HealthResponse),
    )
)]
pub async fn health_check(State(state): State<AppState>) -> Json<HealthResponse> {
    let dataset = state.dataset();
    Json(HealthResponse {
        status: "ok".to_string(),
        version: env!("CARGO_PKG_VERSION").to_string(),
        records_loaded: dataset.records.len(),
        rows_dropped: dataset.dropped_rows,
    })
}
