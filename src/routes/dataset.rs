//! Dataset provenance endpoints.
//!
//! GET /api/v1/dataset — summary of the dataset currently being served.
//! POST /api/v1/dataset/reload — re-read the source file through the
//! keyed cache and swap the served dataset if the content changed.

use axum::extract::State;
use axum::Json;
use chrono::{DateTime, NaiveDate, Utc};
use serde::Serialize;
use std::sync::Arc;
use utoipa::ToSchema;

use crate::data::loader::Dataset;
use crate::errors::AppError;
use crate::routes::incidents::AppState;

#[derive(Debug, Serialize, ToSchema)]
pub struct DatasetResponse {
    /// Normalized records available for querying.
    pub records: usize,
    /// Raw rows rejected during normalization.
    pub dropped_rows: usize,
    /// SHA-256 of the source file content, hex encoded.
    pub fingerprint: String,
    pub loaded_at: DateTime<Utc>,
    /// Earliest alarm day, absent for an empty dataset.
    pub first_date: Option<NaiveDate>,
    /// Latest alarm day, absent for an empty dataset.
    pub last_date: Option<NaiveDate>,
    /// Whether weather correlation is available.
    pub weather_enabled: bool,
}

fn summarize(dataset: &Dataset, weather_enabled: bool) -> DatasetResponse {
    let span = dataset.date_span();
    DatasetResponse {
        records: dataset.records.len(),
        dropped_rows: dataset.dropped_rows,
        fingerprint: dataset.fingerprint.clone(),
        loaded_at: dataset.loaded_at,
        first_date: span.map(|(first, _)| first),
        last_date: span.map(|(_, last)| last),
        weather_enabled,
    }
}

/// Summary of the loaded dataset.
#[utoipa::path(
    get,
    path = "/api/v1/dataset",
    tag = "Dataset",
    responses(
        (status = 200, description = "Dataset summary", body = DatasetResponse),
    )
)]
pub async fn get_dataset_summary(State(state): State<AppState>) -> Json<DatasetResponse> {
    let dataset = state.dataset();
    Json(summarize(&dataset, state.weather_client.is_some()))
}

/// Reload the dataset from disk.
///
/// Unchanged content is a cache hit and keeps the served dataset as-is. A
/// file that no longer loads leaves the current dataset in place and
/// reports a single consolidated error.
#[utoipa::path(
    post,
    path = "/api/v1/dataset/reload",
    tag = "Dataset",
    responses(
        (status = 200, description = "Summary of the dataset now being served", body = DatasetResponse),
        (status = 500, description = "Source file failed to load", body = crate::errors::ErrorResponse),
    )
)]
pub async fn reload_dataset(
    State(state): State<AppState>,
) -> Result<Json<DatasetResponse>, AppError> {
    let reloaded = state
        .dataset_cache
        .load(&state.data_file, state.classifier.as_ref(), state.normalize)?;
    *state
        .dataset
        .write()
        .unwrap_or_else(|e| e.into_inner()) = Arc::clone(&reloaded);
    Ok(Json(summarize(&reloaded, state.weather_client.is_some())))
}
