//! Weather correlation endpoint.
//!
//! POST /api/v1/correlation — take the busiest days under the given
//! criteria and fetch each day's weather, one request at a time. Days
//! whose fetch fails come back without a sample; the response carries one
//! consolidated warning when the whole batch failed.

use axum::extract::State;
use axum::Json;
use serde::{Deserialize, Serialize};
use utoipa::ToSchema;

use crate::data::models::FilterCriteria;
use crate::errors::AppError;
use crate::routes::incidents::AppState;
use crate::services::correlate::{self, DayCorrelation, LogProgress};
use crate::services::weather::WeatherKey;
use crate::services::{aggregate, filter};

/// Busiest days correlated per batch unless the caller asks for fewer.
const DEFAULT_TOP_N: usize = 10;
/// Hard cap on the batch size, one fetch per day.
const MAX_TOP_N: usize = 31;

#[derive(Debug, Default, Deserialize, ToSchema)]
pub struct CorrelationRequest {
    #[serde(default)]
    pub criteria: FilterCriteria,
    /// How many busiest days to correlate, capped server-side.
    pub top_n: Option<usize>,
}

#[derive(Debug, Serialize, ToSchema)]
pub struct CorrelationResponse {
    /// Busiest days first, each paired with its own weather sample when
    /// the fetch succeeded.
    pub days: Vec<DayCorrelation>,
    pub failed_days: usize,
    pub batch_failed: bool,
    /// Single consolidated diagnostic, set only on batch failure.
    pub warning: Option<String>,
}

/// Correlate the busiest days with daily weather.
#[utoipa::path(
    post,
    path = "/api/v1/correlation",
    tag = "Correlation",
    request_body = CorrelationRequest,
    responses(
        (status = 200, description = "Per-day correlation results", body = CorrelationResponse),
        (status = 400, description = "Invalid criteria", body = crate::errors::ErrorResponse),
        (status = 502, description = "Weather service not configured", body = crate::errors::ErrorResponse),
    )
)]
pub async fn run_correlation(
    State(state): State<AppState>,
    Json(request): Json<CorrelationRequest>,
) -> Result<Json<CorrelationResponse>, AppError> {
    filter::validate(&request.criteria)?;

    let client = state.weather_client.clone().ok_or_else(|| {
        AppError::ExternalServiceError(
            "Weather correlation is unavailable: OPENWEATHER_API_KEY is not configured".to_string(),
        )
    })?;

    let dataset = state.dataset();
    let matched = filter::apply(&dataset.records, &request.criteria);
    let daily = aggregate::daily_counts(&matched);
    let top_n = request.top_n.unwrap_or(DEFAULT_TOP_N).min(MAX_TOP_N);
    let top_days = aggregate::top_n_days(&daily, top_n);

    let cache = state.weather_cache.clone();
    let fetch = |lat: f64, lon: f64, date: chrono::NaiveDate| {
        let client = client.clone();
        let cache = cache.clone();
        async move {
            let key = WeatherKey::new(lat, lon, date);
            if let Some(hit) = cache.get(&key) {
                tracing::debug!(%date, "weather cache hit");
                return Ok(hit);
            }
            let sample = client.fetch_day_summary(lat, lon, date).await?;
            cache.insert(key, sample);
            Ok(sample)
        }
    };

    let report = correlate::correlate(&top_days, &matched, fetch, &mut LogProgress).await;

    let warning = report
        .batch_failed
        .then(|| format!("All {} weather fetches failed", report.days.len()));
    Ok(Json(CorrelationResponse {
        days: report.days,
        failed_days: report.failed_days,
        batch_failed: report.batch_failed,
        warning,
    }))
}
