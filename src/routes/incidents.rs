//! Incident query endpoints.
//!
//! POST /api/v1/incidents/query — evaluate filter criteria, return a capped
//! record page plus cascade options and the aggregate tables.
//! GET /api/v1/incidents/day/{date} — deep dive into one day.

use axum::extract::{Path, State};
use axum::Json;
use chrono::NaiveDate;
use serde::{Deserialize, Serialize};
use std::path::PathBuf;
use std::sync::{Arc, RwLock};
use utoipa::ToSchema;

use crate::data::loader::{Dataset, NormalizeOptions};
use crate::data::models::{DailyAggregate, FilterCriteria, IncidentRecord};
use crate::data::store::DatasetCache;
use crate::errors::AppError;
use crate::services::aggregate::{
    self, AlarmPresenceRates, CategoryShare, HourCount, ValueCount,
};
use crate::services::filter::{self, CascadeOptions};
use crate::services::landmask::LandClassifier;
use crate::services::weather::{WeatherCache, WeatherClient};

/// Records returned per query unless the caller asks for fewer.
const DEFAULT_RECORD_LIMIT: usize = 500;
/// Hard cap on the record page size.
const MAX_RECORD_LIMIT: usize = 5_000;
/// Days in the busiest-days table.
const TOP_DAYS_N: usize = 10;
/// Entries in each top-values table.
const TOP_VALUES_N: usize = 10;

/// Shared application state.
#[derive(Clone)]
pub struct AppState {
    /// Currently served dataset, swapped atomically on reload.
    pub dataset: Arc<RwLock<Arc<Dataset>>>,
    pub dataset_cache: Arc<DatasetCache>,
    pub data_file: Arc<PathBuf>,
    pub classifier: Arc<dyn LandClassifier>,
    pub normalize: NormalizeOptions,
    /// Absent when no API key is configured.
    pub weather_client: Option<WeatherClient>,
    pub weather_cache: Arc<WeatherCache>,
}

impl AppState {
    /// Snapshot of the dataset being served. Requests keep working on
    /// their snapshot even if a reload swaps the dataset mid-flight.
    pub fn dataset(&self) -> Arc<Dataset> {
        Arc::clone(&self.dataset.read().unwrap_or_else(|e| e.into_inner()))
    }
}

#[derive(Debug, Default, Deserialize, ToSchema)]
pub struct QueryRequest {
    #[serde(default)]
    pub criteria: FilterCriteria,
    /// Max records to return, capped server-side.
    pub limit: Option<usize>,
}

/// Aggregate tables computed over the filtered subset.
#[derive(Debug, Serialize, ToSchema)]
pub struct Aggregates {
    pub hourly_histogram: Vec<HourCount>,
    pub daily_counts: Vec<DailyAggregate>,
    pub top_days: Vec<DailyAggregate>,
    pub busiest_hour: Option<u32>,
    /// English weekday name, e.g. "Friday".
    pub busiest_day_of_week: Option<String>,
    /// Animals rescued per incident category, as share of the total.
    pub animals_rescued_share: Vec<CategoryShare>,
    pub top_descriptions: Vec<ValueCount>,
    pub top_cities: Vec<ValueCount>,
    pub top_transport_dispositions: Vec<ValueCount>,
    pub alarm_presence: AlarmPresenceRates,
    pub mean_response_time_minutes: Option<f64>,
    pub map_center: Option<MapCenter>,
}

#[derive(Debug, Serialize, ToSchema)]
pub struct MapCenter {
    pub latitude: f64,
    pub longitude: f64,
}

#[derive(Debug, Serialize, ToSchema)]
pub struct QueryResponse {
    /// Records matching the criteria.
    pub total: usize,
    /// Records included in this response.
    pub returned: usize,
    pub records: Vec<IncidentRecord>,
    pub options: CascadeOptions,
    pub aggregates: Aggregates,
}

/// Evaluate filter criteria over the dataset.
#[utoipa::path(
    post,
    path = "/api/v1/incidents/query",
    tag = "Incidents",
    request_body = QueryRequest,
    responses(
        (status = 200, description = "Filtered records with aggregates", body = QueryResponse),
        (status = 400, description = "Invalid criteria", body = crate::errors::ErrorResponse),
    )
)]
pub async fn query_incidents(
    State(state): State<AppState>,
    Json(request): Json<QueryRequest>,
) -> Result<Json<QueryResponse>, AppError> {
    filter::validate(&request.criteria)?;

    let dataset = state.dataset();
    let records = &dataset.records;
    let matched = filter::apply(records, &request.criteria);
    let options = filter::cascade_options(records, &request.criteria);
    let aggregates = compute_aggregates(&matched);

    let limit = request
        .limit
        .unwrap_or(DEFAULT_RECORD_LIMIT)
        .min(MAX_RECORD_LIMIT);
    let page: Vec<IncidentRecord> = matched.iter().take(limit).map(|r| (*r).clone()).collect();

    Ok(Json(QueryResponse {
        total: matched.len(),
        returned: page.len(),
        records: page,
        options,
        aggregates,
    }))
}

fn compute_aggregates(matched: &[&IncidentRecord]) -> Aggregates {
    let daily = aggregate::daily_counts(matched);
    let top_days = aggregate::top_n_days(&daily, TOP_DAYS_N);
    Aggregates {
        hourly_histogram: aggregate::hourly_histogram(matched),
        daily_counts: daily,
        top_days,
        busiest_hour: aggregate::busiest_hour(matched),
        busiest_day_of_week: aggregate::busiest_day_of_week(matched)
            .map(|day| weekday_name(day).to_string()),
        animals_rescued_share: aggregate::category_share(
            matched,
            |r| r.incident_category.as_str(),
            |r| u64::from(r.animals_rescued),
        ),
        top_descriptions: aggregate::value_counts_top_n(matched, TOP_VALUES_N, |r| {
            r.incident_description.as_str()
        }),
        top_cities: aggregate::value_counts_top_n(matched, TOP_VALUES_N, |r| r.city.as_str()),
        top_transport_dispositions: aggregate::value_counts_top_n(matched, TOP_VALUES_N, |r| {
            r.transport_disposition.as_str()
        }),
        alarm_presence: aggregate::alarm_presence_rates(matched),
        mean_response_time_minutes: aggregate::mean_response_time(matched),
        map_center: aggregate::mean_coordinate(matched).map(|(latitude, longitude)| MapCenter {
            latitude,
            longitude,
        }),
    }
}

fn weekday_name(day: chrono::Weekday) -> &'static str {
    match day {
        chrono::Weekday::Mon => "Monday",
        chrono::Weekday::Tue => "Tuesday",
        chrono::Weekday::Wed => "Wednesday",
        chrono::Weekday::Thu => "Thursday",
        chrono::Weekday::Fri => "Friday",
        chrono::Weekday::Sat => "Saturday",
        chrono::Weekday::Sun => "Sunday",
    }
}

#[derive(Debug, Serialize, ToSchema)]
pub struct DayDetailResponse {
    pub date: NaiveDate,
    pub total: usize,
    pub busiest_hour: Option<u32>,
    /// Most frequent incident description that day.
    pub top_description: Option<String>,
    pub mean_response_time_minutes: Option<f64>,
    pub records: Vec<IncidentRecord>,
}

/// Deep dive into a single day.
#[utoipa::path(
    get,
    path = "/api/v1/incidents/day/{date}",
    tag = "Incidents",
    params(
        ("date" = String, Path, description = "Day to inspect, YYYY-MM-DD"),
    ),
    responses(
        (status = 200, description = "Day summary and records", body = DayDetailResponse),
        (status = 400, description = "Unparseable date", body = crate::errors::ErrorResponse),
        (status = 404, description = "No incidents on that day", body = crate::errors::ErrorResponse),
    )
)]
pub async fn get_day_detail(
    State(state): State<AppState>,
    Path(date): Path<String>,
) -> Result<Json<DayDetailResponse>, AppError> {
    let date = NaiveDate::parse_from_str(&date, "%Y-%m-%d")
        .map_err(|_| AppError::BadRequest(format!("Invalid date '{date}', expected YYYY-MM-DD")))?;

    let dataset = state.dataset();
    let day_records: Vec<&IncidentRecord> = dataset
        .records
        .iter()
        .filter(|r| r.date == date)
        .collect();
    if day_records.is_empty() {
        return Err(AppError::NotFound(format!("No incidents on {date}")));
    }

    let top_description = aggregate::value_counts_top_n(&day_records, 1, |r| {
        r.incident_description.as_str()
    })
    .into_iter()
    .next()
    .map(|entry| entry.value);

    Ok(Json(DayDetailResponse {
        date,
        total: day_records.len(),
        busiest_hour: aggregate::busiest_hour(&day_records),
        top_description,
        mean_response_time_minutes: aggregate::mean_response_time(&day_records),
        records: day_records.into_iter().cloned().collect(),
    }))
}
