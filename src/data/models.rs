//! Core domain types shared by the loader, filter pipeline, aggregator
//! and weather correlator.
//!
//! `IncidentRecord` is the normalized, fully-typed shape every raw CSV row
//! is converted into exactly once at load time. Everything downstream treats
//! records as immutable.

use std::collections::BTreeSet;

use chrono::{DateTime, NaiveDate, Utc};
use serde::{Deserialize, Serialize};
use utoipa::ToSchema;

/// Separator between segments of the hierarchical incident type column,
/// e.g. `"FIRE||STRUCTURE FIRE||COOKING FIRE"`.
pub const TYPE_PATH_SEPARATOR: &str = "||";

/// Fill value for missing categorical fields.
pub const UNKNOWN: &str = "Unknown";

/// One validated incident report.
#[derive(Debug, Clone, PartialEq, Serialize, ToSchema)]
pub struct IncidentRecord {
    /// Alarm timestamp, normalized to UTC.
    pub alarm_time: DateTime<Utc>,
    /// Day of `alarm_time`, precomputed once for day-granular filtering
    /// and grouping.
    pub date: NaiveDate,
    pub cleared_time: Option<DateTime<Utc>>,
    /// Cleared minus alarm, in minutes. `Some` only when positive.
    pub mission_duration_minutes: Option<f64>,
    /// `Some` only when the source value parsed and is non-negative.
    pub response_time_minutes: Option<f64>,
    pub latitude: f64,
    pub longitude: f64,
    /// Derived once from the coordinates by the land classifier.
    pub on_land: bool,
    /// Hierarchical type labels, most general first.
    pub incident_type_path: Vec<String>,
    /// Last segment of the type path.
    pub specific_incident_type: String,
    pub incident_category: String,
    pub incident_description: String,
    /// Two-letter state code, uppercased.
    pub state: String,
    /// City name, title-cased.
    pub city: String,
    pub transport_disposition: String,
    pub patient_status: String,
    pub fire_suppression_effectiveness: String,
    pub animals_rescued: u32,
    pub units_responded: u32,
    pub has_smoke_alarm: bool,
    pub has_fire_alarm: bool,
    pub has_other_alarm: bool,
}

/// Land/water selector for the location predicate.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize, ToSchema)]
#[serde(rename_all = "snake_case")]
pub enum LocationFilter {
    #[default]
    All,
    Land,
    Water,
}

/// One filter selection. Constructed fresh per request and never mutated
/// during evaluation; an absent field means "no constraint".
#[derive(Debug, Clone, PartialEq, Default, Serialize, Deserialize, ToSchema)]
#[serde(default)]
pub struct FilterCriteria {
    /// Inclusive lower day bound.
    pub start_date: Option<NaiveDate>,
    /// Inclusive upper day bound.
    pub end_date: Option<NaiveDate>,
    pub location: LocationFilter,
    pub category: Option<String>,
    /// Set membership over `incident_description`.
    pub descriptions: Option<BTreeSet<String>>,
    pub state: Option<String>,
    pub city: Option<String>,
    pub specific_incident_type: Option<String>,
}

/// Incident count for one calendar day.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize, ToSchema)]
pub struct DailyAggregate {
    pub date: NaiveDate,
    pub incident_count: u64,
}

/// Observed weather for one day at one representative coordinate.
/// Absence of a sample always means the fetch failed, never "zero weather".
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize, ToSchema)]
pub struct WeatherSample {
    pub max_temp_c: f64,
    pub total_precipitation_mm: f64,
}
