//! Pure aggregation over filtered record slices.
//!
//! Every function here takes borrowed records and returns owned summary
//! values; nothing caches and nothing mutates. Tie-breaking is always
//! deterministic: earliest date, smallest hour, lexicographic label.

use std::collections::BTreeMap;

use chrono::{Datelike, NaiveDate, Timelike, Weekday};
use serde::Serialize;
use utoipa::ToSchema;

use crate::data::models::{DailyAggregate, IncidentRecord};

/// Incident count for one hour of day.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, ToSchema)]
pub struct HourCount {
    pub hour: u32,
    pub count: u64,
}

/// Grouped sum with its share of the grand total.
#[derive(Debug, Clone, PartialEq, Serialize, ToSchema)]
pub struct CategoryShare {
    pub label: String,
    pub total: u64,
    /// Share of the grand total in percent. 0.0 for every group when the
    /// grand total itself is zero.
    pub percentage: f64,
}

/// A label with its occurrence count.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, ToSchema)]
pub struct ValueCount {
    pub value: String,
    pub count: u64,
}

/// Fraction of records carrying each alarm type.
#[derive(Debug, Clone, Copy, PartialEq, Default, Serialize, ToSchema)]
pub struct AlarmPresenceRates {
    pub smoke: f64,
    pub fire: f64,
    pub other: f64,
}

/// Incidents per hour of day, ascending by hour, only hours present.
pub fn hourly_histogram(records: &[&IncidentRecord]) -> Vec<HourCount> {
    let mut by_hour: BTreeMap<u32, u64> = BTreeMap::new();
    for record in records {
        *by_hour.entry(record.alarm_time.hour()).or_insert(0) += 1;
    }
    by_hour
        .into_iter()
        .map(|(hour, count)| HourCount { hour, count })
        .collect()
}

/// Incidents per day, ascending by date.
pub fn daily_counts(records: &[&IncidentRecord]) -> Vec<DailyAggregate> {
    let mut by_day: BTreeMap<NaiveDate, u64> = BTreeMap::new();
    for record in records {
        *by_day.entry(record.date).or_insert(0) += 1;
    }
    by_day
        .into_iter()
        .map(|(date, incident_count)| DailyAggregate {
            date,
            incident_count,
        })
        .collect()
}

/// The `n` busiest days: count descending, earliest date first on ties,
/// never more than `n` entries.
pub fn top_n_days(daily: &[DailyAggregate], n: usize) -> Vec<DailyAggregate> {
    let mut days = daily.to_vec();
    days.sort_by(|a, b| {
        b.incident_count
            .cmp(&a.incident_count)
            .then(a.date.cmp(&b.date))
    });
    days.truncate(n);
    days
}

/// Sum `value` per `group` label and express each group as a share of the
/// grand total. Groups are sorted by total descending, label ascending.
pub fn category_share<G, V>(records: &[&IncidentRecord], group: G, value: V) -> Vec<CategoryShare>
where
    G: Fn(&IncidentRecord) -> &str,
    V: Fn(&IncidentRecord) -> u64,
{
    let mut totals: BTreeMap<String, u64> = BTreeMap::new();
    for record in records {
        *totals.entry(group(record).to_string()).or_insert(0) += value(record);
    }
    let grand_total: u64 = totals.values().sum();

    let mut shares: Vec<CategoryShare> = totals
        .into_iter()
        .map(|(label, total)| CategoryShare {
            label,
            total,
            percentage: if grand_total == 0 {
                0.0
            } else {
                total as f64 * 100.0 / grand_total as f64
            },
        })
        .collect();
    shares.sort_by(|a, b| b.total.cmp(&a.total).then(a.label.cmp(&b.label)));
    shares
}

/// Hour of day with the most incidents, smallest hour on ties.
pub fn busiest_hour(records: &[&IncidentRecord]) -> Option<u32> {
    hourly_histogram(records)
        .into_iter()
        .max_by(|a, b| a.count.cmp(&b.count).then(b.hour.cmp(&a.hour)))
        .map(|entry| entry.hour)
}

/// Weekday with the most incidents, earliest weekday (Monday first) on ties.
pub fn busiest_day_of_week(records: &[&IncidentRecord]) -> Option<Weekday> {
    let mut by_weekday: BTreeMap<u32, u64> = BTreeMap::new();
    for record in records {
        *by_weekday
            .entry(record.date.weekday().num_days_from_monday())
            .or_insert(0) += 1;
    }
    by_weekday
        .into_iter()
        .max_by(|a, b| a.1.cmp(&b.1).then(b.0.cmp(&a.0)))
        .and_then(|(weekday, _)| weekday_from_monday_offset(weekday))
}

fn weekday_from_monday_offset(offset: u32) -> Option<Weekday> {
    match offset {
        0 => Some(Weekday::Mon),
        1 => Some(Weekday::Tue),
        2 => Some(Weekday::Wed),
        3 => Some(Weekday::Thu),
        4 => Some(Weekday::Fri),
        5 => Some(Weekday::Sat),
        6 => Some(Weekday::Sun),
        _ => None,
    }
}

/// The `n` most frequent values of a text field: count descending,
/// value ascending on ties.
pub fn value_counts_top_n<F>(records: &[&IncidentRecord], n: usize, field: F) -> Vec<ValueCount>
where
    F: Fn(&IncidentRecord) -> &str,
{
    let mut counts: BTreeMap<String, u64> = BTreeMap::new();
    for record in records {
        *counts.entry(field(record).to_string()).or_insert(0) += 1;
    }
    let mut counts: Vec<ValueCount> = counts
        .into_iter()
        .map(|(value, count)| ValueCount { value, count })
        .collect();
    counts.sort_by(|a, b| b.count.cmp(&a.count).then(a.value.cmp(&b.value)));
    counts.truncate(n);
    counts
}

/// Mean presence of the three alarm flags. All zero on empty input.
pub fn alarm_presence_rates(records: &[&IncidentRecord]) -> AlarmPresenceRates {
    if records.is_empty() {
        return AlarmPresenceRates::default();
    }
    let total = records.len() as f64;
    let count = |pred: fn(&IncidentRecord) -> bool| {
        records.iter().filter(|r| pred(r)).count() as f64 / total
    };
    AlarmPresenceRates {
        smoke: count(|r| r.has_smoke_alarm),
        fire: count(|r| r.has_fire_alarm),
        other: count(|r| r.has_other_alarm),
    }
}

/// Mean (latitude, longitude), `None` on empty input. Used for map
/// centering and as the representative coordinate for weather fetches.
pub fn mean_coordinate(records: &[&IncidentRecord]) -> Option<(f64, f64)> {
    if records.is_empty() {
        return None;
    }
    let n = records.len() as f64;
    let lat: f64 = records.iter().map(|r| r.latitude).sum();
    let lon: f64 = records.iter().map(|r| r.longitude).sum();
    Some((lat / n, lon / n))
}

/// Mean response time over the records that have one.
pub fn mean_response_time(records: &[&IncidentRecord]) -> Option<f64> {
    let times: Vec<f64> = records
        .iter()
        .filter_map(|r| r.response_time_minutes)
        .collect();
    if times.is_empty() {
        return None;
    }
    Some(times.iter().sum::<f64>() / times.len() as f64)
}
