//! Pure filter pipeline with cascading option recomputation.
//!
//! `apply` evaluates a [`FilterCriteria`] as a conjunction of independent
//! predicates over the immutable record set and returns borrowed matches.
//! `cascade_options` recomputes the per-dimension option lists stage by
//! stage from the progressively narrowed subset, so every offered option is
//! guaranteed to match at least one record downstream.

use std::collections::BTreeSet;

use chrono::NaiveDate;
use serde::Serialize;
use utoipa::ToSchema;

use crate::data::models::{FilterCriteria, IncidentRecord, LocationFilter};

/// Rejected before any evaluation happens.
#[derive(Debug, PartialEq, Eq, thiserror::Error)]
#[error("start_date {start} is after end_date {end}")]
pub struct InvalidCriteria {
    pub start: NaiveDate,
    pub end: NaiveDate,
}

/// Check a criteria value for internal consistency.
pub fn validate(criteria: &FilterCriteria) -> Result<(), InvalidCriteria> {
    if let (Some(start), Some(end)) = (criteria.start_date, criteria.end_date) {
        if start > end {
            return Err(InvalidCriteria { start, end });
        }
    }
    Ok(())
}

/// Evaluate the criteria over a record set.
///
/// Order-independent and idempotent: filtering an already filtered result
/// with the same criteria is a no-op.
pub fn apply<'a>(
    records: impl IntoIterator<Item = &'a IncidentRecord>,
    criteria: &FilterCriteria,
) -> Vec<&'a IncidentRecord> {
    records
        .into_iter()
        .filter(|r| matches(r, criteria))
        .collect()
}

fn matches(record: &IncidentRecord, criteria: &FilterCriteria) -> bool {
    matches_date(record, criteria)
        && matches_location(record, criteria)
        && matches_specific_type(record, criteria)
        && matches_category(record, criteria)
        && matches_description(record, criteria)
        && matches_state(record, criteria)
        && matches_city(record, criteria)
}

fn matches_date(record: &IncidentRecord, criteria: &FilterCriteria) -> bool {
    if let Some(start) = criteria.start_date {
        if record.date < start {
            return false;
        }
    }
    if let Some(end) = criteria.end_date {
        if record.date > end {
            return false;
        }
    }
    true
}

fn matches_location(record: &IncidentRecord, criteria: &FilterCriteria) -> bool {
    match criteria.location {
        LocationFilter::All => true,
        LocationFilter::Land => record.on_land,
        LocationFilter::Water => !record.on_land,
    }
}

fn matches_specific_type(record: &IncidentRecord, criteria: &FilterCriteria) -> bool {
    criteria
        .specific_incident_type
        .as_deref()
        .map_or(true, |t| record.specific_incident_type == t)
}

fn matches_category(record: &IncidentRecord, criteria: &FilterCriteria) -> bool {
    criteria
        .category
        .as_deref()
        .map_or(true, |c| record.incident_category == c)
}

fn matches_description(record: &IncidentRecord, criteria: &FilterCriteria) -> bool {
    criteria
        .descriptions
        .as_ref()
        .map_or(true, |set| set.contains(&record.incident_description))
}

fn matches_state(record: &IncidentRecord, criteria: &FilterCriteria) -> bool {
    criteria.state.as_deref().map_or(true, |s| record.state == s)
}

fn matches_city(record: &IncidentRecord, criteria: &FilterCriteria) -> bool {
    criteria.city.as_deref().map_or(true, |c| record.city == c)
}

/// Option lists the caller may offer for each filter dimension, given the
/// current selection. Each list is sorted and deduplicated.
#[derive(Debug, Clone, PartialEq, Eq, Default, Serialize, ToSchema)]
pub struct CascadeOptions {
    pub specific_incident_types: Vec<String>,
    pub categories: Vec<String>,
    pub descriptions: Vec<String>,
    pub states: Vec<String>,
    pub cities: Vec<String>,
}

/// Recompute option lists under the current criteria.
///
/// Stages narrow in a fixed order: date and location first, then specific
/// type, category, description, state, city. Each dimension's options come
/// from the subset remaining *before* that dimension's own predicate is
/// applied, so the current selection always stays offerable.
pub fn cascade_options(records: &[IncidentRecord], criteria: &FilterCriteria) -> CascadeOptions {
    let stage: Vec<&IncidentRecord> = records
        .iter()
        .filter(|r| matches_date(r, criteria) && matches_location(r, criteria))
        .collect();

    let specific_incident_types = distinct(&stage, |r| &r.specific_incident_type);
    let stage: Vec<&IncidentRecord> = stage
        .into_iter()
        .filter(|r| matches_specific_type(r, criteria))
        .collect();

    let categories = distinct(&stage, |r| &r.incident_category);
    let stage: Vec<&IncidentRecord> = stage
        .into_iter()
        .filter(|r| matches_category(r, criteria))
        .collect();

    let descriptions = distinct(&stage, |r| &r.incident_description);
    let stage: Vec<&IncidentRecord> = stage
        .into_iter()
        .filter(|r| matches_description(r, criteria))
        .collect();

    let states = distinct(&stage, |r| &r.state);
    let stage: Vec<&IncidentRecord> = stage
        .into_iter()
        .filter(|r| matches_state(r, criteria))
        .collect();

    let cities = distinct(&stage, |r| &r.city);

    CascadeOptions {
        specific_incident_types,
        categories,
        descriptions,
        states,
        cities,
    }
}

fn distinct<F>(records: &[&IncidentRecord], key: F) -> Vec<String>
where
    F: Fn(&IncidentRecord) -> &String,
{
    records
        .iter()
        .map(|r| key(r).clone())
        .collect::<BTreeSet<String>>()
        .into_iter()
        .collect()
}
