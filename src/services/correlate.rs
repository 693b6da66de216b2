//! Weather correlation over the busiest days.
//!
//! One fetch per day, strictly sequential, no retry. Each result is paired
//! with its originating day by date key, so a failed fetch in the middle of
//! the batch never shifts later samples onto the wrong day. A failed day
//! appears with `weather: None`; only when every day fails does the batch
//! itself get flagged.

use chrono::NaiveDate;
use serde::Serialize;
use std::future::Future;
use utoipa::ToSchema;

use crate::data::models::{DailyAggregate, IncidentRecord, WeatherSample};
use crate::services::aggregate;
use crate::services::weather::WeatherError;

/// One busiest-day row with its weather, when the fetch succeeded.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, ToSchema)]
pub struct DayCorrelation {
    pub date: NaiveDate,
    pub incident_count: u64,
    pub weather: Option<WeatherSample>,
}

/// Outcome of one correlation batch.
#[derive(Debug, Clone, PartialEq, Serialize, ToSchema)]
pub struct CorrelationReport {
    /// Count descending, same order as the top-days input.
    pub days: Vec<DayCorrelation>,
    pub failed_days: usize,
    /// True only when every fetch in the batch failed.
    pub batch_failed: bool,
}

/// Progress reporting seam. The correlator emits one event after each
/// fetch; what happens to the event is the caller's business.
pub trait ProgressSink: Send {
    fn fetched(&mut self, completed: usize, total: usize, date: NaiveDate);
}

/// Discards progress events.
pub struct NullProgress;

impl ProgressSink for NullProgress {
    fn fetched(&mut self, _completed: usize, _total: usize, _date: NaiveDate) {}
}

/// Logs each progress event at info level.
pub struct LogProgress;

impl ProgressSink for LogProgress {
    fn fetched(&mut self, completed: usize, total: usize, date: NaiveDate) {
        tracing::info!(completed, total, %date, "weather fetch progress");
    }
}

/// Correlate the given busiest days with daily weather.
///
/// `records` is the filtered set the days were computed from; each day's
/// representative coordinate is the mean position of that day's records.
/// `fetch` runs once per day, sequentially, in input order.
pub async fn correlate<F, Fut>(
    top_days: &[DailyAggregate],
    records: &[&IncidentRecord],
    mut fetch: F,
    progress: &mut dyn ProgressSink,
) -> CorrelationReport
where
    F: FnMut(f64, f64, NaiveDate) -> Fut,
    Fut: Future<Output = Result<WeatherSample, WeatherError>>,
{
    let total = top_days.len();
    let mut days = Vec::with_capacity(total);
    let mut failed_days = 0usize;

    for (done, day) in top_days.iter().enumerate() {
        let day_records: Vec<&IncidentRecord> = records
            .iter()
            .copied()
            .filter(|r| r.date == day.date)
            .collect();

        let weather = match aggregate::mean_coordinate(&day_records) {
            Some((lat, lon)) => match fetch(lat, lon, day.date).await {
                Ok(sample) => Some(sample),
                Err(err) => {
                    tracing::warn!(date = %day.date, error = %err, "weather fetch failed");
                    None
                }
            },
            None => {
                tracing::warn!(date = %day.date, "no records for day, skipping weather fetch");
                None
            }
        };

        if weather.is_none() {
            failed_days += 1;
        }
        days.push(DayCorrelation {
            date: day.date,
            incident_count: day.incident_count,
            weather,
        });
        progress.fetched(done + 1, total, day.date);
    }

    CorrelationReport {
        days,
        failed_days,
        batch_failed: total > 0 && failed_days == total,
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::{Datelike, TimeZone, Utc};
    use std::cell::RefCell;

    fn record(day: u32) -> IncidentRecord {
        let alarm_time = Utc.with_ymd_and_hms(2024, 3, day, 12, 0, 0).unwrap();
        IncidentRecord {
            alarm_time,
            date: alarm_time.date_naive(),
            cleared_time: None,
            mission_duration_minutes: None,
            response_time_minutes: None,
            latitude: 32.0,
            longitude: -97.0,
            on_land: true,
            incident_type_path: vec!["FIRE".into()],
            specific_incident_type: "FIRE".into(),
            incident_category: "Fire".into(),
            incident_description: "Fire reported".into(),
            state: "TX".into(),
            city: "Dallas".into(),
            transport_disposition: "Unknown".into(),
            patient_status: "Unknown".into(),
            fire_suppression_effectiveness: "Unknown".into(),
            animals_rescued: 0,
            units_responded: 1,
            has_smoke_alarm: false,
            has_fire_alarm: false,
            has_other_alarm: false,
        }
    }

    fn date(day: u32) -> NaiveDate {
        NaiveDate::from_ymd_opt(2024, 3, day).unwrap()
    }

    fn sample_for(day: u32) -> WeatherSample {
        WeatherSample {
            max_temp_c: f64::from(day),
            total_precipitation_mm: 0.0,
        }
    }

    struct RecordingProgress(Vec<(usize, usize, NaiveDate)>);

    impl ProgressSink for RecordingProgress {
        fn fetched(&mut self, completed: usize, total: usize, date: NaiveDate) {
            self.0.push((completed, total, date));
        }
    }

    #[tokio::test]
    async fn test_failed_days_stay_aligned_with_their_dates() {
        // Ten days, fetches for day 3 and day 7 fail. Every surviving
        // sample must still sit on its own date, not shifted.
        let records: Vec<IncidentRecord> = (1..=10).map(record).collect();
        let refs: Vec<&IncidentRecord> = records.iter().collect();
        let top_days: Vec<DailyAggregate> = (1..=10)
            .map(|d| DailyAggregate {
                date: date(d),
                incident_count: 1,
            })
            .collect();

        let fetch = |_lat: f64, _lon: f64, day: NaiveDate| async move {
            if day == date(3) || day == date(7) {
                Err(WeatherError::Http(500))
            } else {
                Ok(sample_for(day.day0() + 1))
            }
        };

        let report = correlate(&top_days, &refs, fetch, &mut NullProgress).await;
        assert_eq!(report.days.len(), 10);
        assert_eq!(report.failed_days, 2);
        assert!(!report.batch_failed);

        for (i, day) in report.days.iter().enumerate() {
            let d = i as u32 + 1;
            assert_eq!(day.date, date(d));
            if d == 3 || d == 7 {
                assert!(day.weather.is_none());
            } else {
                assert_eq!(day.weather, Some(sample_for(d)));
            }
        }
    }

    #[tokio::test]
    async fn test_all_failures_flag_the_batch_once() {
        let records = vec![record(1), record(2)];
        let refs: Vec<&IncidentRecord> = records.iter().collect();
        let top_days = vec![
            DailyAggregate {
                date: date(1),
                incident_count: 1,
            },
            DailyAggregate {
                date: date(2),
                incident_count: 1,
            },
        ];

        let fetch =
            |_lat: f64, _lon: f64, _day: NaiveDate| async move { Err(WeatherError::Http(401)) };
        let report = correlate(&top_days, &refs, fetch, &mut NullProgress).await;
        assert_eq!(report.failed_days, 2);
        assert!(report.batch_failed);
        assert!(report.days.iter().all(|d| d.weather.is_none()));
    }

    #[tokio::test]
    async fn test_empty_batch_is_not_a_failure() {
        let fetch = |_lat: f64, _lon: f64, day: NaiveDate| async move {
            Ok(sample_for(day.day0() + 1))
        };
        let report = correlate(&[], &[], fetch, &mut NullProgress).await;
        assert!(report.days.is_empty());
        assert!(!report.batch_failed);
    }

    #[tokio::test]
    async fn test_fetches_use_mean_coordinate_of_the_day() {
        let mut records = vec![record(1), record(1)];
        records[1].latitude = 34.0;
        records[1].longitude = -99.0;
        let refs: Vec<&IncidentRecord> = records.iter().collect();
        let top_days = vec![DailyAggregate {
            date: date(1),
            incident_count: 2,
        }];

        let seen = RefCell::new(Vec::new());
        let fetch = |lat: f64, lon: f64, _day: NaiveDate| {
            seen.borrow_mut().push((lat, lon));
            async move { Ok(sample_for(1)) }
        };
        correlate(&top_days, &refs, fetch, &mut NullProgress).await;
        assert_eq!(seen.into_inner(), vec![(33.0, -98.0)]);
    }

    #[tokio::test]
    async fn test_progress_event_after_every_fetch() {
        let records = vec![record(1), record(2), record(3)];
        let refs: Vec<&IncidentRecord> = records.iter().collect();
        let top_days: Vec<DailyAggregate> = (1..=3)
            .map(|d| DailyAggregate {
                date: date(d),
                incident_count: 1,
            })
            .collect();

        let mut progress = RecordingProgress(Vec::new());
        let fetch = |_lat: f64, _lon: f64, day: NaiveDate| async move {
            if day == date(2) {
                Err(WeatherError::Http(500))
            } else {
                Ok(sample_for(1))
            }
        };
        correlate(&top_days, &refs, fetch, &mut progress).await;

        // Failures still produce a progress event.
        assert_eq!(
            progress.0,
            vec![(1, 3, date(1)), (2, 3, date(2)), (3, 3, date(3))]
        );
    }
}
