//! CSV ingestion and row normalization.
//!
//! `load_dataset` reads a NERIS-style incident extract, resolves the header,
//! and converts every raw row into an [`IncidentRecord`] exactly once. A
//! missing required column or an unreadable file fails the whole load; a bad
//! individual row is dropped and counted, never partially kept.

use std::fs;
use std::path::Path;

use chrono::{DateTime, NaiveDate, NaiveDateTime, TimeZone, Utc};
use csv::StringRecord;
use sha2::{Digest, Sha256};

use crate::data::models::{IncidentRecord, TYPE_PATH_SEPARATOR, UNKNOWN};
use crate::helpers::title_case;
use crate::services::landmask::LandClassifier;

/// Timestamp formats accepted besides RFC 3339. All are read as UTC.
const TIMESTAMP_FORMATS: &[&str] = &[
    "%Y-%m-%d %H:%M:%S",
    "%Y-%m-%dT%H:%M:%S",
    "%Y-%m-%d %H:%M",
    "%m/%d/%Y %H:%M:%S",
];

#[derive(Debug, thiserror::Error)]
pub enum LoadError {
    #[error("failed to read dataset file: {0}")]
    Io(#[from] std::io::Error),

    #[error("malformed CSV header: {0}")]
    Csv(#[from] csv::Error),

    #[error("required column '{0}' is missing from the dataset header")]
    MissingColumn(String),
}

/// Knobs for row normalization.
#[derive(Debug, Clone, Copy, Default)]
pub struct NormalizeOptions {
    /// Keep only rows with a strictly positive mission duration and a
    /// parseable response time. Used by the duration-dependent views.
    pub require_positive_durations: bool,
}

/// A fully normalized dataset plus its load provenance.
#[derive(Debug, Clone)]
pub struct Dataset {
    pub records: Vec<IncidentRecord>,
    /// Raw rows rejected during normalization.
    pub dropped_rows: usize,
    /// SHA-256 of the raw file content, hex encoded.
    pub fingerprint: String,
    pub loaded_at: DateTime<Utc>,
}

impl Dataset {
    /// Earliest and latest alarm day in the dataset, `None` when empty.
    pub fn date_span(&self) -> Option<(NaiveDate, NaiveDate)> {
        let min = self.records.iter().map(|r| r.date).min()?;
        let max = self.records.iter().map(|r| r.date).max()?;
        Some((min, max))
    }
}

/// Header indexes resolved once per load. Required columns are plain
/// indexes, everything else is optional and absent columns just mean
/// default values downstream. Optional columns go by their NERIS extract
/// names, with shorter aliases accepted.
struct Columns {
    alarm_datetime: usize,
    state: usize,
    city: usize,
    latitude: usize,
    longitude: usize,
    incident_type: usize,
    last_unit_cleared: Option<usize>,
    response_time_minutes: Option<usize>,
    incident_category: Option<usize>,
    incident_description: Option<usize>,
    transport_disposition: Option<usize>,
    patient_status: Option<usize>,
    fire_suppression_effectiveness: Option<usize>,
    animals_rescued: Option<usize>,
    units_responded: Option<usize>,
    has_smoke_alarm: Option<usize>,
    has_fire_alarm: Option<usize>,
    has_other_alarm: Option<usize>,
}

impl Columns {
    fn resolve(headers: &StringRecord) -> Result<Self, LoadError> {
        let index = |name: &str| {
            headers
                .iter()
                .position(|h| h.trim().eq_ignore_ascii_case(name))
        };
        let required = |name: &str| index(name).ok_or_else(|| LoadError::MissingColumn(name.to_string()));
        let aliased = |names: &[&str]| names.iter().copied().find_map(index);

        Ok(Self {
            alarm_datetime: required("alarm_datetime")?,
            state: required("state")?,
            city: required("city")?,
            latitude: required("latitude")?,
            longitude: required("longitude")?,
            incident_type: required("incident_type")?,
            last_unit_cleared: aliased(&["last_unit_cleared_datetime", "cleared_datetime"]),
            response_time_minutes: aliased(&["response_time_minutes", "response_time"]),
            incident_category: index("incident_category"),
            incident_description: index("incident_description"),
            transport_disposition: index("transport_disposition"),
            patient_status: index("patient_status"),
            fire_suppression_effectiveness: index("fire_suppression_effectiveness"),
            animals_rescued: index("animals_rescued"),
            units_responded: index("units_responded"),
            has_smoke_alarm: aliased(&["has_smoke_alarm", "smoke_alarm_present"]),
            has_fire_alarm: aliased(&["has_fire_alarm", "fire_alarm_present"]),
            has_other_alarm: aliased(&["has_other_alarm", "other_alarm_present"]),
        })
    }
}

/// Hex SHA-256 of raw dataset bytes. The dataset cache keys on this.
pub fn fingerprint(bytes: &[u8]) -> String {
    hex::encode(Sha256::digest(bytes))
}

/// Load and normalize a dataset file.
pub fn load_dataset(
    path: &Path,
    classifier: &dyn LandClassifier,
    options: NormalizeOptions,
) -> Result<Dataset, LoadError> {
    let bytes = fs::read(path)?;
    let text = String::from_utf8_lossy(&bytes);
    let (records, dropped_rows) = parse_dataset(&text, classifier, options)?;
    tracing::info!(
        path = %path.display(),
        records = records.len(),
        dropped = dropped_rows,
        "dataset loaded"
    );
    Ok(Dataset {
        records,
        dropped_rows,
        fingerprint: fingerprint(&bytes),
        loaded_at: Utc::now(),
    })
}

/// Parse and normalize CSV text already read into memory.
///
/// Returns the surviving records plus the number of rows dropped. Ragged
/// rows count as drops; only a broken header fails the parse.
pub fn parse_dataset(
    csv_text: &str,
    classifier: &dyn LandClassifier,
    options: NormalizeOptions,
) -> Result<(Vec<IncidentRecord>, usize), LoadError> {
    let mut reader = csv::ReaderBuilder::new()
        .trim(csv::Trim::All)
        .from_reader(csv_text.as_bytes());
    let columns = Columns::resolve(reader.headers()?)?;

    let mut records = Vec::new();
    let mut dropped = 0usize;
    for row in reader.records() {
        let Ok(row) = row else {
            dropped += 1;
            continue;
        };
        match normalize_row(&row, &columns, classifier, options) {
            Some(record) => records.push(record),
            None => dropped += 1,
        }
    }
    Ok((records, dropped))
}

fn parse_timestamp(raw: &str) -> Option<DateTime<Utc>> {
    let raw = raw.trim();
    if raw.is_empty() {
        return None;
    }
    if let Ok(dt) = DateTime::parse_from_rfc3339(raw) {
        return Some(dt.with_timezone(&Utc));
    }
    for fmt in TIMESTAMP_FORMATS {
        if let Ok(naive) = NaiveDateTime::parse_from_str(raw, fmt) {
            return Some(Utc.from_utc_datetime(&naive));
        }
    }
    None
}

/// Normalize one raw row. `None` means the row is dropped.
fn normalize_row(
    row: &StringRecord,
    columns: &Columns,
    classifier: &dyn LandClassifier,
    options: NormalizeOptions,
) -> Option<IncidentRecord> {
    let field = |idx: usize| row.get(idx).map(str::trim).unwrap_or("");
    let optional = |idx: Option<usize>| idx.map(field).filter(|v| !v.is_empty());

    let alarm_time = parse_timestamp(field(columns.alarm_datetime))?;

    let latitude = field(columns.latitude).parse::<f64>().ok()?;
    let longitude = field(columns.longitude).parse::<f64>().ok()?;
    if !(-90.0..=90.0).contains(&latitude) || !(-180.0..=180.0).contains(&longitude) {
        return None;
    }

    let state_raw = field(columns.state);
    let city_raw = field(columns.city);
    if state_raw.is_empty() || city_raw.is_empty() {
        return None;
    }

    let incident_type_path: Vec<String> = field(columns.incident_type)
        .split(TYPE_PATH_SEPARATOR)
        .map(|segment| segment.trim().to_string())
        .collect();
    let specific_incident_type = incident_type_path
        .last()
        .filter(|segment| !segment.is_empty())?
        .clone();

    let cleared_time = optional(columns.last_unit_cleared).and_then(parse_timestamp);
    let mission_duration_minutes = cleared_time
        .map(|cleared| (cleared - alarm_time).num_seconds() as f64 / 60.0)
        .filter(|minutes| *minutes > 0.0);
    let response_time_minutes = optional(columns.response_time_minutes)
        .and_then(|v| v.parse::<f64>().ok())
        .filter(|minutes| minutes.is_finite() && *minutes >= 0.0);

    if options.require_positive_durations
        && (mission_duration_minutes.is_none() || response_time_minutes.is_none())
    {
        return None;
    }

    let text_or_unknown =
        |idx: Option<usize>| optional(idx).map_or_else(|| UNKNOWN.to_string(), str::to_string);
    let flag = |idx: Option<usize>| {
        matches!(
            optional(idx).map(str::to_ascii_lowercase).as_deref(),
            Some("true" | "yes" | "1")
        )
    };
    let count = |idx: Option<usize>| {
        optional(idx)
            .and_then(|v| v.parse::<u32>().ok())
            .unwrap_or(0)
    };

    Some(IncidentRecord {
        alarm_time,
        date: alarm_time.date_naive(),
        cleared_time,
        mission_duration_minutes,
        response_time_minutes,
        latitude,
        longitude,
        on_land: classifier.is_land(latitude, longitude),
        incident_type_path,
        specific_incident_type,
        incident_category: text_or_unknown(columns.incident_category),
        incident_description: text_or_unknown(columns.incident_description),
        state: state_raw.to_ascii_uppercase(),
        city: title_case(city_raw),
        transport_disposition: text_or_unknown(columns.transport_disposition),
        patient_status: text_or_unknown(columns.patient_status),
        fire_suppression_effectiveness: text_or_unknown(columns.fire_suppression_effectiveness),
        animals_rescued: count(columns.animals_rescued),
        units_responded: count(columns.units_responded),
        has_smoke_alarm: flag(columns.has_smoke_alarm),
        has_fire_alarm: flag(columns.has_fire_alarm),
        has_other_alarm: flag(columns.has_other_alarm),
    })
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::services::landmask::CoarseLandMask;

    const MINIMAL_CSV: &str = "\
alarm_datetime,cleared_datetime,state,city,latitude,longitude,incident_type,incident_description,animals_rescued,smoke_alarm_present
2024-03-01 08:15:00,2024-03-01 09:00:00,tx,fort worth,32.7555,-97.3308,FIRE||STRUCTURE FIRE||COOKING FIRE,Cooking fire confined,0,true
2024-03-01T22:40:00,,TX,Austin,30.2672,-97.7431,MEDICAL||EMS CALL,Medical assist,2,
";

    const BAD_ROWS_CSV: &str = "\
alarm_datetime,state,city,latitude,longitude,incident_type
2024-03-01 08:15:00,TX,Dallas,32.7767,-96.7970,FIRE||GRASS FIRE
not-a-date,TX,Dallas,32.7767,-96.7970,FIRE||GRASS FIRE
2024-03-01 09:00:00,TX,Dallas,999.0,-96.7970,FIRE||GRASS FIRE
2024-03-01 10:00:00,TX,,32.7767,-96.7970,FIRE||GRASS FIRE
2024-03-01 11:00:00,TX,Dallas,32.7767,-96.7970,FIRE||
";

    fn parse(text: &str, options: NormalizeOptions) -> (Vec<IncidentRecord>, usize) {
        parse_dataset(text, &CoarseLandMask, options).unwrap()
    }

    #[test]
    fn test_parse_minimal_csv() {
        let (records, dropped) = parse(MINIMAL_CSV, NormalizeOptions::default());
        assert_eq!(records.len(), 2);
        assert_eq!(dropped, 0);

        let first = &records[0];
        assert_eq!(first.state, "TX");
        assert_eq!(first.city, "Fort Worth");
        assert_eq!(first.specific_incident_type, "COOKING FIRE");
        assert_eq!(
            first.incident_type_path,
            vec!["FIRE", "STRUCTURE FIRE", "COOKING FIRE"]
        );
        assert_eq!(first.mission_duration_minutes, Some(45.0));
        assert!(first.has_smoke_alarm);
        assert!(first.on_land);
        // Columns absent from the header fall back to defaults.
        assert_eq!(first.incident_category, UNKNOWN);
        assert_eq!(first.units_responded, 0);
    }

    #[test]
    fn test_date_is_day_of_alarm_time() {
        let (records, _) = parse(MINIMAL_CSV, NormalizeOptions::default());
        assert_eq!(
            records[1].date,
            NaiveDate::from_ymd_opt(2024, 3, 1).unwrap()
        );
        assert!(records[1].cleared_time.is_none());
        assert!(records[1].mission_duration_minutes.is_none());
        assert_eq!(records[1].animals_rescued, 2);
    }

    #[test]
    fn test_bad_rows_dropped_and_counted() {
        // Unparseable date, out-of-range latitude, empty city, empty
        // terminal type segment. Only the first row survives.
        let (records, dropped) = parse(BAD_ROWS_CSV, NormalizeOptions::default());
        assert_eq!(records.len(), 1);
        assert_eq!(dropped, 4);
    }

    #[test]
    fn test_missing_required_column_is_fatal() {
        let csv_text = "alarm_datetime,state,city,latitude,incident_type\n\
                        2024-03-01 08:15:00,TX,Dallas,32.7767,FIRE||GRASS FIRE\n";
        let err = parse_dataset(csv_text, &CoarseLandMask, NormalizeOptions::default())
            .unwrap_err();
        assert!(matches!(err, LoadError::MissingColumn(col) if col == "longitude"));
    }

    #[test]
    fn test_strict_durations_drop_rows_without_positive_duration() {
        let csv_text = "\
alarm_datetime,cleared_datetime,response_time,state,city,latitude,longitude,incident_type
2024-03-01 08:00:00,2024-03-01 08:30:00,4.5,TX,Dallas,32.7767,-96.7970,FIRE||GRASS FIRE
2024-03-01 09:00:00,2024-03-01 08:30:00,4.5,TX,Dallas,32.7767,-96.7970,FIRE||GRASS FIRE
2024-03-01 10:00:00,,4.5,TX,Dallas,32.7767,-96.7970,FIRE||GRASS FIRE
2024-03-01 11:00:00,2024-03-01 11:20:00,,TX,Dallas,32.7767,-96.7970,FIRE||GRASS FIRE
";
        let strict = NormalizeOptions {
            require_positive_durations: true,
        };
        let (records, dropped) = parse(csv_text, strict);
        assert_eq!(records.len(), 1);
        assert_eq!(dropped, 3);
        assert_eq!(records[0].mission_duration_minutes, Some(30.0));

        // The same rows survive in the default mode, minus the derived
        // duration where cleared precedes alarm.
        let (lenient, dropped) = parse(csv_text, NormalizeOptions::default());
        assert_eq!(lenient.len(), 4);
        assert_eq!(dropped, 0);
        assert!(lenient[1].mission_duration_minutes.is_none());
    }

    #[test]
    fn test_extract_column_names_resolve() {
        // The real extract's own header spelling: last_unit_cleared_datetime,
        // response_time_minutes and the has_* alarm flags all bind.
        let csv_text = "\
alarm_datetime,last_unit_cleared_datetime,response_time_minutes,state,city,latitude,longitude,incident_type,has_smoke_alarm,has_fire_alarm,has_other_alarm
2024-03-01 08:00:00,2024-03-01 08:45:00,5.2,TX,Dallas,32.7767,-96.7970,FIRE||GRASS FIRE,true,false,yes
";
        let (records, dropped) = parse(csv_text, NormalizeOptions::default());
        assert_eq!(dropped, 0);
        let record = &records[0];
        assert!(record.cleared_time.is_some());
        assert_eq!(record.mission_duration_minutes, Some(45.0));
        assert_eq!(record.response_time_minutes, Some(5.2));
        assert!(record.has_smoke_alarm);
        assert!(!record.has_fire_alarm);
        assert!(record.has_other_alarm);

        // Strict mode keeps the fully populated row under these names too.
        let strict = NormalizeOptions {
            require_positive_durations: true,
        };
        let (records, dropped) = parse(csv_text, strict);
        assert_eq!(records.len(), 1);
        assert_eq!(dropped, 0);
    }

    #[test]
    fn test_timestamp_formats_normalize_to_utc() {
        assert_eq!(
            parse_timestamp("2024-03-01T08:15:00+02:00").unwrap(),
            Utc.with_ymd_and_hms(2024, 3, 1, 6, 15, 0).unwrap()
        );
        assert_eq!(
            parse_timestamp("03/01/2024 08:15:00").unwrap(),
            Utc.with_ymd_and_hms(2024, 3, 1, 8, 15, 0).unwrap()
        );
        assert!(parse_timestamp("yesterday").is_none());
        assert!(parse_timestamp("").is_none());
    }

    #[test]
    fn test_fingerprint_tracks_content() {
        let a = fingerprint(b"alpha");
        let b = fingerprint(b"beta");
        assert_ne!(a, b);
        assert_eq!(a, fingerprint(b"alpha"));
        assert_eq!(a.len(), 64);
    }

    #[test]
    fn test_load_dataset_reports_io_error() {
        let err = load_dataset(
            Path::new("/nonexistent/incidents.csv"),
            &CoarseLandMask,
            NormalizeOptions::default(),
        )
        .unwrap_err();
        assert!(matches!(err, LoadError::Io(_)));
    }

    #[test]
    fn test_load_dataset_from_file() {
        use std::io::Write;

        let mut file = tempfile::NamedTempFile::new().unwrap();
        file.write_all(MINIMAL_CSV.as_bytes()).unwrap();
        let dataset = load_dataset(
            file.path(),
            &CoarseLandMask,
            NormalizeOptions::default(),
        )
        .unwrap();
        assert_eq!(dataset.records.len(), 2);
        assert_eq!(dataset.dropped_rows, 0);
        assert_eq!(dataset.fingerprint, fingerprint(MINIMAL_CSV.as_bytes()));
        let (min, max) = dataset.date_span().unwrap();
        assert_eq!(min, max);
    }
}
