//! OpenWeatherMap day-summary client.
//!
//! Fetches the observed daily maximum temperature and total precipitation
//! for one (coordinate, date). The base URL is injectable so tests can
//! point the client at a mock server.
//! See: https://openweathermap.org/api/one-call-3#history_daily_aggregation

use chrono::NaiveDate;
use serde::Deserialize;
use std::collections::HashMap;
use std::sync::RwLock;

use crate::data::models::WeatherSample;
use crate::helpers::round_coordinate;

/// Production endpoint root.
pub const DEFAULT_BASE_URL: &str = "https://api.openweathermap.org";

#[derive(Debug, thiserror::Error)]
pub enum WeatherError {
    #[error("request failed: {0}")]
    Request(#[from] reqwest::Error),

    #[error("weather service returned HTTP {0}")]
    Http(u16),

    #[error("day summary response missing field '{0}'")]
    MissingField(&'static str),
}

/// Client for the day-summary endpoint.
#[derive(Debug, Clone)]
pub struct WeatherClient {
    client: reqwest::Client,
    base_url: String,
    api_key: String,
}

// --- day-summary JSON response types ---

#[derive(Debug, Deserialize)]
struct DaySummaryResponse {
    temperature: Option<TemperatureBlock>,
    precipitation: Option<PrecipitationBlock>,
}

#[derive(Debug, Deserialize)]
struct TemperatureBlock {
    max: Option<f64>,
}

#[derive(Debug, Deserialize)]
struct PrecipitationBlock {
    total: Option<f64>,
}

impl WeatherClient {
    pub fn new(base_url: &str, api_key: &str) -> Self {
        let client = reqwest::Client::builder()
            .build()
            .expect("Failed to build HTTP client");
        Self {
            client,
            base_url: base_url.trim_end_matches('/').to_string(),
            api_key: api_key.to_string(),
        }
    }

    /// Fetch the day summary for one coordinate and date.
    ///
    /// Any failure mode (transport, non-2xx, missing fields) is a single
    /// `WeatherError`; the caller decides whether that sinks the batch.
    pub async fn fetch_day_summary(
        &self,
        lat: f64,
        lon: f64,
        date: NaiveDate,
    ) -> Result<WeatherSample, WeatherError> {
        // Coordinates are rounded to 4 decimal places so the request and
        // the fetch-cache key agree on identity.
        let url = format!(
            "{}/data/3.0/onecall/day_summary?lat={:.4}&lon={:.4}&date={}&units=metric&appid={}",
            self.base_url,
            round_coordinate(lat),
            round_coordinate(lon),
            date.format("%Y-%m-%d"),
            self.api_key
        );

        let response = self.client.get(&url).send().await?;
        if !response.status().is_success() {
            return Err(WeatherError::Http(response.status().as_u16()));
        }

        let body: DaySummaryResponse = response.json().await?;
        let max_temp_c = body
            .temperature
            .and_then(|t| t.max)
            .ok_or(WeatherError::MissingField("temperature.max"))?;
        let total_precipitation_mm = body
            .precipitation
            .and_then(|p| p.total)
            .ok_or(WeatherError::MissingField("precipitation.total"))?;

        Ok(WeatherSample {
            max_temp_c,
            total_precipitation_mm,
        })
    }
}

/// Fetch-cache key: coordinate at 4 decimal places plus the date.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct WeatherKey {
    lat_e4: i64,
    lon_e4: i64,
    date: NaiveDate,
}

impl WeatherKey {
    pub fn new(lat: f64, lon: f64, date: NaiveDate) -> Self {
        Self {
            lat_e4: (lat * 10_000.0).round() as i64,
            lon_e4: (lon * 10_000.0).round() as i64,
            date,
        }
    }
}

/// In-memory cache of completed day-summary fetches. Failures are never
/// cached; a failed day is retried on the next batch that needs it.
#[derive(Debug, Default)]
pub struct WeatherCache {
    entries: RwLock<HashMap<WeatherKey, WeatherSample>>,
}

impl WeatherCache {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn get(&self, key: &WeatherKey) -> Option<WeatherSample> {
        self.entries
            .read()
            .unwrap_or_else(|e| e.into_inner())
            .get(key)
            .copied()
    }

    pub fn insert(&self, key: WeatherKey, sample: WeatherSample) {
        self.entries
            .write()
            .unwrap_or_else(|e| e.into_inner())
            .insert(key, sample);
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use wiremock::matchers::{method, path, query_param};
    use wiremock::{Mock, MockServer, ResponseTemplate};

    fn day_summary_body(max: f64, total: f64) -> serde_json::Value {
        serde_json::json!({
            "lat": 32.7767,
            "lon": -96.797,
            "date": "2024-03-01",
            "units": "metric",
            "temperature": { "min": 8.1, "max": max, "afternoon": max - 2.0 },
            "precipitation": { "total": total }
        })
    }

    #[tokio::test]
    async fn test_fetch_day_summary_success() {
        let server = MockServer::start().await;
        Mock::given(method("GET"))
            .and(path("/data/3.0/onecall/day_summary"))
            .and(query_param("lat", "32.7767"))
            .and(query_param("date", "2024-03-01"))
            .and(query_param("appid", "test-key"))
            .respond_with(ResponseTemplate::new(200).set_body_json(day_summary_body(21.4, 0.6)))
            .mount(&server)
            .await;

        let client = WeatherClient::new(&server.uri(), "test-key");
        let sample = client
            .fetch_day_summary(32.7767, -96.797, NaiveDate::from_ymd_opt(2024, 3, 1).unwrap())
            .await
            .unwrap();
        assert_eq!(sample.max_temp_c, 21.4);
        assert_eq!(sample.total_precipitation_mm, 0.6);
    }

    #[tokio::test]
    async fn test_fetch_day_summary_http_error() {
        let server = MockServer::start().await;
        Mock::given(method("GET"))
            .respond_with(ResponseTemplate::new(500))
            .mount(&server)
            .await;

        let client = WeatherClient::new(&server.uri(), "test-key");
        let err = client
            .fetch_day_summary(32.7767, -96.797, NaiveDate::from_ymd_opt(2024, 3, 1).unwrap())
            .await
            .unwrap_err();
        assert!(matches!(err, WeatherError::Http(500)));
    }

    #[tokio::test]
    async fn test_fetch_day_summary_missing_temperature() {
        let server = MockServer::start().await;
        Mock::given(method("GET"))
            .respond_with(ResponseTemplate::new(200).set_body_json(serde_json::json!({
                "precipitation": { "total": 1.2 }
            })))
            .mount(&server)
            .await;

        let client = WeatherClient::new(&server.uri(), "test-key");
        let err = client
            .fetch_day_summary(32.7767, -96.797, NaiveDate::from_ymd_opt(2024, 3, 1).unwrap())
            .await
            .unwrap_err();
        assert!(matches!(err, WeatherError::MissingField("temperature.max")));
    }

    #[test]
    fn test_weather_key_identity_at_4dp() {
        let date = NaiveDate::from_ymd_opt(2024, 3, 1).unwrap();
        // Sub-4dp noise maps to the same key.
        assert_eq!(
            WeatherKey::new(32.776_700_1, -96.797_000_2, date),
            WeatherKey::new(32.7767, -96.797, date)
        );
        assert_ne!(
            WeatherKey::new(32.7767, -96.797, date),
            WeatherKey::new(32.7768, -96.797, date)
        );
    }

    #[test]
    fn test_weather_cache_roundtrip() {
        let cache = WeatherCache::new();
        let key = WeatherKey::new(32.7767, -96.797, NaiveDate::from_ymd_opt(2024, 3, 1).unwrap());
        assert!(cache.get(&key).is_none());

        let sample = WeatherSample {
            max_temp_c: 21.4,
            total_precipitation_mm: 0.6,
        };
        cache.insert(key, sample);
        assert_eq!(cache.get(&key), Some(sample));
    }
}
