//! Weather API client: the single current-hour snapshot.
//!
//! The upstream returns 24 hourly blocks for today; we keep exactly the one
//! whose timestamp matches the current local hour (minute and second
//! truncated). Anything else — embedded error objects, empty forecast days,
//! no matching hour — is an [`UpstreamError`], which the pipeline degrades
//! to "all routes unscored" rather than aborting.

use chrono::{DateTime, Datelike, Local, TimeZone, Timelike};
use reqwest::Client;
use serde::Deserialize;
use std::time::Duration;

use ksi_core::{UpstreamError, WeatherSnapshot};

const SERVICE: &str = "weather";

/// HTTP client for a WeatherAPI-style forecast service.
pub struct WeatherClient {
    client: Client,
    base_url: String,
    api_key: String,
    location: String,
}

#[derive(Debug, Deserialize)]
struct ForecastResponse {
    error: Option<ApiError>,
    forecast: Option<Forecast>,
}

#[derive(Debug, Deserialize)]
struct ApiError {
    message: String,
}

#[derive(Debug, Deserialize)]
struct Forecast {
    #[serde(default)]
    forecastday: Vec<ForecastDay>,
}

#[derive(Debug, Deserialize)]
struct ForecastDay {
    #[serde(default)]
    hour: Vec<HourBlock>,
}

#[derive(Debug, Deserialize)]
struct HourBlock {
    time_epoch: i64,
    temp_c: f64,
    dewpoint_c: f64,
    humidity: f64,
    wind_kph: f64,
    vis_km: f64,
    pressure_mb: f64,
}

impl WeatherClient {
    pub fn new(
        base_url: impl Into<String>,
        api_key: impl Into<String>,
        location: impl Into<String>,
    ) -> Self {
        Self {
            client: Client::builder()
                .timeout(Duration::from_secs(30))
                .build()
                .expect("Failed to create HTTP client"),
            base_url: base_url.into(),
            api_key: api_key.into(),
            location: location.into(),
        }
    }

    /// Fetch today's forecast and extract the current-hour observation.
    pub async fn fetch_current_snapshot(&self) -> Result<WeatherSnapshot, UpstreamError> {
        let url = format!("{}/v1/forecast.json", self.base_url);
        let response = self
            .client
            .get(&url)
            .query(&[
                ("key", self.api_key.as_str()),
                ("q", self.location.as_str()),
                ("days", "1"),
                ("aqi", "no"),
                ("alerts", "no"),
            ])
            .send()
            .await
            .map_err(|err| UpstreamError::Request(err.to_string()))?;

        let payload: ForecastResponse = response
            .json()
            .await
            .map_err(|err| UpstreamError::Request(err.to_string()))?;

        // The API embeds errors in an otherwise 200 OK body.
        if let Some(error) = payload.error {
            return Err(UpstreamError::Status {
                service: SERVICE,
                status: error.message,
            });
        }

        let hours = payload
            .forecast
            .and_then(|f| f.forecastday.into_iter().next())
            .map(|day| day.hour)
            .filter(|hours| !hours.is_empty())
            .ok_or(UpstreamError::MalformedResponse {
                service: SERVICE,
                field: "forecast.forecastday[0].hour",
            })?;

        let now = current_hour(Local::now());
        let block = hours
            .into_iter()
            .find(|h| {
                Local
                    .timestamp_opt(h.time_epoch, 0)
                    .single()
                    .is_some_and(|ts| current_hour(ts) == now)
            })
            .ok_or_else(|| UpstreamError::NoCurrentHour(now.format("%Y-%m-%d %H:00").to_string()))?;

        Ok(snapshot_from_block(block, now))
    }
}

fn current_hour(ts: DateTime<Local>) -> DateTime<Local> {
    ts.with_minute(0)
        .and_then(|t| t.with_second(0))
        .and_then(|t| t.with_nanosecond(0))
        .unwrap_or(ts)
}

fn snapshot_from_block(block: HourBlock, observed_at: DateTime<Local>) -> WeatherSnapshot {
    WeatherSnapshot {
        temp_c: block.temp_c,
        dewpoint_c: block.dewpoint_c,
        humidity: block.humidity,
        wind_kph: block.wind_kph,
        vis_km: block.vis_km,
        pressure_mb: block.pressure_mb,
        month: observed_at.month(),
        day: observed_at.day(),
        hour: observed_at.hour(),
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn snapshot_takes_calendar_fields_from_observation_time() {
        let observed = Local.with_ymd_and_hms(2026, 1, 14, 18, 0, 0).unwrap();
        let block = HourBlock {
            time_epoch: observed.timestamp(),
            temp_c: -3.5,
            dewpoint_c: -7.0,
            humidity: 77.0,
            wind_kph: 24.0,
            vis_km: 9.7,
            pressure_mb: 1016.0,
        };
        let snapshot = snapshot_from_block(block, observed);
        assert_eq!(snapshot.month, 1);
        assert_eq!(snapshot.day, 14);
        assert_eq!(snapshot.hour, 18);
        assert_eq!(snapshot.temp_c, -3.5);
    }

    #[test]
    fn current_hour_truncates_minutes_and_seconds() {
        let ts = Local.with_ymd_and_hms(2026, 8, 30, 13, 42, 17).unwrap();
        let truncated = current_hour(ts);
        assert_eq!(truncated.minute(), 0);
        assert_eq!(truncated.second(), 0);
        assert_eq!(truncated.hour(), 13);
    }
}
