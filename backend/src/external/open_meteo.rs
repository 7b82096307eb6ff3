//! Open-Meteo API client for next-day precipitation forecasts
//!
//! Integrates with the free Open-Meteo forecast API (no API key required)

use chrono::NaiveDate;
use reqwest::Client;
use serde::{Deserialize, Serialize};
use shared::GpsCoordinates;
use std::time::Duration;

use super::ForecastSource;
use crate::config::WeatherConfig;
use crate::error::{AppError, AppResult};

/// Open-Meteo API client
#[derive(Clone)]
pub struct OpenMeteoClient {
    client: Client,
    base_url: String,
}

/// Daily precipitation total for the first forecast day
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct PrecipitationForecast {
    pub location: GpsCoordinates,
    pub date: Option<NaiveDate>,
    pub precipitation_mm: f64,
    pub timezone: Option<String>,
}

/// Open-Meteo API response for a daily forecast
#[derive(Debug, Deserialize)]
struct OMForecastResponse {
    latitude: Option<f64>,
    longitude: Option<f64>,
    timezone: Option<String>,
    daily: Option<OMDaily>,
}

#[derive(Debug, Deserialize)]
struct OMDaily {
    #[serde(default)]
    time: Vec<String>,
    #[serde(default)]
    precipitation_sum: Vec<Option<f64>>,
}

/// Open-Meteo error body, returned with 4xx statuses
#[derive(Debug, Deserialize)]
struct OMErrorResponse {
    reason: String,
}

impl OpenMeteoClient {
    /// Create a client for the configured endpoint
    pub fn new(config: &WeatherConfig) -> AppResult<Self> {
        Self::with_base_url(config.api_endpoint.clone(), config.timeout())
    }

    /// Create a client with custom base URL (for testing)
    pub fn with_base_url(base_url: String, timeout: Duration) -> AppResult<Self> {
        let client = Client::builder()
            .timeout(timeout)
            .build()
            .map_err(|e| AppError::Internal(format!("Failed to build HTTP client: {}", e)))?;

        Ok(Self { client, base_url })
    }

    /// Fetch the precipitation sum for the next forecast day
    pub async fn get_daily_precipitation(
        &self,
        location: GpsCoordinates,
    ) -> AppResult<PrecipitationForecast> {
        tracing::debug!(
            latitude = location.latitude,
            longitude = location.longitude,
            "Requesting precipitation forecast"
        );

        let response = self
            .client
            .get(&self.base_url)
            .query(&[
                ("latitude", location.latitude.to_string()),
                ("longitude", location.longitude.to_string()),
                ("daily", "precipitation_sum".to_string()),
                ("timezone", "auto".to_string()),
                ("forecast_days", "1".to_string()),
            ])
            .send()
            .await
            .map_err(|e| AppError::WeatherServiceUnavailable(e.to_string()))?;

        if !response.status().is_success() {
            let status = response.status();
            let body = response.text().await.unwrap_or_default();
            let reason = serde_json::from_str::<OMErrorResponse>(&body)
                .map(|e| e.reason)
                .unwrap_or(body);
            return Err(AppError::WeatherServiceUnavailable(format!(
                "Weather API error: {} - {}",
                status, reason
            )));
        }

        let body = response
            .text()
            .await
            .map_err(|e| AppError::WeatherServiceUnavailable(e.to_string()))?;

        parse_forecast(&body, location)
    }
}

impl ForecastSource for OpenMeteoClient {
    async fn daily_precipitation(&self, location: GpsCoordinates) -> AppResult<PrecipitationForecast> {
        self.get_daily_precipitation(location).await
    }
}

/// Extract the first day's precipitation from a forecast body
pub fn parse_forecast(body: &str, requested: GpsCoordinates) -> AppResult<PrecipitationForecast> {
    let data: OMForecastResponse = serde_json::from_str(body)
        .map_err(|e| AppError::MalformedForecast(format!("Failed to parse forecast response: {}", e)))?;

    let daily = data
        .daily
        .ok_or_else(|| AppError::MalformedForecast("missing 'daily' block".to_string()))?;

    let precipitation_mm = daily
        .precipitation_sum
        .first()
        .copied()
        .ok_or_else(|| AppError::MalformedForecast("empty 'precipitation_sum'".to_string()))?
        .ok_or_else(|| AppError::MalformedForecast("null precipitation for first day".to_string()))?;

    let date = daily
        .time
        .first()
        .and_then(|t| NaiveDate::parse_from_str(t, "%Y-%m-%d").ok());

    let location = match (data.latitude, data.longitude) {
        (Some(lat), Some(lon)) => GpsCoordinates::new(lat, lon),
        _ => requested,
    };

    Ok(PrecipitationForecast {
        location,
        date,
        precipitation_mm,
        timezone: data.timezone,
    })
}
