use crate::config::Config;
use crate::datasources::WeatherSource;
use crate::error::{Result, WeatherdeckError};
use crate::models::{now_ms, GeocodingCandidate, WeatherCondition, WeatherSnapshot};
use async_trait::async_trait;
use serde::Deserialize;
use std::time::Duration;
use tracing::debug;

/// How many hourly samples the min/max window spans.
const MINMAX_WINDOW_HOURS: usize = 24;

/// HTTP client for the Open-Meteo geocoding and forecast services.
#[derive(Debug, Clone)]
pub struct OpenMeteoClient {
    client: reqwest::Client,
    config: Config,
}

// Open-Meteo API response structures

#[derive(Debug, Deserialize)]
struct GeocodingResponse {
    #[serde(default)]
    results: Option<Vec<GeocodingCandidate>>,
}

#[derive(Debug, Deserialize)]
struct ForecastResponse {
    latitude: f64,
    longitude: f64,
    hourly: HourlySeries,
}

/// Index-aligned hourly arrays; entries may be null.
#[derive(Debug, Deserialize)]
struct HourlySeries {
    #[serde(rename = "temperature_2m", default)]
    temperature: Vec<Option<f64>>,
    #[serde(rename = "relative_humidity_2m", default)]
    humidity: Vec<Option<i64>>,
    #[serde(default)]
    rain: Vec<Option<f64>>,
    #[serde(rename = "wind_speed_10m", default)]
    wind_speed: Vec<Option<f64>>,
}

impl OpenMeteoClient {
    pub fn new(config: &Config) -> Result<Self> {
        let client = reqwest::Client::builder()
            .timeout(Duration::from_secs(config.http_timeout_secs))
            .build()
            .map_err(|e| WeatherdeckError::Network(format!("Failed to build HTTP client: {}", e)))?;

        Ok(Self {
            client,
            config: config.clone(),
        })
    }

    async fn get_body(&self, url: &str, query: &[(&str, String)], what: &str) -> Result<String> {
        let response = self
            .client
            .get(url)
            .query(query)
            .send()
            .await
            .map_err(|e| WeatherdeckError::Network(format!("{}: {}", what, e)))?;

        let status = response.status();
        let body = response
            .text()
            .await
            .map_err(|e| WeatherdeckError::Network(format!("{} body: {}", what, e)))?;

        if !status.is_success() {
            return Err(WeatherdeckError::Network(format!(
                "{} returned {}: {}",
                what,
                status,
                truncate_body(&body),
            )));
        }

        Ok(body)
    }

    fn project_snapshot(city_name: &str, response: ForecastResponse) -> WeatherSnapshot {
        let hourly = response.hourly;

        // Index 0 of each series is "now"; nulls count as zero
        let current_temp = first_or_zero(&hourly.temperature);
        let current_humidity = hourly.humidity.first().copied().flatten().unwrap_or(0);
        let current_rain = first_or_zero(&hourly.rain);
        let current_wind = first_or_zero(&hourly.wind_speed);

        // Min/max over the next 24 hourly samples, nulls filtered out
        let window: Vec<f64> = hourly
            .temperature
            .iter()
            .take(MINMAX_WINDOW_HOURS)
            .filter_map(|t| *t)
            .collect();
        let min_temp = window
            .iter()
            .copied()
            .min_by(|a, b| a.partial_cmp(b).unwrap_or(std::cmp::Ordering::Equal))
            .unwrap_or(current_temp);
        let max_temp = window
            .iter()
            .copied()
            .max_by(|a, b| a.partial_cmp(b).unwrap_or(std::cmp::Ordering::Equal))
            .unwrap_or(current_temp);

        let condition = WeatherCondition::from_observation(current_rain, current_humidity);

        WeatherSnapshot {
            city_name: city_name.to_string(),
            latitude: response.latitude,
            longitude: response.longitude,
            current_temperature: current_temp,
            min_temperature: min_temp,
            max_temperature: max_temp,
            humidity: current_humidity,
            wind_speed: current_wind,
            condition,
            captured_at: now_ms(),
        }
    }
}

#[async_trait]
impl WeatherSource for OpenMeteoClient {
    async fn search_city(&self, name: &str) -> Result<Vec<GeocodingCandidate>> {
        let url = format!("{}/v1/search", self.config.geocoding_base_url);
        let query = [
            ("name", name.to_string()),
            ("count", self.config.search_count.to_string()),
            ("language", self.config.language.clone()),
            ("format", "json".to_string()),
        ];

        let body = self.get_body(&url, &query, "Geocoding request").await?;

        let parsed: GeocodingResponse = serde_json::from_str(&body).map_err(|e| {
            WeatherdeckError::Protocol(format!("Failed to parse geocoding response: {}", e))
        })?;

        match parsed.results {
            Some(results) if !results.is_empty() => {
                debug!(city = %name, hits = results.len(), "geocoding search succeeded");
                Ok(results)
            }
            _ => Err(WeatherdeckError::NotFound(format!(
                "No city found for: {}",
                name
            ))),
        }
    }

    async fn fetch_weather(
        &self,
        city_name: &str,
        latitude: f64,
        longitude: f64,
    ) -> Result<WeatherSnapshot> {
        let url = format!("{}/v1/forecast", self.config.forecast_base_url);
        let query = [
            ("latitude", latitude.to_string()),
            ("longitude", longitude.to_string()),
            (
                "hourly",
                "temperature_2m,relative_humidity_2m,apparent_temperature,rain,wind_speed_10m"
                    .to_string(),
            ),
            ("models", self.config.forecast_model.clone()),
        ];

        let body = self.get_body(&url, &query, "Forecast request").await?;

        let parsed: ForecastResponse = serde_json::from_str(&body).map_err(|e| {
            WeatherdeckError::Protocol(format!("Failed to parse forecast response: {}", e))
        })?;

        debug!(city = %city_name, latitude, longitude, "forecast fetched");
        Ok(Self::project_snapshot(city_name, parsed))
    }
}

fn first_or_zero(series: &[Option<f64>]) -> f64 {
    series.first().copied().flatten().unwrap_or(0.0)
}

fn truncate_body(body: &str) -> String {
    const MAX: usize = 200;
    if body.len() > MAX {
        // Cut on a char boundary; a fixed byte offset can land inside a
        // multibyte character and panic
        let cut = body
            .char_indices()
            .take_while(|(i, _)| *i <= MAX)
            .last()
            .map(|(i, _)| i)
            .unwrap_or(0);
        format!("{}...", &body[..cut])
    } else {
        body.to_string()
    }
}
