use super::location::LocationKey;
use chrono::Utc;
use serde::{Deserialize, Serialize};

/// Simplified sky condition, derived from the current rain amount and
/// relative humidity.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum WeatherCondition {
    Sunny,
    Cloudy,
    Rainy,
    Unknown,
}

impl WeatherCondition {
    /// Classify from current rain (mm) and relative humidity (%).
    /// Rain dominates humidity; the branches are checked in this exact order.
    pub fn from_observation(rain: f64, humidity: i64) -> Self {
        if rain > 0.5 {
            WeatherCondition::Rainy
        } else if humidity > 80 {
            WeatherCondition::Cloudy
        } else if humidity < 60 {
            WeatherCondition::Sunny
        } else {
            WeatherCondition::Unknown
        }
    }

    pub fn as_str(&self) -> &'static str {
        match self {
            WeatherCondition::Sunny => "Sunny",
            WeatherCondition::Cloudy => "Cloudy",
            WeatherCondition::Rainy => "Rainy",
            WeatherCondition::Unknown => "Unknown",
        }
    }

    pub fn from_str(s: &str) -> Option<Self> {
        match s {
            "Sunny" => Some(WeatherCondition::Sunny),
            "Cloudy" => Some(WeatherCondition::Cloudy),
            "Rainy" => Some(WeatherCondition::Rainy),
            "Unknown" => Some(WeatherCondition::Unknown),
            _ => None,
        }
    }
}

impl std::fmt::Display for WeatherCondition {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}", self.as_str())
    }
}

/// A point-in-time weather observation for one location. Immutable once
/// built; a refresh replaces the whole snapshot rather than mutating it.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct WeatherSnapshot {
    pub city_name: String,
    pub latitude: f64,
    pub longitude: f64,
    pub current_temperature: f64,
    pub min_temperature: f64,
    pub max_temperature: f64,
    /// Relative humidity, percent.
    pub humidity: i64,
    pub wind_speed: f64,
    pub condition: WeatherCondition,
    /// Capture time, epoch milliseconds.
    pub captured_at: i64,
}

impl WeatherSnapshot {
    pub fn location_key(&self) -> LocationKey {
        LocationKey::derive(self.latitude, self.longitude)
    }

    pub fn age_ms(&self, now_ms: i64) -> i64 {
        now_ms - self.captured_at
    }
}

/// Current time as epoch milliseconds, the unit every timestamp in the
/// database uses.
pub fn now_ms() -> i64 {
    Utc::now().timestamp_millis()
}
