use super::location::LocationKey;
use super::weather::now_ms;
use serde::{Deserialize, Serialize};

/// One geocoding search hit. Transient: never persisted, only shown to the
/// user so they can pick a city to view or favorite.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct GeocodingCandidate {
    pub id: i64,
    pub name: String,
    pub latitude: f64,
    pub longitude: f64,
    #[serde(default)]
    pub country: Option<String>,
    /// First-level administrative area (region, state...).
    #[serde(default, rename = "admin1")]
    pub region: Option<String>,
    #[serde(default)]
    pub country_code: Option<String>,
}

/// A persisted favorite city. At most one row per location key; re-adding
/// the same key replaces the row.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct FavoriteCity {
    pub city_key: LocationKey,
    pub city_name: String,
    pub latitude: f64,
    pub longitude: f64,
    pub country: Option<String>,
    /// When the city was favorited, epoch milliseconds.
    pub added_at: i64,
}

impl FavoriteCity {
    pub fn new(city_name: &str, latitude: f64, longitude: f64, country: Option<String>) -> Self {
        Self {
            city_key: LocationKey::derive(latitude, longitude),
            city_name: city_name.to_string(),
            latitude,
            longitude,
            country,
            added_at: now_ms(),
        }
    }

    pub fn from_candidate(candidate: &GeocodingCandidate) -> Self {
        Self::new(
            &candidate.name,
            candidate.latitude,
            candidate.longitude,
            candidate.country.clone(),
        )
    }
}
