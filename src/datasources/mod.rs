pub mod openmeteo;

pub use openmeteo::OpenMeteoClient;

use crate::error::Result;
use crate::models::{GeocodingCandidate, WeatherSnapshot};
use async_trait::async_trait;

/// A remote provider able to resolve free-text city names and fetch weather
/// snapshots for a coordinate. The orchestrator only talks to this trait, so
/// tests can swap in counting or failing fakes.
#[async_trait]
pub trait WeatherSource: Send + Sync {
    /// Resolve a city name into candidate locations. Zero results is an
    /// error (`NotFound`), not an empty list.
    async fn search_city(&self, name: &str) -> Result<Vec<GeocodingCandidate>>;

    /// Fetch a complete snapshot for a coordinate. Never returns a partially
    /// populated snapshot.
    async fn fetch_weather(
        &self,
        city_name: &str,
        latitude: f64,
        longitude: f64,
    ) -> Result<WeatherSnapshot>;
}
