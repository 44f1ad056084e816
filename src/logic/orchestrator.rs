use crate::datasources::WeatherSource;
use crate::error::Result;
use crate::logic::cache::WeatherCache;
use crate::models::{GeocodingCandidate, LocationKey, WeatherSnapshot};
use std::sync::Arc;
use tracing::{debug, warn};

/// The cache-first decision engine.
///
/// For every request it decides between serving stored data and going to the
/// network, and degrades to stale cache when the network lets it down. Holds
/// no per-request state; concurrent calls for different keys touch disjoint
/// rows, and two racing calls for the same key at worst fetch twice (the
/// overwrite is idempotent).
pub struct WeatherOrchestrator {
    source: Arc<dyn WeatherSource>,
    cache: WeatherCache,
}

impl WeatherOrchestrator {
    pub fn new(source: Arc<dyn WeatherSource>, cache: WeatherCache) -> Self {
        Self { source, cache }
    }

    /// Resolve weather for a location.
    ///
    /// 1. Unless `force_refresh`, a valid cached snapshot is served with no
    ///    network call.
    /// 2. Otherwise the remote source is queried. Success persists and
    ///    returns the fresh snapshot. Failure falls back to whatever the
    ///    store holds for the key, however stale; only with no cached row at
    ///    all does the fetch error reach the caller.
    ///
    /// A key that was ever fetched successfully therefore never produces a
    /// hard failure.
    pub async fn get_weather(
        &self,
        city_name: &str,
        latitude: f64,
        longitude: f64,
        force_refresh: bool,
    ) -> Result<WeatherSnapshot> {
        let key = LocationKey::derive(latitude, longitude);

        if !force_refresh {
            match self.cache.get_valid(&key) {
                Ok(Some(cached)) => {
                    debug!(key = %key, "serving valid cached snapshot");
                    return Ok(cached);
                }
                Ok(None) => {}
                // A broken cache probe must not block the fetch path
                Err(e) => warn!(key = %key, error = %e, "cache probe failed, fetching instead"),
            }
        }

        match self.source.fetch_weather(city_name, latitude, longitude).await {
            Ok(snapshot) => {
                // Storage failures here are real errors, not swallowed
                self.cache.put(&snapshot)?;
                Ok(snapshot)
            }
            Err(fetch_err) => match self.cache.get_any(&key)? {
                Some(stale) => {
                    debug!(key = %key, error = %fetch_err, "fetch failed, serving stale snapshot");
                    Ok(stale)
                }
                None => Err(fetch_err),
            },
        }
    }

    /// City search, delegated straight through. Search results are too
    /// volatile and too cheap to be worth caching.
    pub async fn search_city(&self, name: &str) -> Result<Vec<GeocodingCandidate>> {
        self.source.search_city(name).await
    }

    /// Evict snapshots past the retention window. Intended to run
    /// opportunistically, e.g. at startup.
    pub fn clean_old_cache(&self) -> Result<usize> {
        self.cache.evict_old()
    }
}

impl std::fmt::Debug for WeatherOrchestrator {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("WeatherOrchestrator").finish_non_exhaustive()
    }
}
