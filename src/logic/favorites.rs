use crate::db::Database;
use crate::error::Result;
use crate::logic::orchestrator::WeatherOrchestrator;
use crate::models::{FavoriteCity, GeocodingCandidate, LocationKey, WeatherSnapshot};
use std::collections::HashMap;
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Arc;
use tokio::sync::{watch, RwLock};
use tracing::{debug, warn};

/// Maintains the favorite-city set and a parallel map of location key to the
/// latest known snapshot for it.
///
/// A refresh pass never aborts on one bad favorite: individual failures are
/// logged and dropped, so the map converges to every favorite that could be
/// resolved this round.
pub struct FavoritesCoordinator {
    db: Database,
    orchestrator: Arc<WeatherOrchestrator>,
    weather_map: Arc<RwLock<HashMap<LocationKey, WeatherSnapshot>>>,
    refreshing: Arc<AtomicBool>,
}

impl FavoritesCoordinator {
    pub fn new(db: Database, orchestrator: Arc<WeatherOrchestrator>) -> Self {
        Self {
            db,
            orchestrator,
            weather_map: Arc::new(RwLock::new(HashMap::new())),
            refreshing: Arc::new(AtomicBool::new(false)),
        }
    }

    pub fn add_favorite(&self, candidate: &GeocodingCandidate) -> Result<()> {
        self.db.put_favorite(&FavoriteCity::from_candidate(candidate))
    }

    pub fn add_favorite_manual(
        &self,
        city_name: &str,
        latitude: f64,
        longitude: f64,
        country: Option<String>,
    ) -> Result<()> {
        self.db
            .put_favorite(&FavoriteCity::new(city_name, latitude, longitude, country))
    }

    pub fn remove_favorite(&self, latitude: f64, longitude: f64) -> Result<()> {
        self.db.delete_favorite(&LocationKey::derive(latitude, longitude))
    }

    pub fn is_favorite(&self, latitude: f64, longitude: f64) -> Result<bool> {
        self.db.is_favorite(&LocationKey::derive(latitude, longitude))
    }

    pub fn clear_favorites(&self) -> Result<()> {
        self.db.clear_favorites()
    }

    pub fn list_favorites(&self) -> Result<Vec<FavoriteCity>> {
        self.db.list_favorites()
    }

    /// Live view of the favorites list; updated after every favorites
    /// mutation.
    pub fn observe_favorites(&self) -> watch::Receiver<Vec<FavoriteCity>> {
        self.db.watch_favorites()
    }

    /// One weather pass over the given favorites. Failures for individual
    /// favorites are dropped; the returned map holds every success, keyed by
    /// location key. The loading flag is up only while the pass runs.
    pub async fn refresh_all(
        &self,
        favorites: &[FavoriteCity],
    ) -> HashMap<LocationKey, WeatherSnapshot> {
        self.refreshing.store(true, Ordering::SeqCst);

        let mut map = HashMap::new();
        for favorite in favorites {
            match self
                .orchestrator
                .get_weather(&favorite.city_name, favorite.latitude, favorite.longitude, false)
                .await
            {
                Ok(snapshot) => {
                    map.insert(favorite.city_key.clone(), snapshot);
                }
                Err(e) => {
                    warn!(city = %favorite.city_name, error = %e, "skipping favorite this refresh");
                }
            }
        }

        *self.weather_map.write().await = map.clone();
        self.refreshing.store(false, Ordering::SeqCst);
        debug!(resolved = map.len(), total = favorites.len(), "favorites refresh pass done");
        map
    }

    /// Latest aggregate map produced by a refresh pass.
    pub async fn weather_map(&self) -> HashMap<LocationKey, WeatherSnapshot> {
        self.weather_map.read().await.clone()
    }

    /// True only while a refresh pass is in flight.
    pub fn is_refreshing(&self) -> bool {
        self.refreshing.load(Ordering::SeqCst)
    }

    /// Observe the favorites list and run a refresh pass for the current
    /// list and again after every change. Runs until the task driving it is
    /// dropped; typical use is `tokio::spawn`.
    pub async fn run(&self) {
        let mut rx = self.db.watch_favorites();
        loop {
            let favorites = rx.borrow_and_update().clone();
            self.refresh_all(&favorites).await;
            if rx.changed().await.is_err() {
                break;
            }
        }
    }
}

impl std::fmt::Debug for FavoritesCoordinator {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("FavoritesCoordinator").finish_non_exhaustive()
    }
}
