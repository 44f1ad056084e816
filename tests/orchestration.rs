//! End-to-end tests for the cache-first policy, stale fallback, eviction and
//! the favorites refresh pass, using a scripted in-process weather source.

use async_trait::async_trait;
use std::sync::atomic::{AtomicBool, AtomicUsize, Ordering};
use std::sync::Arc;
use std::time::Duration;
use weatherdeck::models::now_ms;
use weatherdeck::{
    Database, FavoritesCoordinator, GeocodingCandidate, LocationKey, Result, WeatherCache,
    WeatherCondition, WeatherOrchestrator, WeatherSnapshot, WeatherSource, WeatherdeckError,
};

/// A weather source whose fetches can be counted and scripted to fail,
/// either globally or for one city name.
#[derive(Default)]
struct ScriptedSource {
    fetch_calls: AtomicUsize,
    failing: AtomicBool,
    fail_city: std::sync::Mutex<Option<String>>,
}

impl ScriptedSource {
    fn fail_all(&self) {
        self.failing.store(true, Ordering::SeqCst);
    }

    fn fail_only(&self, city: &str) {
        *self.fail_city.lock().unwrap() = Some(city.to_string());
    }

    fn calls(&self) -> usize {
        self.fetch_calls.load(Ordering::SeqCst)
    }

    fn snapshot(city: &str, latitude: f64, longitude: f64) -> WeatherSnapshot {
        WeatherSnapshot {
            city_name: city.to_string(),
            latitude,
            longitude,
            current_temperature: 21.0,
            min_temperature: 14.0,
            max_temperature: 24.0,
            humidity: 45,
            wind_speed: 9.0,
            condition: WeatherCondition::Sunny,
            captured_at: now_ms(),
        }
    }
}

#[async_trait]
impl WeatherSource for ScriptedSource {
    async fn search_city(&self, name: &str) -> Result<Vec<GeocodingCandidate>> {
        Ok(vec![GeocodingCandidate {
            id: 1,
            name: name.to_string(),
            latitude: 10.0,
            longitude: 20.0,
            country: Some("France".into()),
            region: None,
            country_code: Some("FR".into()),
        }])
    }

    async fn fetch_weather(
        &self,
        city_name: &str,
        latitude: f64,
        longitude: f64,
    ) -> Result<WeatherSnapshot> {
        self.fetch_calls.fetch_add(1, Ordering::SeqCst);
        if self.failing.load(Ordering::SeqCst) {
            return Err(WeatherdeckError::Network("scripted outage".into()));
        }
        if self.fail_city.lock().unwrap().as_deref() == Some(city_name) {
            return Err(WeatherdeckError::Network(format!(
                "scripted outage for {}",
                city_name
            )));
        }
        Ok(Self::snapshot(city_name, latitude, longitude))
    }
}

fn setup() -> (Arc<ScriptedSource>, Database, Arc<WeatherOrchestrator>) {
    let _ = tracing_subscriber::fmt()
        .with_env_filter(
            tracing_subscriber::EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| tracing_subscriber::EnvFilter::new("warn")),
        )
        .try_init();
    let source = Arc::new(ScriptedSource::default());
    let db = Database::open_in_memory().unwrap();
    let cache = WeatherCache::new(db.clone());
    let orchestrator = Arc::new(WeatherOrchestrator::new(source.clone(), cache));
    (source, db, orchestrator)
}

fn cached_snapshot(city: &str, latitude: f64, longitude: f64, age_ms: i64) -> WeatherSnapshot {
    WeatherSnapshot {
        city_name: city.to_string(),
        latitude,
        longitude,
        current_temperature: 3.0,
        min_temperature: 1.0,
        max_temperature: 6.0,
        humidity: 85,
        wind_speed: 20.0,
        condition: WeatherCondition::Cloudy,
        captured_at: now_ms() - age_ms,
    }
}

#[tokio::test]
async fn valid_cache_is_served_without_network() {
    let (source, db, orchestrator) = setup();
    let cached = cached_snapshot("Paris", 48.8566, 2.3522, 30 * 60 * 1000); // 30 min
    db.put_weather(&cached).unwrap();

    let got = orchestrator
        .get_weather("Paris", 48.8566, 2.3522, false)
        .await
        .unwrap();

    assert_eq!(source.calls(), 0);
    assert_eq!(got.captured_at, cached.captured_at);
    assert_eq!(got.condition, WeatherCondition::Cloudy);
}

#[tokio::test]
async fn forced_refresh_fetches_despite_valid_cache() {
    let (source, db, orchestrator) = setup();
    let cached = cached_snapshot("Paris", 48.8566, 2.3522, 30 * 60 * 1000);
    db.put_weather(&cached).unwrap();

    let got = orchestrator
        .get_weather("Paris", 48.8566, 2.3522, true)
        .await
        .unwrap();

    assert_eq!(source.calls(), 1);
    assert!(got.captured_at >= cached.captured_at);
    assert_eq!(got.condition, WeatherCondition::Sunny);
}

#[tokio::test]
async fn expired_cache_triggers_fetch_and_overwrite() {
    let (source, db, orchestrator) = setup();
    let stale = cached_snapshot("Paris", 48.8566, 2.3522, 2 * 60 * 60 * 1000); // 2h
    db.put_weather(&stale).unwrap();

    let got = orchestrator
        .get_weather("Paris", 48.8566, 2.3522, false)
        .await
        .unwrap();

    assert_eq!(source.calls(), 1);
    assert_eq!(got.condition, WeatherCondition::Sunny);

    // The fresh snapshot replaced the stale row
    let key = LocationKey::derive(48.8566, 2.3522);
    let stored = db.get_weather(&key).unwrap().unwrap();
    assert_eq!(stored.captured_at, got.captured_at);
}

#[tokio::test]
async fn network_failure_falls_back_to_stale_cache() {
    let (source, db, orchestrator) = setup();
    let stale = cached_snapshot("Paris", 48.8566, 2.3522, 5 * 60 * 60 * 1000); // 5h
    db.put_weather(&stale).unwrap();
    source.fail_all();

    let got = orchestrator
        .get_weather("Paris", 48.8566, 2.3522, false)
        .await
        .unwrap();

    // The fetch was attempted, failed, and the stale row saved the day
    assert_eq!(source.calls(), 1);
    assert_eq!(got.captured_at, stale.captured_at);
}

#[tokio::test]
async fn forced_refresh_also_falls_back_to_cache() {
    let (source, db, orchestrator) = setup();
    let cached = cached_snapshot("Paris", 48.8566, 2.3522, 10 * 60 * 1000);
    db.put_weather(&cached).unwrap();
    source.fail_all();

    let got = orchestrator
        .get_weather("Paris", 48.8566, 2.3522, true)
        .await
        .unwrap();
    assert_eq!(got.captured_at, cached.captured_at);
}

#[tokio::test]
async fn failure_with_empty_cache_surfaces_the_error() {
    let (source, _db, orchestrator) = setup();
    source.fail_all();

    let err = orchestrator
        .get_weather("Paris", 48.8566, 2.3522, false)
        .await
        .unwrap_err();
    assert!(matches!(err, WeatherdeckError::Network(_)));
}

#[tokio::test]
async fn successful_fetch_is_persisted() {
    let (_source, db, orchestrator) = setup();

    let got = orchestrator
        .get_weather("Paris", 48.8566, 2.3522, false)
        .await
        .unwrap();

    let stored = db
        .get_weather(&LocationKey::derive(48.8566, 2.3522))
        .unwrap()
        .unwrap();
    assert_eq!(stored.captured_at, got.captured_at);
    assert_eq!(stored.city_name, "Paris");
}

#[tokio::test]
async fn persist_failure_after_successful_fetch_propagates() {
    let (source, db, orchestrator) = setup();
    // Break the store out from under the orchestrator
    db.with_conn(|conn| {
        conn.execute("DROP TABLE weather_cache", [])?;
        Ok(())
    })
    .unwrap();

    let err = orchestrator
        .get_weather("Paris", 48.8566, 2.3522, false)
        .await
        .unwrap_err();

    // The fetch itself worked; the failed persist must not be swallowed
    assert_eq!(source.calls(), 1);
    assert!(matches!(err, WeatherdeckError::Database(_)));
}

#[tokio::test]
async fn fallback_read_failure_propagates_as_storage_error() {
    let (source, db, orchestrator) = setup();
    source.fail_all();
    db.with_conn(|conn| {
        conn.execute("DROP TABLE weather_cache", [])?;
        Ok(())
    })
    .unwrap();

    let err = orchestrator
        .get_weather("Paris", 48.8566, 2.3522, false)
        .await
        .unwrap_err();

    // The storage error from the fallback read wins over the network error
    assert!(matches!(err, WeatherdeckError::Database(_)));
}

#[tokio::test]
async fn clean_old_cache_evicts_only_past_retention() {
    let (_source, db, orchestrator) = setup();
    db.put_weather(&cached_snapshot("Old", 1.0, 1.0, 25 * 60 * 60 * 1000))
        .unwrap();
    db.put_weather(&cached_snapshot("Fresh", 2.0, 2.0, 60 * 60 * 1000))
        .unwrap();

    let removed = orchestrator.clean_old_cache().unwrap();
    assert_eq!(removed, 1);
    assert!(db.get_weather(&LocationKey::derive(1.0, 1.0)).unwrap().is_none());
    assert!(db.get_weather(&LocationKey::derive(2.0, 2.0)).unwrap().is_some());
}

#[tokio::test]
async fn search_delegates_to_source() {
    let (_source, _db, orchestrator) = setup();
    let hits = orchestrator.search_city("Paris").await.unwrap();
    assert_eq!(hits.len(), 1);
    assert_eq!(hits[0].name, "Paris");
}

#[tokio::test]
async fn refresh_all_collects_successes_and_drops_failures() {
    let (source, db, orchestrator) = setup();
    let coordinator = FavoritesCoordinator::new(db, orchestrator);

    coordinator.add_favorite_manual("Paris", 48.8566, 2.3522, None).unwrap();
    coordinator.add_favorite_manual("Lyon", 45.7640, 4.8357, None).unwrap();
    coordinator.add_favorite_manual("Atlantis", 0.0, 0.0, None).unwrap();
    source.fail_only("Atlantis");

    let favorites = coordinator.list_favorites().unwrap();
    assert_eq!(favorites.len(), 3);

    let map = coordinator.refresh_all(&favorites).await;

    assert_eq!(map.len(), 2);
    assert!(map.contains_key(&LocationKey::derive(48.8566, 2.3522)));
    assert!(map.contains_key(&LocationKey::derive(45.7640, 4.8357)));
    assert!(!map.contains_key(&LocationKey::derive(0.0, 0.0)));

    // The exposed aggregate matches the returned one, and the pass is over
    assert_eq!(coordinator.weather_map().await.len(), 2);
    assert!(!coordinator.is_refreshing());
}

#[tokio::test]
async fn favorites_round_trip_through_coordinator() {
    let (_source, db, orchestrator) = setup();
    let coordinator = FavoritesCoordinator::new(db, orchestrator);

    let candidate = GeocodingCandidate {
        id: 7,
        name: "Brest".into(),
        latitude: 48.3904,
        longitude: -4.4861,
        country: Some("France".into()),
        region: Some("Bretagne".into()),
        country_code: Some("FR".into()),
    };

    coordinator.add_favorite(&candidate).unwrap();
    assert!(coordinator.is_favorite(48.3904, -4.4861).unwrap());

    // Re-adding replaces rather than duplicates
    coordinator.add_favorite(&candidate).unwrap();
    assert_eq!(coordinator.list_favorites().unwrap().len(), 1);

    coordinator.remove_favorite(48.3904, -4.4861).unwrap();
    assert!(!coordinator.is_favorite(48.3904, -4.4861).unwrap());
    assert!(coordinator.list_favorites().unwrap().is_empty());
}

#[tokio::test]
async fn run_loop_refreshes_when_favorites_change() {
    let (_source, db, orchestrator) = setup();
    let coordinator = Arc::new(FavoritesCoordinator::new(db, orchestrator));

    let driver = coordinator.clone();
    let handle = tokio::spawn(async move { driver.run().await });

    coordinator
        .add_favorite_manual("Paris", 48.8566, 2.3522, None)
        .unwrap();

    let key = LocationKey::derive(48.8566, 2.3522);
    let mut resolved = false;
    for _ in 0..200 {
        if coordinator.weather_map().await.contains_key(&key) {
            resolved = true;
            break;
        }
        tokio::time::sleep(Duration::from_millis(10)).await;
    }
    handle.abort();

    assert!(resolved, "run loop never refreshed the new favorite");
}

#[tokio::test]
async fn observe_favorites_sees_additions() {
    let (_source, db, orchestrator) = setup();
    let coordinator = FavoritesCoordinator::new(db, orchestrator);

    let mut rx = coordinator.observe_favorites();
    assert!(rx.borrow_and_update().is_empty());

    coordinator
        .add_favorite_manual("Paris", 48.8566, 2.3522, None)
        .unwrap();

    rx.changed().await.unwrap();
    assert_eq!(rx.borrow().len(), 1);
}
