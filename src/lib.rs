//! Cache-first weather data orchestration.
//!
//! The library behind a city-weather app: search cities, fetch current
//! conditions from Open-Meteo, keep snapshots in SQLite, and serve stored
//! data instead of hitting the network whenever it is fresh enough. When a
//! fetch fails, any cached snapshot for the location is served regardless of
//! age, so transient network trouble never surfaces for a city that was ever
//! resolved before. A favorites coordinator fans refreshes out over the
//! favorite-city list and aggregates the results per location key.
//!
//! Typical wiring:
//!
//! ```no_run
//! use std::sync::Arc;
//! use weatherdeck::{
//!     Config, Database, FavoritesCoordinator, OpenMeteoClient, WeatherCache,
//!     WeatherOrchestrator,
//! };
//!
//! # async fn wire() -> weatherdeck::Result<()> {
//! let config = Config::load(None)?;
//! let db = Database::open(&config)?;
//! let source = Arc::new(OpenMeteoClient::new(&config)?);
//! let cache = WeatherCache::from_config(db.clone(), &config);
//! let orchestrator = Arc::new(WeatherOrchestrator::new(source, cache));
//! orchestrator.clean_old_cache()?;
//!
//! let weather = orchestrator.get_weather("Paris", 48.8566, 2.3522, false).await?;
//! println!("{}: {}°C", weather.city_name, weather.current_temperature);
//!
//! let _favorites = FavoritesCoordinator::new(db, orchestrator);
//! # Ok(())
//! # }
//! ```

pub mod config;
pub mod datasources;
pub mod db;
pub mod error;
pub mod logic;
pub mod models;

pub use config::Config;
pub use datasources::{OpenMeteoClient, WeatherSource};
pub use db::Database;
pub use error::{Result, WeatherdeckError};
pub use logic::{FavoritesCoordinator, WeatherCache, WeatherOrchestrator};
pub use models::{
    FavoriteCity, GeocodingCandidate, LocationKey, WeatherCondition, WeatherSnapshot,
};
