pub mod cache;
pub mod favorites;
pub mod orchestrator;

pub use cache::WeatherCache;
pub use favorites::FavoritesCoordinator;
pub use orchestrator::WeatherOrchestrator;
