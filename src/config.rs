use crate::error::{Result, WeatherdeckError};
use serde::{Deserialize, Serialize};
use std::path::PathBuf;

/// Library configuration. Every field has a working default, so callers that
/// never ship a config file still get the public Open-Meteo endpoints.
#[derive(Debug, Clone, Deserialize, Serialize)]
#[serde(default)]
pub struct Config {
    /// Base URL of the geocoding service (no trailing slash).
    pub geocoding_base_url: String,
    /// Base URL of the forecast service (no trailing slash).
    pub forecast_base_url: String,
    /// Maximum number of geocoding candidates per search.
    pub search_count: u32,
    /// Language for geocoding results.
    pub language: String,
    /// Forecast model passed to the weather provider.
    pub forecast_model: String,
    /// HTTP timeout for provider requests, in seconds.
    pub http_timeout_secs: u64,
    /// Age under which a cached snapshot is served without a network call.
    pub cache_validity_minutes: i64,
    /// Age past which cached snapshots are eligible for eviction.
    pub cache_retention_hours: i64,
    /// Explicit database file location; defaults to the platform data dir.
    pub db_path: Option<PathBuf>,
}

impl Config {
    pub fn load(config_override: Option<PathBuf>) -> Result<Self> {
        let config_path = match config_override {
            Some(p) => p,
            None => Self::find_config_path()?,
        };

        // No file is a normal deployment; everything has a default.
        if !config_path.exists() {
            return Ok(Self::default());
        }

        let config_str = std::fs::read_to_string(&config_path)
            .map_err(|e| WeatherdeckError::Config(format!("Failed to read config: {}", e)))?;

        // Substitute environment variables
        let config_str = Self::substitute_env_vars(&config_str);

        let config: Config = serde_yaml::from_str(&config_str)
            .map_err(|e| WeatherdeckError::Config(format!("Failed to parse config: {}", e)))?;

        Ok(config)
    }

    /// Search for config.yaml in standard locations.
    /// Returns the path of the first found config, or the XDG default path if none found.
    fn find_config_path() -> Result<PathBuf> {
        // Try current directory first
        let local_config = PathBuf::from("config/config.yaml");
        if local_config.exists() {
            return Ok(local_config);
        }

        let default_path = dirs::config_dir()
            .ok_or_else(|| WeatherdeckError::Config("Cannot determine config directory".into()))?
            .join("weatherdeck")
            .join("config.yaml");
        Ok(default_path)
    }

    fn substitute_env_vars(content: &str) -> String {
        let mut result = content.to_string();

        // Find all ${VAR_NAME} patterns and substitute
        let re = regex_lite::Regex::new(r"\$\{([A-Z_][A-Z0-9_]*)\}").unwrap();

        for cap in re.captures_iter(content) {
            let var_name = &cap[1];
            let placeholder = &cap[0];
            if let Ok(value) = std::env::var(var_name) {
                result = result.replace(placeholder, &value);
            }
        }

        result
    }

    /// Resolve the SQLite file location, creating parent directories as needed.
    pub fn db_path(&self) -> Result<PathBuf> {
        if let Some(path) = &self.db_path {
            if let Some(parent) = path.parent() {
                std::fs::create_dir_all(parent)?;
            }
            return Ok(path.clone());
        }

        if let Ok(dir) = std::env::var("WEATHERDECK_DATA_DIR") {
            let p = PathBuf::from(dir);
            std::fs::create_dir_all(&p)?;
            return Ok(p.join("weatherdeck.db"));
        }

        let data_dir = dirs::data_dir()
            .ok_or_else(|| WeatherdeckError::Config("Cannot determine data directory".into()))?
            .join("weatherdeck");

        std::fs::create_dir_all(&data_dir)?;
        Ok(data_dir.join("weatherdeck.db"))
    }

    pub fn cache_validity_ms(&self) -> i64 {
        self.cache_validity_minutes * 60 * 1000
    }

    pub fn cache_retention_ms(&self) -> i64 {
        self.cache_retention_hours * 60 * 60 * 1000
    }
}

impl Default for Config {
    fn default() -> Self {
        Self {
            geocoding_base_url: "https://geocoding-api.open-meteo.com".into(),
            forecast_base_url: "https://api.open-meteo.com".into(),
            search_count: 10,
            language: "fr".into(),
            forecast_model: "meteofrance_seamless".into(),
            http_timeout_secs: 10,
            cache_validity_minutes: 60,
            cache_retention_hours: 24,
            db_path: None,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn default_config_points_at_open_meteo() {
        let config = Config::default();
        assert!(config.geocoding_base_url.contains("geocoding-api.open-meteo.com"));
        assert!(config.forecast_base_url.contains("api.open-meteo.com"));
        assert_eq!(config.cache_validity_minutes, 60);
        assert_eq!(config.cache_retention_hours, 24);
    }

    #[test]
    fn load_missing_file_falls_back_to_defaults() {
        let config = Config::load(Some(PathBuf::from("/nonexistent/config.yaml"))).unwrap();
        assert_eq!(config.search_count, 10);
    }

    #[test]
    fn load_parses_yaml_overrides() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("config.yaml");
        std::fs::write(
            &path,
            "geocoding_base_url: http://localhost:9999\ncache_validity_minutes: 5\n",
        )
        .unwrap();

        let config = Config::load(Some(path)).unwrap();
        assert_eq!(config.geocoding_base_url, "http://localhost:9999");
        assert_eq!(config.cache_validity_minutes, 5);
        // Untouched fields keep defaults
        assert_eq!(config.cache_retention_hours, 24);
    }

    #[test]
    fn env_vars_are_substituted() {
        std::env::set_var("WEATHERDECK_TEST_LANG", "de");
        let substituted = Config::substitute_env_vars("language: ${WEATHERDECK_TEST_LANG}");
        assert_eq!(substituted, "language: de");
    }

    #[test]
    fn validity_window_in_millis() {
        let config = Config::default();
        assert_eq!(config.cache_validity_ms(), 60 * 60 * 1000);
        assert_eq!(config.cache_retention_ms(), 24 * 60 * 60 * 1000);
    }
}
