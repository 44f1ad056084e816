use crate::config::Config;
use crate::db::Database;
use crate::error::Result;
use crate::models::{now_ms, LocationKey, WeatherSnapshot};

const DEFAULT_VALIDITY_MS: i64 = 60 * 60 * 1000; // 1 hour
const DEFAULT_RETENTION_MS: i64 = 24 * 60 * 60 * 1000; // 24 hours

/// Time policy over the weather table. Knows nothing about the network.
///
/// "Valid" (fresh enough to serve without a fetch) and "present" (exists at
/// all) are deliberately separate: the orchestrator serves expired-but-present
/// snapshots when a live fetch fails.
#[derive(Debug, Clone)]
pub struct WeatherCache {
    db: Database,
    validity_ms: i64,
    retention_ms: i64,
}

impl WeatherCache {
    pub fn new(db: Database) -> Self {
        Self {
            db,
            validity_ms: DEFAULT_VALIDITY_MS,
            retention_ms: DEFAULT_RETENTION_MS,
        }
    }

    pub fn from_config(db: Database, config: &Config) -> Self {
        Self {
            db,
            validity_ms: config.cache_validity_ms(),
            retention_ms: config.cache_retention_ms(),
        }
    }

    /// Explicit windows, used by tests to compress time.
    pub fn with_windows(db: Database, validity_ms: i64, retention_ms: i64) -> Self {
        Self {
            db,
            validity_ms,
            retention_ms,
        }
    }

    /// The snapshot for `key`, only if it is younger than the validity window.
    pub fn get_valid(&self, key: &LocationKey) -> Result<Option<WeatherSnapshot>> {
        match self.db.get_weather(key)? {
            Some(snapshot) if snapshot.age_ms(now_ms()) < self.validity_ms => Ok(Some(snapshot)),
            _ => Ok(None),
        }
    }

    /// The snapshot for `key` regardless of age. Degraded-fallback read.
    pub fn get_any(&self, key: &LocationKey) -> Result<Option<WeatherSnapshot>> {
        self.db.get_weather(key)
    }

    pub fn is_valid(&self, key: &LocationKey) -> Result<bool> {
        Ok(self.get_valid(key)?.is_some())
    }

    pub fn put(&self, snapshot: &WeatherSnapshot) -> Result<()> {
        self.db.put_weather(snapshot)
    }

    /// Drop everything older than the retention window. Returns the number of
    /// evicted rows. Not self-scheduling; callers run this opportunistically.
    pub fn evict_old(&self) -> Result<usize> {
        self.db.delete_weather_older_than(now_ms() - self.retention_ms)
    }
}
