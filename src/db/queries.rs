use crate::db::Database;
use crate::error::Result;
use crate::models::{FavoriteCity, LocationKey, WeatherCondition, WeatherSnapshot};
use rusqlite::{params, OptionalExtension, Row};
use tracing::warn;

// Weather cache queries

impl Database {
    /// Insert-or-replace one snapshot, keyed by its location key.
    pub fn put_weather(&self, snapshot: &WeatherSnapshot) -> Result<()> {
        self.with_conn(|conn| {
            conn.execute(
                r#"
                INSERT OR REPLACE INTO weather_cache
                    (city_key, city_name, latitude, longitude, current_temperature,
                     min_temperature, max_temperature, humidity, wind_speed,
                     condition, captured_at)
                VALUES (?1, ?2, ?3, ?4, ?5, ?6, ?7, ?8, ?9, ?10, ?11)
                "#,
                params![
                    snapshot.location_key().as_str(),
                    snapshot.city_name,
                    snapshot.latitude,
                    snapshot.longitude,
                    snapshot.current_temperature,
                    snapshot.min_temperature,
                    snapshot.max_temperature,
                    snapshot.humidity,
                    snapshot.wind_speed,
                    snapshot.condition.as_str(),
                    snapshot.captured_at,
                ],
            )?;
            Ok(())
        })?;
        self.publish_weather()
    }

    pub fn get_weather(&self, key: &LocationKey) -> Result<Option<WeatherSnapshot>> {
        self.with_conn(|conn| {
            conn.query_row(
                "SELECT * FROM weather_cache WHERE city_key = ?1 LIMIT 1",
                [key.as_str()],
                row_to_snapshot,
            )
            .optional()
            .map_err(Into::into)
        })
    }

    pub fn delete_weather(&self, key: &LocationKey) -> Result<()> {
        self.with_conn(|conn| {
            conn.execute("DELETE FROM weather_cache WHERE city_key = ?1", [key.as_str()])?;
            Ok(())
        })?;
        self.publish_weather()
    }

    /// Evict every snapshot captured strictly before `threshold_ms`.
    /// Returns the number of rows removed.
    pub fn delete_weather_older_than(&self, threshold_ms: i64) -> Result<usize> {
        let removed = self.with_conn(|conn| {
            let n = conn.execute(
                "DELETE FROM weather_cache WHERE captured_at < ?1",
                [threshold_ms],
            )?;
            Ok(n)
        })?;
        if removed > 0 {
            self.publish_weather()?;
        }
        Ok(removed)
    }

    /// Every cached snapshot, most recent capture first.
    pub fn list_all_weather(&self) -> Result<Vec<WeatherSnapshot>> {
        self.with_conn(|conn| {
            let mut stmt =
                conn.prepare("SELECT * FROM weather_cache ORDER BY captured_at DESC")?;
            let rows = stmt
                .query_map([], row_to_snapshot)?
                .filter_map(|r| r.ok())
                .collect();
            Ok(rows)
        })
    }
}

fn row_to_snapshot(row: &Row) -> rusqlite::Result<WeatherSnapshot> {
    let condition_str: String = row.get("condition")?;

    let condition = WeatherCondition::from_str(&condition_str).unwrap_or_else(|| {
        warn!(
            condition = %condition_str,
            "Unknown condition in database, defaulting to Unknown"
        );
        WeatherCondition::Unknown
    });

    Ok(WeatherSnapshot {
        city_name: row.get("city_name")?,
        latitude: row.get("latitude")?,
        longitude: row.get("longitude")?,
        current_temperature: row.get("current_temperature")?,
        min_temperature: row.get("min_temperature")?,
        max_temperature: row.get("max_temperature")?,
        humidity: row.get("humidity")?,
        wind_speed: row.get("wind_speed")?,
        condition,
        captured_at: row.get("captured_at")?,
    })
}

// Favorite city queries

impl Database {
    /// Insert-or-replace a favorite, keyed by its location key.
    pub fn put_favorite(&self, city: &FavoriteCity) -> Result<()> {
        self.with_conn(|conn| {
            conn.execute(
                r#"
                INSERT OR REPLACE INTO favorite_cities
                    (city_key, city_name, latitude, longitude, country, added_at)
                VALUES (?1, ?2, ?3, ?4, ?5, ?6)
                "#,
                params![
                    city.city_key.as_str(),
                    city.city_name,
                    city.latitude,
                    city.longitude,
                    city.country,
                    city.added_at,
                ],
            )?;
            Ok(())
        })?;
        self.publish_favorites()
    }

    pub fn delete_favorite(&self, key: &LocationKey) -> Result<()> {
        self.with_conn(|conn| {
            conn.execute(
                "DELETE FROM favorite_cities WHERE city_key = ?1",
                [key.as_str()],
            )?;
            Ok(())
        })?;
        self.publish_favorites()
    }

    pub fn clear_favorites(&self) -> Result<()> {
        self.with_conn(|conn| {
            conn.execute("DELETE FROM favorite_cities", [])?;
            Ok(())
        })?;
        self.publish_favorites()
    }

    pub fn is_favorite(&self, key: &LocationKey) -> Result<bool> {
        self.with_conn(|conn| {
            let exists: bool = conn.query_row(
                "SELECT EXISTS(SELECT 1 FROM favorite_cities WHERE city_key = ?1 LIMIT 1)",
                [key.as_str()],
                |row| row.get(0),
            )?;
            Ok(exists)
        })
    }

    /// Every favorite, newest first; key as tiebreak so the order is stable.
    pub fn list_favorites(&self) -> Result<Vec<FavoriteCity>> {
        self.with_conn(|conn| {
            let mut stmt = conn
                .prepare("SELECT * FROM favorite_cities ORDER BY added_at DESC, city_key")?;
            let rows = stmt
                .query_map([], row_to_favorite)?
                .filter_map(|r| r.ok())
                .collect();
            Ok(rows)
        })
    }
}

fn row_to_favorite(row: &Row) -> rusqlite::Result<FavoriteCity> {
    let key: String = row.get("city_key")?;
    Ok(FavoriteCity {
        city_key: LocationKey::from(key),
        city_name: row.get("city_name")?,
        latitude: row.get("latitude")?,
        longitude: row.get("longitude")?,
        country: row.get("country")?,
        added_at: row.get("added_at")?,
    })
}
