use crate::config::Config;
use crate::error::Result;
use crate::models::{FavoriteCity, WeatherSnapshot};
use rusqlite::Connection;
use std::path::{Path, PathBuf};
use std::sync::{Arc, Mutex};
use tokio::sync::watch;

/// Handle over the SQLite store. Cheap to clone; all clones share the same
/// connection and the same change-notification channels.
pub struct Database {
    conn: Arc<Mutex<Connection>>,
    path: PathBuf,
    weather_tx: Arc<watch::Sender<Vec<WeatherSnapshot>>>,
    favorites_tx: Arc<watch::Sender<Vec<FavoriteCity>>>,
}

impl Database {
    pub fn open(config: &Config) -> Result<Self> {
        let path = config.db_path()?;
        Self::open_at(&path)
    }

    pub fn open_at(path: &Path) -> Result<Self> {
        let conn = Connection::open(path)?;
        conn.execute_batch("PRAGMA foreign_keys = ON;")?;
        Self::finish_open(conn, path.to_path_buf())
    }

    pub fn open_in_memory() -> Result<Self> {
        let conn = Connection::open_in_memory()?;
        conn.execute_batch("PRAGMA foreign_keys = ON;")?;
        Self::finish_open(conn, PathBuf::from(":memory:"))
    }

    fn finish_open(conn: Connection, path: PathBuf) -> Result<Self> {
        let (weather_tx, _) = watch::channel(Vec::new());
        let (favorites_tx, _) = watch::channel(Vec::new());

        let db = Self {
            conn: Arc::new(Mutex::new(conn)),
            path,
            weather_tx: Arc::new(weather_tx),
            favorites_tx: Arc::new(favorites_tx),
        };

        super::migrations::run(&db)?;

        // Seed the watchers with whatever the file already holds
        db.publish_weather()?;
        db.publish_favorites()?;

        Ok(db)
    }

    pub fn with_conn<F, T>(&self, f: F) -> Result<T>
    where
        F: FnOnce(&Connection) -> Result<T>,
    {
        let conn = self.conn.lock().unwrap();
        f(&conn)
    }

    pub fn with_conn_mut<F, T>(&self, f: F) -> Result<T>
    where
        F: FnOnce(&mut Connection) -> Result<T>,
    {
        let mut conn = self.conn.lock().unwrap();
        f(&mut conn)
    }

    pub fn path(&self) -> &PathBuf {
        &self.path
    }

    /// Live view of every cached snapshot, most recent capture first. The
    /// receiver holds the current set immediately and is updated after every
    /// weather mutation.
    pub fn watch_all_weather(&self) -> watch::Receiver<Vec<WeatherSnapshot>> {
        self.weather_tx.subscribe()
    }

    /// Live view of the favorites list, newest first.
    pub fn watch_favorites(&self) -> watch::Receiver<Vec<FavoriteCity>> {
        self.favorites_tx.subscribe()
    }

    pub(crate) fn publish_weather(&self) -> Result<()> {
        let rows = self.list_all_weather()?;
        self.weather_tx.send_replace(rows);
        Ok(())
    }

    pub(crate) fn publish_favorites(&self) -> Result<()> {
        let rows = self.list_favorites()?;
        self.favorites_tx.send_replace(rows);
        Ok(())
    }
}

impl Clone for Database {
    fn clone(&self) -> Self {
        Self {
            conn: Arc::clone(&self.conn),
            path: self.path.clone(),
            weather_tx: Arc::clone(&self.weather_tx),
            favorites_tx: Arc::clone(&self.favorites_tx),
        }
    }
}

impl std::fmt::Debug for Database {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Database").field("path", &self.path).finish()
    }
}
