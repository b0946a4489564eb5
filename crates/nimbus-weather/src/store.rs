//! Durable key/value store with change notifications.
//!
//! The weather record lives under [`WEATHER_DATA_KEY`] in the local area.
//! Writers go through [`StoreAdapter::set`]; every write or removal is
//! broadcast to subscribers as a [`StoreChange`] after it has been committed.

use std::path::Path;

use nimbus_core::error::RusqliteErrorExt;
use nimbus_core::StorageError;
use parking_lot::Mutex;
use rusqlite::{params, Connection, OptionalExtension};
use tokio::sync::broadcast;

use crate::types::{ExpirationPolicy, WeatherError, WeatherPayload, WeatherRecord};

/// Key of the serialized weather record
pub const WEATHER_DATA_KEY: &str = "weatherData";

pub(crate) const CHANGE_CHANNEL_CAPACITY: usize = 64;

/// Storage namespaces. Only `Local` carries weather data.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum StorageArea {
    Local,
    Sync,
}

impl StorageArea {
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::Local => "local",
            Self::Sync => "sync",
        }
    }
}

/// A committed mutation of one key
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct StoreChange {
    pub area: StorageArea,
    pub key: String,
    /// `None` when the key was removed
    pub new_value: Option<String>,
}

/// Contract of the durable store. Writes are atomic per key.
pub trait StoreAdapter: Send + Sync {
    fn get(&self, area: StorageArea, key: &str) -> Result<Option<String>, StorageError>;

    fn set(&self, area: StorageArea, key: &str, value: &str) -> Result<(), StorageError>;

    fn remove(&self, area: StorageArea, key: &str) -> Result<(), StorageError>;

    /// Receive every change committed after this call
    fn subscribe(&self) -> broadcast::Receiver<StoreChange>;
}

/// Serialize `record` and write it under the weather key.
pub fn write_record(store: &dyn StoreAdapter, record: &WeatherRecord) -> Result<(), WeatherError> {
    let json = record.to_json()?;
    store.set(StorageArea::Local, WEATHER_DATA_KEY, &json)?;
    tracing::debug!(
        "Cached weather record (fresh until {}, hard until {})",
        record.fresh_expiration,
        record.hard_expiration
    );
    Ok(())
}

/// Stamp a fetched provider response with `policy` and cache it.
///
/// This is the write half of a refresh; the cache picks the record up from
/// the resulting store notification.
pub fn ingest_payload(
    store: &dyn StoreAdapter,
    raw: &str,
    policy: &ExpirationPolicy,
    fetched_at_ms: i64,
) -> Result<WeatherRecord, WeatherError> {
    let record = policy.apply(WeatherPayload::parse(raw)?, fetched_at_ms);
    write_record(store, &record)?;
    Ok(record)
}

/// SQLite-backed store.
pub struct SqliteStore {
    conn: Mutex<Connection>,
    changes: broadcast::Sender<StoreChange>,
}

impl SqliteStore {
    /// Open (or create) a store at the given path.
    pub fn new<P: AsRef<Path>>(path: P) -> Result<Self, StorageError> {
        let conn = Connection::open(path).map_err(|e| e.into_storage_error())?;
        Self::from_connection(conn)
    }

    /// Create an in-memory store. Contents vanish with the value.
    pub fn in_memory() -> Result<Self, StorageError> {
        let conn = Connection::open_in_memory().map_err(|e| e.into_storage_error())?;
        Self::from_connection(conn)
    }

    fn from_connection(conn: Connection) -> Result<Self, StorageError> {
        let (changes, _) = broadcast::channel(CHANGE_CHANNEL_CAPACITY);
        let store = Self {
            conn: Mutex::new(conn),
            changes,
        };
        store.init_schema()?;
        Ok(store)
    }

    fn init_schema(&self) -> Result<(), StorageError> {
        self.conn
            .lock()
            .execute_batch(
                r#"
                CREATE TABLE IF NOT EXISTS kv (
                    area TEXT NOT NULL,
                    key TEXT NOT NULL,
                    value TEXT NOT NULL,
                    updated_at INTEGER NOT NULL,
                    PRIMARY KEY (area, key)
                );
                "#,
            )
            .map_err(|e| e.into_storage_error())
    }

    fn notify(&self, area: StorageArea, key: &str, new_value: Option<String>) {
        // No subscribers is fine.
        let _ = self.changes.send(StoreChange {
            area,
            key: key.to_string(),
            new_value,
        });
    }
}

impl StoreAdapter for SqliteStore {
    fn get(&self, area: StorageArea, key: &str) -> Result<Option<String>, StorageError> {
        self.conn
            .lock()
            .query_row(
                "SELECT value FROM kv WHERE area = ?1 AND key = ?2",
                params![area.as_str(), key],
                |row| row.get(0),
            )
            .optional()
            .map_err(|e| e.into_storage_error())
    }

    fn set(&self, area: StorageArea, key: &str, value: &str) -> Result<(), StorageError> {
        let now = chrono::Utc::now().timestamp_millis();
        self.conn
            .lock()
            .execute(
                "INSERT OR REPLACE INTO kv (area, key, value, updated_at) VALUES (?1, ?2, ?3, ?4)",
                params![area.as_str(), key, value, now],
            )
            .map_err(|e| e.into_storage_error())?;

        self.notify(area, key, Some(value.to_string()));
        Ok(())
    }

    fn remove(&self, area: StorageArea, key: &str) -> Result<(), StorageError> {
        let removed = self
            .conn
            .lock()
            .execute(
                "DELETE FROM kv WHERE area = ?1 AND key = ?2",
                params![area.as_str(), key],
            )
            .map_err(|e| e.into_storage_error())?;

        if removed > 0 {
            self.notify(area, key, None);
        }
        Ok(())
    }

    fn subscribe(&self) -> broadcast::Receiver<StoreChange> {
        self.changes.subscribe()
    }
}
