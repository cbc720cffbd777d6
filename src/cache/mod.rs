//! Persistent key/value cache for the last feed payload.
//!
//! Mirrors origin-scoped browser storage: two keys, `data` (the serialized
//! event list) and `timeStamp` (epoch millis of the fetch), in a single SQLite
//! table.

use chrono::{DateTime, Duration, TimeZone, Utc};
use rusqlite::{params, Connection, OptionalExtension};
use std::sync::{Arc, Mutex, MutexGuard};
use thiserror::Error;

use crate::models::EventList;

pub const DATA_KEY: &str = "data";
pub const TIMESTAMP_KEY: &str = "timeStamp";

#[derive(Debug, Error)]
pub enum CacheError {
    #[error("cache storage error: {0}")]
    Storage(#[from] rusqlite::Error),

    #[error("cached payload is not valid JSON: {0}")]
    Payload(#[from] serde_json::Error),

    #[error("cached timestamp '{0}' is not epoch millis")]
    Timestamp(String),
}

/// The last successful fetch.
#[derive(Debug, Clone, PartialEq)]
pub struct CacheEntry {
    pub payload: EventList,
    pub fetched_at: DateTime<Utc>,
}

/// Strictly older than `window`: data exactly `window` old is still fresh.
pub fn is_expired(fetched_at: DateTime<Utc>, now: DateTime<Utc>, window: Duration) -> bool {
    now.signed_duration_since(fetched_at) > window
}

pub trait CacheStore: Send {
    fn load(&self) -> Result<Option<CacheEntry>, CacheError>;
    fn save(&self, payload: &EventList, now: DateTime<Utc>) -> Result<(), CacheError>;
    fn clear(&self) -> Result<(), CacheError>;
}

/// SQLite-backed store (single connection with mutex)
#[derive(Clone)]
pub struct SqliteCache {
    conn: Arc<Mutex<Connection>>,
}

impl SqliteCache {
    /// Open (or create) the cache database at the given path. `:memory:` works too.
    pub fn open(path: &str) -> Result<Self, CacheError> {
        let conn = Connection::open(path)?;
        conn.execute_batch(SCHEMA_SQL)?;
        Ok(SqliteCache {
            conn: Arc::new(Mutex::new(conn)),
        })
    }

    fn conn(&self) -> MutexGuard<'_, Connection> {
        self.conn.lock().unwrap_or_else(|p| p.into_inner())
    }

    fn get(conn: &Connection, key: &str) -> Result<Option<String>, CacheError> {
        let value = conn
            .query_row(
                "SELECT value FROM storage WHERE key = ?1",
                params![key],
                |row| row.get(0),
            )
            .optional()?;
        Ok(value)
    }
}

impl CacheStore for SqliteCache {
    fn load(&self) -> Result<Option<CacheEntry>, CacheError> {
        let conn = self.conn();
        let (Some(data), Some(stamp)) = (
            Self::get(&conn, DATA_KEY)?,
            Self::get(&conn, TIMESTAMP_KEY)?,
        ) else {
            return Ok(None);
        };

        let payload: EventList = serde_json::from_str(&data)?;
        let fetched_at = stamp
            .trim()
            .parse::<i64>()
            .ok()
            .and_then(|ms| Utc.timestamp_millis_opt(ms).single())
            .ok_or_else(|| CacheError::Timestamp(stamp.clone()))?;

        Ok(Some(CacheEntry {
            payload,
            fetched_at,
        }))
    }

    fn save(&self, payload: &EventList, now: DateTime<Utc>) -> Result<(), CacheError> {
        let data = serde_json::to_string(payload)?;
        let mut conn = self.conn();
        let tx = conn.transaction()?;
        for (key, value) in [
            (DATA_KEY, data),
            (TIMESTAMP_KEY, now.timestamp_millis().to_string()),
        ] {
            tx.execute(
                "INSERT INTO storage (key, value) VALUES (?1, ?2)
                 ON CONFLICT(key) DO UPDATE SET value = excluded.value",
                params![key, value],
            )?;
        }
        tx.commit()?;
        Ok(())
    }

    fn clear(&self) -> Result<(), CacheError> {
        self.conn().execute(
            "DELETE FROM storage WHERE key IN (?1, ?2)",
            params![DATA_KEY, TIMESTAMP_KEY],
        )?;
        Ok(())
    }
}

/// SQLite schema (idempotent CREATE IF NOT EXISTS)
pub const SCHEMA_SQL: &str = r#"
CREATE TABLE IF NOT EXISTS storage (
    key   TEXT PRIMARY KEY,
    value TEXT NOT NULL
);
"#;

#[cfg(test)]
mod tests {
    use super::*;
    use crate::models::fixtures::events;

    fn at(ms: i64) -> DateTime<Utc> {
        Utc.timestamp_millis_opt(ms).unwrap()
    }

    #[test]
    fn test_load_empty_is_none() {
        let cache = SqliteCache::open(":memory:").unwrap();
        assert!(cache.load().unwrap().is_none());
    }

    #[test]
    fn test_save_then_load() {
        let cache = SqliteCache::open(":memory:").unwrap();
        cache.save(&events(3), at(1_504_958_400_000)).unwrap();

        let entry = cache.load().unwrap().unwrap();
        assert_eq!(entry.payload, events(3));
        assert_eq!(entry.fetched_at, at(1_504_958_400_000));
    }

    #[test]
    fn test_save_overwrites_previous_entry() {
        let cache = SqliteCache::open(":memory:").unwrap();
        cache.save(&events(3), at(1_000)).unwrap();
        cache.save(&events(1), at(2_000)).unwrap();

        let entry = cache.load().unwrap().unwrap();
        assert_eq!(entry.payload.len(), 1);
        assert_eq!(entry.fetched_at, at(2_000));
    }

    #[test]
    fn test_clear_removes_both_keys() {
        let cache = SqliteCache::open(":memory:").unwrap();
        cache.save(&events(2), at(1_000)).unwrap();
        cache.clear().unwrap();
        assert!(cache.load().unwrap().is_none());
        assert!(SqliteCache::get(&cache.conn(), TIMESTAMP_KEY).unwrap().is_none());
    }

    #[test]
    fn test_timestamp_stored_as_epoch_millis() {
        let cache = SqliteCache::open(":memory:").unwrap();
        cache.save(&events(1), at(1_504_958_400_123)).unwrap();
        let raw = SqliteCache::get(&cache.conn(), TIMESTAMP_KEY).unwrap();
        assert_eq!(raw.as_deref(), Some("1504958400123"));
    }

    #[test]
    fn test_corrupt_payload_is_error() {
        let cache = SqliteCache::open(":memory:").unwrap();
        cache.save(&events(1), at(1_000)).unwrap();
        cache
            .conn()
            .execute(
                "UPDATE storage SET value = 'not json' WHERE key = ?1",
                params![DATA_KEY],
            )
            .unwrap();
        assert!(matches!(cache.load(), Err(CacheError::Payload(_))));
    }

    #[test]
    fn test_freshness_boundary() {
        let window = Duration::milliseconds(120_000);
        assert!(!is_expired(at(0), at(119_999), window));
        assert!(!is_expired(at(0), at(120_000), window));
        assert!(is_expired(at(0), at(120_001), window));
    }
}
