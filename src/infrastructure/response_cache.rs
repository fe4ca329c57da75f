use crate::infrastructure::error::ClientError;
use chrono::{DateTime, Utc};
use rusqlite::{Connection, OptionalExtension, params};
use std::collections::HashMap;
use std::path::{Path, PathBuf};
use std::sync::Mutex;

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct CachedResponse {
    pub payload: String,
    pub stored_at: DateTime<Utc>,
}

/// Keyed storage for fetched API payloads, so views can read recent data
/// without re-fetching on every mount.
pub trait ResponseCache: Send + Sync {
    fn load(&self, key: &str) -> Result<Option<CachedResponse>, ClientError>;
    fn store(&self, key: &str, payload: &str, stored_at: DateTime<Utc>) -> Result<(), ClientError>;
    fn invalidate(&self, key: &str) -> Result<(), ClientError>;
    fn clear(&self) -> Result<(), ClientError>;
}

#[derive(Debug, Default)]
pub struct InMemoryResponseCache {
    entries: Mutex<HashMap<String, CachedResponse>>,
}

impl InMemoryResponseCache {
    fn lock(&self) -> Result<std::sync::MutexGuard<'_, HashMap<String, CachedResponse>>, ClientError> {
        self.entries
            .lock()
            .map_err(|error| ClientError::InvalidConfig(format!("response cache lock poisoned: {error}")))
    }
}

impl ResponseCache for InMemoryResponseCache {
    fn load(&self, key: &str) -> Result<Option<CachedResponse>, ClientError> {
        Ok(self.lock()?.get(key).cloned())
    }

    fn store(&self, key: &str, payload: &str, stored_at: DateTime<Utc>) -> Result<(), ClientError> {
        self.lock()?.insert(
            key.to_string(),
            CachedResponse {
                payload: payload.to_string(),
                stored_at,
            },
        );
        Ok(())
    }

    fn invalidate(&self, key: &str) -> Result<(), ClientError> {
        self.lock()?.remove(key);
        Ok(())
    }

    fn clear(&self) -> Result<(), ClientError> {
        self.lock()?.clear();
        Ok(())
    }
}

/// SQLite-backed cache surviving restarts.
#[derive(Debug, Clone)]
pub struct SqliteResponseCache {
    db_path: PathBuf,
}

impl SqliteResponseCache {
    pub fn new(db_path: impl AsRef<Path>) -> Result<Self, ClientError> {
        let cache = Self {
            db_path: db_path.as_ref().to_path_buf(),
        };
        let connection = cache.connect()?;
        connection.execute_batch(
            "CREATE TABLE IF NOT EXISTS api_cache (
               cache_key TEXT PRIMARY KEY,
               payload   TEXT NOT NULL,
               stored_at TEXT NOT NULL
             )",
        )?;
        Ok(cache)
    }

    fn connect(&self) -> Result<Connection, ClientError> {
        Connection::open(&self.db_path).map_err(ClientError::from)
    }
}

impl ResponseCache for SqliteResponseCache {
    fn load(&self, key: &str) -> Result<Option<CachedResponse>, ClientError> {
        let connection = self.connect()?;
        let row: Option<(String, String)> = connection
            .query_row(
                "SELECT payload, stored_at FROM api_cache WHERE cache_key = ?1",
                params![key],
                |row| Ok((row.get(0)?, row.get(1)?)),
            )
            .optional()?;

        let Some((payload, stored_at_raw)) = row else {
            return Ok(None);
        };

        let stored_at = DateTime::parse_from_rfc3339(&stored_at_raw).map_err(|error| {
            ClientError::InvalidConfig(format!(
                "invalid api_cache.stored_at '{stored_at_raw}': {error}"
            ))
        })?;

        Ok(Some(CachedResponse {
            payload,
            stored_at: stored_at.with_timezone(&Utc),
        }))
    }

    fn store(&self, key: &str, payload: &str, stored_at: DateTime<Utc>) -> Result<(), ClientError> {
        let connection = self.connect()?;
        connection.execute(
            "INSERT INTO api_cache (cache_key, payload, stored_at)
             VALUES (?1, ?2, ?3)
             ON CONFLICT(cache_key) DO UPDATE SET
               payload = excluded.payload,
               stored_at = excluded.stored_at",
            params![key, payload, stored_at.to_rfc3339()],
        )?;
        Ok(())
    }

    fn invalidate(&self, key: &str) -> Result<(), ClientError> {
        let connection = self.connect()?;
        connection.execute("DELETE FROM api_cache WHERE cache_key = ?1", params![key])?;
        Ok(())
    }

    fn clear(&self) -> Result<(), ClientError> {
        let connection = self.connect()?;
        connection.execute("DELETE FROM api_cache", [])?;
        Ok(())
    }
}
