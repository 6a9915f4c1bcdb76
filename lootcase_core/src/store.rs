use std::collections::HashMap;

#[cfg(feature = "sqlite")]
use rusqlite::{params, Connection, OptionalExtension, TransactionBehavior};
#[cfg(feature = "sqlite")]
use std::{path::Path, time::Duration};

#[derive(Debug, thiserror::Error)]
pub enum StoreError {
    #[error("storage backend failure: {0}")]
    Backend(String),
    #[error("failed to encode state: {0}")]
    Encode(#[from] serde_json::Error),
    #[cfg(feature = "sqlite")]
    #[error("sqlite: {0}")]
    Sqlite(#[from] rusqlite::Error),
}

/// String values under a few keys, possibly shared by several processes.
pub trait KeyValueStore {
    /// Reads `keys`, hands their values to `f` and writes back the values it
    /// returns (same order), as one atomic read-modify-write. `None` skips the
    /// write; an error from `f` leaves the store untouched.
    fn update<T, E, F>(&mut self, keys: &[&str], f: F) -> Result<T, E>
    where
        E: From<StoreError>,
        F: FnOnce(Vec<Option<String>>) -> Result<(Option<Vec<String>>, T), E>;

    /// Current values of `keys`, taken from one snapshot.
    fn read(&mut self, keys: &[&str]) -> Result<Vec<Option<String>>, StoreError> {
        self.update(keys, |values| Ok((None, values)))
    }
}

/// In-process store, used by tests and embedders that persist elsewhere.
#[derive(Debug, Clone, Default)]
pub struct MemoryStore {
    values: HashMap<String, String>,
}

impl MemoryStore {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn with_entries<'a>(entries: impl IntoIterator<Item = (&'a str, &'a str)>) -> Self {
        Self {
            values: entries
                .into_iter()
                .map(|(k, v)| (k.to_string(), v.to_string()))
                .collect(),
        }
    }

    pub fn get(&self, key: &str) -> Option<&str> {
        self.values.get(key).map(String::as_str)
    }
}

impl KeyValueStore for MemoryStore {
    fn update<T, E, F>(&mut self, keys: &[&str], f: F) -> Result<T, E>
    where
        E: From<StoreError>,
        F: FnOnce(Vec<Option<String>>) -> Result<(Option<Vec<String>>, T), E>,
    {
        let current = keys.iter().map(|key| self.values.get(*key).cloned()).collect();
        let (next, out) = f(current)?;
        if let Some(next) = next {
            for (key, value) in keys.iter().zip(next) {
                self.values.insert((*key).to_string(), value);
            }
        }
        Ok(out)
    }
}

/// Default database location
#[cfg(feature = "sqlite")]
pub const DEFAULT_DB_PATH: &str = "lootcase.db";

/// SQLite-backed store, one row per key. Several processes may open the
/// same file; every update holds the write lock from read to commit.
#[cfg(feature = "sqlite")]
pub struct SqliteStore {
    conn: Connection,
}

#[cfg(feature = "sqlite")]
impl SqliteStore {
    /// Open or create the database
    pub fn open<P: AsRef<Path>>(path: P) -> Result<Self, StoreError> {
        Self::init(Connection::open(path.as_ref())?)
    }

    /// Open an in-memory database (for testing)
    pub fn open_in_memory() -> Result<Self, StoreError> {
        Self::init(Connection::open_in_memory()?)
    }

    fn init(conn: Connection) -> Result<Self, StoreError> {
        conn.busy_timeout(Duration::from_secs(5))?;
        conn.execute_batch(
            "CREATE TABLE IF NOT EXISTS kv (
                key TEXT PRIMARY KEY NOT NULL,
                value TEXT NOT NULL
            );",
        )?;
        Ok(Self { conn })
    }
}

#[cfg(feature = "sqlite")]
impl KeyValueStore for SqliteStore {
    fn update<T, E, F>(&mut self, keys: &[&str], f: F) -> Result<T, E>
    where
        E: From<StoreError>,
        F: FnOnce(Vec<Option<String>>) -> Result<(Option<Vec<String>>, T), E>,
    {
        let tx = self
            .conn
            .transaction_with_behavior(TransactionBehavior::Immediate)
            .map_err(StoreError::from)?;
        let current = keys
            .iter()
            .map(|key| {
                tx.query_row("SELECT value FROM kv WHERE key = ?1", params![key], |row| {
                    row.get(0)
                })
                .optional()
            })
            .collect::<Result<Vec<Option<String>>, _>>()
            .map_err(StoreError::from)?;
        // dropping `tx` on error rolls back
        let (next, out) = f(current)?;
        if let Some(next) = next {
            for (key, value) in keys.iter().zip(&next) {
                tx.execute(
                    "INSERT INTO kv (key, value) VALUES (?1, ?2)
                     ON CONFLICT(key) DO UPDATE SET value = excluded.value",
                    params![key, value],
                )
                .map_err(StoreError::from)?;
            }
        }
        tx.commit().map_err(StoreError::from)?;
        Ok(out)
    }
}
