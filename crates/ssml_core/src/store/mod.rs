//! Persistence of serialized editor markup under string keys.
//!
//! # Responsibility
//! - Define the write/read capabilities a session persists through.
//! - Provide the SQLite-backed implementation.
//!
//! # Invariants
//! - Keys are trimmed and never blank.
//! - A write replaces the previous markup for its key wholesale.
//! - Stored markup is opaque here; parsing belongs to the codec.

use crate::db::{open_db, open_db_in_memory, DbError};
use log::{debug, error};
use rusqlite::{params, Connection, OptionalExtension};
use std::error::Error;
use std::fmt::{Display, Formatter};
use std::path::Path;
use std::time::{SystemTime, UNIX_EPOCH};

pub type StoreResult<T> = Result<T, StoreError>;

#[derive(Debug)]
pub enum StoreError {
    Db(DbError),
    InvalidKey,
}

impl Display for StoreError {
    fn fmt(&self, f: &mut Formatter<'_>) -> std::fmt::Result {
        match self {
            Self::Db(err) => write!(f, "{err}"),
            Self::InvalidKey => write!(f, "storage key must not be blank"),
        }
    }
}

impl Error for StoreError {
    fn source(&self) -> Option<&(dyn Error + 'static)> {
        match self {
            Self::Db(err) => Some(err),
            Self::InvalidKey => None,
        }
    }
}

impl From<DbError> for StoreError {
    fn from(value: DbError) -> Self {
        Self::Db(value)
    }
}

impl From<rusqlite::Error> for StoreError {
    fn from(value: rusqlite::Error) -> Self {
        Self::Db(DbError::Sqlite(value))
    }
}

/// Write side of markup persistence.
pub trait MarkupSink: Send {
    fn write_markup(&self, key: &str, markup: &str) -> StoreResult<()>;
}

/// Read side of markup persistence.
pub trait MarkupSource {
    /// Markup stored under `key`, or `None` when nothing was written yet.
    fn read_markup(&self, key: &str) -> StoreResult<Option<String>>;
}

/// Stored row metadata.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct StoredMarkup {
    pub key: String,
    pub markup: String,
    /// Epoch milliseconds of the last write.
    pub updated_at: i64,
}

/// SQLite-backed markup store owning its connection.
pub struct SqliteMarkupStore {
    conn: Connection,
}

impl SqliteMarkupStore {
    /// Wraps an already migrated connection.
    pub fn new(conn: Connection) -> Self {
        Self { conn }
    }

    pub fn open(path: impl AsRef<Path>) -> StoreResult<Self> {
        Ok(Self::new(open_db(path)?))
    }

    pub fn open_in_memory() -> StoreResult<Self> {
        Ok(Self::new(open_db_in_memory()?))
    }

    /// Full row for `key`.
    pub fn get(&self, key: &str) -> StoreResult<Option<StoredMarkup>> {
        let key = normalize_key(key)?;
        let row = self
            .conn
            .query_row(
                "SELECT key, markup, updated_at FROM documents WHERE key = ?1;",
                params![key],
                |row| {
                    Ok(StoredMarkup {
                        key: row.get(0)?,
                        markup: row.get(1)?,
                        updated_at: row.get(2)?,
                    })
                },
            )
            .optional()?;
        Ok(row)
    }

    /// Stored keys, most recently written first.
    pub fn keys(&self) -> StoreResult<Vec<String>> {
        let mut stmt = self
            .conn
            .prepare("SELECT key FROM documents ORDER BY updated_at DESC, key ASC;")?;
        let keys = stmt
            .query_map([], |row| row.get::<_, String>(0))?
            .collect::<Result<Vec<_>, _>>()?;
        Ok(keys)
    }

    /// Deletes `key`; returns whether a row existed.
    pub fn delete(&self, key: &str) -> StoreResult<bool> {
        let key = normalize_key(key)?;
        let removed = self
            .conn
            .execute("DELETE FROM documents WHERE key = ?1;", params![key])?;
        Ok(removed > 0)
    }
}

impl MarkupSink for SqliteMarkupStore {
    fn write_markup(&self, key: &str, markup: &str) -> StoreResult<()> {
        let key = normalize_key(key)?;
        let result = self.conn.execute(
            "INSERT INTO documents (key, markup, updated_at) VALUES (?1, ?2, ?3)
             ON CONFLICT(key) DO UPDATE SET markup = excluded.markup, updated_at = excluded.updated_at;",
            params![key, markup, now_epoch_ms()],
        );
        match result {
            Ok(_) => {
                debug!(
                    "event=markup_write module=store status=ok key={} bytes={}",
                    key,
                    markup.len()
                );
                Ok(())
            }
            Err(err) => {
                error!(
                    "event=markup_write module=store status=error key={} error={}",
                    key, err
                );
                Err(err.into())
            }
        }
    }
}

impl MarkupSource for SqliteMarkupStore {
    fn read_markup(&self, key: &str) -> StoreResult<Option<String>> {
        Ok(self.get(key)?.map(|stored| stored.markup))
    }
}

fn normalize_key(key: &str) -> StoreResult<&str> {
    let trimmed = key.trim();
    if trimmed.is_empty() {
        return Err(StoreError::InvalidKey);
    }
    Ok(trimmed)
}

fn now_epoch_ms() -> i64 {
    SystemTime::now()
        .duration_since(UNIX_EPOCH)
        .map_or(0, |elapsed| elapsed.as_millis() as i64)
}

#[cfg(test)]
mod tests {
    use super::{MarkupSink, MarkupSource, SqliteMarkupStore, StoreError};

    #[test]
    fn write_then_read_replaces_previous_markup() {
        let store = SqliteMarkupStore::open_in_memory().unwrap();
        assert_eq!(store.read_markup("content").unwrap(), None);

        store.write_markup("content", "<p>one</p>").unwrap();
        store.write_markup(" content ", "<p>two</p>").unwrap();

        assert_eq!(
            store.read_markup("content").unwrap().as_deref(),
            Some("<p>two</p>")
        );
        assert_eq!(store.keys().unwrap(), vec!["content".to_string()]);
    }

    #[test]
    fn blank_key_is_rejected() {
        let store = SqliteMarkupStore::open_in_memory().unwrap();
        let err = store.write_markup("  ", "<p></p>").unwrap_err();
        assert!(matches!(err, StoreError::InvalidKey));
    }

    #[test]
    fn delete_reports_presence() {
        let store = SqliteMarkupStore::open_in_memory().unwrap();
        store.write_markup("draft", "<p>x</p>").unwrap();
        assert!(store.delete("draft").unwrap());
        assert!(!store.delete("draft").unwrap());
        assert!(store.get("draft").unwrap().is_none());
    }
}
