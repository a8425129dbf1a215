//! Durable key/value storage for on-device state.
//!
//! [`LocalStorage`] plays the role browser `localStorage` played for the web
//! client: string keys mapping to JSON-encoded string values. It is backed by
//! the `local_storage` table of the SQLite [`Database`].
//!
//! Collections (profiles, playlists, continue-watching lists) are always
//! written whole. [`LocalStorage::update_json`] runs the read-modify-write of a
//! collection inside one `BEGIN IMMEDIATE` transaction so two writers cannot
//! interleave and lose an update.

mod error;
pub mod keys;

pub use error::StorageError;

use chrono::{SecondsFormat, Utc};
use rand::RngCore;
use serde::Serialize;
use serde::de::DeserializeOwned;
use sqlx::Row;
use sqlx::SqliteConnection;
use tracing::{debug, instrument, warn};

use crate::db::Database;

/// Length in bytes of generated record ids (rendered as hex).
const RECORD_ID_BYTES: usize = 16;

/// Key/value store persisted in SQLite.
#[derive(Debug, Clone)]
pub struct LocalStorage {
    db: Database,
}

impl LocalStorage {
    /// Wraps an open database.
    #[must_use]
    pub fn new(db: Database) -> Self {
        Self { db }
    }

    /// Returns the underlying database handle.
    #[must_use]
    pub fn database(&self) -> &Database {
        &self.db
    }

    /// Reads the raw string stored under `key`.
    ///
    /// # Errors
    ///
    /// Returns [`StorageError::Database`] if the query fails.
    #[instrument(skip(self))]
    pub async fn get_item(&self, key: &str) -> Result<Option<String>, StorageError> {
        let row = sqlx::query("SELECT value FROM local_storage WHERE key = ?")
            .bind(key)
            .fetch_optional(self.db.pool())
            .await?;
        Ok(row.map(|row| row.get("value")))
    }

    /// Stores a raw string under `key`, replacing any previous value.
    ///
    /// # Errors
    ///
    /// Returns [`StorageError::Database`] if the write fails.
    #[instrument(skip(self, value), fields(bytes = value.len()))]
    pub async fn set_item(&self, key: &str, value: &str) -> Result<(), StorageError> {
        let mut conn = self.db.pool().acquire().await?;
        write_item(&mut conn, key, value).await
    }

    /// Removes `key`. Returns `true` when a value was present.
    ///
    /// # Errors
    ///
    /// Returns [`StorageError::Database`] if the delete fails.
    #[instrument(skip(self))]
    pub async fn remove_item(&self, key: &str) -> Result<bool, StorageError> {
        let result = sqlx::query("DELETE FROM local_storage WHERE key = ?")
            .bind(key)
            .execute(self.db.pool())
            .await?;
        Ok(result.rows_affected() > 0)
    }

    /// Reads and decodes the JSON value under `key`.
    ///
    /// # Errors
    ///
    /// Returns [`StorageError::Corrupt`] when the stored text does not decode
    /// as `T`, or [`StorageError::Database`] if the read fails.
    pub async fn get_json<T: DeserializeOwned>(
        &self,
        key: &str,
    ) -> Result<Option<T>, StorageError> {
        match self.get_item(key).await? {
            Some(raw) => decode(key, &raw).map(Some),
            None => Ok(None),
        }
    }

    /// Encodes `value` as JSON and stores it under `key`.
    ///
    /// # Errors
    ///
    /// Returns [`StorageError::Serialize`] or [`StorageError::Database`].
    pub async fn set_json<T: Serialize + ?Sized>(
        &self,
        key: &str,
        value: &T,
    ) -> Result<(), StorageError> {
        let encoded = encode(key, value)?;
        self.set_item(key, &encoded).await
    }

    /// Returns the stored collection, seeding it with `init()` when the key is
    /// absent or its value is corrupt.
    ///
    /// # Errors
    ///
    /// Returns [`StorageError`] when the read or the seeding write fails.
    pub async fn load_or_init<T, I>(&self, key: &str, init: I) -> Result<T, StorageError>
    where
        T: Serialize + DeserializeOwned,
        I: FnOnce() -> T,
    {
        match self.get_json::<T>(key).await {
            Ok(Some(value)) => Ok(value),
            Ok(None) => {
                debug!(key, "seeding default value");
                let value = init();
                self.set_json(key, &value).await?;
                Ok(value)
            }
            Err(StorageError::Corrupt { source, .. }) => {
                warn!(key, error = %source, "stored value is corrupt; reseeding default");
                let value = init();
                self.set_json(key, &value).await?;
                Ok(value)
            }
            Err(other) => Err(other),
        }
    }

    /// Atomically reads the value under `key`, applies `mutate`, and writes
    /// the result back.
    ///
    /// An absent or corrupt value starts from `init()`. The whole sequence
    /// runs in one immediate transaction; on any error nothing is written.
    ///
    /// # Errors
    ///
    /// Returns [`StorageError`] if the transaction cannot be opened, the
    /// value cannot be encoded, or the write fails.
    #[instrument(skip(self, init, mutate))]
    pub async fn update_json<T, R, I, F>(
        &self,
        key: &str,
        init: I,
        mutate: F,
    ) -> Result<R, StorageError>
    where
        T: Serialize + DeserializeOwned,
        I: FnOnce() -> T,
        F: FnOnce(&mut T) -> R,
    {
        // Rolls back on drop, including when this future is cancelled.
        let mut tx = self.db.pool().begin_with("BEGIN IMMEDIATE").await?;
        let result = update_in_transaction(&mut tx, key, init, mutate).await?;
        tx.commit().await?;
        Ok(result)
    }
}

async fn update_in_transaction<T, R, I, F>(
    conn: &mut SqliteConnection,
    key: &str,
    init: I,
    mutate: F,
) -> Result<R, StorageError>
where
    T: Serialize + DeserializeOwned,
    I: FnOnce() -> T,
    F: FnOnce(&mut T) -> R,
{
    let row = sqlx::query("SELECT value FROM local_storage WHERE key = ?")
        .bind(key)
        .fetch_optional(&mut *conn)
        .await?;

    let mut value = match row.map(|row| row.get::<String, _>("value")) {
        Some(raw) => decode(key, &raw).unwrap_or_else(|error| {
            warn!(key, %error, "stored value is corrupt; starting from default");
            init()
        }),
        None => init(),
    };

    let result = mutate(&mut value);
    let encoded = encode(key, &value)?;
    write_item(conn, key, &encoded).await?;
    Ok(result)
}

async fn write_item(
    conn: &mut SqliteConnection,
    key: &str,
    value: &str,
) -> Result<(), StorageError> {
    sqlx::query(
        r"INSERT INTO local_storage (key, value, updated_at)
          VALUES (?, ?, strftime('%Y-%m-%dT%H:%M:%fZ', 'now'))
          ON CONFLICT(key) DO UPDATE SET
              value = excluded.value,
              updated_at = excluded.updated_at",
    )
    .bind(key)
    .bind(value)
    .execute(conn)
    .await?;
    Ok(())
}

fn decode<T: DeserializeOwned>(key: &str, raw: &str) -> Result<T, StorageError> {
    serde_json::from_str(raw).map_err(|source| StorageError::corrupt(key, source))
}

fn encode<T: Serialize + ?Sized>(key: &str, value: &T) -> Result<String, StorageError> {
    serde_json::to_string(value).map_err(|source| StorageError::serialize(key, source))
}

/// Generates a random record id (32 lowercase hex characters).
#[must_use]
pub fn generate_id() -> String {
    let mut bytes = [0_u8; RECORD_ID_BYTES];
    rand::thread_rng().fill_bytes(&mut bytes);
    hex_encode(&bytes)
}

/// Current UTC time as RFC 3339 with millisecond precision.
#[must_use]
pub fn timestamp_now() -> String {
    Utc::now().to_rfc3339_opts(SecondsFormat::Millis, true)
}

fn hex_encode(bytes: &[u8]) -> String {
    const HEX: &[u8; 16] = b"0123456789abcdef";
    let mut out = String::with_capacity(bytes.len() * 2);
    for byte in bytes {
        out.push(char::from(HEX[usize::from(byte >> 4)]));
        out.push(char::from(HEX[usize::from(byte & 0x0f)]));
    }
    out
}
