pub mod error;
pub mod models;
pub mod persisted;

use error::{StorageError, StorageResult};
use models::KvEntryRow;
use serde::{de::DeserializeOwned, Serialize};
use sqlx::{
    sqlite::{SqliteConnectOptions, SqlitePoolOptions},
    Row,
    SqlitePool,
};
use std::{path::Path, str::FromStr};
use tracing::{debug, info};

static MIGRATOR: sqlx::migrate::Migrator = sqlx::migrate!("./migrations");

/// Local key-value storage. Every value is kept as a JSON document under a
/// string key, mirroring the platform storage the app runs on.
#[derive(Debug, Clone)]
pub struct KvStorage {
    pool: SqlitePool,
}

impl KvStorage {
    pub async fn open(db_path: &Path) -> StorageResult<Self> {
        if let Some(parent) = db_path.parent() {
            if !parent.as_os_str().is_empty() {
                std::fs::create_dir_all(parent)?;
            }
        }

        let opts = SqliteConnectOptions::from_str(&format!("sqlite://{}", db_path.display()))?
            .create_if_missing(true)
            .journal_mode(sqlx::sqlite::SqliteJournalMode::Wal)
            .synchronous(sqlx::sqlite::SqliteSynchronous::Normal)
            .busy_timeout(std::time::Duration::from_secs(5));

        let pool = SqlitePoolOptions::new()
            .max_connections(5)
            .connect_with(opts)
            .await?;

        MIGRATOR.run(&pool).await?;

        info!("storage initialized at {}", db_path.display());
        Ok(Self { pool })
    }

    /// Storage that lives as long as the returned handle. Used by tests and
    /// by callers that do not want anything written to disk.
    pub async fn in_memory() -> StorageResult<Self> {
        let opts = SqliteConnectOptions::from_str("sqlite::memory:")?;

        // a second connection would see a different empty database
        let pool = SqlitePoolOptions::new()
            .max_connections(1)
            .min_connections(1)
            .idle_timeout(None)
            .max_lifetime(None)
            .connect_with(opts)
            .await?;

        MIGRATOR.run(&pool).await?;

        Ok(Self { pool })
    }

    pub async fn get_item<T: DeserializeOwned>(&self, key: &str) -> StorageResult<Option<T>> {
        let Some(raw) = self.get_raw(key).await? else {
            return Ok(None);
        };

        serde_json::from_str(&raw)
            .map(Some)
            .map_err(|source| StorageError::Json {
                key: key.to_string(),
                source,
            })
    }

    pub async fn get_entry(&self, key: &str) -> StorageResult<Option<KvEntryRow>> {
        let row = sqlx::query(
            r#"
            SELECT key, value, updated_at_ms
            FROM kv_entries
            WHERE key = ?
            "#,
        )
        .bind(key)
        .fetch_optional(&self.pool)
        .await?;

        let Some(row) = row else {
            return Ok(None);
        };

        let raw: String = row.try_get("value")?;
        let value = serde_json::from_str(&raw).map_err(|source| StorageError::Json {
            key: key.to_string(),
            source,
        })?;

        Ok(Some(KvEntryRow {
            key: row.try_get("key")?,
            value,
            updated_at_ms: row.try_get("updated_at_ms")?,
        }))
    }

    pub async fn set_item<T: Serialize + ?Sized>(&self, key: &str, value: &T) -> StorageResult<()> {
        let raw = serde_json::to_string(value).map_err(|source| StorageError::Json {
            key: key.to_string(),
            source,
        })?;

        sqlx::query(
            r#"
            INSERT INTO kv_entries (key, value, updated_at_ms)
            VALUES (?, ?, ?)
            ON CONFLICT(key) DO UPDATE SET
              value = excluded.value,
              updated_at_ms = excluded.updated_at_ms
            "#,
        )
        .bind(key)
        .bind(raw)
        .bind(now_ms())
        .execute(&self.pool)
        .await?;

        debug!(key, "storage item written");
        Ok(())
    }

    /// Removing a key that is not present is not an error.
    pub async fn remove_item(&self, key: &str) -> StorageResult<()> {
        let res = sqlx::query("DELETE FROM kv_entries WHERE key = ?")
            .bind(key)
            .execute(&self.pool)
            .await?;

        if res.rows_affected() > 0 {
            debug!(key, "storage item removed");
        }
        Ok(())
    }

    async fn get_raw(&self, key: &str) -> StorageResult<Option<String>> {
        let value = sqlx::query_scalar::<_, String>("SELECT value FROM kv_entries WHERE key = ?")
            .bind(key)
            .fetch_optional(&self.pool)
            .await?;
        Ok(value)
    }
}

pub fn now_ms() -> i64 {
    use std::time::{SystemTime, UNIX_EPOCH};

    let duration = SystemTime::now()
        .duration_since(UNIX_EPOCH)
        .unwrap_or_default();
    duration.as_millis() as i64
}
