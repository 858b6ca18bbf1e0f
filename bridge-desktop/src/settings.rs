//! Key-value storage using SQLite

use async_trait::async_trait;
use bridge_traits::{
    error::{BridgeError, Result},
    storage::{SettingsStore, SettingsTransaction},
};
use sqlx::{
    sqlite::{SqliteConnectOptions, SqlitePool, SqlitePoolOptions},
    Row,
};
use std::path::{Path, PathBuf};
use std::str::FromStr;
use tracing::debug;

const CREATE_TABLE: &str = r#"
    CREATE TABLE IF NOT EXISTS kv_entries (
        key TEXT PRIMARY KEY,
        value TEXT NOT NULL,
        updated_at INTEGER NOT NULL
    )
"#;

const UPSERT: &str = r#"
    INSERT INTO kv_entries (key, value, updated_at)
    VALUES (?, ?, ?)
    ON CONFLICT(key) DO UPDATE SET
        value = excluded.value,
        updated_at = excluded.updated_at
"#;

/// SQLite result code for a full disk or database.
const SQLITE_FULL: &str = "13";

/// File name used under the application data directory.
pub const DEFAULT_DB_FILE: &str = "catalog.db";

/// SQLite-backed key-value store
///
/// Every key maps to a single text value. Multi-key updates go through
/// [`SettingsStore::begin_transaction`] and land atomically.
pub struct SqliteSettingsStore {
    pool: SqlitePool,
}

impl SqliteSettingsStore {
    /// Open (or create) a store at the given database path
    pub async fn new(db_path: PathBuf) -> Result<Self> {
        if let Some(parent) = db_path.parent() {
            tokio::fs::create_dir_all(parent)
                .await
                .map_err(BridgeError::Io)?;
        }

        let options = SqliteConnectOptions::new()
            .filename(&db_path)
            .create_if_missing(true);

        let pool = SqlitePool::connect_with(options)
            .await
            .map_err(|e| map_sqlx_error("Failed to connect to DB", e))?;

        Self::create_schema(&pool).await?;
        debug!(path = ?db_path, "Initialized key-value store");

        Ok(Self { pool })
    }

    /// Create an in-memory store (tests and ephemeral hosts)
    ///
    /// The pool is pinned to one connection that never expires: every
    /// connection to `sqlite::memory:` opens its own private database.
    pub async fn in_memory() -> Result<Self> {
        let options = SqliteConnectOptions::from_str("sqlite::memory:")
            .map_err(|e| map_sqlx_error("Invalid connection string", e))?;

        let pool = SqlitePoolOptions::new()
            .max_connections(1)
            .min_connections(1)
            .idle_timeout(None)
            .max_lifetime(None)
            .connect_with(options)
            .await
            .map_err(|e| map_sqlx_error("Failed to connect to DB", e))?;

        Self::create_schema(&pool).await?;
        Ok(Self { pool })
    }

    /// Platform data directory location for the store, e.g.
    /// `~/.local/share/melodymarket/catalog.db` on Linux.
    pub fn default_path() -> Option<PathBuf> {
        dirs::data_dir().map(|dir| Self::path_in(&dir.join("melodymarket")))
    }

    /// Database path inside a caller-chosen data directory.
    pub fn path_in(data_dir: &Path) -> PathBuf {
        data_dir.join(DEFAULT_DB_FILE)
    }

    async fn create_schema(pool: &SqlitePool) -> Result<()> {
        sqlx::query(CREATE_TABLE)
            .execute(pool)
            .await
            .map_err(|e| map_sqlx_error("Failed to create table", e))?;
        Ok(())
    }

    fn now() -> i64 {
        chrono::Utc::now().timestamp()
    }
}

fn map_sqlx_error(context: &str, err: sqlx::Error) -> BridgeError {
    if let sqlx::Error::Database(db_err) = &err {
        if db_err.code().as_deref() == Some(SQLITE_FULL) {
            return BridgeError::StorageFull(format!("{}: {}", context, db_err));
        }
    }
    BridgeError::OperationFailed(format!("{}: {}", context, err))
}

#[async_trait]
impl SettingsStore for SqliteSettingsStore {
    async fn set_string(&self, key: &str, value: &str) -> Result<()> {
        sqlx::query(UPSERT)
            .bind(key)
            .bind(value)
            .bind(Self::now())
            .execute(&self.pool)
            .await
            .map_err(|e| map_sqlx_error("Failed to write value", e))?;

        debug!(key = key, bytes = value.len(), "Stored value");
        Ok(())
    }

    async fn get_string(&self, key: &str) -> Result<Option<String>> {
        let row = sqlx::query("SELECT value FROM kv_entries WHERE key = ?")
            .bind(key)
            .fetch_optional(&self.pool)
            .await
            .map_err(|e| map_sqlx_error("Failed to read value", e))?;

        Ok(row.map(|row| row.get(0)))
    }

    async fn delete(&self, key: &str) -> Result<()> {
        sqlx::query("DELETE FROM kv_entries WHERE key = ?")
            .bind(key)
            .execute(&self.pool)
            .await
            .map_err(|e| map_sqlx_error("Failed to delete value", e))?;

        debug!(key = key, "Deleted value");
        Ok(())
    }

    async fn has_key(&self, key: &str) -> Result<bool> {
        let row = sqlx::query("SELECT 1 FROM kv_entries WHERE key = ?")
            .bind(key)
            .fetch_optional(&self.pool)
            .await
            .map_err(|e| map_sqlx_error("Failed to check key", e))?;

        Ok(row.is_some())
    }

    async fn list_keys(&self) -> Result<Vec<String>> {
        let rows = sqlx::query("SELECT key FROM kv_entries ORDER BY key")
            .fetch_all(&self.pool)
            .await
            .map_err(|e| map_sqlx_error("Failed to list keys", e))?;

        Ok(rows.into_iter().map(|row| row.get(0)).collect())
    }

    async fn clear_all(&self) -> Result<()> {
        sqlx::query("DELETE FROM kv_entries")
            .execute(&self.pool)
            .await
            .map_err(|e| map_sqlx_error("Failed to clear store", e))?;

        debug!("Cleared all values");
        Ok(())
    }

    async fn begin_transaction(&self) -> Result<Box<dyn SettingsTransaction + Send>> {
        let tx = self
            .pool
            .begin()
            .await
            .map_err(|e| map_sqlx_error("Failed to begin transaction", e))?;

        Ok(Box::new(SqliteSettingsTransaction { tx: Some(tx) }))
    }
}

struct SqliteSettingsTransaction {
    tx: Option<sqlx::Transaction<'static, sqlx::Sqlite>>,
}

impl SqliteSettingsTransaction {
    fn take(&mut self) -> Result<sqlx::Transaction<'static, sqlx::Sqlite>> {
        self.tx
            .take()
            .ok_or_else(|| BridgeError::OperationFailed("Transaction already finished".to_string()))
    }
}

#[async_trait]
impl SettingsTransaction for SqliteSettingsTransaction {
    async fn set_string(&mut self, key: &str, value: &str) -> Result<()> {
        let tx = self.tx.as_mut().ok_or_else(|| {
            BridgeError::OperationFailed("Transaction already finished".to_string())
        })?;

        sqlx::query(UPSERT)
            .bind(key)
            .bind(value)
            .bind(SqliteSettingsStore::now())
            .execute(&mut **tx)
            .await
            .map_err(|e| map_sqlx_error("Failed to write value", e))?;

        Ok(())
    }

    async fn commit(mut self: Box<Self>) -> Result<()> {
        self.take()?
            .commit()
            .await
            .map_err(|e| map_sqlx_error("Failed to commit", e))?;

        debug!("Committed transaction");
        Ok(())
    }

    async fn rollback(mut self: Box<Self>) -> Result<()> {
        self.take()?
            .rollback()
            .await
            .map_err(|e| map_sqlx_error("Failed to rollback", e))?;

        debug!("Rolled back transaction");
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[tokio::test]
    async fn test_string_operations() {
        let store = SqliteSettingsStore::in_memory().await.unwrap();

        store
            .set_string("melodymarket_initialized", "true")
            .await
            .unwrap();
        let value = store.get_string("melodymarket_initialized").await.unwrap();
        assert_eq!(value, Some("true".to_string()));

        store.delete("melodymarket_initialized").await.unwrap();
        let value = store.get_string("melodymarket_initialized").await.unwrap();
        assert_eq!(value, None);
    }

    #[tokio::test]
    async fn test_overwrite_keeps_single_entry() {
        let store = SqliteSettingsStore::in_memory().await.unwrap();

        store.set_string("k", "first").await.unwrap();
        store.set_string("k", "second").await.unwrap();

        assert_eq!(store.get_string("k").await.unwrap(), Some("second".into()));
        assert_eq!(store.list_keys().await.unwrap(), vec!["k"]);
    }

    #[tokio::test]
    async fn test_list_keys_and_clear() {
        let store = SqliteSettingsStore::in_memory().await.unwrap();

        store.set_string("key2", "value2").await.unwrap();
        store.set_string("key1", "value1").await.unwrap();
        assert!(store.has_key("key1").await.unwrap());

        let keys = store.list_keys().await.unwrap();
        assert_eq!(keys, vec!["key1", "key2"]);

        store.clear_all().await.unwrap();
        assert!(store.list_keys().await.unwrap().is_empty());
    }

    #[tokio::test]
    async fn test_transaction_commit_is_atomic() {
        let store = SqliteSettingsStore::in_memory().await.unwrap();

        let mut tx = store.begin_transaction().await.unwrap();
        tx.set_string("purchases", "[1]").await.unwrap();
        tx.set_string("user", "{}").await.unwrap();
        tx.commit().await.unwrap();

        assert_eq!(store.get_string("purchases").await.unwrap(), Some("[1]".into()));
        assert_eq!(store.get_string("user").await.unwrap(), Some("{}".into()));
    }

    #[tokio::test]
    async fn test_transaction_rollback_discards_writes() {
        let store = SqliteSettingsStore::in_memory().await.unwrap();
        store.set_string("user", "before").await.unwrap();

        let mut tx = store.begin_transaction().await.unwrap();
        tx.set_string("user", "after").await.unwrap();
        tx.rollback().await.unwrap();

        assert_eq!(store.get_string("user").await.unwrap(), Some("before".into()));
    }

    #[tokio::test]
    async fn test_file_backed_store_persists() {
        let dir = std::env::temp_dir().join(format!("mm-kv-{}", std::process::id()));
        let path = SqliteSettingsStore::path_in(&dir);

        {
            let store = SqliteSettingsStore::new(path.clone()).await.unwrap();
            store.set_string("melodymarket_user", "{}").await.unwrap();
        }

        let reopened = SqliteSettingsStore::new(path).await.unwrap();
        assert_eq!(
            reopened.get_string("melodymarket_user").await.unwrap(),
            Some("{}".into())
        );
        let _ = std::fs::remove_dir_all(dir);
    }
}
