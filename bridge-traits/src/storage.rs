//! Key-Value Storage Abstractions
//!
//! The storefront keeps its whole catalog (user, albums, purchase ledger) in a
//! host-provided key-value namespace. Values are opaque strings; the catalog
//! layer owns their encoding.

use async_trait::async_trait;

use crate::error::Result;

/// Key-value settings storage trait
///
/// Abstracts platform-specific persistent key-value storage:
/// - iOS: UserDefaults
/// - Android: SharedPreferences / DataStore
/// - Desktop: SQLite (`bridge-desktop`)
/// - Web: localStorage / IndexedDB
///
/// Values written with [`set_string`](SettingsStore::set_string) must be
/// returned byte-for-byte by [`get_string`](SettingsStore::get_string).
///
/// # Example
///
/// ```ignore
/// use bridge_traits::storage::SettingsStore;
///
/// async fn mark_seeded(store: &dyn SettingsStore) -> Result<()> {
///     store.set_string("melodymarket_initialized", "true").await?;
///     Ok(())
/// }
/// ```
#[async_trait]
pub trait SettingsStore: Send + Sync {
    /// Store a string value, replacing any previous value for the key
    async fn set_string(&self, key: &str, value: &str) -> Result<()>;

    /// Retrieve a string value
    ///
    /// Returns `Ok(None)` if the key doesn't exist.
    async fn get_string(&self, key: &str) -> Result<Option<String>>;

    /// Delete a value. Deleting a missing key is not an error.
    async fn delete(&self, key: &str) -> Result<()>;

    /// Check if a key exists
    async fn has_key(&self, key: &str) -> Result<bool> {
        Ok(self.get_string(key).await?.is_some())
    }

    /// List all keys
    async fn list_keys(&self) -> Result<Vec<String>>;

    /// Clear all values
    ///
    /// Use with caution! This wipes the whole namespace.
    async fn clear_all(&self) -> Result<()>;

    /// Begin a transaction for atomic multi-key updates
    ///
    /// Nothing written through the transaction is visible until
    /// [`commit`](SettingsTransaction::commit). Dropping the transaction
    /// without committing discards the writes.
    async fn begin_transaction(&self) -> Result<Box<dyn SettingsTransaction + Send>>;
}

/// Transaction for atomic settings updates
#[async_trait]
pub trait SettingsTransaction: Send {
    /// Set a value within the transaction
    async fn set_string(&mut self, key: &str, value: &str) -> Result<()>;

    /// Commit the transaction
    async fn commit(self: Box<Self>) -> Result<()>;

    /// Rollback the transaction
    async fn rollback(self: Box<Self>) -> Result<()>;
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::collections::HashMap;
    use std::sync::Mutex;

    #[derive(Default)]
    struct MapStore {
        values: Mutex<HashMap<String, String>>,
    }

    #[async_trait]
    impl SettingsStore for MapStore {
        async fn set_string(&self, key: &str, value: &str) -> Result<()> {
            self.values
                .lock()
                .unwrap()
                .insert(key.to_string(), value.to_string());
            Ok(())
        }

        async fn get_string(&self, key: &str) -> Result<Option<String>> {
            Ok(self.values.lock().unwrap().get(key).cloned())
        }

        async fn delete(&self, key: &str) -> Result<()> {
            self.values.lock().unwrap().remove(key);
            Ok(())
        }

        async fn list_keys(&self) -> Result<Vec<String>> {
            Ok(self.values.lock().unwrap().keys().cloned().collect())
        }

        async fn clear_all(&self) -> Result<()> {
            self.values.lock().unwrap().clear();
            Ok(())
        }

        async fn begin_transaction(&self) -> Result<Box<dyn SettingsTransaction + Send>> {
            Err(crate::BridgeError::NotAvailable("transactions".into()))
        }
    }

    #[tokio::test]
    async fn has_key_defaults_to_get_string() {
        let store = MapStore::default();
        assert!(!store.has_key("melodymarket_user").await.unwrap());

        store.set_string("melodymarket_user", "{}").await.unwrap();
        assert!(store.has_key("melodymarket_user").await.unwrap());
    }
}
