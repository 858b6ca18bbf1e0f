//! # Catalog Store
//!
//! Local persistence for the storefront: the single user account, the album
//! catalog (tracks nested inside albums) and the purchase ledger, each kept
//! as one JSON value in a [`SettingsStore`] namespace.
//!
//! ## Reads and writes
//!
//! Public reads never fail. A missing key reads as absent or empty, and an
//! unreadable record is logged at `warn` and treated the same way.
//!
//! Writes are read-modify-write cycles over whole records. They run one at a
//! time behind an async writer lock, read the record they are about to
//! replace strictly, and refuse with [`CatalogError::CorruptRecord`] rather
//! than overwrite data they could not parse. Multi-record updates go through
//! a single storage transaction.
//!
//! ## Usage
//!
//! ```no_run
//! use bridge_traits::{SettingsStore, SystemClock};
//! use core_catalog::{CatalogOptions, CatalogStore};
//! use std::sync::Arc;
//!
//! # async fn example(storage: Arc<dyn SettingsStore>) -> core_catalog::Result<()> {
//! let store = CatalogStore::new(storage, Arc::new(SystemClock), CatalogOptions::default());
//! store.initialize().await?;
//!
//! if store.get_current_user().await.is_none() {
//!     store.set_current_user("Music Lover", "user@example.com", false).await?;
//! }
//!
//! let owned = store.get_user_purchased_albums().await;
//! # Ok(())
//! # }
//! ```

use crate::error::{CatalogError, Result};
use crate::keys::StorageKeys;
use crate::models::{Album, Purchase, User, UserStats};
use crate::seed::{
    sample_albums, sample_purchases, SAMPLE_DOWNLOADED_ALBUMS, SAMPLE_PURCHASED_ALBUMS,
};
use bridge_traits::storage::SettingsStore;
use bridge_traits::time::Clock;
use chrono::{DateTime, Utc};
use core_runtime::config::DEFAULT_STORAGE_NAMESPACE;
use core_runtime::events::{CatalogEvent, CoreEvent, EventBus};
use core_runtime::logging::redact_if_sensitive;
use serde::de::DeserializeOwned;
use serde::Serialize;
use std::sync::Arc;
use tokio::sync::Mutex;
use tracing::{debug, info, instrument, warn};

/// Value written under the `initialized` key once seeding completes.
const INITIALIZED_MARKER: &str = "true";

/// Construction options for [`CatalogStore`].
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct CatalogOptions {
    /// Prefix for every persisted key
    pub namespace: String,
    /// Grant the sample purchases to newly created accounts
    pub seed_demo_account: bool,
}

impl Default for CatalogOptions {
    fn default() -> Self {
        Self {
            namespace: DEFAULT_STORAGE_NAMESPACE.to_string(),
            seed_demo_account: true,
        }
    }
}

/// Key-value backed catalog of users, albums and purchases.
pub struct CatalogStore {
    storage: Arc<dyn SettingsStore>,
    clock: Arc<dyn Clock>,
    keys: StorageKeys,
    options: CatalogOptions,
    events: Option<EventBus>,
    /// Held for the whole of every read-modify-write cycle
    write_lock: Mutex<()>,
}

impl CatalogStore {
    pub fn new(
        storage: Arc<dyn SettingsStore>,
        clock: Arc<dyn Clock>,
        options: CatalogOptions,
    ) -> Self {
        Self {
            storage,
            clock,
            keys: StorageKeys::new(&options.namespace),
            options,
            events: None,
            write_lock: Mutex::new(()),
        }
    }

    /// Publish catalog changes on `events`.
    pub fn with_event_bus(mut self, events: EventBus) -> Self {
        self.events = Some(events);
        self
    }

    pub fn keys(&self) -> &StorageKeys {
        &self.keys
    }

    pub fn options(&self) -> &CatalogOptions {
        &self.options
    }

    // ------------------------------------------------------------------
    // Seeding
    // ------------------------------------------------------------------

    /// Seed the sample albums on first run.
    ///
    /// Does nothing once the `initialized` marker exists. Sample albums whose
    /// id is already stored are left alone, and the albums and the marker are
    /// written together.
    #[instrument(skip(self))]
    pub async fn initialize(&self) -> Result<()> {
        let _guard = self.write_lock.lock().await;

        if self.storage.has_key(&self.keys.initialized).await? {
            debug!("Catalog already initialized");
            return Ok(());
        }

        let mut albums: Vec<Album> = self
            .read_strict(&self.keys.albums)
            .await?
            .unwrap_or_default();

        let mut inserted = 0u32;
        for sample in sample_albums(self.clock.now()) {
            if albums.iter().any(|album| album.id == sample.id) {
                debug!(album_id = %sample.id, "Sample album already stored, skipping");
                continue;
            }
            albums.push(sample);
            inserted += 1;
        }

        self.commit_all(vec![
            (self.keys.albums.as_str(), encode(&albums)?),
            (self.keys.initialized.as_str(), INITIALIZED_MARKER.to_string()),
        ])
        .await?;

        info!(inserted, total = albums.len(), "Seeded sample catalog");
        self.emit(CatalogEvent::Seeded {
            album_count: inserted,
        });

        Ok(())
    }

    /// Grant the sample purchases and downloads to `user` and persist it.
    ///
    /// Album ids already on the user are not repeated. The two backdated
    /// ledger rows are appended on every call.
    #[instrument(skip(self, user), fields(user_id = %user.id))]
    pub async fn seed_sample_account(&self, user: &User) -> Result<User> {
        let _guard = self.write_lock.lock().await;
        self.apply_sample_account(user.clone(), self.clock.now())
            .await
    }

    /// Caller holds the write lock.
    async fn apply_sample_account(&self, mut user: User, now: DateTime<Utc>) -> Result<User> {
        let mut purchases: Vec<Purchase> = self
            .read_strict(&self.keys.purchases)
            .await?
            .unwrap_or_default();

        for album_id in SAMPLE_PURCHASED_ALBUMS {
            if !user.has_purchased(album_id) {
                user.purchased_albums.push(album_id.to_string());
            }
        }
        for album_id in SAMPLE_DOWNLOADED_ALBUMS {
            if !user.has_downloaded(album_id) {
                user.downloaded_albums.push(album_id.to_string());
            }
        }
        purchases.extend(sample_purchases(&user.id, now));

        self.commit_all(vec![
            (self.keys.user.as_str(), encode(&user)?),
            (self.keys.purchases.as_str(), encode(&purchases)?),
        ])
        .await?;

        debug!(ledger_rows = purchases.len(), "Applied sample account");
        Ok(user)
    }

    // ------------------------------------------------------------------
    // User
    // ------------------------------------------------------------------

    /// The stored account, or `None` when absent or unreadable.
    pub async fn get_current_user(&self) -> Option<User> {
        self.read_soft(&self.keys.user).await
    }

    /// Create and persist a fresh account, replacing any stored one.
    ///
    /// The id is the current time in milliseconds. With demo seeding enabled
    /// the sample purchases are applied in the same write.
    #[instrument(skip(self, name, email))]
    pub async fn set_current_user(
        &self,
        name: &str,
        email: &str,
        is_artist: bool,
    ) -> Result<User> {
        let _guard = self.write_lock.lock().await;

        let now = self.clock.now();
        let user = User::new(now.timestamp_millis().to_string(), name, email, is_artist, now);
        check_user(&user)?;

        let user = if self.options.seed_demo_account {
            self.apply_sample_account(user, now).await?
        } else {
            self.storage
                .set_string(&self.keys.user, &encode(&user)?)
                .await?;
            user
        };

        info!(
            user_id = %user.id,
            email = %redact_if_sensitive("email", &user.email),
            is_artist,
            "Created user"
        );
        self.emit(CatalogEvent::UserCreated {
            user_id: user.id.clone(),
            is_artist,
        });

        Ok(user)
    }

    /// Overwrite the stored account.
    #[instrument(skip(self, user), fields(user_id = %user.id))]
    pub async fn save_user(&self, user: &User) -> Result<()> {
        check_user(user)?;
        let _guard = self.write_lock.lock().await;

        self.storage
            .set_string(&self.keys.user, &encode(user)?)
            .await?;

        debug!("Saved user");
        self.emit(CatalogEvent::UserUpdated {
            user_id: user.id.clone(),
        });
        Ok(())
    }

    /// Flip artist mode on the stored account.
    ///
    /// Returns `None` when no account exists.
    #[instrument(skip(self))]
    pub async fn toggle_artist_mode(&self) -> Result<Option<User>> {
        let _guard = self.write_lock.lock().await;

        let Some(mut user) = self.read_strict::<User>(&self.keys.user).await? else {
            debug!("No current user to toggle");
            return Ok(None);
        };

        user.is_artist = !user.is_artist;
        self.storage
            .set_string(&self.keys.user, &encode(&user)?)
            .await?;

        info!(user_id = %user.id, is_artist = user.is_artist, "Toggled artist mode");
        self.emit(CatalogEvent::UserUpdated {
            user_id: user.id.clone(),
        });
        Ok(Some(user))
    }

    // ------------------------------------------------------------------
    // Albums
    // ------------------------------------------------------------------

    /// Every stored album, in insertion order.
    pub async fn get_albums(&self) -> Vec<Album> {
        self.read_soft(&self.keys.albums).await.unwrap_or_default()
    }

    /// Insert `album`, or replace the stored album with the same id in place.
    #[instrument(skip(self, album), fields(album_id = %album.id))]
    pub async fn save_album(&self, album: &Album) -> Result<()> {
        let _guard = self.write_lock.lock().await;

        let mut albums: Vec<Album> = self
            .read_strict(&self.keys.albums)
            .await?
            .unwrap_or_default();

        let created = match albums.iter_mut().find(|stored| stored.id == album.id) {
            Some(stored) => {
                *stored = album.clone();
                false
            }
            None => {
                albums.push(album.clone());
                true
            }
        };

        self.storage
            .set_string(&self.keys.albums, &encode(&albums)?)
            .await?;

        debug!(created, "Saved album");
        self.emit(CatalogEvent::AlbumSaved {
            album_id: album.id.clone(),
            created,
            track_count: album.tracks.len() as u32,
        });
        Ok(())
    }

    /// Albums in `genre`; `"All"` returns the whole catalog.
    pub async fn get_albums_by_genre(&self, genre: &str) -> Vec<Album> {
        self.get_albums()
            .await
            .into_iter()
            .filter(|album| album.matches_genre(genre))
            .collect()
    }

    pub async fn get_albums_by_artist(&self, artist_id: &str) -> Vec<Album> {
        self.get_albums()
            .await
            .into_iter()
            .filter(|album| album.artist_id == artist_id)
            .collect()
    }

    // ------------------------------------------------------------------
    // Purchases
    // ------------------------------------------------------------------

    /// The whole purchase ledger, oldest row first.
    pub async fn get_purchases(&self) -> Vec<Purchase> {
        self.read_soft(&self.keys.purchases)
            .await
            .unwrap_or_default()
    }

    /// Append `purchase` to the ledger and to the current user's purchased
    /// albums.
    ///
    /// Buying an album twice records it twice in both places. Without a
    /// current user only the ledger changes.
    #[instrument(
        skip(self, purchase),
        fields(purchase_id = %purchase.id, album_id = %purchase.album_id)
    )]
    pub async fn save_purchase(&self, purchase: &Purchase) -> Result<()> {
        let _guard = self.write_lock.lock().await;

        let mut purchases: Vec<Purchase> = self
            .read_strict(&self.keys.purchases)
            .await?
            .unwrap_or_default();
        let mut user: Option<User> = self.read_strict(&self.keys.user).await?;

        purchases.push(purchase.clone());

        let mut writes = vec![(self.keys.purchases.as_str(), encode(&purchases)?)];
        if let Some(user) = user.as_mut() {
            user.purchased_albums.push(purchase.album_id.clone());
            writes.push((self.keys.user.as_str(), encode(&*user)?));
        } else {
            warn!("No current user, recording purchase in ledger only");
        }

        self.commit_all(writes).await?;

        info!(price = purchase.price, "Recorded purchase");
        self.emit(CatalogEvent::PurchaseRecorded {
            purchase_id: purchase.id.clone(),
            album_id: purchase.album_id.clone(),
            user_id: purchase.user_id.clone(),
        });
        Ok(())
    }

    pub async fn has_user_purchased_album(&self, album_id: &str) -> bool {
        self.get_current_user()
            .await
            .is_some_and(|user| user.has_purchased(album_id))
    }

    /// Catalog albums the current user owns, in catalog order.
    pub async fn get_user_purchased_albums(&self) -> Vec<Album> {
        self.albums_for_user(|user, album_id| user.has_purchased(album_id))
            .await
    }

    /// Catalog albums the current user has downloaded, in catalog order.
    pub async fn get_user_downloaded_albums(&self) -> Vec<Album> {
        self.albums_for_user(|user, album_id| user.has_downloaded(album_id))
            .await
    }

    async fn albums_for_user<F>(&self, include: F) -> Vec<Album>
    where
        F: Fn(&User, &str) -> bool,
    {
        let Some(user) = self.get_current_user().await else {
            return Vec::new();
        };

        self.get_albums()
            .await
            .into_iter()
            .filter(|album| include(&user, &album.id))
            .collect()
    }

    /// Add `album_id` to the current user's downloads if it is not there.
    ///
    /// Returns whether the id was added: `false` when there is no current
    /// user or the album is already downloaded.
    #[instrument(skip(self))]
    pub async fn mark_album_as_downloaded(&self, album_id: &str) -> Result<bool> {
        let _guard = self.write_lock.lock().await;

        let Some(mut user) = self.read_strict::<User>(&self.keys.user).await? else {
            debug!("No current user, nothing to mark");
            return Ok(false);
        };

        if user.has_downloaded(album_id) {
            debug!("Album already marked as downloaded");
            return Ok(false);
        }

        if !user.has_purchased(album_id) {
            debug!("Marking an album that was never purchased");
        }

        user.downloaded_albums.push(album_id.to_string());
        self.storage
            .set_string(&self.keys.user, &encode(&user)?)
            .await?;

        self.emit(CatalogEvent::AlbumDownloaded {
            album_id: album_id.to_string(),
        });
        Ok(true)
    }

    /// Profile summary for the current user; zeroed without one.
    pub async fn get_user_stats(&self) -> UserStats {
        let Some(user) = self.get_current_user().await else {
            return UserStats::default();
        };

        let uploaded_albums = self
            .get_albums()
            .await
            .iter()
            .filter(|album| album.artist_id == user.id)
            .count();

        let total_spent = self
            .get_purchases()
            .await
            .iter()
            .filter(|purchase| purchase.user_id == user.id)
            .map(|purchase| purchase.price)
            .sum();

        UserStats {
            purchased_albums: user.purchased_albums.len(),
            downloaded_albums: user.downloaded_albums.len(),
            uploaded_albums,
            total_spent,
        }
    }

    // ------------------------------------------------------------------
    // Internals
    // ------------------------------------------------------------------

    /// Read and decode `key`. Storage failures and undecodable values are
    /// errors.
    async fn read_strict<T: DeserializeOwned>(&self, key: &str) -> Result<Option<T>> {
        let Some(raw) = self.storage.get_string(key).await? else {
            return Ok(None);
        };

        serde_json::from_str(&raw)
            .map(Some)
            .map_err(|e| CatalogError::CorruptRecord {
                key: key.to_string(),
                message: e.to_string(),
            })
    }

    async fn read_soft<T: DeserializeOwned>(&self, key: &str) -> Option<T> {
        match self.read_strict(key).await {
            Ok(value) => value,
            Err(e) => {
                warn!(key, error = %e, "Unreadable catalog record, treating as absent");
                None
            }
        }
    }

    /// Write every pair in one storage transaction.
    async fn commit_all(&self, writes: Vec<(&str, String)>) -> Result<()> {
        let mut tx = self.storage.begin_transaction().await?;

        for (key, value) in &writes {
            let written = tx.set_string(key, value).await;
            if let Err(e) = written {
                if let Err(rollback_err) = tx.rollback().await {
                    warn!(error = %rollback_err, "Rollback failed after write error");
                }
                return Err(e.into());
            }
        }

        tx.commit().await?;
        Ok(())
    }

    fn emit(&self, event: CatalogEvent) {
        if let Some(events) = &self.events {
            let _ = events.emit(CoreEvent::Catalog(event));
        }
    }
}

fn encode<T: Serialize + ?Sized>(value: &T) -> Result<String> {
    Ok(serde_json::to_string(value)?)
}

fn check_user(user: &User) -> Result<()> {
    user.validate().map_err(|message| CatalogError::InvalidInput {
        field: "user".to_string(),
        message,
    })
}
