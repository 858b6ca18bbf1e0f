//! Core service façade and bootstrap helpers.
//!
//! This crate wires the host-provided bridges from a [`CoreConfig`] into the
//! catalog store and the playback session, and implements the storefront
//! flows that span both (first-run bootstrap, buying, publishing and
//! downloading albums). Desktop apps typically enable the `desktop-shims`
//! feature, which provisions a SQLite-backed settings store when the host
//! does not inject one.

pub mod draft;
pub mod error;

pub use draft::{AlbumDraft, TrackDraft, DEFAULT_GENRE, DEFAULT_TRACK_DURATION};
pub use error::{CoreError, Result};

pub use core_catalog::{Album, CatalogStore, Purchase, Track, User, UserStats};
pub use core_playback::{PlaybackSession, PlaybackState};
pub use core_runtime::config::CoreConfig;
pub use core_runtime::events::{CoreEvent, EventBus, EventStream};

#[cfg(feature = "desktop-shims")]
pub use bridge_desktop::SqliteSettingsStore;

use std::sync::Arc;

use bridge_traits::Clock;
use core_catalog::CatalogOptions;
use core_playback::{PlaybackError, SessionOptions};
use tracing::{info, instrument, warn};

/// Name of the account created on first launch.
pub const DEFAULT_USER_NAME: &str = "Music Lover";

/// E-mail of the account created on first launch.
pub const DEFAULT_USER_EMAIL: &str = "user@melodymarket.com";

/// Primary façade exposed to host applications.
///
/// Clones share the same store, session and event bus.
#[derive(Clone)]
pub struct MarketCore {
    catalog: Arc<CatalogStore>,
    playback: PlaybackSession,
    events: EventBus,
    clock: Arc<dyn Clock>,
}

impl std::fmt::Debug for MarketCore {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("MarketCore")
            .field("namespace", &self.catalog.options().namespace)
            .field("playback", &self.playback)
            .finish()
    }
}

impl MarketCore {
    /// Create the core from a validated configuration.
    pub fn new(config: CoreConfig) -> Result<Self> {
        config
            .validate()
            .map_err(|err| CoreError::InitializationFailed(err.to_string()))?;

        let events = EventBus::new(config.event_buffer_size);

        let catalog = CatalogStore::new(
            Arc::clone(&config.settings_store),
            Arc::clone(&config.clock),
            CatalogOptions {
                namespace: config.storage_namespace.clone(),
                seed_demo_account: config.seed_demo_account,
            },
        )
        .with_event_bus(events.clone());

        let playback = PlaybackSession::with_event_bus(
            Arc::clone(&config.playback_adapter),
            SessionOptions {
                preview_duration: config.preview_duration,
                initial_volume: config.default_volume,
            },
            events.clone(),
        );

        info!(
            namespace = %config.storage_namespace,
            preview_secs = config.preview_duration.as_secs(),
            "MarketCore created"
        );

        Ok(Self {
            catalog: Arc::new(catalog),
            playback,
            events,
            clock: config.clock,
        })
    }

    /// Build a configuration from `builder` and create the core.
    ///
    /// Capability errors from the builder are reported as
    /// [`CoreError::CapabilityMissing`].
    pub fn from_builder(builder: core_runtime::config::CoreConfigBuilder) -> Result<Self> {
        let config = builder.build().map_err(|err| match err {
            core_runtime::Error::CapabilityMissing {
                capability,
                message,
            } => CoreError::CapabilityMissing {
                capability,
                message,
            },
            other => CoreError::Runtime(other),
        })?;
        Self::new(config)
    }

    pub fn catalog(&self) -> &CatalogStore {
        &self.catalog
    }

    pub fn playback(&self) -> &PlaybackSession {
        &self.playback
    }

    pub fn events(&self) -> &EventBus {
        &self.events
    }

    /// Subscribe to catalog and playback events.
    pub fn subscribe(&self) -> EventStream {
        EventStream::new(self.events.subscribe())
    }

    // ========================================================================
    // Flows
    // ========================================================================

    /// Run first-launch setup.
    ///
    /// Seeds the sample catalog and creates the default account when no
    /// user is stored yet. Returns the current user.
    #[instrument(skip(self))]
    pub async fn bootstrap(&self) -> Result<User> {
        self.catalog.initialize().await?;

        if let Some(user) = self.catalog.get_current_user().await {
            return Ok(user);
        }

        let user = self
            .catalog
            .set_current_user(DEFAULT_USER_NAME, DEFAULT_USER_EMAIL, false)
            .await?;
        info!(user_id = %user.id, "Default account created");
        Ok(user)
    }

    /// Buy `album_id` for the current user at the album's listed price.
    #[instrument(skip(self))]
    pub async fn purchase_album(&self, album_id: &str) -> Result<Purchase> {
        let user = self
            .catalog
            .get_current_user()
            .await
            .ok_or(CoreError::NoCurrentUser)?;

        let album = self
            .find_album(album_id)
            .await
            .ok_or_else(|| CoreError::validation("album_id", format!("Unknown album '{}'", album_id)))?;

        let now = self.clock.now();
        let purchase = Purchase {
            id: now.timestamp_millis().to_string(),
            user_id: user.id,
            album_id: album.id,
            purchase_date: now,
            price: album.price,
        };

        self.catalog.save_purchase(&purchase).await?;
        Ok(purchase)
    }

    /// Publish `draft` as a new album by the current user.
    ///
    /// The form is validated before the current user is consulted.
    #[instrument(skip(self, draft), fields(title = %draft.title))]
    pub async fn publish_album(&self, draft: AlbumDraft) -> Result<Album> {
        draft.validate()?;

        let user = self
            .catalog
            .get_current_user()
            .await
            .ok_or(CoreError::NoCurrentUser)?;
        if !user.is_artist {
            warn!(user_id = %user.id, "Publishing from a non-artist account");
        }

        let now = self.clock.now();
        let album = draft.into_album(now.timestamp_millis().to_string(), &user, now)?;
        self.catalog.save_album(&album).await?;

        info!(album_id = %album.id, tracks = album.tracks.len(), "Album published");
        Ok(album)
    }

    /// Mark a purchased album as downloaded.
    ///
    /// Returns `false` when it was already downloaded. The check and the write
    /// happen under the store's writer lock.
    #[instrument(skip(self))]
    pub async fn download_album(&self, album_id: &str) -> Result<bool> {
        let user = self
            .catalog
            .get_current_user()
            .await
            .ok_or(CoreError::NoCurrentUser)?;

        if !user.has_purchased(album_id) {
            return Err(CoreError::validation(
                "album_id",
                format!("Album '{}' has not been purchased", album_id),
            ));
        }
        Ok(self.catalog.mark_album_as_downloaded(album_id).await?)
    }

    /// Preview `track`, falling back to its full file when it has no
    /// dedicated preview clip.
    pub async fn preview_track(&self, track: &Track) -> Result<()> {
        let url = track
            .preview_url
            .as_deref()
            .or(track.file_url.as_deref())
            .ok_or_else(|| {
                PlaybackError::SourceError(format!("Track '{}' has no audio", track.id))
            })?;
        Ok(self.playback.play_preview(&track.id, url).await?)
    }

    /// Play `track` in full. Only owned albums or free tracks qualify.
    pub async fn play_track(&self, track: &Track) -> Result<()> {
        if !track.is_free {
            let owned = match &track.album_id {
                Some(album_id) => self.catalog.has_user_purchased_album(album_id).await,
                None => false,
            };
            if !owned {
                return Err(CoreError::validation(
                    "track_id",
                    format!("Track '{}' requires a purchase", track.id),
                ));
            }
        }

        let url = track.file_url.as_deref().ok_or_else(|| {
            PlaybackError::SourceError(format!("Track '{}' has no audio file", track.id))
        })?;
        Ok(self.playback.play_full_track(&track.id, url).await?)
    }

    /// Stop playback and release the session's listeners.
    pub async fn shutdown(&self) {
        self.playback.dispose().await;
        info!("MarketCore shut down");
    }

    async fn find_album(&self, album_id: &str) -> Option<Album> {
        self.catalog
            .get_albums()
            .await
            .into_iter()
            .find(|album| album.id == album_id)
    }
}
