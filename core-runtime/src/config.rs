//! # Core Configuration Module
//!
//! Builder-based configuration for the MelodyMarket core.
//!
//! ## Overview
//!
//! [`CoreConfig`] holds the host-provided bridges and the tunables of the
//! catalog store and playback session. The builder fails fast with an
//! actionable [`Error::CapabilityMissing`] when a required bridge is absent.
//!
//! ## Required Dependencies
//!
//! - `PlaybackAdapter` - the host's native audio engine
//! - `SettingsStore` - key-value namespace for the catalog
//!   (desktop default: SQLite under the platform data directory)
//!
//! ## Usage
//!
//! ```ignore
//! use core_runtime::config::CoreConfig;
//! use std::sync::Arc;
//! use std::time::Duration;
//!
//! let config = CoreConfig::builder()
//!     .settings_store(Arc::new(my_store))
//!     .playback_adapter(Arc::new(my_audio_engine))
//!     .preview_duration(Duration::from_secs(30))
//!     .seed_demo_account(false)
//!     .build()?;
//! ```
//!
//! ## Error Handling
//!
//! ```should_panic
//! use core_runtime::config::CoreConfig;
//!
//! let config = CoreConfig::builder()
//!     .build()
//!     .expect("Should fail - missing playback adapter");
//! ```

use crate::error::{Error, Result};
use crate::events::DEFAULT_EVENT_BUFFER_SIZE;
use bridge_traits::{Clock, PlaybackAdapter, SettingsStore, SystemClock};
use std::path::PathBuf;
use std::sync::Arc;
use std::time::Duration;

/// Namespace prefix for persisted keys unless overridden.
pub const DEFAULT_STORAGE_NAMESPACE: &str = "melodymarket";

/// Length of a track preview before it stops on its own.
pub const DEFAULT_PREVIEW_DURATION: Duration = Duration::from_secs(60);

/// Volume applied to newly loaded sounds.
pub const DEFAULT_VOLUME: f32 = 0.7;

const MIN_PREVIEW_DURATION: Duration = Duration::from_secs(1);
const MAX_PREVIEW_DURATION: Duration = Duration::from_secs(600);

/// Core configuration for the MelodyMarket core.
///
/// Use [`CoreConfigBuilder`] to construct instances.
#[derive(Clone)]
pub struct CoreConfig {
    /// Prefix for every persisted key (`<namespace>_user`, ...)
    pub storage_namespace: String,

    /// Directory for the desktop default store, when one is provisioned
    pub data_dir: Option<PathBuf>,

    /// Key-value storage backing the catalog (required)
    pub settings_store: Arc<dyn SettingsStore>,

    /// Native audio engine (required)
    pub playback_adapter: Arc<dyn PlaybackAdapter>,

    /// Time source for record timestamps and identifiers
    pub clock: Arc<dyn Clock>,

    /// How long a preview plays before stopping
    pub preview_duration: Duration,

    /// Initial volume for loaded sounds, `0.0..=1.0`
    pub default_volume: f32,

    /// Apply the sample purchases to a newly created account
    pub seed_demo_account: bool,

    /// Capacity of the event bus channel
    pub event_buffer_size: usize,
}

impl std::fmt::Debug for CoreConfig {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("CoreConfig")
            .field("storage_namespace", &self.storage_namespace)
            .field("data_dir", &self.data_dir)
            .field("settings_store", &"SettingsStore { ... }")
            .field("playback_adapter", &"PlaybackAdapter { ... }")
            .field("preview_duration", &self.preview_duration)
            .field("default_volume", &self.default_volume)
            .field("seed_demo_account", &self.seed_demo_account)
            .field("event_buffer_size", &self.event_buffer_size)
            .finish()
    }
}

impl CoreConfig {
    /// Creates a new builder for constructing a `CoreConfig`.
    pub fn builder() -> CoreConfigBuilder {
        CoreConfigBuilder::default()
    }

    /// Validates the configuration and returns an error if invalid.
    ///
    /// This checks:
    /// - Namespace is non-empty and limited to `[A-Za-z0-9_-]`
    /// - Preview duration lies within 1 s..=10 min
    /// - Default volume lies within `0.0..=1.0`
    /// - Event buffer size is positive
    pub fn validate(&self) -> Result<()> {
        if self.storage_namespace.is_empty() {
            return Err(Error::Config("Storage namespace cannot be empty".to_string()));
        }

        if !self
            .storage_namespace
            .chars()
            .all(|c| c.is_ascii_alphanumeric() || c == '_' || c == '-')
        {
            return Err(Error::Config(format!(
                "Storage namespace '{}' may only contain letters, digits, '_' and '-'",
                self.storage_namespace
            )));
        }

        if self.preview_duration < MIN_PREVIEW_DURATION
            || self.preview_duration > MAX_PREVIEW_DURATION
        {
            return Err(Error::Config(format!(
                "Preview duration must be between {}s and {}s, got {:?}",
                MIN_PREVIEW_DURATION.as_secs(),
                MAX_PREVIEW_DURATION.as_secs(),
                self.preview_duration
            )));
        }

        if !(0.0..=1.0).contains(&self.default_volume) {
            return Err(Error::Config(format!(
                "Default volume must be within 0.0..=1.0, got {}",
                self.default_volume
            )));
        }

        if self.event_buffer_size == 0 {
            return Err(Error::Config(
                "Event buffer size must be greater than 0".to_string(),
            ));
        }

        Ok(())
    }
}

fn playback_adapter_missing_error() -> Error {
    Error::CapabilityMissing {
        capability: "PlaybackAdapter".to_string(),
        message: "PlaybackAdapter implementation is required for previews and playback. \
                 Inject the host's native audio engine (AVPlayer, ExoPlayer, rodio, ...)."
            .to_string(),
    }
}

#[cfg(not(feature = "desktop-shims"))]
fn provide_default_settings_store(_data_dir: Option<&PathBuf>) -> Result<Arc<dyn SettingsStore>> {
    Err(Error::CapabilityMissing {
        capability: "SettingsStore".to_string(),
        message: "SettingsStore implementation is required for the catalog. \
                 Desktop: enable the 'desktop-shims' feature to use the default SqliteSettingsStore. \
                 Mobile: inject platform-native storage (UserDefaults/DataStore)."
            .to_string(),
    })
}

#[cfg(feature = "desktop-shims")]
fn provide_default_settings_store(data_dir: Option<&PathBuf>) -> Result<Arc<dyn SettingsStore>> {
    use bridge_desktop::SqliteSettingsStore;
    use std::thread;
    use tokio::runtime::{Builder, Handle};

    let path = match data_dir {
        Some(dir) => SqliteSettingsStore::path_in(dir),
        None => SqliteSettingsStore::default_path().ok_or_else(|| {
            Error::Config(
                "No platform data directory found. Use .data_dir() to set one.".to_string(),
            )
        })?,
    };

    tracing::debug!(
        file = %crate::logging::strip_path(&path.to_string_lossy()),
        "Opening default settings store"
    );

    let init_store = |path: PathBuf| -> Result<SqliteSettingsStore> {
        let runtime = Builder::new_current_thread()
            .enable_all()
            .build()
            .map_err(|e| {
                Error::Internal(format!(
                    "Failed to create Tokio runtime for default settings store: {}",
                    e
                ))
            })?;

        Ok(runtime.block_on(SqliteSettingsStore::new(path))?)
    };

    // block_on panics inside a runtime, so open the store on a plain thread.
    let store = match Handle::try_current() {
        Ok(_) => thread::spawn(move || init_store(path))
            .join()
            .map_err(|_| {
                Error::Internal("Thread panicked while creating default SettingsStore".to_string())
            })??,
        Err(_) => init_store(path)?,
    };

    Ok(Arc::new(store))
}

/// Builder for constructing [`CoreConfig`] instances.
#[derive(Default)]
pub struct CoreConfigBuilder {
    storage_namespace: Option<String>,
    data_dir: Option<PathBuf>,
    settings_store: Option<Arc<dyn SettingsStore>>,
    playback_adapter: Option<Arc<dyn PlaybackAdapter>>,
    clock: Option<Arc<dyn Clock>>,
    preview_duration: Option<Duration>,
    default_volume: Option<f32>,
    seed_demo_account: Option<bool>,
    event_buffer_size: Option<usize>,
}

impl CoreConfigBuilder {
    /// Sets the key prefix (default `melodymarket`).
    pub fn storage_namespace(mut self, namespace: impl Into<String>) -> Self {
        self.storage_namespace = Some(namespace.into());
        self
    }

    /// Sets the directory for the desktop default store.
    ///
    /// ```
    /// use core_runtime::config::CoreConfig;
    ///
    /// let builder = CoreConfig::builder().data_dir("/tmp/melodymarket");
    /// ```
    pub fn data_dir<P: Into<PathBuf>>(mut self, path: P) -> Self {
        self.data_dir = Some(path.into());
        self
    }

    /// Sets the key-value storage implementation.
    pub fn settings_store(mut self, store: Arc<dyn SettingsStore>) -> Self {
        self.settings_store = Some(store);
        self
    }

    /// Sets the audio engine implementation (required).
    pub fn playback_adapter(mut self, adapter: Arc<dyn PlaybackAdapter>) -> Self {
        self.playback_adapter = Some(adapter);
        self
    }

    /// Overrides the time source (default [`SystemClock`]).
    pub fn clock(mut self, clock: Arc<dyn Clock>) -> Self {
        self.clock = Some(clock);
        self
    }

    pub fn preview_duration(mut self, duration: Duration) -> Self {
        self.preview_duration = Some(duration);
        self
    }

    pub fn default_volume(mut self, volume: f32) -> Self {
        self.default_volume = Some(volume);
        self
    }

    /// Whether new accounts receive the sample purchases (default `true`).
    pub fn seed_demo_account(mut self, enabled: bool) -> Self {
        self.seed_demo_account = Some(enabled);
        self
    }

    pub fn event_buffer_size(mut self, size: usize) -> Self {
        self.event_buffer_size = Some(size);
        self
    }

    /// Builds the final `CoreConfig` instance.
    ///
    /// Fails when the playback adapter is missing, when no settings store
    /// is given and none can be provisioned, or when a value is out of range.
    pub fn build(self) -> Result<CoreConfig> {
        let playback_adapter = self
            .playback_adapter
            .ok_or_else(playback_adapter_missing_error)?;

        let settings_store = match self.settings_store {
            Some(store) => store,
            None => provide_default_settings_store(self.data_dir.as_ref())?,
        };

        let config = CoreConfig {
            storage_namespace: self
                .storage_namespace
                .unwrap_or_else(|| DEFAULT_STORAGE_NAMESPACE.to_string()),
            data_dir: self.data_dir,
            settings_store,
            playback_adapter,
            clock: self.clock.unwrap_or_else(|| Arc::new(SystemClock)),
            preview_duration: self.preview_duration.unwrap_or(DEFAULT_PREVIEW_DURATION),
            default_volume: self.default_volume.unwrap_or(DEFAULT_VOLUME),
            seed_demo_account: self.seed_demo_account.unwrap_or(true),
            event_buffer_size: self.event_buffer_size.unwrap_or(DEFAULT_EVENT_BUFFER_SIZE),
        };

        config.validate()?;

        Ok(config)
    }
}
