//! # Host Bridge Traits
//!
//! Platform abstraction traits that must be implemented by each host platform.
//!
//! ## Overview
//!
//! This crate defines the contract between the MelodyMarket core and the host
//! application. Each trait represents a capability that the core requires but
//! that must be implemented differently per platform (desktop, iOS, Android, web).
//!
//! ## Traits
//!
//! ### Storage
//! - [`SettingsStore`](storage::SettingsStore) - Key-value namespace holding the catalog
//! - [`SettingsTransaction`](storage::SettingsTransaction) - Atomic multi-key writes
//!
//! ### Audio
//! - [`PlaybackAdapter`](playback::PlaybackAdapter) - Loads and controls sound resources
//!
//! ### Utilities
//! - [`Clock`](time::Clock) - Time source for deterministic testing
//! - [`LoggerSink`](time::LoggerSink) - Forward structured logs to host logging
//!
//! ## Platform Requirements
//!
//! | Platform | Implementation Crate | Status |
//! |----------|---------------------|--------|
//! | Desktop  | `bridge-desktop`    | ✅ SettingsStore |
//! | iOS      | TBD                 | 📋 Planned |
//! | Android  | TBD                 | 📋 Planned |
//!
//! ## Fail-Fast Strategy
//!
//! The core fails fast with descriptive errors when a required capability is missing:
//!
//! ```ignore
//! let adapter = config.playback_adapter
//!     .ok_or_else(|| Error::CapabilityMissing {
//!         capability: "PlaybackAdapter".to_string(),
//!         message: "No playback adapter provided. \
//!                  Inject the host's native audio engine.".to_string()
//!     })?;
//! ```
//!
//! ## Error Handling
//!
//! All bridge traits use the [`BridgeError`](error::BridgeError) type. Platform
//! implementations should convert platform-specific errors to `BridgeError`
//! and include context such as the key or sound involved.
//!
//! ## Thread Safety
//!
//! All bridge traits require `Send + Sync` bounds so the core can share them
//! across async tasks.

pub mod error;
pub mod playback;
pub mod storage;
pub mod time;

pub use error::BridgeError;

// Re-export commonly used types
pub use playback::{PlaybackAdapter, SoundId, SoundRequest};
pub use storage::{SettingsStore, SettingsTransaction};
pub use time::{Clock, ConsoleLogger, FixedClock, LogEntry, LogLevel, LoggerSink, SystemClock};
