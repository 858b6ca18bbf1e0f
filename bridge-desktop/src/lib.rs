//! # Desktop Bridge Implementations
//!
//! Default implementations of bridge traits for desktop platforms
//! (macOS, Windows, Linux).
//!
//! ## Overview
//!
//! - `SettingsStore` using a SQLite-backed key-value table
//!
//! Audio output is left to the host: desktop shells inject their own
//! `PlaybackAdapter` around whatever engine they ship.
//!
//! ## Usage
//!
//! ```ignore
//! use bridge_desktop::SqliteSettingsStore;
//!
//! #[tokio::main]
//! async fn main() {
//!     let path = SqliteSettingsStore::default_path().expect("no data dir");
//!     let store = SqliteSettingsStore::new(path).await.unwrap();
//!     // Use in core configuration
//! }
//! ```

mod settings;

pub use settings::{SqliteSettingsStore, DEFAULT_DB_FILE};
