//! # Catalog Module
//!
//! Local storefront persistence over a host key-value store.
//!
//! ## Overview
//!
//! This module manages:
//! - Domain models for users, albums, tracks and purchases
//! - The namespaced key layout and first-run sample data
//! - `CatalogStore`, the read/write API used by the host UI

pub mod error;
pub mod keys;
pub mod models;
pub mod seed;
pub mod store;

pub use error::{CatalogError, Result};
pub use keys::StorageKeys;
pub use models::{format_duration, parse_duration, Album, Purchase, Track, User, UserStats};
pub use store::{CatalogOptions, CatalogStore};
