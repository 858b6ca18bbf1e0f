//! Workspace placeholder crate.
//!
//! This crate exists to expose shared feature flags that map to the individual
//! workspace crates. Host applications can depend on `melodymarket-workspace`
//! and enable `desktop-shims` (default) for the SQLite-backed settings store,
//! or `core` alone when they inject their own storage.

#[cfg(feature = "core")]
pub use core_service::*;
