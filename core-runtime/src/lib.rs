//! # Core Runtime Module
//!
//! Foundational runtime infrastructure for the MelodyMarket core:
//! - Logging and tracing infrastructure
//! - Configuration management
//! - Event bus system
//!
//! ## Overview
//!
//! Every other core crate depends on this one for its logging conventions,
//! its view of the host bridges, and the broadcast channel used to announce
//! catalog and playback changes.

pub mod config;
pub mod error;
pub mod events;
pub mod logging;

pub use error::{Error, Result};
