//! # Playback Module
//!
//! The storefront's single playback session.
//!
//! ## Overview
//!
//! This module handles:
//! - Preview and full-track playback through a host `PlaybackAdapter`
//! - Automatic preview cut-off
//! - Play-state listeners for every view showing a play button
//!
//! Audio decoding is left to the host adapter.

pub mod error;
pub mod listeners;
pub mod session;

pub use error::{PlaybackError, Result};
pub use listeners::{ListenerId, PlayStateListener};
pub use session::{PlaybackSession, PlaybackState, SessionOptions};
