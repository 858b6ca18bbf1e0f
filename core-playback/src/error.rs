//! # Playback Error Types
//!
//! Error types for the playback session.

use bridge_traits::error::BridgeError;
use thiserror::Error;

/// Errors that can occur during playback operations.
#[derive(Error, Debug)]
pub enum PlaybackError {
    /// The track has no usable audio source.
    #[error("Failed to open audio source: {0}")]
    SourceError(String),

    /// Starting or controlling a loaded sound failed.
    #[error("Playback operation failed: {0}")]
    PlaybackFailed(String),

    /// Invalid volume value (must be in range [0.0, 1.0]).
    #[error("Invalid volume: {0} (must be between 0.0 and 1.0)")]
    InvalidVolume(f32),

    /// Error reported by the host playback adapter.
    #[error("Playback adapter error: {0}")]
    Adapter(#[from] BridgeError),

    /// Internal error (should not occur in normal operation).
    #[error("Internal error: {0}")]
    Internal(String),
}

impl PlaybackError {
    /// Returns `true` if this error is transient and the operation can be retried.
    pub fn is_transient(&self) -> bool {
        match self {
            PlaybackError::Adapter(e) => e.is_transient(),
            _ => false,
        }
    }
}

/// Result type for playback operations.
pub type Result<T> = std::result::Result<T, PlaybackError>;

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_transient_classification() {
        assert!(!PlaybackError::SourceError("no url".into()).is_transient());
        assert!(PlaybackError::Adapter(BridgeError::DatabaseError("busy".into())).is_transient());
        assert!(!PlaybackError::Adapter(BridgeError::NotAvailable("audio".into())).is_transient());
        assert!(!PlaybackError::InvalidVolume(1.5).is_transient());
    }

    #[test]
    fn test_volume_message() {
        let err = PlaybackError::InvalidVolume(-0.5);
        assert_eq!(
            err.to_string(),
            "Invalid volume: -0.5 (must be between 0.0 and 1.0)"
        );
    }
}
