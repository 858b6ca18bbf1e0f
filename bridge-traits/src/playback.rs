//! Playback bridge traits and supporting audio types.
//!
//! The core never decodes audio. Hosts hand it a [`PlaybackAdapter`] that
//! loads a sound from a URL into a native engine and controls it through an
//! opaque [`SoundId`] handle.

use crate::error::Result;
use std::time::Duration;
use uuid::Uuid;

/// Unique identifier for a sound resource loaded by a host adapter.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct SoundId(Uuid);

impl SoundId {
    /// Generate a new sound identifier.
    pub fn new() -> Self {
        Self(Uuid::new_v4())
    }

    /// Construct an identifier from an existing UUID.
    pub fn from_uuid(id: Uuid) -> Self {
        Self(id)
    }

    /// Borrow the underlying UUID.
    pub fn as_uuid(&self) -> &Uuid {
        &self.0
    }
}

impl Default for SoundId {
    fn default() -> Self {
        Self::new()
    }
}

impl std::fmt::Display for SoundId {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}", self.0)
    }
}

/// Request describing the sound a host adapter should load.
#[derive(Debug, Clone, PartialEq)]
pub struct SoundRequest {
    /// Track the sound belongs to, surfaced to platform media sessions.
    pub track_id: String,
    /// Remote or local URL of the audio.
    pub url: String,
    /// Initial volume (0.0 = muted, 1.0 = unity gain).
    pub initial_volume: f32,
    /// Whether playback should loop automatically.
    pub looping: bool,
}

impl SoundRequest {
    /// Construct a request with unity volume and no looping.
    pub fn new(track_id: impl Into<String>, url: impl Into<String>) -> Self {
        Self {
            track_id: track_id.into(),
            url: url.into(),
            initial_volume: 1.0,
            looping: false,
        }
    }

    pub fn with_volume(mut self, volume: f32) -> Self {
        self.initial_volume = volume;
        self
    }

    pub fn with_looping(mut self, looping: bool) -> Self {
        self.looping = looping;
        self
    }
}

/// Trait for platform-specific playback adapters that drive native audio engines.
///
/// A loaded sound stays alive until [`unload`](PlaybackAdapter::unload) is
/// called. When a sound reaches its natural end the host is expected to
/// report it back to the playback session.
#[async_trait::async_trait]
pub trait PlaybackAdapter: Send + Sync {
    /// Load a sound resource. Implementations may allocate native resources or
    /// start buffering. Returns an identifier that subsequent calls reference.
    async fn load(&self, request: SoundRequest) -> Result<SoundId>;

    /// Begin or resume playback.
    async fn play(&self, sound: SoundId) -> Result<()>;

    /// Pause playback without releasing the sound.
    async fn pause(&self, sound: SoundId) -> Result<()>;

    /// Seek to an absolute position within the sound.
    async fn seek(&self, sound: SoundId, position: Duration) -> Result<()>;

    /// Adjust playback volume. Volume is normalized to `0.0..=1.0`.
    async fn set_volume(&self, sound: SoundId, volume: f32) -> Result<()>;

    /// Query the current playback position.
    async fn position(&self, sound: SoundId) -> Result<Duration>;

    /// Total duration of the sound, when known.
    async fn duration(&self, sound: SoundId) -> Result<Option<Duration>>;

    /// Whether the engine is currently producing audio for the sound.
    async fn is_playing(&self, sound: SoundId) -> Result<bool>;

    /// Release resources associated with a sound.
    async fn unload(&self, sound: SoundId) -> Result<()>;
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn sound_request_defaults() {
        let request = SoundRequest::new("1-1", "https://cdn.example.com/1-1.mp3");
        assert_eq!(request.track_id, "1-1");
        assert_eq!(request.initial_volume, 1.0);
        assert!(!request.looping);

        let request = request.with_volume(0.7).with_looping(true);
        assert_eq!(request.initial_volume, 0.7);
        assert!(request.looping);
    }

    #[test]
    fn sound_id_is_unique() {
        let a = SoundId::new();
        let b = SoundId::new();
        assert_ne!(a, b);
        assert_eq!(a, SoundId::from_uuid(*a.as_uuid()));
    }
}
