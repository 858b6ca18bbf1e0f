//! # Playback Session
//!
//! The single audio-control point shared by every view that shows a play
//! button.
//!
//! ## Overview
//!
//! A [`PlaybackSession`] owns at most one loaded sound at a time. Starting a
//! track stops whatever was active first. Previews stop on their own after
//! the configured preview duration.
//!
//! ## Stale work
//!
//! Every play and every stop advances a generation counter. A load that
//! completes after the session moved on releases its sound and reports
//! success without touching state, and a preview timer only fires if its
//! generation, track id and preview mode are all still current. Timers are
//! also cancelled through a [`CancellationToken`] when the session stops.
//!
//! ## Usage
//!
//! ```no_run
//! use core_playback::{PlaybackSession, SessionOptions};
//! use bridge_traits::PlaybackAdapter;
//! use std::sync::Arc;
//!
//! # async fn example(adapter: Arc<dyn PlaybackAdapter>) -> core_playback::Result<()> {
//! let session = PlaybackSession::new(adapter, SessionOptions::default());
//!
//! let id = session.add_play_state_listener(Arc::new(|playing| {
//!     println!("playing: {}", playing);
//! }));
//!
//! session
//!     .play_preview("1-1", "https://cdn.example.com/previews/1-1.wav")
//!     .await?;
//! session.pause().await?;
//! session.remove_play_state_listener_by_id(id);
//! # Ok(())
//! # }
//! ```

use crate::error::{PlaybackError, Result};
use crate::listeners::{ListenerId, ListenerRegistry, PlayStateListener};
use bridge_traits::playback::{PlaybackAdapter, SoundId, SoundRequest};
use core_runtime::config::{DEFAULT_PREVIEW_DURATION, DEFAULT_VOLUME};
use core_runtime::events::{CoreEvent, EventBus, PlaybackEvent};
use std::sync::{Arc, Weak};
use std::time::Duration;
use tokio_util::sync::CancellationToken;
use tracing::{debug, error, info, instrument, warn};

/// Construction options for [`PlaybackSession`].
#[derive(Debug, Clone, PartialEq)]
pub struct SessionOptions {
    /// How long a preview plays before stopping.
    pub preview_duration: Duration,
    /// Volume applied to the first loaded sound, `0.0..=1.0`.
    pub initial_volume: f32,
}

impl Default for SessionOptions {
    fn default() -> Self {
        Self {
            preview_duration: DEFAULT_PREVIEW_DURATION,
            initial_volume: DEFAULT_VOLUME,
        }
    }
}

/// Session lifecycle.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum PlaybackState {
    Idle,
    Loading,
    Playing,
    Paused,
}

#[derive(Debug)]
struct SessionState {
    phase: PlaybackState,
    generation: u64,
    track_id: Option<String>,
    preview: bool,
    sound: Option<SoundId>,
    preview_token: Option<CancellationToken>,
    volume: f32,
}

/// Why the active sound is being released.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum StopCause {
    Requested,
    Completed,
    PreviewEnded,
    Failed,
}

struct SessionInner {
    adapter: Arc<dyn PlaybackAdapter>,
    options: SessionOptions,
    events: Option<EventBus>,
    state: parking_lot::Mutex<SessionState>,
    listeners: parking_lot::Mutex<ListenerRegistry>,
}

/// Handle to the shared playback session.
///
/// Clones refer to the same session.
#[derive(Clone)]
pub struct PlaybackSession {
    inner: Arc<SessionInner>,
}

impl std::fmt::Debug for PlaybackSession {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        let state = self.inner.state.lock();
        f.debug_struct("PlaybackSession")
            .field("phase", &state.phase)
            .field("track_id", &state.track_id)
            .field("preview", &state.preview)
            .finish()
    }
}

impl PlaybackSession {
    pub fn new(adapter: Arc<dyn PlaybackAdapter>, options: SessionOptions) -> Self {
        Self::build(adapter, options, None)
    }

    /// Create a session that publishes playback events on `events`.
    pub fn with_event_bus(
        adapter: Arc<dyn PlaybackAdapter>,
        options: SessionOptions,
        events: EventBus,
    ) -> Self {
        Self::build(adapter, options, Some(events))
    }

    fn build(
        adapter: Arc<dyn PlaybackAdapter>,
        options: SessionOptions,
        events: Option<EventBus>,
    ) -> Self {
        let volume = options.initial_volume.clamp(0.0, 1.0);
        Self {
            inner: Arc::new(SessionInner {
                adapter,
                options,
                events,
                state: parking_lot::Mutex::new(SessionState {
                    phase: PlaybackState::Idle,
                    generation: 0,
                    track_id: None,
                    preview: false,
                    sound: None,
                    preview_token: None,
                    volume,
                }),
                listeners: parking_lot::Mutex::new(ListenerRegistry::default()),
            }),
        }
    }

    // ========================================================================
    // Playback control
    // ========================================================================

    /// Play the preview clip of `track_id`, stopping after the preview
    /// duration.
    pub async fn play_preview(&self, track_id: &str, preview_url: &str) -> Result<()> {
        self.start(track_id, preview_url, true).await
    }

    /// Play the full track with no time limit.
    pub async fn play_full_track(&self, track_id: &str, track_url: &str) -> Result<()> {
        self.start(track_id, track_url, false).await
    }

    #[instrument(skip(self, url))]
    async fn start(&self, track_id: &str, url: &str, preview: bool) -> Result<()> {
        self.stop().await;

        let (generation, volume) = {
            let mut state = self.inner.state.lock();
            state.generation += 1;
            state.phase = PlaybackState::Loading;
            state.track_id = Some(track_id.to_string());
            state.preview = preview;
            (state.generation, state.volume)
        };

        if url.trim().is_empty() {
            let err = PlaybackError::SourceError(format!("track {} has no audio url", track_id));
            return Err(self.fail(generation, track_id, err).await);
        }

        debug!("Loading sound");
        let request = SoundRequest::new(track_id, url).with_volume(volume);
        let sound = match self.inner.adapter.load(request).await {
            Ok(sound) => sound,
            Err(e) => return Err(self.fail(generation, track_id, e.into()).await),
        };

        let attached = {
            let mut state = self.inner.state.lock();
            if state.generation == generation {
                state.sound = Some(sound);
                true
            } else {
                false
            }
        };
        if !attached {
            debug!(%sound, "Load superseded, releasing sound");
            self.release(sound).await;
            return Ok(());
        }

        if let Err(e) = self.inner.adapter.play(sound).await {
            let err = PlaybackError::PlaybackFailed(e.to_string());
            return Err(self.fail(generation, track_id, err).await);
        }

        let token = {
            let mut state = self.inner.state.lock();
            if state.generation != generation {
                // A stop or another play ran while starting; it released the sound.
                return Ok(());
            }
            state.phase = PlaybackState::Playing;
            if preview {
                let token = CancellationToken::new();
                state.preview_token = Some(token.clone());
                Some(token)
            } else {
                None
            }
        };

        if let Some(token) = token {
            self.schedule_preview_stop(generation, track_id.to_string(), token);
        }

        info!("Playback started");
        self.notify(true);
        self.emit(PlaybackEvent::Started {
            track_id: track_id.to_string(),
            preview,
        });
        Ok(())
    }

    /// Reset after a failed start, if the failing request is still current.
    async fn fail(&self, generation: u64, track_id: &str, err: PlaybackError) -> PlaybackError {
        error!(error = %err, "Failed to start playback");
        self.stop_if(StopCause::Failed, |state| state.generation == generation)
            .await;
        self.emit(PlaybackEvent::Error {
            track_id: Some(track_id.to_string()),
            message: err.to_string(),
            recoverable: err.is_transient(),
        });
        err
    }

    fn schedule_preview_stop(&self, generation: u64, track_id: String, token: CancellationToken) {
        let weak: Weak<SessionInner> = Arc::downgrade(&self.inner);
        let limit = self.inner.options.preview_duration;

        tokio::spawn(async move {
            tokio::select! {
                _ = token.cancelled() => {}
                _ = tokio::time::sleep(limit) => {
                    let Some(inner) = weak.upgrade() else {
                        return;
                    };
                    let session = PlaybackSession { inner };
                    let ended = session
                        .stop_if(StopCause::PreviewEnded, |state| {
                            state.generation == generation
                                && state.preview
                                && state.track_id.as_deref() == Some(track_id.as_str())
                        })
                        .await;
                    if ended {
                        debug!(track_id = %track_id, "Preview time limit reached");
                    }
                }
            }
        });
    }

    /// Pause the active sound. No-op unless playing.
    pub async fn pause(&self) -> Result<()> {
        let Some((sound, track_id)) = self.active_sound(PlaybackState::Playing) else {
            return Ok(());
        };

        self.inner.adapter.pause(sound).await?;
        let position = self.inner.adapter.position(sound).await.unwrap_or_default();

        if !self.transition(sound, PlaybackState::Playing, PlaybackState::Paused) {
            return Ok(());
        }

        self.notify(false);
        self.emit(PlaybackEvent::Paused {
            track_id,
            position_ms: position.as_millis() as u64,
        });
        Ok(())
    }

    /// Resume a paused sound. No-op unless paused.
    pub async fn resume(&self) -> Result<()> {
        let Some((sound, track_id)) = self.active_sound(PlaybackState::Paused) else {
            return Ok(());
        };

        self.inner.adapter.play(sound).await?;

        if !self.transition(sound, PlaybackState::Paused, PlaybackState::Playing) {
            return Ok(());
        }

        self.notify(true);
        self.emit(PlaybackEvent::Resumed { track_id });
        Ok(())
    }

    /// Move the playhead to `secs`. No-op without a loaded sound.
    ///
    /// Negative positions clamp to the start.
    pub async fn seek(&self, secs: f64) -> Result<()> {
        let clamped = if secs < 0.0 { 0.0 } else { secs };
        let position = Duration::try_from_secs_f64(clamped).map_err(|_| {
            PlaybackError::PlaybackFailed(format!("invalid seek position {}", secs))
        })?;

        let Some(sound) = self.inner.state.lock().sound else {
            return Ok(());
        };

        self.inner.adapter.seek(sound, position).await?;
        Ok(())
    }

    /// Stop and release the active sound, returning to idle.
    ///
    /// Cancels any pending preview timer. No-op when already idle.
    pub async fn stop(&self) {
        self.stop_if(StopCause::Requested, |_| true).await;
    }

    /// Host callback for a sound reaching its natural end.
    ///
    /// Ignored unless `sound` is the active sound. Returns whether the session
    /// stopped.
    pub async fn handle_playback_completed(&self, sound: SoundId) -> bool {
        self.stop_if(StopCause::Completed, |state| state.sound == Some(sound))
            .await
    }

    /// Set the volume for the active sound and every later load.
    pub async fn set_volume(&self, volume: f32) -> Result<()> {
        if !(0.0..=1.0).contains(&volume) {
            return Err(PlaybackError::InvalidVolume(volume));
        }

        let sound = {
            let mut state = self.inner.state.lock();
            state.volume = volume;
            state.sound
        };

        if let Some(sound) = sound {
            self.inner.adapter.set_volume(sound, volume).await?;
        }
        Ok(())
    }

    /// Stop playback and drop every listener. Used on host teardown.
    pub async fn dispose(&self) {
        self.stop().await;
        *self.inner.listeners.lock() = ListenerRegistry::default();
        debug!("Playback session disposed");
    }

    // ========================================================================
    // Queries
    // ========================================================================

    pub fn state(&self) -> PlaybackState {
        self.inner.state.lock().phase
    }

    pub fn current_track_id(&self) -> Option<String> {
        self.inner.state.lock().track_id.clone()
    }

    pub fn is_preview_mode(&self) -> bool {
        self.inner.state.lock().preview
    }

    pub fn is_playing(&self) -> bool {
        self.state() == PlaybackState::Playing
    }

    pub fn volume(&self) -> f32 {
        self.inner.state.lock().volume
    }

    /// Playhead position in seconds, `0.0` when idle or unknown.
    pub async fn current_time(&self) -> f64 {
        let Some(sound) = self.inner.state.lock().sound else {
            return 0.0;
        };

        match self.inner.adapter.position(sound).await {
            Ok(position) => position.as_secs_f64(),
            Err(e) => {
                debug!(error = %e, "Position unavailable");
                0.0
            }
        }
    }

    /// Length of the active sound in seconds, `0.0` when idle or unknown.
    pub async fn duration(&self) -> f64 {
        let Some(sound) = self.inner.state.lock().sound else {
            return 0.0;
        };

        match self.inner.adapter.duration(sound).await {
            Ok(Some(duration)) => duration.as_secs_f64(),
            Ok(None) => 0.0,
            Err(e) => {
                debug!(error = %e, "Duration unavailable");
                0.0
            }
        }
    }

    // ========================================================================
    // Listeners
    // ========================================================================

    /// Register a play-state listener. Registering the same `Arc` again
    /// returns the existing id.
    pub fn add_play_state_listener(&self, listener: PlayStateListener) -> ListenerId {
        self.inner.listeners.lock().add(listener)
    }

    pub fn remove_play_state_listener(&self, listener: &PlayStateListener) -> bool {
        self.inner.listeners.lock().remove(listener)
    }

    pub fn remove_play_state_listener_by_id(&self, id: ListenerId) -> bool {
        self.inner.listeners.lock().remove_by_id(id)
    }

    pub fn listener_count(&self) -> usize {
        self.inner.listeners.lock().len()
    }

    // ========================================================================
    // Internals
    // ========================================================================

    /// Reset to idle if `should_stop` accepts the current state.
    ///
    /// The check and the reset happen under one lock, so a concurrent play
    /// cannot be stopped by a decision made about an older state.
    async fn stop_if<F>(&self, cause: StopCause, should_stop: F) -> bool
    where
        F: FnOnce(&SessionState) -> bool,
    {
        let (sound, track_id) = {
            let mut state = self.inner.state.lock();
            if state.phase == PlaybackState::Idle || !should_stop(&*state) {
                return false;
            }

            state.generation += 1;
            state.phase = PlaybackState::Idle;
            state.preview = false;
            if let Some(token) = state.preview_token.take() {
                token.cancel();
            }
            (state.sound.take(), state.track_id.take())
        };

        if let Some(sound) = sound {
            if cause != StopCause::Completed {
                self.release(sound).await;
            } else if let Err(e) = self.inner.adapter.unload(sound).await {
                debug!(%sound, error = %e, "Unload after completion failed");
            }
        }

        self.notify(false);

        if let Some(track_id) = track_id {
            match cause {
                StopCause::Requested => {
                    debug!(track_id = %track_id, "Playback stopped");
                    self.emit(PlaybackEvent::Stopped { track_id });
                }
                StopCause::Completed => self.emit(PlaybackEvent::Completed { track_id }),
                StopCause::PreviewEnded => self.emit(PlaybackEvent::PreviewEnded { track_id }),
                StopCause::Failed => {}
            }
        }
        true
    }

    /// Pause and unload a sound, logging adapter failures.
    async fn release(&self, sound: SoundId) {
        if let Err(e) = self.inner.adapter.pause(sound).await {
            debug!(%sound, error = %e, "Pause before unload failed");
        }
        if let Err(e) = self.inner.adapter.unload(sound).await {
            warn!(%sound, error = %e, "Failed to unload sound");
        }
    }

    fn active_sound(&self, phase: PlaybackState) -> Option<(SoundId, String)> {
        let state = self.inner.state.lock();
        if state.phase != phase {
            return None;
        }
        Some((state.sound?, state.track_id.clone()?))
    }

    fn transition(&self, sound: SoundId, from: PlaybackState, to: PlaybackState) -> bool {
        let mut state = self.inner.state.lock();
        if state.sound != Some(sound) || state.phase != from {
            return false;
        }
        state.phase = to;
        true
    }

    fn notify(&self, playing: bool) {
        let listeners = self.inner.listeners.lock().snapshot();
        for listener in listeners {
            listener(playing);
        }
    }

    fn emit(&self, event: PlaybackEvent) {
        if let Some(events) = &self.inner.events {
            let _ = events.emit(CoreEvent::Playback(event));
        }
    }
}
