//! Playback session behaviour against a scripted adapter.
//!
//! Timer tests run on a paused clock; `sleep` in the test body advances
//! virtual time and lets the preview timer fire.

use async_trait::async_trait;
use bridge_traits::error::{BridgeError, Result as BridgeResult};
use bridge_traits::playback::{PlaybackAdapter, SoundId, SoundRequest};
use core_playback::{
    PlayStateListener, PlaybackError, PlaybackSession, PlaybackState, SessionOptions,
};
use core_runtime::events::{CoreEvent, EventBus, PlaybackEvent};
use mockall::mock;
use std::collections::HashMap;
use std::sync::{Arc, Mutex};
use std::time::Duration;
use tokio::time::sleep;

// -----------------------------------------------------------------------------
// Scripted adapter
// -----------------------------------------------------------------------------

#[derive(Debug, Clone)]
struct LoadedSound {
    track_id: String,
    playing: bool,
    position: Duration,
    volume: f32,
}

#[derive(Default)]
struct AdapterState {
    loaded: HashMap<SoundId, LoadedSound>,
    load_order: Vec<(SoundId, String)>,
    unloaded: Vec<SoundId>,
    load_delays: HashMap<String, Duration>,
    fail_play: bool,
}

#[derive(Default)]
struct ScriptedAdapter {
    state: Mutex<AdapterState>,
}

impl ScriptedAdapter {
    fn delay_load(&self, url: &str, delay: Duration) {
        self.state
            .lock()
            .unwrap()
            .load_delays
            .insert(url.to_string(), delay);
    }

    fn fail_play(&self) {
        self.state.lock().unwrap().fail_play = true;
    }

    fn loaded_tracks(&self) -> Vec<String> {
        let state = self.state.lock().unwrap();
        state
            .load_order
            .iter()
            .filter(|(id, _)| state.loaded.contains_key(id))
            .map(|(_, track)| track.clone())
            .collect()
    }

    fn sound_for(&self, track_id: &str) -> SoundId {
        let state = self.state.lock().unwrap();
        state
            .load_order
            .iter()
            .rev()
            .find(|(_, track)| track == track_id)
            .map(|(id, _)| *id)
            .unwrap()
    }

    fn sound(&self, id: SoundId) -> Option<LoadedSound> {
        self.state.lock().unwrap().loaded.get(&id).cloned()
    }

    fn was_unloaded(&self, id: SoundId) -> bool {
        self.state.lock().unwrap().unloaded.contains(&id)
    }

    fn with_sound<T>(&self, id: SoundId, f: impl FnOnce(&mut LoadedSound) -> T) -> BridgeResult<T> {
        let mut state = self.state.lock().unwrap();
        state
            .loaded
            .get_mut(&id)
            .map(f)
            .ok_or_else(|| BridgeError::OperationFailed(format!("unknown sound {}", id)))
    }
}

#[async_trait]
impl PlaybackAdapter for ScriptedAdapter {
    async fn load(&self, request: SoundRequest) -> BridgeResult<SoundId> {
        let delay = self.state.lock().unwrap().load_delays.get(&request.url).copied();
        if let Some(delay) = delay {
            sleep(delay).await;
        }

        let id = SoundId::new();
        let mut state = self.state.lock().unwrap();
        state.loaded.insert(
            id,
            LoadedSound {
                track_id: request.track_id.clone(),
                playing: false,
                position: Duration::ZERO,
                volume: request.initial_volume,
            },
        );
        state.load_order.push((id, request.track_id));
        Ok(id)
    }

    async fn play(&self, sound: SoundId) -> BridgeResult<()> {
        if self.state.lock().unwrap().fail_play {
            return Err(BridgeError::OperationFailed("autoplay blocked".to_string()));
        }
        self.with_sound(sound, |s| s.playing = true)
    }

    async fn pause(&self, sound: SoundId) -> BridgeResult<()> {
        self.with_sound(sound, |s| s.playing = false)
    }

    async fn seek(&self, sound: SoundId, position: Duration) -> BridgeResult<()> {
        self.with_sound(sound, |s| s.position = position)
    }

    async fn set_volume(&self, sound: SoundId, volume: f32) -> BridgeResult<()> {
        self.with_sound(sound, |s| s.volume = volume)
    }

    async fn position(&self, sound: SoundId) -> BridgeResult<Duration> {
        self.with_sound(sound, |s| s.position)
    }

    async fn duration(&self, sound: SoundId) -> BridgeResult<Option<Duration>> {
        self.with_sound(sound, |_| Some(Duration::from_secs(272)))
    }

    async fn is_playing(&self, sound: SoundId) -> BridgeResult<bool> {
        self.with_sound(sound, |s| s.playing)
    }

    async fn unload(&self, sound: SoundId) -> BridgeResult<()> {
        let mut state = self.state.lock().unwrap();
        state.loaded.remove(&sound);
        state.unloaded.push(sound);
        Ok(())
    }
}

fn session_with(adapter: Arc<ScriptedAdapter>) -> PlaybackSession {
    PlaybackSession::new(adapter, SessionOptions::default())
}

fn recording_listener() -> (PlayStateListener, Arc<Mutex<Vec<bool>>>) {
    let seen = Arc::new(Mutex::new(Vec::new()));
    let sink = seen.clone();
    let listener: PlayStateListener = Arc::new(move |playing| {
        sink.lock().unwrap().push(playing);
    });
    (listener, seen)
}

const PREVIEW_URL: &str = "https://www.soundjay.com/misc/sounds/bell-ringing-05.wav";
const OTHER_URL: &str = "https://www.soundjay.com/misc/sounds/magic-chime-02.wav";

// -----------------------------------------------------------------------------
// Previews
// -----------------------------------------------------------------------------

#[tokio::test(start_paused = true)]
async fn test_preview_stops_after_limit() {
    let adapter = Arc::new(ScriptedAdapter::default());
    let bus = EventBus::new(32);
    let mut events = bus.subscribe();
    let session =
        PlaybackSession::with_event_bus(adapter.clone(), SessionOptions::default(), bus);
    let (listener, seen) = recording_listener();
    session.add_play_state_listener(listener);

    session.play_preview("1-1", PREVIEW_URL).await.unwrap();
    assert!(session.is_playing());
    assert!(session.is_preview_mode());
    assert_eq!(session.current_track_id().as_deref(), Some("1-1"));

    sleep(Duration::from_secs(59)).await;
    assert!(session.is_playing());

    sleep(Duration::from_secs(2)).await;
    assert_eq!(session.state(), PlaybackState::Idle);
    assert_eq!(session.current_track_id(), None);
    assert!(!session.is_preview_mode());
    assert!(adapter.loaded_tracks().is_empty());
    assert_eq!(*seen.lock().unwrap(), vec![true, false]);

    assert_eq!(
        events.recv().await.unwrap(),
        CoreEvent::Playback(PlaybackEvent::Started {
            track_id: "1-1".to_string(),
            preview: true,
        })
    );
    assert_eq!(
        events.recv().await.unwrap(),
        CoreEvent::Playback(PlaybackEvent::PreviewEnded {
            track_id: "1-1".to_string(),
        })
    );
}

#[tokio::test(start_paused = true)]
async fn test_custom_preview_duration() {
    let adapter = Arc::new(ScriptedAdapter::default());
    let session = PlaybackSession::new(
        adapter,
        SessionOptions {
            preview_duration: Duration::from_secs(15),
            ..SessionOptions::default()
        },
    );

    session.play_preview("2-1", PREVIEW_URL).await.unwrap();
    sleep(Duration::from_secs(16)).await;
    assert_eq!(session.state(), PlaybackState::Idle);
}

#[tokio::test(start_paused = true)]
async fn test_full_track_has_no_time_limit() {
    let adapter = Arc::new(ScriptedAdapter::default());
    let session = session_with(adapter);

    session.play_full_track("1-1", PREVIEW_URL).await.unwrap();
    assert!(!session.is_preview_mode());

    sleep(Duration::from_secs(600)).await;
    assert!(session.is_playing());
}

#[tokio::test(start_paused = true)]
async fn test_superseded_preview_timer_has_no_effect() {
    let adapter = Arc::new(ScriptedAdapter::default());
    let session = session_with(adapter.clone());

    session.play_preview("t1", PREVIEW_URL).await.unwrap();
    sleep(Duration::from_secs(30)).await;
    session.play_preview("t2", OTHER_URL).await.unwrap();

    // t1's limit passes while t2 is playing.
    sleep(Duration::from_secs(35)).await;
    assert!(session.is_playing());
    assert_eq!(session.current_track_id().as_deref(), Some("t2"));
    assert_eq!(adapter.loaded_tracks(), vec!["t2"]);
    assert!(adapter.was_unloaded(adapter.sound_for("t1")));

    // t2's own limit still applies.
    sleep(Duration::from_secs(30)).await;
    assert_eq!(session.state(), PlaybackState::Idle);
    assert!(adapter.loaded_tracks().is_empty());
}

#[tokio::test(start_paused = true)]
async fn test_same_track_replayed_keeps_fresh_timer() {
    let adapter = Arc::new(ScriptedAdapter::default());
    let session = session_with(adapter);

    session.play_preview("t1", PREVIEW_URL).await.unwrap();
    sleep(Duration::from_secs(40)).await;
    session.play_preview("t1", PREVIEW_URL).await.unwrap();

    sleep(Duration::from_secs(30)).await;
    assert!(session.is_playing());

    sleep(Duration::from_secs(31)).await;
    assert_eq!(session.state(), PlaybackState::Idle);
}

#[tokio::test(start_paused = true)]
async fn test_preview_then_full_track_is_not_cut_off() {
    let adapter = Arc::new(ScriptedAdapter::default());
    let session = session_with(adapter);

    session.play_preview("t1", PREVIEW_URL).await.unwrap();
    session.play_full_track("t1", PREVIEW_URL).await.unwrap();

    sleep(Duration::from_secs(90)).await;
    assert!(session.is_playing());
    assert!(!session.is_preview_mode());
}

// -----------------------------------------------------------------------------
// Loading
// -----------------------------------------------------------------------------

#[tokio::test(start_paused = true)]
async fn test_superseded_load_is_released() {
    let adapter = Arc::new(ScriptedAdapter::default());
    adapter.delay_load(PREVIEW_URL, Duration::from_secs(5));
    let session = session_with(adapter.clone());

    let slow = {
        let session = session.clone();
        tokio::spawn(async move { session.play_full_track("slow", PREVIEW_URL).await })
    };

    sleep(Duration::from_secs(1)).await;
    assert_eq!(session.state(), PlaybackState::Loading);

    session.play_full_track("fast", OTHER_URL).await.unwrap();
    slow.await.unwrap().unwrap();

    assert_eq!(session.current_track_id().as_deref(), Some("fast"));
    assert!(session.is_playing());
    assert_eq!(adapter.loaded_tracks(), vec!["fast"]);
    assert!(adapter.was_unloaded(adapter.sound_for("slow")));
}

#[tokio::test]
async fn test_missing_url_is_a_source_error() {
    let session = session_with(Arc::new(ScriptedAdapter::default()));

    let err = session.play_preview("3-1", "  ").await.unwrap_err();
    assert!(matches!(err, PlaybackError::SourceError(_)));
    assert_eq!(session.state(), PlaybackState::Idle);
    assert_eq!(session.current_track_id(), None);
}

#[tokio::test]
async fn test_play_failure_resets_and_releases() {
    let adapter = Arc::new(ScriptedAdapter::default());
    adapter.fail_play();
    let bus = EventBus::new(8);
    let mut events = bus.subscribe();
    let session =
        PlaybackSession::with_event_bus(adapter.clone(), SessionOptions::default(), bus);

    let err = session.play_full_track("4-1", PREVIEW_URL).await.unwrap_err();
    assert!(matches!(err, PlaybackError::PlaybackFailed(_)));
    assert_eq!(session.state(), PlaybackState::Idle);
    assert!(adapter.loaded_tracks().is_empty());

    match events.recv().await.unwrap() {
        CoreEvent::Playback(PlaybackEvent::Error {
            track_id,
            recoverable,
            ..
        }) => {
            assert_eq!(track_id.as_deref(), Some("4-1"));
            assert!(!recoverable);
        }
        other => panic!("unexpected event: {:?}", other),
    }
}

mock! {
    Adapter {}

    #[async_trait]
    impl PlaybackAdapter for Adapter {
        async fn load(&self, request: SoundRequest) -> BridgeResult<SoundId>;
        async fn play(&self, sound: SoundId) -> BridgeResult<()>;
        async fn pause(&self, sound: SoundId) -> BridgeResult<()>;
        async fn seek(&self, sound: SoundId, position: Duration) -> BridgeResult<()>;
        async fn set_volume(&self, sound: SoundId, volume: f32) -> BridgeResult<()>;
        async fn position(&self, sound: SoundId) -> BridgeResult<Duration>;
        async fn duration(&self, sound: SoundId) -> BridgeResult<Option<Duration>>;
        async fn is_playing(&self, sound: SoundId) -> BridgeResult<bool>;
        async fn unload(&self, sound: SoundId) -> BridgeResult<()>;
    }
}

#[tokio::test]
async fn test_load_failure_surfaces_adapter_error() {
    let mut adapter = MockAdapter::new();
    adapter
        .expect_load()
        .withf(|request| request.track_id == "5-1" && (request.initial_volume - 0.7).abs() < 1e-6)
        .times(1)
        .returning(|_| Err(BridgeError::NotAvailable("no audio output".to_string())));
    adapter.expect_play().never();

    let session = PlaybackSession::new(Arc::new(adapter), SessionOptions::default());
    let (listener, seen) = recording_listener();
    session.add_play_state_listener(listener);

    let err = session.play_preview("5-1", PREVIEW_URL).await.unwrap_err();
    assert!(matches!(err, PlaybackError::Adapter(BridgeError::NotAvailable(_))));
    assert!(!err.is_transient());
    assert_eq!(session.state(), PlaybackState::Idle);
    assert_eq!(session.current_track_id(), None);
    assert!(!seen.lock().unwrap().contains(&true));
}

// -----------------------------------------------------------------------------
// Controls
// -----------------------------------------------------------------------------

#[tokio::test]
async fn test_pause_and_resume() {
    let adapter = Arc::new(ScriptedAdapter::default());
    let session = session_with(adapter.clone());
    let (listener, seen) = recording_listener();
    session.add_play_state_listener(listener);

    // Nothing loaded yet.
    session.pause().await.unwrap();
    session.resume().await.unwrap();
    assert!(seen.lock().unwrap().is_empty());

    session.play_full_track("1-2", OTHER_URL).await.unwrap();
    session.pause().await.unwrap();
    assert_eq!(session.state(), PlaybackState::Paused);
    assert!(!adapter.sound(adapter.sound_for("1-2")).unwrap().playing);

    session.pause().await.unwrap();
    session.resume().await.unwrap();
    assert!(session.is_playing());

    assert_eq!(*seen.lock().unwrap(), vec![true, false, true]);
}

#[tokio::test]
async fn test_stop_when_idle_is_silent() {
    let session = session_with(Arc::new(ScriptedAdapter::default()));
    let (listener, seen) = recording_listener();
    session.add_play_state_listener(listener);

    session.stop().await;
    session.stop().await;
    assert!(seen.lock().unwrap().is_empty());

    session.play_full_track("1-1", PREVIEW_URL).await.unwrap();
    session.stop().await;
    session.stop().await;
    assert_eq!(*seen.lock().unwrap(), vec![true, false]);
}

#[tokio::test]
async fn test_seek_and_position_queries() {
    let adapter = Arc::new(ScriptedAdapter::default());
    let session = session_with(adapter.clone());

    assert_eq!(session.current_time().await, 0.0);
    assert_eq!(session.duration().await, 0.0);
    session.seek(10.0).await.unwrap();

    session.play_full_track("1-1", PREVIEW_URL).await.unwrap();
    session.seek(42.5).await.unwrap();
    assert_eq!(session.current_time().await, 42.5);
    assert_eq!(session.duration().await, 272.0);

    session.seek(-3.0).await.unwrap();
    assert_eq!(session.current_time().await, 0.0);
    assert!(session.seek(f64::NAN).await.is_err());
}

#[tokio::test]
async fn test_seek_beyond_representable_position_is_rejected() {
    let adapter = Arc::new(ScriptedAdapter::default());
    let session = session_with(adapter.clone());

    session.play_full_track("1-1", PREVIEW_URL).await.unwrap();
    session.seek(30.0).await.unwrap();

    for secs in [1e30, f64::MAX, f64::INFINITY] {
        assert!(matches!(
            session.seek(secs).await,
            Err(PlaybackError::PlaybackFailed(_))
        ));
    }

    assert_eq!(session.current_time().await, 30.0);
    assert_eq!(session.state(), PlaybackState::Playing);
}

#[tokio::test]
async fn test_volume_validation_and_reuse() {
    let adapter = Arc::new(ScriptedAdapter::default());
    let session = session_with(adapter.clone());
    assert!((session.volume() - 0.7).abs() < f32::EPSILON);

    assert!(matches!(
        session.set_volume(1.5).await,
        Err(PlaybackError::InvalidVolume(v)) if v == 1.5
    ));
    assert!(session.set_volume(f32::NAN).await.is_err());

    session.play_full_track("1-1", PREVIEW_URL).await.unwrap();
    session.set_volume(0.25).await.unwrap();
    assert_eq!(adapter.sound(adapter.sound_for("1-1")).unwrap().volume, 0.25);

    session.play_full_track("1-2", OTHER_URL).await.unwrap();
    assert_eq!(adapter.sound(adapter.sound_for("1-2")).unwrap().volume, 0.25);
}

#[tokio::test]
async fn test_completion_callback_only_for_active_sound() {
    let adapter = Arc::new(ScriptedAdapter::default());
    let bus = EventBus::new(8);
    let session =
        PlaybackSession::with_event_bus(adapter.clone(), SessionOptions::default(), bus.clone());

    session.play_full_track("2-2", OTHER_URL).await.unwrap();
    let mut events = bus.subscribe();

    assert!(!session.handle_playback_completed(SoundId::new()).await);
    assert!(session.is_playing());

    let active = adapter.sound_for("2-2");
    assert!(session.handle_playback_completed(active).await);
    assert_eq!(session.state(), PlaybackState::Idle);
    assert!(adapter.was_unloaded(active));

    assert_eq!(
        events.recv().await.unwrap(),
        CoreEvent::Playback(PlaybackEvent::Completed {
            track_id: "2-2".to_string(),
        })
    );
}

// -----------------------------------------------------------------------------
// Listeners
// -----------------------------------------------------------------------------

#[tokio::test]
async fn test_duplicate_listener_notified_once() {
    let session = session_with(Arc::new(ScriptedAdapter::default()));
    let (listener, seen) = recording_listener();

    let first = session.add_play_state_listener(listener.clone());
    let second = session.add_play_state_listener(listener.clone());
    assert_eq!(first, second);
    assert_eq!(session.listener_count(), 1);

    session.play_preview("1-1", PREVIEW_URL).await.unwrap();
    session.stop().await;
    assert_eq!(*seen.lock().unwrap(), vec![true, false]);

    assert!(session.remove_play_state_listener(&listener));
    session.play_preview("1-1", PREVIEW_URL).await.unwrap();
    assert_eq!(seen.lock().unwrap().len(), 2);
}

#[tokio::test]
async fn test_listener_may_query_session() {
    let session = session_with(Arc::new(ScriptedAdapter::default()));
    let observed = Arc::new(Mutex::new(Vec::new()));

    let probe = session.clone();
    let sink = observed.clone();
    session.add_play_state_listener(Arc::new(move |playing| {
        sink.lock()
            .unwrap()
            .push((playing, probe.current_track_id()));
    }));

    session.play_full_track("3-2", OTHER_URL).await.unwrap();
    session.stop().await;

    assert_eq!(
        *observed.lock().unwrap(),
        vec![(true, Some("3-2".to_string())), (false, None)]
    );
}

#[tokio::test]
async fn test_dispose_stops_and_drops_listeners() {
    let adapter = Arc::new(ScriptedAdapter::default());
    let session = session_with(adapter.clone());
    let (listener, _) = recording_listener();
    let id = session.add_play_state_listener(listener);

    session.play_full_track("1-1", PREVIEW_URL).await.unwrap();
    session.dispose().await;

    assert_eq!(session.state(), PlaybackState::Idle);
    assert_eq!(session.listener_count(), 0);
    assert!(!session.remove_play_state_listener_by_id(id));
    assert!(adapter.loaded_tracks().is_empty());
}
