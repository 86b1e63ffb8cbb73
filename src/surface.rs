use crate::audio::{AudioEngine, EngineEvent};
use crate::coordinator::StateWatcher;
use crate::model::PlaybackState;
use log::{debug, warn};
use std::time::Duration;

const DEFAULT_VOLUME: f32 = 0.7;

/// What the player bar shows. Produced only while a track is selected; the
/// bar is entirely absent otherwise.
#[derive(Debug, Clone, PartialEq)]
pub struct PlayerBarView {
    pub title: String,
    pub artist: String,
    pub artwork_url: Option<String>,
    pub is_playing: bool,
    pub loading: bool,
    pub position: Option<Duration>,
    pub duration: Option<Duration>,
    pub volume: f32,
    pub muted: bool,
}

struct IssuedLoad {
    seq: u64,
    track_id: u32,
    title: String,
}

/// Bridges coordinator snapshots to the one playback engine instance.
///
/// The surface is the engine's only caller. It reloads on track identity
/// changes, resumes/pauses on flag edges (pause keeps position), and guards
/// against load completions that a later load has superseded. Engine
/// failures go to the log and the status line; they never touch the shared
/// playback state.
pub struct PlayerSurface {
    engine: Box<dyn AudioEngine>,
    watcher: StateWatcher,
    snapshot: PlaybackState,
    bound_id: Option<u32>,
    loading: Option<u64>,
    issued: Vec<IssuedLoad>,
    next_seq: u64,
    duration: Option<Duration>,
    volume: f32,
    muted: bool,
    last_failure: Option<String>,
}

impl PlayerSurface {
    pub fn new(mut engine: Box<dyn AudioEngine>, watcher: StateWatcher) -> Self {
        engine.set_level(DEFAULT_VOLUME);
        Self {
            engine,
            watcher,
            snapshot: PlaybackState::default(),
            bound_id: None,
            loading: None,
            issued: Vec::new(),
            next_seq: 0,
            duration: None,
            volume: DEFAULT_VOLUME,
            muted: false,
            last_failure: None,
        }
    }

    /// Drains pending coordinator snapshots and engine events. Returns true
    /// when anything visible changed.
    pub fn tick(&mut self) -> bool {
        let mut dirty = false;
        while let Some(state) = self.watcher.next_change() {
            self.apply(state);
            dirty = true;
        }
        while let Some(event) = self.engine.poll() {
            self.handle_engine_event(event);
            dirty = true;
        }
        dirty
    }

    fn apply(&mut self, state: PlaybackState) {
        match &state.current_track {
            None => {
                if self.bound_id.is_some() {
                    self.engine.unload();
                    self.bound_id = None;
                    self.loading = None;
                    self.duration = None;
                }
            }
            Some(track) => {
                if self.bound_id != Some(track.id) {
                    let seq = self.next_seq;
                    self.next_seq += 1;
                    self.engine.load(&track.media_url, seq);
                    self.issued.push(IssuedLoad {
                        seq,
                        track_id: track.id,
                        title: track.title.clone(),
                    });
                    self.bound_id = Some(track.id);
                    self.loading = Some(seq);
                    self.duration = None;
                } else if self.loading.is_none() {
                    if state.is_playing {
                        self.engine.play();
                    } else {
                        self.engine.pause();
                    }
                }
                // While a load is in flight the play/pause decision is made
                // when the completion arrives.
            }
        }
        self.snapshot = state;
    }

    fn handle_engine_event(&mut self, event: EngineEvent) {
        let issued = self
            .issued
            .iter()
            .position(|load| load.seq == event.seq())
            .map(|idx| self.issued.remove(idx));

        match event {
            EngineEvent::Loaded { seq, duration } => {
                if self.loading != Some(seq) {
                    let title = issued.map(|load| load.title).unwrap_or_default();
                    debug!("discarding superseded load of \"{title}\" (seq {seq})");
                    return;
                }
                self.loading = None;
                self.duration = duration;
                if self.snapshot.is_playing {
                    self.engine.play();
                }
            }
            EngineEvent::Failed { seq, message } => {
                let failure = match issued {
                    Some(load) => format!(
                        "playback failed for \"{}\" (track {}): {message}",
                        load.title, load.track_id
                    ),
                    None => format!("playback failed: {message}"),
                };
                warn!("{failure}");
                self.last_failure = Some(failure);
                if self.loading == Some(seq) {
                    self.loading = None;
                }
            }
        }
    }

    pub fn set_volume(&mut self, volume: f32) {
        self.volume = volume.clamp(0.0, 1.0);
        if self.muted && self.volume > 0.0 {
            self.muted = false;
        }
        self.apply_level();
    }

    pub fn adjust_volume(&mut self, delta: f32) {
        self.set_volume(self.volume + delta);
    }

    pub fn toggle_mute(&mut self) {
        self.muted = !self.muted;
        self.apply_level();
    }

    fn apply_level(&mut self) {
        let level = if self.muted { 0.0 } else { self.volume };
        self.engine.set_level(level);
    }

    pub fn volume(&self) -> f32 {
        self.volume
    }

    pub fn is_muted(&self) -> bool {
        self.muted
    }

    pub fn last_failure(&self) -> Option<&str> {
        self.last_failure.as_deref()
    }

    /// The player bar, or `None` while no track was ever selected.
    pub fn view(&self) -> Option<PlayerBarView> {
        let track = self.snapshot.current_track.as_ref()?;
        Some(PlayerBarView {
            title: track.title.clone(),
            artist: track.artist.clone(),
            artwork_url: track.artwork_url.clone(),
            is_playing: self.snapshot.is_playing,
            loading: self.loading.is_some(),
            position: self.engine.position(),
            duration: self.duration,
            volume: self.volume,
            muted: self.muted,
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::coordinator::Coordinator;
    use crate::model::Track;
    use std::cell::RefCell;
    use std::collections::VecDeque;
    use std::rc::Rc;

    #[derive(Debug, Clone, PartialEq)]
    enum Command {
        Load(String, u64),
        Play,
        Pause,
        Unload,
        Level(f32),
    }

    #[derive(Default)]
    struct FakeInner {
        commands: Vec<Command>,
        events: VecDeque<EngineEvent>,
    }

    /// Engine double that records commands and replays scripted events, so
    /// tests control exactly when loads "complete".
    #[derive(Clone, Default)]
    struct FakeEngine {
        inner: Rc<RefCell<FakeInner>>,
    }

    impl FakeEngine {
        fn push_event(&self, event: EngineEvent) {
            self.inner.borrow_mut().events.push_back(event);
        }

        fn commands(&self) -> Vec<Command> {
            self.inner.borrow().commands.clone()
        }

        fn clear_commands(&self) {
            self.inner.borrow_mut().commands.clear();
        }
    }

    impl AudioEngine for FakeEngine {
        fn load(&mut self, url: &str, seq: u64) {
            self.inner
                .borrow_mut()
                .commands
                .push(Command::Load(url.to_string(), seq));
        }

        fn play(&mut self) {
            self.inner.borrow_mut().commands.push(Command::Play);
        }

        fn pause(&mut self) {
            self.inner.borrow_mut().commands.push(Command::Pause);
        }

        fn unload(&mut self) {
            self.inner.borrow_mut().commands.push(Command::Unload);
        }

        fn set_level(&mut self, level: f32) {
            self.inner.borrow_mut().commands.push(Command::Level(level));
        }

        fn level(&self) -> f32 {
            0.0
        }

        fn position(&self) -> Option<Duration> {
            None
        }

        fn poll(&mut self) -> Option<EngineEvent> {
            self.inner.borrow_mut().events.pop_front()
        }
    }

    fn track(id: u32) -> Track {
        Track {
            id,
            title: format!("track {id}"),
            artist: String::from("artist"),
            media_url: format!("media/{id}.mp3"),
            artwork_url: None,
        }
    }

    fn setup() -> (Coordinator, PlayerSurface, FakeEngine) {
        let mut coordinator = Coordinator::new();
        let watcher = coordinator.subscribe();
        let fake = FakeEngine::default();
        let surface = PlayerSurface::new(Box::new(fake.clone()), watcher);
        fake.clear_commands(); // drop the initial level command
        (coordinator, surface, fake)
    }

    #[test]
    fn renders_nothing_until_a_track_is_selected() {
        let (_coordinator, surface, _fake) = setup();
        assert_eq!(surface.view(), None);
    }

    #[test]
    fn first_play_loads_then_starts_after_completion() {
        let (mut coordinator, mut surface, fake) = setup();
        coordinator.play_track(Some(&track(1)));
        surface.tick();

        assert_eq!(
            fake.commands(),
            vec![Command::Load(String::from("media/1.mp3"), 0)]
        );
        let view = surface.view().expect("bar should render");
        assert!(view.loading);
        assert!(view.is_playing);

        fake.push_event(EngineEvent::Loaded {
            seq: 0,
            duration: Some(Duration::from_secs(180)),
        });
        surface.tick();

        assert_eq!(fake.commands().last(), Some(&Command::Play));
        let view = surface.view().expect("bar should render");
        assert!(!view.loading);
        assert_eq!(view.duration, Some(Duration::from_secs(180)));
    }

    #[test]
    fn resume_after_pause_does_not_reload() {
        let (mut coordinator, mut surface, fake) = setup();
        coordinator.play_track(Some(&track(1)));
        surface.tick();
        fake.push_event(EngineEvent::Loaded {
            seq: 0,
            duration: None,
        });
        surface.tick();
        fake.clear_commands();

        coordinator.pause_track();
        surface.tick();
        assert_eq!(fake.commands(), vec![Command::Pause]);

        coordinator.play_track(Some(&track(1)));
        surface.tick();
        assert_eq!(fake.commands(), vec![Command::Pause, Command::Play]);
    }

    #[test]
    fn replay_of_playing_track_issues_no_commands() {
        let (mut coordinator, mut surface, fake) = setup();
        coordinator.play_track(Some(&track(1)));
        surface.tick();
        fake.push_event(EngineEvent::Loaded {
            seq: 0,
            duration: None,
        });
        surface.tick();
        fake.clear_commands();

        coordinator.play_track(Some(&track(1)));
        surface.tick();
        assert_eq!(fake.commands(), Vec::new());
    }

    #[test]
    fn stale_load_completion_never_starts_the_old_track() {
        let (mut coordinator, mut surface, fake) = setup();
        coordinator.play_track(Some(&track(1)));
        surface.tick();
        // Switch before the first load finished.
        coordinator.play_track(Some(&track(2)));
        surface.tick();
        fake.clear_commands();

        fake.push_event(EngineEvent::Loaded {
            seq: 0,
            duration: Some(Duration::from_secs(99)),
        });
        surface.tick();
        assert_eq!(fake.commands(), Vec::new(), "stale completion is ignored");
        assert!(surface.view().expect("bar").loading);

        fake.push_event(EngineEvent::Loaded {
            seq: 1,
            duration: None,
        });
        surface.tick();
        assert_eq!(fake.commands(), vec![Command::Play]);
        assert!(!surface.view().expect("bar").loading);
    }

    #[test]
    fn failure_is_reported_but_state_is_left_alone() {
        let (mut coordinator, mut surface, fake) = setup();
        coordinator.play_track(Some(&track(1)));
        surface.tick();

        fake.push_event(EngineEvent::Failed {
            seq: 0,
            message: String::from("unsupported format"),
        });
        surface.tick();

        let failure = surface.last_failure().expect("failure recorded");
        assert!(failure.contains("track 1"), "identity in report: {failure}");
        assert!(failure.contains("unsupported format"));
        // The shared state still claims playing; nothing rolls it back.
        assert!(coordinator.state().is_playing);
        assert!(surface.view().expect("bar").is_playing);
        assert!(!fake.commands().contains(&Command::Play));
    }

    #[test]
    fn failure_after_a_switch_names_the_stale_track() {
        let (mut coordinator, mut surface, fake) = setup();
        coordinator.play_track(Some(&track(1)));
        surface.tick();
        coordinator.play_track(Some(&track(2)));
        surface.tick();

        fake.push_event(EngineEvent::Failed {
            seq: 0,
            message: String::from("read error"),
        });
        surface.tick();
        let failure = surface.last_failure().expect("failure recorded");
        assert!(failure.contains("track 1"), "stale identity kept: {failure}");
        assert!(surface.view().expect("bar").loading, "current load still pending");
    }

    #[test]
    fn clearing_the_track_unloads_and_hides_the_bar() {
        let (mut coordinator, mut surface, fake) = setup();
        coordinator.play_track(Some(&track(1)));
        surface.tick();
        fake.clear_commands();

        coordinator.set_current_track(None);
        surface.tick();
        assert_eq!(fake.commands(), vec![Command::Unload]);
        assert_eq!(surface.view(), None);
    }

    #[test]
    fn mute_drops_level_to_zero_and_back() {
        let (_coordinator, mut surface, fake) = setup();
        surface.set_volume(0.5);
        surface.toggle_mute();
        surface.toggle_mute();
        assert_eq!(
            fake.commands(),
            vec![
                Command::Level(0.5),
                Command::Level(0.0),
                Command::Level(0.5),
            ]
        );
    }

    #[test]
    fn raising_volume_unmutes() {
        let (_coordinator, mut surface, _fake) = setup();
        surface.toggle_mute();
        assert!(surface.is_muted());
        surface.adjust_volume(0.05);
        assert!(!surface.is_muted());
        assert!(surface.volume() > 0.0);
    }
}
