use crate::model::{PlaybackState, Track};
use std::sync::mpsc::{Receiver, Sender, channel};

/// Subscription handle returned by [`Coordinator::subscribe`]. Snapshots
/// arrive in mutation order; dropping the watcher unsubscribes.
pub struct StateWatcher {
    rx: Receiver<PlaybackState>,
}

impl StateWatcher {
    /// Next pending snapshot, if any. Non-blocking.
    pub fn next_change(&mut self) -> Option<PlaybackState> {
        self.rx.try_recv().ok()
    }
}

/// Single source of truth for "what track is selected and whether it should
/// be playing". Exactly one writer (these operations); arbitrarily many
/// readers through [`StateWatcher`]s. Every operation is total and
/// infallible: resource-level failures belong to the player surface.
pub struct Coordinator {
    state: PlaybackState,
    watchers: Vec<Sender<PlaybackState>>,
}

impl Coordinator {
    pub fn new() -> Self {
        Self {
            state: PlaybackState::default(),
            watchers: Vec::new(),
        }
    }

    pub fn state(&self) -> &PlaybackState {
        &self.state
    }

    pub fn subscribe(&mut self) -> StateWatcher {
        let (tx, rx) = channel();
        self.watchers.push(tx);
        StateWatcher { rx }
    }

    /// Select a track and start playback.
    ///
    /// A different identity replaces the current track and starts playing; the
    /// current track while paused resumes; the current track while already
    /// playing is a no-op (no notification, so the surface never reloads).
    /// An absent descriptor acts as an explicit pause.
    pub fn play_track(&mut self, track: Option<&Track>) {
        let Some(track) = track else {
            self.pause_track();
            return;
        };

        match &self.state.current_track {
            Some(current) if current.same_identity(track) => {
                if self.state.is_playing {
                    return;
                }
                self.state.is_playing = true;
            }
            _ => {
                self.state.current_track = Some(track.clone());
                self.state.is_playing = true;
            }
        }
        self.notify();
    }

    pub fn pause_track(&mut self) {
        self.state.is_playing = false;
        self.notify();
    }

    /// Flips the playing flag unconditionally. Deliberately total: with no
    /// current track the flag is inert, the surface ignores it.
    pub fn toggle_play_pause(&mut self) {
        self.state.is_playing = !self.state.is_playing;
        self.notify();
    }

    /// Replace the current track without touching the playing flag, for
    /// loading a track that should not auto-start.
    pub fn set_current_track(&mut self, track: Option<&Track>) {
        self.state.current_track = track.cloned();
        self.notify();
    }

    fn notify(&mut self) {
        let state = &self.state;
        self.watchers.retain(|tx| tx.send(state.clone()).is_ok());
    }
}

impl Default for Coordinator {
    fn default() -> Self {
        Self::new()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use proptest::prop_assert;

    fn track(id: u32) -> Track {
        Track {
            id,
            title: format!("track {id}"),
            artist: String::from("artist"),
            media_url: format!("media/{id}.mp3"),
            artwork_url: None,
        }
    }

    fn drain(watcher: &mut StateWatcher) -> Vec<PlaybackState> {
        let mut out = Vec::new();
        while let Some(state) = watcher.next_change() {
            out.push(state);
        }
        out
    }

    #[test]
    fn play_selects_and_starts() {
        let mut coordinator = Coordinator::new();
        coordinator.play_track(Some(&track(1)));
        assert_eq!(coordinator.state().current_id(), Some(1));
        assert!(coordinator.state().is_playing);
    }

    #[test]
    fn replay_of_playing_track_is_a_no_op() {
        let mut coordinator = Coordinator::new();
        let mut watcher = coordinator.subscribe();
        coordinator.play_track(Some(&track(1)));
        assert_eq!(drain(&mut watcher).len(), 1);

        coordinator.play_track(Some(&track(1)));
        assert!(drain(&mut watcher).is_empty(), "no redundant notification");
        assert_eq!(coordinator.state().current_id(), Some(1));
        assert!(coordinator.state().is_playing);
    }

    #[test]
    fn switching_tracks_always_starts_playback() {
        let mut coordinator = Coordinator::new();
        coordinator.play_track(Some(&track(1)));
        coordinator.pause_track();

        coordinator.play_track(Some(&track(2)));
        assert_eq!(coordinator.state().current_id(), Some(2));
        assert!(coordinator.state().is_playing);
    }

    #[test]
    fn pause_then_replay_resumes_same_track() {
        let mut coordinator = Coordinator::new();
        coordinator.play_track(Some(&track(1)));
        coordinator.pause_track();
        assert_eq!(coordinator.state().current_id(), Some(1));
        assert!(!coordinator.state().is_playing);

        coordinator.play_track(Some(&track(1)));
        assert_eq!(coordinator.state().current_id(), Some(1));
        assert!(coordinator.state().is_playing);
    }

    #[test]
    fn double_toggle_restores_flag() {
        let mut coordinator = Coordinator::new();
        coordinator.play_track(Some(&track(1)));
        let before = coordinator.state().is_playing;
        coordinator.toggle_play_pause();
        coordinator.toggle_play_pause();
        assert_eq!(coordinator.state().is_playing, before);
    }

    #[test]
    fn toggle_is_total_even_without_track() {
        let mut coordinator = Coordinator::new();
        coordinator.toggle_play_pause();
        assert!(coordinator.state().is_playing);
        assert_eq!(coordinator.state().current_track, None);
        coordinator.toggle_play_pause();
        assert!(!coordinator.state().is_playing);
    }

    #[test]
    fn play_without_descriptor_pauses() {
        let mut coordinator = Coordinator::new();
        coordinator.play_track(Some(&track(1)));
        coordinator.play_track(None);
        assert!(!coordinator.state().is_playing);
        assert_eq!(coordinator.state().current_id(), Some(1));
    }

    #[test]
    fn set_current_track_keeps_playing_flag() {
        let mut coordinator = Coordinator::new();
        coordinator.play_track(Some(&track(1)));
        coordinator.set_current_track(Some(&track(2)));
        assert_eq!(coordinator.state().current_id(), Some(2));
        assert!(coordinator.state().is_playing);

        coordinator.set_current_track(None);
        assert_eq!(coordinator.state().current_track, None);
        assert!(coordinator.state().is_playing);
    }

    #[test]
    fn watchers_see_changes_in_mutation_order() {
        let mut coordinator = Coordinator::new();
        let mut watcher = coordinator.subscribe();

        coordinator.play_track(Some(&track(1)));
        coordinator.pause_track();
        coordinator.play_track(Some(&track(2)));

        let states = drain(&mut watcher);
        assert_eq!(states.len(), 3);
        assert_eq!(states[0].current_id(), Some(1));
        assert!(states[0].is_playing);
        assert!(!states[1].is_playing);
        assert_eq!(states[2].current_id(), Some(2));
        assert!(states[2].is_playing);
    }

    #[test]
    fn dropped_watcher_is_pruned() {
        let mut coordinator = Coordinator::new();
        let watcher = coordinator.subscribe();
        drop(watcher);
        coordinator.play_track(Some(&track(1)));
        assert!(coordinator.watchers.is_empty());
    }

    proptest::proptest! {
        // Property 1: for play/pause sequences (toggle excluded, see
        // toggle_is_total_even_without_track) the playing flag never points
        // at nothing.
        #[test]
        fn play_pause_sequences_never_play_nothing(ops in proptest::collection::vec(0u8..4, 1..200)) {
            let mut coordinator = Coordinator::new();
            let a = track(1);
            let b = track(2);

            for op in ops {
                match op {
                    0 => coordinator.play_track(Some(&a)),
                    1 => coordinator.play_track(Some(&b)),
                    2 => coordinator.play_track(None),
                    _ => coordinator.pause_track(),
                }
                let state = coordinator.state();
                prop_assert!(!state.is_playing || state.current_track.is_some());
            }
        }

        // Later operations supersede earlier ones; the last play decides the
        // observable state regardless of history.
        #[test]
        fn last_play_wins(ops in proptest::collection::vec(0u8..5, 0..100)) {
            let mut coordinator = Coordinator::new();
            for op in ops {
                match op {
                    0 => coordinator.play_track(Some(&track(1))),
                    1 => coordinator.play_track(Some(&track(2))),
                    2 => coordinator.pause_track(),
                    3 => coordinator.toggle_play_pause(),
                    _ => coordinator.set_current_track(Some(&track(3))),
                }
            }
            coordinator.play_track(Some(&track(9)));
            prop_assert!(coordinator.state().is_playing);
            prop_assert!(coordinator.state().current_id() == Some(9));
        }
    }
}
