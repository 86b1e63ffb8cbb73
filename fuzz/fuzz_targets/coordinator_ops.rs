#![no_main]

use encore::coordinator::Coordinator;
use encore::model::Track;
use libfuzzer_sys::fuzz_target;

fn track(id: u32) -> Track {
    Track {
        id,
        title: format!("track {id}"),
        artist: String::from("artist"),
        media_url: format!("media/{id}.mp3"),
        artwork_url: None,
    }
}

fuzz_target!(|data: &[u8]| {
    let mut coordinator = Coordinator::new();
    let mut watcher = coordinator.subscribe();
    let mut toggled = false;

    for byte in data {
        let id = u32::from(byte >> 3) + 1;
        match byte % 6 {
            0 | 1 => coordinator.play_track(Some(&track(id))),
            2 => coordinator.play_track(None),
            3 => coordinator.pause_track(),
            4 => coordinator.set_current_track(Some(&track(id))),
            _ => {
                coordinator.toggle_play_pause();
                toggled = true;
            }
        }

        // Without toggles the playing flag can never point at nothing.
        if !toggled {
            let state = coordinator.state();
            assert!(!state.is_playing || state.current_track.is_some());
        }
    }

    // Snapshots arrive in mutation order and the last one matches the
    // coordinator's own state.
    let mut last = None;
    while let Some(state) = watcher.next_change() {
        last = Some(state);
    }
    if let Some(last) = last {
        assert_eq!(&last, coordinator.state());
    }
});
