use serde::{Deserialize, Serialize};

/// One playable portfolio item. Immutable once constructed; the coordinator
/// only ever swaps which `Track` is current, it never edits one.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
pub struct Track {
    pub id: u32,
    pub title: String,
    pub artist: String,
    pub media_url: String,
    pub artwork_url: Option<String>,
}

impl Track {
    /// Identity comparison used everywhere a "same track?" decision is made.
    pub fn same_identity(&self, other: &Track) -> bool {
        self.id == other.id
    }
}

/// The shared playback state: what is selected and whether it should be
/// audible. `is_playing` carries no meaning while `current_track` is `None`.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct PlaybackState {
    pub current_track: Option<Track>,
    pub is_playing: bool,
}

impl PlaybackState {
    pub fn current_id(&self) -> Option<u32> {
        self.current_track.as_ref().map(|track| track.id)
    }

    pub fn is_current(&self, track: &Track) -> bool {
        self.current_id() == Some(track.id)
    }
}
