/// Lifecycle state of a track.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default)]
pub enum TrackState {
    /// Newly created; not yet matched in `n_init` consecutive frames.
    /// A single miss deletes it.
    #[default]
    Tentative,
    /// Matched often enough to be trusted; survives up to `max_age` misses.
    Confirmed,
    /// Scheduled for removal from the track store.
    Deleted,
}

impl TrackState {
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::Tentative => "tentative",
            Self::Confirmed => "confirmed",
            Self::Deleted => "deleted",
        }
    }
}
