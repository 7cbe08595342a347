/// Coarse session state, one tag per mutually exclusive mode.
///
/// Replaces the original controller's pile of boolean flags; the session
/// task is the only writer.
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq, Hash)]
#[non_exhaustive]
pub enum PlaybackPhase {
    /// No media loaded yet.
    #[default]
    Idle,
    /// Resolving and opening a resource.
    Loading,
    /// Media open; playing or paused.
    Ready,
    /// A user seek is settling.
    Seeking,
    /// A quality switch is in flight (including its debounce window).
    Switching,
    /// Buffering exceeded the stall timeout.
    Stalled,
    /// A recovery attempt is running.
    Recovering,
    /// Played to the end with loop mode off.
    Ended,
    /// The last load attempt failed; `retry` re-runs it.
    Failed,
}

impl PlaybackPhase {
    pub(crate) fn as_u8(self) -> u8 {
        match self {
            Self::Idle => 0,
            Self::Loading => 1,
            Self::Ready => 2,
            Self::Seeking => 3,
            Self::Switching => 4,
            Self::Stalled => 5,
            Self::Recovering => 6,
            Self::Ended => 7,
            Self::Failed => 8,
        }
    }

    pub(crate) fn from_u8(raw: u8) -> Self {
        match raw {
            1 => Self::Loading,
            2 => Self::Ready,
            3 => Self::Seeking,
            4 => Self::Switching,
            5 => Self::Stalled,
            6 => Self::Recovering,
            7 => Self::Ended,
            8 => Self::Failed,
            _ => Self::Idle,
        }
    }

    /// Whether transport commands (play/pause/seek) make sense right now.
    #[must_use]
    pub fn has_media(self) -> bool {
        !matches!(self, Self::Idle | Self::Loading | Self::Failed)
    }
}
