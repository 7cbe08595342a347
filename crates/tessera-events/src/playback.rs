use std::time::Duration;

/// Playback-surface event for UI observers.
#[derive(Clone, Debug)]
#[non_exhaustive]
pub enum PlaybackEvent {
    /// Periodic progress tick, driven by trusted position updates.
    Progress {
        position: Duration,
        duration: Option<Duration>,
    },
    /// Passive buffering indicator changed.
    Buffering { active: bool },
    /// Playback reached the end of the media and loop mode is off.
    Ended,
    /// A user-visible error. `retryable` errors keep the session usable;
    /// the same action can be issued again.
    Error { message: String, retryable: bool },
}
