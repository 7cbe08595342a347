use std::time::Duration;

/// Asynchronous signal reported by the decode engine.
///
/// These flow decoder → engine on the decoder's own broadcast channel; the
/// engine filters them (position reports are distrusted during seeks and
/// switches) before anything reaches observable state.
#[derive(Clone, Debug)]
#[non_exhaustive]
pub enum DecoderEvent {
    /// Natural playback position tick.
    PositionChanged { position: Duration },
    /// Buffering started or cleared.
    BufferingChanged { buffering: bool },
    /// Media duration became known; doubles as the readiness signal after
    /// an open.
    DurationKnown { duration: Duration },
    /// Playback reached the end of the media.
    Completed,
    /// The decode engine gave up on the current media.
    Failed { error: String },
}
