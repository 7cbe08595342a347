use std::time::Duration;

/// Single source of truth for the position the user intends to be at.
///
/// Decoder position reports are advisory: they update the intended position
/// only while no seek or switch is reconfiguring the pipeline, and a zero
/// report is never trusted (decoders emit those while reopening media).
/// Progress persistence and overlay sync must read [`intended`] rather than
/// the raw decoder position.
///
/// [`intended`]: PositionAuthority::intended
#[derive(Debug, Default)]
pub(crate) struct PositionAuthority {
    intended: Duration,
    seeking: bool,
    switching: bool,
}

impl PositionAuthority {
    pub(crate) fn intended(&self) -> Duration {
        self.intended
    }

    pub(crate) fn is_seeking(&self) -> bool {
        self.seeking
    }

    pub(crate) fn is_switching(&self) -> bool {
        self.switching
    }

    /// Force the intended position, bypassing guards. Only for deliberate
    /// intent changes such as the recovery nudge.
    pub(crate) fn set_intended(&mut self, position: Duration) {
        self.intended = position;
    }

    /// Feed a natural playback tick. Returns whether it was accepted.
    pub(crate) fn observe_tick(&mut self, reported: Duration) -> bool {
        if self.seeking || self.switching || reported.is_zero() {
            return false;
        }
        self.intended = reported;
        true
    }

    /// A user seek moves intent immediately, before the decoder catches up.
    pub(crate) fn begin_seek(&mut self, target: Duration) {
        self.seeking = true;
        self.intended = target;
    }

    pub(crate) fn end_seek(&mut self) {
        self.seeking = false;
    }

    pub(crate) fn begin_switch(&mut self) {
        self.switching = true;
    }

    pub(crate) fn end_switch(&mut self) {
        self.switching = false;
    }

    /// A superseding operation owns the session now; stuck guards from the
    /// superseded one must not outlive it.
    pub(crate) fn reset_guards(&mut self) {
        self.seeking = false;
        self.switching = false;
    }
}
