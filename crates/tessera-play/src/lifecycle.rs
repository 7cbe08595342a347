/// What the session should do in response to a lifecycle transition.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub(crate) enum LifecycleAction {
    None,
    Pause,
    Resume,
    /// Background playback is enabled: keep playing and hand control to the
    /// host's background audio session.
    ContinueInBackground,
    /// Returning to the foreground after a background hand-off.
    ReclaimControl,
}

/// Pure state machine reconciling backgrounding and transient audio
/// interruptions with playback continuation policy.
///
/// The background flag and the interruption flag are orthogonal: a phone
/// call can arrive while already backgrounded, and each remembers its own
/// was-playing answer.
#[derive(Debug)]
pub(crate) struct LifecycleCoordinator {
    background_playback: bool,
    in_background: bool,
    interrupted: bool,
    was_playing_before_background: bool,
    was_playing_before_interruption: bool,
}

impl LifecycleCoordinator {
    pub(crate) fn new(background_playback: bool) -> Self {
        Self {
            background_playback,
            in_background: false,
            interrupted: false,
            was_playing_before_background: false,
            was_playing_before_interruption: false,
        }
    }

    pub(crate) fn on_background(&mut self, playing: bool) -> LifecycleAction {
        if self.in_background {
            return LifecycleAction::None;
        }
        self.in_background = true;
        if self.background_playback {
            return LifecycleAction::ContinueInBackground;
        }
        self.was_playing_before_background = playing;
        if playing {
            LifecycleAction::Pause
        } else {
            LifecycleAction::None
        }
    }

    pub(crate) fn on_foreground(&mut self) -> LifecycleAction {
        if !self.in_background {
            return LifecycleAction::None;
        }
        self.in_background = false;
        if self.background_playback {
            return LifecycleAction::ReclaimControl;
        }
        let resume = std::mem::take(&mut self.was_playing_before_background);
        if self.interrupted {
            // Still interrupted (a call arrived while backgrounded): defer
            // the resume decision to the interruption end.
            self.was_playing_before_interruption |= resume;
            return LifecycleAction::None;
        }
        if resume {
            LifecycleAction::Resume
        } else {
            LifecycleAction::None
        }
    }

    pub(crate) fn on_interruption_began(&mut self, playing: bool) -> LifecycleAction {
        if self.interrupted {
            return LifecycleAction::None;
        }
        self.interrupted = true;
        self.was_playing_before_interruption = playing;
        if playing {
            LifecycleAction::Pause
        } else {
            LifecycleAction::None
        }
    }

    pub(crate) fn on_interruption_ended(&mut self) -> LifecycleAction {
        if !self.interrupted {
            return LifecycleAction::None;
        }
        self.interrupted = false;
        let resume = std::mem::take(&mut self.was_playing_before_interruption);
        if resume && !self.in_background {
            LifecycleAction::Resume
        } else if resume {
            // Ended while still backgrounded: resume once foregrounded.
            self.was_playing_before_background = true;
            LifecycleAction::None
        } else {
            LifecycleAction::None
        }
    }
}
