use std::time::Duration;

/// Configuration for a playback session.
///
/// Timing defaults follow the defensive controller generation: a short
/// debounce to collapse quality-toggle bursts, a 15 s stall timeout, and a
/// two-second settle tolerance around seeks.
#[derive(Clone, Debug)]
pub struct PlayerConfig {
    /// Start playing as soon as a load commits. Default: true.
    pub autoplay: bool,
    /// Keep playing while backgrounded (hand-off to a background audio
    /// session) instead of pausing. Default: false.
    pub background_playback: bool,
    /// Capacity of the command channel into the session task.
    pub command_channel_capacity: usize,
    /// Highest rendition height auto-selected when no preference is stored.
    /// `None` means pick the largest offered. Default: 720.
    pub default_quality_ceiling: Option<u32>,
    /// Capacity of the observer event bus.
    pub events_channel_capacity: usize,
    /// Grace period after a nudge seek before escalating to a full reload.
    pub nudge_grace: Duration,
    /// Forward seek distance used to skip a possibly-corrupt segment.
    pub nudge_offset: Duration,
    /// How long an opened media reference may take to report its duration.
    pub open_timeout: Duration,
    /// Wait before verifying where a seek actually landed.
    pub seek_settle_wait: Duration,
    /// Maximum accepted distance between a seek target and the settled
    /// position before reload recovery kicks in.
    pub seek_tolerance: Duration,
    /// Continuous buffering longer than this declares a stall.
    pub stall_timeout: Duration,
    /// Window in which rapid quality-change requests collapse into one.
    pub switch_debounce: Duration,
}

impl Default for PlayerConfig {
    fn default() -> Self {
        Self {
            autoplay: true,
            background_playback: false,
            command_channel_capacity: 32,
            default_quality_ceiling: Some(720),
            events_channel_capacity: 128,
            nudge_grace: Duration::from_secs(3),
            nudge_offset: Duration::from_secs(2),
            open_timeout: Duration::from_secs(10),
            seek_settle_wait: Duration::from_millis(500),
            seek_tolerance: Duration::from_secs(2),
            stall_timeout: Duration::from_secs(15),
            switch_debounce: Duration::from_millis(300),
        }
    }
}

impl PlayerConfig {
    #[must_use]
    pub fn with_autoplay(mut self, autoplay: bool) -> Self {
        self.autoplay = autoplay;
        self
    }

    #[must_use]
    pub fn with_background_playback(mut self, enabled: bool) -> Self {
        self.background_playback = enabled;
        self
    }

    #[must_use]
    pub fn with_default_quality_ceiling(mut self, ceiling: Option<u32>) -> Self {
        self.default_quality_ceiling = ceiling;
        self
    }

    #[must_use]
    pub fn with_nudge_grace(mut self, grace: Duration) -> Self {
        self.nudge_grace = grace;
        self
    }

    #[must_use]
    pub fn with_nudge_offset(mut self, offset: Duration) -> Self {
        self.nudge_offset = offset;
        self
    }

    #[must_use]
    pub fn with_open_timeout(mut self, timeout: Duration) -> Self {
        self.open_timeout = timeout;
        self
    }

    #[must_use]
    pub fn with_seek_settle_wait(mut self, wait: Duration) -> Self {
        self.seek_settle_wait = wait;
        self
    }

    #[must_use]
    pub fn with_seek_tolerance(mut self, tolerance: Duration) -> Self {
        self.seek_tolerance = tolerance;
        self
    }

    #[must_use]
    pub fn with_stall_timeout(mut self, timeout: Duration) -> Self {
        self.stall_timeout = timeout;
        self
    }

    #[must_use]
    pub fn with_switch_debounce(mut self, debounce: Duration) -> Self {
        self.switch_debounce = debounce;
        self
    }
}
