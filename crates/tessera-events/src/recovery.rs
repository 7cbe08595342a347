use std::time::Duration;

/// Recovery strategy tier.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum RecoveryTier {
    /// Small forward seek on the existing decoder instance.
    Nudge,
    /// Re-resolve, reopen and reseek from scratch.
    Reload,
}

/// Stall-recovery event for UI observers.
#[derive(Clone, Debug)]
#[non_exhaustive]
pub enum RecoveryEvent {
    /// Buffering exceeded the stall timeout.
    Stalled { waited: Duration },
    /// A recovery attempt of the given tier started.
    Attempt { tier: RecoveryTier, attempt: u32 },
    /// Playback recovered.
    Recovered { tier: RecoveryTier },
    /// The recovery attempt itself failed; the watchdog re-arms on the next
    /// buffering signal.
    Failed { error: String },
}
