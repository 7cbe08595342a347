use crate::lifecycle::LifecycleEvent;
use crate::playback::PlaybackEvent;
use crate::quality::QualityEvent;
use crate::recovery::RecoveryEvent;

/// Unified event emitted by a playback session.
///
/// Hierarchical: each concern has its own variant with a sub-enum, so
/// observers can match on the family they care about and ignore the rest.
#[derive(Clone, Debug)]
pub enum Event {
    Playback(PlaybackEvent),
    Quality(QualityEvent),
    Recovery(RecoveryEvent),
    Lifecycle(LifecycleEvent),
}

impl From<PlaybackEvent> for Event {
    fn from(e: PlaybackEvent) -> Self {
        Self::Playback(e)
    }
}

impl From<QualityEvent> for Event {
    fn from(e: QualityEvent) -> Self {
        Self::Quality(e)
    }
}

impl From<RecoveryEvent> for Event {
    fn from(e: RecoveryEvent) -> Self {
        Self::Recovery(e)
    }
}

impl From<LifecycleEvent> for Event {
    fn from(e: LifecycleEvent) -> Self {
        Self::Lifecycle(e)
    }
}
