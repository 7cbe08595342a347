#![forbid(unsafe_code)]

mod bus;
mod decoder;
mod event;
mod lifecycle;
mod playback;
mod quality;
mod recovery;

pub use bus::EventBus;
pub use decoder::DecoderEvent;
pub use event::Event;
pub use lifecycle::LifecycleEvent;
pub use playback::PlaybackEvent;
pub use quality::QualityEvent;
pub use recovery::{RecoveryEvent, RecoveryTier};
