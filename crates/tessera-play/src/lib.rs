#![forbid(unsafe_code)]
#![allow(clippy::missing_errors_doc)]

//! Adaptive streaming playback engine.
//!
//! One [`Player`] drives one piece of content through loading, quality
//! switching, seeks, stalls and app-lifecycle interruptions, holding a
//! single authoritative notion of where the user is in the stream. The
//! decode engine and the streaming-resource resolver are collaborator
//! traits; a [`Preloader`] can resolve a resource before the player exists
//! and hand the result over exactly once.
//!
//! Supersession is epoch-based throughout: in-flight work is never
//! forcefully cancelled, its result is simply discarded once something
//! newer owns the session.

mod cache;
mod config;
mod epoch;
mod error;
mod lifecycle;
mod player;
mod position;
mod prefs;
mod preload;
mod resolve;
mod session;
mod shared_state;
mod switcher;
mod types;
mod watchdog;

pub mod traits;

#[cfg(any(test, feature = "test-utils"))]
pub mod mock;

pub use config::PlayerConfig;
pub use error::{PlayError, PlayResult};
pub use player::Player;
pub use prefs::{JsonFilePreferences, MemoryPreferences};
pub use preload::{PreloadedMedia, Preloader};
pub use traits::decoder::Decoder;
pub use traits::prefs::Preferences;
pub use traits::resolver::Resolver;
pub use types::PlaybackPhase;

// Re-export the vocabulary crates so downstreams need only one dependency.
pub use tessera_core::{CoreError, CoreResult, MediaReference, Quality, ResourceId};
pub use tessera_events::{
    DecoderEvent, Event, EventBus, LifecycleEvent, PlaybackEvent, QualityEvent, RecoveryEvent,
    RecoveryTier,
};
