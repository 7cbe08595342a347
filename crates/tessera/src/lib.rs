#![forbid(unsafe_code)]

//! # Tessera
//!
//! Facade crate providing a unified API for the adaptive streaming
//! playback engine.
//!
//! ## Quick start
//!
//! ```ignore
//! use tessera::prelude::*;
//!
//! let player = Player::spawn(decoder, resolver, prefs, PlayerConfig::default());
//! player.initialize("42", None);
//! player.change_quality("1080p");
//! ```

// ── Re-export sub-crates ────────────────────────────────────────────────

pub mod core {
    pub use tessera_core::*;
}

pub mod events {
    pub use tessera_events::*;
}

pub mod play {
    pub use tessera_play::*;
}

/// Everything most hosts need.
pub mod prelude {
    pub use tessera_core::{MediaReference, Quality, ResourceId};
    pub use tessera_events::{Event, LifecycleEvent, PlaybackEvent, QualityEvent, RecoveryEvent};
    pub use tessera_play::{
        Decoder, PlayError, PlaybackPhase, Player, PlayerConfig, Preferences, PreloadedMedia,
        Preloader, Resolver,
    };
}
