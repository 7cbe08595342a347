//! Shared atomic state between the session task and its handles.
//!
//! The session task is the only writer. Handles read through relaxed loads,
//! which is enough for UI snapshots; anything that needs ordering flows
//! through the event bus instead.

use std::sync::atomic::{AtomicBool, AtomicU8, Ordering};
use std::time::Duration;

use parking_lot::Mutex;
use portable_atomic::AtomicF64;

use tessera_core::Quality;

use crate::types::PlaybackPhase;

#[derive(Debug, Default)]
pub(crate) struct SharedState {
    phase: AtomicU8,
    playing: AtomicBool,
    buffering: AtomicBool,
    loading: AtomicBool,
    switching: AtomicBool,
    loop_enabled: AtomicBool,
    /// Intended position in seconds, mirrored from the position authority.
    position_secs: AtomicF64,
    /// Media duration in seconds; negative means unknown.
    duration_secs: AtomicF64,
    error: Mutex<Option<String>>,
    current_quality: Mutex<Option<Quality>>,
    qualities: Mutex<Vec<Quality>>,
}

impl SharedState {
    pub(crate) fn new() -> Self {
        let state = Self::default();
        state.duration_secs.store(-1.0, Ordering::Relaxed);
        state
    }

    pub(crate) fn phase(&self) -> PlaybackPhase {
        PlaybackPhase::from_u8(self.phase.load(Ordering::Relaxed))
    }

    pub(crate) fn set_phase(&self, phase: PlaybackPhase) {
        self.phase.store(phase.as_u8(), Ordering::Relaxed);
    }

    pub(crate) fn is_playing(&self) -> bool {
        self.playing.load(Ordering::Relaxed)
    }

    pub(crate) fn set_playing(&self, playing: bool) {
        self.playing.store(playing, Ordering::Relaxed);
    }

    pub(crate) fn is_buffering(&self) -> bool {
        self.buffering.load(Ordering::Relaxed)
    }

    pub(crate) fn set_buffering(&self, buffering: bool) {
        self.buffering.store(buffering, Ordering::Relaxed);
    }

    pub(crate) fn is_loading(&self) -> bool {
        self.loading.load(Ordering::Relaxed)
    }

    pub(crate) fn set_loading(&self, loading: bool) {
        self.loading.store(loading, Ordering::Relaxed);
    }

    pub(crate) fn is_switching(&self) -> bool {
        self.switching.load(Ordering::Relaxed)
    }

    pub(crate) fn set_switching(&self, switching: bool) {
        self.switching.store(switching, Ordering::Relaxed);
    }

    pub(crate) fn loop_enabled(&self) -> bool {
        self.loop_enabled.load(Ordering::Relaxed)
    }

    pub(crate) fn set_loop_enabled(&self, enabled: bool) {
        self.loop_enabled.store(enabled, Ordering::Relaxed);
    }

    pub(crate) fn position(&self) -> Duration {
        Duration::from_secs_f64(self.position_secs.load(Ordering::Relaxed).max(0.0))
    }

    pub(crate) fn set_position(&self, position: Duration) {
        self.position_secs
            .store(position.as_secs_f64(), Ordering::Relaxed);
    }

    pub(crate) fn duration(&self) -> Option<Duration> {
        let secs = self.duration_secs.load(Ordering::Relaxed);
        (secs >= 0.0).then(|| Duration::from_secs_f64(secs))
    }

    pub(crate) fn set_duration(&self, duration: Option<Duration>) {
        let secs = duration.map_or(-1.0, |d| d.as_secs_f64());
        self.duration_secs.store(secs, Ordering::Relaxed);
    }

    pub(crate) fn error_message(&self) -> Option<String> {
        self.error.lock().clone()
    }

    pub(crate) fn set_error(&self, message: Option<String>) {
        *self.error.lock() = message;
    }

    pub(crate) fn current_quality(&self) -> Option<Quality> {
        self.current_quality.lock().clone()
    }

    pub(crate) fn set_current_quality(&self, quality: Option<Quality>) {
        *self.current_quality.lock() = quality;
    }

    pub(crate) fn qualities(&self) -> Vec<Quality> {
        self.qualities.lock().clone()
    }

    pub(crate) fn set_qualities(&self, qualities: Vec<Quality>) {
        *self.qualities.lock() = qualities;
    }
}
