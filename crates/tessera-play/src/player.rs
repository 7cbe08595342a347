use std::sync::Arc;
use std::time::Duration;

use parking_lot::Mutex;
use tokio::sync::{broadcast, mpsc};
use tokio::task::JoinHandle;
use tokio_util::sync::CancellationToken;
use tracing::warn;

use tessera_core::{Quality, ResourceId};
use tessera_events::{Event, EventBus};

use crate::config::PlayerConfig;
use crate::preload::PreloadedMedia;
use crate::session::{Cmd, SessionTask};
use crate::shared_state::SharedState;
use crate::traits::decoder::Decoder;
use crate::traits::prefs::Preferences;
use crate::traits::resolver::Resolver;
use crate::types::PlaybackPhase;

/// UI-facing handle to a playback session.
///
/// Cheap to clone; all clones drive the same session task. State getters
/// are lock-light snapshots of what the task last published, and
/// [`events`](Player::events) delivers the observer stream (progress,
/// quality changes, end-of-media, recovery, lifecycle).
///
/// The session tears down when [`shutdown`](Player::shutdown) is called or
/// when the last handle is dropped.
#[derive(Clone)]
pub struct Player {
    cmd_tx: mpsc::Sender<Cmd>,
    shared: Arc<SharedState>,
    bus: EventBus,
    cancel: CancellationToken,
    task: Arc<Mutex<Option<JoinHandle<()>>>>,
}

impl Player {
    /// Spawn a session task around the given collaborators.
    ///
    /// The decoder instance becomes exclusively owned by this session and
    /// is released at teardown.
    pub fn spawn<D, R, P>(
        decoder: Arc<D>,
        resolver: Arc<R>,
        prefs: Arc<P>,
        config: PlayerConfig,
    ) -> Self
    where
        D: Decoder,
        R: Resolver,
        P: Preferences,
    {
        let (cmd_tx, cmd_rx) = mpsc::channel(config.command_channel_capacity.max(1));
        let bus = EventBus::new(config.events_channel_capacity);
        let shared = Arc::new(SharedState::new());
        let cancel = CancellationToken::new();

        let task = SessionTask::new(
            decoder,
            resolver,
            prefs,
            config,
            bus.clone(),
            Arc::clone(&shared),
            cancel.clone(),
            cmd_rx,
        );
        let handle = tokio::spawn(task.run());

        Self {
            cmd_tx,
            shared,
            bus,
            cancel,
            task: Arc::new(Mutex::new(Some(handle))),
        }
    }

    fn send(&self, cmd: Cmd) {
        if let Err(err) = self.cmd_tx.try_send(cmd) {
            warn!("player command dropped: {err}");
        }
    }

    // ── setup ───────────────────────────────────────────────────────────

    /// Load a resource from scratch and start playback per config.
    pub fn initialize(&self, resource: impl Into<ResourceId>, initial_position: Option<Duration>) {
        self.send(Cmd::Load {
            resource: resource.into(),
            initial_position,
            preloaded: None,
        });
    }

    /// Adopt a preloaded resource instead of resolving again.
    pub fn initialize_with_preloaded(&self, media: Arc<PreloadedMedia>) {
        self.send(Cmd::Load {
            resource: media.resource_id.clone(),
            initial_position: media.initial_position,
            preloaded: Some(media),
        });
    }

    // ── transport ───────────────────────────────────────────────────────

    pub fn play(&self) {
        self.send(Cmd::Play);
    }

    pub fn pause(&self) {
        self.send(Cmd::Pause);
    }

    pub fn seek(&self, position: Duration) {
        self.send(Cmd::Seek { target: position });
    }

    pub fn set_rate(&self, rate: f32) {
        self.send(Cmd::SetRate { rate });
    }

    pub fn change_quality(&self, label: impl Into<String>) {
        self.send(Cmd::ChangeQuality {
            label: label.into(),
        });
    }

    pub fn toggle_loop(&self) {
        self.send(Cmd::ToggleLoop);
    }

    /// Re-run the last load after a surfaced error.
    pub fn retry(&self) {
        self.send(Cmd::Retry);
    }

    // ── lifecycle hooks ─────────────────────────────────────────────────

    pub fn handle_app_lifecycle(&self, background: bool) {
        self.send(Cmd::Lifecycle { background });
    }

    pub fn interruption_began(&self) {
        self.send(Cmd::InterruptionBegan);
    }

    pub fn interruption_ended(&self) {
        self.send(Cmd::InterruptionEnded);
    }

    pub fn connectivity_restored(&self) {
        self.send(Cmd::ConnectivityRestored);
    }

    // ── observable state ────────────────────────────────────────────────

    #[must_use]
    pub fn phase(&self) -> PlaybackPhase {
        self.shared.phase()
    }

    #[must_use]
    pub fn qualities(&self) -> Vec<Quality> {
        self.shared.qualities()
    }

    #[must_use]
    pub fn current_quality(&self) -> Option<Quality> {
        self.shared.current_quality()
    }

    #[must_use]
    pub fn is_loading(&self) -> bool {
        self.shared.is_loading()
    }

    #[must_use]
    pub fn is_buffering(&self) -> bool {
        self.shared.is_buffering()
    }

    #[must_use]
    pub fn is_switching_quality(&self) -> bool {
        self.shared.is_switching()
    }

    #[must_use]
    pub fn is_playing(&self) -> bool {
        self.shared.is_playing()
    }

    #[must_use]
    pub fn loop_enabled(&self) -> bool {
        self.shared.loop_enabled()
    }

    /// The intended playback position. This is what progress persistence
    /// and overlay sync should read; it never regresses to a stale decoder
    /// report during seeks or switches.
    #[must_use]
    pub fn position(&self) -> Duration {
        self.shared.position()
    }

    #[must_use]
    pub fn duration(&self) -> Option<Duration> {
        self.shared.duration()
    }

    #[must_use]
    pub fn error_message(&self) -> Option<String> {
        self.shared.error_message()
    }

    /// Subscribe to the session's observer event stream.
    #[must_use]
    pub fn events(&self) -> broadcast::Receiver<Event> {
        self.bus.subscribe()
    }

    // ── teardown ────────────────────────────────────────────────────────

    /// Tear the session down: cancel timers, release the decoder, and wait
    /// for the task to finish.
    pub async fn shutdown(&self) {
        self.cancel.cancel();
        let handle = self.task.lock().take();
        if let Some(handle) = handle {
            let _ = handle.await;
        }
    }
}
