#![forbid(unsafe_code)]

//! Shared fixtures for the engine integration tests.
//!
//! All timing-sensitive tests run under a paused tokio clock
//! (`#[tokio::test(start_paused = true)]`), so debounce windows, stall
//! timeouts and settle waits elapse deterministically.

use std::sync::Arc;
use std::time::Duration;

use tokio::sync::broadcast;
use tokio::time::{sleep, timeout};

use tessera_events::Event;
use tessera_play::mock::{MockDecoder, MockResolver};
use tessera_play::{MemoryPreferences, Player, PlayerConfig};

/// Content id used by most scenarios.
pub const RESOURCE: &str = "42";
/// Ladder offered for [`RESOURCE`], descending.
pub const LADDER: [&str; 3] = ["1080p", "720p", "480p"];

/// How long helpers wait before declaring a scenario wedged. Under a paused
/// clock this auto-advances, so a failure reports quickly.
const PATIENCE: Duration = Duration::from_secs(120);

pub fn init_tracing() {
    let _ = tracing_subscriber::fmt()
        .with_env_filter(
            tracing_subscriber::EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| "warn".into()),
        )
        .with_test_writer()
        .try_init();
}

/// A player wired to scriptable collaborators.
pub struct Harness {
    pub decoder: Arc<MockDecoder>,
    pub resolver: Arc<MockResolver>,
    pub prefs: Arc<MemoryPreferences>,
    pub player: Player,
}

impl Harness {
    /// Default harness: resource `42` with the standard ladder.
    pub fn new() -> Self {
        Self::with_config(PlayerConfig::default())
    }

    pub fn with_config(config: PlayerConfig) -> Self {
        let resolver = Arc::new(MockResolver::new().with_resource(RESOURCE, &LADDER));
        Self::with_parts(Arc::new(MockDecoder::new()), resolver, config)
    }

    pub fn with_parts(
        decoder: Arc<MockDecoder>,
        resolver: Arc<MockResolver>,
        config: PlayerConfig,
    ) -> Self {
        init_tracing();
        let prefs = Arc::new(MemoryPreferences::new());
        let player = Player::spawn(
            Arc::clone(&decoder),
            Arc::clone(&resolver),
            Arc::clone(&prefs),
            config,
        );
        Self {
            decoder,
            resolver,
            prefs,
            player,
        }
    }

    /// Initialize the standard resource and wait until it is ready.
    pub async fn start(&self) {
        self.player.initialize(RESOURCE, None);
        self.ready().await;
    }

    pub async fn ready(&self) {
        let player = self.player.clone();
        wait_until(move || player.phase() == tessera_play::PlaybackPhase::Ready).await;
    }
}

impl Default for Harness {
    fn default() -> Self {
        Self::new()
    }
}

/// Poll a condition until it holds.
pub async fn wait_until(mut condition: impl FnMut() -> bool) {
    timeout(PATIENCE, async {
        loop {
            if condition() {
                return;
            }
            sleep(Duration::from_millis(10)).await;
        }
    })
    .await
    .expect("condition not met in time");
}

/// Receive events until one matches, returning it.
pub async fn expect_event(
    rx: &mut broadcast::Receiver<Event>,
    mut matches: impl FnMut(&Event) -> bool,
) -> Event {
    timeout(PATIENCE, async {
        loop {
            match rx.recv().await {
                Ok(event) if matches(&event) => return event,
                Ok(_) => {}
                Err(err) => panic!("event stream ended while waiting: {err}"),
            }
        }
    })
    .await
    .expect("event not observed in time")
}

/// Drain anything already queued on an event receiver.
pub fn drain_events(rx: &mut broadcast::Receiver<Event>) {
    while rx.try_recv().is_ok() {}
}
