use std::pin::pin;
use std::sync::Arc;
use std::time::Duration;

use futures::future::join_all;
use parking_lot::Mutex;
use tokio::sync::Notify;
use tracing::{debug, warn};

use tessera_core::{MediaReference, Quality, ResourceId};

use crate::cache::adjacent;
use crate::config::PlayerConfig;
use crate::epoch::Epoch;
use crate::error::PlayResult;
use crate::player::Player;
use crate::resolve::resolve_playable;
use crate::traits::prefs::Preferences;
use crate::traits::resolver::Resolver;

/// A resolved, ready-to-open resource produced ahead of player construction.
///
/// Produced once per preload generation; the first consumer opens it, later
/// waiters observe the same cached value. Never reused across generations.
#[derive(Clone, Debug)]
pub struct PreloadedMedia {
    pub resource_id: ResourceId,
    /// Preload generation this result belongs to.
    pub epoch: u64,
    /// Full quality ladder, descending.
    pub qualities: Vec<Quality>,
    /// The rendition selected for startup.
    pub quality: Quality,
    pub media: MediaReference,
    pub initial_position: Option<Duration>,
    /// Best-effort adjacent renditions resolved alongside the main one.
    pub prefetched: Vec<(Quality, MediaReference)>,
}

/// Single-assignment slot with wakeups: produce once, consume many.
struct Handoff<T> {
    slot: Mutex<Option<T>>,
    notify: Notify,
}

impl<T: Clone> Handoff<T> {
    fn new() -> Self {
        Self {
            slot: Mutex::new(None),
            notify: Notify::new(),
        }
    }

    /// First write wins; later writes are dropped.
    fn publish(&self, value: T) -> bool {
        {
            let mut slot = self.slot.lock();
            if slot.is_some() {
                return false;
            }
            *slot = Some(value);
        }
        self.notify.notify_waiters();
        true
    }

    async fn wait(&self) -> T {
        loop {
            let mut notified = pin!(self.notify.notified());
            notified.as_mut().enable();
            if let Some(value) = self.slot.lock().clone() {
                return value;
            }
            notified.await;
        }
    }
}

type MediaHandoff = Handoff<PlayResult<Arc<PreloadedMedia>>>;

/// Starts resolving a resource before the consuming player exists.
///
/// Each `preload` call starts a new generation; in-flight work from earlier
/// generations runs to completion but its result is suppressed, never
/// published. Rapid content switching therefore costs nothing but abandoned
/// network calls.
pub struct Preloader<R, P> {
    resolver: Arc<R>,
    prefs: Arc<P>,
    config: PlayerConfig,
    epoch: Epoch,
    slot: Mutex<Arc<MediaHandoff>>,
}

impl<R, P> Preloader<R, P>
where
    R: Resolver,
    P: Preferences,
{
    pub fn new(resolver: Arc<R>, prefs: Arc<P>, config: PlayerConfig) -> Self {
        Self {
            resolver,
            prefs,
            config,
            epoch: Epoch::new(),
            slot: Mutex::new(Arc::new(Handoff::new())),
        }
    }

    /// Begin resolving `resource`. Supersedes any preload still in flight.
    pub fn preload(&self, resource: ResourceId, initial_position: Option<Duration>) {
        let stamp = self.epoch.bump();
        let handoff = Arc::new(Handoff::new());
        *self.slot.lock() = Arc::clone(&handoff);

        let resolver = Arc::clone(&self.resolver);
        let prefs = Arc::clone(&self.prefs);
        let ceiling = self.config.default_quality_ceiling;

        debug!(%resource, epoch = stamp.value(), "preload started");
        tokio::spawn(async move {
            let resolved =
                resolve_playable(resolver.as_ref(), prefs.as_ref(), ceiling, &resource).await;
            if stamp.is_stale() {
                debug!(%resource, "preload superseded, result discarded");
                return;
            }

            let resolved = match resolved {
                Ok(resolved) => resolved,
                Err(err) => {
                    warn!(%resource, %err, "preload failed");
                    handoff.publish(Err(err));
                    return;
                }
            };

            // Opportunistic adjacent-rendition prefetch, failures ignored.
            let lookups = adjacent(&resolved.qualities, &resolved.quality)
                .into_iter()
                .cloned()
                .map(|quality| {
                    let resolver = Arc::clone(&resolver);
                    let resource = resource.clone();
                    async move {
                        let media = resolver.resolve(&resource, &quality).await;
                        (quality, media)
                    }
                });
            let mut prefetched = Vec::new();
            for (quality, result) in join_all(lookups).await {
                match result {
                    Ok(media) => prefetched.push((quality, media)),
                    Err(err) => debug!(quality = quality.label(), %err, "prefetch skipped"),
                }
            }

            if stamp.is_stale() {
                debug!(%resource, "preload superseded, result discarded");
                return;
            }
            let media = Arc::new(PreloadedMedia {
                resource_id: resource.clone(),
                epoch: stamp.value(),
                qualities: resolved.qualities,
                quality: resolved.quality,
                media: resolved.media,
                initial_position,
                prefetched,
            });
            if handoff.publish(Ok(media)) {
                debug!(%resource, "preload ready");
            }
        });
    }

    /// Wait for the newest preload generation's result.
    ///
    /// Repeat calls after completion re-serve the cached value without
    /// re-running any resolution.
    pub async fn wait_for_media(&self) -> PlayResult<Arc<PreloadedMedia>> {
        let handoff = self.slot.lock().clone();
        handoff.wait().await
    }

    /// Bind a player: as soon as the newest preload completes, start
    /// playback on it. Failures stay surfaced through the preload result
    /// and leave the player untouched.
    pub fn hand_off_to(&self, player: &Player) {
        let handoff = self.slot.lock().clone();
        let player = player.clone();
        tokio::spawn(async move {
            match handoff.wait().await {
                Ok(media) => player.initialize_with_preloaded(media),
                Err(err) => warn!(%err, "preload hand-off skipped"),
            }
        });
    }
}
