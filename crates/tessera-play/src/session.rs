//! Single-owner session task.
//!
//! All mutable session state lives here and is touched by exactly one task.
//! Public commands and internal attempt completions arrive as messages;
//! long-running work (resolve, open, seek, recover) runs in spawned attempt
//! tasks that hold an [`EpochStamp`] and re-check it after every suspension
//! point. The task re-checks the stamp once more before committing any
//! outcome, so a superseded operation can complete but never mutate state.

use std::sync::Arc;
use std::time::Duration;

use tokio::sync::{broadcast, mpsc};
use tokio::time::{Instant, sleep, sleep_until};
use tokio_util::sync::CancellationToken;
use tracing::{debug, warn};

use tessera_core::{MediaReference, Quality, ResourceId};
use tessera_events::{
    DecoderEvent, EventBus, LifecycleEvent, PlaybackEvent, QualityEvent, RecoveryEvent,
    RecoveryTier,
};

use crate::cache::{SharedQualityCache, adjacent};
use crate::config::PlayerConfig;
use crate::epoch::{Epoch, EpochStamp};
use crate::error::PlayError;
use crate::lifecycle::{LifecycleAction, LifecycleCoordinator};
use crate::position::PositionAuthority;
use crate::preload::PreloadedMedia;
use crate::resolve::{ResolvedMedia, resolve_playable};
use crate::shared_state::SharedState;
use crate::switcher::{PendingSwitch, SwitchAttempt, SwitchOutcome, position_delta};
use crate::traits::decoder::{Decoder, wait_until_ready};
use crate::traits::prefs::Preferences;
use crate::traits::resolver::Resolver;
use crate::types::PlaybackPhase;
use crate::watchdog::{RecoveryAttempt, RecoveryOutcome, StallWatchdog};

/// Disabled select branches still need an instant to point at.
const FAR_FUTURE: Duration = Duration::from_secs(86_400);

/// Commands from player handles.
pub(crate) enum Cmd {
    Load {
        resource: ResourceId,
        initial_position: Option<Duration>,
        preloaded: Option<Arc<PreloadedMedia>>,
    },
    Play,
    Pause,
    Seek { target: Duration },
    SetRate { rate: f32 },
    ChangeQuality { label: String },
    ToggleLoop,
    Retry,
    Lifecycle { background: bool },
    InterruptionBegan,
    InterruptionEnded,
    ConnectivityRestored,
}

pub(crate) enum LoadOutcome {
    Opened {
        qualities: Vec<Quality>,
        quality: Quality,
        media: MediaReference,
        duration: Duration,
        autoplay: bool,
        /// Adjacent references carried over from a preload, adopted into the
        /// cache only when this load commits.
        prefetched: Vec<(Quality, MediaReference)>,
    },
    Failed {
        error: PlayError,
    },
}

pub(crate) enum SeekOutcome {
    Settled,
    Mismatch { target: Duration, actual: Duration },
    Failed { error: PlayError },
}

/// Completions reported by spawned attempt tasks.
pub(crate) enum Internal {
    LoadFinished {
        stamp: EpochStamp,
        outcome: LoadOutcome,
    },
    SwitchFinished {
        stamp: EpochStamp,
        outcome: SwitchOutcome,
    },
    SeekFinished {
        seq: u64,
        resume: bool,
        outcome: SeekOutcome,
    },
    RecoveryFinished {
        stamp: EpochStamp,
        resumed: bool,
        /// Intended position the attempt was launched with.
        anchor: Duration,
        outcome: Option<RecoveryOutcome>,
    },
    Prefetched {
        stamp: EpochStamp,
        quality: Quality,
        media: MediaReference,
    },
}

pub(crate) struct SessionTask<D, R, P> {
    decoder: Arc<D>,
    resolver: Arc<R>,
    prefs: Arc<P>,
    config: PlayerConfig,
    bus: EventBus,
    shared: Arc<SharedState>,
    cancel: CancellationToken,

    cmd_rx: mpsc::Receiver<Cmd>,
    internal_tx: mpsc::Sender<Internal>,
    internal_rx: mpsc::Receiver<Internal>,
    decoder_rx: broadcast::Receiver<DecoderEvent>,
    decoder_closed: bool,

    epoch: Epoch,
    position: PositionAuthority,
    lifecycle: LifecycleCoordinator,
    watchdog: StallWatchdog,
    cache: SharedQualityCache,

    resource: Option<ResourceId>,
    qualities: Vec<Quality>,
    current_quality: Option<Quality>,
    duration: Option<Duration>,
    playing: bool,
    loop_enabled: bool,
    pending_switch: Option<PendingSwitch>,
    seek_seq: u64,
}

impl<D, R, P> SessionTask<D, R, P>
where
    D: Decoder,
    R: Resolver,
    P: Preferences,
{
    #[allow(clippy::too_many_arguments)]
    pub(crate) fn new(
        decoder: Arc<D>,
        resolver: Arc<R>,
        prefs: Arc<P>,
        config: PlayerConfig,
        bus: EventBus,
        shared: Arc<SharedState>,
        cancel: CancellationToken,
        cmd_rx: mpsc::Receiver<Cmd>,
    ) -> Self {
        let (internal_tx, internal_rx) = mpsc::channel(32);
        let decoder_rx = decoder.subscribe();
        let loop_enabled = prefs.loop_enabled();
        shared.set_loop_enabled(loop_enabled);
        let lifecycle = LifecycleCoordinator::new(config.background_playback);

        Self {
            decoder,
            resolver,
            prefs,
            config,
            bus,
            shared,
            cancel,
            cmd_rx,
            internal_tx,
            internal_rx,
            decoder_rx,
            decoder_closed: false,
            epoch: Epoch::new(),
            position: PositionAuthority::default(),
            lifecycle,
            watchdog: StallWatchdog::new(),
            cache: SharedQualityCache::default(),
            resource: None,
            qualities: Vec::new(),
            current_quality: None,
            duration: None,
            playing: false,
            loop_enabled,
            pending_switch: None,
            seek_seq: 0,
        }
    }

    pub(crate) async fn run(mut self) {
        let cancel = self.cancel.clone();
        loop {
            let debounce_deadline = self.pending_switch.as_ref().map(|p| p.deadline);
            let stall_deadline = self.watchdog.deadline();

            tokio::select! {
                () = cancel.cancelled() => break,
                maybe_cmd = self.cmd_rx.recv() => match maybe_cmd {
                    Some(cmd) => self.handle_cmd(cmd),
                    // Every handle dropped: tear down.
                    None => break,
                },
                Some(msg) = self.internal_rx.recv() => self.handle_internal(msg),
                maybe_event = next_decoder_event(&mut self.decoder_rx), if !self.decoder_closed => {
                    match maybe_event {
                        Some(event) => self.handle_decoder_event(event),
                        None => self.decoder_closed = true,
                    }
                }
                () = sleep_until(or_far(debounce_deadline)), if debounce_deadline.is_some() => {
                    self.fire_debounce();
                }
                () = sleep_until(or_far(stall_deadline)), if stall_deadline.is_some() => {
                    self.fire_stall();
                }
            }
        }
        self.teardown().await;
    }

    // ── command handling ────────────────────────────────────────────────

    fn handle_cmd(&mut self, cmd: Cmd) {
        match cmd {
            Cmd::Load {
                resource,
                initial_position,
                preloaded,
            } => self.start_load(resource, initial_position, preloaded),
            Cmd::Play => {
                if self.shared.phase() == PlaybackPhase::Ended {
                    // Restart from the top.
                    self.start_seek(Duration::ZERO, true);
                } else if self.shared.phase().has_media() {
                    self.decoder.play();
                    self.set_playing(true);
                }
            }
            Cmd::Pause => {
                self.decoder.pause();
                self.set_playing(false);
                self.watchdog.disarm();
            }
            Cmd::Seek { target } => self.start_seek(target, false),
            Cmd::SetRate { rate } => self.decoder.set_rate(rate),
            Cmd::ChangeQuality { label } => self.request_quality_switch(&label),
            Cmd::ToggleLoop => {
                self.loop_enabled = !self.loop_enabled;
                self.prefs.set_loop_enabled(self.loop_enabled);
                self.shared.set_loop_enabled(self.loop_enabled);
            }
            Cmd::Retry => {
                if let Some(resource) = self.resource.clone() {
                    self.shared.set_error(None);
                    let at = self.position.intended();
                    self.start_load(resource, Some(at), None);
                }
            }
            Cmd::Lifecycle { background } => self.handle_lifecycle(background),
            Cmd::InterruptionBegan => {
                let action = self.lifecycle.on_interruption_began(self.playing);
                self.bus.publish(LifecycleEvent::InterruptionBegan);
                self.apply_lifecycle(action);
            }
            Cmd::InterruptionEnded => {
                let action = self.lifecycle.on_interruption_ended();
                self.bus.publish(LifecycleEvent::InterruptionEnded {
                    resumed: action == LifecycleAction::Resume,
                });
                self.apply_lifecycle(action);
            }
            Cmd::ConnectivityRestored => {
                if self.shared.error_message().is_none() || self.watchdog.is_recovering() {
                    return;
                }
                debug!("connectivity restored with an error displayed, recovering");
                if self.current_quality.is_some() {
                    self.start_recovery(RecoveryTier::Reload, self.playing);
                } else if let Some(resource) = self.resource.clone() {
                    // The load itself never succeeded; re-run it.
                    let at = self.position.intended();
                    self.start_load(resource, Some(at), None);
                }
            }
        }
    }

    fn handle_lifecycle(&mut self, background: bool) {
        let action = if background {
            self.lifecycle.on_background(self.playing)
        } else {
            self.lifecycle.on_foreground()
        };
        if background {
            self.bus.publish(LifecycleEvent::EnteredBackground {
                continuing: action == LifecycleAction::ContinueInBackground,
            });
        } else {
            self.bus.publish(LifecycleEvent::EnteredForeground {
                resumed: action == LifecycleAction::Resume,
            });
        }
        self.apply_lifecycle(action);
    }

    fn apply_lifecycle(&mut self, action: LifecycleAction) {
        match action {
            LifecycleAction::None
            | LifecycleAction::ContinueInBackground
            | LifecycleAction::ReclaimControl => {}
            LifecycleAction::Pause => {
                self.decoder.pause();
                self.set_playing(false);
                self.watchdog.disarm();
            }
            LifecycleAction::Resume => self.resume_playback(),
        }
    }

    /// Resume after an interruption or foregrounding. A decoder that lost
    /// its media while suspended goes through the recovery path instead of
    /// failing silently.
    fn resume_playback(&mut self) {
        if self.shared.phase().has_media() && self.decoder.duration().is_some() {
            self.decoder.play();
            self.set_playing(true);
        } else if self.current_quality.is_some() {
            warn!("resume found the decode engine not ready, recovering");
            self.start_recovery(RecoveryTier::Reload, true);
        }
    }

    // ── loading ─────────────────────────────────────────────────────────

    fn start_load(
        &mut self,
        resource: ResourceId,
        initial_position: Option<Duration>,
        preloaded: Option<Arc<PreloadedMedia>>,
    ) {
        let stamp = self.epoch.bump();
        self.pending_switch = None;
        self.watchdog.reset();
        self.position.reset_guards();
        self.seek_seq += 1;
        self.cache.lock().clear();

        let initial = initial_position
            .or_else(|| preloaded.as_ref().and_then(|p| p.initial_position))
            .unwrap_or(Duration::ZERO);
        self.resource = Some(resource.clone());
        self.position.set_intended(initial);
        self.shared.set_position(initial);
        self.shared.set_error(None);
        self.shared.set_loading(true);
        self.shared.set_switching(false);
        self.shared.set_buffering(false);
        self.shared.set_phase(PlaybackPhase::Loading);

        debug!(%resource, epoch = stamp.value(), preloaded = preloaded.is_some(), "load started");

        let decoder = Arc::clone(&self.decoder);
        let resolver = Arc::clone(&self.resolver);
        let prefs = Arc::clone(&self.prefs);
        let ceiling = self.config.default_quality_ceiling;
        let open_timeout = self.config.open_timeout;
        let autoplay = self.config.autoplay;
        let tx = self.internal_tx.clone();

        tokio::spawn(async move {
            let outcome = run_load(
                decoder,
                resolver,
                prefs,
                ceiling,
                open_timeout,
                resource,
                initial,
                preloaded,
                autoplay,
                stamp.clone(),
            )
            .await;
            if let Some(outcome) = outcome {
                let _ = tx.send(Internal::LoadFinished { stamp, outcome }).await;
            }
        });
    }

    fn commit_load(
        &mut self,
        qualities: Vec<Quality>,
        quality: Quality,
        media: MediaReference,
        duration: Duration,
        autoplay: bool,
        prefetched: Vec<(Quality, MediaReference)>,
    ) {
        self.qualities = qualities;
        self.current_quality = Some(quality.clone());
        {
            let mut cache = self.cache.lock();
            for (prefetched_quality, reference) in prefetched {
                cache.insert(prefetched_quality.label(), reference);
            }
            cache.insert(quality.label(), media);
            cache.retain_adjacent(&self.qualities, &quality);
        }
        self.duration = Some(duration);
        self.shared.set_qualities(self.qualities.clone());
        self.shared.set_current_quality(Some(quality.clone()));
        self.shared.set_duration(Some(duration));
        self.shared.set_loading(false);
        self.shared.set_phase(PlaybackPhase::Ready);
        self.set_playing(autoplay);
        self.bus.publish(QualityEvent::Applied {
            previous: None,
            quality: quality.label().to_owned(),
        });
        debug!(quality = quality.label(), "load committed");
        self.spawn_prefetch();
    }

    // ── quality switching ───────────────────────────────────────────────

    fn request_quality_switch(&mut self, label: &str) {
        let Some(quality) = self.qualities.iter().find(|q| q.label() == label).cloned() else {
            warn!(label, "requested quality is not in the ladder");
            self.bus.publish(QualityEvent::SwitchFailed {
                quality: label.to_owned(),
                error: "quality not available".to_owned(),
            });
            return;
        };
        if self.current_quality.as_ref() == Some(&quality) {
            debug!(label, "already at requested quality");
            return;
        }

        // Supersede whatever is pending or in flight, then debounce.
        let stamp = self.epoch.bump();
        self.seek_seq += 1;
        self.position.reset_guards();
        self.position.begin_switch();
        self.shared.set_switching(true);
        self.shared.set_phase(PlaybackPhase::Switching);
        self.pending_switch = Some(PendingSwitch {
            quality,
            stamp,
            deadline: Instant::now() + self.config.switch_debounce,
        });
        debug!(label, "quality switch scheduled");
    }

    fn fire_debounce(&mut self) {
        let Some(pending) = self.pending_switch.take() else {
            return;
        };
        if pending.stamp.is_stale() {
            debug!("debounced switch superseded before launch");
            return;
        }
        let Some(resource) = self.resource.clone() else {
            self.position.end_switch();
            self.shared.set_switching(false);
            return;
        };

        let attempt = SwitchAttempt {
            decoder: Arc::clone(&self.decoder),
            resolver: Arc::clone(&self.resolver),
            cache: Arc::clone(&self.cache),
            resource,
            quality: pending.quality,
            anchor: self.position.intended(),
            config: self.config.clone(),
            stamp: pending.stamp.clone(),
        };
        let stamp = pending.stamp;
        let tx = self.internal_tx.clone();
        tokio::spawn(async move {
            if let Some(outcome) = attempt.run().await {
                let _ = tx.send(Internal::SwitchFinished { stamp, outcome }).await;
            }
        });
    }

    fn commit_switch(
        &mut self,
        quality: Quality,
        media: MediaReference,
        duration: Duration,
        anchor: Duration,
    ) {
        self.position.end_switch();
        self.shared.set_switching(false);

        let previous = self.current_quality.replace(quality.clone());
        {
            let mut cache = self.cache.lock();
            cache.insert(quality.label(), media);
            cache.retain_adjacent(&self.qualities, &quality);
        }
        self.duration = Some(duration);
        self.shared.set_duration(Some(duration));
        self.shared.set_current_quality(Some(quality.clone()));
        self.shared.set_phase(PlaybackPhase::Ready);
        self.prefs.set_preferred_quality(quality.label());
        if self.playing {
            self.decoder.play();
        }
        self.bus.publish(QualityEvent::Applied {
            previous: previous.map(|q| q.label().to_owned()),
            quality: quality.label().to_owned(),
        });
        debug!(quality = quality.label(), "quality switch committed");

        // The user may have seeked while the switch was mid-flight; the
        // switch honoured its anchor, so chase the newer intent now.
        let drift = position_delta(self.position.intended(), anchor);
        if drift > self.config.seek_tolerance {
            let target = self.position.intended();
            self.start_seek(target, false);
        }
        self.spawn_prefetch();
    }

    fn spawn_prefetch(&self) {
        let Some(resource) = self.resource.clone() else {
            return;
        };
        let Some(current) = self.current_quality.clone() else {
            return;
        };
        let stamp = self.epoch.stamp();
        for quality in adjacent(&self.qualities, &current) {
            if self.cache.lock().get(quality.label()).is_some() {
                continue;
            }
            let quality = quality.clone();
            let resolver = Arc::clone(&self.resolver);
            let resource = resource.clone();
            let tx = self.internal_tx.clone();
            let stamp = stamp.clone();
            tokio::spawn(async move {
                match resolver.resolve(&resource, &quality).await {
                    Ok(media) => {
                        if stamp.is_current() {
                            let _ = tx
                                .send(Internal::Prefetched {
                                    stamp,
                                    quality,
                                    media,
                                })
                                .await;
                        }
                    }
                    // Prefetch is best-effort; failures are not surfaced.
                    Err(err) => debug!(quality = quality.label(), %err, "adjacent prefetch failed"),
                }
            });
        }
    }

    // ── seeking ─────────────────────────────────────────────────────────

    fn start_seek(&mut self, target: Duration, resume_after: bool) {
        if self.current_quality.is_none() || !self.shared.phase().has_media() {
            debug!(?target, "seek ignored, no media");
            return;
        }
        if self.position.is_switching() {
            // A switch or recovery owns the decoder right now; move the
            // intent only. Its commit chases the newer position, so the
            // pipeline is never driven from two paths at once.
            debug!(?target, "seek during reconfiguration, intent moved");
            self.position.set_intended(target);
            self.shared.set_position(target);
            self.bus.publish(PlaybackEvent::Progress {
                position: target,
                duration: self.duration,
            });
            if resume_after {
                self.set_playing(true);
            }
            return;
        }
        self.seek_seq += 1;
        let seq = self.seek_seq;
        self.position.begin_seek(target);
        self.shared.set_position(target);
        self.shared.set_phase(PlaybackPhase::Seeking);
        // Observers see the intended position before the decoder catches up.
        self.bus.publish(PlaybackEvent::Progress {
            position: target,
            duration: self.duration,
        });

        let decoder = Arc::clone(&self.decoder);
        let settle_wait = self.config.seek_settle_wait;
        let tolerance = self.config.seek_tolerance;
        let stamp = self.epoch.stamp();
        let tx = self.internal_tx.clone();
        tokio::spawn(async move {
            if let Some(outcome) = run_seek(decoder, target, settle_wait, tolerance, stamp).await {
                let _ = tx
                    .send(Internal::SeekFinished {
                        seq,
                        resume: resume_after,
                        outcome,
                    })
                    .await;
            }
        });
    }

    // ── stall handling ──────────────────────────────────────────────────

    fn fire_stall(&mut self) {
        let attempt = self.watchdog.declare_stall();
        self.shared.set_phase(PlaybackPhase::Stalled);
        self.bus.publish(RecoveryEvent::Stalled {
            waited: self.config.stall_timeout,
        });
        warn!(attempt, "stall declared");

        let tier = if attempt == 1 {
            RecoveryTier::Nudge
        } else {
            RecoveryTier::Reload
        };
        if tier == RecoveryTier::Nudge {
            // The nudge deliberately moves the user's position forward past
            // the suspect segment.
            let nudged = self.position.intended() + self.config.nudge_offset;
            self.position.set_intended(nudged);
            self.shared.set_position(nudged);
        }
        self.start_recovery(tier, self.playing);
    }

    fn start_recovery(&mut self, tier: RecoveryTier, resume: bool) {
        let (Some(resource), Some(quality)) = (self.resource.clone(), self.current_quality.clone())
        else {
            return;
        };
        if self.watchdog.is_recovering() {
            debug!("recovery already in flight");
            return;
        }

        // A reload is a resource load: it supersedes in-flight work.
        let stamp = self.epoch.bump();
        if !self.watchdog.begin_recovery(stamp.value()) {
            return;
        }
        self.pending_switch = None;
        self.seek_seq += 1;
        self.position.reset_guards();
        // Reconfiguration guard: decoder reports are distrusted while the
        // pipeline reopens.
        self.position.begin_switch();
        self.shared.set_switching(false);
        self.shared.set_phase(PlaybackPhase::Recovering);

        let anchor = self.position.intended();
        let attempt = RecoveryAttempt {
            decoder: Arc::clone(&self.decoder),
            resolver: Arc::clone(&self.resolver),
            resource,
            quality,
            intended: anchor,
            resume,
            start_tier: tier,
            attempt: self.watchdog.stall_count().max(1),
            config: self.config.clone(),
            stamp: stamp.clone(),
            bus: self.bus.clone(),
        };
        let tx = self.internal_tx.clone();
        tokio::spawn(async move {
            let outcome = attempt.run().await;
            let _ = tx
                .send(Internal::RecoveryFinished {
                    stamp,
                    resumed: resume,
                    anchor,
                    outcome,
                })
                .await;
        });
    }

    // ── internal completions ────────────────────────────────────────────

    fn handle_internal(&mut self, msg: Internal) {
        match msg {
            Internal::LoadFinished { stamp, outcome } => {
                if stamp.is_stale() {
                    debug!("stale load result discarded");
                    return;
                }
                match outcome {
                    LoadOutcome::Opened {
                        qualities,
                        quality,
                        media,
                        duration,
                        autoplay,
                        prefetched,
                    } => self.commit_load(qualities, quality, media, duration, autoplay, prefetched),
                    LoadOutcome::Failed { error } => {
                        self.shared.set_loading(false);
                        self.shared.set_phase(PlaybackPhase::Failed);
                        self.surface_error(&error);
                    }
                }
            }
            Internal::SwitchFinished { stamp, outcome } => {
                if stamp.is_stale() {
                    debug!("stale switch result discarded");
                    return;
                }
                match outcome {
                    SwitchOutcome::Committed {
                        quality,
                        media,
                        duration,
                        anchor,
                    } => self.commit_switch(quality, media, duration, anchor),
                    SwitchOutcome::SettleMismatch { quality, actual } => {
                        warn!(
                            quality = quality.label(),
                            ?actual,
                            "switch settled off-target, reloading previous rendition"
                        );
                        self.position.end_switch();
                        self.shared.set_switching(false);
                        self.bus.publish(QualityEvent::SwitchFailed {
                            quality: quality.label().to_owned(),
                            error: "position did not settle".to_owned(),
                        });
                        self.start_recovery(RecoveryTier::Reload, self.playing);
                    }
                    SwitchOutcome::Failed { quality, error } => {
                        self.position.end_switch();
                        self.shared.set_switching(false);
                        if self.current_quality.is_some() {
                            self.shared.set_phase(PlaybackPhase::Ready);
                        }
                        self.bus.publish(QualityEvent::SwitchFailed {
                            quality: quality.label().to_owned(),
                            error: error.to_string(),
                        });
                        self.surface_error(&error);
                    }
                }
            }
            Internal::SeekFinished {
                seq,
                resume,
                outcome,
            } => {
                if seq != self.seek_seq {
                    debug!("stale seek completion discarded");
                    return;
                }
                match outcome {
                    SeekOutcome::Settled => {
                        self.position.end_seek();
                        if self.shared.phase() == PlaybackPhase::Seeking {
                            self.shared.set_phase(PlaybackPhase::Ready);
                        }
                        self.shared.set_position(self.position.intended());
                        if resume {
                            self.decoder.play();
                            self.set_playing(true);
                        }
                    }
                    SeekOutcome::Mismatch { target, actual } => {
                        warn!(?target, ?actual, "seek settled off-target, reloading");
                        self.position.end_seek();
                        self.start_recovery(RecoveryTier::Reload, self.playing || resume);
                    }
                    SeekOutcome::Failed { error } => {
                        self.position.end_seek();
                        if self.shared.phase() == PlaybackPhase::Seeking {
                            self.shared.set_phase(PlaybackPhase::Ready);
                        }
                        self.surface_error(&error);
                    }
                }
            }
            Internal::RecoveryFinished {
                stamp,
                resumed,
                anchor,
                outcome,
            } => {
                let success = matches!(&outcome, Some(RecoveryOutcome::Recovered { .. }));
                self.watchdog.recovery_finished(stamp.value(), success);
                if stamp.is_stale() {
                    debug!("stale recovery result discarded");
                    return;
                }
                let Some(outcome) = outcome else { return };
                self.position.end_switch();
                match outcome {
                    RecoveryOutcome::Recovered { tier } => {
                        self.shared.set_phase(PlaybackPhase::Ready);
                        self.shared.set_error(None);
                        self.shared.set_buffering(false);
                        self.bus.publish(PlaybackEvent::Buffering { active: false });
                        self.bus.publish(RecoveryEvent::Recovered { tier });
                        if resumed {
                            self.set_playing(true);
                        }
                        debug!(?tier, "recovery succeeded");
                        // A seek may have moved the intent while the reload
                        // was rebuilding the pipeline; chase it now.
                        let drift = position_delta(self.position.intended(), anchor);
                        if drift > self.config.seek_tolerance {
                            let target = self.position.intended();
                            self.start_seek(target, false);
                        }
                    }
                    RecoveryOutcome::Failed { error } => {
                        self.shared.set_phase(PlaybackPhase::Stalled);
                        self.bus.publish(RecoveryEvent::Failed {
                            error: error.to_string(),
                        });
                        self.surface_error(&error);
                    }
                }
            }
            Internal::Prefetched {
                stamp,
                quality,
                media,
            } => {
                if stamp.is_stale() {
                    return;
                }
                if let Some(current) = self.current_quality.clone() {
                    let mut cache = self.cache.lock();
                    cache.insert(quality.label(), media);
                    cache.retain_adjacent(&self.qualities, &current);
                }
                self.bus.publish(QualityEvent::Prefetched {
                    quality: quality.label().to_owned(),
                });
            }
        }
    }

    // ── decoder signals ─────────────────────────────────────────────────

    fn handle_decoder_event(&mut self, event: DecoderEvent) {
        match event {
            DecoderEvent::PositionChanged { position } => {
                if self.position.observe_tick(position) {
                    self.shared.set_position(position);
                    self.bus.publish(PlaybackEvent::Progress {
                        position,
                        duration: self.duration,
                    });
                }
            }
            DecoderEvent::BufferingChanged { buffering } => {
                self.shared.set_buffering(buffering);
                self.bus.publish(PlaybackEvent::Buffering { active: buffering });
                if buffering {
                    if self.playing && !self.watchdog.is_recovering() {
                        self.watchdog
                            .arm(Instant::now() + self.config.stall_timeout);
                    }
                } else {
                    self.watchdog.on_buffering_cleared();
                }
            }
            DecoderEvent::DurationKnown { duration } => {
                self.duration = Some(duration);
                self.shared.set_duration(Some(duration));
            }
            DecoderEvent::Completed => {
                if self.loop_enabled {
                    debug!("looping back to start");
                    self.start_seek(Duration::ZERO, true);
                } else {
                    self.set_playing(false);
                    self.shared.set_phase(PlaybackPhase::Ended);
                    self.bus.publish(PlaybackEvent::Ended);
                }
            }
            DecoderEvent::Failed { error } => {
                warn!(%error, "decode engine reported failure");
                if !self.watchdog.is_recovering() && self.current_quality.is_some() {
                    self.start_recovery(RecoveryTier::Reload, self.playing);
                } else {
                    self.surface_error(&PlayError::Decoder { reason: error });
                }
            }
            _ => {}
        }
    }

    // ── helpers ─────────────────────────────────────────────────────────

    fn set_playing(&mut self, playing: bool) {
        self.playing = playing;
        self.shared.set_playing(playing);
    }

    fn surface_error(&mut self, error: &PlayError) {
        let message = error.to_string();
        self.shared.set_error(Some(message.clone()));
        self.bus.publish(PlaybackEvent::Error {
            message,
            retryable: error.is_retryable(),
        });
    }

    /// Teardown order matters: timers first, then signal subscriptions,
    /// then the decoder, then caches. A late decoder signal lands in a
    /// closed channel instead of mutating a dead session.
    async fn teardown(mut self) {
        self.pending_switch = None;
        self.watchdog.reset();
        drop(self.decoder_rx);
        self.decoder.release().await;
        self.cache.lock().clear();
        debug!("session task torn down");
    }
}

fn or_far(deadline: Option<Instant>) -> Instant {
    deadline.unwrap_or_else(|| Instant::now() + FAR_FUTURE)
}

async fn next_decoder_event(
    rx: &mut broadcast::Receiver<DecoderEvent>,
) -> Option<DecoderEvent> {
    loop {
        match rx.recv().await {
            Ok(event) => return Some(event),
            Err(broadcast::error::RecvError::Lagged(skipped)) => {
                warn!(skipped, "decoder signal stream lagged");
            }
            Err(broadcast::error::RecvError::Closed) => return None,
        }
    }
}

/// Load attempt body: resolve (or adopt the preloaded result), open, wait
/// for readiness, seek to the initial position.
#[allow(clippy::too_many_arguments)]
async fn run_load<D, R, P>(
    decoder: Arc<D>,
    resolver: Arc<R>,
    prefs: Arc<P>,
    ceiling: Option<u32>,
    open_timeout: Duration,
    resource: ResourceId,
    initial_position: Duration,
    preloaded: Option<Arc<PreloadedMedia>>,
    autoplay: bool,
    stamp: EpochStamp,
) -> Option<LoadOutcome>
where
    D: Decoder,
    R: Resolver,
    P: Preferences,
{
    let mut prefetched = Vec::new();
    let resolved = match preloaded {
        Some(preloaded) => {
            // Adopt the orchestrator's work; its prefetches travel with the
            // outcome and enter the cache only if this load commits.
            prefetched = preloaded.prefetched.clone();
            ResolvedMedia {
                qualities: preloaded.qualities.clone(),
                quality: preloaded.quality.clone(),
                media: preloaded.media.clone(),
            }
        }
        None => match resolve_playable(resolver.as_ref(), prefs.as_ref(), ceiling, &resource).await
        {
            Ok(resolved) => resolved,
            Err(error) => {
                if stamp.is_stale() {
                    return None;
                }
                return Some(LoadOutcome::Failed { error });
            }
        },
    };
    if stamp.is_stale() {
        return None;
    }

    if let Err(error) = decoder.open(&resolved.media, autoplay).await {
        if stamp.is_stale() {
            return None;
        }
        return Some(LoadOutcome::Failed { error });
    }
    if stamp.is_stale() {
        return None;
    }

    let duration = match wait_until_ready(decoder.as_ref(), open_timeout).await {
        Ok(duration) => duration,
        Err(error) => {
            if stamp.is_stale() {
                return None;
            }
            return Some(LoadOutcome::Failed { error });
        }
    };
    if stamp.is_stale() {
        return None;
    }

    if !initial_position.is_zero() {
        if let Err(error) = decoder.seek(initial_position).await {
            if stamp.is_stale() {
                return None;
            }
            return Some(LoadOutcome::Failed { error });
        }
        if stamp.is_stale() {
            return None;
        }
    }

    Some(LoadOutcome::Opened {
        qualities: resolved.qualities,
        quality: resolved.quality,
        media: resolved.media,
        duration,
        autoplay,
        prefetched,
    })
}

/// Seek attempt body: issue, settle, verify.
async fn run_seek<D: Decoder>(
    decoder: Arc<D>,
    target: Duration,
    settle_wait: Duration,
    tolerance: Duration,
    stamp: EpochStamp,
) -> Option<SeekOutcome> {
    if let Err(err) = decoder.seek(target).await {
        if stamp.is_stale() {
            return None;
        }
        return Some(SeekOutcome::Failed {
            error: PlayError::SeekFailed {
                position: target,
                reason: err.to_string(),
            },
        });
    }
    if stamp.is_stale() {
        return None;
    }

    sleep(settle_wait).await;
    if stamp.is_stale() {
        return None;
    }

    let actual = decoder.position();
    if position_delta(actual, target) <= tolerance {
        Some(SeekOutcome::Settled)
    } else {
        Some(SeekOutcome::Mismatch { target, actual })
    }
}
