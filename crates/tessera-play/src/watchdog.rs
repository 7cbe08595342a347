use std::sync::Arc;
use std::time::Duration;

use tokio::time::{Instant, sleep};
use tracing::{debug, warn};

use tessera_core::{Quality, ResourceId};
use tessera_events::{EventBus, RecoveryEvent, RecoveryTier};

use crate::config::PlayerConfig;
use crate::epoch::EpochStamp;
use crate::error::PlayError;
use crate::traits::decoder::{Decoder, wait_until_ready};
use crate::traits::resolver::Resolver;

/// How often the nudge grace period re-checks whether buffering cleared.
const GRACE_POLL_INTERVAL: Duration = Duration::from_millis(250);

/// Healthy → Buffering → Stalled bookkeeping.
///
/// Armed on a buffering-start signal, disarmed by buffering-end or by the
/// deadline firing. `stall_count` survives across episodes until a recovery
/// succeeds, which is what escalates a repeat stall straight to reload.
/// Recovery itself is single-flight, keyed by the epoch of the attempt so a
/// stale attempt's completion cannot clear a newer attempt's slot.
#[derive(Debug, Default)]
pub(crate) struct StallWatchdog {
    deadline: Option<Instant>,
    stall_count: u32,
    recovering: Option<u64>,
}

impl StallWatchdog {
    pub(crate) fn new() -> Self {
        Self::default()
    }

    pub(crate) fn deadline(&self) -> Option<Instant> {
        self.deadline
    }

    pub(crate) fn stall_count(&self) -> u32 {
        self.stall_count
    }

    pub(crate) fn is_recovering(&self) -> bool {
        self.recovering.is_some()
    }

    /// Arm the stall deadline. An already-armed watchdog keeps its original
    /// deadline, so a flapping buffering signal cannot postpone the stall.
    pub(crate) fn arm(&mut self, deadline: Instant) {
        if self.deadline.is_none() && self.recovering.is_none() {
            self.deadline = Some(deadline);
        }
    }

    pub(crate) fn disarm(&mut self) {
        self.deadline = None;
    }

    /// Buffering cleared on its own: back to Healthy.
    pub(crate) fn on_buffering_cleared(&mut self) {
        self.deadline = None;
        if self.recovering.is_none() {
            self.stall_count = 0;
        }
    }

    /// The deadline fired: this is now a stall episode.
    pub(crate) fn declare_stall(&mut self) -> u32 {
        self.deadline = None;
        self.stall_count += 1;
        self.stall_count
    }

    /// Claim the single recovery slot for the attempt with this epoch.
    pub(crate) fn begin_recovery(&mut self, epoch: u64) -> bool {
        if self.recovering.is_some() {
            return false;
        }
        self.recovering = Some(epoch);
        true
    }

    /// Release the recovery slot, but only for the attempt that holds it.
    pub(crate) fn recovery_finished(&mut self, epoch: u64, success: bool) {
        if self.recovering == Some(epoch) {
            self.recovering = None;
            if success {
                self.stall_count = 0;
            }
        }
    }

    pub(crate) fn reset(&mut self) {
        *self = Self::default();
    }
}

#[derive(Debug)]
pub(crate) enum RecoveryOutcome {
    Recovered { tier: RecoveryTier },
    Failed { error: PlayError },
}

/// One tiered recovery execution, run as a spawned task.
///
/// Tier 1 (first stall only) nudges forward on the existing decoder and
/// waits out a grace period; any failure or timeout escalates to a full
/// reload of the current rendition. Supersession works exactly as for
/// switches: stale attempts return `None`.
pub(crate) struct RecoveryAttempt<D, R> {
    pub(crate) decoder: Arc<D>,
    pub(crate) resolver: Arc<R>,
    pub(crate) resource: ResourceId,
    pub(crate) quality: Quality,
    /// Where playback should land afterwards (nudge offset already applied
    /// by the session).
    pub(crate) intended: Duration,
    pub(crate) resume: bool,
    pub(crate) start_tier: RecoveryTier,
    pub(crate) attempt: u32,
    pub(crate) config: PlayerConfig,
    pub(crate) stamp: EpochStamp,
    pub(crate) bus: EventBus,
}

impl<D, R> RecoveryAttempt<D, R>
where
    D: Decoder,
    R: Resolver,
{
    pub(crate) async fn run(self) -> Option<RecoveryOutcome> {
        if self.start_tier == RecoveryTier::Nudge {
            match self.nudge().await {
                Some(true) => return Some(RecoveryOutcome::Recovered {
                    tier: RecoveryTier::Nudge,
                }),
                Some(false) => {}
                None => return None,
            }
        }

        self.bus.publish(RecoveryEvent::Attempt {
            tier: RecoveryTier::Reload,
            attempt: self.attempt,
        });
        match self.reload().await {
            Ok(Some(())) => Some(RecoveryOutcome::Recovered {
                tier: RecoveryTier::Reload,
            }),
            Ok(None) => {
                debug!("recovery attempt superseded");
                None
            }
            Err(error) => Some(RecoveryOutcome::Failed {
                error: PlayError::RecoveryFailed {
                    reason: error.to_string(),
                },
            }),
        }
    }

    /// Skip a possibly-corrupt segment. `Some(true)` means buffering
    /// cleared within the grace period.
    async fn nudge(&self) -> Option<bool> {
        self.bus.publish(RecoveryEvent::Attempt {
            tier: RecoveryTier::Nudge,
            attempt: self.attempt,
        });

        if let Err(err) = self.decoder.seek(self.intended).await {
            warn!(%err, "nudge seek failed, escalating to reload");
            return if self.stamp.is_stale() { None } else { Some(false) };
        }
        if self.stamp.is_stale() {
            return None;
        }

        let grace_deadline = Instant::now() + self.config.nudge_grace;
        loop {
            if !self.decoder.is_buffering() {
                return Some(true);
            }
            if Instant::now() >= grace_deadline {
                return Some(false);
            }
            sleep(GRACE_POLL_INTERVAL).await;
            if self.stamp.is_stale() {
                return None;
            }
        }
    }

    async fn reload(&self) -> Result<Option<()>, PlayError> {
        let media = self.resolver.resolve(&self.resource, &self.quality).await?;
        if self.stamp.is_stale() {
            return Ok(None);
        }

        self.decoder.open(&media, false).await?;
        if self.stamp.is_stale() {
            return Ok(None);
        }

        wait_until_ready(self.decoder.as_ref(), self.config.open_timeout).await?;
        if self.stamp.is_stale() {
            return Ok(None);
        }

        if !self.intended.is_zero() {
            self.decoder.seek(self.intended).await?;
            if self.stamp.is_stale() {
                return Ok(None);
            }
        }

        if self.resume {
            self.decoder.play();
        }
        Ok(Some(()))
    }
}
