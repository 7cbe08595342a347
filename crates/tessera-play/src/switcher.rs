use std::sync::Arc;
use std::time::Duration;

use tokio::time::{Instant, sleep};
use tracing::debug;

use tessera_core::{MediaReference, Quality, ResourceId};

use crate::cache::SharedQualityCache;
use crate::config::PlayerConfig;
use crate::epoch::EpochStamp;
use crate::error::PlayError;
use crate::traits::decoder::{Decoder, wait_until_ready};
use crate::traits::resolver::Resolver;

/// A quality-change request sitting out its debounce window.
///
/// Replacing this field is how rapid repeated requests collapse: the old
/// request's stamp goes stale the moment a newer one bumps the epoch, so
/// even a timer that already fired commits nothing.
#[derive(Debug)]
pub(crate) struct PendingSwitch {
    pub(crate) quality: Quality,
    pub(crate) stamp: EpochStamp,
    pub(crate) deadline: Instant,
}

#[derive(Debug)]
pub(crate) enum SwitchOutcome {
    /// The new rendition is open, ready, and settled at the anchor.
    Committed {
        quality: Quality,
        media: MediaReference,
        duration: Duration,
        anchor: Duration,
    },
    /// Opened and seeked, but the position did not settle near the anchor.
    SettleMismatch { quality: Quality, actual: Duration },
    Failed { quality: Quality, error: PlayError },
}

/// One debounced switch execution, run as a spawned task.
///
/// Every await is followed by a staleness check; a superseded attempt
/// returns `None` and the session hears nothing from it.
pub(crate) struct SwitchAttempt<D, R> {
    pub(crate) decoder: Arc<D>,
    pub(crate) resolver: Arc<R>,
    pub(crate) cache: SharedQualityCache,
    pub(crate) resource: ResourceId,
    pub(crate) quality: Quality,
    /// Position captured when the switch launched, not a later tick.
    pub(crate) anchor: Duration,
    pub(crate) config: PlayerConfig,
    pub(crate) stamp: EpochStamp,
}

impl<D, R> SwitchAttempt<D, R>
where
    D: Decoder,
    R: Resolver,
{
    pub(crate) async fn run(self) -> Option<SwitchOutcome> {
        let quality = self.quality.clone();
        match self.execute().await {
            Ok(Some(outcome)) => Some(outcome),
            Ok(None) => {
                debug!(quality = quality.label(), "switch attempt superseded");
                None
            }
            Err(error) => Some(SwitchOutcome::Failed { quality, error }),
        }
    }

    async fn execute(&self) -> Result<Option<SwitchOutcome>, PlayError> {
        self.decoder.pause();

        let cached = self.cache.lock().get(self.quality.label());
        let media = match cached {
            Some(media) => {
                debug!(quality = self.quality.label(), "switch using prefetched reference");
                media
            }
            None => {
                let media = self.resolver.resolve(&self.resource, &self.quality).await?;
                if self.stamp.is_stale() {
                    return Ok(None);
                }
                media
            }
        };

        self.decoder.open(&media, false).await?;
        if self.stamp.is_stale() {
            return Ok(None);
        }

        let duration = wait_until_ready(self.decoder.as_ref(), self.config.open_timeout).await?;
        if self.stamp.is_stale() {
            return Ok(None);
        }

        self.decoder.seek(self.anchor).await.map_err(|err| {
            PlayError::SeekFailed {
                position: self.anchor,
                reason: err.to_string(),
            }
        })?;
        if self.stamp.is_stale() {
            return Ok(None);
        }

        sleep(self.config.seek_settle_wait).await;
        if self.stamp.is_stale() {
            return Ok(None);
        }

        let actual = self.decoder.position();
        if position_delta(actual, self.anchor) > self.config.seek_tolerance {
            return Ok(Some(SwitchOutcome::SettleMismatch {
                quality: self.quality.clone(),
                actual,
            }));
        }

        Ok(Some(SwitchOutcome::Committed {
            quality: self.quality.clone(),
            media,
            duration,
            anchor: self.anchor,
        }))
    }
}

/// Absolute distance between two positions.
pub(crate) fn position_delta(a: Duration, b: Duration) -> Duration {
    if a >= b { a - b } else { b - a }
}
