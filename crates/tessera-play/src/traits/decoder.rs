use std::time::Duration;

use async_trait::async_trait;
use tokio::sync::broadcast;
use tokio::time::Instant;

use tessera_core::MediaReference;
use tessera_events::DecoderEvent;

use crate::error::{PlayError, PlayResult};

/// The decode/render engine collaborator.
///
/// A black box with its own worker threads. Operations that the engine must
/// wait on (open, seek, release) are async and may be arbitrarily slow;
/// transport toggles are fire-and-forget. State reads reflect whatever the
/// decoder currently believes, which during reconfiguration may lag or
/// momentarily report zero; the engine filters accordingly.
#[async_trait]
pub trait Decoder: Send + Sync + 'static {
    /// Open a media reference, replacing whatever was open before.
    async fn open(&self, media: &MediaReference, autoplay: bool) -> PlayResult<()>;

    fn play(&self);

    fn pause(&self);

    /// Request a seek. Completion means the decoder accepted the seek, not
    /// that the position has settled.
    async fn seek(&self, position: Duration) -> PlayResult<()>;

    fn set_rate(&self, rate: f32);

    fn position(&self) -> Duration;

    /// Known once the opened media reported its metadata.
    fn duration(&self) -> Option<Duration>;

    fn is_buffering(&self) -> bool;

    /// Subscribe to the decoder's asynchronous signal stream.
    fn subscribe(&self) -> broadcast::Receiver<DecoderEvent>;

    /// Release the underlying media pipeline. Terminal.
    async fn release(&self);
}

/// Wait until an opened media reference is ready to drive.
///
/// "Duration known" is the readiness proxy; a decoder that never reports one
/// within `timeout` counts as a failed open.
pub(crate) async fn wait_until_ready<D: Decoder + ?Sized>(
    decoder: &D,
    timeout: Duration,
) -> PlayResult<Duration> {
    let mut signals = decoder.subscribe();
    let deadline = Instant::now() + timeout;
    loop {
        if let Some(duration) = decoder.duration() {
            return Ok(duration);
        }
        match tokio::time::timeout_at(deadline, signals.recv()).await {
            Ok(Ok(DecoderEvent::DurationKnown { duration })) => return Ok(duration),
            Ok(Ok(DecoderEvent::Failed { error })) => {
                return Err(PlayError::Decoder { reason: error });
            }
            Ok(Ok(_)) => {}
            Ok(Err(broadcast::error::RecvError::Lagged(_))) => {}
            Ok(Err(broadcast::error::RecvError::Closed)) => {
                return Err(PlayError::Decoder {
                    reason: "signal stream closed".into(),
                });
            }
            Err(_) => return Err(PlayError::OpenTimeout { timeout }),
        }
    }
}
