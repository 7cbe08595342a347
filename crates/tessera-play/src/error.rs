use std::time::Duration;

use tessera_core::ResourceId;

/// Engine error. `Clone` because errors travel through broadcast events and
/// preload handoffs that re-serve a cached result to several waiters.
#[derive(Clone, Debug, thiserror::Error)]
#[non_exhaustive]
pub enum PlayError {
    #[error("no playable qualities for {resource}")]
    NoQualities { resource: ResourceId },

    #[error("failed to resolve media reference for {quality}: {reason}")]
    ResolveFailed { quality: String, reason: String },

    #[error("decode engine did not become ready within {timeout:?}")]
    OpenTimeout { timeout: Duration },

    #[error("decode engine error: {reason}")]
    Decoder { reason: String },

    #[error("seek to {position:?} failed: {reason}")]
    SeekFailed { position: Duration, reason: String },

    #[error("seek settled at {actual:?}, outside tolerance of target {target:?}")]
    SeekMismatch { target: Duration, actual: Duration },

    #[error("stall recovery failed: {reason}")]
    RecoveryFailed { reason: String },

    #[error("session is shut down")]
    SessionClosed,

    #[error("{0}")]
    Internal(String),
}

impl PlayError {
    /// Whether the user can meaningfully retry the action that failed.
    #[must_use]
    pub fn is_retryable(&self) -> bool {
        !matches!(self, Self::SessionClosed)
    }
}

pub type PlayResult<T> = Result<T, PlayError>;
