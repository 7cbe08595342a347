use std::sync::Arc;
use std::sync::atomic::{AtomicU64, Ordering};

/// Monotonic counter that invalidates stale asynchronous continuations.
///
/// Any operation that supersedes in-flight work (a new load, a quality
/// switch, a recovery reload) bumps the counter and carries the resulting
/// [`EpochStamp`]. In-flight tasks re-check their stamp after every
/// suspension point and bail out silently once it goes stale; there is no
/// forceful cancellation of network or decoder calls.
#[derive(Clone, Debug, Default)]
pub(crate) struct Epoch {
    counter: Arc<AtomicU64>,
}

impl Epoch {
    pub(crate) fn new() -> Self {
        Self::default()
    }

    pub(crate) fn current(&self) -> u64 {
        self.counter.load(Ordering::SeqCst)
    }

    /// Increment the counter and return a stamp at the new value.
    pub(crate) fn bump(&self) -> EpochStamp {
        let value = self.counter.fetch_add(1, Ordering::SeqCst) + 1;
        EpochStamp {
            counter: Arc::clone(&self.counter),
            value,
        }
    }

    /// Stamp at the current value, without invalidating anything.
    pub(crate) fn stamp(&self) -> EpochStamp {
        EpochStamp {
            counter: Arc::clone(&self.counter),
            value: self.current(),
        }
    }
}

/// A captured epoch value that can be compared against the live counter.
#[derive(Clone, Debug)]
pub(crate) struct EpochStamp {
    counter: Arc<AtomicU64>,
    value: u64,
}

impl EpochStamp {
    pub(crate) fn value(&self) -> u64 {
        self.value
    }

    pub(crate) fn is_current(&self) -> bool {
        self.counter.load(Ordering::SeqCst) == self.value
    }

    pub(crate) fn is_stale(&self) -> bool {
        !self.is_current()
    }
}
