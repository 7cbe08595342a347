/// Quality-switch event for UI observers.
#[derive(Clone, Debug)]
#[non_exhaustive]
pub enum QualityEvent {
    /// A switch (or initial load) committed and this label is now active.
    Applied {
        previous: Option<String>,
        quality: String,
    },
    /// A requested switch failed; the previous quality stays active.
    SwitchFailed { quality: String, error: String },
    /// An adjacent quality's media reference was prefetched into the cache.
    Prefetched { quality: String },
}
