use std::collections::HashMap;
use std::sync::Arc;

use parking_lot::Mutex;

use tessera_core::{MediaReference, Quality};

/// Advisory cache of resolved media references, label-keyed.
///
/// Holds at most the qualities adjacent to the current one; anything else is
/// dropped on [`retain_adjacent`]. Losing an entry only costs a re-resolve,
/// so prefetch tasks insert without coordination.
///
/// [`retain_adjacent`]: QualityCache::retain_adjacent
#[derive(Debug, Default)]
pub(crate) struct QualityCache {
    entries: HashMap<String, MediaReference>,
}

pub(crate) type SharedQualityCache = Arc<Mutex<QualityCache>>;

impl QualityCache {
    pub(crate) fn insert(&mut self, label: impl Into<String>, media: MediaReference) {
        self.entries.insert(label.into(), media);
    }

    pub(crate) fn get(&self, label: &str) -> Option<MediaReference> {
        self.entries.get(label).cloned()
    }

    pub(crate) fn len(&self) -> usize {
        self.entries.len()
    }

    pub(crate) fn clear(&mut self) {
        self.entries.clear();
    }

    /// Drop everything but the current quality and its direct neighbours in
    /// the (descending) quality list.
    pub(crate) fn retain_adjacent(&mut self, qualities: &[Quality], current: &Quality) {
        let keep: Vec<&str> = neighbourhood(qualities, current)
            .into_iter()
            .map(Quality::label)
            .collect();
        self.entries.retain(|label, _| keep.contains(&label.as_str()));
    }
}

/// The current quality plus its direct neighbours, in list order.
pub(crate) fn neighbourhood<'a>(qualities: &'a [Quality], current: &Quality) -> Vec<&'a Quality> {
    let Some(at) = qualities.iter().position(|q| q == current) else {
        return Vec::new();
    };
    let from = at.saturating_sub(1);
    let to = (at + 1).min(qualities.len().saturating_sub(1));
    qualities[from..=to].iter().collect()
}

/// The direct neighbours of the current quality, prefetch candidates.
pub(crate) fn adjacent<'a>(qualities: &'a [Quality], current: &Quality) -> Vec<&'a Quality> {
    neighbourhood(qualities, current)
        .into_iter()
        .filter(|q| *q != current)
        .collect()
}
