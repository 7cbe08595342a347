use tracing::debug;

use tessera_core::{MediaReference, Quality, ResourceId};

use crate::error::{PlayError, PlayResult};
use crate::traits::prefs::Preferences;
use crate::traits::resolver::Resolver;

/// Everything needed to open a resource: the full (descending) quality
/// ladder, the rendition picked for it, and that rendition's reference.
#[derive(Clone, Debug)]
pub(crate) struct ResolvedMedia {
    pub(crate) qualities: Vec<Quality>,
    pub(crate) quality: Quality,
    pub(crate) media: MediaReference,
}

/// Pick the rendition to start with.
///
/// The stored preference wins when the ladder still offers it; otherwise the
/// largest rendition not exceeding the ceiling; otherwise the smallest one.
/// `qualities` must be sorted descending.
pub(crate) fn select_quality<'a>(
    qualities: &'a [Quality],
    preferred: Option<&str>,
    ceiling: Option<u32>,
) -> Option<&'a Quality> {
    if let Some(label) = preferred {
        if let Some(quality) = qualities.iter().find(|q| q.label() == label) {
            return Some(quality);
        }
    }
    match ceiling {
        Some(ceiling) => qualities
            .iter()
            .find(|q| q.height() <= ceiling)
            .or_else(|| qualities.last()),
        None => qualities.first(),
    }
}

/// Resolve a resource end to end: ladder, rendition, media reference.
pub(crate) async fn resolve_playable<R, P>(
    resolver: &R,
    prefs: &P,
    ceiling: Option<u32>,
    resource: &ResourceId,
) -> PlayResult<ResolvedMedia>
where
    R: Resolver + ?Sized,
    P: Preferences + ?Sized,
{
    let mut qualities = resolver.list_qualities(resource).await?;
    qualities.sort_unstable_by(|a, b| b.cmp(a));
    if qualities.is_empty() {
        return Err(PlayError::NoQualities {
            resource: resource.clone(),
        });
    }

    let preferred = prefs.preferred_quality();
    let quality = select_quality(&qualities, preferred.as_deref(), ceiling)
        .cloned()
        .expect("non-empty ladder always selects");
    debug!(%resource, quality = quality.label(), preferred = ?preferred, "rendition selected");

    let media = resolver.resolve(resource, &quality).await?;
    Ok(ResolvedMedia {
        qualities,
        quality,
        media,
    })
}
