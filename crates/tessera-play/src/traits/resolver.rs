use async_trait::async_trait;

use tessera_core::{MediaReference, Quality, ResourceId};

use crate::error::PlayResult;

/// The streaming-resource resolver collaborator.
///
/// Owns playlist transport and format parsing; the engine only sees quality
/// labels and playable references.
#[async_trait]
pub trait Resolver: Send + Sync + 'static {
    /// List the renditions available for a piece of content.
    async fn list_qualities(&self, resource: &ResourceId) -> PlayResult<Vec<Quality>>;

    /// Resolve the playable reference for one rendition.
    async fn resolve(&self, resource: &ResourceId, quality: &Quality)
        -> PlayResult<MediaReference>;
}
