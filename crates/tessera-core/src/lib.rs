#![forbid(unsafe_code)]

mod errors;
mod media_ref;
mod quality;
mod resource_id;

pub use errors::{CoreError, CoreResult};
pub use media_ref::MediaReference;
pub use quality::Quality;
pub use resource_id::ResourceId;
