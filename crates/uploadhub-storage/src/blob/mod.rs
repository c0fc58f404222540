//! Final placement of assembled uploads.

pub mod local;
pub mod media;

pub use local::LocalBlobStore;
pub use media::MediaKind;
