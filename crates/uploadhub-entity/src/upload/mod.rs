//! Resumable upload domain entities.

pub mod chunk;
pub mod geometry;
pub mod model;
pub mod status;

pub use chunk::UploadChunk;
pub use geometry::ChunkGeometry;
pub use model::{NewUploadSession, UploadSession};
pub use status::UploadStatus;
