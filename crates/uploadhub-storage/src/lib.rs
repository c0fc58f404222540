//! # uploadhub-storage
//!
//! On-disk side of resumable uploads: per-session chunk directories, the
//! assembler that stitches chunks back together, and the local
//! [`BlobStore`](uploadhub_core::traits::BlobStore) that validates and
//! places finished files.

pub mod blob;
pub mod chunked;

pub use blob::LocalBlobStore;
pub use chunked::{AssembledFile, ChunkAssembler, ChunkStore};
