//! Chunked upload handling.

pub mod assembler;
pub mod store;

pub use assembler::{AssembledFile, ChunkAssembler};
pub use store::ChunkStore;
