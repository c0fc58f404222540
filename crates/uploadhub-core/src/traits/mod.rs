//! Core traits defined in `uploadhub-core` and implemented by other crates.

pub mod access;
pub mod blob_store;

pub use access::{AccessControl, ScopeLiveness};
pub use blob_store::BlobStore;
