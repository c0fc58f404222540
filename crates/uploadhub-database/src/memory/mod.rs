//! Process-local implementations for single-node deployments and tests.

pub mod scope;
pub mod upload_session;

pub use scope::MemoryScopeDirectory;
pub use upload_session::MemoryUploadSessionStore;
