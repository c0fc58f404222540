//! # uploadhub-database
//!
//! Durable upload session records. The [`UploadSessionStore`] trait is the
//! seam; [`PgUploadSessionRepository`] backs it with PostgreSQL for
//! multi-instance deployments and [`MemoryUploadSessionStore`] with a
//! process-local map for single-node runs and tests.

pub mod connection;
pub mod memory;
pub mod migration;
pub mod repositories;
pub mod store;

pub use connection::DatabasePool;
pub use memory::{MemoryScopeDirectory, MemoryUploadSessionStore};
pub use repositories::{PgScopeDirectory, PgUploadSessionRepository};
pub use store::UploadSessionStore;
