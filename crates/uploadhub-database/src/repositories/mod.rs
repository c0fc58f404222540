//! PostgreSQL-backed implementations.

pub mod scope;
pub mod upload_session;

pub use scope::PgScopeDirectory;
pub use upload_session::PgUploadSessionRepository;
