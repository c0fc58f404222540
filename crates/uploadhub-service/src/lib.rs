//! # uploadhub-service
//!
//! Business logic for resumable chunked uploads. The
//! [`UploadSessionService`] owns every state transition and orchestrates
//! the session store, the chunk store, quota checks, assembly and the
//! external blob store.
//!
//! Services follow constructor injection: all dependencies are provided
//! at construction time via `Arc` references.

pub mod bootstrap;
pub mod context;
pub mod upload;

pub use bootstrap::UploadStack;
pub use context::RequestContext;
pub use upload::{
    CreateUploadSession, ExpiryOutcome, MetricsSnapshot, QuotaEnforcer, UploadMetrics,
    UploadSessionService, UploadSessionView,
};
