//! Resumable upload services.

pub mod metrics;
pub mod quota;
pub mod service;
pub mod view;

pub use metrics::{MetricsSnapshot, UploadMetrics};
pub use quota::QuotaEnforcer;
pub use service::{CreateUploadSession, ExpiryOutcome, UploadSessionService};
pub use view::UploadSessionView;
