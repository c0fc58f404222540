//! Application state shared across all handlers and middleware.

use std::sync::Arc;

use uploadhub_core::config::AppConfig;
use uploadhub_database::UploadSessionStore;
use uploadhub_service::{UploadMetrics, UploadSessionService};

/// Application state containing all shared dependencies.
///
/// Passed to every Axum handler via `State<AppState>`.
/// All fields are `Arc`-wrapped for cheap cloning across tasks.
#[derive(Clone)]
pub struct AppState {
    /// Application configuration
    pub config: Arc<AppConfig>,
    /// Session store, for health checks
    pub session_store: Arc<dyn UploadSessionStore>,
    /// Upload session lifecycle
    pub upload_service: Arc<UploadSessionService>,
    /// Upload counters
    pub metrics: Arc<UploadMetrics>,
}

impl std::fmt::Debug for AppState {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("AppState")
            .field("session_store", &self.session_store.store_type())
            .field("upload_service", &self.upload_service)
            .finish()
    }
}
