//! # uploadhub-api
//!
//! HTTP API layer for UploadHub built on Axum.
//!
//! Provides the upload session endpoints, health and metrics routes,
//! middleware (CORS, request logging, timeouts), the actor extractor,
//! DTOs, and error mapping.

pub mod app;
pub mod dto;
pub mod error;
pub mod extractors;
pub mod handlers;
pub mod middleware;
pub mod router;
pub mod state;

pub use app::build_app;
pub use error::ApiError;
pub use state::AppState;
