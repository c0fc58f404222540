//! Convenience result type alias for UploadHub.

use crate::error::AppError;

/// A specialized `Result` type for UploadHub operations.
pub type AppResult<T> = Result<T, AppError>;
