//! Accepted chunk index entries.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use sqlx::FromRow;
use uploadhub_core::types::UploadSessionId;

/// One accepted chunk of a session, keyed by `(session_id, chunk_index)`.
#[derive(Debug, Clone, Serialize, Deserialize, FromRow)]
pub struct UploadChunk {
    /// Owning session.
    pub session_id: UploadSessionId,
    /// Zero-based index.
    pub chunk_index: i32,
    /// Stored byte length.
    pub chunk_size_bytes: i32,
    /// When the latest payload for this index was accepted.
    pub created_at: DateTime<Utc>,
}
