//! Client-facing snapshot of a session.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

use uploadhub_core::types::{ScopeId, UploadSessionId};
use uploadhub_entity::upload::{UploadSession, UploadStatus};

/// What a client needs to resume or verify an upload.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct UploadSessionView {
    /// Session id.
    pub session_id: UploadSessionId,
    /// Owning scope.
    pub scope_id: ScopeId,
    /// Client-supplied file name.
    pub original_file_name: Option<String>,
    /// Normalized declared content type.
    pub content_type: String,
    /// Declared total size.
    pub total_size_bytes: i64,
    /// Chunk size.
    pub chunk_size_bytes: i32,
    /// Number of chunks.
    pub total_chunks: i32,
    /// Accepted chunk indexes, ascending. Once completed, the full range.
    pub uploaded_chunks: Vec<i32>,
    /// Lifecycle state.
    pub status: UploadStatus,
    /// Stored file reference, set on completion.
    pub file_reference: Option<String>,
    /// Current deadline.
    pub expires_at: DateTime<Utc>,
    /// Completion time.
    pub completed_at: Option<DateTime<Utc>>,
}

impl UploadSessionView {
    /// Build a view. For completed sessions `uploaded_chunks` is ignored and
    /// replaced by `0..total_chunks`, since the index is gone by then.
    pub fn new(session: &UploadSession, uploaded_chunks: Vec<i32>) -> Self {
        let uploaded_chunks = if session.status == UploadStatus::Completed {
            (0..session.total_chunks).collect()
        } else {
            uploaded_chunks
        };
        Self {
            session_id: session.id,
            scope_id: session.scope_id,
            original_file_name: session.original_file_name.clone(),
            content_type: session.content_type.clone(),
            total_size_bytes: session.total_size_bytes,
            chunk_size_bytes: session.chunk_size_bytes,
            total_chunks: session.total_chunks,
            uploaded_chunks,
            status: session.status,
            file_reference: session.file_reference.clone(),
            expires_at: session.expires_at,
            completed_at: session.completed_at,
        }
    }
}
