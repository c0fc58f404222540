//! Upload session entity.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use sqlx::FromRow;
use uploadhub_core::types::{ActorId, ScopeId, UploadSessionId};

use super::geometry::ChunkGeometry;
use super::status::UploadStatus;

/// A resumable upload attempt. Rows are never deleted; terminal sessions
/// stay as an audit trail after their chunk data is reclaimed.
#[derive(Debug, Clone, Serialize, Deserialize, FromRow)]
pub struct UploadSession {
    /// Unique session identifier.
    pub id: UploadSessionId,
    /// Scope (workspace) that owns the upload and its quota.
    pub scope_id: ScopeId,
    /// Actor that opened the session.
    pub actor_id: ActorId,
    /// Client-supplied file name. Advisory only.
    pub original_file_name: Option<String>,
    /// Normalized declared content type.
    pub content_type: String,
    /// Declared total size in bytes.
    pub total_size_bytes: i64,
    /// Size of every chunk but the last.
    pub chunk_size_bytes: i32,
    /// Chunk count fixed at creation.
    pub total_chunks: i32,
    /// Current lifecycle state.
    pub status: UploadStatus,
    /// Public reference returned by the blob store on completion.
    pub file_reference: Option<String>,
    /// When the session was opened.
    pub created_at: DateTime<Utc>,
    /// Last metadata change.
    pub updated_at: DateTime<Utc>,
    /// Sliding deadline, extended by every accepted chunk.
    pub expires_at: DateTime<Utc>,
    /// When the session completed.
    pub completed_at: Option<DateTime<Utc>>,
}

impl UploadSession {
    /// Chunk layout as recorded at creation.
    pub fn geometry(&self) -> ChunkGeometry {
        ChunkGeometry::from_stored(self.total_size_bytes, self.chunk_size_bytes, self.total_chunks)
    }

    /// Whether the session is active but past its deadline at `now`.
    pub fn is_overdue(&self, now: DateTime<Utc>) -> bool {
        self.status == UploadStatus::Active && self.expires_at < now
    }
}

/// Data required to open a session.
#[derive(Debug, Clone)]
pub struct NewUploadSession {
    /// Pre-generated identifier.
    pub id: UploadSessionId,
    /// Owning scope.
    pub scope_id: ScopeId,
    /// Owning actor.
    pub actor_id: ActorId,
    /// Client-supplied file name.
    pub original_file_name: Option<String>,
    /// Normalized content type.
    pub content_type: String,
    /// Chunk layout.
    pub geometry: ChunkGeometry,
    /// Creation time.
    pub created_at: DateTime<Utc>,
    /// Initial deadline.
    pub expires_at: DateTime<Utc>,
}

impl NewUploadSession {
    /// The row this insert produces: active, no reference, no completion time.
    pub fn into_session(self) -> UploadSession {
        UploadSession {
            id: self.id,
            scope_id: self.scope_id,
            actor_id: self.actor_id,
            original_file_name: self.original_file_name,
            content_type: self.content_type,
            total_size_bytes: self.geometry.total_size,
            chunk_size_bytes: self.geometry.chunk_size,
            total_chunks: self.geometry.total_chunks,
            status: UploadStatus::Active,
            file_reference: None,
            created_at: self.created_at,
            updated_at: self.created_at,
            expires_at: self.expires_at,
            completed_at: None,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::Duration;

    fn sample() -> UploadSession {
        let now = Utc::now();
        NewUploadSession {
            id: UploadSessionId::new(),
            scope_id: ScopeId::new(),
            actor_id: ActorId::new(),
            original_file_name: Some("clip.mp4".to_string()),
            content_type: "video/mp4".to_string(),
            geometry: ChunkGeometry::new(10, 4).unwrap(),
            created_at: now,
            expires_at: now + Duration::hours(48),
        }
        .into_session()
    }

    #[test]
    fn test_new_session_is_active() {
        let session = sample();
        assert_eq!(session.status, UploadStatus::Active);
        assert_eq!(session.total_chunks, 3);
        assert!(session.file_reference.is_none());
        assert_eq!(session.geometry().expected_chunk_size(2), Some(2));
    }

    #[test]
    fn test_overdue_only_when_active_and_past_deadline() {
        let mut session = sample();
        let later = session.expires_at + Duration::seconds(1);
        assert!(!session.is_overdue(session.expires_at));
        assert!(session.is_overdue(later));
        session.status = UploadStatus::Cancelled;
        assert!(!session.is_overdue(later));
    }

    #[test]
    fn test_status_serializes_lowercase() {
        let json = serde_json::to_value(sample()).unwrap();
        assert_eq!(json["status"], "active");
    }
}
