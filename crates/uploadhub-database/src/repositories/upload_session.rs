//! Upload session repository implementation.

use async_trait::async_trait;
use chrono::{DateTime, Utc};
use sqlx::PgPool;
use uuid::Uuid;

use uploadhub_core::error::{AppError, ErrorKind};
use uploadhub_core::result::AppResult;
use uploadhub_core::types::{ActorId, ScopeId, UploadSessionId};
use uploadhub_entity::upload::{NewUploadSession, UploadSession, UploadStatus};

use crate::store::UploadSessionStore;

/// Repository for upload sessions and their chunk index.
///
/// Status changes are single `UPDATE ... WHERE status = ...` statements, so
/// several server instances sharing the database settle a race on the row
/// lock rather than on any in-process mutex.
#[derive(Debug, Clone)]
pub struct PgUploadSessionRepository {
    pool: PgPool,
}

impl PgUploadSessionRepository {
    /// Create a new upload session repository.
    pub fn new(pool: PgPool) -> Self {
        Self { pool }
    }
}

#[async_trait]
impl UploadSessionStore for PgUploadSessionRepository {
    fn store_type(&self) -> &str {
        "postgres"
    }

    async fn insert(&self, new: NewUploadSession) -> AppResult<UploadSession> {
        sqlx::query_as::<_, UploadSession>(
            "INSERT INTO upload_sessions \
             (id, scope_id, actor_id, original_file_name, content_type, total_size_bytes, \
              chunk_size_bytes, total_chunks, status, created_at, updated_at, expires_at) \
             VALUES ($1, $2, $3, $4, $5, $6, $7, $8, 'active', $9, $9, $10) \
             RETURNING *",
        )
        .bind(new.id)
        .bind(new.scope_id)
        .bind(new.actor_id)
        .bind(&new.original_file_name)
        .bind(&new.content_type)
        .bind(new.geometry.total_size)
        .bind(new.geometry.chunk_size)
        .bind(new.geometry.total_chunks)
        .bind(new.created_at)
        .bind(new.expires_at)
        .fetch_one(&self.pool)
        .await
        .map_err(|e| AppError::with_source(ErrorKind::Database, "Failed to create upload session", e))
    }

    async fn find(&self, id: UploadSessionId) -> AppResult<Option<UploadSession>> {
        sqlx::query_as::<_, UploadSession>("SELECT * FROM upload_sessions WHERE id = $1")
            .bind(id)
            .fetch_optional(&self.pool)
            .await
            .map_err(|e| {
                AppError::with_source(ErrorKind::Database, "Failed to find upload session", e)
            })
    }

    async fn count_active_for_actor(&self, actor_id: ActorId) -> AppResult<u64> {
        let count = sqlx::query_scalar::<_, i64>(
            "SELECT COUNT(*) FROM upload_sessions WHERE actor_id = $1 AND status = 'active'",
        )
        .bind(actor_id)
        .fetch_one(&self.pool)
        .await
        .map_err(|e| {
            AppError::with_source(ErrorKind::Database, "Failed to count active sessions", e)
        })?;
        Ok(count.max(0) as u64)
    }

    async fn sum_active_bytes_for_scope(&self, scope_id: ScopeId) -> AppResult<i64> {
        sqlx::query_scalar::<_, i64>(
            "SELECT COALESCE(SUM(total_size_bytes), 0)::BIGINT FROM upload_sessions \
             WHERE scope_id = $1 AND status = 'active'",
        )
        .bind(scope_id)
        .fetch_one(&self.pool)
        .await
        .map_err(|e| {
            AppError::with_source(ErrorKind::Database, "Failed to sum active upload bytes", e)
        })
    }

    async fn record_chunk(
        &self,
        id: UploadSessionId,
        index: i32,
        size_bytes: i32,
        at: DateTime<Utc>,
        expires_at: DateTime<Utc>,
    ) -> AppResult<bool> {
        let recorded = sqlx::query_scalar::<_, i64>(
            "WITH touched AS ( \
                 UPDATE upload_sessions SET expires_at = $5, updated_at = $4 \
                 WHERE id = $1 AND status = 'active' AND expires_at >= $4 \
                 RETURNING id \
             ), upserted AS ( \
                 INSERT INTO upload_session_chunks (session_id, chunk_index, chunk_size_bytes, created_at) \
                 SELECT id, $2, $3, $4 FROM touched \
                 ON CONFLICT (session_id, chunk_index) DO UPDATE SET \
                    chunk_size_bytes = EXCLUDED.chunk_size_bytes, \
                    created_at = EXCLUDED.created_at \
                 RETURNING session_id \
             ) \
             SELECT COUNT(*) FROM upserted",
        )
        .bind(id)
        .bind(index)
        .bind(size_bytes)
        .bind(at)
        .bind(expires_at)
        .fetch_one(&self.pool)
        .await
        .map_err(|e| AppError::with_source(ErrorKind::Database, "Failed to record chunk", e))?;
        Ok(recorded > 0)
    }

    async fn chunk_indexes(&self, id: UploadSessionId) -> AppResult<Vec<i32>> {
        sqlx::query_scalar::<_, i32>(
            "SELECT chunk_index FROM upload_session_chunks WHERE session_id = $1 \
             ORDER BY chunk_index ASC",
        )
        .bind(id)
        .fetch_all(&self.pool)
        .await
        .map_err(|e| AppError::with_source(ErrorKind::Database, "Failed to list chunk indexes", e))
    }

    async fn count_chunks(&self, id: UploadSessionId) -> AppResult<u64> {
        let count = sqlx::query_scalar::<_, i64>(
            "SELECT COUNT(*) FROM upload_session_chunks WHERE session_id = $1",
        )
        .bind(id)
        .fetch_one(&self.pool)
        .await
        .map_err(|e| AppError::with_source(ErrorKind::Database, "Failed to count chunks", e))?;
        Ok(count.max(0) as u64)
    }

    async fn mark_completed(
        &self,
        id: UploadSessionId,
        file_reference: &str,
        completed_at: DateTime<Utc>,
    ) -> AppResult<bool> {
        let updated = sqlx::query_scalar::<_, i64>(
            "WITH done AS ( \
                 UPDATE upload_sessions SET status = 'completed', file_reference = $2, \
                    completed_at = $3, updated_at = $3 \
                 WHERE id = $1 AND status = 'active' AND expires_at >= $3 \
                 RETURNING id \
             ), purged AS ( \
                 DELETE FROM upload_session_chunks WHERE session_id IN (SELECT id FROM done) \
             ) \
             SELECT COUNT(*) FROM done",
        )
        .bind(id)
        .bind(file_reference)
        .bind(completed_at)
        .fetch_one(&self.pool)
        .await
        .map_err(|e| {
            AppError::with_source(ErrorKind::Database, "Failed to complete upload session", e)
        })?;
        Ok(updated > 0)
    }

    async fn transition(
        &self,
        id: UploadSessionId,
        from: UploadStatus,
        to: UploadStatus,
        at: DateTime<Utc>,
    ) -> AppResult<bool> {
        let updated = sqlx::query_scalar::<_, i64>(
            "WITH moved AS ( \
                 UPDATE upload_sessions SET status = $3, updated_at = $4 \
                 WHERE id = $1 AND status = $2 \
                 RETURNING id, status \
             ), purged AS ( \
                 DELETE FROM upload_session_chunks \
                 WHERE session_id IN (SELECT id FROM moved WHERE status <> 'active') \
             ) \
             SELECT COUNT(*) FROM moved",
        )
        .bind(id)
        .bind(from)
        .bind(to)
        .bind(at)
        .fetch_one(&self.pool)
        .await
        .map_err(|e| {
            AppError::with_source(ErrorKind::Database, "Failed to update upload session status", e)
        })?;
        Ok(updated > 0)
    }

    async fn expire_if_due(&self, id: UploadSessionId, now: DateTime<Utc>) -> AppResult<bool> {
        let updated = sqlx::query_scalar::<_, i64>(
            "WITH expired AS ( \
                 UPDATE upload_sessions SET status = 'expired', updated_at = $2 \
                 WHERE id = $1 AND status = 'active' AND expires_at < $2 \
                 RETURNING id \
             ), purged AS ( \
                 DELETE FROM upload_session_chunks WHERE session_id IN (SELECT id FROM expired) \
             ) \
             SELECT COUNT(*) FROM expired",
        )
        .bind(id)
        .bind(now)
        .fetch_one(&self.pool)
        .await
        .map_err(|e| {
            AppError::with_source(ErrorKind::Database, "Failed to expire upload session", e)
        })?;
        Ok(updated > 0)
    }

    async fn find_expired(&self, now: DateTime<Utc>, limit: i64) -> AppResult<Vec<UploadSession>> {
        sqlx::query_as::<_, UploadSession>(
            "SELECT * FROM upload_sessions WHERE status = 'active' AND expires_at < $1 \
             ORDER BY expires_at ASC LIMIT $2",
        )
        .bind(now)
        .bind(limit)
        .fetch_all(&self.pool)
        .await
        .map_err(|e| {
            AppError::with_source(ErrorKind::Database, "Failed to find expired upload sessions", e)
        })
    }

    async fn session_states(
        &self,
        ids: &[UploadSessionId],
    ) -> AppResult<Vec<(UploadSessionId, UploadStatus)>> {
        if ids.is_empty() {
            return Ok(Vec::new());
        }
        let raw: Vec<Uuid> = ids.iter().map(|id| id.into_uuid()).collect();
        let rows = sqlx::query_as::<_, (Uuid, UploadStatus)>(
            "SELECT id, status FROM upload_sessions WHERE id = ANY($1)",
        )
        .bind(&raw)
        .fetch_all(&self.pool)
        .await
        .map_err(|e| {
            AppError::with_source(ErrorKind::Database, "Failed to load upload session states", e)
        })?;
        Ok(rows
            .into_iter()
            .map(|(id, status)| (UploadSessionId::from_uuid(id), status))
            .collect())
    }

    async fn health_check(&self) -> AppResult<bool> {
        sqlx::query_scalar::<_, i32>("SELECT 1")
            .fetch_one(&self.pool)
            .await
            .map(|v| v == 1)
            .map_err(|e| AppError::with_source(ErrorKind::Database, "Health check failed", e))
    }
}
