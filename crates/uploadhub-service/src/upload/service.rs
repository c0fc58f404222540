//! Upload session service: create, upload chunk, status, complete, cancel
//! and expiry of resumable chunked uploads.

use std::sync::Arc;

use bytes::Bytes;
use chrono::{DateTime, Duration, Utc};
use serde::{Deserialize, Serialize};
use tracing::{debug, info, warn};

use uploadhub_core::config::MAX_SESSION_TTL_SECONDS;
use uploadhub_core::config::uploads::UploadsConfig;
use uploadhub_core::error::AppError;
use uploadhub_core::result::AppResult;
use uploadhub_core::traits::{AccessControl, BlobStore, ScopeLiveness};
use uploadhub_core::types::UploadSessionId;
use uploadhub_database::UploadSessionStore;
use uploadhub_entity::upload::{ChunkGeometry, NewUploadSession, UploadSession, UploadStatus};
use uploadhub_storage::{ChunkAssembler, ChunkStore};

use super::metrics::UploadMetrics;
use super::quota::QuotaEnforcer;
use super::view::UploadSessionView;
use crate::context::RequestContext;

const MAX_FILE_NAME_CHARS: usize = 255;

/// Request for opening an upload session.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct CreateUploadSession {
    /// Declared MIME type.
    pub content_type: String,
    /// Declared total size in bytes.
    pub total_size_bytes: i64,
    /// Requested chunk size; the configured default when absent.
    pub chunk_size_bytes: Option<i32>,
    /// Advisory file name.
    pub original_file_name: Option<String>,
}

/// Counts from one expiry pass.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct ExpiryOutcome {
    /// Sessions moved to `expired`.
    pub expired: u64,
    /// Sessions whose expiry or cleanup failed.
    pub failed: u64,
}

/// Session manager for resumable uploads.
///
/// Owns all state-transition logic. Every transition is a conditional
/// write in the session store, so concurrent callers (including other
/// server instances) settle on exactly one outcome and the loser fails.
#[derive(Clone)]
pub struct UploadSessionService {
    /// Session records and chunk index.
    store: Arc<dyn UploadSessionStore>,
    /// Chunk bytes on disk.
    chunks: ChunkStore,
    /// Concatenates chunks at completion.
    assembler: ChunkAssembler,
    /// Final destination of assembled files.
    blob_store: Arc<dyn BlobStore>,
    /// Scope membership.
    access: Arc<dyn AccessControl>,
    /// Scope lifecycle.
    liveness: Arc<dyn ScopeLiveness>,
    /// Creation-time caps.
    quota: QuotaEnforcer,
    /// Upload limits.
    config: UploadsConfig,
    /// Counters.
    metrics: Arc<UploadMetrics>,
}

impl std::fmt::Debug for UploadSessionService {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("UploadSessionService")
            .field("store", &self.store.store_type())
            .field("blob_store", &self.blob_store.store_type())
            .finish()
    }
}

impl UploadSessionService {
    /// Creates a new upload session service.
    #[allow(clippy::too_many_arguments)]
    pub fn new(
        store: Arc<dyn UploadSessionStore>,
        chunks: ChunkStore,
        blob_store: Arc<dyn BlobStore>,
        access: Arc<dyn AccessControl>,
        liveness: Arc<dyn ScopeLiveness>,
        config: UploadsConfig,
        metrics: Arc<UploadMetrics>,
    ) -> Self {
        let quota = QuotaEnforcer::new(
            Arc::clone(&store),
            config.max_active_sessions_per_actor,
            config.max_active_bytes_per_scope,
        );
        Self {
            assembler: ChunkAssembler::new(chunks.clone()),
            store,
            chunks,
            blob_store,
            access,
            liveness,
            quota,
            config,
            metrics,
        }
    }

    /// Shared counters.
    pub fn metrics(&self) -> &Arc<UploadMetrics> {
        &self.metrics
    }

    /// Open a new session and its chunk directory.
    pub async fn create(
        &self,
        ctx: &RequestContext,
        req: CreateUploadSession,
    ) -> AppResult<UploadSessionView> {
        if !self.config.enabled {
            return Err(AppError::service_unavailable(
                "Chunked uploads are temporarily disabled",
            ));
        }
        self.ensure_member(ctx).await?;
        self.ensure_scope_live(ctx).await?;

        let total_size = req.total_size_bytes;
        if total_size <= 0 {
            return Err(AppError::validation("total_size_bytes must be positive"));
        }
        if total_size > self.config.max_file_size_bytes {
            return Err(AppError::validation(format!(
                "File size exceeds allowed limit of {} bytes",
                self.config.max_file_size_bytes
            )));
        }

        let content_type = self.validate_content_type(&req.content_type)?;

        let chunk_size = req
            .chunk_size_bytes
            .unwrap_or(self.config.default_chunk_size_bytes);
        if chunk_size <= 0 || chunk_size > self.config.max_chunk_size_bytes {
            return Err(AppError::validation(format!(
                "chunk_size_bytes must be between 1 and {}",
                self.config.max_chunk_size_bytes
            )));
        }

        let geometry = ChunkGeometry::new(total_size, chunk_size)
            .ok_or_else(|| AppError::validation("Total chunk count is too large"))?;

        self.quota
            .check(ctx.actor_id, ctx.scope_id, total_size)
            .await?;

        let now = ctx.request_time;
        let session = self
            .store
            .insert(NewUploadSession {
                id: UploadSessionId::new(),
                scope_id: ctx.scope_id,
                actor_id: ctx.actor_id,
                original_file_name: sanitize_file_name(req.original_file_name.as_deref()),
                content_type,
                geometry,
                created_at: now,
                expires_at: now + self.ttl(),
            })
            .await?;

        if let Err(e) = self.chunks.create_session_dir(session.id).await {
            // Release the quota slot; the session never became usable.
            if let Err(cleanup) = self
                .store
                .transition(session.id, UploadStatus::Active, UploadStatus::Cancelled, now)
                .await
            {
                warn!(session_id = %session.id, error = %cleanup, "Failed to cancel session without chunk directory");
            }
            return Err(e);
        }

        UploadMetrics::inc(&self.metrics.sessions_created);
        info!(
            session_id = %session.id,
            scope_id = %session.scope_id,
            actor_id = %session.actor_id,
            total_size = session.total_size_bytes,
            total_chunks = session.total_chunks,
            "Upload session created"
        );

        Ok(UploadSessionView::new(&session, Vec::new()))
    }

    /// Persist one chunk and slide the session deadline.
    pub async fn upload_chunk(
        &self,
        ctx: &RequestContext,
        session_id: UploadSessionId,
        index: i32,
        data: Bytes,
    ) -> AppResult<UploadSessionView> {
        let mut session = self.load_owned(ctx, session_id).await?;
        self.ensure_scope_live(ctx).await?;

        if session.status != UploadStatus::Active {
            UploadMetrics::inc(&self.metrics.chunks_rejected);
            return Err(AppError::precondition_failed(format!(
                "Upload session is {}",
                session.status
            )));
        }
        let now = ctx.request_time;
        if session.is_overdue(now) {
            UploadMetrics::inc(&self.metrics.chunks_rejected);
            self.expire_on_touch(session_id, now).await;
            return Err(AppError::precondition_failed("Upload session has expired"));
        }

        let Some(expected) = session.geometry().expected_chunk_size(index) else {
            UploadMetrics::inc(&self.metrics.chunks_rejected);
            return Err(AppError::validation(format!(
                "Chunk index {index} is outside 0..{}",
                session.total_chunks
            )));
        };
        if data.len() as i64 != expected {
            UploadMetrics::inc(&self.metrics.chunks_rejected);
            return Err(AppError::validation(format!(
                "Chunk size mismatch for index {index}: expected {expected} bytes, got {}",
                data.len()
            )));
        }

        self.chunks.write_chunk(session_id, index, data).await?;

        let expires_at = now + self.ttl();
        let recorded = self
            .store
            .record_chunk(session_id, index, expected as i32, now, expires_at)
            .await?;
        if !recorded {
            // The session left `active` while the bytes were being written.
            UploadMetrics::inc(&self.metrics.chunks_rejected);
            self.expire_on_touch(session_id, now).await;
            return Err(AppError::precondition_failed(
                "Upload session is no longer active",
            ));
        }

        UploadMetrics::inc(&self.metrics.chunks_uploaded);
        debug!(session_id = %session_id, index, "Chunk accepted");

        session.expires_at = expires_at;
        session.updated_at = now;
        let uploaded = self.store.chunk_indexes(session_id).await?;
        Ok(UploadSessionView::new(&session, uploaded))
    }

    /// Read-only status view. Terminal sessions still answer.
    pub async fn get_status(
        &self,
        ctx: &RequestContext,
        session_id: UploadSessionId,
    ) -> AppResult<UploadSessionView> {
        let session = self.load_owned(ctx, session_id).await?;
        let uploaded = if session.status == UploadStatus::Active {
            self.store.chunk_indexes(session_id).await?
        } else {
            Vec::new()
        };
        if session.status == UploadStatus::Active && !uploaded.is_empty() {
            UploadMetrics::inc(&self.metrics.sessions_resumed);
        }
        Ok(UploadSessionView::new(&session, uploaded))
    }

    /// Assemble, hand to the blob store, and finalize.
    ///
    /// Idempotent: an already completed session returns its view without
    /// touching the chunks or the blob store again. Any storage failure
    /// leaves the session active so the client can simply retry.
    pub async fn complete(
        &self,
        ctx: &RequestContext,
        session_id: UploadSessionId,
    ) -> AppResult<UploadSessionView> {
        let session = self.load_owned(ctx, session_id).await?;
        if session.status == UploadStatus::Completed {
            return Ok(UploadSessionView::new(&session, Vec::new()));
        }
        if session.status != UploadStatus::Active {
            return Err(AppError::precondition_failed(format!(
                "Upload session is {}",
                session.status
            )));
        }
        self.ensure_scope_live(ctx).await?;

        let now = ctx.request_time;
        if session.is_overdue(now) {
            self.expire_on_touch(session_id, now).await;
            return Err(AppError::precondition_failed("Upload session has expired"));
        }

        let uploaded = self.store.count_chunks(session_id).await?;
        if uploaded != session.total_chunks as u64 {
            return Err(AppError::precondition_failed(format!(
                "Not all chunks have been uploaded ({uploaded} of {})",
                session.total_chunks
            )));
        }

        let assembled = self
            .assembler
            .assemble(session_id, session.total_chunks)
            .await?;
        let stored = self
            .blob_store
            .store(
                &assembled.path,
                session.scope_id,
                &session.content_type,
                session.total_size_bytes,
            )
            .await;
        if let Err(e) = self.assembler.discard(&assembled).await {
            warn!(session_id = %session_id, error = %e, "Failed to remove assembled file");
        }
        let reference = stored?;

        let completed_at = now;
        let marked = self
            .store
            .mark_completed(session_id, &reference, completed_at)
            .await;
        if !matches!(marked, Ok(true)) {
            if let Err(e) = self.blob_store.discard(&reference).await {
                warn!(session_id = %session_id, reference = %reference, error = %e, "Failed to discard unreferenced blob");
            }
            marked?;
            // A concurrent completion may have won; answer with its result.
            if let Some(current) = self.store.find(session_id).await? {
                if current.status == UploadStatus::Completed {
                    return Ok(UploadSessionView::new(&current, Vec::new()));
                }
            }
            return Err(AppError::precondition_failed(
                "Upload session is no longer active",
            ));
        }

        if let Err(e) = self.chunks.remove_session(session_id).await {
            warn!(session_id = %session_id, error = %e, "Failed to remove chunks of completed session");
        }
        UploadMetrics::inc(&self.metrics.sessions_completed);
        info!(session_id = %session_id, reference = %reference, "Upload session completed");

        let session = UploadSession {
            status: UploadStatus::Completed,
            file_reference: Some(reference),
            completed_at: Some(completed_at),
            updated_at: completed_at,
            ..session
        };
        Ok(UploadSessionView::new(&session, Vec::new()))
    }

    /// Abandon an active session and reclaim its chunks.
    pub async fn cancel(&self, ctx: &RequestContext, session_id: UploadSessionId) -> AppResult<()> {
        let session = self.load_owned(ctx, session_id).await?;
        match session.status {
            UploadStatus::Active => {}
            UploadStatus::Completed => {
                return Err(AppError::precondition_failed(
                    "Completed uploads cannot be cancelled",
                ));
            }
            other => {
                return Err(AppError::precondition_failed(format!(
                    "Upload session is already {other}"
                )));
            }
        }

        if !self
            .store
            .transition(
                session_id,
                UploadStatus::Active,
                UploadStatus::Cancelled,
                ctx.request_time,
            )
            .await?
        {
            return Err(AppError::precondition_failed(
                "Upload session is no longer active",
            ));
        }

        if let Err(e) = self.chunks.remove_session(session_id).await {
            warn!(session_id = %session_id, error = %e, "Failed to remove chunks of cancelled session");
        }
        UploadMetrics::inc(&self.metrics.sessions_cancelled);
        info!(session_id = %session_id, "Upload session cancelled");
        Ok(())
    }

    /// Expire up to `limit` active sessions whose deadline is before `now`
    /// and delete their chunks. Per-session failures are logged and counted;
    /// they never stop the pass.
    pub async fn expire_stale_sessions(
        &self,
        now: DateTime<Utc>,
        limit: i64,
    ) -> AppResult<ExpiryOutcome> {
        let stale = self.store.find_expired(now, limit).await?;
        let mut outcome = ExpiryOutcome::default();

        for session in stale {
            match self.store.expire_if_due(session.id, now).await {
                Ok(true) => {
                    outcome.expired += 1;
                    if let Err(e) = self.chunks.remove_session(session.id).await {
                        outcome.failed += 1;
                        warn!(session_id = %session.id, error = %e, "Failed to remove chunks of expired session");
                    }
                }
                // Completed or cancelled since it was listed.
                Ok(false) => {}
                Err(e) => {
                    outcome.failed += 1;
                    warn!(session_id = %session.id, error = %e, "Failed to expire upload session");
                }
            }
        }

        if outcome.expired > 0 {
            UploadMetrics::add(&self.metrics.sessions_expired, outcome.expired);
            info!(expired = outcome.expired, failed = outcome.failed, "Expired stale upload sessions");
        }
        Ok(outcome)
    }

    fn ttl(&self) -> Duration {
        let secs = self.config.session_ttl_seconds.min(MAX_SESSION_TTL_SECONDS);
        Duration::seconds(secs as i64)
    }

    async fn ensure_member(&self, ctx: &RequestContext) -> AppResult<()> {
        if self.access.is_scope_member(ctx.scope_id, ctx.actor_id).await? {
            Ok(())
        } else {
            Err(AppError::precondition_failed(
                "Actor is not a member of this scope",
            ))
        }
    }

    async fn ensure_scope_live(&self, ctx: &RequestContext) -> AppResult<()> {
        if self.liveness.is_scope_live(ctx.scope_id).await? {
            Ok(())
        } else {
            Err(AppError::precondition_failed(
                "Scope is not accepting uploads",
            ))
        }
    }

    /// Load a session the caller may act on: the caller is a member of the
    /// request scope, and the session was opened by the caller in that scope.
    async fn load_owned(
        &self,
        ctx: &RequestContext,
        session_id: UploadSessionId,
    ) -> AppResult<UploadSession> {
        self.ensure_member(ctx).await?;
        let session = self
            .store
            .find(session_id)
            .await?
            .ok_or_else(|| AppError::not_found(format!("Upload session {session_id} not found")))?;
        if session.scope_id != ctx.scope_id {
            return Err(AppError::precondition_failed(
                "Upload session does not belong to this scope",
            ));
        }
        if session.actor_id != ctx.actor_id {
            return Err(AppError::precondition_failed(
                "Upload session does not belong to the current actor",
            ));
        }
        Ok(session)
    }

    /// Expire an overdue session touched by a client and drop its chunks.
    ///
    /// Chunks are only removed once the session is known to be terminal: a
    /// concurrent chunk may have slid the deadline, leaving it active with
    /// an index that still lists them.
    async fn expire_on_touch(&self, session_id: UploadSessionId, now: DateTime<Utc>) {
        match self.store.expire_if_due(session_id, now).await {
            Ok(true) => {
                UploadMetrics::inc(&self.metrics.sessions_expired);
                info!(session_id = %session_id, "Upload session expired on access");
            }
            Ok(false) => match self.store.find(session_id).await {
                Ok(Some(current)) if current.status == UploadStatus::Active => {
                    debug!(session_id = %session_id, "Upload session still active, keeping its chunks");
                    return;
                }
                Ok(_) => {}
                Err(e) => {
                    warn!(session_id = %session_id, error = %e, "Failed to reload upload session");
                    return;
                }
            },
            Err(e) => {
                warn!(session_id = %session_id, error = %e, "Failed to expire upload session");
                return;
            }
        }
        if let Err(e) = self.chunks.remove_session(session_id).await {
            warn!(session_id = %session_id, error = %e, "Failed to remove chunks of inactive session");
        }
    }

    fn validate_content_type(&self, raw: &str) -> AppResult<String> {
        let normalized = raw.trim().to_ascii_lowercase();
        if normalized.is_empty() {
            return Err(AppError::validation("content_type is required"));
        }
        let well_formed = normalized
            .split_once('/')
            .is_some_and(|(kind, sub)| is_token(kind) && is_token(sub));
        if !well_formed {
            return Err(AppError::validation(format!(
                "Malformed content type: '{raw}'"
            )));
        }
        if !self
            .config
            .allowed_content_types
            .iter()
            .any(|allowed| allowed.eq_ignore_ascii_case(&normalized))
        {
            return Err(AppError::validation(format!(
                "File type not allowed: {normalized}"
            )));
        }
        Ok(normalized)
    }
}

fn is_token(s: &str) -> bool {
    !s.is_empty()
        && s.bytes()
            .all(|b| b.is_ascii_alphanumeric() || b"!#$&-^_.+".contains(&b))
}

/// Keep only the last path component, trimmed and bounded in length.
fn sanitize_file_name(raw: Option<&str>) -> Option<String> {
    let name = raw?.rsplit(['/', '\\']).next()?.trim();
    if name.is_empty() {
        return None;
    }
    Some(name.chars().take(MAX_FILE_NAME_CHARS).collect())
}
