//! Session store abstraction.

use async_trait::async_trait;
use chrono::{DateTime, Utc};

use uploadhub_core::result::AppResult;
use uploadhub_core::types::{ActorId, ScopeId, UploadSessionId};
use uploadhub_entity::upload::{NewUploadSession, UploadSession, UploadStatus};

/// Durable record store for upload sessions and their chunk index.
///
/// Every mutating method is a single conditional write whose predicate
/// includes the expected current status. A `false` return means the
/// predicate did not hold: the caller lost a race or the session already
/// left `active`. Transitions into a terminal state drop the session's
/// chunk index in the same write.
#[async_trait]
pub trait UploadSessionStore: Send + Sync + 'static {
    /// Return the backend name (e.g., "postgres", "memory").
    fn store_type(&self) -> &str;

    /// Persist a new active session.
    async fn insert(&self, new: NewUploadSession) -> AppResult<UploadSession>;

    /// Look a session up by id.
    async fn find(&self, id: UploadSessionId) -> AppResult<Option<UploadSession>>;

    /// Number of active sessions opened by `actor_id`.
    async fn count_active_for_actor(&self, actor_id: ActorId) -> AppResult<u64>;

    /// Sum of declared sizes over `scope_id`'s active sessions.
    async fn sum_active_bytes_for_scope(&self, scope_id: ScopeId) -> AppResult<i64>;

    /// Upsert the index entry for `index` and slide the deadline to
    /// `expires_at`, only while the session is active and not overdue at
    /// `at`.
    async fn record_chunk(
        &self,
        id: UploadSessionId,
        index: i32,
        size_bytes: i32,
        at: DateTime<Utc>,
        expires_at: DateTime<Utc>,
    ) -> AppResult<bool>;

    /// Accepted chunk indexes in ascending order.
    async fn chunk_indexes(&self, id: UploadSessionId) -> AppResult<Vec<i32>>;

    /// Number of accepted chunk indexes.
    async fn count_chunks(&self, id: UploadSessionId) -> AppResult<u64>;

    /// `active` → `completed`, setting the reference and completion time.
    async fn mark_completed(
        &self,
        id: UploadSessionId,
        file_reference: &str,
        completed_at: DateTime<Utc>,
    ) -> AppResult<bool>;

    /// Compare-and-set the status from `from` to `to`.
    async fn transition(
        &self,
        id: UploadSessionId,
        from: UploadStatus,
        to: UploadStatus,
        at: DateTime<Utc>,
    ) -> AppResult<bool>;

    /// `active` → `expired` when the deadline is before `now`.
    async fn expire_if_due(&self, id: UploadSessionId, now: DateTime<Utc>) -> AppResult<bool>;

    /// Active sessions whose deadline is before `now`, oldest deadline first.
    async fn find_expired(&self, now: DateTime<Utc>, limit: i64) -> AppResult<Vec<UploadSession>>;

    /// Current status of each known id; unknown ids are omitted.
    async fn session_states(
        &self,
        ids: &[UploadSessionId],
    ) -> AppResult<Vec<(UploadSessionId, UploadStatus)>>;

    /// Check whether the backend is reachable.
    async fn health_check(&self) -> AppResult<bool>;
}
