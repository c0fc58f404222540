//! In-memory session store backed by a sharded concurrent map.

use std::collections::BTreeMap;
use std::sync::Arc;

use async_trait::async_trait;
use chrono::{DateTime, Utc};
use dashmap::DashMap;
use dashmap::mapref::entry::Entry;

use uploadhub_core::error::AppError;
use uploadhub_core::result::AppResult;
use uploadhub_core::types::{ActorId, ScopeId, UploadSessionId};
use uploadhub_entity::upload::{NewUploadSession, UploadChunk, UploadSession, UploadStatus};

use crate::store::UploadSessionStore;

/// A session record plus its chunk index.
#[derive(Debug, Clone)]
struct SessionEntry {
    session: UploadSession,
    chunks: BTreeMap<i32, UploadChunk>,
}

impl SessionEntry {
    /// Move to a terminal status and drop the chunk index.
    fn finish(&mut self, status: UploadStatus, at: DateTime<Utc>) {
        self.session.status = status;
        self.session.updated_at = at;
        self.chunks.clear();
    }
}

/// In-memory upload session store.
///
/// Each conditional write holds the shard lock of its entry for the whole
/// check-and-update, which gives the same per-session atomicity as the
/// PostgreSQL predicates. Suitable for single-node deployments only.
#[derive(Debug, Clone, Default)]
pub struct MemoryUploadSessionStore {
    sessions: Arc<DashMap<UploadSessionId, SessionEntry>>,
}

impl MemoryUploadSessionStore {
    /// Create an empty store.
    pub fn new() -> Self {
        Self::default()
    }

    /// Number of sessions held, in any status.
    pub fn len(&self) -> usize {
        self.sessions.len()
    }

    /// Whether the store holds no sessions.
    pub fn is_empty(&self) -> bool {
        self.sessions.is_empty()
    }
}

#[async_trait]
impl UploadSessionStore for MemoryUploadSessionStore {
    fn store_type(&self) -> &str {
        "memory"
    }

    async fn insert(&self, new: NewUploadSession) -> AppResult<UploadSession> {
        match self.sessions.entry(new.id) {
            Entry::Occupied(_) => Err(AppError::database(format!(
                "Upload session {} already exists",
                new.id
            ))),
            Entry::Vacant(slot) => {
                let session = new.into_session();
                slot.insert(SessionEntry {
                    session: session.clone(),
                    chunks: BTreeMap::new(),
                });
                Ok(session)
            }
        }
    }

    async fn find(&self, id: UploadSessionId) -> AppResult<Option<UploadSession>> {
        Ok(self.sessions.get(&id).map(|entry| entry.session.clone()))
    }

    async fn count_active_for_actor(&self, actor_id: ActorId) -> AppResult<u64> {
        Ok(self
            .sessions
            .iter()
            .filter(|e| e.session.actor_id == actor_id && e.session.status == UploadStatus::Active)
            .count() as u64)
    }

    async fn sum_active_bytes_for_scope(&self, scope_id: ScopeId) -> AppResult<i64> {
        Ok(self
            .sessions
            .iter()
            .filter(|e| e.session.scope_id == scope_id && e.session.status == UploadStatus::Active)
            .map(|e| e.session.total_size_bytes)
            .sum())
    }

    async fn record_chunk(
        &self,
        id: UploadSessionId,
        index: i32,
        size_bytes: i32,
        at: DateTime<Utc>,
        expires_at: DateTime<Utc>,
    ) -> AppResult<bool> {
        let Some(mut entry) = self.sessions.get_mut(&id) else {
            return Ok(false);
        };
        if entry.session.status != UploadStatus::Active || entry.session.expires_at < at {
            return Ok(false);
        }
        entry.session.expires_at = expires_at;
        entry.session.updated_at = at;
        entry.chunks.insert(
            index,
            UploadChunk {
                session_id: id,
                chunk_index: index,
                chunk_size_bytes: size_bytes,
                created_at: at,
            },
        );
        Ok(true)
    }

    async fn chunk_indexes(&self, id: UploadSessionId) -> AppResult<Vec<i32>> {
        Ok(self
            .sessions
            .get(&id)
            .map(|entry| entry.chunks.keys().copied().collect())
            .unwrap_or_default())
    }

    async fn count_chunks(&self, id: UploadSessionId) -> AppResult<u64> {
        Ok(self
            .sessions
            .get(&id)
            .map(|entry| entry.chunks.len() as u64)
            .unwrap_or(0))
    }

    async fn mark_completed(
        &self,
        id: UploadSessionId,
        file_reference: &str,
        completed_at: DateTime<Utc>,
    ) -> AppResult<bool> {
        let Some(mut entry) = self.sessions.get_mut(&id) else {
            return Ok(false);
        };
        if entry.session.status != UploadStatus::Active || entry.session.expires_at < completed_at {
            return Ok(false);
        }
        entry.session.file_reference = Some(file_reference.to_string());
        entry.session.completed_at = Some(completed_at);
        entry.finish(UploadStatus::Completed, completed_at);
        Ok(true)
    }

    async fn transition(
        &self,
        id: UploadSessionId,
        from: UploadStatus,
        to: UploadStatus,
        at: DateTime<Utc>,
    ) -> AppResult<bool> {
        let Some(mut entry) = self.sessions.get_mut(&id) else {
            return Ok(false);
        };
        if entry.session.status != from {
            return Ok(false);
        }
        if to.is_terminal() {
            entry.finish(to, at);
        } else {
            entry.session.status = to;
            entry.session.updated_at = at;
        }
        Ok(true)
    }

    async fn expire_if_due(&self, id: UploadSessionId, now: DateTime<Utc>) -> AppResult<bool> {
        let Some(mut entry) = self.sessions.get_mut(&id) else {
            return Ok(false);
        };
        if !entry.session.is_overdue(now) {
            return Ok(false);
        }
        entry.finish(UploadStatus::Expired, now);
        Ok(true)
    }

    async fn find_expired(&self, now: DateTime<Utc>, limit: i64) -> AppResult<Vec<UploadSession>> {
        let mut overdue: Vec<UploadSession> = self
            .sessions
            .iter()
            .filter(|e| e.session.is_overdue(now))
            .map(|e| e.session.clone())
            .collect();
        overdue.sort_by_key(|s| s.expires_at);
        overdue.truncate(usize::try_from(limit.max(0)).unwrap_or(usize::MAX));
        Ok(overdue)
    }

    async fn session_states(
        &self,
        ids: &[UploadSessionId],
    ) -> AppResult<Vec<(UploadSessionId, UploadStatus)>> {
        Ok(ids
            .iter()
            .filter_map(|id| self.sessions.get(id).map(|e| (*id, e.session.status)))
            .collect())
    }

    async fn health_check(&self) -> AppResult<bool> {
        Ok(true)
    }
}
