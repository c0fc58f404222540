//! Creation-time quota checks.
//!
//! Both limits are computed from the active session records themselves;
//! there is no separately maintained counter. The check is read-then-decide,
//! so two concurrent creations can overshoot a limit by one session. The
//! overshoot is bounded by the number of concurrent creators.

use std::sync::Arc;

use uploadhub_core::error::AppError;
use uploadhub_core::result::AppResult;
use uploadhub_core::types::{ActorId, ScopeId};
use uploadhub_database::UploadSessionStore;

/// Enforces per-actor and per-scope caps on active sessions.
#[derive(Clone)]
pub struct QuotaEnforcer {
    store: Arc<dyn UploadSessionStore>,
    max_active_sessions_per_actor: u64,
    max_active_bytes_per_scope: i64,
}

impl std::fmt::Debug for QuotaEnforcer {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("QuotaEnforcer")
            .field("max_active_sessions_per_actor", &self.max_active_sessions_per_actor)
            .field("max_active_bytes_per_scope", &self.max_active_bytes_per_scope)
            .finish()
    }
}

impl QuotaEnforcer {
    /// Creates a new quota enforcer.
    pub fn new(
        store: Arc<dyn UploadSessionStore>,
        max_active_sessions_per_actor: u64,
        max_active_bytes_per_scope: i64,
    ) -> Self {
        Self {
            store,
            max_active_sessions_per_actor,
            max_active_bytes_per_scope,
        }
    }

    /// Fail with `QuotaExceeded` if opening a session of `declared_size`
    /// bytes would break either cap.
    pub async fn check(
        &self,
        actor_id: ActorId,
        scope_id: ScopeId,
        declared_size: i64,
    ) -> AppResult<()> {
        let active = self.store.count_active_for_actor(actor_id).await?;
        if active >= self.max_active_sessions_per_actor {
            return Err(AppError::quota_exceeded(format!(
                "Too many active upload sessions ({active} of {})",
                self.max_active_sessions_per_actor
            )));
        }

        let active_bytes = self.store.sum_active_bytes_for_scope(scope_id).await?;
        if active_bytes.saturating_add(declared_size) > self.max_active_bytes_per_scope {
            return Err(AppError::quota_exceeded(
                "Scope upload capacity exceeded, retry later",
            ));
        }
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::{Duration, Utc};
    use uploadhub_core::error::ErrorKind;
    use uploadhub_core::types::UploadSessionId;
    use uploadhub_database::MemoryUploadSessionStore;
    use uploadhub_entity::upload::{ChunkGeometry, NewUploadSession};

    async fn open(store: &MemoryUploadSessionStore, actor: ActorId, scope: ScopeId, size: i64) {
        let now = Utc::now();
        store
            .insert(NewUploadSession {
                id: UploadSessionId::new(),
                scope_id: scope,
                actor_id: actor,
                original_file_name: None,
                content_type: "video/mp4".to_string(),
                geometry: ChunkGeometry::new(size, 4).unwrap(),
                created_at: now,
                expires_at: now + Duration::hours(1),
            })
            .await
            .unwrap();
    }

    #[tokio::test]
    async fn test_actor_session_cap() {
        let store = MemoryUploadSessionStore::new();
        let quota = QuotaEnforcer::new(Arc::new(store.clone()), 2, i64::MAX);
        let actor = ActorId::new();
        let scope = ScopeId::new();

        open(&store, actor, scope, 10).await;
        assert!(quota.check(actor, scope, 10).await.is_ok());
        open(&store, actor, scope, 10).await;

        let err = quota.check(actor, scope, 10).await.unwrap_err();
        assert_eq!(err.kind, ErrorKind::QuotaExceeded);
        assert!(quota.check(ActorId::new(), scope, 10).await.is_ok());
    }

    #[tokio::test]
    async fn test_scope_bytes_cap_includes_new_session() {
        let store = MemoryUploadSessionStore::new();
        let quota = QuotaEnforcer::new(Arc::new(store.clone()), 10, 100);
        let scope = ScopeId::new();

        open(&store, ActorId::new(), scope, 60).await;
        assert!(quota.check(ActorId::new(), scope, 40).await.is_ok());
        let err = quota.check(ActorId::new(), scope, 41).await.unwrap_err();
        assert_eq!(err.kind, ErrorKind::QuotaExceeded);
        assert!(quota.check(ActorId::new(), ScopeId::new(), 100).await.is_ok());
    }
}
