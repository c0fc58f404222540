//! Expiry sweep and orphaned chunk cleanup.

use std::collections::HashMap;
use std::sync::Arc;

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

use uploadhub_core::result::AppResult;
use uploadhub_database::UploadSessionStore;
use uploadhub_entity::upload::UploadStatus;
use uploadhub_service::UploadSessionService;
use uploadhub_storage::ChunkStore;

/// Counts from one sweep.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct SweepReport {
    /// Sessions moved to `expired`.
    pub expired: u64,
    /// Sessions or directories that could not be cleaned.
    pub failed: u64,
    /// Chunk directories removed because no active session owns them.
    pub orphans_removed: u64,
}

/// Runs the periodic expiry pass.
///
/// Safe to run concurrently with client traffic and with other reapers:
/// every expiry is a conditional write, and orphan removal only touches
/// directories whose session is unknown or already terminal.
#[derive(Clone)]
pub struct ExpiryReaper {
    /// Performs the conditional expiry of each session.
    service: Arc<UploadSessionService>,
    /// Session records, for orphan detection.
    store: Arc<dyn UploadSessionStore>,
    /// Chunk directories.
    chunks: ChunkStore,
    /// Maximum sessions expired per pass.
    batch_limit: i64,
    /// Whether to scan for orphaned directories.
    orphan_cleanup: bool,
}

impl std::fmt::Debug for ExpiryReaper {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("ExpiryReaper")
            .field("batch_limit", &self.batch_limit)
            .field("orphan_cleanup", &self.orphan_cleanup)
            .finish()
    }
}

impl ExpiryReaper {
    /// Create a new reaper.
    pub fn new(
        service: Arc<UploadSessionService>,
        store: Arc<dyn UploadSessionStore>,
        chunks: ChunkStore,
        batch_limit: i64,
        orphan_cleanup: bool,
    ) -> Self {
        Self {
            service,
            store,
            chunks,
            batch_limit: batch_limit.max(1),
            orphan_cleanup,
        }
    }

    /// Run one pass at the current time.
    pub async fn run(&self) -> AppResult<SweepReport> {
        self.sweep(Utc::now()).await
    }

    /// Run one pass as of `now`.
    pub async fn sweep(&self, now: DateTime<Utc>) -> AppResult<SweepReport> {
        tracing::debug!("Running upload expiry sweep");

        let outcome = self
            .service
            .expire_stale_sessions(now, self.batch_limit)
            .await?;
        let mut report = SweepReport {
            expired: outcome.expired,
            failed: outcome.failed,
            orphans_removed: 0,
        };

        if self.orphan_cleanup {
            let (removed, failed) = self.remove_orphans().await?;
            report.orphans_removed = removed;
            report.failed += failed;
        }

        if report.expired > 0 || report.orphans_removed > 0 || report.failed > 0 {
            tracing::info!(
                expired = report.expired,
                orphans_removed = report.orphans_removed,
                failed = report.failed,
                "Upload expiry sweep finished"
            );
        }
        Ok(report)
    }

    /// Remove chunk directories whose session is unknown or terminal.
    async fn remove_orphans(&self) -> AppResult<(u64, u64)> {
        let dirs = self.chunks.list_session_dirs().await?;
        if dirs.is_empty() {
            return Ok((0, 0));
        }

        let states: HashMap<_, _> = self.store.session_states(&dirs).await?.into_iter().collect();

        let mut removed = 0;
        let mut failed = 0;
        for id in dirs {
            if states.get(&id) == Some(&UploadStatus::Active) {
                continue;
            }
            match self.chunks.remove_session(id).await {
                Ok(()) => {
                    removed += 1;
                    tracing::debug!(session_id = %id, "Removed orphaned chunk directory");
                }
                Err(e) => {
                    failed += 1;
                    tracing::warn!(session_id = %id, error = %e, "Failed to remove orphaned chunk directory");
                }
            }
        }
        Ok((removed, failed))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use bytes::Bytes;
    use chrono::Duration;
    use uploadhub_core::config::uploads::UploadsConfig;
    use uploadhub_core::types::{ActorId, ScopeId, UploadSessionId};
    use uploadhub_database::{MemoryScopeDirectory, MemoryUploadSessionStore};
    use uploadhub_service::context::RequestContext;
    use uploadhub_service::{CreateUploadSession, UploadMetrics};
    use uploadhub_storage::LocalBlobStore;

    struct Fixture {
        _dir: tempfile::TempDir,
        reaper: ExpiryReaper,
        service: Arc<UploadSessionService>,
        store: MemoryUploadSessionStore,
        chunks: ChunkStore,
        ctx: RequestContext,
    }

    async fn fixture(batch_limit: i64) -> Fixture {
        let dir = tempfile::tempdir().unwrap();
        let store = MemoryUploadSessionStore::new();
        let chunks = ChunkStore::new(dir.path()).await.unwrap();
        let blobs = LocalBlobStore::new(dir.path().join("blobs"), "/api/scopes", 1 << 20)
            .await
            .unwrap();
        let config = UploadsConfig {
            session_ttl_seconds: 600,
            default_chunk_size_bytes: 4,
            max_active_sessions_per_actor: 10,
            allowed_content_types: vec!["image/png".to_string()],
            ..UploadsConfig::default()
        };
        let service = Arc::new(UploadSessionService::new(
            Arc::new(store.clone()),
            chunks.clone(),
            Arc::new(blobs),
            Arc::new(MemoryScopeDirectory::open()),
            Arc::new(MemoryScopeDirectory::open()),
            config,
            Arc::new(UploadMetrics::new()),
        ));
        let reaper = ExpiryReaper::new(
            Arc::clone(&service),
            Arc::new(store.clone()),
            chunks.clone(),
            batch_limit,
            true,
        );
        Fixture {
            _dir: dir,
            reaper,
            service,
            store,
            chunks,
            ctx: RequestContext::new(ActorId::new(), ScopeId::new()),
        }
    }

    async fn open_session(f: &Fixture, ctx: &RequestContext) -> UploadSessionId {
        let view = f
            .service
            .create(
                ctx,
                CreateUploadSession {
                    content_type: "image/png".to_string(),
                    total_size_bytes: 8,
                    chunk_size_bytes: None,
                    original_file_name: None,
                },
            )
            .await
            .unwrap();
        f.service
            .upload_chunk(ctx, view.session_id, 0, Bytes::from_static(b"AAAA"))
            .await
            .unwrap();
        view.session_id
    }

    #[tokio::test]
    async fn test_sweep_expires_overdue_and_keeps_fresh() {
        let f = fixture(100).await;
        let stale = open_session(&f, &f.ctx).await;
        let later = f.ctx.clone().at(f.ctx.request_time + Duration::minutes(15));
        let fresh = open_session(&f, &later).await;

        let report = f.reaper.sweep(later.request_time).await.unwrap();
        assert_eq!(report.expired, 1);
        assert_eq!(report.failed, 0);
        assert_eq!(report.orphans_removed, 0);

        assert_eq!(
            f.store.find(stale).await.unwrap().unwrap().status,
            UploadStatus::Expired
        );
        assert_eq!(
            f.store.find(fresh).await.unwrap().unwrap().status,
            UploadStatus::Active
        );
        assert!(!f.chunks.session_dir(stale).exists());
        assert_eq!(f.chunks.list_chunk_indexes(fresh).await.unwrap(), vec![0]);
    }

    #[tokio::test]
    async fn test_sweep_respects_batch_limit() {
        let f = fixture(2).await;
        for _ in 0..5 {
            open_session(&f, &f.ctx).await;
        }
        let now = f.ctx.request_time + Duration::hours(1);

        assert_eq!(f.reaper.sweep(now).await.unwrap().expired, 2);
        assert_eq!(f.reaper.sweep(now).await.unwrap().expired, 2);
        assert_eq!(f.reaper.sweep(now).await.unwrap().expired, 1);
        assert_eq!(f.reaper.sweep(now).await.unwrap().expired, 0);
    }

    #[tokio::test]
    async fn test_orphaned_directories_are_removed() {
        let f = fixture(100).await;
        let active = open_session(&f, &f.ctx).await;

        let unknown = UploadSessionId::new();
        f.chunks
            .write_chunk(unknown, 0, Bytes::from_static(b"lost"))
            .await
            .unwrap();

        let report = f.reaper.run().await.unwrap();
        assert_eq!(report.orphans_removed, 1);
        assert!(!f.chunks.session_dir(unknown).exists());
        assert!(f.chunks.session_dir(active).exists());
    }

    #[tokio::test]
    async fn test_concurrent_sweeps_expire_each_session_once() {
        let f = fixture(100).await;
        for _ in 0..4 {
            open_session(&f, &f.ctx).await;
        }
        let now = f.ctx.request_time + Duration::hours(1);

        let (a, b) = tokio::join!(f.reaper.sweep(now), f.reaper.sweep(now));
        assert_eq!(a.unwrap().expired + b.unwrap().expired, 4);
        assert_eq!(f.service.metrics().snapshot().sessions_expired, 4);
    }
}
