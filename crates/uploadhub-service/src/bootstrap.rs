//! Wiring of the upload stack from configuration.

use std::sync::Arc;

use uploadhub_core::config::AppConfig;
use uploadhub_core::config::database::StoreProvider;
use uploadhub_core::result::AppResult;
use uploadhub_core::traits::{AccessControl, BlobStore, ScopeLiveness};
use uploadhub_database::{
    DatabasePool, MemoryScopeDirectory, MemoryUploadSessionStore, PgScopeDirectory,
    PgUploadSessionRepository, UploadSessionStore,
};
use uploadhub_storage::{ChunkStore, LocalBlobStore};

use crate::upload::{UploadMetrics, UploadSessionService};

/// Everything a server, worker or admin command needs to act on sessions.
#[derive(Clone)]
pub struct UploadStack {
    /// Session records.
    pub store: Arc<dyn UploadSessionStore>,
    /// Chunk directories.
    pub chunks: ChunkStore,
    /// Session lifecycle.
    pub service: Arc<UploadSessionService>,
    /// Counters shared with the HTTP layer.
    pub metrics: Arc<UploadMetrics>,
    /// Present when the store is PostgreSQL.
    pub pool: Option<DatabasePool>,
}

impl std::fmt::Debug for UploadStack {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("UploadStack")
            .field("store", &self.store.store_type())
            .field("chunks", &self.chunks)
            .finish()
    }
}

impl UploadStack {
    /// Connect the configured store (running migrations when asked to) and
    /// build the service over it.
    pub async fn from_config(config: &AppConfig) -> AppResult<Self> {
        let (store, access, liveness, pool): (
            Arc<dyn UploadSessionStore>,
            Arc<dyn AccessControl>,
            Arc<dyn ScopeLiveness>,
            Option<DatabasePool>,
        ) = match config.database.provider {
            StoreProvider::Postgres => {
                let pool = DatabasePool::connect(&config.database).await?;
                if config.database.run_migrations {
                    pool.migrate().await?;
                }
                let directory = Arc::new(PgScopeDirectory::new(pool.pool().clone()));
                let store: Arc<dyn UploadSessionStore> =
                    Arc::new(PgUploadSessionRepository::new(pool.pool().clone()));
                (
                    store,
                    directory.clone() as Arc<dyn AccessControl>,
                    directory as Arc<dyn ScopeLiveness>,
                    Some(pool),
                )
            }
            StoreProvider::Memory => {
                tracing::warn!(
                    "Using the in-memory session store; sessions do not survive a restart and scope membership is not checked"
                );
                let directory = Arc::new(MemoryScopeDirectory::open());
                let store: Arc<dyn UploadSessionStore> = Arc::new(MemoryUploadSessionStore::new());
                (
                    store,
                    directory.clone() as Arc<dyn AccessControl>,
                    directory as Arc<dyn ScopeLiveness>,
                    None,
                )
            }
        };

        let blob_store = LocalBlobStore::new(
            &config.blob.root_path,
            config.blob.public_path_prefix.clone(),
            config.uploads.max_file_size_bytes,
        )
        .await?;

        Self::assemble(config, store, Arc::new(blob_store), access, liveness, pool).await
    }

    /// Build the stack over caller-supplied collaborators.
    pub async fn assemble(
        config: &AppConfig,
        store: Arc<dyn UploadSessionStore>,
        blob_store: Arc<dyn BlobStore>,
        access: Arc<dyn AccessControl>,
        liveness: Arc<dyn ScopeLiveness>,
        pool: Option<DatabasePool>,
    ) -> AppResult<Self> {
        let chunks = ChunkStore::new(&config.uploads.root_path).await?;
        let metrics = Arc::new(UploadMetrics::new());
        let service = Arc::new(UploadSessionService::new(
            Arc::clone(&store),
            chunks.clone(),
            blob_store,
            access,
            liveness,
            config.uploads.clone(),
            Arc::clone(&metrics),
        ));

        tracing::info!(
            store = store.store_type(),
            chunk_root = %chunks.root().display(),
            "Upload stack ready"
        );

        Ok(Self {
            store,
            chunks,
            service,
            metrics,
            pool,
        })
    }
}
