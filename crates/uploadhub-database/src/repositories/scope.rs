//! Scope membership and lifecycle lookups.

use async_trait::async_trait;
use sqlx::PgPool;

use uploadhub_core::error::{AppError, ErrorKind};
use uploadhub_core::result::AppResult;
use uploadhub_core::traits::{AccessControl, ScopeLiveness};
use uploadhub_core::types::{ActorId, ScopeId};

/// Reads the `scopes` and `scope_members` tables maintained by the
/// surrounding application.
#[derive(Debug, Clone)]
pub struct PgScopeDirectory {
    pool: PgPool,
}

impl PgScopeDirectory {
    /// Create a new scope directory.
    pub fn new(pool: PgPool) -> Self {
        Self { pool }
    }
}

#[async_trait]
impl AccessControl for PgScopeDirectory {
    async fn is_scope_member(&self, scope_id: ScopeId, actor_id: ActorId) -> AppResult<bool> {
        sqlx::query_scalar::<_, bool>(
            "SELECT EXISTS(SELECT 1 FROM scope_members WHERE scope_id = $1 AND actor_id = $2)",
        )
        .bind(scope_id)
        .bind(actor_id)
        .fetch_one(&self.pool)
        .await
        .map_err(|e| AppError::with_source(ErrorKind::Database, "Failed to check scope membership", e))
    }
}

#[async_trait]
impl ScopeLiveness for PgScopeDirectory {
    async fn is_scope_live(&self, scope_id: ScopeId) -> AppResult<bool> {
        let status = sqlx::query_scalar::<_, String>("SELECT status FROM scopes WHERE id = $1")
            .bind(scope_id)
            .fetch_optional(&self.pool)
            .await
            .map_err(|e| {
                AppError::with_source(ErrorKind::Database, "Failed to load scope status", e)
            })?;
        Ok(status.as_deref() == Some("active"))
    }
}
