//! Collaborator boundaries for scope membership and scope lifecycle.

use async_trait::async_trait;

use crate::result::AppResult;
use crate::types::{ActorId, ScopeId};

/// Answers whether an actor may act inside a scope at all.
///
/// Session ownership (same actor, same scope) is checked by the upload
/// service on top of this.
#[async_trait]
pub trait AccessControl: Send + Sync + 'static {
    /// Whether `actor_id` is a member of `scope_id`.
    async fn is_scope_member(&self, scope_id: ScopeId, actor_id: ActorId) -> AppResult<bool>;
}

/// Answers whether a scope still accepts new upload data.
#[async_trait]
pub trait ScopeLiveness: Send + Sync + 'static {
    /// Whether `scope_id` is in a lifecycle state that accepts uploads.
    async fn is_scope_live(&self, scope_id: ScopeId) -> AppResult<bool>;
}
