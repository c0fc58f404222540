//! In-memory scope directory.

use std::collections::HashSet;
use std::sync::Arc;

use async_trait::async_trait;
use dashmap::DashMap;

use uploadhub_core::result::AppResult;
use uploadhub_core::traits::{AccessControl, ScopeLiveness};
use uploadhub_core::types::{ActorId, ScopeId};

#[derive(Debug, Clone, Default)]
struct ScopeEntry {
    live: bool,
    members: HashSet<ActorId>,
}

/// Scope membership and liveness held in memory.
///
/// An `open` directory treats every actor as a member of every live
/// scope; it is meant for single-node runs where membership is enforced
/// upstream. Scopes explicitly marked not live are refused either way.
#[derive(Debug, Clone, Default)]
pub struct MemoryScopeDirectory {
    scopes: Arc<DashMap<ScopeId, ScopeEntry>>,
    open: bool,
}

impl MemoryScopeDirectory {
    /// A directory that only knows explicitly registered members.
    pub fn new() -> Self {
        Self::default()
    }

    /// A directory that admits any actor to any scope.
    pub fn open() -> Self {
        Self {
            scopes: Arc::default(),
            open: true,
        }
    }

    /// Register `actor_id` as a member of `scope_id`, creating a live scope
    /// if needed.
    pub fn add_member(&self, scope_id: ScopeId, actor_id: ActorId) {
        self.scopes
            .entry(scope_id)
            .or_insert_with(|| ScopeEntry {
                live: true,
                members: HashSet::new(),
            })
            .members
            .insert(actor_id);
    }

    /// Change whether `scope_id` accepts uploads.
    pub fn set_live(&self, scope_id: ScopeId, live: bool) {
        self.scopes.entry(scope_id).or_default().live = live;
    }
}

#[async_trait]
impl AccessControl for MemoryScopeDirectory {
    async fn is_scope_member(&self, scope_id: ScopeId, actor_id: ActorId) -> AppResult<bool> {
        if self.open {
            return Ok(true);
        }
        Ok(self
            .scopes
            .get(&scope_id)
            .is_some_and(|scope| scope.members.contains(&actor_id)))
    }
}

#[async_trait]
impl ScopeLiveness for MemoryScopeDirectory {
    async fn is_scope_live(&self, scope_id: ScopeId) -> AppResult<bool> {
        match self.scopes.get(&scope_id) {
            Some(scope) => Ok(scope.live),
            None => Ok(self.open),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[tokio::test]
    async fn test_closed_directory_requires_membership() {
        let dir = MemoryScopeDirectory::new();
        let scope = ScopeId::new();
        let actor = ActorId::new();
        assert!(!dir.is_scope_member(scope, actor).await.unwrap());
        assert!(!dir.is_scope_live(scope).await.unwrap());

        dir.add_member(scope, actor);
        assert!(dir.is_scope_member(scope, actor).await.unwrap());
        assert!(!dir.is_scope_member(scope, ActorId::new()).await.unwrap());
        assert!(dir.is_scope_live(scope).await.unwrap());
    }

    #[tokio::test]
    async fn test_open_directory_still_honours_archived_scope() {
        let dir = MemoryScopeDirectory::open();
        let scope = ScopeId::new();
        assert!(dir.is_scope_member(scope, ActorId::new()).await.unwrap());
        assert!(dir.is_scope_live(scope).await.unwrap());

        dir.set_live(scope, false);
        assert!(!dir.is_scope_live(scope).await.unwrap());
    }
}
