//! Request context carrying the acting identity and target scope.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

use uploadhub_core::types::{ActorId, ScopeId};

/// Context for the current authenticated request.
///
/// Built at the edge and passed into service methods so that every
/// operation knows *who* is acting and through *which* scope.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct RequestContext {
    /// The authenticated actor.
    pub actor_id: ActorId,
    /// The scope named in the request path.
    pub scope_id: ScopeId,
    /// When the request was received. All deadline checks use this instant.
    pub request_time: DateTime<Utc>,
}

impl RequestContext {
    /// Creates a new request context stamped with the current time.
    pub fn new(actor_id: ActorId, scope_id: ScopeId) -> Self {
        Self {
            actor_id,
            scope_id,
            request_time: Utc::now(),
        }
    }

    /// Returns a copy evaluated at a different instant.
    pub fn at(mut self, request_time: DateTime<Utc>) -> Self {
        self.request_time = request_time;
        self
    }
}
