//! `Actor` extractor: the acting identity asserted by the upstream
//! authentication layer in the `X-Actor-Id` header.

use axum::extract::FromRequestParts;
use axum::http::request::Parts;

use uploadhub_core::error::AppError;
use uploadhub_core::types::{ActorId, ScopeId};
use uploadhub_service::RequestContext;

use crate::error::ApiError;

/// Header carrying the authenticated actor id.
pub const ACTOR_HEADER: &str = "x-actor-id";

/// Authenticated actor for the current request.
#[derive(Debug, Clone, Copy)]
pub struct Actor(pub ActorId);

impl Actor {
    /// Build the request context for an operation in `scope_id`.
    pub fn in_scope(self, scope_id: ScopeId) -> RequestContext {
        RequestContext::new(self.0, scope_id)
    }
}

impl<S: Send + Sync> FromRequestParts<S> for Actor {
    type Rejection = ApiError;

    async fn from_request_parts(parts: &mut Parts, _state: &S) -> Result<Self, Self::Rejection> {
        let raw = parts
            .headers
            .get(ACTOR_HEADER)
            .and_then(|v| v.to_str().ok())
            .ok_or_else(|| AppError::authentication("Missing X-Actor-Id header"))?;

        let actor_id = raw
            .trim()
            .parse::<ActorId>()
            .map_err(|_| AppError::authentication("Invalid X-Actor-Id header"))?;

        Ok(Self(actor_id))
    }
}
