//! Upload session handlers.

use axum::Json;
use axum::extract::rejection::{JsonRejection, PathRejection};
use axum::extract::{Path, State};
use axum::http::StatusCode;
use bytes::Bytes;
use uuid::Uuid;
use validator::Validate;

use uploadhub_core::error::AppError;
use uploadhub_core::types::{ScopeId, UploadSessionId};
use uploadhub_service::UploadSessionView;

use crate::dto::request::CreateSessionRequest;
use crate::dto::response::ApiResponse;
use crate::error::ApiError;
use crate::extractors::Actor;
use crate::state::AppState;

fn invalid_path(rejection: PathRejection) -> AppError {
    AppError::validation(format!("Invalid path: {}", rejection.body_text()))
}

/// POST /api/scopes/{scope_id}/uploads/sessions
pub async fn create_session(
    State(state): State<AppState>,
    actor: Actor,
    path: Result<Path<Uuid>, PathRejection>,
    payload: Result<Json<CreateSessionRequest>, JsonRejection>,
) -> Result<(StatusCode, Json<ApiResponse<UploadSessionView>>), ApiError> {
    let Path(scope_id) = path.map_err(invalid_path)?;
    let Json(req) =
        payload.map_err(|e| AppError::validation(format!("Invalid request body: {}", e.body_text())))?;
    req.validate()
        .map_err(|e| AppError::validation(format!("Invalid request body: {e}")))?;

    let ctx = actor.in_scope(ScopeId::from(scope_id));
    let view = state.upload_service.create(&ctx, req.into()).await?;
    Ok((StatusCode::CREATED, Json(ApiResponse::ok(view))))
}

/// PUT /api/scopes/{scope_id}/uploads/sessions/{session_id}/chunks/{index}
pub async fn upload_chunk(
    State(state): State<AppState>,
    actor: Actor,
    path: Result<Path<(Uuid, Uuid, i32)>, PathRejection>,
    body: Bytes,
) -> Result<Json<ApiResponse<UploadSessionView>>, ApiError> {
    let Path((scope_id, session_id, index)) = path.map_err(invalid_path)?;
    let ctx = actor.in_scope(ScopeId::from(scope_id));
    let view = state
        .upload_service
        .upload_chunk(&ctx, UploadSessionId::from(session_id), index, body)
        .await?;
    Ok(Json(ApiResponse::ok(view)))
}

/// GET /api/scopes/{scope_id}/uploads/sessions/{session_id}
pub async fn get_session(
    State(state): State<AppState>,
    actor: Actor,
    path: Result<Path<(Uuid, Uuid)>, PathRejection>,
) -> Result<Json<ApiResponse<UploadSessionView>>, ApiError> {
    let Path((scope_id, session_id)) = path.map_err(invalid_path)?;
    let ctx = actor.in_scope(ScopeId::from(scope_id));
    let view = state
        .upload_service
        .get_status(&ctx, UploadSessionId::from(session_id))
        .await?;
    Ok(Json(ApiResponse::ok(view)))
}

/// POST /api/scopes/{scope_id}/uploads/sessions/{session_id}/complete
pub async fn complete_session(
    State(state): State<AppState>,
    actor: Actor,
    path: Result<Path<(Uuid, Uuid)>, PathRejection>,
) -> Result<Json<ApiResponse<UploadSessionView>>, ApiError> {
    let Path((scope_id, session_id)) = path.map_err(invalid_path)?;
    let ctx = actor.in_scope(ScopeId::from(scope_id));
    let view = state
        .upload_service
        .complete(&ctx, UploadSessionId::from(session_id))
        .await?;
    Ok(Json(ApiResponse::ok(view)))
}

/// DELETE /api/scopes/{scope_id}/uploads/sessions/{session_id}
pub async fn cancel_session(
    State(state): State<AppState>,
    actor: Actor,
    path: Result<Path<(Uuid, Uuid)>, PathRejection>,
) -> Result<StatusCode, ApiError> {
    let Path((scope_id, session_id)) = path.map_err(invalid_path)?;
    let ctx = actor.in_scope(ScopeId::from(scope_id));
    state
        .upload_service
        .cancel(&ctx, UploadSessionId::from(session_id))
        .await?;
    Ok(StatusCode::NO_CONTENT)
}
