use super::error::{confirmation, envelope, path_id};
use super::{ApiError, ApiJson, AppState, AuthContext};
use algodeck_core::{models::FolderPayload, ResourceKind};
use axum::{
    extract::{Path, State},
    http::StatusCode,
    Json,
};
use serde_json::Value;

pub(super) async fn list(
    State(state): State<AppState>,
    auth: AuthContext,
) -> Result<Json<Value>, ApiError> {
    let folders = state.services.note_folders.list(&auth.user_id).await;
    envelope("folders", folders)
}

pub(super) async fn get(
    State(state): State<AppState>,
    auth: AuthContext,
    Path(id): Path<String>,
) -> Result<Json<Value>, ApiError> {
    let id = path_id(&id, ResourceKind::NoteFolder)?;
    let folder = state.services.note_folders.get(&auth.user_id, id).await?;
    envelope("folder", folder)
}

pub(super) async fn create(
    State(state): State<AppState>,
    auth: AuthContext,
    ApiJson(payload): ApiJson<FolderPayload>,
) -> Result<(StatusCode, Json<Value>), ApiError> {
    let folder = state
        .services
        .note_folders
        .create(&auth.user_id, payload)
        .await?;
    Ok((StatusCode::CREATED, envelope("folder", folder)?))
}

pub(super) async fn rename(
    State(state): State<AppState>,
    auth: AuthContext,
    Path(id): Path<String>,
    ApiJson(payload): ApiJson<FolderPayload>,
) -> Result<Json<Value>, ApiError> {
    let id = path_id(&id, ResourceKind::NoteFolder)?;
    let folder = state
        .services
        .note_folders
        .rename(&auth.user_id, id, payload)
        .await?;
    envelope("folder", folder)
}

pub(super) async fn delete(
    State(state): State<AppState>,
    auth: AuthContext,
    Path(id): Path<String>,
) -> Result<Json<Value>, ApiError> {
    let id = path_id(&id, ResourceKind::NoteFolder)?;
    let report = state.services.note_folders.delete(&auth.user_id, id).await?;
    let removed = serde_json::to_value(report)
        .map_err(|e| ApiError::internal(format!("encoding response: {e}")))?;
    Ok(confirmation(
        "Folder and its notes deleted",
        Some(("removed", removed)),
    ))
}
