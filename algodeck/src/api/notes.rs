use super::error::{confirmation, envelope, folder_filter, path_id};
use super::{ApiError, ApiJson, AppState, AuthContext};
use algodeck_core::{
    models::{NewNote, NotePatch, NoteQuery},
    ResourceKind,
};
use axum::{
    extract::{Path, Query, State},
    http::StatusCode,
    Json,
};
use serde::Deserialize;
use serde_json::Value;

#[derive(Debug, Default, Deserialize)]
#[serde(rename_all = "camelCase")]
pub(super) struct ListParams {
    folder_id: Option<String>,
    search: Option<String>,
}

pub(super) async fn list(
    State(state): State<AppState>,
    auth: AuthContext,
    Query(params): Query<ListParams>,
) -> Result<Json<Value>, ApiError> {
    let query = NoteQuery {
        folder_id: folder_filter(params.folder_id.as_deref())?,
        search: params.search,
    };
    let notes = state.services.notes.list(&auth.user_id, &query).await?;
    envelope("notes", notes)
}

pub(super) async fn get(
    State(state): State<AppState>,
    auth: AuthContext,
    Path(id): Path<String>,
) -> Result<Json<Value>, ApiError> {
    let id = path_id(&id, ResourceKind::Note)?;
    let note = state.services.notes.get(&auth.user_id, id).await?;
    envelope("note", note)
}

pub(super) async fn create(
    State(state): State<AppState>,
    auth: AuthContext,
    ApiJson(payload): ApiJson<NewNote>,
) -> Result<(StatusCode, Json<Value>), ApiError> {
    let note = state.services.notes.create(&auth.user_id, payload).await?;
    Ok((StatusCode::CREATED, envelope("note", note)?))
}

pub(super) async fn update(
    State(state): State<AppState>,
    auth: AuthContext,
    Path(id): Path<String>,
    ApiJson(patch): ApiJson<NotePatch>,
) -> Result<Json<Value>, ApiError> {
    let id = path_id(&id, ResourceKind::Note)?;
    let note = state.services.notes.update(&auth.user_id, id, patch).await?;
    envelope("note", note)
}

pub(super) async fn toggle_pin(
    State(state): State<AppState>,
    auth: AuthContext,
    Path(id): Path<String>,
) -> Result<Json<Value>, ApiError> {
    let id = path_id(&id, ResourceKind::Note)?;
    let note = state.services.notes.toggle_pin(&auth.user_id, id).await?;
    envelope("note", note)
}

pub(super) async fn delete(
    State(state): State<AppState>,
    auth: AuthContext,
    Path(id): Path<String>,
) -> Result<Json<Value>, ApiError> {
    let id = path_id(&id, ResourceKind::Note)?;
    state.services.notes.delete(&auth.user_id, id).await?;
    Ok(confirmation("Note deleted", None))
}
