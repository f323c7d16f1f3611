use super::error::{confirmation, envelope, folder_filter, path_id};
use super::{ApiError, ApiJson, AppState, AuthContext};
use algodeck_core::{
    models::{Difficulty, NewQuestion, QuestionPatch, QuestionQuery},
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
    difficulty: Option<String>,
    completed: Option<String>,
    search: Option<String>,
}

impl ListParams {
    fn into_query(self) -> Result<QuestionQuery, ApiError> {
        let difficulty = match self.difficulty.as_deref().map(str::trim) {
            None | Some("") | Some("all") => None,
            Some(raw) => Some(
                raw.parse::<Difficulty>()
                    .map_err(|_| ApiError::bad_request("Invalid difficulty"))?,
            ),
        };
        Ok(QuestionQuery {
            folder_id: folder_filter(self.folder_id.as_deref())?,
            difficulty,
            // anything but "true" asks for incomplete questions
            completed: self.completed.map(|c| c == "true"),
            search: self.search,
        })
    }
}

pub(super) async fn list(
    State(state): State<AppState>,
    auth: AuthContext,
    Query(params): Query<ListParams>,
) -> Result<Json<Value>, ApiError> {
    let query = params.into_query()?;
    let questions = state.services.questions.list(&auth.user_id, &query).await?;
    envelope("questions", questions)
}

pub(super) async fn stats(
    State(state): State<AppState>,
    auth: AuthContext,
) -> Result<Json<Value>, ApiError> {
    let stats = state.services.stats.stats(&auth.user_id).await;
    envelope("stats", stats)
}

pub(super) async fn get(
    State(state): State<AppState>,
    auth: AuthContext,
    Path(id): Path<String>,
) -> Result<Json<Value>, ApiError> {
    let id = path_id(&id, ResourceKind::Question)?;
    let question = state.services.questions.get(&auth.user_id, id).await?;
    envelope("question", question)
}

pub(super) async fn create(
    State(state): State<AppState>,
    auth: AuthContext,
    ApiJson(payload): ApiJson<NewQuestion>,
) -> Result<(StatusCode, Json<Value>), ApiError> {
    let question = state
        .services
        .questions
        .create(&auth.user_id, payload)
        .await?;
    Ok((StatusCode::CREATED, envelope("question", question)?))
}

pub(super) async fn update(
    State(state): State<AppState>,
    auth: AuthContext,
    Path(id): Path<String>,
    ApiJson(patch): ApiJson<QuestionPatch>,
) -> Result<Json<Value>, ApiError> {
    let id = path_id(&id, ResourceKind::Question)?;
    let question = state
        .services
        .questions
        .update(&auth.user_id, id, patch)
        .await?;
    envelope("question", question)
}

pub(super) async fn toggle_complete(
    State(state): State<AppState>,
    auth: AuthContext,
    Path(id): Path<String>,
) -> Result<Json<Value>, ApiError> {
    let id = path_id(&id, ResourceKind::Question)?;
    let question = state
        .services
        .questions
        .toggle_complete(&auth.user_id, id)
        .await?;
    envelope("question", question)
}

pub(super) async fn delete(
    State(state): State<AppState>,
    auth: AuthContext,
    Path(id): Path<String>,
) -> Result<Json<Value>, ApiError> {
    let id = path_id(&id, ResourceKind::Question)?;
    state.services.questions.delete(&auth.user_id, id).await?;
    Ok(confirmation("Question deleted", None))
}

#[cfg(test)]
mod tests {
    use super::*;

    fn params(difficulty: Option<&str>, completed: Option<&str>) -> ListParams {
        ListParams {
            difficulty: difficulty.map(String::from),
            completed: completed.map(String::from),
            ..Default::default()
        }
    }

    #[test]
    fn difficulty_all_means_no_filter() {
        let query = params(Some("all"), None).into_query().unwrap();
        assert_eq!(query.difficulty, None);
        let query = params(Some("hard"), None).into_query().unwrap();
        assert_eq!(query.difficulty, Some(Difficulty::Hard));
        let err = params(Some("brutal"), None).into_query().unwrap_err();
        assert_eq!(err.status(), StatusCode::BAD_REQUEST);
    }

    #[test]
    fn completed_is_true_only_for_true() {
        assert_eq!(params(None, Some("true")).into_query().unwrap().completed, Some(true));
        assert_eq!(params(None, Some("no")).into_query().unwrap().completed, Some(false));
        assert_eq!(params(None, None).into_query().unwrap().completed, None);
    }
}
