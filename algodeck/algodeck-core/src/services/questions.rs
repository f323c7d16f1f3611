use super::question_folders::accepts_questions;
use super::validate::{self, QUESTION_TITLE_MAX};
use crate::error::{ResourceKind, ServiceError, ServiceResult};
use crate::models::{NewQuestion, Question, QuestionFolder, QuestionPatch, QuestionQuery};
use crate::search::SearchKind;
use crate::storage::{SharedStore, Store};
use chrono::Utc;
use std::collections::HashSet;
use uuid::Uuid;

#[derive(Clone)]
pub struct QuestionService {
    store: SharedStore,
}

impl QuestionService {
    pub fn new(store: SharedStore) -> Self {
        Self { store }
    }

    /// The owner's questions matching every supplied filter, in question
    /// number order.
    pub async fn list(&self, owner: &str, query: &QuestionQuery) -> ServiceResult<Vec<Question>> {
        let store = self.store.read().await;
        let hits: Option<HashSet<Uuid>> = match query.search.as_deref().map(str::trim) {
            Some(text) if !text.is_empty() => Some(
                store
                    .search(owner, SearchKind::Question, text)?
                    .into_iter()
                    .collect(),
            ),
            _ => None,
        };
        let mut questions: Vec<Question> = store
            .scan::<Question>(owner)
            .filter(|q| query.folder_id.map_or(true, |f| q.folder_id == f))
            .filter(|q| query.difficulty.map_or(true, |d| q.difficulty == d))
            .filter(|q| query.completed.map_or(true, |c| q.is_completed() == c))
            .filter(|q| hits.as_ref().map_or(true, |h| h.contains(&q.id)))
            .cloned()
            .collect();
        sort_questions(&mut questions);
        Ok(questions)
    }

    pub async fn get(&self, owner: &str, id: Uuid) -> ServiceResult<Question> {
        let store = self.store.read().await;
        find(&store, owner, id).cloned()
    }

    pub async fn create(&self, owner: &str, payload: NewQuestion) -> ServiceResult<Question> {
        let title = validate::required("Title", payload.title.as_deref(), QUESTION_TITLE_MAX)?;
        let folder_id = payload
            .folder_id
            .ok_or_else(|| ServiceError::validation("Folder ID is required"))?;
        let mut question = Question::new(owner, folder_id, title);
        question.question_number = payload.question_number.unwrap_or_default();
        question.difficulty = payload.difficulty.unwrap_or_default();
        question.link = payload.link.map(|l| l.trim().to_string()).unwrap_or_default();
        question.tags = validate::tags(payload.tags.unwrap_or_default());
        question.notes = payload.notes.unwrap_or_default();

        let mut store = self.store.write().await;
        ensure_folder(&store, owner, folder_id)?;
        store.put(question.clone())?;
        tracing::debug!(question = %question.id, folder = %folder_id, "question created");
        Ok(question)
    }

    pub async fn update(
        &self,
        owner: &str,
        id: Uuid,
        patch: QuestionPatch,
    ) -> ServiceResult<Question> {
        let mut store = self.store.write().await;
        let mut question = find(&store, owner, id)?.clone();
        if let Some(title) = patch.title.as_deref() {
            question.title = validate::required("Title", Some(title), QUESTION_TITLE_MAX)?;
        }
        if let Some(number) = patch.question_number {
            question.question_number = number;
        }
        if let Some(difficulty) = patch.difficulty {
            question.difficulty = difficulty;
        }
        if let Some(link) = patch.link {
            question.link = link.trim().to_string();
        }
        if let Some(tags) = patch.tags {
            question.tags = validate::tags(tags);
        }
        if let Some(notes) = patch.notes {
            question.notes = notes;
        }
        if let Some(folder_id) = patch.folder_id {
            ensure_folder(&store, owner, folder_id)?;
            question.folder_id = folder_id;
        }
        question.updated_at = Utc::now();
        store.put(question.clone())?;
        Ok(question)
    }

    /// Flip completion as one read-modify-write under the store lock.
    pub async fn toggle_complete(&self, owner: &str, id: Uuid) -> ServiceResult<Question> {
        let mut store = self.store.write().await;
        let mut question = find(&store, owner, id)?.clone();
        question.toggle_completion(Utc::now());
        store.put(question.clone())?;
        Ok(question)
    }

    pub async fn delete(&self, owner: &str, id: Uuid) -> ServiceResult<Question> {
        let mut store = self.store.write().await;
        store
            .remove::<Question>(owner, id)?
            .ok_or_else(|| ServiceError::not_found(ResourceKind::Question))
    }
}

/// Question number ascending, then creation order, ties broken by id.
pub fn sort_questions(questions: &mut [Question]) {
    questions.sort_by(|a, b| {
        a.question_number
            .cmp(&b.question_number)
            .then(a.created_at.cmp(&b.created_at))
            .then(a.id.cmp(&b.id))
    });
}

fn find<'a>(store: &'a Store, owner: &str, id: Uuid) -> ServiceResult<&'a Question> {
    store
        .get::<Question>(owner, id)
        .ok_or_else(|| ServiceError::not_found(ResourceKind::Question))
}

/// Questions may be filed in a top-level folder or in a subfolder whose
/// parent still exists.
fn ensure_folder(store: &Store, owner: &str, folder_id: Uuid) -> ServiceResult<()> {
    match store.get::<QuestionFolder>(owner, folder_id) {
        Some(folder) if accepts_questions(store, folder) => Ok(()),
        _ => Err(ServiceError::validation("Folder ID does not refer to a folder")),
    }
}
