//! Session-local mirror of the caller's records.
//!
//! Collections only change when the server confirms a mutation: the entity
//! it returns is folded in (insert, replace by id, or remove by id). A failed
//! call leaves every collection as it was and is kept in `last_error`.
//! Nothing is retried; [`DataCache::refresh_data`] re-fetches everything.

use crate::api::ApiClient;
use crate::error::ClientError;
use crate::session::Session;
use algodeck_core::models::{
    completion_rate, Difficulty, NewNote, NewQuestion, Note, NoteFolderView, NotePatch,
    NoteQuery, Question, QuestionFolderView, QuestionPatch, QuestionQuery, QuestionStats,
};
use chrono::{DateTime, Utc};
use serde::Serialize;
use uuid::Uuid;

/// Totals over the cached collections.
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct LocalStats {
    pub total_notes: usize,
    pub total_questions: usize,
    pub completed_questions: usize,
    pub completion_rate: u32,
}

#[derive(Clone, Copy, Debug, PartialEq, Eq, Serialize)]
#[serde(rename_all = "lowercase")]
pub enum ActivityKind {
    Note,
    Question,
}

/// A recently edited note or a completed question.
#[derive(Clone, Debug, PartialEq, Eq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct ActivityItem {
    pub kind: ActivityKind,
    pub id: Uuid,
    pub title: String,
    pub folder_id: Uuid,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub difficulty: Option<Difficulty>,
    pub at: DateTime<Utc>,
}

trait Keyed {
    fn key(&self) -> Uuid;
}

impl Keyed for NoteFolderView {
    fn key(&self) -> Uuid {
        self.folder.id
    }
}

impl Keyed for Note {
    fn key(&self) -> Uuid {
        self.id
    }
}

impl Keyed for QuestionFolderView {
    fn key(&self) -> Uuid {
        self.id
    }
}

impl Keyed for Question {
    fn key(&self) -> Uuid {
        self.id
    }
}

fn upsert<T: Keyed>(items: &mut Vec<T>, item: T) {
    match items.iter_mut().find(|i| i.key() == item.key()) {
        Some(slot) => *slot = item,
        None => items.push(item),
    }
}

fn remove<T: Keyed>(items: &mut Vec<T>, id: Uuid) -> Option<T> {
    let pos = items.iter().position(|i| i.key() == id)?;
    Some(items.remove(pos))
}

fn record(last_error: &mut Option<String>, err: ClientError) -> ClientError {
    tracing::warn!(error = %err, "request failed");
    *last_error = Some(err.to_string());
    err
}

pub struct DataCache {
    api: ApiClient,
    session: Session,
    note_folders: Vec<NoteFolderView>,
    notes: Vec<Note>,
    question_folders: Vec<QuestionFolderView>,
    questions: Vec<Question>,
    last_error: Option<String>,
}

impl DataCache {
    pub fn new(api: ApiClient) -> Self {
        Self {
            api,
            session: Session::SignedOut,
            note_folders: Vec::new(),
            notes: Vec::new(),
            question_folders: Vec::new(),
            questions: Vec::new(),
            last_error: None,
        }
    }

    pub fn session(&self) -> &Session {
        &self.session
    }

    pub fn note_folders(&self) -> &[NoteFolderView] {
        &self.note_folders
    }

    pub fn notes(&self) -> &[Note] {
        &self.notes
    }

    pub fn question_folders(&self) -> &[QuestionFolderView] {
        &self.question_folders
    }

    pub fn questions(&self) -> &[Question] {
        &self.questions
    }

    pub fn last_error(&self) -> Option<&str> {
        self.last_error.as_deref()
    }

    /// Adopt `session` and load everything it can see. A degraded session is
    /// kept but nothing is fetched.
    pub async fn sign_in(&mut self, session: Session) -> Result<(), ClientError> {
        self.clear();
        self.api.set_token(session.token().map(String::from));
        self.session = session;
        match &self.session {
            Session::Authenticated { user_id, .. } => {
                tracing::info!(user = %user_id, "signed in");
                self.refresh_data().await
            }
            Session::Degraded { reason, .. } => {
                let err = ClientError::Degraded(reason.clone());
                self.last_error = Some(err.to_string());
                Err(err)
            }
            Session::SignedOut => Ok(()),
        }
    }

    pub fn sign_out(&mut self) {
        self.clear();
        self.api.set_token(None);
        self.session = Session::SignedOut;
    }

    /// Fetch all four collections concurrently. Each successful fetch
    /// replaces its collection; the first failure is returned.
    pub async fn refresh_data(&mut self) -> Result<(), ClientError> {
        self.ready()?;
        let api = &self.api;
        let note_query = NoteQuery::default();
        let question_query = QuestionQuery::default();
        let (note_folders, notes, question_folders, questions) = tokio::join!(
            api.list_note_folders(),
            api.list_notes(&note_query),
            api.list_question_folders(),
            api.list_questions(&question_query),
        );

        let mut first_error = None;
        match note_folders {
            Ok(v) => self.note_folders = v,
            Err(e) => first_error = first_error.or(Some(e)),
        }
        match notes {
            Ok(v) => self.notes = v,
            Err(e) => first_error = first_error.or(Some(e)),
        }
        match question_folders {
            Ok(v) => self.question_folders = v,
            Err(e) => first_error = first_error.or(Some(e)),
        }
        match questions {
            Ok(v) => self.questions = v,
            Err(e) => first_error = first_error.or(Some(e)),
        }
        match first_error {
            None => {
                self.last_error = None;
                tracing::debug!(
                    note_folders = self.note_folders.len(),
                    notes = self.notes.len(),
                    question_folders = self.question_folders.len(),
                    questions = self.questions.len(),
                    "cache refreshed"
                );
                Ok(())
            }
            Some(e) => Err(self.fail(e)),
        }
    }

    pub async fn add_note_folder(&mut self, name: &str) -> Result<NoteFolderView, ClientError> {
        self.ready()?;
        let folder = self
            .api
            .create_note_folder(name)
            .await
            .map_err(|e| record(&mut self.last_error, e))?;
        upsert(&mut self.note_folders, folder.clone());
        Ok(folder)
    }

    pub async fn rename_note_folder(
        &mut self,
        id: Uuid,
        name: &str,
    ) -> Result<NoteFolderView, ClientError> {
        self.ready()?;
        let folder = self
            .api
            .rename_note_folder(id, name)
            .await
            .map_err(|e| record(&mut self.last_error, e))?;
        upsert(&mut self.note_folders, folder.clone());
        Ok(folder)
    }

    /// Removes the folder and every cached note filed in it.
    pub async fn delete_note_folder(&mut self, id: Uuid) -> Result<(), ClientError> {
        self.ready()?;
        self.api
            .delete_note_folder(id)
            .await
            .map_err(|e| record(&mut self.last_error, e))?;
        remove(&mut self.note_folders, id);
        self.notes.retain(|n| n.folder_id != id);
        Ok(())
    }

    pub async fn add_note(&mut self, note: &NewNote) -> Result<Note, ClientError> {
        self.ready()?;
        let note = self.api.create_note(note).await.map_err(|e| record(&mut self.last_error, e))?;
        self.bump_note_count(note.folder_id, 1);
        upsert(&mut self.notes, note.clone());
        Ok(note)
    }

    pub async fn update_note(&mut self, id: Uuid, patch: &NotePatch) -> Result<Note, ClientError> {
        self.ready()?;
        let note = self
            .api
            .update_note(id, patch)
            .await
            .map_err(|e| record(&mut self.last_error, e))?;
        let previous = self.notes.iter().find(|n| n.id == id).map(|n| n.folder_id);
        if let Some(from) = previous.filter(|from| *from != note.folder_id) {
            self.bump_note_count(from, -1);
            self.bump_note_count(note.folder_id, 1);
        }
        upsert(&mut self.notes, note.clone());
        Ok(note)
    }

    pub async fn toggle_note_pin(&mut self, id: Uuid) -> Result<Note, ClientError> {
        self.ready()?;
        let note = self
            .api
            .toggle_note_pin(id)
            .await
            .map_err(|e| record(&mut self.last_error, e))?;
        upsert(&mut self.notes, note.clone());
        Ok(note)
    }

    pub async fn delete_note(&mut self, id: Uuid) -> Result<(), ClientError> {
        self.ready()?;
        self.api.delete_note(id).await.map_err(|e| record(&mut self.last_error, e))?;
        if let Some(note) = remove(&mut self.notes, id) {
            self.bump_note_count(note.folder_id, -1);
        }
        Ok(())
    }

    pub async fn add_question_folder(
        &mut self,
        name: &str,
    ) -> Result<QuestionFolderView, ClientError> {
        self.ready()?;
        let folder = self
            .api
            .create_question_folder(name)
            .await
            .map_err(|e| record(&mut self.last_error, e))?;
        upsert(&mut self.question_folders, folder.clone());
        Ok(folder)
    }

    /// Returns the parent folder as the server now sees it.
    pub async fn add_subfolder(
        &mut self,
        parent: Uuid,
        name: &str,
    ) -> Result<QuestionFolderView, ClientError> {
        self.ready()?;
        let folder = self
            .api
            .add_subfolder(parent, name)
            .await
            .map_err(|e| record(&mut self.last_error, e))?;
        upsert(&mut self.question_folders, folder.clone());
        Ok(folder)
    }

    pub async fn rename_question_folder(
        &mut self,
        id: Uuid,
        name: &str,
    ) -> Result<QuestionFolderView, ClientError> {
        self.ready()?;
        let folder = self
            .api
            .rename_question_folder(id, name)
            .await
            .map_err(|e| record(&mut self.last_error, e))?;
        upsert(&mut self.question_folders, folder.clone());
        Ok(folder)
    }

    /// Removes the folder and every cached question filed in it or in one of
    /// the subfolders the cache knew about.
    pub async fn delete_question_folder(&mut self, id: Uuid) -> Result<(), ClientError> {
        self.ready()?;
        self.api
            .delete_question_folder(id)
            .await
            .map_err(|e| record(&mut self.last_error, e))?;
        let targets = match remove(&mut self.question_folders, id) {
            Some(folder) => folder.folder_ids(),
            None => vec![id],
        };
        self.questions.retain(|q| !targets.contains(&q.folder_id));
        Ok(())
    }

    pub async fn add_question(&mut self, question: &NewQuestion) -> Result<Question, ClientError> {
        self.ready()?;
        let question = self
            .api
            .create_question(question)
            .await
            .map_err(|e| record(&mut self.last_error, e))?;
        upsert(&mut self.questions, question.clone());
        Ok(question)
    }

    pub async fn update_question(
        &mut self,
        id: Uuid,
        patch: &QuestionPatch,
    ) -> Result<Question, ClientError> {
        self.ready()?;
        let question = self
            .api
            .update_question(id, patch)
            .await
            .map_err(|e| record(&mut self.last_error, e))?;
        upsert(&mut self.questions, question.clone());
        Ok(question)
    }

    pub async fn toggle_question_complete(&mut self, id: Uuid) -> Result<Question, ClientError> {
        self.ready()?;
        let question = self
            .api
            .toggle_question_complete(id)
            .await
            .map_err(|e| record(&mut self.last_error, e))?;
        upsert(&mut self.questions, question.clone());
        Ok(question)
    }

    pub async fn delete_question(&mut self, id: Uuid) -> Result<(), ClientError> {
        self.ready()?;
        self.api.delete_question(id).await.map_err(|e| record(&mut self.last_error, e))?;
        remove(&mut self.questions, id);
        Ok(())
    }

    /// Stats as the server computes them, not from the cache.
    pub async fn server_stats(&mut self) -> Result<QuestionStats, ClientError> {
        self.ready()?;
        self.api.stats().await.map_err(|e| record(&mut self.last_error, e))
    }

    pub fn local_stats(&self) -> LocalStats {
        let completed = self.questions.iter().filter(|q| q.is_completed()).count();
        LocalStats {
            total_notes: self.notes.len(),
            total_questions: self.questions.len(),
            completed_questions: completed,
            completion_rate: completion_rate(completed, self.questions.len()),
        }
    }

    /// Notes by last update and completed questions by completion time,
    /// newest first.
    pub fn recent_activity(&self, limit: usize) -> Vec<ActivityItem> {
        let notes = self.notes.iter().map(|n| ActivityItem {
            kind: ActivityKind::Note,
            id: n.id,
            title: n.title.clone(),
            folder_id: n.folder_id,
            difficulty: None,
            at: n.updated_at,
        });
        let questions = self.questions.iter().filter_map(|q| {
            q.completed_at().map(|at| ActivityItem {
                kind: ActivityKind::Question,
                id: q.id,
                title: q.title.clone(),
                folder_id: q.folder_id,
                difficulty: Some(q.difficulty),
                at,
            })
        });
        let mut items: Vec<ActivityItem> = notes.chain(questions).collect();
        items.sort_by(|a, b| b.at.cmp(&a.at).then(a.id.cmp(&b.id)));
        items.truncate(limit);
        items
    }

    fn ready(&self) -> Result<(), ClientError> {
        match &self.session {
            Session::Authenticated { .. } => Ok(()),
            Session::Degraded { reason, .. } => Err(ClientError::Degraded(reason.clone())),
            Session::SignedOut => Err(ClientError::NotSignedIn),
        }
    }

    fn fail(&mut self, err: ClientError) -> ClientError {
        record(&mut self.last_error, err)
    }

    /// Counters never go below zero.
    fn bump_note_count(&mut self, folder: Uuid, delta: i64) {
        if let Some(view) = self.note_folders.iter_mut().find(|f| f.folder.id == folder) {
            view.note_count = if delta < 0 {
                view.note_count.saturating_sub(delta.unsigned_abs() as usize)
            } else {
                view.note_count + delta as usize
            };
        }
    }

    fn clear(&mut self) {
        self.note_folders.clear();
        self.notes.clear();
        self.question_folders.clear();
        self.questions.clear();
        self.last_error = None;
    }
}
