//! Typed calls against the HTTP API. Every call unwraps the
//! `{"success": true, <key>: value}` envelope or turns `{"error": ...}` into
//! [`ClientError::Api`].

use crate::error::ClientError;
use algodeck_core::models::{
    FolderPayload, NewNote, NewQuestion, Note, NoteFolderView, NotePatch, NoteQuery, Question,
    QuestionFolderView, QuestionPatch, QuestionQuery, QuestionStats,
};
use reqwest::{Method, RequestBuilder, Response};
use serde::de::DeserializeOwned;
use serde_json::Value;
use uuid::Uuid;

#[derive(Clone, Debug)]
pub struct ApiClient {
    client: reqwest::Client,
    base_url: String,
    token: Option<String>,
}

impl ApiClient {
    pub fn new(base_url: impl Into<String>) -> Self {
        Self {
            client: reqwest::Client::new(),
            base_url: base_url.into().trim_end_matches('/').to_string(),
            token: None,
        }
    }

    pub fn set_token(&mut self, token: Option<String>) {
        self.token = token;
    }

    pub async fn health(&self) -> Result<(), ClientError> {
        let resp = self.request(Method::GET, "/health").send().await?;
        check(resp).await.map(|_| ())
    }

    pub async fn list_note_folders(&self) -> Result<Vec<NoteFolderView>, ClientError> {
        self.fetch(self.request(Method::GET, "/note-folders"), "folders")
            .await
    }

    pub async fn create_note_folder(&self, name: &str) -> Result<NoteFolderView, ClientError> {
        let req = self
            .request(Method::POST, "/note-folders")
            .json(&FolderPayload::named(name));
        self.fetch(req, "folder").await
    }

    pub async fn rename_note_folder(
        &self,
        id: Uuid,
        name: &str,
    ) -> Result<NoteFolderView, ClientError> {
        let req = self
            .request(Method::PATCH, &format!("/note-folders/{id}"))
            .json(&FolderPayload::named(name));
        self.fetch(req, "folder").await
    }

    pub async fn delete_note_folder(&self, id: Uuid) -> Result<(), ClientError> {
        self.send(self.request(Method::DELETE, &format!("/note-folders/{id}")))
            .await
    }

    pub async fn list_notes(&self, query: &NoteQuery) -> Result<Vec<Note>, ClientError> {
        let mut params = Vec::new();
        if let Some(folder_id) = query.folder_id {
            params.push(("folderId", folder_id.to_string()));
        }
        if let Some(search) = &query.search {
            params.push(("search", search.clone()));
        }
        let req = self.request(Method::GET, "/notes").query(&params);
        self.fetch(req, "notes").await
    }

    pub async fn get_note(&self, id: Uuid) -> Result<Note, ClientError> {
        self.fetch(self.request(Method::GET, &format!("/notes/{id}")), "note")
            .await
    }

    pub async fn create_note(&self, note: &NewNote) -> Result<Note, ClientError> {
        self.fetch(self.request(Method::POST, "/notes").json(note), "note")
            .await
    }

    pub async fn update_note(&self, id: Uuid, patch: &NotePatch) -> Result<Note, ClientError> {
        let req = self.request(Method::PATCH, &format!("/notes/{id}")).json(patch);
        self.fetch(req, "note").await
    }

    pub async fn toggle_note_pin(&self, id: Uuid) -> Result<Note, ClientError> {
        let req = self.request(Method::PATCH, &format!("/notes/{id}/pin"));
        self.fetch(req, "note").await
    }

    pub async fn delete_note(&self, id: Uuid) -> Result<(), ClientError> {
        self.send(self.request(Method::DELETE, &format!("/notes/{id}")))
            .await
    }

    pub async fn list_question_folders(&self) -> Result<Vec<QuestionFolderView>, ClientError> {
        self.fetch(self.request(Method::GET, "/question-folders"), "folders")
            .await
    }

    pub async fn create_question_folder(
        &self,
        name: &str,
    ) -> Result<QuestionFolderView, ClientError> {
        let req = self
            .request(Method::POST, "/question-folders")
            .json(&FolderPayload::named(name));
        self.fetch(req, "folder").await
    }

    /// Returns the parent folder with the new subfolder embedded.
    pub async fn add_subfolder(
        &self,
        parent: Uuid,
        name: &str,
    ) -> Result<QuestionFolderView, ClientError> {
        let req = self
            .request(Method::POST, &format!("/question-folders/{parent}/subfolders"))
            .json(&FolderPayload::named(name));
        self.fetch(req, "folder").await
    }

    pub async fn rename_question_folder(
        &self,
        id: Uuid,
        name: &str,
    ) -> Result<QuestionFolderView, ClientError> {
        let req = self
            .request(Method::PATCH, &format!("/question-folders/{id}"))
            .json(&FolderPayload::named(name));
        self.fetch(req, "folder").await
    }

    pub async fn delete_question_folder(&self, id: Uuid) -> Result<(), ClientError> {
        self.send(self.request(Method::DELETE, &format!("/question-folders/{id}")))
            .await
    }

    pub async fn list_questions(&self, query: &QuestionQuery) -> Result<Vec<Question>, ClientError> {
        let mut params = Vec::new();
        if let Some(folder_id) = query.folder_id {
            params.push(("folderId", folder_id.to_string()));
        }
        if let Some(difficulty) = query.difficulty {
            params.push(("difficulty", difficulty.to_string()));
        }
        if let Some(completed) = query.completed {
            params.push(("completed", completed.to_string()));
        }
        if let Some(search) = &query.search {
            params.push(("search", search.clone()));
        }
        let req = self.request(Method::GET, "/questions").query(&params);
        self.fetch(req, "questions").await
    }

    pub async fn create_question(&self, question: &NewQuestion) -> Result<Question, ClientError> {
        let req = self.request(Method::POST, "/questions").json(question);
        self.fetch(req, "question").await
    }

    pub async fn update_question(
        &self,
        id: Uuid,
        patch: &QuestionPatch,
    ) -> Result<Question, ClientError> {
        let req = self
            .request(Method::PATCH, &format!("/questions/{id}"))
            .json(patch);
        self.fetch(req, "question").await
    }

    pub async fn toggle_question_complete(&self, id: Uuid) -> Result<Question, ClientError> {
        let req = self.request(Method::PATCH, &format!("/questions/{id}/complete"));
        self.fetch(req, "question").await
    }

    pub async fn delete_question(&self, id: Uuid) -> Result<(), ClientError> {
        self.send(self.request(Method::DELETE, &format!("/questions/{id}")))
            .await
    }

    pub async fn stats(&self) -> Result<QuestionStats, ClientError> {
        self.fetch(self.request(Method::GET, "/questions/stats"), "stats")
            .await
    }

    fn request(&self, method: Method, path: &str) -> RequestBuilder {
        let req = self
            .client
            .request(method, format!("{}{}", self.base_url, path));
        match &self.token {
            Some(token) => req.bearer_auth(token),
            None => req,
        }
    }

    async fn fetch<T: DeserializeOwned>(
        &self,
        req: RequestBuilder,
        key: &str,
    ) -> Result<T, ClientError> {
        let mut body = check(req.send().await?).await?;
        let value = body
            .get_mut(key)
            .map(Value::take)
            .ok_or_else(|| ClientError::Decode(format!("response has no '{key}'")))?;
        serde_json::from_value(value).map_err(|e| ClientError::Decode(e.to_string()))
    }

    async fn send(&self, req: RequestBuilder) -> Result<(), ClientError> {
        check(req.send().await?).await.map(|_| ())
    }
}

/// The JSON body of a successful response, or the server's error.
async fn check(resp: Response) -> Result<Value, ClientError> {
    let status = resp.status();
    let body: Value = match resp.json().await {
        Ok(body) => body,
        Err(e) if status.is_success() => return Err(ClientError::Decode(e.to_string())),
        Err(_) => Value::Null,
    };
    if status.is_success() {
        return Ok(body);
    }
    let message = body
        .get("error")
        .and_then(Value::as_str)
        .map(String::from)
        .unwrap_or_else(|| status.canonical_reason().unwrap_or("request failed").to_string());
    Err(ClientError::Api {
        status: status.as_u16(),
        message,
    })
}
