//! HTTP API over the resource services.
//!
//! Every resource route requires an [`AuthContext`]; `/health` does not.
//! Successful responses are `{"success": true, <key>: value}` and failures
//! are `{"error": message}`.

mod auth;
mod error;
mod note_folders;
mod notes;
mod question_folders;
mod questions;

pub use auth::AuthContext;
pub use error::{ApiError, ApiJson};

use algodeck_core::{auth::IdentityGate, Services};
use axum::{
    middleware,
    routing::{get, patch, post},
    Json, Router,
};
use serde_json::{json, Value};

/// Shared handler state. The identity gate is built once before the router.
#[derive(Clone)]
pub struct AppState {
    pub services: Services,
    pub gate: IdentityGate,
    pub debug_errors: bool,
}

impl AppState {
    pub fn new(services: Services, gate: IdentityGate) -> Self {
        Self {
            services,
            gate,
            debug_errors: false,
        }
    }

    pub fn with_debug_errors(mut self, debug_errors: bool) -> Self {
        self.debug_errors = debug_errors;
        self
    }
}

pub fn router(state: AppState) -> Router {
    Router::new()
        .route("/health", get(health))
        .route(
            "/note-folders",
            get(note_folders::list).post(note_folders::create),
        )
        .route(
            "/note-folders/{id}",
            get(note_folders::get)
                .patch(note_folders::rename)
                .delete(note_folders::delete),
        )
        .route("/notes", get(notes::list).post(notes::create))
        .route(
            "/notes/{id}",
            get(notes::get).patch(notes::update).delete(notes::delete),
        )
        .route("/notes/{id}/pin", patch(notes::toggle_pin))
        .route(
            "/question-folders",
            get(question_folders::list).post(question_folders::create),
        )
        .route(
            "/question-folders/{id}",
            get(question_folders::get)
                .patch(question_folders::rename)
                .delete(question_folders::delete),
        )
        .route(
            "/question-folders/{id}/subfolders",
            post(question_folders::add_subfolder),
        )
        .route("/questions", get(questions::list).post(questions::create))
        .route("/questions/stats", get(questions::stats))
        .route(
            "/questions/{id}",
            get(questions::get)
                .patch(questions::update)
                .delete(questions::delete),
        )
        .route("/questions/{id}/complete", patch(questions::toggle_complete))
        .fallback(not_found)
        .layer(middleware::map_response_with_state(
            state.clone(),
            error::attach_error_detail,
        ))
        .with_state(state)
}

async fn health() -> Json<Value> {
    Json(json!({ "status": "ok" }))
}

async fn not_found() -> ApiError {
    ApiError::route_not_found()
}
