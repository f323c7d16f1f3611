use super::AppState;
use algodeck_core::{ResourceKind, ServiceError};
use axum::{
    extract::{rejection::JsonRejection, FromRequest, State},
    http::StatusCode,
    response::{IntoResponse, Response},
    Json,
};
use serde::Serialize;
use serde_json::{json, Map, Value};
use uuid::Uuid;

/// A failed request, rendered as `{"error": message}`.
#[derive(Debug)]
pub struct ApiError {
    status: StatusCode,
    message: String,
    detail: Option<String>,
}

/// Failure detail carried on a 500 response until the debug middleware
/// decides whether to expose it.
#[derive(Clone)]
pub(super) struct ErrorDetail {
    error: String,
    detail: String,
}

impl ApiError {
    pub fn new(status: StatusCode, message: impl Into<String>) -> Self {
        Self {
            status,
            message: message.into(),
            detail: None,
        }
    }

    pub fn bad_request(message: impl Into<String>) -> Self {
        Self::new(StatusCode::BAD_REQUEST, message)
    }

    pub fn not_found(kind: ResourceKind) -> Self {
        Self::new(StatusCode::NOT_FOUND, format!("{kind} not found"))
    }

    pub fn route_not_found() -> Self {
        Self::new(StatusCode::NOT_FOUND, "Route not found")
    }

    pub fn unauthorized() -> Self {
        Self::new(StatusCode::UNAUTHORIZED, "Unauthorized")
    }

    pub fn internal(detail: impl Into<String>) -> Self {
        Self {
            status: StatusCode::INTERNAL_SERVER_ERROR,
            message: "Internal server error".into(),
            detail: Some(detail.into()),
        }
    }

    pub fn status(&self) -> StatusCode {
        self.status
    }
}

impl IntoResponse for ApiError {
    fn into_response(self) -> Response {
        let mut response = (self.status, Json(json!({ "error": self.message }))).into_response();
        if let Some(detail) = self.detail {
            response.extensions_mut().insert(ErrorDetail {
                error: self.message,
                detail,
            });
        }
        response
    }
}

impl From<ServiceError> for ApiError {
    fn from(err: ServiceError) -> Self {
        match err {
            ServiceError::Validation(message) => {
                tracing::debug!(%message, "rejected request");
                Self::bad_request(message)
            }
            ServiceError::NotFound { kind } => {
                tracing::debug!(%kind, "resource not found");
                Self::not_found(kind)
            }
            err @ ServiceError::CascadeIncomplete { .. } => {
                tracing::error!(error = ?err, "cascade left dependents behind");
                Self::internal(err.to_string())
            }
            ServiceError::Unavailable(source) => {
                tracing::error!(error = %format!("{source:#}"), "store failure");
                Self::internal(format!("{source:#}"))
            }
        }
    }
}

impl From<JsonRejection> for ApiError {
    fn from(rejection: JsonRejection) -> Self {
        tracing::debug!(error = %rejection.body_text(), "malformed request body");
        Self::bad_request(rejection.body_text())
    }
}

/// `Json` whose rejection is rendered as an [`ApiError`].
#[derive(FromRequest)]
#[from_request(via(axum::Json), rejection(ApiError))]
pub struct ApiJson<T>(pub T);

/// Rewrites 500 bodies to include their detail when debug errors are on.
pub(super) async fn attach_error_detail(
    State(state): State<AppState>,
    mut response: Response,
) -> Response {
    let Some(ErrorDetail { error, detail }) = response.extensions_mut().remove::<ErrorDetail>()
    else {
        return response;
    };
    if !state.debug_errors {
        return response;
    }
    (
        response.status(),
        Json(json!({ "error": error, "message": detail })),
    )
        .into_response()
}

/// `{"success": true, key: value}`.
pub(super) fn envelope<T: Serialize>(key: &str, value: T) -> Result<Json<Value>, ApiError> {
    let value = serde_json::to_value(value)
        .map_err(|e| ApiError::internal(format!("encoding response: {e}")))?;
    let mut body = Map::new();
    body.insert("success".into(), Value::Bool(true));
    body.insert(key.into(), value);
    Ok(Json(Value::Object(body)))
}

/// `{"success": true, "message": message}` plus any extra fields.
pub(super) fn confirmation(message: &str, extra: Option<(&str, Value)>) -> Json<Value> {
    let mut body = Map::new();
    body.insert("success".into(), Value::Bool(true));
    body.insert("message".into(), Value::String(message.into()));
    if let Some((key, value)) = extra {
        body.insert(key.into(), value);
    }
    Json(Value::Object(body))
}

/// Path ids that are not UUIDs cannot name anything.
pub(super) fn path_id(raw: &str, kind: ResourceKind) -> Result<Uuid, ApiError> {
    Uuid::parse_str(raw).map_err(|_| ApiError::not_found(kind))
}

/// Query-string folder filter; blank means no filter.
pub(super) fn folder_filter(raw: Option<&str>) -> Result<Option<Uuid>, ApiError> {
    match raw.map(str::trim).filter(|s| !s.is_empty()) {
        None => Ok(None),
        Some(s) => Uuid::parse_str(s)
            .map(Some)
            .map_err(|_| ApiError::bad_request("Invalid folder ID")),
    }
}
