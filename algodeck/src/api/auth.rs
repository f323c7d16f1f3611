use super::{ApiError, AppState};
use axum::{extract::FromRequestParts, http::request::Parts};

/// The caller, resolved by the identity gate.
#[derive(Clone, Debug)]
pub struct AuthContext {
    pub user_id: String,
}

impl FromRequestParts<AppState> for AuthContext {
    type Rejection = ApiError;

    async fn from_request_parts(
        parts: &mut Parts,
        state: &AppState,
    ) -> Result<Self, Self::Rejection> {
        let header = |name: &str| parts.headers.get(name).and_then(|v| v.to_str().ok());
        match state
            .gate
            .authenticate(header("Authorization"), header("X-User-Id"))
            .await
        {
            Some(identity) => Ok(Self {
                user_id: identity.user_id,
            }),
            None => {
                tracing::debug!(path = %parts.uri.path(), "unauthenticated request");
                Err(ApiError::unauthorized())
            }
        }
    }
}
