use crate::api::ApiClient;
use crate::error::ClientError;

/// Who the cache is working for.
///
/// A degraded session knows the user but has no reachable server behind it.
/// It is never treated as authenticated, so the cache neither fetches nor
/// mutates while in it.
#[derive(Clone, Debug, Default, PartialEq, Eq)]
pub enum Session {
    #[default]
    SignedOut,
    Authenticated {
        user_id: String,
        token: String,
    },
    Degraded {
        user_id: String,
        reason: String,
    },
}

impl Session {
    /// Probe the server and return an authenticated session, or a degraded
    /// one when the server cannot be reached.
    pub async fn establish(
        api: &ApiClient,
        user_id: impl Into<String>,
        token: impl Into<String>,
    ) -> Result<Session, ClientError> {
        let user_id = user_id.into();
        match api.health().await {
            Ok(()) => Ok(Session::Authenticated {
                user_id,
                token: token.into(),
            }),
            Err(ClientError::Transport(e)) => {
                tracing::warn!(error = %e, "server unreachable, session degraded");
                Ok(Session::Degraded {
                    user_id,
                    reason: e.to_string(),
                })
            }
            Err(e) => Err(e),
        }
    }

    pub fn is_authenticated(&self) -> bool {
        matches!(self, Session::Authenticated { .. })
    }

    pub fn is_degraded(&self) -> bool {
        matches!(self, Session::Degraded { .. })
    }

    pub fn user_id(&self) -> Option<&str> {
        match self {
            Session::SignedOut => None,
            Session::Authenticated { user_id, .. } | Session::Degraded { user_id, .. } => {
                Some(user_id)
            }
        }
    }

    pub(crate) fn token(&self) -> Option<&str> {
        match self {
            Session::Authenticated { token, .. } => Some(token),
            _ => None,
        }
    }
}
