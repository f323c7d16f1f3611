//! Identity gate: turns request credentials into the owning user's id.
//!
//! The gate is built once at process start from [`GateConfig`] and handed to
//! the HTTP layer; nothing is configured lazily per request.

use anyhow::{bail, Context, Result};
use jsonwebtoken::{decode, decode_header, Algorithm, DecodingKey, Validation};
use serde::Deserialize;
use std::collections::HashMap;
use std::sync::Arc;
use tokio::sync::Mutex;

#[derive(Deserialize)]
struct Subject {
    sub: String,
}

fn validation(algorithm: Algorithm) -> Validation {
    let mut validation = Validation::new(algorithm);
    validation.set_required_spec_claims(&["exp", "sub"]);
    validation
}

/// One way of checking a bearer token.
enum Verifier {
    /// HS256 with a shared secret.
    Secret(DecodingKey),
    /// RS256 against a published key set.
    KeySet(KeySet),
}

impl Verifier {
    async fn subject(&self, token: &str) -> Option<String> {
        let claims = match self {
            Verifier::Secret(key) => decode::<Subject>(token, key, &validation(Algorithm::HS256)),
            Verifier::KeySet(keys) => {
                let kid = decode_header(token).ok()?.kid?;
                let key = keys.key(&kid).await?;
                decode::<Subject>(token, &key, &validation(Algorithm::RS256))
            }
        };
        claims
            .ok()
            .map(|data| data.claims.sub)
            .filter(|sub| !sub.is_empty())
    }
}

#[derive(Deserialize)]
struct JwkSet {
    keys: Vec<Jwk>,
}

#[derive(Deserialize)]
struct Jwk {
    kid: String,
    n: String,
    e: String,
}

/// RSA keys from a JWKS endpoint, decoded once and cached by key id. An
/// unknown key id triggers one refetch, which picks up rotated keys.
struct KeySet {
    url: String,
    client: reqwest::Client,
    cache: Mutex<HashMap<String, DecodingKey>>,
}

impl KeySet {
    fn new(url: String) -> Self {
        Self {
            url,
            client: reqwest::Client::new(),
            cache: Mutex::new(HashMap::new()),
        }
    }

    async fn key(&self, kid: &str) -> Option<DecodingKey> {
        let mut cache = self.cache.lock().await;
        if let Some(key) = cache.get(kid) {
            return Some(key.clone());
        }
        match self.fetch().await {
            Ok(keys) => *cache = keys,
            Err(e) => {
                tracing::warn!(url = %self.url, error = %format!("{e:#}"), "failed to fetch JWKS");
                return None;
            }
        }
        cache.get(kid).cloned()
    }

    async fn fetch(&self) -> Result<HashMap<String, DecodingKey>> {
        let set: JwkSet = self
            .client
            .get(&self.url)
            .send()
            .await?
            .error_for_status()?
            .json()
            .await
            .context("decoding key set")?;
        let mut keys = HashMap::new();
        for jwk in set.keys {
            match DecodingKey::from_rsa_components(&jwk.n, &jwk.e) {
                Ok(key) => {
                    keys.insert(jwk.kid, key);
                }
                Err(e) => tracing::warn!(kid = %jwk.kid, error = %e, "skipping unusable JWK"),
            }
        }
        tracing::debug!(keys = keys.len(), "JWKS refreshed");
        Ok(keys)
    }
}

#[derive(Clone, Debug, Default)]
pub struct GateConfig {
    pub jwt_secret: Option<String>,
    pub jwks_url: Option<String>,
    /// Accept a bare `X-User-Id` header. Development only.
    pub trust_user_header: bool,
}

/// The authenticated caller.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct Identity {
    pub user_id: String,
}

/// Cheap-to-clone handle shared by every request.
#[derive(Clone)]
pub struct IdentityGate {
    inner: Arc<GateInner>,
}

struct GateInner {
    verifiers: Vec<Verifier>,
    trust_user_header: bool,
}

impl IdentityGate {
    /// Build the gate from configuration. Fails when no way to authenticate
    /// a request is configured.
    pub fn init(config: &GateConfig) -> Result<Self> {
        let mut verifiers = Vec::new();
        if let Some(secret) = config.jwt_secret.as_deref().filter(|s| !s.is_empty()) {
            verifiers.push(Verifier::Secret(DecodingKey::from_secret(secret.as_bytes())));
        }
        if let Some(url) = config.jwks_url.as_deref().filter(|s| !s.is_empty()) {
            verifiers.push(Verifier::KeySet(KeySet::new(url.to_string())));
        }
        if verifiers.is_empty() && !config.trust_user_header {
            bail!("identity gate has no verifier: set a JWT secret, a JWKS url, or trust the user header");
        }
        if config.trust_user_header {
            tracing::warn!("identity gate trusts the X-User-Id header; do not expose this server");
        }
        tracing::info!(
            verifiers = verifiers.len(),
            trust_user_header = config.trust_user_header,
            "identity gate initialized"
        );
        Ok(Self::from_parts(verifiers, config.trust_user_header))
    }

    /// A gate accepting only HS256 tokens signed with `secret`.
    pub fn with_secret(secret: &str) -> Self {
        Self::from_parts(
            vec![Verifier::Secret(DecodingKey::from_secret(secret.as_bytes()))],
            false,
        )
    }

    pub fn trusting_user_header() -> Self {
        Self::from_parts(Vec::new(), true)
    }

    fn from_parts(verifiers: Vec<Verifier>, trust_user_header: bool) -> Self {
        Self {
            inner: Arc::new(GateInner {
                verifiers,
                trust_user_header,
            }),
        }
    }

    /// Resolve the caller from an `Authorization` header value and, when
    /// trusted, an `X-User-Id` header value.
    pub async fn authenticate(
        &self,
        authorization: Option<&str>,
        user_header: Option<&str>,
    ) -> Option<Identity> {
        if let Some(token) = authorization.and_then(|a| a.strip_prefix("Bearer ")) {
            for verifier in &self.inner.verifiers {
                if let Some(user_id) = verifier.subject(token.trim()).await {
                    return Some(Identity { user_id });
                }
            }
        }
        if !self.inner.trust_user_header {
            return None;
        }
        user_header
            .map(str::trim)
            .filter(|u| !u.is_empty())
            .map(|u| Identity {
                user_id: u.to_string(),
            })
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use jsonwebtoken::{encode, EncodingKey, Header};
    use serde::Serialize;

    #[derive(Serialize)]
    struct TestClaims<'a> {
        sub: &'a str,
        exp: u64,
    }

    fn token(secret: &str, sub: &str, exp: u64) -> String {
        encode(
            &Header::new(Algorithm::HS256),
            &TestClaims { sub, exp },
            &EncodingKey::from_secret(secret.as_bytes()),
        )
        .unwrap()
    }

    fn far_future() -> u64 {
        (chrono::Utc::now().timestamp() + 3600) as u64
    }

    #[test]
    fn init_requires_some_verifier() {
        assert!(IdentityGate::init(&GateConfig::default()).is_err());
        assert!(IdentityGate::init(&GateConfig {
            jwt_secret: Some("s3cret".into()),
            ..Default::default()
        })
        .is_ok());
    }

    #[tokio::test]
    async fn bearer_token_resolves_subject() {
        let gate = IdentityGate::init(&GateConfig {
            jwt_secret: Some("s3cret".into()),
            ..Default::default()
        })
        .unwrap();
        let bearer = format!("Bearer {}", token("s3cret", "alice", far_future()));
        assert_eq!(
            gate.authenticate(Some(&bearer), None).await,
            Some(Identity {
                user_id: "alice".into()
            })
        );
    }

    #[tokio::test]
    async fn bad_or_expired_tokens_are_rejected() {
        let gate = IdentityGate::with_secret("s3cret");
        let wrong_key = format!("Bearer {}", token("other", "alice", far_future()));
        assert!(gate.authenticate(Some(&wrong_key), None).await.is_none());
        let expired = format!("Bearer {}", token("s3cret", "alice", 1_000));
        assert!(gate.authenticate(Some(&expired), None).await.is_none());
        assert!(gate.authenticate(Some("Basic abc"), None).await.is_none());
    }

    #[tokio::test]
    async fn tokens_without_expiry_are_rejected() {
        #[derive(Serialize)]
        struct Forever<'a> {
            sub: &'a str,
        }
        let forever = encode(
            &Header::new(Algorithm::HS256),
            &Forever { sub: "alice" },
            &EncodingKey::from_secret(b"s3cret"),
        )
        .unwrap();
        let gate = IdentityGate::with_secret("s3cret");
        assert!(gate
            .authenticate(Some(&format!("Bearer {forever}")), None)
            .await
            .is_none());
    }

    #[tokio::test]
    async fn user_header_only_when_trusted() {
        let strict = IdentityGate::with_secret("s3cret");
        assert!(strict.authenticate(None, Some("alice")).await.is_none());

        let trusting = IdentityGate::trusting_user_header();
        assert_eq!(
            trusting.authenticate(None, Some("alice")).await.unwrap().user_id,
            "alice"
        );
        assert!(trusting.authenticate(None, Some("  ")).await.is_none());
    }
}
