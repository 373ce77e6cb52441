//! Authentication backend client.
//!
//! [`AuthBackend`] is the seam the session gate talks through; the HTTP
//! implementation speaks the backend's wire format:
//!
//! ```text
//! POST /api/auth/login          form username, password  → {access_token, expires_in}
//! POST /api/auth/register       json {username, email, password}
//! GET  /api/auth/verify         bearer                   → {data: {username}}
//! POST /api/games/{name}/token  bearer                   → {data: {game_token, expires_in?}}
//! ```
//!
//! Failures carry `{detail}` (string, or a list for validation errors). All
//! wire types are private to this module.

use std::time::Duration;

use async_trait::async_trait;
use reqwest::{Client, Response};
use serde::{Deserialize, Serialize};
use thiserror::Error;
use tracing::{debug, warn};

use super::credential::{CapabilityToken, Credential, Identity};

#[derive(Debug, Error)]
pub enum BackendError {
    #[error("auth backend unreachable: {0}")]
    Transport(String),

    #[error("auth backend rejected request (HTTP {status}): {detail}")]
    Rejected {
        status: u16,
        detail: String,
        /// Machine-readable code, when the backend sends one.
        code: Option<String>,
    },

    #[error("unexpected auth backend response: {0}")]
    Decode(String),
}

impl BackendError {
    /// `true` when the backend answered and said no to the credential.
    pub fn is_unauthorized(&self) -> bool {
        matches!(self, Self::Rejected { status: 401 | 403, .. })
    }

    /// Backend-provided human-readable detail, if any.
    pub fn detail(&self) -> Option<&str> {
        match self {
            Self::Rejected { detail, .. } if !detail.is_empty() => Some(detail),
            _ => None,
        }
    }
}

/// New-account payload sent to the backend.
#[derive(Debug, Clone, Serialize)]
pub struct Registration {
    pub username: String,
    pub email: String,
    pub password: String,
}

#[async_trait]
pub trait AuthBackend: Send + Sync {
    async fn login(&self, username: &str, password: &str) -> Result<Credential, BackendError>;

    async fn register(&self, registration: &Registration) -> Result<(), BackendError>;

    async fn verify(&self, token: &str) -> Result<Identity, BackendError>;

    /// Mint a capability for protected action `action` using session `token`.
    async fn mint_capability(&self, action: &str, token: &str)
    -> Result<CapabilityToken, BackendError>;
}

/// Join `endpoint` onto `base` with exactly one `/` between them.
pub fn api_url(base: &str, endpoint: &str) -> String {
    let base = base.trim_end_matches('/');
    if endpoint.starts_with('/') {
        format!("{base}{endpoint}")
    } else {
        format!("{base}/{endpoint}")
    }
}

// ── HTTP implementation ───────────────────────────────────────────────────────

/// Constructed once, then cheaply cloned (`reqwest::Client` is an `Arc`).
#[derive(Debug, Clone)]
pub struct HttpAuthBackend {
    client: Client,
    base_url: String,
}

impl HttpAuthBackend {
    pub fn new(base_url: impl Into<String>, timeout_seconds: u64) -> Result<Self, BackendError> {
        let client = Client::builder()
            .timeout(Duration::from_secs(timeout_seconds))
            .build()
            .map_err(|e| BackendError::Transport(format!("failed to build HTTP client: {e}")))?;
        Ok(Self { client, base_url: base_url.into() })
    }

    pub fn base_url(&self) -> &str {
        &self.base_url
    }

    fn url(&self, endpoint: &str) -> String {
        api_url(&self.base_url, endpoint)
    }
}

#[async_trait]
impl AuthBackend for HttpAuthBackend {
    async fn login(&self, username: &str, password: &str) -> Result<Credential, BackendError> {
        debug!(%username, "login request");
        let response = self
            .client
            .post(self.url("/api/auth/login"))
            .form(&[("username", username), ("password", password)])
            .send()
            .await
            .map_err(transport)?;
        let grant: TokenGrant = decode(check_status(response).await?).await?;
        Ok(Credential::new(grant.access_token, grant.expires_in))
    }

    async fn register(&self, registration: &Registration) -> Result<(), BackendError> {
        debug!(username = %registration.username, "register request");
        let response = self
            .client
            .post(self.url("/api/auth/register"))
            .json(registration)
            .send()
            .await
            .map_err(transport)?;
        check_status(response).await?;
        Ok(())
    }

    async fn verify(&self, token: &str) -> Result<Identity, BackendError> {
        let response = self
            .client
            .get(self.url("/api/auth/verify"))
            .bearer_auth(token)
            .send()
            .await
            .map_err(transport)?;
        let envelope: Envelope<VerifyData> = decode(check_status(response).await?).await?;
        let username = envelope.data.and_then(|d| d.username).unwrap_or_default();
        Ok(Identity { username })
    }

    async fn mint_capability(
        &self,
        action: &str,
        token: &str,
    ) -> Result<CapabilityToken, BackendError> {
        let endpoint = format!("/api/games/{}/token", urlencoding::encode(action));
        let response = self
            .client
            .post(self.url(&endpoint))
            .bearer_auth(token)
            .send()
            .await
            .map_err(transport)?;
        let envelope: Envelope<GameTokenData> = decode(check_status(response).await?).await?;
        let data = envelope
            .data
            .ok_or_else(|| BackendError::Decode("missing data in capability response".into()))?;
        match data.game_token {
            Some(t) if !t.is_empty() => Ok(CapabilityToken::new(t, data.expires_in)),
            _ => Err(BackendError::Decode("missing game_token in capability response".into())),
        }
    }
}

// ── Private wire types ────────────────────────────────────────────────────────

#[derive(Debug, Deserialize)]
struct TokenGrant {
    access_token: String,
    #[serde(default)]
    expires_in: u64,
}

#[derive(Debug, Deserialize)]
struct Envelope<T> {
    // A missing field already reads as `None` for `Option`.
    data: Option<T>,
}

#[derive(Debug, Deserialize)]
struct VerifyData {
    #[serde(default)]
    username: Option<String>,
}

#[derive(Debug, Deserialize)]
struct GameTokenData {
    #[serde(default)]
    game_token: Option<String>,
    #[serde(default)]
    expires_in: Option<u64>,
}

#[derive(Debug, Deserialize)]
struct ErrorBody {
    #[serde(default)]
    detail: Option<serde_json::Value>,
    #[serde(default)]
    code: Option<String>,
}

fn transport(e: reqwest::Error) -> BackendError {
    warn!(error = %e, timeout = e.is_timeout(), "auth backend request failed (transport)");
    BackendError::Transport(e.to_string())
}

async fn decode<T: for<'de> Deserialize<'de>>(response: Response) -> Result<T, BackendError> {
    response
        .json::<T>()
        .await
        .map_err(|e| BackendError::Decode(format!("failed to parse response body: {e}")))
}

/// Pass a successful response through, or turn it into [`BackendError::Rejected`].
async fn check_status(response: Response) -> Result<Response, BackendError> {
    let status = response.status();
    if status.is_success() {
        return Ok(response);
    }

    let body = response.text().await.unwrap_or_default();
    let (detail, code) = match serde_json::from_str::<ErrorBody>(&body) {
        Ok(err) => (err.detail.map(detail_text).unwrap_or_default(), err.code),
        Err(_) => (body.trim().to_string(), None),
    };

    debug!(status = status.as_u16(), %detail, "auth backend returned HTTP error");
    Err(BackendError::Rejected { status: status.as_u16(), detail, code })
}

/// FastAPI sends `detail` as a string, or as a list of `{msg}` objects for
/// validation failures.
fn detail_text(detail: serde_json::Value) -> String {
    match detail {
        serde_json::Value::String(s) => s,
        serde_json::Value::Array(items) => items
            .iter()
            .map(|item| match item.get("msg").and_then(|m| m.as_str()) {
                Some(msg) => msg.to_string(),
                None => item.to_string(),
            })
            .collect::<Vec<_>>()
            .join("; "),
        serde_json::Value::Null => String::new(),
        other => other.to_string(),
    }
}
