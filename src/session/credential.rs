//! Session credential, resolved identity and capability tokens.
//!
//! Token strings are secrets: `Debug` output redacts them and nothing in the
//! crate logs them.

use std::fmt;

/// Store key for the bearer token.
pub const ACCESS_TOKEN_KEY: &str = "access_token";
/// Store key for the expiry hint (seconds, as issued).
pub const EXPIRES_IN_KEY: &str = "token_expires_in";

/// Opaque bearer token plus the expiry hint the backend issued with it.
///
/// Presence says nothing about validity; only a backend round-trip does.
#[derive(Clone, PartialEq, Eq)]
pub struct Credential {
    token: String,
    expires_in: u64,
}

impl Credential {
    pub fn new(token: impl Into<String>, expires_in: u64) -> Self {
        Self { token: token.into(), expires_in }
    }

    pub fn token(&self) -> &str {
        &self.token
    }

    pub fn expires_in(&self) -> u64 {
        self.expires_in
    }
}

impl fmt::Debug for Credential {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Credential")
            .field("token", &"<redacted>")
            .field("expires_in", &self.expires_in)
            .finish()
    }
}

/// Who the backend says the credential belongs to.
#[derive(Debug, Clone, PartialEq, Eq, Default)]
pub struct Identity {
    pub username: String,
}

/// Single-purpose token minted for one protected action. Never persisted.
#[derive(Clone, PartialEq, Eq)]
pub struct CapabilityToken {
    token: String,
    expires_in: Option<u64>,
}

impl CapabilityToken {
    pub fn new(token: impl Into<String>, expires_in: Option<u64>) -> Self {
        Self { token: token.into(), expires_in }
    }

    pub fn token(&self) -> &str {
        &self.token
    }

    pub fn expires_in(&self) -> Option<u64> {
        self.expires_in
    }

    /// Hand-off URL for the external service.
    ///
    /// The token rides in the fragment, which browsers never send to the
    /// server, so it stays out of access logs.
    pub fn launch_url(&self, service_url: &str) -> String {
        let base = service_url.split_once('#').map_or(service_url, |(base, _)| base);
        format!("{base}#token={}", urlencoding::encode(&self.token))
    }
}

impl fmt::Debug for CapabilityToken {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("CapabilityToken")
            .field("token", &"<redacted>")
            .field("expires_in", &self.expires_in)
            .finish()
    }
}
