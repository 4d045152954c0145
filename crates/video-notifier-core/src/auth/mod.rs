//! Bearer token storage and renewal for the video platform API.
//!
//! The video platform issues short-lived bearer tokens through an OAuth
//! client-credentials exchange. The notifier does not track expiry: a token
//! is renewed only after the platform rejects it with a 401.
//!
//! [`Credentials`] is the shared token cell. It is passed explicitly to the
//! components that need it. Concurrent renewals are not serialized; each
//! renewal overwrites the token and the last writer wins. A stale overwrite
//! shows up as one extra 401, which the next renewal repairs.

use async_trait::async_trait;
use std::fmt;
use std::sync::RwLock;
use zeroize::Zeroizing;

use crate::error::AuthError;

mod manager;

pub use manager::CredentialManager;

/// Bearer token copy that is zeroed when dropped
pub type BearerToken = Zeroizing<String>;

/// Source of bearer tokens that can renew itself on demand.
#[async_trait]
pub trait CredentialRenewer: Send + Sync {
    /// Current bearer token. Empty until the first successful renewal.
    fn bearer_token(&self) -> BearerToken;

    /// Exchange client credentials for a fresh bearer token and store it.
    ///
    /// Safe to call concurrently; redundant renewals are harmless.
    async fn renew(&self) -> Result<(), AuthError>;
}

/// Settings for the OAuth client-credentials exchange.
#[derive(Clone, PartialEq, Eq)]
pub struct OAuthConfig {
    /// Token endpoint URL
    pub token_url: String,

    /// Static `Authorization` header value, typically
    /// `Basic base64(client_id:client_secret)`
    pub authorization: String,
}

impl OAuthConfig {
    /// Create a new OAuth configuration
    pub fn new(token_url: impl Into<String>, authorization: impl Into<String>) -> Self {
        Self {
            token_url: token_url.into(),
            authorization: authorization.into(),
        }
    }
}

impl fmt::Debug for OAuthConfig {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("OAuthConfig")
            .field("token_url", &self.token_url)
            .field("authorization", &redacted(&self.authorization))
            .finish()
    }
}

/// Process-wide bearer token cell.
///
/// Reads clone the token out so no lock is held across an `.await`.
/// Replaced tokens are zeroed when dropped.
pub struct Credentials {
    bearer_token: RwLock<Zeroizing<String>>,
}

impl Credentials {
    /// Create an empty credential cell
    pub fn new() -> Self {
        Self::with_token(String::new())
    }

    /// Create a credential cell holding a known token
    pub fn with_token(token: impl Into<String>) -> Self {
        Self {
            bearer_token: RwLock::new(Zeroizing::new(token.into())),
        }
    }

    /// Copy of the current bearer token
    pub fn bearer_token(&self) -> BearerToken {
        match self.bearer_token.read() {
            Ok(guard) => guard.clone(),
            Err(poisoned) => poisoned.into_inner().clone(),
        }
    }

    /// Overwrite the stored bearer token
    pub fn replace(&self, token: impl Into<String>) {
        let token = Zeroizing::new(token.into());
        match self.bearer_token.write() {
            Ok(mut guard) => *guard = token,
            Err(poisoned) => *poisoned.into_inner() = token,
        }
    }

    /// Whether a token has been obtained yet
    pub fn is_empty(&self) -> bool {
        self.bearer_token().is_empty()
    }
}

impl Default for Credentials {
    fn default() -> Self {
        Self::new()
    }
}

impl fmt::Debug for Credentials {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Credentials")
            .field("bearer_token", &redacted(&self.bearer_token()))
            .finish()
    }
}

/// Render a secret for logs and `Debug` output without revealing it.
pub fn redacted(secret: &str) -> &'static str {
    if secret.is_empty() {
        "empty"
    } else {
        "set, not empty"
    }
}

#[cfg(test)]
#[path = "mod_tests.rs"]
mod tests;
