//! OAuth client-credentials token renewal.

use async_trait::async_trait;
use reqwest::header::{AUTHORIZATION, CONTENT_TYPE};
use reqwest::StatusCode;
use serde::Deserialize;
use std::sync::Arc;
use tracing::{debug, info, instrument, warn};

use super::{BearerToken, CredentialRenewer, Credentials, OAuthConfig};
use crate::error::AuthError;

/// Fixed request body for the client-credentials grant
const TOKEN_REQUEST_BODY: &str = "grant_type=client_credentials";

const FORM_CONTENT_TYPE: &str = "application/x-www-form-urlencoded";

/// Token endpoint response. Only `access_token` is used; expiry is not
/// tracked.
#[derive(Deserialize)]
struct AccessTokenResponse {
    #[serde(default)]
    access_token: Option<String>,

    #[serde(default)]
    token_type: Option<String>,

    #[serde(default)]
    expires_in: Option<i64>,
}

/// Renews the platform bearer token against the OAuth token endpoint.
///
/// # Examples
///
/// ```no_run
/// # use video_notifier_core::auth::{CredentialManager, CredentialRenewer, Credentials, OAuthConfig};
/// # use std::sync::Arc;
/// # async fn example() -> Result<(), Box<dyn std::error::Error>> {
/// let config = OAuthConfig::new(
///     "https://oauth.brightcove.com/v3/access_token",
///     "Basic Y2xpZW50SWQ6Y2xpZW50U2VjcmV0",
/// );
/// let manager = CredentialManager::new(reqwest::Client::new(), config, Arc::new(Credentials::new()));
///
/// manager.renew().await?;
/// assert!(!manager.bearer_token().is_empty());
/// # Ok(())
/// # }
/// ```
#[derive(Debug, Clone)]
pub struct CredentialManager {
    http_client: reqwest::Client,
    config: OAuthConfig,
    credentials: Arc<Credentials>,
}

impl CredentialManager {
    /// Create a new credential manager writing into `credentials`
    pub fn new(
        http_client: reqwest::Client,
        config: OAuthConfig,
        credentials: Arc<Credentials>,
    ) -> Self {
        Self {
            http_client,
            config,
            credentials,
        }
    }

    /// Shared token cell
    pub fn credentials(&self) -> &Arc<Credentials> {
        &self.credentials
    }

    /// OAuth settings
    pub fn config(&self) -> &OAuthConfig {
        &self.config
    }
}

#[async_trait]
impl CredentialRenewer for CredentialManager {
    fn bearer_token(&self) -> BearerToken {
        self.credentials.bearer_token()
    }

    #[instrument(skip(self), fields(token_url = %self.config.token_url))]
    async fn renew(&self) -> Result<(), AuthError> {
        let response = self
            .http_client
            .post(&self.config.token_url)
            .header(CONTENT_TYPE, FORM_CONTENT_TYPE)
            .header(AUTHORIZATION, &self.config.authorization)
            .body(TOKEN_REQUEST_BODY)
            .send()
            .await
            .map_err(|e| {
                warn!(error = %e, "Token endpoint request failed");
                AuthError::Transport(e.to_string())
            })?;

        let status = response.status();
        if status != StatusCode::OK {
            warn!(status = status.as_u16(), "Token endpoint returned unexpected status");
            return Err(AuthError::BadStatus {
                status: status.as_u16(),
            });
        }

        let body = response
            .bytes()
            .await
            .map_err(|e| AuthError::Transport(e.to_string()))?;

        let token_response: AccessTokenResponse =
            serde_json::from_slice(&body).map_err(|e| AuthError::Decode(e.to_string()))?;

        let token = match token_response.access_token {
            Some(token) if !token.is_empty() => token,
            _ => {
                warn!(
                    token_type = ?token_response.token_type,
                    expires_in = ?token_response.expires_in,
                    "Token endpoint returned an empty access token"
                );
                return Err(AuthError::EmptyToken);
            }
        };

        self.credentials.replace(token);

        debug!(
            token_type = ?token_response.token_type,
            expires_in = ?token_response.expires_in,
            "Stored renewed access token"
        );
        info!("Access token renewed");

        Ok(())
    }
}

#[cfg(test)]
#[path = "manager_tests.rs"]
mod tests;
