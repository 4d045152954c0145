//! Upstream video lookup against the video platform API.
//!
//! A lookup that comes back 401 triggers exactly one credential renewal and
//! one retry. A 404 is not an error: the platform answers with an array of
//! candidate records and the first one is returned as a not-found marker
//! carrying the requested ID.

use async_trait::async_trait;
use reqwest::header::{AUTHORIZATION, CONTENT_TYPE};
use reqwest::StatusCode;
use serde_json::Value;
use std::sync::Arc;
use tracing::{debug, info, instrument, warn};

use crate::auth::CredentialRenewer;
use crate::error::FetchError;
use crate::{TransactionId, VideoId, VideoRecord};

/// Source of canonical video records.
#[async_trait]
pub trait VideoSource: Send + Sync {
    /// Retrieve the record for `video_id`.
    ///
    /// A video the platform does not know about is returned as a record for
    /// which [`VideoRecord::is_not_found`] holds, not as an error.
    async fn fetch(
        &self,
        video_id: &VideoId,
        transaction_id: &TransactionId,
    ) -> Result<VideoRecord, FetchError>;
}

/// Location of the video platform API.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct FetcherConfig {
    /// API base, ending just before the account segment,
    /// e.g. `https://cms.api.brightcove.com/v1/accounts/`
    pub api_url: String,

    /// Account whose videos are looked up
    pub account_id: String,
}

impl FetcherConfig {
    pub fn new(api_url: impl Into<String>, account_id: impl Into<String>) -> Self {
        Self {
            api_url: api_url.into(),
            account_id: account_id.into(),
        }
    }

    /// Lookup URL for one video
    pub fn video_url(&self, video_id: &VideoId) -> String {
        format!("{}{}/videos/{}", self.api_url, self.account_id, video_id)
    }
}

/// HTTP-backed [`VideoSource`].
#[derive(Clone)]
pub struct VideoFetcher {
    http_client: reqwest::Client,
    config: FetcherConfig,
    credentials: Arc<dyn CredentialRenewer>,
}

impl VideoFetcher {
    pub fn new(
        http_client: reqwest::Client,
        config: FetcherConfig,
        credentials: Arc<dyn CredentialRenewer>,
    ) -> Self {
        Self {
            http_client,
            config,
            credentials,
        }
    }

    pub fn config(&self) -> &FetcherConfig {
        &self.config
    }

    async fn send(&self, url: &str) -> Result<reqwest::Response, FetchError> {
        let token = self.credentials.bearer_token();

        self.http_client
            .get(url)
            .header(AUTHORIZATION, format!("Bearer {}", token.as_str()))
            .header(CONTENT_TYPE, "application/json")
            .send()
            .await
            .map_err(|e| {
                warn!(error = %e, "Video API request failed");
                FetchError::Transport(e.to_string())
            })
    }

    async fn read_body(response: reqwest::Response) -> Result<bytes::Bytes, FetchError> {
        response
            .bytes()
            .await
            .map_err(|e| FetchError::Transport(e.to_string()))
    }
}

impl std::fmt::Debug for VideoFetcher {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("VideoFetcher")
            .field("config", &self.config)
            .finish_non_exhaustive()
    }
}

#[async_trait]
impl VideoSource for VideoFetcher {
    #[instrument(
        skip(self),
        fields(video_id = %video_id, transaction_id = %transaction_id)
    )]
    async fn fetch(
        &self,
        video_id: &VideoId,
        transaction_id: &TransactionId,
    ) -> Result<VideoRecord, FetchError> {
        let url = self.config.video_url(video_id);

        let mut response = self.send(&url).await?;

        if response.status() == StatusCode::UNAUTHORIZED {
            info!("Video API rejected the access token, renewing");
            self.credentials.renew().await.map_err(|e| {
                warn!(error = %e, "Access token renewal failed");
                FetchError::AuthFailed(e)
            })?;

            response = self.send(&url).await?;
        }

        let status = response.status();
        debug!(status = status.as_u16(), "Video API responded");

        match status {
            StatusCode::OK => {
                let body = Self::read_body(response).await?;
                serde_json::from_slice::<VideoRecord>(&body)
                    .map_err(|e| FetchError::Decode(e.to_string()))
            }
            StatusCode::NOT_FOUND => {
                let body = Self::read_body(response).await?;
                let candidates: Vec<VideoRecord> = serde_json::from_slice(&body)
                    .map_err(|e| FetchError::Decode(e.to_string()))?;
                not_found_marker(candidates, video_id)
            }
            StatusCode::UNAUTHORIZED => {
                warn!("Video API still unauthorized after renewal");
                Err(FetchError::Unauthorized)
            }
            StatusCode::TOO_MANY_REQUESTS => {
                warn!("Video API rate limit reached");
                Err(FetchError::RateLimited)
            }
            other => {
                warn!(status = other.as_u16(), "Video API returned unexpected status");
                Err(FetchError::UnexpectedStatus {
                    status: other.as_u16(),
                })
            }
        }
    }
}

/// Turn the platform's 404 candidate array into a not-found record for the
/// requested video.
fn not_found_marker(
    candidates: Vec<VideoRecord>,
    video_id: &VideoId,
) -> Result<VideoRecord, FetchError> {
    let mut record = candidates
        .into_iter()
        .next()
        .ok_or(FetchError::MalformedNotFound)?;

    record.insert(VideoRecord::ID_FIELD, Value::String(video_id.to_string()));
    if record.error_code().is_none() {
        record.insert(
            VideoRecord::ERROR_CODE_FIELD,
            Value::String(VideoRecord::NOT_FOUND_CODE.to_string()),
        );
    }

    info!(
        error_code = record.error_code().unwrap_or_default(),
        "Video not found on the platform"
    );

    Ok(record)
}

#[cfg(test)]
#[path = "fetcher_tests.rs"]
mod tests;
