//! Delivery of enriched video records to the CMS notifier.

use async_trait::async_trait;
use reqwest::header::{AUTHORIZATION, CONTENT_TYPE, HOST};
use reqwest::StatusCode;
use std::fmt;
use tracing::{debug, instrument, warn};

use crate::auth::redacted;
use crate::error::ForwardError;
use crate::{TransactionId, VideoRecord};

/// Header naming the system the notification originates from
pub const ORIGIN_SYSTEM_HEADER: &str = "X-Origin-System-Id";

/// Default value of [`ORIGIN_SYSTEM_HEADER`]
pub const DEFAULT_ORIGIN_SYSTEM_ID: &str = "brightcove";

/// Destination of enriched video records.
#[async_trait]
pub trait VideoSink: Send + Sync {
    /// Deliver one enriched record, tagged with the request's transaction ID.
    async fn forward(
        &self,
        record: &VideoRecord,
        transaction_id: &TransactionId,
    ) -> Result<(), ForwardError>;
}

/// Location and credentials of the CMS notifier.
#[derive(Clone, PartialEq, Eq)]
pub struct ForwarderConfig {
    /// Base URL; records are posted to `{base_url}/notify`
    pub base_url: String,

    /// Static `Authorization` header value, sent only when set
    pub authorization: Option<String>,

    /// `Host` header override, for routing through a shared gateway
    pub host_header: Option<String>,

    /// Value of the `X-Origin-System-Id` header
    pub origin_system_id: String,
}

impl ForwarderConfig {
    pub fn new(base_url: impl Into<String>) -> Self {
        Self {
            base_url: base_url.into(),
            authorization: None,
            host_header: None,
            origin_system_id: DEFAULT_ORIGIN_SYSTEM_ID.to_string(),
        }
    }

    /// Send a static `Authorization` header; an empty value disables it
    pub fn with_authorization(mut self, authorization: impl Into<String>) -> Self {
        self.authorization = Some(authorization.into()).filter(|a| !a.is_empty());
        self
    }

    /// Override the `Host` header; an empty value disables the override
    pub fn with_host_header(mut self, host: impl Into<String>) -> Self {
        self.host_header = Some(host.into()).filter(|h| !h.is_empty());
        self
    }

    pub fn with_origin_system_id(mut self, origin_system_id: impl Into<String>) -> Self {
        self.origin_system_id = origin_system_id.into();
        self
    }

    /// Full delivery URL
    pub fn notify_url(&self) -> String {
        format!("{}/notify", self.base_url.trim_end_matches('/'))
    }
}

impl fmt::Debug for ForwarderConfig {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("ForwarderConfig")
            .field("base_url", &self.base_url)
            .field(
                "authorization",
                &redacted(self.authorization.as_deref().unwrap_or_default()),
            )
            .field("host_header", &self.host_header)
            .field("origin_system_id", &self.origin_system_id)
            .finish()
    }
}

/// HTTP-backed [`VideoSink`].
#[derive(Debug, Clone)]
pub struct VideoForwarder {
    http_client: reqwest::Client,
    config: ForwarderConfig,
}

impl VideoForwarder {
    pub fn new(http_client: reqwest::Client, config: ForwarderConfig) -> Self {
        Self {
            http_client,
            config,
        }
    }

    pub fn config(&self) -> &ForwarderConfig {
        &self.config
    }
}

#[async_trait]
impl VideoSink for VideoForwarder {
    #[instrument(
        skip(self, record),
        fields(video_id = record.id().unwrap_or_default(), transaction_id = %transaction_id)
    )]
    async fn forward(
        &self,
        record: &VideoRecord,
        transaction_id: &TransactionId,
    ) -> Result<(), ForwardError> {
        let body =
            serde_json::to_vec(record).map_err(|e| ForwardError::Serialization(e.to_string()))?;

        let mut request = self
            .http_client
            .post(self.config.notify_url())
            .header(CONTENT_TYPE, "application/json")
            .header(ORIGIN_SYSTEM_HEADER, &self.config.origin_system_id)
            .header(TransactionId::HEADER, transaction_id.as_str());

        if let Some(authorization) = &self.config.authorization {
            request = request.header(AUTHORIZATION, authorization);
        }
        if let Some(host) = &self.config.host_header {
            request = request.header(HOST, host);
        }

        let response = request.body(body).send().await.map_err(|e| {
            warn!(error = %e, "CMS notifier request failed");
            ForwardError::Transport(e.to_string())
        })?;

        match response.status() {
            StatusCode::OK => {
                debug!("CMS notifier accepted the record");
                Ok(())
            }
            StatusCode::BAD_REQUEST => {
                // Body explains the rejection; a read failure leaves it blank
                let body = response.text().await.unwrap_or_default();
                warn!(body = %body, "CMS notifier rejected the record");
                Err(ForwardError::Rejected { body })
            }
            other => {
                warn!(status = other.as_u16(), "CMS notifier returned unexpected status");
                Err(ForwardError::UnexpectedStatus {
                    status: other.as_u16(),
                })
            }
        }
    }
}

#[cfg(test)]
#[path = "forwarder_tests.rs"]
mod tests;
