//! Error types for the notification pipeline.
//!
//! Each pipeline stage has its own error enum so the orchestrator and the
//! HTTP layer can classify failures by stage and by cause. Transport-level
//! failures carry the rendered client error message only; the underlying
//! `reqwest::Error` is logged where it occurs.

use thiserror::Error;

/// Inbound input that cannot be processed.
///
/// Malformed push events and events for a foreign account are dropped
/// silently by the orchestrator; these variants exist so the drop reason can
/// be logged.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum ValidationError {
    #[error("Required field missing: {field}")]
    Required { field: String },

    #[error("Invalid format for field '{field}': {message}")]
    InvalidFormat { field: String, message: String },

    #[error("Malformed notification event: {message}")]
    MalformedEvent { message: String },

    #[error("Unexpected account id: {actual}")]
    UnexpectedAccount { actual: String },
}

/// Failures while building the shared HTTP client.
#[derive(Debug, Error)]
pub enum ClientError {
    #[error("Failed to create HTTP client: {message}")]
    Build { message: String },
}

/// Credential renewal failures.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum AuthError {
    /// The OAuth endpoint answered with a non-200 status.
    #[error("Invalid status code received from token endpoint: {status}")]
    BadStatus { status: u16 },

    /// The token response parsed but carried no access token.
    #[error("Empty access token in token response")]
    EmptyToken,

    /// The token response body was not valid JSON.
    #[error("Failed to decode token response: {0}")]
    Decode(String),

    /// Connection-level failure talking to the OAuth endpoint.
    #[error("Token endpoint transport error: {0}")]
    Transport(String),
}

impl AuthError {
    /// Check if this error represents a transient condition.
    ///
    /// Server errors, rate limiting and transport failures may succeed on a
    /// later attempt; a misconfigured client authorization will not.
    pub fn is_transient(&self) -> bool {
        match self {
            Self::BadStatus { status } => *status >= 500 || *status == 429,
            Self::EmptyToken => false,
            Self::Decode(_) => false,
            Self::Transport(_) => true,
        }
    }
}

/// Upstream video lookup failures.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum FetchError {
    /// The lookup was still unauthorized after one credential renewal.
    #[error("Unauthorized after renewing access token")]
    Unauthorized,

    /// Renewing the access token failed.
    #[error("Renewing access token failure: {0}")]
    AuthFailed(#[source] AuthError),

    /// The platform answered 429.
    #[error("Too many requests. status=429")]
    RateLimited,

    /// The platform answered 404 with an empty candidate array.
    #[error("Unexpected 404 response. Zero-length array received")]
    MalformedNotFound,

    /// Any status without specific handling.
    #[error("Invalid status code received: {status}")]
    UnexpectedStatus { status: u16 },

    /// The response body did not decode into the expected shape.
    #[error("Failed to decode video response: {0}")]
    Decode(String),

    /// Connection-level failure talking to the platform.
    #[error("Video API transport error: {0}")]
    Transport(String),
}

impl FetchError {
    /// Check if this error represents a transient condition.
    pub fn is_transient(&self) -> bool {
        match self {
            Self::Unauthorized => false,
            Self::AuthFailed(e) => e.is_transient(),
            Self::RateLimited => true,
            Self::MalformedNotFound => false,
            Self::UnexpectedStatus { status } => *status >= 500,
            Self::Decode(_) => false,
            Self::Transport(_) => true,
        }
    }

    /// Whether the platform asked us to slow down
    pub fn is_rate_limited(&self) -> bool {
        matches!(self, Self::RateLimited)
    }
}

/// Enrichment failures. These indicate a malformed upstream record.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum EnrichError {
    #[error("Invalid content, missing video ID")]
    MissingId,
}

/// Downstream delivery failures.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum ForwardError {
    /// The CMS notifier answered 400; the body explains why.
    #[error("Status code 400. [{body}]")]
    Rejected { body: String },

    /// Any status other than 200 or 400.
    #[error("Invalid status code received: {status}")]
    UnexpectedStatus { status: u16 },

    /// The record could not be serialized.
    #[error("Failed to serialize video record: {0}")]
    Serialization(String),

    /// Connection-level failure talking to the CMS notifier.
    #[error("CMS notifier transport error: {0}")]
    Transport(String),
}

impl ForwardError {
    /// Check if this error represents a transient condition.
    pub fn is_transient(&self) -> bool {
        match self {
            Self::Rejected { .. } => false,
            Self::UnexpectedStatus { status } => *status >= 500 || *status == 429,
            Self::Serialization(_) => false,
            Self::Transport(_) => true,
        }
    }
}

/// A pipeline failure, tagged with the stage that failed.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum NotificationError {
    #[error("Fetching video failed: {0}")]
    Fetch(#[from] FetchError),

    #[error("Enriching video failed: {0}")]
    Enrich(#[from] EnrichError),

    #[error("Forwarding video failed: {0}")]
    Forward(#[from] ForwardError),
}

impl NotificationError {
    /// Name of the failed pipeline stage, for logs and metrics labels
    pub fn stage(&self) -> &'static str {
        match self {
            Self::Fetch(_) => "fetch",
            Self::Enrich(_) => "enrich",
            Self::Forward(_) => "forward",
        }
    }

    /// Check if this error represents a transient condition.
    pub fn is_transient(&self) -> bool {
        match self {
            Self::Fetch(e) => e.is_transient(),
            Self::Enrich(_) => false,
            Self::Forward(e) => e.is_transient(),
        }
    }
}

#[cfg(test)]
#[path = "error_tests.rs"]
mod tests;
