//! Error types for the HTTP service

use axum::{
    http::StatusCode,
    response::{IntoResponse, Response},
};
use tracing::{error, warn};
use video_notifier_core::{FetchError, NotificationError, TransactionId, ValidationError};

/// Notification handler errors with HTTP status code mapping
///
/// The video platform and operators only look at the status code, so every
/// response is a bare status with no body. Details are logged server-side
/// with the transaction ID.
///
/// | Failure | `/notify` | `/force-notify/{id}` |
/// |---|---|---|
/// | fetch, rate limited | 500 | 429 |
/// | fetch, other | 500 | 500 |
/// | enrich | 400 | 400 |
/// | forward | 500 | 500 |
/// | invalid video ID | n/a | 400 |
#[derive(Debug, thiserror::Error)]
pub enum NotifyHandlerError {
    /// The `{id}` path segment is not a usable video ID
    #[error("Invalid video id: {source}")]
    InvalidVideoId {
        transaction_id: TransactionId,
        #[source]
        source: ValidationError,
    },

    /// Pipeline failure on the push path
    #[error("Notification failed: {source}")]
    Push {
        transaction_id: TransactionId,
        #[source]
        source: NotificationError,
    },

    /// Pipeline failure on the force path
    #[error("Forced notification failed: {source}")]
    Force {
        transaction_id: TransactionId,
        video_id: String,
        #[source]
        source: NotificationError,
    },
}

impl NotifyHandlerError {
    /// HTTP status reported to the caller
    pub fn status_code(&self) -> StatusCode {
        match self {
            Self::InvalidVideoId { .. } => StatusCode::BAD_REQUEST,
            Self::Push { source, .. } => match source {
                NotificationError::Enrich(_) => StatusCode::BAD_REQUEST,
                NotificationError::Fetch(_) | NotificationError::Forward(_) => {
                    StatusCode::INTERNAL_SERVER_ERROR
                }
            },
            Self::Force { source, .. } => match source {
                NotificationError::Fetch(FetchError::RateLimited) => StatusCode::TOO_MANY_REQUESTS,
                NotificationError::Enrich(_) => StatusCode::BAD_REQUEST,
                NotificationError::Fetch(_) | NotificationError::Forward(_) => {
                    StatusCode::INTERNAL_SERVER_ERROR
                }
            },
        }
    }

    /// Failed pipeline stage, for metrics labels
    pub fn stage(&self) -> &'static str {
        match self {
            Self::InvalidVideoId { .. } => "validate",
            Self::Push { source, .. } | Self::Force { source, .. } => source.stage(),
        }
    }
}

impl IntoResponse for NotifyHandlerError {
    fn into_response(self) -> Response {
        let status = self.status_code();

        match &self {
            Self::InvalidVideoId {
                transaction_id,
                source,
            } => {
                warn!(
                    transaction_id = %transaction_id,
                    error = %source,
                    "Rejected forced notification with invalid video id"
                );
            }
            Self::Push {
                transaction_id,
                source,
            } => {
                error!(
                    transaction_id = %transaction_id,
                    stage = source.stage(),
                    transient = source.is_transient(),
                    status = status.as_u16(),
                    error = %source,
                    "Notification failed"
                );
            }
            Self::Force {
                transaction_id,
                video_id,
                source,
            } => {
                error!(
                    transaction_id = %transaction_id,
                    video_id = %video_id,
                    stage = source.stage(),
                    transient = source.is_transient(),
                    status = status.as_u16(),
                    error = %source,
                    "Forced notification failed"
                );
            }
        }

        status.into_response()
    }
}

/// Service-level errors
#[derive(Debug, thiserror::Error)]
pub enum ServiceError {
    #[error("Failed to bind to address {address}: {message}")]
    BindFailed { address: String, message: String },

    #[error("Server failed: {message}")]
    ServerFailed { message: String },

    #[error("Configuration error: {0}")]
    Configuration(#[from] ConfigError),

    #[error("Failed to initialize {component}: {message}")]
    Initialization { component: String, message: String },
}

/// Configuration errors
#[derive(Debug, thiserror::Error)]
pub enum ConfigError {
    #[error("Invalid configuration: {message}")]
    Invalid { message: String },

    #[error("Missing required configuration: {key}")]
    Missing { key: String },

    #[error("Configuration parsing failed: {message}")]
    Parsing { message: String },
}
