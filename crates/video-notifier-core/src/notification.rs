//! Notification orchestration for the push and force entry points.
//!
//! # Push path
//!
//! 1. Decode the [`VideoChangeEvent`]; malformed events are dropped
//! 2. Drop events for any account other than the configured one
//! 3. Fetch, enrich and forward the video record
//!
//! Dropped events are reported as [`NotificationOutcome::Ignored`] so the
//! caller can acknowledge them; the platform would otherwise redeliver.
//!
//! # Force path
//!
//! An operator names a video directly. The pipeline is the same, but a
//! not-found record is reported as [`NotificationOutcome::ForwardedNotFound`]
//! after it has been forwarded, so the caller can tell the two apart.
//!
//! Neither path retries; the only repeated call is the single renewal-driven
//! retry inside the fetcher.

use std::fmt;
use std::sync::Arc;
use tracing::{info, instrument, warn};
use uuid::Uuid;

use crate::enricher;
use crate::error::{NotificationError, ValidationError};
use crate::fetcher::VideoSource;
use crate::forwarder::VideoSink;
use crate::{TransactionId, VideoChangeEvent, VideoId, VideoRecord};

// ============================================================================
// Outcomes
// ============================================================================

/// Why a push notification was dropped without processing.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum IgnoreReason {
    /// The body was not a well-formed video-change event
    MalformedEvent,

    /// The event belongs to a different account
    AccountMismatch,
}

impl IgnoreReason {
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::MalformedEvent => "malformed_event",
            Self::AccountMismatch => "account_mismatch",
        }
    }
}

impl fmt::Display for IgnoreReason {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.as_str())
    }
}

/// Successful result of handling one notification.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum NotificationOutcome {
    /// Dropped before any outbound call
    Ignored(IgnoreReason),

    /// The video record was delivered downstream
    Forwarded { video_id: VideoId, derived_id: Uuid },

    /// A not-found marker for the video was delivered downstream
    ForwardedNotFound { video_id: VideoId, derived_id: Uuid },
}

impl NotificationOutcome {
    /// Label for logs and metrics
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::Ignored(_) => "ignored",
            Self::Forwarded { .. } => "forwarded",
            Self::ForwardedNotFound { .. } => "forwarded_not_found",
        }
    }
}

// ============================================================================
// Handler
// ============================================================================

/// Validates inbound notifications and drives fetch, enrich and forward.
#[derive(Clone)]
pub struct NotificationHandler {
    expected_account_id: String,
    source: Arc<dyn VideoSource>,
    sink: Arc<dyn VideoSink>,
}

impl NotificationHandler {
    pub fn new(
        expected_account_id: impl Into<String>,
        source: Arc<dyn VideoSource>,
        sink: Arc<dyn VideoSink>,
    ) -> Self {
        Self {
            expected_account_id: expected_account_id.into(),
            source,
            sink,
        }
    }

    /// Account whose events are processed
    pub fn expected_account_id(&self) -> &str {
        &self.expected_account_id
    }

    /// Decode a push body and check that it targets the configured account.
    ///
    /// # Errors
    ///
    /// - `ValidationError::MalformedEvent` when the body does not decode or
    ///   the video ID is unusable
    /// - `ValidationError::UnexpectedAccount` for events of other accounts
    pub fn validate_event(
        &self,
        body: &[u8],
    ) -> Result<(VideoChangeEvent, VideoId), ValidationError> {
        let event: VideoChangeEvent =
            serde_json::from_slice(body).map_err(|e| ValidationError::MalformedEvent {
                message: e.to_string(),
            })?;

        if event.account_id != self.expected_account_id {
            return Err(ValidationError::UnexpectedAccount {
                actual: event.account_id,
            });
        }

        let video_id =
            VideoId::new(event.video.clone()).map_err(|e| ValidationError::MalformedEvent {
                message: e.to_string(),
            })?;

        Ok((event, video_id))
    }

    /// Handle a notification pushed by the video platform.
    #[instrument(skip(self, body), fields(transaction_id = %transaction_id))]
    pub async fn handle_push(
        &self,
        body: &[u8],
        transaction_id: &TransactionId,
    ) -> Result<NotificationOutcome, NotificationError> {
        let (event, video_id) = match self.validate_event(body) {
            Ok(validated) => validated,
            Err(ValidationError::UnexpectedAccount { actual }) => {
                info!(
                    account_id = %actual,
                    expected_account_id = %self.expected_account_id,
                    "Ignoring notification for another account"
                );
                return Ok(NotificationOutcome::Ignored(IgnoreReason::AccountMismatch));
            }
            Err(e) => {
                warn!(error = %e, "Ignoring malformed notification");
                return Ok(NotificationOutcome::Ignored(IgnoreReason::MalformedEvent));
            }
        };

        info!(event = %event, "Received video notification");

        let record = self.process(&video_id, transaction_id).await?;
        let derived_id = derived_id_of(&record, &video_id);

        if record.is_not_found() {
            info!(video_id = %video_id, "Forwarded not-found marker for pushed video");
        }

        Ok(NotificationOutcome::Forwarded {
            video_id,
            derived_id,
        })
    }

    /// Handle an operator request to re-notify one video.
    #[instrument(skip(self), fields(video_id = %video_id, transaction_id = %transaction_id))]
    pub async fn handle_force(
        &self,
        video_id: &VideoId,
        transaction_id: &TransactionId,
    ) -> Result<NotificationOutcome, NotificationError> {
        info!("Forcing video notification");

        let record = self.process(video_id, transaction_id).await?;
        let derived_id = derived_id_of(&record, video_id);

        if record.is_not_found() {
            info!(
                error_code = record.error_code().unwrap_or_default(),
                "Forced video not found, forwarded not-found marker"
            );
            return Ok(NotificationOutcome::ForwardedNotFound {
                video_id: video_id.clone(),
                derived_id,
            });
        }

        Ok(NotificationOutcome::Forwarded {
            video_id: video_id.clone(),
            derived_id,
        })
    }

    /// Fetch, enrich and forward one video, returning the forwarded record.
    async fn process(
        &self,
        video_id: &VideoId,
        transaction_id: &TransactionId,
    ) -> Result<VideoRecord, NotificationError> {
        let mut record = self.source.fetch(video_id, transaction_id).await?;

        enricher::enrich(&mut record)?;

        self.sink.forward(&record, transaction_id).await?;

        info!(
            video_id = %video_id,
            derived_id = record.derived_id().unwrap_or_default(),
            "Video notification forwarded"
        );

        Ok(record)
    }
}

/// Derived ID of a forwarded record, which always carries an `id`
fn derived_id_of(record: &VideoRecord, video_id: &VideoId) -> Uuid {
    enricher::derive_id(record.id().unwrap_or(video_id.as_str()))
}

impl fmt::Debug for NotificationHandler {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("NotificationHandler")
            .field("expected_account_id", &self.expected_account_id)
            .finish_non_exhaustive()
    }
}

#[cfg(test)]
#[path = "notification_tests.rs"]
mod tests;
