//! # Video Notifier Core
//!
//! Core business logic for relaying video-change notifications from a video
//! platform (Brightcove by default) to the CMS notifier ingestion endpoint.
//!
//! A notification flows through four steps:
//! - the [`notification::NotificationHandler`] validates the inbound event,
//! - the [`fetcher::VideoFetcher`] retrieves the video record, renewing the
//!   OAuth bearer token through the [`auth::CredentialManager`] on a 401,
//! - the [`enricher`] injects a deterministic `derivedID` and a `kind` tag,
//! - the [`forwarder::VideoForwarder`] posts the record downstream.
//!
//! ## Architecture
//!
//! The orchestrator depends only on the [`fetcher::VideoSource`] and
//! [`forwarder::VideoSink`] traits. The HTTP-backed implementations are
//! injected at runtime by the API crate.
//!
//! ## Usage
//!
//! ```rust
//! use video_notifier_core::{enricher, VideoRecord};
//!
//! let mut record = VideoRecord::new();
//! record.insert("id", serde_json::json!("4492075574001"));
//! enricher::enrich(&mut record).unwrap();
//! assert_eq!(record.kind(), Some("video"));
//! ```

use chrono::{DateTime, SecondsFormat, Utc};
use serde::{Deserialize, Deserializer, Serialize};
use serde_json::{Map, Value};
use std::fmt;
use std::str::FromStr;

pub mod auth;
pub mod client;
pub mod enricher;
pub mod error;
pub mod fetcher;
pub mod forwarder;
pub mod notification;

pub use error::{
    AuthError, ClientError, EnrichError, FetchError, ForwardError, NotificationError,
    ValidationError,
};

// ============================================================================
// Domain Identifier Types
// ============================================================================

/// Platform-native identifier of a video.
///
/// The identifier is placed verbatim into the upstream request path, so it
/// must be non-empty and free of path separators and whitespace.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(try_from = "String", into = "String")]
pub struct VideoId(String);

impl VideoId {
    /// Create a new video ID with validation
    pub fn new(value: impl Into<String>) -> Result<Self, ValidationError> {
        let value = value.into();

        if value.is_empty() {
            return Err(ValidationError::Required {
                field: "video".to_string(),
            });
        }

        if value
            .chars()
            .any(|c| c == '/' || c == '?' || c == '#' || c.is_whitespace())
        {
            return Err(ValidationError::InvalidFormat {
                field: "video".to_string(),
                message: "path separators, query markers and whitespace are not allowed"
                    .to_string(),
            });
        }

        Ok(Self(value))
    }

    /// Get string representation
    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl fmt::Display for VideoId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.0)
    }
}

impl FromStr for VideoId {
    type Err = ValidationError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        Self::new(s)
    }
}

impl TryFrom<String> for VideoId {
    type Error = ValidationError;

    fn try_from(value: String) -> Result<Self, Self::Error> {
        Self::new(value)
    }
}

impl From<VideoId> for String {
    fn from(value: VideoId) -> Self {
        value.0
    }
}

/// Correlation identifier for one inbound request.
///
/// Read from the `X-Request-Id` header when the caller supplies one,
/// otherwise generated as `tid_` followed by ten lowercase hex characters.
/// The same value is sent downstream so the CMS notifier can join its logs
/// with ours.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct TransactionId(String);

impl TransactionId {
    /// HTTP header carrying the transaction ID in both directions
    pub const HEADER: &'static str = "X-Request-Id";

    const PREFIX: &'static str = "tid_";
    const RANDOM_LEN: usize = 10;

    /// Generate a new transaction ID
    pub fn new() -> Self {
        let random = uuid::Uuid::new_v4().simple().to_string();
        Self(format!("{}{}", Self::PREFIX, &random[..Self::RANDOM_LEN]))
    }

    /// Use the supplied header value, or generate a fresh ID when it is
    /// missing or blank.
    pub fn from_header_value(value: Option<&str>) -> Self {
        match value.map(str::trim) {
            Some(v) if !v.is_empty() => Self(v.to_string()),
            _ => Self::new(),
        }
    }

    /// Get string representation
    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl Default for TransactionId {
    fn default() -> Self {
        Self::new()
    }
}

impl fmt::Display for TransactionId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.0)
    }
}

// ============================================================================
// Inbound Event
// ============================================================================

/// Video-change notification pushed by the video platform.
///
/// Example payload:
///
/// ```json
/// {"timestamp":1423840514446,"account_id":"775205503001","event":"video-change","video":"4020894387001","version":26}
/// ```
///
/// Missing and `null` fields decode to their zero value. Only the account
/// and video checks decide whether an event is dropped.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct VideoChangeEvent {
    /// Milliseconds since the Unix epoch
    #[serde(default, deserialize_with = "null_as_default")]
    pub timestamp: i64,

    /// Account the video belongs to
    #[serde(default, deserialize_with = "null_as_default")]
    pub account_id: String,

    /// Event kind, e.g. `video-change`
    #[serde(default, deserialize_with = "null_as_default")]
    pub event: String,

    /// Identifier of the changed video
    #[serde(default, deserialize_with = "null_as_default")]
    pub video: String,

    /// Platform-side version counter of the video
    #[serde(default, deserialize_with = "null_as_default")]
    pub version: i64,
}

fn null_as_default<'de, D, T>(deserializer: D) -> Result<T, D::Error>
where
    D: Deserializer<'de>,
    T: Default + Deserialize<'de>,
{
    Ok(Option::<T>::deserialize(deserializer)?.unwrap_or_default())
}

impl VideoChangeEvent {
    /// Event time, when the timestamp is within chrono's representable range
    pub fn occurred_at(&self) -> Option<DateTime<Utc>> {
        DateTime::<Utc>::from_timestamp_millis(self.timestamp)
    }
}

impl fmt::Display for VideoChangeEvent {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let occurred_at = self
            .occurred_at()
            .map(|t| t.to_rfc3339_opts(SecondsFormat::Millis, true))
            .unwrap_or_else(|| self.timestamp.to_string());

        write!(
            f,
            "videoEvent: timestamp: [{}], account_id: [{}], event: [{}], video: [{}], version: [{}]",
            occurred_at, self.account_id, self.event, self.video, self.version
        )
    }
}

// ============================================================================
// Video Record
// ============================================================================

/// Open-ended video document as served by the video platform.
///
/// The platform owns the schema, so the record keeps every field it receives
/// in insertion order and only interprets the handful of fields the notifier
/// reads or writes.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(transparent)]
pub struct VideoRecord(Map<String, Value>);

impl VideoRecord {
    /// Platform-native identifier field
    pub const ID_FIELD: &'static str = "id";

    /// Error code field present on not-found markers
    pub const ERROR_CODE_FIELD: &'static str = "error_code";

    /// Field receiving the deterministic identifier
    pub const DERIVED_ID_FIELD: &'static str = "derivedID";

    /// Field receiving the entity type tag
    pub const KIND_FIELD: &'static str = "kind";

    /// Error code the platform uses for missing videos
    pub const NOT_FOUND_CODE: &'static str = "NOT_FOUND";

    /// Create an empty record
    pub fn new() -> Self {
        Self(Map::new())
    }

    /// Look up a field
    pub fn get(&self, field: &str) -> Option<&Value> {
        self.0.get(field)
    }

    /// Insert or overwrite a field, returning the previous value
    pub fn insert(&mut self, field: impl Into<String>, value: Value) -> Option<Value> {
        self.0.insert(field.into(), value)
    }

    /// Platform-native identifier, if present and a string
    pub fn id(&self) -> Option<&str> {
        self.string_field(Self::ID_FIELD)
    }

    /// Platform error code, if present and a string
    pub fn error_code(&self) -> Option<&str> {
        self.string_field(Self::ERROR_CODE_FIELD)
    }

    /// Whether this record marks a video the platform does not know about
    pub fn is_not_found(&self) -> bool {
        self.error_code() == Some(Self::NOT_FOUND_CODE)
    }

    /// Injected deterministic identifier
    pub fn derived_id(&self) -> Option<&str> {
        self.string_field(Self::DERIVED_ID_FIELD)
    }

    /// Injected entity type tag
    pub fn kind(&self) -> Option<&str> {
        self.string_field(Self::KIND_FIELD)
    }

    /// Number of fields
    pub fn len(&self) -> usize {
        self.0.len()
    }

    /// Whether the record has no fields
    pub fn is_empty(&self) -> bool {
        self.0.is_empty()
    }

    /// Borrow the underlying JSON object
    pub fn as_map(&self) -> &Map<String, Value> {
        &self.0
    }

    /// Consume the record, returning the underlying JSON object
    pub fn into_inner(self) -> Map<String, Value> {
        self.0
    }

    fn string_field(&self, field: &str) -> Option<&str> {
        self.0.get(field).and_then(Value::as_str)
    }
}

impl From<Map<String, Value>> for VideoRecord {
    fn from(map: Map<String, Value>) -> Self {
        Self(map)
    }
}

#[cfg(test)]
#[path = "lib_tests.rs"]
mod tests;
