//! Injects the deterministic `derivedID` and the `kind` tag into a record.

use serde_json::Value;
use uuid::Uuid;

use crate::error::EnrichError;
use crate::VideoRecord;

/// Entity type tag stored in [`VideoRecord::KIND_FIELD`]
pub const VIDEO_KIND: &str = "video";

/// Name-based UUID (version 3) of a platform video ID, in the nil namespace.
///
/// The same platform ID always yields the same UUID, so repeated
/// notifications for one video resolve to one downstream entity.
pub fn derive_id(video_id: &str) -> Uuid {
    Uuid::new_v3(&Uuid::nil(), video_id.as_bytes())
}

/// Add `derivedID` and `kind` to `record`.
///
/// Overwrites both fields if present, so enriching twice is a no-op.
///
/// # Errors
///
/// Returns [`EnrichError::MissingId`] when `id` is absent or not a string.
pub fn enrich(record: &mut VideoRecord) -> Result<(), EnrichError> {
    let derived_id = record.id().map(derive_id).ok_or(EnrichError::MissingId)?;

    record.insert(
        VideoRecord::DERIVED_ID_FIELD,
        Value::String(derived_id.to_string()),
    );
    record.insert(VideoRecord::KIND_FIELD, Value::String(VIDEO_KIND.to_string()));

    Ok(())
}

#[cfg(test)]
#[path = "enricher_tests.rs"]
mod tests;
