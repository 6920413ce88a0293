//! Protobuf parser for GTFS Realtime feeds.

use prost::Message;

use crate::error::PipelineError;
use crate::gtfs_rt::FeedMessage;

/// Decodes a protobuf-encoded GTFS-RT [`FeedMessage`] from raw bytes.
///
/// # Errors
///
/// Returns [`PipelineError::Decode`] if the bytes are not a valid
/// `FeedMessage`.
pub fn parse_feed(bytes: &[u8]) -> Result<FeedMessage, PipelineError> {
    Ok(FeedMessage::decode(bytes)?)
}
