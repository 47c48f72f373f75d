// Messages posted by controlled pages

use crate::error::{Result, WorkerError};
use serde::Deserialize;
use serde_json::Value;

/// A message from a controlled page, discriminated by its `type` field.
#[derive(Debug, Clone, PartialEq, Deserialize)]
#[serde(tag = "type", rename_all = "SCREAMING_SNAKE_CASE")]
pub enum ClientMessage {
    /// Activate the waiting version now.
    SkipWaiting,
    /// Fetch and store these URLs in the runtime cache.
    CacheUrls { urls: Vec<String> },
    /// Any other type; ignored.
    #[serde(other)]
    Unknown,
}

impl ClientMessage {
    /// Interpret a raw message. A message without a string `type` is
    /// [`ClientMessage::Unknown`]; a known type with a malformed payload is an
    /// invalid request.
    pub fn from_value(value: Value) -> Result<Self> {
        let kind = match value.get("type").and_then(Value::as_str) {
            Some(kind) => kind.to_string(),
            None => return Ok(ClientMessage::Unknown),
        };
        serde_json::from_value(value)
            .map_err(|e| WorkerError::InvalidRequest(format!("malformed {} message: {}", kind, e)))
    }

    pub fn kind(&self) -> &'static str {
        match self {
            ClientMessage::SkipWaiting => "SKIP_WAITING",
            ClientMessage::CacheUrls { .. } => "CACHE_URLS",
            ClientMessage::Unknown => "UNKNOWN",
        }
    }
}

/// What handling a message did.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum MessageOutcome {
    SkippedWaiting,
    Cached { entries: usize },
    Ignored,
}
