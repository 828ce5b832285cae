//! Typed parse of one stream-json line into the raw [`Message`] shape,
//! which `Formatter` then renders per-kind.

use crate::error::{Result, TimError};
use crate::types::messages::Message;

/// Parse a JSON value into a typed [`Message`].
///
/// # Errors
/// Returns [`TimError::MessageParse`] if the value doesn't match any known
/// `Message` variant, carrying the original value for diagnostics.
pub fn parse_message(data: serde_json::Value) -> Result<Message> {
    serde_json::from_value(data.clone())
        .map_err(|e| TimError::message_parse(format!("failed to parse message: {e}"), Some(data)))
}
