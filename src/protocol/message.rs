//! Decoded messages.
//!
//! A [`Message`] is one received frame plus its classification: the `cmd`
//! it answers, the `evt` it carries, its correlation nonce and the nested
//! `data` object. Messages are built once per frame and never mutated.
//!
//! # Format
//!
//! ```json
//! {
//!   "cmd": "AUTHENTICATE",
//!   "evt": null,
//!   "nonce": "7:1234567890",
//!   "data": { "user": { "id": "..." } }
//! }
//! ```

// ============================================================================
// Imports
// ============================================================================

use serde_json::{Map, Value};

use crate::error::{Error, Result};
use crate::identifiers::Nonce;

use super::command::CommandType;
use super::event::EventType;
use super::frame::Frame;

// ============================================================================
// Message
// ============================================================================

/// A decoded and classified frame.
#[derive(Debug, Clone, PartialEq)]
pub struct Message {
    /// Raw opcode of the frame.
    pub opcode: u32,
    /// Full parsed payload.
    pub json: Map<String, Value>,
    /// The `data` sub-object (`Value::Null` when absent).
    pub data: Value,
    /// Correlation nonce, if the peer set one.
    pub nonce: Option<Nonce>,
    /// Classified `cmd` field.
    pub command: Option<CommandType>,
    /// Classified `evt` field.
    pub event: EventType,
}

impl Message {
    /// Classifies a parsed payload.
    #[must_use]
    pub fn from_json(json: Map<String, Value>, opcode: u32) -> Self {
        let nonce = json
            .get("nonce")
            .and_then(Value::as_str)
            .filter(|nonce| !nonce.is_empty())
            .map(Nonce::new);
        let command = json
            .get("cmd")
            .and_then(Value::as_str)
            .and_then(CommandType::from_name);
        let event = json
            .get("evt")
            .and_then(Value::as_str)
            .map(EventType::from_name)
            .unwrap_or_default();
        let data = json.get("data").cloned().unwrap_or(Value::Null);

        Self {
            opcode,
            json,
            data,
            nonce,
            command,
            event,
        }
    }

    /// Returns `true` if the payload is an empty object.
    #[inline]
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.json.is_empty()
    }

    /// Returns `true` if the message is classified as an ERROR event.
    #[inline]
    #[must_use]
    pub fn is_error(&self) -> bool {
        self.event == EventType::Error
    }

    /// Returns the raw `cmd` string.
    #[inline]
    #[must_use]
    pub fn command_name(&self) -> Option<&str> {
        self.get_str("cmd")
    }

    /// Returns the raw `evt` string.
    #[inline]
    #[must_use]
    pub fn event_name(&self) -> Option<&str> {
        self.get_str("evt")
    }

    /// Gets a top-level string field.
    #[inline]
    #[must_use]
    pub fn get_str(&self, key: &str) -> Option<&str> {
        self.json.get(key).and_then(Value::as_str)
    }

    /// Looks up a string by path inside `data` (e.g. `&["user", "id"]`).
    #[must_use]
    pub fn data_str(&self, path: &[&str]) -> Option<&str> {
        path.iter()
            .try_fold(&self.data, |value, key| value.get(key))
            .and_then(Value::as_str)
    }

    /// Discord error code carried by an ERROR reply.
    #[must_use]
    pub fn error_code(&self) -> Option<i64> {
        self.data.get("code").and_then(Value::as_i64)
    }

    /// Discord error message carried by an ERROR reply.
    #[must_use]
    pub fn error_message(&self) -> Option<&str> {
        self.data_str(&["message"])
    }

    /// Turns an ERROR-classified reply into an error.
    ///
    /// # Errors
    ///
    /// Returns [`Error::CommandFailed`] if the message is an ERROR event.
    pub fn into_result(self) -> Result<Self> {
        if self.is_error() {
            let code = self.error_code().unwrap_or_default();
            let message = self.error_message().unwrap_or("unknown error").to_string();
            return Err(Error::command_failed(code, message));
        }
        Ok(self)
    }
}

impl From<Frame> for Message {
    fn from(frame: Frame) -> Self {
        Self::from_json(frame.payload, frame.opcode)
    }
}

// ============================================================================
// Tests
// ============================================================================

#[cfg(test)]
mod tests {
    use super::*;

    use serde_json::json;

    fn message(value: Value) -> Message {
        match value {
            Value::Object(map) => Message::from_json(map, 1),
            _ => panic!("expected object"),
        }
    }

    #[test]
    fn test_ready_dispatch_classification() {
        let msg = message(json!({
            "cmd": "DISPATCH",
            "evt": "READY",
            "nonce": null,
            "data": {"v": 1, "config": {"cdn_host": "cdn.discordapp.com"}}
        }));

        assert_eq!(msg.command, Some(CommandType::Dispatch));
        assert_eq!(msg.event, EventType::Ready);
        assert_eq!(msg.nonce, None);
        assert_eq!(
            msg.data_str(&["config", "cdn_host"]),
            Some("cdn.discordapp.com")
        );
    }

    #[test]
    fn test_reply_carries_nonce() {
        let msg = message(json!({
            "cmd": "AUTHENTICATE",
            "nonce": "3:99",
            "data": {"user": {"id": "80351110224678912"}}
        }));

        assert_eq!(msg.nonce, Some(Nonce::new("3:99")));
        assert_eq!(msg.data_str(&["user", "id"]), Some("80351110224678912"));
        assert!(!msg.is_error());
    }

    #[test]
    fn test_unknown_names() {
        let msg = message(json!({"cmd": "SOMETHING_NEW", "evt": "LOBBY_DELETE"}));
        assert_eq!(msg.command, None);
        assert_eq!(msg.command_name(), Some("SOMETHING_NEW"));
        assert_eq!(msg.event, EventType::Unknown);
        assert_eq!(msg.event_name(), Some("LOBBY_DELETE"));
    }

    #[test]
    fn test_error_reply_into_result() {
        let msg = message(json!({
            "cmd": "AUTHENTICATE",
            "evt": "ERROR",
            "nonce": "1:1",
            "data": {"code": 4009, "message": "Invalid access token"}
        }));

        assert!(msg.is_error());
        assert_eq!(msg.error_code(), Some(4009));
        match msg.into_result() {
            Err(Error::CommandFailed { code, message }) => {
                assert_eq!(code, 4009);
                assert_eq!(message, "Invalid access token");
            }
            other => panic!("unexpected: {other:?}"),
        }
    }

    #[test]
    fn test_empty_message() {
        let msg = Message::from_json(Map::new(), 1);
        assert!(msg.is_empty());
        assert_eq!(msg.data, Value::Null);
        assert_eq!(msg.data_str(&["config", "cdn_host"]), None);
    }
}
