//! Outgoing command requests.
//!
//! # Format
//!
//! ```json
//! {
//!   "cmd": "SUBSCRIBE",
//!   "args": { "channel_id": "..." },
//!   "evt": "VOICE_STATE_UPDATE",
//!   "nonce": "12:9817263541"
//! }
//! ```
//!
//! `cmd`, `args` and `nonce` are always present. Anything else (such as
//! `evt` on SUBSCRIBE) is an override merged in last, so an override can
//! also replace one of the standard fields.

// ============================================================================
// Imports
// ============================================================================

use serde_json::{Map, Value};

use crate::identifiers::Nonce;

use super::command::CommandType;
use super::event::EventType;

// ============================================================================
// Request
// ============================================================================

/// A command ready to be framed and sent.
#[derive(Debug, Clone, PartialEq)]
pub struct Request {
    /// Command name.
    pub cmd: String,
    /// Command arguments (an empty object when there are none).
    pub args: Value,
    /// Correlation nonce.
    pub nonce: Nonce,
    /// Extra top-level fields.
    pub overrides: Map<String, Value>,
}

impl Request {
    /// Creates a request for a known command with a fresh nonce.
    #[inline]
    #[must_use]
    pub fn new(command: CommandType, args: Value) -> Self {
        Self::raw(command.as_str(), args)
    }

    /// Creates a request from a raw command name with a fresh nonce.
    #[must_use]
    pub fn raw(cmd: impl Into<String>, args: Value) -> Self {
        let args = match args {
            Value::Null => Value::Object(Map::new()),
            other => other,
        };
        Self {
            cmd: cmd.into(),
            args,
            nonce: Nonce::generate(),
            overrides: Map::new(),
        }
    }

    /// Sets the `evt` field.
    #[inline]
    #[must_use]
    pub fn with_event(self, event: EventType) -> Self {
        self.with_override("evt", Value::String(event.as_str().to_string()))
    }

    /// Adds a top-level field.
    #[must_use]
    pub fn with_override(mut self, key: impl Into<String>, value: Value) -> Self {
        self.overrides.insert(key.into(), value);
        self
    }

    /// Replaces the generated nonce.
    #[inline]
    #[must_use]
    pub fn with_nonce(mut self, nonce: Nonce) -> Self {
        self.nonce = nonce;
        self
    }

    /// Returns the correlation nonce.
    #[inline]
    #[must_use]
    pub fn nonce(&self) -> &Nonce {
        &self.nonce
    }

    /// Builds the wire payload.
    #[must_use]
    pub fn into_payload(self) -> Value {
        let mut payload = Map::with_capacity(3 + self.overrides.len());
        payload.insert("cmd".to_string(), Value::String(self.cmd));
        payload.insert("args".to_string(), self.args);
        payload.insert(
            "nonce".to_string(),
            Value::String(self.nonce.as_str().to_string()),
        );
        payload.extend(self.overrides);
        Value::Object(payload)
    }
}

// ============================================================================
// Tests
// ============================================================================

#[cfg(test)]
mod tests {
    use super::*;

    use serde_json::json;

    #[test]
    fn test_payload_shape() {
        let request = Request::new(CommandType::GetGuild, json!({"guild_id": "1"}));
        let nonce = request.nonce().clone();

        assert_eq!(
            request.into_payload(),
            json!({"cmd": "GET_GUILD", "args": {"guild_id": "1"}, "nonce": nonce.as_str()})
        );
    }

    #[test]
    fn test_null_args_become_empty_object() {
        let payload = Request::new(CommandType::GetGuilds, Value::Null).into_payload();
        assert_eq!(payload["args"], json!({}));
    }

    #[test]
    fn test_subscribe_carries_event() {
        let payload = Request::new(CommandType::Subscribe, json!({"channel_id": "42"}))
            .with_event(EventType::SpeakingStart)
            .into_payload();

        assert_eq!(payload["cmd"], "SUBSCRIBE");
        assert_eq!(payload["evt"], "SPEAKING_START");
        assert_eq!(payload["args"]["channel_id"], "42");
    }

    #[test]
    fn test_override_wins() {
        let payload = Request::raw("AUTHENTICATE", json!({}))
            .with_nonce(Nonce::new("1:42"))
            .with_override("args", json!({"access_token": "t"}))
            .into_payload();

        assert_eq!(payload["nonce"], "1:42");
        assert_eq!(payload["args"]["access_token"], "t");
    }

    #[test]
    fn test_fresh_nonce_per_request() {
        let a = Request::new(CommandType::GetGuilds, json!({}));
        let b = Request::new(CommandType::GetGuilds, json!({}));
        assert_ne!(a.nonce(), b.nonce());
    }
}
