//! Session state.

// ============================================================================
// Imports
// ============================================================================

use std::fmt;

use crate::identifiers::ConnectionId;

// ============================================================================
// ConnectionState
// ============================================================================

/// Lifecycle of a [`Client`](crate::Client).
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default)]
pub enum ConnectionState {
    /// No socket.
    #[default]
    Disconnected,
    /// `connect()` is running.
    Connecting,
    /// Handshake and authentication succeeded.
    Connected,
}

impl fmt::Display for ConnectionState {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let name = match self {
            Self::Disconnected => "disconnected",
            Self::Connecting => "connecting",
            Self::Connected => "connected",
        };
        f.write_str(name)
    }
}

// ============================================================================
// Session
// ============================================================================

/// Mutable session data, owned by the client's state machine.
#[derive(Debug, Clone, Default)]
pub struct Session {
    /// Current lifecycle state.
    pub state: ConnectionState,
    /// Authenticated user's id.
    pub user_id: Option<String>,
    /// CDN host from the READY dispatch.
    pub cdn_host: Option<String>,
    /// Short code of the last connect failure.
    pub last_error: Option<&'static str>,
    /// Socket currently in use.
    pub connection_id: Option<ConnectionId>,
}

impl Session {
    /// Clears everything tied to the current socket.
    ///
    /// `last_error` survives so callers can inspect it after a failure.
    pub fn reset(&mut self) {
        self.state = ConnectionState::Disconnected;
        self.user_id = None;
        self.cdn_host = None;
        self.connection_id = None;
    }

    /// Builds an avatar URL on the session's CDN host.
    #[must_use]
    pub fn avatar_url(&self, user_id: &str, avatar_id: &str) -> Option<String> {
        self.cdn_host
            .as_deref()
            .filter(|host| !host.is_empty())
            .map(|host| avatar_url(host, user_id, avatar_id))
    }
}

/// Builds `https://{cdn_host}/avatars/{user_id}/{avatar_id}.png`.
#[must_use]
pub fn avatar_url(cdn_host: &str, user_id: &str, avatar_id: &str) -> String {
    format!("https://{cdn_host}/avatars/{user_id}/{avatar_id}.png")
}

// ============================================================================
// Tests
// ============================================================================
