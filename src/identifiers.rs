//! Type-safe identifiers.
//!
//! | Type | Wraps | Purpose |
//! |------|-------|---------|
//! | [`Nonce`] | `String` | Correlates a command with its reply |
//! | [`ConnectionId`] | `Uuid` | Distinguishes successive socket connections |

// ============================================================================
// Imports
// ============================================================================

use std::fmt;
use std::sync::atomic::{AtomicU64, Ordering};

use serde::{Deserialize, Serialize};
use uuid::Uuid;

// ============================================================================
// Nonce
// ============================================================================

/// Process-wide counter feeding [`Nonce::generate`].
static NONCE_COUNTER: AtomicU64 = AtomicU64::new(0);

/// Client-generated correlation token echoed back in a command's reply.
///
/// Generated nonces have the form `{counter}:{random}`: a process-local
/// monotonically increasing counter followed by a random 64-bit value. The
/// counter keeps rapid successive calls apart, the random half keeps a
/// restarted process from colliding with stale in-flight replies.
#[derive(Debug, Clone, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(transparent)]
pub struct Nonce(String);

impl Nonce {
    /// Generates a fresh nonce.
    #[must_use]
    pub fn generate() -> Self {
        let counter = NONCE_COUNTER.fetch_add(1, Ordering::Relaxed);
        let random: u64 = rand::random();
        Self(format!("{counter}:{random}"))
    }

    /// Wraps an existing nonce string (e.g. one read off the wire).
    #[inline]
    #[must_use]
    pub fn new(value: impl Into<String>) -> Self {
        Self(value.into())
    }

    /// Returns the nonce as a string slice.
    #[inline]
    #[must_use]
    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl fmt::Display for Nonce {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.0)
    }
}

impl From<&str> for Nonce {
    fn from(value: &str) -> Self {
        Self::new(value)
    }
}

// ============================================================================
// ConnectionId
// ============================================================================

/// Identity of one socket connection.
///
/// A new id is minted on every `connect()`, so late close notifications from
/// a previous socket can be told apart from the current one.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct ConnectionId(Uuid);

impl ConnectionId {
    /// Generates a new random connection id.
    #[inline]
    #[must_use]
    pub fn generate() -> Self {
        Self(Uuid::new_v4())
    }

    /// Returns the underlying UUID.
    #[inline]
    #[must_use]
    pub fn as_uuid(&self) -> &Uuid {
        &self.0
    }
}

impl fmt::Display for ConnectionId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.0)
    }
}

// ============================================================================
// Tests
// ============================================================================

#[cfg(test)]
mod tests {
    use super::*;

    use rustc_hash::FxHashSet;

    #[test]
    fn test_nonce_format() {
        let nonce = Nonce::generate();
        let (counter, random) = nonce.as_str().split_once(':').expect("separator");
        assert!(counter.parse::<u64>().is_ok());
        assert!(random.parse::<u64>().is_ok());
    }

    #[test]
    fn test_nonce_counter_increases() {
        let first = Nonce::generate();
        let second = Nonce::generate();
        let counter = |n: &Nonce| -> u64 {
            n.as_str()
                .split_once(':')
                .and_then(|(c, _)| c.parse().ok())
                .expect("counter")
        };
        assert!(counter(&second) > counter(&first));
    }

    #[test]
    fn test_ten_thousand_nonces_are_distinct() {
        let nonces: FxHashSet<Nonce> = (0..10_000).map(|_| Nonce::generate()).collect();
        assert_eq!(nonces.len(), 10_000);
    }

    #[test]
    fn test_nonce_serializes_as_string() {
        let nonce = Nonce::new("1:42");
        assert_eq!(serde_json::to_string(&nonce).expect("serialize"), "\"1:42\"");
    }

    #[test]
    fn test_connection_ids_differ() {
        assert_ne!(ConnectionId::generate(), ConnectionId::generate());
    }
}
