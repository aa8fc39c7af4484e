//! Unsolicited message delivery.
//!
//! Messages nobody is waiting for, together with connection lifecycle
//! changes, are handed to one application-installed handler.

// ============================================================================
// Imports
// ============================================================================

use std::fmt;
use std::sync::Arc;

use parking_lot::Mutex;
use tracing::trace;

use crate::protocol::Message;

// ============================================================================
// Types
// ============================================================================

/// A notification delivered to the application.
#[derive(Debug, Clone, PartialEq)]
pub enum Notification {
    /// `connect()` completed.
    Connected,
    /// A connected session ended.
    Disconnected,
    /// A message that is not the reply to any pending command.
    Message(Message),
}

/// Application callback for notifications.
///
/// Called on whichever task decoded the message, so it should return
/// quickly.
pub type EventHandler = Arc<dyn Fn(Notification) + Send + Sync>;

// ============================================================================
// Dispatcher
// ============================================================================

/// Holds the handler and delivers notifications to it.
#[derive(Clone, Default)]
pub struct Dispatcher {
    handler: Arc<Mutex<Option<EventHandler>>>,
}

impl Dispatcher {
    /// Creates a dispatcher with no handler.
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Installs the handler, replacing any previous one.
    pub fn set_handler(&self, handler: EventHandler) {
        *self.handler.lock() = Some(handler);
    }

    /// Removes the handler.
    pub fn clear_handler(&self) {
        *self.handler.lock() = None;
    }

    /// Returns `true` if a handler is installed.
    #[inline]
    #[must_use]
    pub fn has_handler(&self) -> bool {
        self.handler.lock().is_some()
    }

    /// Delivers a notification.
    ///
    /// The lock is released before the handler runs, so a handler may
    /// replace itself.
    pub fn dispatch(&self, notification: Notification) {
        let handler = self.handler.lock().clone();
        match handler {
            Some(handler) => handler(notification),
            None => trace!(?notification, "No event handler, notification dropped"),
        }
    }

    /// Delivers an unsolicited message.
    #[inline]
    pub fn message(&self, message: Message) {
        trace!(event = %message.event, "Dispatching unsolicited message");
        self.dispatch(Notification::Message(message));
    }
}

impl fmt::Debug for Dispatcher {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Dispatcher")
            .field("has_handler", &self.has_handler())
            .finish()
    }
}

// ============================================================================
// Tests
// ============================================================================

#[cfg(test)]
mod tests {
    use super::*;

    use serde_json::Map;

    #[test]
    fn test_dispatch_reaches_handler() {
        let dispatcher = Dispatcher::new();
        let seen: Arc<Mutex<Vec<Notification>>> = Arc::new(Mutex::new(Vec::new()));

        let sink = Arc::clone(&seen);
        dispatcher.set_handler(Arc::new(move |n: Notification| sink.lock().push(n)));

        dispatcher.dispatch(Notification::Connected);
        dispatcher.message(Message::from_json(Map::new(), 1));

        let seen = seen.lock();
        assert_eq!(seen.len(), 2);
        assert_eq!(seen[0], Notification::Connected);
        assert!(matches!(seen[1], Notification::Message(_)));
    }

    #[test]
    fn test_no_handler_is_silent() {
        let dispatcher = Dispatcher::new();
        assert!(!dispatcher.has_handler());
        dispatcher.dispatch(Notification::Disconnected);
    }

    #[test]
    fn test_clear_handler() {
        let dispatcher = Dispatcher::new();
        let count = Arc::new(Mutex::new(0));

        let counter = Arc::clone(&count);
        dispatcher.set_handler(Arc::new(move |_: Notification| *counter.lock() += 1));
        dispatcher.dispatch(Notification::Connected);
        dispatcher.clear_handler();
        dispatcher.dispatch(Notification::Connected);

        assert_eq!(*count.lock(), 1);
    }

    #[test]
    fn test_handler_may_replace_itself() {
        let dispatcher = Dispatcher::new();
        let inner = dispatcher.clone();
        dispatcher.set_handler(Arc::new(move |_: Notification| inner.clear_handler()));

        dispatcher.dispatch(Notification::Connected);
        assert!(!dispatcher.has_handler());
    }
}
