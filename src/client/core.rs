//! Discord IPC client.
//!
//! [`Client`] owns the session state machine:
//!
//! ```text
//! Disconnected ──connect()──► Connecting ──ok──► Connected
//!      ▲                          │                  │
//!      └────────── failure ───────┘   disconnect() / peer close
//! ```
//!
//! # Example
//!
//! ```no_run
//! use discord_ipc::{Client, CommandType, EventType};
//! use serde_json::json;
//!
//! # async fn example() -> discord_ipc::Result<()> {
//! let client = Client::builder()
//!     .client_id("123456789012345678")
//!     .client_secret("secret")
//!     .build()?;
//!
//! let mut events = client.event_channel();
//! client.connect().await?;
//!
//! let channel = client
//!     .send_command_blocking(CommandType::GetSelectedVoiceChannel, json!({}))
//!     .await?;
//! if let Some(id) = channel.data_str(&["id"]) {
//!     client.subscribe(EventType::SpeakingStart, json!({ "channel_id": id })).await?;
//! }
//!
//! while let Some(notification) = events.recv().await {
//!     println!("{notification:?}");
//! }
//! # Ok(())
//! # }
//! ```

// ============================================================================
// Imports
// ============================================================================

use std::fmt;
use std::path::PathBuf;
use std::sync::{Arc, Weak};

use parking_lot::Mutex;
use serde_json::Value;
use tokio::sync::mpsc;
use tracing::{debug, info, warn};

use crate::auth::{CredentialStore, TokenExchange};
use crate::error::{Error, Result};
use crate::identifiers::ConnectionId;
use crate::protocol::{CommandType, EventType, Message, Request};
use crate::transport::{
    CloseCallback, Connection, Connector, Dispatcher, EventHandler, Notification, PendingReply,
};

use super::builder::ClientBuilder;
use super::options::ClientOptions;
use super::session::{ConnectionState, Session};

/// Code recorded when the peer closes a connected socket.
const REMOTE_CLOSE_CODE: &str = "DISCONNECTED";

// ============================================================================
// ClientInner
// ============================================================================

/// Shared client state.
pub(crate) struct ClientInner {
    pub(crate) client_id: String,
    pub(crate) scopes: Vec<String>,
    pub(crate) options: ClientOptions,
    pub(crate) connector: Arc<dyn Connector>,
    pub(crate) endpoint_dir: PathBuf,
    pub(crate) credentials: Arc<dyn CredentialStore>,
    pub(crate) token_exchange: Arc<dyn TokenExchange>,
    pub(crate) dispatcher: Dispatcher,
    pub(crate) session: Mutex<Session>,
    pub(crate) connection: Mutex<Option<Arc<Connection>>>,
    /// Serializes `connect()` calls.
    pub(crate) connect_lock: tokio::sync::Mutex<()>,
}

impl ClientInner {
    /// Tears down the session.
    ///
    /// With `only` set, does nothing unless that socket is still current.
    /// `code` is recorded only when no other error is recorded.
    fn teardown(&self, only: Option<ConnectionId>, code: Option<&'static str>) {
        let (was_connected, connection) = {
            let mut session = self.session.lock();
            if let Some(id) = only
                && session.connection_id != Some(id)
            {
                debug!(connection_id = %id, "Ignoring close of stale connection");
                return;
            }

            let was_connected = session.state == ConnectionState::Connected;
            if let Some(code) = code
                && session.last_error.is_none()
            {
                session.last_error = Some(code);
            }
            session.reset();
            (was_connected, self.connection.lock().take())
        };

        if let Some(connection) = connection {
            connection.shutdown();
        }

        if was_connected {
            info!("Disconnected from Discord");
            self.dispatcher.dispatch(Notification::Disconnected);
        }
    }

    /// Records a soft failure that does not abort `connect()`.
    pub(crate) fn record_soft_error(&self, code: &'static str) {
        self.session.lock().last_error = Some(code);
    }

    fn current_connection(&self) -> Result<Arc<Connection>> {
        self.connection.lock().clone().ok_or(Error::Disconnected)
    }
}

// ============================================================================
// Client
// ============================================================================

/// Discord IPC client.
///
/// Cheap to clone; clones share one session.
#[derive(Clone)]
pub struct Client {
    inner: Arc<ClientInner>,
}

impl Client {
    /// Returns a builder.
    #[inline]
    #[must_use]
    pub fn builder() -> ClientBuilder {
        ClientBuilder::new()
    }

    pub(crate) fn from_inner(inner: ClientInner) -> Self {
        Self {
            inner: Arc::new(inner),
        }
    }

    // ========================================================================
    // Lifecycle
    // ========================================================================

    /// Connects, performs the handshake and authenticates.
    ///
    /// Returns once the client is [`ConnectionState::Connected`] or the
    /// attempt has failed. A connected client is disconnected first.
    ///
    /// # Errors
    ///
    /// Any failure leaves the client disconnected, with [`Error::code`]
    /// also available from [`Client::last_error`]:
    ///
    /// - `ERR 1` no endpoint accepted
    /// - `ERR 2` / `ERR 8` unexpected or empty handshake reply
    /// - `ERR 4` / `ERR 5` / `ERR 6` / `ERR 7` authorization steps
    pub async fn connect(&self) -> Result<()> {
        let _guard = self.inner.connect_lock.lock().await;
        self.inner.teardown(None, None);

        let id = ConnectionId::generate();
        {
            let mut session = self.inner.session.lock();
            session.state = ConnectionState::Connecting;
            session.last_error = None;
            session.connection_id = Some(id);
        }
        debug!(connection_id = %id, "Connecting to Discord");

        let established = match self.inner.establish().await {
            Ok(established) => established,
            Err(e) => return Err(self.fail_connect(id, e)),
        };

        let connection = {
            let mut session = self.inner.session.lock();
            if session.connection_id != Some(id) {
                drop(session);
                return Err(self.fail_connect(id, Error::Disconnected));
            }

            let connection = Arc::new(
                established
                    .channel
                    .into_paused_connection(id, self.close_callback()),
            );
            *self.inner.connection.lock() = Some(Arc::clone(&connection));

            session.state = ConnectionState::Connected;
            session.user_id = Some(established.user_id);
            session.cdn_host = Some(established.cdn_host);
            session.last_error = None;
            connection
        };

        info!(connection_id = %id, "Connected to Discord");
        self.inner.dispatcher.dispatch(Notification::Connected);
        // A peer close can only be observed from here on.
        connection.resume();
        Ok(())
    }

    fn fail_connect(&self, id: ConnectionId, error: Error) -> Error {
        warn!(connection_id = %id, code = error.code(), error = %error, "Connect failed");
        self.inner.teardown(None, None);
        self.inner.session.lock().last_error = Some(error.code());
        error
    }

    fn close_callback(&self) -> CloseCallback {
        let inner: Weak<ClientInner> = Arc::downgrade(&self.inner);
        Box::new(move |id, error| {
            if let Some(inner) = inner.upgrade() {
                debug!(connection_id = %id, error = %error, "Peer closed the socket");
                inner.teardown(Some(id), Some(REMOTE_CLOSE_CODE));
            }
        })
    }

    /// Closes the socket and fails every pending command.
    ///
    /// Idempotent. Emits [`Notification::Disconnected`] only if the client
    /// was connected.
    pub fn disconnect(&self) {
        self.inner.teardown(None, None);
    }

    // ========================================================================
    // State
    // ========================================================================

    /// Returns `true` while connected.
    #[inline]
    #[must_use]
    pub fn is_connected(&self) -> bool {
        self.state() == ConnectionState::Connected
    }

    /// Current lifecycle state.
    #[must_use]
    pub fn state(&self) -> ConnectionState {
        self.inner.session.lock().state
    }

    /// Authenticated user's id.
    #[must_use]
    pub fn user_id(&self) -> Option<String> {
        self.inner.session.lock().user_id.clone()
    }

    /// CDN host announced in the READY dispatch.
    #[must_use]
    pub fn cdn_host(&self) -> Option<String> {
        self.inner.session.lock().cdn_host.clone()
    }

    /// Short code of the last failure (`"ERR 2"`, `"DISCONNECTED"`, ...).
    #[must_use]
    pub fn last_error(&self) -> Option<&'static str> {
        self.inner.session.lock().last_error
    }

    /// Application client id.
    #[inline]
    #[must_use]
    pub fn client_id(&self) -> &str {
        &self.inner.client_id
    }

    /// Options in use.
    #[inline]
    #[must_use]
    pub fn options(&self) -> &ClientOptions {
        &self.inner.options
    }

    /// Number of commands awaiting a reply.
    #[must_use]
    pub fn pending_count(&self) -> usize {
        self.inner
            .current_connection()
            .map_or(0, |connection| connection.pending_count())
    }

    /// Avatar URL on the session's CDN host.
    #[must_use]
    pub fn avatar_url(&self, user_id: &str, avatar_id: &str) -> Option<String> {
        self.inner.session.lock().avatar_url(user_id, avatar_id)
    }

    // ========================================================================
    // Commands
    // ========================================================================

    /// Sends a command and returns its completion handle.
    ///
    /// # Errors
    ///
    /// - [`Error::Disconnected`] if not connected
    /// - [`Error::Protocol`] if too many commands are pending
    pub fn send_command(&self, command: CommandType, args: Value) -> Result<PendingReply> {
        self.send_request(Request::new(command, args))
    }

    /// Sends a command and waits for its reply.
    ///
    /// An ERROR reply is returned as `Ok`; check [`Message::is_error`] or
    /// use [`Message::into_result`].
    ///
    /// # Errors
    ///
    /// - [`Error::Disconnected`] if not connected or the socket closes
    /// - [`Error::ReadTimeout`] if no reply within the command timeout
    pub async fn send_command_blocking(&self, command: CommandType, args: Value) -> Result<Message> {
        self.send_request_blocking(Request::new(command, args)).await
    }

    /// Sends a prepared request and returns its completion handle.
    ///
    /// # Errors
    ///
    /// See [`Client::send_command`].
    pub fn send_request(&self, request: Request) -> Result<PendingReply> {
        self.inner.current_connection()?.send(request)
    }

    /// Sends a prepared request and waits for its reply.
    ///
    /// # Errors
    ///
    /// See [`Client::send_command_blocking`].
    pub async fn send_request_blocking(&self, request: Request) -> Result<Message> {
        let connection = self.inner.current_connection()?;
        connection
            .send_blocking(request, self.inner.options.command_timeout)
            .await
    }

    /// Subscribes to `event`.
    ///
    /// # Errors
    ///
    /// See [`Client::send_command_blocking`].
    pub async fn subscribe(&self, event: EventType, args: Value) -> Result<Message> {
        self.send_request_blocking(Request::new(CommandType::Subscribe, args).with_event(event))
            .await
    }

    /// Unsubscribes from `event`.
    ///
    /// # Errors
    ///
    /// See [`Client::send_command_blocking`].
    pub async fn unsubscribe(&self, event: EventType, args: Value) -> Result<Message> {
        self.send_request_blocking(Request::new(CommandType::Unsubscribe, args).with_event(event))
            .await
    }

    // ========================================================================
    // Events
    // ========================================================================

    /// Installs the notification handler, replacing any previous one.
    pub fn set_event_handler(&self, handler: EventHandler) {
        self.inner.dispatcher.set_handler(handler);
    }

    /// Removes the notification handler.
    pub fn clear_event_handler(&self) {
        self.inner.dispatcher.clear_handler();
    }

    /// Installs a handler that forwards notifications into a channel.
    ///
    /// Replaces any previous handler.
    #[must_use]
    pub fn event_channel(&self) -> mpsc::UnboundedReceiver<Notification> {
        let (tx, rx) = mpsc::unbounded_channel();
        self.set_event_handler(Arc::new(move |notification: Notification| {
            let _ = tx.send(notification);
        }));
        rx
    }
}

impl fmt::Debug for Client {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let session = self.inner.session.lock();
        f.debug_struct("Client")
            .field("client_id", &self.inner.client_id)
            .field("state", &session.state)
            .field("user_id", &session.user_id)
            .field("last_error", &session.last_error)
            .finish_non_exhaustive()
    }
}

// ============================================================================
// Tests
// ============================================================================
