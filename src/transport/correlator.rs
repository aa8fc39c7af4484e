//! Reply correlation.
//!
//! Every command carries a nonce, and Discord echoes it in the reply. The
//! [`Correlator`] keeps one one-shot sender per outstanding nonce; a reply
//! consumes its sender, and anything left unclaimed goes to the
//! [`Dispatcher`].
//!
//! Each entry is completed exactly once: by its reply, by a send failure,
//! or by [`Correlator::fail_all`] when the connection goes away.

// ============================================================================
// Imports
// ============================================================================

use parking_lot::Mutex;
use rustc_hash::FxHashMap;
use tokio::sync::oneshot;
use tokio::sync::oneshot::error::TryRecvError;
use tracing::{debug, trace, warn};

use crate::error::{Error, Result};
use crate::identifiers::Nonce;
use crate::protocol::Message;

use super::dispatcher::Dispatcher;

// ============================================================================
// Constants
// ============================================================================

/// Default limit on outstanding commands.
pub const DEFAULT_MAX_PENDING: usize = 1024;

// ============================================================================
// Types
// ============================================================================

/// Map of nonces to reply channels.
type PendingMap = FxHashMap<Nonce, oneshot::Sender<Result<Message>>>;

// ============================================================================
// Correlator
// ============================================================================

/// Pending-reply registry plus routing of incoming messages.
#[derive(Debug)]
pub struct Correlator {
    pending: Mutex<PendingMap>,
    dispatcher: Dispatcher,
    max_pending: usize,
}

impl Correlator {
    /// Creates an empty registry routing unclaimed messages to `dispatcher`.
    #[must_use]
    pub fn new(dispatcher: Dispatcher, max_pending: usize) -> Self {
        Self {
            pending: Mutex::new(PendingMap::default()),
            dispatcher,
            max_pending,
        }
    }

    /// Registers a pending entry for `nonce`.
    ///
    /// # Errors
    ///
    /// Returns [`Error::Protocol`] if the registry is full or the nonce is
    /// already outstanding.
    pub fn register(&self, nonce: Nonce) -> Result<PendingReply> {
        let mut pending = self.pending.lock();

        if pending.len() >= self.max_pending {
            warn!(
                pending = pending.len(),
                max = self.max_pending,
                "Too many pending commands"
            );
            return Err(Error::protocol(format!(
                "Too many pending commands: {}/{}",
                pending.len(),
                self.max_pending
            )));
        }

        if pending.contains_key(&nonce) {
            return Err(Error::protocol(format!("Nonce {nonce} already pending")));
        }

        let (tx, rx) = oneshot::channel();
        pending.insert(nonce.clone(), tx);
        trace!(%nonce, "Pending entry registered");

        Ok(PendingReply { nonce, rx })
    }

    /// Routes one incoming message.
    ///
    /// Completes the matching pending entry, or hands the message to the
    /// dispatcher. Returns `true` if a pending entry claimed it.
    pub fn route(&self, message: Message) -> bool {
        let sender = message
            .nonce
            .as_ref()
            .and_then(|nonce| self.pending.lock().remove(nonce));

        match sender {
            Some(tx) => {
                trace!(nonce = ?message.nonce, "Reply matched");
                let _ = tx.send(Ok(message));
                true
            }
            None => {
                if let Some(ref nonce) = message.nonce {
                    debug!(%nonce, "Reply for unknown nonce, dispatching");
                }
                self.dispatcher.message(message);
                false
            }
        }
    }

    /// Completes one entry with an error.
    ///
    /// Returns `false` if the entry was already gone.
    pub fn fail(&self, nonce: &Nonce, error: Error) -> bool {
        let sender = self.pending.lock().remove(nonce);
        match sender {
            Some(tx) => {
                let _ = tx.send(Err(error));
                true
            }
            None => false,
        }
    }

    /// Drops one entry without completing it (its waiter gave up).
    pub fn remove(&self, nonce: &Nonce) -> bool {
        self.pending.lock().remove(nonce).is_some()
    }

    /// Fails every pending entry with [`Error::Disconnected`].
    ///
    /// Returns the number of entries failed.
    pub fn fail_all(&self) -> usize {
        let drained: Vec<_> = self.pending.lock().drain().collect();
        let count = drained.len();

        for (_, tx) in drained {
            let _ = tx.send(Err(Error::Disconnected));
        }

        if count > 0 {
            debug!(count, "Failed pending commands on disconnect");
        }
        count
    }

    /// Number of outstanding entries.
    #[inline]
    #[must_use]
    pub fn len(&self) -> usize {
        self.pending.lock().len()
    }

    /// Returns `true` if nothing is outstanding.
    #[inline]
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.pending.lock().is_empty()
    }

    /// Configured limit on outstanding entries.
    #[inline]
    #[must_use]
    pub fn max_pending(&self) -> usize {
        self.max_pending
    }

    /// Dispatcher receiving unclaimed messages.
    #[inline]
    #[must_use]
    pub fn dispatcher(&self) -> &Dispatcher {
        &self.dispatcher
    }
}

// ============================================================================
// PendingReply
// ============================================================================

/// Completion handle for one outstanding command.
///
/// Resolves exactly once, with the reply or with an error. Only the reply to
/// its own nonce ever reaches it.
#[derive(Debug)]
pub struct PendingReply {
    nonce: Nonce,
    rx: oneshot::Receiver<Result<Message>>,
}

impl PendingReply {
    /// Nonce this handle waits on.
    #[inline]
    #[must_use]
    pub fn nonce(&self) -> &Nonce {
        &self.nonce
    }

    /// Waits for the reply.
    ///
    /// A reply classified as ERROR is still a reply and is returned as
    /// `Ok`; see [`Message::into_result`].
    ///
    /// # Errors
    ///
    /// - [`Error::Disconnected`] if the connection went away first
    /// - any error the send path recorded for this command
    pub async fn wait(self) -> Result<Message> {
        self.rx.await.map_err(|_| Error::Disconnected)?
    }

    /// Waits for the reply and sorts it into success or error.
    ///
    /// # Errors
    ///
    /// See [`PendingReply::wait`].
    pub async fn outcome(self) -> Result<ReplyOutcome> {
        let message = self.wait().await?;
        Ok(if message.is_error() {
            ReplyOutcome::Error(message)
        } else {
            ReplyOutcome::Success(message)
        })
    }

    /// Takes the result if it has already arrived.
    pub(crate) fn try_take(&mut self) -> Option<Result<Message>> {
        match self.rx.try_recv() {
            Ok(result) => Some(result),
            Err(TryRecvError::Empty) => None,
            Err(TryRecvError::Closed) => Some(Err(Error::Disconnected)),
        }
    }
}

/// A completed reply, split by its classification.
#[derive(Debug, Clone, PartialEq)]
pub enum ReplyOutcome {
    /// The reply is not an ERROR event.
    Success(Message),
    /// The reply is an ERROR event.
    Error(Message),
}

impl ReplyOutcome {
    /// Returns the reply regardless of classification.
    #[must_use]
    pub fn into_message(self) -> Message {
        match self {
            Self::Success(message) | Self::Error(message) => message,
        }
    }

    /// Returns `true` for [`ReplyOutcome::Success`].
    #[inline]
    #[must_use]
    pub fn is_success(&self) -> bool {
        matches!(self, Self::Success(_))
    }
}

// ============================================================================
// Tests
// ============================================================================
