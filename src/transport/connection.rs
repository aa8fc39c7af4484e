//! Socket ownership and the read loop.
//!
//! The byte stream has exactly one reader at any time:
//!
//! | Phase | Owner | Reads |
//! |-------|-------|-------|
//! | `connect()` | [`RawChannel`] | Blocking: the caller pumps frames until its reply arrives |
//! | Connected | [`Connection`] reader task | Continuous: every frame is routed as it arrives |
//!
//! [`RawChannel::into_connection`] moves the buffered reader into the
//! reader task, so bytes already received during the handshake are not lost.
//! Both phases route frames through the same [`Correlator`].
//!
//! # Tasks
//!
//! A connected [`Connection`] runs two tasks:
//!
//! - the reader, which decodes frames and routes them
//! - the writer, which drains a command channel and writes frames
//!
//! They are separate because a frame read cannot be cancelled half way
//! without losing alignment, so it must never sit in a `select!` next to
//! writes.

// ============================================================================
// Imports
// ============================================================================

use std::sync::Arc;
use std::time::Duration;

use serde_json::Value;
use tokio::io::{ReadHalf, WriteHalf};
use parking_lot::Mutex;
use tokio::sync::{mpsc, oneshot};
use tokio::task::AbortHandle;
use tokio::time::{Instant, timeout, timeout_at};
use tracing::{debug, trace, warn};

use crate::error::{Error, Result};
use crate::identifiers::{ConnectionId, Nonce};
use crate::protocol::frame::{self, FrameReader, FrameWriter, Opcode};
use crate::protocol::{Message, Request};

use super::correlator::{Correlator, PendingReply};
use super::endpoint::BoxedStream;

// ============================================================================
// Types
// ============================================================================

type Reader = FrameReader<ReadHalf<BoxedStream>>;
type Writer = FrameWriter<WriteHalf<BoxedStream>>;

/// Callback run when the peer closes a connected socket.
///
/// Not run when the connection is shut down locally.
pub type CloseCallback = Box<dyn FnOnce(ConnectionId, Error) + Send>;

/// Internal commands for the writer task.
enum WriterCommand {
    /// Write an encoded frame for `nonce`.
    Send { nonce: Nonce, bytes: Vec<u8> },
    /// Close the write side and stop.
    Shutdown,
}

/// Whole milliseconds in `duration`, saturating at `u64::MAX`.
pub(crate) fn millis(duration: Duration) -> u64 {
    u64::try_from(duration.as_millis()).unwrap_or(u64::MAX)
}

// ============================================================================
// RawChannel
// ============================================================================

/// Exclusive, blocking access to a freshly opened socket.
///
/// Used while `connect()` runs. Reads happen only inside calls on this
/// type, and a read that times out leaves the stream unusable, so callers
/// disconnect on any error.
pub struct RawChannel {
    reader: Reader,
    writer: Writer,
    correlator: Arc<Correlator>,
}

impl RawChannel {
    /// Takes ownership of a connected stream.
    #[must_use]
    pub fn new(stream: BoxedStream, correlator: Arc<Correlator>) -> Self {
        let (read_half, write_half) = tokio::io::split(stream);
        Self {
            reader: FrameReader::new(read_half),
            writer: FrameWriter::new(write_half),
            correlator,
        }
    }

    /// Writes one frame.
    ///
    /// # Errors
    ///
    /// Returns an error if encoding or writing fails.
    pub async fn send_frame(&mut self, opcode: Opcode, payload: &Value) -> Result<()> {
        self.writer.write_frame(opcode, payload).await
    }

    /// Reads the next frame, whatever it is.
    ///
    /// # Errors
    ///
    /// - [`Error::ReadTimeout`] if no frame arrives within `wait`
    /// - [`Error::TruncatedStream`] if the peer closes mid-frame
    pub async fn read_message(&mut self, wait: Duration) -> Result<Message> {
        let frame = timeout(wait, self.reader.read_frame())
            .await
            .map_err(|_| Error::read_timeout(millis(wait)))??;
        Ok(Message::from(frame))
    }

    /// Sends a command and reads until its reply arrives.
    ///
    /// Frames that are not the reply are dispatched as they are read. Once
    /// the reply is in, frames already sitting in the buffer are dispatched
    /// too before returning, so delivery order matches arrival order.
    ///
    /// # Errors
    ///
    /// - [`Error::ReadTimeout`] if the reply does not arrive within `wait`
    /// - [`Error::TruncatedStream`] / [`Error::Io`] on stream failure
    pub async fn request(&mut self, request: Request, wait: Duration) -> Result<Message> {
        let mut pending = self.correlator.register(request.nonce().clone())?;
        let payload = request.into_payload();

        if let Err(e) = self.writer.write_frame(Opcode::Frame, &payload).await {
            self.correlator.remove(pending.nonce());
            return Err(e);
        }
        trace!(nonce = %pending.nonce(), "Blocking request sent");

        let deadline = Instant::now() + wait;
        let reply = loop {
            if let Some(result) = pending.try_take() {
                break result;
            }

            match timeout_at(deadline, self.reader.read_frame()).await {
                Ok(Ok(frame)) => {
                    self.correlator.route(Message::from(frame));
                }
                Ok(Err(e)) => {
                    self.correlator.remove(pending.nonce());
                    return Err(e);
                }
                Err(_) => {
                    self.correlator.remove(pending.nonce());
                    return Err(Error::read_timeout(millis(wait)));
                }
            }
        };

        self.drain_buffered().await?;
        reply
    }

    /// Dispatches every complete frame already in the read buffer.
    async fn drain_buffered(&mut self) -> Result<()> {
        while self.reader.has_buffered_frame() {
            let frame = self.reader.read_frame().await?;
            self.correlator.route(Message::from(frame));
        }
        Ok(())
    }

    /// Hands the socket to background tasks.
    ///
    /// Must be called from within a tokio runtime.
    #[must_use]
    pub fn into_connection(self, id: ConnectionId, on_closed: CloseCallback) -> Connection {
        let connection = self.into_paused_connection(id, on_closed);
        connection.resume();
        connection
    }

    /// Like [`RawChannel::into_connection`], but the reader task waits for
    /// [`Connection::resume`]. Frames arriving meanwhile stay buffered in
    /// the socket, and a peer close is not observed until then.
    ///
    /// Must be called from within a tokio runtime.
    #[must_use]
    pub fn into_paused_connection(self, id: ConnectionId, on_closed: CloseCallback) -> Connection {
        let (command_tx, command_rx) = mpsc::unbounded_channel();
        let (resume_tx, resume_rx) = oneshot::channel();

        tokio::spawn(run_writer(
            self.writer,
            command_rx,
            Arc::clone(&self.correlator),
        ));
        let reader = tokio::spawn(run_reader(
            self.reader,
            Arc::clone(&self.correlator),
            id,
            resume_rx,
            on_closed,
        ))
        .abort_handle();

        debug!(connection_id = %id, "Connection tasks started");

        Connection {
            id,
            command_tx,
            correlator: self.correlator,
            reader,
            resume: Mutex::new(Some(resume_tx)),
        }
    }
}

// ============================================================================
// Connection
// ============================================================================

/// A connected socket served by background reader and writer tasks.
///
/// # Thread Safety
///
/// `Connection` is `Send + Sync`; sending never blocks.
pub struct Connection {
    id: ConnectionId,
    command_tx: mpsc::UnboundedSender<WriterCommand>,
    correlator: Arc<Correlator>,
    reader: AbortHandle,
    resume: Mutex<Option<oneshot::Sender<()>>>,
}

impl Connection {
    /// Identity of this socket.
    #[inline]
    #[must_use]
    pub fn id(&self) -> ConnectionId {
        self.id
    }

    /// Sends a command and returns its completion handle.
    ///
    /// # Errors
    ///
    /// - [`Error::Disconnected`] if the connection is closed
    /// - [`Error::Protocol`] if too many commands are pending
    /// - [`Error::Json`] if the payload cannot be encoded
    pub fn send(&self, request: Request) -> Result<PendingReply> {
        let pending = self.correlator.register(request.nonce().clone())?;

        let bytes = match frame::encode(Opcode::Frame, &request.into_payload()) {
            Ok(bytes) => bytes,
            Err(e) => {
                self.correlator.remove(pending.nonce());
                return Err(e);
            }
        };

        let command = WriterCommand::Send {
            nonce: pending.nonce().clone(),
            bytes,
        };
        if self.command_tx.send(command).is_err() {
            self.correlator.remove(pending.nonce());
            return Err(Error::Disconnected);
        }

        Ok(pending)
    }

    /// Sends a command and waits for its reply.
    ///
    /// # Errors
    ///
    /// - [`Error::ReadTimeout`] if the reply does not arrive within `wait`
    /// - anything [`Connection::send`] or [`PendingReply::wait`] returns
    pub async fn send_blocking(&self, request: Request, wait: Duration) -> Result<Message> {
        let pending = self.send(request)?;
        let nonce = pending.nonce().clone();

        match timeout(wait, pending.wait()).await {
            Ok(result) => result,
            Err(_) => {
                self.correlator.remove(&nonce);
                debug!(%nonce, timeout_ms = millis(wait), "Command timed out");
                Err(Error::read_timeout(millis(wait)))
            }
        }
    }

    /// Lets a paused reader task start reading. No-op once started.
    pub fn resume(&self) {
        if let Some(tx) = self.resume.lock().take() {
            let _ = tx.send(());
        }
    }

    /// Number of commands awaiting a reply.
    #[inline]
    #[must_use]
    pub fn pending_count(&self) -> usize {
        self.correlator.len()
    }

    /// Returns `true` once the socket has stopped serving traffic.
    #[inline]
    #[must_use]
    pub fn is_closed(&self) -> bool {
        self.reader.is_finished() || self.command_tx.is_closed()
    }

    /// Stops both tasks and fails every pending command.
    ///
    /// Idempotent.
    pub fn shutdown(&self) {
        let _ = self.command_tx.send(WriterCommand::Shutdown);
        self.reader.abort();
        self.correlator.fail_all();
    }
}

impl Drop for Connection {
    fn drop(&mut self) {
        self.shutdown();
    }
}

// ============================================================================
// Tasks
// ============================================================================

async fn run_reader(
    mut reader: Reader,
    correlator: Arc<Correlator>,
    id: ConnectionId,
    resume: oneshot::Receiver<()>,
    on_closed: CloseCallback,
) {
    if resume.await.is_err() {
        return;
    }

    let error = loop {
        match reader.read_frame().await {
            Ok(frame) => {
                correlator.route(Message::from(frame));
            }
            Err(e) => break e,
        }
    };

    debug!(connection_id = %id, error = %error, "Socket closed by peer");
    correlator.fail_all();
    on_closed(id, error);
}

async fn run_writer(
    mut writer: Writer,
    mut command_rx: mpsc::UnboundedReceiver<WriterCommand>,
    correlator: Arc<Correlator>,
) {
    while let Some(command) = command_rx.recv().await {
        match command {
            WriterCommand::Send { nonce, bytes } => {
                if let Err(e) = writer.write_encoded(&bytes).await {
                    warn!(%nonce, error = %e, "Failed to write command");
                    correlator.fail(&nonce, e);
                }
            }
            WriterCommand::Shutdown => {
                let _ = writer.shutdown().await;
                break;
            }
        }
    }

    trace!("Writer task terminated");
}

// ============================================================================
// Tests
// ============================================================================
