//! In-process fakes for client tests.

use std::io;

use async_trait::async_trait;
use parking_lot::Mutex;
use serde_json::{Value, json};
use tokio::io::{DuplexStream, ReadHalf, WriteHalf};

use crate::auth::{OAuthCredential, TokenExchange};
use crate::error::{Error, Result};
use crate::protocol::{Frame, FrameReader, FrameWriter, Opcode};
use crate::transport::{BoxedStream, Connector, Endpoint};

const DUPLEX_CAPACITY: usize = 64 * 1024;

// ============================================================================
// FakeConnector
// ============================================================================

/// Connector that hands out one in-memory stream.
pub(crate) struct FakeConnector {
    stream: Mutex<Option<DuplexStream>>,
}

impl FakeConnector {
    /// Connector plus the Discord side of its stream.
    pub(crate) fn pair() -> (Self, Peer) {
        let (local, remote) = tokio::io::duplex(DUPLEX_CAPACITY);
        let connector = Self {
            stream: Mutex::new(Some(local)),
        };
        (connector, Peer::new(remote))
    }

    /// Connector that refuses every endpoint.
    pub(crate) fn refusing() -> Self {
        Self {
            stream: Mutex::new(None),
        }
    }
}

#[async_trait]
impl Connector for FakeConnector {
    async fn connect(&self, _endpoint: &Endpoint) -> io::Result<BoxedStream> {
        match self.stream.lock().take() {
            Some(stream) => Ok(Box::new(stream)),
            None => Err(io::Error::from(io::ErrorKind::ConnectionRefused)),
        }
    }
}

// ============================================================================
// Peer
// ============================================================================

/// Scripted Discord side of a fake socket. Dropping it closes the socket.
pub(crate) struct Peer {
    reader: FrameReader<ReadHalf<DuplexStream>>,
    writer: FrameWriter<WriteHalf<DuplexStream>>,
}

impl Peer {
    pub(crate) fn new(stream: DuplexStream) -> Self {
        let (read_half, write_half) = tokio::io::split(stream);
        Self {
            reader: FrameReader::new(read_half),
            writer: FrameWriter::new(write_half),
        }
    }

    pub(crate) async fn expect_frame(&mut self) -> Frame {
        self.reader.read_frame().await.expect("frame from client")
    }

    pub(crate) async fn expect_handshake(&mut self) -> Frame {
        let frame = self.expect_frame().await;
        assert_eq!(frame.kind(), Some(Opcode::Handshake));
        frame
    }

    /// Reads the handshake and answers with a READY dispatch.
    pub(crate) async fn accept_handshake(&mut self, client_id: &str) {
        let frame = self.expect_handshake().await;
        assert_eq!(frame.payload["v"], 1);
        assert_eq!(frame.payload["client_id"], client_id);

        self.send_json(json!({
            "cmd": "DISPATCH",
            "evt": "READY",
            "data": {
                "v": 1,
                "config": {
                    "cdn_host": "cdn.discordapp.com",
                    "api_endpoint": "//discord.com/api",
                    "environment": "production"
                },
                "user": {"id": "0", "username": "test"}
            }
        }))
        .await;
    }

    /// Reads a command frame and checks its `cmd`.
    pub(crate) async fn expect_command(&mut self, cmd: &str) -> Frame {
        let frame = self.expect_frame().await;
        assert_eq!(frame.kind(), Some(Opcode::Frame));
        assert_eq!(frame.payload["cmd"], cmd);
        frame
    }

    pub(crate) async fn send_json(&mut self, payload: Value) {
        self.writer
            .write_frame(Opcode::Frame, &payload)
            .await
            .expect("write to client");
    }

    /// Answers `request` with `data`, echoing its command and nonce.
    pub(crate) async fn reply(&mut self, request: &Frame, data: Value) {
        self.send_json(json!({
            "cmd": request.payload["cmd"],
            "nonce": request.payload["nonce"],
            "evt": null,
            "data": data
        }))
        .await;
    }

    /// Answers `request` with an ERROR event.
    pub(crate) async fn reply_error(&mut self, request: &Frame, code: i64, message: &str) {
        self.send_json(json!({
            "cmd": request.payload["cmd"],
            "nonce": request.payload["nonce"],
            "evt": "ERROR",
            "data": {"code": code, "message": message}
        }))
        .await;
    }
}

// ============================================================================
// ScriptedTokenExchange
// ============================================================================

/// Token exchange with canned answers. A missing answer fails with 400.
#[derive(Default)]
pub(crate) struct ScriptedTokenExchange {
    refresh: Option<OAuthCredential>,
    exchange: Option<OAuthCredential>,
    calls: Mutex<Vec<String>>,
}

impl ScriptedTokenExchange {
    pub(crate) fn new() -> Self {
        Self::default()
    }

    pub(crate) fn with_refresh(mut self, credential: OAuthCredential) -> Self {
        self.refresh = Some(credential);
        self
    }

    pub(crate) fn with_exchange(mut self, credential: OAuthCredential) -> Self {
        self.exchange = Some(credential);
        self
    }

    /// Calls made so far, as `grant:argument`.
    pub(crate) fn calls(&self) -> Vec<String> {
        self.calls.lock().clone()
    }

    fn answer(&self, call: String, answer: &Option<OAuthCredential>) -> Result<OAuthCredential> {
        self.calls.lock().push(call);
        answer.clone().ok_or_else(|| Error::OAuth {
            status: 400,
            message: "invalid_grant".to_string(),
        })
    }
}

#[async_trait]
impl TokenExchange for ScriptedTokenExchange {
    async fn refresh(&self, refresh_token: &str) -> Result<OAuthCredential> {
        self.answer(format!("refresh:{refresh_token}"), &self.refresh)
    }

    async fn exchange_code(&self, code: &str) -> Result<OAuthCredential> {
        self.answer(format!("exchange_code:{code}"), &self.exchange)
    }
}
