//! Wire framing.
//!
//! Every message on the IPC socket is an 8-byte header followed by a UTF-8
//! JSON payload:
//!
//! ```text
//! ┌──────────┬──────────┬─────────────────────────┐
//! │ Opcode   │ Length   │ Payload                 │
//! │ u32 LE   │ u32 LE   │ `Length` bytes of JSON  │
//! └──────────┴──────────┴─────────────────────────┘
//! ```
//!
//! Decoding never loses alignment on a bad payload: a payload that does not
//! parse as a JSON object still yields a [`Frame`] with the header intact, an
//! empty object and a diagnostic, so the reader can carry on with the next
//! frame.

// ============================================================================
// Imports
// ============================================================================

use serde_json::{Map, Value};
use tokio::io::{AsyncRead, AsyncReadExt, AsyncWrite, AsyncWriteExt, BufReader};
use tracing::{trace, warn};

use crate::error::{Error, Result};

// ============================================================================
// Constants
// ============================================================================

/// Header size in bytes (fixed, exactly 8).
pub const HEADER_SIZE: usize = 8;

/// Largest payload accepted from the peer (64 MiB).
///
/// A length above this means the header is garbage, and allocating for it
/// would only hide the real problem.
pub const MAX_PAYLOAD_SIZE: u32 = 64 * 1024 * 1024;

// ============================================================================
// Opcode
// ============================================================================

/// Frame opcodes defined by the protocol.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
#[repr(u32)]
pub enum Opcode {
    /// Initial handshake (protocol version and client id).
    Handshake = 0,
    /// Regular command, reply or event traffic.
    Frame = 1,
}

impl Opcode {
    /// Returns the numeric wire value.
    #[inline]
    #[must_use]
    pub const fn as_u32(self) -> u32 {
        self as u32
    }

    /// Maps a wire value back to a known opcode.
    #[inline]
    #[must_use]
    pub const fn from_u32(value: u32) -> Option<Self> {
        match value {
            0 => Some(Self::Handshake),
            1 => Some(Self::Frame),
            _ => None,
        }
    }
}

// ============================================================================
// Header
// ============================================================================

/// Decoded frame header.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Header {
    /// Raw opcode.
    pub opcode: u32,
    /// Payload length in bytes.
    pub length: u32,
}

impl Header {
    /// Creates a new header.
    #[inline]
    #[must_use]
    pub const fn new(opcode: u32, length: u32) -> Self {
        Self { opcode, length }
    }

    /// Encodes the header to bytes (Little Endian, opcode first).
    #[must_use]
    pub fn encode(&self) -> [u8; HEADER_SIZE] {
        let mut buf = [0u8; HEADER_SIZE];
        buf[0..4].copy_from_slice(&self.opcode.to_le_bytes());
        buf[4..8].copy_from_slice(&self.length.to_le_bytes());
        buf
    }

    /// Decodes a header from the first 8 bytes of `buf`.
    ///
    /// Returns `None` if the buffer is too short.
    #[must_use]
    pub fn decode(buf: &[u8]) -> Option<Self> {
        if buf.len() < HEADER_SIZE {
            return None;
        }
        Some(Self {
            opcode: u32::from_le_bytes([buf[0], buf[1], buf[2], buf[3]]),
            length: u32::from_le_bytes([buf[4], buf[5], buf[6], buf[7]]),
        })
    }

    /// Total size of the frame this header announces.
    #[inline]
    #[must_use]
    pub fn frame_size(&self) -> usize {
        HEADER_SIZE + self.length as usize
    }

    fn check_length(&self) -> Result<()> {
        if self.length > MAX_PAYLOAD_SIZE {
            return Err(Error::protocol(format!(
                "Payload size {} exceeds maximum {}",
                self.length, MAX_PAYLOAD_SIZE
            )));
        }
        Ok(())
    }
}

// ============================================================================
// Frame
// ============================================================================

/// One decoded unit of the wire protocol.
#[derive(Debug, Clone, PartialEq)]
pub struct Frame {
    /// Raw opcode from the header.
    pub opcode: u32,
    /// Payload length from the header.
    pub length: u32,
    /// Parsed payload (empty when the payload did not parse).
    pub payload: Map<String, Value>,
    /// Parser diagnostic when the payload was not a JSON object.
    pub diagnostic: Option<String>,
}

impl Frame {
    /// Builds a frame from a header and its raw payload bytes.
    fn from_parts(header: Header, payload: &[u8]) -> Self {
        let (payload, diagnostic) = match serde_json::from_slice::<Value>(payload) {
            Ok(Value::Object(map)) => (map, None),
            Ok(other) => (
                Map::new(),
                Some(format!("payload is not a JSON object: {other}")),
            ),
            Err(e) => (Map::new(), Some(e.to_string())),
        };

        if let Some(ref diagnostic) = diagnostic {
            warn!(
                opcode = header.opcode,
                length = header.length,
                %diagnostic,
                "Failed to parse frame payload"
            );
        }

        Self {
            opcode: header.opcode,
            length: header.length,
            payload,
            diagnostic,
        }
    }

    /// Returns the opcode if it is one the protocol defines.
    #[inline]
    #[must_use]
    pub fn kind(&self) -> Option<Opcode> {
        Opcode::from_u32(self.opcode)
    }

    /// Returns `true` if the payload failed to parse.
    #[inline]
    #[must_use]
    pub fn is_malformed(&self) -> bool {
        self.diagnostic.is_some()
    }

    /// Converts the parse diagnostic into an error.
    ///
    /// # Errors
    ///
    /// Returns [`Error::MalformedFrame`] if the payload failed to parse.
    pub fn check(&self) -> Result<()> {
        match &self.diagnostic {
            Some(diagnostic) => Err(Error::malformed_frame(diagnostic.clone())),
            None => Ok(()),
        }
    }
}

// ============================================================================
// Encoding
// ============================================================================

/// Encodes a payload into a complete frame (header + compact JSON).
///
/// # Errors
///
/// Returns [`Error::Json`] if the value cannot be serialized, or
/// [`Error::Protocol`] if it exceeds [`MAX_PAYLOAD_SIZE`].
pub fn encode(opcode: Opcode, payload: &Value) -> Result<Vec<u8>> {
    let body = serde_json::to_vec(payload)?;
    let length = u32::try_from(body.len())
        .ok()
        .filter(|len| *len <= MAX_PAYLOAD_SIZE)
        .ok_or_else(|| Error::protocol(format!("Payload too large: {} bytes", body.len())))?;

    let mut buf = Vec::with_capacity(HEADER_SIZE + body.len());
    buf.extend_from_slice(&Header::new(opcode.as_u32(), length).encode());
    buf.extend_from_slice(&body);
    Ok(buf)
}

// ============================================================================
// Decoding
// ============================================================================

/// Decodes one frame from the front of `buf`.
///
/// Returns the frame and the number of bytes it occupied.
///
/// # Errors
///
/// Returns [`Error::TruncatedStream`] if `buf` ends before the frame does.
pub fn decode(buf: &[u8]) -> Result<(Frame, usize)> {
    let header = Header::decode(buf).ok_or_else(|| Error::truncated_stream(HEADER_SIZE))?;
    header.check_length()?;

    let end = header.frame_size();
    if buf.len() < end {
        return Err(Error::truncated_stream(end - buf.len()));
    }

    Ok((Frame::from_parts(header, &buf[HEADER_SIZE..end]), end))
}

/// Reads exactly one frame from `reader`.
///
/// Consumes exactly `8 + length` bytes and never more.
///
/// # Errors
///
/// - [`Error::TruncatedStream`] if the stream closes mid-frame
/// - [`Error::Io`] for other read failures
pub async fn read_frame<R>(reader: &mut R) -> Result<Frame>
where
    R: AsyncRead + Unpin + ?Sized,
{
    let mut header = [0u8; HEADER_SIZE];
    reader
        .read_exact(&mut header)
        .await
        .map_err(|e| Error::from_read(e, HEADER_SIZE))?;

    let header = Header::decode(&header).ok_or_else(|| Error::truncated_stream(HEADER_SIZE))?;
    header.check_length()?;

    let mut payload = vec![0u8; header.length as usize];
    reader
        .read_exact(&mut payload)
        .await
        .map_err(|e| Error::from_read(e, payload.len()))?;

    trace!(opcode = header.opcode, length = header.length, "Frame received");

    Ok(Frame::from_parts(header, &payload))
}

// ============================================================================
// FrameReader
// ============================================================================

/// Buffered frame reader over the read half of the socket.
///
/// The buffer is what lets a caller drain frames that have already arrived
/// without touching the socket again (see [`FrameReader::has_buffered_frame`]).
pub struct FrameReader<R> {
    inner: BufReader<R>,
}

impl<R: AsyncRead + Unpin> FrameReader<R> {
    /// Wraps a reader.
    #[must_use]
    pub fn new(reader: R) -> Self {
        Self {
            inner: BufReader::new(reader),
        }
    }

    /// Reads the next frame, waiting for bytes as needed.
    ///
    /// # Errors
    ///
    /// See [`read_frame`].
    pub async fn read_frame(&mut self) -> Result<Frame> {
        read_frame(&mut self.inner).await
    }

    /// Returns `true` if a complete frame is already sitting in the buffer.
    #[must_use]
    pub fn has_buffered_frame(&self) -> bool {
        let buffered = self.inner.buffer();
        Header::decode(buffered).is_some_and(|header| buffered.len() >= header.frame_size())
    }
}

// ============================================================================
// FrameWriter
// ============================================================================

/// Frame writer over the write half of the socket.
pub struct FrameWriter<W> {
    inner: W,
}

impl<W: AsyncWrite + Unpin> FrameWriter<W> {
    /// Wraps a writer.
    #[must_use]
    pub fn new(writer: W) -> Self {
        Self { inner: writer }
    }

    /// Encodes and writes one frame, then flushes.
    ///
    /// # Errors
    ///
    /// Returns an error if encoding or writing fails.
    pub async fn write_frame(&mut self, opcode: Opcode, payload: &Value) -> Result<()> {
        let bytes = encode(opcode, payload)?;
        self.write_encoded(&bytes).await
    }

    /// Writes an already encoded frame, then flushes.
    ///
    /// # Errors
    ///
    /// Returns [`Error::Io`] if writing fails.
    pub async fn write_encoded(&mut self, bytes: &[u8]) -> Result<()> {
        self.inner.write_all(bytes).await?;
        self.inner.flush().await?;
        trace!(bytes = bytes.len(), "Frame sent");
        Ok(())
    }

    /// Shuts down the write side.
    ///
    /// # Errors
    ///
    /// Returns [`Error::Io`] if the shutdown fails.
    pub async fn shutdown(&mut self) -> Result<()> {
        self.inner.shutdown().await?;
        Ok(())
    }
}

// ============================================================================
// Tests
// ============================================================================

#[cfg(test)]
mod tests {
    use super::*;

    use proptest::prelude::*;
    use serde_json::json;
    use tokio_test::io::Builder;

    fn frame_with_len(len: usize) -> Vec<u8> {
        let mut buf = Vec::with_capacity(HEADER_SIZE + len);
        buf.extend_from_slice(&Header::new(1, len as u32).encode());
        buf.resize(HEADER_SIZE + len, b' ');
        buf
    }

    #[test]
    fn test_authenticate_scenario_bytes() {
        let payload = json!({"cmd": "AUTHENTICATE", "nonce": "1:42"});
        let bytes = encode(Opcode::Frame, &payload).expect("encode");

        let body = br#"{"cmd":"AUTHENTICATE","nonce":"1:42"}"#;
        assert_eq!(&bytes[0..4], &[0x01, 0x00, 0x00, 0x00]);
        assert_eq!(&bytes[4..8], &(body.len() as u32).to_le_bytes());
        assert_eq!(&bytes[4..8], &[0x25, 0x00, 0x00, 0x00]);
        assert_eq!(&bytes[8..], body);
    }

    #[test]
    fn test_header_field_order() {
        let header = Header::new(0, 0x0102_0304);
        assert_eq!(header.encode(), [0, 0, 0, 0, 0x04, 0x03, 0x02, 0x01]);
        assert_eq!(Header::decode(&header.encode()), Some(header));
        assert_eq!(Header::decode(&[0; 7]), None);
    }

    #[test]
    fn test_roundtrip_nested_and_empty() {
        for payload in [
            json!({}),
            json!({"cmd": "DISPATCH", "data": {"config": {"cdn_host": "cdn.discordapp.com"}, "list": [1, [2, {"x": null}]]}}),
        ] {
            let bytes = encode(Opcode::Handshake, &payload).expect("encode");
            let (frame, used) = decode(&bytes).expect("decode");
            assert_eq!(used, bytes.len());
            assert_eq!(frame.kind(), Some(Opcode::Handshake));
            assert_eq!(Value::Object(frame.payload), payload);
            assert!(frame.diagnostic.is_none());
        }
    }

    #[test]
    fn test_malformed_payload_keeps_header() {
        let mut bytes = Header::new(1, 5).encode().to_vec();
        bytes.extend_from_slice(b"{oops");

        let (frame, used) = decode(&bytes).expect("decode");
        assert_eq!(used, 13);
        assert_eq!(frame.opcode, 1);
        assert_eq!(frame.length, 5);
        assert!(frame.payload.is_empty());
        assert!(frame.is_malformed());
        assert!(matches!(frame.check(), Err(Error::MalformedFrame { .. })));
    }

    #[test]
    fn test_non_object_payload_is_malformed() {
        let bytes = encode(Opcode::Frame, &json!([1, 2, 3])).expect("encode");
        let (frame, _) = decode(&bytes).expect("decode");
        assert!(frame.is_malformed());
        assert!(frame.payload.is_empty());
    }

    #[test]
    fn test_decode_truncated() {
        assert!(matches!(
            decode(&[1, 0, 0]),
            Err(Error::TruncatedStream { .. })
        ));

        let bytes = frame_with_len(10);
        assert!(matches!(
            decode(&bytes[..12]),
            Err(Error::TruncatedStream { expected: 6 })
        ));
    }

    #[test]
    fn test_oversized_length_rejected() {
        let bytes = Header::new(1, MAX_PAYLOAD_SIZE + 1).encode();
        assert!(matches!(decode(&bytes), Err(Error::Protocol { .. })));
    }

    #[tokio::test]
    async fn test_read_frame_consumes_exactly_one_frame() {
        for len in [0usize, 1, 4096] {
            let mut bytes = frame_with_len(len);
            bytes.extend_from_slice(b"TAIL");

            let mut source: &[u8] = &bytes;
            let frame = read_frame(&mut source).await.expect("read");
            assert_eq!(frame.length as usize, len);
            assert_eq!(source, b"TAIL");
        }
    }

    #[tokio::test]
    async fn test_read_frame_across_multiple_reads() {
        let first = encode(Opcode::Frame, &json!({"evt": "SPEAKING_START"})).expect("encode");
        let second = frame_with_len(4096);

        let mut stream = Builder::new()
            .read(&first[..3])
            .read(&first[3..10])
            .read(&first[10..])
            .read(&second[..2000])
            .read(&second[2000..])
            .build();

        let frame = read_frame(&mut stream).await.expect("first frame");
        assert_eq!(frame.payload["evt"], "SPEAKING_START");

        let frame = read_frame(&mut stream).await.expect("second frame");
        assert_eq!(frame.length, 4096);
    }

    #[tokio::test]
    async fn test_read_frame_truncated_stream() {
        let bytes = encode(Opcode::Frame, &json!({"cmd": "GET_GUILDS"})).expect("encode");
        let mut source: &[u8] = &bytes[..bytes.len() - 1];
        assert!(matches!(
            read_frame(&mut source).await,
            Err(Error::TruncatedStream { .. })
        ));

        let mut empty: &[u8] = &[];
        assert!(matches!(
            read_frame(&mut empty).await,
            Err(Error::TruncatedStream { expected: HEADER_SIZE })
        ));
    }

    #[tokio::test]
    async fn test_frame_reader_buffered_detection() {
        let mut bytes = encode(Opcode::Frame, &json!({"n": 1})).expect("encode");
        bytes.extend(encode(Opcode::Frame, &json!({"n": 2})).expect("encode"));
        let partial = encode(Opcode::Frame, &json!({"n": 3})).expect("encode");
        bytes.extend_from_slice(&partial[..4]);

        let mut reader = FrameReader::new(&bytes[..]);
        assert!(!reader.has_buffered_frame());

        let frame = reader.read_frame().await.expect("first");
        assert_eq!(frame.payload["n"], 1);
        assert!(reader.has_buffered_frame());

        let frame = reader.read_frame().await.expect("second");
        assert_eq!(frame.payload["n"], 2);
        assert!(!reader.has_buffered_frame());
    }

    #[tokio::test]
    async fn test_frame_writer_writes_encoded_frame() {
        let payload = json!({"v": 1, "client_id": "123"});
        let expected = encode(Opcode::Handshake, &payload).expect("encode");

        let stream = Builder::new().write(&expected).build();
        let mut writer = FrameWriter::new(stream);
        writer
            .write_frame(Opcode::Handshake, &payload)
            .await
            .expect("write");
    }

    proptest! {
        #[test]
        fn prop_roundtrip_string_maps(
            entries in proptest::collection::btree_map("[a-z_]{1,12}", ".{0,40}", 0..16),
            opcode in 0u32..2,
        ) {
            let payload = Value::Object(
                entries.into_iter().map(|(k, v)| (k, Value::String(v))).collect(),
            );
            let opcode = Opcode::from_u32(opcode).expect("known opcode");
            let bytes = encode(opcode, &payload).expect("encode");
            let (frame, used) = decode(&bytes).expect("decode");
            prop_assert_eq!(used, bytes.len());
            prop_assert_eq!(frame.opcode, opcode.as_u32());
            prop_assert_eq!(frame.length as usize, bytes.len() - HEADER_SIZE);
            prop_assert_eq!(Value::Object(frame.payload), payload);
        }
    }
}
