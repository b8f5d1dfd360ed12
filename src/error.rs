//! Crate errors.

use crate::CloseCode;

/// Violations detected while decoding a single frame header.
#[derive(Debug, thiserror::Error)]
pub enum FrameDecodeError {
    /// An RSV bit is set, but no extension was negotiated.
    #[error("Reserved bits must be zero")]
    ReservedBitsNotZero,
    /// The opcode is not one of the six defined opcodes.
    #[error("Invalid opcode")]
    InvalidOpCode,
    /// The server sent a masked frame.
    #[error("Unexpected masked frame")]
    UnexpectedMaskedFrame,
    /// The frame uses a 64-bit extended payload length.
    #[error("Unsupported payload length")]
    UnsupportedPayloadLength,
    /// A close, ping or pong frame has `fin` unset.
    #[error("Control frame fragmented")]
    ControlFrameFragmented,
    /// A control frame carries more than 125 bytes.
    #[error("Control frame too large")]
    ControlFrameTooLarge,
}

/// Fatal violations of the framing protocol. Answered with a close frame.
#[derive(Debug, thiserror::Error)]
pub enum ProtocolError {
    /// The frame itself is malformed.
    #[error("Frame decode error: {0}")]
    Decode(
        #[source]
        #[from]
        FrameDecodeError,
    ),
    /// A continuation frame arrived with no message in flight.
    #[error("Continuation frame with no initial frame")]
    InvalidContinuationFrame,
    /// A new text or binary frame arrived while a message is in flight.
    #[error("Invalid fragment")]
    InvalidFragment,
    /// A close frame carried exactly one byte.
    #[error("Invalid close payload")]
    InvalidClosePayload,
    /// A text message or a close reason is not valid UTF-8.
    #[error("Invalid UTF-8")]
    InvalidUtf8,
}

impl ProtocolError {
    /// The close code sent to the server in response to this error.
    pub const fn close_code(&self) -> CloseCode {
        match self {
            ProtocolError::InvalidUtf8 => CloseCode::Invalid,
            _ => CloseCode::Protocol,
        }
    }
}

/// The server refused or botched the opening handshake.
#[derive(Debug, thiserror::Error)]
pub enum HandshakeError {
    /// The status code is not `101 Switching Protocols`.
    #[error("Handshake rejected with status {status:?}")]
    HandshakeRejected {
        /// The status code, if the status line was readable.
        status: Option<u16>,
    },
    /// `Sec-WebSocket-Accept` is missing or does not match the request key.
    #[error("Missing or invalid Sec-WebSocket-Accept")]
    HandshakeAcceptMismatch,
    /// `Upgrade` is missing or is not `websocket`.
    #[error("Missing or invalid upgrade header")]
    MissingOrInvalidUpgrade,
    /// `Connection` is missing or does not contain `upgrade`.
    #[error("Missing or invalid connection header")]
    MissingOrInvalidConnection,
    /// The server selected a subprotocol that was not requested.
    #[error("Server selected an unrequested subprotocol")]
    InvalidSubprotocol,
    /// The response head outgrew the limit derived from
    /// [`ConnectOptions::max_headers`](crate::options::ConnectOptions::max_headers).
    #[error("Handshake response too large")]
    ResponseTooLarge,
    /// The response is not valid HTTP.
    #[error("Malformed handshake response: {0}")]
    Http(httparse::Error),
}

/// The caller used the connection in a way its current state does not allow.
#[derive(Debug, thiserror::Error)]
pub enum UsageError {
    /// The opening handshake has not completed yet.
    #[error("WebSocket is not open: still connecting")]
    StillConnecting,
    /// The connection is closing or closed.
    #[error("WebSocket is not open: closing or closed")]
    NotOpen,
    /// `connect` was called on a connection that is not fresh.
    #[error("Connection already started")]
    AlreadyConnecting,
    /// Ping and pong payloads are limited to 125 bytes.
    #[error("Control frame payload too large")]
    ControlPayloadTooLarge,
    /// Close reasons are limited to 123 bytes.
    #[error("Close reason too long")]
    CloseReasonTooLong,
    /// The close code may not be sent on the wire.
    #[error("Invalid close code: {code:?}")]
    InvalidCloseCode {
        /// The rejected code.
        code: CloseCode,
    },
    /// `send_fragmented` was called with a fragment size of zero.
    #[error("Fragment size must be greater than zero")]
    ZeroFragmentSize,
    /// The path does not start with `/`.
    #[error("Invalid path")]
    InvalidPath,
}

/// Any error surfaced by a [`Connection`](crate::Connection).
///
/// `E` is the error type of the underlying [`Transport`](crate::Transport).
#[derive(Debug, thiserror::Error)]
pub enum Error<E> {
    /// The opening handshake failed.
    #[error("Handshake error: {0}")]
    Handshake(
        #[source]
        #[from]
        HandshakeError,
    ),
    /// The server violated the framing protocol.
    #[error("Protocol error: {0}")]
    Protocol(
        #[source]
        #[from]
        ProtocolError,
    ),
    /// The call is not allowed in the current state.
    #[error("Usage error: {0}")]
    Usage(
        #[source]
        #[from]
        UsageError,
    ),
    /// The transport failed.
    #[error("Transport error: {0:?}")]
    Transport(E),
}
