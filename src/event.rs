use alloc::{string::String, vec::Vec};

use crate::{CloseCode, error::Error};

/// The payload of a complete data message.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Data {
    /// A text message.
    Text(String),
    /// A binary message.
    Binary(Vec<u8>),
}

impl Data {
    /// Indicates whether this is a text message.
    pub const fn is_text(&self) -> bool {
        matches!(self, Data::Text(_))
    }

    /// Indicates whether this is a binary message.
    pub const fn is_binary(&self) -> bool {
        matches!(self, Data::Binary(_))
    }

    /// The raw bytes of the message.
    pub fn as_bytes(&self) -> &[u8] {
        match self {
            Data::Text(text) => text.as_bytes(),
            Data::Binary(bytes) => bytes,
        }
    }
}

/// Something a [`Connection`](crate::Connection) reports to the application.
///
/// `E` is the error type of the underlying [`Transport`](crate::Transport).
#[derive(Debug)]
pub enum Event<E> {
    /// The handshake completed and the connection is `OPEN`.
    Open,
    /// A complete text or binary message arrived.
    Message(Data),
    /// A ping arrived. A pong has already been queued unless auto pong is disabled.
    Ping(Vec<u8>),
    /// A pong arrived.
    Pong(Vec<u8>),
    /// The connection is `CLOSED`. Always the last event.
    Close {
        /// The close code received from the server, or a local substitute.
        code: CloseCode,
        /// The reason received from the server.
        reason: String,
    },
    /// A fatal error occurred. Followed by a close.
    Error(Error<E>),
}

impl<E> Event<E> {
    /// Indicates whether this is a close event.
    pub const fn is_close(&self) -> bool {
        matches!(self, Event::Close { .. })
    }
}
