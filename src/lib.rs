//! `sans-io`, `no_std` client side of the `websockets` protocol: handshake, framing, fragmentation
//! and the closing handshake.

#![no_std]
#![deny(missing_debug_implementations)]
#![deny(missing_docs)]
#![cfg_attr(docsrs, feature(doc_cfg))]

//! # Example
//!
//! A [`Connection`] owns no socket. Bytes leave through a [`Transport`] and arrive through
//! [`Connection::receive`]. `MemoryTransport` is an in-memory [`Transport`] used for testing.
//!
//! ```
//! use rand::{SeedableRng, rngs::StdRng};
//! use websocketz_client::{
//!     CloseCode, CloseFrame, Connection, Data, Event, OpCode, ReadyState,
//!     handshake::generate_sec_accept,
//!     mock::{MemoryTransport, server_frame},
//!     options::{ConnectOptions, SendOptions},
//! };
//!
//! let mut websocketz = Connection::new(MemoryTransport::new(), StdRng::seed_from_u64(0));
//!
//! // Open the transport and write the upgrade request.
//! websocketz
//!     .connect(ConnectOptions::new("/ws").expect("Valid path").with_host("example.com"))
//!     .expect("Connect failed");
//!
//! // Play the server: answer the request.
//! let request = String::from_utf8(websocketz.transport_mut().take_written()).unwrap();
//! let key = request
//!     .lines()
//!     .find_map(|line| line.strip_prefix("Sec-WebSocket-Key: "))
//!     .unwrap();
//!
//! let response = format!(
//!     "HTTP/1.1 101 Switching Protocols\r\n\
//!     Upgrade: websocket\r\n\
//!     Connection: Upgrade\r\n\
//!     Sec-WebSocket-Accept: {}\r\n\r\n",
//!     generate_sec_accept(key.as_bytes())
//! );
//!
//! websocketz.receive(response.as_bytes());
//!
//! assert!(matches!(websocketz.poll_event(), Some(Event::Open)));
//! assert_eq!(websocketz.ready_state(), ReadyState::Open);
//!
//! // Receive a message.
//! websocketz.receive(&server_frame(OpCode::Text, b"Hello, WebSocket!", true));
//!
//! match websocketz.poll_event() {
//!     Some(Event::Message(Data::Text(text))) => assert_eq!(text, "Hello, WebSocket!"),
//!     event => panic!("Unexpected event: {event:?}"),
//! }
//!
//! // Send one.
//! websocketz
//!     .send(b"Hello back!", SendOptions::text())
//!     .expect("Failed to send message");
//!
//! // Close. The connection waits for the server's close frame.
//! websocketz
//!     .close(Some(CloseFrame::new(CloseCode::Normal, "bye")))
//!     .expect("Failed to close");
//!
//! assert_eq!(websocketz.ready_state(), ReadyState::Closing);
//!
//! websocketz.receive(&server_frame(OpCode::Close, &[0x03, 0xE8], true));
//!
//! assert_eq!(websocketz.ready_state(), ReadyState::Closed);
//! assert!(matches!(
//!     websocketz.poll_event(),
//!     Some(Event::Close { code: CloseCode::Normal, .. })
//! ));
//! ```
//!
//! # Events
//!
//! Everything the connection has to report is queued as an [`Event`] in order of occurrence:
//! [`Event::Open`], [`Event::Message`], [`Event::Ping`], [`Event::Pong`], [`Event::Error`] and,
//! always last, [`Event::Close`].
//!
//! Drain the queue with [`Connection::poll_event`], or hand it to a [`Handler`] with
//! [`Connection::dispatch`]. A handler receives the connection and may send or close from
//! within `on_event`.
//!
//! # Automatic replies
//!
//! - Pings are answered with a pong carrying the same payload. See [`Connection::with_auto_pong`].
//! - A close frame from the server is echoed and the transport is torn down.
//! - A protocol violation is answered with a close frame carrying [`CloseCode::Protocol`].
//!
//! # Limitations
//!
//! Frames with a 64-bit payload length are rejected on receive. No extension, including
//! per-message compression, is ever negotiated.

extern crate alloc;

mod close_code;
pub use close_code::CloseCode;

mod close_frame;
pub use close_frame::CloseFrame;

pub mod codec;
pub use codec::FramesCodec;

mod connection;
pub use connection::{CloseNegotiation, Connection, Handler, ReadyState};

pub mod error;

mod event;
pub use event::{Data, Event};

mod frame;
pub use frame::Frame;

pub mod handshake;

pub mod mask;

#[doc(hidden)]
pub mod mock;

mod opcode;
pub use opcode::OpCode;

pub mod options;

mod reassembly;

mod sender;

mod transport;
pub use transport::Transport;


#[cfg(test)]
extern crate std;
