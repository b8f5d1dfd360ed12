use alloc::{
    collections::VecDeque,
    string::{String, ToString},
    vec::Vec,
};

use rand_core::RngCore;

use crate::{
    CloseCode, CloseFrame, OpCode, Transport,
    close_frame::MAX_REASON_LEN,
    codec::MAX_CONTROL_PAYLOAD,
    error::{Error, HandshakeError, ProtocolError, UsageError},
    event::Event,
    handshake::HandshakeContext,
    options::{ConnectOptions, SendOptions},
    reassembly::{Incoming, Reassembler},
    sender::FrameSender,
};

/// The lifecycle of a [`Connection`]. Only ever moves forward.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash)]
pub enum ReadyState {
    /// The opening handshake is in progress.
    Connecting,
    /// Messages can be sent and received.
    Open,
    /// A close frame was sent or received.
    Closing,
    /// The transport was torn down.
    Closed,
}

/// Progress of the closing handshake.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct CloseNegotiation {
    /// We wrote a close frame.
    pub local_close_sent: bool,
    /// The server's close frame arrived.
    pub remote_close_received: bool,
}

impl CloseNegotiation {
    /// Both sides have sent their close frame.
    pub const fn is_complete(&self) -> bool {
        self.local_close_sent && self.remote_close_received
    }
}

/// Receives the events of a [`Connection`] from [`Connection::dispatch`].
///
/// The handler gets the connection back and may send, ping or close from inside `on_event`.
pub trait Handler<T: Transport, R> {
    /// Handles one event.
    fn on_event(&mut self, connection: &mut Connection<T, R>, event: Event<T::Error>);
}

impl<T, R, F> Handler<T, R> for F
where
    T: Transport,
    F: FnMut(&mut Connection<T, R>, Event<T::Error>),
{
    fn on_event(&mut self, connection: &mut Connection<T, R>, event: Event<T::Error>) {
        self(connection, event)
    }
}

/// A client WebSocket connection over a [`Transport`].
///
/// The connection never reads on its own. Feed it with [`receive`](Connection::receive) and
/// drain what happened with [`poll_event`](Connection::poll_event) or
/// [`dispatch`](Connection::dispatch).
pub struct Connection<T: Transport, R> {
    transport: T,
    rng: R,
    state: ReadyState,
    close: CloseNegotiation,
    /// Status of the server's close frame, reported in the close event.
    remote_status: Option<(CloseCode, String)>,
    handshake: Option<HandshakeContext>,
    handshake_buffer: Vec<u8>,
    reassembler: Reassembler,
    sender: FrameSender,
    events: VecDeque<Event<T::Error>>,
    protocol: Option<String>,
    transport_open: bool,
    /// Set by a protocol error. Only a close frame is still acted on.
    failed: bool,
    auto_pong: bool,
}

impl<T: Transport, R> core::fmt::Debug for Connection<T, R> {
    fn fmt(&self, f: &mut core::fmt::Formatter<'_>) -> core::fmt::Result {
        f.debug_struct("Connection")
            .field("state", &self.state)
            .field("close", &self.close)
            .field("protocol", &self.protocol)
            .field("transport_open", &self.transport_open)
            .field("failed", &self.failed)
            .field("pending_events", &self.events.len())
            .finish_non_exhaustive()
    }
}

impl<T: Transport, R> Connection<T, R> {
    fn with_state(transport: T, rng: R, state: ReadyState, transport_open: bool) -> Self {
        Self {
            transport,
            rng,
            state,
            close: CloseNegotiation::default(),
            remote_status: None,
            handshake: None,
            handshake_buffer: Vec::new(),
            reassembler: Reassembler::new(),
            sender: FrameSender::new(),
            events: VecDeque::new(),
            protocol: None,
            transport_open,
            failed: false,
            auto_pong: true,
        }
    }

    /// Creates a connection in [`ReadyState::Connecting`]. Call [`connect`](Connection::connect)
    /// to start the handshake.
    pub fn new(transport: T, rng: R) -> Self {
        Self::with_state(transport, rng, ReadyState::Connecting, false)
    }

    /// Creates an [`ReadyState::Open`] connection over a transport that was already upgraded.
    pub fn after_handshake(transport: T, rng: R) -> Self {
        Self::with_state(transport, rng, ReadyState::Open, true)
    }

    /// Sets whether pings are answered automatically. Enabled by default.
    pub fn with_auto_pong(mut self, auto_pong: bool) -> Self {
        self.auto_pong = auto_pong;
        self
    }

    /// The current [`ReadyState`].
    pub const fn ready_state(&self) -> ReadyState {
        self.state
    }

    /// How far the closing handshake got.
    pub const fn close_negotiation(&self) -> CloseNegotiation {
        self.close
    }

    /// The subprotocol selected by the server.
    pub fn protocol(&self) -> Option<&str> {
        self.protocol.as_deref()
    }

    /// Returns reference to the transport.
    pub const fn transport(&self) -> &T {
        &self.transport
    }

    /// Returns mutable reference to the transport.
    pub const fn transport_mut(&mut self) -> &mut T {
        &mut self.transport
    }

    /// Consumes the [`Connection`] and returns the transport.
    pub fn into_inner(self) -> T {
        self.transport
    }

    /// Takes the oldest pending event.
    pub fn poll_event(&mut self) -> Option<Event<T::Error>> {
        self.events.pop_front()
    }

    /// Hands every pending event to `handler`, including events caused by the handler itself.
    pub fn dispatch<H: Handler<T, R>>(&mut self, handler: &mut H) {
        while let Some(event) = self.poll_event() {
            handler.on_event(self, event);
        }
    }

    /// Reports that the transport reached end of stream.
    pub fn on_transport_closed(&mut self) {
        self.transport_open = false;

        if self.state == ReadyState::Closed {
            return;
        }

        tracing::debug!("Transport closed");

        self.handshake = None;
        self.finish();
    }

    /// Reports an I/O failure of the transport.
    ///
    /// Ignored once the connection is closed.
    pub fn on_transport_error(&mut self, error: T::Error) {
        if self.state == ReadyState::Closed {
            tracing::warn!("Transport error after close");

            return;
        }

        tracing::warn!(state = ?self.state, "Transport error");

        self.events.push_back(Event::Error(Error::Transport(error)));

        self.handshake = None;
        self.remote_status = None;
        self.close_transport();
        self.finish();
    }

    fn set_state(&mut self, to: ReadyState) {
        debug_assert!(self.state < to, "ready state must only move forward");

        tracing::debug!(from = ?self.state, to = ?to, "Ready state transition");

        self.state = to;
    }

    fn close_transport(&mut self) {
        if self.transport_open {
            tracing::debug!("Closing transport");

            self.transport.close();
            self.transport_open = false;
        }
    }

    /// Moves to `CLOSED` and raises the close event.
    fn finish(&mut self) {
        self.set_state(ReadyState::Closed);

        let (code, reason) = self
            .remote_status
            .take()
            .unwrap_or((CloseCode::Abnormal, String::new()));

        tracing::debug!(code = code.into_u16(), "Connection closed");

        self.events.push_back(Event::Close { code, reason });
    }

    fn teardown(&mut self) {
        self.close_transport();
        self.finish();
    }

    /// Gives up before the handshake completed. No close frame is sent.
    fn abort(&mut self) {
        self.handshake = None;
        self.handshake_buffer = Vec::new();
        self.remote_status = None;
        self.close_transport();
        self.finish();
    }
}

impl<T: Transport, R: RngCore> Connection<T, R> {
    /// Opens the transport and sends the upgrade request.
    ///
    /// The connection becomes [`ReadyState::Open`] once the response arrives through
    /// [`receive`](Connection::receive). If the transport fails here the connection is closed
    /// with [`CloseCode::Abnormal`].
    pub fn connect(&mut self, options: ConnectOptions<'_>) -> Result<(), Error<T::Error>> {
        if self.state != ReadyState::Connecting || self.handshake.is_some() || self.transport_open
        {
            return Err(Error::Usage(UsageError::AlreadyConnecting));
        }

        if let Err(err) = self.transport.open() {
            self.abort();

            return Err(Error::Transport(err));
        }

        self.transport_open = true;

        let context = HandshakeContext::new(&mut self.rng, &options);
        let request = context.request(&options);

        tracing::debug!(path = options.path, "Starting handshake");

        if let Err(err) = self.transport.write(&request) {
            self.abort();

            return Err(Error::Transport(err));
        }

        self.handshake = Some(context);

        Ok(())
    }

    /// Processes a chunk delivered by the transport.
    ///
    /// Chunk boundaries need not match frame boundaries. Everything decodable is handled before
    /// this returns; the rest is kept for the next call.
    pub fn receive(&mut self, chunk: &[u8]) {
        match self.state {
            ReadyState::Closed => {
                tracing::warn!(len = chunk.len(), "Received data after close");
            }
            ReadyState::Connecting => self.receive_handshake(chunk),
            ReadyState::Open | ReadyState::Closing => {
                if self.close.remote_close_received {
                    tracing::trace!(len = chunk.len(), "Ignoring data");

                    return;
                }

                self.reassembler.push(chunk);
                self.process();
            }
        }
    }

    fn receive_handshake(&mut self, chunk: &[u8]) {
        let Some(context) = self.handshake.as_ref() else {
            tracing::warn!(len = chunk.len(), "Received data before connect");

            return;
        };

        self.handshake_buffer.extend_from_slice(chunk);

        let accepted = match context.accept(&self.handshake_buffer) {
            Ok(None) if self.handshake_buffer.len() > context.max_response_len() => {
                Err(HandshakeError::ResponseTooLarge)
            }
            accepted => accepted,
        };

        match accepted {
            Ok(None) => {}
            Ok(Some(accepted)) => {
                self.handshake = None;

                let rest = self.handshake_buffer.split_off(accepted.len);
                self.handshake_buffer = Vec::new();

                self.protocol = accepted.protocol;
                self.set_state(ReadyState::Open);

                tracing::debug!(protocol = ?self.protocol, "Handshake complete");

                self.events.push_back(Event::Open);

                if !rest.is_empty() {
                    self.reassembler.push(&rest);
                    self.process();
                }
            }
            Err(err) => {
                tracing::warn!(%err, "Handshake failed");

                self.events.push_back(Event::Error(Error::Handshake(err)));
                self.abort();
            }
        }
    }

    fn process(&mut self) {
        while self.state != ReadyState::Closed && !self.close.remote_close_received {
            match self.reassembler.next() {
                Ok(None) => break,
                Ok(Some(incoming)) => self.on_incoming(incoming),
                Err(err) => self.on_protocol_error(err),
            }
        }
    }

    fn on_incoming(&mut self, incoming: Incoming) {
        if self.failed && !matches!(incoming, Incoming::Close(_)) {
            tracing::trace!("Dropping frame after protocol error");

            return;
        }

        match incoming {
            Incoming::Message(data) => self.events.push_back(Event::Message(data)),
            Incoming::Ping(payload) => {
                // No frame may follow our close frame.
                if self.auto_pong && !self.close.local_close_sent {
                    let frame = FrameSender::pong(&mut self.rng, &payload);

                    if let Err(err) = self.transport.write(&frame) {
                        self.events.push_back(Event::Error(Error::Transport(err)));
                    }
                }

                self.events.push_back(Event::Ping(payload));
            }
            Incoming::Pong(payload) => self.events.push_back(Event::Pong(payload)),
            Incoming::Close(payload) => self.on_remote_close(&payload),
        }
    }

    fn on_remote_close(&mut self, payload: &[u8]) {
        let frame = match CloseFrame::parse(payload) {
            Ok(frame) => frame,
            Err(err) => return self.on_protocol_error(err),
        };

        self.close.remote_close_received = true;

        let status = match &frame {
            Some(frame) => (frame.code(), frame.reason().to_string()),
            None => (CloseCode::NoStatus, String::new()),
        };

        tracing::debug!(code = status.0.into_u16(), "Received close frame");

        self.remote_status = Some(status);

        if let Err(err) = self.close_inner(frame) {
            self.events.push_back(Event::Error(err));
        }
    }

    /// Reports the error and sends a close frame.
    ///
    /// A frame that could not be decoded leaves no way to find the next frame, so the transport
    /// is torn down right away. Otherwise frames are still decoded, but only a close frame is
    /// acted on.
    fn on_protocol_error(&mut self, error: ProtocolError) {
        let framing_lost = matches!(error, ProtocolError::Decode(_));

        if self.failed && !framing_lost {
            tracing::trace!(%error, "Ignoring protocol error after protocol error");

            return;
        }

        tracing::warn!(%error, "Protocol error");

        let code = error.close_code();

        self.failed = true;
        self.events.push_back(Event::Error(Error::Protocol(error)));

        if let Err(err) = self.close_inner(Some(CloseFrame::no_reason(code))) {
            self.events.push_back(Event::Error(err));
        }

        if framing_lost {
            self.reassembler.reset();

            if self.state != ReadyState::Closed {
                self.teardown();
            }
        }
    }

    /// Starts or completes the closing handshake.
    ///
    /// - `CLOSED`: does nothing.
    /// - `CONNECTING`: closes the transport right away and reports [`CloseCode::Abnormal`].
    /// - Otherwise sends a close frame carrying `frame` (an empty payload for `None`). The
    ///   transport is torn down once the server's close frame has arrived too.
    pub fn close(&mut self, frame: Option<CloseFrame<'_>>) -> Result<(), Error<T::Error>> {
        if let Some(frame) = &frame {
            if !frame.code().is_allowed() {
                return Err(Error::Usage(UsageError::InvalidCloseCode { code: frame.code() }));
            }

            if frame.reason().len() > MAX_REASON_LEN {
                return Err(Error::Usage(UsageError::CloseReasonTooLong));
            }
        }

        self.close_inner(frame)
    }

    fn close_inner(&mut self, frame: Option<CloseFrame<'_>>) -> Result<(), Error<T::Error>> {
        match self.state {
            ReadyState::Closed => return Ok(()),
            ReadyState::Connecting => {
                self.abort();

                return Ok(());
            }
            ReadyState::Closing if self.close.is_complete() => {
                self.teardown();

                return Ok(());
            }
            // Waiting for the server's close frame.
            ReadyState::Closing if self.close.local_close_sent => return Ok(()),
            ReadyState::Open | ReadyState::Closing => {}
        }

        if self.state == ReadyState::Open {
            self.set_state(ReadyState::Closing);
        }

        let bytes = FrameSender::close(&mut self.rng, frame.as_ref());

        self.transport.write(&bytes).map_err(Error::Transport)?;

        tracing::debug!(code = ?frame.map(|f| f.code().into_u16()), "Sent close frame");

        self.close.local_close_sent = true;

        if self.close.remote_close_received {
            self.teardown();
        }

        Ok(())
    }

    /// Sends `data` as one frame and reports the write through `on_complete`.
    ///
    /// Fails synchronously only while [`ReadyState::Connecting`]. While closing or closed
    /// `on_complete` receives [`UsageError::NotOpen`].
    pub fn send_with<F>(
        &mut self,
        data: &[u8],
        options: SendOptions,
        on_complete: F,
    ) -> Result<(), UsageError>
    where
        F: FnOnce(Result<(), Error<T::Error>>),
    {
        match self.state {
            ReadyState::Connecting => return Err(UsageError::StillConnecting),
            ReadyState::Closing | ReadyState::Closed => {
                on_complete(Err(Error::Usage(UsageError::NotOpen)));

                return Ok(());
            }
            ReadyState::Open => {}
        }

        let bytes = self.sender.data(&mut self.rng, data, options);
        let result = self.transport.write(&bytes).map_err(Error::Transport);

        if result.is_ok() {
            self.sender.sent(options.fin);
        }

        on_complete(result);

        Ok(())
    }

    /// Sends `data` as one frame.
    ///
    /// A message is opened by the first frame after a frame with `fin` set. Its type comes from
    /// `options.binary` and later frames are continuations.
    pub fn send(&mut self, data: &[u8], options: SendOptions) -> Result<(), Error<T::Error>> {
        let mut outcome = Ok(());

        self.send_with(data, options, |result| outcome = result)?;

        outcome
    }

    /// Sends `data` as a message split into frames of at most `fragment_size` bytes.
    pub fn send_fragmented(
        &mut self,
        data: &[u8],
        options: SendOptions,
        fragment_size: usize,
    ) -> Result<(), Error<T::Error>> {
        if fragment_size == 0 {
            return Err(Error::Usage(UsageError::ZeroFragmentSize));
        }

        if data.is_empty() {
            return self.send(data, options);
        }

        let mut fragments = data.chunks(fragment_size).peekable();

        while let Some(fragment) = fragments.next() {
            let fin = options.fin && fragments.peek().is_none();

            self.send(fragment, options.with_fin(fin))?;
        }

        Ok(())
    }

    /// Sends a ping and reports the write through `on_complete`.
    pub fn ping_with<F>(&mut self, data: &[u8], on_complete: F) -> Result<(), UsageError>
    where
        F: FnOnce(Result<(), Error<T::Error>>),
    {
        self.control_with(OpCode::Ping, data, on_complete)
    }

    /// Sends a ping.
    pub fn ping(&mut self, data: &[u8]) -> Result<(), Error<T::Error>> {
        let mut outcome = Ok(());

        self.ping_with(data, |result| outcome = result)?;

        outcome
    }

    /// Sends an unsolicited pong and reports the write through `on_complete`.
    pub fn pong_with<F>(&mut self, data: &[u8], on_complete: F) -> Result<(), UsageError>
    where
        F: FnOnce(Result<(), Error<T::Error>>),
    {
        self.control_with(OpCode::Pong, data, on_complete)
    }

    /// Sends an unsolicited pong.
    pub fn pong(&mut self, data: &[u8]) -> Result<(), Error<T::Error>> {
        let mut outcome = Ok(());

        self.pong_with(data, |result| outcome = result)?;

        outcome
    }

    fn control_with<F>(
        &mut self,
        opcode: OpCode,
        data: &[u8],
        on_complete: F,
    ) -> Result<(), UsageError>
    where
        F: FnOnce(Result<(), Error<T::Error>>),
    {
        if data.len() > MAX_CONTROL_PAYLOAD {
            return Err(UsageError::ControlPayloadTooLarge);
        }

        match self.state {
            ReadyState::Connecting => return Err(UsageError::StillConnecting),
            ReadyState::Closing | ReadyState::Closed => {
                on_complete(Err(Error::Usage(UsageError::NotOpen)));

                return Ok(());
            }
            ReadyState::Open => {}
        }

        let bytes = match opcode {
            OpCode::Ping => FrameSender::ping(&mut self.rng, data),
            _ => FrameSender::pong(&mut self.rng, data),
        };

        on_complete(self.transport.write(&bytes).map_err(Error::Transport));

        Ok(())
    }
}
