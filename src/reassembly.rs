//! Turns delivered byte chunks into complete messages.

use alloc::{string::String, vec::Vec};

use crate::{
    Frame, FramesCodec, OpCode,
    error::ProtocolError,
    event::Data,
};

/// A complete unit handed to the connection.
#[derive(Debug, PartialEq, Eq)]
pub enum Incoming {
    Message(Data),
    Ping(Vec<u8>),
    Pong(Vec<u8>),
    /// Raw close payload, parsed by the connection.
    Close(Vec<u8>),
}

/// A text or binary message whose final frame has not arrived yet.
#[derive(Debug)]
struct InProgressMessage {
    opcode: OpCode,
    payload: Vec<u8>,
    frames: usize,
}

impl InProgressMessage {
    fn new(opcode: OpCode, payload: &[u8]) -> Self {
        Self {
            opcode,
            payload: payload.to_vec(),
            frames: 1,
        }
    }

    fn push(&mut self, payload: &[u8]) {
        self.payload.extend_from_slice(payload);
        self.frames += 1;
    }

    fn complete(self) -> Result<Data, ProtocolError> {
        tracing::trace!(opcode = ?self.opcode, frames = self.frames, len = self.payload.len(), "Message complete");

        match self.opcode {
            OpCode::Text => String::from_utf8(self.payload)
                .map(Data::Text)
                .map_err(|_| ProtocolError::InvalidUtf8),
            _ => Ok(Data::Binary(self.payload)),
        }
    }
}

/// Buffers delivered bytes and stitches frames into messages.
///
/// Bytes of an incomplete frame stay buffered until the next [`push`](Reassembler::push).
#[derive(Debug, Default)]
pub struct Reassembler {
    buffer: Vec<u8>,
    /// Start of the first undecoded frame in `buffer`.
    pos: usize,
    codec: FramesCodec,
    /// At most one, fragmented messages cannot interleave.
    in_progress: Option<InProgressMessage>,
}

impl Reassembler {
    pub fn new() -> Self {
        Self::default()
    }

    /// Appends a delivered chunk.
    pub fn push(&mut self, chunk: &[u8]) {
        if self.pos > 0 {
            self.buffer.drain(..self.pos);
            self.pos = 0;
        }

        self.buffer.extend_from_slice(chunk);
    }

    /// Number of bytes received but not yet decoded.
    #[cfg(test)]
    pub fn buffered(&self) -> usize {
        self.buffer.len() - self.pos
    }

    /// Whether a fragmented message is waiting for more frames.
    #[cfg(test)]
    pub fn in_flight(&self) -> bool {
        self.in_progress.is_some()
    }

    /// Drops all buffered bytes and any message in flight.
    pub fn reset(&mut self) {
        self.buffer.clear();
        self.pos = 0;
        self.codec.reset();
        self.in_progress = None;
    }

    /// Decodes frames until a complete unit is available.
    ///
    /// Returns `Ok(None)` once the buffer holds no complete frame.
    ///
    /// A frame that breaks the fragmentation or UTF-8 rules is consumed and drops the message in
    /// flight, so decoding can go on with the next frame. After a
    /// [`ProtocolError::Decode`] the framing is lost and the buffer must be discarded.
    pub fn next(&mut self) -> Result<Option<Incoming>, ProtocolError> {
        loop {
            let (frame, consumed) = match self.codec.decode(&self.buffer[self.pos..])? {
                Some(decoded) => decoded,
                None => return Ok(None),
            };

            self.pos += consumed;

            match Self::on_frame(&mut self.in_progress, frame) {
                Ok(Some(incoming)) => return Ok(Some(incoming)),
                Ok(None) => {}
                Err(err) => {
                    self.in_progress = None;

                    return Err(err);
                }
            }
        }
    }

    fn on_frame(
        in_progress: &mut Option<InProgressMessage>,
        frame: Frame<'_>,
    ) -> Result<Option<Incoming>, ProtocolError> {
        if frame.opcode().is_control() && !frame.is_final() {
            return Err(ProtocolError::Decode(
                crate::error::FrameDecodeError::ControlFrameFragmented,
            ));
        }

        match frame.opcode() {
            OpCode::Ping => Ok(Some(Incoming::Ping(frame.payload().to_vec()))),
            OpCode::Pong => Ok(Some(Incoming::Pong(frame.payload().to_vec()))),
            OpCode::Close => Ok(Some(Incoming::Close(frame.payload().to_vec()))),
            OpCode::Text | OpCode::Binary => {
                if in_progress.is_some() {
                    return Err(ProtocolError::InvalidFragment);
                }

                let message = InProgressMessage::new(frame.opcode(), frame.payload());

                if frame.is_final() {
                    return message.complete().map(|data| Some(Incoming::Message(data)));
                }

                *in_progress = Some(message);

                Ok(None)
            }
            OpCode::Continuation => {
                let message = in_progress
                    .as_mut()
                    .ok_or(ProtocolError::InvalidContinuationFrame)?;

                message.push(frame.payload());

                if !frame.is_final() {
                    return Ok(None);
                }

                match in_progress.take() {
                    Some(message) => message.complete().map(|data| Some(Incoming::Message(data))),
                    None => Ok(None),
                }
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use alloc::{string::ToString, vec};

    use super::*;
    use crate::{error::FrameDecodeError, mock::server_frame};

    fn text(s: &str) -> Incoming {
        Incoming::Message(Data::Text(s.to_string()))
    }

    #[test]
    fn single_text_frame() {
        let mut reassembler = Reassembler::new();

        reassembler.push(&[0x81, 0x02, b'h', b'i']);

        assert_eq!(reassembler.next().unwrap(), Some(text("hi")));
        assert_eq!(reassembler.next().unwrap(), None);
        assert_eq!(reassembler.buffered(), 0);
    }

    #[test]
    fn several_frames_in_one_chunk() {
        let mut chunk = server_frame(OpCode::Binary, b"one", true);
        chunk.extend(server_frame(OpCode::Pong, b"p", true));
        chunk.extend(server_frame(OpCode::Text, b"two", true));

        let mut reassembler = Reassembler::new();
        reassembler.push(&chunk);

        assert_eq!(
            reassembler.next().unwrap(),
            Some(Incoming::Message(Data::Binary(b"one".to_vec())))
        );
        assert_eq!(reassembler.next().unwrap(), Some(Incoming::Pong(b"p".to_vec())));
        assert_eq!(reassembler.next().unwrap(), Some(text("two")));
        assert_eq!(reassembler.next().unwrap(), None);
    }

    #[test]
    fn fragmented_message() {
        let mut chunk = server_frame(OpCode::Text, b"Hel", false);
        chunk.extend(server_frame(OpCode::Continuation, b"lo, ", false));
        chunk.extend(server_frame(OpCode::Continuation, b"world", true));

        let mut reassembler = Reassembler::new();
        reassembler.push(&chunk);

        assert_eq!(reassembler.next().unwrap(), Some(text("Hello, world")));
        assert!(!reassembler.in_flight());
    }

    #[test]
    fn control_frame_between_fragments() {
        let mut chunk = server_frame(OpCode::Binary, &[1, 2], false);
        chunk.extend(server_frame(OpCode::Ping, b"?", true));
        chunk.extend(server_frame(OpCode::Continuation, &[3], true));

        let mut reassembler = Reassembler::new();
        reassembler.push(&chunk);

        assert_eq!(reassembler.next().unwrap(), Some(Incoming::Ping(b"?".to_vec())));
        assert!(reassembler.in_flight());
        assert_eq!(
            reassembler.next().unwrap(),
            Some(Incoming::Message(Data::Binary(vec![1, 2, 3])))
        );
    }

    #[test]
    fn frames_split_across_chunks() {
        let mut bytes = server_frame(OpCode::Text, "héllo".as_bytes(), false);
        bytes.extend(server_frame(OpCode::Continuation, &[b'!'; 200], true));

        let mut reassembler = Reassembler::new();

        for byte in &bytes[..bytes.len() - 1] {
            reassembler.push(&[*byte]);

            assert_eq!(reassembler.next().unwrap(), None);
        }

        reassembler.push(&bytes[bytes.len() - 1..]);

        let mut expected = "héllo".to_string();
        expected.extend(core::iter::repeat_n('!', 200));

        assert_eq!(reassembler.next().unwrap(), Some(text(&expected)));
    }

    #[test]
    fn utf8_split_between_fragments() {
        let bytes = "é".as_bytes();

        let mut chunk = server_frame(OpCode::Text, &bytes[..1], false);
        chunk.extend(server_frame(OpCode::Continuation, &bytes[1..], true));

        let mut reassembler = Reassembler::new();
        reassembler.push(&chunk);

        assert_eq!(reassembler.next().unwrap(), Some(text("é")));
    }

    #[test]
    fn continuation_without_initial_frame() {
        let mut reassembler = Reassembler::new();
        reassembler.push(&server_frame(OpCode::Continuation, b"x", true));

        assert!(matches!(
            reassembler.next(),
            Err(ProtocolError::InvalidContinuationFrame)
        ));
    }

    #[test]
    fn data_frame_while_message_in_flight() {
        let mut chunk = server_frame(OpCode::Text, b"a", false);
        chunk.extend(server_frame(OpCode::Binary, b"b", true));

        let mut reassembler = Reassembler::new();
        reassembler.push(&chunk);

        assert!(matches!(
            reassembler.next(),
            Err(ProtocolError::InvalidFragment)
        ));
    }

    #[test]
    fn decoding_goes_on_after_invalid_fragment() {
        let mut chunk = server_frame(OpCode::Text, b"a", false);
        chunk.extend(server_frame(OpCode::Binary, b"b", true));
        chunk.extend(server_frame(OpCode::Continuation, b"c", true));
        chunk.extend(server_frame(OpCode::Close, &[0x03, 0xEA], true));

        let mut reassembler = Reassembler::new();
        reassembler.push(&chunk);

        assert!(matches!(
            reassembler.next(),
            Err(ProtocolError::InvalidFragment)
        ));
        assert!(!reassembler.in_flight());

        // The dropped message's tail is an orphan now.
        assert!(matches!(
            reassembler.next(),
            Err(ProtocolError::InvalidContinuationFrame)
        ));
        assert_eq!(
            reassembler.next().unwrap(),
            Some(Incoming::Close(vec![0x03, 0xEA]))
        );
        assert_eq!(reassembler.buffered(), 0);
    }

    #[test]
    fn decoding_goes_on_after_invalid_utf8() {
        let mut chunk = server_frame(OpCode::Text, &[0xFF], true);
        chunk.extend(server_frame(OpCode::Text, b"ok", true));

        let mut reassembler = Reassembler::new();
        reassembler.push(&chunk);

        assert!(matches!(reassembler.next(), Err(ProtocolError::InvalidUtf8)));
        assert_eq!(reassembler.next().unwrap(), Some(text("ok")));
    }

    #[test]
    fn fragmented_control_frame() {
        let mut reassembler = Reassembler::new();
        reassembler.push(&[0x09, 0x00]);

        assert!(matches!(
            reassembler.next(),
            Err(ProtocolError::Decode(
                FrameDecodeError::ControlFrameFragmented
            ))
        ));
    }

    #[test]
    fn invalid_utf8_text() {
        let mut reassembler = Reassembler::new();
        reassembler.push(&server_frame(OpCode::Text, &[0xC3, 0x28], true));

        assert!(matches!(reassembler.next(), Err(ProtocolError::InvalidUtf8)));
    }

    #[test]
    fn close_is_passed_raw() {
        let mut reassembler = Reassembler::new();
        reassembler.push(&server_frame(OpCode::Close, &[0x03, 0xE8], true));

        assert_eq!(
            reassembler.next().unwrap(),
            Some(Incoming::Close(vec![0x03, 0xE8]))
        );
    }

    #[test]
    fn reset_discards_everything() {
        let mut reassembler = Reassembler::new();
        reassembler.push(&server_frame(OpCode::Text, b"abc", false));
        reassembler.push(&[0x80, 0x05, b'x']);

        assert_eq!(reassembler.next().unwrap(), None);
        assert!(reassembler.in_flight());

        reassembler.reset();

        assert!(!reassembler.in_flight());
        assert_eq!(reassembler.buffered(), 0);

        reassembler.push(&[0x81, 0x00]);

        assert_eq!(reassembler.next().unwrap(), Some(text("")));
    }
}
