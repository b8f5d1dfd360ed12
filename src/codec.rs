//! Wire encoding and decoding of single frames.

use alloc::vec::Vec;

use crate::{
    Frame, OpCode,
    error::FrameDecodeError,
    frame::{Header, MAX_HEADER_SIZE},
};

const MIN_HEADER_SIZE: usize = 2;

/// Largest payload a control frame may carry.
pub const MAX_CONTROL_PAYLOAD: usize = 125;

#[derive(Debug)]
enum DecodeState {
    Init,
    DecodedHeader {
        fin: bool,
        opcode: OpCode,
        length_code: u8,
        extra: usize,
        min_src_len: usize,
    },
    DecodedPayloadLength {
        fin: bool,
        opcode: OpCode,
        payload_len: usize,
        min_src_len: usize,
    },
}

/// Decodes server frames.
///
/// The codec remembers how far it got into the header of an incomplete frame, so the next call
/// must pass a buffer starting at the same frame.
#[derive(Debug)]
pub struct FramesCodec {
    decode_state: DecodeState,
}

impl Default for FramesCodec {
    fn default() -> Self {
        Self::new()
    }
}

impl FramesCodec {
    /// Creates a new [`FramesCodec`].
    pub const fn new() -> Self {
        Self {
            decode_state: DecodeState::Init,
        }
    }

    /// Forgets any partially decoded header.
    pub fn reset(&mut self) {
        self.decode_state = DecodeState::Init;
    }

    /// Decodes one frame from the start of `src`.
    ///
    /// Returns the frame and the number of bytes it occupies, or `Ok(None)` if `src` does not hold
    /// a complete frame yet. Nothing is consumed in that case.
    pub fn decode<'buf>(
        &mut self,
        src: &'buf [u8],
    ) -> Result<Option<(Frame<'buf>, usize)>, FrameDecodeError> {
        let result = self.decode_inner(src);

        if result.is_err() {
            self.reset();
        }

        result
    }

    fn decode_inner<'buf>(
        &mut self,
        src: &'buf [u8],
    ) -> Result<Option<(Frame<'buf>, usize)>, FrameDecodeError> {
        loop {
            match self.decode_state {
                DecodeState::Init => {
                    if src.len() < MIN_HEADER_SIZE {
                        return Ok(None);
                    }

                    let fin = src[0] & 0b10000000 != 0;
                    let rsv1 = src[0] & 0b01000000 != 0;
                    let rsv2 = src[0] & 0b00100000 != 0;
                    let rsv3 = src[0] & 0b00010000 != 0;

                    if rsv1 || rsv2 || rsv3 {
                        return Err(FrameDecodeError::ReservedBitsNotZero);
                    }

                    let opcode = OpCode::try_from(src[0] & 0b00001111)?;

                    if src[1] & 0b10000000 != 0 {
                        return Err(FrameDecodeError::UnexpectedMaskedFrame);
                    }

                    let length_code = src[1] & 0x7F;
                    let extra = match length_code {
                        126 => 2,
                        127 => return Err(FrameDecodeError::UnsupportedPayloadLength),
                        _ => 0,
                    };

                    if opcode.is_control() {
                        if !fin {
                            return Err(FrameDecodeError::ControlFrameFragmented);
                        }

                        if length_code as usize > MAX_CONTROL_PAYLOAD {
                            return Err(FrameDecodeError::ControlFrameTooLarge);
                        }
                    }

                    self.decode_state = DecodeState::DecodedHeader {
                        fin,
                        opcode,
                        length_code,
                        extra,
                        min_src_len: MIN_HEADER_SIZE + extra,
                    };
                }
                DecodeState::DecodedHeader {
                    fin,
                    opcode,
                    length_code,
                    extra,
                    min_src_len,
                } => {
                    if src.len() < min_src_len {
                        return Ok(None);
                    }

                    let payload_len = match extra {
                        2 => u16::from_be_bytes([src[2], src[3]]) as usize,
                        _ => length_code as usize,
                    };

                    self.decode_state = DecodeState::DecodedPayloadLength {
                        fin,
                        opcode,
                        payload_len,
                        min_src_len: min_src_len + payload_len,
                    };
                }
                DecodeState::DecodedPayloadLength {
                    fin,
                    opcode,
                    payload_len,
                    min_src_len,
                } => {
                    if src.len() < min_src_len {
                        return Ok(None);
                    }

                    let payload = &src[min_src_len - payload_len..min_src_len];

                    self.decode_state = DecodeState::Init;

                    tracing::trace!(?opcode, fin, len = payload_len, "Decoded frame");

                    return Ok(Some((Frame::new(fin, opcode, payload), min_src_len)));
                }
            }
        }
    }
}

/// Encodes a client frame: header, mask key and masked payload.
pub fn encode(opcode: OpCode, payload: &[u8], fin: bool, rsv1: bool, mask: [u8; 4]) -> Vec<u8> {
    let mut dst = Vec::with_capacity(MAX_HEADER_SIZE + payload.len());

    encode_into(opcode, payload, fin, rsv1, Some(mask), &mut dst);

    dst
}

/// Appends an encoded frame to `dst`. Unmasked frames are only ever built for tests.
pub(crate) fn encode_into(
    opcode: OpCode,
    payload: &[u8],
    fin: bool,
    rsv1: bool,
    mask: Option<[u8; 4]>,
    dst: &mut Vec<u8>,
) {
    let mut head = [0u8; MAX_HEADER_SIZE];
    let head_len = Header::new(fin, rsv1, opcode, mask, payload.len()).write(&mut head);

    dst.extend_from_slice(&head[..head_len]);

    let start = dst.len();
    dst.extend_from_slice(payload);

    if let Some(mask) = mask {
        crate::mask::apply_mask(&mut dst[start..], mask);
    }

    tracing::trace!(?opcode, fin, len = payload.len(), "Encoded frame");
}
