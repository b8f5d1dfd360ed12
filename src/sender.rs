//! Builds outbound frames.

use alloc::vec::Vec;

use rand::Rng;
use rand_core::RngCore;

use crate::{CloseFrame, OpCode, codec::encode, options::SendOptions};

/// A fresh key for every frame, never shared between sends.
fn mask_key<R: RngCore>(rng: &mut R) -> [u8; 4] {
    rng.random()
}

/// Tracks where the current outbound message stands.
#[derive(Debug)]
pub struct FrameSender {
    first_fragment: bool,
}

impl Default for FrameSender {
    fn default() -> Self {
        Self::new()
    }
}

impl FrameSender {
    pub const fn new() -> Self {
        Self {
            first_fragment: true,
        }
    }

    /// Whether the next data frame opens a new message.
    #[cfg(test)]
    pub const fn is_first_fragment(&self) -> bool {
        self.first_fragment
    }

    /// The opcode the next data frame would carry.
    pub const fn opcode(&self, options: SendOptions) -> OpCode {
        match (self.first_fragment, options.binary) {
            (false, _) => OpCode::Continuation,
            (true, true) => OpCode::Binary,
            (true, false) => OpCode::Text,
        }
    }

    /// Builds the next data frame. Call [`sent`](FrameSender::sent) once it was written.
    pub fn data<R: RngCore>(&self, rng: &mut R, data: &[u8], options: SendOptions) -> Vec<u8> {
        if options.compress {
            tracing::trace!("Compression is not supported, sending uncompressed");
        }

        encode(self.opcode(options), data, options.fin, false, mask_key(rng))
    }

    /// Records a written data frame.
    pub fn sent(&mut self, fin: bool) {
        self.first_fragment = fin;
    }

    /// Builds a close frame. No status yields an empty payload.
    pub fn close<R: RngCore>(rng: &mut R, frame: Option<&CloseFrame<'_>>) -> Vec<u8> {
        let mut payload = Vec::new();

        if let Some(frame) = frame {
            frame.write(&mut payload);
        }

        encode(OpCode::Close, &payload, true, false, mask_key(rng))
    }

    pub fn ping<R: RngCore>(rng: &mut R, data: &[u8]) -> Vec<u8> {
        encode(OpCode::Ping, data, true, false, mask_key(rng))
    }

    pub fn pong<R: RngCore>(rng: &mut R, data: &[u8]) -> Vec<u8> {
        encode(OpCode::Pong, data, true, false, mask_key(rng))
    }
}
