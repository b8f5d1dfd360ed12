//! In-memory implementations for testing purposes.

use alloc::vec::Vec;

use rand_core::RngCore;

use crate::{OpCode, Transport};

/// A [`Transport`] that records everything written to it.
#[derive(Debug, Default)]
pub struct MemoryTransport {
    /// Frames (and the upgrade request) in the order they were written.
    pub written: Vec<Vec<u8>>,
    /// Number of successful `open` calls.
    pub opened: usize,
    /// Number of `close` calls.
    pub closed: usize,
    /// Fail `open` calls.
    pub fail_open: bool,
    /// Fail `write` calls.
    pub fail_writes: bool,
}

/// The error produced by a failing [`MemoryTransport`].
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct MemoryError;

impl MemoryTransport {
    /// Creates a transport that accepts everything.
    pub fn new() -> Self {
        Self::default()
    }

    /// Takes all recorded writes, concatenated.
    pub fn take_written(&mut self) -> Vec<u8> {
        self.written.drain(..).flatten().collect()
    }

    /// Takes the recorded writes one by one.
    pub fn take_frames(&mut self) -> Vec<Vec<u8>> {
        core::mem::take(&mut self.written)
    }
}

impl Transport for MemoryTransport {
    type Error = MemoryError;

    fn open(&mut self) -> Result<(), Self::Error> {
        if self.fail_open {
            return Err(MemoryError);
        }

        self.opened += 1;

        Ok(())
    }

    fn write(&mut self, bytes: &[u8]) -> Result<(), Self::Error> {
        if self.fail_writes {
            return Err(MemoryError);
        }

        self.written.push(bytes.to_vec());

        Ok(())
    }

    fn close(&mut self) {
        self.closed += 1;
    }
}

/// An rng that yields a fixed byte pattern.
#[derive(Debug, Clone, Copy)]
pub struct Fixed(pub u8);

impl RngCore for Fixed {
    fn next_u32(&mut self) -> u32 {
        u32::from_ne_bytes([self.0; 4])
    }

    fn next_u64(&mut self) -> u64 {
        u64::from_ne_bytes([self.0; 8])
    }

    fn fill_bytes(&mut self, dst: &mut [u8]) {
        dst.fill(self.0);
    }
}

/// Builds an unmasked frame the way a server sends it.
pub fn server_frame(opcode: OpCode, payload: &[u8], fin: bool) -> Vec<u8> {
    let mut dst = Vec::new();

    crate::codec::encode_into(opcode, payload, fin, false, None, &mut dst);

    dst
}

/// Strips the mask from an encoded client frame, yielding the equivalent server frame.
///
/// # Panics
///
/// Panics if `frame` is not a complete masked frame.
pub fn unmask_client_frame(frame: &[u8]) -> Vec<u8> {
    assert!(frame[1] & 0x80 != 0, "frame is not masked");

    let head_len = match frame[1] & 0x7F {
        126 => 4,
        127 => 10,
        _ => 2,
    };

    let mut key = [0u8; 4];
    key.copy_from_slice(&frame[head_len..head_len + 4]);

    let mut dst = Vec::with_capacity(frame.len() - 4);

    dst.extend_from_slice(&frame[..head_len]);
    dst[1] &= 0x7F;
    dst.extend_from_slice(&frame[head_len + 4..]);

    crate::mask::apply_mask(&mut dst[head_len..], key);

    dst
}
