use crate::OpCode;

/// Largest header: 2 bytes, 8 bytes of extended length and a 4-byte mask key.
pub const MAX_HEADER_SIZE: usize = 14;

/// A received frame.
#[derive(Debug)]
pub struct Frame<'a> {
    /// Indicates if this is the final frame in a message.
    fin: bool,
    /// The opcode of the frame.
    opcode: OpCode,
    /// The payload of the frame.
    payload: &'a [u8],
}

impl<'a> Frame<'a> {
    /// Creates a new `Frame` instance.
    pub const fn new(fin: bool, opcode: OpCode, payload: &'a [u8]) -> Self {
        Self {
            fin,
            opcode,
            payload,
        }
    }

    /// Returns whether this is the final frame in a message.
    pub const fn is_final(&self) -> bool {
        self.fin
    }

    /// Returns the opcode of the frame.
    pub const fn opcode(&self) -> OpCode {
        self.opcode
    }

    /// Returns the payload of the frame.
    pub const fn payload(&self) -> &'a [u8] {
        self.payload
    }
}

#[derive(Debug)]
pub struct Header {
    /// Indicates if this is the final frame in a message.
    fin: bool,
    /// Reserved for per-message compression.
    rsv1: bool,
    /// The opcode of the frame.
    opcode: OpCode,
    /// The masking key, if any.
    mask: Option<[u8; 4]>,
    /// The length of the payload.
    payload_len: usize,
}

impl Header {
    pub const fn new(
        fin: bool,
        rsv1: bool,
        opcode: OpCode,
        mask: Option<[u8; 4]>,
        payload_len: usize,
    ) -> Self {
        Self {
            fin,
            rsv1,
            opcode,
            mask,
            payload_len,
        }
    }

    /// Writes the header, including the mask key, into `dst` and returns its size.
    pub fn write(&self, dst: &mut [u8; MAX_HEADER_SIZE]) -> usize {
        dst[0] = (self.fin as u8) << 7 | (self.rsv1 as u8) << 6 | (self.opcode as u8);

        let len = self.payload_len;

        let size = if len < 126 {
            dst[1] = len as u8;
            2
        } else if len < 65536 {
            dst[1] = 126;
            dst[2..4].copy_from_slice(&(len as u16).to_be_bytes());
            4
        } else {
            dst[1] = 127;
            dst[2..10].copy_from_slice(&(len as u64).to_be_bytes());
            10
        };

        match self.mask {
            None => size,
            Some(mask) => {
                dst[1] |= 0x80;
                dst[size..size + 4].copy_from_slice(&mask);
                size + 4
            }
        }
    }
}
