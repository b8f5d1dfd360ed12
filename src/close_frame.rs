use alloc::vec::Vec;

use crate::{CloseCode, error::ProtocolError};

/// Longest reason that still fits a control frame next to the 2-byte code.
pub const MAX_REASON_LEN: usize = 123;

/// The status carried by a close frame.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct CloseFrame<'a> {
    /// The reason as a code.
    code: CloseCode,
    /// The reason as text string.
    reason: &'a str,
}

impl<'a> CloseFrame<'a> {
    /// Creates a new [`CloseFrame`].
    pub const fn new(code: CloseCode, reason: &'a str) -> Self {
        Self { code, reason }
    }

    /// Creates a new [`CloseFrame`] with an empty reason.
    pub const fn no_reason(code: CloseCode) -> Self {
        Self::new(code, "")
    }

    /// Returns the close code.
    pub const fn code(&self) -> CloseCode {
        self.code
    }

    /// Returns the reason as a string slice.
    pub const fn reason(&self) -> &'a str {
        self.reason
    }

    /// Parses a received close payload.
    ///
    /// An empty payload carries no status and yields `None`.
    pub fn parse(payload: &'a [u8]) -> Result<Option<Self>, ProtocolError> {
        match payload.len() {
            0 => Ok(None),
            1 => Err(ProtocolError::InvalidClosePayload),
            _ => {
                let code = CloseCode::from_u16(u16::from_be_bytes([payload[0], payload[1]]));

                let reason =
                    core::str::from_utf8(&payload[2..]).map_err(|_| ProtocolError::InvalidUtf8)?;

                Ok(Some(Self::new(code, reason)))
            }
        }
    }

    /// Appends the wire payload: the big-endian code followed by the reason.
    pub fn write(&self, dst: &mut Vec<u8>) {
        dst.extend_from_slice(&self.code.into_u16().to_be_bytes());
        dst.extend_from_slice(self.reason.as_bytes());
    }
}
