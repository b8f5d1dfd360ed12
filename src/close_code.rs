/// A WebSocket Close code.
///
/// Indicates why an endpoint is closing the WebSocket connection.
#[non_exhaustive]
#[derive(Debug, Copy, Clone, PartialEq, Eq, Hash)]
pub enum CloseCode {
    /// The purpose for which the connection was established has been fulfilled.
    Normal,
    /// An endpoint is going away, such as a server going down.
    Away,
    /// An endpoint is terminating the connection due to a protocol error.
    Protocol,
    /// An endpoint received a type of data it cannot accept.
    Unsupported,
    /// No status code was included in the close frame.
    ///
    /// Never sent on the wire, only reported in close events.
    NoStatus,
    /// The connection was dropped without a close handshake.
    ///
    /// Never sent on the wire, only reported in close events.
    Abnormal,
    /// A message contained data inconsistent with its type, such as non UTF-8 text.
    Invalid,
    /// A message violated the endpoint's policy.
    Policy,
    /// A message was too big to process.
    Size,
    /// The client expected the server to negotiate an extension.
    Extension,
    /// The server hit an unexpected condition.
    Error,
    /// The server is restarting.
    Restart,
    /// The server is overloaded.
    Again,
    #[doc(hidden)]
    Tls,
    #[doc(hidden)]
    Reserved(u16),
    #[doc(hidden)]
    Iana(u16),
    #[doc(hidden)]
    Library(u16),
    #[doc(hidden)]
    Bad(u16),
}

impl CloseCode {
    /// Whether this code may be put in a close frame by an endpoint.
    pub const fn is_allowed(self) -> bool {
        !matches!(
            self,
            CloseCode::Bad(_)
                | CloseCode::Reserved(_)
                | CloseCode::NoStatus
                | CloseCode::Abnormal
                | CloseCode::Tls
        )
    }

    /// Maps a wire value to a code.
    pub const fn from_u16(code: u16) -> Self {
        match code {
            1000 => Self::Normal,
            1001 => Self::Away,
            1002 => Self::Protocol,
            1003 => Self::Unsupported,
            1005 => Self::NoStatus,
            1006 => Self::Abnormal,
            1007 => Self::Invalid,
            1008 => Self::Policy,
            1009 => Self::Size,
            1010 => Self::Extension,
            1011 => Self::Error,
            1012 => Self::Restart,
            1013 => Self::Again,
            1015 => Self::Tls,
            1016..=2999 => Self::Reserved(code),
            3000..=3999 => Self::Iana(code),
            4000..=4999 => Self::Library(code),
            _ => Self::Bad(code),
        }
    }

    /// The wire value of this code.
    pub const fn into_u16(self) -> u16 {
        match self {
            Self::Normal => 1000,
            Self::Away => 1001,
            Self::Protocol => 1002,
            Self::Unsupported => 1003,
            Self::NoStatus => 1005,
            Self::Abnormal => 1006,
            Self::Invalid => 1007,
            Self::Policy => 1008,
            Self::Size => 1009,
            Self::Extension => 1010,
            Self::Error => 1011,
            Self::Restart => 1012,
            Self::Again => 1013,
            Self::Tls => 1015,
            Self::Reserved(code) | Self::Iana(code) | Self::Library(code) | Self::Bad(code) => {
                code
            }
        }
    }
}

impl From<u16> for CloseCode {
    fn from(code: u16) -> Self {
        Self::from_u16(code)
    }
}

impl From<CloseCode> for u16 {
    fn from(code: CloseCode) -> Self {
        code.into_u16()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn surfaced_codes() {
        assert_eq!(u16::from(CloseCode::NoStatus), 1005);
        assert_eq!(u16::from(CloseCode::Abnormal), 1006);
        assert_eq!(u16::from(CloseCode::Protocol), 1002);
    }

    #[test]
    fn unknown_codes_pass_through() {
        for code in [1004, 2500, 3001, 4999, 5000, 42] {
            assert_eq!(CloseCode::from(code).into_u16(), code);
        }
    }

    #[test]
    fn allowed() {
        assert!(CloseCode::Normal.is_allowed());
        assert!(CloseCode::from(3000).is_allowed());
        assert!(CloseCode::from(4000).is_allowed());
        assert!(!CloseCode::NoStatus.is_allowed());
        assert!(!CloseCode::Abnormal.is_allowed());
        assert!(!CloseCode::from(1016).is_allowed());
        assert!(!CloseCode::from(999).is_allowed());
    }
}
