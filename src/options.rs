//! Connection and send options.

pub use httparse::Header;

use crate::error::UsageError;

/// Options for the opening handshake.
#[derive(Debug, Clone, Copy)]
pub struct ConnectOptions<'a> {
    /// Request target. Must start with `/`.
    pub path: &'a str,
    /// Value of the `Host` header.
    pub host: Option<&'a str>,
    /// Value of the `Origin` header.
    pub origin: Option<&'a str>,
    /// Subprotocols offered in `Sec-WebSocket-Protocol`, in order of preference.
    pub protocols: &'a [&'a str],
    /// Additional request headers.
    pub headers: &'a [Header<'a>],
    /// How many response headers to make room for.
    pub max_headers: usize,
}

impl Default for ConnectOptions<'_> {
    fn default() -> Self {
        Self::default()
    }
}

impl<'a> ConnectOptions<'a> {
    /// Creates options for `path`.
    pub fn new(path: &'a str) -> Result<Self, UsageError> {
        Self::default().with_path(path)
    }

    /// The request target.
    pub const fn path(&self) -> &str {
        self.path
    }

    /// Sets the request target.
    pub fn with_path(mut self, path: &'a str) -> Result<Self, UsageError> {
        if !path.starts_with('/') {
            return Err(UsageError::InvalidPath);
        }

        self.path = path;

        Ok(self)
    }

    /// Sets the `Host` header.
    pub const fn with_host(mut self, host: &'a str) -> Self {
        self.host = Some(host);
        self
    }

    /// Sets the `Origin` header.
    pub const fn with_origin(mut self, origin: &'a str) -> Self {
        self.origin = Some(origin);
        self
    }

    /// Sets the offered subprotocols, most preferred first.
    pub const fn with_protocols(mut self, protocols: &'a [&'a str]) -> Self {
        self.protocols = protocols;
        self
    }

    /// The additional request headers.
    pub const fn headers(&self) -> &[Header<'a>] {
        self.headers
    }

    /// Sets additional request headers, written after the standard ones.
    pub const fn with_headers(mut self, headers: &'a [Header<'a>]) -> Self {
        self.headers = headers;
        self
    }

    /// Sets how many response headers to make room for. Also bounds the size of the response.
    pub const fn with_max_headers(mut self, max_headers: usize) -> Self {
        self.max_headers = max_headers;
        self
    }

    const fn default() -> Self {
        Self {
            path: "/",
            host: None,
            origin: None,
            protocols: &[],
            headers: &[],
            max_headers: 32,
        }
    }
}

/// How a payload passed to [`Connection::send`](crate::Connection::send) is framed.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct SendOptions {
    /// Open a binary message instead of a text message.
    ///
    /// Only consulted for the first fragment of a message.
    pub binary: bool,
    /// Request per-message compression. Unsupported, so always sent uncompressed.
    pub compress: bool,
    /// This is the last fragment of the message.
    pub fin: bool,
}

impl Default for SendOptions {
    fn default() -> Self {
        Self::text()
    }
}

impl SendOptions {
    /// A complete text message.
    pub const fn text() -> Self {
        Self {
            binary: false,
            compress: false,
            fin: true,
        }
    }

    /// A complete binary message.
    pub const fn binary() -> Self {
        Self {
            binary: true,
            compress: false,
            fin: true,
        }
    }

    /// Sets whether this frame ends the message.
    pub const fn with_fin(mut self, fin: bool) -> Self {
        self.fin = fin;
        self
    }

    /// Sets the compression request. It is ignored.
    pub const fn with_compress(mut self, compress: bool) -> Self {
        self.compress = compress;
        self
    }
}
