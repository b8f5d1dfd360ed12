//! The HTTP upgrade exchange that opens a connection.

use alloc::{
    string::{String, ToString},
    vec,
    vec::Vec,
};

use base64::{Engine as _, engine::general_purpose};
use httparse::{Header, Status};
use rand_core::RngCore;
use sha1::{Digest, Sha1};

use crate::{error::HandshakeError, options::ConnectOptions};

const GUID: &[u8] = b"258EAFA5-E914-47DA-95CA-C5AB0DC85B11";

/// Room for the status line and the terminating empty line.
const STATUS_LINE_BUDGET: usize = 256;

/// Room for a single response header.
const HEADER_BUDGET: usize = 256;

/// Computes `base64(SHA1(key + GUID))`.
pub fn generate_sec_accept(sec_key: &[u8]) -> String {
    let mut sha1 = Sha1::new();

    sha1.update(sec_key);
    sha1.update(GUID);

    general_purpose::STANDARD.encode(sha1.finalize())
}

fn generate_sec_key<R: RngCore>(rng: &mut R) -> String {
    let mut key = [0u8; 16];

    rng.fill_bytes(&mut key);

    general_purpose::STANDARD.encode(key)
}

/// A parsed handshake response with case-insensitive header lookup.
#[derive(Debug)]
pub struct Response<'h, 'buf> {
    code: Option<u16>,
    headers: &'h [Header<'buf>],
}

impl<'h, 'buf> Response<'h, 'buf> {
    /// The status code.
    pub const fn code(&self) -> Option<u16> {
        self.code
    }

    /// Finds a header by name, ignoring case.
    pub fn header(&self, name: &str) -> Option<&'h Header<'buf>> {
        self.headers
            .iter()
            .find(|h| h.name.eq_ignore_ascii_case(name))
    }

    /// The raw value of a header.
    pub fn header_value(&self, name: &str) -> Option<&'buf [u8]> {
        self.header(name).map(|h| h.value)
    }

    /// The value of a header, if it is UTF-8.
    pub fn header_value_str(&self, name: &str) -> Option<&'buf str> {
        self.header_value(name)
            .and_then(|v| core::str::from_utf8(v).ok())
    }
}

/// The outcome of a successful handshake.
#[derive(Debug, PartialEq, Eq)]
pub struct Accepted {
    /// The subprotocol selected by the server, if any.
    pub protocol: Option<String>,
    /// Length of the HTTP response. Anything after it is frame data.
    pub len: usize,
}

/// State kept while the connection is `CONNECTING`.
#[derive(Debug)]
pub struct HandshakeContext {
    request_key: String,
    expected_accept: String,
    protocols: Vec<String>,
    max_headers: usize,
}

impl HandshakeContext {
    /// Draws a fresh request key from `rng`.
    pub fn new<R: RngCore>(rng: &mut R, options: &ConnectOptions<'_>) -> Self {
        let request_key = generate_sec_key(rng);
        let expected_accept = generate_sec_accept(request_key.as_bytes());

        Self {
            request_key,
            expected_accept,
            protocols: options.protocols.iter().map(|p| p.to_string()).collect(),
            max_headers: options.max_headers,
        }
    }

    /// The base64 encoded `Sec-WebSocket-Key`.
    pub fn request_key(&self) -> &str {
        &self.request_key
    }

    /// The `Sec-WebSocket-Accept` value the server must answer with.
    pub fn expected_accept(&self) -> &str {
        &self.expected_accept
    }

    /// How many bytes the response head may take before it is given up on.
    pub fn max_response_len(&self) -> usize {
        STATUS_LINE_BUDGET + self.max_headers * HEADER_BUDGET
    }

    /// Builds the upgrade request.
    pub fn request(&self, options: &ConnectOptions<'_>) -> Vec<u8> {
        fn write_header(dst: &mut Vec<u8>, name: &str, value: &[u8]) {
            dst.extend_from_slice(name.as_bytes());
            dst.extend_from_slice(b": ");
            dst.extend_from_slice(value);
            dst.extend_from_slice(b"\r\n");
        }

        let mut dst = Vec::with_capacity(256);

        dst.extend_from_slice(b"GET ");
        dst.extend_from_slice(options.path.as_bytes());
        dst.extend_from_slice(b" HTTP/1.1\r\n");

        if let Some(host) = options.host {
            write_header(&mut dst, "Host", host.as_bytes());
        }

        write_header(&mut dst, "Upgrade", b"websocket");
        write_header(&mut dst, "Connection", b"Upgrade");
        write_header(&mut dst, "Sec-WebSocket-Version", b"13");
        write_header(&mut dst, "Sec-WebSocket-Key", self.request_key.as_bytes());

        if !options.protocols.is_empty() {
            write_header(
                &mut dst,
                "Sec-WebSocket-Protocol",
                options.protocols.join(", ").as_bytes(),
            );
        }

        if let Some(origin) = options.origin {
            write_header(&mut dst, "Origin", origin.as_bytes());
        }

        for header in options.headers {
            write_header(&mut dst, header.name, header.value);
        }

        dst.extend_from_slice(b"\r\n");

        dst
    }

    /// Parses and validates the upgrade response at the start of `src`.
    ///
    /// Returns `Ok(None)` until the full response head has arrived.
    pub fn accept(&self, src: &[u8]) -> Result<Option<Accepted>, HandshakeError> {
        let mut headers = vec![httparse::EMPTY_HEADER; self.max_headers];
        let mut response = httparse::Response::new(&mut headers);

        let len = match response.parse(src).map_err(HandshakeError::Http)? {
            Status::Complete(len) => len,
            Status::Partial => return Ok(None),
        };

        let response = Response {
            code: response.code,
            headers: response.headers,
        };

        let protocol = self.validate(&response)?;

        Ok(Some(Accepted { protocol, len }))
    }

    fn validate(&self, response: &Response<'_, '_>) -> Result<Option<String>, HandshakeError> {
        if response.code() != Some(101) {
            return Err(HandshakeError::HandshakeRejected {
                status: response.code(),
            });
        }

        if !response
            .header_value_str("upgrade")
            .is_some_and(|v| v.trim().eq_ignore_ascii_case("websocket"))
        {
            return Err(HandshakeError::MissingOrInvalidUpgrade);
        }

        if !response.header_value_str("connection").is_some_and(|v| {
            v.split(',')
                .any(|token| token.trim().eq_ignore_ascii_case("upgrade"))
        }) {
            return Err(HandshakeError::MissingOrInvalidConnection);
        }

        if response
            .header_value("sec-websocket-accept")
            .is_none_or(|v| v != self.expected_accept.as_bytes())
        {
            return Err(HandshakeError::HandshakeAcceptMismatch);
        }

        match response.header_value_str("sec-websocket-protocol") {
            None => Ok(None),
            Some(selected) => {
                let selected = selected.trim();

                if !self.protocols.iter().any(|p| p == selected) {
                    return Err(HandshakeError::InvalidSubprotocol);
                }

                Ok(Some(selected.to_string()))
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use alloc::format;

    use rand::{SeedableRng, rngs::StdRng};

    use super::*;

    fn context(options: &ConnectOptions<'_>) -> HandshakeContext {
        HandshakeContext::new(&mut StdRng::seed_from_u64(42), options)
    }

    #[test]
    fn response_limit_follows_max_headers() {
        let small = context(&ConnectOptions::default().with_max_headers(1));
        let large = context(&ConnectOptions::default().with_max_headers(64));

        assert_eq!(small.max_response_len(), 512);
        assert!(large.max_response_len() > small.max_response_len());
    }

    fn response(accept: &str, extra: &str) -> String {
        format!(
            "HTTP/1.1 101 Switching Protocols\r\n\
            Upgrade: websocket\r\n\
            Connection: Upgrade\r\n\
            Sec-WebSocket-Accept: {accept}\r\n\
            {extra}\
            \r\n"
        )
    }

    #[test]
    fn rfc_accept_example() {
        assert_eq!(
            generate_sec_accept(b"dGhlIHNhbXBsZSBub25jZQ=="),
            "s3pPLMBiTxaQ9kYGzzhZRbK+xOo="
        );
    }

    #[test]
    fn request_key_is_sixteen_random_bytes() {
        let ctx = context(&ConnectOptions::default());

        let decoded = general_purpose::STANDARD.decode(ctx.request_key()).unwrap();

        assert_eq!(decoded.len(), 16);
        assert_eq!(ctx.request_key().len(), 24);
        assert_eq!(
            ctx.expected_accept(),
            generate_sec_accept(ctx.request_key().as_bytes())
        );
    }

    #[test]
    fn fresh_keys() {
        let mut rng = StdRng::seed_from_u64(1);
        let options = ConnectOptions::default();

        let a = HandshakeContext::new(&mut rng, &options);
        let b = HandshakeContext::new(&mut rng, &options);

        assert_ne!(a.request_key(), b.request_key());
    }

    #[test]
    fn request_layout() {
        let headers = [Header {
            name: "User-Agent",
            value: b"websocketz",
        }];

        let options = ConnectOptions::default()
            .with_path("/chat")
            .unwrap()
            .with_host("example.com")
            .with_origin("http://example.com")
            .with_protocols(&["chat", "superchat"])
            .with_headers(&headers);

        let ctx = context(&options);

        let request = String::from_utf8(ctx.request(&options)).unwrap();

        let expected = format!(
            "GET /chat HTTP/1.1\r\n\
            Host: example.com\r\n\
            Upgrade: websocket\r\n\
            Connection: Upgrade\r\n\
            Sec-WebSocket-Version: 13\r\n\
            Sec-WebSocket-Key: {}\r\n\
            Sec-WebSocket-Protocol: chat, superchat\r\n\
            Origin: http://example.com\r\n\
            User-Agent: websocketz\r\n\
            \r\n",
            ctx.request_key()
        );

        assert_eq!(request, expected);
    }

    #[test]
    fn accept_ok() {
        let ctx = context(&ConnectOptions::default());

        let raw = response(ctx.expected_accept(), "");

        let accepted = ctx.accept(raw.as_bytes()).unwrap().unwrap();

        assert_eq!(accepted.len, raw.len());
        assert_eq!(accepted.protocol, None);
    }

    #[test]
    fn header_names_are_case_insensitive() {
        let ctx = context(&ConnectOptions::default());

        let raw = format!(
            "HTTP/1.1 101 Switching Protocols\r\n\
            upgrade: WebSocket\r\n\
            CONNECTION: keep-alive, upgrade\r\n\
            sec-websocket-accept: {}\r\n\
            \r\n",
            ctx.expected_accept()
        );

        assert!(ctx.accept(raw.as_bytes()).unwrap().is_some());
    }

    #[test]
    fn partial_response() {
        let ctx = context(&ConnectOptions::default());

        let raw = response(ctx.expected_accept(), "");

        assert!(ctx.accept(&raw.as_bytes()[..20]).unwrap().is_none());
    }

    #[test]
    fn trailing_frame_bytes_are_not_consumed() {
        let ctx = context(&ConnectOptions::default());

        let mut raw = response(ctx.expected_accept(), "").into_bytes();
        let len = raw.len();
        raw.extend_from_slice(&[0x81, 0x02, b'h', b'i']);

        let accepted = ctx.accept(&raw).unwrap().unwrap();

        assert_eq!(accepted.len, len);
    }

    #[test]
    fn rejected_status() {
        let ctx = context(&ConnectOptions::default());

        let raw = "HTTP/1.1 403 Forbidden\r\nContent-Length: 0\r\n\r\n";

        assert!(matches!(
            ctx.accept(raw.as_bytes()),
            Err(HandshakeError::HandshakeRejected { status: Some(403) })
        ));
    }

    #[test]
    fn accept_mismatch() {
        let ctx = context(&ConnectOptions::default());

        let raw = response("dGhlIHNhbXBsZSBub25jZQ==", "");

        assert!(matches!(
            ctx.accept(raw.as_bytes()),
            Err(HandshakeError::HandshakeAcceptMismatch)
        ));
    }

    #[test]
    fn missing_accept() {
        let ctx = context(&ConnectOptions::default());

        let raw = "HTTP/1.1 101 Switching Protocols\r\n\
            Upgrade: websocket\r\n\
            Connection: Upgrade\r\n\
            \r\n";

        assert!(matches!(
            ctx.accept(raw.as_bytes()),
            Err(HandshakeError::HandshakeAcceptMismatch)
        ));
    }

    #[test]
    fn invalid_upgrade_header() {
        let ctx = context(&ConnectOptions::default());

        let raw = format!(
            "HTTP/1.1 101 Switching Protocols\r\n\
            Upgrade: not-websocket\r\n\
            Connection: Upgrade\r\n\
            Sec-WebSocket-Accept: {}\r\n\
            \r\n",
            ctx.expected_accept()
        );

        assert!(matches!(
            ctx.accept(raw.as_bytes()),
            Err(HandshakeError::MissingOrInvalidUpgrade)
        ));
    }

    #[test]
    fn invalid_connection_header() {
        let ctx = context(&ConnectOptions::default());

        let raw = format!(
            "HTTP/1.1 101 Switching Protocols\r\n\
            Upgrade: websocket\r\n\
            Connection: close\r\n\
            Sec-WebSocket-Accept: {}\r\n\
            \r\n",
            ctx.expected_accept()
        );

        assert!(matches!(
            ctx.accept(raw.as_bytes()),
            Err(HandshakeError::MissingOrInvalidConnection)
        ));
    }

    #[test]
    fn selected_subprotocol() {
        let options = ConnectOptions::default().with_protocols(&["chat", "superchat"]);
        let ctx = context(&options);

        let raw = response(ctx.expected_accept(), "Sec-WebSocket-Protocol: superchat\r\n");

        let accepted = ctx.accept(raw.as_bytes()).unwrap().unwrap();

        assert_eq!(accepted.protocol.as_deref(), Some("superchat"));
    }

    #[test]
    fn unrequested_subprotocol() {
        let options = ConnectOptions::default().with_protocols(&["chat"]);
        let ctx = context(&options);

        let raw = response(ctx.expected_accept(), "Sec-WebSocket-Protocol: mqtt\r\n");

        assert!(matches!(
            ctx.accept(raw.as_bytes()),
            Err(HandshakeError::InvalidSubprotocol)
        ));
    }

    #[test]
    fn malformed_response() {
        let ctx = context(&ConnectOptions::default());

        assert!(matches!(
            ctx.accept(b"NOT HTTP\r\n\r\n"),
            Err(HandshakeError::Http(_))
        ));
    }
}
