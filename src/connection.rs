//! HTTP/1 connection state and the primitive line-oriented parsers and
//! serializers: request-line, status-line, header-line, and the blank line
//! that terminates a header block.
//!
//! Parsing works against byte offsets into a [`crate::io::ByteSource`]
//! rather than line-at-a-time, because the header parser needs to look
//! ahead across obs-fold continuations (RFC 7230 §3.2.4) before it can
//! decide where a logical header line ends.

use bytes::Bytes;

use crate::error::{HttpError, Result};
use crate::headers::Headers;
use crate::io::{ByteSink, ByteSource};

/// Which side of the exchange this connection represents.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ConnectionRole {
    Client,
    Server,
}

/// The two wire versions this crate understands. HTTP/0.9 and HTTP/2+ are
/// out of scope; a request-line naming any other version is `InvalidRequest`.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Version {
    Http10,
    Http11,
}

impl Version {
    fn request_line_suffix(self) -> &'static [u8] {
        match self {
            Version::Http10 => b" HTTP/1.0\r\n",
            Version::Http11 => b" HTTP/1.1\r\n",
        }
    }

    fn status_line_prefix(self) -> &'static [u8] {
        match self {
            Version::Http10 => b"HTTP/1.0 ",
            Version::Http11 => b"HTTP/1.1 ",
        }
    }
}

/// The default cap on headers per message. Exceeding it is `TooManyHeaders`,
/// not silent truncation.
pub const DEFAULT_MAX_HEADERS: usize = 100;

/// Per-TCP-connection HTTP/1 state: which role this side plays, which
/// version it declares, the peer's version once observed, and policy
/// limits. Stateless across exchanges other than `peer_version`.
pub struct Connection {
    role: ConnectionRole,
    version: Version,
    peer_version: Option<Version>,
    max_headers: usize,
}

impl Connection {
    pub fn new(role: ConnectionRole, version: Version) -> Connection {
        Connection {
            role,
            version,
            peer_version: None,
            max_headers: DEFAULT_MAX_HEADERS,
        }
    }

    /// Overrides the default `max_headers` cap.
    pub fn with_max_headers(mut self, max_headers: usize) -> Connection {
        self.max_headers = max_headers;
        self
    }

    pub fn role(&self) -> ConnectionRole {
        self.role
    }

    pub fn version(&self) -> Version {
        self.version
    }

    /// The peer's declared version, once a request-line or status-line has
    /// been read. `None` before the first read.
    pub fn peer_version(&self) -> Option<Version> {
        self.peer_version
    }

    pub fn max_headers(&self) -> usize {
        self.max_headers
    }

    /// Reads a single CRLF-terminated request line starting at `offset`,
    /// appending `:method` and `:path` or `:authority` to `headers` and
    /// recording the peer's version. Server-only.
    ///
    /// Tolerates exactly one leading blank CRLF ahead of the request-line,
    /// per RFC 7230 §3.5.
    pub fn read_request_line<S: ByteSource>(
        &mut self,
        headers: &mut Headers,
        source: &mut S,
        offset: usize,
    ) -> Result<usize> {
        debug_assert_eq!(self.role, ConnectionRole::Server);

        let mut offset = offset;
        let mut tolerated_blank = false;
        let (line_start, lf_idx) = loop {
            let lf_idx = source.fill_until(offset, b'\n')?;
            let line_len = lf_idx - offset;
            if !tolerated_blank && line_len == 1 && source.peek(offset) == b'\r' {
                tolerated_blank = true;
                offset = lf_idx + 1;
                continue;
            }
            break (offset, lf_idx);
        };
        let line_len = lf_idx - line_start;

        // "M / HTTP/1.X\r" is the shortest legal request line.
        if line_len < 13 {
            log::debug!("request line too short ({line_len} bytes)");
            return Err(HttpError::InvalidRequest);
        }
        if source.peek(lf_idx - 1) != b'\r' {
            log::debug!("request line missing CR before LF");
            return Err(HttpError::InvalidRequest);
        }
        let version_suffix_start = line_start + line_len - 10;
        if &source.slice(version_suffix_start, 8)[..] != b" HTTP/1." {
            log::debug!("request line missing ' HTTP/1.' suffix");
            return Err(HttpError::InvalidRequest);
        }

        let mut method_len = 0;
        while line_start + method_len < lf_idx && source.peek(line_start + method_len) != b' ' {
            if !is_token_char(source.peek(line_start + method_len)) {
                return Err(HttpError::InvalidRequest);
            }
            method_len += 1;
        }
        if method_len == 0 || line_start + method_len >= lf_idx {
            return Err(HttpError::InvalidRequest);
        }
        let method = source.slice(line_start, method_len);

        let target_start = line_start + method_len + 1;
        let target_end = version_suffix_start;
        if target_end <= target_start {
            return Err(HttpError::InvalidRequest);
        }
        let target = source.slice(target_start, target_end - target_start);
        if target.iter().any(|&b| b == b' ') {
            return Err(HttpError::InvalidRequest);
        }

        let peer_version = match source.peek(lf_idx - 2) {
            b'0' => Version::Http10,
            b'1' => Version::Http11,
            _ => return Err(HttpError::InvalidRequest),
        };
        if self.version == Version::Http10 && peer_version == Version::Http11 {
            log::debug!("peer declared HTTP/1.1 on a connection pinned to HTTP/1.0");
            return Err(HttpError::VersionMismatch);
        }
        self.peer_version = Some(peer_version);

        headers.append_owned(":method".to_string(), method.clone());
        if method.as_ref() == b"CONNECT" {
            headers.append_owned(":authority".to_string(), target);
        } else {
            headers.append_owned(":path".to_string(), target);
        }

        Ok(lf_idx + 1)
    }

    /// Reads one field-line, folding any obs-fold continuations into a
    /// single value. Returns `None` on the terminating blank line.
    pub fn read_header_line<S: ByteSource>(
        &self,
        headers: &mut Headers,
        source: &mut S,
        offset: usize,
    ) -> Result<Option<usize>> {
        let lf_idx = source.fill_until(offset, b'\n')?;
        let line_len = lf_idx - offset;

        if line_len == 1 && source.peek(offset) == b'\r' {
            return Ok(None);
        }
        // Shortest valid field-line is "f:\r".
        if line_len < 3 {
            return Err(HttpError::InvalidRequest);
        }
        if source.peek(lf_idx - 1) != b'\r' {
            return Err(HttpError::InvalidRequest);
        }

        let first = source.peek(offset);
        if first == b':' || is_ows(first) {
            return Err(HttpError::InvalidRequest);
        }
        let mut name_len = 0;
        while offset + name_len < lf_idx && source.peek(offset + name_len) != b':' {
            if !is_token_char(source.peek(offset + name_len)) {
                return Err(HttpError::InvalidRequest);
            }
            name_len += 1;
        }
        if offset + name_len >= lf_idx {
            // No colon before CR: malformed field-line.
            return Err(HttpError::InvalidRequest);
        }
        let mut name = source.slice(offset, name_len).to_vec();
        name.make_ascii_lowercase();
        let name = if name == b"host" {
            ":authority".to_string()
        } else {
            String::from_utf8(name).map_err(|_| HttpError::InvalidRequest)?
        };

        let colon = offset + name_len;
        let mut value = trimmed_value(source, colon + 1, lf_idx - 1);
        let mut next_offset = lf_idx + 1;

        loop {
            // Looking one byte past the line we just read tells us whether
            // the following line is an obs-fold continuation (RFC 7230
            // §3.2.4) without committing to having consumed it.
            source.fill(next_offset + 1)?;
            if !is_ows(source.peek(next_offset)) {
                break;
            }
            let cont_lf = source.fill_until(next_offset, b'\n')?;
            if cont_lf == next_offset || source.peek(cont_lf - 1) != b'\r' {
                return Err(HttpError::InvalidRequest);
            }
            let folded = trimmed_value(source, next_offset, cont_lf - 1);
            value.extend_from_slice(b" ");
            value.extend_from_slice(&folded);
            next_offset = cont_lf + 1;
        }

        headers.append_owned(name, Bytes::from(value));
        Ok(Some(next_offset))
    }

    /// Reads header lines until the terminating blank line, enforcing
    /// `max_headers`. Returns the offset past the terminating CRLF.
    pub fn read_header_block<S: ByteSource>(
        &self,
        headers: &mut Headers,
        source: &mut S,
        offset: usize,
    ) -> Result<usize> {
        let mut offset = offset;
        loop {
            match self.read_header_line(headers, source, offset) {
                Ok(Some(next)) => {
                    if headers.count() > self.max_headers {
                        log::debug!("header count exceeded max_headers ({})", self.max_headers);
                        return Err(HttpError::TooManyHeaders);
                    }
                    offset = next;
                }
                Ok(None) => return Ok(offset + 2),
                Err(HttpError::EndOfStream) => {
                    log::debug!("connection closed mid-header-block, treating as invalid request");
                    return Err(HttpError::InvalidRequest);
                }
                Err(e) => return Err(e),
            }
        }
    }

    /// Emits `METHOD SP TARGET SP HTTP/<ver> CRLF`. Client-only.
    pub fn write_request_line<K: ByteSink>(
        &self,
        method: &[u8],
        target: &[u8],
        sink: &mut K,
    ) -> Result<()> {
        debug_assert_eq!(self.role, ConnectionRole::Client);
        debug_assert!(
            !method.iter().any(|&b| b == b' ' || b == b'\r' || b == b'\n'),
            "method must not contain SP, CR, or LF"
        );
        debug_assert!(
            !target.iter().any(|&b| b == b' ' || b == b'\r' || b == b'\n'),
            "target must not contain SP, CR, or LF"
        );
        sink.write_bytes(method)?;
        sink.write_bytes(b" ")?;
        sink.write_bytes(target)?;
        sink.write_bytes(self.version.request_line_suffix())
    }

    /// Emits `HTTP/<ver> SP SSS SP reason CRLF`. Server-only.
    pub fn write_status_line<K: ByteSink>(
        &self,
        status_code: &[u8; 3],
        reason: &[u8],
        sink: &mut K,
    ) -> Result<()> {
        debug_assert_eq!(self.role, ConnectionRole::Server);
        debug_assert!(
            status_code.iter().all(u8::is_ascii_digit),
            "status code must be three ASCII digits"
        );
        debug_assert!(
            !reason.iter().any(|&b| b == b'\r' || b == b'\n'),
            "reason phrase must not contain CR or LF"
        );
        sink.write_bytes(self.version.status_line_prefix())?;
        sink.write_bytes(status_code)?;
        sink.write_bytes(b" ")?;
        sink.write_bytes(reason)?;
        sink.write_bytes(b"\r\n")
    }

    /// Emits `name: value CRLF`.
    pub fn write_header_line<K: ByteSink>(
        &self,
        name: &str,
        value: &[u8],
        sink: &mut K,
    ) -> Result<()> {
        debug_assert!(
            !name.bytes().any(|b| b == b':' || b == b'\r' || b == b'\n'),
            "header name must not contain ':', CR, or LF"
        );
        debug_assert!(is_valid_obs_fold(value), "LF in header value must be followed by SP or HTAB");
        sink.write_bytes(name.as_bytes())?;
        sink.write_bytes(b": ")?;
        sink.write_bytes(value)?;
        sink.write_bytes(b"\r\n")
    }

    /// Emits the bare CRLF that terminates a header block.
    pub fn write_headers_done<K: ByteSink>(&self, sink: &mut K) -> Result<()> {
        sink.write_bytes(b"\r\n")
    }
}

fn trimmed_value<S: ByteSource>(source: &S, mut start: usize, mut end: usize) -> Vec<u8> {
    while start < end && is_ows(source.peek(start)) {
        start += 1;
    }
    while end > start && is_ows(source.peek(end - 1)) {
        end -= 1;
    }
    source.slice(start, end - start).to_vec()
}

fn is_ows(b: u8) -> bool {
    b == b' ' || b == b'\t'
}

/// RFC 7230 `tchar`: `!#$%&'*+-.^_`|~` plus digits and letters.
fn is_token_char(b: u8) -> bool {
    b.is_ascii_alphanumeric()
        || matches!(
            b,
            b'!' | b'#'
                | b'$'
                | b'%'
                | b'&'
                | b'\''
                | b'*'
                | b'+'
                | b'-'
                | b'.'
                | b'^'
                | b'_'
                | b'`'
                | b'|'
                | b'~'
        )
}

fn is_valid_obs_fold(value: &[u8]) -> bool {
    for (i, &b) in value.iter().enumerate() {
        if b == b'\n' {
            match value.get(i + 1) {
                Some(&next) if is_ows(next) => (),
                _ => return false,
            }
        }
    }
    true
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::io::BufferedReader;

    fn server_conn(version: Version) -> Connection {
        Connection::new(ConnectionRole::Server, version)
    }

    #[test]
    fn test_read_request_line_http10_with_header() {
        let mut c = server_conn(Version::Http10);
        let mut src = BufferedReader::new(&b"GET / HTTP/1.0\r\nfoo: bar\r\n\r\n"[..]);
        let mut headers = Headers::new();
        let offset = c.read_request_line(&mut headers, &mut src, 0).unwrap();
        let offset = c.read_header_block(&mut headers, &mut src, offset).unwrap();
        src.discard(offset);

        assert_eq!(headers.get_only(":method").unwrap().unwrap(), "GET");
        assert_eq!(headers.get_only(":path").unwrap().unwrap(), "/");
        assert_eq!(headers.get_only("foo").unwrap().unwrap(), "bar");
        assert_eq!(c.peer_version(), Some(Version::Http10));
    }

    #[test]
    fn test_read_request_line_no_headers() {
        let mut c = server_conn(Version::Http10);
        let mut src = BufferedReader::new(&b"GET / HTTP/1.0\r\n"[..]);
        let mut headers = Headers::new();
        c.read_request_line(&mut headers, &mut src, 0).unwrap();
        assert_eq!(headers.get_only(":method").unwrap().unwrap(), "GET");
        assert_eq!(headers.get_only(":path").unwrap().unwrap(), "/");
    }

    #[test]
    fn test_tolerates_one_leading_blank_line() {
        let mut c = server_conn(Version::Http11);
        let mut src = BufferedReader::new(&b"\r\nGET / HTTP/1.1\r\n\r\n"[..]);
        let mut headers = Headers::new();
        c.read_request_line(&mut headers, &mut src, 0).unwrap();
        assert_eq!(headers.get_only(":path").unwrap().unwrap(), "/");
    }

    #[test]
    fn test_connect_uses_authority_and_host_becomes_second_authority() {
        let mut c = server_conn(Version::Http11);
        let mut src = BufferedReader::new(
            &b"CONNECT example.com:443 HTTP/1.1\r\nhost: example.com:443\r\n\r\n"[..],
        );
        let mut headers = Headers::new();
        let offset = c.read_request_line(&mut headers, &mut src, 0).unwrap();
        c.read_header_block(&mut headers, &mut src, offset).unwrap();

        assert_eq!(headers.get_only(":method").unwrap().unwrap(), "CONNECT");
        assert_eq!(headers.count_of(":authority"), 2);
        assert!(headers.get_only(":authority").is_err());
    }

    #[test]
    fn test_obs_fold_joins_with_single_space() {
        let mut c = server_conn(Version::Http11);
        let mut src =
            BufferedReader::new(&b"GET / HTTP/1.1\r\nfoo: bar\r\n qux\r\n\r\n"[..]);
        let mut headers = Headers::new();
        let offset = c.read_request_line(&mut headers, &mut src, 0).unwrap();
        c.read_header_block(&mut headers, &mut src, offset).unwrap();
        assert_eq!(headers.get_only("foo").unwrap().unwrap(), "bar qux");
    }

    #[test]
    fn test_space_before_colon_is_invalid() {
        let c = server_conn(Version::Http11);
        let mut src = BufferedReader::new(&b"foo : bar\r\n\r\n"[..]);
        let mut headers = Headers::new();
        let err = c.read_header_block(&mut headers, &mut src, 0).unwrap_err();
        assert!(matches!(err, HttpError::InvalidRequest));
    }

    #[test]
    fn test_truncated_request_line_is_end_of_stream() {
        let mut c = server_conn(Version::Http11);
        let mut src = BufferedReader::new(&b"GET"[..]);
        let mut headers = Headers::new();
        let err = c.read_request_line(&mut headers, &mut src, 0).unwrap_err();
        assert!(matches!(err, HttpError::EndOfStream));
    }

    #[test]
    fn test_unknown_version_is_invalid() {
        let mut c = server_conn(Version::Http11);
        let mut src = BufferedReader::new(&b"GET / HTTP/2.0\r\n\r\n"[..]);
        let mut headers = Headers::new();
        let err = c.read_request_line(&mut headers, &mut src, 0).unwrap_err();
        assert!(matches!(err, HttpError::InvalidRequest));
    }

    #[test]
    fn test_version_mismatch() {
        let mut c = server_conn(Version::Http10);
        let mut src = BufferedReader::new(&b"GET / HTTP/1.1\r\n\r\n"[..]);
        let mut headers = Headers::new();
        let err = c.read_request_line(&mut headers, &mut src, 0).unwrap_err();
        assert!(matches!(err, HttpError::VersionMismatch));
    }

    #[test]
    fn test_too_many_headers() {
        let c = Connection::new(ConnectionRole::Server, Version::Http11).with_max_headers(1);
        let mut src = BufferedReader::new(&b"a: 1\r\nb: 2\r\n\r\n"[..]);
        let mut headers = Headers::new();
        let err = c.read_header_block(&mut headers, &mut src, 0).unwrap_err();
        assert!(matches!(err, HttpError::TooManyHeaders));
    }

    #[test]
    fn test_write_request_line() {
        let c = Connection::new(ConnectionRole::Client, Version::Http11);
        let mut out = Vec::new();
        {
            let mut sink = crate::io::BufferedWriter::new(&mut out);
            c.write_request_line(b"GET", b"/", &mut sink).unwrap();
            sink.flush().unwrap();
        }
        assert_eq!(&out[..], b"GET / HTTP/1.1\r\n");
    }

    #[test]
    fn test_write_status_line() {
        let c = Connection::new(ConnectionRole::Server, Version::Http11);
        let mut out = Vec::new();
        {
            let mut sink = crate::io::BufferedWriter::new(&mut out);
            c.write_status_line(b"200", b"OK", &mut sink).unwrap();
            sink.flush().unwrap();
        }
        assert_eq!(&out[..], b"HTTP/1.1 200 OK\r\n");
    }

    #[test]
    fn test_write_header_line_rejects_bad_obs_fold() {
        assert!(!is_valid_obs_fold(b"bar\nbaz"));
        assert!(is_valid_obs_fold(b"bar\n baz"));
    }
}
