//! One logical request/response exchange bound to a [`Connection`].
//!
//! `Stream` reads the request line before any header, discards only after
//! the full block validates, and treats the header block as a single
//! contiguous unit on write. It is generic over a role so it can drive
//! either side of the exchange, and narrows its contract to header framing
//! alone — a body/trailers layer sits above it.

use crate::connection::{Connection, ConnectionRole, Version};
use crate::error::{HttpError, Result};
use crate::headers::Headers;
use crate::io::{ByteSink, ByteSource};
use crate::reason::resolve_reason;

/// Where a [`Stream`] is in its read/write lifecycle.
///
/// Naming these states explicitly gives a caller driving a body/trailers
/// layer above this crate somewhere to hang those transitions.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum StreamState {
    Idle,
    ReadingHeaders,
    AfterHeaders,
    WritingHeaders,
    AfterWriting,
    Trailers,
}

/// One request/response exchange on a [`Connection`].
///
/// Per the connection's keep-alive contract, at most one `Stream` is ever
/// in flight on a given `Connection` at a time; `Connection::new_stream`
/// enforces nothing here (it has no way to observe concurrent use), so that
/// invariant is the caller's to keep.
pub struct Stream<'c> {
    conn: &'c mut Connection,
    state: StreamState,
    is_trailers: bool,
}

impl<'c> Stream<'c> {
    pub(crate) fn new(conn: &'c mut Connection) -> Stream<'c> {
        Stream {
            conn,
            state: StreamState::Idle,
            is_trailers: false,
        }
    }

    pub fn state(&self) -> StreamState {
        self.state
    }

    /// True if the next header block read/written is a trailer block
    /// rather than the initial header block.
    pub fn is_trailers(&self) -> bool {
        self.is_trailers
    }

    /// Marks subsequent header block operations as operating on trailers
    /// rather than the initial header block.
    pub fn set_trailers(&mut self, is_trailers: bool) {
        self.is_trailers = is_trailers;
    }

    /// Reads the request line and header block off `source`, returning the
    /// populated [`Headers`]. Server-only.
    ///
    /// On success, the consumed prefix is discarded from `source`. On
    /// failure, nothing is discarded — per the no-partial-consumption
    /// invariant, the caller may not retry on the same connection.
    pub fn read_request_headers<S: ByteSource>(&mut self, source: &mut S) -> Result<Headers> {
        debug_assert_eq!(self.conn.role(), ConnectionRole::Server);
        self.state = StreamState::ReadingHeaders;

        let mut headers = Headers::new();
        let offset = self.conn.read_request_line(&mut headers, source, 0)?;
        let end = self.conn.read_header_block(&mut headers, source, offset)?;
        reject_ambiguous_authority(&headers)?;

        source.discard(end);
        self.state = StreamState::AfterHeaders;
        log::trace!("read {} header entries ({end} bytes consumed)", headers.count());
        Ok(headers)
    }

    /// Serializes `headers` as a request (client) or response (server)
    /// header block onto `sink`.
    pub fn write_header_block<K: ByteSink>(&mut self, headers: &Headers, sink: &mut K) -> Result<()> {
        self.state = StreamState::WritingHeaders;
        match self.conn.role() {
            ConnectionRole::Client => self.write_request_header_block(headers, sink)?,
            ConnectionRole::Server => self.write_response_header_block(headers, sink)?,
        }
        self.conn.write_headers_done(sink)?;
        self.state = StreamState::AfterWriting;
        Ok(())
    }

    fn write_request_header_block<K: ByteSink>(&self, headers: &Headers, sink: &mut K) -> Result<()> {
        let method = headers
            .get_only(":method")
            .map_err(|_| HttpError::InvalidRequest)?
            .ok_or(HttpError::InvalidRequest)?
            .clone();
        let authority = headers.get_only(":authority").map_err(|_| HttpError::InvalidRequest)?;

        let target: Vec<u8> = if method.as_ref() == b"CONNECT" {
            let authority = authority.ok_or(HttpError::InvalidRequest)?;
            if headers.contains(":path") {
                return Err(HttpError::InvalidRequest);
            }
            authority.to_vec()
        } else {
            let path = headers
                .get_only(":path")
                .map_err(|_| HttpError::InvalidRequest)?
                .ok_or(HttpError::InvalidRequest)?;
            if authority.is_none() && self.conn.version() != Version::Http10 {
                return Err(HttpError::InvalidRequest);
            }
            path.to_vec()
        };

        self.conn.write_request_line(&method, &target, sink)?;

        for entry in headers.iter() {
            if is_suppressed_pseudo_header(&entry.name) {
                continue;
            }
            self.conn.write_header_line(&entry.name, &entry.value, sink)?;
        }

        // RFC 7230 §5.4: an HTTP/1.1 client MUST send Host. We derive it
        // from `:authority` so callers never have to supply both.
        if let Some(authority) = authority {
            self.conn.write_header_line("host", authority, sink)?;
        }

        Ok(())
    }

    fn write_response_header_block<K: ByteSink>(&self, headers: &Headers, sink: &mut K) -> Result<()> {
        let status = headers
            .get_only(":status")
            .map_err(|_| HttpError::InvalidRequest)?
            .ok_or(HttpError::InvalidRequest)?;
        if status.len() != 3 || !status.iter().all(u8::is_ascii_digit) {
            return Err(HttpError::InvalidRequest);
        }
        let status_code: u16 = std::str::from_utf8(status)
            .ok()
            .and_then(|s| s.parse().ok())
            .ok_or(HttpError::InvalidRequest)?;

        if (100..200).contains(&status_code) && self.conn.peer_version() == Some(Version::Http10) {
            return Err(HttpError::InvalidRequest);
        }

        let status_bytes: [u8; 3] = [status[0], status[1], status[2]];
        let override_reason = headers.get_only(":reason").map_err(|_| HttpError::InvalidRequest)?;
        let reason = resolve_reason(status_code, override_reason.map(|b| b.as_ref())).to_string();

        self.conn.write_status_line(&status_bytes, reason.as_bytes(), sink)?;

        for entry in headers.iter() {
            if is_suppressed_pseudo_header(&entry.name) {
                continue;
            }
            self.conn.write_header_line(&entry.name, &entry.value, sink)?;
        }

        Ok(())
    }
}

impl Connection {
    /// Begins a new exchange on this connection.
    ///
    /// A `Stream`'s `Headers` own their storage directly and are freed when
    /// the `Stream` (and the `Headers` it returned) go out of scope — no
    /// separate per-exchange allocator is needed.
    pub fn new_stream(&mut self) -> Stream<'_> {
        Stream::new(self)
    }
}

fn is_suppressed_pseudo_header(name: &str) -> bool {
    matches!(
        name,
        ":method" | ":path" | ":scheme" | ":protocol" | ":authority" | ":status" | ":reason"
    )
}

/// Rejects a header block carrying more than one `:authority`/Host entry,
/// except the CONNECT case where the request-line authority and a Host
/// field line naming the same target both land as `:authority` (boundary
/// scenario: `CONNECT host:port` plus a matching `Host: host:port`).
fn reject_ambiguous_authority(headers: &Headers) -> Result<()> {
    let count = headers.count_of(":authority");
    if count <= 1 {
        return Ok(());
    }
    if count > 2 {
        return Err(HttpError::InvalidRequest);
    }
    let is_connect = headers
        .get_only(":method")
        .ok()
        .flatten()
        .map(|m| m.as_ref() == b"CONNECT")
        .unwrap_or(false);
    if !is_connect {
        return Err(HttpError::InvalidRequest);
    }
    let values: Vec<_> = headers.iter().filter(|e| e.name == ":authority").map(|e| &e.value).collect();
    if values.len() == 2 && values[0] == values[1] {
        Ok(())
    } else {
        Err(HttpError::InvalidRequest)
    }
}
