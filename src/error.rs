//! HTTP/1 framing errors.

use std::io;
use std::result;

/// Errors that may kill off an HTTP/1 exchange or connection.
///
/// Every parser and serializer entry point in this crate returns this type.
/// All variants are fatal to the exchange that produced them: per the
/// request-smuggling mitigations described alongside the parser, a caller
/// that observes any of these should close the connection rather than retry.
#[derive(Debug, thiserror::Error)]
pub enum HttpError {
    /// A malformed byte sequence: missing CR, a non-token byte in a header
    /// name, whitespace before `:`, a bad version digit, an empty method or
    /// target, a missing final CRLF, or obs-fold truncated by end of stream.
    #[error("invalid HTTP/1 request")]
    InvalidRequest,

    /// The peer declared HTTP/1.1 on a connection pinned to HTTP/1.0.
    #[error("peer HTTP version does not match connection version")]
    VersionMismatch,

    /// The header block exceeded `Connection::max_headers`.
    #[error("too many headers")]
    TooManyHeaders,

    /// The underlying byte source closed before a complete message arrived.
    ///
    /// Distinct from `InvalidRequest` at the request-line boundary so a
    /// caller can tell "no request arrived" (normal keep-alive close) from
    /// "malformed request" (protocol violation). Inside a header block this
    /// is promoted to `InvalidRequest` by `read_header_block`.
    #[error("connection closed before a complete message arrived")]
    EndOfStream,

    /// Passthrough from the underlying byte source or sink.
    #[error("I/O error: {0}")]
    Io(#[from] io::Error),

    /// Passthrough from the allocator. Unreachable from this crate's own
    /// code under Rust's global allocator (which aborts on allocation
    /// failure rather than returning an error); retained so that a caller
    /// plugging in a fallible custom allocator has somewhere to surface it.
    #[error("out of memory")]
    OutOfMemory,
}

/// Alias for a `Result` in `HttpError`.
pub type Result<R> = result::Result<R, HttpError>;

/// Error returned by [`crate::headers::Headers::get_only`] when more than
/// one entry exists for the requested name.
///
/// Kept separate from [`HttpError`]: this is not a wire-protocol failure, it
/// is a precondition violation by the caller of a convenience accessor.
#[derive(Debug, thiserror::Error)]
#[error("multiple values present for header")]
pub struct MultipleValues;
