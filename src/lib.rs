//! HTTP/1.x message framing: request-line, status-line, and header-line
//! parsing and serialization over a pseudo-header representation
//! compatible with HTTP/2-style header blocks (`:method`, `:path`,
//! `:authority`, `:scheme`, `:status`).
//!
//! This crate is the protocol layer between a buffered byte transport and
//! routing/body/application logic — it does not accept sockets, negotiate
//! TLS, or frame message bodies. [`Connection`] holds per-transport
//! protocol state (role, version, the peer's observed version); [`Stream`]
//! drives one request/response exchange on a `Connection` and normalizes
//! it into a [`Headers`] multimap.
//!
//! ```
//! use h1wire::{Connection, ConnectionRole, Version};
//! use h1wire::io::BufferedReader;
//!
//! let mut conn = Connection::new(ConnectionRole::Server, Version::Http11);
//! let mut stream = conn.new_stream();
//! let mut source = BufferedReader::new(&b"GET /widgets HTTP/1.1\r\nhost: example.com\r\n\r\n"[..]);
//! let headers = stream.read_request_headers(&mut source).unwrap();
//! assert_eq!(headers.get_only(":path").unwrap().unwrap(), "/widgets");
//! ```

pub mod connection;
pub mod error;
pub mod headers;
pub mod io;
pub mod reason;
pub mod stream;

pub use connection::{Connection, ConnectionRole, Version, DEFAULT_MAX_HEADERS};
pub use error::{HttpError, MultipleValues, Result};
pub use headers::{Entry, Headers};
pub use reason::{canonical_reason, resolve_reason};
pub use stream::{Stream, StreamState};
