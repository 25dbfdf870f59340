//! Buffered byte source/sink capability traits, and a concrete
//! implementation over any `std::io::Read`/`Write`.
//!
//! A line-at-a-time reader (read a CRLF-terminated line, consume it,
//! repeat) isn't enough for header-block parsing: it has to tolerate a
//! leading blank line by re-scanning, and it has to fold continuation
//! lines onto a value before deciding whether the line it just read was
//! complete. Both require looking ahead without committing to having
//! consumed those bytes.
//!
//! `ByteSource` is an index-offset API that can look ahead, roll back (by
//! simply using a smaller offset on the next call), and only commit via an
//! explicit `discard`. Parsers become generic over `ByteSource` and
//! `ByteSink` rather than baking in a concrete stream type.

use std::io::{Read, Write};

use bytes::{Bytes, BytesMut};

use crate::error::{HttpError, Result};

/// A buffered, look-ahead-capable source of bytes.
///
/// All offsets are relative to the source's current logical start (i.e.
/// everything before the last `discard` is gone). Implementations must
/// support non-destructive re-scanning: calling `fill`/`fill_until`/`peek`
/// with the same or smaller offset repeatedly, without an intervening
/// `discard`, must be idempotent.
pub trait ByteSource {
    /// Ensures at least `n` bytes are buffered, pulling more from the
    /// underlying transport as needed. Fails with `EndOfStream` if the
    /// transport closes first.
    fn fill(&mut self, n: usize) -> Result<()>;

    /// Extends the buffer until byte `delim` is found at or after `offset`,
    /// returning its absolute index. Fails with `EndOfStream` if the
    /// transport closes before the delimiter appears.
    fn fill_until(&mut self, offset: usize, delim: u8) -> Result<usize>;

    /// Returns the byte at absolute index `i`. Panics if `i` has not been
    /// brought into the buffer by a prior `fill`/`fill_until` call — callers
    /// in this crate always satisfy that by construction.
    fn peek(&self, i: usize) -> u8;

    /// Returns an owned, cheaply-clonable slice `[offset, offset+len)` of
    /// the buffer. Panics under the same condition as `peek`.
    fn slice(&self, offset: usize, len: usize) -> Bytes;

    /// Advances the logical start of the buffer by `n` bytes, which must
    /// already be buffered. Called exactly once per successfully parsed
    /// request-line/header-block pair.
    fn discard(&mut self, n: usize);
}

/// A buffered sink for serialized HTTP/1 bytes.
pub trait ByteSink {
    /// Writes `data` in full.
    fn write_bytes(&mut self, data: &[u8]) -> Result<()>;

    /// Flushes any internal buffering to the underlying transport.
    fn flush(&mut self) -> Result<()>;
}

/// A [`ByteSource`] over any `Read`, backed by a refcounted [`Bytes`]
/// buffer so `slice()` hands out sub-slices by bumping a refcount instead
/// of copying.
///
/// Bytes already handed back via `discard` are periodically compacted out
/// of the front of the buffer so it doesn't grow without bound across a
/// long-lived keep-alive connection. Compaction is itself a `Bytes::slice`
/// — it drops the reference to the consumed prefix rather than shifting
/// the live bytes down, the way a `Vec::drain` would.
pub struct BufferedReader<R> {
    inner: R,
    buf: Bytes,
    start: usize,
}

impl<R: Read> BufferedReader<R> {
    pub fn new(inner: R) -> BufferedReader<R> {
        BufferedReader {
            inner,
            buf: Bytes::new(),
            start: 0,
        }
    }

    fn available(&self) -> usize {
        self.buf.len() - self.start
    }

    /// Reads up to a chunk from the transport and appends it to `buf`.
    ///
    /// `Bytes` is immutable, so growing it means building a new one; this
    /// pays the same amortized cost a growing `Vec` would pay on
    /// reallocation, and keeps `slice()` itself a true O(1) sub-slice.
    fn read_more(&mut self) -> Result<bool> {
        let mut chunk = [0u8; 1024];
        let n = self.inner.read(&mut chunk)?;
        if n == 0 {
            return Ok(false);
        }
        let mut grown = BytesMut::with_capacity(self.buf.len() + n);
        grown.extend_from_slice(&self.buf);
        grown.extend_from_slice(&chunk[..n]);
        self.buf = grown.freeze();
        Ok(true)
    }
}

impl<R: Read> ByteSource for BufferedReader<R> {
    fn fill(&mut self, n: usize) -> Result<()> {
        while self.available() < n {
            if !self.read_more()? {
                return Err(HttpError::EndOfStream);
            }
        }
        Ok(())
    }

    fn fill_until(&mut self, offset: usize, delim: u8) -> Result<usize> {
        let mut scan_from = offset;
        loop {
            if let Some(pos) = self.buf[self.start + scan_from..]
                .iter()
                .position(|&b| b == delim)
            {
                return Ok(scan_from + pos);
            }
            scan_from = self.available();
            if !self.read_more()? {
                return Err(HttpError::EndOfStream);
            }
        }
    }

    fn peek(&self, i: usize) -> u8 {
        self.buf[self.start + i]
    }

    fn slice(&self, offset: usize, len: usize) -> Bytes {
        self.buf.slice(self.start + offset..self.start + offset + len)
    }

    fn discard(&mut self, n: usize) {
        self.start += n;
        // Compact once the discarded prefix dwarfs what's left, so a
        // long-lived connection doesn't retain every byte it ever read.
        if self.start > 4096 && self.start * 2 > self.buf.len() {
            log::trace!(
                "compacting read buffer: dropping {} consumed bytes, {} live",
                self.start,
                self.buf.len() - self.start
            );
            self.buf = self.buf.slice(self.start..);
            self.start = 0;
        }
    }
}

/// A [`ByteSink`] over any `Write`, backed by a growable `Vec<u8>` that is
/// flushed to the underlying transport on `flush`.
///
/// Buffering the whole header block before writing matches the ordering
/// guarantee in the concurrency model: a response's header block is
/// serialized as a single contiguous write on the sink.
pub struct BufferedWriter<W> {
    inner: W,
    buf: Vec<u8>,
}

impl<W: Write> BufferedWriter<W> {
    pub fn new(inner: W) -> BufferedWriter<W> {
        BufferedWriter {
            inner,
            buf: Vec::with_capacity(1024),
        }
    }
}

impl<W: Write> ByteSink for BufferedWriter<W> {
    fn write_bytes(&mut self, data: &[u8]) -> Result<()> {
        self.buf.extend_from_slice(data);
        Ok(())
    }

    fn flush(&mut self) -> Result<()> {
        self.inner.write_all(&self.buf)?;
        self.buf.clear();
        self.inner.flush()?;
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_fill_until_across_reads() {
        let data: &[u8] = b"GET / HTTP/1.1\r\n";
        let mut r = BufferedReader::new(data);
        let idx = r.fill_until(0, b'\n').unwrap();
        assert_eq!(idx, data.len() - 1);
        assert_eq!(r.peek(idx - 1), b'\r');
    }

    #[test]
    fn test_fill_until_eof_errors() {
        let data: &[u8] = b"no newline here";
        let mut r = BufferedReader::new(data);
        assert!(matches!(
            r.fill_until(0, b'\n'),
            Err(HttpError::EndOfStream)
        ));
    }

    #[test]
    fn test_discard_advances_logical_start() {
        let data: &[u8] = b"abcdef";
        let mut r = BufferedReader::new(data);
        r.fill(6).unwrap();
        r.discard(3);
        assert_eq!(r.peek(0), b'd');
        assert_eq!(r.slice(0, 3).as_ref(), b"def");
    }

    #[test]
    fn test_rescan_without_discard_is_idempotent() {
        let data: &[u8] = b"\r\nGET / HTTP/1.1\r\n";
        let mut r = BufferedReader::new(data);
        let first = r.fill_until(0, b'\n').unwrap();
        // Re-scanning from offset 0 again (no discard happened) must find
        // the same delimiter.
        let second = r.fill_until(0, b'\n').unwrap();
        assert_eq!(first, second);
    }

    #[test]
    fn test_writer_buffers_until_flush() {
        let mut out = Vec::new();
        {
            let mut w = BufferedWriter::new(&mut out);
            w.write_bytes(b"HTTP/1.1 200 OK\r\n").unwrap();
            w.write_bytes(b"\r\n").unwrap();
            w.flush().unwrap();
        }
        assert_eq!(&out[..], b"HTTP/1.1 200 OK\r\n\r\n");
    }
}
