//! The `Headers` multimap: an ordered, case-insensitive collection of HTTP/1
//! field lines, normalized into the pseudo-header representation shared with
//! HTTP/2-style header blocks.

use std::fmt;

use bytes::Bytes;

use crate::error::MultipleValues;

/// One entry in a [`Headers`] multimap.
///
/// `name` is always lowercase. Pseudo-header names (`:method`, `:path`,
/// `:authority`, `:scheme`, `:status`, ...) are legal entries and sort into
/// iteration order like any other header.
#[derive(Debug, Clone, PartialEq)]
pub struct Entry {
    pub name: String,
    pub value: Bytes,
}

/// An ordered, case-insensitive multimap of header name to value.
///
/// Order of insertion is preserved, including across duplicate names — this
/// matters for headers like `Set-Cookie` where repetition is meaningful and
/// for obs-fold diagnostics during testing. Names are canonicalized to
/// lowercase on insert; all lookups are exact matches against the lowercase
/// form.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct Headers {
    entries: Vec<Entry>,
}

impl Headers {
    /// Creates an empty header block.
    pub fn new() -> Headers {
        Headers {
            entries: Vec::new(),
        }
    }

    /// Appends `name: value`, copying both into owned storage and
    /// lowercasing `name`.
    ///
    /// Use this when `value` is borrowed from somewhere other than the
    /// parser's working buffer (e.g. a literal supplied by the caller of
    /// `write_header_block`). When the bytes are already owned and came out
    /// of the parser's buffer, prefer [`Headers::append_owned`], which is a
    /// refcount bump rather than a copy.
    pub fn append(&mut self, name: &str, value: &[u8]) {
        self.entries.push(Entry {
            name: name.to_ascii_lowercase(),
            value: Bytes::copy_from_slice(value),
        });
    }

    /// Appends `name: value` where `name` is already lowercase and `value`
    /// is already owned (e.g. a [`Bytes`] slice carved out of the parser's
    /// read buffer). Cloning a `Bytes` is an O(1) refcount bump, not a copy.
    ///
    /// Callers must ensure `name` is already lowercase; this is an internal
    /// fast path used by the connection parser, which lowercases as it
    /// scans.
    pub fn append_owned(&mut self, name: String, value: Bytes) {
        debug_assert!(
            name.bytes().all(|b| !b.is_ascii_uppercase()),
            "append_owned requires a pre-lowercased name"
        );
        self.entries.push(Entry { name, value });
    }

    /// Returns the single value for `name`, or `None` if absent.
    ///
    /// Returns `Err(MultipleValues)` if more than one entry exists for
    /// `name` — callers that expect at most one occurrence (e.g.
    /// `:method`, `:authority`) should treat ambiguity as a protocol error
    /// rather than silently picking the first or last value.
    pub fn get_only(&self, name: &str) -> Result<Option<&Bytes>, MultipleValues> {
        let mut found = None;
        for entry in &self.entries {
            if entry.name.eq_ignore_ascii_case(name) {
                if found.is_some() {
                    return Err(MultipleValues);
                }
                found = Some(&entry.value);
            }
        }
        Ok(found)
    }

    /// True if at least one entry exists for `name`.
    pub fn contains(&self, name: &str) -> bool {
        self.entries.iter().any(|e| e.name.eq_ignore_ascii_case(name))
    }

    /// Number of entries in the multimap, counting duplicates.
    pub fn count(&self) -> usize {
        self.entries.len()
    }

    /// Number of entries with the given name.
    pub fn count_of(&self, name: &str) -> usize {
        self.entries
            .iter()
            .filter(|e| e.name.eq_ignore_ascii_case(name))
            .count()
    }

    /// Iterates entries in insertion order.
    pub fn iter(&self) -> impl Iterator<Item = &Entry> {
        self.entries.iter()
    }

    /// True if no entries have been appended.
    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }
}

/// Renders each entry as `name: value\n`, in insertion order. Intended for
/// test assertions and debug output, not wire serialization — use
/// [`crate::connection::Connection::write_header_line`] for that, which
/// enforces the write-side preconditions the wire format requires.
impl fmt::Display for Headers {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        for entry in &self.entries {
            writeln!(
                f,
                "{}: {}",
                entry.name,
                String::from_utf8_lossy(&entry.value)
            )?;
        }
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_append_lowercases_name() {
        let mut h = Headers::new();
        h.append("Foo-Bar", b"baz");
        assert!(h.contains("foo-bar"));
        assert!(h.contains("FOO-BAR"));
        assert_eq!(h.get_only("foo-bar").unwrap().unwrap(), "baz");
    }

    #[test]
    fn test_duplicate_names_preserve_order() {
        let mut h = Headers::new();
        h.append("set-cookie", b"a=1");
        h.append("set-cookie", b"b=2");
        assert_eq!(h.count(), 2);
        assert_eq!(h.count_of("set-cookie"), 2);
        let values: Vec<_> = h.iter().map(|e| e.value.clone()).collect();
        assert_eq!(values, vec![Bytes::from_static(b"a=1"), Bytes::from_static(b"b=2")]);
    }

    #[test]
    fn test_get_only_errors_on_duplicate() {
        let mut h = Headers::new();
        h.append("x", b"1");
        h.append("x", b"2");
        assert!(h.get_only("x").is_err());
    }

    #[test]
    fn test_get_only_absent_is_none() {
        let h = Headers::new();
        assert!(h.get_only("nope").unwrap().is_none());
    }

    #[test]
    fn test_pseudo_header_is_a_normal_entry() {
        let mut h = Headers::new();
        h.append(":method", b"GET");
        assert!(h.contains(":method"));
        assert_eq!(h.get_only(":method").unwrap().unwrap(), "GET");
    }

    #[test]
    fn test_display_format() {
        let mut h = Headers::new();
        h.append("foo", b"bar");
        assert_eq!(format!("{}", h), "foo: bar\n");
    }

    #[test]
    fn test_append_owned_is_refcount_bump() {
        let mut h = Headers::new();
        let shared = Bytes::from_static(b"shared");
        h.append_owned("x".to_string(), shared.clone());
        assert_eq!(h.get_only("x").unwrap().unwrap(), &shared);
    }
}
