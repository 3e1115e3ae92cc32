//! The fully parsed request handed from `connection` to the response
//! generator: method, URI, version, and header list, all as absolute
//! offset ranges into the connection's `RingBuffer` (spec.md §3).

use crate::parse::headers::HeaderRange;
use crate::ring_buffer::RingBuffer;

/// Recognized HTTP methods (spec.md §6). Anything else that is otherwise
/// lexically valid (all-uppercase/underscore token) parses as `Unknown`
/// rather than an error — rejecting it is the response generator's call,
/// not the parser's (spec.md §4.2).
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Method {
    Get,
    Head,
    Post,
    Unknown,
}

/// Ordered, append-only list of header `(key, value)` offset ranges.
/// Preserves wire order and duplicates as-is (spec.md §9's open question
/// on repeated headers: no dedup, no merge — that's left to the caller).
///
/// Shape mirrors the teacher's `Table<T>`, generalized from owned `Bstr`
/// keys to `(usize, usize)` ranges since this spec never copies header
/// bytes out of the ring buffer until the response layer needs them.
#[derive(Debug, Clone, Default)]
pub struct HeaderList {
    entries: Vec<HeaderRange>,
}

impl HeaderList {
    pub fn new() -> Self {
        HeaderList { entries: Vec::new() }
    }

    pub fn from_ranges(entries: Vec<HeaderRange>) -> Self {
        HeaderList { entries }
    }

    pub fn len(&self) -> usize {
        self.entries.len()
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }

    pub fn iter(&self) -> std::slice::Iter<'_, HeaderRange> {
        self.entries.iter()
    }

    /// First header matching `name`, case-insensitively, materialized
    /// against `rb`. Returns `None` if absent; does not merge duplicates.
    pub fn get_nocase(&self, rb: &RingBuffer, name: &[u8]) -> Option<Vec<u8>> {
        self.entries.iter().find_map(|h| {
            let key = rb.slice(h.key.0, h.key.1);
            if key.eq_ignore_ascii_case(name) {
                Some(rb.slice(h.value.0, h.value.1))
            } else {
                None
            }
        })
    }
}

/// A complete, ready-to-serve request (spec.md §3's `ParsedRequest`).
#[derive(Debug, Clone)]
pub struct ParsedRequest {
    pub method: Method,
    pub http_major: u16,
    pub http_minor: u16,
    pub uri_start: usize,
    pub uri_end: usize,
    pub headers: HeaderList,
}

impl ParsedRequest {
    pub fn uri(&self, rb: &RingBuffer) -> Vec<u8> {
        rb.slice(self.uri_start, self.uri_end)
    }

    /// Whether the connection should stay open after this response
    /// (spec.md §9: out of scope for parsing/pipelining purposes, but the
    /// response generator still needs to know). HTTP/1.1 defaults to
    /// keep-alive, HTTP/1.0 defaults to close, either overridden by an
    /// explicit `Connection` header.
    pub fn wants_keep_alive(&self, rb: &RingBuffer) -> bool {
        match self.headers.get_nocase(rb, b"Connection") {
            Some(v) => !v.eq_ignore_ascii_case(b"close"),
            None => self.http_major > 1 || (self.http_major == 1 && self.http_minor >= 1),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::io::Cursor as IoCursor;

    fn rb_with(data: &[u8]) -> RingBuffer {
        let mut rb = RingBuffer::new(256);
        let mut src = IoCursor::new(data.to_vec());
        rb.write_from(&mut src).unwrap().unwrap();
        rb
    }

    #[test]
    fn keep_alive_defaults_by_version() {
        let rb = rb_with(b"");
        let req = ParsedRequest {
            method: Method::Get,
            http_major: 1,
            http_minor: 1,
            uri_start: 0,
            uri_end: 0,
            headers: HeaderList::new(),
        };
        assert!(req.wants_keep_alive(&rb));

        let req10 = ParsedRequest { http_minor: 0, ..req };
        assert!(!req10.wants_keep_alive(&rb));
    }

    #[test]
    fn explicit_connection_close_overrides_version() {
        let rb = rb_with(b"Connection: close");
        let headers = HeaderList::from_ranges(vec![HeaderRange {
            key: (0, 10),
            value: (12, 17),
        }]);
        let req = ParsedRequest {
            method: Method::Get,
            http_major: 1,
            http_minor: 1,
            uri_start: 0,
            uri_end: 0,
            headers,
        };
        assert!(!req.wants_keep_alive(&rb));
    }
}
