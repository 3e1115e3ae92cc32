//! Resumable request-line parser: method, URI, HTTP version.
//!
//! State table mirrors spec.md §4.2 byte-for-byte, ported from
//! `examples/original_source/src/http_parser.c`'s `http_parse_request_line`
//! (computed-goto dispatch) to a `match` over `Phase` (spec.md §9 explicitly
//! treats these as equivalent dispatch strategies).

use crate::error::ParseError;
use crate::ring_buffer::RingBuffer;
use crate::request::Method;

use super::{ParseResult, ParseStatus};

const CR: u8 = b'\r';
const LF: u8 = b'\n';

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum Phase {
    Start,
    Method,
    SpacesBeforeUri,
    AfterSlashInUri,
    Http,
    HttpH,
    HttpHt,
    HttpHtt,
    HttpHttp,
    FirstMajorDigit,
    MajorDigit,
    FirstMinorDigit,
    MinorDigit,
    SpacesAfterDigit,
    AlmostDone,
}

/// Suspended state of an in-progress request-line parse. All offsets are
/// absolute ring-buffer positions, valid as long as the oldest of them
/// hasn't been overwritten (spec.md §3).
#[derive(Debug, Clone)]
pub struct RequestLineState {
    phase: Phase,
    /// Next unexamined absolute position.
    scan: usize,
    pub request_start: usize,
    pub uri_start: usize,
    pub uri_end: usize,
    pub method: Method,
    pub http_major: u16,
    pub http_minor: u16,
}

impl RequestLineState {
    /// Begin a fresh request-line parse starting at `start` (the ring
    /// buffer's current `pos`, i.e. nothing has been scanned yet).
    pub fn new(start: usize) -> Self {
        RequestLineState {
            phase: Phase::Start,
            scan: start,
            request_start: start,
            uri_start: start,
            uri_end: start,
            method: Method::Unknown,
            http_major: 0,
            http_minor: 0,
        }
    }

    fn is_method_char(ch: u8) -> bool {
        ch.is_ascii_uppercase() || ch == b'_'
    }

    /// Classify the method token `[request_start, token_end)` against the
    /// recognized subset (spec.md §6). Any other all-uppercase/underscore
    /// token is `Unknown`; spec.md §9 notes a 4-byte word compare is an
    /// implementation detail, not part of the contract, so this uses a
    /// plain length+byte comparison instead.
    fn classify_method(rb: &RingBuffer, start: usize, end: usize) -> Method {
        let token = rb.slice(start, end);
        match token.as_slice() {
            b"GET" => Method::Get,
            b"POST" => Method::Post,
            b"HEAD" => Method::Head,
            _ => Method::Unknown,
        }
    }

    /// Advance the parse as far as possible given bytes currently available
    /// in `rb` (i.e. up to `rb.last()`). Returns `NeedMore` if the buffer ran
    /// dry before the request line was fully parsed; `Done` once the
    /// terminating LF has been consumed, with all offset fields populated.
    pub fn step(&mut self, rb: &RingBuffer) -> ParseResult {
        loop {
            if self.scan >= rb.last() {
                return Ok(ParseStatus::NeedMore);
            }
            let ch = rb.byte_at(self.scan);
            match self.phase {
                Phase::Start => {
                    self.request_start = self.scan;
                    if ch == CR || ch == LF {
                        // Absorb leading blank lines; stay in Start, and
                        // keep sliding request_start forward as we skip.
                    } else if Self::is_method_char(ch) {
                        self.phase = Phase::Method;
                    } else {
                        return Err(ParseError::InvalidMethod);
                    }
                }
                Phase::Method => {
                    if ch == b' ' {
                        self.method = Self::classify_method(rb, self.request_start, self.scan);
                        self.phase = Phase::SpacesBeforeUri;
                    } else if !Self::is_method_char(ch) {
                        return Err(ParseError::InvalidMethod);
                    }
                }
                Phase::SpacesBeforeUri => {
                    if ch == b'/' {
                        self.uri_start = self.scan;
                        self.phase = Phase::AfterSlashInUri;
                    } else if ch != b' ' {
                        return Err(ParseError::InvalidRequest);
                    }
                }
                Phase::AfterSlashInUri => {
                    if ch == b' ' {
                        self.uri_end = self.scan;
                        self.phase = Phase::Http;
                    }
                }
                Phase::Http => {
                    if ch == b'H' {
                        self.phase = Phase::HttpH;
                    } else if ch != b' ' {
                        return Err(ParseError::InvalidRequest);
                    }
                }
                Phase::HttpH => {
                    if ch == b'T' {
                        self.phase = Phase::HttpHt;
                    } else {
                        return Err(ParseError::InvalidRequest);
                    }
                }
                Phase::HttpHt => {
                    if ch == b'T' {
                        self.phase = Phase::HttpHtt;
                    } else {
                        return Err(ParseError::InvalidRequest);
                    }
                }
                Phase::HttpHtt => {
                    if ch == b'P' {
                        self.phase = Phase::HttpHttp;
                    } else {
                        return Err(ParseError::InvalidRequest);
                    }
                }
                Phase::HttpHttp => {
                    if ch == b'/' {
                        self.phase = Phase::FirstMajorDigit;
                    } else {
                        return Err(ParseError::InvalidRequest);
                    }
                }
                Phase::FirstMajorDigit => {
                    if ch.is_ascii_digit() && ch != b'0' {
                        self.http_major = (ch - b'0') as u16;
                        self.phase = Phase::MajorDigit;
                    } else {
                        return Err(ParseError::InvalidRequest);
                    }
                }
                Phase::MajorDigit => {
                    if ch == b'.' {
                        self.phase = Phase::FirstMinorDigit;
                    } else if ch.is_ascii_digit() {
                        self.http_major = self.http_major * 10 + (ch - b'0') as u16;
                    } else {
                        return Err(ParseError::InvalidRequest);
                    }
                }
                Phase::FirstMinorDigit => {
                    if ch.is_ascii_digit() {
                        self.http_minor = (ch - b'0') as u16;
                        self.phase = Phase::MinorDigit;
                    } else {
                        return Err(ParseError::InvalidRequest);
                    }
                }
                Phase::MinorDigit => {
                    if ch == CR {
                        self.phase = Phase::AlmostDone;
                    } else if ch == LF {
                        self.scan += 1;
                        return Ok(ParseStatus::Done);
                    } else if ch == b' ' {
                        self.phase = Phase::SpacesAfterDigit;
                    } else if ch.is_ascii_digit() {
                        self.http_minor = self.http_minor * 10 + (ch - b'0') as u16;
                    } else {
                        return Err(ParseError::InvalidRequest);
                    }
                }
                Phase::SpacesAfterDigit => {
                    if ch == CR {
                        self.phase = Phase::AlmostDone;
                    } else if ch == LF {
                        self.scan += 1;
                        return Ok(ParseStatus::Done);
                    } else if ch != b' ' {
                        return Err(ParseError::InvalidRequest);
                    }
                }
                Phase::AlmostDone => {
                    if ch == LF {
                        self.scan += 1;
                        return Ok(ParseStatus::Done);
                    } else {
                        return Err(ParseError::InvalidRequest);
                    }
                }
            }
            self.scan += 1;
        }
    }

    /// Absolute position of the first unconsumed byte once this phase
    /// finishes (or is interrupted): the header parser resumes from here.
    pub fn cursor(&self) -> usize {
        self.scan
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::io::Cursor;

    fn parse_all(input: &[u8]) -> Result<RequestLineState, ParseError> {
        let mut rb = RingBuffer::new(256);
        let mut src = Cursor::new(input.to_vec());
        rb.write_from(&mut src).unwrap().unwrap();
        let mut state = RequestLineState::new(rb.pos());
        match state.step(&rb)? {
            ParseStatus::Done => Ok(state),
            ParseStatus::NeedMore => panic!("expected Done, got NeedMore"),
        }
    }

    #[test]
    fn minimal_get() {
        let st = parse_all(b"GET / HTTP/1.0\r\n").unwrap();
        assert_eq!(st.method, Method::Get);
        assert_eq!(st.http_major, 1);
        assert_eq!(st.http_minor, 0);
    }

    #[test]
    fn unknown_method_succeeds() {
        let st = parse_all(b"FOO / HTTP/1.1\r\n").unwrap();
        assert_eq!(st.method, Method::Unknown);
    }

    #[test]
    fn lowercase_method_is_invalid() {
        let mut rb = RingBuffer::new(256);
        let mut src = Cursor::new(b"get / HTTP/1.1\r\n".to_vec());
        rb.write_from(&mut src).unwrap().unwrap();
        let mut state = RequestLineState::new(rb.pos());
        assert_eq!(state.step(&rb), Err(ParseError::InvalidMethod));
    }

    #[test]
    fn byte_drip_matches_one_shot() {
        let input = b"GET /a HTTP/1.1\r\n";
        let mut rb = RingBuffer::new(256);
        let mut state = RequestLineState::new(0);
        let mut done = None;
        for &b in input {
            let mut src = Cursor::new(vec![b]);
            rb.write_from(&mut src).unwrap().unwrap();
            match state.step(&rb).unwrap() {
                ParseStatus::NeedMore => continue,
                ParseStatus::Done => {
                    done = Some(());
                    break;
                }
            }
        }
        assert!(done.is_some());
        assert_eq!(state.method, Method::Get);
        assert_eq!(rb.slice(state.uri_start, state.uri_end), b"/a");
    }
}
