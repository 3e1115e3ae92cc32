//! Resumable header-block parser: `key: value` pairs until a blank line.
//!
//! Ported from `examples/original_source/src/http_parser.c`'s
//! `http_parse_request_body` (the original's misleading name for what is
//! actually the header-block parser — sehttpd does not parse bodies at
//! all, matching spec.md's Non-goals).

use crate::error::ParseError;
use crate::ring_buffer::RingBuffer;

use super::{ParseResult, ParseStatus};

const CR: u8 = b'\r';
const LF: u8 = b'\n';

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum Phase {
    Start,
    StartCr,
    Key,
    SpacesBeforeColon,
    SpacesAfterColon,
    Value,
    Cr,
    Crlf,
    CrlfCr,
}

/// One committed header: absolute offset ranges for its key and value.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct HeaderRange {
    pub key: (usize, usize),
    pub value: (usize, usize),
}

/// Suspended state of an in-progress header-block parse.
#[derive(Debug, Clone)]
pub struct HeaderState {
    phase: Phase,
    scan: usize,
    key_start: usize,
    key_end: usize,
    value_start: usize,
    value_end: usize,
    /// Headers committed so far, in wire order (spec.md P6).
    pub headers: Vec<HeaderRange>,
}

impl HeaderState {
    pub fn new(start: usize) -> Self {
        HeaderState {
            phase: Phase::Start,
            scan: start,
            key_start: start,
            key_end: start,
            value_start: start,
            value_end: start,
            headers: Vec::new(),
        }
    }

    /// Advance as far as possible given bytes available in `rb`. Returns
    /// `Done` once the terminating blank line has been consumed.
    pub fn step(&mut self, rb: &RingBuffer) -> ParseResult {
        loop {
            if self.scan >= rb.last() {
                return Ok(ParseStatus::NeedMore);
            }
            let ch = rb.byte_at(self.scan);
            match self.phase {
                Phase::Start => {
                    // A blank line here — CRLF or a bare LF — is the header
                    // block's terminator, not leading whitespace to skip: a
                    // zero-header request reaches this state immediately
                    // after the request line, and the very next bytes are
                    // that terminating blank line.
                    if ch == CR {
                        self.phase = Phase::StartCr;
                    } else if ch == LF {
                        self.scan += 1;
                        return Ok(ParseStatus::Done);
                    } else {
                        self.key_start = self.scan;
                        self.phase = Phase::Key;
                    }
                }
                Phase::StartCr => {
                    if ch == LF {
                        self.scan += 1;
                        return Ok(ParseStatus::Done);
                    } else {
                        return Err(ParseError::InvalidHeader);
                    }
                }
                Phase::Key => {
                    if ch == b' ' {
                        self.key_end = self.scan;
                        self.phase = Phase::SpacesBeforeColon;
                    } else if ch == b':' {
                        self.key_end = self.scan;
                        self.phase = Phase::SpacesAfterColon;
                    }
                }
                Phase::SpacesBeforeColon => {
                    if ch == b' ' {
                        // keep skipping
                    } else if ch == b':' {
                        self.phase = Phase::SpacesAfterColon;
                    } else {
                        return Err(ParseError::InvalidHeader);
                    }
                }
                Phase::SpacesAfterColon => {
                    if ch != b' ' {
                        // The first non-space byte becomes value_start; as
                        // with every other transition here, the cursor still
                        // advances past it once before Value's rules apply
                        // to the byte that follows (matching the original
                        // parser's dispatch-after-transition discipline).
                        self.value_start = self.scan;
                        self.phase = Phase::Value;
                    }
                }
                Phase::Value => {
                    if ch == CR {
                        self.value_end = self.scan;
                        self.phase = Phase::Cr;
                    } else if ch == LF {
                        self.value_end = self.scan;
                        self.phase = Phase::Crlf;
                    }
                }
                Phase::Cr => {
                    if ch == LF {
                        self.headers.push(HeaderRange {
                            key: (self.key_start, self.key_end),
                            value: (self.value_start, self.value_end),
                        });
                        self.phase = Phase::Crlf;
                    } else {
                        return Err(ParseError::InvalidHeader);
                    }
                }
                Phase::Crlf => {
                    if ch == CR {
                        self.phase = Phase::CrlfCr;
                    } else {
                        self.key_start = self.scan;
                        self.phase = Phase::Key;
                        continue;
                    }
                }
                Phase::CrlfCr => {
                    if ch == LF {
                        self.scan += 1;
                        return Ok(ParseStatus::Done);
                    } else {
                        return Err(ParseError::InvalidHeader);
                    }
                }
            }
            self.scan += 1;
        }
    }

    pub fn cursor(&self) -> usize {
        self.scan
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::ring_buffer::RingBuffer;
    use std::io::Cursor;

    fn parse_all(input: &[u8]) -> Result<HeaderState, ParseError> {
        let mut rb = RingBuffer::new(256);
        let mut src = Cursor::new(input.to_vec());
        rb.write_from(&mut src).unwrap().unwrap();
        let mut state = HeaderState::new(rb.pos());
        match state.step(&rb)? {
            ParseStatus::Done => Ok(state),
            ParseStatus::NeedMore => panic!("expected Done, got NeedMore"),
        }
    }

    #[test]
    fn no_headers() {
        let st = parse_all(b"\r\n").unwrap();
        assert!(st.headers.is_empty());
    }

    #[test]
    fn one_header_strips_leading_space() {
        let mut rb = RingBuffer::new(256);
        let mut src = Cursor::new(b"Host: x\r\n\r\n".to_vec());
        rb.write_from(&mut src).unwrap().unwrap();
        let mut state = HeaderState::new(rb.pos());
        assert_eq!(state.step(&rb).unwrap(), ParseStatus::Done);
        assert_eq!(state.headers.len(), 1);
        let h = &state.headers[0];
        assert_eq!(rb.slice(h.key.0, h.key.1), b"Host");
        assert_eq!(rb.slice(h.value.0, h.value.1), b"x");
    }

    #[test]
    fn missing_colon_is_invalid() {
        let mut rb = RingBuffer::new(256);
        let mut src = Cursor::new(b"Host x\r\n\r\n".to_vec());
        rb.write_from(&mut src).unwrap().unwrap();
        let mut state = HeaderState::new(rb.pos());
        assert_eq!(state.step(&rb), Err(ParseError::InvalidHeader));
    }

    #[test]
    fn duplicate_headers_preserve_order() {
        let st = parse_all(b"A: 1\r\nA: 2\r\n\r\n").unwrap();
        assert_eq!(st.headers.len(), 2);
    }

    #[test]
    fn byte_drip_matches_one_shot() {
        let input = b"Host: x\r\nAccept: */*\r\n\r\n";
        let mut state = HeaderState::new(0);
        let mut rb = RingBuffer::new(256);
        for &b in input {
            let mut src = Cursor::new(vec![b]);
            rb.write_from(&mut src).unwrap().unwrap();
            if state.step(&rb).unwrap() == ParseStatus::Done {
                break;
            }
        }
        assert_eq!(state.headers.len(), 2);
        assert_eq!(rb.slice(state.headers[0].key.0, state.headers[0].key.1), b"Host");
        assert_eq!(rb.slice(state.headers[1].key.0, state.headers[1].key.1), b"Accept");
    }
}
