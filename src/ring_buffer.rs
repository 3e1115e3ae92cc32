//! Fixed-capacity circular byte buffer indexed by absolute position.
//!
//! `pos` is the read cursor (bytes the parser has consumed), `last` is the
//! write cursor (bytes delivered by I/O). Both only ever grow; the byte at
//! absolute index `i` lives at `buf[i % C]`. Because offsets handed out to
//! callers (the parser's `request_start`, `uri_start`, ...) are absolute
//! positions rather than raw pointers, they stay valid across wraparound as
//! long as the data they reference hasn't been overwritten, i.e. as long as
//! `last - i <= C`.

use std::io;

/// Default ring capacity. See DESIGN.md Open Question resolution #2.
pub const DEFAULT_RING_CAPACITY: usize = 8192;

/// Error returned when a read would push `last - pos` past the buffer's
/// capacity. This is the only error `RingBuffer` itself can raise; the
/// caller (the connection driver) turns it into `ParseError::Overflow`.
#[derive(Debug, Clone, Copy, PartialEq, Eq, thiserror::Error)]
#[error("ring buffer overflow: header block exceeds capacity")]
pub struct Overflow;

/// A fixed-capacity circular byte buffer.
///
/// `C` must be a power of two; this is asserted in `new`.
pub struct RingBuffer {
    buf: Vec<u8>,
    mask: usize,
    pos: usize,
    last: usize,
}

impl RingBuffer {
    /// Create a new ring buffer with the given power-of-two capacity.
    pub fn new(capacity: usize) -> Self {
        assert!(capacity.is_power_of_two(), "ring buffer capacity must be a power of two");
        RingBuffer {
            buf: vec![0u8; capacity],
            mask: capacity - 1,
            pos: 0,
            last: 0,
        }
    }

    #[inline]
    pub fn capacity(&self) -> usize {
        self.buf.len()
    }

    /// Absolute position of the read cursor: bytes before this have been
    /// consumed by the parser.
    #[inline]
    pub fn pos(&self) -> usize {
        self.pos
    }

    /// Absolute position of the write cursor: bytes up to (not including)
    /// this have been delivered by I/O.
    #[inline]
    pub fn last(&self) -> usize {
        self.last
    }

    /// Number of unconsumed, already-written bytes.
    #[inline]
    pub fn len(&self) -> usize {
        self.last - self.pos
    }

    #[inline]
    pub fn is_empty(&self) -> bool {
        self.pos == self.last
    }

    /// Advance the read cursor. Used by the parser driver once a complete
    /// request line or header block has been consumed, and by callers that
    /// skip bytes outright (e.g. discarding a request body this spec does
    /// not parse).
    pub fn consume(&mut self, n: usize) {
        debug_assert!(self.pos + n <= self.last);
        self.pos += n;
    }

    /// Non-blocking read from `source` into the tail of the buffer (the
    /// region after `last`), advancing `last` by the number of bytes read.
    /// Returns `Ok((bytes_read, eof))` on success (`bytes_read == 0 && eof`
    /// means the peer closed; `bytes_read == 0 && !eof` means would-block).
    /// Fails with `Overflow` if there is no room left for at least one byte;
    /// propagates the underlying I/O error otherwise so the caller (the
    /// connection driver, spec.md §7) can classify it as transient or fatal.
    pub fn write_from<R: io::Read>(
        &mut self,
        source: &mut R,
    ) -> Result<Result<(usize, bool), io::Error>, Overflow> {
        let capacity = self.buf.len();
        if self.last - self.pos >= capacity {
            return Err(Overflow);
        }
        let start = self.last & self.mask;
        let room = capacity - (self.last - self.pos);
        // Segment up to either the physical end of the backing array or the
        // logical room limit, whichever is smaller; a second call handles
        // the wrapped remainder on the next read if needed (we don't try to
        // fill both segments in one read call, matching a plain Read impl).
        let first_len = room.min(capacity - start);
        match source.read(&mut self.buf[start..start + first_len]) {
            Ok(0) => Ok(Ok((0, true))),
            Ok(n) => {
                self.last += n;
                Ok(Ok((n, false)))
            }
            Err(ref e) if e.kind() == io::ErrorKind::WouldBlock => Ok(Ok((0, false))),
            Err(e) => Ok(Err(e)),
        }
    }

    /// Byte at absolute index `i`. Precondition: `pos <= i < last`.
    #[inline]
    pub fn byte_at(&self, i: usize) -> u8 {
        debug_assert!(i >= self.pos && i < self.last);
        self.buf[i & self.mask]
    }

    /// Materialize a contiguous copy of `[start, end)`. Precondition:
    /// `pos <= start <= end <= last`.
    pub fn slice(&self, start: usize, end: usize) -> Vec<u8> {
        debug_assert!(start <= end);
        debug_assert!(start >= self.pos && end <= self.last);
        let mut out = Vec::with_capacity(end - start);
        for i in start..end {
            out.push(self.buf[i & self.mask]);
        }
        out
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::io::Cursor;

    #[test]
    fn write_and_read_back() {
        let mut rb = RingBuffer::new(16);
        let mut src = Cursor::new(b"hello world".to_vec());
        let (n, eof) = rb.write_from(&mut src).unwrap().unwrap();
        assert_eq!(n, 11);
        assert!(!eof);
        assert_eq!(rb.slice(0, 11), b"hello world");
        assert_eq!(rb.byte_at(0), b'h');
        rb.consume(6);
        assert_eq!(rb.pos(), 6);
        assert_eq!(rb.slice(6, 11), b"world");
    }

    #[test]
    fn wraparound_preserves_content() {
        let mut rb = RingBuffer::new(8);
        let mut src = Cursor::new(b"abcdefg".to_vec());
        rb.write_from(&mut src).unwrap().unwrap();
        rb.consume(7);
        let mut src2 = Cursor::new(b"hij".to_vec());
        let (n, _) = rb.write_from(&mut src2).unwrap().unwrap();
        assert_eq!(n, 3);
        assert_eq!(rb.slice(7, 10), b"hij");
    }

    #[test]
    fn overflow_when_full() {
        let mut rb = RingBuffer::new(4);
        let mut src = Cursor::new(b"abcd".to_vec());
        rb.write_from(&mut src).unwrap().unwrap();
        let mut src2 = Cursor::new(b"e".to_vec());
        assert!(rb.write_from(&mut src2).is_err());
    }

    #[test]
    fn cursors_never_decrease() {
        let mut rb = RingBuffer::new(16);
        let mut src = Cursor::new(b"0123456789".to_vec());
        rb.write_from(&mut src).unwrap().unwrap();
        let last_before = rb.last();
        rb.consume(5);
        assert!(rb.pos() <= rb.last());
        assert_eq!(rb.last(), last_before);
    }
}
