//! Resumable HTTP/1.x parsing: request line (§4.2) then headers (§4.3).
//!
//! Both sub-parsers share the same shape: a `match` over a state enum that
//! consumes one byte from a `RingBuffer` at a time, recording absolute
//! offsets as it goes, and returning `ParseStatus::NeedMore` the instant the
//! buffer runs dry. The caller (connection.rs) re-invokes the same function
//! with the same state once more bytes have arrived; because state and
//! offsets are plain data (not a suspended stack frame), resumption is just
//! "call the function again."

pub mod headers;
pub mod request_line;

use crate::error::ParseError;

/// Outcome of a single parse step.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ParseStatus {
    /// Buffer exhausted before the grammar was satisfied; state was saved,
    /// call again once more bytes are available.
    NeedMore,
    /// This phase is complete.
    Done,
}

pub type ParseResult = Result<ParseStatus, ParseError>;
