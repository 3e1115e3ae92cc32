//! Typed error taxonomy (spec.md §7): distinct enums for the parser, the
//! reactor, and a connection's I/O lifecycle, so a caller can match on
//! exactly what went wrong instead of inspecting a string. `main.rs` wraps
//! all of these in `anyhow` at the point a failure actually terminates the
//! process; everywhere else a specific variant propagates via `?`.

use thiserror::Error;

/// Failures from `parse::request_line` / `parse::headers`. Does not include
/// "need more bytes" — that's `ParseStatus::NeedMore`, not an error.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Error)]
pub enum ParseError {
    #[error("invalid or unsupported HTTP method")]
    InvalidMethod,
    #[error("malformed request line")]
    InvalidRequest,
    #[error("malformed header line")]
    InvalidHeader,
    #[error("request exceeds the ring buffer's capacity")]
    Overflow,
}

impl From<crate::ring_buffer::Overflow> for ParseError {
    fn from(_: crate::ring_buffer::Overflow) -> Self {
        ParseError::Overflow
    }
}

/// Failures bringing up or running the reactor itself — these are always
/// fatal to the worker that raised them.
#[derive(Debug, Error)]
pub enum ReactorError {
    #[error("failed to bind listener on {addr}: {source}")]
    Bind {
        addr: String,
        #[source]
        source: std::io::Error,
    },
    #[error("failed to register listener with poll: {0}")]
    Listen(#[source] std::io::Error),
    #[error("poll wait failed: {0}")]
    Poll(#[source] std::io::Error),
}

/// Failures on a single connection's socket. Unlike `ReactorError`, these
/// are scoped to one connection: the reactor logs and drops the connection
/// rather than propagating further (spec.md §7).
#[derive(Debug, Error)]
pub enum ConnectionError {
    #[error("parse error: {0}")]
    Parse(#[from] ParseError),
    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),
    #[error("peer closed the connection")]
    PeerClosed,
    #[error("idle timeout exceeded")]
    TimedOut,
}

impl ConnectionError {
    /// Whether the connection can be retried/kept open, or must be torn
    /// down. Transient I/O conditions (would-block, interrupted) never
    /// reach this type — they're handled at the read loop before an error
    /// is constructed — so any `ConnectionError` here is terminal.
    pub fn is_fatal(&self) -> bool {
        true
    }
}
