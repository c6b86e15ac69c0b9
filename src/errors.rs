//! # Error Taxonomy
//!
//! Four kinds of failure, matching `spec.md` §7. `ValidationError` and
//! `TransportError` are `std::error::Error` types that cross a process
//! boundary — their `Display` text is the wire-visible `message`.
//! `ExecutorWarning` is logged, not returned. `Fatal` unwinds through
//! `anyhow::Result` at the CLI boundary.

use std::fmt;

/// A command failed aggregator-side validation before ever reaching the bus.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ValidationError(pub String);

impl ValidationError {
    pub fn invalid_command() -> Self {
        ValidationError("Invalid command".to_string())
    }

    pub fn empty() -> Self {
        ValidationError("Invalid command".to_string())
    }
}

impl fmt::Display for ValidationError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.0)
    }
}

impl std::error::Error for ValidationError {}

/// The command channel timed out, was reset, or the peer was unreachable.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum TransportError {
    Timeout,
    ConnectionReset,
    Unreachable(String),
}

impl fmt::Display for TransportError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            TransportError::Timeout => write!(f, "request timed out"),
            TransportError::ConnectionReset => write!(f, "connection reset by peer"),
            TransportError::Unreachable(detail) => write!(f, "peer unreachable: {detail}"),
        }
    }
}

impl std::error::Error for TransportError {}
