//! Error types for wire parsing.
//!
//! Strongly-typed parse errors so the transport layer can distinguish a
//! malformed frame (drop the connection) from a malformed chat body (drop
//! the message).

use thiserror::Error;

/// Errors produced while parsing wire data.
#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum ProtocolError {
    /// Frame text did not contain the NUL terminator.
    #[error("unterminated frame: missing NUL terminator")]
    UnterminatedFrame,

    /// Frame command line was empty or unknown.
    #[error("unknown frame command: {0:?}")]
    UnknownCommand(String),

    /// A header line was missing the `:` separator.
    #[error("malformed header line: {0:?}")]
    MalformedHeader(String),

    /// The `heart-beat` header value was not two comma-separated integers.
    #[error("malformed heart-beat value: {0:?}")]
    MalformedHeartBeat(String),
}
