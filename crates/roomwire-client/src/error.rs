//! Client error types.
//!
//! Only synchronous validation failures surface as `Err` from
//! [`crate::ChatClient::handle`]: they are reported to the caller and cause
//! no state change. Transport and history failures arrive as events and
//! come back out as actions (status transition plus a user-visible
//! notification), never as `Err`.

use thiserror::Error;

use crate::event::ConnectionStatus;

/// Errors returned synchronously by client commands.
#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum ClientError {
    /// `connect` was called with an empty or whitespace-only room id.
    #[error("please enter a room id")]
    EmptyRoomId,

    /// `send` was called with empty or whitespace-only text.
    #[error("message text must not be empty")]
    EmptyMessage,

    /// `connect` was called while a session is already live. Connect calls
    /// are serialized: the previous session must reach a terminal state
    /// first.
    #[error("a session is already {status}")]
    SessionActive {
        /// Status of the live session at the time of the call.
        status: ConnectionStatus,
    },

    /// A chat body could not be encoded as JSON.
    ///
    /// Not reachable with the current payload shapes (two owned string
    /// fields serialize infallibly); the variant exists so the
    /// serializer's `Result` propagates instead of panicking.
    #[error("failed to encode message body: {reason}")]
    Codec {
        /// Serializer error detail.
        reason: String,
    },
}
