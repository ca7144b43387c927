//! Wire types for the roomwire chat protocol.
//!
//! The chat server speaks a STOMP-subset text protocol over a WebSocket:
//! newline-delimited command frames with `key:value` headers and a
//! NUL-terminated body. Chat content itself is JSON carried in frame bodies
//! and in the history endpoint's response envelope.
//!
//! # Components
//!
//! - [`Frame`] / [`Command`]: text frame model with encode/parse
//! - [`ChatMessage`] / [`OutgoingMessage`]: JSON chat payload shapes
//! - [`routes`]: topic, destination, and URL naming conventions
//!
//! Frame headers are intentionally simple (no STOMP header escaping): the
//! server never emits `:` or newlines inside header values for this
//! protocol's header set.

mod errors;
mod frame;
mod message;
pub mod routes;

pub use errors::ProtocolError;
pub use frame::{Command, Frame, HEARTBEAT_FRAME, HeartBeat};
pub use message::{ChatMessage, HistoryResponse, NO_ATTACHMENT, OutgoingMessage};
