//! Client
//!
//! Action-based session state machine for the roomwire chat protocol.
//! Manages the connection lifecycle for one chat room at a time and merges
//! persisted history with live streamed messages into one ordered view.
//!
//! # Architecture
//!
//! The client is Sans-IO: it consumes events ([`ClientEvent`], the UI
//! collaborator's commands plus transport and history callbacks) through
//! pure state machine logic, and returns actions ([`ClientAction`]) for the
//! caller to execute. Transport sessions are tagged with a monotonically
//! increasing [`Generation`]; events carrying a stale generation are
//! discarded, so a late connect callback can never resurrect a session the
//! user already tore down.
//!
//! # Components
//!
//! - [`ChatClient`]: session state machine and command surface
//! - [`MessageStream`]: ordered history-plus-live message view
//! - [`ClientEvent`]: events fed into the client
//! - [`ClientAction`]: actions produced by the client
//!
//! # Transport (optional)
//!
//! With the `transport` feature enabled, this crate also provides:
//! - [`transport`]: WebSocket channel speaking the STOMP-subset framing
//! - [`history`]: HTTP loader for a room's persisted messages
//! - [`driver`]: async loop bridging actions and events to real I/O

#![forbid(unsafe_code)]
#![deny(missing_docs)]

mod client;
mod error;
mod event;
mod stream;

#[cfg(feature = "transport")]
pub mod driver;
#[cfg(feature = "transport")]
pub mod history;
#[cfg(feature = "transport")]
pub mod transport;

pub use client::{ChatClient, ClientConfig, DEFAULT_HEARTBEAT_INTERVAL};
pub use error::ClientError;
pub use event::{ClientAction, ClientEvent, ConnectionStatus, Generation, NotifyLevel};
pub use roomwire_proto::{ChatMessage, NO_ATTACHMENT};
pub use stream::MessageStream;
