//! Client events and actions.
//!
//! The caller is responsible for:
//! - Executing transport actions (open, subscribe, publish, close)
//! - Running history fetches and feeding results back as events
//! - Forwarding UI commands (connect, disconnect, send)
//!
//! Every transport-originated event carries the [`Generation`] of the
//! session it belongs to. The client honors an event only if its generation
//! matches the currently owned session; anything else is stale and is
//! discarded. This is what makes cancellation safe: after `disconnect`
//! during a connect attempt, the attempt's late callbacks no longer match.

use std::fmt;

use roomwire_proto::{ChatMessage, HeartBeat};

/// Monotonically increasing tag for transport sessions.
///
/// Incremented on every `connect` command; never reused within one client.
pub type Generation = u64;

/// Observable connection status, one slot per client.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ConnectionStatus {
    /// No live session. Initial and terminal state.
    Disconnected,
    /// Transport open initiated, waiting for the connect callback.
    Connecting,
    /// Session established; subscription active, sends allowed.
    Connected,
    /// The transport reported a failure. Terminal for the session; a new
    /// `connect` is allowed from here.
    Error,
}

impl fmt::Display for ConnectionStatus {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let s = match self {
            Self::Disconnected => "disconnected",
            Self::Connecting => "connecting",
            Self::Connected => "connected",
            Self::Error => "in error",
        };
        f.write_str(s)
    }
}

/// Severity of a user-visible notification.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum NotifyLevel {
    /// Informational ("connected to room 42").
    Notice,
    /// Something degraded but the session continues ("history load failed").
    Warning,
    /// Something failed ("connection error").
    Error,
}

/// Events the caller feeds into the client.
#[derive(Debug, Clone)]
pub enum ClientEvent {
    /// UI command: connect to a room.
    Connect {
        /// Room to connect to. Must be non-empty after trimming.
        room_id: String,
    },

    /// UI command: tear down the current session. Cancels a connect attempt
    /// still in flight; a no-op when already disconnected.
    Disconnect,

    /// UI command: publish a chat message to the current room.
    Send {
        /// Message text. Must be non-empty after trimming.
        text: String,
        /// Room the message is addressed to, carried as a publish header.
        room_id: String,
    },

    /// Transport reports the session is established.
    TransportUp {
        /// Session the callback belongs to.
        generation: Generation,
    },

    /// Transport reports a protocol or connection failure.
    TransportError {
        /// Session the callback belongs to.
        generation: Generation,
        /// Server-supplied or transport-supplied failure detail.
        reason: String,
    },

    /// Transport reports the channel closed (remote close or heartbeat
    /// timeout). Fires regardless of which state preceded it.
    TransportClosed {
        /// Session the callback belongs to.
        generation: Generation,
    },

    /// A subscribed topic delivered a message frame.
    Delivery {
        /// Session the delivery belongs to.
        generation: Generation,
        /// Raw JSON frame body, decoded by the client.
        body: String,
    },

    /// The history fetch for the session's room resolved.
    HistoryLoaded {
        /// Session the fetch was started for.
        generation: Generation,
        /// Persisted messages, oldest first.
        messages: Vec<ChatMessage>,
    },

    /// The history fetch failed. Recoverable: the stream and the connection
    /// status are left untouched.
    HistoryFailed {
        /// Session the fetch was started for.
        generation: Generation,
        /// Failure detail.
        reason: String,
    },
}

/// Actions the client produces for the caller to execute.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum ClientAction {
    /// Open a transport session: connect to the endpoint with the room id
    /// as a connect header, the given symmetric heartbeat, and no automatic
    /// reconnection.
    OpenTransport {
        /// Generation assigned to the new session.
        generation: Generation,
        /// WebSocket endpoint to connect to.
        endpoint: String,
        /// Room id, sent as a connect header.
        room_id: String,
        /// Heartbeat intervals for both directions.
        heart_beat: HeartBeat,
    },

    /// Subscribe to the room-scoped topic. Emitted exactly once per
    /// established session.
    Subscribe {
        /// Session the subscription belongs to.
        generation: Generation,
        /// Topic path to subscribe to.
        topic: String,
    },

    /// Fetch the room's persisted messages. The result comes back as
    /// [`ClientEvent::HistoryLoaded`] or [`ClientEvent::HistoryFailed`].
    FetchHistory {
        /// Session the fetch is for.
        generation: Generation,
        /// Room whose history to fetch.
        room_id: String,
    },

    /// Publish a chat body to the room-agnostic send destination, with the
    /// room id as a header.
    Publish {
        /// Destination path (room-agnostic).
        destination: String,
        /// Room id header value.
        room_id: String,
        /// JSON-encoded [`roomwire_proto::OutgoingMessage`] body.
        body: String,
    },

    /// Release the session's transport handle. Emitted at most once per
    /// generation.
    CloseTransport {
        /// Session to release.
        generation: Generation,
    },

    /// Surface a user-visible notification.
    Notify {
        /// Severity.
        level: NotifyLevel,
        /// Notification text.
        message: String,
    },

    /// The observable state (status or message stream) changed; the UI
    /// collaborator should re-render.
    Render,

    /// Diagnostic message for the caller's logger.
    Log {
        /// Log message.
        message: String,
    },
}
