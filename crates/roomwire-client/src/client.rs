//! Session state machine and command surface.
//!
//! [`ChatClient`] owns the single connection-status slot, at most one
//! transport session, and the message stream for the connected room. It is
//! a pure state machine: commands and callbacks come in as
//! [`ClientEvent`]s, side effects go out as [`ClientAction`]s for the
//! caller to execute.
//!
//! # State Machine
//!
//! ```text
//! ┌──────────────┐  Connect   ┌────────────┐  TransportUp  ┌───────────┐
//! │ Disconnected │───────────>│ Connecting │──────────────>│ Connected │
//! └──────────────┘            └────────────┘               └───────────┘
//!        ↑                      │        │                   │       │
//!        │      Disconnect      │        │  TransportError   │       │
//!        │<─────(cancel)────────┘        ↓                   │       │
//!        │                          ┌───────┐<───────────────┘       │
//!        │<─────────────────────────│ Error │     Disconnect /       │
//!        │   Disconnect /           └───────┘     TransportClosed    │
//!        │<──────────────────────────────────────────────────────────┘
//! ```
//!
//! # Invariants
//!
//! - At most one transport session is owned at any time; a new `Connect`
//!   requires the previous session to have reached a terminal state.
//! - [`ClientAction::CloseTransport`] is emitted exactly once per opened
//!   generation (tracked by the session's `released` flag).
//! - Events whose generation does not match the owned session are
//!   discarded, so a late connect callback cannot resurrect a session that
//!   was cancelled or torn down.

use std::time::Duration;

use roomwire_proto::{ChatMessage, HeartBeat, OutgoingMessage, routes};

use crate::{
    error::ClientError,
    event::{ClientAction, ClientEvent, ConnectionStatus, Generation, NotifyLevel},
    stream::MessageStream,
};

/// Heartbeat interval applied symmetrically to both channel directions.
pub const DEFAULT_HEARTBEAT_INTERVAL: Duration = Duration::from_millis(4000);

/// Client configuration.
#[derive(Debug, Clone)]
pub struct ClientConfig {
    /// WebSocket endpoint of the chat transport.
    pub endpoint: String,
    /// Heartbeat interval, applied to both directions.
    pub heartbeat: Duration,
}

impl ClientConfig {
    /// Configuration with the default heartbeat interval.
    #[must_use]
    pub fn new(endpoint: impl Into<String>) -> Self {
        Self { endpoint: endpoint.into(), heartbeat: DEFAULT_HEARTBEAT_INTERVAL }
    }
}

/// One attempt to be connected to one room.
///
/// Owns exactly one transport handle, identified by `generation`. The
/// handle is released (a `CloseTransport` action emitted) exactly once.
#[derive(Debug, Clone)]
struct Session {
    room_id: String,
    generation: Generation,
    released: bool,
}

/// Session state machine and command facade.
///
/// Pure state machine that processes events and produces actions.
/// No I/O dependencies - fully testable without a transport.
#[derive(Debug, Clone)]
pub struct ChatClient {
    config: ClientConfig,
    status: ConnectionStatus,
    session: Option<Session>,
    stream: MessageStream,
    /// Last generation handed out; the live session's tag when one exists.
    generation: Generation,
}

impl ChatClient {
    /// Create a disconnected client.
    #[must_use]
    pub fn new(config: ClientConfig) -> Self {
        Self {
            config,
            status: ConnectionStatus::Disconnected,
            session: None,
            stream: MessageStream::new(),
            generation: 0,
        }
    }

    /// Current connection status.
    #[must_use]
    pub fn status(&self) -> ConnectionStatus {
        self.status
    }

    /// Ordered message view for the current session.
    #[must_use]
    pub fn messages(&self) -> &[ChatMessage] {
        self.stream.messages()
    }

    /// Room of the current session. `None` when no session is owned.
    #[must_use]
    pub fn room_id(&self) -> Option<&str> {
        self.session.as_ref().map(|s| s.room_id.as_str())
    }

    /// Last generation handed out. `0` before the first connect.
    #[must_use]
    pub fn generation(&self) -> Generation {
        self.generation
    }

    /// Generation of the currently owned session. `None` when no session
    /// is owned; only events carrying this generation are honored.
    #[must_use]
    pub fn session_generation(&self) -> Option<Generation> {
        self.session.as_ref().map(|s| s.generation)
    }

    /// Process an event and return resulting actions.
    ///
    /// # Errors
    ///
    /// Only command validation fails synchronously ([`ClientError`]); a
    /// validation failure causes no state change. Transport and history
    /// events always succeed, possibly producing only a [`ClientAction::Log`]
    /// when stale.
    pub fn handle(&mut self, event: ClientEvent) -> Result<Vec<ClientAction>, ClientError> {
        match event {
            ClientEvent::Connect { room_id } => self.handle_connect(&room_id),
            ClientEvent::Disconnect => Ok(self.handle_disconnect()),
            ClientEvent::Send { text, room_id } => self.handle_send(&text, room_id),
            ClientEvent::TransportUp { generation } => Ok(self.handle_transport_up(generation)),
            ClientEvent::TransportError { generation, reason } => {
                Ok(self.handle_transport_error(generation, &reason))
            },
            ClientEvent::TransportClosed { generation } => {
                Ok(self.handle_transport_closed(generation))
            },
            ClientEvent::Delivery { generation, body } => {
                Ok(self.handle_delivery(generation, &body))
            },
            ClientEvent::HistoryLoaded { generation, messages } => {
                Ok(self.handle_history_loaded(generation, messages))
            },
            ClientEvent::HistoryFailed { generation, reason } => {
                Ok(self.handle_history_failed(generation, &reason))
            },
        }
    }

    fn handle_connect(&mut self, room_id: &str) -> Result<Vec<ClientAction>, ClientError> {
        let room_id = room_id.trim();
        if room_id.is_empty() {
            return Err(ClientError::EmptyRoomId);
        }
        if matches!(self.status, ConnectionStatus::Connecting | ConnectionStatus::Connected) {
            return Err(ClientError::SessionActive { status: self.status });
        }

        self.generation += 1;
        self.session = Some(Session {
            room_id: room_id.to_string(),
            generation: self.generation,
            released: false,
        });
        self.status = ConnectionStatus::Connecting;
        // New session, possibly a new room: never show the previous room's
        // messages while the new history loads.
        self.stream.reset();

        Ok(vec![
            ClientAction::OpenTransport {
                generation: self.generation,
                endpoint: self.config.endpoint.clone(),
                room_id: room_id.to_string(),
                heart_beat: HeartBeat::symmetric(self.config.heartbeat),
            },
            ClientAction::Notify {
                level: NotifyLevel::Notice,
                message: "Connecting to the server...".to_string(),
            },
            ClientAction::Render,
        ])
    }

    fn handle_disconnect(&mut self) -> Vec<ClientAction> {
        let Some(session) = self.session.take() else {
            // Already disconnected: no error, no duplicate teardown.
            return vec![];
        };

        let mut actions = Vec::new();
        if !session.released {
            actions.push(ClientAction::CloseTransport { generation: session.generation });
        }
        match self.status {
            ConnectionStatus::Connecting => actions.push(ClientAction::Notify {
                level: NotifyLevel::Notice,
                message: "Connection attempt cancelled.".to_string(),
            }),
            ConnectionStatus::Connected => actions.push(ClientAction::Notify {
                level: NotifyLevel::Notice,
                message: "Disconnected from the server.".to_string(),
            }),
            // From Error the handle is already released; this is a status
            // reset only.
            ConnectionStatus::Disconnected | ConnectionStatus::Error => {},
        }

        self.status = ConnectionStatus::Disconnected;
        self.stream.reset();
        actions.push(ClientAction::Render);
        actions
    }

    fn handle_send(
        &mut self,
        text: &str,
        room_id: String,
    ) -> Result<Vec<ClientAction>, ClientError> {
        if text.trim().is_empty() {
            return Err(ClientError::EmptyMessage);
        }

        if self.status != ConnectionStatus::Connected {
            // Send while not connected means the UI believes in a session
            // that does not exist. Tear down rather than leave the state
            // ambiguous.
            let mut actions = vec![ClientAction::Notify {
                level: NotifyLevel::Error,
                message: "Chat transport is not connected.".to_string(),
            }];
            if let Some(session) = self.session.take()
                && !session.released
            {
                actions.push(ClientAction::CloseTransport { generation: session.generation });
            }
            self.status = ConnectionStatus::Disconnected;
            self.stream.reset();
            actions.push(ClientAction::Render);
            return Ok(actions);
        }

        let body = serde_json::to_string(&OutgoingMessage::text(text))
            .map_err(|e| ClientError::Codec { reason: e.to_string() })?;

        Ok(vec![ClientAction::Publish {
            destination: routes::SEND_DESTINATION.to_string(),
            room_id,
            body,
        }])
    }

    fn handle_transport_up(&mut self, generation: Generation) -> Vec<ClientAction> {
        let Some(session) = self.session.as_ref() else {
            return vec![stale("transport-up", generation)];
        };
        if session.generation != generation || self.status != ConnectionStatus::Connecting {
            return vec![stale("transport-up", generation)];
        }

        let room_id = session.room_id.clone();
        self.status = ConnectionStatus::Connected;

        vec![
            ClientAction::Subscribe { generation, topic: routes::room_topic(&room_id) },
            ClientAction::FetchHistory { generation, room_id: room_id.clone() },
            ClientAction::Notify {
                level: NotifyLevel::Notice,
                message: format!("Connected to room {room_id}!"),
            },
            ClientAction::Render,
        ]
    }

    fn handle_transport_error(
        &mut self,
        generation: Generation,
        reason: &str,
    ) -> Vec<ClientAction> {
        let Some(session) = self.session.as_mut() else {
            return vec![stale("transport-error", generation)];
        };
        if session.generation != generation {
            return vec![stale("transport-error", generation)];
        }

        let mut actions = Vec::new();
        if !session.released {
            session.released = true;
            actions.push(ClientAction::CloseTransport { generation });
        }
        self.status = ConnectionStatus::Error;
        actions.push(ClientAction::Notify {
            level: NotifyLevel::Error,
            message: format!("Connection error: {reason}"),
        });
        actions.push(ClientAction::Render);
        actions
    }

    fn handle_transport_closed(&mut self, generation: Generation) -> Vec<ClientAction> {
        let matches_current =
            self.session.as_ref().is_some_and(|s| s.generation == generation);
        if !matches_current {
            return vec![stale("transport-closed", generation)];
        }

        // The transport itself went away; release the handle if the session
        // still held it so no live connection leaks.
        let mut actions = Vec::new();
        if let Some(session) = self.session.take()
            && !session.released
        {
            actions.push(ClientAction::CloseTransport { generation });
        }
        if self.status == ConnectionStatus::Connected {
            actions.push(ClientAction::Notify {
                level: NotifyLevel::Notice,
                message: "Disconnected from the server.".to_string(),
            });
        }
        self.status = ConnectionStatus::Disconnected;
        self.stream.reset();
        actions.push(ClientAction::Render);
        actions
    }

    fn handle_delivery(&mut self, generation: Generation, body: &str) -> Vec<ClientAction> {
        let live = self.session.as_ref().is_some_and(|s| s.generation == generation)
            && self.status == ConnectionStatus::Connected;
        if !live {
            return vec![stale("delivery", generation)];
        }

        match serde_json::from_str::<ChatMessage>(body) {
            Ok(message) => {
                self.stream.append_live(message);
                vec![ClientAction::Render]
            },
            Err(e) => vec![ClientAction::Log {
                message: format!("dropping malformed message frame: {e}"),
            }],
        }
    }

    fn handle_history_loaded(
        &mut self,
        generation: Generation,
        messages: Vec<ChatMessage>,
    ) -> Vec<ClientAction> {
        let live = self.session.as_ref().is_some_and(|s| s.generation == generation)
            && self.status == ConnectionStatus::Connected;
        if !live {
            return vec![stale("history result", generation)];
        }

        // Snapshot load: replaces whatever is materialized, including live
        // messages that raced ahead of the history response.
        self.stream.replace_history(messages);
        vec![ClientAction::Render]
    }

    fn handle_history_failed(&mut self, generation: Generation, reason: &str) -> Vec<ClientAction> {
        let matches_current =
            self.session.as_ref().is_some_and(|s| s.generation == generation);
        if !matches_current {
            return vec![stale("history failure", generation)];
        }

        // Recoverable: keep whatever the stream already has.
        vec![ClientAction::Notify {
            level: NotifyLevel::Warning,
            message: format!("Failed to load previous messages: {reason}"),
        }]
    }
}

/// Log action for an event whose generation no longer matches the owned
/// session.
fn stale(kind: &str, generation: Generation) -> ClientAction {
    ClientAction::Log { message: format!("ignoring stale {kind} for generation {generation}") }
}

#[cfg(test)]
#[allow(clippy::unwrap_used)]
mod tests {
    use super::*;

    fn client() -> ChatClient {
        ChatClient::new(ClientConfig::new("ws://localhost:8080/api/v1/ws"))
    }

    fn connected_client(room_id: &str) -> ChatClient {
        let mut c = client();
        let _ = c.handle(ClientEvent::Connect { room_id: room_id.into() }).unwrap();
        let generation = c.generation();
        let _ = c.handle(ClientEvent::TransportUp { generation }).unwrap();
        c
    }

    #[test]
    fn connect_rejects_blank_room_id() {
        let mut c = client();
        for room_id in ["", "   ", "\t\n"] {
            let err = c.handle(ClientEvent::Connect { room_id: room_id.into() }).unwrap_err();
            assert_eq!(err, ClientError::EmptyRoomId);
            assert_eq!(c.status(), ConnectionStatus::Disconnected);
            assert_eq!(c.generation(), 0, "no transport open attempted");
        }
    }

    #[test]
    fn connect_opens_transport_and_moves_to_connecting() {
        let mut c = client();
        let actions = c.handle(ClientEvent::Connect { room_id: "42".into() }).unwrap();

        assert_eq!(c.status(), ConnectionStatus::Connecting);
        assert_eq!(c.room_id(), Some("42"));
        assert!(matches!(
            actions.first(),
            Some(ClientAction::OpenTransport { generation: 1, room_id, .. }) if room_id == "42"
        ));
    }

    #[test]
    fn connect_rejects_overlapping_attempts() {
        let mut c = client();
        let _ = c.handle(ClientEvent::Connect { room_id: "42".into() }).unwrap();

        let err = c.handle(ClientEvent::Connect { room_id: "43".into() }).unwrap_err();
        assert_eq!(err, ClientError::SessionActive { status: ConnectionStatus::Connecting });
        assert_eq!(c.room_id(), Some("42"), "no state change on rejection");
    }

    #[test]
    fn transport_up_subscribes_and_fetches_history() {
        let mut c = client();
        let _ = c.handle(ClientEvent::Connect { room_id: "42".into() }).unwrap();
        let actions = c.handle(ClientEvent::TransportUp { generation: 1 }).unwrap();

        assert_eq!(c.status(), ConnectionStatus::Connected);
        assert!(actions.iter().any(|a| matches!(
            a,
            ClientAction::Subscribe { topic, .. } if topic == "/api/v1/chat/topic/42"
        )));
        assert!(actions.iter().any(|a| matches!(
            a,
            ClientAction::FetchHistory { room_id, .. } if room_id == "42"
        )));
    }

    #[test]
    fn late_transport_up_does_not_resurrect_cancelled_session() {
        let mut c = client();
        let _ = c.handle(ClientEvent::Connect { room_id: "42".into() }).unwrap();
        let actions = c.handle(ClientEvent::Disconnect).unwrap();
        assert!(actions.contains(&ClientAction::CloseTransport { generation: 1 }));
        assert_eq!(c.status(), ConnectionStatus::Disconnected);

        let actions = c.handle(ClientEvent::TransportUp { generation: 1 }).unwrap();
        assert_eq!(c.status(), ConnectionStatus::Disconnected);
        assert!(matches!(actions.as_slice(), [ClientAction::Log { .. }]));
    }

    #[test]
    fn transport_error_releases_handle_once() {
        let mut c = connected_client("42");
        let actions = c
            .handle(ClientEvent::TransportError { generation: 1, reason: "broken pipe".into() })
            .unwrap();

        assert_eq!(c.status(), ConnectionStatus::Error);
        assert!(actions.contains(&ClientAction::CloseTransport { generation: 1 }));

        // A later disconnect must not release the same handle again.
        let actions = c.handle(ClientEvent::Disconnect).unwrap();
        assert!(!actions.iter().any(|a| matches!(a, ClientAction::CloseTransport { .. })));
        assert_eq!(c.status(), ConnectionStatus::Disconnected);
    }

    #[test]
    fn connect_allowed_again_from_error_state() {
        let mut c = connected_client("42");
        let _ = c
            .handle(ClientEvent::TransportError { generation: 1, reason: "boom".into() })
            .unwrap();

        let actions = c.handle(ClientEvent::Connect { room_id: "42".into() }).unwrap();
        assert!(matches!(
            actions.first(),
            Some(ClientAction::OpenTransport { generation: 2, .. })
        ));
        assert_eq!(c.status(), ConnectionStatus::Connecting);
    }

    #[test]
    fn remote_close_resets_status_and_releases() {
        let mut c = connected_client("42");
        let actions = c.handle(ClientEvent::TransportClosed { generation: 1 }).unwrap();

        assert_eq!(c.status(), ConnectionStatus::Disconnected);
        assert!(actions.contains(&ClientAction::CloseTransport { generation: 1 }));
        assert!(c.messages().is_empty());
    }

    #[test]
    fn disconnect_twice_is_a_noop() {
        let mut c = connected_client("42");
        let first = c.handle(ClientEvent::Disconnect).unwrap();
        assert!(first.contains(&ClientAction::CloseTransport { generation: 1 }));

        let second = c.handle(ClientEvent::Disconnect).unwrap();
        assert!(second.is_empty());
        assert_eq!(c.status(), ConnectionStatus::Disconnected);
    }

    #[test]
    fn send_publishes_to_room_agnostic_destination() {
        let mut c = connected_client("42");
        let actions =
            c.handle(ClientEvent::Send { text: "hi".into(), room_id: "42".into() }).unwrap();

        assert_eq!(actions.len(), 1);
        assert!(matches!(
            &actions[0],
            ClientAction::Publish { destination, room_id, body }
                if destination == "/api/v1/chat/app/send"
                    && room_id == "42"
                    && body == r#"{"content":"hi","attachmentId":0}"#
        ));
    }

    #[test]
    fn send_rejects_blank_text() {
        let mut c = connected_client("42");
        let err =
            c.handle(ClientEvent::Send { text: "  ".into(), room_id: "42".into() }).unwrap_err();
        assert_eq!(err, ClientError::EmptyMessage);
        assert_eq!(c.status(), ConnectionStatus::Connected);
    }

    #[test]
    fn send_while_disconnected_forces_teardown() {
        let mut c = client();
        let actions =
            c.handle(ClientEvent::Send { text: "hi".into(), room_id: "42".into() }).unwrap();

        assert_eq!(c.status(), ConnectionStatus::Disconnected);
        assert!(!actions.iter().any(|a| matches!(a, ClientAction::Publish { .. })));
        assert!(actions.iter().any(|a| matches!(
            a,
            ClientAction::Notify { level: NotifyLevel::Error, .. }
        )));
    }

    #[test]
    fn send_while_connecting_tears_down_the_stale_session() {
        let mut c = client();
        let _ = c.handle(ClientEvent::Connect { room_id: "42".into() }).unwrap();

        let actions =
            c.handle(ClientEvent::Send { text: "hi".into(), room_id: "42".into() }).unwrap();

        assert_eq!(c.status(), ConnectionStatus::Disconnected);
        assert!(actions.contains(&ClientAction::CloseTransport { generation: 1 }));
    }

    #[test]
    fn delivery_appends_in_arrival_order() {
        let mut c = connected_client("42");
        for body in [r#"{"sender":"kim","content":"one"}"#, r#"{"sender":"lee","content":"two"}"#]
        {
            let _ = c.handle(ClientEvent::Delivery { generation: 1, body: body.into() }).unwrap();
        }

        let contents: Vec<&str> = c.messages().iter().map(|m| m.content.as_str()).collect();
        assert_eq!(contents, ["one", "two"]);
    }

    #[test]
    fn malformed_delivery_is_dropped_with_a_log() {
        let mut c = connected_client("42");
        let actions =
            c.handle(ClientEvent::Delivery { generation: 1, body: "not json".into() }).unwrap();

        assert!(matches!(actions.as_slice(), [ClientAction::Log { .. }]));
        assert!(c.messages().is_empty());
    }

    #[test]
    fn history_failure_keeps_stream_and_status() {
        let mut c = connected_client("42");
        let _ = c.handle(ClientEvent::Delivery {
            generation: 1,
            body: r#"{"sender":"kim","content":"live"}"#.into(),
        });

        let actions = c
            .handle(ClientEvent::HistoryFailed { generation: 1, reason: "503".into() })
            .unwrap();

        assert_eq!(c.status(), ConnectionStatus::Connected);
        assert_eq!(c.messages().len(), 1);
        assert!(matches!(
            actions.as_slice(),
            [ClientAction::Notify { level: NotifyLevel::Warning, .. }]
        ));
    }

    #[test]
    fn stale_history_result_is_discarded_after_room_switch() {
        let mut c = connected_client("42");
        let _ = c.handle(ClientEvent::Disconnect).unwrap();
        let _ = c.handle(ClientEvent::Connect { room_id: "7".into() }).unwrap();
        let _ = c.handle(ClientEvent::TransportUp { generation: 2 }).unwrap();

        // Room 42's history resolves late; it must not bleed into room 7.
        let actions = c
            .handle(ClientEvent::HistoryLoaded {
                generation: 1,
                messages: vec![ChatMessage::text("old", "stale")],
            })
            .unwrap();

        assert!(matches!(actions.as_slice(), [ClientAction::Log { .. }]));
        assert!(c.messages().is_empty());
    }
}
