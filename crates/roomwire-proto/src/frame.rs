//! STOMP-subset text frame model.
//!
//! A frame on the wire looks like:
//!
//! ```text
//! COMMAND\n
//! header:value\n
//! ...\n
//! \n
//! <body>\0
//! ```
//!
//! A bare `\n` outside a frame is a heartbeat, not a frame; the transport
//! filters heartbeats before calling [`Frame::parse`].
//!
//! # Invariants
//!
//! - Round-trip: `Frame::parse(&frame.encode())` must reproduce the frame.
//! - Header order is preserved; lookup returns the first match, as STOMP
//!   requires.

use std::time::Duration;

use crate::errors::ProtocolError;

/// A single newline, sent on its own as a connection heartbeat.
pub const HEARTBEAT_FRAME: &str = "\n";

/// Frame commands used by the chat protocol.
///
/// Client-originated: `CONNECT`, `SUBSCRIBE`, `UNSUBSCRIBE`, `SEND`,
/// `DISCONNECT`. Server-originated: `CONNECTED`, `MESSAGE`, `RECEIPT`,
/// `ERROR`.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Command {
    /// Open a session (client -> server).
    Connect,
    /// Session accepted (server -> client).
    Connected,
    /// Subscribe to a topic (client -> server).
    Subscribe,
    /// Cancel a subscription (client -> server).
    Unsubscribe,
    /// Publish a message to a destination (client -> server).
    Send,
    /// Deliver a published message to a subscriber (server -> client).
    Message,
    /// Close the session (client -> server).
    Disconnect,
    /// Acknowledge a receipt-requested frame (server -> client).
    Receipt,
    /// Protocol-level error; the server closes the connection after this
    /// frame (server -> client).
    Error,
}

impl Command {
    /// Wire spelling of the command.
    #[must_use]
    pub fn as_str(self) -> &'static str {
        match self {
            Self::Connect => "CONNECT",
            Self::Connected => "CONNECTED",
            Self::Subscribe => "SUBSCRIBE",
            Self::Unsubscribe => "UNSUBSCRIBE",
            Self::Send => "SEND",
            Self::Message => "MESSAGE",
            Self::Disconnect => "DISCONNECT",
            Self::Receipt => "RECEIPT",
            Self::Error => "ERROR",
        }
    }

    /// Parse a command line.
    fn from_line(line: &str) -> Result<Self, ProtocolError> {
        match line {
            "CONNECT" => Ok(Self::Connect),
            "CONNECTED" => Ok(Self::Connected),
            "SUBSCRIBE" => Ok(Self::Subscribe),
            "UNSUBSCRIBE" => Ok(Self::Unsubscribe),
            "SEND" => Ok(Self::Send),
            "MESSAGE" => Ok(Self::Message),
            "DISCONNECT" => Ok(Self::Disconnect),
            "RECEIPT" => Ok(Self::Receipt),
            "ERROR" => Ok(Self::Error),
            other => Err(ProtocolError::UnknownCommand(other.to_string())),
        }
    }
}

/// Negotiated heartbeat intervals, milliseconds per direction.
///
/// `outgoing_ms` is how often we promise to send data (or a bare newline);
/// `incoming_ms` is how often we expect to hear from the peer. `0` disables
/// a direction.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct HeartBeat {
    /// Interval at which this side sends heartbeats.
    pub outgoing_ms: u64,
    /// Interval at which this side expects heartbeats.
    pub incoming_ms: u64,
}

impl HeartBeat {
    /// Same interval in both directions.
    #[must_use]
    pub fn symmetric(interval: Duration) -> Self {
        let ms = u64::try_from(interval.as_millis()).unwrap_or(u64::MAX);
        Self { outgoing_ms: ms, incoming_ms: ms }
    }

    /// Heartbeats disabled in both directions.
    #[must_use]
    pub fn disabled() -> Self {
        Self { outgoing_ms: 0, incoming_ms: 0 }
    }

    /// Format as a `heart-beat` header value (`"4000,4000"`).
    #[must_use]
    pub fn header_value(&self) -> String {
        format!("{},{}", self.outgoing_ms, self.incoming_ms)
    }

    /// Effective intervals after the CONNECT/CONNECTED exchange.
    ///
    /// Per direction, heartbeats are enabled only when both sides enable
    /// it, and the slower interval wins.
    #[must_use]
    pub fn negotiate(self, server: HeartBeat) -> HeartBeat {
        fn direction(ours: u64, theirs: u64) -> u64 {
            if ours == 0 || theirs == 0 { 0 } else { ours.max(theirs) }
        }
        HeartBeat {
            outgoing_ms: direction(self.outgoing_ms, server.incoming_ms),
            incoming_ms: direction(self.incoming_ms, server.outgoing_ms),
        }
    }

    /// Parse a `heart-beat` header value.
    pub fn parse(value: &str) -> Result<Self, ProtocolError> {
        let malformed = || ProtocolError::MalformedHeartBeat(value.to_string());
        let (out_ms, in_ms) = value.split_once(',').ok_or_else(malformed)?;
        Ok(Self {
            outgoing_ms: out_ms.trim().parse().map_err(|_| malformed())?,
            incoming_ms: in_ms.trim().parse().map_err(|_| malformed())?,
        })
    }
}

/// A complete protocol frame: command, headers, body.
///
/// Pure data holder; construction helpers cover the frames the client
/// emits, [`Frame::parse`] covers the frames the server emits.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Frame {
    /// Frame command.
    pub command: Command,
    /// Headers in wire order. Duplicates allowed; first wins on lookup.
    pub headers: Vec<(String, String)>,
    /// Frame body. Empty for most client frames.
    pub body: String,
}

impl Frame {
    /// Create a frame with no headers and an empty body.
    #[must_use]
    pub fn new(command: Command) -> Self {
        Self { command, headers: Vec::new(), body: String::new() }
    }

    /// Append a header.
    #[must_use]
    pub fn with_header(mut self, name: impl Into<String>, value: impl Into<String>) -> Self {
        self.headers.push((name.into(), value.into()));
        self
    }

    /// Set the body.
    #[must_use]
    pub fn with_body(mut self, body: impl Into<String>) -> Self {
        self.body = body.into();
        self
    }

    /// First header with the given name. `None` if absent.
    #[must_use]
    pub fn header(&self, name: &str) -> Option<&str> {
        self.headers.iter().find(|(n, _)| n == name).map(|(_, v)| v.as_str())
    }

    /// Build the `CONNECT` frame for a room session.
    ///
    /// Carries the room id as a connect header so the server can
    /// authorize the session against the room up front.
    #[must_use]
    pub fn connect(room_id: &str, heart_beat: HeartBeat) -> Self {
        Self::new(Command::Connect)
            .with_header("accept-version", "1.2")
            .with_header("heart-beat", heart_beat.header_value())
            .with_header(crate::routes::ROOM_ID_HEADER, room_id)
    }

    /// Build a `SUBSCRIBE` frame for a topic.
    #[must_use]
    pub fn subscribe(id: &str, destination: &str) -> Self {
        Self::new(Command::Subscribe)
            .with_header("id", id)
            .with_header("destination", destination)
    }

    /// Build a `SEND` frame carrying a JSON chat body.
    ///
    /// The destination is room-agnostic; the room id rides in a header.
    #[must_use]
    pub fn send_message(destination: &str, room_id: &str, body: impl Into<String>) -> Self {
        Self::new(Command::Send)
            .with_header("destination", destination)
            .with_header(crate::routes::ROOM_ID_HEADER, room_id)
            .with_header("content-type", "application/json")
            .with_body(body)
    }

    /// Build the `DISCONNECT` frame.
    #[must_use]
    pub fn disconnect() -> Self {
        Self::new(Command::Disconnect)
    }

    /// Encode into wire text, including the NUL terminator.
    #[must_use]
    pub fn encode(&self) -> String {
        let mut out = String::with_capacity(64 + self.body.len());
        out.push_str(self.command.as_str());
        out.push('\n');
        for (name, value) in &self.headers {
            out.push_str(name);
            out.push(':');
            out.push_str(value);
            out.push('\n');
        }
        out.push('\n');
        out.push_str(&self.body);
        out.push('\0');
        out
    }

    /// Parse wire text into a frame.
    ///
    /// # Errors
    ///
    /// - [`ProtocolError::UnterminatedFrame`] without a NUL terminator
    /// - [`ProtocolError::UnknownCommand`] for an unrecognized command line
    /// - [`ProtocolError::MalformedHeader`] for a header line without `:`
    pub fn parse(text: &str) -> Result<Self, ProtocolError> {
        let text = text.strip_suffix('\0').ok_or(ProtocolError::UnterminatedFrame)?;

        // Head and body are separated by the first blank line.
        let (head, body) = match text.split_once("\n\n").or_else(|| text.split_once("\r\n\r\n")) {
            Some((head, body)) => (head, body),
            None => (text, ""),
        };

        let mut lines = head.lines();
        let command_line = lines.next().unwrap_or("").trim_end_matches('\r');
        let command = Command::from_line(command_line)?;

        let mut headers = Vec::new();
        for line in lines {
            let line = line.trim_end_matches('\r');
            if line.is_empty() {
                continue;
            }
            let (name, value) = line
                .split_once(':')
                .ok_or_else(|| ProtocolError::MalformedHeader(line.to_string()))?;
            headers.push((name.to_string(), value.to_string()));
        }

        Ok(Self { command, headers, body: body.to_string() })
    }
}

#[cfg(test)]
#[allow(clippy::unwrap_used)]
mod tests {
    use super::*;

    #[test]
    fn connect_frame_round_trips() {
        let frame = Frame::connect("42", HeartBeat::symmetric(Duration::from_secs(4)));
        let parsed = Frame::parse(&frame.encode()).unwrap();

        assert_eq!(parsed, frame);
        assert_eq!(parsed.header("roomId"), Some("42"));
        assert_eq!(parsed.header("heart-beat"), Some("4000,4000"));
    }

    #[test]
    fn parses_message_frame_with_body() {
        let text = "MESSAGE\ndestination:/api/v1/chat/topic/42\nsubscription:sub-0\n\n{\"sender\":\"kim\",\"content\":\"hi\"}\0";
        let frame = Frame::parse(text).unwrap();

        assert_eq!(frame.command, Command::Message);
        assert_eq!(frame.header("destination"), Some("/api/v1/chat/topic/42"));
        assert_eq!(frame.body, "{\"sender\":\"kim\",\"content\":\"hi\"}");
    }

    #[test]
    fn parses_crlf_line_endings() {
        let text = "CONNECTED\r\nversion:1.2\r\n\r\n\0";
        let frame = Frame::parse(text).unwrap();

        assert_eq!(frame.command, Command::Connected);
        assert_eq!(frame.header("version"), Some("1.2"));
    }

    #[test]
    fn rejects_unknown_command() {
        let err = Frame::parse("GREET\n\n\0").unwrap_err();
        assert_eq!(err, ProtocolError::UnknownCommand("GREET".to_string()));
    }

    #[test]
    fn rejects_missing_terminator() {
        let err = Frame::parse("CONNECT\n\n").unwrap_err();
        assert_eq!(err, ProtocolError::UnterminatedFrame);
    }

    #[test]
    fn rejects_header_without_separator() {
        let err = Frame::parse("CONNECTED\nversion\n\n\0").unwrap_err();
        assert_eq!(err, ProtocolError::MalformedHeader("version".to_string()));
    }

    #[test]
    fn first_header_wins_on_duplicate() {
        let frame = Frame::new(Command::Send)
            .with_header("destination", "/a")
            .with_header("destination", "/b");

        assert_eq!(frame.header("destination"), Some("/a"));
    }

    #[test]
    fn heart_beat_parse_and_format() {
        let hb = HeartBeat::parse("4000,0").unwrap();
        assert_eq!(hb, HeartBeat { outgoing_ms: 4000, incoming_ms: 0 });
        assert_eq!(hb.header_value(), "4000,0");

        assert!(HeartBeat::parse("4000").is_err());
        assert!(HeartBeat::parse("a,b").is_err());
    }

    #[test]
    fn heart_beat_negotiation_takes_the_slower_side() {
        let ours = HeartBeat { outgoing_ms: 4000, incoming_ms: 4000 };
        let server = HeartBeat { outgoing_ms: 10_000, incoming_ms: 2000 };

        assert_eq!(
            ours.negotiate(server),
            HeartBeat { outgoing_ms: 4000, incoming_ms: 10_000 }
        );

        // A 0 on either side disables the direction.
        assert_eq!(ours.negotiate(HeartBeat::disabled()), HeartBeat::disabled());
        assert_eq!(HeartBeat::disabled().negotiate(ours), HeartBeat::disabled());
    }

    #[test]
    fn send_frame_keeps_destination_room_agnostic() {
        let frame = Frame::send_message("/api/v1/chat/app/send", "42", "{}");

        assert_eq!(frame.header("destination"), Some("/api/v1/chat/app/send"));
        assert_eq!(frame.header("roomId"), Some("42"));
    }
}
