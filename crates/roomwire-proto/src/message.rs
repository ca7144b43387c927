//! JSON chat payload shapes.
//!
//! Messages ride as JSON in `MESSAGE`/`SEND` frame bodies and in the
//! history endpoint's response envelope. The receive and send shapes
//! differ: the server attributes `sender` from the authenticated session,
//! so the client never sends it.

use serde::{Deserialize, Serialize};

/// Sentinel attachment id meaning "no attachment".
pub const NO_ATTACHMENT: i64 = 0;

/// A chat message as delivered to the client.
///
/// Ordering key is arrival order; the wire carries no timestamp.
/// Immutable once received.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ChatMessage {
    /// Display name of the sender, attributed by the server.
    pub sender: String,

    /// Message text.
    pub content: String,

    /// Attachment reference; [`NO_ATTACHMENT`] when absent. Live frames
    /// omit the field entirely, so it defaults on decode.
    #[serde(rename = "attachmentId", default)]
    pub attachment_id: i64,
}

impl ChatMessage {
    /// Create a text-only message (no attachment).
    #[must_use]
    pub fn text(sender: impl Into<String>, content: impl Into<String>) -> Self {
        Self { sender: sender.into(), content: content.into(), attachment_id: NO_ATTACHMENT }
    }
}

/// A chat message as published by the client.
///
/// No `sender` field: the server fills it in from the session.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct OutgoingMessage {
    /// Message text.
    pub content: String,

    /// Attachment reference; [`NO_ATTACHMENT`] for plain text.
    #[serde(rename = "attachmentId")]
    pub attachment_id: i64,
}

impl OutgoingMessage {
    /// Create a text-only outgoing message.
    #[must_use]
    pub fn text(content: impl Into<String>) -> Self {
        Self { content: content.into(), attachment_id: NO_ATTACHMENT }
    }
}

/// Envelope returned by the history endpoint.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct HistoryResponse {
    /// Service status code (distinct from the HTTP status).
    pub code: i64,

    /// Human-readable status message.
    pub message: String,

    /// Persisted messages, oldest first.
    pub data: Vec<ChatMessage>,
}

#[cfg(test)]
#[allow(clippy::unwrap_used)]
mod tests {
    use super::*;

    #[test]
    fn chat_message_decodes_without_attachment_id() {
        let msg: ChatMessage =
            serde_json::from_str(r#"{"sender":"kim","content":"hi"}"#).unwrap();

        assert_eq!(msg, ChatMessage::text("kim", "hi"));
        assert_eq!(msg.attachment_id, NO_ATTACHMENT);
    }

    #[test]
    fn outgoing_message_uses_wire_field_names() {
        let json = serde_json::to_string(&OutgoingMessage::text("hi")).unwrap();
        assert_eq!(json, r#"{"content":"hi","attachmentId":0}"#);
    }

    #[test]
    fn history_envelope_decodes() {
        let json = r#"{
            "code": 200,
            "message": "ok",
            "data": [
                {"sender": "kim", "content": "first", "attachmentId": 0},
                {"sender": "lee", "content": "second", "attachmentId": 7}
            ]
        }"#;
        let resp: HistoryResponse = serde_json::from_str(json).unwrap();

        assert_eq!(resp.data.len(), 2);
        assert_eq!(resp.data[1].attachment_id, 7);
    }
}
