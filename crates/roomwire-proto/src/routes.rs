//! Topic, destination, and URL naming conventions.
//!
//! Subscriptions are room-scoped (the topic path embeds the room id), but
//! the send destination is room-agnostic: the room id rides in the
//! [`ROOM_ID_HEADER`] header on `SEND` frames, so the destination string
//! never changes between rooms.

/// Header carrying the room id on `CONNECT` and `SEND` frames.
pub const ROOM_ID_HEADER: &str = "roomId";

/// Room-agnostic destination for publishing chat messages.
pub const SEND_DESTINATION: &str = "/api/v1/chat/app/send";

/// Topic a room's messages are broadcast on.
#[must_use]
pub fn room_topic(room_id: &str) -> String {
    format!("/api/v1/chat/topic/{room_id}")
}

/// WebSocket endpoint for the chat transport.
#[must_use]
pub fn ws_endpoint(base: &str) -> String {
    format!("{}/api/v1/ws", base.trim_end_matches('/'))
}

/// History endpoint for a room's persisted messages.
#[must_use]
pub fn history_url(base: &str, room_id: &str) -> String {
    format!("{}/api/v1/chat/mentor/message/{room_id}", base.trim_end_matches('/'))
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn topic_is_room_scoped() {
        assert_eq!(room_topic("42"), "/api/v1/chat/topic/42");
    }

    #[test]
    fn urls_tolerate_trailing_slash() {
        assert_eq!(ws_endpoint("ws://localhost:8080/"), "ws://localhost:8080/api/v1/ws");
        assert_eq!(
            history_url("http://localhost:8080", "42"),
            "http://localhost:8080/api/v1/chat/mentor/message/42"
        );
    }
}
