//! Ordered message view for the current session.
//!
//! The stream is the UI-facing sequence of messages for the connected
//! room: a history snapshot loaded once per session, followed by live
//! appends in arrival order. Live messages are not deduplicated against
//! history; the protocol carries no timestamps or message ids, so arrival
//! order is the only ordering key.
//!
//! A history load *replaces* the whole sequence. Live messages that arrive
//! between the connect callback and the history response are therefore
//! dropped by the replacement. This is documented current behavior, kept
//! as-is pending product clarification rather than silently merged.

use roomwire_proto::ChatMessage;

/// Ordered sequence of messages materialized for the current room.
#[derive(Debug, Clone, Default)]
pub struct MessageStream {
    messages: Vec<ChatMessage>,
}

impl MessageStream {
    /// Create an empty stream.
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Append a live-delivered message at the end.
    pub fn append_live(&mut self, message: ChatMessage) {
        self.messages.push(message);
    }

    /// Replace the whole sequence with a history snapshot.
    pub fn replace_history(&mut self, messages: Vec<ChatMessage>) {
        self.messages = messages;
    }

    /// Clear the sequence. Called on teardown and when switching rooms so
    /// stale messages never bleed into a new session's view.
    pub fn reset(&mut self) {
        self.messages.clear();
    }

    /// Current ordered contents.
    #[must_use]
    pub fn messages(&self) -> &[ChatMessage] {
        &self.messages
    }

    /// Number of messages currently materialized.
    #[must_use]
    pub fn len(&self) -> usize {
        self.messages.len()
    }

    /// Whether the stream is empty.
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.messages.is_empty()
    }
}
