//! HTTP loader for a room's persisted messages.
//!
//! External collaborator to the session state machine: given a room id,
//! fetches the finite ordered sequence of messages persisted before the
//! session subscribed. Failures are recoverable - the caller feeds them
//! back as [`crate::ClientEvent::HistoryFailed`] and the session keeps
//! whatever it already has.

use roomwire_proto::{ChatMessage, HistoryResponse, routes};
use thiserror::Error;

/// History fetch errors.
#[derive(Debug, Error)]
pub enum HistoryError {
    /// Request failed to complete, or the response body did not decode as
    /// the history envelope.
    #[error("history request failed: {0}")]
    Request(#[from] reqwest::Error),

    /// The server answered with a non-success status.
    #[error("history request returned status {status}")]
    Status {
        /// HTTP status code.
        status: u16,
    },
}

/// Loader for a room's message history.
#[derive(Debug, Clone)]
pub struct HistoryLoader {
    base_url: String,
    http: reqwest::Client,
}

impl HistoryLoader {
    /// Create a loader against the chat service's base URL.
    #[must_use]
    pub fn new(base_url: impl Into<String>) -> Self {
        Self { base_url: base_url.into(), http: reqwest::Client::new() }
    }

    /// Fetch a room's persisted messages, oldest first.
    pub async fn fetch(&self, room_id: &str) -> Result<Vec<ChatMessage>, HistoryError> {
        let url = routes::history_url(&self.base_url, room_id);
        let response = self.http.get(&url).send().await?;

        let status = response.status();
        if !status.is_success() {
            return Err(HistoryError::Status { status: status.as_u16() });
        }

        let envelope: HistoryResponse = response.json().await?;
        Ok(envelope.data)
    }
}
