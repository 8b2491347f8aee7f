//! WebSocket message protocol definitions.
//!
//! All messages are JSON-encoded and use snake_case for field names.

use serde::{Deserialize, Serialize};
use waitlist_engine::{RecordId, ScopeId, Timestamp};

/// Messages sent from client to server.
#[derive(Debug, Deserialize)]
#[serde(tag = "type", rename_all = "snake_case")]
pub enum ClientMessage {
    /// Keep-alive ping.
    Ping,
}

/// Messages sent from server to client.
#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(tag = "type", rename_all = "snake_case")]
pub enum ServerMessage {
    /// An entry of the subscribed queue was created or updated.
    EntryChanged {
        queue_id: ScopeId,
        entry_id: RecordId,
        #[serde(with = "waitlist_engine::clock::iso8601")]
        updated_at: Option<Timestamp>,
    },

    /// Response to ping.
    Pong,

    /// Error message.
    Error {
        /// Error description
        message: String,
    },
}

impl ServerMessage {
    /// Create an error message.
    pub fn error(message: impl Into<String>) -> Self {
        ServerMessage::Error {
            message: message.into(),
        }
    }

    /// Create an entry_changed notification.
    pub fn entry_changed(queue_id: ScopeId, entry_id: RecordId, updated_at: Option<Timestamp>) -> Self {
        ServerMessage::EntryChanged {
            queue_id,
            entry_id,
            updated_at,
        }
    }
}
