//! WebSocket connection manager.
//!
//! Tracks subscribers per queue and fans change notifications out to them.

use std::sync::Arc;

use dashmap::DashMap;
use tokio::sync::mpsc;
use waitlist_engine::ScopeId;

use super::ServerMessage;

/// Sender for WebSocket messages.
pub type MessageSender = mpsc::UnboundedSender<ServerMessage>;

/// A single WebSocket connection.
#[derive(Debug)]
pub struct Connection {
    /// Unique identifier for this connection
    pub id: String,
    /// Queue the connection subscribed to
    pub queue_id: ScopeId,
    /// Channel to send messages to this connection
    pub sender: MessageSender,
}

/// Manages active WebSocket connections.
///
/// Thread-safe and can be shared across handlers via `Arc`.
#[derive(Debug, Default)]
pub struct ConnectionManager {
    /// All active connections, keyed by connection ID.
    connections: DashMap<String, Connection>,
    /// Connection IDs subscribed to each queue.
    by_queue: DashMap<ScopeId, Vec<String>>,
}

impl ConnectionManager {
    /// Create a new connection manager.
    pub fn new() -> Self {
        Self::default()
    }

    /// Create a new connection manager wrapped in Arc for sharing.
    pub fn new_shared() -> Arc<Self> {
        Arc::new(Self::new())
    }

    /// Register a subscriber of a queue.
    ///
    /// Returns the connection ID.
    pub fn register(&self, queue_id: ScopeId, sender: MessageSender) -> String {
        let conn_id = uuid::Uuid::new_v4().to_string();

        self.connections.insert(
            conn_id.clone(),
            Connection {
                id: conn_id.clone(),
                queue_id,
                sender,
            },
        );
        self.by_queue
            .entry(queue_id)
            .or_default()
            .push(conn_id.clone());

        tracing::info!(conn_id = %conn_id, queue_id, "WebSocket connection registered");

        conn_id
    }

    /// Unregister a connection.
    pub fn unregister(&self, conn_id: &str) {
        if let Some((_, conn)) = self.connections.remove(conn_id) {
            if let Some(mut conn_ids) = self.by_queue.get_mut(&conn.queue_id) {
                conn_ids.retain(|id| id != conn_id);
                if conn_ids.is_empty() {
                    drop(conn_ids);
                    self.by_queue.remove(&conn.queue_id);
                }
            }

            tracing::info!(conn_id = %conn_id, queue_id = conn.queue_id, "WebSocket connection unregistered");
        }
    }

    /// Send a message to every subscriber of a queue.
    ///
    /// Returns the number of connections that received the message.
    pub fn broadcast_to_queue(&self, queue_id: ScopeId, message: ServerMessage) -> usize {
        let conn_ids = match self.by_queue.get(&queue_id) {
            Some(ids) => ids.clone(),
            None => return 0,
        };

        let sent_count = conn_ids
            .iter()
            .filter(|id| self.send_to(id, message.clone()))
            .count();

        tracing::debug!(queue_id, recipients = sent_count, "Broadcast message to subscribers");

        sent_count
    }

    /// Send a message to a specific connection.
    pub fn send_to(&self, conn_id: &str, message: ServerMessage) -> bool {
        match self.connections.get(conn_id) {
            Some(conn) => conn.sender.send(message).is_ok(),
            None => false,
        }
    }

    /// Get the number of active connections.
    pub fn connection_count(&self) -> usize {
        self.connections.len()
    }

    /// Get the number of queues with at least one subscriber.
    pub fn queue_count(&self) -> usize {
        self.by_queue.len()
    }
}
