//! WebSocket push channel.
//!
//! Clients subscribe to a queue and are told whenever one of its entries is
//! created or updated, so they can start a sync pass without polling.

mod manager;
mod protocol;

pub use manager::ConnectionManager;
pub use protocol::*;
