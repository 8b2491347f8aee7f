//! Request handlers for entries and the push channel.

mod entries;
mod websocket;

pub use entries::*;
pub use websocket::*;
