//! Database module for SQLite persistence.

mod entries;
mod pool;

pub use entries::*;
pub use pool::*;
