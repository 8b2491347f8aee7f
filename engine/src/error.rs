//! Error types for the waitlist engine.

use crate::CollectionName;
use thiserror::Error;

/// All possible errors from the waitlist engine.
#[derive(Debug, Error, Clone, PartialEq, Eq)]
pub enum Error {
    // Schema errors
    #[error("collection not found: {0}")]
    UnknownCollection(CollectionName),

    #[error("invalid schema for collection '{collection}': {reason}")]
    InvalidSchema {
        collection: CollectionName,
        reason: String,
    },

    // State errors
    #[error("invalid snapshot: {0}")]
    InvalidSnapshot(String),
}

/// Result type for engine operations.
pub type Result<T> = std::result::Result<T, Error>;
