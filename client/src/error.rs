//! Error types for the waitlist client.

use serde::{Deserialize, Serialize};
use serde_json::{json, Value};
use thiserror::Error;

/// Message used when the server gives no usable one.
pub const UNKNOWN_ERROR_MESSAGE: &str = "an unknown error occurred";

/// All possible errors from the waitlist client.
#[derive(Debug, Error)]
pub enum Error {
    // Transport errors
    #[error("Unable to connect to server")]
    Unreachable { detail: String },

    #[error("request timed out")]
    Timeout,

    #[error("invalid JSON, can't parse")]
    InvalidJson,

    #[error("server response carries no record id")]
    MissingId,

    // Application errors reported by the server
    #[error("{message}")]
    Remote { code: Value, message: String },

    // Local errors
    #[error("local store error: {0}")]
    Store(#[from] std::io::Error),

    #[error(transparent)]
    Engine(#[from] waitlist_engine::Error),

    #[error("collection not found: {0}")]
    UnknownCollection(String),
}

/// The uniform `{error, message}` shape every failure is reported in.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ErrorResult {
    pub error: Value,
    pub message: String,
}

impl Error {
    /// The numeric (or server-provided) error code.
    pub fn code(&self) -> Value {
        match self {
            Error::Unreachable { .. } | Error::Timeout => json!(599),
            Error::InvalidJson | Error::MissingId => json!(-100),
            Error::Remote { code, .. } => code.clone(),
            Error::Store(_) | Error::Engine(_) => json!(500),
            Error::UnknownCollection(_) => json!(404),
        }
    }

    /// Render as `{error, message}`.
    pub fn to_result(&self) -> ErrorResult {
        ErrorResult {
            error: self.code(),
            message: self.to_string(),
        }
    }

    /// True for failures that mean the server could not be reached at all.
    pub fn is_transport(&self) -> bool {
        matches!(self, Error::Unreachable { .. } | Error::Timeout)
    }
}

impl From<reqwest::Error> for Error {
    fn from(e: reqwest::Error) -> Self {
        if e.is_timeout() {
            Error::Timeout
        } else if e.is_decode() {
            Error::InvalidJson
        } else {
            Error::Unreachable {
                detail: e.to_string(),
            }
        }
    }
}

/// Result type for client operations.
pub type Result<T> = std::result::Result<T, Error>;
