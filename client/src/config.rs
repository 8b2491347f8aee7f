//! Configuration management for the client.

use std::env;
use std::path::PathBuf;
use std::time::Duration;
use waitlist_engine::{ScopeId, DEFAULT_TOLERANCE_MS};

/// Queue synced when none is configured.
pub const DEFAULT_QUEUE_ID: ScopeId = 14;

/// Client configuration loaded from environment variables.
#[derive(Debug, Clone, PartialEq)]
pub struct Config {
    /// Base URL of the waitlist server
    pub server_url: String,
    /// Queue whose entries are synced
    pub queue_id: ScopeId,
    /// File holding the local replica
    pub store_path: PathBuf,
    /// Per-request timeout
    pub request_timeout: Duration,
    /// Timestamp slack used when comparing local and remote copies
    pub sync_tolerance_ms: i64,
    /// Re-sync period; `None` runs a single pass
    pub sync_interval: Option<Duration>,
    /// Bearer token sent with every request
    pub auth_token: Option<String>,
}

impl Default for Config {
    fn default() -> Self {
        Self {
            server_url: "http://localhost:3000".to_string(),
            queue_id: DEFAULT_QUEUE_ID,
            store_path: PathBuf::from("waitlist-store.json"),
            request_timeout: Duration::from_millis(5000),
            sync_tolerance_ms: DEFAULT_TOLERANCE_MS,
            sync_interval: None,
            auth_token: None,
        }
    }
}

impl Config {
    /// Load configuration from environment variables.
    ///
    /// All variables are optional:
    /// - `WAITLIST_SERVER_URL` (default: "http://localhost:3000")
    /// - `WAITLIST_QUEUE_ID` (default: 14)
    /// - `WAITLIST_STORE_PATH` (default: "waitlist-store.json")
    /// - `WAITLIST_REQUEST_TIMEOUT_MS` (default: 5000)
    /// - `WAITLIST_SYNC_TOLERANCE_MS` (default: 999)
    /// - `WAITLIST_SYNC_INTERVAL_SECS` (unset: single pass)
    /// - `WAITLIST_AUTH_TOKEN`
    pub fn from_env() -> Result<Self, ConfigError> {
        Self::from_lookup(|key| env::var(key).ok())
    }

    /// Load configuration through an arbitrary variable lookup.
    pub fn from_lookup<F>(lookup: F) -> Result<Self, ConfigError>
    where
        F: Fn(&str) -> Option<String>,
    {
        let defaults = Self::default();
        let get = |key: &str| lookup(key).filter(|v| !v.trim().is_empty());

        let server_url = get("WAITLIST_SERVER_URL")
            .map(|url| url.trim_end_matches('/').to_string())
            .unwrap_or(defaults.server_url);

        let queue_id = match get("WAITLIST_QUEUE_ID") {
            Some(raw) => parse("WAITLIST_QUEUE_ID", &raw)?,
            None => defaults.queue_id,
        };

        let store_path = get("WAITLIST_STORE_PATH")
            .map(PathBuf::from)
            .unwrap_or(defaults.store_path);

        let request_timeout = match get("WAITLIST_REQUEST_TIMEOUT_MS") {
            Some(raw) => Duration::from_millis(parse("WAITLIST_REQUEST_TIMEOUT_MS", &raw)?),
            None => defaults.request_timeout,
        };

        let sync_tolerance_ms = match get("WAITLIST_SYNC_TOLERANCE_MS") {
            Some(raw) => parse("WAITLIST_SYNC_TOLERANCE_MS", &raw)?,
            None => defaults.sync_tolerance_ms,
        };
        if sync_tolerance_ms < 0 {
            return Err(ConfigError::Invalid {
                var: "WAITLIST_SYNC_TOLERANCE_MS",
                value: sync_tolerance_ms.to_string(),
            });
        }

        let sync_interval = match get("WAITLIST_SYNC_INTERVAL_SECS") {
            Some(raw) => {
                let secs: u64 = parse("WAITLIST_SYNC_INTERVAL_SECS", &raw)?;
                if secs == 0 {
                    return Err(ConfigError::Invalid {
                        var: "WAITLIST_SYNC_INTERVAL_SECS",
                        value: raw,
                    });
                }
                Some(Duration::from_secs(secs))
            }
            None => None,
        };

        let auth_token = get("WAITLIST_AUTH_TOKEN");

        Ok(Self {
            server_url,
            queue_id,
            store_path,
            request_timeout,
            sync_tolerance_ms,
            sync_interval,
            auth_token,
        })
    }
}

fn parse<T: std::str::FromStr>(var: &'static str, raw: &str) -> Result<T, ConfigError> {
    raw.trim().parse().map_err(|_| ConfigError::Invalid {
        var,
        value: raw.to_string(),
    })
}

/// Configuration errors.
#[derive(Debug, thiserror::Error, PartialEq, Eq)]
pub enum ConfigError {
    #[error("Invalid {var} value: {value:?}")]
    Invalid { var: &'static str, value: String },
}
