//! # Waitlist Client
//!
//! The IO side of the waitlist sync: a file-backed local replica, an HTTP
//! client for the waitlist server and the sync passes that keep the two
//! consistent. Planning is delegated to [`waitlist_engine`].
//!
//! ## Quick Start
//!
//! ```rust,no_run
//! use std::sync::Arc;
//! use std::time::Duration;
//! use waitlist_client::{CollectionKey, FileStore, HttpRemote, SyncService};
//!
//! # async fn run() -> waitlist_client::Result<()> {
//! let local = Arc::new(FileStore::open("waitlist-store.json").await?);
//! let remote = Arc::new(HttpRemote::new("http://localhost:3000", Duration::from_secs(5))?);
//! let service = SyncService::new(local, remote);
//!
//! let entries = service.read_collection(&CollectionKey::entries(14)).await?;
//! println!("{} entries", entries.len());
//! # Ok(())
//! # }
//! ```

pub mod config;
pub mod error;
pub mod executor;
pub mod local;
pub mod remote;
pub mod sync;

#[cfg(test)]
pub(crate) mod fake;

// Re-export main types at crate root
pub use config::{Config, ConfigError};
pub use error::{Error, ErrorResult, Result};
pub use executor::{execute, reconcile, ExecutionReport, ItemFailure};
pub use local::{FileStore, LocalStore};
pub use remote::{HttpRemote, RemoteSource};
pub use sync::{CollectionKey, SyncService};
