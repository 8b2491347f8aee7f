//! # Waitlist Engine
//!
//! A deterministic reconciliation engine for offline-capable waitlist clients.
//!
//! This crate holds the pure logic behind keeping a local replica of a record
//! collection consistent with a single authoritative server. It decides *what*
//! has to happen to each record; performing those actions against a real store
//! and a real server is left to the caller (see the `waitlist-client` crate).
//!
//! ## Design Principles
//!
//! - **No IO**: the engine never touches files, sockets or clocks on its own
//! - **Deterministic**: the same snapshots always produce the same worklist
//! - **Testable**: pure functions over plain data, no mocks needed
//!
//! ## Core Concepts
//!
//! ### Records
//!
//! A [`Record`] is an open bag of JSON fields plus three fixed attributes:
//! - `id` - positive when assigned by the server, negative (provisional) when
//!   assigned by the local store for records created offline
//! - `updatedAt` - stamped by the server on every write
//! - `updatedAtLocal` - stamped locally on every local mutation, copied from
//!   `updatedAt` when a server copy is mirrored
//!
//! ### Worklist
//!
//! The [`Reconciler`] compares a local and a remote snapshot and produces a
//! [`SyncPlan`]: an ordered list of independent [`SyncAction`]s such as
//! `create-on-server` or `server-to-local`.
//!
//! ### Store
//!
//! [`Store`] is the in-memory local replica. It assigns provisional ids and
//! applies the `updatedAtLocal` stamping rules through [`Origin`].
//!
//! ## Quick Start
//!
//! ```rust
//! use waitlist_engine::{ActionKind, CollectionSchema, Origin, Record, Store};
//! use chrono::Utc;
//! use serde_json::json;
//!
//! let schema = CollectionSchema::entries();
//! let mut store = Store::new();
//!
//! // An entry created while offline gets a provisional id.
//! let mut entry = waitlist_engine::schema::new_entry(14, None);
//! entry.set("entry_name", json!("Alice"));
//! let id = store.put(&schema.record_type, entry, Origin::Local, Utc::now());
//! assert_eq!(id, -1);
//!
//! // The server has never seen it, so it must be created there.
//! let local = store.get_all(&schema.record_type);
//! let remote: Vec<Record> = Vec::new();
//! let plan = schema.reconciler().plan(&local, &remote);
//! assert_eq!(plan.count(ActionKind::CreateOnServer), 1);
//! assert_eq!(plan.count(ActionKind::DestroyLocal), 1);
//! ```
//!
//! ## Persistence
//!
//! Use [`Store::export_state`] and [`Store::import_state`] with
//! [`StoreSnapshot`] to persist the replica. Snapshots serialize to JSON with
//! deterministic ordering.

pub mod clock;
pub mod error;
pub mod operation;
pub mod reconcile;
pub mod record;
pub mod schema;
pub mod snapshot;
pub mod store;

// Re-export main types at crate root
pub use clock::{Freshness, DEFAULT_TOLERANCE_MS};
pub use error::Error;
pub use operation::{ActionKind, SyncAction, SyncPlan};
pub use reconcile::{coerce_to_string, Reconciler};
pub use record::{Origin, Record};
pub use schema::{CollectionSchema, Schema};
pub use snapshot::{StoreSnapshot, SNAPSHOT_FORMAT_VERSION};
pub use store::{Collection, Store};

/// Type aliases for clarity
pub type RecordId = i64;
pub type RecordType = String;
pub type CollectionName = String;
pub type FieldName = String;
pub type ScopeId = i64;
pub type Timestamp = chrono::DateTime<chrono::Utc>;
