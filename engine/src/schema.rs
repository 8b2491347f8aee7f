//! Collection conventions.
//!
//! A [`CollectionSchema`] names a synced collection and tells the rest of the
//! system how to find its records locally, where to reach them remotely and
//! which fields identify a provisional record on the server.

use crate::{error::Result, CollectionName, Error, FieldName, Reconciler, Record, RecordType, ScopeId};
use serde::{Deserialize, Serialize};
use serde_json::{json, Value};
use std::collections::HashMap;

/// Language used by new entries when none is given.
pub const DEFAULT_LANGUAGE: &str = "us";

/// Fields that identify a waitlist entry by value.
pub const ENTRY_COMPARABLE_FIELDS: [&str; 5] = [
    "entry_queue_id",
    "entry_name",
    "entry_seats",
    "entry_phone",
    "entry_status",
];

/// Schema for a collection.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct CollectionSchema {
    /// Collection path segment, e.g. `entries`
    pub name: CollectionName,
    /// Local record type and remote path segment, e.g. `entry`
    pub record_type: RecordType,
    /// Field holding the scope id
    pub scope_field: FieldName,
    /// Fields compared when matching provisional records
    pub comparable_fields: Vec<FieldName>,
}

impl CollectionSchema {
    /// Create a new collection schema.
    pub fn new(
        name: impl Into<CollectionName>,
        record_type: impl Into<RecordType>,
        scope_field: impl Into<FieldName>,
        comparable_fields: Vec<FieldName>,
    ) -> Self {
        Self {
            name: name.into(),
            record_type: record_type.into(),
            scope_field: scope_field.into(),
            comparable_fields,
        }
    }

    /// The waitlist entries collection.
    pub fn entries() -> Self {
        Self::new(
            "entries",
            "entry",
            "entry_queue_id",
            ENTRY_COMPARABLE_FIELDS.iter().map(|f| f.to_string()).collect(),
        )
    }

    /// Check the schema is usable for syncing.
    pub fn validate(&self) -> Result<()> {
        let invalid = |reason: &str| Error::InvalidSchema {
            collection: self.name.clone(),
            reason: reason.to_string(),
        };

        if self.name.is_empty() {
            return Err(invalid("empty collection name"));
        }
        if self.record_type.is_empty() {
            return Err(invalid("empty record type"));
        }
        if self.scope_field.is_empty() {
            return Err(invalid("empty scope field"));
        }
        if self.comparable_fields.is_empty() {
            return Err(invalid("no comparable fields"));
        }
        Ok(())
    }

    /// A reconciler matching on this collection's comparable fields.
    pub fn reconciler(&self) -> Reconciler {
        Reconciler::new(self.comparable_fields.iter().cloned())
    }
}

/// Registry of synced collections.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Schema {
    /// Collection schemas by name
    pub collections: HashMap<CollectionName, CollectionSchema>,
}

impl Default for Schema {
    fn default() -> Self {
        let entries = CollectionSchema::entries();
        Self {
            collections: HashMap::from([(entries.name.clone(), entries)]),
        }
    }
}

impl Schema {
    /// Create a schema with no collections.
    pub fn empty() -> Self {
        Self {
            collections: HashMap::new(),
        }
    }

    /// Add a collection to the schema.
    pub fn add_collection(&mut self, collection: CollectionSchema) -> Result<&mut Self> {
        collection.validate()?;
        self.collections.insert(collection.name.clone(), collection);
        Ok(self)
    }

    /// Builder-style [`Schema::add_collection`].
    pub fn with_collection(mut self, collection: CollectionSchema) -> Result<Self> {
        self.add_collection(collection)?;
        Ok(self)
    }

    /// Get a collection schema by name.
    pub fn collection(&self, name: &str) -> Result<&CollectionSchema> {
        self.collections
            .get(name)
            .ok_or_else(|| Error::UnknownCollection(name.to_string()))
    }
}

/// A blank waitlist entry for the given queue.
pub fn new_entry(queue_id: ScopeId, language: Option<&str>) -> Record {
    let mut record = Record::new();
    for (name, value) in [
        ("entry_queue_id", json!(queue_id)),
        ("entry_name", json!("")),
        ("entry_seats", Value::Null),
        ("entry_phone", json!("")),
        ("entry_notes", json!("")),
        ("entry_language", json!(language.unwrap_or(DEFAULT_LANGUAGE))),
        ("entry_notify_sms", json!(true)),
        ("entry_status", json!("ACTIVE")),
        ("entry_messages", json!([])),
        ("entry_message_status", json!("")),
        ("entry_init_position", Value::Null),
        ("entry_completion_time", Value::Null),
        ("entry_client_listening", json!(false)),
        ("createdAt", Value::Null),
    ] {
        record.set(name, value);
    }
    record
}
