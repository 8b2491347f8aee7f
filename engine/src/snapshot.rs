//! Snapshot types for persisting and restoring store state.
//!
//! Snapshots are the bridge between the in-memory Store and persistent storage.
//! They are designed for deterministic serialization to ensure consistency.

use crate::{error::Result, Error, Record, RecordId, RecordType};
use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;

/// Version of the snapshot format for future compatibility.
pub const SNAPSHOT_FORMAT_VERSION: u32 = 1;

/// A point-in-time snapshot of the store state.
///
/// Uses BTreeMap instead of HashMap for deterministic serialization order.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct StoreSnapshot {
    /// Snapshot format version
    pub format_version: u32,
    /// All records organized by record type, then by record id
    #[serde(default)]
    pub collections: BTreeMap<RecordType, BTreeMap<RecordId, Record>>,
}

impl Default for StoreSnapshot {
    fn default() -> Self {
        Self::new()
    }
}

impl StoreSnapshot {
    /// Create a new empty snapshot.
    pub fn new() -> Self {
        Self {
            format_version: SNAPSHOT_FORMAT_VERSION,
            collections: BTreeMap::new(),
        }
    }

    /// Make sure a record type is present, even with no records.
    pub fn ensure_collection(&mut self, record_type: &str) {
        self.collections.entry(record_type.to_string()).or_default();
    }

    /// Add a record to the snapshot. Records without an id are skipped.
    pub fn add_record(&mut self, record_type: &str, record: Record) {
        if let Some(id) = record.assigned_id() {
            self.collections
                .entry(record_type.to_string())
                .or_default()
                .insert(id, record);
        }
    }

    /// Get a record from the snapshot.
    pub fn get_record(&self, record_type: &str, id: RecordId) -> Option<&Record> {
        self.collections.get(record_type)?.get(&id)
    }

    /// Count total records across all types.
    pub fn record_count(&self) -> usize {
        self.collections.values().map(|c| c.len()).sum()
    }

    /// Check that every record sits under its own id.
    pub fn validate(&self) -> Result<()> {
        for (record_type, records) in &self.collections {
            for (key, record) in records {
                if *key == 0 {
                    return Err(Error::InvalidSnapshot(format!(
                        "record of type '{}' stored under id 0",
                        record_type
                    )));
                }
                if let Some(id) = record.assigned_id() {
                    if id != *key {
                        return Err(Error::InvalidSnapshot(format!(
                            "record of type '{}' stored under id {} carries id {}",
                            record_type, key, id
                        )));
                    }
                }
            }
        }
        Ok(())
    }

    /// Serialize to JSON with deterministic ordering.
    pub fn to_json(&self) -> Result<String> {
        serde_json::to_string(self).map_err(|e| Error::InvalidSnapshot(e.to_string()))
    }

    /// Serialize to pretty JSON with deterministic ordering.
    pub fn to_json_pretty(&self) -> Result<String> {
        serde_json::to_string_pretty(self).map_err(|e| Error::InvalidSnapshot(e.to_string()))
    }

    /// Deserialize from JSON.
    pub fn from_json(json: &str) -> Result<Self> {
        let snapshot: Self =
            serde_json::from_str(json).map_err(|e| Error::InvalidSnapshot(e.to_string()))?;

        if snapshot.format_version > SNAPSHOT_FORMAT_VERSION {
            return Err(Error::InvalidSnapshot(format!(
                "unsupported snapshot format version: {} (max supported: {})",
                snapshot.format_version, SNAPSHOT_FORMAT_VERSION
            )));
        }

        Ok(snapshot)
    }
}
