//! Store - the in-memory local replica.
//!
//! The Store holds every record the client knows about, grouped by record
//! type. It hands out provisional ids for records created offline and applies
//! the `updatedAtLocal` stamping rules on every write.

use crate::{
    error::Result, snapshot::StoreSnapshot, Origin, Record, RecordId, RecordType, Timestamp,
};
use serde_json::Value;
use std::collections::{BTreeMap, HashMap};

/// The records of one type.
#[derive(Debug, Clone, PartialEq)]
pub struct Collection {
    records: BTreeMap<RecordId, Record>,
    /// Next provisional id to hand out (always negative)
    next_provisional_id: RecordId,
}

impl Default for Collection {
    fn default() -> Self {
        Self::new()
    }
}

impl Collection {
    /// Create an empty collection.
    pub fn new() -> Self {
        Self {
            records: BTreeMap::new(),
            next_provisional_id: -1,
        }
    }

    /// Rebuild a collection from stored records, resuming the provisional
    /// counter below the smallest id present.
    pub fn from_records(records: BTreeMap<RecordId, Record>) -> Self {
        let mut collection = Self::new();
        for (id, mut record) in records {
            record.id = Some(id);
            collection.observe_id(id);
            collection.records.insert(id, record);
        }
        collection
    }

    /// Get a record by id.
    pub fn get(&self, id: RecordId) -> Option<&Record> {
        self.records.get(&id)
    }

    /// Check if a record exists.
    pub fn contains(&self, id: RecordId) -> bool {
        self.records.contains_key(&id)
    }

    /// All records, ordered by id.
    pub fn records(&self) -> impl Iterator<Item = &Record> {
        self.records.values()
    }

    /// The id the next provisional record will receive.
    pub fn next_provisional_id(&self) -> RecordId {
        self.next_provisional_id
    }

    /// Number of records.
    pub fn len(&self) -> usize {
        self.records.len()
    }

    /// Check if the collection is empty.
    pub fn is_empty(&self) -> bool {
        self.records.is_empty()
    }

    fn allocate_id(&mut self) -> RecordId {
        let id = self.next_provisional_id;
        self.next_provisional_id = self.next_provisional_id.saturating_sub(1);
        id
    }

    fn observe_id(&mut self, id: RecordId) {
        if id <= self.next_provisional_id {
            self.next_provisional_id = id.saturating_sub(1);
        }
    }

    fn put(&mut self, mut record: Record, origin: Origin, now: Timestamp) -> RecordId {
        let id = match record.assigned_id() {
            Some(id) => {
                self.observe_id(id);
                id
            }
            None => self.allocate_id(),
        };
        record.id = Some(id);
        record.stamp(origin, now);
        self.records.insert(id, record);
        id
    }
}

/// The local replica: collections keyed by record type.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct Store {
    collections: HashMap<RecordType, Collection>,
}

impl Store {
    /// Create an empty store.
    pub fn new() -> Self {
        Self::default()
    }

    /// Get a collection, if anything was ever written to it.
    pub fn collection(&self, record_type: &str) -> Option<&Collection> {
        self.collections.get(record_type)
    }

    /// Insert or replace a record and return its id.
    ///
    /// A record without an id (or with id 0) gets the next provisional id.
    /// `updatedAtLocal` is set according to `origin`.
    pub fn put(
        &mut self,
        record_type: &str,
        record: Record,
        origin: Origin,
        now: Timestamp,
    ) -> RecordId {
        self.collections
            .entry(record_type.to_string())
            .or_default()
            .put(record, origin, now)
    }

    /// Get a record by id.
    pub fn get(&self, record_type: &str, id: RecordId) -> Option<&Record> {
        self.collections.get(record_type).and_then(|c| c.get(id))
    }

    /// Clone every record of a type, ordered by id.
    pub fn get_all(&self, record_type: &str) -> Vec<Record> {
        self.collections
            .get(record_type)
            .map(|c| c.records().cloned().collect())
            .unwrap_or_default()
    }

    /// Records whose `field` equals `scope`, compared as strings.
    pub fn scoped(&self, record_type: &str, field: &str, scope: &Value) -> Vec<Record> {
        let wanted = crate::coerce_to_string(Some(scope));
        self.collections
            .get(record_type)
            .map(|c| {
                c.records()
                    .filter(|r| {
                        let value = r.attribute(field);
                        crate::coerce_to_string(value.as_deref()) == wanted
                    })
                    .cloned()
                    .collect()
            })
            .unwrap_or_default()
    }

    /// Remove a record. Returns it if it existed.
    pub fn remove(&mut self, record_type: &str, id: RecordId) -> Option<Record> {
        self.collections
            .get_mut(record_type)
            .and_then(|c| c.records.remove(&id))
    }

    /// Drop every record of a type. The provisional counter is kept.
    pub fn clear(&mut self, record_type: &str) {
        if let Some(collection) = self.collections.get_mut(record_type) {
            collection.records.clear();
        }
    }

    /// Total number of records across all types.
    pub fn record_count(&self) -> usize {
        self.collections.values().map(Collection::len).sum()
    }

    /// Export the current store state as a snapshot.
    pub fn export_state(&self) -> StoreSnapshot {
        let mut snapshot = StoreSnapshot::new();
        for (record_type, collection) in &self.collections {
            snapshot.ensure_collection(record_type);
            for record in collection.records() {
                snapshot.add_record(record_type, record.clone());
            }
        }
        snapshot
    }

    /// Replace the current state with a snapshot's.
    pub fn import_state(&mut self, snapshot: StoreSnapshot) -> Result<()> {
        snapshot.validate()?;
        self.collections = snapshot
            .collections
            .into_iter()
            .map(|(record_type, records)| (record_type, Collection::from_records(records)))
            .collect();
        Ok(())
    }
}
