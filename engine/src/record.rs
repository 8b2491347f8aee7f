//! Record types for storing data.

use crate::{clock, RecordId, Timestamp};
use serde::{Deserialize, Serialize};
use serde_json::{Map, Value};
use std::borrow::Cow;

/// Origin of a local-store write.
///
/// Decides how `updatedAtLocal` is set when a record is written.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Origin {
    /// Locally-originated mutation: stamp `updatedAtLocal` with the write time
    Local,
    /// Mirrored from the server: copy `updatedAt` into `updatedAtLocal`
    Remote,
    /// Written back unchanged after a failed push, timestamps untouched
    Retained,
}

/// A data record: three fixed attributes plus an open set of fields.
///
/// Serializes to a flat JSON object, e.g.
/// `{"id": 7, "updatedAt": "...", "updatedAtLocal": "...", "entry_name": "Al"}`.
#[derive(Debug, Clone, PartialEq, Default, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Record {
    /// Positive when assigned by the server, negative when provisional,
    /// `None` until the local store assigns one
    #[serde(default)]
    pub id: Option<RecordId>,
    /// Last server-side write
    #[serde(default, with = "crate::clock::iso8601")]
    pub updated_at: Option<Timestamp>,
    /// Last local write (or the mirrored `updated_at`)
    #[serde(default, with = "crate::clock::iso8601")]
    pub updated_at_local: Option<Timestamp>,
    /// Collection-specific payload
    #[serde(flatten)]
    pub fields: Map<String, Value>,
}

impl Record {
    /// Create an empty record with no id.
    pub fn new() -> Self {
        Self::default()
    }

    /// Create a record from a payload map.
    pub fn from_fields(fields: Map<String, Value>) -> Self {
        Self {
            fields,
            ..Self::default()
        }
    }

    /// Builder-style id setter.
    pub fn with_id(mut self, id: RecordId) -> Self {
        self.id = Some(id);
        self
    }

    /// Builder-style field setter.
    pub fn with_field(mut self, name: impl Into<String>, value: Value) -> Self {
        self.set(name, value);
        self
    }

    /// The id, unless it is missing or zero.
    pub fn assigned_id(&self) -> Option<RecordId> {
        self.id.filter(|id| *id != 0)
    }

    /// True for locally-assigned ids the server has never acknowledged.
    pub fn is_provisional(&self) -> bool {
        matches!(self.id, Some(id) if id < 0)
    }

    /// True for server-assigned ids.
    pub fn is_authoritative(&self) -> bool {
        matches!(self.id, Some(id) if id > 0)
    }

    /// Get a payload field.
    pub fn get(&self, name: &str) -> Option<&Value> {
        self.fields.get(name)
    }

    /// Set a payload field.
    pub fn set(&mut self, name: impl Into<String>, value: Value) {
        self.fields.insert(name.into(), value);
    }

    /// Look up a field by its wire name, including the fixed attributes.
    pub fn attribute(&self, name: &str) -> Option<Cow<'_, Value>> {
        match name {
            "id" => Some(Cow::Owned(self.id.map_or(Value::Null, Value::from))),
            "updatedAt" => Some(Cow::Owned(timestamp_value(self.updated_at))),
            "updatedAtLocal" => Some(Cow::Owned(timestamp_value(self.updated_at_local))),
            _ => self.fields.get(name).map(Cow::Borrowed),
        }
    }

    /// Apply the `updatedAtLocal` rule for a write of the given origin.
    pub fn stamp(&mut self, origin: Origin, now: Timestamp) {
        match origin {
            Origin::Local => self.updated_at_local = Some(clock::local_stamp(now)),
            Origin::Remote => self.updated_at_local = self.updated_at,
            Origin::Retained => {}
        }
    }

    /// The copy to send to the server: provisional ids are stripped.
    pub fn outgoing(&self) -> Record {
        let mut record = self.clone();
        if !record.is_authoritative() {
            record.id = None;
        }
        record
    }
}

fn timestamp_value(ts: Option<Timestamp>) -> Value {
    ts.map_or(Value::Null, |ts| Value::String(clock::format_timestamp(&ts)))
}
