//! Reconciliation logic for syncing local and remote state.
//!
//! Given the local replica and the server's copy of one collection, the
//! [`Reconciler`] decides per record what must happen and returns the result
//! as a [`SyncPlan`]. Planning is pure; carrying the plan out is the caller's
//! job.
//!
//! # Algorithm
//!
//! 1. Index both snapshots by id
//! 2. Provisional local records (negative id) are matched against the remote
//!    snapshot by value on the comparable fields. A match is pulled down, no
//!    match is pushed up; the provisional copy is destroyed either way
//! 3. Authoritative local records are compared with the remote copy of the
//!    same id by timestamp, or destroyed when the server no longer has them
//! 4. Remote records with no local copy are pulled down

use crate::clock::{self, Freshness, DEFAULT_TOLERANCE_MS};
use crate::{FieldName, Record, RecordId, SyncAction, SyncPlan};
use serde_json::{Number, Value};
use std::collections::{HashMap, HashSet};

/// Plans reconciliation passes for one collection.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Reconciler {
    /// Fields used to recognise a provisional record on the server
    comparable_fields: Vec<FieldName>,
    /// Timestamp slack in milliseconds
    tolerance_ms: i64,
}

impl Reconciler {
    /// Create a reconciler with the default 999 ms tolerance.
    pub fn new<I, S>(comparable_fields: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<FieldName>,
    {
        Self {
            comparable_fields: comparable_fields.into_iter().map(Into::into).collect(),
            tolerance_ms: DEFAULT_TOLERANCE_MS,
        }
    }

    /// Override the timestamp tolerance.
    pub fn with_tolerance_ms(mut self, tolerance_ms: i64) -> Self {
        self.tolerance_ms = tolerance_ms.max(0);
        self
    }

    /// Get the comparable fields.
    pub fn comparable_fields(&self) -> &[FieldName] {
        &self.comparable_fields
    }

    /// Get the timestamp tolerance in milliseconds.
    pub fn tolerance_ms(&self) -> i64 {
        self.tolerance_ms
    }

    /// Compute the worklist that makes `local` consistent with `remote`.
    pub fn plan(&self, local: &[Record], remote: &[Record]) -> SyncPlan {
        let local_by_id = index_by_id(local);
        let remote_by_id = index_by_id(remote);

        let mut plan = SyncPlan::new();
        // Remote ids already scheduled for download by a provisional match
        let mut claimed: HashSet<RecordId> = HashSet::new();

        for record in local {
            match record.assigned_id() {
                Some(id) if id > 0 => {
                    self.plan_authoritative(&mut plan, record, remote_by_id.get(&id).copied())
                }
                _ => self.plan_provisional(&mut plan, record, remote, &local_by_id, &mut claimed),
            }
        }

        for record in remote {
            let Some(id) = record.assigned_id().filter(|id| *id > 0) else {
                continue;
            };
            if local_by_id.contains_key(&id) || claimed.contains(&id) {
                continue;
            }
            plan.push(SyncAction::CreateOnLocal {
                record: record.clone(),
            });
        }

        plan
    }

    fn plan_provisional(
        &self,
        plan: &mut SyncPlan,
        record: &Record,
        remote: &[Record],
        local_by_id: &HashMap<RecordId, &Record>,
        claimed: &mut HashSet<RecordId>,
    ) {
        match self.find_match(record, remote, claimed) {
            Some(matched) => {
                // find_match only returns records with a positive id
                if let Some(matched_id) = matched.id {
                    claimed.insert(matched_id);
                    // An existing local copy is handled as an authoritative record
                    if !local_by_id.contains_key(&matched_id) {
                        plan.push(SyncAction::CreateOnLocal {
                            record: matched.clone(),
                        });
                    }
                }
            }
            None => plan.push(SyncAction::CreateOnServer {
                record: record.clone(),
            }),
        }

        if let Some(id) = record.assigned_id() {
            plan.push(SyncAction::DestroyLocal { id });
        }
    }

    fn plan_authoritative(&self, plan: &mut SyncPlan, local: &Record, remote: Option<&Record>) {
        let Some(remote) = remote else {
            if let Some(id) = local.assigned_id() {
                plan.push(SyncAction::DestroyLocal { id });
            }
            return;
        };

        match clock::compare(remote.updated_at, local.updated_at_local, self.tolerance_ms) {
            Freshness::RemoteNewer => plan.push(SyncAction::ServerToLocal {
                record: remote.clone(),
            }),
            Freshness::LocalNewer => plan.push(SyncAction::LocalToServer {
                record: local.clone(),
            }),
            Freshness::InSync | Freshness::Unknown => {}
        }
    }

    /// Find the first unclaimed authoritative remote record equal to
    /// `candidate` on every comparable field.
    pub fn find_match<'r>(
        &self,
        candidate: &Record,
        remote: &'r [Record],
        claimed: &HashSet<RecordId>,
    ) -> Option<&'r Record> {
        remote.iter().find(|record| {
            record.is_authoritative()
                && record.id.is_some_and(|id| !claimed.contains(&id))
                && self.matches(candidate, record)
        })
    }

    /// Check whether two records agree on every comparable field.
    pub fn matches(&self, a: &Record, b: &Record) -> bool {
        self.comparable_fields.iter().all(|field| {
            let left = a.attribute(field);
            let right = b.attribute(field);
            coerce_to_string(left.as_deref()) == coerce_to_string(right.as_deref())
        })
    }
}

fn index_by_id(records: &[Record]) -> HashMap<RecordId, &Record> {
    records
        .iter()
        .filter_map(|record| record.assigned_id().map(|id| (id, record)))
        .collect()
}

/// Render a field value the way a JavaScript `String(value)` call would.
///
/// This is the equality used for matching provisional records, so `"2"` and
/// `2` compare equal. A missing field renders as `"undefined"`.
pub fn coerce_to_string(value: Option<&Value>) -> String {
    match value {
        None => "undefined".to_string(),
        Some(Value::Null) => "null".to_string(),
        Some(Value::Bool(b)) => b.to_string(),
        Some(Value::Number(n)) => number_to_string(n),
        Some(Value::String(s)) => s.clone(),
        Some(Value::Array(items)) => items
            .iter()
            .map(|item| match item {
                Value::Null => String::new(),
                other => coerce_to_string(Some(other)),
            })
            .collect::<Vec<_>>()
            .join(","),
        Some(Value::Object(_)) => "[object Object]".to_string(),
    }
}

fn number_to_string(n: &Number) -> String {
    if let Some(i) = n.as_i64() {
        i.to_string()
    } else if let Some(u) = n.as_u64() {
        u.to_string()
    } else {
        n.as_f64().map(float_to_string).unwrap_or_default()
    }
}

/// Shortest round-trip digits; plain notation for magnitudes in
/// `[1e-6, 1e21)`, otherwise `1.5e-7` / `1e+21` style.
fn float_to_string(f: f64) -> String {
    if f == 0.0 {
        return "0".to_string();
    }
    let scientific = format!("{:e}", f);
    let Some((mantissa, exponent)) = scientific.split_once('e') else {
        return f.to_string();
    };
    match exponent.parse::<i32>() {
        Ok(exp) if (-6..21).contains(&exp) => f.to_string(),
        Ok(exp) if exp > 0 => format!("{}e+{}", mantissa, exp),
        Ok(exp) => format!("{}e{}", mantissa, exp),
        Err(_) => f.to_string(),
    }
}
