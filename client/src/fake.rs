//! In-memory [`RemoteSource`] for tests.

use crate::error::{Error, Result};
use crate::remote::RemoteSource;
use async_trait::async_trait;
use chrono::{SubsecRound, Utc};
use serde_json::{json, Value};
use std::collections::BTreeMap;
use std::sync::Mutex;
use waitlist_engine::{coerce_to_string, Record, RecordId, ScopeId};

#[derive(Debug, Default)]
struct State {
    records: BTreeMap<RecordId, Record>,
    created: Vec<Record>,
    fail_fetch: bool,
    fail_creates: bool,
    fail_updates: bool,
    omit_ids: bool,
}

/// Server stand-in holding entries keyed by id.
#[derive(Debug, Default)]
pub(crate) struct FakeRemote {
    state: Mutex<State>,
}

impl FakeRemote {
    pub(crate) fn new() -> Self {
        Self::default()
    }

    fn state(&self) -> std::sync::MutexGuard<'_, State> {
        self.state.lock().unwrap()
    }

    /// Store a record as if it had been created on the server.
    pub(crate) fn seed(&self, record: Record) -> Record {
        let mut state = self.state();
        let id = next_id(&state);
        let stored = stamp(record.with_id(id));
        state.records.insert(id, stored.clone());
        stored
    }

    /// Store a record verbatim.
    pub(crate) fn insert(&self, record: Record) {
        if let Some(id) = record.id {
            self.state().records.insert(id, record);
        }
    }

    pub(crate) fn record(&self, id: RecordId) -> Option<Record> {
        self.state().records.get(&id).cloned()
    }

    pub(crate) fn records(&self) -> Vec<Record> {
        self.state().records.values().cloned().collect()
    }

    /// Bodies received by `create`, in arrival order.
    pub(crate) fn created(&self) -> Vec<Record> {
        self.state().created.clone()
    }

    pub(crate) fn fail_fetch(&self, fail: bool) {
        self.state().fail_fetch = fail;
    }

    pub(crate) fn fail_creates(&self, fail: bool) {
        self.state().fail_creates = fail;
    }

    pub(crate) fn fail_updates(&self, fail: bool) {
        self.state().fail_updates = fail;
    }

    /// Answer creates and updates without an id.
    pub(crate) fn omit_ids(&self, omit: bool) {
        self.state().omit_ids = omit;
    }
}

fn next_id(state: &State) -> RecordId {
    state.records.keys().next_back().copied().unwrap_or(0).max(0) + 1
}

fn stamp(mut record: Record) -> Record {
    record.updated_at = Some(Utc::now().trunc_subsecs(3));
    record.updated_at_local = None;
    record
}

fn unreachable() -> Error {
    Error::Unreachable {
        detail: "fake remote offline".into(),
    }
}

#[async_trait]
impl RemoteSource for FakeRemote {
    async fn fetch_collection(&self, _collection: &str, scope: ScopeId) -> Result<Vec<Record>> {
        tokio::task::yield_now().await;
        let state = self.state();
        if state.fail_fetch {
            return Err(unreachable());
        }
        let wanted = coerce_to_string(Some(&json!(scope)));
        Ok(state
            .records
            .values()
            .filter(|r| coerce_to_string(r.get("entry_queue_id")) == wanted)
            .cloned()
            .collect())
    }

    async fn get(&self, _record_type: &str, id: RecordId) -> Result<Record> {
        tokio::task::yield_now().await;
        let state = self.state();
        if state.fail_fetch {
            return Err(unreachable());
        }
        state.records.get(&id).cloned().ok_or_else(|| Error::Remote {
            code: Value::from(404),
            message: format!("entry {} not found", id),
        })
    }

    async fn create(&self, _record_type: &str, record: &Record) -> Result<Record> {
        tokio::task::yield_now().await;
        let mut state = self.state();
        state.created.push(record.clone());
        if state.fail_creates {
            return Err(unreachable());
        }
        let id = next_id(&state);
        let stored = stamp(record.clone().with_id(id));
        state.records.insert(id, stored.clone());
        if state.omit_ids {
            let mut reply = stored;
            reply.id = None;
            return Ok(reply);
        }
        Ok(stored)
    }

    async fn update(&self, _record_type: &str, id: RecordId, record: &Record) -> Result<Record> {
        tokio::task::yield_now().await;
        let mut state = self.state();
        if state.fail_updates {
            return Err(Error::Remote {
                code: Value::from(500),
                message: "update rejected".into(),
            });
        }
        if !state.records.contains_key(&id) {
            return Err(Error::Remote {
                code: Value::from(404),
                message: format!("entry {} not found", id),
            });
        }
        let stored = stamp(record.clone().with_id(id));
        state.records.insert(id, stored.clone());
        Ok(stored)
    }
}
