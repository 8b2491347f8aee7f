//! Collection sync facade.
//!
//! [`SyncService`] is the one entry point callers use: it reads both
//! snapshots of a collection, reconciles them and hands back the settled
//! local snapshot. Callers only ever see pre-sync or fully settled state.

use crate::error::{Error, Result};
use crate::executor;
use crate::local::LocalStore;
use crate::remote::RemoteSource;
use dashmap::DashMap;
use serde::{Deserialize, Serialize};
use serde_json::Value;
use std::fmt;
use std::sync::Arc;
use tokio::sync::Mutex;
use waitlist_engine::{
    coerce_to_string, CollectionName, CollectionSchema, Origin, Record, RecordId, Schema,
    ScopeId, DEFAULT_TOLERANCE_MS,
};

/// One scoped collection, e.g. the entries of queue 14.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct CollectionKey {
    pub collection: CollectionName,
    pub scope: ScopeId,
}

impl CollectionKey {
    pub fn new(collection: impl Into<CollectionName>, scope: ScopeId) -> Self {
        Self {
            collection: collection.into(),
            scope,
        }
    }

    /// The entries of one waitlist queue.
    pub fn entries(queue_id: ScopeId) -> Self {
        Self::new("entries", queue_id)
    }
}

impl fmt::Display for CollectionKey {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}/{}", self.collection, self.scope)
    }
}

/// Syncs collections between a local store and a remote source.
///
/// Passes over the same [`CollectionKey`] never overlap; passes over
/// different keys run independently.
pub struct SyncService<L: ?Sized, R: ?Sized> {
    local: Arc<L>,
    remote: Arc<R>,
    schema: Schema,
    tolerance_ms: i64,
    locks: DashMap<CollectionKey, Arc<Mutex<()>>>,
}

impl<L, R> SyncService<L, R>
where
    L: LocalStore + ?Sized,
    R: RemoteSource + ?Sized,
{
    /// Create a service over the default schema (entries only).
    pub fn new(local: Arc<L>, remote: Arc<R>) -> Self {
        Self {
            local,
            remote,
            schema: Schema::default(),
            tolerance_ms: DEFAULT_TOLERANCE_MS,
            locks: DashMap::new(),
        }
    }

    /// Replace the collection registry.
    pub fn with_schema(mut self, schema: Schema) -> Self {
        self.schema = schema;
        self
    }

    /// Override the timestamp tolerance.
    pub fn with_tolerance_ms(mut self, tolerance_ms: i64) -> Self {
        self.tolerance_ms = tolerance_ms;
        self
    }

    /// Get the local store.
    pub fn local(&self) -> &Arc<L> {
        &self.local
    }

    /// Get the remote source.
    pub fn remote(&self) -> &Arc<R> {
        &self.remote
    }

    fn collection(&self, name: &str) -> Result<&CollectionSchema> {
        self.schema
            .collection(name)
            .map_err(|_| Error::UnknownCollection(name.to_string()))
    }

    fn lock_for(&self, key: &CollectionKey) -> Arc<Mutex<()>> {
        self.locks.entry(key.clone()).or_default().clone()
    }

    /// The pass lock of the scope `record` belongs to, if it names one.
    fn scope_lock(&self, schema: &CollectionSchema, record: &Record) -> Option<Arc<Mutex<()>>> {
        record
            .attribute(&schema.scope_field)
            .and_then(|v| coerce_to_string(Some(&*v)).parse::<ScopeId>().ok())
            .map(|scope| self.lock_for(&CollectionKey::new(schema.name.clone(), scope)))
    }

    /// Run one pass and return the settled local snapshot.
    ///
    /// Fails without side effects if either snapshot cannot be read.
    pub async fn sync_collection(&self, key: &CollectionKey) -> Result<Vec<Record>> {
        let schema = self.collection(&key.collection)?;
        let lock = self.lock_for(key);
        let _guard = lock.lock().await;
        self.run_pass(schema, key, false).await
    }

    /// Like [`SyncService::sync_collection`], but falls back to the local
    /// snapshot when the server cannot be read.
    pub async fn read_collection(&self, key: &CollectionKey) -> Result<Vec<Record>> {
        let schema = self.collection(&key.collection)?;
        let lock = self.lock_for(key);
        let _guard = lock.lock().await;
        self.run_pass(schema, key, true).await
    }

    /// Write a locally edited record. Records without an id get a
    /// provisional one; the next pass pushes the change.
    pub async fn save(&self, collection: &str, record: Record) -> Result<RecordId> {
        let schema = self.collection(collection)?;

        // Keep the write out of any pass running over the same scope
        let lock = self.scope_lock(schema, &record);
        let _guard = match &lock {
            Some(lock) => Some(lock.lock().await),
            None => None,
        };

        let id = self
            .local
            .put(&schema.record_type, record, Origin::Local)
            .await?;
        tracing::debug!(collection, id, "record saved locally");
        Ok(id)
    }

    /// Push a record to the server right away and mirror the server's copy.
    ///
    /// Records without a server id are created, the rest are updated. When
    /// the push fails the record is saved locally instead and the error is
    /// returned; the next pass retries it.
    pub async fn save_online(&self, collection: &str, record: Record) -> Result<Record> {
        let schema = self.collection(collection)?;
        let lock = self.scope_lock(schema, &record);
        let _guard = match &lock {
            Some(lock) => Some(lock.lock().await),
            None => None,
        };

        let record_type = schema.record_type.as_str();
        let pushed = match record.id.filter(|id| *id > 0) {
            Some(id) => self.remote.update(record_type, id, &record.outgoing()).await,
            None => self.remote.create(record_type, &record.outgoing()).await,
        }
        .and_then(|stored| {
            if stored.is_authoritative() {
                Ok(stored)
            } else {
                Err(Error::MissingId)
            }
        });

        match pushed {
            Ok(stored) => {
                self.local
                    .put(record_type, stored.clone(), Origin::Remote)
                    .await?;
                if record.is_provisional() {
                    if let Some(id) = record.id {
                        self.local.remove(record_type, id).await?;
                    }
                }
                tracing::debug!(collection, id = ?stored.id, "record saved on server");
                Ok(stored)
            }
            Err(e) => {
                tracing::warn!(
                    collection,
                    code = %e.code(),
                    error = %e,
                    "push failed, record saved locally"
                );
                self.local.put(record_type, record, Origin::Local).await?;
                Err(e)
            }
        }
    }

    /// Read one record from the server, mirroring it locally.
    ///
    /// Falls back to the local copy when the server cannot deliver it.
    /// Returns `None` for records without an id.
    pub async fn read_record(&self, collection: &str, id: RecordId) -> Result<Option<Record>> {
        let schema = self.collection(collection)?;
        let record_type = schema.record_type.as_str();
        if id == 0 {
            return Ok(None);
        }
        // The server has never seen a provisional id
        if id < 0 {
            return self.local.get(record_type, id).await;
        }

        match self.remote.get(record_type, id).await {
            Ok(stored) => {
                self.local
                    .put(record_type, stored.clone(), Origin::Remote)
                    .await?;
                Ok(self.local.get(record_type, id).await?.or(Some(stored)))
            }
            Err(e) => {
                tracing::warn!(
                    collection,
                    id,
                    code = %e.code(),
                    error = %e,
                    "remote read failed, using local copy"
                );
                match self.local.get(record_type, id).await? {
                    Some(local) => Ok(Some(local)),
                    None => Err(e),
                }
            }
        }
    }

    /// Delete a record from the local store only.
    pub async fn remove(&self, collection: &str, id: RecordId) -> Result<()> {
        let schema = self.collection(collection)?;
        self.local.remove(&schema.record_type, id).await?;
        tracing::debug!(collection, id, "record removed locally");
        Ok(())
    }

    async fn local_snapshot(&self, schema: &CollectionSchema, key: &CollectionKey) -> Result<Vec<Record>> {
        self.local
            .scoped(&schema.record_type, &schema.scope_field, &Value::from(key.scope))
            .await
    }

    async fn run_pass(
        &self,
        schema: &CollectionSchema,
        key: &CollectionKey,
        tolerate_offline: bool,
    ) -> Result<Vec<Record>> {
        let local_records = self.local_snapshot(schema, key).await?;

        let remote_records = match self.remote.fetch_collection(&schema.name, key.scope).await {
            Ok(records) => records,
            Err(e) if tolerate_offline => {
                tracing::warn!(
                    collection = %key,
                    code = %e.code(),
                    error = %e,
                    "remote snapshot unavailable, using local snapshot"
                );
                return Ok(local_records);
            }
            Err(e) => return Err(e),
        };

        let reconciler = schema.reconciler().with_tolerance_ms(self.tolerance_ms);
        let report = executor::reconcile(
            &reconciler,
            &schema.record_type,
            &local_records,
            &remote_records,
            self.local.as_ref(),
            self.remote.as_ref(),
        )
        .await;

        tracing::info!(
            collection = %key,
            local = local_records.len(),
            remote = remote_records.len(),
            applied = report.applied,
            failed = report.failures.len(),
            "sync pass complete"
        );

        self.local_snapshot(schema, key).await
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::fake::FakeRemote;
    use crate::local::FileStore;
    use serde_json::json;
    use waitlist_engine::clock::parse_timestamp;
    use waitlist_engine::schema::new_entry;

    fn service() -> SyncService<FileStore, FakeRemote> {
        SyncService::new(Arc::new(FileStore::in_memory()), Arc::new(FakeRemote::new()))
    }

    fn guest(name: &str, seats: i64) -> Record {
        let mut entry = new_entry(14, None);
        entry.set("entry_name", json!(name));
        entry.set("entry_seats", json!(seats));
        entry.set("entry_phone", json!("555"));
        entry
    }

    fn ids(records: &[Record]) -> Vec<RecordId> {
        records.iter().filter_map(|r| r.id).collect()
    }

    #[tokio::test]
    async fn matched_provisional_is_resolved() {
        let service = service();
        let server_copy = service.remote().seed(guest("Al", 2));
        service.save("entries", guest("Al", 2)).await.unwrap();

        let settled = service.sync_collection(&CollectionKey::entries(14)).await.unwrap();

        assert_eq!(ids(&settled), vec![server_copy.id.unwrap()]);
        assert!(service.remote().created().is_empty());
    }

    #[tokio::test]
    async fn string_seats_still_match() {
        let service = service();
        service.remote().seed(guest("Al", 2));
        let local = guest("Al", 2).with_field("entry_seats", json!("2"));
        service.save("entries", local).await.unwrap();

        let settled = service.sync_collection(&CollectionKey::entries(14)).await.unwrap();
        assert_eq!(settled.len(), 1);
        assert!(service.remote().created().is_empty());
    }

    #[tokio::test]
    async fn unmatched_provisional_is_pushed() {
        let service = service();
        service.save("entries", guest("Bo", 4)).await.unwrap();

        let settled = service.sync_collection(&CollectionKey::entries(14)).await.unwrap();

        assert_eq!(settled.len(), 1);
        assert!(settled[0].is_authoritative());
        assert_eq!(settled[0].get("entry_name"), Some(&json!("Bo")));
        assert_eq!(service.remote().records().len(), 1);
    }

    #[tokio::test]
    async fn second_pass_is_a_no_op() {
        let service = service();
        service.remote().seed(guest("Al", 2));
        service.save("entries", guest("Bo", 4)).await.unwrap();
        let key = CollectionKey::entries(14);

        let first = service.sync_collection(&key).await.unwrap();
        let second = service.sync_collection(&key).await.unwrap();

        assert_eq!(first, second);
        assert_eq!(service.remote().created().len(), 1);
    }

    #[tokio::test]
    async fn remote_deletion_and_creation() {
        let service = service();
        let mut gone = guest("Cy", 3).with_id(40);
        gone.updated_at = parse_timestamp("2024-03-01T12:00:00Z");
        service.local().put("entry", gone, Origin::Remote).await.unwrap();
        let fresh = service.remote().seed(guest("Di", 5));

        let settled = service.sync_collection(&CollectionKey::entries(14)).await.unwrap();
        assert_eq!(ids(&settled), vec![fresh.id.unwrap()]);
    }

    #[tokio::test]
    async fn newer_side_wins() {
        let service = service();
        let stale_remote = {
            let mut r = guest("Al", 2).with_id(1);
            r.updated_at = parse_timestamp("2020-01-01T00:00:00Z");
            r
        };
        service.remote().insert(stale_remote.clone());
        // A local edit is stamped now, far ahead of the server copy
        service
            .save("entries", stale_remote.clone().with_field("entry_seats", json!(6)))
            .await
            .unwrap();

        let settled = service.sync_collection(&CollectionKey::entries(14)).await.unwrap();
        assert_eq!(settled[0].get("entry_seats"), Some(&json!(6)));
        assert_eq!(
            service.remote().record(1).unwrap().get("entry_seats"),
            Some(&json!(6))
        );

        // Now the server moves ahead
        let mut newer = service.remote().record(1).unwrap().with_field("entry_seats", json!(8));
        newer.updated_at = parse_timestamp("2099-01-01T00:00:00Z");
        service.remote().insert(newer);

        let settled = service.sync_collection(&CollectionKey::entries(14)).await.unwrap();
        assert_eq!(settled[0].get("entry_seats"), Some(&json!(8)));
    }

    #[tokio::test]
    async fn failed_push_does_not_hang_or_abort() {
        let service = service();
        let fresh = service.remote().seed(guest("Di", 5));
        service.remote().fail_creates(true);
        service.save("entries", guest("Bo", 4)).await.unwrap();

        let settled = service.sync_collection(&CollectionKey::entries(14)).await.unwrap();

        // The remote-only record still arrived
        assert!(settled.iter().any(|r| r.id == fresh.id));
        // The unsent record is still there, still provisional
        let pending: Vec<_> = settled.iter().filter(|r| r.is_provisional()).collect();
        assert_eq!(pending.len(), 1);
        assert_eq!(pending[0].get("entry_name"), Some(&json!("Bo")));

        // Once the server recovers the record goes through
        service.remote().fail_creates(false);
        let settled = service.sync_collection(&CollectionKey::entries(14)).await.unwrap();
        assert!(settled.iter().all(|r| r.is_authoritative()));
        assert_eq!(settled.len(), 2);
    }

    #[tokio::test]
    async fn sync_fails_fast_when_offline() {
        let service = service();
        service.save("entries", guest("Bo", 4)).await.unwrap();
        service.remote().fail_fetch(true);

        let err = service
            .sync_collection(&CollectionKey::entries(14))
            .await
            .unwrap_err();
        assert_eq!(err.code(), json!(599));
        assert!(service.remote().created().is_empty());
    }

    #[tokio::test]
    async fn read_falls_back_to_local_when_offline() {
        let service = service();
        let id = service.save("entries", guest("Bo", 4)).await.unwrap();
        service.remote().fail_fetch(true);

        let records = service.read_collection(&CollectionKey::entries(14)).await.unwrap();
        assert_eq!(ids(&records), vec![id]);
    }

    #[tokio::test]
    async fn other_queues_are_untouched() {
        let service = service();
        let mut other = guest("Ed", 2);
        other.set("entry_queue_id", json!(15));
        let other_id = service.save("entries", other).await.unwrap();

        service.sync_collection(&CollectionKey::entries(14)).await.unwrap();

        assert!(service.local().get("entry", other_id).await.unwrap().is_some());
        assert!(service.remote().created().is_empty());
    }

    #[tokio::test]
    async fn unknown_collection() {
        let service = service();
        let err = service
            .sync_collection(&CollectionKey::new("tables", 1))
            .await
            .unwrap_err();
        assert!(matches!(err, Error::UnknownCollection(name) if name == "tables"));
        assert!(service.save("tables", Record::new()).await.is_err());
    }

    #[tokio::test]
    async fn overlapping_passes_are_serialized() {
        let service = Arc::new(service());
        service.save("entries", guest("Bo", 4)).await.unwrap();
        let key = CollectionKey::entries(14);

        let (a, b) = tokio::join!(service.sync_collection(&key), service.sync_collection(&key));

        assert_eq!(a.unwrap(), b.unwrap());
        assert_eq!(service.remote().created().len(), 1);
    }

    #[tokio::test]
    async fn remove_discards_local_record() {
        let service = service();
        let id = service.save("entries", guest("Bo", 4)).await.unwrap();
        service.remove("entries", id).await.unwrap();

        let settled = service.sync_collection(&CollectionKey::entries(14)).await.unwrap();
        assert!(settled.is_empty());
        assert!(service.remote().created().is_empty());
    }

    #[tokio::test]
    async fn online_save_creates_on_server() {
        let service = service();
        let provisional = service.save("entries", guest("Al", 2)).await.unwrap();
        let local = service.local().get("entry", provisional).await.unwrap().unwrap();

        let stored = service.save_online("entries", local).await.unwrap();

        assert!(stored.is_authoritative());
        assert_eq!(service.remote().created().len(), 1);
        assert_eq!(service.remote().created()[0].id, None);

        let mirrored = service.local().get_all("entry").await.unwrap();
        assert_eq!(ids(&mirrored), ids(&[stored.clone()]));
        assert_eq!(mirrored[0].updated_at_local, stored.updated_at);
    }

    #[tokio::test]
    async fn online_save_updates_server_copy() {
        let service = service();
        let on_server = service.remote().seed(guest("Al", 2));
        let id = on_server.id.unwrap();

        let edited = on_server.with_field("entry_name", json!("Alan"));
        let stored = service.save_online("entries", edited).await.unwrap();

        assert_eq!(stored.id, Some(id));
        assert!(service.remote().created().is_empty());
        let server = service.remote().record(id).unwrap();
        assert_eq!(server.get("entry_name"), Some(&json!("Alan")));
        let local = service.local().get("entry", id).await.unwrap().unwrap();
        assert_eq!(local.updated_at_local, server.updated_at);
    }

    #[tokio::test]
    async fn failed_online_create_saves_locally() {
        let service = service();
        service.remote().fail_creates(true);

        let err = service.save_online("entries", guest("Al", 2)).await.unwrap_err();
        assert!(err.is_transport());

        let local = service.local().get_all("entry").await.unwrap();
        assert_eq!(local.len(), 1);
        assert!(local[0].is_provisional());
        assert!(local[0].updated_at_local.is_some());

        // The next pass delivers it
        service.remote().fail_creates(false);
        let settled = service.sync_collection(&CollectionKey::entries(14)).await.unwrap();
        assert_eq!(settled.len(), 1);
        assert!(settled[0].is_authoritative());
    }

    #[tokio::test]
    async fn failed_online_update_keeps_local_edit() {
        let service = service();
        let on_server = service.remote().seed(guest("Al", 2));
        let id = on_server.id.unwrap();
        service.remote().fail_updates(true);

        let edited = on_server.with_field("entry_name", json!("Alan"));
        let err = service.save_online("entries", edited).await.unwrap_err();
        assert_eq!(err.code(), json!(500));

        let local = service.local().get("entry", id).await.unwrap().unwrap();
        assert_eq!(local.get("entry_name"), Some(&json!("Alan")));
        assert!(local.updated_at_local.is_some());
        let server = service.remote().record(id).unwrap();
        assert_eq!(server.get("entry_name"), Some(&json!("Al")));
    }

    #[tokio::test]
    async fn online_save_without_returned_id_fails() {
        let service = service();
        service.remote().omit_ids(true);

        let err = service.save_online("entries", guest("Al", 2)).await.unwrap_err();
        assert!(matches!(err, Error::MissingId));
        assert!(service.local().get_all("entry").await.unwrap()[0].is_provisional());
    }

    #[tokio::test]
    async fn read_record_mirrors_server_copy() {
        let service = service();
        let on_server = service.remote().seed(guest("Al", 2));
        let id = on_server.id.unwrap();

        let read = service.read_record("entries", id).await.unwrap().unwrap();

        assert_eq!(read.id, Some(id));
        assert_eq!(read.get("entry_name"), Some(&json!("Al")));
        assert_eq!(read.updated_at_local, on_server.updated_at);
        assert!(service.local().get("entry", id).await.unwrap().is_some());
    }

    #[tokio::test]
    async fn read_record_offline_uses_local_copy() {
        let service = service();
        let on_server = service.remote().seed(guest("Al", 2));
        let id = on_server.id.unwrap();
        service.read_record("entries", id).await.unwrap();
        service.remote().fail_fetch(true);

        let read = service.read_record("entries", id).await.unwrap().unwrap();
        assert_eq!(read.id, Some(id));

        let err = service.read_record("entries", id + 1).await.unwrap_err();
        assert!(err.is_transport());
    }

    #[tokio::test]
    async fn read_record_unknown_on_server() {
        let service = service();
        let err = service.read_record("entries", 41).await.unwrap_err();
        assert_eq!(err.code(), json!(404));
    }

    #[tokio::test]
    async fn read_record_without_server_id() {
        let service = service();
        assert_eq!(service.read_record("entries", 0).await.unwrap(), None);

        service.remote().fail_fetch(true);
        let provisional = service.save("entries", guest("Bo", 4)).await.unwrap();
        let read = service.read_record("entries", provisional).await.unwrap().unwrap();
        assert_eq!(read.id, Some(provisional));
    }

    #[test]
    fn key_display() {
        assert_eq!(CollectionKey::entries(14).to_string(), "entries/14");
    }
}
