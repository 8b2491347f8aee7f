//! Local record store.
//!
//! [`FileStore`] keeps the replica in memory and rewrites a JSON snapshot of
//! it after every mutation. The file is replaced atomically (temp file, then
//! rename) so a crash never leaves a half-written replica behind.

use crate::error::Result;
use async_trait::async_trait;
use chrono::Utc;
use serde_json::Value;
use std::path::{Path, PathBuf};
use tokio::sync::Mutex;
use waitlist_engine::{coerce_to_string, Origin, Record, RecordId, Store, StoreSnapshot};

/// Persistent key-value store of records, keyed by type and id.
#[async_trait]
pub trait LocalStore: Send + Sync {
    /// Every record of a type, ordered by id.
    async fn get_all(&self, record_type: &str) -> Result<Vec<Record>>;

    /// One record by id.
    async fn get(&self, record_type: &str, id: RecordId) -> Result<Option<Record>>;

    /// Insert or replace a record. Records without an id get the next
    /// provisional id. Returns the id the record was stored under.
    async fn put(&self, record_type: &str, record: Record, origin: Origin) -> Result<RecordId>;

    /// Delete a record. Deleting a missing record is not an error.
    async fn remove(&self, record_type: &str, id: RecordId) -> Result<()>;

    /// Delete every record of a type.
    async fn clear(&self, record_type: &str) -> Result<()>;

    /// Records whose `field` string-coerces equal to `scope`.
    async fn scoped(&self, record_type: &str, field: &str, scope: &Value) -> Result<Vec<Record>> {
        let wanted = coerce_to_string(Some(scope));
        Ok(self
            .get_all(record_type)
            .await?
            .into_iter()
            .filter(|r| coerce_to_string(r.attribute(field).as_deref()) == wanted)
            .collect())
    }
}

/// [`LocalStore`] persisted to a JSON file.
#[derive(Debug)]
pub struct FileStore {
    store: Mutex<Store>,
    path: Option<PathBuf>,
}

impl FileStore {
    /// Open the store at `path`, loading it if the file exists.
    pub async fn open(path: impl Into<PathBuf>) -> Result<Self> {
        let path = path.into();
        let mut store = Store::new();

        match tokio::fs::read_to_string(&path).await {
            Ok(json) => {
                store.import_state(StoreSnapshot::from_json(&json)?)?;
                tracing::info!(
                    path = %path.display(),
                    records = store.record_count(),
                    "local store loaded"
                );
            }
            Err(e) if e.kind() == std::io::ErrorKind::NotFound => {
                tracing::info!(path = %path.display(), "local store created");
            }
            Err(e) => return Err(e.into()),
        }

        Ok(Self {
            store: Mutex::new(store),
            path: Some(path),
        })
    }

    /// A store that is never written to disk.
    pub fn in_memory() -> Self {
        Self {
            store: Mutex::new(Store::new()),
            path: None,
        }
    }

    /// Get the backing file, if any.
    pub fn path(&self) -> Option<&Path> {
        self.path.as_deref()
    }

    /// Copy of the current state.
    pub async fn snapshot(&self) -> StoreSnapshot {
        self.store.lock().await.export_state()
    }

    async fn persist(&self, store: &Store) -> Result<()> {
        let Some(path) = &self.path else {
            return Ok(());
        };

        let json = store.export_state().to_json_pretty()?;
        if let Some(parent) = path.parent().filter(|p| !p.as_os_str().is_empty()) {
            tokio::fs::create_dir_all(parent).await?;
        }

        let mut tmp = path.clone().into_os_string();
        tmp.push(".tmp");
        let tmp = PathBuf::from(tmp);
        tokio::fs::write(&tmp, json).await?;
        tokio::fs::rename(&tmp, path).await?;
        Ok(())
    }
}

#[async_trait]
impl LocalStore for FileStore {
    async fn get_all(&self, record_type: &str) -> Result<Vec<Record>> {
        Ok(self.store.lock().await.get_all(record_type))
    }

    async fn get(&self, record_type: &str, id: RecordId) -> Result<Option<Record>> {
        Ok(self.store.lock().await.get(record_type, id).cloned())
    }

    async fn put(&self, record_type: &str, record: Record, origin: Origin) -> Result<RecordId> {
        let mut store = self.store.lock().await;
        let id = store.put(record_type, record, origin, Utc::now());
        self.persist(&store).await?;
        Ok(id)
    }

    async fn remove(&self, record_type: &str, id: RecordId) -> Result<()> {
        let mut store = self.store.lock().await;
        if store.remove(record_type, id).is_some() {
            self.persist(&store).await?;
        }
        Ok(())
    }

    async fn clear(&self, record_type: &str) -> Result<()> {
        let mut store = self.store.lock().await;
        store.clear(record_type);
        self.persist(&store).await
    }

    async fn scoped(&self, record_type: &str, field: &str, scope: &Value) -> Result<Vec<Record>> {
        Ok(self.store.lock().await.scoped(record_type, field, scope))
    }
}
