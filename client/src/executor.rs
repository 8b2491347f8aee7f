//! Worklist execution.
//!
//! Every item of a [`SyncPlan`] is dispatched at once and the pass waits for
//! all of them. A failing item never aborts the others: its error is logged,
//! recorded in the [`ExecutionReport`] and the next pass tries again.

use crate::error::{Error, Result};
use crate::local::LocalStore;
use crate::remote::RemoteSource;
use futures::future::join_all;
use waitlist_engine::{ActionKind, Origin, Reconciler, Record, RecordId, SyncAction, SyncPlan};

/// One worklist item that did not take effect.
#[derive(Debug)]
pub struct ItemFailure {
    pub kind: ActionKind,
    pub record_id: Option<RecordId>,
    pub error: Error,
}

/// Outcome of executing a worklist.
#[derive(Debug, Default)]
pub struct ExecutionReport {
    /// Items that took full effect
    pub applied: usize,
    /// Items that failed
    pub failures: Vec<ItemFailure>,
}

impl ExecutionReport {
    /// Number of items executed.
    pub fn total(&self) -> usize {
        self.applied + self.failures.len()
    }

    /// True if nothing failed.
    pub fn is_clean(&self) -> bool {
        self.failures.is_empty()
    }
}

/// Plan a pass over two snapshots and carry it out.
///
/// Completes once every side effect of the pass has completed.
pub async fn reconcile<L, R>(
    reconciler: &Reconciler,
    record_type: &str,
    local_records: &[Record],
    remote_records: &[Record],
    local: &L,
    remote: &R,
) -> ExecutionReport
where
    L: LocalStore + ?Sized,
    R: RemoteSource + ?Sized,
{
    let plan = reconciler.plan(local_records, remote_records);
    tracing::debug!(record_type, plan = %plan, "worklist planned");
    execute(plan, record_type, local, remote).await
}

/// Execute every item of a plan concurrently.
pub async fn execute<L, R>(plan: SyncPlan, record_type: &str, local: &L, remote: &R) -> ExecutionReport
where
    L: LocalStore + ?Sized,
    R: RemoteSource + ?Sized,
{
    let mut report = ExecutionReport::default();
    if plan.is_empty() {
        return report;
    }

    let items = plan.into_iter().map(|action| {
        let kind = action.kind();
        let record_id = action.record_id();
        async move {
            let result = apply(action, record_type, local, remote).await;
            (kind, record_id, result)
        }
    });

    for (kind, record_id, result) in join_all(items).await {
        match result {
            Ok(()) => report.applied += 1,
            Err(error) => {
                tracing::warn!(
                    record_type,
                    kind = %kind,
                    record_id = ?record_id,
                    code = %error.code(),
                    error = %error,
                    "worklist item failed"
                );
                report.failures.push(ItemFailure {
                    kind,
                    record_id,
                    error,
                });
            }
        }
    }

    report
}

async fn apply<L, R>(action: SyncAction, record_type: &str, local: &L, remote: &R) -> Result<()>
where
    L: LocalStore + ?Sized,
    R: RemoteSource + ?Sized,
{
    match action {
        SyncAction::CreateOnServer { record } => {
            // Provisional ids are never sent; the retained copy gets a fresh
            // one so it cannot collide with the destroy of the old id
            let outgoing = record.outgoing();
            let pushed = remote
                .create(record_type, &outgoing)
                .await
                .and_then(require_id);
            store_push_result(record_type, pushed, outgoing, local).await
        }
        SyncAction::LocalToServer { record } => {
            let Some(id) = record.assigned_id() else {
                return Err(Error::MissingId);
            };
            let pushed = remote
                .update(record_type, id, &record.outgoing())
                .await
                .and_then(require_id);
            store_push_result(record_type, pushed, record, local).await
        }
        SyncAction::CreateOnLocal { record } | SyncAction::ServerToLocal { record } => {
            local.put(record_type, record, Origin::Remote).await.map(|_| ())
        }
        SyncAction::DestroyLocal { id } => local.remove(record_type, id).await,
    }
}

/// Write the server's copy on success, or keep the attempted copy locally.
async fn store_push_result<L>(
    record_type: &str,
    pushed: Result<Record>,
    attempted: Record,
    local: &L,
) -> Result<()>
where
    L: LocalStore + ?Sized,
{
    match pushed {
        Ok(stored) => local.put(record_type, stored, Origin::Remote).await.map(|_| ()),
        Err(push_error) => {
            if let Err(store_error) = local.put(record_type, attempted, Origin::Retained).await {
                tracing::error!(
                    record_type,
                    error = %store_error,
                    "failed to retain record after push failure"
                );
            }
            Err(push_error)
        }
    }
}

fn require_id(record: Record) -> Result<Record> {
    if record.is_authoritative() {
        Ok(record)
    } else {
        Err(Error::MissingId)
    }
}
