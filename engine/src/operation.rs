//! Worklist items produced by a reconciliation pass.
//!
//! Each [`SyncAction`] is one independent side effect. Nothing in a plan
//! depends on the order in which its actions are carried out.

use crate::{Record, RecordId};
use serde::{Deserialize, Serialize};
use std::fmt;

/// The kind of a worklist item, without its payload.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "kebab-case")]
pub enum ActionKind {
    CreateOnServer,
    CreateOnLocal,
    LocalToServer,
    ServerToLocal,
    DestroyLocal,
}

impl ActionKind {
    /// All kinds, in a stable order.
    pub const ALL: [ActionKind; 5] = [
        ActionKind::CreateOnServer,
        ActionKind::CreateOnLocal,
        ActionKind::LocalToServer,
        ActionKind::ServerToLocal,
        ActionKind::DestroyLocal,
    ];

    /// The wire tag of this kind.
    pub fn as_str(&self) -> &'static str {
        match self {
            ActionKind::CreateOnServer => "create-on-server",
            ActionKind::CreateOnLocal => "create-on-local",
            ActionKind::LocalToServer => "local-to-server",
            ActionKind::ServerToLocal => "server-to-local",
            ActionKind::DestroyLocal => "destroy-local",
        }
    }
}

impl fmt::Display for ActionKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// One scheduled action.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(tag = "type", rename_all = "kebab-case")]
pub enum SyncAction {
    /// Push a provisional local record to the server
    CreateOnServer { record: Record },
    /// Write a server record into the local store
    CreateOnLocal { record: Record },
    /// Push a newer local copy to the server
    LocalToServer { record: Record },
    /// Overwrite the local copy with a newer server copy
    ServerToLocal { record: Record },
    /// Delete a record from the local store
    DestroyLocal { id: RecordId },
}

impl SyncAction {
    /// Get the kind of this action.
    pub fn kind(&self) -> ActionKind {
        match self {
            SyncAction::CreateOnServer { .. } => ActionKind::CreateOnServer,
            SyncAction::CreateOnLocal { .. } => ActionKind::CreateOnLocal,
            SyncAction::LocalToServer { .. } => ActionKind::LocalToServer,
            SyncAction::ServerToLocal { .. } => ActionKind::ServerToLocal,
            SyncAction::DestroyLocal { .. } => ActionKind::DestroyLocal,
        }
    }

    /// Get the id of the record this action targets, if it has one.
    pub fn record_id(&self) -> Option<RecordId> {
        match self {
            SyncAction::DestroyLocal { id } => Some(*id),
            SyncAction::CreateOnServer { record }
            | SyncAction::CreateOnLocal { record }
            | SyncAction::LocalToServer { record }
            | SyncAction::ServerToLocal { record } => record.id,
        }
    }

    /// Get the record carried by this action (none for destroys).
    pub fn record(&self) -> Option<&Record> {
        match self {
            SyncAction::DestroyLocal { .. } => None,
            SyncAction::CreateOnServer { record }
            | SyncAction::CreateOnLocal { record }
            | SyncAction::LocalToServer { record }
            | SyncAction::ServerToLocal { record } => Some(record),
        }
    }
}

/// The ordered worklist of one reconciliation pass.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct SyncPlan {
    actions: Vec<SyncAction>,
}

impl SyncPlan {
    /// Create an empty plan.
    pub fn new() -> Self {
        Self::default()
    }

    /// Append an action.
    pub fn push(&mut self, action: SyncAction) {
        self.actions.push(action);
    }

    /// Get all actions in scheduling order.
    pub fn actions(&self) -> &[SyncAction] {
        &self.actions
    }

    /// Number of actions.
    pub fn len(&self) -> usize {
        self.actions.len()
    }

    /// Check if there is nothing to do.
    pub fn is_empty(&self) -> bool {
        self.actions.is_empty()
    }

    /// Count actions of one kind.
    pub fn count(&self, kind: ActionKind) -> usize {
        self.actions.iter().filter(|a| a.kind() == kind).count()
    }

    /// Iterate over actions.
    pub fn iter(&self) -> std::slice::Iter<'_, SyncAction> {
        self.actions.iter()
    }
}

impl IntoIterator for SyncPlan {
    type Item = SyncAction;
    type IntoIter = std::vec::IntoIter<SyncAction>;

    fn into_iter(self) -> Self::IntoIter {
        self.actions.into_iter()
    }
}

impl fmt::Display for SyncPlan {
    /// Compact summary, e.g. `create-on-server=1 destroy-local=1`.
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        if self.is_empty() {
            return f.write_str("empty");
        }
        let mut first = true;
        for kind in ActionKind::ALL {
            let count = self.count(kind);
            if count == 0 {
                continue;
            }
            if !first {
                f.write_str(" ")?;
            }
            write!(f, "{}={}", kind, count)?;
            first = false;
        }
        Ok(())
    }
}
