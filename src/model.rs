//! Task, operation and snapshot types.

use std::fmt;

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

/// Identifier the ledger assigns to a task. Never reused.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
#[serde(transparent)]
pub struct TaskId(pub u64);

impl fmt::Display for TaskId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.0)
    }
}

/// Client-side correlation key for a row in the task collection.
///
/// Proposed tasks get a generated key; tasks first seen in a ledger read get
/// a key derived from their ledger id. A committed create keeps the key it
/// was proposed under so renderers see a stable row.
#[derive(Debug, Clone, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
#[serde(transparent)]
pub struct LocalKey(String);

impl LocalKey {
    /// Wraps a freshly generated identifier.
    #[must_use]
    pub fn new(raw: impl Into<String>) -> Self {
        Self(raw.into())
    }

    /// Key for a task that entered the collection through a ledger read.
    #[must_use]
    pub fn for_ledger_id(id: TaskId) -> Self {
        Self(format!("ledger-{id}"))
    }

    /// Returns the key as a string slice.
    #[must_use]
    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl fmt::Display for LocalKey {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.0)
    }
}

/// An authorized signing account.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(transparent)]
pub struct Identity(pub String);

impl fmt::Display for Identity {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.0)
    }
}

/// Opaque token for a submitted transaction.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(transparent)]
pub struct TransactionHandle(pub String);

impl fmt::Display for TransactionHandle {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.0)
    }
}

/// How the ledger resolved a transaction.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub enum TxOutcome {
    /// The mutation is part of the authoritative state.
    Confirmed,
    /// The mutation was rejected, reverted, or not observed in time.
    Failed {
        /// Human-readable cause.
        reason: String,
    },
}

/// One row of a ledger read, tombstones included.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct TaskRecord {
    /// Ledger-assigned identifier.
    pub id: TaskId,
    /// Task title.
    pub title: String,
    /// Task body.
    pub body: String,
    /// Tombstone flag maintained by the ledger.
    pub deleted: bool,
}

/// Whether an active-view row is known to the ledger yet.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum TaskStatus {
    /// Local only; its create transaction has not been reconciled.
    Proposed,
    /// Present in the ledger under `id`.
    Confirmed,
}

/// A row of the active view.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Task {
    /// Stable local key.
    pub key: LocalKey,
    /// Ledger id; `None` while proposed.
    pub id: Option<TaskId>,
    /// Task title.
    pub title: String,
    /// Task body.
    pub body: String,
    /// Proposed or confirmed.
    pub status: TaskStatus,
}

/// Kind of an in-flight mutation.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum OperationKind {
    /// Creating a new task.
    Create,
    /// Deleting an existing task.
    Delete,
}

/// Progress of an in-flight mutation.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum OperationStatus {
    /// Proposed locally; authorization or submission still running.
    Preparing,
    /// A transaction exists and is being watched.
    Submitted,
    /// The ledger confirmed it; waiting for a read to reconcile.
    Confirmed,
    /// The ledger rejected it.
    ///
    /// Never appears in a published snapshot: the rollback that follows a
    /// failure removes the operation in the same step.
    Failed,
}

/// Bookkeeping for one in-flight create or delete.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct PendingOperation {
    /// Create or delete.
    pub kind: OperationKind,
    /// Key of the row this operation belongs to.
    pub key: LocalKey,
    /// Ledger id being deleted; only set for deletes.
    pub target: Option<TaskId>,
    /// Current progress.
    pub status: OperationStatus,
    /// Transaction handle once submitted.
    pub handle: Option<TransactionHandle>,
    /// When the intent was proposed.
    pub submitted_at: DateTime<Utc>,
}

/// A fully settled view of the task collection.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct Snapshot {
    /// Increases by one with every state transition.
    pub revision: u64,
    /// Active view: confirmed tasks in ledger order, then proposed tasks.
    pub tasks: Vec<Task>,
    /// Ids hidden while their deletion is in flight.
    pub deleting: Vec<TaskId>,
    /// In-flight operations, oldest first.
    pub pending: Vec<PendingOperation>,
}

impl Snapshot {
    /// Finds an active task by ledger id.
    #[must_use]
    pub fn task(&self, id: TaskId) -> Option<&Task> {
        self.tasks.iter().find(|task| task.id == Some(id))
    }

    /// Returns `true` when the active view has no tasks.
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.tasks.is_empty()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn ledger_keys_are_derived_from_id() {
        assert_eq!(LocalKey::for_ledger_id(TaskId(7)).as_str(), "ledger-7");
    }

    #[test]
    fn snapshot_finds_task_by_id() {
        let snapshot = Snapshot {
            revision: 1,
            tasks: vec![Task {
                key: LocalKey::for_ledger_id(TaskId(3)),
                id: Some(TaskId(3)),
                title: "a".into(),
                body: "b".into(),
                status: TaskStatus::Confirmed,
            }],
            ..Snapshot::default()
        };
        assert!(snapshot.task(TaskId(3)).is_some());
        assert!(snapshot.task(TaskId(4)).is_none());
    }

    #[test]
    fn task_record_deserializes_from_json() {
        let record: TaskRecord = serde_json::from_value(serde_json::json!({
            "id": 7, "title": "Buy milk", "body": "2%", "deleted": false
        }))
        .unwrap();
        assert_eq!(record.id, TaskId(7));
        assert!(!record.deleted);
    }
}
