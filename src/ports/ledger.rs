//! Ledger client port for the authoritative task store.

use super::PortFuture;
use crate::model::{Identity, TaskId, TaskRecord, TransactionHandle, TxOutcome};

/// Reads and writes the authoritative, append-only task store.
///
/// Writes return as soon as a transaction exists; its outcome is observed
/// separately through [`LedgerClient::receipt`].
pub trait LedgerClient: Send + Sync {
    /// Returns the full current task set, tombstoned rows included.
    ///
    /// # Errors
    ///
    /// Returns `Read` if the store cannot be read or the payload is malformed.
    fn list_items(&self) -> PortFuture<'_, Vec<TaskRecord>>;

    /// Submits a create transaction signed by `from`.
    ///
    /// # Errors
    ///
    /// Returns `Submission` (or `UserRejected` for a declined signature) if no
    /// transaction was created.
    fn submit_create(&self, from: &Identity, title: &str, body: &str)
        -> PortFuture<'_, TransactionHandle>;

    /// Submits a delete transaction for `id` signed by `from`.
    ///
    /// # Errors
    ///
    /// Returns `Submission` (or `UserRejected`) if no transaction was created.
    fn submit_delete(&self, from: &Identity, id: TaskId) -> PortFuture<'_, TransactionHandle>;

    /// Looks up the outcome of a transaction; `None` while it is still pending.
    ///
    /// # Errors
    ///
    /// Returns `Read` if the lookup itself fails.
    fn receipt(&self, handle: &TransactionHandle) -> PortFuture<'_, Option<TxOutcome>>;
}
