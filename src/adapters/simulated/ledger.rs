//! In-process task store with harness-controlled transaction resolution.

use std::collections::HashMap;
use std::sync::{Mutex, MutexGuard, PoisonError};

use tokio::sync::mpsc;

use crate::error::Error;
use crate::model::{Identity, TaskId, TaskRecord, TransactionHandle, TxOutcome};
use crate::ports::{LedgerClient, PortFuture};

#[derive(Debug, Clone)]
enum Mutation {
    Create { title: String, body: String },
    Delete(TaskId),
}

#[derive(Debug, Clone)]
enum Transaction {
    Pending(Mutation),
    Resolved(TxOutcome),
}

#[derive(Debug, Default)]
struct LedgerState {
    records: Vec<TaskRecord>,
    next_id: u64,
    next_tx: u64,
    transactions: HashMap<TransactionHandle, Transaction>,
    submit_fault: Option<Error>,
    read_fault: Option<Error>,
    auto_confirm: bool,
    reads: usize,
}

impl LedgerState {
    fn apply(&mut self, mutation: &Mutation) -> Option<TaskId> {
        match mutation {
            Mutation::Create { title, body } => {
                let id = TaskId(self.next_id);
                self.next_id += 1;
                self.records.push(TaskRecord {
                    id,
                    title: title.clone(),
                    body: body.clone(),
                    deleted: false,
                });
                Some(id)
            }
            Mutation::Delete(id) => {
                if let Some(record) = self.records.iter_mut().find(|r| r.id == *id) {
                    record.deleted = true;
                }
                None
            }
        }
    }
}

/// A task store living in memory.
///
/// Every submission is announced on an internal channel (see
/// [`SimulatedLedger::next_submission`]) and stays pending until
/// [`SimulatedLedger::confirm`] or [`SimulatedLedger::fail`] is called,
/// unless auto-confirm is on.
pub struct SimulatedLedger {
    state: Mutex<LedgerState>,
    announce: mpsc::UnboundedSender<TransactionHandle>,
    submissions: tokio::sync::Mutex<mpsc::UnboundedReceiver<TransactionHandle>>,
}

impl SimulatedLedger {
    /// An empty store whose first task gets id 1.
    #[must_use]
    pub fn new() -> Self {
        Self::with_records(Vec::new())
    }

    /// A store pre-populated with `records`; new ids continue after the highest one.
    #[must_use]
    pub fn with_records(records: Vec<TaskRecord>) -> Self {
        let next_id = records.iter().map(|r| r.id.0).max().map_or(1, |max| max + 1);
        let (announce, submissions) = mpsc::unbounded_channel();
        Self {
            state: Mutex::new(LedgerState { records, next_id, next_tx: 1, ..LedgerState::default() }),
            announce,
            submissions: tokio::sync::Mutex::new(submissions),
        }
    }

    /// Sets the id the next confirmed create receives.
    pub fn set_next_id(&self, id: u64) {
        self.lock().next_id = id;
    }

    /// Confirms every submission immediately.
    pub fn set_auto_confirm(&self, enabled: bool) {
        self.lock().auto_confirm = enabled;
    }

    /// Makes the next submission fail with `error` without creating a transaction.
    pub fn fail_next_submission(&self, error: Error) {
        self.lock().submit_fault = Some(error);
    }

    /// Makes every read fail with `error` until [`SimulatedLedger::restore_reads`].
    pub fn fail_reads(&self, error: Error) {
        self.lock().read_fault = Some(error);
    }

    /// Clears a read fault.
    pub fn restore_reads(&self) {
        self.lock().read_fault = None;
    }

    /// Waits for the next submitted transaction.
    pub async fn next_submission(&self) -> Option<TransactionHandle> {
        self.submissions.lock().await.recv().await
    }

    /// Applies a pending transaction and resolves it as confirmed.
    ///
    /// Returns the id assigned by a create.
    pub fn confirm(&self, handle: &TransactionHandle) -> Option<TaskId> {
        let mut state = self.lock();
        let Some(Transaction::Pending(mutation)) = state.transactions.get(handle).cloned() else {
            return None;
        };
        let created = state.apply(&mutation);
        state.transactions.insert(handle.clone(), Transaction::Resolved(TxOutcome::Confirmed));
        created
    }

    /// Resolves a pending transaction as failed without applying it.
    pub fn fail(&self, handle: &TransactionHandle, reason: &str) {
        let mut state = self.lock();
        if matches!(state.transactions.get(handle), Some(Transaction::Pending(_))) {
            state.transactions.insert(
                handle.clone(),
                Transaction::Resolved(TxOutcome::Failed { reason: reason.to_string() }),
            );
        }
    }

    /// Adds a record directly, as another client would.
    pub fn push_record(&self, title: &str, body: &str) -> TaskId {
        let mut state = self.lock();
        state
            .apply(&Mutation::Create { title: title.to_string(), body: body.to_string() })
            .unwrap_or(TaskId(0))
    }

    /// Current records, tombstones included.
    #[must_use]
    pub fn records(&self) -> Vec<TaskRecord> {
        self.lock().records.clone()
    }

    /// Number of `list_items` calls served, failed ones included.
    #[must_use]
    pub fn read_count(&self) -> usize {
        self.lock().reads
    }

    fn submit(&self, mutation: Mutation) -> crate::error::Result<TransactionHandle> {
        let handle = {
            let mut state = self.lock();
            if let Some(error) = state.submit_fault.take() {
                return Err(error);
            }
            let handle = TransactionHandle(format!("0xsim{:04}", state.next_tx));
            state.next_tx += 1;
            let tx = if state.auto_confirm {
                state.apply(&mutation);
                Transaction::Resolved(TxOutcome::Confirmed)
            } else {
                Transaction::Pending(mutation)
            };
            state.transactions.insert(handle.clone(), tx);
            handle
        };
        // The receiver lives as long as `self`, so this cannot fail.
        let _ = self.announce.send(handle.clone());
        Ok(handle)
    }

    fn lock(&self) -> MutexGuard<'_, LedgerState> {
        self.state.lock().unwrap_or_else(PoisonError::into_inner)
    }
}

impl Default for SimulatedLedger {
    fn default() -> Self {
        Self::new()
    }
}

impl LedgerClient for SimulatedLedger {
    fn list_items(&self) -> PortFuture<'_, Vec<TaskRecord>> {
        let result = {
            let mut state = self.lock();
            state.reads += 1;
            match &state.read_fault {
                Some(error) => Err(error.clone()),
                None => Ok(state.records.clone()),
            }
        };
        Box::pin(async move { result })
    }

    fn submit_create(
        &self,
        _from: &Identity,
        title: &str,
        body: &str,
    ) -> PortFuture<'_, TransactionHandle> {
        let result =
            self.submit(Mutation::Create { title: title.to_string(), body: body.to_string() });
        Box::pin(async move { result })
    }

    fn submit_delete(&self, _from: &Identity, id: TaskId) -> PortFuture<'_, TransactionHandle> {
        let result = self.submit(Mutation::Delete(id));
        Box::pin(async move { result })
    }

    fn receipt(&self, handle: &TransactionHandle) -> PortFuture<'_, Option<TxOutcome>> {
        let result = match self.lock().transactions.get(handle) {
            Some(Transaction::Pending(_)) => Ok(None),
            Some(Transaction::Resolved(outcome)) => Ok(Some(outcome.clone())),
            None => Err(Error::Read(format!("unknown transaction {handle}"))),
        };
        Box::pin(async move { result })
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn from() -> Identity {
        Identity("0xaaa".into())
    }

    #[tokio::test]
    async fn create_stays_pending_until_confirmed() {
        let ledger = SimulatedLedger::new();
        let handle = ledger.submit_create(&from(), "Buy milk", "2%").await.unwrap();

        assert_eq!(ledger.next_submission().await, Some(handle.clone()));
        assert_eq!(ledger.receipt(&handle).await.unwrap(), None);
        assert!(ledger.list_items().await.unwrap().is_empty());

        assert_eq!(ledger.confirm(&handle), Some(TaskId(1)));
        assert_eq!(ledger.receipt(&handle).await.unwrap(), Some(TxOutcome::Confirmed));
        assert_eq!(ledger.list_items().await.unwrap()[0].title, "Buy milk");
    }

    #[tokio::test]
    async fn delete_leaves_a_tombstone() {
        let ledger = SimulatedLedger::new();
        let id = ledger.push_record("a", "b");
        let handle = ledger.submit_delete(&from(), id).await.unwrap();
        ledger.confirm(&handle);

        let records = ledger.list_items().await.unwrap();
        assert_eq!(records.len(), 1);
        assert!(records[0].deleted);
    }

    #[tokio::test]
    async fn failed_transaction_is_not_applied() {
        let ledger = SimulatedLedger::new();
        let handle = ledger.submit_create(&from(), "a", "b").await.unwrap();
        ledger.fail(&handle, "reverted");

        assert!(matches!(ledger.receipt(&handle).await.unwrap(), Some(TxOutcome::Failed { .. })));
        assert!(ledger.records().is_empty());
    }

    #[tokio::test]
    async fn faults_are_injected() {
        let ledger = SimulatedLedger::new();
        ledger.fail_next_submission(Error::Submission("offline".into()));
        assert!(ledger.submit_create(&from(), "a", "b").await.is_err());
        assert!(ledger.submit_create(&from(), "a", "b").await.is_ok());

        ledger.fail_reads(Error::Read("offline".into()));
        assert!(ledger.list_items().await.is_err());
        ledger.restore_reads();
        assert!(ledger.list_items().await.is_ok());
        assert_eq!(ledger.read_count(), 2);
    }

    #[test]
    fn ids_continue_after_existing_records() {
        let ledger = SimulatedLedger::with_records(vec![TaskRecord {
            id: TaskId(41),
            title: "old".into(),
            body: "old".into(),
            deleted: true,
        }]);
        assert_eq!(ledger.push_record("new", "new"), TaskId(42));
    }
}
