//! Replaying adapter for the `LedgerClient` port.

use std::sync::{Arc, Mutex};

use super::{decode, next_output};
use crate::cassette::replayer::CassetteReplayer;
use crate::error::Result;
use crate::model::{Identity, TaskId, TaskRecord, TransactionHandle, TxOutcome};
use crate::ports::{LedgerClient, PortFuture};

/// Serves recorded ledger reads, submissions and receipts.
///
/// Arguments are not checked against the recording; each method simply
/// answers with its next recorded result.
pub struct ReplayingLedgerClient {
    replayer: Option<Arc<Mutex<CassetteReplayer>>>,
}

impl ReplayingLedgerClient {
    /// Replays from `replayer`.
    #[must_use]
    pub fn new(replayer: Arc<Mutex<CassetteReplayer>>) -> Self {
        Self { replayer: Some(replayer) }
    }

    /// A ledger with no cassette. Panics when called.
    #[must_use]
    pub fn unconfigured() -> Self {
        Self { replayer: None }
    }

    fn replay<T: serde::de::DeserializeOwned + Send + 'static>(
        &self,
        method: &str,
    ) -> PortFuture<'_, T> {
        let result: Result<T> = decode(next_output(self.replayer.as_ref(), "ledger", method), "ledger", method);
        Box::pin(async move { result })
    }
}

impl LedgerClient for ReplayingLedgerClient {
    fn list_items(&self) -> PortFuture<'_, Vec<TaskRecord>> {
        self.replay("list_items")
    }

    fn submit_create(&self, _from: &Identity, _title: &str, _body: &str) -> PortFuture<'_, TransactionHandle> {
        self.replay("submit_create")
    }

    fn submit_delete(&self, _from: &Identity, _id: TaskId) -> PortFuture<'_, TransactionHandle> {
        self.replay("submit_delete")
    }

    fn receipt(&self, _handle: &TransactionHandle) -> PortFuture<'_, Option<TxOutcome>> {
        self.replay("receipt")
    }
}
