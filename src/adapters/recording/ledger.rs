//! Recording adapter for the `LedgerClient` port.

use std::sync::{Arc, Mutex};

use serde_json::json;

use super::record_interaction;
use crate::cassette::recorder::CassetteRecorder;
use crate::model::{Identity, TaskId, TaskRecord, TransactionHandle, TxOutcome};
use crate::ports::{LedgerClient, PortFuture};

/// Records reads, submissions and receipt lookups while delegating to an inner ledger.
pub struct RecordingLedgerClient {
    inner: Arc<dyn LedgerClient>,
    recorder: Arc<Mutex<CassetteRecorder>>,
}

impl RecordingLedgerClient {
    /// Wraps `inner`, recording into `recorder`.
    pub fn new(inner: Arc<dyn LedgerClient>, recorder: Arc<Mutex<CassetteRecorder>>) -> Self {
        Self { inner, recorder }
    }
}

impl LedgerClient for RecordingLedgerClient {
    fn list_items(&self) -> PortFuture<'_, Vec<TaskRecord>> {
        Box::pin(async move {
            let result = self.inner.list_items().await;
            record_interaction(&self.recorder, "ledger", "list_items", &json!({}), &result);
            result
        })
    }

    fn submit_create(
        &self,
        from: &Identity,
        title: &str,
        body: &str,
    ) -> PortFuture<'_, TransactionHandle> {
        let from = from.clone();
        let (title, body) = (title.to_string(), body.to_string());
        Box::pin(async move {
            let result = self.inner.submit_create(&from, &title, &body).await;
            let input = json!({ "from": from, "title": title, "body": body });
            record_interaction(&self.recorder, "ledger", "submit_create", &input, &result);
            result
        })
    }

    fn submit_delete(&self, from: &Identity, id: TaskId) -> PortFuture<'_, TransactionHandle> {
        let from = from.clone();
        Box::pin(async move {
            let result = self.inner.submit_delete(&from, id).await;
            let input = json!({ "from": from, "id": id });
            record_interaction(&self.recorder, "ledger", "submit_delete", &input, &result);
            result
        })
    }

    fn receipt(&self, handle: &TransactionHandle) -> PortFuture<'_, Option<TxOutcome>> {
        let handle = handle.clone();
        Box::pin(async move {
            let result = self.inner.receipt(&handle).await;
            record_interaction(&self.recorder, "ledger", "receipt", &json!({ "handle": handle }), &result);
            result
        })
    }
}
