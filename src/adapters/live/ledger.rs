//! Live adapter for the `LedgerClient` port, talking to the task store
//! contract through JSON-RPC.

use std::sync::Arc;

use serde::Deserialize;
use serde_json::json;
use tracing::{debug, info};

use super::abi::{self, Token};
use super::rpc::{RpcClient, RpcError};
use crate::config::{ContractInterface, LedgerConfig};
use crate::error::Error;
use crate::model::{Identity, TaskId, TaskRecord, TransactionHandle, TxOutcome};
use crate::ports::{LedgerClient, PortFuture};

/// Ledger client backed by a node or wallet JSON-RPC endpoint.
pub struct LiveLedgerClient {
    rpc: Arc<RpcClient>,
    store_address: String,
    interface: ContractInterface,
}

impl LiveLedgerClient {
    /// Creates a client for the configured contract, sharing the given RPC client.
    #[must_use]
    pub fn new(rpc: Arc<RpcClient>, config: &LedgerConfig) -> Self {
        Self { rpc, store_address: config.store_address.clone(), interface: config.interface }
    }

    fn send(&self, from: Identity, data: String) -> PortFuture<'_, TransactionHandle> {
        Box::pin(async move {
            let tx = json!({ "from": from.0, "to": self.store_address, "data": data });
            let hash: String = self
                .rpc
                .call("eth_sendTransaction", json!([tx]))
                .await
                .map_err(submission_error)?;
            info!(handle = %hash, from = %from, "transaction submitted");
            Ok(TransactionHandle(hash))
        })
    }
}

/// The subset of a transaction receipt the tracker needs.
#[derive(Deserialize)]
struct Receipt {
    status: Option<String>,
}

impl LedgerClient for LiveLedgerClient {
    fn list_items(&self) -> PortFuture<'_, Vec<TaskRecord>> {
        Box::pin(async move {
            // The store returns the caller's tasks, so read as an already
            // authorized account when there is one. This never prompts.
            let accounts: Vec<String> =
                self.rpc.call("eth_accounts", json!([])).await.map_err(read_error)?;

            let mut call = json!({
                "to": self.store_address,
                "data": abi::encode_call(self.interface.list_items, &[]),
            });
            if let Some(from) = accounts.first() {
                call["from"] = json!(from);
            }

            let payload: String =
                self.rpc.call("eth_call", json!([call, "latest"])).await.map_err(read_error)?;
            let records = abi::decode_task_records(&payload)
                .map_err(|e| Error::Read(format!("malformed task list: {e}")))?;
            debug!(count = records.len(), "ledger read");
            Ok(records)
        })
    }

    fn submit_create(
        &self,
        from: &Identity,
        title: &str,
        body: &str,
    ) -> PortFuture<'_, TransactionHandle> {
        // The store takes the body before the title.
        let data = abi::encode_call(
            self.interface.submit_create,
            &[Token::Str(body.to_string()), Token::Str(title.to_string()), Token::Bool(false)],
        );
        self.send(from.clone(), data)
    }

    fn submit_delete(&self, from: &Identity, id: TaskId) -> PortFuture<'_, TransactionHandle> {
        let data = abi::encode_call(self.interface.submit_delete, &[Token::Uint(id.0)]);
        self.send(from.clone(), data)
    }

    fn receipt(&self, handle: &TransactionHandle) -> PortFuture<'_, Option<TxOutcome>> {
        let hash = handle.0.clone();
        Box::pin(async move {
            let receipt: Option<Receipt> = self
                .rpc
                .call("eth_getTransactionReceipt", json!([hash]))
                .await
                .map_err(read_error)?;
            Ok(receipt.map(|r| outcome_from_status(r.status.as_deref())))
        })
    }
}

fn outcome_from_status(status: Option<&str>) -> TxOutcome {
    match status {
        // Receipts without a status field predate revert reporting.
        Some("0x1") | None => TxOutcome::Confirmed,
        Some(other) => TxOutcome::Failed { reason: format!("transaction reverted (status {other})") },
    }
}

fn submission_error(err: RpcError) -> Error {
    if err.is_user_rejection() {
        Error::UserRejected(err.to_string())
    } else {
        Error::Submission(err.to_string())
    }
}

fn read_error(err: RpcError) -> Error {
    Error::Read(err.to_string())
}
