//! Live wallet adapter for the `AccountProvider` port.

use std::sync::Arc;

use serde_json::json;
use tracing::info;

use super::rpc::{RpcClient, RpcError};
use crate::error::Error;
use crate::model::Identity;
use crate::ports::{AccountProvider, PortFuture};

/// Wallet reached through the `eth_accounts` / `eth_requestAccounts` methods.
pub struct LiveAccountProvider {
    rpc: Arc<RpcClient>,
}

impl LiveAccountProvider {
    /// Creates a provider sharing the given RPC client.
    #[must_use]
    pub fn new(rpc: Arc<RpcClient>) -> Self {
        Self { rpc }
    }
}

impl AccountProvider for LiveAccountProvider {
    fn authorized_accounts(&self) -> PortFuture<'_, Vec<Identity>> {
        Box::pin(async move {
            let accounts: Vec<String> =
                self.rpc.call("eth_accounts", json!([])).await.map_err(provider_error)?;
            Ok(accounts.into_iter().map(Identity).collect())
        })
    }

    fn request_accounts(&self) -> PortFuture<'_, Identity> {
        Box::pin(async move {
            let accounts: Vec<String> =
                self.rpc.call("eth_requestAccounts", json!([])).await.map_err(provider_error)?;
            let identity = accounts
                .into_iter()
                .next()
                .map(Identity)
                .ok_or_else(|| Error::UserRejected("provider granted no accounts".into()))?;
            info!(account = %identity, "account authorized");
            Ok(identity)
        })
    }
}

fn provider_error(err: RpcError) -> Error {
    if err.is_user_rejection() {
        Error::UserRejected(err.to_string())
    } else {
        Error::NoProvider(err.to_string())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn rejection_code_maps_to_user_rejected() {
        let err = provider_error(RpcError::Remote { code: 4001, message: "nope".into() });
        assert!(matches!(err, Error::UserRejected(_)));
    }

    #[tokio::test]
    async fn unreachable_wallet_is_no_provider() {
        let provider = LiveAccountProvider::new(Arc::new(RpcClient::new("http://127.0.0.1:9")));
        let err = provider.request_accounts().await.unwrap_err();
        assert!(matches!(err, Error::NoProvider(_)));
    }
}
