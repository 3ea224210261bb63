//! Replaying adapter for the `AccountProvider` port.

use std::sync::{Arc, Mutex};

use super::{decode, next_output};
use crate::cassette::replayer::CassetteReplayer;
use crate::error::Result;
use crate::model::Identity;
use crate::ports::{AccountProvider, PortFuture};

/// Serves recorded authorization results.
pub struct ReplayingAccountProvider {
    replayer: Option<Arc<Mutex<CassetteReplayer>>>,
}

impl ReplayingAccountProvider {
    /// Replays from `replayer`.
    #[must_use]
    pub fn new(replayer: Arc<Mutex<CassetteReplayer>>) -> Self {
        Self { replayer: Some(replayer) }
    }

    /// A provider with no cassette. Panics when called.
    #[must_use]
    pub fn unconfigured() -> Self {
        Self { replayer: None }
    }
}

impl AccountProvider for ReplayingAccountProvider {
    fn authorized_accounts(&self) -> PortFuture<'_, Vec<Identity>> {
        let output = next_output(self.replayer.as_ref(), "accounts", "authorized_accounts");
        let result: Result<Vec<Identity>> = decode(output, "accounts", "authorized_accounts");
        Box::pin(async move { result })
    }

    fn request_accounts(&self) -> PortFuture<'_, Identity> {
        let output = next_output(self.replayer.as_ref(), "accounts", "request_accounts");
        let result: Result<Identity> = decode(output, "accounts", "request_accounts");
        Box::pin(async move { result })
    }
}
