//! Recording adapter for the `AccountProvider` port.

use std::sync::{Arc, Mutex};

use super::record_interaction;
use crate::cassette::recorder::CassetteRecorder;
use crate::ports::{AccountProvider, PortFuture};

/// Records wallet authorization calls while delegating to an inner provider.
pub struct RecordingAccountProvider {
    inner: Arc<dyn AccountProvider>,
    recorder: Arc<Mutex<CassetteRecorder>>,
}

impl RecordingAccountProvider {
    /// Wraps `inner`, recording into `recorder`.
    pub fn new(inner: Arc<dyn AccountProvider>, recorder: Arc<Mutex<CassetteRecorder>>) -> Self {
        Self { inner, recorder }
    }
}

impl AccountProvider for RecordingAccountProvider {
    fn authorized_accounts(&self) -> PortFuture<'_, Vec<crate::model::Identity>> {
        Box::pin(async move {
            let result = self.inner.authorized_accounts().await;
            record_interaction(&self.recorder, "accounts", "authorized_accounts", &(), &result);
            result
        })
    }

    fn request_accounts(&self) -> PortFuture<'_, crate::model::Identity> {
        Box::pin(async move {
            let result = self.inner.request_accounts().await;
            record_interaction(&self.recorder, "accounts", "request_accounts", &(), &result);
            result
        })
    }
}
