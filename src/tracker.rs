//! Transaction tracker: turns a submitted handle into a single outcome.

use std::sync::Arc;
use std::time::Duration;

use tracing::{debug, warn};

use crate::model::{TransactionHandle, TxOutcome};
use crate::ports::LedgerClient;

/// Receipt polling settings.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct TrackerConfig {
    /// Delay between receipt lookups.
    pub poll_interval: Duration,
    /// Upper bound on a wait; `None` waits until the ledger answers.
    pub confirmation_timeout: Option<Duration>,
}

impl Default for TrackerConfig {
    fn default() -> Self {
        Self { poll_interval: Duration::from_secs(1), confirmation_timeout: None }
    }
}

/// Watches submitted transactions until they are confirmed or failed.
///
/// Every wait resolves exactly once. Dropping the returned future stops
/// polling; the transaction itself keeps going on the ledger.
#[derive(Clone)]
pub struct TransactionTracker {
    ledger: Arc<dyn LedgerClient>,
    config: TrackerConfig,
}

impl TransactionTracker {
    /// Creates a tracker polling `ledger`.
    #[must_use]
    pub fn new(ledger: Arc<dyn LedgerClient>, config: TrackerConfig) -> Self {
        Self { ledger, config }
    }

    /// The settings this tracker polls with.
    #[must_use]
    pub fn config(&self) -> &TrackerConfig {
        &self.config
    }

    /// Resolves `handle`, applying the configured deadline if there is one.
    pub async fn resolve(&self, handle: &TransactionHandle) -> TxOutcome {
        match self.config.confirmation_timeout {
            Some(deadline) => self.wait_with_deadline(handle, deadline).await,
            None => self.wait(handle).await,
        }
    }

    /// Polls until the ledger reports an outcome.
    ///
    /// A failed lookup is logged and retried; it says nothing about the
    /// transaction itself.
    pub async fn wait(&self, handle: &TransactionHandle) -> TxOutcome {
        let mut attempts: u64 = 0;
        loop {
            attempts += 1;
            match self.ledger.receipt(handle).await {
                Ok(Some(outcome)) => {
                    debug!(%handle, attempts, ?outcome, "transaction resolved");
                    return outcome;
                }
                Ok(None) => {}
                Err(e) => warn!(%handle, attempts, error = %e, "receipt lookup failed; retrying"),
            }
            tokio::time::sleep(self.config.poll_interval).await;
        }
    }

    /// Like [`TransactionTracker::wait`], but gives up after `deadline`.
    ///
    /// Expiry yields `Failed`. The transaction may still land later; the next
    /// refresh will show it.
    pub async fn wait_with_deadline(&self, handle: &TransactionHandle, deadline: Duration) -> TxOutcome {
        match tokio::time::timeout(deadline, self.wait(handle)).await {
            Ok(outcome) => outcome,
            Err(_) => {
                warn!(%handle, ?deadline, "no confirmation before deadline");
                TxOutcome::Failed {
                    reason: format!(
                        "no confirmation within {deadline:?}; outcome unknown until next refresh"
                    ),
                }
            }
        }
    }
}
