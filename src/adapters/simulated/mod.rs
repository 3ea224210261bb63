//! In-process stand-ins for the wallet and the ledger.
//!
//! The simulated ledger keeps tombstoned records the way the real store does,
//! holds every transaction pending until the harness resolves it, and can
//! inject read and submission faults. Together with [`SequentialKeys`] and
//! [`ManualClock`] it makes reconciliation scenarios fully deterministic.

pub mod account;
pub mod ledger;

use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::Mutex;

use chrono::{DateTime, Duration, TimeZone, Utc};

pub use account::{RequestBehavior, SimulatedAccounts};
pub use ledger::SimulatedLedger;

use crate::ports::{Clock, IdGenerator};

/// Generates `key-1`, `key-2`, ...
#[derive(Debug, Default)]
pub struct SequentialKeys {
    next: AtomicU64,
}

impl IdGenerator for SequentialKeys {
    fn generate_id(&self) -> String {
        format!("key-{}", self.next.fetch_add(1, Ordering::Relaxed) + 1)
    }
}

/// A clock that only moves when told to.
#[derive(Debug)]
pub struct ManualClock {
    now: Mutex<DateTime<Utc>>,
}

impl ManualClock {
    /// Starts the clock at `start`.
    #[must_use]
    pub fn starting_at(start: DateTime<Utc>) -> Self {
        Self { now: Mutex::new(start) }
    }

    /// Moves the clock forward.
    pub fn advance(&self, by: Duration) {
        let mut now = self.now.lock().unwrap_or_else(std::sync::PoisonError::into_inner);
        *now += by;
    }
}

impl Default for ManualClock {
    fn default() -> Self {
        Self::starting_at(Utc.with_ymd_and_hms(2025, 1, 1, 0, 0, 0).single().unwrap_or_default())
    }
}

impl Clock for ManualClock {
    fn now(&self) -> DateTime<Utc> {
        *self.now.lock().unwrap_or_else(std::sync::PoisonError::into_inner)
    }
}
