//! Clock port stamping proposals with their submission time.

use chrono::{DateTime, Utc};

/// Source of wall-clock time for pending operations.
///
/// Tests and cassette replay swap in a clock that only moves on request,
/// so snapshots compare equal across runs.
pub trait Clock: Send + Sync {
    /// Current UTC time.
    fn now(&self) -> DateTime<Utc>;
}
