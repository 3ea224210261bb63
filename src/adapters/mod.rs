//! Port implementations.
//!
//! `live` talks to a real wallet/node, `recording` wraps live adapters and
//! captures cassettes, `replaying` serves cassettes back, and `simulated`
//! is an in-process ledger for tests and local runs.

pub mod live;
pub mod recording;
pub mod replaying;
pub mod simulated;
