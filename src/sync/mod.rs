//! Reconciliation of optimistic local edits with the ledger.

pub mod collection;
pub mod engine;

pub use collection::{ReconcileReport, TaskCollection};
pub use engine::ReconciliationEngine;
