//! Port traits defining external boundaries.
//!
//! Each trait represents a boundary between the synchronization core and an
//! external system (wallet, ledger, time, ids). Implementations live in
//! `src/adapters/`.

pub mod account;
pub mod clock;
pub mod id_gen;
pub mod ledger;

use std::future::Future;
use std::pin::Pin;

pub use account::AccountProvider;
pub use clock::Clock;
pub use id_gen::IdGenerator;
pub use ledger::LedgerClient;

/// Boxed future returned by async port methods, keeping the traits dyn-compatible.
pub type PortFuture<'a, T> = Pin<Box<dyn Future<Output = crate::error::Result<T>> + Send + 'a>>;
