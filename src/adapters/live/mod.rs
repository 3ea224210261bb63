//! Live adapters for real external interactions.

pub mod abi;
pub mod account;
pub mod ledger;
pub mod rpc;
pub mod system;

pub use account::LiveAccountProvider;
pub use ledger::LiveLedgerClient;
pub use rpc::RpcClient;
pub use system::{SystemClock, UuidKeys};
