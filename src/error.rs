//! Error taxonomy shared by the ports, the engine and the CLI.

use serde::{Deserialize, Serialize};
use thiserror::Error;

/// Every failure a task intent or a port call can report.
///
/// The enum is serializable so recorded port results keep their variant when
/// a cassette is replayed.
#[derive(Error, Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub enum Error {
    /// No account provider is reachable.
    #[error("No account provider available: {0}")]
    NoProvider(String),

    /// The user declined the authorization or signing prompt.
    #[error("Authorization rejected: {0}")]
    UserRejected(String),

    /// Bad input; nothing was changed.
    #[error("Validation error: {0}")]
    Validation(String),

    /// The write never became a transaction (network, provider, malformed input).
    #[error("Transaction submission failed: {0}")]
    Submission(String),

    /// The ledger rejected or reverted the transaction, or the wait expired.
    #[error("Transaction {handle} failed: {reason}")]
    TransactionFailed {
        /// Handle of the failed transaction.
        handle: String,
        /// Why it failed.
        reason: String,
    },

    /// Reading the authoritative task list failed.
    #[error("Ledger read failed: {0}")]
    Read(String),

    /// The intent conflicts with an operation already in flight.
    #[error("Invalid state: {0}")]
    InvalidState(String),

    /// Configuration could not be loaded.
    #[error("Configuration error: {0}")]
    Config(String),
}

/// Result alias used throughout the crate.
pub type Result<T> = std::result::Result<T, Error>;
