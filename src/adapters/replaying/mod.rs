//! Replaying adapters that serve recorded interactions.

pub mod account;
pub mod clock;
pub mod id_gen;
pub mod ledger;

use std::sync::{Arc, Mutex, PoisonError};

use serde::de::DeserializeOwned;

pub use account::ReplayingAccountProvider;
pub use clock::ReplayingClock;
pub use id_gen::ReplayingIdGenerator;
pub use ledger::ReplayingLedgerClient;

use crate::cassette::replayer::CassetteReplayer;

/// Takes the recorded output for the next `port`/`method` call.
///
/// # Panics
///
/// Panics if the port has no cassette or the cassette is exhausted.
pub(crate) fn next_output(
    replayer: Option<&Arc<Mutex<CassetteReplayer>>>,
    port: &str,
    method: &str,
) -> serde_json::Value {
    let Some(replayer) = replayer else {
        panic!("{port} port not configured in CassetteConfig: no cassette loaded for {port}");
    };
    replayer.lock().unwrap_or_else(PoisonError::into_inner).next_interaction(port, method).output
}

/// Decodes a recorded output into the type the port returns.
///
/// # Panics
///
/// Panics if the cassette does not match the port's return type.
pub(crate) fn decode<T: DeserializeOwned>(output: serde_json::Value, port: &str, method: &str) -> T {
    match serde_json::from_value(output) {
        Ok(value) => value,
        Err(e) => panic!("{port}::{method}: recorded output does not match return type: {e}"),
    }
}
