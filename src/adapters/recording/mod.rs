//! Recording adapters that capture interactions to cassettes.

pub mod account;
pub mod clock;
pub mod id_gen;
pub mod ledger;

use std::sync::{Arc, Mutex, PoisonError};

use serde::Serialize;
use tracing::warn;

pub use account::RecordingAccountProvider;
pub use clock::RecordingClock;
pub use id_gen::RecordingIdGenerator;
pub use ledger::RecordingLedgerClient;

use crate::cassette::recorder::CassetteRecorder;

/// Records one call. `output` is usually a whole `Result`, which serde writes
/// as `{"Ok": ..}` or `{"Err": {<variant>: ..}}` so replay restores the error kind.
///
/// A value that cannot be serialized is skipped with a warning; recording
/// never changes what the caller sees.
pub(crate) fn record_interaction<I, O>(
    recorder: &Arc<Mutex<CassetteRecorder>>,
    port: &str,
    method: &str,
    input: &I,
    output: &O,
) where
    I: Serialize,
    O: Serialize,
{
    let (input_json, output_json) = match (serde_json::to_value(input), serde_json::to_value(output))
    {
        (Ok(input), Ok(output)) => (input, output),
        (Err(e), _) | (_, Err(e)) => {
            warn!(port, method, error = %e, "skipping unserializable interaction");
            return;
        }
    };

    recorder.lock().unwrap_or_else(PoisonError::into_inner).record(
        port,
        method,
        input_json,
        output_json,
    );
}

#[cfg(test)]
pub(crate) mod test_support {
    use std::path::Path;
    use std::sync::{Arc, Mutex};

    use crate::cassette::format::Cassette;
    use crate::cassette::recorder::CassetteRecorder;

    pub fn recorder(path: &Path) -> Arc<Mutex<CassetteRecorder>> {
        Arc::new(Mutex::new(CassetteRecorder::new(path, "test", "0xstore")))
    }

    /// Finishes the recorder (all adapters must be dropped) and reads the cassette back.
    pub fn finish(recorder: Arc<Mutex<CassetteRecorder>>, path: &Path) -> Cassette {
        let recorder = Arc::try_unwrap(recorder).ok().unwrap().into_inner().unwrap();
        recorder.finish().unwrap();
        serde_yaml::from_str(&std::fs::read_to_string(path).unwrap()).unwrap()
    }
}
