//! Replaying adapter for the `IdGenerator` port.

use std::sync::{Arc, Mutex};

use super::{decode, next_output};
use crate::cassette::replayer::CassetteReplayer;
use crate::ports::IdGenerator;

/// Serves recorded local keys.
pub struct ReplayingIdGenerator {
    replayer: Option<Arc<Mutex<CassetteReplayer>>>,
}

impl ReplayingIdGenerator {
    /// Replays from `replayer`.
    #[must_use]
    pub fn new(replayer: Arc<Mutex<CassetteReplayer>>) -> Self {
        Self { replayer: Some(replayer) }
    }

    /// A generator with no cassette. Panics when called.
    #[must_use]
    pub fn unconfigured() -> Self {
        Self { replayer: None }
    }
}

impl IdGenerator for ReplayingIdGenerator {
    fn generate_id(&self) -> String {
        let output = next_output(self.replayer.as_ref(), "id_gen", "generate_id");
        decode(output, "id_gen", "generate_id")
    }
}
