//! Replaying adapter for the `Clock` port.

use std::sync::{Arc, Mutex};

use chrono::{DateTime, Utc};

use super::{decode, next_output};
use crate::cassette::replayer::CassetteReplayer;
use crate::ports::Clock;

/// Serves recorded clock readings.
pub struct ReplayingClock {
    replayer: Option<Arc<Mutex<CassetteReplayer>>>,
}

impl ReplayingClock {
    /// Replays from `replayer`.
    #[must_use]
    pub fn new(replayer: Arc<Mutex<CassetteReplayer>>) -> Self {
        Self { replayer: Some(replayer) }
    }

    /// A clock with no cassette. Panics when read.
    #[must_use]
    pub fn unconfigured() -> Self {
        Self { replayer: None }
    }
}

impl Clock for ReplayingClock {
    fn now(&self) -> DateTime<Utc> {
        decode(next_output(self.replayer.as_ref(), "clock", "now"), "clock", "now")
    }
}

#[cfg(test)]
mod tests {
    use serde_json::json;

    use super::*;
    use crate::adapters::replaying::test_support::replayer;

    #[test]
    fn serves_readings_in_order() {
        let clock = ReplayingClock::new(replayer(&[
            ("clock", "now", json!("2024-01-01T00:00:00Z")),
            ("clock", "now", json!("2024-01-01T00:01:00Z")),
        ]));
        let first = clock.now();
        assert_eq!(first.to_rfc3339(), "2024-01-01T00:00:00+00:00");
        assert!(clock.now() > first);
    }

    #[test]
    #[should_panic(expected = "not configured")]
    fn unconfigured_clock_panics() {
        let _ = ReplayingClock::unconfigured().now();
    }
}
