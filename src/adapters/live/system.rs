//! Live clock and key generator backed by the operating system.

use chrono::{DateTime, Utc};
use uuid::Uuid;

use crate::ports::{Clock, IdGenerator};

/// Wall clock.
#[derive(Debug, Default, Clone, Copy)]
pub struct SystemClock;

impl Clock for SystemClock {
    fn now(&self) -> DateTime<Utc> {
        Utc::now()
    }
}

/// Produces random v4 UUIDs for local correlation keys.
#[derive(Debug, Default, Clone, Copy)]
pub struct UuidKeys;

impl IdGenerator for UuidKeys {
    fn generate_id(&self) -> String {
        Uuid::new_v4().to_string()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn clock_tracks_wall_time() {
        let before = Utc::now();
        let now = SystemClock.now();
        assert!(now >= before && now <= Utc::now());
    }

    #[test]
    fn keys_are_unique_uuids() {
        let first = UuidKeys.generate_id();
        let second = UuidKeys.generate_id();
        assert_ne!(first, second);
        assert_eq!(first.len(), 36);
    }
}
