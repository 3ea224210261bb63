//! Cassette configuration for composable per-port replay.

use std::path::{Path, PathBuf};

use super::format::Cassette;
use super::replayer::CassetteReplayer;

/// Per-port cassette paths.
///
/// Ports without a path are replayed by adapters that panic when called.
#[derive(Debug, Clone, Default)]
pub struct CassetteConfig {
    /// Cassette for the ledger port.
    pub ledger: Option<PathBuf>,
    /// Cassette for the account provider port.
    pub accounts: Option<PathBuf>,
    /// Cassette for the key generator port.
    pub id_gen: Option<PathBuf>,
    /// Cassette for the clock port.
    pub clock: Option<PathBuf>,
}

/// Loaded replayers, one per configured port.
pub struct PortReplayers {
    /// Ledger replayer.
    pub ledger: Option<CassetteReplayer>,
    /// Account provider replayer.
    pub accounts: Option<CassetteReplayer>,
    /// Key generator replayer.
    pub id_gen: Option<CassetteReplayer>,
    /// Clock replayer.
    pub clock: Option<CassetteReplayer>,
}

impl CassetteConfig {
    /// A config with no cassettes; every port panics if called.
    #[must_use]
    pub fn panic_on_unspecified() -> Self {
        Self::default()
    }

    /// Picks up `<port>.cassette.yaml` files from a recorded session directory.
    #[must_use]
    pub fn from_session_dir(dir: &Path) -> Self {
        let existing = |port: &str| {
            let path = dir.join(format!("{port}.cassette.yaml"));
            path.exists().then_some(path)
        };
        Self {
            ledger: existing("ledger"),
            accounts: existing("accounts"),
            id_gen: existing("id_gen"),
            clock: existing("clock"),
        }
    }

    /// Reads and parses one cassette file.
    ///
    /// # Errors
    ///
    /// Returns an error if the file cannot be read or parsed.
    pub fn load(path: &Path) -> Result<CassetteReplayer, String> {
        let content = std::fs::read_to_string(path)
            .map_err(|e| format!("Failed to read cassette file {}: {e}", path.display()))?;
        let cassette: Cassette = serde_yaml::from_str(&content)
            .map_err(|e| format!("Failed to parse cassette file {}: {e}", path.display()))?;
        Ok(CassetteReplayer::new(&cassette))
    }

    /// Loads every configured cassette.
    ///
    /// # Errors
    ///
    /// Returns an error if any configured file cannot be read or parsed.
    pub fn load_all(&self) -> Result<PortReplayers, String> {
        Ok(PortReplayers {
            ledger: self.ledger.as_deref().map(Self::load).transpose()?,
            accounts: self.accounts.as_deref().map(Self::load).transpose()?,
            id_gen: self.id_gen.as_deref().map(Self::load).transpose()?,
            clock: self.clock.as_deref().map(Self::load).transpose()?,
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::cassette::format::Interaction;
    use chrono::Utc;
    use serde_json::json;

    fn write_cassette(path: &Path, interactions: Vec<Interaction>) {
        let cassette = Cassette {
            name: "test".into(),
            recorded_at: Utc::now(),
            store: "0xstore".into(),
            interactions,
        };
        std::fs::write(path, serde_yaml::to_string(&cassette).unwrap()).unwrap();
    }

    #[test]
    fn session_dir_picks_up_present_ports_only() {
        let dir = std::env::temp_dir().join("chaintask_config_session_dir");
        std::fs::create_dir_all(&dir).unwrap();
        write_cassette(
            &dir.join("ledger.cassette.yaml"),
            vec![Interaction {
                seq: 0,
                port: "ledger".into(),
                method: "list_items".into(),
                input: json!({}),
                output: json!({"Ok": []}),
            }],
        );

        let config = CassetteConfig::from_session_dir(&dir);
        assert!(config.ledger.is_some());
        assert!(config.accounts.is_none());

        let mut replayers = config.load_all().unwrap();
        let ledger = replayers.ledger.as_mut().unwrap();
        assert_eq!(ledger.next_interaction("ledger", "list_items").output, json!({"Ok": []}));
        assert!(replayers.clock.is_none());

        let _ = std::fs::remove_dir_all(&dir);
    }

    #[test]
    fn unreadable_cassette_is_an_error() {
        let config = CassetteConfig {
            clock: Some(PathBuf::from("/nonexistent/clock.cassette.yaml")),
            ..CassetteConfig::default()
        };
        let err = config.load_all().err().unwrap();
        assert!(err.contains("Failed to read cassette file"));
    }

    #[test]
    fn empty_config_loads_nothing() {
        let replayers = CassetteConfig::panic_on_unspecified().load_all().unwrap();
        assert!(replayers.ledger.is_none());
        assert!(replayers.id_gen.is_none());
    }
}
