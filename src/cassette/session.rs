//! Recording session with one cassette per port.

use std::path::{Path, PathBuf};
use std::sync::{Arc, Mutex};

use chrono::Utc;

use super::recorder::CassetteRecorder;

/// Port names as they appear in cassette files and file names.
pub const PORTS: [&str; 4] = ["ledger", "accounts", "id_gen", "clock"];

/// Per-port recorders for one recording run.
///
/// Cassettes land in `<base>/<timestamp>/<port>.cassette.yaml`.
pub struct RecordingSession {
    /// Recorder for ledger reads, submissions and receipts.
    pub ledger: Arc<Mutex<CassetteRecorder>>,
    /// Recorder for wallet authorization.
    pub accounts: Arc<Mutex<CassetteRecorder>>,
    /// Recorder for local key generation.
    pub id_gen: Arc<Mutex<CassetteRecorder>>,
    /// Recorder for clock reads.
    pub clock: Arc<Mutex<CassetteRecorder>>,
    output_dir: PathBuf,
}

impl RecordingSession {
    /// Creates a timestamped directory under `base` and a recorder per port.
    ///
    /// # Errors
    ///
    /// Returns an error if the directory already exists or cannot be created.
    pub fn new(base: &Path, store: &str) -> Result<Self, String> {
        let timestamp = Utc::now().format("%Y-%m-%dT%H-%M-%S%.3f").to_string();
        let output_dir = base.join(&timestamp);

        if output_dir.exists() {
            return Err(format!("Cassette directory already exists: {}", output_dir.display()));
        }
        std::fs::create_dir_all(&output_dir)
            .map_err(|e| format!("Failed to create cassette directory: {e}"))?;

        let make_recorder = |port: &str| {
            let path = output_dir.join(format!("{port}.cassette.yaml"));
            Arc::new(Mutex::new(CassetteRecorder::new(path, format!("{timestamp}-{port}"), store)))
        };

        Ok(Self {
            ledger: make_recorder("ledger"),
            accounts: make_recorder("accounts"),
            id_gen: make_recorder("id_gen"),
            clock: make_recorder("clock"),
            output_dir,
        })
    }

    /// Directory the cassettes are written to.
    #[must_use]
    pub fn output_dir(&self) -> &Path {
        &self.output_dir
    }

    /// Writes every cassette and returns the session directory.
    ///
    /// The recording adapters must have been dropped first.
    ///
    /// # Errors
    ///
    /// Returns an error if an adapter still holds a recorder or a file cannot be written.
    pub fn finish(self) -> Result<PathBuf, String> {
        fn finish_one(arc: Arc<Mutex<CassetteRecorder>>, port: &str) -> Result<(), String> {
            let recorder = Arc::try_unwrap(arc)
                .map_err(|_| format!("Recording adapter for {port} still has references"))?
                .into_inner()
                .map_err(|e| format!("Recorder lock for {port} poisoned: {e}"))?;
            recorder.finish().map_err(|e| format!("Failed to write {port} cassette: {e}"))?;
            Ok(())
        }

        finish_one(self.ledger, "ledger")?;
        finish_one(self.accounts, "accounts")?;
        finish_one(self.id_gen, "id_gen")?;
        finish_one(self.clock, "clock")?;

        Ok(self.output_dir)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    #[test]
    fn writes_one_cassette_per_port() {
        let base = std::env::temp_dir().join("chaintask_session_test");
        let session = RecordingSession::new(&base, "0xstore").expect("session");
        assert!(session.output_dir().exists());

        session.ledger.lock().unwrap().record("ledger", "list_items", json!({}), json!({"Ok": []}));
        let dir = session.finish().expect("finish");

        for port in PORTS {
            assert!(dir.join(format!("{port}.cassette.yaml")).exists(), "{port} cassette missing");
        }
        let _ = std::fs::remove_dir_all(&base);
    }

    #[test]
    fn finish_fails_while_an_adapter_holds_a_recorder() {
        let base = std::env::temp_dir().join("chaintask_session_busy_test");
        let session = RecordingSession::new(&base, "0xstore").expect("session");
        let _held = Arc::clone(&session.clock);

        let err = session.finish().unwrap_err();
        assert!(err.contains("clock"));
        let _ = std::fs::remove_dir_all(&base);
    }
}
