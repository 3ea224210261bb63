//! Service context bundling all port trait objects.

use std::path::Path;
use std::sync::{Arc, Mutex};

use crate::adapters::live::{LiveAccountProvider, LiveLedgerClient, RpcClient, SystemClock, UuidKeys};
use crate::adapters::recording::{
    RecordingAccountProvider, RecordingClock, RecordingIdGenerator, RecordingLedgerClient,
};
use crate::adapters::replaying::{
    ReplayingAccountProvider, ReplayingClock, ReplayingIdGenerator, ReplayingLedgerClient,
};
use crate::adapters::simulated::{ManualClock, SequentialKeys, SimulatedAccounts, SimulatedLedger};
use crate::cassette::config::CassetteConfig;
use crate::cassette::format::Cassette;
use crate::cassette::replayer::CassetteReplayer;
use crate::cassette::session::RecordingSession;
use crate::config::LedgerConfig;
use crate::ports::{AccountProvider, Clock, IdGenerator, LedgerClient};

/// Bundles the port trait objects the engine runs against.
///
/// Constructors wire different adapter families (live, recording,
/// replaying, simulated); the engine cannot tell them apart.
#[derive(Clone)]
pub struct ServiceContext {
    /// Authoritative task store.
    pub ledger: Arc<dyn LedgerClient>,
    /// Wallet granting signing identities.
    pub accounts: Arc<dyn AccountProvider>,
    /// Source of local correlation keys.
    pub id_gen: Arc<dyn IdGenerator>,
    /// Source of proposal timestamps.
    pub clock: Arc<dyn Clock>,
}

impl ServiceContext {
    /// Assembles a context from explicit ports.
    #[must_use]
    pub fn new(
        ledger: Arc<dyn LedgerClient>,
        accounts: Arc<dyn AccountProvider>,
        id_gen: Arc<dyn IdGenerator>,
        clock: Arc<dyn Clock>,
    ) -> Self {
        Self { ledger, accounts, id_gen, clock }
    }

    /// Talks to the JSON-RPC endpoint in `config`; both the wallet and the
    /// ledger share one HTTP client.
    #[must_use]
    pub fn live(config: &LedgerConfig) -> Self {
        let rpc = Arc::new(RpcClient::new(&config.rpc_url));
        Self {
            ledger: Arc::new(LiveLedgerClient::new(Arc::clone(&rpc), config)),
            accounts: Arc::new(LiveAccountProvider::new(rpc)),
            id_gen: Arc::new(UuidKeys),
            clock: Arc::new(SystemClock),
        }
    }

    /// In-process ledger and wallet with deterministic keys and a fixed clock.
    #[must_use]
    pub fn simulated(ledger: Arc<SimulatedLedger>, accounts: Arc<SimulatedAccounts>) -> Self {
        Self {
            ledger,
            accounts,
            id_gen: Arc::new(SequentialKeys::default()),
            clock: Arc::new(ManualClock::default()),
        }
    }

    /// Live context whose port calls are recorded under `base`.
    ///
    /// Drop the context (and anything holding its ports) before calling
    /// [`RecordingSession::finish`].
    ///
    /// # Errors
    ///
    /// Returns an error if the cassette directory cannot be created.
    pub fn recording_at(base: &Path, config: &LedgerConfig) -> Result<(Self, RecordingSession), String> {
        let session = RecordingSession::new(base, &config.store_address)?;
        let live = Self::live(config);
        let ctx = Self {
            ledger: Arc::new(RecordingLedgerClient::new(live.ledger, Arc::clone(&session.ledger))),
            accounts: Arc::new(RecordingAccountProvider::new(
                live.accounts,
                Arc::clone(&session.accounts),
            )),
            id_gen: Arc::new(RecordingIdGenerator::new(live.id_gen, Arc::clone(&session.id_gen))),
            clock: Arc::new(RecordingClock::new(live.clock, Arc::clone(&session.clock))),
        };
        Ok((ctx, session))
    }

    /// Replays every port from one cassette holding all of their interactions.
    ///
    /// Each port gets its own cursor into the cassette.
    ///
    /// # Errors
    ///
    /// Returns an error if the cassette file cannot be read or parsed.
    pub fn replaying(path: &Path) -> Result<Self, String> {
        let content = std::fs::read_to_string(path)
            .map_err(|e| format!("Failed to read cassette file {}: {e}", path.display()))?;
        let cassette: Cassette = serde_yaml::from_str(&content)
            .map_err(|e| format!("Failed to parse cassette file {}: {e}", path.display()))?;
        let replayer = || Arc::new(Mutex::new(CassetteReplayer::new(&cassette)));

        Ok(Self {
            ledger: Arc::new(ReplayingLedgerClient::new(replayer())),
            accounts: Arc::new(ReplayingAccountProvider::new(replayer())),
            id_gen: Arc::new(ReplayingIdGenerator::new(replayer())),
            clock: Arc::new(ReplayingClock::new(replayer())),
        })
    }

    /// Replays from per-port cassettes; ports without one panic when called.
    ///
    /// # Errors
    ///
    /// Returns an error if any configured cassette cannot be read or parsed.
    pub fn replaying_from(config: &CassetteConfig) -> Result<Self, String> {
        let replayers = config.load_all()?;
        let shared = |r: CassetteReplayer| Arc::new(Mutex::new(r));

        Ok(Self {
            ledger: Arc::new(
                replayers
                    .ledger
                    .map_or_else(ReplayingLedgerClient::unconfigured, |r| ReplayingLedgerClient::new(shared(r))),
            ),
            accounts: Arc::new(replayers.accounts.map_or_else(
                ReplayingAccountProvider::unconfigured,
                |r| ReplayingAccountProvider::new(shared(r)),
            )),
            id_gen: Arc::new(
                replayers
                    .id_gen
                    .map_or_else(ReplayingIdGenerator::unconfigured, |r| ReplayingIdGenerator::new(shared(r))),
            ),
            clock: Arc::new(
                replayers.clock.map_or_else(ReplayingClock::unconfigured, |r| ReplayingClock::new(shared(r))),
            ),
        })
    }
}
