//! Configuration loaded from the environment (and an optional `.env` file).

use std::path::PathBuf;
use std::time::Duration;

use crate::adapters::live::abi::{self, Selector};
use crate::error::{Error, Result};
use crate::tracker::TrackerConfig;

/// JSON-RPC endpoint used when `CHAINTASK_RPC_URL` is unset.
pub const DEFAULT_RPC_URL: &str = "http://127.0.0.1:8545";

/// Task store contract used when `CHAINTASK_STORE_ADDRESS` is unset.
pub const DEFAULT_STORE_ADDRESS: &str = "0xd9fc6cC979472A5FA52750ae26805462E1638872";

const DEFAULT_POLL_MS: u64 = 1000;

/// Function selectors of the task store contract, agreed out-of-band.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct ContractInterface {
    /// Selector of the read returning the caller's tasks.
    pub list_items: Selector,
    /// Selector of the create write.
    pub submit_create: Selector,
    /// Selector of the delete write.
    pub submit_delete: Selector,
}

impl Default for ContractInterface {
    fn default() -> Self {
        Self {
            list_items: abi::GET_MY_TASK,
            submit_create: abi::ADD_TASK,
            submit_delete: abi::DELETE_TASK,
        }
    }
}

/// Where and how to reach the ledger.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct LedgerConfig {
    /// JSON-RPC endpoint of the wallet/node.
    pub rpc_url: String,
    /// Address of the task store contract.
    pub store_address: String,
    /// Contract function selectors.
    pub interface: ContractInterface,
}

impl Default for LedgerConfig {
    fn default() -> Self {
        Self {
            rpc_url: DEFAULT_RPC_URL.to_string(),
            store_address: DEFAULT_STORE_ADDRESS.to_string(),
            interface: ContractInterface::default(),
        }
    }
}

/// Everything the CLI needs to wire a [`crate::context::ServiceContext`] and engine.
#[derive(Debug, Clone, PartialEq, Eq, Default)]
pub struct AppConfig {
    /// Ledger endpoint and contract.
    pub ledger: LedgerConfig,
    /// Receipt polling and optional confirmation deadline.
    pub tracker: TrackerConfig,
    /// When set, port interactions are recorded to cassettes under this directory.
    pub record_dir: Option<PathBuf>,
    /// When set, ports are served from the cassettes of a recorded session directory.
    pub replay_dir: Option<PathBuf>,
}

impl AppConfig {
    /// Loads `.env` if present, then reads the process environment.
    ///
    /// # Errors
    ///
    /// Returns `Config` if any variable holds an invalid value.
    pub fn from_env() -> Result<Self> {
        dotenvy::dotenv().ok();
        Self::from_lookup(|key| std::env::var(key).ok())
    }

    /// Builds the configuration from an arbitrary variable lookup.
    ///
    /// # Errors
    ///
    /// Returns `Config` if any variable holds an invalid value.
    pub fn from_lookup<F>(lookup: F) -> Result<Self>
    where
        F: Fn(&str) -> Option<String>,
    {
        let defaults = ContractInterface::default();
        let interface = ContractInterface {
            list_items: selector_var(&lookup, "CHAINTASK_SELECTOR_LIST", defaults.list_items)?,
            submit_create: selector_var(&lookup, "CHAINTASK_SELECTOR_CREATE", defaults.submit_create)?,
            submit_delete: selector_var(&lookup, "CHAINTASK_SELECTOR_DELETE", defaults.submit_delete)?,
        };

        let store_address = lookup("CHAINTASK_STORE_ADDRESS")
            .unwrap_or_else(|| DEFAULT_STORE_ADDRESS.to_string());
        validate_address(&store_address)?;

        let poll_ms = match lookup("CHAINTASK_POLL_MS") {
            Some(raw) => parse_number(&raw, "CHAINTASK_POLL_MS")?,
            None => DEFAULT_POLL_MS,
        };
        if poll_ms == 0 {
            return Err(Error::Config("CHAINTASK_POLL_MS must be greater than zero".into()));
        }

        let confirmation_timeout = lookup("CHAINTASK_CONFIRM_TIMEOUT_SECS")
            .map(|raw| parse_number(&raw, "CHAINTASK_CONFIRM_TIMEOUT_SECS"))
            .transpose()?
            .map(Duration::from_secs);

        let record_dir = lookup("CHAINTASK_RECORD").map(PathBuf::from);
        let replay_dir = lookup("CHAINTASK_REPLAY").map(PathBuf::from);
        if record_dir.is_some() && replay_dir.is_some() {
            return Err(Error::Config("CHAINTASK_RECORD and CHAINTASK_REPLAY cannot both be set".into()));
        }

        Ok(Self {
            ledger: LedgerConfig {
                rpc_url: lookup("CHAINTASK_RPC_URL").unwrap_or_else(|| DEFAULT_RPC_URL.to_string()),
                store_address,
                interface,
            },
            tracker: TrackerConfig {
                poll_interval: Duration::from_millis(poll_ms),
                confirmation_timeout,
            },
            record_dir,
            replay_dir,
        })
    }
}

fn selector_var<F>(lookup: &F, key: &str, default: Selector) -> Result<Selector>
where
    F: Fn(&str) -> Option<String>,
{
    match lookup(key) {
        Some(raw) => abi::parse_selector(&raw).map_err(|e| Error::Config(format!("{key}: {e}"))),
        None => Ok(default),
    }
}

fn validate_address(address: &str) -> Result<()> {
    let digits = address.strip_prefix("0x").unwrap_or("");
    if digits.len() == 40 && digits.chars().all(|c| c.is_ascii_hexdigit()) {
        Ok(())
    } else {
        Err(Error::Config(format!(
            "CHAINTASK_STORE_ADDRESS must be 0x followed by 40 hex digits, got {address:?}"
        )))
    }
}

fn parse_number(raw: &str, key: &str) -> Result<u64> {
    raw.trim().parse().map_err(|_| Error::Config(format!("{key} must be a whole number, got {raw:?}")))
}
