//! Account session: obtains and caches the signing identity.

use std::sync::{Arc, Mutex, PoisonError};

use tracing::{debug, info};

use crate::error::Result;
use crate::model::Identity;
use crate::ports::AccountProvider;

/// Caches the identity granted by the wallet.
///
/// Reads never need it; every submission does.
pub struct AccountSession {
    provider: Arc<dyn AccountProvider>,
    cached: Mutex<Option<Identity>>,
}

impl AccountSession {
    /// Creates a session with no grant yet.
    #[must_use]
    pub fn new(provider: Arc<dyn AccountProvider>) -> Self {
        Self { provider, cached: Mutex::new(None) }
    }

    /// Returns an authorized identity, prompting only when needed.
    ///
    /// The cached grant is reused while the provider still lists it as
    /// authorized. Otherwise an already-authorized account is adopted, and
    /// failing that the user is prompted.
    ///
    /// # Errors
    ///
    /// Returns `NoProvider` if no wallet is reachable, or `UserRejected` if
    /// the user declines the prompt.
    pub async fn ensure_authorized(&self) -> Result<Identity> {
        let authorized = self.provider.authorized_accounts().await?;
        let cached = self.cached().filter(|identity| authorized.contains(identity));

        let identity = match (cached, authorized.into_iter().next()) {
            (Some(identity), _) => {
                debug!(%identity, "reusing cached grant");
                return Ok(identity);
            }
            (None, Some(existing)) => existing,
            (None, None) => {
                let granted = self.provider.request_accounts().await?;
                info!(identity = %granted, "account authorized");
                granted
            }
        };

        *self.cached.lock().unwrap_or_else(PoisonError::into_inner) = Some(identity.clone());
        Ok(identity)
    }

    /// The identity granted last, if any.
    #[must_use]
    pub fn cached(&self) -> Option<Identity> {
        self.cached.lock().unwrap_or_else(PoisonError::into_inner).clone()
    }
}
