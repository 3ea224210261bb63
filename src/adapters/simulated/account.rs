//! Scripted wallet.

use std::sync::{Mutex, MutexGuard, PoisonError};

use crate::error::Error;
use crate::model::Identity;
use crate::ports::{AccountProvider, PortFuture};

/// What the wallet does when asked to authorize.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum RequestBehavior {
    /// Grant this account.
    Grant(Identity),
    /// The user declines.
    Reject,
    /// No wallet is installed.
    Unavailable,
}

#[derive(Debug)]
struct AccountState {
    authorized: Vec<Identity>,
    behavior: RequestBehavior,
    prompts: usize,
}

/// Wallet whose answers are scripted by the test.
#[derive(Debug)]
pub struct SimulatedAccounts {
    state: Mutex<AccountState>,
}

impl SimulatedAccounts {
    /// A wallet that grants `identity` when prompted.
    #[must_use]
    pub fn granting(identity: impl Into<String>) -> Self {
        Self::with_behavior(RequestBehavior::Grant(Identity(identity.into())))
    }

    /// A wallet whose user declines every prompt.
    #[must_use]
    pub fn rejecting() -> Self {
        Self::with_behavior(RequestBehavior::Reject)
    }

    /// No wallet at all.
    #[must_use]
    pub fn unavailable() -> Self {
        Self::with_behavior(RequestBehavior::Unavailable)
    }

    fn with_behavior(behavior: RequestBehavior) -> Self {
        Self { state: Mutex::new(AccountState { authorized: Vec::new(), behavior, prompts: 0 }) }
    }

    /// Changes what the next prompts do.
    pub fn set_behavior(&self, behavior: RequestBehavior) {
        self.lock().behavior = behavior;
    }

    /// Forgets every grant, as if the user disconnected the site.
    pub fn revoke_all(&self) {
        self.lock().authorized.clear();
    }

    /// How many times the user was prompted.
    #[must_use]
    pub fn prompt_count(&self) -> usize {
        self.lock().prompts
    }

    fn lock(&self) -> MutexGuard<'_, AccountState> {
        self.state.lock().unwrap_or_else(PoisonError::into_inner)
    }
}

impl AccountProvider for SimulatedAccounts {
    fn authorized_accounts(&self) -> PortFuture<'_, Vec<Identity>> {
        let result = {
            let state = self.lock();
            match state.behavior {
                RequestBehavior::Unavailable => Err(Error::NoProvider("no wallet installed".into())),
                _ => Ok(state.authorized.clone()),
            }
        };
        Box::pin(async move { result })
    }

    fn request_accounts(&self) -> PortFuture<'_, Identity> {
        let result = {
            let mut state = self.lock();
            state.prompts += 1;
            match state.behavior.clone() {
                RequestBehavior::Grant(identity) => {
                    if !state.authorized.contains(&identity) {
                        state.authorized.push(identity.clone());
                    }
                    Ok(identity)
                }
                RequestBehavior::Reject => Err(Error::UserRejected("user declined the prompt".into())),
                RequestBehavior::Unavailable => Err(Error::NoProvider("no wallet installed".into())),
            }
        };
        Box::pin(async move { result })
    }
}
