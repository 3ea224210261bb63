//! Account provider port for wallet connection.

use super::PortFuture;
use crate::model::Identity;

/// Grants signing identities.
///
/// Abstracting the wallet keeps its permission prompt outside the core and
/// lets tests substitute a scripted provider.
pub trait AccountProvider: Send + Sync {
    /// Lists accounts the provider already considers authorized, without prompting.
    ///
    /// # Errors
    ///
    /// Returns `NoProvider` if the provider cannot be reached.
    fn authorized_accounts(&self) -> PortFuture<'_, Vec<Identity>>;

    /// Asks the user to authorize an account.
    ///
    /// # Errors
    ///
    /// Returns `NoProvider` if the provider cannot be reached, or
    /// `UserRejected` if the user declines.
    fn request_accounts(&self) -> PortFuture<'_, Identity>;
}
