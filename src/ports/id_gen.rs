//! Key generator port for proposed tasks.

/// Mints the local key a proposed task is tracked by until the ledger
/// assigns it an id.
///
/// Keys only need to be unique within one engine.
pub trait IdGenerator: Send + Sync {
    /// Returns a key never handed out before by this generator.
    fn generate_id(&self) -> String;
}
