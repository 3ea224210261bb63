//! `chaintask list` command.

use crate::presentation::render;
use crate::sync::ReconciliationEngine;

/// Prints the view produced by the initial refresh.
///
/// # Errors
///
/// Never fails once the refresh has succeeded.
pub fn run(engine: &ReconciliationEngine) -> Result<(), String> {
    print!("{}", render(&engine.current_snapshot()));
    Ok(())
}
