//! `chaintask add` command.

use super::with_progress;
use crate::presentation::render;
use crate::sync::ReconciliationEngine;

/// Creates a task and waits for the ledger to confirm it.
///
/// The final view is printed whether or not the create succeeded.
///
/// # Errors
///
/// Returns the engine's error message if the create was rejected, rolled
/// back, or could not be confirmed by a read.
pub async fn run(
    engine: &ReconciliationEngine,
    title: &str,
    body: &str,
    progress: bool,
) -> Result<(), String> {
    let outcome = with_progress(engine, progress, engine.create_task(title, body)).await;
    print!("{}", render(&engine.current_snapshot()));

    let task = outcome.map_err(|e| e.to_string())?;
    if let Some(id) = task.id {
        println!("Added task #{id}.");
    }
    Ok(())
}
