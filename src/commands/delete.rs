//! `chaintask delete` command.

use super::with_progress;
use crate::model::TaskId;
use crate::presentation::render;
use crate::sync::ReconciliationEngine;

/// Deletes task `id` and waits for the ledger to confirm it.
///
/// # Errors
///
/// Returns the engine's error message if the delete was refused, rejected
/// or rolled back.
pub async fn run(engine: &ReconciliationEngine, id: TaskId, progress: bool) -> Result<(), String> {
    let outcome = with_progress(engine, progress, engine.delete_task(id)).await;
    print!("{}", render(&engine.current_snapshot()));

    outcome.map_err(|e| e.to_string())?;
    println!("Deleted task #{id}.");
    Ok(())
}
