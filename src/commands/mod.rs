//! Command dispatch and handlers.

pub mod add;
pub mod delete;
pub mod list;

use std::future::Future;
use std::pin::pin;

use tracing::warn;

use crate::cassette::config::CassetteConfig;
use crate::cassette::session::RecordingSession;
use crate::cli::{Cli, Command};
use crate::config::AppConfig;
use crate::context::ServiceContext;
use crate::logging;
use crate::model::TaskId;
use crate::presentation::Follower;
use crate::sync::ReconciliationEngine;
use crate::tracker::TrackerConfig;

/// Dispatches a parsed command.
///
/// With `CHAINTASK_RECORD=<dir>` every port interaction is recorded to
/// per-port cassettes under `<dir>/<timestamp>/`; with
/// `CHAINTASK_REPLAY=<session dir>` the ports are served from such cassettes.
///
/// # Errors
///
/// Returns an error string if configuration is invalid or the command fails.
pub fn dispatch(cli: &Cli) -> Result<(), String> {
    logging::init_logging(cli.log_format);
    let config = AppConfig::from_env().map_err(|e| e.to_string())?;

    let (ctx, session) = if let Some(dir) = &config.record_dir {
        let (ctx, session) = ServiceContext::recording_at(dir, &config.ledger)?;
        (ctx, Some(session))
    } else if let Some(dir) = &config.replay_dir {
        (ServiceContext::replaying_from(&CassetteConfig::from_session_dir(dir))?, None)
    } else {
        (ServiceContext::live(&config.ledger), None)
    };

    let runtime = tokio::runtime::Builder::new_current_thread()
        .enable_all()
        .build()
        .map_err(|e| format!("Failed to start runtime: {e}"))?;
    let result =
        runtime.block_on(run_command(&cli.command, &ctx, config.tracker.clone(), !cli.quiet));

    // Finish recording even when the command failed.
    if let Some(session) = session {
        drop(ctx);
        finish_recording(session)?;
    }

    result
}

async fn run_command(
    command: &Command,
    ctx: &ServiceContext,
    tracker: TrackerConfig,
    progress: bool,
) -> Result<(), String> {
    let engine = ReconciliationEngine::new(ctx, tracker);
    engine.refresh().await.map_err(|e| e.to_string())?;

    match command {
        Command::List => list::run(&engine),
        Command::Add { title, body } => add::run(&engine, title, body, progress).await,
        Command::Delete { id } => delete::run(&engine, TaskId(*id), progress).await,
    }
}

/// Runs `intent`, rendering every state change to stderr meanwhile when `enabled`.
pub(crate) async fn with_progress<T>(
    engine: &ReconciliationEngine,
    enabled: bool,
    intent: impl Future<Output = T>,
) -> T {
    if !enabled {
        return intent.await;
    }
    let mut intent = pin!(intent);
    let follower = Follower::new(engine.subscribe(), std::io::stderr()).run();
    tokio::select! {
        out = &mut intent => out,
        result = follower => {
            if let Err(e) = result {
                warn!(error = %e, "progress output stopped");
            }
            intent.await
        }
    }
}

fn finish_recording(session: RecordingSession) -> Result<(), String> {
    let output_dir = session.finish()?;
    eprintln!("Recording saved to: {}", output_dir.display());
    Ok(())
}
