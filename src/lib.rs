//! Task list client that applies edits optimistically and reconciles them
//! with an authoritative, transaction-based ledger.
//!
//! The [`sync::ReconciliationEngine`] owns the task collection. It reaches
//! the outside world only through the traits in [`ports`], implemented in
//! [`adapters`] for a JSON-RPC node, for cassette record/replay, and for an
//! in-process simulation.

pub mod adapters;
pub mod cassette;
pub mod cli;
pub mod commands;
pub mod config;
pub mod context;
pub mod error;
pub mod logging;
pub mod model;
pub mod ports;
pub mod presentation;
pub mod session;
pub mod sync;
pub mod tracker;

use clap::error::ErrorKind;
use clap::Parser;

/// Run the CLI with the provided arguments.
///
/// # Errors
///
/// Returns an error string when argument parsing fails or command execution fails.
pub fn run<I, T>(args: I) -> Result<(), String>
where
    I: IntoIterator<Item = T>,
    T: Into<std::ffi::OsString> + Clone,
{
    let cli = match cli::Cli::try_parse_from(args) {
        Ok(cli) => cli,
        Err(err) if matches!(err.kind(), ErrorKind::DisplayHelp | ErrorKind::DisplayVersion) => {
            print!("{err}");
            return Ok(());
        }
        Err(err) => return Err(err.to_string()),
    };
    commands::dispatch(&cli)
}

#[cfg(test)]
mod tests {
    use super::run;

    #[test]
    fn run_prints_help() {
        assert!(run(["chaintask", "--help"]).is_ok());
    }

    #[test]
    fn run_errors_on_unknown_subcommand() {
        let result = run(["chaintask", "unknown"]);
        assert!(result.is_err());
    }
}
