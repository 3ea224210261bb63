//! CLI argument definitions.

use clap::{Parser, Subcommand};

use crate::logging::LogFormat;

/// Top-level CLI parser for `chaintask`.
#[derive(Debug, Parser)]
#[command(name = "chaintask", version, about = "Task list backed by a transaction ledger")]
pub struct Cli {
    /// Format of diagnostics written to stderr.
    #[arg(long, value_enum, global = true, default_value_t = LogFormat::Pretty)]
    pub log_format: LogFormat,

    /// Do not print state changes while a create or delete is in flight.
    #[arg(long, short, global = true)]
    pub quiet: bool,

    /// The command to execute.
    #[command(subcommand)]
    pub command: Command,
}

/// Supported subcommands.
#[derive(Debug, Subcommand)]
pub enum Command {
    /// Show the current tasks.
    List,
    /// Create a task and wait until the ledger confirms it.
    Add {
        /// Task title.
        title: String,
        /// Task body.
        body: String,
    },
    /// Delete a task by its ledger id and wait until the ledger confirms it.
    Delete {
        /// Ledger id as shown by `list`.
        id: u64,
    },
}
