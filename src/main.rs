//! Binary entrypoint for the `chaintask` CLI.

use std::process::ExitCode;

fn main() -> ExitCode {
    // Recording and replay are handled in commands::dispatch via
    // CHAINTASK_RECORD / CHAINTASK_REPLAY.
    match chaintask::run(std::env::args()) {
        Ok(()) => ExitCode::SUCCESS,
        Err(err) => {
            eprintln!("{err}");
            ExitCode::FAILURE
        }
    }
}
