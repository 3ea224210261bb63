//! Cassettes: recorded port interactions that can be replayed deterministically.

pub mod config;
pub mod format;
pub mod recorder;
pub mod replayer;
pub mod session;
