//! linechain: the command-line front end of a small shell.
//!
//! A line is split into operator-delimited segments of words, the segments
//! are assembled into a chain of execution nodes with file and pipe routing,
//! and the chain is run node by node with `&&` / `||` short-circuiting.
//!
//! # Architecture
//!
//! - **[`parse`]**: segmenter, operator table, tokenizing and completion helpers.
//! - **[`exec`]**: chain builder, scheduler, command registry and runner.
//! - **[`commands`]**: the [`Command`](commands::Command) trait and built-in commands.
//! - **[`config`]**: embedded defaults plus user overlay merge.
//! - **[`logging`]**: `simplelog` setup and run-history records.

/// Command trait and built-in implementations.
pub mod commands;
/// Configuration types, loading, and overlay merge logic.
pub mod config;
/// Chain building, scheduling and running.
pub mod exec;
/// Logger setup and run history.
pub mod logging;
/// Line segmentation and the operator table.
pub mod parse;

use exec::{ChainError, CommandRegistry, RunReport, Runner};

/// Process-style exit status of one command; `-1` marks an invocation fault.
pub type ExitCode = i32;

/// Everything a line produced when run with captured streams.
#[derive(Debug)]
pub struct Captured {
    pub report: RunReport,
    pub stdout: String,
    pub stderr: String,
}

/// Build the registry from default config and run a line, capturing its output.
///
/// This is the main entry point for tests and simple usage.
/// For CLI usage with a user config, build the registry and runner directly.
pub fn run_captured(line: &str) -> Result<Captured, ChainError> {
    let config = config::Config::default_config();
    let registry = CommandRegistry::from_config(&config);
    let runner = Runner::new(&registry, &config);
    let mut stdout = Vec::new();
    let mut stderr = Vec::new();
    let report = runner.run(line, &mut stdout, &mut stderr)?;
    Ok(Captured {
        report,
        stdout: String::from_utf8_lossy(&stdout).into_owned(),
        stderr: String::from_utf8_lossy(&stderr).into_owned(),
    })
}
