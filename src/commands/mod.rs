//! Built-in commands the chain runner can resolve.
//!
//! Every command implements [`Command`] and talks to the world only through
//! the [`CommandIo`] handed to it, so the runner decides where stdin comes
//! from and where stdout goes.

/// Concatenate files or stdin.
pub mod cat;
/// Print arguments.
pub mod echo;
/// Fixed-substring line filter.
pub mod grep;
/// Exit-status commands: `true`, `false`, `status N`.
pub mod simple;
/// Line, word and byte counts.
pub mod wc;

use std::io::{Read, Write};
use std::sync::Arc;

use crate::ExitCode;
use crate::exec::CommandContext;

/// The streams one command invocation may use.
pub struct CommandIo<'a> {
    pub stdin: &'a mut dyn Read,
    pub stdout: &'a mut dyn Write,
    pub stderr: &'a mut dyn Write,
}

/// Trait for runnable commands.
///
/// An `Err` is an invocation fault: the runner reports it on stderr and
/// records an exit status of `-1`.
pub trait Command: Send + Sync {
    fn run(&self, ctx: &CommandContext, io: &mut CommandIo) -> anyhow::Result<ExitCode>;
}

/// Names accepted in `[commands] enabled`.
pub const BUILTINS: &[&str] = &["cat", "echo", "false", "grep", "status", "true", "wc"];

/// Look up a built-in by name.
pub fn builtin(name: &str) -> Option<Arc<dyn Command>> {
    let command: Arc<dyn Command> = match name {
        "cat" => Arc::new(cat::Cat),
        "echo" => Arc::new(echo::Echo),
        "grep" => Arc::new(grep::Grep),
        "wc" => Arc::new(wc::Wc),
        "true" => Arc::new(simple::StatusCommand::new(0)),
        "false" => Arc::new(simple::StatusCommand::new(1)),
        "status" => Arc::new(simple::StatusCommand::from_argument()),
        _ => return None,
    };
    Some(command)
}

/// Run `command` against `line` with the given stdin, returning the result
/// and everything written to stdout.
#[cfg(test)]
pub(crate) fn run_with(
    command: &dyn Command,
    line: &str,
    stdin: &str,
) -> (anyhow::Result<ExitCode>, String) {
    use crate::parse::{ParseOptions, segment};

    let seg = segment(line, &ParseOptions::new()).remove(0);
    let ctx = CommandContext::from_segment(&seg);
    let mut input = stdin.as_bytes();
    let mut stdout = Vec::new();
    let mut stderr = Vec::new();
    let result = command.run(
        &ctx,
        &mut CommandIo {
            stdin: &mut input,
            stdout: &mut stdout,
            stderr: &mut stderr,
        },
    );
    (result, String::from_utf8_lossy(&stdout).into_owned())
}
