//! Commands that do nothing but exit with a status.

use anyhow::Context;

use crate::ExitCode;
use crate::commands::{Command, CommandIo};
use crate::exec::CommandContext;

/// Exits with a fixed status, or with the status named by its first argument.
pub struct StatusCommand {
    /// `None` reads the status from the first argument, defaulting to 0.
    code: Option<ExitCode>,
}

impl StatusCommand {
    pub fn new(code: ExitCode) -> Self {
        Self { code: Some(code) }
    }

    pub fn from_argument() -> Self {
        Self { code: None }
    }
}

impl Command for StatusCommand {
    fn run(&self, ctx: &CommandContext, _io: &mut CommandIo) -> anyhow::Result<ExitCode> {
        if let Some(code) = self.code {
            return Ok(code);
        }
        let Some(arg) = ctx.args().first() else {
            return Ok(0);
        };
        arg.parse::<ExitCode>()
            .with_context(|| format!("invalid exit status '{arg}'"))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::commands::run_with;

    #[test]
    fn fixed() {
        assert_eq!(run_with(&StatusCommand::new(0), "true", "").0.unwrap(), 0);
        assert_eq!(run_with(&StatusCommand::new(1), "false x", "").0.unwrap(), 1);
    }

    #[test]
    fn from_argument() {
        let cmd = StatusCommand::from_argument();
        assert_eq!(run_with(&cmd, "status 3", "").0.unwrap(), 3);
        assert_eq!(run_with(&cmd, "status", "").0.unwrap(), 0);
    }

    #[test]
    fn bad_argument_is_a_fault() {
        let (result, out) = run_with(&StatusCommand::from_argument(), "status x", "");
        let err = result.unwrap_err();
        assert!(err.to_string().contains("invalid exit status 'x'"));
        assert!(out.is_empty());
    }
}
