use crate::ExitCode;
use crate::commands::{Command, CommandIo};
use crate::exec::CommandContext;

/// `echo [-n] WORD...`
pub struct Echo;

impl Command for Echo {
    fn run(&self, ctx: &CommandContext, io: &mut CommandIo) -> anyhow::Result<ExitCode> {
        let (newline, words) = match ctx.args() {
            ["-n", rest @ ..] => (false, rest),
            all => (true, all),
        };
        io.stdout.write_all(words.join(" ").as_bytes())?;
        if newline {
            io.stdout.write_all(b"\n")?;
        }
        Ok(0)
    }
}
