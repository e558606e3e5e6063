use crate::ExitCode;
use crate::commands::{Command, CommandIo};
use crate::exec::CommandContext;

/// `wc [-l] [-w] [-c]`: counts of stdin. With no flag all three are printed.
pub struct Wc;

impl Command for Wc {
    fn run(&self, ctx: &CommandContext, io: &mut CommandIo) -> anyhow::Result<ExitCode> {
        let mut data = Vec::new();
        io.stdin.read_to_end(&mut data)?;

        let lines = data.iter().filter(|b| **b == b'\n').count();
        let words = String::from_utf8_lossy(&data).split_whitespace().count();
        let bytes = data.len();

        let any = ctx.has_any_flag(&["-l", "-w", "-c"]);
        let counts: Vec<String> = [("-l", lines), ("-w", words), ("-c", bytes)]
            .into_iter()
            .filter(|(flag, _)| !any || ctx.has_flag(flag))
            .map(|(_, n)| n.to_string())
            .collect();
        writeln!(io.stdout, "{}", counts.join(" "))?;
        Ok(0)
    }
}
