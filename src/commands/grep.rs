use std::fs::File;
use std::io::{BufRead, BufReader, Read, Write};

use anyhow::{Context, bail};

use crate::ExitCode;
use crate::commands::{Command, CommandIo};
use crate::exec::CommandContext;

/// `grep [-v] [-i] [-c] PATTERN [FILE...]`
///
/// Fixed-substring matching only. Exits 0 when any line was selected and 1
/// otherwise.
pub struct Grep;

struct Filter<'p> {
    pattern: &'p str,
    folded: String,
    invert: bool,
    ignore_case: bool,
}

impl Filter<'_> {
    fn selects(&self, line: &str) -> bool {
        let hit = if self.ignore_case {
            line.to_lowercase().contains(&self.folded)
        } else {
            line.contains(self.pattern)
        };
        hit != self.invert
    }

    /// Filter one input, printing selected lines unless only counting.
    fn scan(&self, input: impl Read, out: &mut dyn Write, print: bool) -> anyhow::Result<usize> {
        let mut selected = 0;
        for line in BufReader::new(input).lines() {
            let line = line?;
            if self.selects(&line) {
                selected += 1;
                if print {
                    writeln!(out, "{line}")?;
                }
            }
        }
        Ok(selected)
    }
}

impl Command for Grep {
    fn run(&self, ctx: &CommandContext, io: &mut CommandIo) -> anyhow::Result<ExitCode> {
        let operands = ctx.operands();
        let Some((&pattern, files)) = operands.split_first() else {
            bail!("missing pattern");
        };
        let filter = Filter {
            pattern,
            folded: pattern.to_lowercase(),
            invert: ctx.has_flag("-v"),
            ignore_case: ctx.has_flag("-i"),
        };
        let count_only = ctx.has_flag("-c");

        let mut selected = 0;
        if files.is_empty() {
            selected += filter.scan(&mut *io.stdin, &mut *io.stdout, !count_only)?;
        } else {
            for name in files {
                let file = File::open(name).with_context(|| name.to_string())?;
                selected += filter.scan(file, &mut *io.stdout, !count_only)?;
            }
        }
        if count_only {
            writeln!(io.stdout, "{selected}")?;
        }
        Ok(if selected > 0 { 0 } else { 1 })
    }
}
