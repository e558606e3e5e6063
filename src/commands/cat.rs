use std::fs::File;
use std::io::copy;

use anyhow::Context;

use crate::ExitCode;
use crate::commands::{Command, CommandIo};
use crate::exec::CommandContext;

/// `cat [FILE...]`: copies each file, or stdin for none or `-`.
pub struct Cat;

impl Command for Cat {
    fn run(&self, ctx: &CommandContext, io: &mut CommandIo) -> anyhow::Result<ExitCode> {
        let files = ctx.operands();
        if files.is_empty() {
            copy(&mut *io.stdin, &mut *io.stdout)?;
            return Ok(0);
        }
        for name in files {
            if name == "-" {
                copy(&mut *io.stdin, &mut *io.stdout)?;
                continue;
            }
            let mut file = File::open(name).with_context(|| name.to_string())?;
            copy(&mut file, &mut *io.stdout)?;
        }
        Ok(0)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::commands::run_with;

    #[test]
    fn copies_stdin() {
        let (code, out) = run_with(&Cat, "cat", "one\ntwo\n");
        assert_eq!(code.unwrap(), 0);
        assert_eq!(out, "one\ntwo\n");
    }

    #[test]
    fn reads_files() {
        let path = std::env::temp_dir().join(format!("linechain-cat-{}.txt", std::process::id()));
        std::fs::write(&path, "from file\n").unwrap();
        let line = format!("cat {} -", path.display());
        let (code, out) = run_with(&Cat, &line, "from stdin\n");
        std::fs::remove_file(&path).unwrap();
        assert_eq!(code.unwrap(), 0);
        assert_eq!(out, "from file\nfrom stdin\n");
    }

    #[test]
    fn missing_file_is_a_fault() {
        let (result, _) = run_with(&Cat, "cat /nonexistent/linechain/file", "");
        let err = result.unwrap_err();
        assert!(format!("{err:#}").starts_with("/nonexistent/linechain/file: "));
    }
}
