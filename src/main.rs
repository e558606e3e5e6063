//! linechain: run shell-style command lines through the chain runner.
//!
//! Reads one line from the arguments, or one line at a time from stdin, and
//! runs it with the built-in commands. Also exposes the parser for tooling:
//!   - `--parse LINE` prints the segments as JSON
//!   - `--complete CURSOR LINE` prints the completion target as JSON
//!   - `--dump-config` prints the merged configuration as TOML

use std::io::{self, BufRead, Write};

use serde::Serialize;

use linechain::ExitCode;
use linechain::config::Config;
use linechain::exec::{CommandRegistry, Runner};
use linechain::logging;
use linechain::parse::completion_target;

const USAGE: &str = "\
usage: linechain [--config PATH] [--verbose] [--json] [LINE]
       linechain [--config PATH] --parse LINE
       linechain [--config PATH] --complete CURSOR LINE
       linechain [--config PATH] --dump-config";

/// Exit status when a line cannot be parsed or built.
const SYNTAX_EXIT: i32 = 2;

// ─── Arguments ───────────────────────────────────────

#[derive(Debug, Default, PartialEq)]
enum Mode {
    /// Run `Args::line`, or stdin lines when there is none.
    #[default]
    Run,
    Parse(String),
    Complete {
        cursor: usize,
        line: String,
    },
    DumpConfig,
    Help,
}

#[derive(Debug, Default, PartialEq)]
struct Args {
    config: Option<String>,
    verbose: bool,
    json: bool,
    mode: Mode,
    line: Option<String>,
}

fn parse_args(args: impl IntoIterator<Item = String>) -> Result<Args, String> {
    let mut args = args.into_iter();
    let mut parsed = Args::default();
    while let Some(arg) = args.next() {
        match arg.as_str() {
            "--config" => parsed.config = Some(args.next().ok_or("--config needs a path")?),
            "--verbose" | "-v" => parsed.verbose = true,
            "--json" => parsed.json = true,
            "--parse" => parsed.mode = Mode::Parse(args.next().ok_or("--parse needs a line")?),
            "--complete" => {
                let missing = "--complete needs a cursor and a line";
                let cursor = args.next().ok_or(missing)?;
                let cursor = cursor
                    .parse()
                    .map_err(|_| format!("invalid cursor '{cursor}'"))?;
                let line = args.next().ok_or(missing)?;
                parsed.mode = Mode::Complete { cursor, line };
            }
            "--dump-config" => parsed.mode = Mode::DumpConfig,
            "--help" | "-h" => parsed.mode = Mode::Help,
            other if other.starts_with("--") => return Err(format!("unknown option '{other}'")),
            _ => {
                if parsed.line.is_some() {
                    return Err("only one LINE may be given; quote it".into());
                }
                parsed.line = Some(arg);
            }
        }
    }
    Ok(parsed)
}

// ─── Output ──────────────────────────────────────────

/// Map a command status onto a process exit status.
fn exit_status(code: ExitCode) -> i32 {
    if (0..=255).contains(&code) { code } else { 255 }
}

fn print_json<T: Serialize>(out: &mut dyn Write, value: &T) -> i32 {
    match serde_json::to_string(value) {
        Ok(json) => match writeln!(out, "{json}") {
            Ok(()) => 0,
            Err(e) => {
                eprintln!("linechain: write error: {e}");
                1
            }
        },
        Err(e) => {
            eprintln!("linechain: JSON error: {e}");
            1
        }
    }
}

// ─── Running ─────────────────────────────────────────

fn run_line(runner: &Runner, prefix: &str, line: &str, json: bool) -> i32 {
    let stdout = io::stdout();
    let mut out = stdout.lock();
    let mut err = io::stderr();
    match runner.run(line, &mut out, &mut err) {
        Ok(report) => {
            logging::log_run(line, &report);
            if json {
                print_json(&mut out, &report);
            }
            exit_status(report.exit_code())
        }
        Err(e) => {
            logging::log_rejected(line, &e);
            eprintln!("{e}");
            if !e.suggestions().is_empty() {
                eprintln!("{prefix}: did you mean: {}?", e.suggestions().join(", "));
            }
            SYNTAX_EXIT
        }
    }
}

/// Run stdin line by line; the status is that of the last line.
fn run_stdin(runner: &Runner, prefix: &str, json: bool) -> i32 {
    let mut status = 0;
    for line in io::stdin().lock().lines() {
        let line = match line {
            Ok(line) => line,
            Err(e) => {
                eprintln!("linechain: failed to read stdin: {e}");
                return 1;
            }
        };
        if line.trim().is_empty() {
            continue;
        }
        status = run_line(runner, prefix, &line, json);
    }
    status
}

// ─── Entry point ─────────────────────────────────────

fn main() {
    let args = match parse_args(std::env::args().skip(1)) {
        Ok(args) => args,
        Err(e) => {
            eprintln!("linechain: {e}");
            eprintln!("{USAGE}");
            std::process::exit(SYNTAX_EXIT);
        }
    };
    if args.mode == Mode::Help {
        println!("{USAGE}");
        return;
    }

    let config = Config::load(args.config.as_deref());
    logging::init(&config.settings, args.verbose);
    let registry = CommandRegistry::from_config(&config);
    let runner = Runner::new(&registry, &config);
    let prefix = config.settings.error_prefix.as_str();
    let mut stdout = io::stdout();

    let status = match args.mode {
        Mode::Parse(line) => {
            let segments = runner.parse(&line);
            let status = print_json(&mut stdout, &segments);
            if segments.iter().all(|s| s.is_ok()) { status } else { SYNTAX_EXIT }
        }
        Mode::Complete { cursor, line } => {
            let target = completion_target(&line, cursor, &runner.options());
            let status = print_json(&mut stdout, &target);
            if target.is_some() { status } else { 1 }
        }
        Mode::DumpConfig => match toml::to_string(&config) {
            Ok(text) => {
                print!("{text}");
                0
            }
            Err(e) => {
                eprintln!("linechain: cannot serialize config: {e}");
                1
            }
        },
        Mode::Run => match args.line {
            Some(line) => run_line(&runner, prefix, &line, args.json),
            None => run_stdin(&runner, prefix, args.json),
        },
        Mode::Help => 0,
    };
    std::process::exit(status);
}

// ─── Tests ───────────────────────────────────────────
