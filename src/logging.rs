use std::fs::OpenOptions;
use std::path::Path;

use log::{LevelFilter, info};
use simplelog::{
    ColorChoice, CombinedLogger, ConfigBuilder, SharedLogger, TermLogger, TerminalMode,
    WriteLogger,
};

use crate::config::Settings;
use crate::exec::{ChainError, RunReport};

/// Log target of run-history records.
pub const HISTORY_TARGET: &str = "linechain::history";

/// Longest command line kept in a history record, in chars.
const MAX_LINE: usize = 200;

/// Install the global logger: diagnostics on stderr, plus run history
/// appended to `settings.history_file` when it is set.
/// Best-effort: failures are reported on stderr and never abort.
pub fn init(settings: &Settings, verbose: bool) {
    let level = if verbose {
        LevelFilter::Debug
    } else {
        settings.log_level.parse().unwrap_or_else(|_| {
            eprintln!(
                "linechain: unknown log level '{}', using warn",
                settings.log_level
            );
            LevelFilter::Warn
        })
    };

    let term_config = ConfigBuilder::new()
        .add_filter_ignore_str(HISTORY_TARGET)
        .set_time_level(LevelFilter::Off)
        .build();
    let mut loggers: Vec<Box<dyn SharedLogger>> = vec![TermLogger::new(
        level,
        term_config,
        TerminalMode::Stderr,
        ColorChoice::Auto,
    )];

    if let Some(path) = settings.history_path() {
        match open_history(Path::new(&path)) {
            Ok(file) => {
                let history_config = ConfigBuilder::new()
                    .add_filter_allow_str(HISTORY_TARGET)
                    .set_time_format_rfc3339()
                    .build();
                loggers.push(WriteLogger::new(LevelFilter::Info, history_config, file));
            }
            Err(e) => eprintln!("linechain: cannot open history file {path}: {e}"),
        }
    }

    // A logger may already be installed (tests, embedding); keep it.
    let _ = CombinedLogger::init(loggers);
}

fn open_history(path: &Path) -> std::io::Result<std::fs::File> {
    if let Some(dir) = path.parent() {
        std::fs::create_dir_all(dir)?;
    }
    OpenOptions::new().create(true).append(true).open(path)
}

/// Record one executed line in the run history.
pub fn log_run(line: &str, report: &RunReport) {
    info!(
        target: HISTORY_TARGET,
        "{}",
        history_record(line, report.exit_code(), &report.summary())
    );
}

/// Record a line that was rejected before running.
pub fn log_rejected(line: &str, error: &ChainError) {
    info!(
        target: HISTORY_TARGET,
        "{}",
        history_record(line, 2, &error.to_string())
    );
}

/// `<line>\t<exit code>\t<detail>` on a single line.
fn history_record(line: &str, code: i32, detail: &str) -> String {
    let line: String = line.replace(['\n', '\t'], " ").chars().take(MAX_LINE).collect();
    let detail = detail.replace('\n', "; ");
    format!("{line}\t{code}\t{detail}")
}
