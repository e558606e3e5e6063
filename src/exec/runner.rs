//! Runs one line end to end: segment, build, schedule, invoke.

use std::collections::HashMap;
use std::fs::{File, OpenOptions};
use std::io::{self, Cursor, Read, Write};
use std::sync::Arc;

use anyhow::Context;
use log::{debug, warn};
use serde::Serialize;

use super::chain::{ChainBuilder, ExecutionNode, Input, Output};
use super::context::CommandContext;
use super::error::ChainError;
use super::outcome::Outcome;
use super::scheduler::Scheduler;
use super::CommandRegistry;
use crate::ExitCode;
use crate::commands::{Command, CommandIo};
use crate::config::Config;
use crate::parse::{Operator, ParseOptions, Segment, segment};

/// A chain ready to run against the registry's commands.
pub type Chain = Vec<ExecutionNode<Arc<dyn Command>>>;

/// Where one node's stdout ends up.
enum Sink {
    Inherit,
    File(File),
    Pipe(Vec<u8>),
}

/// What happened to one node.
#[derive(Debug, Clone, Serialize)]
pub struct NodeReport {
    pub command: String,
    /// The unit's words, re-quoted.
    pub line: String,
    pub operator: Operator,
    pub input: Input,
    pub output: Output,
    pub outcome: Outcome,
}

/// Result of running one line.
#[derive(Debug, Clone, Default, Serialize)]
pub struct RunReport {
    pub nodes: Vec<NodeReport>,
    /// Set when the run stopped on a routing failure.
    pub fault: Option<String>,
}

impl RunReport {
    fn collect<H>(nodes: &[ExecutionNode<H>], scheduler: &Scheduler, fault: Option<String>) -> Self {
        let nodes = nodes
            .iter()
            .enumerate()
            .map(|(i, node)| NodeReport {
                command: node.name().to_string(),
                line: node.segment.normalized(),
                operator: node.operator,
                input: node.input.clone(),
                output: node.output.clone(),
                outcome: scheduler.outcome(nodes, i),
            })
            .collect();
        Self { nodes, fault }
    }

    /// Exit status of the last node that ran; `-1` after a fault, 0 when
    /// nothing ran.
    pub fn exit_code(&self) -> ExitCode {
        if self.fault.is_some() {
            return -1;
        }
        self.nodes
            .iter()
            .rev()
            .find_map(|n| n.outcome.code())
            .unwrap_or(0)
    }

    pub fn outcomes(&self) -> Vec<Outcome> {
        self.nodes.iter().map(|n| n.outcome).collect()
    }

    /// One line: `name=outcome` per node, space separated.
    pub fn summary(&self) -> String {
        self.nodes
            .iter()
            .map(|n| format!("{}={}", n.command, n.outcome))
            .collect::<Vec<_>>()
            .join(" ")
    }
}

/// Runs lines against a registry with one configuration's parse settings.
pub struct Runner<'a> {
    registry: &'a CommandRegistry,
    operators: Vec<Operator>,
    parse_brackets: bool,
    prefix: String,
}

impl<'a> Runner<'a> {
    pub fn new(registry: &'a CommandRegistry, config: &Config) -> Self {
        Self {
            registry,
            operators: config.operators(),
            parse_brackets: config.settings.parse_brackets,
            prefix: config.settings.error_prefix.clone(),
        }
    }

    /// Segmenter options matching this runner's configuration.
    pub fn options(&self) -> ParseOptions<'_> {
        ParseOptions::new()
            .brackets(self.parse_brackets)
            .operators(&self.operators)
            .error_prefix(&self.prefix)
    }

    pub fn parse(&self, line: &str) -> Vec<Segment> {
        segment(line, &self.options())
    }

    pub fn build(&self, line: &str) -> Result<Chain, ChainError> {
        ChainBuilder::new(self.registry)
            .error_prefix(self.prefix.as_str())
            .build(self.parse(line))
    }

    /// Run `line`, writing unredirected output to `stdout` and command
    /// faults to `stderr`.
    ///
    /// Parse and build errors are returned before anything runs. A routing
    /// failure while running stops the line and is reported in
    /// [`RunReport::fault`].
    pub fn run(
        &self,
        line: &str,
        stdout: &mut dyn Write,
        stderr: &mut dyn Write,
    ) -> Result<RunReport, ChainError> {
        let mut nodes = self.build(line)?;
        let mut scheduler = Scheduler::new();
        let mut pipes: HashMap<usize, Vec<u8>> = HashMap::new();
        let mut fault = None;

        while let Some(index) = scheduler.next(&nodes) {
            match self.invoke(&nodes, index, &mut pipes, stdout, stderr) {
                Ok(code) => nodes[index].record(code),
                Err(e) => {
                    let message = format!("{}: {}: {e:#}", self.prefix, nodes[index].name());
                    warn!("{message}");
                    if let Err(write_err) = writeln!(stderr, "{message}") {
                        warn!("cannot report fault on stderr: {write_err}");
                    }
                    fault = Some(message);
                    break;
                }
            }
        }
        Ok(RunReport::collect(&nodes, &scheduler, fault))
    }

    /// Route and invoke one node. An `Err` is a routing failure; command
    /// faults are reported here and turned into `-1`.
    fn invoke(
        &self,
        nodes: &[ExecutionNode<Arc<dyn Command>>],
        index: usize,
        pipes: &mut HashMap<usize, Vec<u8>>,
        stdout: &mut dyn Write,
        stderr: &mut dyn Write,
    ) -> anyhow::Result<ExitCode> {
        let node = &nodes[index];
        debug!("running node {index} '{}'", node.name());

        let mut input: Box<dyn Read> = match &node.input {
            Input::File { path } => Box::new(
                File::open(path).with_context(|| format!("cannot open {}", path.display()))?,
            ),
            Input::Piped => {
                let data = index
                    .checked_sub(1)
                    .and_then(|producer| pipes.remove(&producer))
                    .unwrap_or_default();
                Box::new(Cursor::new(data))
            }
            Input::None => Box::new(io::empty()),
        };
        let mut sink = match &node.output {
            Output::File { path, append } => Sink::File(
                OpenOptions::new()
                    .create(true)
                    .write(true)
                    .append(*append)
                    .truncate(!*append)
                    .open(path)
                    .with_context(|| format!("cannot open {}", path.display()))?,
            ),
            Output::None if node.feeds_pipe() => Sink::Pipe(Vec::new()),
            Output::None => Sink::Inherit,
        };

        let ctx = CommandContext::from_segment(&node.segment);
        let result = {
            let out: &mut dyn Write = match &mut sink {
                Sink::Inherit => &mut *stdout,
                Sink::File(file) => file,
                Sink::Pipe(buffer) => buffer,
            };
            let mut io = CommandIo {
                stdin: &mut *input,
                stdout: out,
                stderr: &mut *stderr,
            };
            node.handle.run(&ctx, &mut io)
        };

        let code = match result {
            Ok(code) => code,
            Err(e) => {
                warn!("'{}' failed: {e:#}", node.name());
                writeln!(stderr, "{}: {}: {e:#}", self.prefix, node.name())?;
                -1
            }
        };

        match sink {
            Sink::Inherit => stdout.flush()?,
            Sink::File(mut file) => file.flush()?,
            Sink::Pipe(buffer) => {
                pipes.insert(index, buffer);
            }
        }
        Ok(code)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn run(line: &str) -> (RunReport, String, String) {
        let config = Config::default_config();
        let registry = CommandRegistry::from_config(&config);
        let runner = Runner::new(&registry, &config);
        let mut out = Vec::new();
        let mut err = Vec::new();
        let report = runner.run(line, &mut out, &mut err).unwrap();
        (
            report,
            String::from_utf8(out).unwrap(),
            String::from_utf8(err).unwrap(),
        )
    }

    fn temp(name: &str) -> std::path::PathBuf {
        std::env::temp_dir().join(format!("linechain-runner-{}-{name}", std::process::id()))
    }

    #[test]
    fn single_command() {
        let (report, out, err) = run("echo hello world");
        assert_eq!(out, "hello world\n");
        assert!(err.is_empty());
        assert_eq!(report.exit_code(), 0);
        assert_eq!(report.outcomes(), vec![Outcome::Ran(0)]);
    }

    #[test]
    fn empty_line_runs_nothing() {
        let (report, out, _) = run("   ");
        assert!(report.nodes.is_empty());
        assert_eq!(report.exit_code(), 0);
        assert!(out.is_empty());
    }

    #[test]
    fn pipeline_passes_data() {
        let (report, out, _) = run("echo one two three | wc -w");
        assert_eq!(out, "3\n");
        assert_eq!(report.outcomes(), vec![Outcome::Ran(0), Outcome::Ran(0)]);
    }

    #[test]
    fn three_stage_pipeline() {
        let (_, out, _) = run("echo apple | cat | grep pp");
        assert_eq!(out, "apple\n");
    }

    #[test]
    fn short_circuit() {
        let (report, out, _) = run("false && echo no || echo yes ; echo done");
        assert_eq!(out, "yes\ndone\n");
        assert_eq!(
            report.outcomes(),
            vec![
                Outcome::Ran(1),
                Outcome::Skipped,
                Outcome::Ran(0),
                Outcome::Ran(0)
            ]
        );
        assert_eq!(report.summary(), "false=ran(1) echo=skipped echo=ran(0) echo=ran(0)");
    }

    #[test]
    fn exit_code_is_last_run_node() {
        let (report, _, _) = run("true && status 4 || status 9");
        assert_eq!(report.exit_code(), 9);
        let (report, _, _) = run("status 3 && echo skipped");
        assert_eq!(report.exit_code(), 3);
    }

    #[test]
    fn skipped_producer_leaves_consumer_empty_input() {
        let (report, out, _) = run("false && echo hi | wc -c");
        assert_eq!(out, "0\n");
        assert_eq!(report.outcomes()[1], Outcome::Skipped);
        assert_eq!(report.outcomes()[2], Outcome::Ran(0));
    }

    #[test]
    fn redirect_out_then_in() {
        let path = temp("out.txt");
        let line = format!(
            "echo first > {p} ; echo second >> {p} ; cat < {p}",
            p = path.display()
        );
        let (report, out, _) = run(&line);
        let written = std::fs::read_to_string(&path).unwrap();
        std::fs::remove_file(&path).unwrap();
        assert_eq!(written, "first\nsecond\n");
        assert_eq!(out, "first\nsecond\n");
        assert_eq!(report.exit_code(), 0);
    }

    #[test]
    fn truncating_redirect_replaces_content() {
        let path = temp("trunc.txt");
        std::fs::write(&path, "old content that is long\n").unwrap();
        let (_, out, _) = run(&format!("echo new > {}", path.display()));
        let written = std::fs::read_to_string(&path).unwrap();
        std::fs::remove_file(&path).unwrap();
        assert!(out.is_empty());
        assert_eq!(written, "new\n");
    }

    #[test]
    fn command_fault_is_minus_one() {
        let (report, out, err) = run("grep ; echo after");
        assert_eq!(report.outcomes()[0], Outcome::Ran(-1));
        assert_eq!(err, "linechain: grep: missing pattern\n");
        assert_eq!(out, "after\n");
        assert!(report.fault.is_none());
    }

    #[test]
    fn fault_fails_and_gate() {
        let (report, out, _) = run("status x && echo no");
        assert_eq!(report.outcomes(), vec![Outcome::Ran(-1), Outcome::Skipped]);
        assert!(out.is_empty());
        assert_eq!(report.exit_code(), -1);
    }

    #[test]
    fn missing_input_file_stops_the_line() {
        let (report, out, err) = run("echo before ; cat < /nonexistent/linechain/in ; echo after");
        assert_eq!(out, "before\n");
        assert!(err.starts_with("linechain: cat: cannot open /nonexistent/linechain/in"));
        assert_eq!(
            report.outcomes(),
            vec![Outcome::Ran(0), Outcome::NotRun, Outcome::NotRun]
        );
        assert_eq!(report.exit_code(), -1);
        assert!(report.fault.is_some());
    }

    struct Closed;

    impl Write for Closed {
        fn write(&mut self, _: &[u8]) -> std::io::Result<usize> {
            Err(std::io::Error::from(std::io::ErrorKind::BrokenPipe))
        }

        fn flush(&mut self) -> std::io::Result<()> {
            Ok(())
        }
    }

    #[test]
    fn fault_recorded_when_stderr_is_closed() {
        let config = Config::default_config();
        let registry = CommandRegistry::from_config(&config);
        let runner = Runner::new(&registry, &config);
        let mut out = Vec::new();
        let report = runner
            .run("cat < /nonexistent/linechain/in ; echo after", &mut out, &mut Closed)
            .unwrap();
        assert!(out.is_empty());
        assert!(report.fault.as_ref().is_some_and(|f| f.contains("cannot open")));
        assert_eq!(report.outcomes(), vec![Outcome::NotRun, Outcome::NotRun]);
    }

    #[test]
    fn build_error_runs_nothing() {
        let config = Config::default_config();
        let registry = CommandRegistry::from_config(&config);
        let runner = Runner::new(&registry, &config);
        let mut out = Vec::new();
        let mut err = Vec::new();
        let result = runner.run("echo hi ; nosuch", &mut out, &mut err);
        assert!(result.is_err_and(|e| e.is_not_found()));
        assert!(out.is_empty());
    }

    #[test]
    fn alias_runs_target() {
        let (report, out, _) = run("print via alias");
        assert_eq!(out, "via alias\n");
        assert_eq!(report.nodes[0].command, "print");
    }

    #[test]
    fn report_serializes() {
        let (report, _, _) = run("echo x | wc -l");
        let json = serde_json::to_value(&report).unwrap();
        assert_eq!(json["nodes"][0]["operator"], "pipe");
        assert_eq!(json["nodes"][1]["input"]["kind"], "piped");
        assert_eq!(json["nodes"][1]["outcome"]["state"], "ran");
        assert_eq!(json["fault"], serde_json::Value::Null);
    }

    #[test]
    fn custom_operators() {
        let mut config = Config::default_config();
        config.operators.enabled = vec!["|".into()];
        let registry = CommandRegistry::from_config(&config);
        let runner = Runner::new(&registry, &config);
        let mut out = Vec::new();
        let mut err = Vec::new();
        let report = runner.run("echo a ; b | wc -w", &mut out, &mut err).unwrap();
        assert_eq!(report.nodes.len(), 2);
        // `;` is an ordinary word here.
        assert_eq!(String::from_utf8(out).unwrap(), "3\n");
    }
}
