//! Turns parsed segments into an ordered chain of execution nodes.
//!
//! Each segment carries the operator that ended it, so a unit is read as
//! `command [redirect argument]... sequencing-operator`. The builder keeps a
//! two-state machine across segments (waiting for a command, waiting for a
//! redirect argument); the operator step in between runs on every segment.

use std::path::PathBuf;

use log::debug;
use serde::Serialize;

use super::Resolver;
use super::error::ChainError;
use crate::ExitCode;
use crate::parse::{DEFAULT_ERROR_PREFIX, Operator, Segment, SegmentStatus};

/// Where a node reads its stdin from.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(tag = "kind", rename_all = "snake_case")]
pub enum Input {
    None,
    File { path: PathBuf },
    /// Output of the preceding node.
    Piped,
}

/// Where a node's stdout goes, besides the default.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(tag = "kind", rename_all = "snake_case")]
pub enum Output {
    None,
    File { path: PathBuf, append: bool },
}

/// One resolved, routed command unit.
///
/// Created once per line by [`ChainBuilder`]; the scheduler only reads it
/// and the caller fills in `result` after running it.
#[derive(Debug)]
pub struct ExecutionNode<H> {
    pub handle: H,
    /// The segment holding the command word and its arguments.
    pub segment: Segment,
    pub input: Input,
    pub output: Output,
    /// Sequencing operator that ended this unit.
    pub operator: Operator,
    pub result: Option<ExitCode>,
}

impl<H> ExecutionNode<H> {
    pub fn name(&self) -> &str {
        self.segment.command().unwrap_or_default()
    }

    pub fn args(&self) -> impl Iterator<Item = &str> {
        self.segment.args()
    }

    pub fn has_run(&self) -> bool {
        self.result.is_some()
    }

    pub fn record(&mut self, result: ExitCode) {
        self.result = Some(result);
    }

    /// Stdout is handed to the next node.
    pub fn feeds_pipe(&self) -> bool {
        self.operator == Operator::Pipe
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum State {
    NeedCommand,
    /// The redirect operator waiting for its file name.
    NeedArgument(Operator),
    /// A configuration operator that takes no argument; the next segment
    /// only contributes its operator.
    NeedOperator(Operator),
}

/// A unit whose command is resolved but whose sequencing operator has not
/// been seen yet.
struct Pending<H> {
    handle: H,
    segment: Segment,
    input: Option<PathBuf>,
    output: Option<(PathBuf, bool)>,
    sink: Option<Operator>,
}

impl<H> Pending<H> {
    fn new(handle: H, segment: Segment) -> Self {
        Self {
            handle,
            segment,
            input: None,
            output: None,
            sink: None,
        }
    }

    /// Check a redirect operator against the routing already declared.
    fn accept(&self, operator: Operator, prefix: &str) -> Result<(), ChainError> {
        let duplicate = || ChainError::DuplicateRedirect {
            prefix: prefix.to_string(),
            operator,
        };
        if operator.is_source() {
            if self.input.is_some() {
                return Err(duplicate());
            }
            if let Some(sink) = self.sink {
                return Err(ChainError::SinkBeforeSource {
                    prefix: prefix.to_string(),
                    sink,
                    input: operator,
                });
            }
        } else if self.sink.is_some() {
            return Err(duplicate());
        }
        Ok(())
    }

    fn attach(&mut self, operator: Operator, path: PathBuf) {
        if operator.is_source() {
            self.input = Some(path);
        } else {
            self.output = Some((path, operator == Operator::AppendOut));
            self.sink = Some(operator);
        }
    }

    fn finish(self, operator: Operator, piped: bool) -> ExecutionNode<H> {
        let input = match self.input {
            Some(path) => {
                if piped {
                    debug!("'{}': input file replaces piped input", path.display());
                }
                Input::File { path }
            }
            None if piped => Input::Piped,
            None => Input::None,
        };
        let output = match self.output {
            Some((path, append)) => Output::File { path, append },
            None => Output::None,
        };
        ExecutionNode {
            handle: self.handle,
            segment: self.segment,
            input,
            output,
            operator,
            result: None,
        }
    }
}

/// Builds execution chains, resolving command words through `R`.
pub struct ChainBuilder<'r, R> {
    resolver: &'r R,
    prefix: String,
}

impl<'r, R: Resolver> ChainBuilder<'r, R> {
    pub fn new(resolver: &'r R) -> Self {
        Self {
            resolver,
            prefix: DEFAULT_ERROR_PREFIX.to_string(),
        }
    }

    pub fn error_prefix(mut self, prefix: impl Into<String>) -> Self {
        self.prefix = prefix.into();
        self
    }

    /// Build the chain for one line's segments.
    ///
    /// Any segment with a lexical or empty-before-operator status aborts the
    /// build with that segment's message before anything is resolved.
    pub fn build(
        &self,
        segments: Vec<Segment>,
    ) -> Result<Vec<ExecutionNode<R::Handle>>, ChainError> {
        if let Some(bad) = segments.iter().find(|s| !s.is_ok()) {
            return Err(ChainError::Syntax {
                status: bad.status,
                message: bad.error.clone().unwrap_or_default(),
            });
        }

        let mut nodes: Vec<ExecutionNode<R::Handle>> = Vec::new();
        let mut pending: Option<Pending<R::Handle>> = None;
        let mut state = State::NeedCommand;

        for segment in segments {
            let operator = segment.operator;
            match state {
                State::NeedCommand => {
                    let Some(name) = segment.command() else {
                        if operator == Operator::Eol {
                            // Trailing empty segment; a dangling operator
                            // before it is reported after the loop.
                            continue;
                        }
                        return Err(ChainError::Syntax {
                            status: SegmentStatus::EmptyBeforeOperator,
                            message: format!(
                                "{}: syntax error near unexpected token '{}'",
                                self.prefix,
                                operator.as_str()
                            ),
                        });
                    };
                    let handle = self.resolve(name)?;
                    pending = Some(Pending::new(handle, segment));
                }
                State::NeedArgument(redirect) => {
                    let [word] = segment.words.as_slice() else {
                        return Err(self.bad_argument(redirect, segment.words.len()));
                    };
                    let path = PathBuf::from(&word.text);
                    if let Some(unit) = pending.as_mut() {
                        unit.attach(redirect, path);
                    }
                }
                State::NeedOperator(config) => {
                    if !segment.words.is_empty() {
                        return Err(self.bad_argument(config, segment.words.len()));
                    }
                }
            }
            state = self.take_operator(operator, &mut pending, &mut nodes)?;
        }

        if let State::NeedArgument(redirect) = state {
            return Err(self.bad_argument(redirect, 0));
        }
        if let Some(last) = nodes.last()
            && matches!(last.operator, Operator::Pipe | Operator::And | Operator::Or)
        {
            return Err(ChainError::MissingCommand {
                prefix: self.prefix.clone(),
                operator: last.operator,
            });
        }
        debug!("built chain of {} node(s)", nodes.len());
        Ok(nodes)
    }

    fn resolve(&self, name: &str) -> Result<R::Handle, ChainError> {
        self.resolver
            .resolve(name)
            .ok_or_else(|| ChainError::NotFound {
                prefix: self.prefix.clone(),
                name: name.to_string(),
                suggestions: self.resolver.suggest(name),
            })
    }

    /// The operator step: either configure the pending unit and wait for
    /// the redirect's argument, or close the unit into a node.
    fn take_operator(
        &self,
        operator: Operator,
        pending: &mut Option<Pending<R::Handle>>,
        nodes: &mut Vec<ExecutionNode<R::Handle>>,
    ) -> Result<State, ChainError> {
        let Some(unit) = pending.take() else {
            return Ok(State::NeedCommand);
        };
        if operator.is_configuration() {
            unit.accept(operator, &self.prefix)?;
            *pending = Some(unit);
            return Ok(if operator.expects_argument() {
                State::NeedArgument(operator)
            } else {
                State::NeedOperator(operator)
            });
        }
        let piped = nodes.last().is_some_and(|n| n.feeds_pipe());
        let node = unit.finish(operator, piped);
        debug!(
            "node {}: '{}' input={:?} output={:?} ended by {:?}",
            nodes.len(),
            node.name(),
            node.input,
            node.output,
            node.operator
        );
        nodes.push(node);
        Ok(State::NeedCommand)
    }

    fn bad_argument(&self, operator: Operator, found: usize) -> ChainError {
        if found == 0 {
            ChainError::MissingArgument {
                prefix: self.prefix.clone(),
                operator,
            }
        } else {
            ChainError::BadArgument {
                prefix: self.prefix.clone(),
                operator,
                found,
            }
        }
    }
}
