//! Types produced by the segmenter and consumed by the chain builder.

use std::fmt;

use serde::Serialize;

use crate::ExitCode;

/// Control operator that ends or configures a command unit.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum Operator {
    /// Ran off the end of input. Has no literal.
    Eol,
    /// `;`: run next unconditionally
    Semi,
    /// `|`: feed stdout to the next unit
    Pipe,
    /// `>`: write stdout to a file
    RedirectOut,
    /// `>>`: append stdout to a file
    AppendOut,
    /// `<`: read stdin from a file
    RedirectIn,
    /// `&&`: run next only if previous succeeded
    And,
    /// `||`: run next only if previous failed
    Or,
}

impl Operator {
    /// Every operator that has a literal.
    pub const ALL: [Operator; 7] = [
        Operator::Semi,
        Operator::Pipe,
        Operator::RedirectOut,
        Operator::AppendOut,
        Operator::RedirectIn,
        Operator::And,
        Operator::Or,
    ];

    /// The operator's shell syntax. Empty for [`Operator::Eol`].
    pub fn as_str(self) -> &'static str {
        match self {
            Operator::Eol => "",
            Operator::Semi => ";",
            Operator::Pipe => "|",
            Operator::RedirectOut => ">",
            Operator::AppendOut => ">>",
            Operator::RedirectIn => "<",
            Operator::And => "&&",
            Operator::Or => "||",
        }
    }

    /// Look an operator up by its literal.
    pub fn from_literal(literal: &str) -> Option<Self> {
        Self::ALL.into_iter().find(|op| op.as_str() == literal)
    }

    /// Redirections attach routing to the current unit instead of ending it.
    pub fn is_configuration(self) -> bool {
        matches!(
            self,
            Operator::RedirectOut | Operator::AppendOut | Operator::RedirectIn
        )
    }

    /// Operators that end a unit and gate the next one.
    pub fn is_sequencing(self) -> bool {
        !self.is_configuration()
    }

    /// Whether one more word (a file name) must follow the operator.
    pub fn expects_argument(self) -> bool {
        self.is_configuration()
    }

    /// Data source redirections (`<`).
    pub fn is_source(self) -> bool {
        self == Operator::RedirectIn
    }

    /// Decide whether the unit after this operator runs, given the result of
    /// the nearest unit that actually ran.
    pub fn run_gate(self, previous: ExitCode) -> bool {
        match self {
            Operator::And => previous == 0,
            Operator::Or => previous != 0,
            _ => true,
        }
    }

    /// Longest enabled operator literal that `rest` starts with.
    pub(crate) fn match_at(rest: &str, enabled: &[Operator]) -> Option<Operator> {
        enabled
            .iter()
            .copied()
            .filter(|op| *op != Operator::Eol && rest.starts_with(op.as_str()))
            .max_by_key(|op| op.as_str().len())
    }
}

impl fmt::Display for Operator {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Operator::Eol => f.write_str("end of input"),
            op => f.write_str(op.as_str()),
        }
    }
}

/// Marks a word that was still inside a quote or bracket when the line ended.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum WordStatus {
    Plain,
    OpenQuote,
    OpenBracket,
}

/// One whitespace/quote delimited token.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct Word {
    /// Text with quotes removed and outer escapes applied.
    pub text: String,
    /// Byte offset in the original line where the word began.
    pub offset: usize,
    pub status: WordStatus,
}

/// Parse status of a whole segment.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum SegmentStatus {
    Ok,
    UnclosedQuote,
    DoubleUnclosedQuote,
    EmptyBeforeOperator,
}

/// One operator-delimited unit of a parsed line.
///
/// `words` is always present, possibly empty. When `status` is not
/// [`SegmentStatus::Ok`] the `error` message says why and `operator` still
/// reports what terminated the segment.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct Segment {
    /// Slice of the input covered by this segment, operator excluded.
    pub original: String,
    pub words: Vec<Word>,
    /// The cursor (absolute byte offset) when it falls inside this segment.
    pub cursor: Option<usize>,
    /// Index of the word under the cursor; `None` for an empty-word selection.
    pub selected_word: Option<usize>,
    /// Byte offset of the cursor inside the selected word's text.
    pub cursor_in_word: usize,
    pub status: SegmentStatus,
    pub error: Option<String>,
    /// Operator that ended the segment.
    pub operator: Operator,
}

impl Segment {
    pub fn is_ok(&self) -> bool {
        self.status == SegmentStatus::Ok
    }

    /// The word under the cursor, if any.
    pub fn selected(&self) -> Option<&Word> {
        self.selected_word.and_then(|i| self.words.get(i))
    }

    /// The leading word: the command name of a unit.
    pub fn command(&self) -> Option<&str> {
        self.words.first().map(|w| w.text.as_str())
    }

    /// Every word after the command name.
    pub fn args(&self) -> impl Iterator<Item = &str> {
        self.words.iter().skip(1).map(|w| w.text.as_str())
    }

    /// Words re-quoted for the shell and joined with single spaces.
    pub fn normalized(&self) -> String {
        super::tokenize::join(self.words.iter().map(|w| w.text.as_str()))
    }
}
