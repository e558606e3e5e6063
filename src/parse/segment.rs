//! Quote, escape and bracket aware segmentation of one input line.
//!
//! The scanner walks the line once, left to right, with one character of
//! lookahead for operator literals. Each call builds a short-lived
//! [`Segmenter`]; nothing is shared between calls.

use log::debug;
use std::ops::Range;

use super::types::{Operator, Segment, SegmentStatus, Word, WordStatus};

/// Prefix of syntax error messages unless configured otherwise.
pub const DEFAULT_ERROR_PREFIX: &str = "linechain";

/// How a line is segmented.
#[derive(Debug, Clone, Copy)]
pub struct ParseOptions<'a> {
    /// Byte offset of the editing cursor, for completion.
    pub cursor: Option<usize>,
    /// Treat `{}` and `()` as grouping that suspends splitting.
    pub parse_brackets: bool,
    /// Operators to split at. Empty means whole-line mode (one segment).
    pub operators: &'a [Operator],
    pub error_prefix: &'a str,
}

impl Default for ParseOptions<'_> {
    fn default() -> Self {
        Self {
            cursor: None,
            parse_brackets: false,
            operators: &[],
            error_prefix: DEFAULT_ERROR_PREFIX,
        }
    }
}

impl<'a> ParseOptions<'a> {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn cursor(mut self, cursor: usize) -> Self {
        self.cursor = Some(cursor);
        self
    }

    pub fn brackets(mut self, parse_brackets: bool) -> Self {
        self.parse_brackets = parse_brackets;
        self
    }

    pub fn operators(mut self, operators: &'a [Operator]) -> Self {
        self.operators = operators;
        self
    }

    pub fn error_prefix(mut self, prefix: &'a str) -> Self {
        self.error_prefix = prefix;
        self
    }
}

/// Split `text` into segments.
///
/// With no operators in `options` the result always holds exactly one
/// segment. Otherwise the line is cut at every unescaped, unquoted,
/// unbracketed operator literal, and a (possibly empty) trailing segment
/// ended by [`Operator::Eol`] is always present.
pub fn segment(text: &str, options: &ParseOptions<'_>) -> Vec<Segment> {
    Segmenter::new(text, *options).run()
}

fn closer(open: char) -> char {
    if open == '{' { '}' } else { ')' }
}

struct Segmenter<'a> {
    text: &'a str,
    options: ParseOptions<'a>,
    segments: Vec<Segment>,

    // Current segment.
    start: usize,
    words: Vec<Word>,
    buf: String,
    word_start: Option<usize>,
    selection: Option<(usize, usize)>,

    // Lexical state.
    escaped: bool,
    single: bool,
    double: bool,
    /// Position of the opening double quote.
    quote_open: usize,
    /// Position of the quote that entered ternary mode, buffer length then.
    ternary: Option<(usize, usize)>,
    /// A quote of the other kind toggled while inside quotes.
    stray_single: bool,
    stray_double: bool,
    /// Expected closing characters, innermost last.
    brackets: Vec<char>,
    prev: Option<char>,
    /// Previous character was an unescaped word separator.
    at_boundary: bool,
    /// Previous character closed a quoted word.
    word_closed: bool,
}

impl<'a> Segmenter<'a> {
    fn new(text: &'a str, options: ParseOptions<'a>) -> Self {
        Self {
            text,
            options,
            segments: Vec::new(),
            start: 0,
            words: Vec::new(),
            buf: String::new(),
            word_start: None,
            selection: None,
            escaped: false,
            single: false,
            double: false,
            quote_open: 0,
            ternary: None,
            stray_single: false,
            stray_double: false,
            brackets: Vec::new(),
            prev: None,
            at_boundary: false,
            word_closed: false,
        }
    }

    fn run(mut self) -> Vec<Segment> {
        let text = self.text;
        let mut pos = 0;
        while let Some(c) = text[pos..].chars().next() {
            if self.options.cursor == Some(pos) {
                self.mark_cursor();
            }
            if let Some(op) = self.operator_at(pos) {
                let next = pos + op.as_str().len();
                self.close(pos, next, op);
                pos = next;
                continue;
            }
            self.consume(pos, c);
            self.prev = Some(c);
            pos += c.len_utf8();
        }
        self.finish();
        self.segments
    }

    fn operator_at(&self, pos: usize) -> Option<Operator> {
        if self.options.operators.is_empty()
            || self.escaped
            || self.single
            || self.double
            || !self.brackets.is_empty()
        {
            return None;
        }
        Operator::match_at(&self.text[pos..], self.options.operators)
    }

    fn mark_cursor(&mut self) {
        self.selection = if self.at_boundary {
            None
        } else if self.word_closed && self.word_start.is_none() {
            self.last_word_selection()
        } else {
            Some((self.words.len(), self.buf.len()))
        };
    }

    fn last_word_selection(&self) -> Option<(usize, usize)> {
        self.words
            .last()
            .map(|w| (self.words.len() - 1, w.text.len()))
    }

    fn consume(&mut self, pos: usize, c: char) {
        self.word_closed = false;
        if !self.brackets.is_empty() {
            self.bracketed(pos, c);
        } else if self.single {
            self.single_quoted(pos, c);
        } else if self.double {
            self.double_quoted(pos, c);
        } else {
            self.unquoted(pos, c);
            return;
        }
        self.at_boundary = false;
    }

    fn unquoted(&mut self, pos: usize, c: char) {
        if self.escaped {
            self.escaped = false;
            self.push(pos, c);
            self.at_boundary = false;
            return;
        }
        match c {
            ' ' | '\t' => {
                if !self.buf.is_empty() {
                    self.flush(WordStatus::Plain);
                }
                self.at_boundary = true;
                return;
            }
            '\\' => {
                self.begin(pos);
                self.escaped = true;
            }
            '\'' => {
                self.begin(pos);
                self.single = true;
            }
            '"' => {
                self.begin(pos);
                self.double = true;
                self.quote_open = pos;
            }
            '{' | '(' if self.options.parse_brackets => {
                self.push(pos, c);
                self.brackets.push(closer(c));
            }
            _ => self.push(pos, c),
        }
        self.at_boundary = false;
    }

    fn single_quoted(&mut self, pos: usize, c: char) {
        if self.escaped {
            self.escaped = false;
            self.push(pos, c);
            return;
        }
        match c {
            '\\' => {
                self.push(pos, c);
                self.escaped = true;
            }
            '\'' => {
                self.single = false;
                self.stray_double = false;
                self.flush(WordStatus::Plain);
                self.word_closed = true;
            }
            '"' => {
                self.stray_double = !self.stray_double;
                self.push(pos, c);
            }
            _ => self.push(pos, c),
        }
    }

    fn double_quoted(&mut self, pos: usize, c: char) {
        if let Some((_, entry_len)) = self.ternary {
            // Only a doubled quote ends a ternary word; the first of the
            // pair was already written and is taken back out.
            if c == '"' && self.prev == Some('"') {
                if self.buf.len() > entry_len {
                    self.buf.pop();
                }
                self.double = false;
                self.ternary = None;
                self.stray_single = false;
                if self.buf.is_empty() {
                    self.word_start = None;
                } else {
                    self.flush(WordStatus::Plain);
                    self.word_closed = true;
                }
            } else {
                self.push(pos, c);
            }
            return;
        }
        if self.escaped {
            self.escaped = false;
            self.push(pos, c);
            return;
        }
        match c {
            '\\' => {
                self.push(pos, c);
                self.escaped = true;
            }
            '"' if pos == self.quote_open + 1 => {
                self.ternary = Some((pos, self.buf.len()));
            }
            '"' => {
                self.double = false;
                self.stray_single = false;
                self.flush(WordStatus::Plain);
                self.word_closed = true;
            }
            '\'' => {
                self.stray_single = !self.stray_single;
                self.push(pos, c);
            }
            _ => self.push(pos, c),
        }
    }

    fn bracketed(&mut self, pos: usize, c: char) {
        self.push(pos, c);
        if self.escaped {
            self.escaped = false;
            return;
        }
        match c {
            '\\' => self.escaped = true,
            '{' | '(' => self.brackets.push(closer(c)),
            '}' | ')' if self.brackets.last() == Some(&c) => {
                self.brackets.pop();
            }
            _ => {}
        }
    }

    fn begin(&mut self, pos: usize) {
        if self.word_start.is_none() {
            self.word_start = Some(pos);
        }
    }

    fn push(&mut self, pos: usize, c: char) {
        self.begin(pos);
        self.buf.push(c);
    }

    fn flush(&mut self, status: WordStatus) {
        let offset = self.word_start.take().unwrap_or(self.start);
        self.words.push(Word {
            text: std::mem::take(&mut self.buf),
            offset,
            status,
        });
    }

    /// Close the current segment at an operator spanning `end..next`.
    fn close(&mut self, end: usize, next: usize, operator: Operator) {
        if !self.buf.is_empty() {
            self.flush(WordStatus::Plain);
        }
        let (status, error) = if self.words.is_empty() {
            (
                SegmentStatus::EmptyBeforeOperator,
                Some(format!(
                    "{}: syntax error near unexpected token '{}'",
                    self.options.error_prefix,
                    operator.as_str()
                )),
            )
        } else {
            (SegmentStatus::Ok, None)
        };
        self.emit(end, self.start..next, operator, status, error, false);
        self.start = next;
        self.prev = None;
        self.at_boundary = true;
    }

    fn finish(&mut self) {
        let end = self.text.len();

        // `""` followed by nothing but blanks is an empty word, not the
        // start of a ternary word.
        if let Some((second, entry_len)) = self.ternary
            && self.text[second + 1..].chars().all(|c| c == ' ' || c == '\t')
        {
            self.buf.truncate(entry_len);
            self.double = false;
            self.ternary = None;
            self.stray_single = false;
            self.flush(WordStatus::Plain);
            self.at_boundary = second + 1 < end;
        }

        let open = self.escaped || self.single || self.double || !self.brackets.is_empty();
        if self.escaped && !self.single && !self.double && self.brackets.is_empty() {
            self.buf.push('\\');
        }

        let status = if (self.single && self.stray_double) || (self.double && self.stray_single) {
            SegmentStatus::DoubleUnclosedQuote
        } else if self.single || self.double {
            SegmentStatus::UnclosedQuote
        } else {
            SegmentStatus::Ok
        };

        if self.single || self.double {
            self.flush(WordStatus::OpenQuote);
        } else if !self.brackets.is_empty() {
            self.flush(WordStatus::OpenBracket);
        } else if !self.buf.is_empty() {
            self.flush(WordStatus::Plain);
        }

        let prefix = self.options.error_prefix;
        let error = match status {
            SegmentStatus::UnclosedQuote => {
                Some(format!("{prefix}: unexpected end of input, unclosed quote"))
            }
            SegmentStatus::DoubleUnclosedQuote => Some(format!(
                "{prefix}: unexpected end of input, unclosed single and double quotes"
            )),
            _ => None,
        };
        self.emit(end, self.start..end + 1, Operator::Eol, status, error, open);
    }

    /// Push the finished segment. `covers` is the cursor range owned by it.
    fn emit(
        &mut self,
        end: usize,
        covers: Range<usize>,
        operator: Operator,
        status: SegmentStatus,
        error: Option<String>,
        open: bool,
    ) {
        let cursor = self.options.cursor.filter(|c| covers.contains(c));
        if let Some(c) = cursor
            && c >= end
        {
            self.selection = if open || !self.at_boundary {
                self.last_word_selection()
            } else {
                None
            };
        }
        let (selected_word, cursor_in_word) = match self.selection.take() {
            Some((index, offset)) if cursor.is_some() && index < self.words.len() => {
                (Some(index), offset)
            }
            _ => (None, 0),
        };

        let segment = Segment {
            original: self.text[self.start..end].to_string(),
            words: std::mem::take(&mut self.words),
            cursor,
            selected_word,
            cursor_in_word,
            status,
            error,
            operator,
        };
        debug!(
            "segment {:?}: {} word(s), {:?}, ended by {:?}",
            segment.original,
            segment.words.len(),
            segment.status,
            segment.operator
        );
        self.segments.push(segment);
        self.word_start = None;
    }
}
