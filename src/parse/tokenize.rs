use serde::Serialize;

use super::segment::{ParseOptions, segment};
use super::types::Segment;

/// Split a whole line into word texts, ignoring operators.
pub fn tokenize(line: &str) -> Vec<String> {
    segment(line, &ParseOptions::new())
        .into_iter()
        .flat_map(|s| s.words)
        .map(|w| w.text)
        .collect()
}

/// Characters the segmenter treats specially outside quotes.
fn is_special(c: char) -> bool {
    c.is_whitespace()
        || matches!(
            c,
            '\\' | '\'' | '"' | ';' | '|' | '>' | '<' | '&' | '{' | '}' | '(' | ')'
        )
}

/// Quote one word so the segmenter reads it back unchanged.
///
/// A closing quote ends a word, so the result must be a single quoted
/// chunk or a run of escapes, never glued quoted pieces.
pub fn quote(word: &str) -> String {
    if word.is_empty() {
        return "''".to_string();
    }
    if !word.chars().any(is_special) {
        return word.to_string();
    }
    // A trailing backslash would escape the closing quote.
    if !word.ends_with('\\')
        && let Ok(quoted) = shlex::try_quote(word)
        && is_single_chunk(&quoted)
    {
        return quoted.into_owned();
    }
    let mut escaped = String::with_capacity(word.len() * 2);
    for c in word.chars() {
        if is_special(c) {
            escaped.push('\\');
        }
        escaped.push(c);
    }
    escaped
}

/// `'...'` with no other single quote inside.
fn is_single_chunk(quoted: &str) -> bool {
    quoted.len() >= 2
        && quoted.starts_with('\'')
        && quoted.ends_with('\'')
        && !quoted[1..quoted.len() - 1].contains('\'')
}

/// Quote every word and join them with single spaces.
pub fn join<'a>(words: impl IntoIterator<Item = &'a str>) -> String {
    words.into_iter().map(quote).collect::<Vec<_>>().join(" ")
}

/// What an interactive completer should complete.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct CompletionTarget {
    /// Index of the sub-segment holding the cursor.
    pub segment_index: usize,
    /// Index of the word under the cursor; `None` when starting a new word.
    pub word_index: Option<usize>,
    /// Text of the word under the cursor, empty when starting a new word.
    pub word: String,
    /// Cursor offset inside `word`.
    pub offset: usize,
    /// The segment holding the cursor.
    pub segment: Segment,
}

impl CompletionTarget {
    /// The cursor sits where a command name is expected.
    pub fn is_command_position(&self) -> bool {
        match self.word_index {
            Some(index) => index == 0,
            None => self.segment.words.iter().all(|w| {
                self.segment
                    .cursor
                    .is_some_and(|cursor| w.offset >= cursor)
            }),
        }
    }
}

/// Locate the word under `cursor`.
///
/// `options.cursor` is overridden with `cursor`. Returns `None` when the
/// cursor lies outside the line.
pub fn completion_target(
    text: &str,
    cursor: usize,
    options: &ParseOptions<'_>,
) -> Option<CompletionTarget> {
    let options = options.cursor(cursor);
    segment(text, &options)
        .into_iter()
        .enumerate()
        .find(|(_, s)| s.cursor.is_some())
        .map(|(segment_index, segment)| {
            let word = segment
                .selected()
                .map(|w| w.text.clone())
                .unwrap_or_default();
            CompletionTarget {
                segment_index,
                word_index: segment.selected_word,
                word,
                offset: segment.cursor_in_word,
                segment,
            }
        })
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::parse::Operator;

    #[test]
    fn tokenize_simple() {
        assert_eq!(tokenize("ls -la /tmp"), vec!["ls", "-la", "/tmp"]);
    }

    #[test]
    fn tokenize_quoted() {
        assert_eq!(tokenize("echo 'hello world'"), vec!["echo", "hello world"]);
    }

    #[test]
    fn tokenize_double_quoted() {
        assert_eq!(
            tokenize("echo \"hello world\""),
            vec!["echo", "hello world"]
        );
    }

    #[test]
    fn tokenize_keeps_operators_as_words() {
        assert_eq!(tokenize("a|b"), vec!["a|b"]);
    }

    #[test]
    fn join_plain_words_unchanged() {
        assert_eq!(join(["ls", "-la", "/tmp"]), "ls -la /tmp");
    }

    #[test]
    fn join_round_trips_spaces() {
        let words = ["echo", "hello world", "x"];
        let line = join(words);
        assert_eq!(tokenize(&line), words);
    }

    #[test]
    fn join_round_trips_quotes_and_specials() {
        let words = [
            "x",
            "$5 it's",
            "say \"hi\"",
            "",
            "a|b && c",
            "{x}",
            "back\\",
            "tab\there",
        ];
        let line = join(words);
        assert_eq!(tokenize(&line), words);
    }

    #[test]
    fn quote_never_glues_chunks() {
        assert_eq!(quote("it's"), "it\\'s");
        assert_eq!(quote("a b"), "'a b'");
        assert_eq!(quote(""), "''");
        assert_eq!(quote("plain"), "plain");
    }

    #[test]
    fn normalized_round_trips_through_split_mode() {
        let options = ParseOptions::new().brackets(true).operators(&Operator::ALL);
        let seg = &segment(r"grep 'a;b' it\'s > out", &options)[0];
        let again = &segment(&seg.normalized(), &options)[0];
        assert_eq!(again.words.len(), 3);
        assert_eq!(
            again.words.iter().map(|w| w.text.as_str()).collect::<Vec<_>>(),
            ["grep", "a;b", "it's"]
        );
    }

    #[test]
    fn normalized_trims_and_collapses() {
        let seg = &segment("   echo    hi   there  ", &ParseOptions::new())[0];
        assert_eq!(seg.normalized(), "echo hi there");
    }

    #[test]
    fn completion_in_second_segment() {
        let target = completion_target(
            "ls -l | gr",
            10,
            &ParseOptions::new().operators(&Operator::ALL),
        )
        .unwrap();
        assert_eq!(target.segment_index, 1);
        assert_eq!(target.word_index, Some(0));
        assert_eq!(target.word, "gr");
        assert_eq!(target.offset, 2);
        assert!(target.is_command_position());
    }

    #[test]
    fn completion_of_argument() {
        let target = completion_target("cat READ", 8, &ParseOptions::new()).unwrap();
        assert_eq!(target.word_index, Some(1));
        assert_eq!(target.word, "READ");
        assert!(!target.is_command_position());
    }

    #[test]
    fn completion_of_new_word() {
        let target = completion_target("cat ", 4, &ParseOptions::new()).unwrap();
        assert_eq!(target.word_index, None);
        assert_eq!(target.word, "");
        assert_eq!(target.offset, 0);
        assert!(!target.is_command_position());
    }

    #[test]
    fn completion_after_operator_is_command_position() {
        let target = completion_target(
            "ls && ",
            6,
            &ParseOptions::new().operators(&Operator::ALL),
        )
        .unwrap();
        assert_eq!(target.segment_index, 1);
        assert_eq!(target.word_index, None);
        assert!(target.is_command_position());
    }

    #[test]
    fn completion_outside_line() {
        assert!(completion_target("ls", 10, &ParseOptions::new()).is_none());
    }
}
