use thiserror::Error;

use crate::parse::{Operator, SegmentStatus};

/// Why a line could not be turned into an execution chain.
///
/// Every message already carries the configured error prefix.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum ChainError {
    /// A segment failed to lex, or an operator had no words before it.
    #[error("{message}")]
    Syntax {
        status: SegmentStatus,
        message: String,
    },

    #[error("{prefix}: syntax error: data sink '{sink}' cannot precede data source '{input}'")]
    SinkBeforeSource {
        prefix: String,
        sink: Operator,
        input: Operator,
    },

    #[error("{prefix}: syntax error: duplicate redirection '{operator}'")]
    DuplicateRedirect { prefix: String, operator: Operator },

    #[error("{prefix}: syntax error: '{operator}' expects exactly one argument, found {found}")]
    BadArgument {
        prefix: String,
        operator: Operator,
        found: usize,
    },

    #[error("{prefix}: syntax error: '{operator}' is missing its argument")]
    MissingArgument { prefix: String, operator: Operator },

    #[error("{prefix}: syntax error: expected a command after '{operator}'")]
    MissingCommand { prefix: String, operator: Operator },

    #[error("{prefix}: command not found: {name}")]
    NotFound {
        prefix: String,
        name: String,
        suggestions: Vec<String>,
    },
}

impl ChainError {
    /// Unclosed quotes.
    pub fn is_lexical(&self) -> bool {
        matches!(
            self,
            ChainError::Syntax {
                status: SegmentStatus::UnclosedQuote | SegmentStatus::DoubleUnclosedQuote,
                ..
            }
        )
    }

    /// Operators in the wrong place or missing their operands.
    pub fn is_structural(&self) -> bool {
        !self.is_lexical() && !self.is_not_found()
    }

    pub fn is_not_found(&self) -> bool {
        matches!(self, ChainError::NotFound { .. })
    }

    /// Close command names offered for a command that did not resolve.
    pub fn suggestions(&self) -> &[String] {
        match self {
            ChainError::NotFound { suggestions, .. } => suggestions,
            _ => &[],
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn messages_name_the_operator() {
        let err = ChainError::SinkBeforeSource {
            prefix: "sh".into(),
            sink: Operator::RedirectOut,
            input: Operator::RedirectIn,
        };
        assert_eq!(
            err.to_string(),
            "sh: syntax error: data sink '>' cannot precede data source '<'"
        );
    }

    #[test]
    fn syntax_message_is_verbatim() {
        let err = ChainError::Syntax {
            status: SegmentStatus::EmptyBeforeOperator,
            message: "sh: syntax error near unexpected token '|'".into(),
        };
        assert_eq!(err.to_string(), "sh: syntax error near unexpected token '|'");
        assert!(err.is_structural());
        assert!(!err.is_lexical());
    }

    #[test]
    fn classification() {
        let lexical = ChainError::Syntax {
            status: SegmentStatus::UnclosedQuote,
            message: String::new(),
        };
        assert!(lexical.is_lexical());
        assert!(!lexical.is_structural());

        let missing = ChainError::NotFound {
            prefix: "sh".into(),
            name: "ehco".into(),
            suggestions: vec!["echo".into()],
        };
        assert!(missing.is_not_found());
        assert!(!missing.is_structural());
        assert_eq!(missing.suggestions(), ["echo".to_string()]);
        assert_eq!(missing.to_string(), "sh: command not found: ehco");
    }
}
